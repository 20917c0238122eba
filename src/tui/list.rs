use crate::app::AppState;
use crate::model::RecordSummary;
use crate::tui::palette::Palette;
use crate::tui::{format_age, spinner, truncate};
use crate::view::Projection;
use chrono::{DateTime, Utc};
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

pub fn render(f: &mut Frame, area: Rect, state: &AppState, palette: &Palette) {
    let block = Block::default()
        .borders(Borders::RIGHT)
        .border_style(Style::default().fg(palette.border));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = match &state.projection {
        Projection::NotLoaded => {
            let line = if state.pager.is_loading() {
                loading_line(state.spinner_frame, "Loading runs…", palette)
            } else {
                Line::styled("No runs loaded", Style::default().fg(palette.dim))
            };
            f.render_widget(Paragraph::new(line), inner);
            return;
        }
        Projection::NoResults => {
            let msg = if state.order.is_empty() {
                "No test runs yet"
            } else {
                "No runs match the filter"
            };
            f.render_widget(
                Paragraph::new(msg).style(Style::default().fg(palette.dim)),
                inner,
            );
            return;
        }
        Projection::Rows(rows) => rows,
    };

    let now = Utc::now();
    let max_width = inner.width as usize;
    let visible_height = inner.height as usize;
    let scroll_offset = (state.cursor + 1).saturating_sub(visible_height);

    let mut lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .skip(scroll_offset)
        .take(visible_height)
        .filter_map(|(i, id)| {
            let record = state.store.get(id)?;
            let is_cursor = i == state.cursor;
            let is_selected = state.selected.as_deref() == Some(id.as_str());
            Some(record_line(&record.summary, is_cursor, is_selected, now, max_width, palette))
        })
        .collect();

    if lines.len() < visible_height && state.pager.is_loading() {
        lines.push(loading_line(state.spinner_frame, "Loading more…", palette));
    }

    f.render_widget(Paragraph::new(lines), inner);
}

fn record_line(
    summary: &RecordSummary,
    is_cursor: bool,
    is_selected: bool,
    now: DateTime<Utc>,
    max_width: usize,
    palette: &Palette,
) -> Line<'static> {
    let (icon, icon_color) = palette.status(summary.status);
    let marker = if is_selected { "▌" } else { " " };
    let age = format_age(summary.timestamp, now);

    let prefix = format!("{marker}{icon} ");
    let prefix_width = UnicodeWidthStr::width(prefix.as_str());
    let suffix_width = age.len() + 1;
    let show_age = max_width > prefix_width + suffix_width + 12;
    let title_max = if show_age {
        max_width.saturating_sub(prefix_width + suffix_width)
    } else {
        max_width.saturating_sub(prefix_width)
    };
    let title = truncate(summary.method_label(), title_max);
    let title_width = UnicodeWidthStr::width(title.as_str());

    let mut title_style = Style::default().fg(palette.text);
    if is_cursor {
        title_style = title_style.patch(palette.selected());
    }
    if is_selected {
        title_style = title_style.add_modifier(Modifier::BOLD);
    }

    let mut spans = vec![
        Span::styled(prefix, Style::default().fg(icon_color)),
        Span::styled(title, title_style),
    ];
    if show_age {
        let pad = title_max.saturating_sub(title_width);
        spans.push(Span::styled(
            format!("{:pad$} {age}", ""),
            Style::default().fg(palette.dim),
        ));
    }
    Line::from(spans)
}

fn loading_line(spinner_frame: usize, text: &'static str, palette: &Palette) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!(" {} ", spinner::frame(spinner_frame)),
            Style::default().fg(palette.warn),
        ),
        Span::styled(text, Style::default().fg(palette.dim)),
    ])
}
