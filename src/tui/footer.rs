use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::{AppState, InputMode};
use crate::selection::Section;
use crate::tui::palette::Palette;

pub fn render(f: &mut Frame, area: Rect, state: &AppState, palette: &Palette) {
    let narrow = area.width < crate::app::NARROW_WIDTH_THRESHOLD;

    let hints: &[(&str, &str)] = if state.confirm.is_some() {
        &[("y", "confirm"), ("n", "cancel")]
    } else if state.input_mode == InputMode::Search {
        &[("Enter", "keep"), ("Esc", "clear")]
    } else if state.section == Section::Statistics {
        &[("Tab", "runs"), ("r", "refresh"), ("t", "theme"), ("q", "quit")]
    } else if narrow {
        &[
            ("j/k", "nav"),
            ("Enter", "open"),
            ("f", "filter"),
            ("/", "search"),
            ("Tab", "stats"),
            ("q", "quit"),
        ]
    } else {
        &[
            ("↑↓/jk", "navigate"),
            ("→/l/Enter", "open"),
            ("[/]", "analysis"),
            ("+/-", "feedback"),
            ("f", "filter"),
            ("/", "search"),
            ("n", "demo"),
            ("D", "delete all"),
            ("Tab", "stats"),
            ("t", "theme"),
            ("q", "quit"),
        ]
    };

    let line = if let Some(notif) = state.notifications.last() {
        let (marker, color) = palette.notification(notif.level);
        Line::from(vec![
            Span::styled(marker, Style::default().fg(color)),
            Span::styled(&notif.message, Style::default().fg(color)),
        ])
    } else {
        let mut spans: Vec<Span> = Vec::new();
        for (i, (key, desc)) in hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" "));
            }
            spans.push(Span::styled(*key, Style::default().fg(palette.key)));
            spans.push(Span::styled(
                format!(" {desc}"),
                Style::default().fg(palette.dim),
            ));
        }
        Line::from(spans)
    };

    let footer = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(palette.border)),
    );
    f.render_widget(footer, area);
}
