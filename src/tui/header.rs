use crate::app::{AppState, InputMode};
use crate::selection::Section;
use crate::tui::palette::Palette;
use crate::tui::spinner;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

pub fn render(f: &mut Frame, area: Rect, state: &AppState, palette: &Palette) {
    let mut spans = vec![
        Span::styled(
            format!(" {} ", state.config.version_string),
            Style::default()
                .fg(palette.title)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("│ ", Style::default().fg(palette.dim)),
        Span::styled(
            state.config.server.as_str(),
            Style::default()
                .fg(palette.text)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            format!("● {}", state.channel.label()),
            Style::default().fg(palette.channel(state.channel)),
        ),
        Span::styled(" │", Style::default().fg(palette.dim)),
    ];

    for section in [Section::Overview, Section::Statistics] {
        let style = if section == state.section {
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(palette.dim)
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(section.label(), style));
    }

    if state.filter.is_active() || state.input_mode == InputMode::Search {
        spans.push(Span::styled(" │ ", Style::default().fg(palette.dim)));
        spans.push(Span::styled(
            format!("[{}]", state.filter.status.label().to_lowercase()),
            Style::default().fg(palette.warn),
        ));
        if state.input_mode == InputMode::Search || !state.filter.search.is_empty() {
            let cursor = if state.input_mode == InputMode::Search { "▏" } else { "" };
            spans.push(Span::styled(
                format!(" /{}{cursor}", state.filter.search),
                Style::default().fg(palette.warn),
            ));
        }
    }

    if state.is_loading() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            spinner::frame(state.spinner_frame).to_string(),
            Style::default().fg(palette.warn),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(palette.border)),
    );

    f.render_widget(header, area);
}
