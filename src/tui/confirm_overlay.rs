use crate::app::ConfirmOverlay;
use crate::tui::palette::Palette;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

pub fn render(f: &mut Frame, overlay: &ConfirmOverlay, palette: &Palette) {
    let area = f.area();

    let width = 44u16.min(area.width);
    let height = 7u16.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    f.render_widget(Clear, overlay_area);

    let hints = Line::from(vec![
        Span::styled(
            "y",
            Style::default().fg(palette.ok).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" confirm   ", Style::default().fg(palette.dim)),
        Span::styled(
            "n",
            Style::default()
                .fg(palette.error)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" cancel ", Style::default().fg(palette.dim)),
    ]);

    let block = Block::default()
        .title(format!(" {} ", overlay.title))
        .title_bottom(hints.centered())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.warn))
        .style(Style::default().bg(palette.overlay_bg));

    let message = Line::from(Span::styled(
        &overlay.message,
        Style::default().fg(palette.text),
    ));

    let paragraph = Paragraph::new(vec![Line::from(""), message])
        .block(block)
        .wrap(Wrap { trim: true })
        .centered();
    f.render_widget(paragraph, overlay_area);
}
