use crate::app::{AppState, NARROW_WIDTH_THRESHOLD};
use crate::selection::Section;
use crate::tui::palette::Palette;
use crate::tui::{confirm_overlay, detail, footer, header, list, stats};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Style;
use ratatui::widgets::Block;
use ratatui::Frame;

pub fn render(f: &mut Frame, state: &AppState) {
    let palette = Palette::for_theme(state.theme);
    if state.theme == crate::selection::Theme::Light {
        f.render_widget(
            Block::default().style(Style::default().bg(palette.overlay_bg)),
            f.area(),
        );
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // header
            Constraint::Min(1),    // section body
            Constraint::Length(2), // footer
        ])
        .split(f.area());

    header::render(f, chunks[0], state, palette);
    match state.section {
        Section::Overview => render_overview(f, chunks[1], state, palette),
        Section::Statistics => stats::render(f, chunks[1], state, palette),
    }
    footer::render(f, chunks[2], state, palette);

    if let Some(overlay) = &state.confirm {
        confirm_overlay::render(f, overlay, palette);
    }
}

fn render_overview(
    f: &mut Frame,
    area: ratatui::layout::Rect,
    state: &AppState,
    palette: &Palette,
) {
    // Narrow terminals show only the pane that matters: the detail once a
    // record is open, otherwise the list.
    if area.width < NARROW_WIDTH_THRESHOLD {
        if state.selected.is_some() && state.current_row_id() == state.selected.as_deref() {
            detail::render(f, area, state, palette);
        } else {
            list::render(f, area, state, palette);
        }
        return;
    }
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);
    list::render(f, panes[0], state, palette);
    detail::render(f, panes[1], state, palette);
}
