use crate::app::AppState;
use crate::model::{short_name, DashboardStatistics};
use crate::stats::StatsView;
use crate::tui::palette::Palette;
use crate::tui::{format_millis, spinner, truncate};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Sparkline};
use ratatui::Frame;

/// Rows shown per ranked list.
const TOP_N: usize = 5;

pub fn render(f: &mut Frame, area: Rect, state: &AppState, palette: &Palette) {
    match state.stats.view() {
        StatsView::NotLoaded => {
            f.render_widget(
                Paragraph::new("Statistics not loaded. Press r to refresh.")
                    .style(Style::default().fg(palette.dim)),
                area,
            );
        }
        StatsView::Loading => {
            let line = Line::from(vec![
                Span::styled(
                    format!("{} ", spinner::frame(state.spinner_frame)),
                    Style::default().fg(palette.warn),
                ),
                Span::styled("Loading statistics…", Style::default().fg(palette.dim)),
            ]);
            f.render_widget(Paragraph::new(line), area);
        }
        StatsView::Error(message) => {
            let lines = vec![
                Line::styled("Failed to load statistics", Style::default().fg(palette.error)),
                Line::styled(message.to_string(), Style::default().fg(palette.dim)),
                Line::styled("Press r to retry", Style::default().fg(palette.dim)),
            ];
            f.render_widget(Paragraph::new(lines), area);
        }
        StatsView::Ready(stats) => render_stats(f, area, stats, palette),
    }
}

fn render_stats(f: &mut Frame, area: Rect, stats: &DashboardStatistics, palette: &Palette) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // totals
            Constraint::Length(5), // trend
            Constraint::Min(3),    // rankings
        ])
        .split(area);

    f.render_widget(Paragraph::new(totals_lines(stats, palette)), rows[0]);
    render_trend(f, rows[1], stats, palette);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[2]);
    let width = columns[0].width.saturating_sub(2) as usize;

    let mut left = ranked_lines("Top failing tests", &stats.failing_tests_ranked(), width, palette);
    left.push(Line::raw(""));
    left.extend(ranked_lines(
        "Top exceptions",
        &stats.exception_types_ranked(),
        width,
        palette,
    ));
    f.render_widget(Paragraph::new(left), columns[0]);

    let slow: Vec<(String, String)> = stats
        .top_slow_tests
        .iter()
        .take(TOP_N)
        .map(|t| (short_name(&t.test_name).to_string(), format_millis(t.average_duration_millis)))
        .collect();
    let mut right = vec![heading("Slowest tests", palette)];
    right.extend(slow.iter().map(|(name, avg)| entry(name, avg, width, palette)));
    right.push(Line::raw(""));
    right.extend(breakdown_lines("Runs by suite", &stats.runs_by_suite, width, palette));
    right.push(Line::raw(""));
    right.extend(breakdown_lines(
        "Runs by environment",
        &stats.runs_by_environment,
        width,
        palette,
    ));
    f.render_widget(Paragraph::new(right), columns[1]);
}

pub fn totals_lines(stats: &DashboardStatistics, palette: &Palette) -> Vec<Line<'static>> {
    let rate_color = if stats.pass_rate >= 90.0 {
        palette.ok
    } else if stats.pass_rate >= 70.0 {
        palette.warn
    } else {
        palette.error
    };
    vec![
        Line::from(vec![
            Span::styled(format!("{} runs", stats.total_runs), palette.label()),
            Span::styled(
                format!("  {:.1}% passing", stats.pass_rate),
                Style::default().fg(rate_color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  avg {}", format_millis(stats.average_test_duration)),
                Style::default().fg(palette.dim),
            ),
        ]),
        Line::from(vec![
            Span::styled(format!("✓ {}", stats.passed_runs), Style::default().fg(palette.ok)),
            Span::styled(format!("  ✗ {}", stats.failed_runs), Style::default().fg(palette.error)),
            Span::styled(format!("  ⊘ {}", stats.skipped_runs), Style::default().fg(palette.warn)),
            Span::styled(
                format!("  {} unique tests", stats.unique_test_count),
                Style::default().fg(palette.dim),
            ),
        ]),
        Line::from(vec![
            Span::styled("Most unstable: ", Style::default().fg(palette.dim)),
            Span::styled(
                stats
                    .most_unstable_test
                    .as_deref()
                    .map_or("none", short_name)
                    .to_string(),
                Style::default().fg(palette.text),
            ),
        ]),
    ]
}

fn render_trend(f: &mut Frame, area: Rect, stats: &DashboardStatistics, palette: &Palette) {
    let trend = stats.sorted_trend();
    let title = match (trend.first(), trend.last()) {
        (Some(first), Some(last)) => format!(" Pass rate {} → {} ", first.date, last.date),
        _ => " Pass rate (no data) ".to_string(),
    };
    let data: Vec<u64> = trend
        .iter()
        .map(|d| d.pass_rate.clamp(0.0, 100.0).round() as u64)
        .collect();
    let sparkline = Sparkline::default()
        .block(
            Block::default()
                .title(title)
                .borders(Borders::TOP)
                .border_style(Style::default().fg(palette.border)),
        )
        .data(data)
        .max(100)
        .style(Style::default().fg(palette.accent));
    f.render_widget(sparkline, area);
}

fn heading(text: &str, palette: &Palette) -> Line<'static> {
    Line::styled(
        text.to_string(),
        Style::default()
            .fg(palette.title)
            .add_modifier(Modifier::BOLD),
    )
}

fn entry(name: &str, value: &str, width: usize, palette: &Palette) -> Line<'static> {
    let name_max = width.saturating_sub(value.len() + 1);
    let name = truncate(name, name_max);
    let pad = width.saturating_sub(unicode_width::UnicodeWidthStr::width(name.as_str()) + value.len());
    Line::from(vec![
        Span::styled(name, Style::default().fg(palette.text)),
        Span::styled(format!("{:pad$}{value}", ""), Style::default().fg(palette.dim)),
    ])
}

fn ranked_lines(title: &str, ranked: &[(&str, u64)], width: usize, palette: &Palette) -> Vec<Line<'static>> {
    let mut lines = vec![heading(title, palette)];
    if ranked.is_empty() {
        lines.push(Line::styled("none", Style::default().fg(palette.dim)));
    }
    lines.extend(
        ranked
            .iter()
            .take(TOP_N)
            .map(|(name, count)| entry(name, &count.to_string(), width, palette)),
    );
    lines
}

fn breakdown_lines(
    title: &str,
    counts: &std::collections::BTreeMap<String, u64>,
    width: usize,
    palette: &Palette,
) -> Vec<Line<'static>> {
    let mut sorted: Vec<(&str, u64)> = counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked_lines(title, &sorted, width, palette)
}
