//! Detail pane for the selected record.

use crate::app::{AppState, DetailPanel, FeedbackState};
use crate::model::{AnalysisResult, Record, RecordDetail, StepResult, UNKNOWN_FIELD};
use crate::tui::palette::Palette;
use crate::tui::{format_millis, spinner};
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::Frame;
use std::collections::HashMap;

/// Stack traces are cut to keep the pane readable.
const STACK_TRACE_LINES: usize = 12;

pub fn render(f: &mut Frame, area: Rect, state: &AppState, palette: &Palette) {
    let area = Rect {
        x: area.x.saturating_add(1),
        width: area.width.saturating_sub(1),
        ..area
    };
    let lines = match &state.detail {
        DetailPanel::Placeholder => vec![muted("Select a test run to see its details", palette)],
        DetailPanel::Loading(_) => vec![Line::from(vec![
            Span::styled(
                format!("{} ", spinner::frame(state.spinner_frame)),
                Style::default().fg(palette.warn),
            ),
            Span::styled("Loading details…", Style::default().fg(palette.dim)),
        ])],
        DetailPanel::NotFound(id) => vec![
            Line::styled("Test run not found", Style::default().fg(palette.warn)),
            muted(&format!("{id} no longer exists on the server"), palette),
        ],
        DetailPanel::Failed { message, .. } => vec![
            Line::styled("Could not load details", Style::default().fg(palette.error)),
            muted(message, palette),
            muted("Press Enter to retry", palette),
        ],
        DetailPanel::Ready(_) => match state.selected_record() {
            Some(record) => record_lines(record, state.analysis_cursor, &state.feedback, palette),
            None => vec![muted("Select a test run to see its details", palette)],
        },
    };
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}

fn muted<'a>(text: &str, palette: &Palette) -> Line<'a> {
    Line::styled(text.to_string(), Style::default().fg(palette.dim))
}

fn heading<'a>(text: &str, palette: &Palette) -> Line<'a> {
    Line::styled(
        text.to_string(),
        Style::default()
            .fg(palette.title)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
    )
}

fn field<'a>(label: &str, value: &str, palette: &Palette) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{label:>12}  "), palette.label()),
        Span::styled(value.to_string(), Style::default().fg(palette.text)),
    ])
}

pub fn record_lines(
    record: &Record,
    analysis_cursor: usize,
    feedback: &HashMap<String, FeedbackState>,
    palette: &Palette,
) -> Vec<Line<'static>> {
    let summary = &record.summary;
    let (icon, color) = palette.status(summary.status);
    let mut lines = vec![Line::from(vec![
        Span::styled(format!("{icon} "), Style::default().fg(color)),
        Span::styled(
            summary.method_label().to_string(),
            Style::default()
                .fg(palette.text)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {}", summary.status.label()), Style::default().fg(color)),
    ])];
    lines.push(field("Class", summary.test_class.as_deref().unwrap_or(UNKNOWN_FIELD), palette));
    lines.push(field("Suite", summary.test_suite(), palette));
    lines.push(field("Environment", summary.environment(), palette));
    lines.push(field("Version", summary.app_version(), palette));
    let when = summary
        .timestamp
        .map_or_else(|| UNKNOWN_FIELD.to_string(), |ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    lines.push(field("Run at", &when, palette));

    let Some(detail) = &record.detail else {
        return lines;
    };

    if let Some(ms) = detail.duration_millis {
        lines.push(field("Duration", &format_millis(ms as f64), palette));
    }
    if !detail.test_tags.is_empty() {
        lines.push(field("Tags", &detail.test_tags.join(", "), palette));
    }

    failure_lines(detail, &mut lines, palette);
    analysis_lines(&detail.analysis_results, analysis_cursor, feedback, &mut lines, palette);
    environment_lines(detail, &mut lines, palette);

    if let Some(artifacts) = &detail.artifacts {
        let links = artifacts.links();
        if !links.is_empty() {
            lines.push(Line::raw(""));
            lines.push(heading("Artifacts", palette));
            for (label, url) in links {
                lines.push(field(label, url, palette));
            }
        }
    }

    if !detail.custom_metadata.is_empty() {
        lines.push(Line::raw(""));
        lines.push(heading("Metadata", palette));
        for (key, value) in &detail.custom_metadata {
            lines.push(field(key, value, palette));
        }
    }
    lines
}

fn failure_lines(detail: &RecordDetail, lines: &mut Vec<Line<'static>>, palette: &Palette) {
    if detail.exception_type.is_none() && detail.failed_step.is_none() {
        return;
    }
    lines.push(Line::raw(""));
    lines.push(heading("Failure", palette));
    if let Some(kind) = &detail.exception_type {
        lines.push(field("Exception", kind, palette));
    }
    if let Some(message) = &detail.exception_message {
        lines.push(field("Message", message, palette));
    }
    if let Some(step) = &detail.failed_step {
        let label = format!(
            "#{} {} {}",
            step.step_number.map_or_else(|| "?".to_string(), |n| n.to_string()),
            step.action.as_deref().unwrap_or(UNKNOWN_FIELD),
            step.locator_value.as_deref().unwrap_or(""),
        );
        lines.push(field("Failed step", label.trim_end(), palette));
    }
    if !detail.execution_path.is_empty() {
        let failed = detail
            .execution_path
            .iter()
            .filter(|s| s.result == StepResult::Failure)
            .count();
        lines.push(field(
            "Steps",
            &format!("{} recorded, {failed} failed", detail.execution_path.len()),
            palette,
        ));
    }
    if let Some(trace) = &detail.stack_trace {
        let total = trace.lines().count();
        for line in trace.lines().take(STACK_TRACE_LINES) {
            lines.push(Line::styled(
                format!("  {line}"),
                Style::default().fg(palette.error),
            ));
        }
        if total > STACK_TRACE_LINES {
            lines.push(muted(&format!("  … {} more lines", total - STACK_TRACE_LINES), palette));
        }
    }
}

fn analysis_lines(
    analyses: &[AnalysisResult],
    cursor: usize,
    feedback: &HashMap<String, FeedbackState>,
    lines: &mut Vec<Line<'static>>,
    palette: &Palette,
) {
    if analyses.is_empty() {
        return;
    }
    lines.push(Line::raw(""));
    lines.push(heading(&format!("Analysis {}/{}", cursor + 1, analyses.len()), palette));
    let Some(analysis) = analyses.get(cursor) else {
        return;
    };
    if let Some(kind) = &analysis.analysis_type {
        lines.push(field("Type", kind, palette));
    }
    if let Some(confidence) = analysis.ai_confidence {
        lines.push(field("Confidence", &format!("{:.0}%", confidence * 100.0), palette));
    }
    lines.push(field(
        "Reason",
        analysis.suggested_reason.as_deref().unwrap_or(UNKNOWN_FIELD),
        palette,
    ));
    if let Some(solution) = &analysis.solution {
        lines.push(field("Solution", solution, palette));
    }
    let verdict = match feedback.get(&analysis.id) {
        None => Span::styled("+ correct  - incorrect", Style::default().fg(palette.key)),
        Some(FeedbackState::Submitting(_)) => {
            Span::styled("sending…", Style::default().fg(palette.dim))
        }
        Some(FeedbackState::Submitted(true)) => {
            Span::styled("marked correct", Style::default().fg(palette.ok))
        }
        Some(FeedbackState::Submitted(false)) => {
            Span::styled("marked incorrect", Style::default().fg(palette.warn))
        }
    };
    lines.push(Line::from(vec![
        Span::styled(format!("{:>12}  ", "Feedback"), palette.label()),
        verdict,
    ]));
}

fn environment_lines(detail: &RecordDetail, lines: &mut Vec<Line<'static>>, palette: &Palette) {
    let Some(env) = &detail.environment_details else {
        return;
    };
    let pairs = [
        ("OS", join(env.os_type.as_deref(), env.os_version.as_deref())),
        ("Browser", join(env.browser_type.as_deref(), env.browser_version.as_deref())),
        ("Device", join(env.device_type.as_deref(), env.device_name.as_deref())),
        ("Resolution", env.screen_resolution.clone()),
        ("Driver", env.driver_version.clone()),
        ("Base URL", env.app_base_url.clone()),
    ];
    if pairs.iter().all(|(_, v)| v.is_none()) {
        return;
    }
    lines.push(Line::raw(""));
    lines.push(heading(env.name.as_deref().unwrap_or("Environment"), palette));
    for (label, value) in pairs {
        if let Some(value) = value {
            lines.push(field(label, &value, palette));
        }
    }
}

fn join(a: Option<&str>, b: Option<&str>) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) => Some(format!("{a} {b}")),
        (Some(v), None) | (None, Some(v)) => Some(v.to_string()),
        (None, None) => None,
    }
}
