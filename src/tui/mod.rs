pub mod confirm_overlay;
pub mod detail;
pub mod footer;
pub mod header;
pub mod list;
pub mod palette;
pub mod render;
pub mod spinner;
pub mod stats;

use chrono::{DateTime, Utc};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Cuts `s` to `max_width` display columns, marking the cut with `…`.
pub fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let mut result = String::new();
    let mut width = 0;
    for c in s.chars() {
        let cw = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + cw + 1 > max_width {
            result.push('…');
            break;
        }
        result.push(c);
        width += cw;
    }
    result
}

pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86_400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86_400, (secs % 86_400) / 3600)
    }
}

/// Milliseconds as `850ms`, `12.4s` or `3m 5s`.
pub fn format_millis(millis: f64) -> String {
    if !millis.is_finite() || millis < 0.0 {
        return crate::model::UNKNOWN_FIELD.to_string();
    }
    if millis < 1000.0 {
        format!("{millis:.0}ms")
    } else if millis < 60_000.0 {
        format!("{:.1}s", millis / 1000.0)
    } else {
        format_duration((millis / 1000.0) as i64)
    }
}

/// Relative age like `5m 2s ago`, or `N/A` without a timestamp.
pub fn format_age(timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match timestamp {
        Some(ts) => format!("{} ago", format_duration(now.signed_duration_since(ts).num_seconds())),
        None => crate::model::UNKNOWN_FIELD.to_string(),
    }
}
