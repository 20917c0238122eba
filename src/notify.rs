use crate::model::RecordSummary;

/// Desktop notification for a pushed run that failed or broke.
#[cfg(feature = "desktop-notify")]
pub fn send_desktop(summary: &RecordSummary) {
    use notify_rust::{Notification, Urgency};

    let title = format!("Test {}", summary.status.label());
    let body = match summary.test_class.as_deref() {
        Some(class) => format!("{} ({})", summary.method_label(), crate::model::short_name(class)),
        None => summary.method_label().to_string(),
    };

    if let Err(e) = Notification::new()
        .summary(&title)
        .body(&body)
        .icon("dialog-error")
        .urgency(Urgency::Critical)
        .show()
    {
        tracing::warn!("desktop notification failed: {e}");
    }
}

#[cfg(not(feature = "desktop-notify"))]
pub fn send_desktop(summary: &RecordSummary) {
    tracing::debug!(id = %summary.id, "desktop notifications disabled at build time");
}
