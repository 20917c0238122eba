//! Typed payloads exchanged with the reporting service.
//!
//! Everything the server may omit or send as `null` is either an `Option` or
//! falls back to an explicit `Unknown` variant / empty collection, so the rest
//! of the crate never has to guess at missing fields.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Placeholder shown wherever a field is absent.
pub const UNKNOWN_FIELD: &str = "N/A";

/// Final status of a test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    Passed,
    Failed,
    Skipped,
    Broken,
    #[default]
    #[serde(other)]
    Unknown,
}

impl RecordStatus {
    pub fn label(self) -> &'static str {
        match self {
            RecordStatus::Passed => "PASSED",
            RecordStatus::Failed => "FAILED",
            RecordStatus::Skipped => "SKIPPED",
            RecordStatus::Broken => "BROKEN",
            RecordStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, RecordStatus::Failed | RecordStatus::Broken)
    }
}

/// Outcome of a single execution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepResult {
    Success,
    Failure,
    Skipped,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub test_suite: Option<String>,
}

/// The part of a record that list pages carry. Enough to render a row and to
/// run the view filter.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub status: RecordStatus,
    #[serde(default)]
    pub test_class: Option<String>,
    #[serde(default)]
    pub test_method: Option<String>,
    /// Creation time; the listing is ordered by it, newest first.
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub configuration: Option<Configuration>,
}

impl RecordSummary {
    pub fn method_label(&self) -> &str {
        self.test_method.as_deref().unwrap_or(UNKNOWN_FIELD)
    }

    pub fn environment(&self) -> &str {
        self.configuration
            .as_ref()
            .and_then(|c| c.environment.as_deref())
            .unwrap_or(UNKNOWN_FIELD)
    }

    pub fn app_version(&self) -> &str {
        self.configuration
            .as_ref()
            .and_then(|c| c.app_version.as_deref())
            .unwrap_or(UNKNOWN_FIELD)
    }

    pub fn test_suite(&self) -> &str {
        self.configuration
            .as_ref()
            .and_then(|c| c.test_suite.as_deref())
            .unwrap_or(UNKNOWN_FIELD)
    }
}

/// One step of a test's execution path, as recorded by the test agent.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStep {
    #[serde(default)]
    pub step_number: Option<u32>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub locator_strategy: Option<String>,
    #[serde(default)]
    pub locator_value: Option<String>,
    #[serde(default)]
    pub interacted_text: Option<String>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default, deserialize_with = "null_default")]
    pub result: StepResult,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// An AI-generated root cause suggestion that the user can vote on.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: String,
    #[serde(default)]
    pub analysis_type: Option<String>,
    #[serde(default)]
    pub suggested_reason: Option<String>,
    #[serde(default)]
    pub solution: Option<String>,
    /// 0.0 ..= 1.0
    #[serde(default)]
    pub ai_confidence: Option<f64>,
    #[serde(default)]
    pub raw_data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub os_type: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(default)]
    pub browser_type: Option<String>,
    #[serde(default)]
    pub browser_version: Option<String>,
    #[serde(default)]
    pub screen_resolution: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub driver_version: Option<String>,
    #[serde(default)]
    pub app_base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifacts {
    #[serde(default, deserialize_with = "null_default")]
    pub screenshot_urls: Vec<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub app_log_urls: Vec<String>,
    #[serde(default)]
    pub browser_console_log_url: Option<String>,
    #[serde(default)]
    pub har_file_url: Option<String>,
}

impl Artifacts {
    /// `(label, url)` pairs in display order.
    pub fn links(&self) -> Vec<(&'static str, &str)> {
        let mut links: Vec<(&'static str, &str)> = self
            .screenshot_urls
            .iter()
            .map(|u| ("Screenshot", u.as_str()))
            .collect();
        if let Some(url) = &self.video_url {
            links.push(("Video", url));
        }
        links.extend(self.app_log_urls.iter().map(|u| ("Log", u.as_str())));
        if let Some(url) = &self.browser_console_log_url {
            links.push(("Console", url));
        }
        if let Some(url) = &self.har_file_url {
            links.push(("HAR", url));
        }
        links
    }
}

/// Everything the detail endpoint returns beyond the summary.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDetail {
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_millis: Option<u64>,
    #[serde(default)]
    pub exception_type: Option<String>,
    #[serde(default)]
    pub exception_message: Option<String>,
    #[serde(default)]
    pub stack_trace: Option<String>,
    #[serde(default)]
    pub failed_step: Option<ExecutionStep>,
    #[serde(default, deserialize_with = "null_default")]
    pub execution_path: Vec<ExecutionStep>,
    #[serde(default, deserialize_with = "null_default")]
    pub analysis_results: Vec<AnalysisResult>,
    #[serde(default)]
    pub environment_details: Option<EnvironmentDetails>,
    #[serde(default, deserialize_with = "null_default")]
    pub test_tags: Vec<String>,
    #[serde(default)]
    pub artifacts: Option<Artifacts>,
    #[serde(default, deserialize_with = "null_default")]
    pub custom_metadata: BTreeMap<String, String>,
}

/// A test run as held by the record store: always a summary, plus the full
/// detail once it has been fetched or pushed.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub summary: RecordSummary,
    pub detail: Option<RecordDetail>,
}

impl Record {
    pub fn summary_only(summary: RecordSummary) -> Self {
        Self {
            summary,
            detail: None,
        }
    }

    pub fn full(summary: RecordSummary, detail: RecordDetail) -> Self {
        Self {
            summary,
            detail: Some(detail),
        }
    }

    pub fn id(&self) -> &str {
        &self.summary.id
    }

    pub fn has_detail(&self) -> bool {
        self.detail.is_some()
    }
}

/// Wire shape of a full record; the detail fields sit next to the summary ones.
#[derive(Debug, Deserialize)]
pub(crate) struct RecordPayload {
    #[serde(flatten)]
    pub summary: RecordSummary,
    #[serde(flatten)]
    pub detail: RecordDetail,
}

impl From<RecordPayload> for Record {
    fn from(p: RecordPayload) -> Self {
        Record::full(p.summary, p.detail)
    }
}

/// One page of the newest-first listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPage {
    #[serde(default, deserialize_with = "null_default")]
    pub content: Vec<RecordSummary>,
    /// `true` when no further page exists.
    pub last: bool,
    /// Zero-based page index as echoed by the server.
    #[serde(default)]
    pub number: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTrend {
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub pass_rate: f64,
    #[serde(default)]
    pub total_runs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowTest {
    pub test_name: String,
    #[serde(default)]
    pub average_duration_millis: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatistics {
    #[serde(default)]
    pub total_runs: u64,
    #[serde(default)]
    pub passed_runs: u64,
    #[serde(default)]
    pub failed_runs: u64,
    /// SKIPPED and BROKEN together.
    #[serde(default)]
    pub skipped_runs: u64,
    #[serde(default)]
    pub pass_rate: f64,
    /// Milliseconds.
    #[serde(default)]
    pub average_test_duration: f64,
    #[serde(default)]
    pub unique_test_count: u64,
    #[serde(default)]
    pub most_unstable_test: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub daily_pass_rate_trend: Vec<DailyTrend>,
    #[serde(default, deserialize_with = "null_default")]
    pub top_failing_tests: BTreeMap<String, u64>,
    #[serde(default, deserialize_with = "null_default")]
    pub top_slow_tests: Vec<SlowTest>,
    #[serde(default, deserialize_with = "null_default")]
    pub runs_by_suite: BTreeMap<String, u64>,
    #[serde(default, deserialize_with = "null_default")]
    pub runs_by_environment: BTreeMap<String, u64>,
    #[serde(default, deserialize_with = "null_default")]
    pub top_exception_types: BTreeMap<String, u64>,
}

impl DashboardStatistics {
    /// Trend points in chronological order (the server does not guarantee one).
    pub fn sorted_trend(&self) -> Vec<&DailyTrend> {
        let mut trend: Vec<&DailyTrend> = self.daily_pass_rate_trend.iter().collect();
        trend.sort_by(|a, b| a.date.cmp(&b.date));
        trend
    }

    /// Failing tests, most failures first, keyed by the short method name.
    pub fn failing_tests_ranked(&self) -> Vec<(&str, u64)> {
        rank_counts(&self.top_failing_tests)
    }

    pub fn exception_types_ranked(&self) -> Vec<(&str, u64)> {
        rank_counts(&self.top_exception_types)
    }
}

fn rank_counts(map: &BTreeMap<String, u64>) -> Vec<(&str, u64)> {
    let mut ranked: Vec<(&str, u64)> = map
        .iter()
        .map(|(name, count)| (short_name(name), *count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
}

/// Last dot-separated segment: `com.acme.LoginTest.testLogin` → `testLogin`.
pub fn short_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

/// Body of a feedback vote on an analysis result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub is_ai_suggestion_correct: bool,
}

/// Parse a server timestamp: RFC 3339, or a zone-less local date-time which is
/// taken to be UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Timestamps arrive as ISO strings or epoch milliseconds. Anything else is
/// treated as unknown rather than failing the whole payload.
fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => parse_timestamp(&s),
        Some(serde_json::Value::Number(n)) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    })
}

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
