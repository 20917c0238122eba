use crate::model::{DashboardStatistics, Record, RecordPage, RecordPayload};
use color_eyre::eyre::{eyre, Result};

const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10 MB

fn check_response_size(json: &str) -> Result<()> {
    if json.len() > MAX_RESPONSE_SIZE {
        return Err(eyre!(
            "Response too large ({:.1} MB, max {} MB)",
            json.len() as f64 / (1024.0 * 1024.0),
            MAX_RESPONSE_SIZE / (1024 * 1024)
        ));
    }
    Ok(())
}

pub fn parse_page(json: &str) -> Result<RecordPage> {
    check_response_size(json)?;
    let page: RecordPage = serde_json::from_str(json)?;
    Ok(page)
}

/// Parses a full record, as returned by the detail endpoint, by demo creation
/// and by the push channel.
pub fn parse_record(json: &str) -> Result<Record> {
    check_response_size(json)?;
    let payload: RecordPayload = serde_json::from_str(json)?;
    if payload.summary.id.trim().is_empty() {
        return Err(eyre!("Record without an id"));
    }
    Ok(payload.into())
}

pub fn parse_statistics(json: &str) -> Result<DashboardStatistics> {
    check_response_size(json)?;
    let stats: DashboardStatistics = serde_json::from_str(json)?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RecordStatus, StepResult};

    const PAGE_JSON: &str = r#"{
        "content": [
            {
                "id": "r-2",
                "testClass": "com.acme.LoginTest",
                "testMethod": "testLogin",
                "timestamp": "2024-07-29T10:00:00",
                "status": "FAILED",
                "configuration": {"appVersion": "2.3.1", "environment": "QA", "testSuite": "Regression"}
            },
            {
                "id": "r-1",
                "testMethod": "testLogout",
                "timestamp": "2024-07-29T09:00:00",
                "status": "PASSED",
                "configuration": null
            }
        ],
        "last": false,
        "number": 0,
        "size": 50,
        "totalElements": 120
    }"#;

    const RECORD_JSON: &str = r#"{
        "id": "r-9",
        "testClass": "com.acme.CartTest",
        "testMethod": "testCheckout",
        "timestamp": "2024-07-29T11:00:00.5",
        "status": "BROKEN",
        "exceptionType": "org.openqa.selenium.NoSuchElementException",
        "stackTrace": "at ...",
        "failedStep": {"stepNumber": 3, "action": "click", "result": "FAILURE"},
        "executionPath": [
            {"stepNumber": 1, "action": "open", "result": "SUCCESS"},
            {"stepNumber": 3, "action": "click", "result": "FAILURE", "errorMessage": "not found"}
        ],
        "analysisResults": [
            {"id": "a-1", "analysisType": "Locator", "suggestedReason": "stale locator", "aiConfidence": 0.9}
        ],
        "configuration": {"environment": "STAGING"},
        "customMetadata": {"jiraTicket": "PROJ-1"}
    }"#;

    #[test]
    fn parse_page_keeps_server_order() {
        let page = parse_page(PAGE_JSON).unwrap();
        assert!(!page.last);
        assert_eq!(page.number, 0);
        let ids: Vec<&str> = page.content.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r-2", "r-1"]);
        assert_eq!(page.content[0].status, RecordStatus::Failed);
        assert_eq!(page.content[0].environment(), "QA");
        assert!(page.content[1].configuration.is_none());
    }

    #[test]
    fn parse_record_is_full() {
        let record = parse_record(RECORD_JSON).unwrap();
        assert_eq!(record.id(), "r-9");
        assert_eq!(record.summary.status, RecordStatus::Broken);
        let detail = record.detail.as_ref().unwrap();
        assert_eq!(detail.execution_path.len(), 2);
        assert_eq!(detail.execution_path[1].result, StepResult::Failure);
        assert_eq!(detail.analysis_results[0].id, "a-1");
        assert_eq!(
            detail.custom_metadata.get("jiraTicket").map(String::as_str),
            Some("PROJ-1")
        );
        assert_eq!(detail.failed_step.as_ref().and_then(|s| s.step_number), Some(3));
    }

    #[test]
    fn parse_record_without_detail_fields_still_full() {
        let record = parse_record(r#"{"id":"x","status":"PASSED"}"#).unwrap();
        assert!(record.has_detail());
        assert!(record.detail.unwrap().analysis_results.is_empty());
    }

    #[test]
    fn parse_record_rejects_blank_id() {
        assert!(parse_record(r#"{"id":"  "}"#).is_err());
    }

    #[test]
    fn parse_record_rejects_missing_id() {
        assert!(parse_record(r#"{"status":"PASSED"}"#).is_err());
    }

    #[test]
    fn parse_page_requires_last_flag() {
        assert!(parse_page(r#"{"content": []}"#).is_err());
    }

    #[test]
    fn parse_statistics_tolerates_nulls() {
        let stats = parse_statistics(
            r#"{"totalRuns": 10, "passRate": 80.0, "mostUnstableTest": null,
                "dailyPassRateTrend": null, "topFailingTests": {"a.B.c": 2}}"#,
        )
        .unwrap();
        assert_eq!(stats.total_runs, 10);
        assert!(stats.daily_pass_rate_trend.is_empty());
        assert_eq!(stats.top_failing_tests.len(), 1);
    }

    #[test]
    fn oversized_response_rejected() {
        let big = " ".repeat(MAX_RESPONSE_SIZE + 1);
        let err = parse_page(&big).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn malformed_json_is_error() {
        assert!(parse_statistics("{not json").is_err());
    }
}
