use super::{ApiError, ApiResult, DashboardApi};
use crate::model::{DashboardStatistics, FeedbackRequest, Record, RecordPage};
use crate::parser;
use async_trait::async_trait;
use color_eyre::eyre::{eyre, Result};
use reqwest::{RequestBuilder, StatusCode};
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Listing order the dashboard relies on: newest first.
const LIST_SORT: &str = "timestamp,desc";

pub struct HttpApi {
    client: reqwest::Client,
    base: Url,
}

impl HttpApi {
    pub fn new(base: Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {e}"))?;
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Transport(format!("{} cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn page_url(&self, page: u32, size: u32) -> ApiResult<Url> {
        let mut url = self.endpoint(&["api", "v1", "tests"])?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("size", &size.to_string())
            .append_pair("sort", LIST_SORT);
        Ok(url)
    }

    fn statistics_url(&self, cache_buster: i64) -> ApiResult<Url> {
        let mut url = self.endpoint(&["api", "v1", "statistics"])?;
        url.query_pairs_mut()
            .append_pair("_", &cache_buster.to_string());
        Ok(url)
    }

    /// Sends the request and returns the body of a 2xx response. A 404 turns
    /// into [`ApiError::NotFound`] only when `missing_id` names what was asked for.
    async fn send(&self, request: RequestBuilder, missing_id: Option<&str>) -> ApiResult<String> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = missing_id {
                return Err(ApiError::NotFound(id.to_string()));
            }
        }
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))
    }
}

fn decode<T>(parsed: Result<T>) -> ApiResult<T> {
    parsed.map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl DashboardApi for HttpApi {
    async fn fetch_page(&self, page: u32, size: u32) -> ApiResult<RecordPage> {
        let url = self.page_url(page, size)?;
        tracing::debug!(%url, "fetching page");
        let body = self.send(self.client.get(url), None).await?;
        decode(parser::parse_page(&body))
    }

    async fn fetch_record(&self, id: &str) -> ApiResult<Record> {
        let url = self.endpoint(&["api", "v1", "tests", id])?;
        tracing::debug!(%url, "fetching record detail");
        let body = self.send(self.client.get(url), Some(id)).await?;
        decode(parser::parse_record(&body))
    }

    async fn fetch_statistics(&self, cache_buster: i64) -> ApiResult<DashboardStatistics> {
        let url = self.statistics_url(cache_buster)?;
        let body = self.send(self.client.get(url), None).await?;
        decode(parser::parse_statistics(&body))
    }

    async fn submit_feedback(&self, analysis_id: &str, correct: bool) -> ApiResult<()> {
        let url = self.endpoint(&["api", "v1", "analysis", analysis_id, "feedback"])?;
        let body = FeedbackRequest {
            is_ai_suggestion_correct: correct,
        };
        self.send(self.client.post(url).json(&body), None).await?;
        Ok(())
    }

    async fn delete_all(&self) -> ApiResult<()> {
        let url = self.endpoint(&["api", "v1", "tests", "all"])?;
        self.send(self.client.delete(url), None).await?;
        Ok(())
    }

    async fn create_demo(&self) -> ApiResult<Record> {
        let url = self.endpoint(&["demo", "create"])?;
        let body = self.send(self.client.post(url), None).await?;
        decode(parser::parse_record(&body))
    }
}
