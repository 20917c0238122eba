//! Boundary to the reporting service.
//!
//! [`DashboardApi`] is the seam between the engine and the network: the
//! runtime holds an `Arc<dyn DashboardApi>`, production uses
//! [`http::HttpApi`], tests substitute in-process fakes.

pub mod http;

use crate::model::{DashboardStatistics, Record, RecordPage};
use async_trait::async_trait;

/// Failure of a single request. `NotFound` is kept apart from the other
/// variants because the detail view renders it differently.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("record {0} not found")]
    NotFound(String),
    #[error("server returned HTTP {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    Decode(String),
    /// The task running the request panicked.
    #[error("request crashed: {0}")]
    Crashed(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// Newest-first listing page. `page` is zero-based.
    async fn fetch_page(&self, page: u32, size: u32) -> ApiResult<RecordPage>;
    async fn fetch_record(&self, id: &str) -> ApiResult<Record>;
    /// `cache_buster` is sent as a throwaway query parameter so no
    /// intermediary serves a stale copy.
    async fn fetch_statistics(&self, cache_buster: i64) -> ApiResult<DashboardStatistics>;
    async fn submit_feedback(&self, analysis_id: &str, correct: bool) -> ApiResult<()>;
    async fn delete_all(&self) -> ApiResult<()>;
    /// Asks the server to fabricate a demo run and returns it.
    async fn create_demo(&self) -> ApiResult<Record>;
}
