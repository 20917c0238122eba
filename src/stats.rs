//! Aggregate statistics refresh cycle.
//!
//! Statistics are never cached on the client: every refresh carries a fresh
//! cache-busting value. Refreshes requested while one is outstanding collapse
//! into a single follow-up so the last trigger is always reflected.

use crate::api::{ApiError, ApiResult};
use crate::model::DashboardStatistics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsRequest {
    pub cache_buster: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatsOutcome {
    Updated,
    /// Nothing was ever loaded; the stats region shows the error inline.
    FailedInline(ApiError),
    /// Earlier statistics stay on screen; only a toast is raised.
    FailedKeptLastGood(ApiError),
}

/// What the stats region should draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatsView<'a> {
    NotLoaded,
    Loading,
    Ready(&'a DashboardStatistics),
    Error(&'a str),
}

#[derive(Debug, Default)]
pub struct StatsLoader {
    last_good: Option<DashboardStatistics>,
    error: Option<String>,
    in_flight: bool,
    follow_up: bool,
    last_buster: i64,
    refresh_count: u64,
}

impl StatsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    /// Number of requests issued so far.
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }

    pub fn last_good(&self) -> Option<&DashboardStatistics> {
        self.last_good.as_ref()
    }

    pub fn view(&self) -> StatsView<'_> {
        if let Some(stats) = &self.last_good {
            return StatsView::Ready(stats);
        }
        if self.in_flight {
            return StatsView::Loading;
        }
        match &self.error {
            Some(message) => StatsView::Error(message),
            None => StatsView::NotLoaded,
        }
    }

    /// `now_millis` is the wall clock; the cache buster is kept strictly
    /// increasing even if the clock is not.
    pub fn refresh(&mut self, now_millis: i64) -> Option<StatsRequest> {
        if self.in_flight {
            self.follow_up = true;
            return None;
        }
        Some(self.issue(now_millis))
    }

    pub fn complete(&mut self, result: ApiResult<DashboardStatistics>) -> StatsOutcome {
        self.in_flight = false;
        match result {
            Ok(stats) => {
                self.last_good = Some(stats);
                self.error = None;
                StatsOutcome::Updated
            }
            Err(e) if self.last_good.is_some() => {
                tracing::warn!(error = %e, "stats refresh failed, keeping previous statistics");
                StatsOutcome::FailedKeptLastGood(e)
            }
            Err(e) => {
                tracing::warn!(error = %e, "stats refresh failed");
                self.error = Some(e.to_string());
                StatsOutcome::FailedInline(e)
            }
        }
    }

    /// Issues the coalesced follow-up, if a refresh was requested while the
    /// previous one was outstanding.
    pub fn take_follow_up(&mut self, now_millis: i64) -> Option<StatsRequest> {
        if self.in_flight || !self.follow_up {
            return None;
        }
        Some(self.issue(now_millis))
    }

    /// Forget everything, e.g. after all records were deleted.
    pub fn reset(&mut self) {
        self.last_good = None;
        self.error = None;
    }

    fn issue(&mut self, now_millis: i64) -> StatsRequest {
        self.in_flight = true;
        self.follow_up = false;
        self.refresh_count += 1;
        self.last_buster = now_millis.max(self.last_buster.saturating_add(1));
        StatsRequest {
            cache_buster: self.last_buster,
        }
    }
}
