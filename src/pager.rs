//! Sequential page loader for the newest-first listing.
//!
//! At most one page request is outstanding. Scroll-driven callers may call
//! [`PageLoader::load_next`] as often as they like; every call made while a
//! request is in flight, or after the last page was seen, is a no-op.

use crate::api::{ApiError, ApiResult};
use crate::model::{RecordPage, RecordSummary};

pub const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// Zero-based index of the next page to request. Never decreases within a
    /// generation.
    pub next_page: u32,
    pub page_size: u32,
    pub exhausted: bool,
}

/// A page fetch the caller must perform, tagged with the loader generation it
/// was issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub generation: u64,
    pub page: u32,
    pub size: u32,
}

#[derive(Debug, PartialEq)]
pub enum PageOutcome {
    /// Page accepted; `records` are in server order. `initial` is set on the
    /// first successful page since construction or the last reset.
    Applied {
        records: Vec<RecordSummary>,
        initial: bool,
    },
    /// Cursor left where it was; the same page will be asked for again.
    Failed(ApiError),
    /// Response to a request issued before a reset. Ignored.
    Stale,
}

#[derive(Debug)]
pub struct PageLoader {
    cursor: PageCursor,
    generation: u64,
    in_flight: Option<PageRequest>,
    loaded_once: bool,
}

impl PageLoader {
    pub fn new(page_size: u32) -> Self {
        Self {
            cursor: PageCursor {
                next_page: 0,
                page_size: page_size.max(1),
                exhausted: false,
            },
            generation: 0,
            in_flight: None,
            loaded_once: false,
        }
    }

    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// `true` once at least one page has been applied in this generation.
    pub fn has_loaded(&self) -> bool {
        self.loaded_once
    }

    pub fn load_next(&mut self) -> Option<PageRequest> {
        if self.in_flight.is_some() || self.cursor.exhausted {
            return None;
        }
        let request = PageRequest {
            generation: self.generation,
            page: self.cursor.next_page,
            size: self.cursor.page_size,
        };
        tracing::debug!(page = request.page, size = request.size, "requesting page");
        self.in_flight = Some(request);
        Some(request)
    }

    pub fn complete(&mut self, request: PageRequest, result: ApiResult<RecordPage>) -> PageOutcome {
        if request.generation != self.generation {
            tracing::debug!(page = request.page, "dropping page from before reset");
            return PageOutcome::Stale;
        }
        self.in_flight = None;
        match result {
            Ok(page) => {
                if page.number != request.page {
                    tracing::warn!(
                        requested = request.page,
                        returned = page.number,
                        "server echoed a different page index"
                    );
                }
                self.cursor.next_page = request.page.saturating_add(1);
                self.cursor.exhausted = page.last;
                let initial = !self.loaded_once;
                self.loaded_once = true;
                PageOutcome::Applied {
                    records: page.content,
                    initial,
                }
            }
            Err(e) => {
                tracing::warn!(page = request.page, error = %e, "page load failed");
                PageOutcome::Failed(e)
            }
        }
    }

    /// Back to page zero under a new generation. Any request still in flight
    /// will come back as [`PageOutcome::Stale`].
    pub fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.cursor.next_page = 0;
        self.cursor.exhausted = false;
        self.in_flight = None;
        self.loaded_once = false;
    }
}
