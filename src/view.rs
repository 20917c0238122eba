//! Filtered projection of the loaded record list.
//!
//! [`RecordOrder`] is the authoritative newest-first sequence of ids. Filtering
//! never removes anything from it or from the store; it only decides which ids
//! are shown.

use crate::model::{RecordStatus, RecordSummary};
use crate::store::RecordStore;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Passed,
    Failed,
    /// Also shows BROKEN runs.
    Skipped,
}

impl StatusFilter {
    pub fn cycle(self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Passed,
            StatusFilter::Passed => StatusFilter::Failed,
            StatusFilter::Failed => StatusFilter::Skipped,
            StatusFilter::Skipped => StatusFilter::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Passed => "Passed",
            StatusFilter::Failed => "Failed",
            StatusFilter::Skipped => "Skipped",
        }
    }

    pub fn matches(self, status: RecordStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Passed => status == RecordStatus::Passed,
            StatusFilter::Failed => status == RecordStatus::Failed,
            StatusFilter::Skipped => matches!(status, RecordStatus::Skipped | RecordStatus::Broken),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Filter {
    pub status: StatusFilter,
    pub search: String,
}

impl Filter {
    pub fn is_active(&self) -> bool {
        self.status != StatusFilter::All || !self.search.trim().is_empty()
    }

    pub fn matches(&self, summary: &RecordSummary) -> bool {
        if !self.status.matches(summary.status) {
            return false;
        }
        let needle = self.search.trim();
        if needle.is_empty() {
            return true;
        }
        summary
            .method_label()
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }
}

/// Ordered, duplicate-free list of loaded record ids.
#[derive(Debug, Default)]
pub struct RecordOrder {
    ids: Vec<String>,
    members: HashSet<String>,
}

impl RecordOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page append. Returns `false` if the id was already listed.
    pub fn append_if_absent(&mut self, id: &str) -> bool {
        if !self.members.insert(id.to_string()) {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    /// Push prepend. An id already listed keeps its position.
    pub fn prepend_if_absent(&mut self, id: &str) -> bool {
        if !self.members.insert(id.to_string()) {
            return false;
        }
        self.ids.insert(0, id.to_string());
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.members.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    /// Nothing has been loaded yet.
    #[default]
    NotLoaded,
    /// Records are loaded but the filter hides all of them.
    NoResults,
    Rows(Vec<String>),
}

impl Projection {
    pub fn rows(&self) -> &[String] {
        match self {
            Projection::Rows(rows) => rows,
            Projection::NotLoaded | Projection::NoResults => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.rows().iter().position(|row| row == id)
    }
}

/// Visible subset of `order`, in list order. `loaded` tells an empty list that
/// was fetched apart from one that was never fetched.
pub fn project(order: &RecordOrder, store: &RecordStore, filter: &Filter, loaded: bool) -> Projection {
    if order.is_empty() && !loaded {
        return Projection::NotLoaded;
    }
    let rows: Vec<String> = order
        .ids()
        .iter()
        .filter(|id| {
            store
                .get(id)
                .is_some_and(|record| filter.matches(&record.summary))
        })
        .cloned()
        .collect();
    if rows.is_empty() {
        Projection::NoResults
    } else {
        Projection::Rows(rows)
    }
}
