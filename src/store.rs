//! Identity-keyed record cache.
//!
//! The store is the single answer to "do we already have this record's detail".
//! It also remembers which ids have a detail fetch outstanding, so at most one
//! network request per id is ever in flight. Those marks outlive
//! [`RecordStore::clear`]: a fetch issued before a full reload is still on
//! the wire, and its answer is discarded when it lands.

use crate::api::ApiResult;
use crate::model::Record;
use std::collections::HashMap;

/// What happened to the cache when a record was put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    /// First time this id was seen.
    Inserted,
    /// A summary-only entry gained its full detail.
    Upgraded,
    /// Summary-only entry replaced by a newer summary.
    Refreshed,
    /// Existing entry already had detail; the incoming value was dropped.
    Kept,
}

/// Answer to "I want this record's detail".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailFetch {
    /// Detail is cached, render it now.
    Cached,
    /// Another fetch for this id is outstanding; its completion serves this
    /// request too.
    Pending,
    /// Nothing cached or outstanding: issue exactly one fetch.
    Issue,
}

#[derive(Debug, Default)]
pub struct RecordStore {
    records: HashMap<String, Record>,
    /// Outstanding detail fetches and the generation each was issued under.
    in_flight: HashMap<String, u64>,
    generation: u64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn has(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn has_detail(&self, id: &str) -> bool {
        self.records.get(id).is_some_and(Record::has_detail)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Merge by id. Cached detail is immutable for the session, full beats
    /// summary-only, and between two summaries the later one wins.
    pub fn put(&mut self, record: Record) -> Merge {
        match self.records.get_mut(record.id()) {
            None => {
                self.records.insert(record.id().to_string(), record);
                Merge::Inserted
            }
            Some(existing) if existing.has_detail() => Merge::Kept,
            Some(existing) => {
                let merge = if record.has_detail() {
                    Merge::Upgraded
                } else {
                    Merge::Refreshed
                };
                *existing = record;
                merge
            }
        }
    }

    pub fn begin_detail_fetch(&mut self, id: &str) -> DetailFetch {
        if self.has_detail(id) {
            DetailFetch::Cached
        } else if self.in_flight.contains_key(id) {
            DetailFetch::Pending
        } else {
            self.in_flight.insert(id.to_string(), self.generation);
            DetailFetch::Issue
        }
    }

    pub fn is_fetching(&self, id: &str) -> bool {
        self.in_flight.contains_key(id)
    }

    /// Settles the outstanding fetch for `id`. Only a successful result is
    /// cached; errors (including not-found) leave the store as it was.
    /// Returns `None` for a fetch issued before the last [`clear`], whose
    /// result is dropped unseen.
    ///
    /// [`clear`]: RecordStore::clear
    pub fn finish_detail_fetch(
        &mut self,
        id: &str,
        result: ApiResult<Record>,
    ) -> Option<ApiResult<Merge>> {
        let issued = self.in_flight.remove(id);
        if issued.is_some_and(|generation| generation != self.generation) {
            tracing::debug!(id, "dropping detail fetched before reload");
            return None;
        }
        Some(result.map(|record| {
            if record.id() != id {
                tracing::warn!(requested = id, returned = record.id(), "detail id mismatch");
            }
            self.put(record)
        }))
    }

    /// Forgets every record. Outstanding fetches stay marked until they
    /// land, so none is issued twice. Only used by a full reload.
    pub fn clear(&mut self) {
        self.records.clear();
        self.generation = self.generation.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::model::{RecordDetail, RecordStatus, RecordSummary};

    fn summary(id: &str, method: &str) -> RecordSummary {
        RecordSummary {
            id: id.to_string(),
            status: RecordStatus::Passed,
            test_class: None,
            test_method: Some(method.to_string()),
            timestamp: None,
            configuration: None,
        }
    }

    fn full(id: &str, method: &str) -> Record {
        Record::full(summary(id, method), RecordDetail::default())
    }

    #[test]
    fn put_then_get() {
        let mut store = RecordStore::new();
        assert_eq!(store.put(Record::summary_only(summary("a", "m"))), Merge::Inserted);
        assert!(store.has("a"));
        assert!(!store.has_detail("a"));
        assert_eq!(store.get("a").unwrap().summary.method_label(), "m");
    }

    #[test]
    fn full_detail_wins_over_summary() {
        let mut store = RecordStore::new();
        store.put(full("a", "pushed"));
        assert_eq!(store.put(Record::summary_only(summary("a", "paged"))), Merge::Kept);
        assert!(store.has_detail("a"));
        assert_eq!(store.get("a").unwrap().summary.method_label(), "pushed");
    }

    #[test]
    fn summary_upgraded_by_full() {
        let mut store = RecordStore::new();
        store.put(Record::summary_only(summary("a", "m")));
        assert_eq!(store.put(full("a", "m")), Merge::Upgraded);
        assert!(store.has_detail("a"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn cached_detail_is_immutable() {
        let mut store = RecordStore::new();
        store.put(full("a", "first"));
        assert_eq!(store.put(full("a", "second")), Merge::Kept);
        assert_eq!(store.get("a").unwrap().summary.method_label(), "first");
    }

    #[test]
    fn summaries_last_write_wins() {
        let mut store = RecordStore::new();
        store.put(Record::summary_only(summary("a", "old")));
        assert_eq!(store.put(Record::summary_only(summary("a", "new"))), Merge::Refreshed);
        assert_eq!(store.get("a").unwrap().summary.method_label(), "new");
    }

    #[test]
    fn second_detail_request_reuses_in_flight_fetch() {
        let mut store = RecordStore::new();
        assert_eq!(store.begin_detail_fetch("a"), DetailFetch::Issue);
        assert_eq!(store.begin_detail_fetch("a"), DetailFetch::Pending);
        assert!(store.is_fetching("a"));

        assert_eq!(
            store.finish_detail_fetch("a", Ok(full("a", "m"))),
            Some(Ok(Merge::Upgraded))
        );
        assert!(!store.is_fetching("a"));
        assert_eq!(store.begin_detail_fetch("a"), DetailFetch::Cached);
    }

    #[test]
    fn summary_only_entry_still_needs_fetch() {
        let mut store = RecordStore::new();
        store.put(Record::summary_only(summary("a", "m")));
        assert_eq!(store.begin_detail_fetch("a"), DetailFetch::Issue);
    }

    #[test]
    fn not_found_leaves_no_entry() {
        let mut store = RecordStore::new();
        store.begin_detail_fetch("missing-1");
        let result = store.finish_detail_fetch(
            "missing-1",
            Err(ApiError::NotFound("missing-1".into())),
        );
        assert!(result.unwrap().unwrap_err().is_not_found());
        assert!(!store.has("missing-1"));
        assert!(!store.is_fetching("missing-1"));
    }

    #[test]
    fn failed_fetch_keeps_summary_and_allows_retry() {
        let mut store = RecordStore::new();
        store.put(Record::summary_only(summary("a", "m")));
        store.begin_detail_fetch("a");
        let _ = store.finish_detail_fetch("a", Err(ApiError::Status(500)));
        assert!(store.has("a"));
        assert!(!store.has_detail("a"));
        assert_eq!(store.begin_detail_fetch("a"), DetailFetch::Issue);
    }

    #[test]
    fn clear_forgets_records_but_not_outstanding_fetches() {
        let mut store = RecordStore::new();
        store.put(full("a", "m"));
        store.begin_detail_fetch("b");
        store.clear();
        assert!(store.is_empty());
        assert!(store.is_fetching("b"));
        assert_eq!(store.begin_detail_fetch("b"), DetailFetch::Pending);
    }

    #[test]
    fn fetch_from_before_clear_is_dropped() {
        let mut store = RecordStore::new();
        store.begin_detail_fetch("a");
        store.clear();

        assert_eq!(store.finish_detail_fetch("a", Ok(full("a", "m"))), None);
        assert!(!store.has("a"));
        assert!(!store.is_fetching("a"));
        assert_eq!(store.begin_detail_fetch("a"), DetailFetch::Issue);

        assert_eq!(
            store.finish_detail_fetch("a", Ok(full("a", "m"))),
            Some(Ok(Merge::Inserted))
        );
        assert!(store.has_detail("a"));
    }
}
