//! In-memory report store
//!
//! Reports live for the lifetime of the process. Insertion order is kept so
//! that reports sharing a timestamp still list newest-first.

use crate::model::Report;
use crate::{CoreError, CoreResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Length of generated report ids
pub const REPORT_ID_LEN: usize = 12;

const MAX_ID_ATTEMPTS: usize = 8;

/// Fresh URL-safe report id: lowercase hex from a v4 UUID
pub fn generate_report_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(REPORT_ID_LEN);
    id
}

#[derive(Default)]
struct StoreInner {
    reports: HashMap<String, Arc<Report>>,
    order: Vec<Arc<Report>>,
}

pub struct ReportStore {
    inner: RwLock<StoreInner>,
    id_source: fn() -> String,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::with_id_source(generate_report_id)
    }

    /// Store with a custom id generator
    pub fn with_id_source(id_source: fn() -> String) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            id_source,
        }
    }

    /// Assign a fresh id, build the report with it and insert it, all under
    /// one write lock.
    pub fn create<F>(&self, build: F) -> CoreResult<Arc<Report>>
    where
        F: FnOnce(String) -> Report,
    {
        let mut inner = self.inner.write();

        let report_id = (0..MAX_ID_ATTEMPTS)
            .map(|_| (self.id_source)())
            .find(|id| !inner.reports.contains_key(id))
            .ok_or_else(|| {
                CoreError::Internal(format!(
                    "no unused report id after {} attempts",
                    MAX_ID_ATTEMPTS
                ))
            })?;

        let report = Arc::new(build(report_id.clone()));
        if report.report_id != report_id {
            return Err(CoreError::Internal(format!(
                "report built with id {} instead of assigned {}",
                report.report_id, report_id
            )));
        }

        inner.reports.insert(report_id, Arc::clone(&report));
        inner.order.push(Arc::clone(&report));
        Ok(report)
    }

    /// Insert a report that already carries its id. Existing ids are never
    /// overwritten.
    pub fn put(&self, report: Report) -> CoreResult<Arc<Report>> {
        let mut inner = self.inner.write();
        if inner.reports.contains_key(&report.report_id) {
            return Err(CoreError::Internal(format!(
                "report {} already exists",
                report.report_id
            )));
        }

        let report = Arc::new(report);
        inner
            .reports
            .insert(report.report_id.clone(), Arc::clone(&report));
        inner.order.push(Arc::clone(&report));
        Ok(report)
    }

    pub fn get(&self, report_id: &str) -> Option<Arc<Report>> {
        self.inner.read().reports.get(report_id).cloned()
    }

    /// Up to `limit` reports, newest `scan_date` first. Equal timestamps list
    /// the later insertion first.
    pub fn list(&self, limit: usize) -> Vec<Arc<Report>> {
        let mut reports: Vec<Arc<Report>> = self.inner.read().order.iter().rev().cloned().collect();
        // Stable sort keeps reverse insertion order among ties
        reports.sort_by(|a, b| b.scan_date.cmp(&a.scan_date));
        reports.truncate(limit);
        reports
    }

    pub fn len(&self) -> usize {
        self.inner.read().reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReportStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ReportSummary;
    use crate::model::ScanPayload;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn report(id: &str, scan_date: DateTime<Utc>) -> Report {
        Report {
            report_id: id.to_string(),
            server_ip: "127.0.0.1:27015".to_string(),
            gmod_version: "2024.1".to_string(),
            scan_date,
            summary: ReportSummary::from_payload(&ScanPayload::new("", "")),
            issues: Vec::new(),
            exploits: Vec::new(),
            files: Vec::new(),
            addons: Vec::new(),
            performance_profile: None,
        }
    }

    #[test]
    fn test_generate_report_id() {
        let id = generate_report_id();
        assert_eq!(id.len(), REPORT_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_report_id());
    }

    #[test]
    fn test_get_missing() {
        let store = ReportStore::new();
        assert!(store.get("does-not-exist").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_put_rejects_duplicate() {
        let store = ReportStore::new();
        let now = Utc::now();
        store.put(report("abc", now)).unwrap();
        assert!(store.put(report("abc", now)).is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_list_descending_with_limit() {
        let store = ReportStore::new();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        store.put(report("old", base)).unwrap();
        store.put(report("newest", base + Duration::minutes(10))).unwrap();
        store.put(report("middle", base + Duration::minutes(5))).unwrap();

        let ids: Vec<String> = store.list(10).iter().map(|r| r.report_id.clone()).collect();
        assert_eq!(ids, vec!["newest", "middle", "old"]);

        let limited = store.list(2);
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].report_id, "newest");
        assert!(store.list(0).is_empty());
    }

    #[test]
    fn test_list_ties_reverse_insertion() {
        let store = ReportStore::new();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        store.put(report("first", at)).unwrap();
        store.put(report("second", at)).unwrap();
        store.put(report("third", at)).unwrap();

        let ids: Vec<String> = store.list(3).iter().map(|r| r.report_id.clone()).collect();
        assert_eq!(ids, vec!["third", "second", "first"]);
    }

    #[test]
    fn test_create_collision_leaves_store_unchanged() {
        fn fixed() -> String {
            "sameid000000".to_string()
        }
        let store = ReportStore::with_id_source(fixed);
        let now = Utc::now();
        store.create(|id| report(&id, now)).unwrap();

        let err = store.create(|id| report(&id, now)).unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.list(10).len(), 1);
    }

    #[test]
    fn test_concurrent_creates() {
        let store = Arc::new(ReportStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store.create(|id| report(&id, Utc::now())).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 200);
        assert_eq!(store.list(500).len(), 200);
    }
}
