//! Record of a single lifecycle run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one lifecycle pipeline execution.
///
/// Created fresh at the start of a run, appended to while objects are
/// processed, and immutable once persisted. The latest result overwrites the
/// well-known last-run record; every result is also appended to a capped
/// rolling history inside the bucket's control namespace.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LifecycleRunResult {
    /// When the run started.
    pub timestamp: DateTime<Utc>,

    /// Number of objects returned by the full bucket listing.
    pub scanned: u64,

    /// Number of objects relocated into the long-term namespace.
    pub compressed: u64,

    /// Number of objects deleted outright.
    pub deleted: u64,

    /// Number of per-object transition failures.
    pub errors: u64,

    /// Number of control-namespace and already-archived objects left alone.
    pub skipped: u64,

    /// Bytes saved by compression across the run. Legitimately zero while
    /// the identity compressor is in use.
    pub bytes_saved: u64,

    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,

    /// Ordered, human-readable log of transitions and failures.
    pub details: Vec<String>,
}

impl LifecycleRunResult {
    /// Create an empty result stamped with the run start time.
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            scanned: 0,
            compressed: 0,
            deleted: 0,
            errors: 0,
            skipped: 0,
            bytes_saved: 0,
            duration_ms: 0,
            details: Vec::new(),
        }
    }

    /// Record a successful archive transition.
    pub fn record_archive(&mut self, detail: String, saved: u64) {
        self.compressed += 1;
        self.bytes_saved += saved;
        self.details.push(detail);
    }

    /// Record a successful deletion.
    pub fn record_delete(&mut self, detail: String) {
        self.deleted += 1;
        self.details.push(detail);
    }

    /// Record a per-object failure. The run keeps going.
    pub fn record_error(&mut self, detail: String) {
        self.errors += 1;
        self.details.push(detail);
    }

    /// Record a control-namespace or already-archived object.
    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// One-line summary for log output.
    pub fn summary(&self) -> String {
        format!(
            "scanned: {}, compressed: {}, deleted: {}, skipped: {}, errors: {}, saved: {} bytes, took: {}ms",
            self.scanned,
            self.compressed,
            self.deleted,
            self.skipped,
            self.errors,
            self.bytes_saved,
            self.duration_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_result_is_empty() {
        let result = LifecycleRunResult::new(Utc::now());
        assert_eq!(result.scanned, 0);
        assert_eq!(result.compressed, 0);
        assert_eq!(result.deleted, 0);
        assert_eq!(result.errors, 0);
        assert_eq!(result.skipped, 0);
        assert!(result.details.is_empty());
    }

    #[test]
    fn record_methods_tally() {
        let mut result = LifecycleRunResult::new(Utc::now());

        result.record_archive("compressed a -> b".into(), 100);
        result.record_archive("compressed c -> d".into(), 0);
        result.record_delete("deleted e".into());
        result.record_error("error on f".into());
        result.record_skip();

        assert_eq!(result.compressed, 2);
        assert_eq!(result.bytes_saved, 100);
        assert_eq!(result.deleted, 1);
        assert_eq!(result.errors, 1);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.details.len(), 4);
    }
}
