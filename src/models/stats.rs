//! Aggregate storage statistics computed from a live bucket listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Object count plus byte total for one slice of the bucket.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UsageTotals {
    pub objects: u64,
    pub bytes: u64,
}

impl UsageTotals {
    /// Fold one object of `size` bytes into the totals.
    pub fn add(&mut self, size: u64) {
        self.objects += 1;
        self.bytes += size;
    }
}

/// Object counts bucketed by age.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AgeHistogram {
    /// Younger than 7 days.
    pub recent: UsageTotals,
    /// 7 to 30 days.
    pub month: UsageTotals,
    /// 30 to 90 days.
    pub quarter: UsageTotals,
    /// 90 to 365 days.
    pub year: UsageTotals,
    /// Older than a year.
    pub old: UsageTotals,
}

impl AgeHistogram {
    /// The bucket an object of `age_days` falls into.
    pub fn bucket_mut(&mut self, age_days: i64) -> &mut UsageTotals {
        if age_days < 7 {
            &mut self.recent
        } else if age_days < 30 {
            &mut self.month
        } else if age_days < 90 {
            &mut self.quarter
        } else if age_days <= 365 {
            &mut self.year
        } else {
            &mut self.old
        }
    }
}

/// Point-in-time view of bucket usage.
///
/// Computed from a fresh, full listing each time; never derived from cached
/// run records, so it is meaningful even before the first lifecycle run.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct StorageStats {
    /// When the listing was taken.
    pub computed_at: DateTime<Utc>,

    /// Everything in the bucket, control objects included.
    pub total: UsageTotals,

    /// Media not yet relocated into long-term storage.
    pub active: UsageTotals,

    /// Objects living under the long-term namespace.
    pub long_term: UsageTotals,

    /// Breakdown by top-level key namespace (`photos`, `videos`, ...).
    pub namespaces: BTreeMap<String, UsageTotals>,

    /// Object ages bucketed into recent/month/quarter/year/old.
    pub age_histogram: AgeHistogram,
}
