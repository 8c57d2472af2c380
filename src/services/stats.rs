//! Live storage statistics, computed from a fresh bucket listing.
//!
//! Deliberately independent of the transition pipeline: no run needs to have
//! ever happened, nothing is cached, and nothing is mutated.

use crate::models::stats::StorageStats;
use crate::services::retention::{CONTROL_PREFIX, is_archived_key};
use crate::services::store::{ObjectStore, StoreError, list_all};
use chrono::{DateTime, Utc};

/// Re-list the entire bucket and fold every object into aggregate totals.
///
/// Control objects count toward the grand total and their own namespace but
/// are neither active media nor long-term archives.
pub async fn compute(
    store: &dyn ObjectStore,
    now: DateTime<Utc>,
) -> Result<StorageStats, StoreError> {
    let objects = list_all(store).await?;

    let mut stats = StorageStats {
        computed_at: now,
        ..Default::default()
    };

    for object in &objects {
        let size = object.size_bytes.max(0) as u64;

        stats.total.add(size);

        let namespace = match object.key.split_once('/') {
            Some((namespace, _)) => namespace.to_string(),
            None => "(root)".to_string(),
        };
        stats.namespaces.entry(namespace).or_default().add(size);

        stats
            .age_histogram
            .bucket_mut(object.age_days(now))
            .add(size);

        if is_archived_key(&object.key) {
            stats.long_term.add(size);
        } else if !object.key.starts_with(CONTROL_PREFIX) {
            stats.active.add(size);
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_store::MemoryObjectStore;
    use chrono::Duration;

    fn days_ago(n: i64) -> DateTime<Utc> {
        Utc::now() - Duration::days(n)
    }

    #[tokio::test]
    async fn empty_bucket_yields_zero_stats() {
        let store = MemoryObjectStore::new();
        let stats = compute(&store, Utc::now()).await.expect("compute");

        assert_eq!(stats.total.objects, 0);
        assert_eq!(stats.total.bytes, 0);
        assert!(stats.namespaces.is_empty());
    }

    #[tokio::test]
    async fn totals_and_namespaces_reconcile() {
        let store = MemoryObjectStore::new();
        store.insert_at("photos/evt1/a.jpg", "aaaa", None, days_ago(2));
        store.insert_at("photos/evt2/b.jpg", "bb", None, days_ago(45));
        store.insert_at("videos/evt1/c.mp4", "cccccc", None, days_ago(120));
        store.insert_at("long-term/photos/old.webp", "ddd", None, days_ago(10));
        store.insert_at("_lifecycle/last-run.json", "{}", None, days_ago(1));

        let stats = compute(&store, Utc::now()).await.expect("compute");

        assert_eq!(stats.total.objects, 5);
        assert_eq!(stats.total.bytes, 17);
        assert_eq!(stats.active.objects, 3);
        assert_eq!(stats.long_term.objects, 1);
        assert_eq!(stats.long_term.bytes, 3);

        assert_eq!(stats.namespaces["photos"].objects, 2);
        assert_eq!(stats.namespaces["videos"].objects, 1);
        assert_eq!(stats.namespaces["long-term"].objects, 1);
        assert_eq!(stats.namespaces["_lifecycle"].objects, 1);

        // active + long-term + control covers everything exactly once.
        assert_eq!(
            stats.active.objects + stats.long_term.objects + 1,
            stats.total.objects
        );
    }

    #[tokio::test]
    async fn ages_land_in_the_right_buckets() {
        let store = MemoryObjectStore::new();
        store.insert_at("a", "x", None, days_ago(1));
        store.insert_at("b", "x", None, days_ago(15));
        store.insert_at("c", "x", None, days_ago(60));
        store.insert_at("d", "x", None, days_ago(200));
        store.insert_at("e", "x", None, days_ago(400));

        let stats = compute(&store, Utc::now()).await.expect("compute");

        assert_eq!(stats.age_histogram.recent.objects, 1);
        assert_eq!(stats.age_histogram.month.objects, 1);
        assert_eq!(stats.age_histogram.quarter.objects, 1);
        assert_eq!(stats.age_histogram.year.objects, 1);
        assert_eq!(stats.age_histogram.old.objects, 1);
        assert_eq!(stats.namespaces["(root)"].objects, 5);
    }
}
