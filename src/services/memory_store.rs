//! In-memory `ObjectStore` used by the test suite.
//!
//! Backed by a `BTreeMap` so listing order is deterministic. Supports a
//! configurable page size to exercise pagination, backdated inserts for
//! retention fixtures, and per-key fault injection to force transition
//! failures.

use crate::models::object::StoredObject;
use crate::services::store::{
    FetchedObject, ListPage, ObjectStore, PutOptions, StoreError, StoreResult,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::ops::Bound;
use std::sync::Mutex;

#[derive(Clone)]
struct MemoryEntry {
    body: Bytes,
    content_type: Option<String>,
    uploaded_at: DateTime<Utc>,
    custom_metadata: HashMap<String, String>,
}

pub struct MemoryObjectStore {
    entries: Mutex<std::collections::BTreeMap<String, MemoryEntry>>,
    fail_keys: Mutex<HashSet<String>>,
    fail_listing: Mutex<bool>,
    page_size: usize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::with_page_size(1000)
    }

    /// A store that returns at most `page_size` objects per listing page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            entries: Mutex::new(std::collections::BTreeMap::new()),
            fail_keys: Mutex::new(HashSet::new()),
            fail_listing: Mutex::new(false),
            page_size: page_size.max(1),
        }
    }

    /// Insert an object with an explicit upload instant. Test fixture seam;
    /// `put` always stamps the current time.
    pub fn insert_at(
        &self,
        key: &str,
        body: impl Into<Bytes>,
        content_type: Option<&str>,
        uploaded_at: DateTime<Utc>,
    ) {
        let mut entries = self.entries.lock().expect("entries lock");
        entries.insert(
            key.to_string(),
            MemoryEntry {
                body: body.into(),
                content_type: content_type.map(str::to_string),
                uploaded_at,
                custom_metadata: HashMap::new(),
            },
        );
    }

    /// Make every subsequent operation on `key` fail.
    pub fn fail_key(&self, key: &str) {
        self.fail_keys
            .lock()
            .expect("fail_keys lock")
            .insert(key.to_string());
    }

    /// Make every subsequent listing page fail.
    pub fn fail_listing(&self, fail: bool) {
        *self.fail_listing.lock().expect("fail_listing lock") = fail;
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().expect("entries lock").contains_key(key)
    }

    fn check_fault(&self, key: &str) -> StoreResult<()> {
        if self.fail_keys.lock().expect("fail_keys lock").contains(key) {
            return Err(StoreError::Unavailable(format!("injected failure on `{key}`")));
        }
        Ok(())
    }

    fn to_record(key: &str, entry: &MemoryEntry) -> StoredObject {
        StoredObject {
            key: key.to_string(),
            size_bytes: entry.body.len() as i64,
            content_type: entry.content_type.clone(),
            uploaded_at: entry.uploaded_at,
        }
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list(&self, prefix: Option<&str>, cursor: Option<&str>) -> StoreResult<ListPage> {
        if *self.fail_listing.lock().expect("fail_listing lock") {
            return Err(StoreError::Unavailable("injected listing failure".into()));
        }

        let entries = self.entries.lock().expect("entries lock");
        let lower = match cursor {
            Some(key) => Bound::Excluded(key.to_string()),
            None => Bound::Unbounded,
        };

        let mut objects = Vec::new();
        let mut next_cursor = None;
        for (key, entry) in entries.range((lower, Bound::<String>::Unbounded)) {
            if let Some(prefix) = prefix {
                if !key.starts_with(prefix) {
                    continue;
                }
            }
            if objects.len() == self.page_size {
                // More matches remain beyond this page.
                next_cursor = objects.last().map(|o: &StoredObject| o.key.clone());
                break;
            }
            objects.push(Self::to_record(key, entry));
        }

        Ok(ListPage {
            objects,
            next_cursor,
        })
    }

    async fn get(&self, key: &str) -> StoreResult<FetchedObject> {
        self.check_fault(key)?;
        let entries = self.entries.lock().expect("entries lock");
        let entry = entries
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        Ok(FetchedObject {
            object: Self::to_record(key, entry),
            custom_metadata: entry.custom_metadata.clone(),
            body: entry.body.clone(),
        })
    }

    async fn put(&self, key: &str, body: Bytes, opts: PutOptions) -> StoreResult<()> {
        self.check_fault(key)?;
        let mut entries = self.entries.lock().expect("entries lock");
        entries.insert(
            key.to_string(),
            MemoryEntry {
                body,
                content_type: opts.content_type,
                uploaded_at: Utc::now(),
                custom_metadata: opts.custom_metadata,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.check_fault(key)?;
        let mut entries = self.entries.lock().expect("entries lock");
        entries
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::list_all;

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let store = MemoryObjectStore::new();
        store
            .put("photos/a.jpg", Bytes::from_static(b"jpeg"), PutOptions::default())
            .await
            .expect("put");

        let fetched = store.get("photos/a.jpg").await.expect("get");
        assert_eq!(fetched.body.as_ref(), b"jpeg");
        assert_eq!(fetched.object.size_bytes, 4);

        store.delete("photos/a.jpg").await.expect("delete");
        assert!(matches!(
            store.get("photos/a.jpg").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn listing_paginates_to_exhaustion() {
        let store = MemoryObjectStore::with_page_size(2);
        for i in 0..5 {
            store.insert_at(&format!("photos/{i}.jpg"), "x", None, Utc::now());
        }

        let first = store.list(None, None).await.expect("first page");
        assert_eq!(first.objects.len(), 2);
        assert!(first.next_cursor.is_some());

        let all = list_all(&store).await.expect("list_all");
        assert_eq!(all.len(), 5);
        let keys: Vec<_> = all.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(
            keys,
            ["photos/0.jpg", "photos/1.jpg", "photos/2.jpg", "photos/3.jpg", "photos/4.jpg"]
        );
    }

    #[tokio::test]
    async fn prefix_filter_restricts_listing() {
        let store = MemoryObjectStore::new();
        store.insert_at("photos/a.jpg", "x", None, Utc::now());
        store.insert_at("videos/b.mp4", "x", None, Utc::now());

        let page = store.list(Some("videos/"), None).await.expect("list");
        assert_eq!(page.objects.len(), 1);
        assert_eq!(page.objects[0].key, "videos/b.mp4");
    }

    #[tokio::test]
    async fn injected_faults_surface_as_unavailable() {
        let store = MemoryObjectStore::new();
        store.insert_at("photos/a.jpg", "x", None, Utc::now());
        store.fail_key("photos/a.jpg");

        assert!(matches!(
            store.get("photos/a.jpg").await,
            Err(StoreError::Unavailable(_))
        ));

        store.fail_listing(true);
        assert!(matches!(
            store.list(None, None).await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
