//! Object-store capability set consumed by the lifecycle pipeline.
//!
//! The pipeline only ever needs four operations: paginated `list`, `get`,
//! `put`, and `delete`. Everything is expressed against the [`ObjectStore`]
//! trait so the pipeline can run against the production filesystem store or
//! the in-memory store used in tests.

use crate::models::object::StoredObject;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error("invalid object key")]
    InvalidKey,
    #[error("invalid continuation cursor")]
    InvalidCursor,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One page of a bucket listing.
///
/// `next_cursor` is an opaque token; `Some` means the listing is not
/// exhausted and the cursor must be fed back into the next `list` call.
#[derive(Debug)]
pub struct ListPage {
    pub objects: Vec<StoredObject>,
    pub next_cursor: Option<String>,
}

/// Write options for `put`.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub custom_metadata: HashMap<String, String>,
}

impl PutOptions {
    /// Options for a JSON control record.
    pub fn json() -> Self {
        Self {
            content_type: Some("application/json".into()),
            custom_metadata: HashMap::new(),
        }
    }
}

/// A fetched object: listing record plus body and attached metadata.
#[derive(Debug)]
pub struct FetchedObject {
    pub object: StoredObject,
    pub custom_metadata: HashMap<String, String>,
    pub body: Bytes,
}

/// The four store operations the lifecycle worker relies on.
///
/// No versioning, conditional writes, or multipart; a backing store that can
/// list with a continuation cursor and get/put/delete by key is sufficient.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Return one page of objects, optionally restricted to a key prefix.
    async fn list(&self, prefix: Option<&str>, cursor: Option<&str>) -> StoreResult<ListPage>;

    /// Fetch an object's metadata and full body.
    async fn get(&self, key: &str) -> StoreResult<FetchedObject>;

    /// Write an object, overwriting any previous value under `key`.
    async fn put(&self, key: &str, body: Bytes, opts: PutOptions) -> StoreResult<()>;

    /// Remove an object. Deletion is final; there is no trash.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// Drive the continuation cursor to exhaustion and collect every object.
///
/// A page fetch error is returned as-is: an incomplete listing must never be
/// mistaken for the whole bucket, so callers treat any failure here as fatal.
pub async fn list_all(store: &dyn ObjectStore) -> StoreResult<Vec<StoredObject>> {
    let mut objects = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = store.list(None, cursor.as_deref()).await?;
        objects.extend(page.objects);
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(objects)
}
