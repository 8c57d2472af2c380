//! Represents a single media object stored in the bucket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One object (blob) in the media bucket.
///
/// This is the listing record: metadata only, never the content bytes.
/// The key is a path-like identifier (e.g. `photos/evt1/a.jpg`) and uniquely
/// addresses exactly one object at any instant. There is no rename
/// primitive; relocation is put-new-key followed by delete-old-key.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct StoredObject {
    /// Object key (path-like identifier within the bucket).
    pub key: String,

    /// Size in bytes.
    pub size_bytes: i64,

    /// Content type (MIME type), when the uploader supplied one.
    pub content_type: Option<String>,

    /// When the object was uploaded. Source of truth for age.
    pub uploaded_at: DateTime<Utc>,
}

impl StoredObject {
    /// Whole days elapsed between upload and `now`.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.uploaded_at).num_days()
    }
}
