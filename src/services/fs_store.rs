//! Production `ObjectStore` backed by SQLite metadata and on-disk payloads.
//!
//! Payloads are sharded beneath `base_path/{shard}/{shard}/{key}` to keep
//! directory fan-out bounded; metadata (size, content type, upload instant,
//! custom metadata JSON) lives in a single `objects` table. Writes go through
//! a temp file and an atomic rename so a failed put never leaves a partial
//! payload under the final key.

use crate::models::object::StoredObject;
use crate::services::store::{
    FetchedObject, ListPage, ObjectStore, PutOptions, StoreError, StoreResult,
};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::{
    collections::HashMap,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_OBJECT_KEY_LEN: usize = 1024;
const DEFAULT_LIST_PAGE_SIZE: usize = 1000;

#[derive(FromRow)]
struct ObjectRow {
    key: String,
    size_bytes: i64,
    content_type: Option<String>,
    uploaded_at: DateTime<Utc>,
    custom_metadata: String,
}

/// Filesystem + SQLite object store.
#[derive(Clone)]
pub struct FsObjectStore {
    db: Arc<SqlitePool>,
    base_path: PathBuf,
    list_page_size: usize,
}

impl FsObjectStore {
    /// Create a store rooted at `base_path`, with metadata in `db`.
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
            list_page_size: DEFAULT_LIST_PAGE_SIZE,
        }
    }

    #[cfg(test)]
    fn with_page_size(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>, page: usize) -> Self {
        Self {
            db,
            base_path: base_path.into(),
            list_page_size: page.max(1),
        }
    }

    /// Basic key validation to avoid trivial path traversal vectors.
    ///
    /// Rejects empty keys, keys that begin with `/`, and keys containing
    /// `..`, control characters, or backslashes.
    fn ensure_key_safe(&self, key: &str) -> StoreResult<()> {
        if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
            return Err(StoreError::InvalidKey);
        }
        if key.starts_with('/') || key.contains("..") {
            return Err(StoreError::InvalidKey);
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(StoreError::InvalidKey);
        }
        Ok(())
    }

    /// Generate two-level shard identifiers for an object key.
    ///
    /// Uses MD5(key) and returns the first two bytes as lowercase hex
    /// strings (00-ff). Reduces file count per directory.
    fn object_shards(key: &str) -> (String, String) {
        let digest = md5::compute(key);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Construct a fully-qualified payload path for `key`.
    fn object_path(&self, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(key);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    /// Fetch a metadata row, mapping a missing row to `NotFound`.
    async fn fetch_row(&self, key: &str) -> StoreResult<ObjectRow> {
        sqlx::query_as::<_, ObjectRow>(
            "SELECT key, size_bytes, content_type, uploaded_at, custom_metadata
             FROM objects WHERE key = ?",
        )
        .bind(key)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StoreError::NotFound(key.to_string()),
            other => StoreError::Sqlx(other),
        })
    }

    /// Write payload bytes to a temp file, fsync, and rename into place.
    async fn write_payload(&self, file_path: &Path, body: &Bytes) -> StoreResult<()> {
        let parent = file_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| StoreError::Io(io::Error::other("object path missing parent directory")))?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let result: io::Result<()> = async {
            let mut file = File::create(&tmp_path).await?;
            file.write_all(body).await?;
            file.flush().await?;
            file.sync_all().await?;
            Ok(())
        }
        .await;
        if let Err(err) = result {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StoreError::Io(err));
            }
        }
        Ok(())
    }

    /// Recursively remove empty directories up to the store root.
    ///
    /// Stops on the first non-empty or missing directory.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.base_path) && current != self.base_path {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    /// List objects ordered by key, one bounded page at a time.
    ///
    /// The continuation cursor is the base64-encoded last key of the previous
    /// page; pages are fetched with `LIMIT page+1` to detect truncation.
    async fn list(&self, prefix: Option<&str>, cursor: Option<&str>) -> StoreResult<ListPage> {
        let after = cursor.map(decode_cursor).transpose()?;

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT key, size_bytes, content_type, uploaded_at FROM objects WHERE 1 = 1",
        );
        if let Some(prefix) = prefix {
            builder.push(" AND key LIKE ");
            builder.push_bind(format!("{}%", escape_like(prefix)));
            builder.push(" ESCAPE '!'");
        }
        if let Some(after) = &after {
            builder.push(" AND key > ");
            builder.push_bind(after);
        }
        builder.push(" ORDER BY key ASC LIMIT ");
        builder.push_bind((self.list_page_size + 1) as i64);

        let mut objects: Vec<StoredObject> =
            builder.build_query_as().fetch_all(&*self.db).await?;

        let next_cursor = if objects.len() > self.list_page_size {
            objects.truncate(self.list_page_size);
            objects.last().map(|o| encode_cursor(&o.key))
        } else {
            None
        };

        Ok(ListPage {
            objects,
            next_cursor,
        })
    }

    async fn get(&self, key: &str) -> StoreResult<FetchedObject> {
        self.ensure_key_safe(key)?;
        let row = self.fetch_row(key).await?;
        let custom_metadata: HashMap<String, String> = serde_json::from_str(&row.custom_metadata)?;

        let file_path = self.object_path(key);
        let body = fs::read(&file_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StoreError::NotFound(key.to_string())
            } else {
                StoreError::Io(err)
            }
        })?;

        Ok(FetchedObject {
            object: StoredObject {
                key: row.key,
                size_bytes: row.size_bytes,
                content_type: row.content_type,
                uploaded_at: row.uploaded_at,
            },
            custom_metadata,
            body: Bytes::from(body),
        })
    }

    /// Write payload then upsert the metadata row (overwrite semantics).
    ///
    /// A metadata failure removes the freshly written payload so disk and
    /// table stay consistent.
    async fn put(&self, key: &str, body: Bytes, opts: PutOptions) -> StoreResult<()> {
        self.ensure_key_safe(key)?;
        let file_path = self.object_path(key);
        self.write_payload(&file_path, &body).await?;

        let custom_metadata = serde_json::to_string(&opts.custom_metadata)?;
        let insert_result = sqlx::query(
            r#"
            INSERT INTO objects (key, size_bytes, content_type, uploaded_at, custom_metadata)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                size_bytes = excluded.size_bytes,
                content_type = excluded.content_type,
                uploaded_at = excluded.uploaded_at,
                custom_metadata = excluded.custom_metadata
            "#,
        )
        .bind(key)
        .bind(body.len() as i64)
        .bind(&opts.content_type)
        .bind(Utc::now())
        .bind(&custom_metadata)
        .execute(&*self.db)
        .await;

        match insert_result {
            Ok(_) => Ok(()),
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                Err(StoreError::Sqlx(err))
            }
        }
    }

    /// Hard-delete an object: metadata row, payload file, empty shard dirs.
    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.ensure_key_safe(key)?;
        let result = sqlx::query("DELETE FROM objects WHERE key = ?")
            .bind(key)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(key.to_string()));
        }

        let file_path = self.object_path(key);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed payload {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("payload {} already missing", file_path.display());
            }
            Err(err) => return Err(StoreError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent).await;
        }

        Ok(())
    }
}

fn encode_cursor(key: &str) -> String {
    general_purpose::STANDARD.encode(key)
}

fn decode_cursor(cursor: &str) -> StoreResult<String> {
    general_purpose::STANDARD
        .decode(cursor)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or(StoreError::InvalidCursor)
}

/// Escape `%`, `_`, and the escape character itself for a LIKE pattern.
fn escape_like(prefix: &str) -> String {
    prefix
        .replace('!', "!!")
        .replace('%', "!%")
        .replace('_', "!_")
}
