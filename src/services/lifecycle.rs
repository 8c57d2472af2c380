//! The lifecycle pipeline: list, classify, transition, report.
//!
//! One run is a single sequential pass: the whole bucket is listed up front
//! (a listing failure aborts the run before anything is touched), every
//! object is classified, eligible objects are transitioned one at a time
//! with per-object error isolation, and the aggregated result is persisted
//! into the bucket's control namespace.

use crate::models::object::StoredObject;
use crate::models::run::LifecycleRunResult;
use crate::services::retention::{
    HISTORY_KEY, LAST_RUN_KEY, LifecycleAction, RetentionClass, RetentionPolicy, archived_key_for,
    classify,
};
use crate::services::store::{ObjectStore, PutOptions, StoreError, list_all};
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Number of run results retained in `history.json`, oldest first.
pub const HISTORY_LIMIT: usize = 30;

/// Metadata keys attached to relocated objects.
pub const META_ORIGINAL_KEY: &str = "originalKey";
pub const META_LIFECYCLE_ACTION: &str = "lifecycleAction";
pub const META_LIFECYCLE_DATE: &str = "lifecycleDate";
pub const META_ORIGINAL_SIZE: &str = "originalSize";

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("a lifecycle run is already in progress")]
    RunInProgress,
    #[error("bucket listing failed: {0}")]
    Listing(#[source] StoreError),
    #[error("failed to persist run record: {0}")]
    Reporting(#[source] StoreError),
}

/// Payload transform applied before archival.
///
/// The state machine does not care what happens to the bytes, only that the
/// relocated copy is written before the source is deleted. Real codecs slot
/// in here without touching the pipeline.
pub trait Compressor: Send + Sync {
    fn compress(&self, body: Bytes, content_type: Option<&str>) -> Bytes;
}

/// Relocate-and-tag placeholder: bytes pass through untouched, so the
/// reported savings are legitimately zero.
pub struct IdentityCompressor;

impl Compressor for IdentityCompressor {
    fn compress(&self, body: Bytes, _content_type: Option<&str>) -> Bytes {
        body
    }
}

/// Runs the retention pipeline and serves the persisted run records.
///
/// Shared as axum router state; cloning is cheap and all clones share the
/// single-run guard.
#[derive(Clone)]
pub struct LifecycleService {
    store: Arc<dyn ObjectStore>,
    policy: RetentionPolicy,
    compressor: Arc<dyn Compressor>,
    run_lock: Arc<Mutex<()>>,
}

impl LifecycleService {
    pub fn new(store: Arc<dyn ObjectStore>, policy: RetentionPolicy) -> Self {
        Self::with_compressor(store, policy, Arc::new(IdentityCompressor))
    }

    pub fn with_compressor(
        store: Arc<dyn ObjectStore>,
        policy: RetentionPolicy,
        compressor: Arc<dyn Compressor>,
    ) -> Self {
        Self {
            store,
            policy,
            compressor,
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The backing store, for read-only consumers (stats, readiness probe).
    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    /// Execute one full pipeline run.
    ///
    /// Overlapping invocations are rejected rather than serialized: the
    /// second caller gets `RunInProgress` immediately. Per-object transition
    /// failures are absorbed into the result; only a listing or reporting
    /// failure makes the run itself fail.
    pub async fn run_once(&self) -> Result<LifecycleRunResult, LifecycleError> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| LifecycleError::RunInProgress)?;

        let started = Instant::now();
        let now = Utc::now();

        let objects = list_all(self.store.as_ref())
            .await
            .map_err(LifecycleError::Listing)?;

        let mut result = LifecycleRunResult::new(now);
        result.scanned = objects.len() as u64;

        for object in &objects {
            match classify(&self.policy, now, object) {
                RetentionClass::Control | RetentionClass::Archived => result.record_skip(),
                RetentionClass::Active => {}
                RetentionClass::EligibleArchive => {
                    match self.archive_object(object, now).await {
                        Ok((new_key, action, saved)) => result.record_archive(
                            format!(
                                "{} {} -> {} (saved {} bytes)",
                                action.as_str(),
                                object.key,
                                new_key,
                                saved
                            ),
                            saved,
                        ),
                        Err(err) => {
                            warn!(key = %object.key, "archive transition failed: {err}");
                            result.record_error(format!("error archiving {}: {err}", object.key));
                        }
                    }
                }
                RetentionClass::EligibleDelete => match self.store.delete(&object.key).await {
                    Ok(()) => result.record_delete(format!(
                        "deleted {} ({} bytes, {} days old)",
                        object.key,
                        object.size_bytes,
                        object.age_days(now)
                    )),
                    Err(err) => {
                        warn!(key = %object.key, "delete transition failed: {err}");
                        result.record_error(format!("error deleting {}: {err}", object.key));
                    }
                },
            }
        }

        result.duration_ms = started.elapsed().as_millis() as u64;

        if let Err(err) = self.report(&result).await {
            // The object transitions already happened; only the audit record
            // is lost. Distinct from per-object errors.
            error!("lifecycle run completed but its record could not be persisted: {err}");
            return Err(LifecycleError::Reporting(err));
        }

        info!("lifecycle run finished ({})", result.summary());
        Ok(result)
    }

    /// Relocate one object into long-term storage.
    ///
    /// The relocated copy is written before the source is deleted, so a
    /// failure mid-transition can duplicate an object but never lose one.
    async fn archive_object(
        &self,
        object: &StoredObject,
        now: DateTime<Utc>,
    ) -> Result<(String, LifecycleAction, u64), StoreError> {
        let fetched = self.store.get(&object.key).await?;
        let (new_key, action) = archived_key_for(&object.key, object.content_type.as_deref());

        let original_size = fetched.body.len() as u64;
        let body = self
            .compressor
            .compress(fetched.body, object.content_type.as_deref());
        let saved = original_size.saturating_sub(body.len() as u64);

        let mut custom_metadata = HashMap::new();
        custom_metadata.insert(META_ORIGINAL_KEY.to_string(), object.key.clone());
        custom_metadata.insert(
            META_LIFECYCLE_ACTION.to_string(),
            action.as_str().to_string(),
        );
        custom_metadata.insert(
            META_LIFECYCLE_DATE.to_string(),
            now.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        custom_metadata.insert(META_ORIGINAL_SIZE.to_string(), original_size.to_string());

        let content_type = match action {
            LifecycleAction::Compressed => Some("image/webp".to_string()),
            LifecycleAction::Archived => fetched.object.content_type.clone(),
        };

        self.store
            .put(
                &new_key,
                body,
                PutOptions {
                    content_type,
                    custom_metadata,
                },
            )
            .await?;
        self.store.delete(&object.key).await?;

        Ok((new_key, action, saved))
    }

    /// Persist the run: overwrite the last-run record, then append to the
    /// capped history (read-modify-write, oldest evicted first).
    async fn report(&self, result: &LifecycleRunResult) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(result)?;
        self.store
            .put(LAST_RUN_KEY, Bytes::from(body), PutOptions::json())
            .await?;

        let mut history = self.history().await?;
        history.push(result.clone());
        if history.len() > HISTORY_LIMIT {
            let excess = history.len() - HISTORY_LIMIT;
            history.drain(..excess);
        }
        let body = serde_json::to_vec_pretty(&history)?;
        self.store
            .put(HISTORY_KEY, Bytes::from(body), PutOptions::json())
            .await
    }

    /// The last persisted run record, if any run has completed.
    pub async fn last_run(&self) -> Result<Option<LifecycleRunResult>, StoreError> {
        match self.store.get(LAST_RUN_KEY).await {
            Ok(fetched) => Ok(Some(serde_json::from_slice(&fetched.body)?)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Persisted run history, oldest first. Empty before the first run.
    pub async fn history(&self) -> Result<Vec<LifecycleRunResult>, StoreError> {
        match self.store.get(HISTORY_KEY).await {
            Ok(fetched) => Ok(serde_json::from_slice(&fetched.body)?),
            Err(StoreError::NotFound(_)) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }
}
