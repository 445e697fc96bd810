//! Import job lifecycle.
//!
//! The teacher's `import::jsonl` returned a one-shot `ImportStats` computed
//! after the whole read finished. Bulk import here is async and
//! cancellable, so the stats widen into a stateful `ImportJob` record that
//! a caller can poll by `job_id` while `run_import` drives it forward in
//! batches, same line-by-line streaming idiom, parallel store calls per
//! batch instead of the teacher's sequential `import_batch` callback.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::MemoriaResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Pending,
    Running,
    Completed,
    Partial,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRecordError {
    pub line: Option<usize>,
    pub reason: String,
}

/// One parsed record awaiting storage: a raw row with `metadata_mapping`,
/// tags, source, and user_id already merged into `metadata` by the
/// format-specific parser.
#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub content: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportJob {
    pub job_id: Uuid,
    pub status: ImportStatus,
    pub total: u64,
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub duplicates: u64,
    pub errors: Vec<ImportRecordError>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ImportJob {
    pub fn new() -> Self {
        Self {
            job_id: Uuid::new_v4(),
            status: ImportStatus::Pending,
            total: 0,
            processed: 0,
            succeeded: 0,
            failed: 0,
            duplicates: 0,
            errors: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            ImportStatus::Completed
                | ImportStatus::Partial
                | ImportStatus::Failed
                | ImportStatus::Cancelled
        )
    }
}

impl Default for ImportJob {
    fn default() -> Self {
        Self::new()
    }
}

/// Options controlling how records are batched and merged before storage.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub deduplicate: bool,
    pub batch_size: usize,
    pub parallelism: usize,
    pub tags: Vec<String>,
    pub source: Option<String>,
    pub user_id: Option<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            deduplicate: true,
            batch_size: 100,
            parallelism: 8,
            tags: Vec::new(),
            source: None,
            user_id: None,
        }
    }
}

/// Outcome of storing a single record, decided by the caller (it owns the
/// `UnifiedStore`, so it alone knows whether a store call returned a
/// duplicate or a hard failure).
pub enum RecordOutcome {
    Stored,
    Duplicate,
    Failed(String),
}

/// A cheaply-cloned flag a caller flips to request cancellation of a
/// running import by `job_id`; checked by `run_import` at batch boundaries.
#[derive(Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drive `records` through `store_one` in batches of `options.batch_size`,
/// with up to `options.parallelism` concurrent stores per batch. Updates
/// `job` after every batch and checks `cancel` at batch boundaries; a
/// cancellation mid-batch still lets that batch's in-flight stores finish
/// (no rollback of memories already committed by the storage layer).
pub async fn run_import<F, Fut>(
    job: Arc<RwLock<ImportJob>>,
    mut records: impl Iterator<Item = Result<ImportRecord, ImportRecordError>>,
    options: ImportOptions,
    cancel: CancellationFlag,
    store_one: F,
) -> MemoriaResult<()>
where
    F: Fn(ImportRecord) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = RecordOutcome> + Send + 'static,
{
    {
        let mut job = job.write().await;
        job.status = ImportStatus::Running;
        job.started_at = Some(Utc::now());
    }

    let store_one = Arc::new(store_one);
    let mut any_progress = false;
    let mut any_failed = false;

    loop {
        let mut batch = Vec::with_capacity(options.batch_size);
        for item in records.by_ref().take(options.batch_size) {
            match item {
                Ok(record) => batch.push(record),
                Err(err) => {
                    let mut job = job.write().await;
                    job.total += 1;
                    job.processed += 1;
                    job.failed += 1;
                    any_failed = true;
                    job.errors.push(err);
                }
            }
        }

        if batch.is_empty() {
            break;
        }

        if cancel.is_cancelled() {
            let mut job = job.write().await;
            job.status = ImportStatus::Cancelled;
            job.finished_at = Some(Utc::now());
            return Ok(());
        }

        let parallelism = options.parallelism.max(1);
        let store_one = Arc::clone(&store_one);
        let outcomes: Vec<RecordOutcome> = stream::iter(batch)
            .map(|record| {
                let store_one = Arc::clone(&store_one);
                async move { store_one(record).await }
            })
            .buffer_unordered(parallelism)
            .collect()
            .await;

        let mut job = job.write().await;
        for outcome in outcomes {
            job.total += 1;
            job.processed += 1;
            match outcome {
                RecordOutcome::Stored => {
                    job.succeeded += 1;
                    any_progress = true;
                }
                RecordOutcome::Duplicate => {
                    job.duplicates += 1;
                    any_progress = true;
                }
                RecordOutcome::Failed(reason) => {
                    job.failed += 1;
                    any_failed = true;
                    job.errors.push(ImportRecordError { line: None, reason });
                }
            }
        }
    }

    let mut job = job.write().await;
    job.status = match (any_progress, any_failed) {
        (true, false) => ImportStatus::Completed,
        (true, true) => ImportStatus::Partial,
        (false, _) => ImportStatus::Failed,
    };
    job.finished_at = Some(Utc::now());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(content: &str) -> Result<ImportRecord, ImportRecordError> {
        Ok(ImportRecord {
            content: content.to_string(),
            metadata: HashMap::new(),
        })
    }

    #[tokio::test]
    async fn all_succeed_marks_completed() {
        let job = Arc::new(RwLock::new(ImportJob::new()));
        let records = vec![ok("a"), ok("b"), ok("c")];

        run_import(
            job.clone(),
            records.into_iter(),
            ImportOptions {
                batch_size: 2,
                parallelism: 2,
                ..Default::default()
            },
            CancellationFlag::new(),
            |_| async { RecordOutcome::Stored },
        )
        .await
        .unwrap();

        let job = job.read().await;
        assert_eq!(job.status, ImportStatus::Completed);
        assert_eq!(job.succeeded, 3);
        assert_eq!(job.total, 3);
    }

    #[tokio::test]
    async fn mixed_outcomes_mark_partial() {
        let job = Arc::new(RwLock::new(ImportJob::new()));
        let records = vec![ok("a"), ok("b"), ok("c"), ok("d")];

        run_import(
            job.clone(),
            records.into_iter(),
            ImportOptions::default(),
            CancellationFlag::new(),
            |record| async move {
                if record.content == "b" {
                    RecordOutcome::Duplicate
                } else if record.content == "c" {
                    RecordOutcome::Failed("boom".to_string())
                } else {
                    RecordOutcome::Stored
                }
            },
        )
        .await
        .unwrap();

        let job = job.read().await;
        assert_eq!(job.status, ImportStatus::Partial);
        assert_eq!(job.succeeded, 2);
        assert_eq!(job.duplicates, 1);
        assert_eq!(job.failed, 1);
    }

    #[tokio::test]
    async fn parse_errors_count_as_failed() {
        let job = Arc::new(RwLock::new(ImportJob::new()));
        let records = vec![
            ok("a"),
            Err(ImportRecordError {
                line: Some(2),
                reason: "malformed json".to_string(),
            }),
        ];

        run_import(
            job.clone(),
            records.into_iter(),
            ImportOptions::default(),
            CancellationFlag::new(),
            |_| async { RecordOutcome::Stored },
        )
        .await
        .unwrap();

        let job = job.read().await;
        assert_eq!(job.total, 2);
        assert_eq!(job.succeeded, 1);
        assert_eq!(job.failed, 1);
        assert_eq!(job.errors.len(), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_before_next_batch() {
        let job = Arc::new(RwLock::new(ImportJob::new()));
        let records = vec![ok("a"), ok("b"), ok("c"), ok("d")];
        let cancel = CancellationFlag::new();
        cancel.cancel();

        run_import(
            job.clone(),
            records.into_iter(),
            ImportOptions {
                batch_size: 2,
                ..Default::default()
            },
            cancel,
            |_| async { RecordOutcome::Stored },
        )
        .await
        .unwrap();

        let job = job.read().await;
        assert_eq!(job.status, ImportStatus::Cancelled);
    }

    #[tokio::test]
    async fn all_failed_marks_failed() {
        let job = Arc::new(RwLock::new(ImportJob::new()));
        let records = vec![ok("a")];

        run_import(
            job.clone(),
            records.into_iter(),
            ImportOptions::default(),
            CancellationFlag::new(),
            |_| async { RecordOutcome::Failed("nope".to_string()) },
        )
        .await
        .unwrap();

        let job = job.read().await;
        assert_eq!(job.status, ImportStatus::Failed);
    }
}
