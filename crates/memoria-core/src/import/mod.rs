//! Bulk import: parse CSV/JSON/JSONL payloads into memory-store requests,
//! processed as a cancellable, pollable [`ImportJob`].
//!
//! ```ignore
//! let job = Arc::new(RwLock::new(ImportJob::new()));
//! let records = parse_jsonl(&text, &options);
//! run_import(job.clone(), records, options, CancellationFlag::new(), |record| {
//!     let store = store.clone();
//!     async move { store.store_imported(record).await }
//! }).await?;
//! ```

pub mod csv;
pub mod job;
pub mod json;
pub mod jsonl;

pub use csv::parse_csv;
pub use job::{
    run_import, CancellationFlag, ImportJob, ImportOptions, ImportRecord, ImportRecordError,
    ImportStatus, RecordOutcome,
};
pub use json::parse_json;
pub use jsonl::{parse_jsonl, ImportableMemory};

/// The wire format of an import payload, selecting which parser to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportFormat {
    Csv,
    Json,
    Jsonl,
}
