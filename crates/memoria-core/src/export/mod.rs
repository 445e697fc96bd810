//! Export utilities for memory data: streaming JSON Lines, CSV, and an
//! optional GDPR envelope wrapper around either.
//!
//! ```ignore
//! let stats = export_jsonl(memory_stream, false, true, file).await?;
//! println!("exported {}/{}", stats.exported, stats.total);
//! ```

pub mod csv;
pub mod gdpr;
pub mod jsonl;

pub use csv::export_csv;
pub use gdpr::{wrap_gdpr, DataCategories, DataCategory, DataExport, GdprEnvelope, GdprMetadata};
pub use jsonl::{export_jsonl, ExportStats, ExportableMemory};

/// The wire format of an export response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Json,
    Csv,
}
