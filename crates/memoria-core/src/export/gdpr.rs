//! GDPR-compliant export envelope.
//!
//! When a caller requests `gdpr_compliant=true`, the exported records are
//! wrapped in a fixed envelope identifying the subject and export metadata,
//! instead of a bare array/stream of records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::jsonl::ExportableMemory;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataCategory {
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataExport {
    pub user_id: String,
    pub export_date: DateTime<Utc>,
    pub data_categories: DataCategories,
    pub memories: Vec<ExportableMemory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataCategories {
    pub memories: DataCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GdprEnvelope {
    pub data_export: DataExport,
    pub metadata: GdprMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GdprMetadata {
    pub export_reason: String,
}

/// Wrap already-exported records in the fixed GDPR envelope shape.
pub fn wrap_gdpr(user_id: impl Into<String>, export_date: DateTime<Utc>, memories: Vec<ExportableMemory>) -> GdprEnvelope {
    let count = memories.len();
    GdprEnvelope {
        data_export: DataExport {
            user_id: user_id.into(),
            export_date,
            data_categories: DataCategories {
                memories: DataCategory { count },
            },
            memories,
        },
        metadata: GdprMetadata {
            export_reason: "data subject access request".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn envelope_counts_memories() {
        let memory = ExportableMemory {
            id: "1".to_string(),
            content: "hi".to_string(),
            content_hash: "abc".to_string(),
            embedding: None,
            metadata: Default::default(),
            importance_score: 0.5,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        };
        let envelope = wrap_gdpr("user-1", Utc::now(), vec![memory]);
        assert_eq!(envelope.data_export.data_categories.memories.count, 1);
        assert_eq!(envelope.data_export.user_id, "user-1");
    }
}
