//! JSON Lines export for memory data.
//!
//! Grounded on the teacher's `export::jsonl::export_jsonl`: a
//! `futures::Stream<Item = Memory>` drained into a `BufWriter`, one JSON
//! object per line. Generalized here by dropping the FSRS/dual-strength/
//! category/is_key fields the teacher's `ExportableMemory` carried (this
//! data model has none of those) and adding an `include_embeddings` toggle.

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use crate::error::MemoriaResult;
use crate::types::Memory;

/// Statistics from an export operation.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ExportStats {
    pub total: u64,
    pub exported: u64,
    pub errors: Vec<String>,
}

impl ExportStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.total == self.exported
    }
}

/// The on-the-wire shape of one exported memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportableMemory {
    pub id: String,
    pub content: String,
    pub content_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
    pub importance_score: f32,
    pub created_at: String,
    pub updated_at: String,
}

impl ExportableMemory {
    pub fn from_memory(memory: &Memory, include_embeddings: bool, include_metadata: bool) -> Self {
        Self {
            id: memory.id.to_string(),
            content: memory.content.clone(),
            content_hash: memory.content_hash.clone(),
            embedding: include_embeddings.then(|| memory.embedding.clone()),
            metadata: if include_metadata {
                memory.metadata.clone()
            } else {
                HashMap::new()
            },
            importance_score: memory.importance_score,
            created_at: memory.created_at.to_rfc3339(),
            updated_at: memory.updated_at.to_rfc3339(),
        }
    }
}

/// Export memories to JSON Lines format: one JSON object per line, streamed
/// from `memories` into `writer` via a buffered writer.
pub async fn export_jsonl<W, S>(
    memories: S,
    include_embeddings: bool,
    include_metadata: bool,
    writer: W,
) -> MemoriaResult<ExportStats>
where
    W: AsyncWrite + Unpin,
    S: Stream<Item = Memory>,
{
    use futures::StreamExt;

    let mut stats = ExportStats::new();
    let mut writer = BufWriter::new(writer);
    let mut memories = std::pin::pin!(memories);

    while let Some(memory) = memories.next().await {
        stats.total += 1;
        let exportable = ExportableMemory::from_memory(&memory, include_embeddings, include_metadata);

        match serde_json::to_string(&exportable) {
            Ok(json) => {
                if let Err(e) = writer.write_all(json.as_bytes()).await {
                    stats.errors.push(format!("write error for {}: {}", exportable.id, e));
                    continue;
                }
                if let Err(e) = writer.write_all(b"\n").await {
                    stats.errors.push(format!("write newline error for {}: {}", exportable.id, e));
                    continue;
                }
                stats.exported += 1;
            }
            Err(e) => {
                stats.errors.push(format!("serialization error for {}: {}", exportable.id, e));
            }
        }
    }

    if let Err(e) = writer.flush().await {
        stats.errors.push(format!("final flush error: {}", e));
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use futures::stream;

    fn sample_memory(content: &str) -> Memory {
        Memory::new(content, vec![0.1, 0.2], Utc::now())
    }

    #[tokio::test]
    async fn export_jsonl_basic() {
        let memories = vec![sample_memory("first"), sample_memory("second")];
        let mut output = Vec::new();
        let stats = export_jsonl(stream::iter(memories), false, true, &mut output)
            .await
            .unwrap();

        assert_eq!(stats.total, 2);
        assert_eq!(stats.exported, 2);
        assert!(stats.errors.is_empty());

        let content = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let parsed: ExportableMemory = serde_json::from_str(line).unwrap();
            assert!(parsed.embedding.is_none());
        }
    }

    #[tokio::test]
    async fn export_jsonl_includes_embedding_when_requested() {
        let mut output = Vec::new();
        let stats = export_jsonl(stream::iter(vec![sample_memory("x")]), true, true, &mut output)
            .await
            .unwrap();
        assert_eq!(stats.exported, 1);

        let content = String::from_utf8(output).unwrap();
        let parsed: ExportableMemory = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(parsed.embedding, Some(vec![0.1, 0.2]));
    }

    #[tokio::test]
    async fn export_jsonl_empty_stream() {
        let memories: Vec<Memory> = vec![];
        let mut output = Vec::new();
        let stats = export_jsonl(stream::iter(memories), false, true, &mut output)
            .await
            .unwrap();

        assert_eq!(stats.total, 0);
        assert!(stats.is_success());
        assert!(output.is_empty());
    }
}
