//! CSV export.
//!
//! Same streaming shape as [`super::jsonl::export_jsonl`] (drain a
//! `Stream<Item = Memory>` into a writer, track per-item errors instead of
//! failing the whole export), using the `csv` crate's writer instead of
//! hand-rolled line formatting. Embeddings are serialized as a
//! semicolon-joined string column when `include_embeddings` is set, since
//! CSV has no native array type.

use futures::Stream;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::jsonl::{ExportStats, ExportableMemory};
use crate::error::MemoriaResult;
use crate::types::Memory;

const HEADER: &[&str] = &[
    "id",
    "content",
    "content_hash",
    "importance_score",
    "created_at",
    "updated_at",
    "metadata",
    "embedding",
];

pub async fn export_csv<W, S>(
    memories: S,
    include_embeddings: bool,
    include_metadata: bool,
    mut writer: W,
) -> MemoriaResult<ExportStats>
where
    W: AsyncWrite + Unpin,
    S: Stream<Item = Memory>,
{
    use futures::StreamExt;

    let mut stats = ExportStats::new();
    let mut memories = std::pin::pin!(memories);

    writer.write_all(HEADER.join(",").as_bytes()).await?;
    writer.write_all(b"\n").await?;

    while let Some(memory) = memories.next().await {
        stats.total += 1;
        let exportable = ExportableMemory::from_memory(&memory, include_embeddings, include_metadata);
        match serialize_row(&exportable) {
            Ok(row) => {
                if let Err(e) = writer.write_all(row.as_bytes()).await {
                    stats.errors.push(format!("write error for {}: {}", exportable.id, e));
                    continue;
                }
                stats.exported += 1;
            }
            Err(e) => stats.errors.push(format!("serialization error for {}: {}", exportable.id, e)),
        }
    }

    writer.flush().await?;
    Ok(stats)
}

fn serialize_row(memory: &ExportableMemory) -> Result<String, csv::Error> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    let metadata = serde_json::to_string(&memory.metadata).unwrap_or_default();
    let embedding = memory
        .embedding
        .as_ref()
        .map(|v| v.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(";"))
        .unwrap_or_default();

    writer.write_record([
        memory.id.as_str(),
        memory.content.as_str(),
        memory.content_hash.as_str(),
        &memory.importance_score.to_string(),
        memory.created_at.as_str(),
        memory.updated_at.as_str(),
        &metadata,
        &embedding,
    ])?;

    Ok(String::from_utf8(writer.into_inner().map_err(|e| e.into_error())?).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use futures::stream;

    #[tokio::test]
    async fn export_csv_writes_header_and_rows() {
        let memory = Memory::new("hello, world", vec![0.1], Utc::now());
        let mut output = Vec::new();
        let stats = export_csv(stream::iter(vec![memory]), false, true, &mut output)
            .await
            .unwrap();

        assert_eq!(stats.exported, 1);
        let text = String::from_utf8(output).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), HEADER.join(","));
        assert!(lines.next().unwrap().contains("hello"));
    }

    #[tokio::test]
    async fn export_csv_embedding_column_present_when_requested() {
        let memory = Memory::new("x", vec![1.0, 2.0], Utc::now());
        let mut output = Vec::new();
        export_csv(stream::iter(vec![memory]), true, true, &mut output)
            .await
            .unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("1;2"));
    }
}
