//! Whole-document JSON import parsing.
//!
//! Reads a single JSON object with a top-level `memories` array, each
//! element shaped like [`super::jsonl::ImportableMemory`]. Unlike JSONL and
//! CSV this format can't report a useful line number on failure — a
//! malformed top-level document fails the whole import rather than one row.

use serde::Deserialize;

use super::job::{ImportOptions, ImportRecord, ImportRecordError};
use super::jsonl::ImportableMemory;

#[derive(Debug, Deserialize)]
struct ImportDocument {
    memories: Vec<ImportableMemory>,
}

/// Parse `text` as a `{"memories": [...]}` document.
pub fn parse_json(
    text: &str,
    options: &ImportOptions,
) -> Result<Vec<Result<ImportRecord, ImportRecordError>>, ImportRecordError> {
    let document: ImportDocument = serde_json::from_str(text).map_err(|e| ImportRecordError {
        line: None,
        reason: format!("invalid JSON document: {}", e),
    })?;

    Ok(document
        .memories
        .into_iter()
        .map(|importable| Ok(merge_options(importable, options)))
        .collect())
}

fn merge_options(importable: ImportableMemory, options: &ImportOptions) -> ImportRecord {
    let mut metadata = importable.metadata;
    if !options.tags.is_empty() {
        metadata.insert(
            "tags".to_string(),
            serde_json::Value::Array(
                options
                    .tags
                    .iter()
                    .cloned()
                    .map(serde_json::Value::String)
                    .collect(),
            ),
        );
    }
    if let Some(source) = &options.source {
        metadata.insert("source".to_string(), serde_json::Value::String(source.clone()));
    }
    if let Some(user_id) = &options.user_id {
        metadata.insert("user_id".to_string(), serde_json::Value::String(user_id.clone()));
    }

    ImportRecord {
        content: importable.content,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_memories_array() {
        let text = r#"{"memories": [{"content": "a"}, {"content": "b", "metadata": {"k": "v"}}]}"#;
        let options = ImportOptions::default();
        let records = parse_json(text, &options).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn missing_memories_key_is_fatal() {
        let text = r#"{"items": []}"#;
        let options = ImportOptions::default();
        assert!(parse_json(text, &options).is_err());
    }
}
