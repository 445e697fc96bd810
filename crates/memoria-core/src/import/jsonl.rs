//! JSON Lines import parsing.
//!
//! Grounded on the teacher's `import::jsonl::import_jsonl`, which read a
//! `BufReader` line-by-line and handed batches to a caller-supplied
//! closure. Batching and storage now live in [`crate::import::job`]; this
//! module only turns raw JSONL text into a lazy stream of
//! [`ImportRecord`](crate::import::ImportRecord)s, one line at a time,
//! collecting parse failures as record-level errors instead of aborting.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::job::{ImportOptions, ImportRecord, ImportRecordError};

/// The on-the-wire shape of one imported line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportableMemory {
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Parse `text` as JSON Lines, merging `options.tags`/`source`/`user_id`
/// into each record's metadata. Blank lines are skipped; a malformed line
/// becomes an `Err` carrying its 1-based line number, without stopping
/// the rest of the import.
pub fn parse_jsonl<'a>(
    text: &'a str,
    options: &'a ImportOptions,
) -> impl Iterator<Item = Result<ImportRecord, ImportRecordError>> + 'a {
    text.lines().enumerate().filter_map(move |(idx, line)| {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let parsed: Result<ImportableMemory, _> = serde_json::from_str(line);
        Some(match parsed {
            Ok(importable) => Ok(merge_options(importable, options)),
            Err(e) => Err(ImportRecordError {
                line: Some(idx + 1),
                reason: format!("malformed JSON line: {}", e),
            }),
        })
    })
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
    fn parses_valid_lines() {
        let text = "{\"content\": \"a\"}\n{\"content\": \"b\"}\n";
        let options = ImportOptions::default();
        let records: Vec<_> = parse_jsonl(text, &options).collect();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn skips_blank_lines() {
        let text = "{\"content\": \"a\"}\n\n   \n{\"content\": \"b\"}";
        let options = ImportOptions::default();
        let records: Vec<_> = parse_jsonl(text, &options).collect();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn malformed_line_reports_line_number_and_continues() {
        let text = "{\"content\": \"a\"}\nnot json\n{\"content\": \"b\"}";
        let options = ImportOptions::default();
        let records: Vec<_> = parse_jsonl(text, &options).collect();
        assert_eq!(records.len(), 3);
        assert!(records[0].is_ok());
        let err = records[1].as_ref().unwrap_err();
        assert_eq!(err.line, Some(2));
        assert!(records[2].is_ok());
    }

    #[test]
    fn merges_tags_source_and_user_id_into_metadata() {
        let text = "{\"content\": \"a\"}";
        let options = ImportOptions {
            tags: vec!["demo".to_string()],
            source: Some("csv-upload".to_string()),
            user_id: Some("u-1".to_string()),
            ..Default::default()
        };
        let record = parse_jsonl(text, &options).next().unwrap().unwrap();
        assert_eq!(record.metadata.get("source").unwrap(), "csv-upload");
        assert_eq!(record.metadata.get("user_id").unwrap(), "u-1");
        assert!(record.metadata.get("tags").unwrap().is_array());
    }
}
