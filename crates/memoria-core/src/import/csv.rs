//! CSV import parsing.
//!
//! No teacher analog existed for CSV; this follows the same
//! parse-to-`ImportRecord` shape as [`super::jsonl`] and [`super::json`] so
//! `import::job::run_import` stays format-agnostic. Expected columns:
//! `content` (required) plus any other column, which is folded into
//! metadata under its header name.

use csv::ReaderBuilder;

use super::job::{ImportOptions, ImportRecord, ImportRecordError};

/// Parse `text` as CSV with a header row. The `content` column is required;
/// every other column becomes a string metadata field. A row missing
/// `content` or failing to parse becomes an `Err` carrying its 1-based data
/// row number (header excluded), without stopping the rest of the import.
pub fn parse_csv<'a>(
    text: &'a str,
    options: &'a ImportOptions,
) -> Result<Vec<Result<ImportRecord, ImportRecordError>>, ImportRecordError> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| ImportRecordError {
            line: None,
            reason: format!("invalid CSV header: {}", e),
        })?
        .clone();

    let content_idx = headers.iter().position(|h| h == "content").ok_or_else(|| ImportRecordError {
        line: None,
        reason: "CSV is missing a required 'content' column".to_string(),
    })?;

    let mut out = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let row_number = idx + 1;
        let row = match record {
            Ok(row) => row,
            Err(e) => {
                out.push(Err(ImportRecordError {
                    line: Some(row_number),
                    reason: format!("malformed CSV row: {}", e),
                }));
                continue;
            }
        };

        let content = row.get(content_idx).unwrap_or("").trim();
        if content.is_empty() {
            out.push(Err(ImportRecordError {
                line: Some(row_number),
                reason: "row has empty 'content'".to_string(),
            }));
            continue;
        }

        let mut metadata = std::collections::HashMap::new();
        for (col_idx, header) in headers.iter().enumerate() {
            if col_idx == content_idx {
                continue;
            }
            if let Some(value) = row.get(col_idx) {
                if !value.is_empty() {
                    metadata.insert(header.to_string(), serde_json::Value::String(value.to_string()));
                }
            }
        }

        let mut import_record = ImportRecord {
            content: content.to_string(),
            metadata,
        };
        merge_options(&mut import_record, options);
        out.push(Ok(import_record));
    }

    Ok(out)
}

fn merge_options(record: &mut ImportRecord, options: &ImportOptions) {
    if !options.tags.is_empty() {
        record.metadata.insert(
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
        record
            .metadata
            .insert("source".to_string(), serde_json::Value::String(source.clone()));
    }
    if let Some(user_id) = &options.user_id {
        record
            .metadata
            .insert("user_id".to_string(), serde_json::Value::String(user_id.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_with_extra_columns_as_metadata() {
        let text = "content,topic\nhello world,greeting\n";
        let options = ImportOptions::default();
        let records = parse_csv(text, &options).unwrap();
        assert_eq!(records.len(), 1);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.content, "hello world");
        assert_eq!(record.metadata.get("topic").unwrap(), "greeting");
    }

    #[test]
    fn missing_content_column_is_fatal() {
        let text = "topic\ngreeting\n";
        let options = ImportOptions::default();
        assert!(parse_csv(text, &options).is_err());
    }

    #[test]
    fn empty_content_cell_is_a_row_error_not_fatal() {
        let text = "content,topic\n,greeting\nhello,greeting\n";
        let options = ImportOptions::default();
        let records = parse_csv(text, &options).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_err());
        assert!(records[1].is_ok());
    }
}
