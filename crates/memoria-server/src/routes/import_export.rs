//! Bulk import/export endpoints, thin wrappers over `memoria_core::import`
//! and `memoria_core::export`. Import runs in the background as a pollable
//! job; export is synchronous (bounded by the same recency-query limit
//! `UnifiedStore::query` already clamps to).

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use futures::stream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use memoria_core::export::{export_csv, export_jsonl, wrap_gdpr, ExportFormat, ExportableMemory};
use memoria_core::import::{
    parse_csv, parse_json, parse_jsonl, run_import, CancellationFlag, ImportFormat, ImportJob,
    ImportOptions, ImportRecord, ImportRecordError, RecordOutcome,
};
use memoria_core::types::Filter;

#[derive(Debug, Deserialize)]
pub struct ImportOptionsInput {
    #[serde(default = "default_true")]
    pub deduplicate: bool,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

fn default_true() -> bool {
    true
}
fn default_batch_size() -> usize {
    100
}
fn default_parallelism() -> usize {
    8
}

impl From<ImportOptionsInput> for ImportOptions {
    fn from(input: ImportOptionsInput) -> Self {
        Self {
            deduplicate: input.deduplicate,
            batch_size: input.batch_size,
            parallelism: input.parallelism,
            tags: input.tags,
            source: input.source,
            user_id: input.user_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub format: ImportFormat,
    pub content: String,
    #[serde(default)]
    pub options: Option<ImportOptionsInput>,
}

#[derive(Debug, Serialize)]
pub struct ImportStartedResponse {
    pub job_id: Uuid,
}

/// Parse `content` per `format` into records ready for `run_import`.
/// CSV/JSON fail the whole request on a malformed document (no per-row
/// recovery is possible before the header/outer structure parses); JSONL
/// recovers per-line, same as `run_import` expects.
fn parse_records(
    format: ImportFormat,
    content: &str,
    options: &ImportOptions,
) -> ApiResult<Vec<Result<ImportRecord, ImportRecordError>>> {
    let to_bad_request = |e: ImportRecordError| ApiError::bad_request(e.reason);
    match format {
        ImportFormat::Csv => parse_csv(content, options).map_err(to_bad_request),
        ImportFormat::Json => parse_json(content, options).map_err(to_bad_request),
        ImportFormat::Jsonl => Ok(parse_jsonl(content, options).collect()),
    }
}

/// POST /api/v1/memories/import
pub async fn start_import(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Json<ImportStartedResponse>> {
    let options: ImportOptions = request.options.unwrap_or(ImportOptionsInput {
        deduplicate: true,
        batch_size: default_batch_size(),
        parallelism: default_parallelism(),
        tags: Vec::new(),
        source: None,
        user_id: None,
    })
    .into();

    let records = parse_records(request.format, &request.content, &options)?;

    let job = Arc::new(tokio::sync::RwLock::new(ImportJob::new()));
    let cancel = CancellationFlag::new();
    let job_id = state.register_import_job(job.clone(), cancel.clone()).await;

    let store = state.store.clone();
    tokio::spawn(async move {
        let store_one = move |record: ImportRecord| {
            let store = store.clone();
            async move {
                match store.store(&record.content, Some(record.metadata), None).await {
                    Ok(response) if response.is_duplicate => RecordOutcome::Duplicate,
                    Ok(_) => RecordOutcome::Stored,
                    Err(e) => RecordOutcome::Failed(e.to_string()),
                }
            }
        };
        let _ = run_import(job, records.into_iter(), options, cancel, store_one).await;
    });

    Ok(Json(ImportStartedResponse { job_id }))
}

/// GET /api/v1/memories/import/{job_id}/status
pub async fn import_status(State(state): State<AppState>, Path(job_id): Path<Uuid>) -> ApiResult<Json<ImportJob>> {
    let job = state
        .get_import_job(job_id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("no import job with id '{}'", job_id)))?;
    let snapshot = job.read().await.clone();
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub format: ExportFormat,
    #[serde(default)]
    pub include_embeddings: bool,
    #[serde(default = "default_true")]
    pub include_metadata: bool,
    #[serde(default)]
    pub user_id: Option<String>,
}

async fn gather_memories(state: &AppState, user_id: Option<&str>) -> ApiResult<Vec<memoria_core::types::Memory>> {
    let filter = user_id.map(|id| Filter::eq("user_id", id.to_string()));
    let response = state.store.query("", 1000, 0.0, filter.as_ref()).await?;
    Ok(response.results.into_iter().map(|m| m.memory).collect())
}

/// POST /api/v1/memories/export
pub async fn export_memories(State(state): State<AppState>, Json(request): Json<ExportRequest>) -> ApiResult<impl IntoResponse> {
    let memories = gather_memories(&state, request.user_id.as_deref()).await?;
    let mut buffer = Vec::new();

    let (content_type, _stats) = match request.format {
        ExportFormat::Json => {
            let stats = export_jsonl(stream::iter(memories), request.include_embeddings, request.include_metadata, &mut buffer)
                .await?;
            ("application/x-ndjson", stats)
        }
        ExportFormat::Csv => {
            let stats = export_csv(stream::iter(memories), request.include_embeddings, request.include_metadata, &mut buffer)
                .await?;
            ("text/csv", stats)
        }
    };

    Ok(([(header::CONTENT_TYPE, content_type)], buffer))
}

/// GET /api/v1/memories/export/gdpr/{user_id}
pub async fn export_gdpr(State(state): State<AppState>, Path(user_id): Path<String>) -> ApiResult<Json<memoria_core::export::GdprEnvelope>> {
    let memories = gather_memories(&state, Some(&user_id)).await?;
    let exportable: Vec<ExportableMemory> = memories
        .iter()
        .map(|m| ExportableMemory::from_memory(m, false, true))
        .collect();

    let envelope = wrap_gdpr(user_id, chrono::Utc::now(), exportable);
    Ok(Json(envelope))
}
