use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use ledgerkeep_core::imports::{
    ImportBatch, ImportPreview, ImportSummary, MappedPreview, MappingConfig,
};
use serde::Deserialize;

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportListQuery {
    account_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MappedPreviewQuery {
    limit: Option<usize>,
}

async fn upload_statement(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<ImportPreview>> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut account_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("statement").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read file content: {}", e))
                })?;
                file = Some((file_name, bytes.to_vec()));
            }
            "accountId" => {
                let value = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read accountId: {}", e))
                })?;
                account_id = Some(value.trim().to_string());
            }
            _ => {}
        }
    }

    let (file_name, content) =
        file.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".to_string()))?;
    let account_id = account_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing 'accountId' field".to_string()))?;

    tracing::info!(
        "Statement upload '{}' ({} bytes) for account {}",
        file_name,
        content.len(),
        account_id
    );
    let preview = state
        .import_service
        .upload(&account_id, &file_name, &content)
        .await?;
    Ok(Json(preview))
}

async fn list_batches(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ImportListQuery>,
) -> ApiResult<Json<Vec<ImportBatch>>> {
    let batches = state
        .import_service
        .list_batches(query.account_id.as_deref())?;
    Ok(Json(batches))
}

async fn get_batch(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ImportBatch>> {
    Ok(Json(state.import_service.get_batch(&id)?))
}

async fn preview_batch(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ImportPreview>> {
    Ok(Json(state.import_service.preview(&id)?))
}

async fn apply_mapping(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(mapping): Json<MappingConfig>,
) -> ApiResult<Json<ImportBatch>> {
    let batch = state.import_service.apply_mapping(&id, mapping).await?;
    Ok(Json(batch))
}

async fn mapped_preview(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<MappedPreviewQuery>,
) -> ApiResult<Json<MappedPreview>> {
    Ok(Json(state.import_service.mapped_preview(&id, query.limit)?))
}

async fn commit_batch(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ImportSummary>> {
    let summary = state.import_service.commit(&id).await?;
    Ok(Json(summary))
}

async fn discard_batch(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    state.import_service.discard(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/imports",
            get(list_batches)
                .post(upload_statement)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/imports/{id}", get(get_batch).delete(discard_batch))
        .route("/imports/{id}/preview", get(preview_batch))
        .route("/imports/{id}/mapping", put(apply_mapping))
        .route("/imports/{id}/mapped-preview", get(mapped_preview))
        .route("/imports/{id}/commit", post(commit_batch))
}
