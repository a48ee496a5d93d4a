use std::sync::Arc;

use crate::{error::ApiResult, main_lib::AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use ledgerkeep_core::journal::{
    JournalEntry, JournalEntryUpdate, JournalFilter, NewJournalEntry, ReverseRequest,
    TransactionEntryRequest,
};

async fn list_entries(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<JournalFilter>,
) -> ApiResult<Json<Vec<JournalEntry>>> {
    let entries = state.journal_service.list_entries(&filter)?;
    Ok(Json(entries))
}

async fn create_entry(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewJournalEntry>,
) -> ApiResult<Json<JournalEntry>> {
    let created = state.journal_service.create_draft(payload).await?;
    Ok(Json(created))
}

async fn get_entry(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<JournalEntry>> {
    let entry = state.journal_service.get_entry(&id)?;
    Ok(Json(entry))
}

async fn update_entry(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<JournalEntryUpdate>,
) -> ApiResult<Json<JournalEntry>> {
    let updated = state.journal_service.update_draft(&id, payload).await?;
    Ok(Json(updated))
}

async fn delete_entry(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    state.journal_service.delete_draft(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn post_entry(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<JournalEntry>> {
    let posted = state.journal_service.post_entry(&id).await?;
    Ok(Json(posted))
}

/// Returns the mirror entry; the original is reloaded by id.
async fn reverse_entry(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ReverseRequest>,
) -> ApiResult<Json<JournalEntry>> {
    let mirror = state.journal_service.reverse_entry(&id, payload).await?;
    Ok(Json(mirror))
}

async fn record_system_entry(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewJournalEntry>,
) -> ApiResult<Json<JournalEntry>> {
    let entry = state.journal_service.record_system_entry(payload).await?;
    Ok(Json(entry))
}

async fn draft_from_transaction(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TransactionEntryRequest>,
) -> ApiResult<Json<JournalEntry>> {
    let draft = state.journal_service.draft_from_transaction(payload).await?;
    Ok(Json(draft))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/journal-entries", get(list_entries).post(create_entry))
        .route("/journal-entries/system", post(record_system_entry))
        .route(
            "/journal-entries/from-transaction",
            post(draft_from_transaction),
        )
        .route(
            "/journal-entries/{id}",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
        .route("/journal-entries/{id}/post", post(post_entry))
        .route("/journal-entries/{id}/reverse", post(reverse_entry))
}
