use std::sync::Arc;

use crate::{error::ApiResult, main_lib::AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use ledgerkeep_core::transactions::{
    CanonicalTransaction, NewTransaction, TransactionFilter, TransactionUpdate,
};

async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<TransactionFilter>,
) -> ApiResult<Json<Vec<CanonicalTransaction>>> {
    let transactions = state.transaction_service.list_transactions(&filter)?;
    Ok(Json(transactions))
}

async fn create_transaction(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewTransaction>,
) -> ApiResult<Json<CanonicalTransaction>> {
    let created = state.transaction_service.create_transaction(payload).await?;
    Ok(Json(created))
}

async fn get_transaction(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CanonicalTransaction>> {
    let transaction = state.transaction_service.get_transaction(&id)?;
    Ok(Json(transaction))
}

async fn update_transaction(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TransactionUpdate>,
) -> ApiResult<Json<CanonicalTransaction>> {
    let updated = state
        .transaction_service
        .update_transaction(&id, payload)
        .await?;
    Ok(Json(updated))
}

async fn delete_transaction(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    state.transaction_service.delete_transaction(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reconcile_transaction(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CanonicalTransaction>> {
    let reconciled = state.transaction_service.reconcile_transaction(&id).await?;
    Ok(Json(reconciled))
}

async fn cancel_transaction(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CanonicalTransaction>> {
    let cancelled = state.transaction_service.cancel_transaction(&id).await?;
    Ok(Json(cancelled))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route(
            "/transactions/{id}",
            get(get_transaction)
                .put(update_transaction)
                .delete(delete_transaction),
        )
        .route("/transactions/{id}/reconcile", post(reconcile_transaction))
        .route("/transactions/{id}/cancel", post(cancel_transaction))
}
