use std::sync::Arc;

use crate::{error::ApiResult, main_lib::AppState};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use ledgerkeep_core::locks::{
    BulkLockResult, LockAuditEntry, LockModule, LockRequest, LockState, PartialUnlockRequest,
    UnlockRequest,
};

/// Header naming who performs a lock action. Recorded in the audit trail.
const ACTOR_HEADER: &str = "x-actor";
const DEFAULT_ACTOR: &str = "system";

fn actor_from(headers: &HeaderMap) -> String {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_ACTOR)
        .to_string()
}

async fn list_locks(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<LockState>>> {
    let states = state.lock_service.list_lock_states()?;
    Ok(Json(states))
}

async fn get_lock(
    Path(module): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<LockState>> {
    let module: LockModule = module.parse()?;
    Ok(Json(state.lock_service.get_lock_state(module)?))
}

async fn get_audit_trail(
    Path(module): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<LockAuditEntry>>> {
    let module: LockModule = module.parse()?;
    Ok(Json(state.lock_service.get_audit_trail(module)?))
}

async fn lock_module(
    Path(module): Path<String>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LockRequest>,
) -> ApiResult<Json<LockState>> {
    let module: LockModule = module.parse()?;
    let locked = state
        .lock_service
        .lock(module, payload, &actor_from(&headers))
        .await?;
    Ok(Json(locked))
}

async fn edit_lock(
    Path(module): Path<String>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LockRequest>,
) -> ApiResult<Json<LockState>> {
    let module: LockModule = module.parse()?;
    let edited = state
        .lock_service
        .edit_lock(module, payload, &actor_from(&headers))
        .await?;
    Ok(Json(edited))
}

async fn unlock_partial(
    Path(module): Path<String>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<PartialUnlockRequest>,
) -> ApiResult<Json<LockState>> {
    let module: LockModule = module.parse()?;
    let opened = state
        .lock_service
        .unlock_partial(module, payload, &actor_from(&headers))
        .await?;
    Ok(Json(opened))
}

async fn unlock_module(
    Path(module): Path<String>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<UnlockRequest>,
) -> ApiResult<Json<LockState>> {
    let module: LockModule = module.parse()?;
    let unlocked = state
        .lock_service
        .unlock_complete(module, payload, &actor_from(&headers))
        .await?;
    Ok(Json(unlocked))
}

async fn lock_all(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LockRequest>,
) -> ApiResult<Json<BulkLockResult>> {
    let result = state
        .lock_service
        .lock_all(payload, &actor_from(&headers))
        .await?;
    Ok(Json(result))
}

async fn unlock_all(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<UnlockRequest>,
) -> ApiResult<Json<BulkLockResult>> {
    let result = state
        .lock_service
        .unlock_all(payload, &actor_from(&headers))
        .await?;
    Ok(Json(result))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/locks", get(list_locks))
        .route("/locks/lock-all", post(lock_all))
        .route("/locks/unlock-all", post(unlock_all))
        .route("/locks/{module}", get(get_lock).put(edit_lock))
        .route("/locks/{module}/audit", get(get_audit_trail))
        .route("/locks/{module}/lock", post(lock_module))
        .route("/locks/{module}/unlock-partial", post(unlock_partial))
        .route("/locks/{module}/unlock", post(unlock_module))
}
