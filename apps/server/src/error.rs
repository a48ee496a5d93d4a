use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ledgerkeep_core::errors::{DatabaseError, Error as CoreError};
use ledgerkeep_core::imports::ImportError;
use ledgerkeep_core::journal::JournalError;
use ledgerkeep_core::locks::LockError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    kind: &'static str,
    message: String,
}

/// Status code and machine-readable kind for a core error.
fn classify(err: &CoreError) -> (StatusCode, &'static str) {
    match err {
        CoreError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation"),
        CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NotFound"),
        CoreError::ConstraintViolation(_) => (StatusCode::CONFLICT, "ConstraintViolation"),
        CoreError::Unexpected(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Unexpected"),
        CoreError::Database(e) => match e {
            DatabaseError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            DatabaseError::UniqueViolation(_) => (StatusCode::CONFLICT, "UniqueViolation"),
            DatabaseError::ForeignKeyViolation(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "ForeignKeyViolation")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Storage"),
        },
        CoreError::Import(e) => match e {
            ImportError::UnreadableFile(_) => (StatusCode::UNPROCESSABLE_ENTITY, "UnreadableFile"),
            ImportError::EmptyFile => (StatusCode::UNPROCESSABLE_ENTITY, "EmptyFile"),
            ImportError::IncompleteMapping(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "IncompleteMapping")
            }
            ImportError::InvalidDate { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "InvalidDate"),
            ImportError::InvalidAmount { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "InvalidAmount")
            }
            ImportError::ImportFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ImportFailed"),
            ImportError::InvalidBatchStatus { .. } => (StatusCode::CONFLICT, "InvalidBatchStatus"),
            ImportError::TooManyRows { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "TooManyRows"),
            ImportError::AccountNotImportable(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "AccountNotImportable")
            }
        },
        CoreError::Journal(e) => match e {
            JournalError::UnbalancedEntry { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "UnbalancedEntry")
            }
            JournalError::EmptyEntry { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "EmptyEntry"),
            JournalError::InvalidAccount(_) => (StatusCode::UNPROCESSABLE_ENTITY, "InvalidAccount"),
            JournalError::InvalidTransition { .. } => (StatusCode::CONFLICT, "InvalidTransition"),
            JournalError::InvalidLineItem { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "InvalidLineItem")
            }
            JournalError::ConcurrentUpdate(_) => (StatusCode::CONFLICT, "ConcurrentUpdate"),
            JournalError::MissingReason => (StatusCode::BAD_REQUEST, "MissingReason"),
        },
        CoreError::Lock(e) => match e {
            LockError::PeriodLocked { .. } => (StatusCode::LOCKED, "PeriodLocked"),
            LockError::InvalidLockTransition { .. } => {
                (StatusCode::CONFLICT, "InvalidLockTransition")
            }
            LockError::InvalidLockWindow { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "InvalidLockWindow")
            }
            LockError::MissingReason { .. } => (StatusCode::BAD_REQUEST, "MissingReason"),
            LockError::UnknownModule(_) => (StatusCode::NOT_FOUND, "UnknownModule"),
        },
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            ApiError::Core(e) => classify(e),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal"),
        };
        if status.is_server_error() {
            tracing::error!(kind, "{}", self);
        } else {
            tracing::debug!(kind, "{}", self);
        }
        let body = Json(ErrorBody {
            code: status.as_u16(),
            kind,
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<LockError> for ApiError {
    fn from(err: LockError) -> Self {
        ApiError::Core(err.into())
    }
}
