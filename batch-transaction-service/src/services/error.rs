//! Engine error taxonomy and its mapping onto HTTP errors.

use crate::models::TransactionStatus;
use crate::services::csv_parser::ParseError;
use crate::services::store::StoreError;
use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid upload: {0}")]
    Parse(#[from] ParseError),

    #[error("invalid transaction status")]
    InvalidTransactionStatus(String),

    #[error("transaction {0} not found")]
    NotFound(Uuid),

    #[error("transaction {id} is already {current}")]
    TransactionAlreadyFinalized {
        id: Uuid,
        current: TransactionStatus,
    },

    #[error("upload of {size} bytes exceeds the {limit} byte limit")]
    UploadTooLarge { size: usize, limit: usize },

    #[error("{0}")]
    InvalidRequest(String),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(anyhow::Error),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => EngineError::NotFound(id),
            StoreError::StatusConflict { id, current, .. } => {
                EngineError::TransactionAlreadyFinalized { id, current }
            }
            other => EngineError::Store(other),
        }
    }
}

impl EngineError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse_error",
            Self::InvalidTransactionStatus(_) => "invalid_status",
            Self::NotFound(_) => "not_found",
            Self::TransactionAlreadyFinalized { .. } => "already_finalized",
            Self::UploadTooLarge { .. } => "upload_too_large",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Store(_) => "store_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Parse(_)
            | EngineError::InvalidTransactionStatus(_)
            | EngineError::InvalidRequest(_) => AppError::BadRequest(anyhow::Error::new(err)),
            EngineError::UploadTooLarge { .. } => AppError::PayloadTooLarge(anyhow::Error::new(err)),
            EngineError::NotFound(_) => AppError::NotFound(anyhow::Error::new(err)),
            EngineError::TransactionAlreadyFinalized { .. } => {
                AppError::Conflict(anyhow::Error::new(err))
            }
            EngineError::Store(store) => AppError::DatabaseError(anyhow::Error::new(store)),
            EngineError::Internal(inner) => AppError::InternalError(inner),
        }
    }
}
