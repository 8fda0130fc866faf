//! Persistence seam for headers and details.

use crate::models::{
    ListParams, TransactionDetail, TransactionHeader, TransactionPage, TransactionStatus,
    TransactionSummary,
};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transaction {0} not found")]
    NotFound(Uuid),

    #[error("transaction {id} is {current}, expected {expected}")]
    StatusConflict {
        id: Uuid,
        current: TransactionStatus,
        expected: TransactionStatus,
    },

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Backend(String),
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Persist a header and all of its details, or nothing at all.
    async fn create_transaction(
        &self,
        header: &TransactionHeader,
        details: &[TransactionDetail],
    ) -> Result<(), StoreError>;

    /// Move `id` from `from` to `to`. Fails with `StatusConflict` when the
    /// stored status is no longer `from`.
    async fn update_status(
        &self,
        id: Uuid,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<(), StoreError>;

    /// Headers newest first, plus the total matching the same filter.
    async fn list_transactions(&self, params: &ListParams) -> Result<TransactionPage, StoreError>;

    /// Details in upload order. Unknown ids yield an empty list.
    async fn get_details(&self, transaction_id: Uuid) -> Result<Vec<TransactionDetail>, StoreError>;

    async fn get_summary(&self) -> Result<TransactionSummary, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
