//! Batch transaction engine: the single entry point the HTTP layer calls.

use crate::models::{
    CallerIdentity, ListParams, TransactionDetail, TransactionHeader, TransactionPage,
    TransactionStatus, TransactionSummary,
};
use crate::services::approval::{self, ACTIONABLE_STATUS};
use crate::services::csv_parser;
use crate::services::error::EngineError;
use crate::services::metrics::{DETAIL_ROWS_TOTAL, STATUS_UPDATES_TOTAL, UPLOADS_TOTAL};
use crate::services::store::TransactionStore;
use bytes::Bytes;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Maximum accepted upload size when none is configured.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Column widths of `transactions`, in characters.
pub const MAX_FROM_ACCOUNT_LEN: usize = 64;
pub const MAX_MAKER_LEN: usize = 255;

/// A maker's upload: the raw CSV plus the totals they claim for it.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file: Bytes,
    pub total_amount: Decimal,
    pub total_record: i32,
    pub from_account: String,
}

#[derive(Clone)]
pub struct BatchTransactionEngine {
    store: Arc<dyn TransactionStore>,
    max_upload_bytes: usize,
}

impl BatchTransactionEngine {
    pub fn new(store: Arc<dyn TransactionStore>, max_upload_bytes: usize) -> Self {
        Self {
            store,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Parse an upload and persist it as one `waiting_approval` batch.
    ///
    /// The claimed totals are stored as given and are not checked against the
    /// parsed rows. Nothing is written unless every row parses.
    #[instrument(
        skip(self, upload, maker),
        fields(maker = %maker.user_id, role = %maker.role, file_size = upload.file.len())
    )]
    pub async fn create_from_upload(
        &self,
        upload: UploadRequest,
        maker: &CallerIdentity,
    ) -> Result<TransactionHeader, EngineError> {
        let result = self.create_batch(upload, maker).await;

        let outcome = match &result {
            Ok(_) => "created",
            Err(e) => e.kind(),
        };
        UPLOADS_TOTAL.with_label_values(&[outcome]).inc();

        result
    }

    async fn create_batch(
        &self,
        upload: UploadRequest,
        maker: &CallerIdentity,
    ) -> Result<TransactionHeader, EngineError> {
        if upload.file.len() > self.max_upload_bytes {
            return Err(EngineError::UploadTooLarge {
                size: upload.file.len(),
                limit: self.max_upload_bytes,
            });
        }
        if upload.total_amount.is_sign_negative() && !upload.total_amount.is_zero() {
            return Err(EngineError::InvalidRequest(
                "total_amount must not be negative".to_string(),
            ));
        }
        if upload.total_record < 0 {
            return Err(EngineError::InvalidRequest(
                "total_record must not be negative".to_string(),
            ));
        }
        if upload.from_account.chars().count() > MAX_FROM_ACCOUNT_LEN {
            return Err(EngineError::InvalidRequest(format!(
                "from_account must be at most {MAX_FROM_ACCOUNT_LEN} characters"
            )));
        }
        if maker.user_id.chars().count() > MAX_MAKER_LEN {
            return Err(EngineError::InvalidRequest(format!(
                "maker id must be at most {MAX_MAKER_LEN} characters"
            )));
        }

        let now = Utc::now();
        let header = TransactionHeader {
            id: Uuid::new_v4(),
            total_amount: upload.total_amount,
            total_record: upload.total_record,
            from_account: upload.from_account,
            maker: maker.user_id.clone(),
            transfer_date: now,
            status: TransactionStatus::WaitingApproval,
            created_at: now,
        };

        let file = upload.file;
        let records = tokio::task::spawn_blocking(move || csv_parser::parse(file.as_ref()))
            .await
            .map_err(|e| EngineError::Internal(anyhow::Error::new(e)))??;

        let details: Vec<TransactionDetail> = records
            .into_iter()
            .zip(1..)
            .map(|(record, line_no)| record.into_detail(header.id, line_no, header.transfer_date))
            .collect();

        if i64::from(header.total_record) != details.len() as i64 {
            warn!(
                transaction_id = %header.id,
                claimed = header.total_record,
                parsed = details.len(),
                "Claimed record count differs from uploaded rows"
            );
        }

        self.store.create_transaction(&header, &details).await?;

        DETAIL_ROWS_TOTAL.inc_by(details.len() as u64);
        info!(
            transaction_id = %header.id,
            detail_count = details.len(),
            "Batch transaction created"
        );

        Ok(header)
    }

    /// Approve or reject a batch that is still waiting for approval.
    #[instrument(skip(self, approver), fields(transaction_id = %id, approver = %approver.user_id, role = %approver.role))]
    pub async fn update_status(
        &self,
        id: Uuid,
        requested: &str,
        approver: &CallerIdentity,
    ) -> Result<(), EngineError> {
        let result = match approval::validate_requested(requested) {
            Ok(target) => self
                .store
                .update_status(id, ACTIONABLE_STATUS, target)
                .await
                .map_err(EngineError::from),
            Err(e) => Err(e),
        };

        let outcome = match &result {
            Ok(()) => "updated",
            Err(e) => e.kind(),
        };
        let status_label = requested
            .parse::<TransactionStatus>()
            .map(|s| s.as_str())
            .unwrap_or("invalid");
        STATUS_UPDATES_TOTAL
            .with_label_values(&[status_label, outcome])
            .inc();

        if result.is_ok() {
            info!(status = requested, "Transaction status changed");
        }
        result
    }

    #[instrument(skip(self))]
    pub async fn list(&self, params: &ListParams) -> Result<TransactionPage, EngineError> {
        Ok(self.store.list_transactions(params).await?)
    }

    /// Details of one batch in upload order; unknown ids give an empty list.
    #[instrument(skip(self), fields(transaction_id = %id))]
    pub async fn detail(&self, id: Uuid) -> Result<Vec<TransactionDetail>, EngineError> {
        Ok(self.store.get_details(id).await?)
    }

    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<TransactionSummary, EngineError> {
        Ok(self.store.get_summary().await?)
    }

    pub async fn health_check(&self) -> Result<(), EngineError> {
        Ok(self.store.health_check().await?)
    }
}
