//! In-process transaction store for tests and database-less local runs.

use crate::models::{
    ListParams, Pagination, TransactionDetail, TransactionHeader, TransactionPage,
    TransactionStatus, TransactionSummary,
};
use crate::services::store::{StoreError, TransactionStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    headers: Vec<TransactionHeader>,
    details: HashMap<Uuid, Vec<TransactionDetail>>,
}

/// Every write happens under a single write-lock acquisition, so a reader
/// never observes a header without its details.
#[derive(Default)]
pub struct InMemoryTransactionStore {
    tables: RwLock<Tables>,
    fail_on_detail: Option<usize>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any create that reaches the `n`th (1-based) detail row.
    pub fn with_failure_on_detail(n: usize) -> Self {
        Self {
            fail_on_detail: Some(n),
            ..Self::default()
        }
    }

    pub async fn header_count(&self) -> usize {
        self.tables.read().await.headers.len()
    }

    pub async fn detail_count(&self) -> usize {
        self.tables.read().await.details.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn create_transaction(
        &self,
        header: &TransactionHeader,
        details: &[TransactionDetail],
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;

        if tables.headers.iter().any(|h| h.id == header.id) {
            return Err(StoreError::Backend(format!(
                "duplicate transaction id {}",
                header.id
            )));
        }

        // Stage everything before touching the tables.
        let mut staged = Vec::with_capacity(details.len());
        for (index, detail) in details.iter().enumerate() {
            if self.fail_on_detail == Some(index + 1) {
                return Err(StoreError::Backend(format!(
                    "injected failure on detail row {}",
                    index + 1
                )));
            }
            if detail.transaction_id != header.id {
                return Err(StoreError::Backend(format!(
                    "detail {} does not belong to transaction {}",
                    detail.id, header.id
                )));
            }
            staged.push(detail.clone());
        }

        tables.headers.push(header.clone());
        tables.details.insert(header.id, staged);
        Ok(())
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let header = tables
            .headers
            .iter_mut()
            .find(|h| h.id == id)
            .ok_or(StoreError::NotFound(id))?;

        if header.status != from {
            return Err(StoreError::StatusConflict {
                id,
                current: header.status,
                expected: from,
            });
        }

        header.status = to;
        Ok(())
    }

    async fn list_transactions(&self, params: &ListParams) -> Result<TransactionPage, StoreError> {
        let tables = self.tables.read().await;

        let mut matching: Vec<&TransactionHeader> = tables
            .headers
            .iter()
            .filter(|h| params.matches(h.status))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total_items = matching.len() as i64;
        let offset = usize::try_from(params.page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(params.page.limit()).unwrap_or(usize::MAX);

        let data = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok(TransactionPage {
            data,
            pagination: Pagination::new(params.page, total_items),
        })
    }

    async fn get_details(&self, transaction_id: Uuid) -> Result<Vec<TransactionDetail>, StoreError> {
        let tables = self.tables.read().await;
        let mut details = tables
            .details
            .get(&transaction_id)
            .cloned()
            .unwrap_or_default();
        details.sort_by_key(|d| d.line_no);
        Ok(details)
    }

    async fn get_summary(&self) -> Result<TransactionSummary, StoreError> {
        let tables = self.tables.read().await;
        let mut summary = TransactionSummary::default();
        for header in &tables.headers {
            match header.status {
                TransactionStatus::WaitingApproval => summary.total_waiting_approval += 1,
                TransactionStatus::Approved => summary.total_approved += 1,
                TransactionStatus::Rejected => summary.total_rejected += 1,
            }
        }
        Ok(summary)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
