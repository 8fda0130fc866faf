//! Postgres-backed transaction store.

use crate::models::{
    ListParams, Pagination, TransactionDetail, TransactionHeader, TransactionPage,
    TransactionStatus, TransactionSummary,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{StoreError, TransactionStore};
use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Rows per multi-row INSERT. Nine binds per row keeps a chunk well under
/// the 65535 bind-parameter limit of the wire protocol.
const DETAIL_INSERT_CHUNK: usize = 1000;

const HEADER_COLUMNS: &str = "id, total_amount, total_record, from_account, maker, \
     transfer_date, transaction_status, created_at";

const STATUS_FILTER: &str = "(cardinality($1::text[]) = 0 OR transaction_status = ANY($1::text[]))";

#[derive(Clone)]
pub struct PgTransactionStore {
    pool: PgPool,
    statement_timeout: Duration,
}

impl PgTransactionStore {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "batch-transaction-service"))]
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        statement_timeout: Duration,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self::from_pool(pool, statement_timeout))
    }

    pub fn from_pool(pool: PgPool, statement_timeout: Duration) -> Self {
        Self {
            pool,
            statement_timeout,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn insert_batch(
        &self,
        header: &TransactionHeader,
        details: &[TransactionDetail],
    ) -> Result<(), StoreError> {
        // Dropping `tx` on any early return rolls the whole batch back.
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT set_config('statement_timeout', $1, true)")
            .bind(format!("{}ms", self.statement_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO transactions (id, total_amount, total_record, from_account, maker, transfer_date, transaction_status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(header.id)
        .bind(header.total_amount)
        .bind(header.total_record)
        .bind(&header.from_account)
        .bind(&header.maker)
        .bind(header.transfer_date)
        .bind(header.status.as_str())
        .bind(header.created_at)
        .execute(&mut *tx)
        .await?;

        for chunk in details.chunks(DETAIL_INSERT_CHUNK) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO transaction_details \
                 (id, transaction_id, line_no, bank_dest, account_id_dest, account_name_dest, amount, description, transfer_date) ",
            );
            builder.push_values(chunk, |mut row, detail| {
                row.push_bind(detail.id)
                    .push_bind(detail.transaction_id)
                    .push_bind(detail.line_no)
                    .push_bind(&detail.bank_dest)
                    .push_bind(&detail.account_id_dest)
                    .push_bind(&detail.account_name_dest)
                    .push_bind(detail.amount)
                    .push_bind(&detail.description)
                    .push_bind(detail.transfer_date);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    #[instrument(skip(self, header, details), fields(transaction_id = %header.id, detail_count = details.len()))]
    async fn create_transaction(
        &self,
        header: &TransactionHeader,
        details: &[TransactionDetail],
    ) -> Result<(), StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_transaction"])
            .start_timer();

        let result = tokio::time::timeout(self.statement_timeout, self.insert_batch(header, details))
            .await
            .map_err(|_| StoreError::Timeout(self.statement_timeout))
            .and_then(|inserted| inserted);

        timer.observe_duration();

        if let Err(e) = &result {
            warn!(error = %e, "Batch insert rolled back");
        }
        result
    }

    #[instrument(skip(self), fields(transaction_id = %id))]
    async fn update_status(
        &self,
        id: Uuid,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<(), StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_status"])
            .start_timer();

        let updated = sqlx::query(
            r#"
            UPDATE transactions
            SET transaction_status = $1, updated_at = now()
            WHERE id = $2 AND transaction_status = $3
            "#,
        )
        .bind(to.as_str())
        .bind(id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            let current: Option<TransactionStatus> =
                sqlx::query_scalar("SELECT transaction_status FROM transactions WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;

            timer.observe_duration();
            return Err(match current {
                None => StoreError::NotFound(id),
                Some(current) => StoreError::StatusConflict {
                    id,
                    current,
                    expected: from,
                },
            });
        }

        timer.observe_duration();
        info!(status = %to, "Transaction status updated");
        Ok(())
    }

    #[instrument(skip(self), fields(page = params.page.page(), per_page = params.page.per_page()))]
    async fn list_transactions(&self, params: &ListParams) -> Result<TransactionPage, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_transactions"])
            .start_timer();

        let statuses = params.status_strings();

        let data = sqlx::query_as::<_, TransactionHeader>(&format!(
            "SELECT {HEADER_COLUMNS} FROM transactions WHERE {STATUS_FILTER} \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(&statuses)
        .bind(params.page.limit())
        .bind(params.page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total_items: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM transactions WHERE {STATUS_FILTER}"
        ))
        .bind(&statuses)
        .fetch_one(&self.pool)
        .await?;

        timer.observe_duration();

        Ok(TransactionPage {
            data,
            pagination: Pagination::new(params.page, total_items),
        })
    }

    #[instrument(skip(self))]
    async fn get_details(&self, transaction_id: Uuid) -> Result<Vec<TransactionDetail>, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_details"])
            .start_timer();

        let details = sqlx::query_as::<_, TransactionDetail>(
            r#"
            SELECT id, transaction_id, line_no, bank_dest, account_id_dest, account_name_dest, amount, description, transfer_date
            FROM transaction_details
            WHERE transaction_id = $1
            ORDER BY line_no
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        timer.observe_duration();
        Ok(details)
    }

    #[instrument(skip(self))]
    async fn get_summary(&self) -> Result<TransactionSummary, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_summary"])
            .start_timer();

        let summary = sqlx::query_as::<_, TransactionSummary>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE transaction_status = 'waiting_approval') AS total_waiting_approval,
                COUNT(*) FILTER (WHERE transaction_status = 'approved') AS total_approved,
                COUNT(*) FILTER (WHERE transaction_status = 'rejected') AS total_rejected
            FROM transactions
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        timer.observe_duration();
        Ok(summary)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
