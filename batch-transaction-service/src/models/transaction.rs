//! Batch transaction header and detail models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Approval status of a batch.
///
/// `WaitingApproval` is only ever assigned at creation; `Approved` and
/// `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    WaitingApproval,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown transaction status '{0}'")]
pub struct UnknownStatus(pub String);

impl TransactionStatus {
    pub const ALL: [TransactionStatus; 3] = [
        TransactionStatus::WaitingApproval,
        TransactionStatus::Approved,
        TransactionStatus::Rejected,
    ];

    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaitingApproval => "waiting_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::WaitingApproval)
    }

    /// Whether an approver may move a batch from `self` to `next`.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (
                Self::WaitingApproval,
                Self::Approved | Self::Rejected
            )
        )
    }
}

impl FromStr for TransactionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting_approval" => Ok(Self::WaitingApproval),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Batch header: one per uploaded file.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct TransactionHeader {
    pub id: Uuid,
    /// Amount claimed by the maker; not recomputed from the details.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    /// Row count claimed by the maker.
    pub total_record: i32,
    pub from_account: String,
    pub maker: String,
    pub transfer_date: DateTime<Utc>,
    #[sqlx(rename = "transaction_status")]
    #[serde(rename = "transaction_status")]
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// One payment line belonging to exactly one header.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct TransactionDetail {
    pub id: Uuid,
    pub transaction_id: Uuid,
    /// 1-based position of the row in the uploaded file.
    #[serde(skip_serializing)]
    pub line_no: i32,
    pub bank_dest: String,
    pub account_id_dest: String,
    pub account_name_dest: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub description: Option<String>,
    pub transfer_date: DateTime<Utc>,
}

/// A parsed CSV row, before it is attached to a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRecord {
    pub bank_dest: String,
    pub account_id_dest: String,
    pub account_name_dest: String,
    pub amount: Decimal,
}

impl DetailRecord {
    /// Stamp the record with its owning header.
    pub fn into_detail(
        self,
        transaction_id: Uuid,
        line_no: i32,
        transfer_date: DateTime<Utc>,
    ) -> TransactionDetail {
        TransactionDetail {
            id: Uuid::new_v4(),
            transaction_id,
            line_no,
            bank_dest: self.bank_dest,
            account_id_dest: self.account_id_dest,
            account_name_dest: self.account_name_dest,
            amount: self.amount,
            description: None,
            transfer_date,
        }
    }
}

/// Header counts grouped by status. Missing statuses count as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct TransactionSummary {
    pub total_waiting_approval: i64,
    pub total_approved: i64,
    pub total_rejected: i64,
}
