//! Request and response bodies of the HTTP surface.

use crate::models::{Pagination, TransactionDetail, TransactionHeader};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const CREATED_MESSAGE: &str = "Transaction created successfully";
pub const UPDATED_MESSAGE: &str = "Transaction updated successfully";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub total_record: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub message: String,
}

impl From<&TransactionHeader> for UploadResponse {
    fn from(header: &TransactionHeader) -> Self {
        Self {
            total_record: header.total_record,
            total_amount: header.total_amount,
            message: CREATED_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    pub data: Vec<TransactionHeader>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct TransactionDetailResponse {
    pub data: Vec<TransactionDetail>,
}
