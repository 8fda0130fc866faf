//! Domain models for batch-transaction-service.

mod identity;
mod pagination;
mod transaction;

pub use identity::{CallerIdentity, Role};
pub use pagination::{
    ListParams, PageRequest, Pagination, TransactionPage, DEFAULT_PAGE, DEFAULT_PER_PAGE,
};
pub use transaction::{
    DetailRecord, TransactionDetail, TransactionHeader, TransactionStatus, TransactionSummary,
    UnknownStatus,
};
