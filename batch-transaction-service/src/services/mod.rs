pub mod approval;
pub mod csv_parser;
pub mod database;
pub mod engine;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod store;

pub use database::PgTransactionStore;
pub use engine::{BatchTransactionEngine, UploadRequest, DEFAULT_MAX_UPLOAD_BYTES};
pub use error::EngineError;
pub use memory::InMemoryTransactionStore;
pub use store::{StoreError, TransactionStore};
