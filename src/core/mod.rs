//! Core business logic module
//!
//! This module contains the ingestion pipeline components:
//! - `validator` - Row validation, collecting every field error
//! - `key_resolver` - Idempotency key derivation (client reference or content hash)
//! - `order_creator` - Atomic create-if-absent and duplicate lookup
//! - `row_processor` - Single-row orchestration and error boundary
//! - `coordinator` - Batch lifecycle and bounded concurrent scheduling
//! - `traits` - Collaborator abstractions (extractor, repositories)
//! - `order_store` / `batch_store` - DashMap-backed in-memory repositories

pub mod batch_store;
pub mod coordinator;
pub mod key_resolver;
pub mod order_creator;
pub mod order_store;
pub mod row_processor;
pub mod traits;
pub mod validator;

pub use batch_store::InMemoryBatchRepository;
pub use coordinator::{file_checksum, BatchConfig, BatchCoordinator};
pub use key_resolver::IdempotencyKeyResolver;
pub use order_creator::{CreateResult, DuplicateChecker, OrderCreator};
pub use order_store::InMemoryOrderRepository;
pub use row_processor::{RowContext, RowProcessor};
pub use traits::{BatchRepository, OrderRepository, RowExtractor};
pub use validator::{RowValidator, ValidationFailure};
