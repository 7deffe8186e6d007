//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `row`: raw and validated rows, the column schema, field errors
//! - `key`: scope and idempotency keys
//! - `order`: order identity and the insert-if-absent outcome
//! - `outcome`: per-row terminal outcomes
//! - `batch`: batch record, lifecycle, results and summaries
//! - `error`: error types for the engine

pub mod batch;
pub mod error;
pub mod key;
pub mod order;
pub mod outcome;
pub mod row;

pub use batch::{
    Batch, BatchId, BatchMetadata, BatchResult, BatchStatus, BatchSummary, Page, PageRequest,
};
pub use error::{IngestError, RepositoryError};
pub use key::{IdempotencyBasis, IdempotencyKey, Scope};
pub use order::{InsertOutcome, NewOrder, Order, OrderId};
pub use outcome::{RowOutcome, RowStatus};
pub use row::{
    Column, Dimensions, ErrorCode, FieldError, OrderDetails, Party, RawRow, RowIndex,
    ValidatedRow, ROW_FIELD,
};
