//! Bulk Order Ingestion Library
//! # Overview
//!
//! This library ingests bulk order uploads: a table of rows, one order per
//! row, where every row ends in exactly one outcome and re-uploading a row
//! never creates a second order. Both a sequential and a bounded-concurrency
//! strategy are provided.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (rows, keys, orders, outcomes, batches)
//! - [`cli`] - CLI arguments parsing and command execution
//! - [`core`] - Business logic components:
//!   - [`core::validator`] - Per-row field validation
//!   - [`core::key_resolver`] - Idempotency key derivation
//!   - [`core::order_creator`] - Duplicate check and atomic order creation
//!   - [`core::row_processor`] - One row from raw cells to outcome
//!   - [`core::coordinator`] - Batch lifecycle and bounded row scheduling
//! - [`io`] - CSV decoding, result output and the JSON snapshot
//! - [`strategy`] - Sync and async ingestion pipelines
//!
//! # Row Outcomes
//!
//! Every row finishes in exactly one of three states:
//!
//! - **CREATED**: A new order was stored for the row's idempotency key
//! - **SKIPPED_DUPLICATE**: An order already existed for the key; its id is reported
//! - **FAILED_VALIDATION**: The row was rejected, with one or more field errors
//!
//! # Idempotency Keys
//!
//! A key is scoped to the uploader and uses:
//! - the trimmed `clientReference` when present, or
//! - a SHA-256 hash of the row's identity fields otherwise
//!
//! For every batch, `created + failed + skipped_duplicate == total_rows`.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{BatchConfig, BatchCoordinator, InMemoryBatchRepository, InMemoryOrderRepository};
pub use io::{write_outcomes_csv, Snapshot};
pub use types::{
    BatchId, BatchResult, BatchStatus, IdempotencyBasis, IdempotencyKey, IngestError, OrderId,
    RawRow, RowOutcome, RowStatus, Scope,
};
