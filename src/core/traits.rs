//! Collaborator traits for the ingestion engine
//!
//! The engine talks to three collaborators it does not own:
//!
//! - [`RowExtractor`] turns uploaded bytes into ordered raw rows.
//! - [`OrderRepository`] persists orders behind a uniqueness constraint on
//!   `(scope, idempotency key)`.
//! - [`BatchRepository`] keeps the durable batch records.
//!
//! In-memory implementations live in [`crate::core::order_store`] and
//! [`crate::core::batch_store`]; the CSV extractor lives in [`crate::io`].

use crate::types::{
    Batch, BatchId, BatchSummary, IdempotencyKey, IngestError, InsertOutcome, NewOrder, Order,
    OrderId, Page, PageRequest, RawRow, RepositoryError, Scope,
};
use async_trait::async_trait;

/// Decodes an upload into rows
pub trait RowExtractor: Send + Sync {
    /// Extract rows in file order
    ///
    /// Returns a structural [`IngestError`] when the bytes cannot be read as a
    /// row table at all. An empty `Vec` means the table had a header but no
    /// data rows.
    fn extract(&self, bytes: &[u8]) -> Result<Vec<RawRow>, IngestError>;
}

/// Order storage with an atomic insert-if-absent primitive
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert `order` unless `(scope, key)` is already taken
    ///
    /// Must be a single atomic operation: either the order is fully created
    /// and owns the key, or nothing is written and the existing owner is
    /// reported. Implementations backed by a database constraint may instead
    /// return [`RepositoryError::UniqueViolation`].
    async fn insert_if_absent(
        &self,
        scope: &Scope,
        key: &IdempotencyKey,
        order: NewOrder,
    ) -> Result<InsertOutcome, RepositoryError>;

    /// Order currently owning `(scope, key)`, if any
    async fn find_by_key(
        &self,
        scope: &Scope,
        key: &IdempotencyKey,
    ) -> Result<Option<OrderId>, RepositoryError>;

    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>, RepositoryError>;

    async fn count(&self) -> Result<usize, RepositoryError>;
}

/// Batch record storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BatchRepository: Send + Sync {
    /// Store a new batch, returning it with its sequential id assigned
    async fn insert(&self, batch: Batch) -> Result<Batch, RepositoryError>;

    /// Replace the stored state of an existing batch
    async fn update(&self, batch: &Batch) -> Result<(), RepositoryError>;

    async fn get(&self, batch_id: &BatchId) -> Result<Option<Batch>, RepositoryError>;

    /// Newest batches first
    async fn list(&self, request: PageRequest) -> Result<Page<BatchSummary>, RepositoryError>;
}
