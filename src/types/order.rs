//! Order types owned by the persistence collaborator
//!
//! The engine only needs enough of an order to create it and to point back at
//! it from a row outcome.

use super::batch::BatchId;
use super::key::{IdempotencyKey, Scope};
use super::row::{OrderDetails, RowIndex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque order identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(format!("ORD-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for OrderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Data handed to the repository when creating an order
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    /// Batch that submitted the order
    pub batch_id: BatchId,
    /// Row that produced the order
    pub row_index: RowIndex,
    pub details: OrderDetails,
}

/// A persisted order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    pub scope: Scope,
    pub idempotency_key: IdempotencyKey,
    pub batch_id: BatchId,
    pub row_index: RowIndex,
    pub created_at: DateTime<Utc>,
    pub details: OrderDetails,
}

impl Order {
    /// Materialize a new order under a freshly generated id
    pub fn from_new(key: &IdempotencyKey, order: NewOrder) -> Self {
        Self {
            order_id: OrderId::generate(),
            scope: key.scope.clone(),
            idempotency_key: key.clone(),
            batch_id: order.batch_id,
            row_index: order.row_index,
            created_at: Utc::now(),
            details: order.details,
        }
    }
}

/// Result of the atomic insert-if-absent primitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The (scope, key) slot was free; the order now exists under this id
    Created(OrderId),
    /// The slot was already taken by this order
    Duplicate(OrderId),
}

impl InsertOutcome {
    pub fn order_id(&self) -> &OrderId {
        match self {
            InsertOutcome::Created(id) | InsertOutcome::Duplicate(id) => id,
        }
    }
}
