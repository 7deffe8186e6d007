//! Single-row orchestration
//!
//! [`RowProcessor`] runs one row through
//! validate → resolve key → create-if-absent and classifies the result. It adds
//! no business rules of its own.
//!
//! # Error boundary
//!
//! `process` never fails and never unwinds: validation problems, persistence
//! errors and panics are all turned into a FAILED_VALIDATION outcome, so one
//! bad row cannot take the batch down with it.

use super::key_resolver::IdempotencyKeyResolver;
use super::order_creator::{CreateResult, OrderCreator};
use super::traits::OrderRepository;
use super::validator::RowValidator;
use crate::types::{BatchId, RawRow, RowOutcome, Scope};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Per-batch context every row is processed under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowContext {
    pub scope: Scope,
    pub batch_id: BatchId,
}

impl RowContext {
    pub fn new(scope: Scope, batch_id: BatchId) -> Self {
        Self { scope, batch_id }
    }
}

/// Orchestrates validation, key resolution and creation for one row
///
/// Cheap to clone; clones share the underlying repository.
#[derive(Clone)]
pub struct RowProcessor {
    validator: RowValidator,
    resolver: IdempotencyKeyResolver,
    creator: OrderCreator,
}

impl RowProcessor {
    pub fn new(repository: Arc<dyn OrderRepository>) -> Self {
        Self {
            validator: RowValidator::new(),
            resolver: IdempotencyKeyResolver::new(),
            creator: OrderCreator::new(repository),
        }
    }

    /// Process one row to its terminal outcome
    pub async fn process(&self, row: RawRow, context: &RowContext) -> RowOutcome {
        let row_index = row.row_index;
        match AssertUnwindSafe(self.process_row(row, context))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(row = row_index, batch = %context.batch_id, "row processing panicked: {}", message);
                RowOutcome::internal_failure(row_index, "unexpected error while processing row")
            }
        }
    }

    async fn process_row(&self, row: RawRow, context: &RowContext) -> RowOutcome {
        let row_index = row.row_index;

        let validated = match self.validator.validate(row) {
            Ok(validated) => validated,
            Err(failure) => {
                debug!(
                    row = row_index,
                    errors = failure.errors.len(),
                    "row failed validation"
                );
                return RowOutcome::failed_validation(failure.row_index, failure.errors);
            }
        };

        let key = self.resolver.resolve(&validated, &context.scope);

        match self
            .creator
            .create_if_absent(&key, validated, &context.batch_id)
            .await
        {
            Ok(CreateResult::Created(order_id)) => {
                debug!(row = row_index, order = %order_id, basis = %key.basis, "order created");
                RowOutcome::created(row_index, key.basis, order_id)
            }
            Ok(CreateResult::Duplicate(order_id)) => {
                debug!(row = row_index, order = %order_id, basis = %key.basis, "duplicate skipped");
                RowOutcome::skipped_duplicate(row_index, key.basis, order_id)
            }
            Err(e) => {
                warn!(row = row_index, batch = %context.batch_id, "order creation failed: {}", e);
                RowOutcome::technical_failure(
                    row_index,
                    Some(key.basis),
                    format!("order could not be created: {}", e),
                )
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
