//! Per-row terminal outcomes

use super::key::IdempotencyBasis;
use super::order::OrderId;
use super::row::{ErrorCode, FieldError, RowIndex};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal classification of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowStatus {
    /// A new order was created for the row
    Created,
    /// The row matched an order that already existed
    SkippedDuplicate,
    /// The row was rejected; see the errors
    FailedValidation,
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowStatus::Created => f.write_str("CREATED"),
            RowStatus::SkippedDuplicate => f.write_str("SKIPPED_DUPLICATE"),
            RowStatus::FailedValidation => f.write_str("FAILED_VALIDATION"),
        }
    }
}

/// Outcome of one row
///
/// `order_id` is present iff the status is CREATED or SKIPPED_DUPLICATE;
/// `errors` is non-empty iff the status is FAILED_VALIDATION. The constructors
/// are the only way to build one, which keeps those pairings intact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowOutcome {
    row_index: RowIndex,
    status: RowStatus,
    idempotency_basis: Option<IdempotencyBasis>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    order_id: Option<OrderId>,
    #[serde(
        rename = "errorMessages",
        skip_serializing_if = "Vec::is_empty",
        default
    )]
    errors: Vec<FieldError>,
}

impl RowOutcome {
    pub fn created(row_index: RowIndex, basis: IdempotencyBasis, order_id: OrderId) -> Self {
        Self {
            row_index,
            status: RowStatus::Created,
            idempotency_basis: Some(basis),
            order_id: Some(order_id),
            errors: Vec::new(),
        }
    }

    pub fn skipped_duplicate(
        row_index: RowIndex,
        basis: IdempotencyBasis,
        existing: OrderId,
    ) -> Self {
        Self {
            row_index,
            status: RowStatus::SkippedDuplicate,
            idempotency_basis: Some(basis),
            order_id: Some(existing),
            errors: Vec::new(),
        }
    }

    /// Row rejected by validation; basis is not known yet
    ///
    /// An empty error list is replaced by a single INTERNAL_ERROR so the
    /// outcome always explains itself.
    pub fn failed_validation(row_index: RowIndex, errors: Vec<FieldError>) -> Self {
        let errors = if errors.is_empty() {
            vec![FieldError::for_row(
                ErrorCode::InternalError,
                "row rejected without a reason",
            )]
        } else {
            errors
        };
        Self {
            row_index,
            status: RowStatus::FailedValidation,
            idempotency_basis: None,
            order_id: None,
            errors,
        }
    }

    /// Row failed after its key was resolved (persistence trouble)
    pub fn technical_failure(
        row_index: RowIndex,
        basis: Option<IdempotencyBasis>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            row_index,
            status: RowStatus::FailedValidation,
            idempotency_basis: basis,
            order_id: None,
            errors: vec![FieldError::for_row(ErrorCode::TechnicalError, message)],
        }
    }

    /// Row processing crashed
    pub fn internal_failure(row_index: RowIndex, message: impl Into<String>) -> Self {
        Self::failed_validation(
            row_index,
            vec![FieldError::for_row(ErrorCode::InternalError, message)],
        )
    }

    /// Row never started because the batch was cancelled
    pub fn cancelled(row_index: RowIndex) -> Self {
        Self::failed_validation(
            row_index,
            vec![FieldError::for_row(
                ErrorCode::BatchCancelled,
                "batch was cancelled before this row was processed",
            )],
        )
    }

    pub fn row_index(&self) -> RowIndex {
        self.row_index
    }

    pub fn status(&self) -> RowStatus {
        self.status
    }

    pub fn idempotency_basis(&self) -> Option<IdempotencyBasis> {
        self.idempotency_basis
    }

    pub fn order_id(&self) -> Option<&OrderId> {
        self.order_id.as_ref()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }
}
