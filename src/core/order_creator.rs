//! Order creation behind the idempotency key
//!
//! [`OrderCreator::create_if_absent`] is the only write path into order
//! storage. It issues one atomic insert keyed by `(scope, key)`:
//!
//! - insert succeeds: the row created a new order;
//! - insert reports the slot taken: the row is a duplicate of the owner;
//! - insert fails on the uniqueness constraint: the owner is looked up with
//!   [`DuplicateChecker`] and the row is a duplicate;
//! - anything else is a technical error for this row only.
//!
//! There is deliberately no "look up first, then insert" path.

use super::traits::OrderRepository;
use crate::types::{
    BatchId, IdempotencyKey, InsertOutcome, NewOrder, OrderId, RepositoryError, ValidatedRow,
};
use std::sync::Arc;
use tracing::debug;

/// Result of a create-if-absent attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateResult {
    /// New order created under this id
    Created(OrderId),
    /// An order with the same key already existed
    Duplicate(OrderId),
}

/// Read-only lookup of the order owning a key
#[derive(Clone)]
pub struct DuplicateChecker {
    repository: Arc<dyn OrderRepository>,
}

impl DuplicateChecker {
    pub fn new(repository: Arc<dyn OrderRepository>) -> Self {
        Self { repository }
    }

    /// Existing order for `key` in its scope, if any
    pub async fn find_existing(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<OrderId>, RepositoryError> {
        self.repository.find_by_key(&key.scope, key).await
    }
}

/// Creates orders through the repository's atomic insert
#[derive(Clone)]
pub struct OrderCreator {
    repository: Arc<dyn OrderRepository>,
    duplicates: DuplicateChecker,
}

impl OrderCreator {
    pub fn new(repository: Arc<dyn OrderRepository>) -> Self {
        Self {
            duplicates: DuplicateChecker::new(Arc::clone(&repository)),
            repository,
        }
    }

    /// Create the order for `row` unless `key` is already taken
    ///
    /// The insert is all-or-nothing: a rejected attempt leaves no order behind.
    pub async fn create_if_absent(
        &self,
        key: &IdempotencyKey,
        row: ValidatedRow,
        batch_id: &BatchId,
    ) -> Result<CreateResult, RepositoryError> {
        let new_order = NewOrder {
            batch_id: batch_id.clone(),
            row_index: row.row_index(),
            details: row.into_details(),
        };

        match self
            .repository
            .insert_if_absent(&key.scope, key, new_order)
            .await
        {
            Ok(InsertOutcome::Created(order_id)) => Ok(CreateResult::Created(order_id)),
            Ok(InsertOutcome::Duplicate(order_id)) => Ok(CreateResult::Duplicate(order_id)),
            Err(RepositoryError::UniqueViolation { .. }) => {
                debug!(key = %key, "unique constraint hit, resolving existing order");
                match self.duplicates.find_existing(key).await? {
                    Some(order_id) => Ok(CreateResult::Duplicate(order_id)),
                    None => Err(RepositoryError::internal(format!(
                        "unique constraint reported for '{}' but no owning order was found",
                        key
                    ))),
                }
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::order_store::InMemoryOrderRepository;
    use crate::core::traits::MockOrderRepository;
    use crate::core::RowValidator;
    use crate::types::{Column, RawRow, Scope};

    fn validated(row_index: usize) -> ValidatedRow {
        let raw = RawRow::new(row_index)
            .with(Column::SenderName, "Acme")
            .with(Column::SenderContact, "9876543210")
            .with(Column::SenderAddress, "1 Main Road")
            .with(Column::ReceiverName, "Jane")
            .with(Column::ReceiverContact, "9876501234")
            .with(Column::ReceiverAddress, "2 High Street")
            .with(Column::ItemCount, "1")
            .with(Column::TotalWeight, "0.5");
        RowValidator::new().validate(raw).unwrap()
    }

    fn key() -> IdempotencyKey {
        IdempotencyKey::client_reference(Scope::new("acme"), "REF-1")
    }

    #[tokio::test]
    async fn test_create_then_duplicate_with_in_memory_store() {
        let repository = Arc::new(InMemoryOrderRepository::new());
        let creator = OrderCreator::new(repository.clone());
        let batch_id = BatchId::from("b1");

        let first = creator
            .create_if_absent(&key(), validated(1), &batch_id)
            .await
            .unwrap();
        let second = creator
            .create_if_absent(&key(), validated(2), &batch_id)
            .await
            .unwrap();

        let CreateResult::Created(order_id) = first else {
            panic!("expected Created, got {:?}", first);
        };
        assert_eq!(second, CreateResult::Duplicate(order_id.clone()));

        let order = repository.get(&order_id).await.unwrap().unwrap();
        assert_eq!(order.row_index, 1);
        assert_eq!(order.batch_id, batch_id);
    }

    #[tokio::test]
    async fn test_unique_violation_resolves_to_existing_order() {
        let mut mock = MockOrderRepository::new();
        mock.expect_insert_if_absent()
            .times(1)
            .returning(|scope, key, _| {
                Err(RepositoryError::unique_violation(scope.as_str(), key.value.clone()))
            });
        mock.expect_find_by_key()
            .times(1)
            .returning(|_, _| Ok(Some(OrderId::from("ORD-EXISTING"))));

        let creator = OrderCreator::new(Arc::new(mock));
        let result = creator
            .create_if_absent(&key(), validated(1), &BatchId::from("b1"))
            .await
            .unwrap();

        assert_eq!(result, CreateResult::Duplicate(OrderId::from("ORD-EXISTING")));
    }

    #[tokio::test]
    async fn test_unique_violation_without_owner_is_an_error() {
        let mut mock = MockOrderRepository::new();
        mock.expect_insert_if_absent()
            .returning(|scope, key, _| {
                Err(RepositoryError::unique_violation(scope.as_str(), key.value.clone()))
            });
        mock.expect_find_by_key().returning(|_, _| Ok(None));

        let creator = OrderCreator::new(Arc::new(mock));
        let result = creator
            .create_if_absent(&key(), validated(1), &BatchId::from("b1"))
            .await;

        assert!(matches!(result, Err(RepositoryError::Internal { .. })));
    }

    #[tokio::test]
    async fn test_other_failures_propagate_without_lookup() {
        let mut mock = MockOrderRepository::new();
        mock.expect_insert_if_absent()
            .times(1)
            .returning(|_, _, _| Err(RepositoryError::unavailable("connection refused")));
        mock.expect_find_by_key().times(0);

        let creator = OrderCreator::new(Arc::new(mock));
        let result = creator
            .create_if_absent(&key(), validated(1), &BatchId::from("b1"))
            .await;

        assert_eq!(
            result,
            Err(RepositoryError::unavailable("connection refused"))
        );
    }

    #[tokio::test]
    async fn test_duplicate_checker_reads_without_writing() {
        let repository = Arc::new(InMemoryOrderRepository::new());
        let checker = DuplicateChecker::new(repository.clone());

        assert_eq!(checker.find_existing(&key()).await.unwrap(), None);
        assert!(repository.is_empty());
    }
}
