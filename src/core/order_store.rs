//! Thread-safe in-memory order storage
//!
//! [`InMemoryOrderRepository`] keeps a uniqueness index from idempotency key to
//! order id next to the order records themselves, both in `DashMap`s.
//!
//! # Atomicity
//!
//! `insert_if_absent` claims the index slot through a single `entry()` call.
//! The shard lock for that key is held while the order record is written and
//! the slot is filled, so two racing inserts for the same key serialize: the
//! first creates the order, the second observes the occupied slot and reports
//! the existing id. There is no separate read-then-write window.

use super::traits::OrderRepository;
use crate::types::{IdempotencyKey, InsertOutcome, NewOrder, Order, OrderId, RepositoryError, Scope};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// In-memory order repository with a `(scope, key)` uniqueness index
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    /// Uniqueness index; the key embeds its scope
    index: DashMap<IdempotencyKey, OrderId>,
    orders: DashMap<OrderId, Order>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a repository from previously exported orders
    ///
    /// When two orders claim the same key the first one wins.
    pub fn from_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let repository = Self::new();
        for order in orders {
            if let Entry::Vacant(slot) = repository.index.entry(order.idempotency_key.clone()) {
                slot.insert(order.order_id.clone());
                repository.orders.insert(order.order_id.clone(), order);
            }
        }
        repository
    }

    /// All orders, oldest first
    pub fn export(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });
        orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert_if_absent(
        &self,
        scope: &Scope,
        key: &IdempotencyKey,
        order: NewOrder,
    ) -> Result<InsertOutcome, RepositoryError> {
        if &key.scope != scope {
            return Err(RepositoryError::internal(format!(
                "key scope '{}' does not match insert scope '{}'",
                key.scope, scope
            )));
        }

        match self.index.entry(key.clone()) {
            Entry::Occupied(slot) => Ok(InsertOutcome::Duplicate(slot.get().clone())),
            Entry::Vacant(slot) => {
                let order = Order::from_new(key, order);
                let order_id = order.order_id.clone();
                self.orders.insert(order_id.clone(), order);
                slot.insert(order_id.clone());
                Ok(InsertOutcome::Created(order_id))
            }
        }
    }

    async fn find_by_key(
        &self,
        scope: &Scope,
        key: &IdempotencyKey,
    ) -> Result<Option<OrderId>, RepositoryError> {
        if &key.scope != scope {
            return Ok(None);
        }
        Ok(self.index.get(key).map(|entry| entry.value().clone()))
    }

    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.get(order_id).map(|entry| entry.value().clone()))
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.orders.len())
    }
}
