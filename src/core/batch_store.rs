//! Thread-safe in-memory batch storage

use super::traits::BatchRepository;
use crate::types::{Batch, BatchId, BatchSummary, Page, PageRequest, RepositoryError};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory batch repository
///
/// Batches get a sequential `id` on insert; listings are newest first.
#[derive(Debug, Default)]
pub struct InMemoryBatchRepository {
    batches: DashMap<BatchId, Batch>,
    next_id: AtomicU64,
}

impl InMemoryBatchRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a repository from previously exported batches
    pub fn from_batches(batches: impl IntoIterator<Item = Batch>) -> Self {
        let repository = Self::new();
        let mut max_id = 0;
        for batch in batches {
            max_id = max_id.max(batch.id);
            repository.batches.insert(batch.batch_id().clone(), batch);
        }
        repository.next_id.store(max_id, Ordering::SeqCst);
        repository
    }

    /// All batches, oldest first
    pub fn export(&self) -> Vec<Batch> {
        let mut batches: Vec<Batch> = self
            .batches
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        batches.sort_by_key(|batch| batch.id);
        batches
    }
}

#[async_trait]
impl BatchRepository for InMemoryBatchRepository {
    async fn insert(&self, mut batch: Batch) -> Result<Batch, RepositoryError> {
        match self.batches.entry(batch.batch_id().clone()) {
            Entry::Occupied(_) => Err(RepositoryError::unique_violation(
                batch.uploader().as_str(),
                batch.batch_id().as_str(),
            )),
            Entry::Vacant(slot) => {
                batch.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                slot.insert(batch.clone());
                Ok(batch)
            }
        }
    }

    async fn update(&self, batch: &Batch) -> Result<(), RepositoryError> {
        match self.batches.get_mut(batch.batch_id()) {
            Some(mut entry) => {
                *entry.value_mut() = batch.clone();
                Ok(())
            }
            None => Err(RepositoryError::not_found(
                "batch",
                batch.batch_id().as_str(),
            )),
        }
    }

    async fn get(&self, batch_id: &BatchId) -> Result<Option<Batch>, RepositoryError> {
        Ok(self.batches.get(batch_id).map(|entry| entry.value().clone()))
    }

    async fn list(&self, request: PageRequest) -> Result<Page<BatchSummary>, RepositoryError> {
        let mut summaries: Vec<BatchSummary> = self
            .batches
            .iter()
            .map(|entry| BatchSummary::from(entry.value()))
            .collect();
        summaries.sort_by(|a, b| b.id.cmp(&a.id));

        let total = summaries.len();
        let content = summaries
            .into_iter()
            .skip(request.offset())
            .take(request.page_size)
            .collect();
        Ok(Page::new(content, request, total))
    }
}
