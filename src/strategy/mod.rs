//! Processing strategy module for file ingestion
//!
//! This module defines the Strategy pattern for the complete ingestion
//! pipeline, from reading an upload off disk to a finished [`BatchResult`].
//! Different implementations (sequential, bounded concurrent) can be selected
//! at runtime; both drive the same
//! [`BatchCoordinator`](crate::core::BatchCoordinator) and differ only in how
//! the file is decoded and how many rows run at once.

use crate::cli::StrategyType;
use crate::core::{BatchConfig, BatchRepository, OrderRepository};
use crate::types::{BatchResult, BatchSummary, IngestError, Page, PageRequest, Scope};
use std::path::Path;
use std::sync::Arc;

pub mod r#async;
pub mod sync;

pub use self::r#async::AsyncProcessingStrategy;
pub use sync::SyncProcessingStrategy;

/// Storage the pipeline writes orders and batches into
#[derive(Clone)]
pub struct Repositories {
    pub orders: Arc<dyn OrderRepository>,
    pub batches: Arc<dyn BatchRepository>,
}

impl Repositories {
    pub fn new(orders: Arc<dyn OrderRepository>, batches: Arc<dyn BatchRepository>) -> Self {
        Self { orders, batches }
    }
}

/// One upload to ingest
#[derive(Debug, Clone)]
pub struct IngestRequest<'a> {
    /// CSV file holding the rows
    pub input_path: &'a Path,
    /// Uploader identity; scopes idempotency keys
    pub uploader: Scope,
}

impl<'a> IngestRequest<'a> {
    pub fn new(input_path: &'a Path, uploader: Scope) -> Self {
        Self {
            input_path,
            uploader,
        }
    }

    /// File name recorded on the batch
    pub fn file_name(&self) -> String {
        self.input_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input_path.display().to_string())
    }
}

/// Processing strategy trait for complete ingestion pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Ingest the file named by `request` as one new batch
    ///
    /// # Errors
    ///
    /// Returns an error only for batch-level failures:
    /// - The input file cannot be opened or read
    /// - The file is not a row table (empty, no header, no known columns);
    ///   a FAILED batch is recorded first
    /// - The file has a header but no data rows; a FAILED batch is recorded
    /// - The batch record cannot be stored
    ///
    /// Row-level problems are reported in the returned [`BatchResult`].
    fn ingest(
        &self,
        request: &IngestRequest<'_>,
        repositories: &Repositories,
    ) -> Result<BatchResult, IngestError>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `config` - Optional configuration for concurrent processing (ignored for sync)
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config))
        }
    }
}

/// Page through batch history, newest first
pub fn list_batches(
    repositories: &Repositories,
    request: PageRequest,
) -> Result<Page<BatchSummary>, IngestError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|e| IngestError::IoError {
            message: format!("Failed to create tokio runtime: {}", e),
        })?;
    Ok(runtime.block_on(repositories.batches.list(request))?)
}
