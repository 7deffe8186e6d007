//! Asynchronous bounded-concurrency processing strategy
//!
//! This module provides an asynchronous, multi-threaded implementation of the
//! ProcessingStrategy trait. Rows are decoded in chunks and then processed by
//! a pool of at most `max_concurrent_rows` row tasks.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (max_concurrent_rows, read_chunk_size)
//!     ├── AsyncRowReader (chunked CSV decoding)
//!     └── BatchCoordinator (batch lifecycle + bounded row scheduling)
//!         ├── RowProcessor (validate → key → create-if-absent)
//!         ├── OrderRepository (atomic insert-if-absent)
//!         └── BatchRepository (batch records)
//! ```
//!
//! # Thread-Based Parallelism
//!
//! - Spawns worker threads via a tokio multi-threaded runtime, at most one per
//!   CPU core
//! - At most `max_concurrent_rows` row tasks exist at any time
//! - Rows sharing an idempotency key race safely: the repository's atomic
//!   insert lets exactly one of them create the order
//! - Outcomes are reassembled in file order

use crate::core::{file_checksum, BatchConfig, BatchCoordinator};
use crate::io::AsyncRowReader;
use crate::strategy::{IngestRequest, ProcessingStrategy, Repositories};
use crate::types::{BatchMetadata, BatchResult, IngestError};
use std::sync::Arc;
use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::debug;

/// Asynchronous bounded-concurrency strategy
///
/// # Configuration
///
/// The strategy accepts a BatchConfig with:
/// - `max_concurrent_rows`: Rows in flight at once (default: CPU cores)
/// - `read_chunk_size`: Records decoded per read (default: 500)
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Runtime worker threads: the row limit, capped at the CPU count
    pub fn worker_threads(&self) -> usize {
        self.config.max_concurrent_rows.clamp(1, num_cpus::get())
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Ingest a file with bounded concurrency
    ///
    /// 1. Creates a tokio multi-threaded runtime
    /// 2. Reads the file and computes its checksum
    /// 3. Decodes rows in `read_chunk_size` chunks with `AsyncRowReader`;
    ///    a structurally invalid file is recorded as a FAILED batch
    /// 4. Runs the rows through a `BatchCoordinator`
    fn ingest(
        &self,
        request: &IngestRequest<'_>,
        repositories: &Repositories,
    ) -> Result<BatchResult, IngestError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.worker_threads())
            .build()
            .map_err(|e| IngestError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        runtime.block_on(async {
            let bytes = tokio::fs::read(request.input_path)
                .await
                .map_err(|e| IngestError::open_failed(request.input_path, e))?;
            let metadata = BatchMetadata::new(
                request.uploader.clone(),
                request.file_name(),
                file_checksum(&bytes),
            );
            debug!(
                file = %request.input_path.display(),
                bytes = bytes.len(),
                max_concurrent_rows = self.config.max_concurrent_rows,
                "ingesting concurrently"
            );

            let coordinator = BatchCoordinator::new(
                Arc::clone(&repositories.orders),
                Arc::clone(&repositories.batches),
                self.config.clone(),
            );

            // Wrap the buffer in a compatibility layer for csv-async
            let source = std::io::Cursor::new(bytes).compat();
            let decoded = match AsyncRowReader::new(source).await {
                Ok(mut reader) => reader.read_all(self.config.read_chunk_size).await,
                Err(e) => Err(e),
            };
            match decoded {
                Ok(rows) => coordinator.ingest(metadata, rows).await,
                Err(e) if e.is_structural() => {
                    coordinator.fail_batch(metadata, e.to_string()).await?;
                    Err(e)
                }
                Err(e) => Err(e),
            }
        })
    }
}
