//! Synchronous processing strategy
//!
//! This module provides a sequential implementation of the ProcessingStrategy
//! trait. It orchestrates ingestion by coordinating between the CSV extractor
//! (for input) and the [`BatchCoordinator`] (for business logic).
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - CSV decoding to `CsvRowExtractor` (backed by `SyncReader`)
//! - Batch lifecycle and row processing to `BatchCoordinator`
//!
//! Rows are processed strictly one after another on a current-thread runtime,
//! which makes this strategy the reference for deterministic behavior: the
//! order in which rows claim idempotency keys is exactly file order.

use crate::core::{file_checksum, BatchConfig, BatchCoordinator};
use crate::io::CsvRowExtractor;
use crate::strategy::{IngestRequest, ProcessingStrategy, Repositories};
use crate::types::{BatchMetadata, BatchResult, IngestError};
use std::sync::Arc;
use tracing::debug;

/// Synchronous processing strategy
///
/// # Thread Safety
///
/// SyncProcessingStrategy is Send + Sync, allowing it to be shared across threads
/// safely, even though it processes one row at a time.
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    /// Ingest a file one row at a time
    ///
    /// 1. Reads the whole file and computes its checksum
    /// 2. Decodes rows with `CsvRowExtractor`
    /// 3. Runs the batch through a `BatchCoordinator` limited to one row at a time
    fn ingest(
        &self,
        request: &IngestRequest<'_>,
        repositories: &Repositories,
    ) -> Result<BatchResult, IngestError> {
        let bytes = std::fs::read(request.input_path)
            .map_err(|e| IngestError::open_failed(request.input_path, e))?;
        let metadata = BatchMetadata::new(
            request.uploader.clone(),
            request.file_name(),
            file_checksum(&bytes),
        );
        debug!(file = %request.input_path.display(), bytes = bytes.len(), "ingesting sequentially");

        let coordinator = BatchCoordinator::new(
            Arc::clone(&repositories.orders),
            Arc::clone(&repositories.batches),
            BatchConfig::new(1, BatchConfig::default().read_chunk_size),
        );

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .map_err(|e| IngestError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        runtime.block_on(coordinator.ingest_bytes(metadata, &bytes, &CsvRowExtractor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BatchRepository, InMemoryBatchRepository, InMemoryOrderRepository};
    use crate::types::{BatchStatus, ErrorCode, PageRequest, RowStatus, Scope};
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    const HEADER: &str = "clientReference,senderName,senderContact,senderAddress,receiverName,receiverContact,receiverAddress,itemCount,totalWeight\n";

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn repositories() -> (Repositories, Arc<InMemoryOrderRepository>, Arc<InMemoryBatchRepository>) {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let batches = Arc::new(InMemoryBatchRepository::new());
        (
            Repositories::new(orders.clone(), batches.clone()),
            orders,
            batches,
        )
    }

    #[test]
    fn test_sync_strategy_ingests_file() {
        let file = create_temp_csv(&format!(
            "{}REF-1,Acme,9876543210,1 Main Rd,Jane,9876501234,2 High St,1,0.5\n\
             REF-2,Acme,9876543210,1 Main Rd,,9876501234,3 High St,1,0.5\n",
            HEADER
        ));
        let (repos, orders, _) = repositories();

        let result = SyncProcessingStrategy
            .ingest(&IngestRequest::new(file.path(), Scope::new("acme")), &repos)
            .unwrap();

        assert_eq!(result.total_rows, 2);
        assert_eq!(result.rows[0].status(), RowStatus::Created);
        assert_eq!(result.rows[1].status(), RowStatus::FailedValidation);
        assert_eq!(orders.len(), 1);
    }

    #[test]
    fn test_sync_strategy_records_checksum_and_file_name() {
        let content = format!(
            "{}REF-1,Acme,9876543210,1 Main Rd,Jane,9876501234,2 High St,1,0.5\n",
            HEADER
        );
        let file = create_temp_csv(&content);
        let (repos, _, batches) = repositories();

        let result = SyncProcessingStrategy
            .ingest(&IngestRequest::new(file.path(), Scope::new("acme")), &repos)
            .unwrap();

        let batch = batches.export().pop().unwrap();
        assert_eq!(batch.batch_id(), &result.batch_id);
        assert_eq!(batch.file_checksum(), file_checksum(content.as_bytes()));
        assert_eq!(
            Some(batch.file_name()),
            file.path().file_name().and_then(|name| name.to_str())
        );
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let (repos, _, _) = repositories();
        let result = SyncProcessingStrategy.ingest(
            &IngestRequest::new(Path::new("nonexistent.csv"), Scope::new("acme")),
            &repos,
        );
        assert!(matches!(result, Err(IngestError::FileNotFound { .. })));
    }

    #[test]
    fn test_sync_strategy_records_failed_batch_for_empty_file() {
        let file = create_temp_csv("");
        let (repos, _, batches) = repositories();

        let result = SyncProcessingStrategy
            .ingest(&IngestRequest::new(file.path(), Scope::new("acme")), &repos);

        assert!(matches!(result, Err(IngestError::Structural { .. })));
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let page = runtime.block_on(batches.list(PageRequest::default())).unwrap();
        assert_eq!(page.content[0].status, BatchStatus::Failed);
    }

    #[test]
    fn test_sync_strategy_reports_invalid_utf8_row() {
        let mut content = HEADER.as_bytes().to_vec();
        content.extend_from_slice(b"REF-1,Acme,9876543210,1 Main Rd,Jane,9876501234,2 High St,1,0.5\n");
        content.extend_from_slice(b"REF-2,\xff\xfeAcme,9876543210,1 Main Rd,Jane,9876501234,3 High St,1,0.5\n");
        content.extend_from_slice(b"REF-3,Acme,9876543210,1 Main Rd,Jane,9876501234,4 High St,1,0.5\n");
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&content).unwrap();
        file.flush().unwrap();
        let (repos, orders, _) = repositories();

        let result = SyncProcessingStrategy
            .ingest(&IngestRequest::new(file.path(), Scope::new("acme")), &repos)
            .unwrap();

        assert_eq!(result.total_rows, 3);
        assert_eq!(result.created, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.rows[1].row_index(), 2);
        assert_eq!(result.rows[1].status(), RowStatus::FailedValidation);
        assert_eq!(result.rows[1].errors()[0].code, ErrorCode::UndecodableRow);
        assert_eq!(orders.len(), 2);
    }

    #[test]
    fn test_sync_strategy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncProcessingStrategy>();
    }
}
