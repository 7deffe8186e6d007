//! Batch lifecycle and bounded-concurrency row scheduling
//!
//! [`BatchCoordinator`] owns one upload from start to finish:
//!
//! ```text
//! ingest(metadata, rows)
//!     ├── Batch::open            → BatchRepository::insert   (OPEN)
//!     ├── rows empty?            → Batch::fail               (FAILED, Err(NoRows))
//!     ├── Batch::start_processing                            (PROCESSING)
//!     └── driver task (spawned)
//!         ├── up to max_concurrent_rows row tasks → RowProcessor::process
//!         │   (the next row starts when one finishes)
//!         ├── Batch::record per finished row (completion order)
//!         ├── Batch::complete    → BatchRepository::update   (COMPLETED)
//!         └── bookkeeping error  → Batch::abort              (FAILED)
//! ```
//!
//! # Ordering
//!
//! Rows finish in any order; each outcome is written back into the slot of the
//! row it came from, so [`BatchResult::rows`] always follows input order.
//!
//! # Cancellation
//!
//! A cancelled token, or a dropped `ingest` future, stops rows that have not
//! started yet. They finish as FAILED_VALIDATION with `BATCH_CANCELLED` so that
//! `created + failed + skipped_duplicate == total_rows` still holds. Rows that
//! already started run to completion and the batch is still completed.

use super::row_processor::{RowContext, RowProcessor};
use super::traits::{BatchRepository, OrderRepository, RowExtractor};
use crate::types::{
    Batch, BatchId, BatchMetadata, BatchResult, BatchSummary, IngestError, Page, PageRequest,
    RawRow, RowIndex, RowOutcome,
};
use futures::stream::{FuturesUnordered, StreamExt};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Ingestion tuning knobs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Upper bound on rows being processed at the same time
    pub max_concurrent_rows: usize,
    /// Number of records decoded per read when streaming a file
    pub read_chunk_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_rows: num_cpus::get(),
            read_chunk_size: 500,
        }
    }
}

impl BatchConfig {
    /// Create a config, replacing zero values with the defaults
    pub fn new(max_concurrent_rows: usize, read_chunk_size: usize) -> Self {
        let default = Self::default();

        let max_concurrent_rows = if max_concurrent_rows == 0 {
            warn!(
                "Invalid max_concurrent_rows ({}), using default ({})",
                max_concurrent_rows, default.max_concurrent_rows
            );
            default.max_concurrent_rows
        } else {
            max_concurrent_rows
        };

        let read_chunk_size = if read_chunk_size == 0 {
            warn!(
                "Invalid read_chunk_size ({}), using default ({})",
                read_chunk_size, default.read_chunk_size
            );
            default.read_chunk_size
        } else {
            read_chunk_size
        };

        Self {
            max_concurrent_rows,
            read_chunk_size,
        }
    }
}

/// SHA-256 of the uploaded bytes, lowercase hex
pub fn file_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Drives batches through their lifecycle
#[derive(Clone)]
pub struct BatchCoordinator {
    processor: RowProcessor,
    batches: Arc<dyn BatchRepository>,
    config: BatchConfig,
}

impl BatchCoordinator {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        batches: Arc<dyn BatchRepository>,
        config: BatchConfig,
    ) -> Self {
        Self {
            processor: RowProcessor::new(orders),
            batches,
            config,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Ingest `rows` as one new batch
    ///
    /// Row-level failures never surface here; they are FAILED_VALIDATION
    /// outcomes in the result. An `Err` means the batch itself could not be
    /// run: no rows, or the batch record could not be stored.
    pub async fn ingest(
        &self,
        metadata: BatchMetadata,
        rows: Vec<RawRow>,
    ) -> Result<BatchResult, IngestError> {
        self.ingest_with_cancellation(metadata, rows, CancellationToken::new())
            .await
    }

    /// [`ingest`](Self::ingest), stopping unstarted rows once `cancel` fires
    ///
    /// The rows run on a spawned driver task. Dropping the returned future
    /// cancels scheduling as well: the driver lets started rows finish, marks
    /// the rest `BATCH_CANCELLED` and still completes the batch record.
    pub async fn ingest_with_cancellation(
        &self,
        metadata: BatchMetadata,
        rows: Vec<RawRow>,
        cancel: CancellationToken,
    ) -> Result<BatchResult, IngestError> {
        let mut batch = self.batches.insert(Batch::open(metadata)).await?;
        info!(
            batch = %batch.batch_id(),
            id = batch.id,
            uploader = %batch.uploader(),
            file = batch.file_name(),
            rows = rows.len(),
            "batch opened"
        );

        if rows.is_empty() {
            batch.fail("no data rows found")?;
            self.batches.update(&batch).await?;
            error!(batch = %batch.batch_id(), "batch failed: no data rows found");
            return Err(IngestError::no_rows(Some(batch.batch_id().clone())));
        }

        batch.start_processing(rows.len())?;
        self.batches.update(&batch).await?;

        let scheduling = cancel.child_token();
        let _stop_on_drop = scheduling.clone().drop_guard();
        let driver = self.clone();
        let batch_id = batch.batch_id().clone();
        tokio::spawn(async move { driver.run(batch, rows, scheduling).await })
            .await
            .map_err(|e| {
                error!(batch = %batch_id, "batch driver stopped: {:?}", e);
                IngestError::internal(format!("batch {} driver stopped: {}", batch_id, e))
            })?
    }

    /// Process the rows of a PROCESSING batch and complete it
    async fn run(
        &self,
        mut batch: Batch,
        rows: Vec<RawRow>,
        cancel: CancellationToken,
    ) -> Result<BatchResult, IngestError> {
        let context = Arc::new(RowContext::new(
            batch.uploader().clone(),
            batch.batch_id().clone(),
        ));

        let completed = match self.process_rows(&mut batch, rows, &context, &cancel).await {
            Ok(outcomes) => batch.complete().map(|()| outcomes),
            Err(e) => Err(e),
        };
        let outcomes = match completed {
            Ok(outcomes) => outcomes,
            Err(e) => {
                self.abandon(&mut batch, &e).await;
                return Err(e);
            }
        };

        self.batches.update(&batch).await?;
        info!(
            batch = %batch.batch_id(),
            total = batch.total_rows(),
            created = batch.created_count(),
            skipped_duplicate = batch.skipped_duplicate_count(),
            failed = batch.failed_count(),
            duration_ms = batch.processing_duration_ms().unwrap_or_default(),
            "batch completed"
        );

        Ok(BatchResult::new(&batch, outcomes))
    }

    /// Move a batch whose bookkeeping broke mid-run to FAILED
    ///
    /// Failures here are logged rather than returned so `cause` stays the
    /// error the caller sees.
    async fn abandon(&self, batch: &mut Batch, cause: &IngestError) {
        error!(
            batch = %batch.batch_id(),
            recorded = batch.created_count() + batch.skipped_duplicate_count() + batch.failed_count(),
            total = batch.total_rows(),
            "batch abandoned: {}",
            cause
        );
        if let Err(e) = batch.abort(cause.to_string()) {
            error!(batch = %batch.batch_id(), status = %batch.status(), "batch left unfinished: {}", e);
            return;
        }
        if let Err(e) = self.batches.update(batch).await {
            error!(batch = %batch.batch_id(), "failed to store abandoned batch: {}", e);
        }
    }

    /// Extract rows from `bytes` and ingest them
    ///
    /// A structural extraction failure is recorded as a FAILED batch before
    /// the error is returned.
    pub async fn ingest_bytes(
        &self,
        metadata: BatchMetadata,
        bytes: &[u8],
        extractor: &dyn RowExtractor,
    ) -> Result<BatchResult, IngestError> {
        match extractor.extract(bytes) {
            Ok(rows) => self.ingest(metadata, rows).await,
            Err(e) if e.is_structural() => {
                self.fail_batch(metadata, e.to_string()).await?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Record a batch that never got past OPEN
    pub async fn fail_batch(
        &self,
        metadata: BatchMetadata,
        reason: impl Into<String>,
    ) -> Result<Batch, IngestError> {
        let reason = reason.into();
        let mut batch = self.batches.insert(Batch::open(metadata)).await?;
        batch.fail(reason.clone())?;
        self.batches.update(&batch).await?;
        error!(batch = %batch.batch_id(), file = batch.file_name(), "batch failed: {}", reason);
        Ok(batch)
    }

    /// Batch history, newest first
    pub async fn list_batches(
        &self,
        request: PageRequest,
    ) -> Result<Page<BatchSummary>, IngestError> {
        Ok(self.batches.list(request).await?)
    }

    pub async fn get_batch(&self, batch_id: &BatchId) -> Result<Option<Batch>, IngestError> {
        Ok(self.batches.get(batch_id).await?)
    }

    async fn process_rows(
        &self,
        batch: &mut Batch,
        rows: Vec<RawRow>,
        context: &Arc<RowContext>,
        cancel: &CancellationToken,
    ) -> Result<Vec<RowOutcome>, IngestError> {
        let limit = self.config.max_concurrent_rows.max(1);
        let mut slots: Vec<Option<RowOutcome>> = (0..rows.len()).map(|_| None).collect();
        let mut queue = rows.into_iter().enumerate();
        let mut running = FuturesUnordered::new();

        // A new row starts only when one of the `limit` slots frees up
        loop {
            if cancel.is_cancelled() {
                break;
            }
            if running.len() < limit {
                match queue.next() {
                    Some((position, row)) => {
                        running.push(self.spawn_row(position, row, context));
                        continue;
                    }
                    None if running.is_empty() => break,
                    None => {}
                }
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(finished) = running.next() => settle(batch, &mut slots, finished)?,
            }
        }

        let unstarted = queue.len();
        if unstarted > 0 {
            warn!(
                batch = %batch.batch_id(),
                unstarted,
                in_flight = running.len(),
                "batch cancelled, remaining rows will not start"
            );
        }
        for (position, row) in queue {
            let outcome = RowOutcome::cancelled(row.row_index);
            batch.record(outcome.status())?;
            slots[position] = Some(outcome);
        }
        while let Some(finished) = running.next().await {
            settle(batch, &mut slots, finished)?;
        }

        Ok(slots.into_iter().flatten().collect())
    }

    fn spawn_row(
        &self,
        position: usize,
        row: RawRow,
        context: &Arc<RowContext>,
    ) -> impl Future<Output = FinishedRow> {
        let row_index = row.row_index;
        let processor = self.processor.clone();
        let context = Arc::clone(context);
        let task = tokio::spawn(async move { processor.process(row, &context).await });
        async move { (position, row_index, task.await) }
    }
}

/// Input position, row index and join result of one row task
type FinishedRow = (usize, RowIndex, Result<RowOutcome, JoinError>);

fn settle(
    batch: &mut Batch,
    slots: &mut [Option<RowOutcome>],
    (position, row_index, joined): FinishedRow,
) -> Result<(), IngestError> {
    let outcome = match joined {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(row = row_index, "row task panicked: {:?}", e);
            RowOutcome::internal_failure(row_index, "unexpected error while processing row")
        }
    };
    batch.record(outcome.status())?;
    slots[position] = Some(outcome);
    Ok(())
}
