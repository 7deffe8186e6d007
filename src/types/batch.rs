//! Batch record and its lifecycle
//!
//! A batch is one upload's worth of rows. Its status follows
//!
//! ```text
//! OPEN ──(non-empty rows)──► PROCESSING ──(every row terminal)──► COMPLETED
//!   │                            │
//!   │                            └──(bookkeeping fault)──► FAILED
//!   └──(no rows / structural failure)──► FAILED
//! ```
//!
//! Only the [`BatchCoordinator`](crate::core::BatchCoordinator) drives these
//! transitions. Illegal transitions are rejected with
//! [`IngestError::InvalidTransition`].

use super::error::IngestError;
use super::key::Scope;
use super::outcome::{RowOutcome, RowStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque batch identifier, generated when the batch is opened
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(String);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for BatchId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Open,
    Processing,
    Completed,
    Failed,
}

impl BatchStatus {
    /// Returns `true` if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Failed)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStatus::Open => f.write_str("OPEN"),
            BatchStatus::Processing => f.write_str("PROCESSING"),
            BatchStatus::Completed => f.write_str("COMPLETED"),
            BatchStatus::Failed => f.write_str("FAILED"),
        }
    }
}

/// Caller-supplied facts about an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchMetadata {
    pub uploader: Scope,
    pub file_name: String,
    pub file_checksum: String,
}

impl BatchMetadata {
    pub fn new(
        uploader: Scope,
        file_name: impl Into<String>,
        file_checksum: impl Into<String>,
    ) -> Self {
        Self {
            uploader,
            file_name: file_name.into(),
            file_checksum: file_checksum.into(),
        }
    }
}

/// Durable record of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    /// Sequential id assigned by the batch repository (0 until stored)
    pub id: u64,
    batch_id: BatchId,
    status: BatchStatus,
    total_rows: usize,
    created_count: usize,
    failed_count: usize,
    skipped_duplicate_count: usize,
    uploader: Scope,
    file_name: String,
    file_checksum: String,
    opened_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    processing_duration_ms: Option<u64>,
    failure_reason: Option<String>,
}

impl Batch {
    /// Open a new batch in OPEN state
    pub fn open(metadata: BatchMetadata) -> Self {
        Self {
            id: 0,
            batch_id: BatchId::new(),
            status: BatchStatus::Open,
            total_rows: 0,
            created_count: 0,
            failed_count: 0,
            skipped_duplicate_count: 0,
            uploader: metadata.uploader,
            file_name: metadata.file_name,
            file_checksum: metadata.file_checksum,
            opened_at: Utc::now(),
            completed_at: None,
            processing_duration_ms: None,
            failure_reason: None,
        }
    }

    /// OPEN -> PROCESSING, recording the number of rows to expect
    pub fn start_processing(&mut self, total_rows: usize) -> Result<(), IngestError> {
        if self.status != BatchStatus::Open || total_rows == 0 {
            return Err(IngestError::invalid_transition(
                self.batch_id.clone(),
                self.status,
                BatchStatus::Processing,
            ));
        }
        self.status = BatchStatus::Processing;
        self.total_rows = total_rows;
        self.opened_at = Utc::now();
        Ok(())
    }

    /// Count one row's terminal outcome
    pub fn record(&mut self, status: RowStatus) -> Result<(), IngestError> {
        if self.status != BatchStatus::Processing || self.recorded_rows() >= self.total_rows {
            return Err(IngestError::invalid_transition(
                self.batch_id.clone(),
                self.status,
                self.status,
            ));
        }
        match status {
            RowStatus::Created => self.created_count += 1,
            RowStatus::SkippedDuplicate => self.skipped_duplicate_count += 1,
            RowStatus::FailedValidation => self.failed_count += 1,
        }
        Ok(())
    }

    /// PROCESSING -> COMPLETED, once every row has been recorded
    pub fn complete(&mut self) -> Result<(), IngestError> {
        if self.status != BatchStatus::Processing || self.recorded_rows() != self.total_rows {
            return Err(IngestError::invalid_transition(
                self.batch_id.clone(),
                self.status,
                BatchStatus::Completed,
            ));
        }
        self.status = BatchStatus::Completed;
        self.stamp_completion();
        Ok(())
    }

    /// OPEN -> FAILED, when no row could be extracted
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), IngestError> {
        if self.status != BatchStatus::Open {
            return Err(IngestError::invalid_transition(
                self.batch_id.clone(),
                self.status,
                BatchStatus::Failed,
            ));
        }
        self.status = BatchStatus::Failed;
        self.failure_reason = Some(reason.into());
        self.stamp_completion();
        Ok(())
    }

    /// PROCESSING -> FAILED, when the batch's own bookkeeping broke mid-run
    ///
    /// Rows already recorded keep their counts.
    pub fn abort(&mut self, reason: impl Into<String>) -> Result<(), IngestError> {
        if self.status != BatchStatus::Processing {
            return Err(IngestError::invalid_transition(
                self.batch_id.clone(),
                self.status,
                BatchStatus::Failed,
            ));
        }
        self.status = BatchStatus::Failed;
        self.failure_reason = Some(reason.into());
        self.stamp_completion();
        Ok(())
    }

    fn stamp_completion(&mut self) {
        let completed_at = Utc::now();
        let elapsed = (completed_at - self.opened_at).num_milliseconds().max(0);
        self.completed_at = Some(completed_at);
        self.processing_duration_ms = Some(elapsed as u64);
    }

    fn recorded_rows(&self) -> usize {
        self.created_count + self.failed_count + self.skipped_duplicate_count
    }

    pub fn batch_id(&self) -> &BatchId {
        &self.batch_id
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn created_count(&self) -> usize {
        self.created_count
    }

    pub fn failed_count(&self) -> usize {
        self.failed_count
    }

    pub fn skipped_duplicate_count(&self) -> usize {
        self.skipped_duplicate_count
    }

    pub fn uploader(&self) -> &Scope {
        &self.uploader
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn file_checksum(&self) -> &str {
        &self.file_checksum
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn processing_duration_ms(&self) -> Option<u64> {
        self.processing_duration_ms
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }
}

/// Response for one ingestion: aggregate counts plus every row outcome in
/// original row order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub batch_id: BatchId,
    pub total_rows: usize,
    pub created: usize,
    pub failed: usize,
    pub skipped_duplicate: usize,
    pub processing_duration_ms: u64,
    pub rows: Vec<RowOutcome>,
}

impl BatchResult {
    pub fn new(batch: &Batch, rows: Vec<RowOutcome>) -> Self {
        Self {
            batch_id: batch.batch_id.clone(),
            total_rows: batch.total_rows,
            created: batch.created_count,
            failed: batch.failed_count,
            skipped_duplicate: batch.skipped_duplicate_count,
            processing_duration_ms: batch.processing_duration_ms.unwrap_or_default(),
            rows,
        }
    }
}

/// Listing entry for batch history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub id: u64,
    pub batch_id: BatchId,
    pub status: BatchStatus,
    pub total_rows: usize,
    pub created_count: usize,
    pub failed_count: usize,
    pub skipped_duplicate_count: usize,
    pub uploaded_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub processing_duration_ms: Option<u64>,
    pub uploader: Scope,
    pub file_name: String,
    pub file_checksum: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub failure_reason: Option<String>,
}

impl From<&Batch> for BatchSummary {
    fn from(batch: &Batch) -> Self {
        Self {
            id: batch.id,
            batch_id: batch.batch_id.clone(),
            status: batch.status,
            total_rows: batch.total_rows,
            created_count: batch.created_count,
            failed_count: batch.failed_count,
            skipped_duplicate_count: batch.skipped_duplicate_count,
            uploaded_at: batch.opened_at,
            completed_at: batch.completed_at,
            processing_duration_ms: batch.processing_duration_ms,
            uploader: batch.uploader.clone(),
            file_name: batch.file_name.clone(),
            file_checksum: batch.file_checksum.clone(),
            failure_reason: batch.failure_reason.clone(),
        }
    }
}

/// Zero-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub const DEFAULT_PAGE_SIZE: usize = 20;

    /// A page size of zero falls back to the default
    pub fn new(page: usize, page_size: usize) -> Self {
        let page_size = if page_size == 0 {
            Self::DEFAULT_PAGE_SIZE
        } else {
            page_size
        };
        Self { page, page_size }
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_PAGE_SIZE)
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_elements: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: usize) -> Self {
        Self {
            content,
            page: request.page,
            page_size: request.page_size,
            total_elements,
            total_pages: total_elements.div_ceil(request.page_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn metadata() -> BatchMetadata {
        BatchMetadata::new(Scope::new("acme"), "orders.csv", "abc123")
    }

    #[test]
    fn test_open_batch_starts_open() {
        let batch = Batch::open(metadata());
        assert_eq!(batch.status(), BatchStatus::Open);
        assert_eq!(batch.total_rows(), 0);
        assert!(batch.completed_at().is_none());
    }

    #[test]
    fn test_full_lifecycle_to_completed() {
        let mut batch = Batch::open(metadata());
        batch.start_processing(3).unwrap();
        batch.record(RowStatus::Created).unwrap();
        batch.record(RowStatus::SkippedDuplicate).unwrap();
        batch.record(RowStatus::FailedValidation).unwrap();
        batch.complete().unwrap();

        assert_eq!(batch.status(), BatchStatus::Completed);
        assert_eq!(
            batch.created_count() + batch.failed_count() + batch.skipped_duplicate_count(),
            batch.total_rows()
        );
        assert!(batch.completed_at().is_some());
        assert!(batch.processing_duration_ms().is_some());
    }

    #[test]
    fn test_complete_requires_every_row() {
        let mut batch = Batch::open(metadata());
        batch.start_processing(2).unwrap();
        batch.record(RowStatus::Created).unwrap();

        let result = batch.complete();
        assert!(matches!(result, Err(IngestError::InvalidTransition { .. })));
        assert_eq!(batch.status(), BatchStatus::Processing);
    }

    #[test]
    fn test_record_rejects_extra_rows() {
        let mut batch = Batch::open(metadata());
        batch.start_processing(1).unwrap();
        batch.record(RowStatus::Created).unwrap();
        assert!(batch.record(RowStatus::Created).is_err());
    }

    #[test]
    fn test_start_processing_rejects_zero_rows() {
        let mut batch = Batch::open(metadata());
        assert!(batch.start_processing(0).is_err());
        assert_eq!(batch.status(), BatchStatus::Open);
    }

    #[test]
    fn test_fail_from_open() {
        let mut batch = Batch::open(metadata());
        batch.fail("no rows").unwrap();
        assert_eq!(batch.status(), BatchStatus::Failed);
        assert_eq!(batch.failure_reason(), Some("no rows"));
        assert!(batch.status().is_terminal());
    }

    #[test]
    fn test_fail_not_allowed_once_processing() {
        let mut batch = Batch::open(metadata());
        batch.start_processing(1).unwrap();
        assert!(batch.fail("late").is_err());
    }

    #[test]
    fn test_abort_only_while_processing() {
        let mut batch = Batch::open(metadata());
        assert!(batch.abort("too early").is_err());

        batch.start_processing(2).unwrap();
        batch.record(RowStatus::Created).unwrap();
        batch.abort("row accounting broke").unwrap();

        assert_eq!(batch.status(), BatchStatus::Failed);
        assert_eq!(batch.created_count(), 1);
        assert_eq!(batch.failure_reason(), Some("row accounting broke"));
        assert!(batch.completed_at().is_some());
        assert!(batch.abort("again").is_err());
    }

    #[test]
    fn test_completed_batch_is_final() {
        let mut batch = Batch::open(metadata());
        batch.start_processing(1).unwrap();
        batch.record(RowStatus::Created).unwrap();
        batch.complete().unwrap();

        assert!(batch.complete().is_err());
        assert!(batch.fail("again").is_err());
        assert!(batch.start_processing(1).is_err());
    }

    #[test]
    fn test_each_open_generates_new_batch_id() {
        let first = Batch::open(metadata());
        let second = Batch::open(metadata());
        assert_ne!(first.batch_id(), second.batch_id());
    }

    #[rstest]
    #[case::first_page(PageRequest::new(0, 10), 0)]
    #[case::third_page(PageRequest::new(2, 10), 20)]
    #[case::zero_size_falls_back(PageRequest::new(1, 0), PageRequest::DEFAULT_PAGE_SIZE)]
    fn test_page_request_offset(#[case] request: PageRequest, #[case] expected: usize) {
        assert_eq!(request.offset(), expected);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(10, 1)]
    #[case(11, 2)]
    fn test_page_total_pages(#[case] total: usize, #[case] pages: usize) {
        let page: Page<u8> = Page::new(Vec::new(), PageRequest::new(0, 10), total);
        assert_eq!(page.total_pages, pages);
    }

    #[test]
    fn test_summary_serialization_uses_uploaded_at() {
        let mut batch = Batch::open(metadata());
        batch.start_processing(1).unwrap();
        batch.record(RowStatus::Created).unwrap();
        batch.complete().unwrap();

        let json = serde_json::to_value(BatchSummary::from(&batch)).unwrap();
        assert_eq!(json["status"], "COMPLETED");
        assert_eq!(json["createdCount"], 1);
        assert_eq!(json["skippedDuplicateCount"], 0);
        assert!(json.get("uploadedAt").is_some());
        assert!(json.get("failureReason").is_none());
    }
}
