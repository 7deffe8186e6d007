//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over order rows from any `Read` source.
//! Header handling and record conversion live in the csv_format module.
//!
//! # Design
//!
//! The SyncReader reads the header once on construction, rejecting inputs
//! that are not a row table (empty, no header, no known columns). After that
//! it yields one [`RawRow`] per CSV record.
//!
//! # Row positions
//!
//! Positions are 1-based over data records. A record whose bytes are not valid
//! UTF-8 still yields a row at its position, marked undecodable, so it gets a
//! FAILED_VALIDATION outcome instead of vanishing. An I/O error while reading
//! ends iteration with a structural error: a truncated file is never passed
//! off as a complete one.
//!
//! ```no_run
//! use bulk_order_engine::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::open(Path::new("orders.csv")).unwrap();
//! for row in reader {
//!     let row = row.unwrap();
//!     println!("row {}: {:?}", row.row_index, row.client_reference);
//! }
//! ```

use crate::core::RowExtractor;
use crate::io::csv_format::HeaderLayout;
use crate::types::{IngestError, RawRow, RowIndex};
use csv::{ByteRecord, ReaderBuilder, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{error, warn};

/// Synchronous CSV reader
///
/// Maintains streaming behavior: one record is held in memory at a time.
#[derive(Debug)]
pub struct SyncReader<R> {
    reader: csv::Reader<R>,
    layout: HeaderLayout,
    record: ByteRecord,
    failed: bool,
    position: RowIndex,
}

impl SyncReader<File> {
    /// Open a CSV file and read its header
    pub fn open(path: &Path) -> Result<Self, IngestError> {
        let file = File::open(path).map_err(|e| IngestError::open_failed(path, e))?;
        Self::from_reader(file)
    }
}

impl<R: Read> SyncReader<R> {
    /// Wrap a reader and validate its header
    ///
    /// The CSV reader is configured to:
    /// - Trim whitespace from headers and fields
    /// - Allow flexible field counts (short and long records are both accepted)
    /// - Use an 8KB buffer
    pub fn from_reader(source: R) -> Result<Self, IngestError> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(source);

        let headers = reader.headers()?;
        if headers.is_empty() {
            return Err(IngestError::structural("empty input"));
        }
        let layout = HeaderLayout::from_headers(headers.iter())?;

        Ok(Self {
            reader,
            layout,
            record: ByteRecord::new(),
            position: 0,
            failed: false,
        })
    }

    pub fn layout(&self) -> &HeaderLayout {
        &self.layout
    }
}

impl<R: Read> Iterator for SyncReader<R> {
    type Item = Result<RawRow, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.reader.read_byte_record(&mut self.record) {
            Ok(true) => {
                self.position += 1;
                Some(Ok(self.layout.decode_row(self.position, self.record.iter())))
            }
            Ok(false) => None,
            Err(e) if e.is_io_error() => {
                self.failed = true;
                error!(after_row = self.position, "Stopping read after I/O error: {}", e);
                Some(Err(IngestError::structural(format!(
                    "read failed after row {}: {}",
                    self.position, e
                ))))
            }
            Err(e) => {
                self.position += 1;
                warn!(row = self.position, "Undecodable record: {}", e);
                Some(Ok(RawRow::undecodable(self.position, e.to_string())))
            }
        }
    }
}

/// [`RowExtractor`] for CSV uploads held in memory
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvRowExtractor;

impl RowExtractor for CsvRowExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<RawRow>, IngestError> {
        SyncReader::from_reader(bytes)?.collect()
    }
}
