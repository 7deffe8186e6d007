//! I/O module
//!
//! Handles CSV parsing, output and persistence between runs.
//!
//! # Components
//!
//! - `csv_format` - Header layout, record conversion, template and result output
//! - `sync_reader` - Synchronous CSV reader with iterator interface, plus the
//!   in-memory [`CsvRowExtractor`]
//! - `async_reader` - Asynchronous CSV reader with chunked reads
//! - `snapshot` - JSON snapshot of orders and batches

pub mod async_reader;
pub mod csv_format;
pub mod snapshot;
pub mod sync_reader;

pub use async_reader::AsyncRowReader;
pub use csv_format::{write_json, write_outcomes_csv, write_template_csv, HeaderLayout};
pub use snapshot::Snapshot;
pub use sync_reader::{CsvRowExtractor, SyncReader};
