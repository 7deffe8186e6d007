//! CSV format handling for order rows and ingestion output
//!
//! This module centralizes all CSV format concerns, providing:
//! - [`HeaderLayout`] mapping header positions to known columns, including the
//!   structural checks that decide whether an upload is a row table at all
//! - Conversion from CSV records to [`RawRow`]
//! - The blank upload template
//! - Per-row outcome reports (CSV) and JSON output of results and listings
//!
//! All functions are pure apart from writing to the supplied writer.

use crate::types::{BatchResult, Column, IngestError, RawRow, RowIndex};
use serde::Serialize;
use std::io::Write;
use tracing::{debug, warn};

/// Position → column mapping taken from the header record
///
/// Columns the header does not name are left out; their cells decode to
/// `None`. Header names the schema does not know are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLayout {
    columns: Vec<Option<Column>>,
}

impl HeaderLayout {
    /// Build the layout from header names, rejecting structurally unusable headers
    ///
    /// Fails when the header is missing (no names, or only blank ones) or
    /// names none of the known columns.
    pub fn from_headers<'a>(
        headers: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, IngestError> {
        let names: Vec<&str> = headers.into_iter().map(str::trim).collect();
        if names.iter().all(|name| name.is_empty()) {
            return Err(IngestError::structural("missing header row"));
        }

        let columns: Vec<Option<Column>> =
            names.iter().map(|name| Column::from_header(name)).collect();
        if columns.iter().all(Option::is_none) {
            return Err(IngestError::structural(
                "header names none of the expected columns",
            ));
        }

        for (name, column) in names.iter().zip(&columns) {
            if column.is_none() && !name.is_empty() {
                debug!(header = *name, "ignoring unknown column");
            }
        }

        Ok(Self { columns })
    }

    /// Columns the header names, in header order
    pub fn known_columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.columns.iter().filter_map(|column| *column)
    }

    /// Convert one record into a row at `row_index`
    ///
    /// Blank cells and cells past the end of a short record are `None`; cells
    /// past the end of the header are dropped.
    pub fn to_row<'a>(&self, row_index: RowIndex, record: impl IntoIterator<Item = &'a str>) -> RawRow {
        let mut row = RawRow::new(row_index);
        for (column, cell) in self.columns.iter().zip(record) {
            let Some(column) = column else {
                continue;
            };
            let cell = cell.trim();
            if !cell.is_empty() {
                row = row.with(*column, cell);
            }
        }
        row
    }

    /// Decode raw record bytes into a row at `row_index`
    ///
    /// A record with a cell that is not valid UTF-8 still yields a row, marked
    /// undecodable, so its position is reported rather than lost.
    pub fn decode_row<'a>(
        &self,
        row_index: RowIndex,
        record: impl IntoIterator<Item = &'a [u8]>,
    ) -> RawRow {
        let cells: Result<Vec<&str>, _> = record.into_iter().map(std::str::from_utf8).collect();
        match cells {
            Ok(cells) => self.to_row(row_index, cells),
            Err(e) => {
                warn!(row = row_index, "Record is not valid UTF-8: {}", e);
                RawRow::undecodable(row_index, format!("row is not valid UTF-8: {}", e))
            }
        }
    }
}

/// Write the blank upload template: the header row only
pub fn write_template_csv(output: &mut dyn Write) -> Result<(), IngestError> {
    let mut writer = csv::Writer::from_writer(output);
    writer
        .write_record(Column::ALL.iter().map(Column::as_str))
        .map_err(write_error)?;
    writer.flush()?;
    Ok(())
}

/// Write one line per row outcome
///
/// Columns: row, status, idempotencyBasis, orderId, errors. Multiple errors are
/// joined with `; `.
pub fn write_outcomes_csv(result: &BatchResult, output: &mut dyn Write) -> Result<(), IngestError> {
    let mut writer = csv::Writer::from_writer(output);
    writer
        .write_record(["row", "status", "idempotencyBasis", "orderId", "errors"])
        .map_err(write_error)?;

    for outcome in &result.rows {
        let errors = outcome
            .errors()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        writer.write_record(&[
            outcome.row_index().to_string(),
            outcome.status().to_string(),
            outcome
                .idempotency_basis()
                .map(|basis| basis.to_string())
                .unwrap_or_default(),
            outcome
                .order_id()
                .map(|id| id.to_string())
                .unwrap_or_default(),
            errors,
        ])
        .map_err(write_error)?;
    }

    writer.flush()?;
    Ok(())
}

/// Pretty-print any result or listing as JSON followed by a newline
pub fn write_json<T: Serialize + ?Sized>(
    value: &T,
    output: &mut dyn Write,
) -> Result<(), IngestError> {
    serde_json::to_writer_pretty(&mut *output, value)
        .map_err(|e| IngestError::IoError {
            message: format!("Failed to write JSON output: {}", e),
        })?;
    writeln!(output)?;
    Ok(())
}

fn write_error(e: csv::Error) -> IngestError {
    IngestError::IoError {
        message: format!("Failed to write CSV output: {}", e),
    }
}
