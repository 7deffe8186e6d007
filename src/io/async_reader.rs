//! Asynchronous CSV reader with chunked reads
//!
//! Provides a streaming interface over order rows from any async source.
//! Supports chunk reading so large uploads are decoded incrementally.
//!
//! # Design
//!
//! The AsyncRowReader uses:
//! - csv-async for streaming CSV parsing
//! - the csv_format module's [`HeaderLayout`] for header checks and record conversion
//!
//! Row positions follow the same rules as the synchronous reader: 1-based over
//! data records, with records that are not valid UTF-8 yielded as undecodable
//! rows at their position. An I/O error is a structural failure for the whole
//! upload.
//!
//! # Architecture
//!
//! ```text
//! AsyncRead → csv_async::AsyncReader → AsyncRowReader → chunks of RawRow
//!                                            ↓
//!                                    csv_format::HeaderLayout
//! ```

use crate::io::csv_format::HeaderLayout;
use crate::types::{IngestError, RawRow, RowIndex};
use csv_async::{AsyncReaderBuilder, ByteRecord, ErrorKind};
use futures::io::AsyncRead;
use tracing::{error, warn};

/// Asynchronous CSV row reader
pub struct AsyncRowReader<R: AsyncRead + Unpin> {
    reader: csv_async::AsyncReader<R>,
    layout: HeaderLayout,
    record: ByteRecord,
    position: RowIndex,
    finished: bool,
}

impl<R: AsyncRead + Unpin + Send> AsyncRowReader<R> {
    /// Wrap an async reader and validate its header
    pub async fn new(source: R) -> Result<Self, IngestError> {
        let mut reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_reader(source);

        let headers = reader.headers().await.map_err(parse_error)?;
        if headers.is_empty() {
            return Err(IngestError::structural("empty input"));
        }
        let layout = HeaderLayout::from_headers(headers.iter())?;

        Ok(Self {
            reader,
            layout,
            record: ByteRecord::new(),
            position: 0,
            finished: false,
        })
    }

    /// Read up to `chunk_size` rows
    ///
    /// Returns an empty vector once the end of the input is reached.
    pub async fn read_batch(&mut self, chunk_size: usize) -> Result<Vec<RawRow>, IngestError> {
        let mut rows = Vec::with_capacity(chunk_size);

        while !self.finished && rows.len() < chunk_size {
            match self.reader.read_byte_record(&mut self.record).await {
                Ok(true) => {
                    self.position += 1;
                    rows.push(self.layout.decode_row(self.position, self.record.iter()));
                }
                Ok(false) => self.finished = true,
                Err(e) if matches!(e.kind(), ErrorKind::Io(_)) => {
                    self.finished = true;
                    error!(after_row = self.position, "Stopping read after I/O error: {}", e);
                    return Err(IngestError::structural(format!(
                        "read failed after row {}: {}",
                        self.position, e
                    )));
                }
                Err(e) => {
                    self.position += 1;
                    warn!(row = self.position, "Undecodable record: {}", e);
                    rows.push(RawRow::undecodable(self.position, e.to_string()));
                }
            }
        }

        Ok(rows)
    }

    /// Read every remaining row, `chunk_size` records at a time
    pub async fn read_all(&mut self, chunk_size: usize) -> Result<Vec<RawRow>, IngestError> {
        let mut rows = Vec::new();
        loop {
            let chunk = self.read_batch(chunk_size).await?;
            if chunk.is_empty() {
                break;
            }
            rows.extend(chunk);
        }
        Ok(rows)
    }
}

fn parse_error(e: csv_async::Error) -> IngestError {
    IngestError::ParseError {
        line: None,
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    const CSV: &str = "clientReference,receiverName,itemCount\n\
        REF-1,Jane,1\n\
        REF-2,John,2\n\
        REF-3,Mary,3\n\
        REF-4,Alex,4\n\
        REF-5,Sam,5\n";

    #[tokio::test]
    async fn test_read_batch_in_chunks() {
        let mut reader = AsyncRowReader::new(Cursor::new(CSV.as_bytes())).await.unwrap();

        let first = reader.read_batch(2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].client_reference.as_deref(), Some("REF-1"));
        assert_eq!(first[1].row_index, 2);

        let second = reader.read_batch(2).await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].row_index, 3);

        let third = reader.read_batch(2).await.unwrap();
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].receiver_name.as_deref(), Some("Sam"));

        assert!(reader.read_batch(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_all_matches_row_positions() {
        let mut reader = AsyncRowReader::new(Cursor::new(CSV.as_bytes())).await.unwrap();
        let rows = reader.read_all(3).await.unwrap();

        let positions: Vec<usize> = rows.iter().map(|r| r.row_index).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_header_only() {
        let mut reader = AsyncRowReader::new(Cursor::new("receiverName,itemCount\n".as_bytes()))
            .await
            .unwrap();
        assert!(reader.read_batch(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_whitespace_handling() {
        let csv = "  receiverName ,itemCount\n  Jane  ,  3  \n";
        let mut reader = AsyncRowReader::new(Cursor::new(csv.as_bytes())).await.unwrap();

        let rows = reader.read_batch(10).await.unwrap();
        assert_eq!(rows[0].receiver_name.as_deref(), Some("Jane"));
        assert_eq!(rows[0].item_count.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_invalid_utf8_row_keeps_its_position() {
        let mut content = b"senderName,itemCount\nAcme,1\n".to_vec();
        content.extend_from_slice(&[0xff, 0xfe, b',', b'1', b'\n']);
        content.extend_from_slice(b"Globex,3\n");

        let mut reader = AsyncRowReader::new(Cursor::new(content)).await.unwrap();
        let rows = reader.read_all(2).await.unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].row_index, 2);
        assert!(rows[1].decode_error.is_some());
        assert_eq!(rows[2].row_index, 3);
        assert_eq!(rows[2].sender_name.as_deref(), Some("Globex"));
    }

    /// Source that hands out its bytes once, then fails
    struct FailingSource {
        data: Vec<u8>,
    }

    impl AsyncRead for FailingSource {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut [u8],
        ) -> Poll<std::io::Result<usize>> {
            if self.data.is_empty() {
                return Poll::Ready(Err(std::io::Error::other("device went away")));
            }
            let n = self.data.len().min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data.drain(..n);
            Poll::Ready(Ok(n))
        }
    }

    #[tokio::test]
    async fn test_io_error_mid_file_is_structural() {
        let source = FailingSource {
            data: b"receiverName,itemCount\nJane,1\nJohn,2\n".to_vec(),
        };
        let mut reader = AsyncRowReader::new(source).await.unwrap();

        let result = reader.read_all(10).await;

        assert!(matches!(result, Err(IngestError::Structural { .. })));
    }

    #[tokio::test]
    async fn test_structural_failures() {
        let empty = AsyncRowReader::new(Cursor::new(Vec::<u8>::new())).await;
        assert!(matches!(empty, Err(IngestError::Structural { .. })));

        let unknown = AsyncRowReader::new(Cursor::new("a,b,c\n1,2,3\n".as_bytes())).await;
        assert!(matches!(unknown, Err(IngestError::Structural { .. })));
    }
}
