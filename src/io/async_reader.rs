//! Asynchronous CSV reader with batch interface
//!
//! Provides a streaming interface over transaction requests from a CSV file
//! for the concurrent strategy.
//!
//! # Design
//!
//! The AsyncReader uses:
//! - csv-async for streaming CSV parsing
//! - tokio (through the `tokio-util` compat layer) for file I/O
//! - Batch reading so a whole batch can be fanned out across accounts
//!
//! ```text
//! CSV file → AsyncReader → Vec<TransactionRequest> batches
//!                ↓
//!         csv_format module
//!         (CsvRecord, convert_csv_record)
//! ```

use std::path::Path;

use csv_async::{AsyncReaderBuilder, StringRecord};
use futures::io::AsyncRead;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::warn;

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::{LedgerError, TransactionRequest};

/// Asynchronous CSV reader
///
/// Keeps memory bounded by the batch size, not the file size.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    headers: Option<StringRecord>,
    skipped: usize,
}

fn io_error(error: csv_async::Error) -> LedgerError {
    LedgerError::IoError {
        message: error.to_string(),
    }
}

/// Pair the row with the headers it actually has, so absent trailing
/// columns take their serde defaults
fn deserialize_row(
    record: &StringRecord,
    headers: &StringRecord,
) -> csv_async::Result<CsvRecord> {
    if record.len() < headers.len() {
        let mut present = headers.clone();
        present.truncate(record.len());
        record.deserialize(Some(&present))
    } else {
        record.deserialize(Some(headers))
    }
}

impl AsyncReader<Compat<tokio::fs::File>> {
    /// Open a request file
    pub async fn open(path: &Path) -> Result<Self, LedgerError> {
        let file = tokio::fs::File::open(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LedgerError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => LedgerError::IoError {
                message: format!("Failed to open file '{}': {}", path.display(), e),
            },
        })?;

        Ok(Self::new(file.compat()))
    }
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            headers: None,
            skipped: 0,
        }
    }

    async fn headers(&mut self) -> Result<StringRecord, LedgerError> {
        if let Some(headers) = &self.headers {
            return Ok(headers.clone());
        }
        let headers = self.csv_reader.headers().await.map_err(io_error)?.clone();
        self.headers = Some(headers.clone());
        Ok(headers)
    }

    /// Read up to `batch_size` requests
    ///
    /// Rows that cannot be parsed are logged and skipped. Returns an empty
    /// vector at end of file.
    ///
    /// # Errors
    ///
    /// `LedgerError::IoError` if the header or the stream cannot be read.
    pub async fn read_batch(
        &mut self,
        batch_size: usize,
    ) -> Result<Vec<TransactionRequest>, LedgerError> {
        let headers = self.headers().await?;
        let mut batch = Vec::with_capacity(batch_size);
        let mut record = StringRecord::new();

        while batch.len() < batch_size {
            match self.csv_reader.read_record(&mut record).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) if e.is_io_error() => return Err(io_error(e)),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed row");
                    self.skipped += 1;
                    continue;
                }
            }

            match deserialize_row(&record, &headers)
                .map_err(|e| e.to_string())
                .and_then(convert_csv_record)
            {
                Ok(request) => batch.push(request),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed row");
                    self.skipped += 1;
                }
            }
        }

        Ok(batch)
    }

    /// Number of rows skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::io::Cursor;

    fn reader(content: &'static str) -> AsyncReader<Cursor<&'static [u8]>> {
        AsyncReader::new(Cursor::new(content.as_bytes()))
    }

    #[tokio::test]
    async fn test_async_reader_read_batch() {
        let mut async_reader = reader(
            "account,kind,amount,description\n1,c,100,a\n1,d,50,b\n2,c,200,c\n",
        );

        let batch = async_reader.read_batch(2).await.unwrap();
        assert_eq!(
            batch,
            vec![
                TransactionRequest::credit(1, 100, "a"),
                TransactionRequest::debit(1, 50, "b"),
            ]
        );

        let batch = async_reader.read_batch(2).await.unwrap();
        assert_eq!(batch, vec![TransactionRequest::credit(2, 200, "c")]);

        assert!(async_reader.read_batch(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_empty_csv() {
        let mut async_reader = reader("account,kind,amount,description\n");

        assert!(async_reader.read_batch(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_skips_malformed_rows() {
        let mut async_reader = reader(
            "account,kind,amount,description\n\
             1,c,12.5,a\n\
             x,c,1,b\n\
             3,d,7,c\n",
        );

        let batch = async_reader.read_batch(10).await.unwrap();

        assert_eq!(batch, vec![TransactionRequest::debit(3, 7, "c")]);
        assert_eq!(async_reader.skipped(), 2);
    }

    #[tokio::test]
    async fn test_async_reader_keeps_unvalidated_fields() {
        let mut async_reader = reader("account,kind,amount,description\n  4 , z , 0 , \n");

        let batch = async_reader.read_batch(10).await.unwrap();

        assert_eq!(batch, vec![TransactionRequest::new(4, 0, "z", "")]);
    }

    #[tokio::test]
    async fn test_async_reader_short_rows() {
        let mut async_reader = reader("account,kind,amount,description\n1,d\n2,c,5\n");

        let batch = async_reader.read_batch(10).await.unwrap();

        assert_eq!(batch, vec![TransactionRequest::credit(2, 5, "")]);
        assert_eq!(async_reader.skipped(), 1);
    }

    #[tokio::test]
    async fn test_async_reader_unreadable_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut async_reader = AsyncReader::open(dir.path()).await.unwrap();

        let result = async_reader.read_batch(10).await;

        assert!(matches!(result, Err(LedgerError::IoError { .. })));
        assert_eq!(async_reader.skipped(), 0);
    }

    #[tokio::test]
    async fn test_async_reader_open_missing_file() {
        let result = AsyncReader::open(Path::new("nonexistent.csv")).await;

        assert!(matches!(result, Err(LedgerError::FileNotFound { .. })));
    }
}
