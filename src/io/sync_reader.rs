//! Synchronous CSV readers
//!
//! [`SyncReader`] streams transaction requests from a CSV file, one row at a
//! time, for the sequential strategy. [`read_account_seeds`] loads the whole
//! (small) seed file up front.
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, unreadable header) are returned from `new()`
//! - Individual row errors are yielded as `Err` items and carry the line number
//! - I/O errors while streaming are yielded as [`LedgerError::IoError`]
//! - Missing trailing columns take their serde defaults

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::{AccountSeed, LedgerError, TransactionRequest};

/// Open `path`, mapping a missing file to [`LedgerError::FileNotFound`]
pub(crate) fn open_input(path: &Path) -> Result<File, LedgerError> {
    File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => LedgerError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => LedgerError::IoError {
            message: format!("Failed to open file '{}': {}", path.display(), e),
        },
    })
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .buffer_capacity(8 * 1024)
        .from_reader(reader)
}

/// Deserialize a row that may stop short of the header
///
/// Only the headers the row actually has are paired with fields, so absent
/// trailing columns fall back to `#[serde(default)]`.
fn deserialize_row<D: DeserializeOwned>(
    record: &StringRecord,
    headers: &StringRecord,
) -> csv::Result<D> {
    if record.len() < headers.len() {
        let mut present = headers.clone();
        present.truncate(record.len());
        record.deserialize(Some(&present))
    } else {
        record.deserialize(Some(headers))
    }
}

/// Streaming reader over transaction request rows
#[derive(Debug)]
pub struct SyncReader<R = File> {
    reader: csv::Reader<R>,
    headers: StringRecord,
}

impl SyncReader<File> {
    /// Open a request file
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReader)` if the file opened
    /// * `Err(LedgerError::FileNotFound)` / `Err(LedgerError::IoError)` otherwise
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        Self::from_reader(open_input(path)?)
    }
}

impl<R: Read> SyncReader<R> {
    pub fn from_reader(reader: R) -> Result<Self, LedgerError> {
        let mut reader = csv_reader(reader);
        let headers = reader.headers()?.clone();
        Ok(Self { reader, headers })
    }
}

impl<R: Read> Iterator for SyncReader<R> {
    type Item = Result<TransactionRequest, LedgerError>;

    /// Next request, or the reason the row could not be used
    fn next(&mut self) -> Option<Self::Item> {
        let mut record = StringRecord::new();
        match self.reader.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => return Some(Err(e.into())),
        }

        let line = record.position().map(|pos| pos.line());
        let item = deserialize_row::<CsvRecord>(&record, &self.headers)
            .map_err(LedgerError::from)
            .and_then(|csv_record| {
                convert_csv_record(csv_record)
                    .map_err(|message| LedgerError::ParseError { line, message })
            });
        Some(item)
    }
}

/// Load account seeds from a CSV file with columns `id,name,limit[,balance]`
///
/// Unlike request files, a malformed seed row is fatal: the ledger must not
/// start with a partial account table.
pub fn read_account_seeds(path: &Path) -> Result<Vec<AccountSeed>, LedgerError> {
    read_account_seeds_from(open_input(path)?)
}

pub fn read_account_seeds_from<R: Read>(reader: R) -> Result<Vec<AccountSeed>, LedgerError> {
    let mut reader = csv_reader(reader);
    let headers = reader.headers()?.clone();

    let mut seeds = Vec::new();
    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        seeds.push(deserialize_row::<AccountSeed>(&record, &headers)?);
    }
    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn read_all(content: &str) -> Vec<Result<TransactionRequest, LedgerError>> {
        SyncReader::from_reader(content.as_bytes()).unwrap().collect()
    }

    #[test]
    fn test_sync_reader_new_fails_on_missing_file() {
        let result = SyncReader::new(Path::new("nonexistent.csv"));

        assert!(matches!(result, Err(LedgerError::FileNotFound { .. })));
    }

    #[test]
    fn test_sync_reader_reads_file() {
        let file = create_temp_csv("account,kind,amount,description\n1,c,100,salary\n");

        let records: Vec<_> = SyncReader::new(file.path()).unwrap().collect();

        assert_eq!(records, vec![Ok(TransactionRequest::credit(1, 100, "salary"))]);
    }

    #[test]
    fn test_sync_reader_trims_whitespace() {
        let records = read_all("account,kind,amount,description\n  2 , d ,  50 , rent \n");

        assert_eq!(records, vec![Ok(TransactionRequest::debit(2, 50, "rent"))]);
    }

    #[test]
    fn test_sync_reader_reports_line_and_continues() {
        let records = read_all(
            "account,kind,amount,description\n\
             1,c,100,a\n\
             2,c,1.5,b\n\
             3,c,75,c\n",
        );

        assert_eq!(records.len(), 3);
        assert!(records[0].is_ok());
        assert!(records[2].is_ok());
        match &records[1] {
            Err(LedgerError::ParseError { line, message }) => {
                assert_eq!(*line, Some(3));
                assert!(message.contains("Invalid amount"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_sync_reader_bad_account_column() {
        let records = read_all("account,kind,amount,description\nabc,c,1,x\n1,c,1,y\n");

        assert!(matches!(records[0], Err(LedgerError::ParseError { .. })));
        assert_eq!(records[1], Ok(TransactionRequest::credit(1, 1, "y")));
    }

    #[test]
    fn test_sync_reader_missing_description_is_passed_through() {
        let records = read_all("account,kind,amount,description\n1,c,1\n");

        assert_eq!(records, vec![Ok(TransactionRequest::credit(1, 1, ""))]);
    }

    #[test]
    fn test_sync_reader_new_fails_on_unreadable_input() {
        let dir = tempfile::tempdir().unwrap();

        let result = SyncReader::new(dir.path());

        assert!(matches!(result, Err(LedgerError::IoError { .. })));
    }

    #[test]
    fn test_sync_reader_short_rows() {
        let records = read_all("account,kind,amount,description\n1,d\n2,c,5\n");

        // Only the description may be left out
        assert!(matches!(records[0], Err(LedgerError::ParseError { .. })));
        assert_eq!(records[1], Ok(TransactionRequest::credit(2, 5, "")));
    }

    #[test]
    fn test_sync_reader_empty_file_after_header() {
        assert!(read_all("account,kind,amount,description\n").is_empty());
    }

    #[test]
    fn test_read_account_seeds() {
        let file = create_temp_csv("id,name,limit,balance\n1,alpha,1000\n2,beta,50,-20\n3,gamma,0\n");

        let seeds = read_account_seeds(file.path()).unwrap();

        let mut beta = AccountSeed::new(2, "beta", 50);
        beta.balance = -20;
        assert_eq!(
            seeds,
            vec![
                AccountSeed::new(1, "alpha", 1000),
                beta,
                AccountSeed::new(3, "gamma", 0),
            ]
        );
    }

    #[test]
    fn test_read_account_seeds_unreadable_input() {
        let dir = tempfile::tempdir().unwrap();

        let result = read_account_seeds(dir.path());

        assert!(matches!(result, Err(LedgerError::IoError { .. })));
    }

    #[test]
    fn test_read_account_seeds_rejects_bad_row() {
        let result = read_account_seeds_from("id,name,limit\n1,alpha,lots\n".as_bytes());

        assert!(matches!(result, Err(LedgerError::ParseError { .. })));
    }
}
