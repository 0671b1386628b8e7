//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over account seeds or transfer records from
//! a CSV file. Delegates CSV format concerns to the csv_format module.
//!
//! # Design
//!
//! `SyncReader<T>` uses csv::Reader to read and deserialize rows one at a
//! time into `T::Raw`, then converts them through `CsvRow::from_raw`. The
//! whole file is never loaded into memory.
//!
//! ```no_run
//! use rust_ledger_engine::io::sync_reader::SyncReader;
//! use rust_ledger_engine::types::TransferRecord;
//! use std::path::Path;
//!
//! let reader = SyncReader::<TransferRecord>::open(Path::new("transfers.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(record) => println!("Transfer: {:?}", record),
//!         Err(e) => eprintln!("Skipping row: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `open()`
//! - Individual row errors are yielded as Err variants in the iterator, with
//!   the 1-based file line number (the header is line 1)

use crate::io::csv_format::{at_line, CsvRow};
use crate::types::LedgerError;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::{self, Read};
use std::marker::PhantomData;
use std::path::Path;

/// Synchronous CSV reader yielding `T` per row
#[derive(Debug)]
pub struct SyncReader<T, R = File> {
    reader: csv::Reader<R>,
    line_num: u64,
    _row: PhantomData<fn() -> T>,
}

/// Map a failed open onto the error the caller can act on
pub(crate) fn open_error(path: &Path, error: io::Error) -> LedgerError {
    if error.kind() == io::ErrorKind::NotFound {
        LedgerError::FileNotFound {
            path: path.display().to_string(),
        }
    } else {
        LedgerError::IoError {
            message: format!("Failed to open file '{}': {}", path.display(), error),
        }
    }
}

impl<T: CsvRow> SyncReader<T, File> {
    /// Open a CSV file for streaming iteration
    ///
    /// The CSV reader is configured to:
    /// - Trim whitespace from all fields
    /// - Allow flexible field counts (for optional trailing columns)
    /// - Use an 8KB buffer
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|e| open_error(path, e))?;
        Ok(Self::from_reader(file))
    }
}

impl<T: CsvRow, R: Read> SyncReader<T, R> {
    pub fn from_reader(reader: R) -> Self {
        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(reader);

        Self {
            reader,
            line_num: 1,
            _row: PhantomData,
        }
    }
}

impl<T: CsvRow, R: Read> Iterator for SyncReader<T, R> {
    type Item = Result<T, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<T::Raw>();
        let row = deserializer.next()?;
        self.line_num += 1;

        match row {
            Ok(raw) => Some(T::from_raw(raw).map_err(|e| at_line(e, self.line_num))),
            Err(e) => Some(Err(at_line(e.into(), self.line_num))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountSeed, TransferRecord};
    use rust_decimal::Decimal;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_open_missing_file() {
        let result = SyncReader::<TransferRecord>::open(Path::new("nonexistent.csv"));

        assert_eq!(
            result.unwrap_err(),
            LedgerError::FileNotFound {
                path: "nonexistent.csv".to_string()
            }
        );
    }

    #[test]
    fn test_reads_accounts_with_optional_balance() {
        let file = create_temp_csv("owner,initial_deposit,balance\n1,500.00,700.00\n2,250.00,\n");

        let seeds: Vec<AccountSeed> = SyncReader::<AccountSeed>::open(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].balance, Decimal::new(70000, 2));
        assert_eq!(seeds[1].balance, Decimal::new(25000, 2));
    }

    #[test]
    fn test_reads_accounts_without_balance_column() {
        let csv = "owner,initial_deposit\n1,10.00\n";

        let seeds: Vec<AccountSeed> = SyncReader::<AccountSeed, _>::from_reader(csv.as_bytes())
            .filter_map(Result::ok)
            .collect();

        assert_eq!(seeds, vec![AccountSeed::opening(1, Decimal::new(1000, 2))]);
    }

    #[test]
    fn test_reads_transfers_in_order() {
        let csv = "from,to,amount\n1,2,10.00\n2,3,5.50\n3,1,0.01\n";

        let records: Vec<TransferRecord> = SyncReader::<TransferRecord, _>::from_reader(csv.as_bytes())
            .filter_map(Result::ok)
            .collect();

        assert_eq!(
            records,
            vec![
                TransferRecord::new(1, 2, Decimal::new(1000, 2)),
                TransferRecord::new(2, 3, Decimal::new(550, 2)),
                TransferRecord::new(3, 1, Decimal::new(1, 2)),
            ]
        );
    }

    #[test]
    fn test_errors_carry_line_numbers_and_reading_continues() {
        let csv = "from,to,amount\n1,2,10.00\n2,x,5.00\n1,2,abc\n3,1,1.00\n";

        let records: Vec<_> = SyncReader::<TransferRecord, _>::from_reader(csv.as_bytes()).collect();

        assert_eq!(records.len(), 4);
        assert!(records[0].is_ok());
        assert!(matches!(
            records[1],
            Err(LedgerError::ParseError { line: Some(3), .. })
        ));
        assert!(matches!(
            records[2],
            Err(LedgerError::ParseError { line: Some(4), .. })
        ));
        assert!(records[3].is_ok());
    }

    #[test]
    fn test_handles_whitespace_and_empty_body() {
        let csv = "from,to,amount\n  1 ,  2 ,  3.00  \n";
        let records: Vec<TransferRecord> = SyncReader::<TransferRecord, _>::from_reader(csv.as_bytes())
            .filter_map(Result::ok)
            .collect();
        assert_eq!(records, vec![TransferRecord::new(1, 2, Decimal::new(300, 2))]);

        let empty: Vec<_> =
            SyncReader::<TransferRecord, _>::from_reader("from,to,amount\n".as_bytes()).collect();
        assert!(empty.is_empty());
    }
}
