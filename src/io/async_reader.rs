//! Asynchronous CSV reader with batch interface
//!
//! Provides batch reading over account seeds or transfer records for the
//! async pipeline.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader<R, T> → Batches of T
//!                  ↓
//!           csv_format module
//!           (CsvRow, at_line)
//! ```

use crate::io::csv_format::{at_line, CsvRow};
use crate::types::LedgerError;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use std::marker::PhantomData;
use tracing::warn;

/// Asynchronous CSV reader yielding batches of `T`
pub struct AsyncReader<R: AsyncRead + Unpin, T> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: u64,
    skipped: usize,
    _row: PhantomData<fn() -> T>,
}

impl<R, T> AsyncReader<R, T>
where
    R: AsyncRead + Unpin + Send + 'static,
    T: CsvRow,
    T::Raw: Send + 'static,
{
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 1,
            skipped: 0,
            _row: PhantomData,
        }
    }

    /// Rows skipped so far because they could not be parsed
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Read up to `batch_size` records
    ///
    /// Malformed rows are logged and skipped. Returns an empty vector once the
    /// end of the input is reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<T> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut rows = self.csv_reader.deserialize::<T::Raw>();

        while batch.len() < batch_size {
            let row = match rows.next().await {
                Some(row) => row,
                None => break,
            };
            self.line_num += 1;

            let converted = match row {
                Ok(raw) => T::from_raw(raw).map_err(|e| at_line(e, self.line_num)),
                Err(e) => Err(LedgerError::ParseError {
                    line: Some(self.line_num),
                    message: e.to_string(),
                }),
            };

            match converted {
                Ok(record) => batch.push(record),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed row");
                    self.skipped += 1;
                }
            }
        }

        batch
    }
}
