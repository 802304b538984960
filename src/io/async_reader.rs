//! Asynchronous CSV reader with batch interface
//!
//! Provides a streaming interface over replay records from a CSV file.
//! Supports batch reading for the async processing strategy.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of ReplayRecords
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```

use crate::io::csv_format::{convert_csv_record, CsvRecord, ReplayRecord};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous CSV reader for replay records
///
/// Wraps csv-async's deserializer and converts rows as they are read.
/// Malformed rows are logged and skipped.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: u64,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 1,
        }
    }

    /// Read up to `batch_size` valid records
    ///
    /// Returns fewer records only at end of input; an empty batch means the
    /// input is exhausted.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<ReplayRecord> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            let Some(next) = records.next().await else {
                break;
            };
            self.line_num += 1;
            let line = self.line_num;

            match next {
                Ok(csv_record) => match convert_csv_record(csv_record) {
                    Ok(operation) => batch.push(ReplayRecord { line, operation }),
                    Err(e) => tracing::warn!(line, error = %e, "skipping invalid record"),
                },
                Err(e) => tracing::warn!(line, error = %e, "skipping malformed CSV row"),
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::csv_format::ReplayOperation;
    use crate::types::Money;
    use futures::io::Cursor;

    const HEADER: &str = "type,account,counterparty,amount,card,secret,memo\n";

    #[tokio::test]
    async fn test_async_reader_read_batch() {
        let csv_content = format!(
            "{}deposit,0001/1001,,100.0\ndeposit,0001/1002,,50.0\nblock,0001/1001\n",
            HEADER
        );
        let mut async_reader = AsyncReader::new(Cursor::new(csv_content.into_bytes()));

        let batch = async_reader.read_batch(2).await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].line, 2);
        assert!(matches!(
            batch[0].operation,
            ReplayOperation::Deposit { amount, .. } if amount == Money::from_units(100)
        ));
        assert_eq!(batch[1].line, 3);

        let batch = async_reader.read_batch(2).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].operation.name(), "block");
        assert_eq!(batch[0].line, 4);

        assert!(async_reader.read_batch(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_empty_csv() {
        let mut async_reader = AsyncReader::new(Cursor::new(HEADER.as_bytes().to_vec()));
        assert!(async_reader.read_batch(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_skips_invalid_records() {
        let csv_content = format!(
            "{}withdraw,0001/1001,,100.0\ndeposit,0001/1001,,50.0\n",
            HEADER
        );
        let mut async_reader = AsyncReader::new(Cursor::new(csv_content.into_bytes()));

        let batch = async_reader.read_batch(10).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].line, 3);
    }
}
