//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over replay records from a CSV file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Iterator Interface
//!
//! SyncReader implements the Iterator trait, yielding
//! `Result<ReplayRecord, LedgerError>` for each CSV row:
//!
//! ```no_run
//! use bank_ledger::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("operations.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(record) => println!("line {}: {}", record.line, record.operation.name()),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual record errors are yielded as `LedgerError::Parse` carrying the
//!   input line number
//!
//! Records are read one at a time; the file is never loaded whole.

use crate::io::csv_format::{convert_csv_record, CsvRecord, ReplayRecord};
use crate::types::LedgerError;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous CSV reader for replay records
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl SyncReader {
    /// Open `path` for reading
    ///
    /// The reader trims whitespace and accepts rows that stop after the last
    /// column their operation uses.
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|e| LedgerError::Io {
            message: format!("Failed to open file '{}': {}", path.display(), e),
        })?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            // The header occupies line 1
            line_num: 1,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<ReplayRecord, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvRecord>();
        let next = deserializer.next()?;
        self.line_num += 1;
        let line = self.line_num;

        let result = next
            .map_err(LedgerError::from)
            .and_then(convert_csv_record)
            .map(|operation| ReplayRecord { line, operation })
            .map_err(|e| match e {
                LedgerError::Parse { .. } => e,
                other => LedgerError::Parse {
                    line: Some(line),
                    message: other.to_string(),
                },
            });

        Some(result)
    }
}
