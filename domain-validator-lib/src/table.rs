//! Delimited table input and output.
//!
//! The source table is read eagerly into [`Record`]s. Accepted records are
//! appended to a [`RowSink`], which many request tasks share, so every sink
//! serializes its appends internally.

use crate::error::DomainValidatorError;
use crate::types::Record;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Destination for accepted records. Appends may arrive from many tasks at once.
pub trait RowSink: Send + Sync {
    /// Append one record.
    fn write_record(&self, record: &Record) -> Result<(), DomainValidatorError>;

    /// Push buffered rows to the underlying storage.
    fn flush(&self) -> Result<(), DomainValidatorError>;
}

/// Source table contents, with the header split off when requested.
#[derive(Debug, Default)]
pub struct Table {
    pub header: Option<Record>,
    pub records: Vec<Record>,
}

/// Read every row of a delimited table from `reader`.
///
/// Rows may have different widths. With `has_headers`, the first row is
/// returned separately and never becomes a data record. Bytes that are not
/// valid UTF-8 are replaced with U+FFFD instead of failing the whole table.
pub fn read_table<R: Read>(
    reader: R,
    delimiter: u8,
    has_headers: bool,
) -> Result<Table, DomainValidatorError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(reader);

    let mut table = Table::default();
    for (position, row) in csv_reader.byte_records().enumerate() {
        let row = row?;
        let record = Record::new(position, decode_fields(position, &row));
        if has_headers && position == 0 {
            table.header = Some(record);
        } else {
            table.records.push(record);
        }
    }

    Ok(table)
}

fn decode_fields(position: usize, row: &csv::ByteRecord) -> Vec<String> {
    let mut lossy = false;
    let fields = row
        .iter()
        .map(|field| match std::str::from_utf8(field) {
            Ok(text) => text.to_string(),
            Err(_) => {
                lossy = true;
                String::from_utf8_lossy(field).into_owned()
            }
        })
        .collect();
    if lossy {
        tracing::warn!(row = position, "Row is not valid UTF-8, replacing invalid bytes");
    }
    fields
}

/// Read the table at `path`.
///
/// # Errors
///
/// Returns `FileError` if the file cannot be opened and `TableError` if it
/// is not valid delimited text.
pub fn read_table_file<P: AsRef<Path>>(
    path: P,
    delimiter: u8,
    has_headers: bool,
) -> Result<Table, DomainValidatorError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        DomainValidatorError::file_error(
            path.to_string_lossy(),
            format!("Failed to open source table: {}", e),
        )
    })?;
    read_table(file, delimiter, has_headers)
}

/// Mutex-guarded CSV writer.
pub struct CsvSink {
    writer: Mutex<csv::Writer<Box<dyn Write + Send>>>,
}

impl CsvSink {
    /// Wrap any writer.
    pub fn new<W: Write + Send + 'static>(writer: W, delimiter: u8) -> Self {
        let boxed: Box<dyn Write + Send> = Box::new(writer);
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_writer(boxed);
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Create (or truncate) the table at `path`.
    ///
    /// # Errors
    ///
    /// Returns `FileError` if the destination cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Self, DomainValidatorError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            DomainValidatorError::file_error(
                path.to_string_lossy(),
                format!("Failed to create destination table: {}", e),
            )
        })?;
        Ok(Self::new(file, delimiter))
    }

    fn lock(&self) -> MutexGuard<'_, csv::Writer<Box<dyn Write + Send>>> {
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RowSink for CsvSink {
    fn write_record(&self, record: &Record) -> Result<(), DomainValidatorError> {
        self.lock().write_record(record.fields())?;
        Ok(())
    }

    fn flush(&self) -> Result<(), DomainValidatorError> {
        self.lock().flush()?;
        Ok(())
    }
}

/// In-memory sink, handy for library callers that post-process results.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Record>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records written so far, in write order.
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RowSink for MemorySink {
    fn write_record(&self, record: &Record) -> Result<(), DomainValidatorError> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record.clone());
        Ok(())
    }

    fn flush(&self) -> Result<(), DomainValidatorError> {
        Ok(())
    }
}
