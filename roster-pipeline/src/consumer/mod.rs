//! Record sources.
//!
//! A roster file is a CSV document whose first row names the columns. Rows
//! are read without interpretation; [`ColumnIndex`] resolves the named fields.

use std::collections::HashMap;
use std::io::Read;

use futures::stream::{self, Stream};
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::IngestionError;

/// Rows buffered between the blocking reader and the pipeline.
const READ_AHEAD: usize = 1024;

/// One raw CSV row.
pub type Record = Vec<String>;

pub const GROUP_ID: &str = "group_id";
pub const GROUP: &str = "group";
pub const ID: &str = "id";
pub const NAME: &str = "name";
pub const SORT_NAME: &str = "sort_name";
pub const EMAIL: &str = "email";

/// Columns a roster header must name.
pub const REQUIRED_COLUMNS: [&str; 6] = [GROUP_ID, GROUP, ID, NAME, SORT_NAME, EMAIL];

/// Maps header names to column positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    /// Build the index from a header row, failing if a required column is
    /// absent. Extra columns are ignored.
    pub fn from_header(header: &[String]) -> Result<Self, IngestionError> {
        let mut positions = HashMap::new();
        for (position, name) in header.iter().enumerate() {
            let name = name.trim_start_matches('\u{feff}').trim();
            positions.entry(name.to_string()).or_insert(position);
        }

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|column| !positions.contains_key(*column))
            .collect();
        if !missing.is_empty() {
            return Err(IngestionError::configuration(format!(
                "Missing required columns: {}",
                missing.join(", ")
            )));
        }

        Ok(Self { positions })
    }

    /// The trimmed value of `column` in `record`, if present and non-blank.
    pub fn field<'a>(&self, record: &'a [String], column: &str) -> Option<&'a str> {
        let position = *self.positions.get(column)?;
        record
            .get(position)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

/// Stream the rows of a CSV document, header included.
///
/// Read failures are reported with their one-based row number, the header
/// being row 0.
pub fn csv_records<R: Read + Unpin>(reader: R) -> impl Stream<Item = Result<Record, IngestionError>> + Unpin {
    stream::iter(read_rows(reader))
}

fn read_rows<R: Read>(reader: R) -> impl Iterator<Item = Result<Record, IngestionError>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    reader.into_records().enumerate().map(|(row, result)| {
        result
            .map(|record| record.iter().map(str::to_string).collect())
            .map_err(|e| IngestionError::source(row, e))
    })
}

/// Like [`csv_records`], but the reader is drained on the blocking thread
/// pool so file reads never stall the runtime.
///
/// Rows arrive in file order through a bounded channel. Dropping the stream
/// stops the reader at its next row.
pub fn spawn_csv_reader<R>(reader: R) -> impl Stream<Item = Result<Record, IngestionError>> + Unpin
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel(READ_AHEAD);
    tokio::task::spawn_blocking(move || {
        for row in read_rows(reader) {
            if tx.blocking_send(row).is_err() {
                debug!("Row consumer went away, stopping reader");
                return;
            }
        }
    });

    Box::pin(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|row| (row, rx))
    }))
}
