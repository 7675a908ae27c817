//! Typed errors for the core crate.

use thiserror::Error;

/// Errors raised while validating a field list.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("field list is empty")]
    Empty,

    #[error("field {0:?} is listed more than once")]
    Duplicate(String),

    #[error("field {0:?} is not a valid SQL identifier")]
    InvalidIdentifier(String),
}

/// Errors raised while parsing an operator-supplied reference time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeError {
    #[error("cannot parse time {0:?}, expected hh:mm or yyyy-mm-ddThh:mm")]
    Unparseable(String),

    #[error("time {0:?} does not exist in the selected time zone")]
    Nonexistent(String),
}

/// Errors that can occur while loading a single log file.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Fetching the object from storage failed.
    #[error("fetching object: {0}")]
    Storage(#[from] object_store::Error),

    /// The object body is not a valid gzip stream.
    #[error("decompressing: {0}")]
    Decompress(#[source] std::io::Error),

    /// The delimited record reader rejected the input.
    #[error("parsing: {0}")]
    Csv(#[from] csv::Error),

    /// A record does not have one value per schema field.
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// The local store rejected a statement.
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    /// Any of the above, tagged with the object key being loaded.
    #[error("ingesting {key:?}: {source}")]
    File {
        key: String,
        #[source]
        source: Box<IngestError>,
    },
}

impl IngestError {
    /// Attach the object key a failure belongs to.
    pub fn for_key(self, key: &str) -> Self {
        IngestError::File {
            key: key.to_string(),
            source: Box::new(self),
        }
    }
}
