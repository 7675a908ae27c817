//! alblogs core - access-log field schema, SQLite schema builder and ingestion
//!
//! This crate turns an ordered list of access-log field names into a SQLite
//! table with a deduplicating unique index, and loads gzip-compressed,
//! space-delimited log files into it one transaction per file.

pub mod error;
pub mod fields;
pub mod ingest;
pub mod reftime;
pub mod schema;

pub use error::{IngestError, SchemaError, TimeError};
pub use fields::{default_fields, FieldSchema};
pub use ingest::{open_store, IngestionEngine};
pub use reftime::{parse_reference_time, CANDIDATE_WINDOW};
pub use schema::{ColumnType, SchemaBuilder, TableSchema, UniqueKey};
