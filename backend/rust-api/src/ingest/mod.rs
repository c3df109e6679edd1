//! Spreadsheet ingestion: decode an uploaded file, validate each row against
//! a schema and partition the rows into accepted records and diagnostics.

pub mod engine;
pub mod table;
pub mod validator;

pub use engine::{ingest, ingest_upload, Ingested};
pub use table::{CellValue, FileFormat, RawRow, Table};
pub use validator::{validate_row, Record, Schema};
