//! PostgreSQL binary COPY encoding for ledger tables.
//!
//! The pipeline for one table is:
//!
//! 1. [`schema`] declares the table's ordered columns.
//! 2. [`encoder`] compiles each column once into a [`FieldEncoder`].
//! 3. [`extract`] turns an entry into positional [`FieldValue`]s.
//! 4. [`row`] frames the values into a row; [`framing`] writes the file
//!    header and trailer around the rows.
//!
//! [`reader`] decodes framed output back into rows for verification.

pub mod encoder;
pub mod error;
pub mod extract;
pub mod framing;
pub mod numeric;
pub mod reader;
pub mod row;
pub mod schema;

pub use encoder::{FieldEncoder, FieldValue, ScalarEncoder};
pub use error::{EncodeError, FramingError, Result};
pub use extract::{custom_value_text, extract_base, extract_entry, extract_posting};
pub use framing::{write_header, write_trailer, CopyHeader, HEADER_SIZE, TRAILER};
pub use reader::{read_copy, CopyFile, RawRow};
pub use row::{serialize_row, EncoderSet, TableEncoder};
pub use schema::{entry_table, Column, Table, TableKind, TypeCategory};
