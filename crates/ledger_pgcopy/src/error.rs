//! Error types for schema compilation, field encoding and frame decoding.

use std::io;
use thiserror::Error;

/// Errors raised while compiling encoders or encoding a row.
///
/// Any of these is fatal for the stream being written: a field with the
/// wrong length desynchronizes every row after it.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Column '{column}': unsupported wire type '{type_name}' (category {category})")]
    UnsupportedType {
        column: &'static str,
        category: char,
        type_name: &'static str,
    },

    #[error("Column '{column}': unsupported array element type OID {oid}")]
    UnsupportedElementType { column: &'static str, oid: u32 },

    #[error("Column '{column}' is NOT NULL but no value was supplied")]
    NullViolation { column: &'static str },

    #[error("Column '{column}': expected {expected} value, got {found}")]
    TypeMismatch {
        column: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Column '{column}': value of {length} characters exceeds limit of {limit}")]
    ValueTooLong {
        column: &'static str,
        length: usize,
        limit: usize,
    },

    #[error("Column '{column}': text contains a NUL byte at offset {offset}")]
    NulByte { column: &'static str, offset: usize },

    #[error("Column '{column}': encoded field of {size} bytes exceeds the 32-bit length prefix")]
    FieldTooLarge { column: &'static str, size: usize },

    #[error("Row of {count} fields exceeds the 16-bit field count")]
    TooManyFields { count: usize },

    #[error("Table '{table}': {values} values supplied for {columns} columns")]
    ArityMismatch {
        table: &'static str,
        columns: usize,
        values: usize,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, EncodeError>;

/// Errors raised while reading a framed binary COPY stream back.
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("Missing or invalid binary COPY signature")]
    BadSignature,

    #[error("Unsupported header flags: {0:#010x}")]
    UnsupportedFlags(u32),

    #[error("Stream truncated at byte {offset}")]
    Truncated { offset: usize },

    #[error("Invalid field length {length} at byte {offset}")]
    InvalidLength { length: i32, offset: usize },

    #[error("Invalid field count {count} at byte {offset}")]
    InvalidFieldCount { count: i16, offset: usize },

    #[error("{trailing} bytes after trailer")]
    TrailingBytes { trailing: usize },

    #[error("Malformed {kind} payload: {reason}")]
    Malformed { kind: &'static str, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
