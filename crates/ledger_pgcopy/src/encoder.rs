//! Field encoders compiled once per column.
//!
//! [`FieldEncoder::compile`] resolves a [`Column`] to one of a small closed
//! set of scalar encoders, optionally wrapped as an array of that scalar.
//! Encoding a value is then a single `match` on the compiled variant.

use byteorder::{BigEndian, WriteBytesExt};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{EncodeError, Result};
use crate::numeric::encode_numeric;
use crate::schema::{oid, Column, TypeCategory};

/// Length prefix marking a SQL NULL field.
pub const NULL_LENGTH: i32 = -1;

/// `atttypmod` header size subtracted from a string column's type_mod.
const VARHDRSZ: i32 = 4;

/// JSONB binary format version.
pub(crate) const JSONB_VERSION: u8 = 1;

/// `num_days_from_ce` of the PostgreSQL epoch, 2000-01-01.
pub(crate) const PG_EPOCH_DAYS_FROM_CE: i32 = 730_120;

/// A value produced by an extractor for one column.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    /// UTF-8 text; also carries enum labels
    Text(String),
    Uuid(Uuid),
    Date(NaiveDate),
    Decimal(Decimal),
    Bool(bool),
    /// A serialized JSON document
    Json(Vec<u8>),
    /// An explicit, possibly empty, collection
    Array(Vec<FieldValue>),
}

impl FieldValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Text(_) => "text",
            FieldValue::Uuid(_) => "uuid",
            FieldValue::Date(_) => "date",
            FieldValue::Decimal(_) => "decimal",
            FieldValue::Bool(_) => "bool",
            FieldValue::Json(_) => "json",
            FieldValue::Array(_) => "array",
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn opt_text(value: Option<&str>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::text)
    }

    pub fn opt_decimal(value: Option<Decimal>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Decimal)
    }

    pub fn text_array<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::Array(values.into_iter().map(FieldValue::text).collect())
    }
}

impl From<Option<FieldValue>> for FieldValue {
    fn from(value: Option<FieldValue>) -> Self {
        value.unwrap_or(FieldValue::Null)
    }
}

/// Wire encoding of a single non-array value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarEncoder {
    /// `varchar`/`text`, with an optional character limit
    Text { max_chars: Option<usize> },
    /// Enum label as UTF-8 text
    Enum,
    Uuid,
    Date,
    Numeric,
    Bool,
    Json,
    Jsonb,
}

impl ScalarEncoder {
    fn for_column(column: &Column) -> Result<Self> {
        let unsupported = || EncodeError::UnsupportedType {
            column: column.attname,
            category: column.type_category.as_char(),
            type_name: column.type_name,
        };
        let encoder = match (column.type_category, column.type_name) {
            (TypeCategory::String, "varchar" | "text" | "bpchar") => ScalarEncoder::Text {
                max_chars: (column.type_mod > VARHDRSZ)
                    .then(|| (column.type_mod - VARHDRSZ) as usize),
            },
            (TypeCategory::Enum, _) => ScalarEncoder::Enum,
            (TypeCategory::DateTime, "date") => ScalarEncoder::Date,
            (TypeCategory::Numeric, "numeric") => ScalarEncoder::Numeric,
            (TypeCategory::Boolean, "bool") => ScalarEncoder::Bool,
            (TypeCategory::UserDefined, "uuid") => ScalarEncoder::Uuid,
            (TypeCategory::UserDefined, "json") => ScalarEncoder::Json,
            (TypeCategory::UserDefined, "jsonb") => ScalarEncoder::Jsonb,
            _ => return Err(unsupported()),
        };
        Ok(encoder)
    }

    fn for_element(column: &Column) -> Result<Self> {
        let encoder = match column.typelem {
            oid::TEXT | oid::VARCHAR => ScalarEncoder::Text { max_chars: None },
            oid::DATE => ScalarEncoder::Date,
            oid::NUMERIC => ScalarEncoder::Numeric,
            oid::UUID => ScalarEncoder::Uuid,
            oid::BOOL => ScalarEncoder::Bool,
            other => {
                return Err(EncodeError::UnsupportedElementType {
                    column: column.attname,
                    oid: other,
                })
            }
        };
        Ok(encoder)
    }

    fn expected(self) -> &'static str {
        match self {
            ScalarEncoder::Text { .. } => "text",
            ScalarEncoder::Enum => "enum label",
            ScalarEncoder::Uuid => "uuid",
            ScalarEncoder::Date => "date",
            ScalarEncoder::Numeric => "decimal",
            ScalarEncoder::Bool => "bool",
            ScalarEncoder::Json | ScalarEncoder::Jsonb => "json",
        }
    }

    /// Write the payload only, without length prefix.
    fn write_payload(
        self,
        column: &'static str,
        value: &FieldValue,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        match (self, value) {
            (ScalarEncoder::Text { max_chars }, FieldValue::Text(text)) => {
                reject_nul(column, text)?;
                if let Some(limit) = max_chars {
                    let length = text.chars().count();
                    if length > limit {
                        return Err(EncodeError::ValueTooLong {
                            column,
                            length,
                            limit,
                        });
                    }
                }
                out.extend_from_slice(text.as_bytes());
            }
            (ScalarEncoder::Enum, FieldValue::Text(label)) => {
                reject_nul(column, label)?;
                out.extend_from_slice(label.as_bytes());
            }
            (ScalarEncoder::Uuid, FieldValue::Uuid(uuid)) => {
                out.extend_from_slice(uuid.as_bytes());
            }
            (ScalarEncoder::Date, FieldValue::Date(date)) => {
                let days = date.num_days_from_ce() - PG_EPOCH_DAYS_FROM_CE;
                out.write_i32::<BigEndian>(days)?;
            }
            (ScalarEncoder::Numeric, FieldValue::Decimal(number)) => encode_numeric(number, out)?,
            (ScalarEncoder::Bool, FieldValue::Bool(flag)) => out.push(u8::from(*flag)),
            (ScalarEncoder::Json, FieldValue::Json(doc)) => out.extend_from_slice(doc),
            (ScalarEncoder::Jsonb, FieldValue::Json(doc)) => {
                out.push(JSONB_VERSION);
                out.extend_from_slice(doc);
            }
            (encoder, other) => {
                return Err(EncodeError::TypeMismatch {
                    column,
                    expected: encoder.expected(),
                    found: other.kind_name(),
                })
            }
        }
        Ok(())
    }

    /// Write a length-prefixed field, or the NULL marker.
    fn write_field(
        self,
        column: &'static str,
        value: &FieldValue,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        if matches!(value, FieldValue::Null) {
            out.write_i32::<BigEndian>(NULL_LENGTH)?;
            return Ok(());
        }
        with_length_prefix(column, out, |out| self.write_payload(column, value, out))
    }
}

/// PostgreSQL text types cannot hold a NUL byte; the bulk load would fail.
fn reject_nul(column: &'static str, text: &str) -> Result<()> {
    match text.bytes().position(|b| b == 0) {
        Some(offset) => Err(EncodeError::NulByte { column, offset }),
        None => Ok(()),
    }
}

fn with_length_prefix(
    column: &'static str,
    out: &mut Vec<u8>,
    write: impl FnOnce(&mut Vec<u8>) -> Result<()>,
) -> Result<()> {
    let start = out.len();
    out.extend_from_slice(&[0; 4]);
    write(out)?;
    let size = out.len() - start - 4;
    let length = i32::try_from(size).map_err(|_| EncodeError::FieldTooLarge { column, size })?;
    out[start..start + 4].copy_from_slice(&length.to_be_bytes());
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Scalar(ScalarEncoder),
    Array { element: ScalarEncoder, element_oid: u32 },
}

/// A compiled encoder for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldEncoder {
    column: &'static str,
    not_null: bool,
    shape: Shape,
}

impl FieldEncoder {
    /// Resolve a column to its encoder. Unknown wire types are a
    /// configuration error reported here, never while writing rows.
    pub fn compile(column: &'static Column) -> Result<Self> {
        let shape = if column.type_category == TypeCategory::Array {
            Shape::Array {
                element: ScalarEncoder::for_element(column)?,
                element_oid: column.typelem,
            }
        } else {
            Shape::Scalar(ScalarEncoder::for_column(column)?)
        };
        Ok(Self {
            column: column.attname,
            not_null: column.not_null,
            shape,
        })
    }

    pub fn column(&self) -> &'static str {
        self.column
    }

    /// Append the length-prefixed field for `value` to `out`.
    ///
    /// On error `out` may hold a partial field; callers encode into a
    /// scratch buffer.
    pub fn encode(&self, value: &FieldValue, out: &mut Vec<u8>) -> Result<()> {
        if matches!(value, FieldValue::Null) {
            if self.not_null {
                return Err(EncodeError::NullViolation {
                    column: self.column,
                });
            }
            out.write_i32::<BigEndian>(NULL_LENGTH)?;
            return Ok(());
        }
        match self.shape {
            Shape::Scalar(scalar) => scalar.write_field(self.column, value, out),
            Shape::Array {
                element,
                element_oid,
            } => {
                let FieldValue::Array(items) = value else {
                    return Err(EncodeError::TypeMismatch {
                        column: self.column,
                        expected: "array",
                        found: value.kind_name(),
                    });
                };
                let column = self.column;
                with_length_prefix(column, out, |out| {
                    write_array(column, element, element_oid, items, out)
                })
            }
        }
    }
}

/// One-dimensional array body: header, dimension, then elements.
fn write_array(
    column: &'static str,
    element: ScalarEncoder,
    element_oid: u32,
    items: &[FieldValue],
    out: &mut Vec<u8>,
) -> Result<()> {
    let has_null = items.iter().any(|item| matches!(item, FieldValue::Null));
    let ndim = if items.is_empty() { 0 } else { 1 };
    out.write_i32::<BigEndian>(ndim)?;
    out.write_i32::<BigEndian>(i32::from(has_null))?;
    out.write_u32::<BigEndian>(element_oid)?;
    if items.is_empty() {
        return Ok(());
    }
    let length = i32::try_from(items.len()).map_err(|_| EncodeError::FieldTooLarge {
        column,
        size: items.len(),
    })?;
    out.write_i32::<BigEndian>(length)?;
    out.write_i32::<BigEndian>(1)?;
    for item in items {
        element.write_field(column, item, out)?;
    }
    Ok(())
}
