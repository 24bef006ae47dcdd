//! Row serialization against compiled table encoders.
//!
//! Row Format (Big Endian)
//! ```text
//! [FIELD_COUNT:i16]([LEN:i32][PAYLOAD:LEN] | [-1:i32])*
//! ```

use byteorder::{BigEndian, WriteBytesExt};

use crate::encoder::{FieldEncoder, FieldValue};
use crate::error::{EncodeError, Result};
use crate::schema::{Table, TableKind};

/// Serialize one row: field count, then each field paired positionally with
/// its encoder.
pub fn serialize_row(encoders: &[FieldEncoder], values: &[FieldValue]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(2 + values.len() * 8);
    // Callers check arity against the table; a bare mismatch here has no name.
    if encoders.len() != values.len() {
        return Err(EncodeError::ArityMismatch {
            table: "<anonymous>",
            columns: encoders.len(),
            values: values.len(),
        });
    }
    let count = i16::try_from(encoders.len()).map_err(|_| EncodeError::TooManyFields {
        count: encoders.len(),
    })?;
    out.write_i16::<BigEndian>(count)?;
    for (encoder, value) in encoders.iter().zip(values) {
        encoder.encode(value, &mut out)?;
    }
    Ok(out)
}

/// Encoders for every column of one table, compiled once.
#[derive(Debug, Clone)]
pub struct TableEncoder {
    table: &'static Table,
    fields: Vec<FieldEncoder>,
}

impl TableEncoder {
    pub fn compile(table: &'static Table) -> Result<Self> {
        let fields = table
            .columns
            .iter()
            .map(FieldEncoder::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { table, fields })
    }

    pub fn table(&self) -> &'static Table {
        self.table
    }

    pub fn fields(&self) -> &[FieldEncoder] {
        &self.fields
    }

    /// Encode one row. The returned buffer is complete; nothing partial is
    /// ever handed to a sink.
    pub fn encode_row(&self, values: &[FieldValue]) -> Result<Vec<u8>> {
        if values.len() != self.fields.len() {
            return Err(EncodeError::ArityMismatch {
                table: self.table.name,
                columns: self.fields.len(),
                values: values.len(),
            });
        }
        serialize_row(&self.fields, values)
    }
}

/// Compiled encoders for every table, indexed by [`TableKind`].
#[derive(Debug, Clone)]
pub struct EncoderSet {
    tables: Vec<TableEncoder>,
}

impl EncoderSet {
    pub fn compile() -> Result<Self> {
        let tables = TableKind::all()
            .map(|kind| TableEncoder::compile(kind.table()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { tables })
    }

    pub fn get(&self, kind: TableKind) -> &TableEncoder {
        &self.tables[kind.index()]
    }
}
