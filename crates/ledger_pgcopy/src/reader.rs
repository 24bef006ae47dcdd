//! Reading a framed binary COPY stream back into rows.
//!
//! The exporter never needs this at runtime; it exists so tests and
//! downstream tooling can verify output without a database.

use byteorder::{BigEndian, ReadBytesExt};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::io::Cursor;
use uuid::Uuid;

use crate::encoder::{JSONB_VERSION, PG_EPOCH_DAYS_FROM_CE};
use crate::error::FramingError;
use crate::framing::{CopyHeader, TRAILER};
use crate::numeric::decode_numeric;

/// A decoded COPY file.
#[derive(Debug, Clone, PartialEq)]
pub struct CopyFile {
    pub header: CopyHeader,
    pub rows: Vec<RawRow>,
}

/// One row; `None` marks a SQL NULL field.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    fields: Vec<Option<Vec<u8>>>,
    encoded_len: usize,
}

fn malformed(kind: &'static str, reason: impl Into<String>) -> FramingError {
    FramingError::Malformed {
        kind,
        reason: reason.into(),
    }
}

/// Parse header, rows and trailer. Bytes after the trailer are an error.
pub fn read_copy(data: &[u8]) -> Result<CopyFile, FramingError> {
    let (header, mut offset) = CopyHeader::unpack(data)?;
    let mut rows = Vec::new();
    loop {
        let remaining = &data[offset..];
        if remaining.len() < 2 {
            return Err(FramingError::Truncated { offset: data.len() });
        }
        if remaining[..2] == TRAILER {
            let trailing = remaining.len() - 2;
            if trailing != 0 {
                return Err(FramingError::TrailingBytes { trailing });
            }
            return Ok(CopyFile { header, rows });
        }
        let row = read_row(remaining, offset)?;
        offset += row.encoded_len;
        rows.push(row);
    }
}

fn read_row(data: &[u8], base_offset: usize) -> Result<RawRow, FramingError> {
    let mut cursor = Cursor::new(data);
    let truncated = |cursor: &Cursor<&[u8]>| FramingError::Truncated {
        offset: base_offset + cursor.position() as usize,
    };
    let count = cursor.read_i16::<BigEndian>().map_err(|_| truncated(&cursor))?;
    if count < 0 {
        return Err(FramingError::InvalidFieldCount {
            count,
            offset: base_offset,
        });
    }
    let mut fields = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let at = base_offset + cursor.position() as usize;
        let length = cursor.read_i32::<BigEndian>().map_err(|_| truncated(&cursor))?;
        if length == -1 {
            fields.push(None);
            continue;
        }
        if length < 0 {
            return Err(FramingError::InvalidLength { length, offset: at });
        }
        let start = cursor.position() as usize;
        let end = start + length as usize;
        if end > data.len() {
            return Err(FramingError::Truncated {
                offset: base_offset + data.len(),
            });
        }
        fields.push(Some(data[start..end].to_vec()));
        cursor.set_position(end as u64);
    }
    Ok(RawRow {
        fields,
        encoded_len: cursor.position() as usize,
    })
}

impl RawRow {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Bytes this row occupied in the stream, field count included.
    pub fn encoded_len(&self) -> usize {
        self.encoded_len
    }

    pub fn is_null(&self, index: usize) -> bool {
        matches!(self.fields.get(index), Some(None))
    }

    /// Raw payload; `None` for NULL or an out-of-range index.
    pub fn field(&self, index: usize) -> Option<&[u8]> {
        self.fields.get(index).and_then(|f| f.as_deref())
    }

    fn payload(&self, index: usize) -> Result<Option<&[u8]>, FramingError> {
        match self.fields.get(index) {
            Some(field) => Ok(field.as_deref()),
            None => Err(malformed(
                "row",
                format!("field {} out of range ({} fields)", index, self.fields.len()),
            )),
        }
    }

    pub fn text(&self, index: usize) -> Result<Option<String>, FramingError> {
        self.payload(index)?.map(decode_text).transpose()
    }

    pub fn uuid(&self, index: usize) -> Result<Option<Uuid>, FramingError> {
        self.payload(index)?.map(decode_uuid).transpose()
    }

    pub fn date(&self, index: usize) -> Result<Option<NaiveDate>, FramingError> {
        self.payload(index)?.map(decode_date).transpose()
    }

    pub fn decimal(&self, index: usize) -> Result<Option<Decimal>, FramingError> {
        self.payload(index)?.map(decode_numeric).transpose()
    }

    pub fn bool(&self, index: usize) -> Result<Option<bool>, FramingError> {
        self.payload(index)?
            .map(|payload| match payload {
                [0] => Ok(false),
                [1] => Ok(true),
                other => Err(malformed("bool", format!("{:?}", other))),
            })
            .transpose()
    }

    pub fn jsonb(&self, index: usize) -> Result<Option<serde_json::Value>, FramingError> {
        self.payload(index)?
            .map(|payload| match payload.split_first() {
                Some((&JSONB_VERSION, doc)) => {
                    serde_json::from_slice(doc).map_err(|e| malformed("jsonb", e.to_string()))
                }
                _ => Err(malformed("jsonb", "missing version byte")),
            })
            .transpose()
    }

    /// A one-dimensional text array; NULL elements decode to `None`.
    pub fn text_array(&self, index: usize) -> Result<Option<Vec<Option<String>>>, FramingError> {
        self.payload(index)?
            .map(|payload| {
                decode_array(payload)?
                    .into_iter()
                    .map(|item| item.map(decode_text).transpose())
                    .collect()
            })
            .transpose()
    }
}

fn decode_text(payload: &[u8]) -> Result<String, FramingError> {
    String::from_utf8(payload.to_vec()).map_err(|e| malformed("text", e.to_string()))
}

fn decode_uuid(payload: &[u8]) -> Result<Uuid, FramingError> {
    Uuid::from_slice(payload).map_err(|e| malformed("uuid", e.to_string()))
}

fn decode_date(payload: &[u8]) -> Result<NaiveDate, FramingError> {
    let days = Cursor::new(payload).read_i32::<BigEndian>()?;
    if payload.len() != 4 {
        return Err(malformed("date", format!("{} bytes", payload.len())));
    }
    days.checked_add(PG_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| malformed("date", format!("day offset {} out of range", days)))
}

/// Element payloads of a one-dimensional array.
fn decode_array(payload: &[u8]) -> Result<Vec<Option<&[u8]>>, FramingError> {
    let mut cursor = Cursor::new(payload);
    let ndim = cursor.read_i32::<BigEndian>()?;
    let _has_null = cursor.read_i32::<BigEndian>()?;
    let _element_oid = cursor.read_u32::<BigEndian>()?;
    let count = match ndim {
        0 => 0,
        1 => {
            let length = cursor.read_i32::<BigEndian>()?;
            let _lower_bound = cursor.read_i32::<BigEndian>()?;
            usize::try_from(length).map_err(|_| malformed("array", "negative length"))?
        }
        other => return Err(malformed("array", format!("{} dimensions", other))),
    };
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        let length = cursor.read_i32::<BigEndian>()?;
        if length == -1 {
            items.push(None);
            continue;
        }
        let start = cursor.position() as usize;
        let end = usize::try_from(length)
            .ok()
            .map(|len| start + len)
            .filter(|&end| end <= payload.len())
            .ok_or_else(|| malformed("array", format!("element length {}", length)))?;
        items.push(Some(&payload[start..end]));
        cursor.set_position(end as u64);
    }
    if cursor.position() as usize != payload.len() {
        return Err(malformed("array", "trailing bytes"));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::FieldValue;
    use crate::framing::{write_header, write_trailer, HEADER_SIZE};
    use crate::row::TableEncoder;
    use crate::schema::OPEN_TABLE;

    fn open_file(rows: &[Vec<FieldValue>]) -> Vec<u8> {
        let encoder = TableEncoder::compile(&OPEN_TABLE).unwrap();
        let mut out = Vec::new();
        write_header(&mut out).unwrap();
        for row in rows {
            out.extend(encoder.encode_row(row).unwrap());
        }
        write_trailer(&mut out).unwrap();
        out
    }

    #[test]
    fn test_read_back_typed_fields() {
        let id = Uuid::new_v4();
        let data = open_file(&[vec![
            FieldValue::Uuid(id),
            FieldValue::text("Assets:Checking"),
            FieldValue::text_array(["USD", "TWD"]),
            FieldValue::Null,
        ]]);
        let file = read_copy(&data).unwrap();
        assert_eq!(file.rows.len(), 1);
        let row = &file.rows[0];
        assert_eq!(row.len(), 4);
        assert_eq!(row.uuid(0).unwrap(), Some(id));
        assert_eq!(row.text(1).unwrap().as_deref(), Some("Assets:Checking"));
        assert_eq!(
            row.text_array(2).unwrap(),
            Some(vec![Some("USD".to_string()), Some("TWD".to_string())])
        );
        assert!(row.is_null(3));
        assert_eq!(row.text(3).unwrap(), None);
        assert_eq!(data.len(), HEADER_SIZE + row.encoded_len() + 2);
    }

    #[test]
    fn test_empty_file() {
        let data = open_file(&[]);
        assert!(read_copy(&data).unwrap().rows.is_empty());
    }

    #[test]
    fn test_missing_trailer_is_truncated() {
        let mut data = open_file(&[]);
        data.truncate(data.len() - 2);
        assert!(matches!(read_copy(&data), Err(FramingError::Truncated { .. })));
    }

    #[test]
    fn test_bytes_after_trailer() {
        let mut data = open_file(&[]);
        data.push(0);
        assert!(matches!(
            read_copy(&data),
            Err(FramingError::TrailingBytes { trailing: 1 })
        ));
    }

    #[test]
    fn test_out_of_range_field() {
        let data = open_file(&[vec![
            FieldValue::Uuid(Uuid::new_v4()),
            FieldValue::text("Assets:Cash"),
            FieldValue::Null,
            FieldValue::Null,
        ]]);
        let file = read_copy(&data).unwrap();
        assert!(file.rows[0].text(9).is_err());
        assert_eq!(file.rows[0].field(9), None);
    }
}
