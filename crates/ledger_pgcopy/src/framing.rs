//! Binary COPY file framing.
//!
//! Header Format (19 bytes, Network Byte Order / Big Endian)
//! ```text
//! [SIGNATURE:11][FLAGS:4][EXT_LEN:4]
//! ```
//!
//! - SIGNATURE: `PGCOPY\n\xff\r\n\0`
//! - FLAGS (u32): bit 16 = OIDs included; bits 0-15 critical, 17-31 reserved
//! - EXT_LEN (u32): header extension length, always 0 here
//!
//! Rows follow the header, then a 16-bit trailer of `-1`.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Write};

use crate::error::FramingError;

pub const SIGNATURE: &[u8; 11] = b"PGCOPY\n\xff\r\n\0";

/// Header size in bytes
pub const HEADER_SIZE: usize = 19;

/// Trailer: field count of -1
pub const TRAILER: [u8; 2] = (-1i16).to_be_bytes();

/// Flag bit announcing an OID column in every row.
pub const FLAG_HAS_OIDS: u32 = 1 << 16;

/// Binary COPY file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CopyHeader {
    pub flags: u32,
    pub extension_len: u32,
}

impl CopyHeader {
    /// Pack the header into its 19-byte form.
    pub fn pack(&self) -> std::io::Result<[u8; HEADER_SIZE]> {
        let mut buf = [0u8; HEADER_SIZE];
        let mut cursor = Cursor::new(&mut buf[..]);

        cursor.write_all(SIGNATURE)?;
        cursor.write_u32::<BigEndian>(self.flags)?;
        cursor.write_u32::<BigEndian>(self.extension_len)?;

        Ok(buf)
    }

    /// Unpack a header and return it with the offset of the first row.
    ///
    /// Rows carrying OIDs or critical flag bits are rejected because the
    /// exporter never writes them.
    pub fn unpack(data: &[u8]) -> Result<(Self, usize), FramingError> {
        if data.len() < HEADER_SIZE || &data[..SIGNATURE.len()] != SIGNATURE {
            return Err(FramingError::BadSignature);
        }
        let mut cursor = Cursor::new(&data[SIGNATURE.len()..]);
        let flags = cursor.read_u32::<BigEndian>()?;
        let extension_len = cursor.read_u32::<BigEndian>()?;
        if flags & (FLAG_HAS_OIDS | 0xffff) != 0 {
            return Err(FramingError::UnsupportedFlags(flags));
        }
        let rows_start = HEADER_SIZE + extension_len as usize;
        if data.len() < rows_start {
            return Err(FramingError::Truncated { offset: data.len() });
        }
        Ok((
            Self {
                flags,
                extension_len,
            },
            rows_start,
        ))
    }
}

pub fn write_header<W: Write + ?Sized>(sink: &mut W) -> std::io::Result<()> {
    sink.write_all(&CopyHeader::default().pack()?)
}

pub fn write_trailer<W: Write + ?Sized>(sink: &mut W) -> std::io::Result<()> {
    sink.write_all(&TRAILER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_bytes() {
        let mut out = Vec::new();
        write_header(&mut out).unwrap();
        assert_eq!(out.len(), HEADER_SIZE);
        assert_eq!(&out[..11], b"PGCOPY\n\xff\r\n\0");
        assert_eq!(&out[11..], &[0u8; 8]);
    }

    #[test]
    fn test_header_roundtrip() {
        let header = CopyHeader::default();
        let (unpacked, offset) = CopyHeader::unpack(&header.pack().unwrap()).unwrap();
        assert_eq!(unpacked, header);
        assert_eq!(offset, HEADER_SIZE);
    }

    #[test]
    fn test_bad_signature() {
        let mut buf = CopyHeader::default().pack().unwrap();
        buf[0] = b'X';
        assert!(matches!(CopyHeader::unpack(&buf), Err(FramingError::BadSignature)));
        assert!(matches!(CopyHeader::unpack(&buf[..8]), Err(FramingError::BadSignature)));
    }

    #[test]
    fn test_oid_flag_rejected() {
        let header = CopyHeader {
            flags: FLAG_HAS_OIDS,
            extension_len: 0,
        };
        assert!(matches!(
            CopyHeader::unpack(&header.pack().unwrap()),
            Err(FramingError::UnsupportedFlags(_))
        ));
    }

    #[test]
    fn test_extension_is_skipped() {
        let header = CopyHeader {
            flags: 0,
            extension_len: 3,
        };
        let mut data = header.pack().unwrap().to_vec();
        data.extend_from_slice(b"abc");
        let (_, offset) = CopyHeader::unpack(&data).unwrap();
        assert_eq!(offset, HEADER_SIZE + 3);
    }

    #[test]
    fn test_trailer_is_minus_one() {
        let mut out = Vec::new();
        write_trailer(&mut out).unwrap();
        assert_eq!(out, [0xff, 0xff]);
    }
}
