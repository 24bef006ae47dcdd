//! PostgreSQL `numeric` binary representation.
//!
//! ```text
//! [NDIGITS:i16][WEIGHT:i16][SIGN:u16][DSCALE:u16][DIGIT:i16 * NDIGITS]
//! ```
//!
//! Digits are base-10000 groups, most significant first. `WEIGHT` is the
//! power of 10000 of the first group. Leading and trailing zero groups are
//! never stored; `DSCALE` keeps the declared number of fractional digits.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use rust_decimal::Decimal;
use std::io::Cursor;
use std::str::FromStr;

use crate::error::{self, FramingError};

const NBASE_DIGITS: usize = 4;
const SIGN_POSITIVE: u16 = 0x0000;
const SIGN_NEGATIVE: u16 = 0x4000;
const SIGN_NAN: u16 = 0xC000;

fn groups(digits: &str) -> impl Iterator<Item = i16> + '_ {
    digits
        .as_bytes()
        .chunks(NBASE_DIGITS)
        .map(|chunk| chunk.iter().fold(0i16, |acc, b| acc * 10 + i16::from(b - b'0')))
}

/// Append the binary form of `value` to `out`.
pub fn encode_numeric(value: &Decimal, out: &mut Vec<u8>) -> error::Result<()> {
    let scale = value.scale() as usize;
    let digits = value.mantissa().unsigned_abs().to_string();

    let (int_part, frac_part) = if digits.len() > scale {
        let (int_part, frac_part) = digits.split_at(digits.len() - scale);
        (int_part.to_string(), frac_part.to_string())
    } else {
        (String::new(), format!("{:0>width$}", digits, width = scale))
    };

    let int_pad = (NBASE_DIGITS - int_part.len() % NBASE_DIGITS) % NBASE_DIGITS;
    let frac_pad = (NBASE_DIGITS - frac_part.len() % NBASE_DIGITS) % NBASE_DIGITS;
    let int_part = format!("{}{}", "0".repeat(int_pad), int_part);
    let frac_part = format!("{}{}", frac_part, "0".repeat(frac_pad));

    let mut weight = (int_part.len() / NBASE_DIGITS) as i16 - 1;
    let mut all: Vec<i16> = groups(&int_part).chain(groups(&frac_part)).collect();

    let leading = all.iter().take_while(|&&g| g == 0).count();
    all.drain(..leading);
    weight -= leading as i16;
    while all.last() == Some(&0) {
        all.pop();
    }

    let sign = if all.is_empty() {
        weight = 0;
        SIGN_POSITIVE
    } else if value.is_sign_negative() {
        SIGN_NEGATIVE
    } else {
        SIGN_POSITIVE
    };

    // At most 28 significant digits, so the group count and scale fit.
    out.write_i16::<BigEndian>(all.len() as i16)?;
    out.write_i16::<BigEndian>(weight)?;
    out.write_u16::<BigEndian>(sign)?;
    out.write_u16::<BigEndian>(scale as u16)?;
    for group in all {
        out.write_i16::<BigEndian>(group)?;
    }
    Ok(())
}

/// Decode a binary `numeric` payload.
pub fn decode_numeric(payload: &[u8]) -> Result<Decimal, FramingError> {
    let malformed = |reason: String| FramingError::Malformed {
        kind: "numeric",
        reason,
    };
    let mut cursor = Cursor::new(payload);
    let ndigits = cursor.read_i16::<BigEndian>()?;
    let weight = cursor.read_i16::<BigEndian>()?;
    let sign = cursor.read_u16::<BigEndian>()?;
    let dscale = cursor.read_u16::<BigEndian>()? as usize;

    if sign == SIGN_NAN {
        return Err(malformed("NaN is not representable".to_string()));
    }
    if ndigits < 0 {
        return Err(malformed(format!("negative digit count {}", ndigits)));
    }

    let mut digits = Vec::with_capacity(ndigits as usize);
    for _ in 0..ndigits {
        let group = cursor.read_i16::<BigEndian>()?;
        if !(0..10_000).contains(&group) {
            return Err(malformed(format!("digit group {} out of range", group)));
        }
        digits.push(group);
    }
    if cursor.position() as usize != payload.len() {
        return Err(malformed("trailing bytes".to_string()));
    }

    // Group i carries the power 10000^(weight - i).
    let mut int_part = String::new();
    for power in (0..=weight.max(-1)).rev() {
        let index = (weight - power) as usize;
        let group = digits.get(index).copied().unwrap_or(0);
        if int_part.is_empty() {
            if group != 0 {
                int_part.push_str(&group.to_string());
            }
        } else {
            int_part.push_str(&format!("{:04}", group));
        }
    }
    if int_part.is_empty() {
        int_part.push('0');
    }

    let mut frac_part = String::new();
    let first_frac_power = -1i32;
    let frac_groups = dscale.div_ceil(NBASE_DIGITS) as i32;
    for power in (first_frac_power - frac_groups + 1..=first_frac_power).rev() {
        let index = i32::from(weight) - power;
        let group = if index >= 0 {
            digits.get(index as usize).copied().unwrap_or(0)
        } else {
            0
        };
        frac_part.push_str(&format!("{:04}", group));
    }
    frac_part.truncate(dscale);

    let negative = if sign == SIGN_NEGATIVE { "-" } else { "" };
    let text = if frac_part.is_empty() {
        format!("{}{}", negative, int_part)
    } else {
        format!("{}{}.{}", negative, int_part, frac_part)
    };
    Decimal::from_str(&text).map_err(|e| malformed(format!("{}: {}", text, e)))
}
