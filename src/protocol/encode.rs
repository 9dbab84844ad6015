//! Wire-primitive encoders.
//!
//! The protocol uses fixed-width big-endian integers, nullable strings,
//! and a one-byte tagged-field section:
//!
//! ```text
//! int16           := 2 bytes, signed, BE
//! int32 / uint32  := 4 bytes, BE
//! nullable_string := len(int16) bytes[len]   -- len = -1 means "null"
//! tagged_fields   := 1 byte, 0x00 = empty section
//! ```
//!
//! Every encoder is a pure function of its input; out-of-range values are
//! rejected with [`HarnessError::Encoding`] instead of being truncated,
//! because a silently wrapped value would make the byte-exactness
//! guarantee of the harness meaningless.

use crate::error::{HarnessError, Result};

/// Wire length marker for a null string.
pub const NULL_STRING_LEN: i16 = -1;

/// The single byte encoding an empty tagged-field section.
pub const EMPTY_TAGGED_FIELDS: u8 = 0x00;

/// Encode a signed 16-bit integer, big-endian.
///
/// # Errors
///
/// Returns [`HarnessError::Encoding`] if `v` does not fit in an `i16`.
pub fn encode_int16(v: i64) -> Result<[u8; 2]> {
    let v = i16::try_from(v)
        .map_err(|_| HarnessError::Encoding(format!("value {v} out of range for int16")))?;
    Ok(v.to_be_bytes())
}

/// Encode a signed 32-bit integer, big-endian.
///
/// # Errors
///
/// Returns [`HarnessError::Encoding`] if `v` does not fit in an `i32`.
pub fn encode_int32(v: i64) -> Result<[u8; 4]> {
    let v = i32::try_from(v)
        .map_err(|_| HarnessError::Encoding(format!("value {v} out of range for int32")))?;
    Ok(v.to_be_bytes())
}

/// Encode an unsigned 32-bit integer, big-endian.
///
/// # Errors
///
/// Returns [`HarnessError::Encoding`] if `v` does not fit in a `u32`.
pub fn encode_uint32(v: u64) -> Result<[u8; 4]> {
    let v = u32::try_from(v)
        .map_err(|_| HarnessError::Encoding(format!("value {v} out of range for uint32")))?;
    Ok(v.to_be_bytes())
}

/// Encode a nullable string.
///
/// A present string encodes as a 2-byte signed length followed by its
/// UTF-8 bytes; `None` encodes as the 2-byte value `-1` with no payload.
/// The empty string encodes as `len = 0` — present and absent are never
/// confused.
///
/// # Errors
///
/// Returns [`HarnessError::Encoding`] if the string's byte length does
/// not fit in an `i16`.
pub fn encode_nullable_string(s: Option<&str>) -> Result<Vec<u8>> {
    match s {
        Some(s) => {
            let bytes = s.as_bytes();
            let len = i64::try_from(bytes.len())
                .map_err(|_| HarnessError::Encoding("string length overflows i64".to_string()))?;
            let mut out = Vec::with_capacity(2 + bytes.len());
            out.extend_from_slice(&encode_int16(len)?);
            out.extend_from_slice(bytes);
            Ok(out)
        }
        None => Ok(NULL_STRING_LEN.to_be_bytes().to_vec()),
    }
}

/// Encode an empty tagged-field section.
///
/// A single zero byte. A non-zero value would announce extended fields,
/// which the harness never sends.
#[inline]
pub fn encode_tagged_fields_empty() -> [u8; 1] {
    [EMPTY_TAGGED_FIELDS]
}

/// Render bytes as a lowercase hex string, two digits per byte.
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        use std::fmt::Write;
        // Writing to a String cannot fail.
        let _ = write!(out, "{b:02x}");
    }
    out
}
