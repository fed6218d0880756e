//! Encoded polyline codec (5-bit chunks, zig-zag deltas, 1e5 precision).

use crate::models::GeoPoint;
use thiserror::Error;

const PRECISION: f64 = 1e5;
const CHAR_OFFSET: u8 = 63;
const CHUNK_MASK: i64 = 0x1f;
const CONTINUATION_BIT: i64 = 0x20;
// Coordinates need at most 7 chunks; anything longer cannot be valid.
const MAX_SHIFT: u32 = 35;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("polyline truncated at byte {offset}")]
    Truncated { offset: usize },
    #[error("invalid polyline byte {byte:#04x} at offset {offset}")]
    InvalidByte { offset: usize, byte: u8 },
    #[error("polyline value starting before byte {offset} is too long")]
    Overflow { offset: usize },
}

/// Decode an encoded polyline into its points.
///
/// The whole string is consumed; a value cut off mid-group or a missing
/// longitude is reported as [`DecodeError::Truncated`].
pub fn decode(encoded: &str) -> Result<Vec<GeoPoint>, DecodeError> {
    let bytes = encoded.as_bytes();
    let mut index = 0usize;
    let mut lat = 0i64;
    let mut lng = 0i64;
    let mut points = Vec::with_capacity(bytes.len() / 4);

    while index < bytes.len() {
        lat += next_value(bytes, &mut index)?;
        lng += next_value(bytes, &mut index)?;
        points.push(GeoPoint::new(lat as f64 / PRECISION, lng as f64 / PRECISION));
    }

    Ok(points)
}

fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64, DecodeError> {
    let mut result = 0i64;
    let mut shift = 0u32;

    loop {
        let offset = *index;
        let byte = *bytes.get(offset).ok_or(DecodeError::Truncated { offset })?;
        if !(CHAR_OFFSET..=126).contains(&byte) {
            return Err(DecodeError::InvalidByte { offset, byte });
        }
        if shift > MAX_SHIFT {
            return Err(DecodeError::Overflow { offset });
        }

        let chunk = i64::from(byte - CHAR_OFFSET);
        *index += 1;
        result |= (chunk & CHUNK_MASK) << shift;
        shift += 5;

        if chunk < CONTINUATION_BIT {
            break;
        }
    }

    Ok(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}

/// Encode points as a polyline string.
pub fn encode(points: &[GeoPoint]) -> String {
    let mut out = String::with_capacity(points.len() * 8);
    let mut prev_lat = 0i64;
    let mut prev_lng = 0i64;

    for point in points {
        let lat = (point.lat * PRECISION).round() as i64;
        let lng = (point.lng * PRECISION).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn encode_value(value: i64, out: &mut String) {
    let mut v = if value < 0 { !(value << 1) } else { value << 1 };
    while v >= CONTINUATION_BIT {
        out.push(char::from(((CONTINUATION_BIT | (v & CHUNK_MASK)) as u8) + CHAR_OFFSET));
        v >>= 5;
    }
    out.push(char::from((v as u8) + CHAR_OFFSET));
}
