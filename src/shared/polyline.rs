//! Google encoded polyline format, as produced by OSRM with
//! `geometries=polyline` and rendered by the map views.

use crate::shared::geo::Coordinate;
use thiserror::Error;

pub const PRECISION: u32 = 5;

/// Higher precisions would not fit a full turn of longitude in an `i64`.
pub const MAX_PRECISION: u32 = 16;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Polyline ended in the middle of a value at byte {0}")]
    Truncated(usize),
    #[error("Invalid polyline character {0:?} at byte {1}")]
    InvalidCharacter(char, usize),
    #[error("Polyline value at byte {0} is outside the coordinate range")]
    Overflow(usize),
}

pub fn decode(polyline: &str) -> Result<Vec<Coordinate>, self::Error> {
    decode_with_precision(polyline, PRECISION)
}

pub fn decode_with_precision(polyline: &str, precision: u32) -> Result<Vec<Coordinate>, self::Error> {
    let factor = 10_f64.powi(precision.min(MAX_PRECISION) as i32);
    let lat_limit = (90.0 * factor) as i64;
    let lng_limit = (180.0 * factor) as i64;
    let bytes = polyline.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut coordinates = Vec::with_capacity(bytes.len() / 4);

    while index < bytes.len() {
        lat = accumulate(lat, bytes, &mut index, lat_limit)?;
        lng = accumulate(lng, bytes, &mut index, lng_limit)?;
        coordinates.push(Coordinate::new(lat as f64 / factor, lng as f64 / factor));
    }
    Ok(coordinates)
}

/// Adds the next delta to `total`, rejecting sums beyond `limit` either way.
fn accumulate(
    total: i64,
    bytes: &[u8],
    index: &mut usize,
    limit: i64,
) -> Result<i64, self::Error> {
    let start = *index;
    let delta = next_value(bytes, index)?;
    total
        .checked_add(delta)
        .filter(|value| (-limit..=limit).contains(value))
        .ok_or(Error::Overflow(start))
}

fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64, self::Error> {
    let mut result: i64 = 0;
    let mut shift = 0;
    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(Error::Truncated(*index));
        };
        if !(63..127).contains(&byte) || shift > 60 {
            return Err(Error::InvalidCharacter(byte as char, *index));
        }
        *index += 1;
        let chunk = (byte - 63) as i64;
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }
    Ok(if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

pub fn encode(coordinates: &[Coordinate]) -> String {
    encode_with_precision(coordinates, PRECISION)
}

/// Coordinates outside the valid range are clamped to it, and non finite
/// values encode as 0.
pub fn encode_with_precision(coordinates: &[Coordinate], precision: u32) -> String {
    let factor = 10_f64.powi(precision.min(MAX_PRECISION) as i32);
    let scale = |value: f64, limit: f64| {
        if value.is_finite() {
            (value.clamp(-limit, limit) * factor).round() as i64
        } else {
            0
        }
    };
    let mut output = String::with_capacity(coordinates.len() * 8);
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;
    for coord in coordinates {
        let lat = scale(coord.latitude, 90.0);
        let lng = scale(coord.longitude, 180.0);
        push_value(&mut output, lat - prev_lat);
        push_value(&mut output, lng - prev_lng);
        prev_lat = lat;
        prev_lng = lng;
    }
    output
}

// Clamped input keeps |value| below 2^62, so the zigzag shift cannot lose bits.
fn push_value(output: &mut String, value: i64) {
    let mut value = if value < 0 { !(value << 1) } else { value << 1 };
    while value >= 0x20 {
        output.push((((value & 0x1f) | 0x20) as u8 + 63) as char);
        value >>= 5;
    }
    output.push((value as u8 + 63) as char);
}
