//! Temperature Measurement characteristic decoding.
//!
//! Decodes indications from the Temperature Measurement characteristic
//! (0x2A1C) of the Health Thermometer service.

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::data::{TemperatureMeasurement, TemperatureType, TemperatureUnit};
use crate::error::DecodeError;
use crate::protocol::ieee11073::{encode_float, read_float, MANTISSA_NAN};

/// Flag bit 0: temperature is in Fahrenheit.
pub const FLAG_FAHRENHEIT: u8 = 0x01;
/// Flag bit 1: a timestamp follows the temperature.
pub const FLAG_TIMESTAMP_PRESENT: u8 = 0x02;
/// Flag bit 2: a temperature type byte follows.
pub const FLAG_TYPE_PRESENT: u8 = 0x04;
/// Bits 3-7 are reserved.
const FLAGS_RESERVED: u8 = 0xF8;

/// Flags byte plus the 4-byte FLOAT.
const BASE_SIZE: usize = 5;
/// Year (2) + month, day, hours, minutes, seconds.
const TIMESTAMP_SIZE: usize = 7;
const TYPE_SIZE: usize = 1;

/// Exponents tried, in order, when encoding a temperature.
const ENCODE_EXPONENTS: std::ops::RangeInclusive<i8> = -2..=10;

/// Number of bytes a packet with these flags must carry.
pub fn required_len(flags: u8) -> usize {
    let mut len = BASE_SIZE;
    if flags & FLAG_TIMESTAMP_PRESENT != 0 {
        len += TIMESTAMP_SIZE;
    }
    if flags & FLAG_TYPE_PRESENT != 0 {
        len += TYPE_SIZE;
    }
    len
}

/// Decode a Temperature Measurement indication.
///
/// Packet layout:
/// - Byte 0: flags (bit 0 unit, bit 1 timestamp present, bit 2 type present)
/// - Bytes 1-4: temperature (IEEE-11073 32-bit FLOAT, little-endian)
/// - Next 7 bytes if timestamp present: year (u16 LE), month, day, hours,
///   minutes, seconds
/// - Next byte if type present: body-site code
///
/// Trailing bytes beyond the flags-implied length are ignored.
pub fn decode(data: &[u8]) -> Result<TemperatureMeasurement, DecodeError> {
    let Some(&flags) = data.first() else {
        return Err(DecodeError::TooShort {
            required: BASE_SIZE,
            actual: 0,
        });
    };

    let required = required_len(flags);
    if data.len() < required {
        return Err(DecodeError::TooShort {
            required,
            actual: data.len(),
        });
    }

    if flags & FLAGS_RESERVED != 0 {
        return Err(DecodeError::InvalidUnit { flags });
    }

    let unit = TemperatureUnit::from_flag(flags & FLAG_FAHRENHEIT != 0);
    let temperature = read_float(&data[1..BASE_SIZE]).ok_or(DecodeError::TooShort {
        required,
        actual: data.len(),
    })?;

    let mut offset = BASE_SIZE;

    let timestamp = if flags & FLAG_TIMESTAMP_PRESENT != 0 {
        let timestamp = decode_timestamp(&data[offset..offset + TIMESTAMP_SIZE])?;
        offset += TIMESTAMP_SIZE;
        timestamp
    } else {
        None
    };

    let temperature_type = if flags & FLAG_TYPE_PRESENT != 0 {
        Some(TemperatureType::from_raw(data[offset]))
    } else {
        None
    };

    Ok(TemperatureMeasurement {
        temperature,
        unit,
        timestamp,
        temperature_type,
    })
}

/// Decode the 7-byte Date Time field. Year 0 means "unknown".
fn decode_timestamp(data: &[u8]) -> Result<Option<NaiveDateTime>, DecodeError> {
    let year = u16::from_le_bytes([data[0], data[1]]);
    if year == 0 {
        return Ok(None);
    }

    let (month, day, hour, minute, second) = (data[2], data[3], data[4], data[5], data[6]);
    let invalid = DecodeError::InvalidTimestamp {
        year,
        month,
        day,
        hour,
        minute,
        second,
    };

    if !(1..=12).contains(&month)
        || !(1..=31).contains(&day)
        || hour > 23
        || minute > 59
        || second > 59
    {
        return Err(invalid);
    }

    // Catches day-of-month overflow such as February 30th
    NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .map(Some)
        .ok_or(invalid)
}

/// Encode a measurement in the characteristic's wire format.
///
/// Used to build fixtures and for peripheral-side simulation. The
/// temperature is stored with the smallest exponent (from -2) whose
/// mantissa fits.
pub fn encode(measurement: &TemperatureMeasurement) -> Bytes {
    let mut flags = 0u8;
    if measurement.unit == TemperatureUnit::Fahrenheit {
        flags |= FLAG_FAHRENHEIT;
    }
    if measurement.timestamp.is_some() {
        flags |= FLAG_TIMESTAMP_PRESENT;
    }
    if measurement.temperature_type.is_some() {
        flags |= FLAG_TYPE_PRESENT;
    }

    let mut buf = BytesMut::with_capacity(required_len(flags));
    buf.put_u8(flags);

    let raw = ENCODE_EXPONENTS
        .filter_map(|exponent| encode_float(measurement.temperature, exponent))
        .next()
        .unwrap_or(MANTISSA_NAN);
    buf.put_u32_le(raw);

    if let Some(timestamp) = measurement.timestamp {
        buf.put_u16_le(timestamp.year() as u16);
        buf.put_u8(timestamp.month() as u8);
        buf.put_u8(timestamp.day() as u8);
        buf.put_u8(timestamp.hour() as u8);
        buf.put_u8(timestamp.minute() as u8);
        buf.put_u8(timestamp.second() as u8);
    }

    if let Some(temperature_type) = measurement.temperature_type {
        buf.put_u8(temperature_type.to_raw());
    }

    buf.freeze()
}
