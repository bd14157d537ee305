//! IEEE-11073 32-bit FLOAT encoding.
//!
//! The value is a 24-bit two's complement mantissa in the low bits and an
//! 8-bit signed base-10 exponent in the high byte:
//! `value = mantissa * 10^exponent`.

/// Mantissa reserved for "not a number".
pub const MANTISSA_NAN: u32 = 0x007F_FFFF;
/// Mantissa reserved for "not at this resolution".
pub const MANTISSA_NRES: u32 = 0x0080_0000;
/// Mantissa reserved for positive infinity.
pub const MANTISSA_POSITIVE_INFINITY: u32 = 0x007F_FFFE;
/// Mantissa reserved for negative infinity.
pub const MANTISSA_NEGATIVE_INFINITY: u32 = 0x0080_0002;
/// Reserved for future use.
pub const MANTISSA_RESERVED: u32 = 0x0080_0001;

/// Largest mantissa that is not a special value.
const MANTISSA_MAX: i32 = 0x007F_FFFD;
/// Smallest mantissa that is not a special value.
const MANTISSA_MIN: i32 = -0x007F_FFFD;

/// Decode a little-endian FLOAT from the first four bytes of `bytes`.
///
/// Returns `None` if fewer than four bytes are available.
pub fn read_float(bytes: &[u8]) -> Option<f64> {
    let raw: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
    Some(decode_float(u32::from_le_bytes(raw)))
}

/// Decode a raw FLOAT value.
///
/// Special mantissas (only meaningful with a zero exponent) decode to NaN or
/// an infinity.
pub fn decode_float(raw: u32) -> f64 {
    let mantissa_bits = raw & 0x00FF_FFFF;
    let exponent = (raw >> 24) as u8 as i8;

    if exponent == 0 {
        match mantissa_bits {
            MANTISSA_POSITIVE_INFINITY => return f64::INFINITY,
            MANTISSA_NEGATIVE_INFINITY => return f64::NEG_INFINITY,
            MANTISSA_NAN | MANTISSA_NRES | MANTISSA_RESERVED => return f64::NAN,
            _ => {}
        }
    }

    // Sign-extend the 24-bit mantissa
    let mantissa = ((mantissa_bits << 8) as i32) >> 8;

    // Dividing by an exact power of ten keeps decimal readings exact
    // (3750e-2 decodes to the same f64 as the literal 37.5).
    if exponent < 0 {
        mantissa as f64 / 10f64.powi(-(exponent as i32))
    } else {
        mantissa as f64 * 10f64.powi(exponent as i32)
    }
}

/// Encode `value` as a FLOAT with the given exponent.
///
/// NaN and infinities map to their reserved encodings. Returns `None` if the
/// value does not fit a 24-bit mantissa at this exponent.
pub fn encode_float(value: f64, exponent: i8) -> Option<u32> {
    if value.is_nan() {
        return Some(MANTISSA_NAN);
    }
    if value.is_infinite() {
        return Some(if value > 0.0 {
            MANTISSA_POSITIVE_INFINITY
        } else {
            MANTISSA_NEGATIVE_INFINITY
        });
    }

    let scaled = if exponent < 0 {
        value * 10f64.powi(-(exponent as i32))
    } else {
        value / 10f64.powi(exponent as i32)
    };
    let mantissa = scaled.round();
    if mantissa < MANTISSA_MIN as f64 || mantissa > MANTISSA_MAX as f64 {
        return None;
    }

    let mantissa = (mantissa as i32 as u32) & 0x00FF_FFFF;
    Some(((exponent as u8 as u32) << 24) | mantissa)
}
