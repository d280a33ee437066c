//! Assemble 64-bit values from 32-bit halves, and split them again.
//!
//! Decoders for 64-bit wire values produce a low and a high 32-bit half. A
//! join function turns the halves into the representation a field uses: a
//! native integer, a decimal or hex string, or a double. Sharing the split
//! logic means each wire decoder is written once regardless of how the
//! value is represented.
//!
//! The decimal conversions never form an intermediate value wider than 53
//! bits, so they produce exact results for the whole 64-bit range.

use crate::errors::{ErrorKind, ProtobufError};
use crate::ieee754::f64_from_halves;

/// Function which combines low and high 32-bit halves into a value.
pub type Join64<T> = fn(u32, u32) -> T;

const BASE_1E7: u64 = 10_000_000;

pub fn split_u64(value: u64) -> (u32, u32) {
    (value as u32, (value >> 32) as u32)
}

pub fn to_u64(low: u32, high: u32) -> u64 {
    ((high as u64) << 32) | low as u64
}

pub fn to_i64(low: u32, high: u32) -> i64 {
    to_u64(low, high) as i64
}

/// Two's complement negation of a 64-bit value given as halves.
pub fn negate(low: u32, high: u32) -> (u32, u32) {
    let low = (!low).wrapping_add(1);
    let carry = (low == 0) as u32;
    (low, (!high).wrapping_add(carry))
}

/// Lowercase hex digits, without leading zeros.
pub fn hex(low: u32, high: u32) -> String {
    if high == 0 {
        format!("{:x}", low)
    } else {
        format!("{:x}{:08x}", high, low)
    }
}

/// Lowercase hex digits, zero-padded to 16 characters.
pub fn pad_hex(low: u32, high: u32) -> String {
    format!("{:08x}{:08x}", high, low)
}

/// Interpret the halves as the bits of an IEEE 754 double.
pub fn float64(low: u32, high: u32) -> f64 {
    f64_from_halves(low, high)
}

/// Format the halves as an unsigned decimal.
pub fn unsigned_decimal(low: u32, high: u32) -> String {
    // Values below 2^53 fit in the integer range of a double.
    if high <= 0x1F_FFFF {
        return to_u64(low, high).to_string();
    }

    // Convert from base 2 to base 1e7, which needs only 3 digits for the
    // 64-bit range. Using the identities
    //
    //   2^24 = (1, 6777216) in base 1e7
    //   2^48 = (2, 8147497, 6710656) in base 1e7
    //
    // the 32:32 input is split into 16:24:24 bits so that no intermediate
    // digit exceeds 48 bits.
    let low24 = (low & 0xFF_FFFF) as u64;
    let mid = (((low >> 24) | (high << 8)) & 0xFF_FFFF) as u64;
    let top = ((high >> 16) & 0xFFFF) as u64;

    let mut digit_a = low24 + mid * 6777216 + top * 6710656;
    let mut digit_b = mid + top * 8147497;
    let mut digit_c = top * 2;

    digit_b += digit_a / BASE_1E7;
    digit_a %= BASE_1E7;
    digit_c += digit_b / BASE_1E7;
    digit_b %= BASE_1E7;

    // The fast path handled every value where `digit_b` would be zero.
    if digit_c > 0 {
        format!("{}{:07}{:07}", digit_c, digit_b, digit_a)
    } else {
        format!("{}{:07}", digit_b, digit_a)
    }
}

/// Format the halves as a two's complement signed decimal.
pub fn signed_decimal(low: u32, high: u32) -> String {
    if high & 0x8000_0000 != 0 {
        let (low, high) = negate(low, high);
        format!("-{}", unsigned_decimal(low, high))
    } else {
        unsigned_decimal(low, high)
    }
}

/// Compute `value * mul + add` on halves, returning `None` on overflow.
fn mul_add(low: u32, high: u32, mul: u32, add: u32) -> Option<(u32, u32)> {
    let new_low = low as u64 * mul as u64 + add as u64;
    let new_high = high as u64 * mul as u64 + (new_low >> 32);
    if new_high > u32::MAX as u64 {
        return None;
    }
    Some((new_low as u32, new_high as u32))
}

fn invalid_number() -> ProtobufError {
    ErrorKind::InvalidNumber.into()
}

/// Parse an unsigned decimal string into halves.
pub fn parse_unsigned_decimal(text: &str) -> Result<(u32, u32), ProtobufError> {
    let digits = text.strip_prefix('+').unwrap_or(text).as_bytes();
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(invalid_number());
    }

    // Consume digits in groups of 7, as base-1e7 digits.
    let mut halves = (0, 0);
    for chunk in digits.chunks(7) {
        let chunk_value = chunk
            .iter()
            .fold(0u32, |acc, d| acc * 10 + (d - b'0') as u32);
        let mul = 10u32.pow(chunk.len() as u32);
        halves = mul_add(halves.0, halves.1, mul, chunk_value).ok_or_else(invalid_number)?;
    }
    Ok(halves)
}

/// Parse a signed decimal string into two's complement halves.
pub fn parse_signed_decimal(text: &str) -> Result<(u32, u32), ProtobufError> {
    let (negative, magnitude) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if magnitude.starts_with(['+', '-']) {
        return Err(invalid_number());
    }
    let (low, high) = parse_unsigned_decimal(magnitude)?;

    if negative {
        // Magnitude may be at most 2^63.
        if high > 0x8000_0000 || (high == 0x8000_0000 && low != 0) {
            return Err(invalid_number());
        }
        Ok(negate(low, high))
    } else if high >= 0x8000_0000 {
        Err(invalid_number())
    } else {
        Ok((low, high))
    }
}

/// Parse an unsigned hex string, with an optional `0x` prefix, into halves.
pub fn parse_hex(text: &str) -> Result<(u32, u32), ProtobufError> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    if digits.is_empty() {
        return Err(invalid_number());
    }

    let mut low = 0u32;
    let mut high = 0u32;
    for ch in digits.chars() {
        let nibble = ch.to_digit(16).ok_or_else(invalid_number)?;
        if high >> 28 != 0 {
            return Err(invalid_number());
        }
        high = (high << 4) | (low >> 28);
        low = (low << 4) | nibble;
    }
    Ok((low, high))
}
