//! Read and write varints.
//!
//! Variable length integers (_varints_) are the default encoding of integers
//! in Protocol Buffers messages, including field tags and lengths. Each byte
//! holds 7 value bits, least significant group first, and a continuation bit.
//!
//! 64-bit varints are handled as a pair of 32-bit halves. The halves are
//! combined into the caller's preferred representation by a join function
//! (see [`join64`](crate::join64)).
//!
//! See <https://protobuf.dev/programming-guides/encoding/#varints>.

use crate::errors::{ErrorKind, ProtobufError};
use crate::reader::Reader;
use crate::writer::Writable;

/// Maximum number of bytes for an encoded varint.
///
/// Each byte contains 7 value bits and one continuation bit. Hence we need 9
/// "full" bytes plus one bit from the 10th byte for a 64-bit value.
pub const MAX_VARINT_LEN: usize = 10;

/// Read a varint and return its low 32 bits.
///
/// Up to 10 bytes are accepted, so that negative `int32` values written by
/// encoders which sign-extend them to 64 bits can be read. Bits above the
/// 32nd are discarded.
pub fn read_varint32(r: &mut Reader) -> Result<u32, ProtobufError> {
    let mut value = 0u32;
    for i in 0..MAX_VARINT_LEN {
        let byte = r.read_byte()?;
        if i < 5 {
            value |= ((byte & 0x7f) as u32) << (i * 7);
        }
        if byte < 0x80 {
            return Ok(value);
        }
    }
    Err(ErrorKind::MalformedVarint.into())
}

/// Read a 64-bit varint as low and high 32-bit halves and combine them with
/// `join`.
pub fn read_split_varint64<T>(
    r: &mut Reader,
    join: impl FnOnce(u32, u32) -> T,
) -> Result<T, ProtobufError> {
    let mut low = 0u32;
    let mut high = 0u32;
    for i in 0..MAX_VARINT_LEN {
        let byte = r.read_byte()?;
        let bits = (byte & 0x7f) as u32;
        match i {
            0..=3 => low |= bits << (i * 7),
            // The fifth byte straddles the two halves.
            4 => {
                low |= bits << 28;
                high |= bits >> 4;
            }
            _ => high |= bits << (i * 7 - 32),
        }
        if byte < 0x80 {
            return Ok(join(low, high));
        }
    }
    Err(ErrorKind::MalformedVarint.into())
}

/// Read a zigzag-encoded 64-bit varint and combine the decoded halves with
/// `join`.
pub fn read_zigzag_split_varint64<T>(
    r: &mut Reader,
    join: impl FnOnce(u32, u32) -> T,
) -> Result<T, ProtobufError> {
    read_split_varint64(r, |low, high| {
        let (low, high) = zigzag_decode64(low, high);
        join(low, high)
    })
}

/// Write an unsigned 32-bit varint.
pub fn write_varint32<W: Writable + ?Sized>(w: &mut W, mut value: u32) {
    while value >= 0x80 {
        w.write_byte((value & 0x7f) as u8 | 0x80);
        value >>= 7;
    }
    w.write_byte(value as u8);
}

/// Write a signed 32-bit varint.
///
/// Negative values are sign-extended to 64 bits and always take 10 bytes.
pub fn write_int32<W: Writable + ?Sized>(w: &mut W, value: i32) {
    if value >= 0 {
        write_varint32(w, value as u32);
    } else {
        write_split_varint64(w, value as u32, u32::MAX);
    }
}

/// Write a 64-bit varint given as low and high 32-bit halves.
pub fn write_split_varint64<W: Writable + ?Sized>(w: &mut W, mut low: u32, mut high: u32) {
    while high > 0 || low > 0x7f {
        w.write_byte((low & 0x7f) as u8 | 0x80);
        low = (low >> 7) | (high << 25);
        high >>= 7;
    }
    w.write_byte(low as u8);
}

/// Write a length prefix.
pub fn write_length<W: Writable + ?Sized>(w: &mut W, len: usize) {
    let len = len as u64;
    write_split_varint64(w, len as u32, (len >> 32) as u32);
}

pub fn zigzag_encode32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

pub fn zigzag_decode32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Zigzag-encode a two's complement 64-bit value given as halves.
pub fn zigzag_encode64(low: u32, high: u32) -> (u32, u32) {
    let sign = ((high as i32) >> 31) as u32;
    let new_high = ((high << 1) | (low >> 31)) ^ sign;
    let new_low = (low << 1) ^ sign;
    (new_low, new_high)
}

/// Inverse of [`zigzag_encode64`].
pub fn zigzag_decode64(low: u32, high: u32) -> (u32, u32) {
    // The lowest bit of the high half moves into the top of the low half.
    let sign_flip = (low & 1).wrapping_neg();
    let new_low = ((low >> 1) | (high << 31)) ^ sign_flip;
    let new_high = (high >> 1) ^ sign_flip;
    (new_low, new_high)
}
