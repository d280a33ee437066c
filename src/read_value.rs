//! Decoders for individual field values.
//!
//! Each function reads one value, without a tag, in the encoding used by the
//! corresponding Protocol Buffers type.

use crate::errors::{ErrorKind, ProtobufError};
use crate::ieee754::{f32_from_bits, f64_from_halves};
use crate::join64;
use crate::reader::Reader;
use crate::varint::{read_split_varint64, read_varint32, read_zigzag_split_varint64};
use crate::wire::WireType;

type Result<T> = std::result::Result<T, ProtobufError>;

pub fn bool(r: &mut Reader) -> Result<bool> {
    read_split_varint64(r, |low, high| low != 0 || high != 0)
}

pub fn int32(r: &mut Reader) -> Result<i32> {
    read_varint32(r).map(|v| v as i32)
}

pub fn uint32(r: &mut Reader) -> Result<u32> {
    read_varint32(r)
}

pub fn sint32(r: &mut Reader) -> Result<i32> {
    let zigzag = read_varint32(r)?;
    Ok(crate::varint::zigzag_decode32(zigzag))
}

pub fn fixed32(r: &mut Reader) -> Result<u32> {
    r.read_array().map(u32::from_le_bytes)
}

pub fn sfixed32(r: &mut Reader) -> Result<i32> {
    fixed32(r).map(|v| v as i32)
}

pub fn int64(r: &mut Reader) -> Result<i64> {
    read_split_varint64(r, join64::to_i64)
}

pub fn uint64(r: &mut Reader) -> Result<u64> {
    read_split_varint64(r, join64::to_u64)
}

pub fn sint64(r: &mut Reader) -> Result<i64> {
    read_zigzag_split_varint64(r, join64::to_i64)
}

/// Read eight little-endian bytes as low and high halves.
pub fn fixed64_halves(r: &mut Reader) -> Result<(u32, u32)> {
    let low = fixed32(r)?;
    let high = fixed32(r)?;
    Ok((low, high))
}

pub fn fixed64(r: &mut Reader) -> Result<u64> {
    fixed64_halves(r).map(|(low, high)| join64::to_u64(low, high))
}

pub fn sfixed64(r: &mut Reader) -> Result<i64> {
    fixed64_halves(r).map(|(low, high)| join64::to_i64(low, high))
}

pub fn float(r: &mut Reader) -> Result<f32> {
    fixed32(r).map(f32_from_bits)
}

pub fn double(r: &mut Reader) -> Result<f64> {
    fixed64_halves(r).map(|(low, high)| f64_from_halves(low, high))
}

pub fn int64_decimal(r: &mut Reader) -> Result<String> {
    read_split_varint64(r, join64::signed_decimal)
}

pub fn sint64_decimal(r: &mut Reader) -> Result<String> {
    read_zigzag_split_varint64(r, join64::signed_decimal)
}

pub fn uint64_decimal(r: &mut Reader) -> Result<String> {
    read_split_varint64(r, join64::unsigned_decimal)
}

pub fn uint64_hex(r: &mut Reader) -> Result<String> {
    read_split_varint64(r, join64::hex)
}

pub fn fixed64_decimal(r: &mut Reader) -> Result<String> {
    fixed64_halves(r).map(|(low, high)| join64::unsigned_decimal(low, high))
}

/// Unsigned decimal, zero-padded to the 20 digits of `u64::MAX`.
pub fn fixed64_decimal_pad(r: &mut Reader) -> Result<String> {
    fixed64_decimal(r).map(|digits| format!("{:0>20}", digits))
}

pub fn fixed64_hex_pad(r: &mut Reader) -> Result<String> {
    fixed64_halves(r).map(|(low, high)| join64::pad_hex(low, high))
}

pub fn sfixed64_decimal(r: &mut Reader) -> Result<String> {
    fixed64_halves(r).map(|(low, high)| join64::signed_decimal(low, high))
}

/// Read a length prefix.
///
/// Lengths which don't fit in `usize` can't be satisfied by the input, so
/// they fail with [`ErrorKind::TruncatedInput`].
pub fn length(r: &mut Reader) -> Result<usize> {
    let len = read_split_varint64(r, join64::to_u64)?;
    usize::try_from(len).map_err(|_| ErrorKind::TruncatedInput.into())
}

pub fn bytes<'a>(r: &mut Reader<'a>) -> Result<&'a [u8]> {
    let len = length(r)?;
    r.read_block(len)
}

pub fn string<'a>(r: &mut Reader<'a>) -> Result<&'a str> {
    let bytes = bytes(r)?;
    std::str::from_utf8(bytes).map_err(|_| ErrorKind::InvalidUtf8.into())
}

/// Read a length prefix and return a reader over the block it describes.
pub fn sub<'a>(r: &mut Reader<'a>) -> Result<Reader<'a>> {
    let len = length(r)?;
    r.sub_reader(len)
}

/// Skip over a value of the given wire type and return its encoded bytes.
///
/// For length-delimited values the returned bytes include the length prefix.
pub fn skip<'a>(r: &mut Reader<'a>, wire_type: WireType) -> Result<&'a [u8]> {
    let start = r.position();
    match wire_type {
        WireType::Varint => {
            read_split_varint64(r, |_, _| ())?;
        }
        WireType::Fixed64 => {
            r.read_block(8)?;
        }
        WireType::Len => {
            bytes(r)?;
        }
        WireType::Fixed32 => {
            r.read_block(4)?;
        }
        WireType::StartGroup | WireType::EndGroup => {
            return Err(ErrorKind::UnsupportedWireType(wire_type).into());
        }
    }
    Ok(r.consumed_since(start))
}
