//! Encoders for individual field values, without tags.

use crate::ieee754::{f32_to_bits, f64_to_halves};
use crate::join64::split_u64;
use crate::varint::{
    write_int32, write_length, write_split_varint64, write_varint32, zigzag_encode32,
    zigzag_encode64,
};
use crate::writer::Writable;

pub fn bool<W: Writable + ?Sized>(w: &mut W, value: bool) {
    w.write_byte(value as u8);
}

pub fn int32<W: Writable + ?Sized>(w: &mut W, value: i32) {
    write_int32(w, value);
}

pub fn uint32<W: Writable + ?Sized>(w: &mut W, value: u32) {
    write_varint32(w, value);
}

pub fn sint32<W: Writable + ?Sized>(w: &mut W, value: i32) {
    write_varint32(w, zigzag_encode32(value));
}

pub fn fixed32<W: Writable + ?Sized>(w: &mut W, value: u32) {
    w.write_block(&value.to_le_bytes());
}

pub fn sfixed32<W: Writable + ?Sized>(w: &mut W, value: i32) {
    fixed32(w, value as u32);
}

/// Write a 64-bit varint given as two's complement halves.
pub fn varint64_halves<W: Writable + ?Sized>(w: &mut W, low: u32, high: u32) {
    write_split_varint64(w, low, high);
}

/// Write a zigzag-encoded 64-bit varint given as two's complement halves.
pub fn zigzag64_halves<W: Writable + ?Sized>(w: &mut W, low: u32, high: u32) {
    let (low, high) = zigzag_encode64(low, high);
    write_split_varint64(w, low, high);
}

/// Write eight little-endian bytes given as halves.
pub fn fixed64_halves<W: Writable + ?Sized>(w: &mut W, low: u32, high: u32) {
    fixed32(w, low);
    fixed32(w, high);
}

pub fn int64<W: Writable + ?Sized>(w: &mut W, value: i64) {
    uint64(w, value as u64);
}

pub fn uint64<W: Writable + ?Sized>(w: &mut W, value: u64) {
    let (low, high) = split_u64(value);
    varint64_halves(w, low, high);
}

pub fn sint64<W: Writable + ?Sized>(w: &mut W, value: i64) {
    let (low, high) = split_u64(value as u64);
    zigzag64_halves(w, low, high);
}

pub fn fixed64<W: Writable + ?Sized>(w: &mut W, value: u64) {
    let (low, high) = split_u64(value);
    fixed64_halves(w, low, high);
}

pub fn sfixed64<W: Writable + ?Sized>(w: &mut W, value: i64) {
    fixed64(w, value as u64);
}

pub fn float<W: Writable + ?Sized>(w: &mut W, value: f32) {
    fixed32(w, f32_to_bits(value));
}

pub fn double<W: Writable + ?Sized>(w: &mut W, value: f64) {
    let (low, high) = f64_to_halves(value);
    fixed64_halves(w, low, high);
}

pub fn bytes<W: Writable + ?Sized>(w: &mut W, value: &[u8]) {
    write_length(w, value.len());
    w.write_block(value);
}

pub fn string<W: Writable + ?Sized>(w: &mut W, value: &str) {
    bytes(w, value.as_bytes());
}

#[cfg(test)]
mod tests {
    use protowire_testing::{from_hex, to_hex};

    use super::*;
    use crate::read_value;
    use crate::reader::Reader;

    fn encode(write: impl FnOnce(&mut Vec<u8>)) -> String {
        let mut buf = Vec::new();
        write(&mut buf);
        to_hex(&buf)
    }

    #[test]
    fn test_write_values() {
        assert_eq!(encode(|w| int32(w, 0)), "00");
        assert_eq!(encode(|w| int32(w, 1234567)), "87ad4b");
        assert_eq!(encode(|w| int32(w, -1)), "ffffffffffffffffff01");
        assert_eq!(encode(|w| bool(w, true)), "01");
        assert_eq!(encode(|w| sint32(w, -1234567)), "8dda9601");
        assert_eq!(encode(|w| fixed32(w, 1234567)), "87d61200");
        assert_eq!(encode(|w| sfixed32(w, -10)), "f6ffffff");
        assert_eq!(encode(|w| int64(w, 150000000000)), "80b8c9e5ae04");
        assert_eq!(encode(|w| int64(w, -150000000000)), "80c8b69ad1fbffffff01");
        assert_eq!(encode(|w| sint64(w, -12345678901)), "e9f0e0fd5b");
        assert_eq!(encode(|w| uint64(w, 12345678901)), "b5b8f0fe2d");
        assert_eq!(encode(|w| fixed64(w, 12345678901)), "351cdcdf02000000");
        assert_eq!(encode(|w| sfixed64(w, -10)), "f6ffffffffffffff");
        assert_eq!(encode(|w| double(w, 12345.12345)), "58a835cd8f1cc840");
        assert_eq!(encode(|w| double(w, 5e-324)), "0100000000000000");
        assert_eq!(encode(|w| float(w, 12345.123046875)), "7ee44046");
        assert_eq!(encode(|w| float(w, 1.)), "0000803f");
        assert_eq!(
            encode(|w| string(w, "the rain in spain")),
            "11746865207261696e20696e20737061696e"
        );
        assert_eq!(encode(|w| bytes(w, &[])), "00");
    }

    #[test]
    fn test_round_trip_boundaries() {
        for value in [0, 1, -1, i32::MAX, i32::MIN] {
            let buf = from_hex(&encode(|w| int32(w, value)));
            assert_eq!(read_value::int32(&mut Reader::new(&buf)).unwrap(), value);
            let buf = from_hex(&encode(|w| sint32(w, value)));
            assert_eq!(read_value::sint32(&mut Reader::new(&buf)).unwrap(), value);
            let buf = from_hex(&encode(|w| sfixed32(w, value)));
            assert_eq!(read_value::sfixed32(&mut Reader::new(&buf)).unwrap(), value);
        }

        for value in [0, 1, -1, i64::MAX, i64::MIN] {
            let buf = from_hex(&encode(|w| int64(w, value)));
            assert_eq!(read_value::int64(&mut Reader::new(&buf)).unwrap(), value);
            let buf = from_hex(&encode(|w| sint64(w, value)));
            assert_eq!(read_value::sint64(&mut Reader::new(&buf)).unwrap(), value);
            let buf = from_hex(&encode(|w| sfixed64(w, value)));
            assert_eq!(read_value::sfixed64(&mut Reader::new(&buf)).unwrap(), value);
        }

        for value in [0., -0., f64::INFINITY, f64::NEG_INFINITY, 5e-324, f64::MAX] {
            let buf = from_hex(&encode(|w| double(w, value)));
            let decoded = read_value::double(&mut Reader::new(&buf)).unwrap();
            assert_eq!(decoded.to_bits(), value.to_bits());
        }

        let buf = from_hex(&encode(|w| double(w, f64::NAN)));
        assert!(read_value::double(&mut Reader::new(&buf)).unwrap().is_nan());
        let buf = from_hex(&encode(|w| float(w, f32::NAN)));
        assert!(read_value::float(&mut Reader::new(&buf)).unwrap().is_nan());
    }
}
