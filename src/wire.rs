//! Field tags and wire types.
//!
//! Every field in an encoded message is prefixed by a varint tag which
//! combines the field number with the wire type, as `(number << 3) | wire_type`.
//! The wire type determines how the length of the field's value is found.
//!
//! See <https://protobuf.dev/programming-guides/encoding/#structure>.

use crate::errors::{ErrorKind, ProtobufError};
use crate::reader::Reader;
use crate::varint::{read_varint32, write_varint32};
use crate::writer::Writable;

/// Method used to determine the length of a field's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WireType {
    /// Length determined by the continuation bit of each byte.
    Varint = 0,
    /// Eight bytes.
    Fixed64 = 1,
    /// Varint length prefix followed by that many bytes.
    Len = 2,
    /// Start of a group. Groups are deprecated and not supported.
    StartGroup = 3,
    /// End of a group.
    EndGroup = 4,
    /// Four bytes.
    Fixed32 = 5,
}

impl WireType {
    pub fn is_group(self) -> bool {
        matches!(self, WireType::StartGroup | WireType::EndGroup)
    }
}

impl TryFrom<u8> for WireType {
    type Error = ProtobufError;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        let wt = match val {
            0 => WireType::Varint,
            1 => WireType::Fixed64,
            2 => WireType::Len,
            3 => WireType::StartGroup,
            4 => WireType::EndGroup,
            5 => WireType::Fixed32,
            _ => return Err(ErrorKind::InvalidWireType(val).into()),
        };
        Ok(wt)
    }
}

/// Decoded field tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tag {
    pub field: u32,
    pub wire_type: WireType,
}

/// Combine a field number and wire type into a tag value.
pub fn make_tag(field: u32, wire_type: WireType) -> u32 {
    (field << 3) | wire_type as u32
}

/// Read the next field tag, or return `None` if the reader is exhausted.
///
/// Fails if the field number is zero or the wire type is invalid or one of
/// the group types.
pub fn read_tag(r: &mut Reader) -> Result<Option<Tag>, ProtobufError> {
    if r.is_done() {
        return Ok(None);
    }
    let tag = read_varint32(r)?;
    let wire_type = WireType::try_from((tag & 0x7) as u8)?;
    if wire_type.is_group() {
        return Err(ErrorKind::UnsupportedWireType(wire_type).into());
    }
    let field = tag >> 3;
    if field == 0 {
        return Err(ErrorKind::InvalidFieldNumber.into());
    }
    Ok(Some(Tag { field, wire_type }))
}

pub fn write_tag<W: Writable + ?Sized>(w: &mut W, field: u32, wire_type: WireType) {
    write_varint32(w, make_tag(field, wire_type));
}
