//! Field types and the encoding of field values.
//!
//! A [`FieldType`] determines how a field's value is represented in a
//! [`Value`], which wire type it uses and how it is read and written.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::enums::EnumDescriptor;
use crate::errors::{ErrorKind, ProtobufError};
use crate::join64::{self, split_u64};
use crate::message::{FieldDescriptor, MessageDescriptor, MessageRef};
use crate::read_value;
use crate::reader::Reader;
use crate::value::{MapKey, Value};
use crate::wire::{WireType, read_tag, write_tag};
use crate::write_value;
use crate::writer::{NestedWrite, Writable};

type Result<T> = std::result::Result<T, ProtobufError>;

/// Protocol Buffers scalar types.
///
/// Besides the standard types, 64-bit integers can be represented in a
/// [`Value::String`] as decimal or hexadecimal text. These variants are
/// named after the wire encoding and the text format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bool,
    Int32,
    Sint32,
    Uint32,
    Fixed32,
    Sfixed32,
    Int64,
    Sint64,
    Uint64,
    Fixed64,
    Sfixed64,
    Float,
    Double,
    String,
    Bytes,

    /// `int64` as signed decimal text.
    Int64Decimal,
    /// `sint64` as signed decimal text.
    Sint64Decimal,
    /// `uint64` as unsigned decimal text.
    Uint64Decimal,
    /// `uint64` as lowercase hex text.
    Uint64Hex,
    /// `fixed64` as unsigned decimal text.
    Fixed64Decimal,
    /// `fixed64` as unsigned decimal text zero-padded to 20 digits.
    Fixed64DecimalPad,
    /// `fixed64` as hex text zero-padded to 16 digits.
    Fixed64HexPad,
    /// `sfixed64` as signed decimal text.
    Sfixed64Decimal,
}

impl ScalarType {
    pub fn wire_type(self) -> WireType {
        use ScalarType::*;
        match self {
            Bool | Int32 | Sint32 | Uint32 | Int64 | Sint64 | Uint64 | Int64Decimal
            | Sint64Decimal | Uint64Decimal | Uint64Hex => WireType::Varint,
            Fixed64 | Sfixed64 | Double | Fixed64Decimal | Fixed64DecimalPad
            | Fixed64HexPad | Sfixed64Decimal => WireType::Fixed64,
            Fixed32 | Sfixed32 | Float => WireType::Fixed32,
            String | Bytes => WireType::Len,
        }
    }

    /// Return true if values of this type are 64-bit integers held as text.
    pub fn is_textual(self) -> bool {
        use ScalarType::*;
        matches!(
            self,
            Int64Decimal
                | Sint64Decimal
                | Uint64Decimal
                | Uint64Hex
                | Fixed64Decimal
                | Fixed64DecimalPad
                | Fixed64HexPad
                | Sfixed64Decimal
        )
    }

    pub fn default_value(self) -> Value {
        use ScalarType::*;
        match self {
            Bool => Value::Bool(false),
            Int32 | Sint32 | Sfixed32 => Value::I32(0),
            Uint32 | Fixed32 => Value::U32(0),
            Int64 | Sint64 | Sfixed64 => Value::I64(0),
            Uint64 | Fixed64 => Value::U64(0),
            Float => Value::F32(0.),
            Double => Value::F64(0.),
            String => Value::String(std::string::String::new()),
            Bytes => Value::Bytes(Vec::new()),
            Fixed64DecimalPad => Value::String("0".repeat(20)),
            Fixed64HexPad => Value::String("0".repeat(16)),
            Int64Decimal | Sint64Decimal | Uint64Decimal | Uint64Hex | Fixed64Decimal
            | Sfixed64Decimal => Value::String("0".into()),
        }
    }

    /// Return true if `value` is the default for this type.
    ///
    /// Defaults are omitted when encoding unless the write is forced.
    /// Negative zero is not a default.
    pub fn is_default(self, value: &Value) -> bool {
        use ScalarType::*;
        match (self, value) {
            (Bool, Value::Bool(v)) => !v,
            (Int32 | Sint32 | Sfixed32, Value::I32(v)) => *v == 0,
            (Uint32 | Fixed32, Value::U32(v)) => *v == 0,
            (Int64 | Sint64 | Sfixed64, Value::I64(v)) => *v == 0,
            (Uint64 | Fixed64, Value::U64(v)) => *v == 0,
            (Float, Value::F32(v)) => v.to_bits() == 0,
            (Double, Value::F64(v)) => v.to_bits() == 0,
            (String, Value::String(v)) => v.is_empty(),
            (Bytes, Value::Bytes(v)) => v.is_empty(),
            _ if self.is_textual() => matches!(self.textual_halves(value), Ok((0, 0))),
            _ => false,
        }
    }

    /// Return true if `value` is an empty textual 64-bit value, which is
    /// never written.
    fn is_nil(self, value: &Value) -> bool {
        self.is_textual() && matches!(value, Value::String(s) if s.is_empty())
    }

    /// Convert a textual 64-bit value to two's complement halves.
    fn textual_halves(self, value: &Value) -> Result<(u32, u32)> {
        use ScalarType::*;
        match value {
            Value::String(text) => match self {
                Int64Decimal | Sint64Decimal | Sfixed64Decimal => {
                    join64::parse_signed_decimal(text)
                }
                Uint64Hex | Fixed64HexPad => join64::parse_hex(text),
                _ => join64::parse_unsigned_decimal(text),
            },
            Value::U64(v) => Ok(split_u64(*v)),
            Value::I64(v) => Ok(split_u64(*v as u64)),
            _ => Err(ErrorKind::ValueTypeMismatch.into()),
        }
    }

    /// Read a value of this type, without a tag.
    pub fn read(self, r: &mut Reader) -> Result<Value> {
        use ScalarType::*;
        let value = match self {
            Bool => Value::Bool(read_value::bool(r)?),
            Int32 => Value::I32(read_value::int32(r)?),
            Sint32 => Value::I32(read_value::sint32(r)?),
            Uint32 => Value::U32(read_value::uint32(r)?),
            Fixed32 => Value::U32(read_value::fixed32(r)?),
            Sfixed32 => Value::I32(read_value::sfixed32(r)?),
            Int64 => Value::I64(read_value::int64(r)?),
            Sint64 => Value::I64(read_value::sint64(r)?),
            Uint64 => Value::U64(read_value::uint64(r)?),
            Fixed64 => Value::U64(read_value::fixed64(r)?),
            Sfixed64 => Value::I64(read_value::sfixed64(r)?),
            Float => Value::F32(read_value::float(r)?),
            Double => Value::F64(read_value::double(r)?),
            String => Value::String(read_value::string(r)?.to_string()),
            Bytes => Value::Bytes(read_value::bytes(r)?.to_vec()),
            Int64Decimal => Value::String(read_value::int64_decimal(r)?),
            Sint64Decimal => Value::String(read_value::sint64_decimal(r)?),
            Uint64Decimal => Value::String(read_value::uint64_decimal(r)?),
            Uint64Hex => Value::String(read_value::uint64_hex(r)?),
            Fixed64Decimal => Value::String(read_value::fixed64_decimal(r)?),
            Fixed64DecimalPad => Value::String(read_value::fixed64_decimal_pad(r)?),
            Fixed64HexPad => Value::String(read_value::fixed64_hex_pad(r)?),
            Sfixed64Decimal => Value::String(read_value::sfixed64_decimal(r)?),
        };
        Ok(value)
    }

    /// Write a value of this type, without a tag.
    ///
    /// Fails with [`ErrorKind::ValueTypeMismatch`] if the variant of `value`
    /// does not match this type.
    pub fn write<W: Writable + ?Sized>(self, w: &mut W, value: &Value) -> Result<()> {
        use ScalarType::*;
        match (self, value) {
            (Bool, Value::Bool(v)) => write_value::bool(w, *v),
            (Int32, Value::I32(v)) => write_value::int32(w, *v),
            (Sint32, Value::I32(v)) => write_value::sint32(w, *v),
            (Uint32, Value::U32(v)) => write_value::uint32(w, *v),
            (Fixed32, Value::U32(v)) => write_value::fixed32(w, *v),
            (Sfixed32, Value::I32(v)) => write_value::sfixed32(w, *v),
            (Int64, Value::I64(v)) => write_value::int64(w, *v),
            (Sint64, Value::I64(v)) => write_value::sint64(w, *v),
            (Uint64, Value::U64(v)) => write_value::uint64(w, *v),
            (Fixed64, Value::U64(v)) => write_value::fixed64(w, *v),
            (Sfixed64, Value::I64(v)) => write_value::sfixed64(w, *v),
            (Float, Value::F32(v)) => write_value::float(w, *v),
            (Double, Value::F64(v)) => write_value::double(w, *v),
            (String, Value::String(v)) => write_value::string(w, v),
            (Bytes, Value::Bytes(v)) => write_value::bytes(w, v),
            (Int64Decimal | Uint64Decimal | Uint64Hex, _) => {
                let (low, high) = self.textual_halves(value)?;
                write_value::varint64_halves(w, low, high);
            }
            (Sint64Decimal, _) => {
                let (low, high) = self.textual_halves(value)?;
                write_value::zigzag64_halves(w, low, high);
            }
            (Fixed64Decimal | Fixed64DecimalPad | Fixed64HexPad | Sfixed64Decimal, _) => {
                let (low, high) = self.textual_halves(value)?;
                write_value::fixed64_halves(w, low, high);
            }
            _ => return Err(ErrorKind::ValueTypeMismatch.into()),
        }
        Ok(())
    }
}

/// Key and value types of a map field.
///
/// Map entries are encoded as messages with the key as field 1 and the value
/// as field 2.
#[derive(Debug)]
pub struct MapType {
    key: ScalarType,
    value: FieldType,
    entry: MessageRef,
}

impl MapType {
    pub fn key(&self) -> ScalarType {
        self.key
    }

    pub fn value(&self) -> &FieldType {
        &self.value
    }

    /// Read one length-delimited entry.
    fn read_entry(&self, r: &mut Reader) -> Result<(MapKey, Value)> {
        let mut sub = read_value::sub(r)?;
        let entry = self.entry.read_contents(&mut sub, None)?;
        let mut slots = entry.into_slots().into_iter();
        let key = MapKey::try_from(slots.next().unwrap_or_default())?;
        let value = match (slots.next().unwrap_or_default(), &self.value) {
            (Value::Absent, FieldType::Message(msg)) => Value::from(msg.new_value()),
            (value, _) => value,
        };
        Ok((key, value))
    }

    fn write_entry<W: NestedWrite + ?Sized>(
        &self,
        w: &mut W,
        field: u32,
        key: &MapKey,
        value: &Value,
    ) -> Result<()> {
        write_tag(w, field, WireType::Len);
        w.begin();
        FieldType::Scalar(self.key).write(w, &Value::from(key.clone()), 1, false)?;
        self.value.write(w, value, 2, false)?;
        w.end()
    }
}

/// Type of a message field.
#[derive(Clone, Debug)]
pub enum FieldType {
    /// Scalar with implicit presence. Default values are not written.
    Scalar(ScalarType),

    /// Scalar with explicit presence. Values are written whenever they are
    /// present, including defaults.
    Optional(ScalarType),

    /// Scalar wrapped in a message with the value as field 1, as in the
    /// `google.protobuf.*Value` well-known types.
    Wrapper(ScalarType),

    Enum(&'static EnumDescriptor),

    Message(MessageRef),

    Repeated {
        element: Box<FieldType>,
        /// Whether to use the packed encoding when writing. Both encodings
        /// are accepted when reading.
        packed: bool,
    },

    Map(Arc<MapType>),
}

impl FieldType {
    /// Create a repeated field type which uses the packed encoding where the
    /// element type allows it.
    pub fn repeated(element: FieldType) -> FieldType {
        let packed = element.is_packable();
        FieldType::Repeated {
            element: Box::new(element),
            packed,
        }
    }

    /// Create a repeated field type which writes each element with its own
    /// tag.
    pub fn repeated_unpacked(element: FieldType) -> FieldType {
        FieldType::Repeated {
            element: Box::new(element),
            packed: false,
        }
    }

    pub fn map(key: ScalarType, value: FieldType) -> FieldType {
        let entry = MessageDescriptor::from_fields(
            "MapEntry",
            vec![
                FieldDescriptor::new(1, "key", FieldType::Scalar(key)),
                FieldDescriptor::new(2, "value", value.clone()),
            ],
        );
        FieldType::Map(Arc::new(MapType {
            key,
            value,
            entry: MessageRef::from(entry),
        }))
    }

    pub fn wire_type(&self) -> WireType {
        match self {
            FieldType::Scalar(s) | FieldType::Optional(s) => s.wire_type(),
            FieldType::Enum(_) => WireType::Varint,
            FieldType::Wrapper(_)
            | FieldType::Message(_)
            | FieldType::Repeated { .. }
            | FieldType::Map(_) => WireType::Len,
        }
    }

    fn is_packable(&self) -> bool {
        self.wire_type() != WireType::Len
    }

    /// Return the value of a field of this type which has not been set.
    pub fn default_value(&self) -> Value {
        match self {
            FieldType::Scalar(s) => s.default_value(),
            FieldType::Enum(e) => Value::Enum(e.default_value()),
            FieldType::Optional(_) | FieldType::Wrapper(_) | FieldType::Message(_) => {
                Value::Absent
            }
            FieldType::Repeated { .. } => Value::List(Vec::new()),
            FieldType::Map(_) => Value::Map(BTreeMap::new()),
        }
    }

    /// Read one occurrence of a field of this type into `value`.
    ///
    /// `value` is the field's current value, which the occurrence is merged
    /// into. Scalars replace it, messages are merged field by field, and
    /// repeated and map fields are extended. If an error occurs `value` is
    /// left as it was, except that a nested message may have been partially
    /// merged.
    pub fn read(&self, r: &mut Reader, wire_type: WireType, value: &mut Value) -> Result<()> {
        if let FieldType::Repeated { element, .. } = self {
            if !matches!(value, Value::List(_)) {
                *value = Value::List(Vec::new());
            }
            let Value::List(list) = value else {
                return Ok(());
            };
            let len = list.len();
            let result = read_elements(element, r, wire_type, list);
            if result.is_err() {
                list.truncate(len);
            }
            return result;
        }

        let expected = self.wire_type();
        if wire_type != expected {
            return Err(ErrorKind::WireTypeMismatch {
                expected,
                actual: wire_type,
            }
            .into());
        }

        match self {
            FieldType::Wrapper(s) => {
                let mut sub = read_value::sub(r)?;
                let seed = match &*value {
                    Value::Absent => s.default_value(),
                    prev => prev.clone(),
                };
                *value = read_wrapper(*s, &mut sub, seed)?;
            }
            FieldType::Message(msg) => {
                let mut sub = read_value::sub(r)?;
                match value {
                    Value::Message(prev) if prev.descriptor() == msg => {
                        prev.read_nested(&mut sub)?;
                    }
                    _ => *value = msg.read_contents(&mut sub, None)?.into(),
                }
            }
            FieldType::Map(map) => {
                let (key, entry) = map.read_entry(r)?;
                if !matches!(value, Value::Map(_)) {
                    *value = Value::Map(BTreeMap::new());
                }
                if let Value::Map(entries) = value {
                    entries.insert(key, entry);
                }
            }
            _ => *value = self.read_value(r)?,
        }
        Ok(())
    }

    /// Read a value without a tag, as stored in a packed array.
    fn read_value(&self, r: &mut Reader) -> Result<Value> {
        match self {
            FieldType::Scalar(s) | FieldType::Optional(s) => s.read(r),
            FieldType::Enum(e) => read_value::int32(r).map(|n| Value::Enum(e.from_wire(n))),
            _ => Err(ErrorKind::WireTypeMismatch {
                expected: self.wire_type(),
                actual: WireType::Len,
            }
            .into()),
        }
    }

    /// Write a field of this type with the given field number.
    ///
    /// Returns true if anything was written. [`Value::Absent`] is never
    /// written. Scalars and enums with implicit presence are skipped if
    /// they have their default value, unless `force` is set. Empty repeated
    /// and map fields are skipped.
    pub fn write<W: NestedWrite + ?Sized>(
        &self,
        w: &mut W,
        value: &Value,
        field: u32,
        force: bool,
    ) -> Result<bool> {
        if value.is_absent() {
            return Ok(false);
        }

        match self {
            FieldType::Scalar(s) => {
                if s.is_nil(value) || (!force && s.is_default(value)) {
                    return Ok(false);
                }
                write_tag(w, field, s.wire_type());
                s.write(w, value)?;
            }
            FieldType::Optional(s) => {
                return FieldType::Scalar(*s).write(w, value, field, true);
            }
            FieldType::Wrapper(s) => {
                write_tag(w, field, WireType::Len);
                w.begin();
                FieldType::Scalar(*s).write(w, value, 1, false)?;
                w.end()?;
            }
            FieldType::Enum(_) => {
                let number = enum_number(value)?;
                if number == 0 && !force {
                    return Ok(false);
                }
                write_tag(w, field, WireType::Varint);
                write_value::int32(w, number);
            }
            FieldType::Message(msg) => {
                let Value::Message(value) = value else {
                    return Err(ErrorKind::ValueTypeMismatch.into());
                };
                write_tag(w, field, WireType::Len);
                w.begin();
                msg.write_contents(w, value)?;
                w.end()?;
            }
            FieldType::Repeated { element, packed } => {
                let Value::List(items) = value else {
                    return Err(ErrorKind::ValueTypeMismatch.into());
                };
                if items.is_empty() {
                    return Ok(false);
                }
                if *packed && element.is_packable() {
                    write_tag(w, field, WireType::Len);
                    w.begin();
                    for item in items {
                        element.write_value(w, item)?;
                    }
                    w.end()?;
                } else {
                    for item in items {
                        element.write(w, item, field, true)?;
                    }
                }
            }
            FieldType::Map(map) => {
                let Value::Map(entries) = value else {
                    return Err(ErrorKind::ValueTypeMismatch.into());
                };
                if entries.is_empty() {
                    return Ok(false);
                }
                for (key, value) in entries {
                    map.write_entry(w, field, key, value)?;
                }
            }
        }
        Ok(true)
    }

    /// Write a value without a tag, as stored in a packed array.
    fn write_value<W: Writable + ?Sized>(&self, w: &mut W, value: &Value) -> Result<()> {
        match self {
            FieldType::Scalar(s) | FieldType::Optional(s) => s.write(w, value),
            FieldType::Enum(_) => {
                write_value::int32(w, enum_number(value)?);
                Ok(())
            }
            _ => Err(ErrorKind::ValueTypeMismatch.into()),
        }
    }
}

/// Read one occurrence of a repeated field, appending to `list`.
fn read_elements(
    element: &FieldType,
    r: &mut Reader,
    wire_type: WireType,
    list: &mut Vec<Value>,
) -> Result<()> {
    if wire_type == WireType::Len && element.is_packable() {
        let mut sub = read_value::sub(r)?;
        while !sub.is_done() {
            list.push(element.read_value(&mut sub)?);
        }
    } else {
        let mut item = element.default_value();
        element.read(r, wire_type, &mut item)?;
        list.push(item);
    }
    Ok(())
}

/// Read the contents of a wrapper message into `value`. Fields other than
/// the value are skipped.
fn read_wrapper(ty: ScalarType, r: &mut Reader, mut value: Value) -> Result<Value> {
    while let Some(tag) = read_tag(r)? {
        if tag.field == 1 {
            FieldType::Scalar(ty).read(r, tag.wire_type, &mut value)?;
        } else {
            read_value::skip(r, tag.wire_type)?;
        }
    }
    Ok(value)
}

fn enum_number(value: &Value) -> Result<i32> {
    match value {
        Value::Enum(v) => Ok(v.number()),
        Value::I32(v) => Ok(*v),
        _ => Err(ErrorKind::ValueTypeMismatch.into()),
    }
}
