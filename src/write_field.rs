//! Writers for individual fields, for use in
//! [`EncodeMessage::write_contents`](crate::EncodeMessage::write_contents).
//!
//! Each writer emits the field's tag followed by its value, and returns true
//! if anything was written. Scalar fields are skipped if they have their
//! default value, unless `force` is set.

use crate::enums::EnumValue;
use crate::errors::ProtobufError;
use crate::join64;
use crate::message::EncodeMessage;
use crate::wire::{WireType, write_tag};
use crate::write_value;
use crate::writer::{NestedWrite, Writable};

type Result<T> = std::result::Result<T, ProtobufError>;

macro_rules! impl_scalar_writer {
    ($name:ident, $type:ty, $wire_type:expr) => {
        pub fn $name<W: Writable + ?Sized>(
            w: &mut W,
            field: u32,
            value: $type,
            force: bool,
        ) -> bool {
            if !force && value == <$type>::default() {
                return false;
            }
            write_tag(w, field, $wire_type);
            write_value::$name(w, value);
            true
        }
    };
}

impl_scalar_writer!(bool, bool, WireType::Varint);
impl_scalar_writer!(int32, i32, WireType::Varint);
impl_scalar_writer!(uint32, u32, WireType::Varint);
impl_scalar_writer!(sint32, i32, WireType::Varint);
impl_scalar_writer!(fixed32, u32, WireType::Fixed32);
impl_scalar_writer!(sfixed32, i32, WireType::Fixed32);
impl_scalar_writer!(int64, i64, WireType::Varint);
impl_scalar_writer!(uint64, u64, WireType::Varint);
impl_scalar_writer!(sint64, i64, WireType::Varint);
impl_scalar_writer!(fixed64, u64, WireType::Fixed64);
impl_scalar_writer!(sfixed64, i64, WireType::Fixed64);

/// Write a `float` field. Negative zero is not treated as a default.
pub fn float<W: Writable + ?Sized>(w: &mut W, field: u32, value: f32, force: bool) -> bool {
    if !force && value.to_bits() == 0 {
        return false;
    }
    write_tag(w, field, WireType::Fixed32);
    write_value::float(w, value);
    true
}

/// Write a `double` field. Negative zero is not treated as a default.
pub fn double<W: Writable + ?Sized>(w: &mut W, field: u32, value: f64, force: bool) -> bool {
    if !force && value.to_bits() == 0 {
        return false;
    }
    write_tag(w, field, WireType::Fixed64);
    write_value::double(w, value);
    true
}

pub fn string<W: Writable + ?Sized>(w: &mut W, field: u32, value: &str, force: bool) -> bool {
    bytes(w, field, value.as_bytes(), force)
}

pub fn bytes<W: Writable + ?Sized>(w: &mut W, field: u32, value: &[u8], force: bool) -> bool {
    if !force && value.is_empty() {
        return false;
    }
    write_tag(w, field, WireType::Len);
    write_value::bytes(w, value);
    true
}

pub fn enumeration<W: Writable + ?Sized>(
    w: &mut W,
    field: u32,
    value: EnumValue,
    force: bool,
) -> bool {
    int32(w, field, value.number(), force)
}

/// Write a 64-bit integer held as text.
///
/// Empty text is never written, and zero is only written if `force` is set.
fn textual<W: Writable + ?Sized>(
    w: &mut W,
    field: u32,
    text: &str,
    force: bool,
    wire_type: WireType,
    parse: fn(&str) -> Result<(u32, u32)>,
    write_halves: fn(&mut W, u32, u32),
) -> Result<bool> {
    if text.is_empty() {
        return Ok(false);
    }
    let (low, high) = parse(text)?;
    if !force && low == 0 && high == 0 {
        return Ok(false);
    }
    write_tag(w, field, wire_type);
    write_halves(w, low, high);
    Ok(true)
}

/// Write an `int64` field given as signed decimal text.
pub fn int64_decimal<W: Writable + ?Sized>(
    w: &mut W,
    field: u32,
    text: &str,
    force: bool,
) -> Result<bool> {
    textual(
        w,
        field,
        text,
        force,
        WireType::Varint,
        join64::parse_signed_decimal,
        write_value::varint64_halves,
    )
}

/// Write a `sint64` field given as signed decimal text.
pub fn sint64_decimal<W: Writable + ?Sized>(
    w: &mut W,
    field: u32,
    text: &str,
    force: bool,
) -> Result<bool> {
    textual(
        w,
        field,
        text,
        force,
        WireType::Varint,
        join64::parse_signed_decimal,
        write_value::zigzag64_halves,
    )
}

/// Write a `uint64` field given as unsigned decimal text.
pub fn uint64_decimal<W: Writable + ?Sized>(
    w: &mut W,
    field: u32,
    text: &str,
    force: bool,
) -> Result<bool> {
    textual(
        w,
        field,
        text,
        force,
        WireType::Varint,
        join64::parse_unsigned_decimal,
        write_value::varint64_halves,
    )
}

/// Write a `uint64` field given as hex text.
pub fn uint64_hex<W: Writable + ?Sized>(
    w: &mut W,
    field: u32,
    text: &str,
    force: bool,
) -> Result<bool> {
    textual(
        w,
        field,
        text,
        force,
        WireType::Varint,
        join64::parse_hex,
        write_value::varint64_halves,
    )
}

/// Write a `fixed64` field given as unsigned decimal text. Zero-padded text
/// is accepted.
pub fn fixed64_decimal<W: Writable + ?Sized>(
    w: &mut W,
    field: u32,
    text: &str,
    force: bool,
) -> Result<bool> {
    textual(
        w,
        field,
        text,
        force,
        WireType::Fixed64,
        join64::parse_unsigned_decimal,
        write_value::fixed64_halves,
    )
}

/// Write a `fixed64` field given as hex text.
pub fn fixed64_hex<W: Writable + ?Sized>(
    w: &mut W,
    field: u32,
    text: &str,
    force: bool,
) -> Result<bool> {
    textual(
        w,
        field,
        text,
        force,
        WireType::Fixed64,
        join64::parse_hex,
        write_value::fixed64_halves,
    )
}

/// Write a `sfixed64` field given as signed decimal text.
pub fn sfixed64_decimal<W: Writable + ?Sized>(
    w: &mut W,
    field: u32,
    text: &str,
    force: bool,
) -> Result<bool> {
    textual(
        w,
        field,
        text,
        force,
        WireType::Fixed64,
        join64::parse_signed_decimal,
        write_value::fixed64_halves,
    )
}

/// Write a field with explicit presence. Values which are present are
/// always written.
pub fn optional<W: ?Sized, T>(
    w: &mut W,
    field: u32,
    value: Option<T>,
    write: impl FnOnce(&mut W, u32, T, bool) -> bool,
) -> bool {
    value.is_some_and(|value| write(w, field, value, true))
}

/// Write a scalar wrapped in a message, as used by the
/// `google.protobuf.*Value` types.
pub fn maybe<W: NestedWrite + ?Sized, T>(
    w: &mut W,
    field: u32,
    value: Option<T>,
    write: impl FnOnce(&mut W, u32, T, bool) -> bool,
) -> Result<bool> {
    let Some(value) = value else {
        return Ok(false);
    };
    write_tag(w, field, WireType::Len);
    w.begin();
    write(w, 1, value, false);
    w.end()?;
    Ok(true)
}

/// Write a repeated scalar field using the packed encoding.
///
/// `write` is the untagged value writer for the element type, from
/// [`write_value`](crate::write_value). Nothing is written if `values` is
/// empty.
pub fn packed<W: NestedWrite + ?Sized, T: Copy>(
    w: &mut W,
    field: u32,
    values: &[T],
    write: impl Fn(&mut W, T),
) -> Result<bool> {
    if values.is_empty() {
        return Ok(false);
    }
    write_tag(w, field, WireType::Len);
    w.begin();
    for &value in values {
        write(w, value);
    }
    w.end()?;
    Ok(true)
}

/// Write a repeated field with one tagged occurrence per element.
///
/// Every element is written, including defaults.
pub fn repeated<W: ?Sized, T>(
    w: &mut W,
    field: u32,
    values: impl IntoIterator<Item = T>,
    mut write: impl FnMut(&mut W, u32, T, bool) -> bool,
) -> bool {
    let mut written = false;
    for value in values {
        written |= write(w, field, value, true);
    }
    written
}

/// Write a message field. Nothing is written if `value` is `None`.
pub fn message<W: NestedWrite + ?Sized, M: EncodeMessage + ?Sized>(
    w: &mut W,
    field: u32,
    value: Option<&M>,
) -> Result<bool> {
    let Some(value) = value else {
        return Ok(false);
    };
    write_tag(w, field, WireType::Len);
    w.begin();
    value.write_contents(w)?;
    w.end()?;
    Ok(true)
}

/// Write a map field, as one entry message per key-value pair.
///
/// `write_key` and `write_value` are called with field numbers 1 and 2.
/// Keys and values which are defaults are omitted from the entry.
pub fn map<W: NestedWrite + ?Sized, K, V>(
    w: &mut W,
    field: u32,
    entries: impl IntoIterator<Item = (K, V)>,
    mut write_key: impl FnMut(&mut W, u32, K, bool) -> bool,
    mut write_value: impl FnMut(&mut W, u32, V) -> Result<bool>,
) -> Result<bool> {
    let mut written = false;
    for (key, value) in entries {
        write_tag(w, field, WireType::Len);
        w.begin();
        write_key(w, 1, key, false);
        write_value(w, 2, value)?;
        w.end()?;
        written = true;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use protowire_testing::to_hex;

    use crate::enums::{EnumDescriptor, EnumValue};
    use crate::errors::{ErrorKind, ProtobufError};
    use crate::field_types::{FieldType, ScalarType};
    use crate::message::{
        DecodeMessage, EncodeMessage, FieldDescriptor, MessageDescriptor, MessageRef, MessageValue,
    };
    use crate::value::Value;
    use crate::write_field;
    use crate::write_value;
    use crate::writer::{NestedWrite, NestedWriter};

    static KIND: EnumDescriptor = EnumDescriptor::new("Kind", &[("UNKNOWN", 0), ("ADMIN", 1)]);

    static ADDRESS: MessageDescriptor = MessageDescriptor::new("Address", || {
        vec![FieldDescriptor::new(
            1,
            "city",
            FieldType::Scalar(ScalarType::String),
        )]
    });

    static PERSON: MessageDescriptor = MessageDescriptor::new("Person", || {
        vec![
            FieldDescriptor::new(1, "id", FieldType::Scalar(ScalarType::Int32)),
            FieldDescriptor::new(2, "name", FieldType::Scalar(ScalarType::String)),
            FieldDescriptor::new(
                3,
                "scores",
                FieldType::repeated(FieldType::Scalar(ScalarType::Int32)),
            ),
            FieldDescriptor::new(
                4,
                "emails",
                FieldType::repeated(FieldType::Scalar(ScalarType::String)),
            ),
            FieldDescriptor::new(5, "address", FieldType::Message(MessageRef::Static(&ADDRESS))),
            FieldDescriptor::new(6, "nickname", FieldType::Wrapper(ScalarType::String)),
            FieldDescriptor::new(7, "balance", FieldType::Scalar(ScalarType::Int64Decimal)),
            FieldDescriptor::new(
                8,
                "attrs",
                FieldType::map(ScalarType::String, FieldType::Scalar(ScalarType::Int32)),
            ),
            FieldDescriptor::new(9, "kind", FieldType::Enum(&KIND)),
            FieldDescriptor::new(10, "age", FieldType::Optional(ScalarType::Int32)),
        ]
    });

    #[derive(Clone, Debug, PartialEq)]
    struct Address {
        city: String,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Person {
        id: i32,
        name: String,
        scores: Vec<i32>,
        emails: Vec<String>,
        address: Option<Address>,
        nickname: Option<String>,
        balance: String,
        attrs: BTreeMap<String, i32>,
        kind: EnumValue,
        age: Option<i32>,
    }

    impl Default for Person {
        fn default() -> Self {
            Person {
                id: 0,
                name: String::new(),
                scores: Vec::new(),
                emails: Vec::new(),
                address: None,
                nickname: None,
                balance: "0".into(),
                attrs: BTreeMap::new(),
                kind: KIND.default_value(),
                age: None,
            }
        }
    }

    impl EncodeMessage for Address {
        fn write_contents<W: NestedWrite + ?Sized>(&self, w: &mut W) -> Result<(), ProtobufError> {
            write_field::string(w, 1, &self.city, false);
            Ok(())
        }
    }

    impl EncodeMessage for Person {
        fn write_contents<W: NestedWrite + ?Sized>(&self, w: &mut W) -> Result<(), ProtobufError> {
            write_field::int32(w, 1, self.id, false);
            write_field::string(w, 2, &self.name, false);
            write_field::packed(w, 3, &self.scores, write_value::int32)?;
            write_field::repeated(
                w,
                4,
                self.emails.iter().map(String::as_str),
                write_field::string,
            );
            write_field::message(w, 5, self.address.as_ref())?;
            write_field::maybe(w, 6, self.nickname.as_deref(), write_field::string)?;
            write_field::int64_decimal(w, 7, &self.balance, false)?;
            write_field::map(
                w,
                8,
                self.attrs.iter().map(|(k, v)| (k.as_str(), *v)),
                write_field::string,
                |w, field, v| Ok(write_field::int32(w, field, v, false)),
            )?;
            write_field::enumeration(w, 9, self.kind, false);
            write_field::optional(w, 10, self.age, write_field::int32);
            Ok(())
        }
    }

    fn into_string(value: Value) -> Result<String, ProtobufError> {
        match value {
            Value::String(s) => Ok(s),
            _ => Err(ErrorKind::ValueTypeMismatch.into()),
        }
    }

    impl DecodeMessage for Address {
        fn descriptor() -> MessageRef {
            MessageRef::Static(&ADDRESS)
        }

        fn from_value(mut msg: MessageValue) -> Result<Self, ProtobufError> {
            Ok(Address {
                city: into_string(msg.take("city").unwrap_or_default())?,
            })
        }
    }

    impl DecodeMessage for Person {
        fn descriptor() -> MessageRef {
            MessageRef::Static(&PERSON)
        }

        fn from_value(mut msg: MessageValue) -> Result<Self, ProtobufError> {
            let mut take = |name| msg.take(name).unwrap_or_default();

            let id = take("id").as_i32().unwrap_or_default();
            let name = into_string(take("name"))?;
            let scores = take("scores")
                .as_list()
                .unwrap_or_default()
                .iter()
                .filter_map(Value::as_i32)
                .collect();
            let emails = match take("emails") {
                Value::List(items) => items
                    .into_iter()
                    .map(into_string)
                    .collect::<Result<Vec<_>, _>>()?,
                _ => Vec::new(),
            };
            let address = match take("address") {
                Value::Message(msg) => Some(Address::from_value(*msg)?),
                _ => None,
            };
            let nickname = match take("nickname") {
                Value::Absent => None,
                value => Some(into_string(value)?),
            };
            let balance = into_string(take("balance"))?;
            let attrs = match take("attrs") {
                Value::Map(entries) => entries
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.as_i32().unwrap_or_default()))
                    .collect(),
                _ => BTreeMap::new(),
            };
            let kind = take("kind").as_enum().unwrap_or(KIND.default_value());
            let age = take("age").as_i32();

            Ok(Person {
                id,
                name,
                scores,
                emails,
                address,
                nickname,
                balance,
                attrs,
                kind,
                age,
            })
        }
    }

    fn full_person() -> Person {
        Person {
            id: 150,
            name: "hi".into(),
            scores: vec![3, 270, 86942],
            emails: vec!["a@b".into(), String::new()],
            address: Some(Address {
                city: "Paris".into(),
            }),
            nickname: Some(String::new()),
            balance: "-150000000000".into(),
            attrs: BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 0)]),
            kind: KIND.from_name("admin").unwrap(),
            age: Some(0),
        }
    }

    fn encode_with(write: impl FnOnce(&mut NestedWriter) -> bool) -> (bool, String) {
        let mut w = NestedWriter::new();
        let written = write(&mut w);
        (written, to_hex(&w.finish_to_vec().unwrap()))
    }

    #[test]
    fn test_scalar_writers() {
        assert_eq!(encode_with(|w| write_field::int32(w, 1, 150, false)), (true, "089601".into()));
        assert_eq!(encode_with(|w| write_field::int32(w, 1, 0, false)), (false, String::new()));
        assert_eq!(encode_with(|w| write_field::int32(w, 1, 0, true)), (true, "0800".into()));
        assert_eq!(encode_with(|w| write_field::bool(w, 2, true, false)), (true, "1001".into()));
        assert_eq!(
            encode_with(|w| write_field::sfixed64(w, 1, -10, false)),
            (true, "09f6ffffffffffffff".into())
        );
        assert_eq!(encode_with(|w| write_field::string(w, 1, "", false)), (false, String::new()));
        assert_eq!(encode_with(|w| write_field::bytes(w, 1, &[], true)), (true, "0a00".into()));
        assert_eq!(
            encode_with(|w| write_field::double(w, 1, -0., false)),
            (true, "090000000000000080".into())
        );
        assert_eq!(encode_with(|w| write_field::float(w, 1, 0., false)), (false, String::new()));
        assert_eq!(
            encode_with(|w| write_field::enumeration(w, 1, KIND.from_wire(7), false)),
            (true, "0807".into())
        );
    }

    #[test]
    fn test_textual_writers() {
        let mut w = NestedWriter::new();
        assert!(!write_field::uint64_decimal(&mut w, 1, "", true).unwrap());
        assert!(!write_field::uint64_decimal(&mut w, 1, "0", false).unwrap());
        assert!(write_field::uint64_decimal(&mut w, 1, "0", true).unwrap());
        assert!(write_field::fixed64_hex(&mut w, 2, "ff000002dfdc1c35", false).unwrap());
        assert!(write_field::sint64_decimal(&mut w, 3, "12345678901", false).unwrap());
        assert_eq!(
            to_hex(&w.finish_to_vec().unwrap()),
            "0800 11351cdcdf020000ff 18eaf0e0fd5b".replace(' ', "")
        );

        let err = write_field::int64_decimal(&mut w, 1, "9223372036854775808", false).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidNumber);
    }

    #[test]
    fn test_encode_hand_written_message() {
        assert_eq!(Person::default().encode().unwrap(), Vec::<u8>::new());

        let person = Person {
            id: 150,
            ..Person::default()
        };
        assert_eq!(to_hex(&person.encode().unwrap()), "089601");

        let person = Person {
            age: Some(0),
            nickname: Some("x".into()),
            ..Person::default()
        };
        assert_eq!(to_hex(&person.encode().unwrap()), "3203 0a0178 5000".replace(' ', ""));
    }

    #[test]
    fn test_hand_written_round_trip() {
        let person = full_person();
        let encoded = person.encode().unwrap();
        assert_eq!(Person::decode(&encoded).unwrap(), person);
    }

    #[test]
    fn test_matches_generic_encoder() {
        let encoded = full_person().encode().unwrap();
        let generic = PERSON.decode(&encoded).unwrap();
        assert_eq!(generic.encode().unwrap(), encoded);
        assert_eq!(generic.get("nickname").unwrap().as_str(), Some(""));
        assert_eq!(generic.get("age").unwrap().as_i32(), Some(0));
    }
}
