use std::collections::BTreeMap;
use std::fmt;

use crate::enums::EnumValue;
use crate::errors::{ErrorKind, ProtobufError};
use crate::message::MessageValue;

/// Value of a message field.
///
/// Scalar fields use the variant matching their Protocol Buffers type. 64-bit
/// fields with a textual representation (eg. decimal strings) use
/// [`Value::String`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Unset optional, wrapper or message field, or an unpopulated oneof.
    #[default]
    Absent,
    Bool(bool),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    Enum(EnumValue),
    Message(Box<MessageValue>),
    List(Vec<Value>),
    Map(BTreeMap<MapKey, Value>),
    Oneof(Box<OneofValue>),
}

/// Contents of a oneof group's shared slot.
#[derive(Clone, Debug, PartialEq)]
pub struct OneofValue {
    /// Field number of the populated member.
    pub populated: u32,
    pub value: Value,
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<EnumValue> {
        match self {
            Value::Enum(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&MessageValue> {
        match self {
            Value::Message(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<MapKey, Value>> {
        match self {
            Value::Map(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($type:ty, $variant:ident) => {
        impl From<$type> for Value {
            fn from(val: $type) -> Value {
                Value::$variant(val)
            }
        }
    };
}

impl_from!(bool, Bool);
impl_from!(i32, I32);
impl_from!(u32, U32);
impl_from!(i64, I64);
impl_from!(u64, U64);
impl_from!(f32, F32);
impl_from!(f64, F64);
impl_from!(String, String);
impl_from!(Vec<u8>, Bytes);
impl_from!(EnumValue, Enum);
impl_from!(Vec<Value>, List);
impl_from!(BTreeMap<MapKey, Value>, Map);

impl From<&str> for Value {
    fn from(val: &str) -> Value {
        Value::String(val.to_string())
    }
}

impl From<MessageValue> for Value {
    fn from(val: MessageValue) -> Value {
        Value::Message(Box::new(val))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(val: Option<T>) -> Value {
        val.map(Into::into).unwrap_or(Value::Absent)
    }
}

/// Key of a map field.
///
/// Map keys may be any integer or string type. Entries are ordered by key, so
/// that encoding a map is deterministic.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Bool(bool),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    String(String),
}

impl TryFrom<Value> for MapKey {
    type Error = ProtobufError;

    fn try_from(val: Value) -> Result<Self, Self::Error> {
        let key = match val {
            Value::Bool(v) => MapKey::Bool(v),
            Value::I32(v) => MapKey::I32(v),
            Value::U32(v) => MapKey::U32(v),
            Value::I64(v) => MapKey::I64(v),
            Value::U64(v) => MapKey::U64(v),
            Value::String(v) => MapKey::String(v),
            _ => return Err(ErrorKind::ValueTypeMismatch.into()),
        };
        Ok(key)
    }
}

impl From<MapKey> for Value {
    fn from(key: MapKey) -> Value {
        match key {
            MapKey::Bool(v) => Value::Bool(v),
            MapKey::I32(v) => Value::I32(v),
            MapKey::U32(v) => Value::U32(v),
            MapKey::I64(v) => Value::I64(v),
            MapKey::U64(v) => Value::U64(v),
            MapKey::String(v) => Value::String(v),
        }
    }
}

impl From<&str> for MapKey {
    fn from(val: &str) -> MapKey {
        MapKey::String(val.to_string())
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Bool(v) => write!(f, "{}", v),
            MapKey::I32(v) => write!(f, "{}", v),
            MapKey::U32(v) => write!(f, "{}", v),
            MapKey::I64(v) => write!(f, "{}", v),
            MapKey::U64(v) => write!(f, "{}", v),
            MapKey::String(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MapKey, Value};
    use crate::errors::ErrorKind;

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(5i32).as_i32(), Some(5));
        assert_eq!(Value::from("abc").as_str(), Some("abc"));
        assert_eq!(Value::from(None::<u64>), Value::Absent);
        assert_eq!(Value::from(Some(2.5f64)).as_f64(), Some(2.5));
        assert_eq!(Value::from(vec![1u8, 2]).as_bytes(), Some(&[1u8, 2][..]));
        assert!(Value::from(true).as_i32().is_none());
        assert!(Value::default().is_absent());
    }

    #[test]
    fn test_map_keys() {
        let key = MapKey::try_from(Value::U64(7)).unwrap();
        assert_eq!(key, MapKey::U64(7));
        assert_eq!(Value::from(key.clone()), Value::U64(7));
        assert_eq!(key.to_string(), "7");

        let err = MapKey::try_from(Value::F32(1.)).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ValueTypeMismatch);

        let mut keys = vec![MapKey::from("b"), MapKey::from("a")];
        keys.sort();
        assert_eq!(keys, [MapKey::from("a"), MapKey::from("b")]);
    }
}
