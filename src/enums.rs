//! Enum types.

use std::fmt;

use crate::errors::{ErrorKind, ProtobufError};

/// Describes the named values of an enum type.
#[derive(Debug)]
pub struct EnumDescriptor {
    name: &'static str,
    values: &'static [(&'static str, i32)],
}

impl EnumDescriptor {
    pub const fn new(name: &'static str, values: &'static [(&'static str, i32)]) -> Self {
        EnumDescriptor { name, values }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Return the number for a value name. Names are matched ignoring case.
    pub fn to_number(&self, name: &str) -> Option<i32> {
        self.values
            .iter()
            .find(|(value_name, _)| value_name.eq_ignore_ascii_case(name))
            .map(|(_, number)| *number)
    }

    pub fn to_name(&self, number: i32) -> Option<&'static str> {
        self.values
            .iter()
            .find(|(_, value_number)| *value_number == number)
            .map(|(name, _)| *name)
    }

    /// Create a value from its name.
    ///
    /// Fails with [`ErrorKind::InvalidEnumLiteral`] if the enum has no value
    /// with this name.
    pub fn from_name(&self, name: &str) -> Result<EnumValue, ProtobufError> {
        let number = self
            .to_number(name)
            .ok_or_else(|| ProtobufError::new(ErrorKind::InvalidEnumLiteral))?;
        Ok(self.from_wire(number))
    }

    /// Create a value from its number.
    ///
    /// Fails with [`ErrorKind::InvalidEnumLiteral`] if the enum has no value
    /// with this number.
    pub fn from_number(&self, number: i32) -> Result<EnumValue, ProtobufError> {
        let name = self
            .to_name(number)
            .ok_or_else(|| ProtobufError::new(ErrorKind::InvalidEnumLiteral))?;
        Ok(EnumValue {
            number,
            name: Some(name),
        })
    }

    /// Create a value from a number read from the wire.
    ///
    /// Numbers without a name are kept, so that messages produced with a
    /// newer version of the enum can be decoded.
    pub fn from_wire(&self, number: i32) -> EnumValue {
        EnumValue {
            number,
            name: self.to_name(number),
        }
    }

    /// Return the default value, which is always number zero.
    pub fn default_value(&self) -> EnumValue {
        self.from_wire(0)
    }

    /// Iterate over the named values in declaration order.
    pub fn values(&self) -> impl Iterator<Item = EnumValue> + '_ {
        self.values.iter().map(|&(name, number)| EnumValue {
            number,
            name: Some(name),
        })
    }
}

/// Value of an enum field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EnumValue {
    number: i32,
    name: Option<&'static str>,
}

impl EnumValue {
    pub fn number(&self) -> i32 {
        self.number
    }

    /// Return the name of this value, or `None` if the number is not one
    /// the enum declares.
    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    pub fn is_known(&self) -> bool {
        self.name.is_some()
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{}", self.number),
        }
    }
}
