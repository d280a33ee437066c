use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::wire::WireType;

/// Errors encoding or decoding Protocol Buffers messages.
#[derive(Clone, Debug, PartialEq)]
pub struct ProtobufError {
    kind: ErrorKind,
    context: Option<&'static str>,
    field: Option<u32>,
}

impl ProtobufError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
            field: None,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Return the message type associated with this error.
    pub fn context(&self) -> Option<&str> {
        self.context
    }

    /// Return the field number associated with this error.
    pub fn field(&self) -> Option<u32> {
        self.field
    }

    /// Associate a message type and field number with this error.
    ///
    /// Errors raised in nested messages keep the innermost context, so this
    /// has no effect if a context was already set.
    pub fn with_context(mut self, context: &'static str, field: u32) -> Self {
        if self.context.is_none() {
            self.context = Some(context);
            self.field = Some(field);
        }
        self
    }
}

impl Display for ProtobufError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.context {
            Some(context) => write!(
                f,
                "error in message {} field {}: {}",
                context,
                self.field.unwrap_or(0),
                self.kind
            ),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl Error for ProtobufError {}

impl From<ErrorKind> for ProtobufError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Enum describing the kind of a [`ProtobufError`] error.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A known field was encoded with a wire type that doesn't match its
    /// declared type.
    WireTypeMismatch {
        expected: WireType,
        actual: WireType,
    },

    /// A varint had no terminating byte within the first 10 bytes.
    MalformedVarint,

    /// A read went past the end of the input or of a length-delimited block.
    TruncatedInput,

    /// The input used the deprecated group wire types.
    UnsupportedWireType(WireType),

    /// A tag used one of the two wire type values which are not defined.
    InvalidWireType(u8),

    /// A tag had a field number of zero.
    InvalidFieldNumber,

    /// A string field contained invalid UTF-8.
    InvalidUtf8,

    /// Messages were nested more deeply than
    /// [`RECURSION_LIMIT`](crate::RECURSION_LIMIT).
    RecursionLimitExceeded,

    /// An enum value was constructed from a name or number which is not
    /// part of the enum.
    InvalidEnumLiteral,

    /// A textual 64-bit integer could not be parsed or is out of range.
    InvalidNumber,

    /// A value passed for encoding does not match the field's type.
    ValueTypeMismatch,

    /// A message has no field with the given name.
    UnknownFieldName(String),

    /// Calls to `begin` and `end` on a nested writer were unbalanced.
    WriterStateMisuse,

    /// The shared writer was used while a previous use was still active.
    WriterInUse,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::WireTypeMismatch { expected, actual } => write!(
                f,
                "wire type mismatch, expected {:?} but found {:?}",
                expected, actual
            ),
            ErrorKind::MalformedVarint => write!(f, "varint has no terminator"),
            ErrorKind::TruncatedInput => write!(f, "unexpected end of input"),
            ErrorKind::UnsupportedWireType(wt) => write!(f, "unsupported wire type {:?}", wt),
            ErrorKind::InvalidWireType(wt) => write!(f, "invalid wire type {}", wt),
            ErrorKind::InvalidFieldNumber => write!(f, "invalid field number 0"),
            ErrorKind::InvalidUtf8 => write!(f, "invalid UTF-8 in string"),
            ErrorKind::RecursionLimitExceeded => write!(f, "messages are nested too deeply"),
            ErrorKind::InvalidEnumLiteral => write!(f, "invalid enum literal"),
            ErrorKind::InvalidNumber => write!(f, "invalid 64-bit number"),
            ErrorKind::ValueTypeMismatch => write!(f, "value does not match field type"),
            ErrorKind::UnknownFieldName(name) => write!(f, "no field named {:?}", name),
            ErrorKind::WriterStateMisuse => write!(f, "mismatched begin/end"),
            ErrorKind::WriterInUse => write!(f, "shared writer is already in use"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, ProtobufError};

    #[test]
    fn test_error_display() {
        let err = ProtobufError::new(ErrorKind::TruncatedInput);
        assert_eq!(err.to_string(), "unexpected end of input");

        let err = err.with_context("Person", 3);
        assert_eq!(
            err.to_string(),
            "error in message Person field 3: unexpected end of input"
        );
    }

    #[test]
    fn test_with_context_keeps_innermost() {
        let err = ProtobufError::new(ErrorKind::InvalidUtf8)
            .with_context("Inner", 2)
            .with_context("Outer", 7);
        assert_eq!(err.context(), Some("Inner"));
        assert_eq!(err.field(), Some(2));
        assert_eq!(err.kind(), &ErrorKind::InvalidUtf8);
    }
}
