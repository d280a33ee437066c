//! Encoder and decoder for the [Protocol Buffers][protobuf] wire format.
//!
//! Messages are described at runtime by a [`MessageDescriptor`], which lists
//! each field's number, name and [`FieldType`]. Decoding produces a
//! [`MessageValue`], which stores field values in a slot table and can be
//! encoded back to bytes. Fields which the descriptor does not know about are
//! kept and written back out unchanged.
//!
//! # Usage
//!
//! ```
//! use protowire::{FieldDescriptor, FieldType, MessageDescriptor, ScalarType, Value};
//!
//! static PERSON: MessageDescriptor = MessageDescriptor::new("Person", || {
//!     vec![
//!         FieldDescriptor::new(1, "id", FieldType::Scalar(ScalarType::Int32)),
//!         FieldDescriptor::new(2, "name", FieldType::Scalar(ScalarType::String)),
//!         FieldDescriptor::new(
//!             3,
//!             "scores",
//!             FieldType::repeated(FieldType::Scalar(ScalarType::Int32)),
//!         ),
//!     ]
//! });
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let message: &[u8] = &[
//!         0x08, 0x96, 0x01, // id = 150
//!         0x12, 0x02, 0x68, 0x69, // name = "hi"
//!     ];
//!     let mut person = PERSON.decode(message)?;
//!     assert_eq!(person.get("id").unwrap().as_i32(), Some(150));
//!     assert_eq!(person.get("name").unwrap().as_str(), Some("hi"));
//!
//!     person.set("scores", vec![Value::I32(1), Value::I32(2)])?;
//!     let encoded = person.encode()?;
//!     assert_eq!(&encoded[..7], message);
//!     assert_eq!(&encoded[7..], [0x1a, 0x02, 0x01, 0x02]);
//!
//!     Ok(())
//! }
//! ```
//!
//! Types with a fixed schema can instead implement [`EncodeMessage`] and
//! [`DecodeMessage`], writing their fields with the functions in
//! [`write_field`].
//!
//! # Encoding
//!
//! Encoding is done in a single pass by a [`NestedWriter`], which fills in
//! the length prefixes of nested messages after their contents have been
//! written. [`EncodeMessage::encode`] reuses a writer per thread to avoid
//! allocating scratch space for each message. See [`with_shared_writer`].
//!
//! # 64-bit integers
//!
//! 64-bit integer fields can be represented natively (eg.
//! [`ScalarType::Int64`]) or as decimal or hex text (eg.
//! [`ScalarType::Int64Decimal`]). The textual forms are converted using the
//! functions in [`join64`], which operate on the low and high 32-bit halves
//! of the value.
//!
//! # Features
//!
//! - `serde`: Implement `Serialize` for [`Value`] and [`MessageValue`].
//!
//! [protobuf]: https://protobuf.dev/programming-guides/encoding/

#![forbid(unsafe_code)]

mod enums;
mod errors;
mod field_types;
mod ieee754;
mod message;
mod reader;
mod value;
mod wire;
mod writer;

#[cfg(feature = "serde")]
mod serde_impl;

pub mod join64;
pub mod read_value;
pub mod varint;
pub mod write_field;
pub mod write_value;

pub use enums::{EnumDescriptor, EnumValue};
pub use errors::{ErrorKind, ProtobufError};
pub use field_types::{FieldType, MapType, ScalarType};
pub use message::{
    DecodeMessage, EncodeMessage, FieldDescriptor, MessageDescriptor, MessageRef, MessageValue,
    RECURSION_LIMIT, UnknownField,
};
pub use reader::Reader;
pub use value::{MapKey, OneofValue, Value};
pub use wire::{Tag, WireType, make_tag, read_tag, write_tag};
pub use writer::{
    DEFAULT_WRITER_CAPACITY, NestedWrite, NestedWriter, Segments, Writable, with_shared_writer,
};
