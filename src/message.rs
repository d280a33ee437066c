//! Message descriptors and decoded message values.
//!
//! A [`MessageDescriptor`] lists the fields of a message type. Decoding a
//! message produces a [`MessageValue`], which stores field values in a slot
//! table. Each field has its own slot, except that all members of a oneof
//! group share one slot, holding a [`OneofValue`] once a member has been
//! populated.
//!
//! Fields which are not in the descriptor are kept as [`UnknownField`]s and
//! written back out when the message is re-encoded.

use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashMap;

use crate::errors::{ErrorKind, ProtobufError};
use crate::field_types::FieldType;
use crate::read_value;
use crate::reader::Reader;
use crate::value::{OneofValue, Value};
use crate::wire::{WireType, read_tag, write_tag};
use crate::writer::{NestedWrite, NestedWriter, with_shared_writer};

type Result<T> = std::result::Result<T, ProtobufError>;

/// Maximum depth to which messages can be nested when decoding.
pub const RECURSION_LIMIT: u32 = 100;

/// Describes one field of a message type.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    number: u32,
    name: &'static str,
    ty: FieldType,
    oneof: Option<&'static str>,
}

impl FieldDescriptor {
    pub fn new(number: u32, name: &'static str, ty: FieldType) -> Self {
        FieldDescriptor {
            number,
            name,
            ty,
            oneof: None,
        }
    }

    /// Make this field a member of the oneof group `group`.
    pub fn in_oneof(mut self, group: &'static str) -> Self {
        self.oneof = Some(group);
        self
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    /// Return the name of the oneof group this field belongs to.
    pub fn oneof(&self) -> Option<&'static str> {
        self.oneof
    }
}

/// Lookup tables built from a message's field list.
struct Layout {
    fields: Vec<FieldDescriptor>,
    /// Slot of each field in `fields`.
    slots: Vec<usize>,
    by_number: FxHashMap<u32, usize>,
    by_name: FxHashMap<&'static str, usize>,
    /// Slot shared by the members of each oneof group.
    oneofs: FxHashMap<&'static str, usize>,
    /// Slot values of a message with no fields set.
    template: Vec<Value>,
}

impl Layout {
    fn new(fields: Vec<FieldDescriptor>) -> Layout {
        let mut slots = Vec::with_capacity(fields.len());
        let mut by_number = FxHashMap::default();
        let mut by_name = FxHashMap::default();
        let mut oneofs = FxHashMap::default();
        let mut template = Vec::with_capacity(fields.len());

        for (index, field) in fields.iter().enumerate() {
            let slot = match field.oneof {
                Some(group) => *oneofs.entry(group).or_insert_with(|| {
                    template.push(Value::Absent);
                    template.len() - 1
                }),
                None => {
                    template.push(field.ty.default_value());
                    template.len() - 1
                }
            };
            slots.push(slot);
            by_number.insert(field.number, index);
            by_name.insert(field.name, index);
        }

        Layout {
            fields,
            slots,
            by_number,
            by_name,
            oneofs,
            template,
        }
    }
}

/// Describes the fields of a message type.
///
/// Descriptors for message types known at compile time are usually declared
/// as statics with [`MessageDescriptor::new`]. The field list is supplied by
/// a function which is called on first use, so message types can refer to
/// themselves or to each other:
///
/// ```
/// use protowire::{FieldDescriptor, FieldType, MessageDescriptor, MessageRef, ScalarType};
///
/// static NODE: MessageDescriptor = MessageDescriptor::new("Node", || {
///     vec![
///         FieldDescriptor::new(1, "value", FieldType::Scalar(ScalarType::Int32)),
///         FieldDescriptor::new(2, "next", FieldType::Message(MessageRef::Static(&NODE))),
///     ]
/// });
///
/// let node = NODE.decode(&[0x08, 0x01, 0x12, 0x02, 0x08, 0x02]).unwrap();
/// let next = node.get("next").unwrap();
/// assert_eq!(next.as_message().unwrap().get("value").unwrap().as_i32(), Some(2));
/// ```
pub struct MessageDescriptor {
    name: &'static str,
    field_list: Option<fn() -> Vec<FieldDescriptor>>,
    layout: OnceLock<Layout>,
}

impl MessageDescriptor {
    pub const fn new(name: &'static str, fields: fn() -> Vec<FieldDescriptor>) -> Self {
        MessageDescriptor {
            name,
            field_list: Some(fields),
            layout: OnceLock::new(),
        }
    }

    /// Create a descriptor from a field list built at runtime.
    pub fn from_fields(name: &'static str, fields: Vec<FieldDescriptor>) -> Self {
        MessageDescriptor {
            name,
            field_list: None,
            layout: OnceLock::from(Layout::new(fields)),
        }
    }

    fn layout(&self) -> &Layout {
        self.layout.get_or_init(|| {
            let fields = self.field_list.map(|fields| fields()).unwrap_or_default();
            Layout::new(fields)
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Return the fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.layout().fields
    }

    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        let layout = self.layout();
        layout.by_number.get(&number).map(|&i| &layout.fields[i])
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        let layout = self.layout();
        layout.by_name.get(name).map(|&i| &layout.fields[i])
    }

    /// Create a message of this type with no fields set.
    pub fn new_value(&'static self) -> MessageValue {
        MessageRef::Static(self).new_value()
    }

    /// Decode a message of this type.
    pub fn decode(&'static self, bytes: &[u8]) -> Result<MessageValue> {
        MessageRef::Static(self).decode(bytes)
    }

    /// Write the fields of `msg`, without a length prefix.
    ///
    /// Fields are written in declaration order, followed by unknown fields.
    pub fn write_contents<W: NestedWrite + ?Sized>(
        &self,
        w: &mut W,
        msg: &MessageValue,
    ) -> Result<()> {
        if !std::ptr::eq(self, &*msg.descriptor) {
            return Err(ErrorKind::ValueTypeMismatch.into());
        }

        let layout = self.layout();
        for (field, &slot) in layout.fields.iter().zip(&layout.slots) {
            let written = match (field.oneof, &msg.slots[slot]) {
                (Some(_), Value::Oneof(oneof)) if oneof.populated == field.number => {
                    field.ty.write(w, &oneof.value, field.number, true)
                }
                (Some(_), _) => Ok(false),
                (None, value) => field.ty.write(w, value, field.number, false),
            };
            written.map_err(|err| err.with_context(self.name, field.number))?;
        }

        for unknown in &msg.unknown {
            write_tag(w, unknown.number, unknown.wire_type);
            w.write_block(&unknown.data);
        }
        Ok(())
    }
}

impl fmt::Debug for MessageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Reference to a [`MessageDescriptor`].
///
/// References compare equal if they point to the same descriptor.
#[derive(Clone)]
pub enum MessageRef {
    Static(&'static MessageDescriptor),
    Shared(Arc<MessageDescriptor>),
}

impl MessageRef {
    /// Create a message of this type with no fields set.
    pub fn new_value(&self) -> MessageValue {
        MessageValue {
            descriptor: self.clone(),
            slots: self.layout().template.clone(),
            unknown: Vec::new(),
        }
    }

    /// Decode a message of this type.
    pub fn decode(&self, bytes: &[u8]) -> Result<MessageValue> {
        self.read_contents(&mut Reader::new(bytes), None)
    }

    /// Read fields until the end of `r`, merging them into `prev` if given.
    ///
    /// Fails with [`ErrorKind::RecursionLimitExceeded`] if `r` is already
    /// nested [`RECURSION_LIMIT`] messages deep.
    pub fn read_contents(
        &self,
        r: &mut Reader,
        prev: Option<MessageValue>,
    ) -> Result<MessageValue> {
        let mut msg = match prev {
            Some(prev) if prev.descriptor == *self => prev,
            _ => self.new_value(),
        };
        msg.read_nested(r)?;
        Ok(msg)
    }
}

impl Deref for MessageRef {
    type Target = MessageDescriptor;

    fn deref(&self) -> &MessageDescriptor {
        match self {
            MessageRef::Static(desc) => desc,
            MessageRef::Shared(desc) => desc,
        }
    }
}

impl PartialEq for MessageRef {
    fn eq(&self, other: &MessageRef) -> bool {
        std::ptr::eq::<MessageDescriptor>(&**self, &**other)
    }
}

impl fmt::Debug for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageRef({})", self.name)
    }
}

impl From<&'static MessageDescriptor> for MessageRef {
    fn from(desc: &'static MessageDescriptor) -> Self {
        MessageRef::Static(desc)
    }
}

impl From<Arc<MessageDescriptor>> for MessageRef {
    fn from(desc: Arc<MessageDescriptor>) -> Self {
        MessageRef::Shared(desc)
    }
}

impl From<MessageDescriptor> for MessageRef {
    fn from(desc: MessageDescriptor) -> Self {
        MessageRef::Shared(Arc::new(desc))
    }
}

/// A field which was not in the message's descriptor when it was decoded.
#[derive(Clone, Debug, PartialEq)]
pub struct UnknownField {
    pub number: u32,
    pub wire_type: WireType,
    /// Encoded value, including the length prefix for length-delimited
    /// fields.
    pub data: Vec<u8>,
}

/// Decoded message, or one being built for encoding.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageValue {
    descriptor: MessageRef,
    slots: Vec<Value>,
    unknown: Vec<UnknownField>,
}

impl MessageValue {
    pub fn descriptor(&self) -> &MessageRef {
        &self.descriptor
    }

    /// Return the value of the field called `name`, or `None` if there is
    /// no such field.
    ///
    /// Members of a oneof group which are not populated return their
    /// default value.
    pub fn get(&self, name: &str) -> Option<Cow<'_, Value>> {
        let index = *self.descriptor.layout().by_name.get(name)?;
        Some(self.field_value(index))
    }

    pub fn get_by_number(&self, number: u32) -> Option<Cow<'_, Value>> {
        let index = *self.descriptor.layout().by_number.get(&number)?;
        Some(self.field_value(index))
    }

    fn field_value(&self, index: usize) -> Cow<'_, Value> {
        let layout = self.descriptor.layout();
        let field = &layout.fields[index];
        let slot = &self.slots[layout.slots[index]];
        match (field.oneof, slot) {
            (Some(_), Value::Oneof(oneof)) if oneof.populated == field.number => {
                Cow::Borrowed(&oneof.value)
            }
            (Some(_), _) => Cow::Owned(field.ty.default_value()),
            (None, value) => Cow::Borrowed(value),
        }
    }

    /// Return the name of the populated member of a oneof group.
    pub fn which_oneof(&self, group: &str) -> Option<&'static str> {
        let layout = self.descriptor.layout();
        let slot = *layout.oneofs.get(group)?;
        match &self.slots[slot] {
            Value::Oneof(oneof) => layout
                .by_number
                .get(&oneof.populated)
                .map(|&i| layout.fields[i].name),
            _ => None,
        }
    }

    /// Set the value of the field called `name`.
    ///
    /// Setting a member of a oneof group makes it the populated member.
    /// Setting it to [`Value::Absent`] clears the group if this member was
    /// populated.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        let layout = self.descriptor.layout();
        let index = *layout
            .by_name
            .get(name)
            .ok_or_else(|| ProtobufError::new(ErrorKind::UnknownFieldName(name.to_string())))?;
        let field = &layout.fields[index];
        let slot = &mut self.slots[layout.slots[index]];
        let value = value.into();

        match field.oneof {
            Some(_) if value.is_absent() => {
                if matches!(slot, Value::Oneof(oneof) if oneof.populated == field.number) {
                    *slot = Value::Absent;
                }
            }
            Some(_) => {
                *slot = Value::Oneof(Box::new(OneofValue {
                    populated: field.number,
                    value,
                }));
            }
            None => *slot = value,
        }
        Ok(self)
    }

    /// Remove and return the value of the field called `name`, leaving the
    /// field's default in its place.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        let layout = self.descriptor.layout();
        let index = *layout.by_name.get(name)?;
        let field = &layout.fields[index];
        let slot = &mut self.slots[layout.slots[index]];

        let populated = matches!(&*slot, Value::Oneof(oneof) if oneof.populated == field.number);
        let value = match field.oneof {
            Some(_) if populated => match std::mem::take(slot) {
                Value::Oneof(oneof) => oneof.value,
                _ => Value::Absent,
            },
            Some(_) => field.ty.default_value(),
            None => std::mem::replace(slot, field.ty.default_value()),
        };
        Some(value)
    }

    /// Iterate over fields and their values in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDescriptor, Cow<'_, Value>)> {
        let layout = self.descriptor.layout();
        layout
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| (field, self.field_value(index)))
    }

    pub fn unknown_fields(&self) -> &[UnknownField] {
        &self.unknown
    }

    /// Decode `bytes` and merge the fields into this message.
    ///
    /// Scalar fields are replaced, message fields are merged, and repeated
    /// and map fields are extended. If an error occurs the fields read
    /// before it are kept, and the field being read keeps its previous
    /// value, except that a nested message may have been partially merged.
    pub fn merge(&mut self, bytes: &[u8]) -> Result<()> {
        self.read_nested(&mut Reader::new(bytes))
    }

    /// Encode this message.
    pub fn encode(&self) -> Result<Vec<u8>> {
        EncodeMessage::encode(self)
    }

    pub(crate) fn into_slots(self) -> Vec<Value> {
        self.slots
    }

    /// Read the fields of a message nested inside the data of `r`.
    pub(crate) fn read_nested(&mut self, r: &mut Reader) -> Result<()> {
        let depth = r.depth();
        if depth >= RECURSION_LIMIT {
            return Err(ErrorKind::RecursionLimitExceeded.into());
        }
        r.set_depth(depth + 1);
        let result = self.read_fields(r);
        r.set_depth(depth);
        result
    }

    fn read_fields(&mut self, r: &mut Reader) -> Result<()> {
        let descriptor = self.descriptor.clone();
        let layout = descriptor.layout();

        while let Some(tag) = read_tag(r)? {
            let Some(&index) = layout.by_number.get(&tag.field) else {
                let data = read_value::skip(r, tag.wire_type)?;
                tracing::trace!(
                    msg_type = descriptor.name,
                    field = tag.field,
                    wire_type = ?tag.wire_type,
                    len = data.len(),
                    "keeping unknown field"
                );
                self.unknown.push(UnknownField {
                    number: tag.field,
                    wire_type: tag.wire_type,
                    data: data.to_vec(),
                });
                continue;
            };

            let field = &layout.fields[index];
            let slot = &mut self.slots[layout.slots[index]];

            let result = match field.oneof {
                Some(_) => match slot {
                    Value::Oneof(oneof) if oneof.populated == field.number => {
                        field.ty.read(r, tag.wire_type, &mut oneof.value)
                    }
                    // A different member replaces the current one rather
                    // than merging with it.
                    _ => {
                        let mut value = field.ty.default_value();
                        field.ty.read(r, tag.wire_type, &mut value).map(|()| {
                            *slot = Value::Oneof(Box::new(OneofValue {
                                populated: field.number,
                                value,
                            }));
                        })
                    }
                },
                None => field.ty.read(r, tag.wire_type, slot),
            };
            result.map_err(|err| err.with_context(descriptor.name, tag.field))?;
        }
        Ok(())
    }
}

/// Defines how to encode a type as a message.
///
/// Implementations write their fields using the functions in
/// [`write_field`](crate::write_field).
///
/// ```
/// use protowire::{EncodeMessage, NestedWrite, ProtobufError, write_field};
///
/// struct Point {
///     x: i32,
///     y: i32,
///     label: String,
/// }
///
/// impl EncodeMessage for Point {
///     fn write_contents<W: NestedWrite + ?Sized>(&self, w: &mut W) -> Result<(), ProtobufError> {
///         write_field::int32(w, 1, self.x, false);
///         write_field::int32(w, 2, self.y, false);
///         write_field::string(w, 3, &self.label, false);
///         Ok(())
///     }
/// }
///
/// let point = Point { x: 150, y: 0, label: "hi".into() };
/// assert_eq!(point.encode().unwrap(), [0x08, 0x96, 0x01, 0x1a, 0x02, 0x68, 0x69]);
/// ```
pub trait EncodeMessage {
    /// Write the message's fields, without a length prefix.
    fn write_contents<W: NestedWrite + ?Sized>(&self, w: &mut W) -> Result<()>;

    /// Encode the message.
    ///
    /// This uses the current thread's shared writer, so it fails with
    /// [`ErrorKind::WriterInUse`] if called from within another message's
    /// `write_contents`. Nested messages should be written with
    /// [`write_field::message`](crate::write_field::message) instead.
    fn encode(&self) -> Result<Vec<u8>> {
        with_shared_writer(|w| self.write_contents(w))
    }

    /// Encode the message using a writer owned by the caller.
    ///
    /// `w` must be empty, otherwise this fails with
    /// [`ErrorKind::WriterInUse`]. It is left empty afterwards, including
    /// when an error occurs.
    fn encode_with(&self, w: &mut NestedWriter) -> Result<Vec<u8>> {
        if !w.is_empty() {
            return Err(ErrorKind::WriterInUse.into());
        }
        let result = self.write_contents(w).and_then(|()| w.finish_to_vec());
        if result.is_err() {
            w.clear();
        }
        result
    }
}

impl EncodeMessage for MessageValue {
    fn write_contents<W: NestedWrite + ?Sized>(&self, w: &mut W) -> Result<()> {
        self.descriptor.write_contents(w, self)
    }
}

/// Defines how to decode a type from a message.
///
/// Implementations provide the descriptor used to decode the message and a
/// conversion from the decoded [`MessageValue`].
pub trait DecodeMessage: Sized {
    fn descriptor() -> MessageRef;

    fn from_value(value: MessageValue) -> Result<Self>;

    fn decode(bytes: &[u8]) -> Result<Self> {
        Self::from_value(Self::descriptor().decode(bytes)?)
    }
}
