//! serde support for decoded values.
//!
//! Messages serialize as maps from field name to value. Oneof members which
//! are not populated serialize as their default value, and enums as their
//! name if known, or their number otherwise.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::message::MessageValue;
use crate::value::Value;

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Absent => serializer.serialize_none(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::I32(v) => serializer.serialize_i32(*v),
            Value::U32(v) => serializer.serialize_u32(*v),
            Value::I64(v) => serializer.serialize_i64(*v),
            Value::U64(v) => serializer.serialize_u64(*v),
            Value::F32(v) => serializer.serialize_f32(*v),
            Value::F64(v) => serializer.serialize_f64(*v),
            Value::String(v) => serializer.serialize_str(v),
            Value::Bytes(v) => serializer.serialize_bytes(v),
            Value::Enum(v) => match v.name() {
                Some(name) => serializer.serialize_str(name),
                None => serializer.serialize_i32(v.number()),
            },
            Value::Message(msg) => msg.serialize(serializer),
            Value::List(items) => serializer.collect_seq(items),
            // Keys are rendered as strings, since formats such as JSON don't
            // allow other key types.
            Value::Map(entries) => {
                serializer.collect_map(entries.iter().map(|(key, value)| (key.to_string(), value)))
            }
            Value::Oneof(oneof) => oneof.value.serialize(serializer),
        }
    }
}

impl Serialize for MessageValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.descriptor().fields().len()))?;
        for (field, value) in self.fields() {
            map.serialize_entry(field.name(), &*value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use crate::enums::EnumDescriptor;
    use crate::field_types::{FieldType, ScalarType};
    use crate::message::{FieldDescriptor, MessageDescriptor, MessageRef};
    use crate::value::{MapKey, Value};

    static COLOR: EnumDescriptor = EnumDescriptor::new("Color", &[("NONE", 0), ("RED", 1)]);

    static SHAPE: MessageDescriptor = MessageDescriptor::new("Shape", || {
        vec![
            FieldDescriptor::new(1, "x", FieldType::Scalar(ScalarType::Int32)),
            FieldDescriptor::new(2, "label", FieldType::Scalar(ScalarType::String)),
            FieldDescriptor::new(
                3,
                "tags",
                FieldType::repeated(FieldType::Scalar(ScalarType::String)),
            ),
            FieldDescriptor::new(4, "color", FieldType::Enum(&COLOR)),
            FieldDescriptor::new(5, "radius", FieldType::Scalar(ScalarType::Int32))
                .in_oneof("kind"),
            FieldDescriptor::new(6, "name", FieldType::Scalar(ScalarType::String))
                .in_oneof("kind"),
            FieldDescriptor::new(7, "id", FieldType::Scalar(ScalarType::Uint64Decimal)),
            FieldDescriptor::new(8, "child", FieldType::Message(MessageRef::Static(&SHAPE))),
        ]
    });

    #[test]
    fn test_serialize_message() {
        let mut child = SHAPE.new_value();
        child.set("color", COLOR.from_wire(1)).unwrap();

        let mut shape = SHAPE.new_value();
        shape
            .set("x", 3)
            .unwrap()
            .set("label", "p")
            .unwrap()
            .set("tags", vec![Value::from("t")])
            .unwrap()
            .set("color", COLOR.from_wire(5))
            .unwrap()
            .set("name", "circle")
            .unwrap()
            .set("id", "18446744073709551615")
            .unwrap()
            .set("child", child)
            .unwrap();

        let json = serde_json::to_value(&shape).unwrap();
        assert_eq!(
            json,
            json!({
                "x": 3,
                "label": "p",
                "tags": ["t"],
                "color": 5,
                "radius": 0,
                "name": "circle",
                "id": "18446744073709551615",
                "child": {
                    "x": 0,
                    "label": "",
                    "tags": [],
                    "color": "RED",
                    "radius": 0,
                    "name": "",
                    "id": "0",
                    "child": null,
                },
            })
        );
    }

    #[test]
    fn test_serialize_values() {
        assert_eq!(serde_json::to_value(Value::Bytes(vec![1, 2])).unwrap(), json!([1, 2]));
        assert_eq!(serde_json::to_value(Value::Absent).unwrap(), json!(null));

        let map = Value::Map(BTreeMap::from([(MapKey::I32(1), Value::from("x"))]));
        assert_eq!(serde_json::to_value(map).unwrap(), json!({"1": "x"}));
    }
}
