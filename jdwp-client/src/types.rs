// Common JDWP data types
//
// All remote identities are assumed to be 8 bytes, which holds for HotSpot;
// IDSizes is available for callers that want to check.

use bytes::BufMut;
use serde::{Deserialize, Serialize};

pub type ObjectId = u64;
pub type ThreadId = ObjectId;
pub type StringId = ObjectId;
pub type ClassLoaderId = ObjectId;
pub type ClassObjectId = ObjectId;
pub type ArrayId = ObjectId;

pub type ReferenceTypeId = u64;
pub type ClassId = ReferenceTypeId;

pub type MethodId = u64;
pub type FieldId = u64;
pub type FrameId = u64;

/// The null object reference.
pub const NULL_OBJECT: ObjectId = 0;

// Code position inside a method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub type_tag: u8, // 1=class, 2=interface, 3=array
    pub class_id: ReferenceTypeId,
    pub method_id: MethodId,
    pub index: u64, // bytecode index
}

// Thread status codes (ThreadReference.Status reply)
pub mod thread_status {
    pub const ZOMBIE: i32 = 0;
    pub const RUNNING: i32 = 1;
    pub const SLEEPING: i32 = 2;
    pub const MONITOR: i32 = 3;
    pub const WAIT: i32 = 4;
}

pub const SUSPEND_STATUS_SUSPENDED: i32 = 1;

// Value type tags
pub mod tags {
    pub const ARRAY: u8 = b'[';
    pub const BYTE: u8 = b'B';
    pub const CHAR: u8 = b'C';
    pub const OBJECT: u8 = b'L';
    pub const FLOAT: u8 = b'F';
    pub const DOUBLE: u8 = b'D';
    pub const INT: u8 = b'I';
    pub const LONG: u8 = b'J';
    pub const SHORT: u8 = b'S';
    pub const VOID: u8 = b'V';
    pub const BOOLEAN: u8 = b'Z';
    pub const STRING: u8 = b's';
    pub const THREAD: u8 = b't';
    pub const THREAD_GROUP: u8 = b'g';
    pub const CLASS_LOADER: u8 = b'l';
    pub const CLASS_OBJECT: u8 = b'c';
}

/// A tagged JDWP value: the wire tag plus the decoded payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub tag: u8,
    pub data: ValueData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueData {
    Byte(i8),
    Char(u16),
    Float(f32),
    Double(f64),
    Int(i32),
    Long(i64),
    Short(i16),
    Boolean(bool),
    Object(ObjectId),
    Void,
}

impl Value {
    pub fn int(v: i32) -> Self {
        Value {
            tag: tags::INT,
            data: ValueData::Int(v),
        }
    }

    pub fn boolean(v: bool) -> Self {
        Value {
            tag: tags::BOOLEAN,
            data: ValueData::Boolean(v),
        }
    }

    pub fn string(id: StringId) -> Self {
        Value {
            tag: tags::STRING,
            data: ValueData::Object(id),
        }
    }

    pub fn object(tag: u8, id: ObjectId) -> Self {
        Value {
            tag,
            data: ValueData::Object(id),
        }
    }

    /// The object identity behind this value, if it is a reference type.
    pub fn object_id(&self) -> Option<ObjectId> {
        match self.data {
            ValueData::Object(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.data, ValueData::Object(NULL_OBJECT))
    }

    /// Encode as a tagged value (method invocation arguments).
    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.put_u8(self.tag);
        match self.data {
            ValueData::Byte(v) => buf.put_i8(v),
            ValueData::Char(v) => buf.put_u16(v),
            ValueData::Float(v) => buf.put_f32(v),
            ValueData::Double(v) => buf.put_f64(v),
            ValueData::Int(v) => buf.put_i32(v),
            ValueData::Long(v) => buf.put_i64(v),
            ValueData::Short(v) => buf.put_i16(v),
            ValueData::Boolean(v) => buf.put_u8(v as u8),
            ValueData::Object(id) => buf.put_u64(id),
            ValueData::Void => {}
        }
    }
}

// Local variable slot descriptor (Method.VariableTable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub code_index: u64,
    pub name: String,
    pub signature: String,
    pub length: u32,
    pub slot: u32,
}

impl Variable {
    /// Whether the slot is visible at the given execution point.
    pub fn visible_at(&self, code_index: u64) -> bool {
        code_index >= self.code_index && code_index < self.code_index + self.length as u64
    }

    /// Method arguments scope from bytecode index zero.
    pub fn is_argument(&self) -> bool {
        self.code_index == 0
    }
}

// Stack frame (ThreadReference.Frames)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Frame {
    pub frame_id: FrameId,
    pub location: Location,
}

/// Convert a JNI type signature to a source-level type name.
///
/// `Ljava/util/List;` becomes `java.util.List`, `[I` becomes `int[]`,
/// primitives map to their keywords. Malformed signatures are returned as-is.
pub fn signature_to_name(signature: &str) -> String {
    let mut dims = 0;
    let mut rest = signature;
    while let Some(stripped) = rest.strip_prefix('[') {
        dims += 1;
        rest = stripped;
    }

    let base = match rest.as_bytes().first() {
        Some(b'L') => rest
            .strip_prefix('L')
            .and_then(|s| s.strip_suffix(';'))
            .map(|s| s.replace('/', "."))
            .unwrap_or_else(|| rest.to_string()),
        Some(b'B') => "byte".to_string(),
        Some(b'C') => "char".to_string(),
        Some(b'D') => "double".to_string(),
        Some(b'F') => "float".to_string(),
        Some(b'I') => "int".to_string(),
        Some(b'J') => "long".to_string(),
        Some(b'S') => "short".to_string(),
        Some(b'Z') => "boolean".to_string(),
        Some(b'V') => "void".to_string(),
        _ => rest.to_string(),
    };

    let mut name = base;
    for _ in 0..dims {
        name.push_str("[]");
    }
    name
}

/// Convert a binary class name to the JNI signature used by
/// `VirtualMachine.ClassesBySignature`.
pub fn name_to_signature(name: &str) -> String {
    if name.starts_with('[') || (name.starts_with('L') && name.ends_with(';')) {
        return name.to_string();
    }
    format!("L{};", name.replace('.', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_to_name_classes_and_arrays() {
        assert_eq!(signature_to_name("Ljava/lang/String;"), "java.lang.String");
        assert_eq!(signature_to_name("I"), "int");
        assert_eq!(signature_to_name("[I"), "int[]");
        assert_eq!(
            signature_to_name("[[Ljava/util/Map;"),
            "java.util.Map[][]"
        );
        assert_eq!(signature_to_name("Z"), "boolean");
    }

    #[test]
    fn name_to_signature_round_trip() {
        assert_eq!(name_to_signature("java.lang.System"), "Ljava/lang/System;");
        assert_eq!(name_to_signature("Ljava/lang/System;"), "Ljava/lang/System;");
        assert_eq!(name_to_signature("[B"), "[B");
        assert_eq!(
            signature_to_name(&name_to_signature("demo.Svc")),
            "demo.Svc"
        );
    }

    #[test]
    fn tagged_value_encoding() {
        let mut buf = Vec::new();
        Value::int(258).write(&mut buf);
        assert_eq!(buf, vec![b'I', 0, 0, 1, 2]);

        let mut buf = Vec::new();
        Value::boolean(true).write(&mut buf);
        assert_eq!(buf, vec![b'Z', 1]);

        let mut buf = Vec::new();
        Value::object(tags::OBJECT, 0x0102).write(&mut buf);
        assert_eq!(buf, vec![b'L', 0, 0, 0, 0, 0, 0, 1, 2]);
    }

    #[test]
    fn null_reference_detection() {
        assert!(Value::object(tags::OBJECT, NULL_OBJECT).is_null());
        assert!(!Value::object(tags::OBJECT, 7).is_null());
        assert!(!Value::int(0).is_null());
    }

    #[test]
    fn variable_visibility_window() {
        let var = Variable {
            code_index: 10,
            name: "x".into(),
            signature: "I".into(),
            length: 5,
            slot: 1,
        };
        assert!(!var.visible_at(9));
        assert!(var.visible_at(10));
        assert!(var.visible_at(14));
        assert!(!var.visible_at(15));
        assert!(!var.is_argument());
    }
}
