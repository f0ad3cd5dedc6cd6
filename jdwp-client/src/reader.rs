// Helpers for reading JDWP wire data out of reply buffers

use crate::protocol::{JdwpError, JdwpResult};
use crate::types::{tags, Location, Value, ValueData};
use bytes::Buf;

/// Read a JDWP string (4-byte length prefix + UTF-8 bytes).
pub fn read_string(buf: &mut &[u8]) -> JdwpResult<String> {
    if buf.remaining() < 4 {
        return Err(JdwpError::Protocol(
            "Not enough data for string length".to_string(),
        ));
    }

    let len = buf.get_u32() as usize;

    if buf.remaining() < len {
        return Err(JdwpError::Protocol(format!(
            "Not enough data for string: expected {}, got {}",
            len,
            buf.remaining()
        )));
    }

    let bytes = &buf[..len];
    buf.advance(len);

    String::from_utf8(bytes.to_vec())
        .map_err(|e| JdwpError::Protocol(format!("Invalid UTF-8 in string: {}", e)))
}

pub fn read_u8(buf: &mut &[u8]) -> JdwpResult<u8> {
    ensure(buf, 1, "u8")?;
    Ok(buf.get_u8())
}

pub fn read_u16(buf: &mut &[u8]) -> JdwpResult<u16> {
    ensure(buf, 2, "u16")?;
    Ok(buf.get_u16())
}

pub fn read_i32(buf: &mut &[u8]) -> JdwpResult<i32> {
    ensure(buf, 4, "i32")?;
    Ok(buf.get_i32())
}

pub fn read_u32(buf: &mut &[u8]) -> JdwpResult<u32> {
    ensure(buf, 4, "u32")?;
    Ok(buf.get_u32())
}

pub fn read_u64(buf: &mut &[u8]) -> JdwpResult<u64> {
    ensure(buf, 8, "u64")?;
    Ok(buf.get_u64())
}

fn ensure(buf: &&[u8], need: usize, what: &str) -> JdwpResult<()> {
    if buf.remaining() < need {
        return Err(JdwpError::Protocol(format!(
            "Not enough data for {}",
            what
        )));
    }
    Ok(())
}

/// Read a code location (type tag + class id + method id + index).
pub fn read_location(buf: &mut &[u8]) -> JdwpResult<Location> {
    let type_tag = read_u8(buf)?;
    let class_id = read_u64(buf)?;
    let method_id = read_u64(buf)?;
    let index = read_u64(buf)?;
    Ok(Location {
        type_tag,
        class_id,
        method_id,
        index,
    })
}

/// Read a tagged value: one tag byte followed by the tag-sized payload.
pub fn read_value(buf: &mut &[u8]) -> JdwpResult<Value> {
    let tag = read_u8(buf)?;
    let data = read_untagged(tag, buf)?;
    Ok(Value { tag, data })
}

/// Read a value payload whose tag is already known (array regions).
pub fn read_untagged(tag: u8, buf: &mut &[u8]) -> JdwpResult<ValueData> {
    match tag {
        tags::BYTE => {
            ensure(buf, 1, "byte value")?;
            Ok(ValueData::Byte(buf.get_i8()))
        }
        tags::CHAR => Ok(ValueData::Char(read_u16(buf)?)),
        tags::DOUBLE => {
            ensure(buf, 8, "double value")?;
            Ok(ValueData::Double(buf.get_f64()))
        }
        tags::FLOAT => {
            ensure(buf, 4, "float value")?;
            Ok(ValueData::Float(buf.get_f32()))
        }
        tags::INT => Ok(ValueData::Int(read_i32(buf)?)),
        tags::LONG => {
            ensure(buf, 8, "long value")?;
            Ok(ValueData::Long(buf.get_i64()))
        }
        tags::SHORT => {
            ensure(buf, 2, "short value")?;
            Ok(ValueData::Short(buf.get_i16()))
        }
        tags::BOOLEAN => Ok(ValueData::Boolean(read_u8(buf)? != 0)),
        tags::VOID => Ok(ValueData::Void),
        tags::OBJECT
        | tags::STRING
        | tags::THREAD
        | tags::THREAD_GROUP
        | tags::CLASS_LOADER
        | tags::CLASS_OBJECT
        | tags::ARRAY => Ok(ValueData::Object(read_u64(buf)?)),
        _ => Err(JdwpError::Protocol(format!("Unknown value tag: {}", tag))),
    }
}

/// Read a tagged object id (e.g. StackFrame.ThisObject, invoke exceptions).
pub fn read_tagged_object(buf: &mut &[u8]) -> JdwpResult<u64> {
    let _tag = read_u8(buf)?;
    read_u64(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_with_length_prefix() {
        let data = [0u8, 0, 0, 5, b'h', b'e', b'l', b'l', b'o', 0xFF];
        let mut buf = &data[..];
        assert_eq!(read_string(&mut buf).unwrap(), "hello");
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn string_truncated_is_an_error() {
        let data = [0u8, 0, 0, 9, b'h', b'i'];
        let mut buf = &data[..];
        assert!(read_string(&mut buf).is_err());
    }

    #[test]
    fn tagged_value_round_trip() {
        let mut encoded = Vec::new();
        Value::int(-7).write(&mut encoded);
        let mut buf = &encoded[..];
        let value = read_value(&mut buf).unwrap();
        assert_eq!(value, Value::int(-7));
    }

    #[test]
    fn object_value_tags_share_payload_shape() {
        for tag in [b'L', b's', b't', b'g', b'l', b'c', b'['] {
            let data = [tag, 0, 0, 0, 0, 0, 0, 0, 42];
            let mut buf = &data[..];
            let value = read_value(&mut buf).unwrap();
            assert_eq!(value.object_id(), Some(42));
        }
    }
}
