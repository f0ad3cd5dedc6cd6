// Inspector: thread, frame, variable and object graph read-out
//
// Rendering rules:
//   null      -> null
//   string    -> quoted literal
//   primitive -> decimal form
//   object    -> Object#<id> (<runtime type>)   [cached as a side effect]
//   array     -> Array#<id> (<elem type>[<len>]) [cached as a side effect]
//
// Recognized collection shapes get a semantic view (size + elements) before
// the raw internal fields.

use crate::error::{jdwp_op_error, DebugError, DebugResult};
use crate::session::{ObjectKind, SessionManager};
use jdwp_client::protocol::error_codes;
use jdwp_client::reftype::FieldInfo;
use jdwp_client::stackframe::VariableSlot;
use jdwp_client::types::{
    name_to_signature, signature_to_name, tags, ObjectId, ThreadId, Value, ValueData,
};
use jdwp_client::{JdwpConnection, JdwpError};
use std::fmt::Write as _;
use tracing::debug;

/// Array elements shown before the remainder is summarized.
pub const ARRAY_ELEMENT_CAP: usize = 100;
/// List elements / map entries shown in a collection view.
pub const COLLECTION_ELEMENT_CAP: usize = 50;

/// Render one value, caching non-primitive references for later inspection.
pub async fn format_value(
    conn: &mut JdwpConnection,
    session: &SessionManager,
    value: &Value,
) -> DebugResult<String> {
    match &value.data {
        ValueData::Object(0) => Ok("null".to_string()),
        ValueData::Object(id) => format_reference(conn, session, value.tag, *id).await,
        ValueData::Void => Ok("void".to_string()),
        primitive => Ok(format_primitive(primitive)),
    }
}

/// Primitive rendering is pure and infallible.
pub fn format_primitive(data: &ValueData) -> String {
    match data {
        ValueData::Byte(v) => v.to_string(),
        ValueData::Char(v) => char::from_u32(*v as u32).unwrap_or('?').to_string(),
        ValueData::Float(v) => v.to_string(),
        ValueData::Double(v) => v.to_string(),
        ValueData::Int(v) => v.to_string(),
        ValueData::Long(v) => v.to_string(),
        ValueData::Short(v) => v.to_string(),
        ValueData::Boolean(v) => v.to_string(),
        ValueData::Void => "void".to_string(),
        ValueData::Object(id) => format!("Object#{}", id),
    }
}

async fn format_reference(
    conn: &mut JdwpConnection,
    session: &SessionManager,
    tag: u8,
    id: ObjectId,
) -> DebugResult<String> {
    if tag == tags::STRING {
        let text = conn.get_string_value(id).await.map_err(DebugError::from)?;
        return Ok(format!("\"{}\"", text));
    }

    let type_id = conn
        .get_object_reference_type(id)
        .await
        .map_err(DebugError::from)?;
    let signature = conn.get_signature(type_id).await.map_err(DebugError::from)?;

    if tag == tags::ARRAY || signature.starts_with('[') {
        let length = conn.get_array_length(id).await.map_err(DebugError::from)?;
        let elem_type = signature_to_name(&signature[1..]);
        session.cache_object(id, ObjectKind::Array, signature_to_name(&signature));
        return Ok(format!("Array#{} ({}[{}])", id, elem_type, length));
    }

    let type_name = signature_to_name(&signature);
    session.cache_object(id, ObjectKind::Object, type_name.clone());
    Ok(format!("Object#{} ({})", id, type_name))
}

/// All threads with status, suspension flag, and frame count when suspended.
pub async fn list_threads(
    conn: &mut JdwpConnection,
    _session: &SessionManager,
) -> DebugResult<String> {
    let threads = conn.get_all_threads().await.map_err(DebugError::from)?;

    let mut out = format!("Found {} threads:\n\n", threads.len());
    for (i, thread_id) in threads.iter().enumerate() {
        let name = conn
            .get_thread_name(*thread_id)
            .await
            .unwrap_or_else(|_| "<unavailable>".to_string());
        let status = conn
            .get_thread_status(*thread_id)
            .await
            .map_err(DebugError::from)?;

        writeln!(out, "Thread {}:", i).unwrap();
        writeln!(out, "  ID: {}", thread_id).unwrap();
        writeln!(out, "  Name: {}", name).unwrap();
        writeln!(out, "  Status: {}", status.thread_status).unwrap();
        writeln!(out, "  Suspended: {}", status.is_suspended()).unwrap();

        if status.is_suspended() {
            if let Ok(count) = conn.get_frame_count(*thread_id).await {
                writeln!(out, "  Frames: {}", count).unwrap();
            }
        }
        out.push('\n');
    }

    Ok(out)
}

/// Fails unless the thread exists; returns its suspension state.
pub async fn require_thread(
    conn: &mut JdwpConnection,
    thread_id: ThreadId,
) -> DebugResult<bool> {
    let threads = conn.get_all_threads().await.map_err(DebugError::from)?;
    if !threads.contains(&thread_id) {
        return Err(DebugError::ThreadNotFound(thread_id));
    }
    let status = conn
        .get_thread_status(thread_id)
        .await
        .map_err(DebugError::from)?;
    Ok(status.is_suspended())
}

pub async fn require_suspended_thread(
    conn: &mut JdwpConnection,
    thread_id: ThreadId,
) -> DebugResult<()> {
    if !require_thread(conn, thread_id).await? {
        return Err(DebugError::ThreadNotSuspended(thread_id));
    }
    Ok(())
}

/// Ordered stack trace for a suspended thread.
pub async fn get_stack(conn: &mut JdwpConnection, thread_id: ThreadId) -> DebugResult<String> {
    require_suspended_thread(conn, thread_id).await?;

    let name = conn
        .get_thread_name(thread_id)
        .await
        .map_err(DebugError::from)?;
    let frames = conn
        .get_frames(thread_id, 0, -1)
        .await
        .map_err(jdwp_op_error)?;

    let mut out = format!(
        "Stack trace for thread {} ({}) - {} frames:\n\n",
        thread_id,
        name,
        frames.len()
    );

    for (i, frame) in frames.iter().enumerate() {
        let class_name = conn
            .get_type_name(frame.location.class_id)
            .await
            .map_err(DebugError::from)?;
        let methods = conn
            .get_methods(frame.location.class_id)
            .await
            .map_err(DebugError::from)?;
        let method_name = methods
            .iter()
            .find(|m| m.method_id == frame.location.method_id)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| "<unknown>".to_string());

        writeln!(out, "Frame {}:", i).unwrap();
        write!(out, "  at {}.{}(", class_name, method_name).unwrap();

        let source = conn.get_source_file(frame.location.class_id).await.ok();
        let line = match conn
            .get_line_table(frame.location.class_id, frame.location.method_id)
            .await
        {
            Ok(table) => table.line_at(frame.location.index),
            Err(_) => None,
        };

        match (source, line) {
            (Some(source), Some(line)) => writeln!(out, "{}:{})", source, line).unwrap(),
            (Some(source), None) => writeln!(out, "{})", source).unwrap(),
            _ => writeln!(out, "Unknown Source)").unwrap(),
        }
    }

    Ok(out)
}

/// Visible locals of one frame, rendered.
pub async fn get_locals(
    conn: &mut JdwpConnection,
    session: &SessionManager,
    thread_id: ThreadId,
    frame_index: usize,
) -> DebugResult<String> {
    require_suspended_thread(conn, thread_id).await?;

    let frames = conn
        .get_frames(thread_id, frame_index as i32, 1)
        .await
        .map_err(|e| frame_range_error(e, frame_index))?;
    let frame = frames
        .first()
        .copied()
        .ok_or(DebugError::FrameOutOfRange(frame_index))?;

    let variables = conn
        .get_variable_table(frame.location.class_id, frame.location.method_id)
        .await
        .map_err(jdwp_op_error)?;

    let visible: Vec<_> = variables
        .iter()
        .filter(|v| v.visible_at(frame.location.index))
        .collect();

    let mut out = format!("Local variables in frame {}:\n\n", frame_index);
    if visible.is_empty() {
        out.push_str("(no visible variables)\n");
        return Ok(out);
    }

    let slots: Vec<VariableSlot> = visible
        .iter()
        .map(|v| VariableSlot {
            slot: v.slot as i32,
            sig_byte: v.signature.as_bytes()[0],
        })
        .collect();

    let values = conn
        .get_frame_values(thread_id, frame.frame_id, &slots)
        .await
        .map_err(jdwp_op_error)?;

    for (var, value) in visible.iter().zip(values.iter()) {
        let rendered = format_value(conn, session, value).await?;
        writeln!(
            out,
            "{} ({}) = {}",
            var.name,
            signature_to_name(&var.signature),
            rendered
        )
        .unwrap();
    }

    Ok(out)
}

fn frame_range_error(err: JdwpError, frame_index: usize) -> DebugError {
    match err.code() {
        Some(error_codes::INVALID_INDEX) | Some(error_codes::INVALID_LENGTH) => {
            DebugError::FrameOutOfRange(frame_index)
        }
        _ => jdwp_op_error(err),
    }
}

/// Fields (or elements) of a previously discovered object.
pub async fn get_object_fields(
    conn: &mut JdwpConnection,
    session: &SessionManager,
    object_id: ObjectId,
) -> DebugResult<String> {
    let Some(cached) = session.cached_object(object_id) else {
        return Err(DebugError::ObjectNotCached(object_id));
    };
    debug!(
        "Inspecting cached {:?} #{} ({})",
        cached.kind, object_id, cached.type_name
    );

    // Re-validate the cached id against the live VM before trusting it
    let type_id = match conn.get_object_reference_type(object_id).await {
        Ok(type_id) => type_id,
        Err(e) if e.code() == Some(error_codes::INVALID_OBJECT) => {
            session.evict_object(object_id);
            return Err(DebugError::ObjectNotCached(object_id));
        }
        Err(e) => return Err(e.into()),
    };

    let signature = conn.get_signature(type_id).await.map_err(DebugError::from)?;
    let type_name = signature_to_name(&signature);

    if signature.starts_with('[') {
        return render_array_elements(conn, session, object_id, &type_name).await;
    }

    if is_recognized_collection(&type_name) {
        return render_collection_view(conn, session, object_id, type_id, &type_name).await;
    }

    let mut out = format!("Object #{} ({}):\n\n", object_id, type_name);
    render_raw_fields(conn, session, object_id, type_id, &mut out).await?;
    Ok(out)
}

/// Collection shapes with a known internal layout.
pub fn is_recognized_collection(type_name: &str) -> bool {
    const SHAPES: [&str; 7] = [
        "java.util.ArrayList",
        "java.util.LinkedList",
        "java.util.HashMap",
        "java.util.LinkedHashMap",
        "java.util.TreeMap",
        "java.util.HashSet",
        "java.util.TreeSet",
    ];
    SHAPES.iter().any(|shape| type_name.starts_with(shape))
}

async fn render_array_elements(
    conn: &mut JdwpConnection,
    session: &SessionManager,
    array_id: ObjectId,
    type_name: &str,
) -> DebugResult<String> {
    let length = conn
        .get_array_length(array_id)
        .await
        .map_err(DebugError::from)? as usize;

    let mut out = format!(
        "Array #{} ({}) - {} elements:\n\n",
        array_id, type_name, length
    );

    let limit = length.min(ARRAY_ELEMENT_CAP);
    if limit > 0 {
        let values = conn
            .get_array_values(array_id, 0, limit as i32)
            .await
            .map_err(DebugError::from)?;
        for (i, value) in values.iter().enumerate() {
            let rendered = format_value(conn, session, value).await?;
            writeln!(out, "[{}] = {}", i, rendered).unwrap();
        }
    }

    if length > ARRAY_ELEMENT_CAP {
        writeln!(out, "\n... ({} more elements)", length - ARRAY_ELEMENT_CAP).unwrap();
    }

    Ok(out)
}

async fn render_collection_view(
    conn: &mut JdwpConnection,
    session: &SessionManager,
    object_id: ObjectId,
    type_id: u64,
    type_name: &str,
) -> DebugResult<String> {
    let mut out = format!("Object #{} ({}):\n\n", object_id, type_name);

    if let Some(ValueData::Int(size)) = field_value(conn, object_id, type_id, "size")
        .await?
        .map(|v| v.data)
    {
        writeln!(out, "Size: {}\n", size).unwrap();

        let result = if type_name.contains("List") {
            render_list_elements(conn, session, object_id, type_id, size as usize, &mut out).await
        } else if type_name.contains("Map") {
            render_map_entries(conn, session, object_id, type_id, size as usize, &mut out).await
        } else {
            render_set_elements(conn, session, object_id, type_id, size as usize, &mut out).await
        };

        // Per-entry traversal failures go into the output, not up the stack
        if let Err(e) = result {
            writeln!(out, "  Error inspecting collection: {}", e).unwrap();
        }
    }

    out.push_str("\n--- Internal fields ---\n\n");
    render_raw_fields(conn, session, object_id, type_id, &mut out).await?;

    Ok(out)
}

/// Dynamic arrays expose their backing `elementData` array.
async fn render_list_elements(
    conn: &mut JdwpConnection,
    session: &SessionManager,
    list_id: ObjectId,
    type_id: u64,
    size: usize,
    out: &mut String,
) -> DebugResult<()> {
    out.push_str("Elements:\n");

    let Some(backing) = field_value(conn, list_id, type_id, "elementData").await? else {
        return Ok(());
    };
    let Some(array_id) = backing.object_id().filter(|id| *id != 0) else {
        return Ok(());
    };

    let limit = size.min(COLLECTION_ELEMENT_CAP);
    if limit > 0 {
        let values = conn
            .get_array_values(array_id, 0, limit as i32)
            .await
            .map_err(DebugError::from)?;
        for (i, value) in values.iter().enumerate() {
            let rendered = format_value(conn, session, value).await?;
            writeln!(out, "  [{}] = {}", i, rendered).unwrap();
        }
    }

    if size > COLLECTION_ELEMENT_CAP {
        writeln!(out, "  ... ({} more elements)", size - COLLECTION_ELEMENT_CAP).unwrap();
    }

    Ok(())
}

/// Doubly-linked hash maps chain entries via `head` then `after`/`next`.
async fn render_map_entries(
    conn: &mut JdwpConnection,
    session: &SessionManager,
    map_id: ObjectId,
    type_id: u64,
    size: usize,
    out: &mut String,
) -> DebugResult<()> {
    out.push_str("Entries:\n");

    let Some(head) = field_value(conn, map_id, type_id, "head").await? else {
        return Ok(());
    };
    let mut entry_id = head.object_id().unwrap_or(0);
    let mut count = 0;

    while entry_id != 0 && count < COLLECTION_ELEMENT_CAP {
        let entry_type = conn
            .get_object_reference_type(entry_id)
            .await
            .map_err(DebugError::from)?;

        let key = field_value(conn, entry_id, entry_type, "key").await?;
        let value = field_value(conn, entry_id, entry_type, "value").await?;
        if let (Some(key), Some(value)) = (key, value) {
            let key_text = format_value(conn, session, &key).await?;
            let value_text = format_value(conn, session, &value).await?;
            writeln!(out, "  {} = {}", key_text, value_text).unwrap();
        }

        let next = match field_value(conn, entry_id, entry_type, "after").await? {
            Some(v) => Some(v),
            None => field_value(conn, entry_id, entry_type, "next").await?,
        };
        entry_id = next.and_then(|v| v.object_id()).unwrap_or(0);
        count += 1;
    }

    if size > COLLECTION_ELEMENT_CAP {
        writeln!(out, "  ... ({} more entries)", size - COLLECTION_ELEMENT_CAP).unwrap();
    }

    Ok(())
}

/// Hash sets store their elements as the keys of an inner map.
async fn render_set_elements(
    conn: &mut JdwpConnection,
    session: &SessionManager,
    set_id: ObjectId,
    type_id: u64,
    size: usize,
    out: &mut String,
) -> DebugResult<()> {
    out.push_str("Elements:\n");

    let Some(inner) = field_value(conn, set_id, type_id, "map").await? else {
        return Ok(());
    };
    let Some(map_id) = inner.object_id().filter(|id| *id != 0) else {
        return Ok(());
    };

    let map_type = conn
        .get_object_reference_type(map_id)
        .await
        .map_err(DebugError::from)?;
    render_map_entries(conn, session, map_id, map_type, size, out).await
}

async fn render_raw_fields(
    conn: &mut JdwpConnection,
    session: &SessionManager,
    object_id: ObjectId,
    type_id: u64,
    out: &mut String,
) -> DebugResult<()> {
    let fields: Vec<FieldInfo> = conn
        .collect_all_fields(type_id)
        .await
        .map_err(DebugError::from)?
        .into_iter()
        .filter(|f| !f.is_static())
        .collect();

    if fields.is_empty() {
        out.push_str("(no fields)\n");
        return Ok(());
    }

    let field_ids: Vec<u64> = fields.iter().map(|f| f.field_id).collect();
    let values = conn
        .get_object_values(object_id, &field_ids)
        .await
        .map_err(DebugError::from)?;

    for (field, value) in fields.iter().zip(values.iter()) {
        let rendered = format_value(conn, session, value).await?;
        writeln!(out, "{} {} = {}", field.type_name(), field.name, rendered).unwrap();
    }

    Ok(())
}

/// Declared instance field of an object, found anywhere in its hierarchy.
async fn field_value(
    conn: &mut JdwpConnection,
    object_id: ObjectId,
    type_id: u64,
    field_name: &str,
) -> DebugResult<Option<Value>> {
    let Some((_, field)) = conn
        .find_visible_field(type_id, field_name)
        .await
        .map_err(DebugError::from)?
    else {
        return Ok(None);
    };
    let values = conn
        .get_object_values(object_id, &[field.field_id])
        .await
        .map_err(DebugError::from)?;
    Ok(values.into_iter().next())
}

/// Resolve a binary class name to its loaded reference type, if any.
pub async fn resolve_class(
    conn: &mut JdwpConnection,
    class_name: &str,
) -> DebugResult<Option<u64>> {
    let signature = name_to_signature(class_name);
    let classes = conn
        .classes_by_signature(&signature)
        .await
        .map_err(DebugError::from)?;
    Ok(classes.first().map(|c| c.type_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_rendering_is_decimal() {
        assert_eq!(format_primitive(&ValueData::Int(42)), "42");
        assert_eq!(format_primitive(&ValueData::Long(-9)), "-9");
        assert_eq!(format_primitive(&ValueData::Boolean(true)), "true");
        assert_eq!(format_primitive(&ValueData::Byte(7)), "7");
        assert_eq!(format_primitive(&ValueData::Char(b'x' as u16)), "x");
    }

    #[test]
    fn recognized_collection_shapes() {
        assert!(is_recognized_collection("java.util.ArrayList"));
        assert!(is_recognized_collection("java.util.LinkedHashMap"));
        assert!(is_recognized_collection("java.util.TreeSet"));
        assert!(!is_recognized_collection("java.util.Collections$EmptyList"));
        assert!(!is_recognized_collection("demo.MyList"));
    }

    #[test]
    fn caps_match_the_rendering_contract() {
        assert_eq!(ARRAY_ELEMENT_CAP, 100);
        assert_eq!(COLLECTION_ELEMENT_CAP, 50);
    }

    #[test]
    fn collection_tail_arithmetic() {
        // A collection of size N renders at most 50 entries and summarizes
        // the rest as "(N-50 more ...)"
        let size: usize = 120;
        assert_eq!(size - COLLECTION_ELEMENT_CAP, 70);
    }
}
