use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use crate::buffer::SerializationBuffer;
use crate::clp;
use crate::error::{IrError, Result};
use crate::json;
use crate::tree::{NodeLocator, NodeType, ROOT_ID};
use crate::wire;

/// Serializes one record into the buffer's output.
///
/// On success a complete record frame (new schema nodes, then key ids, then
/// values) is appended to the output. On failure nothing is appended and
/// the schema tree is reverted, so a failed record leaves no residue.
pub fn serialize_record(record: &JsonValue, buf: &mut SerializationBuffer) -> Result<()> {
    let members = record.as_object().ok_or(IrError::InvalidTypeConvert {
        expected: "object",
        actual: json::json_kind(record),
    })?;
    if members.is_empty() {
        buf.out.push(wire::TAG_VALUE_EMPTY);
        return Ok(());
    }

    buf.tree.take_snapshot();
    buf.node_scratch.clear();
    buf.key_scratch.clear();
    buf.value_scratch.clear();

    if let Err(err) = serialize_members(members, buf) {
        debug!(error = %err, "serialize.record.revert");
        buf.tree.revert()?;
        return Err(err);
    }

    trace!(
        nodes = buf.node_scratch.len(),
        keys = buf.key_scratch.len(),
        values = buf.value_scratch.len(),
        "serialize.record"
    );
    buf.out.extend_from_slice(&buf.node_scratch);
    buf.out.extend_from_slice(&buf.key_scratch);
    buf.out.extend_from_slice(&buf.value_scratch);
    Ok(())
}

/// Marks the end of the stream with the single terminator byte.
pub fn serialize_end_of_stream(buf: &mut SerializationBuffer) {
    buf.out.push(wire::TAG_END_OF_STREAM);
}

fn serialize_members(
    members: &serde_json::Map<String, JsonValue>,
    buf: &mut SerializationBuffer,
) -> Result<()> {
    let mut stack = vec![(members.iter(), ROOT_ID)];
    while let Some(frame) = stack.last_mut() {
        let parent_id = frame.1;
        let Some((key, value)) = frame.0.next() else {
            stack.pop();
            continue;
        };

        let node_type = node_type_of(value);
        let locator = NodeLocator::new(parent_id, key, node_type);
        let node_id = match buf.tree.has(&locator) {
            Some(id) => id,
            None => {
                let id = buf.tree.insert(&locator)?;
                wire::write_node_delta(&locator, &mut buf.node_scratch)?;
                id
            }
        };

        match value {
            JsonValue::Object(inner) if !inner.is_empty() => {
                // The children carry their own key ids; the object itself
                // emits nothing.
                stack.push((inner.iter(), node_id));
            }
            JsonValue::Object(_) => {
                wire::write_key_id(node_id, &mut buf.key_scratch)?;
                wire::write_empty(&mut buf.value_scratch);
            }
            JsonValue::Null => {
                wire::write_key_id(node_id, &mut buf.key_scratch)?;
                wire::write_null(&mut buf.value_scratch);
            }
            _ => {
                wire::write_key_id(node_id, &mut buf.key_scratch)?;
                write_value(value, &mut buf.value_scratch)?;
            }
        }
    }
    Ok(())
}

fn node_type_of(value: &JsonValue) -> NodeType {
    match value {
        JsonValue::Null | JsonValue::Object(_) => NodeType::Obj,
        JsonValue::Bool(_) => NodeType::Bool,
        JsonValue::Number(n) if n.is_f64() => NodeType::Float,
        JsonValue::Number(_) => NodeType::Int,
        JsonValue::String(_) => NodeType::Str,
        JsonValue::Array(_) => NodeType::Array,
    }
}

fn write_value(value: &JsonValue, out: &mut Vec<u8>) -> Result<()> {
    match value {
        JsonValue::Null => wire::write_null(out),
        JsonValue::Bool(v) => wire::write_bool(*v, out),
        JsonValue::Number(n) if n.is_f64() => {
            let v = n.as_f64().ok_or_else(|| {
                IrError::ValueOutOfRange(format!("number {n} is not representable as a double"))
            })?;
            wire::write_float(v, out);
        }
        JsonValue::Number(n) => {
            let v = n.as_i64().ok_or_else(|| {
                IrError::ValueOutOfRange(format!(
                    "integer {n} exceeds the signed 64-bit range"
                ))
            })?;
            wire::write_int(v, out);
        }
        JsonValue::String(s) => write_str_value(s, out)?,
        JsonValue::Array(_) => {
            // Arrays bypass the structural schema: they travel as the
            // CLP-encoded JSON rendering of the whole array.
            let mut text = String::new();
            json::append_json_value(value, &mut text)?;
            out.push(wire::TAG_VALUE_CLP_STR_FOUR_BYTE);
            clp::serialize_message(&text, out)?;
        }
        JsonValue::Object(_) => wire::write_empty(out),
    }
    Ok(())
}

/// Space-bearing strings are likely tokenizable log lines, which compress
/// better through the CLP factoring; everything else stays a plain string.
fn write_str_value(s: &str, out: &mut Vec<u8>) -> Result<()> {
    if s.contains(' ') {
        out.push(wire::TAG_VALUE_CLP_STR_FOUR_BYTE);
        clp::serialize_message(s, out)
    } else {
        wire::write_str(s, out)
    }
}
