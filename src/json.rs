//! JSON text rendering: RFC 8259 string escaping driven by a byte-level
//! UTF-8 state machine, rendering of in-memory records, and reconstruction
//! of a nested JSON text from a deserialized `(tree, schema, values)`
//! triple.

use serde_json::{Map, Value as JsonValue};

use crate::error::{IrError, Result};
use crate::model::Value;
use crate::tree::{NodeId, NodeType, SchemaTree, ROOT_ID};

const UTF8_ACCEPT: u8 = 0;
const UTF8_REJECT: u8 = 1;

// Bjoern Hoehrmann's UTF-8 DFA: 256 byte-to-class entries followed by the
// state transition rows (16 classes per state).
#[rustfmt::skip]
const UTF8_TABLE: [u8; 400] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 00..1f
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 20..3f
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 40..5f
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 60..7f
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, // 80..9f
    7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7,
    7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, // a0..bf
    8, 8, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, // c0..df
    0xa, 0x3, 0x3, 0x3, 0x3, 0x3, 0x3, 0x3, 0x3, 0x3, 0x3, 0x3, 0x3, 0x4, 0x3, 0x3, // e0..ef
    0xb, 0x6, 0x6, 0x6, 0x5, 0x8, 0x8, 0x8, 0x8, 0x8, 0x8, 0x8, 0x8, 0x8, 0x8, 0x8, // f0..ff
    0x0, 0x1, 0x2, 0x3, 0x5, 0x8, 0x7, 0x1, 0x1, 0x1, 0x4, 0x6, 0x1, 0x1, 0x1, 0x1, // s0
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 0, 1, 1, 1, 1, 1, 0, 1, 0, 1, 1, 1, 1, 1, 1, // s1..s2
    1, 2, 1, 1, 1, 1, 1, 2, 1, 2, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 1, // s3..s4
    1, 2, 1, 1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 3, 1, 3, 1, 1, 1, 1, 1, 1, // s5..s6
    1, 3, 1, 1, 1, 1, 1, 3, 1, 3, 1, 1, 1, 1, 1, 1,
    1, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // s7..s8
];

fn utf8_decode(state: &mut u8, codepoint: &mut u32, byte: u8) -> u8 {
    let class = UTF8_TABLE[byte as usize];
    *codepoint = if *state == UTF8_ACCEPT {
        (0xffu32 >> class) & byte as u32
    } else {
        (byte as u32 & 0x3f) | (*codepoint << 6)
    };
    *state = UTF8_TABLE[256 + *state as usize * 16 + class as usize];
    *state
}

/// Appends `bytes` as a quoted, escaped JSON string. The bytes are run
/// through the UTF-8 state machine as they are escaped; invalid UTF-8 fails
/// the rendering.
pub fn escape_and_append(bytes: &[u8], out: &mut String) -> Result<()> {
    out.push('"');
    let mut state = UTF8_ACCEPT;
    let mut codepoint = 0u32;
    for &byte in bytes {
        match utf8_decode(&mut state, &mut codepoint, byte) {
            UTF8_ACCEPT => match codepoint {
                0x08 => out.push_str("\\b"),
                0x09 => out.push_str("\\t"),
                0x0a => out.push_str("\\n"),
                0x0c => out.push_str("\\f"),
                0x0d => out.push_str("\\r"),
                0x22 => out.push_str("\\\""),
                0x5c => out.push_str("\\\\"),
                cp if cp <= 0x1f => out.push_str(&format!("\\u{cp:04x}")),
                cp => out.push(char::from_u32(cp).ok_or_else(|| {
                    IrError::DecodeError("string decodes to an invalid scalar value".into())
                })?),
            },
            UTF8_REJECT => {
                return Err(IrError::DecodeError("string is not valid UTF-8".into()));
            }
            _ => {} // inside a multi-byte sequence
        }
    }
    if state != UTF8_ACCEPT {
        return Err(IrError::DecodeError(
            "string ends inside a UTF-8 sequence".into(),
        ));
    }
    out.push('"');
    Ok(())
}

/// Renders an in-memory record value as JSON text. Maps preserve source
/// insertion order; numbers use their shortest round-trip representation.
pub fn append_json_value(value: &JsonValue, out: &mut String) -> Result<()> {
    match value {
        JsonValue::Null => out.push_str("null"),
        JsonValue::Bool(true) => out.push_str("true"),
        JsonValue::Bool(false) => out.push_str("false"),
        JsonValue::Number(n) => out.push_str(&n.to_string()),
        JsonValue::String(s) => escape_and_append(s.as_bytes(), out)?,
        JsonValue::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                append_json_value(item, out)?;
            }
            out.push(']');
        }
        JsonValue::Object(members) => {
            out.push('{');
            for (idx, (key, member)) in members.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                escape_and_append(key.as_bytes(), out)?;
                out.push(':');
                append_json_value(member, out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

/// Shortest round-trip rendering of a double; non-finite values render as
/// null, which is the only JSON-compatible projection.
pub fn format_f64(value: f64) -> String {
    match serde_json::Number::from_f64(value) {
        Some(n) => n.to_string(),
        None => "null".to_string(),
    }
}

pub(crate) fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Reconstructs the JSON text of one deserialized record from its schema
/// tree, leaf ids, and values, resolving each leaf's key path through the
/// tree's parent links.
pub fn record_to_json(
    tree: &SchemaTree,
    schema: &[NodeId],
    values: &[Option<Value>],
) -> Result<String> {
    if schema.len() != values.len() {
        return Err(IrError::CorruptedStream(format!(
            "record has {} keys but {} values",
            schema.len(),
            values.len()
        )));
    }

    let mut root = JsonValue::Object(Map::new());
    for (&leaf_id, slot) in schema.iter().zip(values) {
        if leaf_id == ROOT_ID {
            return Err(IrError::CorruptedStream(
                "record leaf references the root node".into(),
            ));
        }

        // Parent ids are always smaller than child ids, so walking up
        // terminates at the root.
        let mut path = Vec::new();
        let mut cursor_id = leaf_id;
        while cursor_id != ROOT_ID {
            path.push(cursor_id);
            cursor_id = tree.get(cursor_id)?.parent_id();
        }
        path.reverse();

        let mut cursor = &mut root;
        for (depth, &node_id) in path.iter().enumerate() {
            let node = tree.get(node_id)?;
            if depth + 1 == path.len() {
                let members = cursor.as_object_mut().ok_or_else(|| {
                    IrError::CorruptedStream(format!(
                        "schema node {node_id} nests under a non-object leaf"
                    ))
                })?;
                members
                    .insert(node.key_name().to_string(), leaf_to_json(node.node_type(), slot)?);
            } else {
                cursor = cursor
                    .as_object_mut()
                    .ok_or_else(|| {
                        IrError::CorruptedStream(format!(
                            "schema node {node_id} nests under a non-object leaf"
                        ))
                    })?
                    .entry(node.key_name().to_string())
                    .or_insert_with(|| JsonValue::Object(Map::new()));
            }
        }
    }

    let mut out = String::new();
    append_json_value(&root, &mut out)?;
    Ok(out)
}

fn leaf_to_json(node_type: NodeType, slot: &Option<Value>) -> Result<JsonValue> {
    let Some(value) = slot else {
        return Ok(JsonValue::Object(Map::new()));
    };
    Ok(match value {
        Value::Null => JsonValue::Null,
        Value::Int(v) => JsonValue::from(*v),
        Value::Float(v) => serde_json::Number::from_f64(*v)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Bool(v) => JsonValue::Bool(*v),
        Value::Str(s) => JsonValue::String(s.clone()),
        Value::ClpStr4(clp) => clp_leaf_to_json(node_type, &clp.decode()?)?,
        Value::ClpStr8(clp) => clp_leaf_to_json(node_type, &clp.decode()?)?,
    })
}

fn clp_leaf_to_json(node_type: NodeType, text: &str) -> Result<JsonValue> {
    if node_type == NodeType::Array {
        serde_json::from_str(text)
            .map_err(|err| IrError::DecodeError(format!("array leaf is not valid JSON: {err}")))
    } else {
        Ok(JsonValue::String(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn escaped(bytes: &[u8]) -> Result<String> {
        let mut out = String::new();
        escape_and_append(bytes, &mut out)?;
        Ok(out)
    }

    #[test]
    fn escapes_control_and_reserved_characters() {
        assert_eq!(escaped(b"plain").unwrap(), "\"plain\"");
        assert_eq!(
            escaped(b"a\"b\\c\x08\x09\x0a\x0c\x0d").unwrap(),
            "\"a\\\"b\\\\c\\b\\t\\n\\f\\r\""
        );
        assert_eq!(escaped(b"\x01\x1f").unwrap(), "\"\\u0001\\u001f\"");
    }

    #[test]
    fn multibyte_utf8_passes_through() {
        assert_eq!(escaped("héllo ☃ 🎉".as_bytes()).unwrap(), "\"héllo ☃ 🎉\"");
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        assert!(matches!(escaped(&[0xff]), Err(IrError::DecodeError(_))));
        // Overlong encoding of '/'.
        assert!(matches!(
            escaped(&[0xc0, 0xaf]),
            Err(IrError::DecodeError(_))
        ));
        // Truncated three-byte sequence.
        assert!(matches!(
            escaped(&[0xe2, 0x98]),
            Err(IrError::DecodeError(_))
        ));
        // UTF-16 surrogate half.
        assert!(matches!(
            escaped(&[0xed, 0xa0, 0x80]),
            Err(IrError::DecodeError(_))
        ));
    }

    #[test]
    fn renders_nested_values_in_insertion_order() {
        let value = json!({"b": [1, "two", false, null], "a": {"x": 1.5}});
        let mut out = String::new();
        append_json_value(&value, &mut out).unwrap();
        assert_eq!(out, r#"{"b":[1,"two",false,null],"a":{"x":1.5}}"#);
    }

    #[test]
    fn format_f64_is_shortest_roundtrip() {
        assert_eq!(format_f64(1.0), "1.0");
        assert_eq!(format_f64(0.1), "0.1");
        assert_eq!(format_f64(f64::NAN), "null");
        assert_eq!(format_f64(f64::INFINITY), "null");
    }

    #[test]
    fn record_to_json_rejects_mismatched_lengths() {
        let tree = SchemaTree::new();
        assert!(matches!(
            record_to_json(&tree, &[1], &[]),
            Err(IrError::CorruptedStream(_))
        ));
    }
}
