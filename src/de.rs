use std::io::Read;

use tracing::debug;

use crate::clp;
use crate::error::{IrError, Result};
use crate::model::Value;
use crate::tree::{NodeId, NodeLocator, NodeType, SchemaTree};
use crate::wire;

/// Outcome of a successful call to [`deserialize_next_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextRecord {
    Record,
    EndOfStream,
}

/// Deserializes the next record frame from the reader.
///
/// `schema` receives the leaf node ids and `values` one optional value per
/// leaf (`None` is the empty-object slot); both are cleared on entry. Any
/// schema-node deltas in the frame are applied to `tree` as they are read.
/// A short read anywhere surfaces as `IncompleteStream`; the record cannot
/// be resumed mid-frame, so the caller should discard the stream on any
/// error.
pub fn deserialize_next_record<R: Read>(
    reader: &mut R,
    tree: &mut SchemaTree,
    schema: &mut Vec<NodeId>,
    values: &mut Vec<Option<Value>>,
) -> Result<NextRecord> {
    match next_record(reader, tree, schema, values) {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            debug!(error = %err, "deserialize.record.fail");
            Err(err)
        }
    }
}

fn next_record<R: Read>(
    reader: &mut R,
    tree: &mut SchemaTree,
    schema: &mut Vec<NodeId>,
    values: &mut Vec<Option<Value>>,
) -> Result<NextRecord> {
    schema.clear();
    values.clear();

    // New schema tree nodes.
    let mut tag = wire::read_tag(reader)?;
    loop {
        if tag == wire::TAG_END_OF_STREAM {
            return Ok(NextRecord::EndOfStream);
        }
        let Some(node_type) = wire::node_type_from_tag(tag) else {
            break;
        };
        apply_node_delta(reader, node_type, tree)?;
        tag = wire::read_tag(reader)?;
    }

    // Leaf key ids.
    loop {
        match tag {
            wire::TAG_KEY_ID_BYTE => schema.push(wire::read_u8(reader)? as NodeId),
            wire::TAG_KEY_ID_SHORT => schema.push(wire::read_u16_be(reader)? as NodeId),
            _ => break,
        }
        tag = wire::read_tag(reader)?;
    }

    let num_leaves = schema.len();
    if num_leaves == 0 {
        if tag == wire::TAG_VALUE_EMPTY {
            return Ok(NextRecord::Record);
        }
        return Err(IrError::CorruptedStream(format!(
            "record without keys must be the empty marker, found tag 0x{tag:02x}"
        )));
    }

    // Exactly one value per leaf.
    loop {
        values.push(read_value(reader, tag)?);
        if values.len() == num_leaves {
            break;
        }
        tag = wire::read_tag(reader)?;
    }
    Ok(NextRecord::Record)
}

fn apply_node_delta<R: Read>(
    reader: &mut R,
    node_type: NodeType,
    tree: &mut SchemaTree,
) -> Result<()> {
    let parent_tag = wire::read_tag(reader)?;
    let parent_id = match parent_tag {
        wire::TAG_PARENT_ID_BYTE => wire::read_u8(reader)? as NodeId,
        wire::TAG_PARENT_ID_SHORT => wire::read_u16_be(reader)? as NodeId,
        other => return Err(IrError::UnknownTag(other)),
    };

    let name_tag = wire::read_tag(reader)?;
    let key_name = wire::read_str_body(reader, name_tag)?;

    let locator = NodeLocator::new(parent_id, &key_name, node_type);
    if tree.has(&locator).is_some() {
        return Err(IrError::CorruptedStream(format!(
            "schema node ({parent_id}, {key_name:?}) introduced twice"
        )));
    }
    tree.insert(&locator)?;
    Ok(())
}

fn read_value<R: Read>(reader: &mut R, tag: u8) -> Result<Option<Value>> {
    let value = match tag {
        wire::TAG_VALUE_INT8
        | wire::TAG_VALUE_INT16
        | wire::TAG_VALUE_INT32
        | wire::TAG_VALUE_INT64 => Some(Value::Int(wire::read_int_value(reader, tag)?)),
        wire::TAG_VALUE_FLOAT => Some(Value::Float(f64::from_bits(wire::read_u64_be(reader)?))),
        wire::TAG_VALUE_TRUE => Some(Value::Bool(true)),
        wire::TAG_VALUE_FALSE => Some(Value::Bool(false)),
        wire::TAG_STR_LEN_BYTE | wire::TAG_STR_LEN_SHORT | wire::TAG_STR_LEN_INT => {
            Some(Value::Str(wire::read_str_body(reader, tag)?))
        }
        wire::TAG_VALUE_CLP_STR_FOUR_BYTE => {
            Some(Value::ClpStr4(clp::deserialize_clp_str(reader)?))
        }
        wire::TAG_VALUE_CLP_STR_EIGHT_BYTE => {
            return Err(IrError::NotImplemented(
                "eight-byte CLP string value decoding",
            ))
        }
        wire::TAG_VALUE_EMPTY => None,
        wire::TAG_VALUE_NULL => Some(Value::Null),
        other => return Err(IrError::UnknownTag(other)),
    };
    Ok(value)
}
