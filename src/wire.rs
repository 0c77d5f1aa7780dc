//! Wire-level tags and primitive encoders/decoders.
//!
//! Every multi-byte integer on the wire is big-endian regardless of host
//! order. Floats travel as their IEEE-754 bit pattern in a big-endian u64.
//! Encoders pick the narrowest tagged form that fits; decoders accept every
//! form.

use std::io::{ErrorKind, Read};

use crate::error::{IrError, Result};
use crate::tree::{NodeId, NodeLocator, NodeType};

pub const TAG_END_OF_STREAM: u8 = 0x00;

pub const TAG_STR_LEN_BYTE: u8 = 0x41;
pub const TAG_STR_LEN_SHORT: u8 = 0x42;
pub const TAG_STR_LEN_INT: u8 = 0x43;

pub const TAG_VALUE_INT8: u8 = 0x51;
pub const TAG_VALUE_INT16: u8 = 0x52;
pub const TAG_VALUE_INT32: u8 = 0x53;
pub const TAG_VALUE_INT64: u8 = 0x54;
pub const TAG_VALUE_FLOAT: u8 = 0x55;
pub const TAG_VALUE_TRUE: u8 = 0x56;
pub const TAG_VALUE_FALSE: u8 = 0x57;
pub const TAG_VALUE_CLP_STR_FOUR_BYTE: u8 = 0x58;
pub const TAG_VALUE_CLP_STR_EIGHT_BYTE: u8 = 0x59;
pub const TAG_VALUE_EMPTY: u8 = 0x5e;
pub const TAG_VALUE_NULL: u8 = 0x5f;

pub const TAG_PARENT_ID_BYTE: u8 = 0x60;
pub const TAG_PARENT_ID_SHORT: u8 = 0x61;

pub const TAG_KEY_ID_BYTE: u8 = 0x65;
pub const TAG_KEY_ID_SHORT: u8 = 0x66;

pub const TAG_NODE_INT: u8 = 0x71;
pub const TAG_NODE_FLOAT: u8 = 0x72;
pub const TAG_NODE_BOOL: u8 = 0x73;
pub const TAG_NODE_STR: u8 = 0x74;
pub const TAG_NODE_ARRAY: u8 = 0x75;
pub const TAG_NODE_OBJ: u8 = 0x76;

/// Controls whether the 1- and 2-byte integer forms are emitted. Decoders
/// accept all four widths regardless of this setting.
pub const ENABLE_SHORT_INT_COMPRESSION: bool = false;

pub fn node_type_tag(node_type: NodeType) -> u8 {
    match node_type {
        NodeType::Int => TAG_NODE_INT,
        NodeType::Float => TAG_NODE_FLOAT,
        NodeType::Bool => TAG_NODE_BOOL,
        NodeType::Str => TAG_NODE_STR,
        NodeType::Array => TAG_NODE_ARRAY,
        NodeType::Obj => TAG_NODE_OBJ,
    }
}

pub fn node_type_from_tag(tag: u8) -> Option<NodeType> {
    match tag {
        TAG_NODE_INT => Some(NodeType::Int),
        TAG_NODE_FLOAT => Some(NodeType::Float),
        TAG_NODE_BOOL => Some(NodeType::Bool),
        TAG_NODE_STR => Some(NodeType::Str),
        TAG_NODE_ARRAY => Some(NodeType::Array),
        TAG_NODE_OBJ => Some(NodeType::Obj),
        _ => None,
    }
}

/// Appends a tagged signed integer using the narrowest permitted form.
pub fn write_int(value: i64, buf: &mut Vec<u8>) {
    if ENABLE_SHORT_INT_COMPRESSION && i8::try_from(value).is_ok() {
        buf.push(TAG_VALUE_INT8);
        buf.extend_from_slice(&(value as i8).to_be_bytes());
    } else if ENABLE_SHORT_INT_COMPRESSION && i16::try_from(value).is_ok() {
        buf.push(TAG_VALUE_INT16);
        buf.extend_from_slice(&(value as i16).to_be_bytes());
    } else if i32::try_from(value).is_ok() {
        buf.push(TAG_VALUE_INT32);
        buf.extend_from_slice(&(value as i32).to_be_bytes());
    } else {
        buf.push(TAG_VALUE_INT64);
        buf.extend_from_slice(&value.to_be_bytes());
    }
}

pub fn write_float(value: f64, buf: &mut Vec<u8>) {
    buf.push(TAG_VALUE_FLOAT);
    buf.extend_from_slice(&value.to_bits().to_be_bytes());
}

pub fn write_bool(value: bool, buf: &mut Vec<u8>) {
    buf.push(if value { TAG_VALUE_TRUE } else { TAG_VALUE_FALSE });
}

pub fn write_null(buf: &mut Vec<u8>) {
    buf.push(TAG_VALUE_NULL);
}

pub fn write_empty(buf: &mut Vec<u8>) {
    buf.push(TAG_VALUE_EMPTY);
}

/// Appends a length-prefixed string with the narrowest length tag.
pub fn write_str(s: &str, buf: &mut Vec<u8>) -> Result<()> {
    let len = s.len();
    if len <= u8::MAX as usize {
        buf.push(TAG_STR_LEN_BYTE);
        buf.push(len as u8);
    } else if len <= u16::MAX as usize {
        buf.push(TAG_STR_LEN_SHORT);
        buf.extend_from_slice(&(len as u16).to_be_bytes());
    } else if len <= u32::MAX as usize {
        buf.push(TAG_STR_LEN_INT);
        buf.extend_from_slice(&(len as u32).to_be_bytes());
    } else {
        return Err(IrError::ValueOutOfRange(format!(
            "string is {len} bytes, limit is {}",
            u32::MAX
        )));
    }
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

pub fn write_key_id(id: NodeId, buf: &mut Vec<u8>) -> Result<()> {
    if let Ok(short) = u8::try_from(id) {
        buf.push(TAG_KEY_ID_BYTE);
        buf.push(short);
    } else if let Ok(short) = u16::try_from(id) {
        buf.push(TAG_KEY_ID_SHORT);
        buf.extend_from_slice(&short.to_be_bytes());
    } else {
        return Err(IrError::ValueOutOfRange(format!(
            "key id {id} exceeds the 16-bit wire limit"
        )));
    }
    Ok(())
}

pub fn write_parent_id(id: NodeId, buf: &mut Vec<u8>) -> Result<()> {
    if let Ok(short) = u8::try_from(id) {
        buf.push(TAG_PARENT_ID_BYTE);
        buf.push(short);
    } else if let Ok(short) = u16::try_from(id) {
        buf.push(TAG_PARENT_ID_SHORT);
        buf.extend_from_slice(&short.to_be_bytes());
    } else {
        return Err(IrError::ValueOutOfRange(format!(
            "parent id {id} exceeds the 16-bit wire limit"
        )));
    }
    Ok(())
}

/// Appends the wire form that introduces a newly inserted schema node:
/// type tag, tagged parent id, tagged key name.
pub fn write_node_delta(locator: &NodeLocator, buf: &mut Vec<u8>) -> Result<()> {
    buf.push(node_type_tag(locator.node_type));
    write_parent_id(locator.parent_id, buf)?;
    write_str(locator.key_name, buf)
}

pub(crate) fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => Err(IrError::IncompleteStream),
        Err(err) => Err(IrError::Io(err)),
    }
}

pub fn read_tag<R: Read>(reader: &mut R) -> Result<u8> {
    read_u8(reader)
}

pub fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    read_exact(reader, &mut buf)?;
    Ok(buf[0])
}

pub fn read_u16_be<R: Read>(reader: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    read_exact(reader, &mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

pub fn read_u32_be<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_exact(reader, &mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

pub fn read_u64_be<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    read_exact(reader, &mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

pub fn read_i8<R: Read>(reader: &mut R) -> Result<i8> {
    Ok(read_u8(reader)? as i8)
}

pub fn read_i16_be<R: Read>(reader: &mut R) -> Result<i16> {
    Ok(read_u16_be(reader)? as i16)
}

pub fn read_i32_be<R: Read>(reader: &mut R) -> Result<i32> {
    Ok(read_u32_be(reader)? as i32)
}

pub fn read_i64_be<R: Read>(reader: &mut R) -> Result<i64> {
    Ok(read_u64_be(reader)? as i64)
}

/// Reads a signed integer whose width is selected by `tag`.
pub fn read_int_value<R: Read>(reader: &mut R, tag: u8) -> Result<i64> {
    match tag {
        TAG_VALUE_INT8 => Ok(read_i8(reader)? as i64),
        TAG_VALUE_INT16 => Ok(read_i16_be(reader)? as i64),
        TAG_VALUE_INT32 => Ok(read_i32_be(reader)? as i64),
        TAG_VALUE_INT64 => read_i64_be(reader),
        other => Err(IrError::UnknownTag(other)),
    }
}

/// Reads the body of a length-prefixed string whose length width is
/// selected by `tag`.
pub fn read_str_body<R: Read>(reader: &mut R, tag: u8) -> Result<String> {
    let len = match tag {
        TAG_STR_LEN_BYTE => read_u8(reader)? as usize,
        TAG_STR_LEN_SHORT => read_u16_be(reader)? as usize,
        TAG_STR_LEN_INT => read_u32_be(reader)? as usize,
        other => return Err(IrError::UnknownTag(other)),
    };
    let mut bytes = vec![0u8; len];
    read_exact(reader, &mut bytes)?;
    String::from_utf8(bytes)
        .map_err(|_| IrError::DecodeError("string payload is not valid UTF-8".into()))
}
