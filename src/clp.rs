//! The CLP string codec: factors a text into a literal skeleton (the
//! logtype) plus the variable tokens extracted from it, so that downstream
//! byte-level compressors see the repeating skeleton separately from the
//! high-entropy variables.
//!
//! The stream only fixes the framing: a CLP value is its tag followed by
//! whatever this codec writes. The payload layout here is a tagged logtype
//! string, tagged encoded-variable count, one big-endian word per encoded
//! variable, tagged dictionary-variable count, one tagged string per
//! dictionary variable.

use std::fmt;
use std::io::Read;

use crate::error::{IrError, Result};
use crate::wire;

const DICT_VAR_PLACEHOLDER: char = '\u{11}';
const ENCODED_VAR_PLACEHOLDER: char = '\u{12}';
const PLACEHOLDER_ESCAPE: char = '\\';

/// A text factored into `(logtype, encoded_vars, dict_vars)`. Generic over
/// the encoded-variable width; the serializer emits the four-byte form only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClpString<V> {
    logtype: String,
    encoded_vars: Vec<V>,
    dict_vars: Vec<String>,
}

pub type ClpString4 = ClpString<i32>;
pub type ClpString8 = ClpString<i64>;

impl<V> ClpString<V> {
    pub fn new(logtype: String, encoded_vars: Vec<V>, dict_vars: Vec<String>) -> Self {
        Self {
            logtype,
            encoded_vars,
            dict_vars,
        }
    }

    pub fn logtype(&self) -> &str {
        &self.logtype
    }

    pub fn encoded_vars(&self) -> &[V] {
        &self.encoded_vars
    }

    pub fn dict_vars(&self) -> &[String] {
        &self.dict_vars
    }
}

impl<V: fmt::Display> ClpString<V> {
    /// Reconstructs the original text by substituting variables back into
    /// the logtype.
    pub fn decode(&self) -> Result<String> {
        let mut out = String::with_capacity(self.logtype.len());
        let mut encoded = self.encoded_vars.iter();
        let mut dict = self.dict_vars.iter();
        let mut chars = self.logtype.chars();
        while let Some(ch) = chars.next() {
            match ch {
                PLACEHOLDER_ESCAPE => {
                    let escaped = chars.next().ok_or_else(|| {
                        IrError::DecodeError("dangling escape at end of logtype".into())
                    })?;
                    out.push(escaped);
                }
                DICT_VAR_PLACEHOLDER => {
                    let var = dict.next().ok_or_else(|| {
                        IrError::DecodeError("logtype references a missing dictionary variable".into())
                    })?;
                    out.push_str(var);
                }
                ENCODED_VAR_PLACEHOLDER => {
                    let var = encoded.next().ok_or_else(|| {
                        IrError::DecodeError("logtype references a missing encoded variable".into())
                    })?;
                    out.push_str(&var.to_string());
                }
                _ => out.push(ch),
            }
        }
        if encoded.next().is_some() || dict.next().is_some() {
            return Err(IrError::DecodeError(
                "unused variables left after decoding logtype".into(),
            ));
        }
        Ok(out)
    }
}

/// Factors `text` into a four-byte CLP string. Tokens are split on single
/// spaces; a token carrying a decimal digit becomes a variable (tokens that
/// are the canonical decimal form of a 32-bit integer are encoded in place,
/// everything else goes to the dictionary). All other text is kept
/// literally in the logtype, with placeholder and escape bytes escaped.
pub fn encode(text: &str) -> ClpString4 {
    let mut logtype = String::with_capacity(text.len());
    let mut encoded_vars = Vec::new();
    let mut dict_vars = Vec::new();
    for (idx, token) in text.split(' ').enumerate() {
        if idx > 0 {
            logtype.push(' ');
        }
        if !token.bytes().any(|b| b.is_ascii_digit()) {
            push_escaped(token, &mut logtype);
        } else if let Some(value) = as_encodable_int(token) {
            encoded_vars.push(value);
            logtype.push(ENCODED_VAR_PLACEHOLDER);
        } else {
            dict_vars.push(token.to_string());
            logtype.push(DICT_VAR_PLACEHOLDER);
        }
    }
    ClpString::new(logtype, encoded_vars, dict_vars)
}

// A token only becomes an encoded variable if substituting the integer back
// reproduces it exactly, so forms like "007" or "+1" stay in the dictionary.
fn as_encodable_int(token: &str) -> Option<i32> {
    let value = token.parse::<i32>().ok()?;
    if value.to_string() == token {
        Some(value)
    } else {
        None
    }
}

fn push_escaped(token: &str, logtype: &mut String) {
    for ch in token.chars() {
        if matches!(ch, DICT_VAR_PLACEHOLDER | ENCODED_VAR_PLACEHOLDER | PLACEHOLDER_ESCAPE) {
            logtype.push(PLACEHOLDER_ESCAPE);
        }
        logtype.push(ch);
    }
}

/// Encodes `text` and writes the full payload. The caller has already
/// pushed the four-byte CLP value tag.
pub fn serialize_message(text: &str, buf: &mut Vec<u8>) -> Result<()> {
    write_clp_string(&encode(text), buf)
}

pub(crate) fn write_clp_string(clp: &ClpString4, buf: &mut Vec<u8>) -> Result<()> {
    wire::write_str(clp.logtype(), buf)?;
    wire::write_int(clp.encoded_vars.len() as i64, buf);
    for var in &clp.encoded_vars {
        buf.extend_from_slice(&var.to_be_bytes());
    }
    wire::write_int(clp.dict_vars.len() as i64, buf);
    for var in &clp.dict_vars {
        wire::write_str(var, buf)?;
    }
    Ok(())
}

/// Reads the payload of a four-byte CLP value. The caller has already
/// consumed the tag.
pub fn deserialize_clp_str<R: Read>(reader: &mut R) -> Result<ClpString4> {
    let tag = wire::read_tag(reader)?;
    let logtype = wire::read_str_body(reader, tag)?;

    let tag = wire::read_tag(reader)?;
    let encoded_count = checked_count(wire::read_int_value(reader, tag)?)?;
    let mut encoded_vars = Vec::new();
    for _ in 0..encoded_count {
        encoded_vars.push(wire::read_i32_be(reader)?);
    }

    let tag = wire::read_tag(reader)?;
    let dict_count = checked_count(wire::read_int_value(reader, tag)?)?;
    let mut dict_vars = Vec::new();
    for _ in 0..dict_count {
        let tag = wire::read_tag(reader)?;
        dict_vars.push(wire::read_str_body(reader, tag)?);
    }

    Ok(ClpString::new(logtype, encoded_vars, dict_vars))
}

fn checked_count(count: i64) -> Result<usize> {
    usize::try_from(count)
        .map_err(|_| IrError::DecodeError(format!("negative variable count {count} in CLP string")))
}
