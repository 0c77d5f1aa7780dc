//! The optional stream preamble: a small JSON metadata object describing
//! the stream (format version, timestamp handling, variable-encoding ids),
//! framed as the encoding byte, a tagged length, and the JSON body. The
//! core codec never requires a preamble; callers that persist streams
//! prepend one.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::{IrError, Result};
use crate::wire;

/// Encoding byte for a JSON metadata body.
pub const ENCODING_JSON: u8 = 0x01;
/// Metadata length carried in a single byte.
pub const METADATA_LEN_UBYTE: u8 = 0x11;
/// Metadata length carried in a big-endian u16.
pub const METADATA_LEN_USHORT: u8 = 0x12;

pub const VERSION_KEY: &str = "VERSION";
pub const VERSION_VALUE: &str = "0.0.1";
pub const TIMESTAMP_PATTERN_KEY: &str = "TIMESTAMP_PATTERN";
pub const TIMESTAMP_PATTERN_SYNTAX_KEY: &str = "TIMESTAMP_PATTERN_SYNTAX";
pub const TIME_ZONE_ID_KEY: &str = "TZ_ID";
pub const REFERENCE_TIMESTAMP_KEY: &str = "REFERENCE_TIMESTAMP";
pub const VARIABLES_SCHEMA_ID_KEY: &str = "VARIABLES_SCHEMA_ID";
pub const VARIABLE_ENCODING_METHODS_ID_KEY: &str = "VARIABLE_ENCODING_METHODS_ID";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMetadata {
    #[serde(rename = "VERSION")]
    pub version: String,
    #[serde(rename = "TIMESTAMP_PATTERN", default, skip_serializing_if = "Option::is_none")]
    pub timestamp_pattern: Option<String>,
    #[serde(
        rename = "TIMESTAMP_PATTERN_SYNTAX",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp_pattern_syntax: Option<String>,
    #[serde(rename = "TZ_ID", default, skip_serializing_if = "Option::is_none")]
    pub time_zone_id: Option<String>,
    #[serde(
        rename = "REFERENCE_TIMESTAMP",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reference_timestamp: Option<String>,
    #[serde(
        rename = "VARIABLES_SCHEMA_ID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub variables_schema_id: Option<String>,
    #[serde(
        rename = "VARIABLE_ENCODING_METHODS_ID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub variable_encoding_methods_id: Option<String>,
}

impl Default for StreamMetadata {
    fn default() -> Self {
        Self {
            version: VERSION_VALUE.to_string(),
            timestamp_pattern: None,
            timestamp_pattern_syntax: None,
            time_zone_id: None,
            reference_timestamp: None,
            variables_schema_id: None,
            variable_encoding_methods_id: None,
        }
    }
}

/// Appends the stream preamble for the given metadata.
pub fn write_preamble(metadata: &StreamMetadata, buf: &mut Vec<u8>) -> Result<()> {
    let body = serde_json::to_vec(metadata)
        .map_err(|err| IrError::DecodeError(format!("metadata serialization failed: {err}")))?;
    buf.push(ENCODING_JSON);
    if body.len() <= u8::MAX as usize {
        buf.push(METADATA_LEN_UBYTE);
        buf.push(body.len() as u8);
    } else if body.len() <= u16::MAX as usize {
        buf.push(METADATA_LEN_USHORT);
        buf.extend_from_slice(&(body.len() as u16).to_be_bytes());
    } else {
        return Err(IrError::ValueOutOfRange(format!(
            "stream metadata is {} bytes, limit is {}",
            body.len(),
            u16::MAX
        )));
    }
    buf.extend_from_slice(&body);
    Ok(())
}

/// Reads a stream preamble written by [`write_preamble`].
pub fn read_preamble<R: Read>(reader: &mut R) -> Result<StreamMetadata> {
    let encoding = wire::read_tag(reader)?;
    if encoding != ENCODING_JSON {
        return Err(IrError::UnknownTag(encoding));
    }
    let len = match wire::read_tag(reader)? {
        METADATA_LEN_UBYTE => wire::read_u8(reader)? as usize,
        METADATA_LEN_USHORT => wire::read_u16_be(reader)? as usize,
        other => return Err(IrError::UnknownTag(other)),
    };
    let mut body = vec![0u8; len];
    wire::read_exact(reader, &mut body)?;
    serde_json::from_slice(&body)
        .map_err(|err| IrError::DecodeError(format!("stream metadata is not valid JSON: {err}")))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn preamble_round_trip() {
        let mut metadata = StreamMetadata::default();
        metadata.timestamp_pattern = Some("%Y-%m-%dT%H:%M:%S".into());
        metadata.time_zone_id = Some("UTC".into());

        let mut buf = Vec::new();
        write_preamble(&metadata, &mut buf).unwrap();
        assert_eq!(buf[0], ENCODING_JSON);
        assert_eq!(buf[1], METADATA_LEN_UBYTE);

        let decoded = read_preamble(&mut Cursor::new(buf)).unwrap();
        assert_eq!(decoded, metadata);
        assert_eq!(decoded.version, VERSION_VALUE);
    }

    #[test]
    fn large_metadata_uses_the_short_length_form() {
        let mut metadata = StreamMetadata::default();
        metadata.reference_timestamp = Some("9".repeat(300));

        let mut buf = Vec::new();
        write_preamble(&metadata, &mut buf).unwrap();
        assert_eq!(buf[1], METADATA_LEN_USHORT);

        let decoded = read_preamble(&mut Cursor::new(buf)).unwrap();
        assert_eq!(decoded, metadata);
    }

    #[test]
    fn unknown_encoding_byte_is_rejected() {
        let bytes = vec![0x02, METADATA_LEN_UBYTE, 0x02, b'{', b'}'];
        assert!(matches!(
            read_preamble(&mut Cursor::new(bytes)),
            Err(IrError::UnknownTag(0x02))
        ));
    }

    #[test]
    fn serialized_keys_match_the_protocol_constants() {
        let metadata = StreamMetadata {
            timestamp_pattern: Some("p".into()),
            timestamp_pattern_syntax: Some("s".into()),
            time_zone_id: Some("z".into()),
            reference_timestamp: Some("0".into()),
            variables_schema_id: Some("v".into()),
            variable_encoding_methods_id: Some("m".into()),
            ..StreamMetadata::default()
        };
        let body = serde_json::to_value(&metadata).unwrap();
        for key in [
            VERSION_KEY,
            TIMESTAMP_PATTERN_KEY,
            TIMESTAMP_PATTERN_SYNTAX_KEY,
            TIME_ZONE_ID_KEY,
            REFERENCE_TIMESTAMP_KEY,
            VARIABLES_SCHEMA_ID_KEY,
            VARIABLE_ENCODING_METHODS_ID_KEY,
        ] {
            assert!(body.get(key).is_some(), "missing key {key}");
        }
    }
}
