#![forbid(unsafe_code)]
//! A self-describing binary IR stream for semi-structured records.
//!
//! Producers serialize an unbounded sequence of JSON-shaped records into a
//! compact tagged byte stream that carries its own schema inline: every
//! newly observed (key-path, type) combination is introduced once as a
//! schema-tree delta, and records thereafter reference their leaves by id.
//! Consumers replay the stream, growing an identical schema tree and
//! recovering each record as a `(schema, values)` pair that can be
//! re-rendered as JSON.
//!
//! The stream is designed to be appended to a file or piped through a
//! byte-level compressor: the end of a stream is marked explicitly and a
//! truncated stream is detected rather than misread.

pub mod buffer;
pub mod clp;
pub mod de;
pub mod error;
pub mod json;
pub mod metadata;
pub mod model;
pub mod ser;
pub mod tree;
pub mod wire;

pub use crate::buffer::SerializationBuffer;
pub use crate::clp::{ClpString, ClpString4, ClpString8};
pub use crate::de::{deserialize_next_record, NextRecord};
pub use crate::error::{IrError, Result};
pub use crate::json::record_to_json;
pub use crate::metadata::StreamMetadata;
pub use crate::model::Value;
pub use crate::ser::{serialize_end_of_stream, serialize_record};
pub use crate::tree::{NodeId, NodeLocator, NodeType, SchemaNode, SchemaTree, ROOT_ID};
