use std::io;

use thiserror::Error;

use crate::tree::NodeId;

pub type Result<T> = std::result::Result<T, IrError>;

/// Every failure the codec can surface. Framing errors poison the stream;
/// semantic errors indicate misuse of the schema tree or value accessors.
#[derive(Debug, Error)]
pub enum IrError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("unknown tag 0x{0:02x}")]
    UnknownTag(u8),
    #[error("corrupted stream: {0}")]
    CorruptedStream(String),
    #[error("incomplete stream: ran out of bytes mid-record")]
    IncompleteStream,
    #[error("cannot read {expected} out of a {actual} value")]
    InvalidTypeConvert {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("schema node references non-existent parent {0}")]
    InvalidParent(NodeId),
    #[error("schema node already exists with id {0}")]
    AlreadyExists(NodeId),
    #[error("revert called without taking a snapshot")]
    NoSnapshot,
    #[error("schema node id {0} is out of bounds")]
    OutOfBounds(NodeId),
    #[error("value out of encoding range: {0}")]
    ValueOutOfRange(String),
    #[error("decode error: {0}")]
    DecodeError(String),
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
}
