use crate::clp::{ClpString4, ClpString8};
use crate::error::{IrError, Result};
use crate::json;

/// A single decoded leaf value. The "empty object" slot is represented as
/// `None` in the deserializer's output vector, so it never appears here and
/// stays distinct from `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    ClpStr4(ClpString4),
    ClpStr8(ClpString8),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::ClpStr4(_) | Value::ClpStr8(_) => "CLP string",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_clp_str(&self) -> bool {
        matches!(self, Value::ClpStr4(_) | Value::ClpStr8(_))
    }

    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(v) => Ok(*v),
            other => Err(IrError::InvalidTypeConvert {
                expected: "int",
                actual: other.kind(),
            }),
        }
    }

    pub fn as_float(&self) -> Result<f64> {
        match self {
            Value::Float(v) => Ok(*v),
            other => Err(IrError::InvalidTypeConvert {
                expected: "float",
                actual: other.kind(),
            }),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(v) => Ok(*v),
            other => Err(IrError::InvalidTypeConvert {
                expected: "bool",
                actual: other.kind(),
            }),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(IrError::InvalidTypeConvert {
                expected: "string",
                actual: other.kind(),
            }),
        }
    }

    /// Projects the value to a JSON-compatible string. Strings are quoted
    /// and escaped; CLP strings are decoded first.
    pub fn dump(&self) -> Result<String> {
        match self {
            Value::Null => Ok("null".to_string()),
            Value::Int(v) => Ok(v.to_string()),
            Value::Float(v) => Ok(json::format_f64(*v)),
            Value::Bool(v) => Ok(if *v { "true" } else { "false" }.to_string()),
            Value::Str(s) => {
                let mut out = String::new();
                json::escape_and_append(s.as_bytes(), &mut out)?;
                Ok(out)
            }
            Value::ClpStr4(clp) => {
                let mut out = String::new();
                json::escape_and_append(clp.decode()?.as_bytes(), &mut out)?;
                Ok(out)
            }
            Value::ClpStr8(clp) => {
                let mut out = String::new();
                json::escape_and_append(clp.decode()?.as_bytes(), &mut out)?;
                Ok(out)
            }
        }
    }
}
