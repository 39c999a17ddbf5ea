//! # rowlab
//!
//! File-backed, relational and key-value data operators sharing one
//! row-oriented data model. Each operator owns a single backing resource
//! (file path, table, key namespace) and presents a uniform CRUD surface
//! over it.

use std::fmt::{Debug, Display};
use std::io;
use std::path::PathBuf;
use std::sync::Once;
use thiserror::Error;

use indexmap::IndexMap;

pub mod codec;
pub mod kv;
pub mod meta;
pub mod operator;
pub mod relational;

#[derive(Error, Debug)]
pub enum OrmError {
    #[error("invalid file name or extension: {0}")]
    Validation(String),
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("malformed data: {0}")]
    MalformedData(String),
    #[error("row does not match the expected column set: {0}")]
    SchemaMismatch(String),
    #[error("backend error")]
    Backend(#[from] BackendError),
    #[error("IOError")]
    IOError(#[from] io::Error),
    #[error("JSON error")]
    JsonError(#[from] serde_json::Error),
    #[error("CSV error")]
    CsvError(#[from] csv::Error),
}

/// Errors surfaced by an external backend driver (relational or key-value).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("undefined table: {0}")]
    UndefinedTable(String),
    #[error("undefined column: {0}")]
    UndefinedColumn(String),
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Process-wide logging setup. Safe to call more than once, only the first
/// call has an effect.
pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = env_logger::Builder::from_default_env()
            .format_timestamp_secs()
            .try_init();
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int = 0,
    Float,
    Bool,
    Text,
    Null,
}

impl ValueKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ValueKind::Int => "integer",
            ValueKind::Float => "float",
            ValueKind::Bool => "boolean",
            ValueKind::Text => "text",
            ValueKind::Null => "null",
        }
    }
}

/// A single cell. Rows are untyped mappings, so every cell carries its own
/// tag. CSV files always load as [`Value::Text`]; no coercion is applied
/// when matching.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Null,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Bool(_) => ValueKind::Bool,
            Value::Text(_) => ValueKind::Text,
            Value::Null => ValueKind::Null,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Value::from(*f),
            Value::Bool(b) => serde_json::Value::from(*b),
            Value::Text(s) => serde_json::Value::from(s.as_str()),
            Value::Null => serde_json::Value::Null,
        }
    }

    /// Nested arrays and objects collapse to their compact JSON text.
    pub fn from_json(value: &serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            nested => Value::Text(nested.to_string()),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(num) => write!(f, "{}", num),
            Value::Float(num) => write!(f, "{}", num),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Text(st) => write!(f, "{}", st),
            Value::Null => Ok(()),
        }
    }
}

impl TryInto<i64> for Value {
    type Error = OrmError;

    fn try_into(self) -> Result<i64, Self::Error> {
        match self {
            Value::Int(i) => Ok(i),
            other => Err(OrmError::MalformedData(format!(
                "expected integer, got {}",
                other.kind().type_name()
            ))),
        }
    }
}

impl TryInto<f64> for Value {
    type Error = OrmError;

    fn try_into(self) -> Result<f64, Self::Error> {
        match self {
            Value::Float(f) => Ok(f),
            other => Err(OrmError::MalformedData(format!(
                "expected float, got {}",
                other.kind().type_name()
            ))),
        }
    }
}

impl TryInto<bool> for Value {
    type Error = OrmError;

    fn try_into(self) -> Result<bool, Self::Error> {
        match self {
            Value::Bool(b) => Ok(b),
            other => Err(OrmError::MalformedData(format!(
                "expected boolean, got {}",
                other.kind().type_name()
            ))),
        }
    }
}

impl TryInto<String> for Value {
    type Error = OrmError;

    fn try_into(self) -> Result<String, Self::Error> {
        match self {
            Value::Text(s) => Ok(s),
            other => Err(OrmError::MalformedData(format!(
                "expected text, got {}",
                other.kind().type_name()
            ))),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

/// One record, column order preserved.
pub type Row = IndexMap<String, Value>;

/// Build a [`Row`] from literal pairs.
pub fn row<K: Into<String>, V: Into<Value>>(pairs: impl IntoIterator<Item = (K, V)>) -> Row {
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
