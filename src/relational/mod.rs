use indexmap::IndexMap;

use crate::{BackendError, Value};

pub mod columns;
pub mod manager;

/// SQL type of a relational column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Serial,
    BigSerial,
    Integer,
    Text,
    VarChar(u32),
    Double,
    Float,
    Boolean,
    Date,
    DateTime,
}

/// Constraints and type of one column, used to render DDL text. Built with
/// the constructor/builder functions in [`columns`]; there is no reflection
/// over model types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub ty: ColumnType,
    pub primary_key: bool,
    pub unique: bool,
    pub nullable: bool,
    pub default: Option<String>,
}

/// Ordered column name to spec mapping for one table.
pub type TableSchema = IndexMap<String, ColumnSpec>;

/// Rows plus the column names reported by the driver, as returned by a
/// `SELECT`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// The opaque relational driver collaborator. Statements are parameterized
/// with `%s` placeholders; the connection is expected to be in autocommit
/// mode. Opened and closed by the caller, no pooling or reconnection.
pub trait SqlConnection {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, BackendError>;
    /// One batched statement executed once per parameter set.
    fn execute_batch(&mut self, sql: &str, param_sets: &[Vec<Value>]) -> Result<u64, BackendError>;
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult, BackendError>;
}

/// CRUD/DDL command builder bound to a single table and a caller-provided
/// connection. Holds no client-side row cache; every call round-trips.
#[derive(Debug)]
pub struct RelationalManager<C: SqlConnection> {
    table_name: String,
    connection: C,
}
