use crate::{stmt::Value, Result};

/// The storage type of a result column, as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Blob,
    Unknown,
}

/// Name and type metadata for one result column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    pub name: String,
    pub ty: ColumnType,
}

/// One materialized result row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseRow {
    values: Vec<Value>,
}

impl DatabaseRow {
    pub fn from_vec(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

/// A fully materialized result set with column metadata.
#[derive(Debug, Clone, Default)]
pub struct DatabaseRecordSet {
    columns: Vec<ColumnMeta>,
    rows: Vec<DatabaseRow>,
}

impl DatabaseRecordSet {
    pub fn new(columns: Vec<ColumnMeta>, rows: Vec<DatabaseRow>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, index: usize) -> Option<&DatabaseRow> {
        self.rows.get(index)
    }

    pub fn rows(&self) -> impl Iterator<Item = &DatabaseRow> {
        self.rows.iter()
    }

    pub fn take_row(&mut self, index: usize) -> Option<DatabaseRow> {
        if index < self.rows.len() {
            Some(self.rows.remove(index))
        } else {
            None
        }
    }
}

/// The narrow interface the compiler consumes from the relational engine.
///
/// The core never touches statement handles directly. Implementations own
/// prepare/bind/step/finalize and must release transiently acquired handles
/// on every exit path. All calls are synchronous and run to completion.
pub trait Connection {
    /// Execute a non-query statement, returning the affected row count.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Execute a query and materialize every row.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<DatabaseRecordSet>;

    /// Execute a query and return column 0 of the first row, if any.
    fn query_scalar(&mut self, sql: &str, params: &[Value]) -> Result<Option<Value>>;

    /// Prepare a statement only to introspect its result columns. The
    /// underlying handle is released before this returns.
    fn prepare_meta(&mut self, sql: &str) -> Result<Vec<ColumnMeta>>;

    /// Begin a transaction. When one is already open it is committed first,
    /// then a fresh transaction starts.
    fn begin_transaction(&mut self) -> Result<()>;

    /// Commit the open transaction. A no-op when none is open.
    fn commit(&mut self) -> Result<()>;
}
