mod value;
use value::{value_from_ref, SqliteValue};

use crmbase_core::{
    driver::{ColumnMeta, ColumnType, DatabaseRecordSet, DatabaseRow},
    schema::TableMetaInfo,
    stmt::Value,
    Error, Result,
};

use rusqlite::Connection as RusqliteConnection;
use std::path::Path;

/// Synchronous SQLite connection backing the record and query layers.
///
/// Statements are prepared through the rusqlite statement cache, so the
/// per-parent statements of sub-query execution reuse one compiled plan.
/// Statement handles only live inside the method that acquired them.
#[derive(Debug)]
pub struct Connection {
    connection: RusqliteConnection,
    tx_open: bool,
}

impl Connection {
    pub fn in_memory() -> Result<Self> {
        let connection =
            RusqliteConnection::open_in_memory().map_err(Error::driver_operation_failed)?;
        Ok(Self {
            connection,
            tx_open: false,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = RusqliteConnection::open(path).map_err(Error::driver_operation_failed)?;
        Ok(Self {
            connection,
            tx_open: false,
        })
    }

    /// Introspect a physical table's columns, ready for name lookups.
    pub fn table_meta(&mut self, table: &str) -> Result<TableMetaInfo> {
        let stmt = self
            .connection
            .prepare(&format!("SELECT * FROM {table} LIMIT 0"))
            .map_err(Error::driver_operation_failed)?;
        let mut meta = TableMetaInfo::new(table);
        for column in stmt.columns() {
            meta.add_field(column.name(), column_type_from_decl(column.decl_type()));
        }
        meta.sort();
        Ok(meta)
    }
}

impl crmbase_core::driver::Connection for Connection {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        tracing::trace!(sql = %sql, "execute");
        let mut stmt = self
            .connection
            .prepare_cached(sql)
            .map_err(Error::driver_operation_failed)?;
        let bound: Vec<SqliteValue<'_>> = params.iter().map(SqliteValue).collect();
        let count = stmt
            .execute(rusqlite::params_from_iter(bound))
            .map_err(Error::driver_operation_failed)?;
        Ok(count as u64)
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<DatabaseRecordSet> {
        tracing::trace!(sql = %sql, "query");
        let mut stmt = self
            .connection
            .prepare_cached(sql)
            .map_err(Error::driver_operation_failed)?;
        let columns = read_columns(&stmt);

        let bound: Vec<SqliteValue<'_>> = params.iter().map(SqliteValue).collect();
        let mut rows = stmt
            .query(rusqlite::params_from_iter(bound))
            .map_err(Error::driver_operation_failed)?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(Error::driver_operation_failed)? {
            let mut values = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                let cell = row.get_ref(index).map_err(Error::driver_operation_failed)?;
                values.push(value_from_ref(cell));
            }
            out.push(DatabaseRow::from_vec(values));
        }
        Ok(DatabaseRecordSet::new(columns, out))
    }

    fn query_scalar(&mut self, sql: &str, params: &[Value]) -> Result<Option<Value>> {
        let rows = crmbase_core::driver::Connection::query(self, sql, params)?;
        Ok(rows.row(0).and_then(|r| r.value(0)).cloned())
    }

    fn prepare_meta(&mut self, sql: &str) -> Result<Vec<ColumnMeta>> {
        // Deliberately uncached: the handle is introspected and released.
        let stmt = self
            .connection
            .prepare(sql)
            .map_err(Error::driver_operation_failed)?;
        Ok(read_columns(&stmt))
    }

    fn begin_transaction(&mut self) -> Result<()> {
        if self.tx_open {
            self.connection
                .execute_batch("COMMIT")
                .map_err(Error::driver_operation_failed)?;
        }
        self.connection
            .execute_batch("BEGIN")
            .map_err(Error::driver_operation_failed)?;
        self.tx_open = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.tx_open {
            return Ok(());
        }
        self.connection
            .execute_batch("COMMIT")
            .map_err(Error::driver_operation_failed)?;
        self.tx_open = false;
        Ok(())
    }
}

fn read_columns(stmt: &rusqlite::Statement<'_>) -> Vec<ColumnMeta> {
    stmt.columns()
        .iter()
        .map(|column| ColumnMeta {
            name: column.name().to_string(),
            ty: column_type_from_decl(column.decl_type()),
        })
        .collect()
}

/// SQLite type affinity, in the order the engine applies it.
fn column_type_from_decl(decl: Option<&str>) -> ColumnType {
    let Some(decl) = decl else {
        return ColumnType::Unknown;
    };
    let decl = decl.to_ascii_uppercase();
    if decl.contains("INT") {
        ColumnType::Integer
    } else if decl.contains("CHAR") || decl.contains("CLOB") || decl.contains("TEXT") {
        ColumnType::Text
    } else if decl.contains("BLOB") {
        ColumnType::Blob
    } else if decl.contains("REAL") || decl.contains("FLOA") || decl.contains("DOUB") {
        ColumnType::Real
    } else {
        ColumnType::Unknown
    }
}
