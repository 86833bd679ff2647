use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};

use crmbase_core::stmt::Value as CoreValue;

/// Binding adapter between core values and the SQLite parameter API.
#[derive(Debug)]
pub(crate) struct SqliteValue<'a>(pub(crate) &'a CoreValue);

impl ToSql for SqliteValue<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self.0 {
            CoreValue::Null => Ok(ToSqlOutput::Owned(SqlValue::Null)),
            CoreValue::String(v) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes()))),
            CoreValue::I64(v) => Ok(ToSqlOutput::Owned(SqlValue::Integer(*v))),
            CoreValue::F64(v) => Ok(ToSqlOutput::Owned(SqlValue::Real(*v))),
            // An unfilled sub-query slot reaching the engine is a bug in the
            // caller, not data.
            CoreValue::Placeholder => Err(rusqlite::Error::ToSqlConversionFailure(
                "cannot bind an unresolved placeholder".into(),
            )),
        }
    }
}

/// Decode one result cell into a core value.
pub(crate) fn value_from_ref(value: ValueRef<'_>) -> CoreValue {
    match value {
        ValueRef::Null => CoreValue::Null,
        ValueRef::Integer(v) => CoreValue::I64(v),
        ValueRef::Real(v) => CoreValue::F64(v),
        ValueRef::Text(v) => CoreValue::String(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => CoreValue::String(String::from_utf8_lossy(v).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn placeholder_does_not_bind() {
        assert!(SqliteValue(&CoreValue::Placeholder).to_sql().is_err());
        assert!(SqliteValue(&CoreValue::from("x")).to_sql().is_ok());
    }

    #[test]
    fn ref_decoding() {
        assert_eq!(value_from_ref(ValueRef::Null), CoreValue::Null);
        assert_eq!(value_from_ref(ValueRef::Integer(7)), CoreValue::I64(7));
        assert_eq!(
            value_from_ref(ValueRef::Text(b"hello")),
            CoreValue::from("hello")
        );
    }
}
