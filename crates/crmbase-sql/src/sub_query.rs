use crate::{context::StatementCreationContext, query::Query};

use crmbase_core::{
    driver::{Connection, DatabaseRecordSet},
    stmt::Value,
    Error, Result,
};

/// A child relation executed as its own statement, once per parent row.
///
/// The inner statement is compiled a single time with a bindable slot for
/// the parent key; execution rebinds that slot per parent row, so drivers
/// with a prepared-statement cache reuse the plan across all parents.
#[derive(Debug)]
pub struct SubQuery {
    query: Query,
    parent_alias: String,
    parent_key_field_id: Option<u32>,
    parent_replace_index: usize,
}

/// Per-parent child rows, aligned with the parent result set: entry `i`
/// holds the children of parent row `i`, empty when the parent has none.
#[derive(Debug)]
pub struct SubQueryResult {
    pub parent_replace_index: usize,
    pub child_rows: Vec<DatabaseRecordSet>,
}

impl SubQuery {
    pub(crate) fn new(
        query: Query,
        parent_alias: impl Into<String>,
        parent_key_field_id: Option<u32>,
        parent_replace_index: usize,
    ) -> Self {
        Self {
            query,
            parent_alias: parent_alias.into(),
            parent_key_field_id,
            parent_replace_index,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut Query {
        &mut self.query
    }

    /// Alias of the parent node in the outer statement.
    pub fn parent_alias(&self) -> &str {
        &self.parent_alias
    }

    /// Field of the parent row carrying the join key. `None` keys on the
    /// parent record id.
    pub fn parent_key_field_id(&self) -> Option<u32> {
        self.parent_key_field_id
    }

    pub fn set_max_rows_per_parent(&mut self, max: u32) {
        self.query.set_max_result_row_count(max);
    }

    /// Run the inner statement once per parent row. `parent_key_column` is
    /// the position of the join key inside the parent result set.
    pub fn execute(
        &mut self,
        conn: &mut dyn Connection,
        parent_rows: &DatabaseRecordSet,
        parent_key_column: usize,
    ) -> Result<SubQueryResult> {
        let mut ctx = StatementCreationContext::new();
        let Some(sql) = self.query.create_statement(&mut ctx, false) else {
            return Err(Error::statement_compile(
                ctx.error_text().unwrap_or("sub-query creation failed").to_string(),
            ));
        };
        let Some(position) = ctx.placeholder_position() else {
            return Err(Error::statement_compile(format!(
                "sub-query below {} has no bindable parent slot",
                self.parent_alias
            )));
        };

        tracing::debug!(
            sql = %sql,
            parents = parent_rows.row_count(),
            "executing per-parent sub-query"
        );

        let mut params = ctx.into_params();
        let mut child_rows = Vec::with_capacity(parent_rows.row_count());
        for row in parent_rows.rows() {
            let key = row.value(parent_key_column).cloned().unwrap_or(Value::Null);
            // Parents without a key value cannot have linked children.
            if key.is_empty() || key.is_placeholder() {
                child_rows.push(DatabaseRecordSet::default());
                continue;
            }
            params[position] = key;
            child_rows.push(conn.query(&sql, &params)?);
        }

        Ok(SubQueryResult {
            parent_replace_index: self.parent_replace_index,
            child_rows,
        })
    }
}
