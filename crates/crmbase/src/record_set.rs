use crmbase_core::driver::{DatabaseRecordSet, DatabaseRow};
use crmbase_sql::QueryResult;

/// Thin view over a query result: the outer rows plus, per outer row, the
/// child row sets produced by sub-query execution.
#[derive(Debug, Default)]
pub struct GenericRecordSet {
    result: QueryResult,
}

impl GenericRecordSet {
    pub fn new(result: QueryResult) -> Self {
        Self { result }
    }

    pub fn row_count(&self) -> usize {
        self.result.rows.row_count()
    }

    pub fn row(&self, index: usize) -> Option<&DatabaseRow> {
        self.result.rows.row(index)
    }

    pub fn rows(&self) -> &DatabaseRecordSet {
        &self.result.rows
    }

    /// Child row sets attached to one outer row, one entry per executed
    /// sub-query. A parent without children yields empty sets, never fewer
    /// entries.
    pub fn children_of(&self, parent_index: usize) -> impl Iterator<Item = &DatabaseRecordSet> {
        self.result
            .sub_results
            .iter()
            .filter_map(move |sub| sub.child_rows.get(parent_index))
    }

    pub fn into_inner(self) -> QueryResult {
        self.result
    }
}

impl From<QueryResult> for GenericRecordSet {
    fn from(result: QueryResult) -> Self {
        Self::new(result)
    }
}
