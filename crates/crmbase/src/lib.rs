mod record;
pub use record::Record;

mod record_set;
pub use record_set::GenericRecordSet;

mod template;
pub use template::RecordTemplate;

pub use crmbase_core::{
    driver::Connection,
    schema::{self, RecordIdentifier, Schema},
    stmt::Value,
    Error, Result,
};
pub use crmbase_sql::{
    CompareOp, Condition, ExistsCondition, Query, QueryResult, StatementCreationContext,
};
