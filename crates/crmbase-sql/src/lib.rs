#[macro_use]
mod fmt;

mod condition;
pub use condition::{CompareOp, Condition, ExistsCondition};

mod context;
pub use context::StatementCreationContext;

mod node;
pub use node::{NodeRelation, QueryTreeNode};

mod query;
pub use query::{Query, QueryResult};

mod sort;
pub use sort::QuerySortField;

mod sub_query;
pub use sub_query::{SubQuery, SubQueryResult};
