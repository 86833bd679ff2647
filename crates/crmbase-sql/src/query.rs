use crate::{
    context::StatementCreationContext,
    fmt::Formatter,
    node::{NodeRelation, QueryTreeNode},
    sort::QuerySortField,
    sub_query::SubQueryResult,
};

use crmbase_core::{
    driver::Connection,
    schema::Schema,
    Error, Result,
};

use std::fmt::Write as _;
use std::sync::Arc;

/// A metadata-driven query over one information area and its related
/// areas, compiled into a single SQL statement plus optional per-parent
/// sub-queries.
#[derive(Debug)]
pub struct Query {
    schema: Arc<Schema>,
    root: QueryTreeNode,
    sort_fields: Vec<QuerySortField>,

    max_result_row_count: u32,
    skip_result_row_count: u32,
    collation_name: Option<String>,

    /// Resolve relations through registered virtual links and join them
    /// into the statement. Forces a DISTINCT projection when any virtual
    /// link is actually used, since the intermediate table fans out rows.
    use_virtual_links: bool,

    /// Exclude lookup rows of the root area. Initialized from the area's
    /// schema flag, overridable per query.
    ignore_lookup_on_root: bool,

    sort_fix_by_sort_info_and_code: bool,
    sort_var_by_sort_info: bool,
}

/// Rows of the outer statement plus the results of any per-parent
/// sub-queries, aligned row-by-row with the outer rows.
#[derive(Debug, Default)]
pub struct QueryResult {
    pub rows: crmbase_core::driver::DatabaseRecordSet,
    pub sub_results: Vec<SubQueryResult>,
}

impl Query {
    pub fn new(schema: Arc<Schema>, info_area_id: &str) -> Result<Self> {
        let area = schema.info_area(info_area_id).ok_or_else(|| {
            Error::statement_compile(format!("unknown information area {info_area_id}"))
        })?;
        let ignore_lookup = area.has_lookup_rows;

        let root = QueryTreeNode::new_root(info_area_id);
        Ok(Self::build(schema, root, ignore_lookup))
    }

    /// Wrap an existing tree, used when a one-to-many child is split off
    /// into its own statement. Lookup handling stays on the node flags the
    /// tree already carries.
    pub(crate) fn from_root(schema: Arc<Schema>, root: QueryTreeNode) -> Self {
        let ignore_lookup = root.ignore_lookup_rows();
        Self::build(schema, root, ignore_lookup)
    }

    fn build(schema: Arc<Schema>, root: QueryTreeNode, ignore_lookup: bool) -> Self {
        Self {
            schema,
            root,
            sort_fields: Vec::new(),
            max_result_row_count: 0,
            skip_result_row_count: 0,
            collation_name: None,
            use_virtual_links: false,
            ignore_lookup_on_root: ignore_lookup,
            sort_fix_by_sort_info_and_code: true,
            sort_var_by_sort_info: true,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn root(&self) -> &QueryTreeNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut QueryTreeNode {
        &mut self.root
    }

    pub fn node_mut(&mut self, alias: &str) -> Option<&mut QueryTreeNode> {
        self.root.find_node_mut(alias)
    }

    pub fn set_max_result_row_count(&mut self, max: u32) {
        self.max_result_row_count = max;
    }

    pub fn set_skip_result_row_count(&mut self, skip: u32) {
        self.skip_result_row_count = skip;
    }

    pub fn set_collation_name(&mut self, name: impl Into<String>) {
        self.collation_name = Some(name.into());
    }

    pub fn set_use_virtual_links(&mut self, on: bool) {
        self.use_virtual_links = on;
    }

    pub fn set_ignore_lookup_on_root(&mut self, on: bool) {
        self.ignore_lookup_on_root = on;
    }

    pub fn set_sort_fix_by_sort_info_and_code(&mut self, on: bool) {
        self.sort_fix_by_sort_info_and_code = on;
    }

    pub fn set_sort_var_by_sort_info(&mut self, on: bool) {
        self.sort_var_by_sort_info = on;
    }

    /// Add a relation node below the root. Returns the alias assigned to
    /// the new node.
    pub fn add_relation(&mut self, target_info_area_id: &str, link_id: Option<i32>) -> Result<String> {
        let root_alias = self.root.alias().to_string();
        self.add_relation_to(&root_alias, target_info_area_id, link_id)
    }

    /// Add a relation node below the node identified by `parent_alias`.
    ///
    /// Direct links win over virtual links. A registered virtual link is
    /// attached even when it is not expressible as joins; compilation then
    /// fails with a descriptive error rather than silently dropping the
    /// relation.
    pub fn add_relation_to(
        &mut self,
        parent_alias: &str,
        target_info_area_id: &str,
        link_id: Option<i32>,
    ) -> Result<String> {
        let parent = self
            .root
            .find_node(parent_alias)
            .ok_or_else(|| Error::statement_compile(format!("unknown query node {parent_alias}")))?;
        let parent_area_id = parent.info_area_id().to_string();
        let parent_area = self.schema.info_area(&parent_area_id).ok_or_else(|| {
            Error::statement_compile(format!("unknown information area {parent_area_id}"))
        })?;

        let relation = if let Some(link) = parent_area.link_to(target_info_area_id, link_id) {
            NodeRelation::Direct(link.clone())
        } else if let Some(vlink) = parent_area.virtual_link_to(target_info_area_id) {
            NodeRelation::Virtual(vlink.clone())
        } else {
            return Err(Error::statement_compile(format!(
                "no link from {parent_area_id} to {target_info_area_id}"
            )));
        };

        let alias = self.unique_alias(target_info_area_id);
        let child = QueryTreeNode::new(target_info_area_id, alias.clone(), Some(relation));

        let parent = self
            .root
            .find_node_mut(parent_alias)
            .ok_or_else(|| Error::statement_compile(format!("unknown query node {parent_alias}")))?;
        parent.add_sub_node(target_info_area_id, child);
        Ok(alias)
    }

    /// The next free alias for an area occurrence: the area id itself, then
    /// `<id>_2`, `<id>_3` and so on.
    fn unique_alias(&self, info_area_id: &str) -> String {
        if self.root.find_node(info_area_id).is_none() {
            return info_area_id.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{info_area_id}_{n}");
            if self.root.find_node(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Sort by a field of the node identified by `alias`.
    pub fn add_sort_field(&mut self, alias: &str, field_id: u32, descending: bool) -> Result<()> {
        let node = self
            .root
            .find_node(alias)
            .ok_or_else(|| Error::statement_compile(format!("unknown query node {alias}")))?;
        let is_root = alias == self.root.alias();
        let sort_field = QuerySortField::new(
            &self.schema,
            node.info_area_id(),
            alias,
            is_root,
            field_id,
            descending,
        )?;
        self.sort_fields.push(sort_field);
        Ok(())
    }

    pub(crate) fn adopt_sort_field(&mut self, sort_field: QuerySortField) {
        self.sort_fields.push(sort_field);
    }

    /// Hand sort fields anchored inside a split-off subtree to that
    /// sub-query, so the requested ordering is applied by its own
    /// statement instead of being dropped.
    fn move_sort_fields_into_sub_queries(&mut self) {
        if !self.root.has_sub_queries() {
            return;
        }
        let mut moved = Vec::new();
        let mut kept = Vec::new();
        for sort_field in std::mem::take(&mut self.sort_fields) {
            match sub_query_anchor(&self.root, sort_field.node_alias()) {
                Some(child_alias) => moved.push((child_alias.to_string(), sort_field)),
                None => kept.push(sort_field),
            }
        }
        self.sort_fields = kept;
        for (child_alias, sort_field) in moved {
            if let Some(sub_query) = self
                .root
                .find_node_mut(&child_alias)
                .and_then(|node| node.sub_query_mut())
            {
                sub_query.query_mut().adopt_sort_field(sort_field);
            }
        }
    }

    /// Compile the tree into SQL. Returns `None` and records the problem in
    /// `ctx` when the tree cannot be expressed; partial SQL is never handed
    /// out.
    pub fn create_statement(
        &mut self,
        ctx: &mut StatementCreationContext,
        count_only: bool,
    ) -> Option<String> {
        ctx.collation_name = self.collation_name.clone();
        ctx.sort_fix_by_sort_info_and_code = self.sort_fix_by_sort_info_and_code;
        ctx.sort_var_by_sort_info = self.sort_var_by_sort_info;

        self.root.set_ignore_lookup_rows(self.ignore_lookup_on_root);

        // Join-vs-subquery decisions come first; projection and FROM depend
        // on which children remain in this statement.
        let schema = self.schema.clone();
        self.root.check_sub_queries(&schema, self.use_virtual_links, ctx);
        if ctx.has_error() {
            return None;
        }
        self.move_sort_fields_into_sub_queries();

        let needs_distinct = self.use_virtual_links && self.root.needs_virtual_links();

        let mut sql = String::new();
        let mut formatter = Formatter {
            dst: &mut sql,
            ctx,
        };
        let f = &mut formatter;

        let count_wrapped = count_only && needs_distinct;
        if count_only && !needs_distinct {
            fmt!(f, "SELECT COUNT(*)");
        } else {
            if count_wrapped {
                fmt!(f, "SELECT COUNT(*) FROM (");
            }
            fmt!(f, "SELECT ");
            if needs_distinct {
                fmt!(f, "DISTINCT ");
            }
            let mut first = true;
            self.root.add_columns(&schema, f, &mut first);
        }

        fmt!(f, " FROM ");
        self.root.add_to_from(&schema, f);
        if f.ctx.has_error() {
            return None;
        }

        // Sort fields anchored on a split-off node were handed to its
        // sub-query above; anything left must resolve in this statement.
        let eligible: Vec<&QuerySortField> = self
            .sort_fields
            .iter()
            .filter(|s| {
                self.root
                    .find_node(s.node_alias())
                    .is_some_and(|n| n.sub_query().is_none())
            })
            .collect();

        for sort_field in &eligible {
            sort_field.add_to_from(f);
        }

        if self.root.has_where_content() {
            fmt!(f, " WHERE ");
            let mut first = true;
            self.root.add_to_where(&schema, f, &mut first);
            if f.ctx.has_error() {
                return None;
            }
        }

        if !count_only && !eligible.is_empty() {
            fmt!(f, " ORDER BY " crate::fmt::Comma(eligible.iter().copied()));
        }

        if self.max_result_row_count > 0 {
            write!(f.dst, " LIMIT {}", self.max_result_row_count).unwrap();
            if self.skip_result_row_count > 0 {
                write!(f.dst, ", {}", self.skip_result_row_count).unwrap();
            }
        }

        if count_wrapped {
            fmt!(f, ")");
        }

        if f.ctx.has_error() {
            return None;
        }
        drop(formatter);
        Some(sql)
    }

    /// Compile and run the statement, then any per-parent sub-queries.
    pub fn execute(&mut self, conn: &mut dyn Connection, count_only: bool) -> Result<QueryResult> {
        let mut ctx = StatementCreationContext::new();
        let Some(sql) = self.create_statement(&mut ctx, count_only) else {
            return Err(Error::statement_compile(
                ctx.error_text().unwrap_or("statement creation failed").to_string(),
            ));
        };

        tracing::debug!(sql = %sql, params = ctx.params().len(), "executing query");

        let params = ctx.into_params();
        let rows = conn.query(&sql, &params)?;

        let mut result = QueryResult {
            rows,
            sub_results: Vec::new(),
        };
        if !count_only && result.rows.row_count() > 0 && self.root.has_sub_queries() {
            self.execute_sub_queries(conn, &mut result)?;
        }
        Ok(result)
    }

    /// Run the query in count mode and read the scalar. No rows means zero.
    pub fn count(&mut self, conn: &mut dyn Connection) -> Result<i64> {
        let result = self.execute(conn, true)?;
        match result.rows.row(0).and_then(|r| r.value(0)) {
            Some(value) => value.to_i64(),
            None => Ok(0),
        }
    }

    fn execute_sub_queries(
        &mut self,
        conn: &mut dyn Connection,
        result: &mut QueryResult,
    ) -> Result<()> {
        // Resolve parent key columns against the outer projection before
        // taking mutable borrows of the tree.
        let mut jobs = Vec::new();
        collect_sub_query_jobs(&self.schema, &self.root, &mut jobs)?;

        for (child_alias, key_column) in jobs {
            let node = self
                .root
                .find_node_mut(&child_alias)
                .ok_or_else(|| Error::statement_compile(format!("unknown query node {child_alias}")))?;
            let sub_query = node.sub_query_mut().ok_or_else(|| {
                Error::statement_compile(format!("node {child_alias} lost its sub-query"))
            })?;
            let sub_result = sub_query.execute(conn, &result.rows, key_column)?;
            result.sub_results.push(sub_result);
        }
        Ok(())
    }

    /// Position of a node's column inside the outer projection: `None`
    /// field means the record id, otherwise the declared field's slot.
    pub fn column_index_of(&self, alias: &str, field_id: Option<u32>) -> Option<usize> {
        let mut offset = 0;
        column_index_walk(&self.schema, &self.root, alias, field_id, &mut offset)
    }
}

/// Alias of the node carrying the sub-query whose inner tree contains
/// `alias`, if any.
fn sub_query_anchor<'a>(node: &'a QueryTreeNode, alias: &str) -> Option<&'a str> {
    for child in node.children() {
        if let Some(sub_query) = child.sub_query() {
            if sub_query.query().root().find_node(alias).is_some() {
                return Some(child.alias());
            }
        } else if let Some(found) = sub_query_anchor(child, alias) {
            return Some(found);
        }
    }
    None
}

fn column_index_walk(
    schema: &Schema,
    node: &QueryTreeNode,
    alias: &str,
    field_id: Option<u32>,
    offset: &mut usize,
) -> Option<usize> {
    if node.sub_query().is_some() {
        return None;
    }
    let area = schema.info_area(node.info_area_id())?;
    if node.alias() == alias {
        return match field_id {
            None => Some(*offset),
            Some(id) => {
                let pos = area.fields.iter().position(|f| f.field_id == id)?;
                Some(*offset + 1 + pos)
            }
        };
    }
    *offset += 1 + area.fields.len();
    for child in node.children() {
        if let Some(found) = column_index_walk(schema, child, alias, field_id, offset) {
            return Some(found);
        }
    }
    None
}

fn collect_sub_query_jobs(
    schema: &Arc<Schema>,
    root: &QueryTreeNode,
    jobs: &mut Vec<(String, usize)>,
) -> Result<()> {
    fn walk(
        schema: &Arc<Schema>,
        root: &QueryTreeNode,
        node: &QueryTreeNode,
        jobs: &mut Vec<(String, usize)>,
    ) -> Result<()> {
        for child in node.children() {
            if let Some(sub_query) = child.sub_query() {
                let parent_alias = sub_query.parent_alias().to_string();
                let key_field = sub_query.parent_key_field_id();
                let key_column = column_index_in(schema, root, &parent_alias, key_field)
                    .ok_or_else(|| {
                        Error::statement_compile(format!(
                            "sub-query parent key of {} is not part of the projection",
                            child.alias()
                        ))
                    })?;
                jobs.push((child.alias().to_string(), key_column));
            } else {
                walk(schema, root, child, jobs)?;
            }
        }
        Ok(())
    }

    fn column_index_in(
        schema: &Schema,
        root: &QueryTreeNode,
        alias: &str,
        field_id: Option<u32>,
    ) -> Option<usize> {
        let mut offset = 0;
        column_index_walk(schema, root, alias, field_id, &mut offset)
    }

    walk(schema, root, root, jobs)
}
