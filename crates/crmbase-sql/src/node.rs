use crate::{
    condition::{Condition, ExistsCondition},
    context::StatementCreationContext,
    fmt::Formatter,
    query::Query,
    sub_query::SubQuery,
};

use crmbase_core::{
    schema::{columns, LinkInfo, RelationType, Schema, VirtualLinkInfo},
    stmt::Value,
};

use std::sync::Arc;

/// How a node is connected to its parent in the FROM clause.
#[derive(Debug, Clone)]
pub enum NodeRelation {
    Direct(LinkInfo),
    Virtual(VirtualLinkInfo),
}

/// One occurrence of an information area in the statement under
/// compilation, together with its child relation nodes.
///
/// Nodes form a rooted ownership tree: every node is owned by exactly one
/// parent (or by the query, for the root) and is destroyed with it. Sharing
/// a node between two statements would corrupt alias assignment and
/// sub-query attachment, so the type is deliberately not `Clone`.
#[derive(Debug)]
pub struct QueryTreeNode {
    info_area_id: String,
    alias: String,
    relation: Option<NodeRelation>,
    relation_name: String,
    children: Vec<QueryTreeNode>,
    condition: Option<Condition>,
    exists_conditions: Vec<ExistsCondition>,
    ignore_lookup_rows: bool,
    sub_query: Option<Box<SubQuery>>,
    link_record_value: Option<Value>,
}

impl QueryTreeNode {
    pub fn new_root(info_area_id: impl Into<String>) -> Self {
        let info_area_id = info_area_id.into();
        let alias = info_area_id.clone();
        Self::new(info_area_id, alias, None)
    }

    pub fn new(
        info_area_id: impl Into<String>,
        alias: impl Into<String>,
        relation: Option<NodeRelation>,
    ) -> Self {
        Self {
            info_area_id: info_area_id.into(),
            alias: alias.into(),
            relation,
            relation_name: String::new(),
            children: Vec::new(),
            condition: None,
            exists_conditions: Vec::new(),
            ignore_lookup_rows: false,
            sub_query: None,
            link_record_value: None,
        }
    }

    pub fn info_area_id(&self) -> &str {
        &self.info_area_id
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn relation(&self) -> Option<&NodeRelation> {
        self.relation.as_ref()
    }

    pub fn relation_name(&self) -> &str {
        &self.relation_name
    }

    pub fn children(&self) -> &[QueryTreeNode] {
        &self.children
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    pub fn set_condition(&mut self, condition: Condition) {
        self.condition = Some(condition);
    }

    pub fn add_exists_condition(&mut self, condition: ExistsCondition) {
        self.exists_conditions.push(condition);
    }

    pub fn has_exists_conditions(&self) -> bool {
        !self.exists_conditions.is_empty()
    }

    pub fn ignore_lookup_rows(&self) -> bool {
        self.ignore_lookup_rows
    }

    pub fn set_ignore_lookup_rows(&mut self, ignore: bool) {
        self.ignore_lookup_rows = ignore;
    }

    pub fn sub_query(&self) -> Option<&SubQuery> {
        self.sub_query.as_deref()
    }

    pub(crate) fn sub_query_mut(&mut self) -> Option<&mut SubQuery> {
        self.sub_query.as_deref_mut()
    }

    pub(crate) fn set_link_record_value(&mut self, value: Value) {
        self.link_record_value = Some(value);
    }

    /// Attach a child relation node. The child keeps its alias; callers
    /// going through [`Query`](crate::Query) get collision-free aliases.
    pub fn add_sub_node(
        &mut self,
        relation_name: impl Into<String>,
        mut child: QueryTreeNode,
    ) -> &mut QueryTreeNode {
        child.relation_name = relation_name.into();
        self.children.push(child);
        self.children.last_mut().unwrap()
    }

    pub fn find_node(&self, alias: &str) -> Option<&QueryTreeNode> {
        if self.alias == alias {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_node(alias))
    }

    pub(crate) fn find_node_mut(&mut self, alias: &str) -> Option<&mut QueryTreeNode> {
        if self.alias == alias {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|c| c.find_node_mut(alias))
    }

    /// True when any joined node in this subtree is reached via a virtual
    /// link. Sub-query subtrees run as their own statements and do not
    /// count here.
    pub(crate) fn needs_virtual_links(&self) -> bool {
        if self.sub_query.is_some() {
            return false;
        }
        matches!(self.relation, Some(NodeRelation::Virtual(_)))
            || self.children.iter().any(|c| c.needs_virtual_links())
    }

    pub(crate) fn has_sub_queries(&self) -> bool {
        self.children
            .iter()
            .any(|c| c.sub_query.is_some() || c.has_sub_queries())
    }

    /// Finalize join-vs-subquery decisions before the FROM clause is
    /// emitted. A child reached over a one-to-many link would duplicate
    /// every parent column per child row, so it is split off into a
    /// per-parent sub-query unless virtual-link mode already forces a
    /// DISTINCT projection.
    pub(crate) fn check_sub_queries(
        &mut self,
        schema: &Arc<Schema>,
        use_virtual_links: bool,
        ctx: &mut StatementCreationContext,
    ) {
        let parent_alias = self.alias.clone();
        for (index, child) in self.children.iter_mut().enumerate() {
            if child.sub_query.is_some() {
                continue;
            }
            let one_to_many = matches!(
                &child.relation,
                Some(NodeRelation::Direct(link)) if link.relation_type == RelationType::OneToMany
            );
            if one_to_many && !use_virtual_links {
                child.convert_to_sub_query(schema, &parent_alias, index, ctx);
            } else {
                child.check_sub_queries(schema, use_virtual_links, ctx);
            }
        }
    }

    fn convert_to_sub_query(
        &mut self,
        schema: &Arc<Schema>,
        parent_alias: &str,
        child_index: usize,
        ctx: &mut StatementCreationContext,
    ) {
        let Some(NodeRelation::Direct(link)) = self.relation.clone() else {
            ctx.set_error(format!(
                "cannot execute relation to {} as sub-query",
                self.info_area_id
            ));
            return;
        };

        // The inner root keeps this node's alias, so sort fields resolved
        // against the outer tree stay addressable after the split.
        let mut inner_root = QueryTreeNode::new(
            self.info_area_id.clone(),
            self.alias.clone(),
            self.relation.clone(),
        );
        inner_root.link_record_value = Some(Value::Placeholder);
        inner_root.children = std::mem::take(&mut self.children);
        inner_root.condition = self.condition.take();
        inner_root.exists_conditions = std::mem::take(&mut self.exists_conditions);
        inner_root.ignore_lookup_rows = self.ignore_lookup_rows;

        // Field-based links key on the parent's source field value; column
        // links key on the parent record id.
        let parent_key_field_id = link.source_field_id;

        let query = Query::from_root(schema.clone(), inner_root);
        self.sub_query = Some(Box::new(SubQuery::new(
            query,
            parent_alias,
            parent_key_field_id,
            child_index,
        )));
    }

    pub(crate) fn add_columns(&self, schema: &Schema, f: &mut Formatter<'_>, first: &mut bool) {
        if self.sub_query.is_some() {
            return;
        }
        let Some(area) = schema.info_area(&self.info_area_id) else {
            f.ctx
                .set_error(format!("unknown information area {}", self.info_area_id));
            return;
        };

        fn sep(f: &mut Formatter<'_>, first: &mut bool) {
            if *first {
                *first = false;
            } else {
                fmt!(f, ", ");
            }
        }

        sep(f, first);
        fmt!(f, self.alias "." columns::RECORD_ID);
        for field in &area.fields {
            let column = field.column_name();
            sep(f, first);
            fmt!(f, self.alias "." column);
        }

        for child in &self.children {
            child.add_columns(schema, f, first);
        }
    }

    pub(crate) fn add_to_from(&self, schema: &Schema, f: &mut Formatter<'_>) {
        push_table_ref(f, &self.info_area_id, &self.alias);
        self.add_joins(schema, f);
    }

    fn add_joins(&self, schema: &Schema, f: &mut Formatter<'_>) {
        for child in &self.children {
            if child.sub_query.is_some() || f.ctx.has_error() {
                continue;
            }
            match &child.relation {
                None => {
                    f.ctx.set_error(format!(
                        "relation node {} has no link to its parent",
                        child.info_area_id
                    ));
                    return;
                }
                Some(NodeRelation::Direct(link)) => {
                    fmt!(f, " LEFT JOIN ");
                    push_table_ref(f, &child.info_area_id, &child.alias);
                    fmt!(f, " ON ");
                    direct_join_condition(f, schema, &self.alias, &self.info_area_id, child, link);
                }
                Some(NodeRelation::Virtual(vlink)) => {
                    self.add_virtual_join(f, child, vlink);
                }
            }
            if f.ctx.has_error() {
                return;
            }
            child.add_joins(schema, f);
        }
    }

    /// Flatten a virtual link into two joins through the intermediate
    /// table. Both underlying links anchor at the intermediate table, so
    /// the emitted join shape is the same for every `MoveLinks` variant.
    fn add_virtual_join(&self, f: &mut Formatter<'_>, child: &QueryTreeNode, vlink: &VirtualLinkInfo) {
        let (Some(to_source), Some(to_target)) = (
            vlink.link_to_source.as_ref().filter(|_| vlink.is_valid()),
            vlink.link_to_target.as_ref(),
        ) else {
            f.ctx.set_error(format!(
                "invalid virtual link from {} to {}",
                self.info_area_id, child.info_area_id
            ));
            return;
        };

        let inter_table = &to_source.info_area_id;
        let inter_alias = format!("{}_I", child.alias);
        let source_column = to_source.column_name();
        let target_column = to_target.column_name();

        fmt!(
            f,
            " LEFT JOIN " inter_table " " inter_alias
            " ON " inter_alias "." source_column " = " self.alias "." columns::RECORD_ID
        );
        fmt!(f, " LEFT JOIN ");
        push_table_ref(f, &child.info_area_id, &child.alias);
        fmt!(
            f,
            " ON " inter_alias "." target_column " = " child.alias "." columns::RECORD_ID
        );
    }

    /// True when compiling this subtree produces any WHERE content.
    pub(crate) fn has_where_content(&self) -> bool {
        if self.sub_query.is_some() {
            return false;
        }
        self.condition.is_some()
            || !self.exists_conditions.is_empty()
            || self.ignore_lookup_rows
            || self.link_record_value.is_some()
            || self.children.iter().any(|c| c.has_where_content())
    }

    pub(crate) fn add_to_where(&self, schema: &Schema, f: &mut Formatter<'_>, first: &mut bool) {
        if self.sub_query.is_some() {
            return;
        }

        fn sep(f: &mut Formatter<'_>, first: &mut bool) {
            if *first {
                *first = false;
            } else {
                fmt!(f, " AND ");
            }
        }

        if let Some(value) = &self.link_record_value {
            sep(f, first);
            self.add_link_record_filter(schema, f, value.clone());
        }

        if self.ignore_lookup_rows {
            sep(f, first);
            fmt!(
                f,
                "(" self.alias "." columns::LOOKUP_ROW " IS NULL OR "
                self.alias "." columns::LOOKUP_ROW " = 0)"
            );
        }

        if let Some(condition) = &self.condition {
            sep(f, first);
            condition.add_to_where(&self.alias, f);
        }

        for (index, exists) in self.exists_conditions.iter().enumerate() {
            sep(f, first);
            self.add_exists_filter(schema, f, exists, index);
        }

        for child in &self.children {
            child.add_to_where(schema, f, first);
        }
    }

    /// The sub-query root's binding back to its parent row: the link is
    /// expressed as a single-table predicate with a bindable slot instead
    /// of a join.
    fn add_link_record_filter(&self, schema: &Schema, f: &mut Formatter<'_>, value: Value) {
        let Some(NodeRelation::Direct(link)) = &self.relation else {
            f.ctx.set_error(format!(
                "sub-query on {} has no direct link to bind",
                self.info_area_id
            ));
            return;
        };

        if let Some(dest_field_id) = link.dest_field_id {
            let column = columns::field_column(dest_field_id);
            fmt!(f, self.alias "." column " = " value);
            return;
        }

        if let Some(reverse) = explicit_reverse_link(schema, link) {
            let column = reverse.column_name();
            fmt!(f, self.alias "." column " = " value);
            return;
        }

        f.ctx.set_error(format!(
            "link {} from {} to {} cannot be bound in a sub-query",
            link.link_id, link.info_area_id, link.target_info_area_id
        ));
    }

    fn add_exists_filter(
        &self,
        schema: &Schema,
        f: &mut Formatter<'_>,
        exists: &ExistsCondition,
        index: usize,
    ) {
        let Some(area) = schema.info_area(&self.info_area_id) else {
            f.ctx
                .set_error(format!("unknown information area {}", self.info_area_id));
            return;
        };
        let Some(link) = area.link_to(&exists.target_info_area_id, exists.link_id) else {
            f.ctx.set_error(format!(
                "no link from {} to {} for exists condition",
                self.info_area_id, exists.target_info_area_id
            ));
            return;
        };

        let exists_alias = format!("{}_X{}", self.alias, index);
        if exists.negate {
            fmt!(f, "NOT ");
        }
        fmt!(
            f,
            "EXISTS (SELECT 1 FROM " exists.target_info_area_id " " exists_alias " WHERE "
        );
        join_condition_to_alias(
            f,
            schema,
            &self.alias,
            &self.info_area_id,
            &exists_alias,
            &exists.target_info_area_id,
            link,
        );
        if let Some(condition) = &exists.condition {
            fmt!(f, " AND ");
            condition.add_to_where(&exists_alias, f);
        }
        fmt!(f, ")");
    }
}

fn push_table_ref(f: &mut Formatter<'_>, table: &str, alias: &str) {
    if alias == table {
        fmt!(f, table);
    } else {
        fmt!(f, table " " alias);
    }
}

fn direct_join_condition(
    f: &mut Formatter<'_>,
    schema: &Schema,
    parent_alias: &str,
    parent_area_id: &str,
    child: &QueryTreeNode,
    link: &LinkInfo,
) {
    join_condition_to_alias(
        f,
        schema,
        parent_alias,
        parent_area_id,
        &child.alias,
        &child.info_area_id,
        link,
    );
}

/// Emit the ON/WHERE condition realizing one direct link between two
/// aliases. Resolution order: field pair, multi-field positions, generic
/// column pair, forward foreign-key column, then the reverse direction's
/// column (explicitly declared on the target area, or synthesized).
fn join_condition_to_alias(
    f: &mut Formatter<'_>,
    schema: &Schema,
    parent_alias: &str,
    parent_area_id: &str,
    child_alias: &str,
    child_area_id: &str,
    link: &LinkInfo,
) {
    if link.is_multi_field_link() {
        let mut s = "";
        for pos in 0..link.source_field_ids.len() {
            fmt!(f, s);
            s = " AND ";
            let source_column = columns::field_column(link.source_field_ids[pos]);
            let dest_column = columns::field_column(
                link.dest_field_ids.get(pos).copied().unwrap_or_default(),
            );
            // A literal replaces the field term of the side it was declared
            // on; a position carrying literals on both sides constrains both.
            match (link.source_value_at(pos), link.dest_value_at(pos)) {
                (Some(source_literal), Some(dest_literal)) => {
                    fmt!(
                        f,
                        child_alias "." dest_column " = " Value::from(source_literal)
                        " AND " parent_alias "." source_column " = " Value::from(dest_literal)
                    );
                }
                (Some(literal), None) => {
                    fmt!(f, child_alias "." dest_column " = " Value::from(literal));
                }
                (None, Some(literal)) => {
                    fmt!(f, parent_alias "." source_column " = " Value::from(literal));
                }
                (None, None) => {
                    fmt!(
                        f,
                        parent_alias "." source_column " = " child_alias "." dest_column
                    );
                }
            }
        }
        return;
    }

    if let (Some(source_field_id), Some(dest_field_id)) =
        (link.source_field_id, link.dest_field_id)
    {
        let source_column = columns::field_column(source_field_id);
        let dest_column = columns::field_column(dest_field_id);
        fmt!(
            f,
            parent_alias "." source_column " = " child_alias "." dest_column
        );
        return;
    }

    if link.link_id == columns::GENERIC_LINK_ID {
        fmt!(
            f,
            parent_alias "." columns::GENERIC_LINK_AREA " = " Value::from(child_area_id)
            " AND " parent_alias "." columns::GENERIC_LINK_RECID
            " = " child_alias "." columns::RECORD_ID
        );
        return;
    }

    if link.has_column() {
        let column = link.column_name();
        fmt!(
            f,
            parent_alias "." column " = " child_alias "." columns::RECORD_ID
        );
        return;
    }

    if let Some(reverse) = explicit_reverse_link(schema, link)
        .or_else(|| link.create_virtual_reverse_link().filter(|r| r.has_column()))
    {
        let column = reverse.column_name();
        fmt!(
            f,
            child_alias "." column " = " parent_alias "." columns::RECORD_ID
        );
        return;
    }

    f.ctx.set_error(format!(
        "cannot resolve link {} from {} to {}",
        link.link_id, parent_area_id, child_area_id
    ));
}

/// The reverse-direction link as declared on the target area, when it is
/// realized as a physical column there.
fn explicit_reverse_link(schema: &Schema, link: &LinkInfo) -> Option<LinkInfo> {
    if link.reverse_link_id < 0 {
        return None;
    }
    schema
        .info_area(&link.target_info_area_id)?
        .links
        .iter()
        .find(|l| {
            l.link_id == link.reverse_link_id
                && l.target_info_area_id == link.info_area_id
                && l.has_column()
        })
        .cloned()
}
