use crmbase_core::driver::{ColumnMeta, ColumnType, Connection, DatabaseRecordSet, DatabaseRow};
use crmbase_core::schema::{FieldInfo, FieldKind, InfoAreaInfo, LinkInfo, RelationType, Schema};
use crmbase_core::stmt::Value;
use crmbase_core::Result;
use crmbase_sql::{Query, StatementCreationContext};

use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::sync::Arc;

/// Records every statement it receives and replays canned result sets.
#[derive(Default)]
struct RecordingConnection {
    queries: Vec<(String, Vec<Value>)>,
    results: VecDeque<DatabaseRecordSet>,
}

impl Connection for RecordingConnection {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        self.queries.push((sql.to_string(), params.to_vec()));
        Ok(0)
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<DatabaseRecordSet> {
        self.queries.push((sql.to_string(), params.to_vec()));
        Ok(self.results.pop_front().unwrap_or_default())
    }

    fn query_scalar(&mut self, sql: &str, params: &[Value]) -> Result<Option<Value>> {
        let rows = self.query(sql, params)?;
        Ok(rows.row(0).and_then(|r| r.value(0)).cloned())
    }

    fn prepare_meta(&mut self, _sql: &str) -> Result<Vec<ColumnMeta>> {
        Ok(Vec::new())
    }

    fn begin_transaction(&mut self) -> Result<()> {
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }
}

fn text_column(name: &str) -> ColumnMeta {
    ColumnMeta {
        name: name.to_string(),
        ty: ColumnType::Text,
    }
}

fn crm_schema() -> Arc<Schema> {
    let mut schema = Schema::new();

    let mut fi = InfoAreaInfo::new("FI");
    fi.add_field(FieldInfo::new("FI", 17, FieldKind::Text));
    fi.add_link(LinkInfo::new("FI", "KP", 3, RelationType::OneToMany).with_fields(17, 1));
    schema.add_info_area(fi);

    let mut kp = InfoAreaInfo::new("KP");
    kp.add_field(FieldInfo::new("KP", 1, FieldKind::Text));
    kp.add_field(FieldInfo::new("KP", 2, FieldKind::Text));
    schema.add_info_area(kp);

    Arc::new(schema)
}

fn string_row(values: &[&str]) -> DatabaseRow {
    DatabaseRow::from_vec(values.iter().map(|v| Value::from(*v)).collect())
}

#[test]
fn one_to_many_child_leaves_the_outer_statement() {
    let mut query = Query::new(crm_schema(), "FI").unwrap();
    query.add_relation("KP", Some(3)).unwrap();

    let mut ctx = StatementCreationContext::new();
    let sql = query.create_statement(&mut ctx, false).unwrap();
    assert_eq!(sql, "SELECT FI.recid, FI.F17 FROM FI");
    assert!(ctx.params().is_empty());
}

#[test]
fn sub_query_runs_once_per_parent_with_a_key() {
    let mut query = Query::new(crm_schema(), "FI").unwrap();
    query.add_relation("KP", Some(3)).unwrap();

    let mut conn = RecordingConnection::default();
    // Outer rows: two companies with names, one without.
    conn.results.push_back(DatabaseRecordSet::new(
        vec![text_column("recid"), text_column("F17")],
        vec![
            string_row(&["r1", "ACME"]),
            string_row(&["r2", ""]),
            string_row(&["r3", "Beta"]),
        ],
    ));
    conn.results.push_back(DatabaseRecordSet::new(
        vec![text_column("recid"), text_column("F1"), text_column("F2")],
        vec![string_row(&["c1", "ACME", "Ann"])],
    ));
    conn.results.push_back(DatabaseRecordSet::new(
        vec![text_column("recid"), text_column("F1"), text_column("F2")],
        vec![
            string_row(&["c2", "Beta", "Bob"]),
            string_row(&["c3", "Beta", "Cleo"]),
        ],
    ));

    let result = query.execute(&mut conn, false).unwrap();

    assert_eq!(
        conn.queries,
        vec![
            ("SELECT FI.recid, FI.F17 FROM FI".to_string(), vec![]),
            (
                "SELECT KP.recid, KP.F1, KP.F2 FROM KP WHERE KP.F1 = ?".to_string(),
                vec![Value::from("ACME")],
            ),
            (
                "SELECT KP.recid, KP.F1, KP.F2 FROM KP WHERE KP.F1 = ?".to_string(),
                vec![Value::from("Beta")],
            ),
        ]
    );

    assert_eq!(result.rows.row_count(), 3);
    assert_eq!(result.sub_results.len(), 1);

    let sub = &result.sub_results[0];
    assert_eq!(sub.parent_replace_index, 0);
    assert_eq!(sub.child_rows.len(), 3);
    assert_eq!(sub.child_rows[0].row_count(), 1);
    // The keyless parent gets an empty child set, no statement was run.
    assert_eq!(sub.child_rows[1].row_count(), 0);
    assert_eq!(sub.child_rows[2].row_count(), 2);
}

#[test]
fn sort_on_a_split_off_child_orders_the_inner_statement() {
    let mut query = Query::new(crm_schema(), "FI").unwrap();
    query.add_relation("KP", Some(3)).unwrap();
    query.add_sort_field("KP", 1, true).unwrap();

    let mut conn = RecordingConnection::default();
    conn.results.push_back(DatabaseRecordSet::new(
        vec![text_column("recid"), text_column("F17")],
        vec![string_row(&["r1", "ACME"])],
    ));
    conn.results.push_back(DatabaseRecordSet::new(
        vec![text_column("recid"), text_column("F1"), text_column("F2")],
        vec![
            string_row(&["c4", "ACME", "Zoe"]),
            string_row(&["c1", "ACME", "Ann"]),
        ],
    ));

    let result = query.execute(&mut conn, false).unwrap();

    // The ordering moves with the child: none on the outer statement, the
    // per-parent statement carries it.
    assert_eq!(conn.queries[0].0, "SELECT FI.recid, FI.F17 FROM FI");
    assert_eq!(
        conn.queries[1].0,
        "SELECT KP.recid, KP.F1, KP.F2 FROM KP WHERE KP.F1 = ? ORDER BY KP.F1 DESC"
    );
    assert_eq!(result.sub_results[0].child_rows[0].row_count(), 2);
}

#[test]
fn no_parent_rows_means_no_sub_query_statements() {
    let mut query = Query::new(crm_schema(), "FI").unwrap();
    query.add_relation("KP", Some(3)).unwrap();

    let mut conn = RecordingConnection::default();
    let result = query.execute(&mut conn, false).unwrap();

    assert_eq!(conn.queries.len(), 1);
    assert_eq!(result.rows.row_count(), 0);
    assert!(result.sub_results.is_empty());
}

#[test]
fn virtual_link_mode_keeps_the_child_joined() {
    let schema = {
        let mut schema = Schema::new();
        let mut fi = InfoAreaInfo::new("FI");
        fi.add_field(FieldInfo::new("FI", 17, FieldKind::Text));
        fi.add_link(LinkInfo::new("FI", "KP", 3, RelationType::OneToMany).with_fields(17, 1));
        schema.add_info_area(fi);
        let mut kp = InfoAreaInfo::new("KP");
        kp.add_field(FieldInfo::new("KP", 1, FieldKind::Text));
        schema.add_info_area(kp);
        Arc::new(schema)
    };

    let mut query = Query::new(schema, "FI").unwrap();
    query.set_use_virtual_links(true);
    query.add_relation("KP", Some(3)).unwrap();

    let mut ctx = StatementCreationContext::new();
    let sql = query.create_statement(&mut ctx, false).unwrap();
    assert_eq!(
        sql,
        "SELECT FI.recid, FI.F17, KP.recid, KP.F1 FROM FI LEFT JOIN KP ON FI.F17 = KP.F1"
    );
}

#[test]
fn count_reads_the_scalar() {
    let mut query = Query::new(crm_schema(), "FI").unwrap();

    let mut conn = RecordingConnection::default();
    conn.results.push_back(DatabaseRecordSet::new(
        vec![text_column("COUNT(*)")],
        vec![DatabaseRow::from_vec(vec![Value::I64(42)])],
    ));

    assert_eq!(query.count(&mut conn).unwrap(), 42);
    assert_eq!(conn.queries[0].0, "SELECT COUNT(*) FROM FI");

    // An engine returning no row at all still counts as zero.
    assert_eq!(query.count(&mut conn).unwrap(), 0);
}
