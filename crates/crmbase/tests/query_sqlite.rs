use crmbase::{
    schema::{FieldInfo, FieldKind, InfoAreaInfo, LinkInfo, RelationType, Schema},
    Connection as _, GenericRecordSet, Query, Value,
};

use crmbase_driver_sqlite::Connection;
use pretty_assertions::assert_eq;
use std::sync::Arc;

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

fn seeded_connection() -> Connection {
    let mut conn = Connection::in_memory().unwrap();
    conn.execute("CREATE TABLE FI (recid TEXT, F17 TEXT)", &[]).unwrap();
    conn.execute("CREATE TABLE KP (recid TEXT, F1 TEXT, F2 TEXT)", &[]).unwrap();

    for (recid, name) in [("r1", "ACME"), ("r2", "Beta"), ("r3", "Gamma")] {
        conn.execute(
            "INSERT INTO FI (recid, F17) VALUES (?, ?)",
            &[Value::from(recid), Value::from(name)],
        )
        .unwrap();
    }
    for (recid, company, person) in [
        ("c1", "ACME", "Ann"),
        ("c2", "Beta", "Bob"),
        ("c3", "Beta", "Cleo"),
    ] {
        conn.execute(
            "INSERT INTO KP (recid, F1, F2) VALUES (?, ?, ?)",
            &[Value::from(recid), Value::from(company), Value::from(person)],
        )
        .unwrap();
    }
    conn
}

#[test]
fn one_to_many_children_come_back_per_parent() {
    let mut conn = seeded_connection();
    let mut query = Query::new(crm_schema(), "FI").unwrap();
    query.add_relation("KP", Some(3)).unwrap();
    query.add_sort_field("FI", 17, false).unwrap();

    let result = GenericRecordSet::new(query.execute(&mut conn, false).unwrap());

    assert_eq!(result.row_count(), 3);
    assert_eq!(result.row(0).unwrap().value(1), Some(&Value::from("ACME")));

    let per_parent: Vec<usize> = (0..3)
        .map(|parent| result.children_of(parent).map(|set| set.row_count()).sum())
        .collect();
    assert_eq!(per_parent, vec![1, 2, 0]);

    // Child rows carry the contact columns of the sub-query projection.
    let beta_children = result.children_of(1).next().unwrap();
    assert_eq!(beta_children.row(0).unwrap().value(2), Some(&Value::from("Bob")));
    assert_eq!(beta_children.row(1).unwrap().value(2), Some(&Value::from("Cleo")));
}

#[test]
fn count_over_sqlite() {
    let mut conn = seeded_connection();
    let mut query = Query::new(crm_schema(), "FI").unwrap();
    assert_eq!(query.count(&mut conn).unwrap(), 3);
}

#[test]
fn pagination_limits_the_outer_rows() {
    let mut conn = seeded_connection();
    let mut query = Query::new(crm_schema(), "FI").unwrap();
    query.add_sort_field("FI", 17, false).unwrap();
    query.set_max_result_row_count(2);

    let result = query.execute(&mut conn, false).unwrap();
    assert_eq!(result.rows.row_count(), 2);
    assert_eq!(result.rows.row(0).unwrap().value(1), Some(&Value::from("ACME")));
}
