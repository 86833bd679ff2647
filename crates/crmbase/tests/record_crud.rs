use crmbase::{Connection as _, Record, RecordIdentifier, RecordTemplate, Value};

use crmbase_driver_sqlite::Connection;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn connection() -> Connection {
    let mut conn = Connection::in_memory().unwrap();
    conn.execute(
        "CREATE TABLE FI (recid TEXT PRIMARY KEY, F17 TEXT, F5 TEXT, virt_area TEXT, lookuprow INTEGER)",
        &[],
    )
    .unwrap();
    conn
}

fn company_template() -> Arc<RecordTemplate> {
    Arc::new(RecordTemplate::new("FI", vec![17, 5], vec![]))
}

fn company(template: &Arc<RecordTemplate>, record_id: &str) -> Record {
    let mut record = Record::new(RecordIdentifier::new("FI", record_id));
    record.set_template_weak(template);
    record
}

#[test]
fn insert_then_load_round_trips_all_values() {
    let mut conn = connection();
    let template = company_template();

    let mut record = company(&template, "r1");
    record.set_value(0, "ACME").unwrap();
    record.set_value(1, "42").unwrap();
    record.insert(&mut conn).unwrap();
    assert!(record.is_loaded());

    let mut reloaded = company(&template, "r1");
    reloaded.load(&mut conn).unwrap();
    assert!(reloaded.is_loaded());
    assert_eq!(reloaded.get_value(0), Value::from("ACME"));
    assert_eq!(reloaded.get_value(1), Value::from("42"));
}

#[test]
fn insert_writes_the_virtual_area_column() {
    let mut conn = connection();
    let template = company_template();

    let mut record = company(&template, "r1");
    record.insert(&mut conn).unwrap();

    let virt = conn
        .query_scalar("SELECT virt_area FROM FI WHERE recid = ?", &[Value::from("r1")])
        .unwrap();
    assert_eq!(virt, Some(Value::from("FI")));
}

#[test]
fn exists_probe() {
    let mut conn = connection();
    let template = company_template();

    let mut record = company(&template, "r1");
    assert!(!record.exists(&mut conn).unwrap());
    record.insert(&mut conn).unwrap();
    assert!(record.exists(&mut conn).unwrap());
}

#[test]
fn update_preserves_untouched_slots() {
    let mut conn = connection();
    let template = company_template();

    let mut record = company(&template, "r1");
    record.set_value(0, "ACME").unwrap();
    record.set_value(1, "42").unwrap();
    record.insert(&mut conn).unwrap();

    let mut edit = company(&template, "r1");
    edit.load(&mut conn).unwrap();
    edit.set_value(0, "ACME Holding").unwrap();
    edit.update(&mut conn).unwrap();

    let mut reloaded = company(&template, "r1");
    reloaded.load(&mut conn).unwrap();
    assert_eq!(reloaded.get_value(0), Value::from("ACME Holding"));
    assert_eq!(reloaded.get_value(1), Value::from("42"));
}

#[test]
fn delete_removes_the_row() {
    let mut conn = connection();
    let template = company_template();

    let mut record = company(&template, "r1");
    record.insert(&mut conn).unwrap();
    record.delete(&mut conn).unwrap();

    assert!(!record.exists(&mut conn).unwrap());
    let err = company(&template, "r1").load(&mut conn).unwrap_err();
    assert!(err.is_record_not_found());
}

#[test]
fn lookup_flag_is_written_when_the_template_requests_it() {
    let mut conn = connection();
    let template = Arc::new(
        RecordTemplate::new("FI", vec![17], vec![]).with_lookup_for_new(),
    );

    let mut record = Record::new(RecordIdentifier::new("FI", "r1"));
    record.set_template(template);
    record.set_lookup_record(true);
    record.insert(&mut conn).unwrap();

    let flag = conn
        .query_scalar("SELECT lookuprow FROM FI WHERE recid = ?", &[Value::from("r1")])
        .unwrap();
    assert_eq!(flag, Some(Value::I64(1)));
}

#[test]
fn unbound_records_report_what_is_missing() {
    let mut conn = connection();

    let mut no_template = Record::new(RecordIdentifier::new("FI", "r1"));
    assert!(no_template.insert(&mut conn).unwrap_err().is_missing_template());

    let mut no_identifier = Record::default();
    no_identifier.set_template(company_template());
    assert!(no_identifier.insert(&mut conn).unwrap_err().is_missing_identifier());
}
