//! Row-to-record conversion and cell normalization.

use serde_json::{json, Value};

use fasilbot::store::{cell_to_string, normalize_identifier, Record, StoreError, Table};

fn records_from_rows(rows: Vec<Vec<Value>>) -> Vec<Record> {
    Table::from_rows(rows).records().to_vec()
}

#[test]
fn header_keys_every_row_and_short_rows_are_padded() {
    let rows = vec![
        vec![json!("Chat ID"), json!("Nama Fasilitator")],
        vec![json!("1"), json!("Ayu")],
        vec![json!("2")],
    ];

    let records = records_from_rows(rows);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("Nama Fasilitator"), Some(&json!("Ayu")));
    assert_eq!(records[1].get("Chat ID"), Some(&json!("2")));
    assert_eq!(records[1].get("Nama Fasilitator"), Some(&json!("")));
}

#[test]
fn blank_rows_are_dropped() {
    let rows = vec![
        vec![json!("Chat ID"), json!("Nama Fasilitator")],
        vec![json!(""), json!("  ")],
        vec![],
        vec![json!("3"), json!("Citra")],
    ];

    let records = records_from_rows(rows);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("Chat ID"), Some(&json!("3")));
}

#[test]
fn empty_sheet_has_no_records() {
    assert!(records_from_rows(Vec::new()).is_empty());
    assert!(records_from_rows(vec![vec![json!("Chat ID")]]).is_empty());
}

#[test]
fn integral_numbers_render_without_fraction() {
    assert_eq!(cell_to_string(&json!(123)), "123");
    assert_eq!(cell_to_string(&json!(123.0)), "123");
    assert_eq!(cell_to_string(&json!(987_654_321_u64)), "987654321");
    assert_eq!(cell_to_string(&json!(12.5)), "12.5");
}

#[test]
fn strings_are_trimmed_and_null_is_empty() {
    assert_eq!(cell_to_string(&json!("  Ayu ")), "Ayu");
    assert_eq!(cell_to_string(&Value::Null), "");
    assert_eq!(cell_to_string(&json!(true)), "true");
}

#[test]
fn identifiers_normalize_like_cells() {
    assert_eq!(normalize_identifier(" 42 "), cell_to_string(&json!(42)));
}

#[test]
fn table_reports_header_positions() {
    let table = Table::from_rows(vec![
        vec![json!("Nama Fasilitator"), json!(" Chat ID ")],
        vec![json!("Ayu"), json!(42)],
    ]);

    assert_eq!(table.header(), ["Nama Fasilitator", "Chat ID"]);
    assert!(matches!(table.position("UserList", "Chat ID"), Ok(1)));
    assert_eq!(table.records().len(), 1);
}

#[test]
fn table_without_rows_has_no_columns() {
    let table = Table::from_rows(Vec::new());
    assert!(table.header().is_empty());
    assert!(matches!(
        table.position("UserList", "Chat ID"),
        Err(StoreError::MissingColumn { ref worksheet, .. }) if worksheet == "UserList"
    ));
}
