// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rekonsil::categorize::categorize_one;
use rekonsil::classifier::preview_classification;
use rekonsil::models::{Classification, ClassificationInput, NewTransaction, PeriodBucket, ReceiptPath};
use rekonsil::repository::{
    self, create_statement, get_statement, insert_transactions, list_by_category, list_by_period,
    list_statements, list_transactions, list_uncategorized, statement_version,
};
use rekonsil::rules::add_rule;
use rekonsil::taxonomy::{self, Taxonomy};
use rekonsil::utils::{busy_timeout_ms, set_setting};
use rekonsil::{EngineError, db};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::str::FromStr;

fn row(day: u32, debit: Option<&str>, credit: Option<&str>) -> NewTransaction {
    NewTransaction {
        transaction_date: NaiveDate::from_ymd_opt(2025, 5, day).unwrap(),
        description: Some("IBG".into()),
        sender_or_recipient_name: None,
        payment_details: None,
        debit_amount: debit.map(|d| Decimal::from_str(d).unwrap()),
        credit_amount: credit.map(|c| Decimal::from_str(c).unwrap()),
    }
}

fn setup() -> (Connection, i64) {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    let st = create_statement(&conn, "Maybank May", "2025-05").unwrap();
    (conn, st.id)
}

#[test]
fn statements_are_created_with_version_zero() {
    let (conn, sid) = setup();
    let st = get_statement(&conn, sid).unwrap();
    assert_eq!(st.month, "2025-05");
    assert_eq!(st.version, 0);

    create_statement(&conn, "Maybank Jun", "2025-6").unwrap();
    let months: Vec<String> = list_statements(&conn).unwrap().into_iter().map(|s| s.month).collect();
    assert_eq!(months, vec!["2025-06".to_string(), "2025-05".to_string()]);

    assert!(matches!(
        create_statement(&conn, "Bad", "2025-00"),
        Err(EngineError::InvalidMonth(_))
    ));
    assert!(matches!(get_statement(&conn, 77), Err(EngineError::StatementNotFound(77))));
}

#[test]
fn imported_rows_start_uncategorized_in_current_month() {
    let (mut conn, sid) = setup();
    let n = insert_transactions(
        &mut conn,
        sid,
        &[row(3, Some("12.50"), None), row(1, None, Some("300.00"))],
    )
    .unwrap();
    assert_eq!(n, 2);

    let rows = list_transactions(&conn, sid).unwrap();
    assert_eq!(rows[0].transaction_date, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
    assert_eq!(rows[0].credit_amount, Some(Decimal::from_str("300.00").unwrap()));
    assert_eq!(rows[1].debit_amount, Some(Decimal::from_str("12.50").unwrap()));
    assert!(rows.iter().all(|r| r.period_bucket == PeriodBucket::CurrentMonth));
    assert_eq!(list_uncategorized(&conn, sid).unwrap().len(), 2);
    assert_eq!(list_by_period(&conn, sid, PeriodBucket::CurrentMonth).unwrap().len(), 2);
    assert!(list_by_category(&conn, sid, "Pentadbiran").unwrap().is_empty());
    assert_eq!(statement_version(&conn, sid).unwrap(), 1);

    insert_transactions(&mut conn, sid, &[]).unwrap();
    assert_eq!(statement_version(&conn, sid).unwrap(), 1);
}

#[test]
fn a_bad_row_rejects_the_whole_batch() {
    let (mut conn, sid) = setup();
    let err = insert_transactions(
        &mut conn,
        sid,
        &[row(1, Some("5"), None), row(2, Some("5"), Some("5"))],
    )
    .unwrap_err();
    match err {
        EngineError::InvalidAmounts(msg) => assert!(msg.starts_with("row 2")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(list_transactions(&conn, sid).unwrap().is_empty());

    assert!(matches!(
        insert_transactions(&mut conn, sid, &[row(1, None, None)]),
        Err(EngineError::InvalidAmounts(_))
    ));
    assert!(matches!(
        insert_transactions(&mut conn, sid, &[row(1, Some("-1"), None)]),
        Err(EngineError::InvalidAmounts(_))
    ));
}

#[test]
fn zero_on_one_side_is_treated_as_absent() {
    let (mut conn, sid) = setup();
    insert_transactions(&mut conn, sid, &[row(4, Some("0"), Some("42.00"))]).unwrap();
    let rows = list_transactions(&conn, sid).unwrap();
    assert_eq!(rows[0].debit_amount, None);
    assert_eq!(rows[0].credit_amount, Some(Decimal::from_str("42.00").unwrap()));
}

#[test]
fn import_into_unknown_statement_fails() {
    let (mut conn, _) = setup();
    assert!(matches!(
        insert_transactions(&mut conn, 404, &[row(1, Some("1"), None)]),
        Err(EngineError::StatementNotFound(404))
    ));
}

#[test]
fn file_database_honours_busy_timeout_setting() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rekonsil.sqlite");
    {
        let conn = db::open_at(&path).unwrap();
        assert_eq!(busy_timeout_ms(&conn).unwrap(), 5_000);
        set_setting(&conn, "busy_timeout_ms", "250").unwrap();
    }
    let conn = db::open_at(&path).unwrap();
    assert_eq!(busy_timeout_ms(&conn).unwrap(), 250);
    let mode: String = conn
        .query_row("PRAGMA journal_mode", [], |r| r.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[test]
fn held_unit_blocks_second_writer_but_not_preview() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rekonsil.sqlite");
    let mut a = db::open_at(&path).unwrap();
    taxonomy::add_receipt_category(&a, "Derma Jumaat", false).unwrap();
    let sid = create_statement(&a, "Maybank May", "2025-05").unwrap().id;
    insert_transactions(&mut a, sid, &[row(2, None, Some("150.00")), row(9, Some("12.00"), None)])
        .unwrap();
    let tree = Taxonomy::load(&a).unwrap();
    add_rule(
        &a,
        &tree,
        "ibg",
        &Classification::Receipt(ReceiptPath::new("Derma Jumaat")),
    )
    .unwrap();
    set_setting(&a, "busy_timeout_ms", "50").unwrap();

    let mut b = db::open_at(&path).unwrap();
    assert_eq!(busy_timeout_ms(&b).unwrap(), 50);
    let id = list_transactions(&b, sid).unwrap()[0].id;
    let input = ClassificationInput::receipt(ReceiptPath::new("Derma Jumaat"));

    let unit = repository::begin_unit(&mut a).unwrap();
    let err = categorize_one(&mut b, id, &input, None, None).unwrap_err();
    match err {
        EngineError::Persistence(rusqlite::Error::SqliteFailure(e, _)) => {
            assert_eq!(e.code, rusqlite::ErrorCode::DatabaseBusy)
        }
        other => panic!("expected a busy database, got {other:?}"),
    }
    let set = preview_classification(&b, sid).unwrap();
    assert_eq!(set.matches.len(), 2);
    drop(unit);

    let tx = categorize_one(&mut b, id, &input, None, None).unwrap();
    assert_eq!(tx.category_receipt.as_deref(), Some("Derma Jumaat"));
}
