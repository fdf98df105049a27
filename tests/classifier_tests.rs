// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rekonsil::classifier::{
    PreviewStamp, apply_classification, match_transactions, preview_classification, search_text,
};
use rekonsil::categorize::categorize_one;
use rekonsil::models::{
    Classification, ClassificationInput, NewTransaction, PaymentPath, PeriodBucket, ReceiptPath,
};
use rekonsil::repository::{self, create_statement, insert_transactions, list_transactions};
use rekonsil::rules::{add_rule, load_rules, remove_rule};
use rekonsil::taxonomy::{self, NewNode, Taxonomy};
use rekonsil::{EngineError, db};
use rusqlite::Connection;
use rust_decimal::Decimal;

fn node(name: &str, code: &str) -> NewNode {
    NewNode {
        name: name.into(),
        code: code.into(),
        ..Default::default()
    }
}

fn setup() -> (Connection, i64) {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    taxonomy::add_receipt_category(&conn, "Sumbangan Am", false).unwrap();
    taxonomy::add_receipt_category(&conn, "Hasil Sewaan", false).unwrap();
    taxonomy::add_receipt_sub_category(&conn, "Hasil Sewaan", "Dewan").unwrap();
    taxonomy::add_payment_category(&conn, &node("Pentadbiran", "P100")).unwrap();
    taxonomy::add_payment_sub_category1(&conn, "Pentadbiran", &node("Alat Tulis", "P110")).unwrap();
    taxonomy::add_payment_sub_category2(&conn, "Pentadbiran", "Alat Tulis", &node("Kertas", "P111"))
        .unwrap();
    taxonomy::add_payment_category(&conn, &node("Penyelenggaraan", "M200")).unwrap();
    let st = create_statement(&conn, "Maybank Jan", "2025-01").unwrap();
    (conn, st.id)
}

fn credit(desc: &str, sender: Option<&str>, amount: &str) -> NewTransaction {
    NewTransaction {
        transaction_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
        description: Some(desc.to_string()),
        sender_or_recipient_name: sender.map(|s| s.to_string()),
        payment_details: None,
        debit_amount: None,
        credit_amount: Some(amount.parse::<Decimal>().unwrap()),
    }
}

fn debit(desc: &str, details: Option<&str>, amount: &str) -> NewTransaction {
    NewTransaction {
        transaction_date: NaiveDate::from_ymd_opt(2025, 1, 12).unwrap(),
        description: Some(desc.to_string()),
        sender_or_recipient_name: None,
        payment_details: details.map(|s| s.to_string()),
        debit_amount: Some(amount.parse::<Decimal>().unwrap()),
        credit_amount: None,
    }
}

fn rule(conn: &Connection, keyword: &str, target: Classification) -> i64 {
    let tree = Taxonomy::load(conn).unwrap();
    add_rule(conn, &tree, keyword, &target).unwrap().id
}

fn receipt(cat: &str) -> Classification {
    Classification::Receipt(ReceiptPath::new(cat))
}

#[test]
fn derma_rule_is_previewed_then_applied() {
    let (mut conn, sid) = setup();
    insert_transactions(&mut conn, sid, &[credit("Derma Jumaat", None, "150.00")]).unwrap();
    rule(&conn, "derma", receipt("Sumbangan Am"));

    let set = preview_classification(&conn, sid).unwrap();
    assert_eq!(set.matches.len(), 1);
    assert_eq!(set.matches[0].proposed_category, "Sumbangan Am");
    assert_eq!(set.matches[0].matched_keyword, "derma");
    assert!(set.matches[0].source_search_text_excerpt.contains("derma jumaat"));

    let n = apply_classification(&mut conn, sid, None, None).unwrap();
    assert_eq!(n, 1);
    let rows = list_transactions(&conn, sid).unwrap();
    assert_eq!(rows[0].category_receipt.as_deref(), Some("Sumbangan Am"));
    assert_eq!(rows[0].category_payment, None);
    assert_eq!(rows[0].period_bucket, PeriodBucket::CurrentMonth);
}

#[test]
fn already_categorized_rows_are_not_candidates() {
    let (mut conn, sid) = setup();
    insert_transactions(&mut conn, sid, &[debit("Derma kertas", None, "20.00")]).unwrap();
    let id = list_transactions(&conn, sid).unwrap()[0].id;
    categorize_one(
        &mut conn,
        id,
        &ClassificationInput::payment(PaymentPath::new("Pentadbiran")),
        None,
        None,
    )
    .unwrap();
    rule(&conn, "derma", receipt("Sumbangan Am"));

    let set = preview_classification(&conn, sid).unwrap();
    assert!(set.matches.is_empty());
}

#[test]
fn preview_does_not_mutate_anything() {
    let (mut conn, sid) = setup();
    insert_transactions(
        &mut conn,
        sid,
        &[
            credit("Derma Jumaat", None, "150.00"),
            credit("Sewa dewan", Some("Ali"), "300.00"),
        ],
    )
    .unwrap();
    rule(&conn, "derma", receipt("Sumbangan Am"));
    rule(&conn, "sewa", receipt("Hasil Sewaan"));

    let before = list_transactions(&conn, sid).unwrap();
    let version_before = repository::statement_version(&conn, sid).unwrap();
    let set = preview_classification(&conn, sid).unwrap();
    assert_eq!(set.matches.len(), 2);
    assert_eq!(list_transactions(&conn, sid).unwrap(), before);
    assert_eq!(repository::statement_version(&conn, sid).unwrap(), version_before);
}

#[test]
fn first_rule_in_registry_order_wins() {
    // Registry order decides, not keyword position or specificity.
    let (mut conn, sid) = setup();
    insert_transactions(&mut conn, sid, &[credit("Derma Jumaat", None, "10.00")]).unwrap();
    let first = rule(&conn, "jumaat", receipt("Sumbangan Am"));
    rule(&conn, "derma jumaat", receipt("Hasil Sewaan"));

    let set = preview_classification(&conn, sid).unwrap();
    assert_eq!(set.matches.len(), 1);
    assert_eq!(set.matches[0].rule_id, first);
    assert_eq!(set.matches[0].proposed_category, "Sumbangan Am");
}

#[test]
fn keyword_matches_counterparty_and_details_case_insensitively() {
    let (mut conn, sid) = setup();
    insert_transactions(
        &mut conn,
        sid,
        &[
            credit("IBG transfer", Some("Syarikat SEWAAN Bhd"), "500.00"),
            debit("DuitNow", Some("Bayaran KERTAS A4"), "35.00"),
            debit("Cash withdrawal", None, "100.00"),
        ],
    )
    .unwrap();
    rule(&conn, "Sewaan", receipt("Hasil Sewaan"));
    rule(
        &conn,
        "kertas",
        Classification::Payment(
            PaymentPath::new("Pentadbiran")
                .with_sub_category1("Alat Tulis")
                .with_sub_category2("Kertas"),
        ),
    );

    let set = preview_classification(&conn, sid).unwrap();
    assert_eq!(set.matches.len(), 2);
    assert_eq!(set.matches[1].proposed_sub_categories, vec!["Alat Tulis", "Kertas"]);

    apply_classification(&mut conn, sid, Some(PeriodBucket::NextMonth), None).unwrap();
    let rows = list_transactions(&conn, sid).unwrap();
    let paper = rows.iter().find(|r| r.debit_amount.is_some() && r.category_payment.is_some()).unwrap();
    assert_eq!(paper.sub_category1_payment.as_deref(), Some("Alat Tulis"));
    assert_eq!(paper.sub_category2_payment.as_deref(), Some("Kertas"));
    assert_eq!(paper.period_bucket, PeriodBucket::NextMonth);
    let cash = rows.iter().find(|r| r.description.as_deref() == Some("Cash withdrawal")).unwrap();
    assert!(!cash.is_categorized());
    assert_eq!(cash.period_bucket, PeriodBucket::CurrentMonth);
}

#[test]
fn second_apply_updates_nothing() {
    let (mut conn, sid) = setup();
    insert_transactions(
        &mut conn,
        sid,
        &[credit("Derma Jumaat", None, "10.00"), credit("Derma Subuh", None, "5.00")],
    )
    .unwrap();
    rule(&conn, "derma", receipt("Sumbangan Am"));

    assert_eq!(apply_classification(&mut conn, sid, None, None).unwrap(), 2);
    let version = repository::statement_version(&conn, sid).unwrap();
    assert_eq!(apply_classification(&mut conn, sid, None, None).unwrap(), 0);
    assert_eq!(repository::statement_version(&conn, sid).unwrap(), version);
}

#[test]
fn rule_with_stale_target_is_skipped_and_later_rule_still_matches() {
    let (mut conn, sid) = setup();
    insert_transactions(&mut conn, sid, &[debit("Bil servis lif", None, "80.00")]).unwrap();
    let stale = rule(&conn, "servis", Classification::Payment(PaymentPath::new("Penyelenggaraan")));
    rule(&conn, "lif", Classification::Payment(PaymentPath::new("Pentadbiran")));
    taxonomy::deactivate_payment_node(&conn, "Penyelenggaraan", None, None).unwrap();

    let set = preview_classification(&conn, sid).unwrap();
    assert_eq!(set.skipped_rules.len(), 1);
    assert_eq!(set.skipped_rules[0].rule_id, stale);
    assert_eq!(set.matches.len(), 1);
    assert_eq!(set.matches[0].proposed_category, "Pentadbiran");

    assert_eq!(apply_classification(&mut conn, sid, None, None).unwrap(), 1);
}

#[test]
fn apply_with_outdated_version_writes_nothing() {
    let (mut conn, sid) = setup();
    insert_transactions(
        &mut conn,
        sid,
        &[credit("Derma Jumaat", None, "10.00"), credit("Sewa dewan", None, "50.00")],
    )
    .unwrap();
    rule(&conn, "derma", receipt("Sumbangan Am"));
    let set = preview_classification(&conn, sid).unwrap();

    let other = list_transactions(&conn, sid).unwrap()[1].id;
    categorize_one(
        &mut conn,
        other,
        &ClassificationInput::receipt(ReceiptPath::new("Hasil Sewaan")),
        None,
        None,
    )
    .unwrap();

    let err = apply_classification(&mut conn, sid, None, Some(set.stamp())).unwrap_err();
    assert!(matches!(
        err,
        EngineError::StaleStatement {
            component: "statement",
            ..
        }
    ));
    assert_eq!(repository::list_uncategorized(&conn, sid).unwrap().len(), 1);

    let current = preview_classification(&conn, sid).unwrap().stamp();
    assert_eq!(apply_classification(&mut conn, sid, None, Some(current)).unwrap(), 1);
}

fn assert_stale(err: EngineError, expected_component: &str) {
    match err {
        EngineError::StaleStatement {
            component,
            expected,
            actual,
            ..
        } => {
            assert_eq!(component, expected_component);
            assert!(actual > expected);
        }
        other => panic!("expected a stale statement error, got {other:?}"),
    }
}

#[test]
fn rows_imported_after_preview_make_stamped_apply_fail() {
    let (mut conn, sid) = setup();
    insert_transactions(
        &mut conn,
        sid,
        &[credit("Derma Jumaat", None, "10.00"), credit("Sewa dewan", None, "50.00")],
    )
    .unwrap();
    rule(&conn, "derma", receipt("Sumbangan Am"));
    let set = preview_classification(&conn, sid).unwrap();
    assert_eq!(set.matches.len(), 1);

    insert_transactions(&mut conn, sid, &[credit("Derma Subuh", None, "5.00")]).unwrap();

    let err = apply_classification(&mut conn, sid, None, Some(set.stamp())).unwrap_err();
    assert_stale(err, "statement");
    assert_eq!(repository::list_uncategorized(&conn, sid).unwrap().len(), 3);
}

#[test]
fn rule_added_after_preview_makes_stamped_apply_fail() {
    let (mut conn, sid) = setup();
    insert_transactions(
        &mut conn,
        sid,
        &[credit("Derma Jumaat", None, "10.00"), credit("Sewa dewan", None, "50.00")],
    )
    .unwrap();
    rule(&conn, "derma", receipt("Sumbangan Am"));
    let set = preview_classification(&conn, sid).unwrap();

    rule(&conn, "sewa", receipt("Hasil Sewaan"));

    let err = apply_classification(&mut conn, sid, None, Some(set.stamp())).unwrap_err();
    assert_stale(err, "rules");
    assert_eq!(repository::list_uncategorized(&conn, sid).unwrap().len(), 2);
}

#[test]
fn rule_removed_after_preview_makes_stamped_apply_fail() {
    let (mut conn, sid) = setup();
    insert_transactions(&mut conn, sid, &[credit("Derma Jumaat", None, "10.00")]).unwrap();
    let id = rule(&conn, "derma", receipt("Sumbangan Am"));
    let set = preview_classification(&conn, sid).unwrap();

    assert!(remove_rule(&conn, id).unwrap());

    let err = apply_classification(&mut conn, sid, None, Some(set.stamp())).unwrap_err();
    assert_stale(err, "rules");
}

#[test]
fn taxonomy_change_after_preview_makes_stamped_apply_fail() {
    let (mut conn, sid) = setup();
    insert_transactions(&mut conn, sid, &[debit("Bil servis lif", None, "80.00")]).unwrap();
    rule(&conn, "servis", Classification::Payment(PaymentPath::new("Penyelenggaraan")));
    let set = preview_classification(&conn, sid).unwrap();
    assert_eq!(set.matches.len(), 1);

    taxonomy::deactivate_payment_node(&conn, "Penyelenggaraan", None, None).unwrap();

    let err = apply_classification(&mut conn, sid, None, Some(set.stamp())).unwrap_err();
    assert_stale(err, "taxonomy");
    assert_eq!(repository::list_uncategorized(&conn, sid).unwrap().len(), 1);
}

#[test]
fn import_and_new_rule_after_preview_report_the_statement_first() {
    let (mut conn, sid) = setup();
    insert_transactions(
        &mut conn,
        sid,
        &[credit("Derma Jumaat", None, "10.00"), credit("Sewa dewan", None, "50.00")],
    )
    .unwrap();
    rule(&conn, "derma", receipt("Sumbangan Am"));
    let set = preview_classification(&conn, sid).unwrap();

    insert_transactions(&mut conn, sid, &[credit("Derma Subuh", None, "5.00")]).unwrap();
    rule(&conn, "sewa", receipt("Hasil Sewaan"));

    let err = apply_classification(&mut conn, sid, None, Some(set.stamp())).unwrap_err();
    assert_stale(err, "statement");
    assert_eq!(repository::list_uncategorized(&conn, sid).unwrap().len(), 3);

    let fresh = preview_classification(&conn, sid).unwrap();
    assert_eq!(fresh.matches.len(), 3);
    assert_eq!(apply_classification(&mut conn, sid, None, Some(fresh.stamp())).unwrap(), 3);
}

#[test]
fn preview_stamp_renders_and_parses() {
    let stamp = PreviewStamp {
        statement_version: 4,
        rules_version: 2,
        taxonomy_version: 9,
    };
    assert_eq!(stamp.to_string(), "4:2:9");
    assert_eq!(" 4:2:9 ".parse::<PreviewStamp>().unwrap(), stamp);
    assert!("4:2".parse::<PreviewStamp>().is_err());
    assert!("4:x:9".parse::<PreviewStamp>().is_err());
}

#[test]
fn rows_added_after_preview_are_picked_up_by_apply() {
    let (mut conn, sid) = setup();
    insert_transactions(&mut conn, sid, &[credit("Derma Jumaat", None, "10.00")]).unwrap();
    rule(&conn, "derma", receipt("Sumbangan Am"));
    assert_eq!(preview_classification(&conn, sid).unwrap().matches.len(), 1);

    insert_transactions(&mut conn, sid, &[credit("Derma Subuh", None, "5.00")]).unwrap();
    assert_eq!(apply_classification(&mut conn, sid, None, None).unwrap(), 2);
}

#[test]
fn unknown_statement_is_reported() {
    let (conn, _) = setup();
    let err = preview_classification(&conn, 999).unwrap_err();
    assert!(matches!(err, EngineError::StatementNotFound(999)));
}

#[test]
fn pure_matcher_treats_missing_fields_as_empty() {
    let (mut conn, sid) = setup();
    let mut row = credit("", None, "1.00");
    row.description = None;
    row.payment_details = Some("zakat fitrah".into());
    insert_transactions(&mut conn, sid, &[row]).unwrap();
    let rows = list_transactions(&conn, sid).unwrap();
    assert_eq!(search_text(&rows[0]), "  zakat fitrah");

    rule(&conn, "ZAKAT", receipt("Sumbangan Am"));
    let tree = Taxonomy::load(&conn).unwrap();
    let outcome = match_transactions(&rows, &load_rules(&conn).unwrap(), &tree);
    assert_eq!(outcome.matches.len(), 1);
    assert!(outcome.skipped_rules.is_empty());
}
