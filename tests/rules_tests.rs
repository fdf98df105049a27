// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rekonsil::models::{Classification, PaymentPath};
use rekonsil::rules::{load_rules, remove_rule};
use rekonsil::taxonomy::{self, NewNode};
use rekonsil::utils::rules_version;
use rekonsil::{cli, commands::rules, db};
use rusqlite::Connection;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    taxonomy::add_receipt_category(&conn, "Sumbangan Am", false).unwrap();
    let node = |name: &str, code: &str| NewNode {
        name: name.into(),
        code: code.into(),
        ..Default::default()
    };
    taxonomy::add_payment_category(&conn, &node("Penyelenggaraan", "M200")).unwrap();
    taxonomy::add_payment_sub_category1(&conn, "Penyelenggaraan", &node("Utiliti", "M210")).unwrap();
    taxonomy::add_payment_sub_category2(&conn, "Penyelenggaraan", "Utiliti", &node("Elektrik", "M211"))
        .unwrap();
    conn
}

fn run(conn: &Connection, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["rekonsil", "rules"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    if let Some(("rules", rules_m)) = matches.subcommand() {
        rules::handle(conn, rules_m)
    } else {
        panic!("rules command not parsed");
    }
}

#[test]
fn rules_add_trims_and_stores_full_payment_path() {
    let conn = setup();
    run(
        &conn,
        &[
            "add",
            "--keyword",
            "  TNB ",
            "--kind",
            "payment",
            "--category",
            " Penyelenggaraan ",
            "--sub",
            "Utiliti",
            "--sub2",
            "Elektrik",
        ],
    )
    .unwrap();

    let rules = load_rules(&conn).unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].keyword, "TNB");
    assert_eq!(
        rules[0].target,
        Classification::Payment(
            PaymentPath::new("Penyelenggaraan")
                .with_sub_category1("Utiliti")
                .with_sub_category2("Elektrik")
        )
    );
}

#[test]
fn rules_add_rejects_blank_keyword() {
    let conn = setup();
    let err = run(
        &conn,
        &["add", "--keyword", "   ", "--kind", "receipt", "--category", "Sumbangan Am"],
    )
    .unwrap_err();
    assert!(err.to_string().contains("Invalid rule keyword"));
    assert!(load_rules(&conn).unwrap().is_empty());
}

#[test]
fn rules_add_rejects_unknown_target() {
    let conn = setup();
    let err = run(
        &conn,
        &["add", "--keyword", "zakat", "--kind", "receipt", "--category", "Zakat"],
    )
    .unwrap_err();
    assert!(err.to_string().contains("Unknown category 'Zakat'"));

    let err = run(
        &conn,
        &[
            "add",
            "--keyword",
            "sewa",
            "--kind",
            "receipt",
            "--category",
            "Sumbangan Am",
            "--sub",
            "x",
            "--sub2",
            "y",
        ],
    )
    .unwrap_err();
    assert!(err.to_string().contains("at most one sub-category"));
}

#[test]
fn rules_list_keeps_registry_order() {
    let conn = setup();
    for kw in ["b-second", "a-first"] {
        run(&conn, &["add", "--keyword", kw, "--kind", "receipt", "--category", "Sumbangan Am"])
            .unwrap();
    }
    let keywords: Vec<String> = load_rules(&conn).unwrap().into_iter().map(|r| r.keyword).collect();
    assert_eq!(keywords, vec!["b-second", "a-first"]);
}

#[test]
fn rules_rm_trims_id_argument() {
    let conn = setup();
    run(&conn, &["add", "--keyword", "derma", "--kind", "receipt", "--category", "Sumbangan Am"])
        .unwrap();
    let id = load_rules(&conn).unwrap()[0].id;

    run(&conn, &["rm", "--id", &format!(" {} ", id)]).unwrap();
    assert!(load_rules(&conn).unwrap().is_empty());
    assert!(!remove_rule(&conn, id).unwrap());
    assert!(run(&conn, &["rm", "--id", &id.to_string()]).is_err());
}

#[test]
fn rule_writes_bump_the_rules_version() {
    let conn = setup();
    assert_eq!(rules_version(&conn).unwrap(), 0);
    run(&conn, &["add", "--keyword", "derma", "--kind", "receipt", "--category", "Sumbangan Am"])
        .unwrap();
    assert_eq!(rules_version(&conn).unwrap(), 1);

    let blank = ["add", "--keyword", " ", "--kind", "receipt", "--category", "Sumbangan Am"];
    assert!(run(&conn, &blank).is_err());
    assert_eq!(rules_version(&conn).unwrap(), 1);

    let id = load_rules(&conn).unwrap()[0].id;
    assert!(remove_rule(&conn, id).unwrap());
    assert_eq!(rules_version(&conn).unwrap(), 2);
    assert!(!remove_rule(&conn, id).unwrap());
    assert_eq!(rules_version(&conn).unwrap(), 2);
}
