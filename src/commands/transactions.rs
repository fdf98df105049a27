// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::categorize::{categorize_many, categorize_one};
use crate::models::{
    ClassificationInput, FinancialTransaction, PaymentPath, PeriodBucket, ReceiptPath,
};
use crate::repository::{get_transaction, list_by_category, list_uncategorized};
use crate::utils::{maybe_print_json, parse_id, parse_id_list, pretty_table};
use anyhow::{Result, anyhow};
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", sub)) => show(conn, sub)?,
        Some(("categorize", sub)) => categorize(conn, sub)?,
        Some(("bulk", sub)) => bulk(conn, sub)?,
        Some(("uncategorized", sub)) => {
            let statement_id = parse_id(sub.get_one::<String>("statement").unwrap(), "statement")?;
            let rows = list_uncategorized(conn, statement_id)?;
            print_transactions(sub, &rows)?;
        }
        Some(("by-category", sub)) => {
            let statement_id = parse_id(sub.get_one::<String>("statement").unwrap(), "statement")?;
            let category = sub.get_one::<String>("category").unwrap().trim();
            let rows = list_by_category(conn, statement_id, category)?;
            print_transactions(sub, &rows)?;
        }
        _ => {}
    }
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = parse_id(sub.get_one::<String>("id").unwrap(), "transaction")?;
    let tx = get_transaction(conn, id)?.ok_or_else(|| anyhow!("Transaction {} not found", id))?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &tx)? {
        println!("{}", pretty_table(&HEADERS, vec![row_cells(&tx)]));
    }
    Ok(())
}

fn categorize(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = parse_id(sub.get_one::<String>("id").unwrap(), "transaction")?;
    let input = classification_input(sub);
    let bucket = parse_bucket(sub)?;
    let tx = categorize_one(conn, id, &input, bucket, notes(sub))?;
    println!(
        "Categorized transaction {} as {} ({})",
        tx.id,
        category_label(&tx),
        tx.period_bucket
    );
    Ok(())
}

fn bulk(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let ids = parse_id_list(sub.get_one::<String>("ids").unwrap())?;
    if ids.is_empty() {
        return Err(anyhow!("No transaction ids given"));
    }
    let input = classification_input(sub);
    let bucket = parse_bucket(sub)?;
    let outcome = categorize_many(conn, &ids, &input, bucket, notes(sub))?;
    println!("Updated {} transaction(s)", outcome.updated_count);
    if !outcome.failed_ids.is_empty() {
        let failed: Vec<String> = outcome.failed_ids.iter().map(|i| i.to_string()).collect();
        println!("Failed: {}", failed.join(", "));
    }
    Ok(())
}

fn arg(sub: &clap::ArgMatches, name: &str) -> Option<String> {
    sub.get_one::<String>(name)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn notes(sub: &clap::ArgMatches) -> Option<String> {
    arg(sub, "notes")
}

/// Build the caller's classification from `--receipt*` / `--payment*` flags
/// without checking the axis; the service rejects ambiguous input.
pub fn classification_input(sub: &clap::ArgMatches) -> ClassificationInput {
    let receipt = arg(sub, "receipt").map(|category| ReceiptPath {
        category,
        sub_category: arg(sub, "receipt-sub"),
        investment_type: arg(sub, "investment-type"),
        investment_institution: arg(sub, "investment-institution"),
    });
    let payment = arg(sub, "payment").map(|category| PaymentPath {
        category,
        sub_category1: arg(sub, "payment-sub1"),
        sub_category2: arg(sub, "payment-sub2"),
    });
    ClassificationInput { receipt, payment }
}

pub fn parse_bucket(sub: &clap::ArgMatches) -> Result<Option<PeriodBucket>> {
    arg(sub, "bucket")
        .map(|s| s.parse::<PeriodBucket>().map_err(|e| anyhow!(e)))
        .transpose()
}

const HEADERS: [&str; 8] = [
    "ID", "Date", "Description", "Counterparty", "Debit", "Credit", "Category", "Bucket",
];

fn category_label(tx: &FinancialTransaction) -> String {
    match tx.classification() {
        Some(c) => format!("{}: {}", c.kind().as_str(), super::rules::path_label(&c)),
        None => String::new(),
    }
}

fn row_cells(tx: &FinancialTransaction) -> Vec<String> {
    vec![
        tx.id.to_string(),
        tx.transaction_date.to_string(),
        tx.description.clone().unwrap_or_default(),
        tx.sender_or_recipient_name.clone().unwrap_or_default(),
        tx.debit_amount.map(|d| format!("{:.2}", d)).unwrap_or_default(),
        tx.credit_amount.map(|d| format!("{:.2}", d)).unwrap_or_default(),
        category_label(tx),
        tx.period_bucket.to_string(),
    ]
}

pub fn print_transactions(sub: &clap::ArgMatches, rows: &[FinancialTransaction]) -> Result<()> {
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
        let data = rows.iter().map(row_cells).collect();
        println!("{}", pretty_table(&HEADERS, data));
    }
    Ok(())
}
