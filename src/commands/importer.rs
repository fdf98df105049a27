// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::NewTransaction;
use crate::repository::insert_transactions;
use crate::utils::{parse_date, parse_decimal, parse_id};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("rows", sub)) => import_rows(conn, sub),
        _ => Ok(()),
    }
}

fn import_rows(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let statement_id = parse_id(sub.get_one::<String>("statement").unwrap(), "statement")?;
    let path = sub.get_one::<String>("path").unwrap().trim();
    let rows = read_rows(path)?;
    let n = insert_transactions(conn, statement_id, &rows)
        .with_context(|| format!("Import {} into statement {}", path, statement_id))?;
    println!("Imported {} row(s) from {} into statement {}", n, path, statement_id);
    Ok(())
}

fn optional(field: Option<&str>) -> Option<String> {
    field
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Read normalized ingestion output: `date,description,sender,details,debit,credit`.
pub fn read_rows(path: &str) -> Result<Vec<NewTransaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path))?;

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let rec = result?;
        let line = i + 2;
        let date_raw = rec.get(0).context("date missing")?;
        let transaction_date = parse_date(date_raw)
            .with_context(|| format!("Line {}: invalid transaction date", line))?;
        let amount = |idx: usize| -> Result<_> {
            optional(rec.get(idx))
                .map(|s| parse_decimal(&s))
                .transpose()
                .with_context(|| format!("Line {}: invalid amount", line))
        };
        rows.push(NewTransaction {
            transaction_date,
            description: optional(rec.get(1)),
            sender_or_recipient_name: optional(rec.get(2)),
            payment_details: optional(rec.get(3)),
            debit_amount: amount(4)?,
            credit_amount: amount(5)?,
        });
    }
    Ok(rows)
}
