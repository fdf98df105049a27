// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::transactions::{parse_bucket, print_transactions};
use crate::period::{ledger_rows, statement_rows};
use crate::utils::{parse_id, parse_month};
use anyhow::{Result, anyhow};
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("rows", sub)) => rows(conn, sub),
        _ => Ok(()),
    }
}

fn rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = if let Some(month) = sub.get_one::<String>("month") {
        ledger_rows(conn, &parse_month(month)?)?
    } else if let Some(raw) = sub.get_one::<String>("statement") {
        let statement_id = parse_id(raw, "statement")?;
        let bucket = parse_bucket(sub)?.unwrap_or_default();
        statement_rows(conn, statement_id, bucket)?
    } else {
        return Err(anyhow!("Pass --month or --statement with --bucket"));
    };
    print_transactions(sub, &data)
}
