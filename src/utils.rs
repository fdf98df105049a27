// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

/// Validate a `YYYY-MM` month and return it zero-padded.
pub fn parse_month(s: &str) -> Result<String> {
    let d = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}', expected YYYY-MM", s))?;
    Ok(d.format("%Y-%m").to_string())
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

/// Parse `"1, 2,3"` into ids, keeping first occurrence order.
pub fn parse_id_list(s: &str) -> Result<Vec<i64>> {
    let mut ids: Vec<i64> = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id = part
            .parse::<i64>()
            .with_context(|| format!("Invalid transaction id '{}'", part))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

pub fn get_setting(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM settings WHERE key=?1",
        params![key],
        |r| r.get(0),
    )
    .optional()
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn busy_timeout_ms(conn: &Connection) -> Result<u64> {
    match get_setting(conn, "busy_timeout_ms")? {
        Some(v) => v
            .trim()
            .parse::<u64>()
            .with_context(|| format!("Invalid busy_timeout_ms setting '{}'", v)),
        None => Ok(DEFAULT_BUSY_TIMEOUT_MS),
    }
}

fn counter(conn: &Connection, key: &str) -> rusqlite::Result<i64> {
    Ok(get_setting(conn, key)?
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0))
}

fn bump_counter(conn: &Connection, key: &str) -> rusqlite::Result<i64> {
    let next = counter(conn, key)? + 1;
    set_setting(conn, key, &next.to_string())?;
    Ok(next)
}

pub fn taxonomy_version(conn: &Connection) -> rusqlite::Result<i64> {
    counter(conn, "taxonomy_version")
}

pub fn bump_taxonomy_version(conn: &Connection) -> rusqlite::Result<i64> {
    bump_counter(conn, "taxonomy_version")
}

pub fn rules_version(conn: &Connection) -> rusqlite::Result<i64> {
    counter(conn, "rules_version")
}

pub fn bump_rules_version(conn: &Connection) -> rusqlite::Result<i64> {
    bump_counter(conn, "rules_version")
}

pub fn parse_id(raw: &str, what: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .with_context(|| format!("Invalid {} id '{}'", what, raw))
}
