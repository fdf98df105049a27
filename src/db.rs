// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::busy_timeout_ms;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Rekonsil", "rekonsil"));

pub const DB_ENV: &str = "REKONSIL_DB";

pub fn db_path() -> Result<PathBuf> {
    if let Some(p) = std::env::var_os(DB_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(p));
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("rekonsil.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    open_at(&db_path()?)
}

/// Open a file database in WAL mode so statement previews never block writers.
pub fn open_at(path: &Path) -> Result<Connection> {
    let conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    init_schema(&conn)?;
    let ms = busy_timeout_ms(&conn)?;
    conn.busy_timeout(Duration::from_millis(ms))?;
    tracing::debug!(path = %path.display(), busy_timeout_ms = ms, "database opened");
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS statements(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        month TEXT NOT NULL, -- YYYY-MM
        version INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS receipt_categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        requires_investment_fields INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS receipt_sub_categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        UNIQUE(category_id, name),
        FOREIGN KEY(category_id) REFERENCES receipt_categories(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS payment_categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        code TEXT NOT NULL,
        description TEXT,
        active INTEGER NOT NULL DEFAULT 1,
        sort_order INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS payment_sub_categories1(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        code TEXT NOT NULL,
        description TEXT,
        active INTEGER NOT NULL DEFAULT 1,
        sort_order INTEGER NOT NULL DEFAULT 0,
        UNIQUE(category_id, name),
        FOREIGN KEY(category_id) REFERENCES payment_categories(id) ON DELETE RESTRICT
    );

    CREATE TABLE IF NOT EXISTS payment_sub_categories2(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sub_category1_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        code TEXT NOT NULL,
        description TEXT,
        active INTEGER NOT NULL DEFAULT 1,
        sort_order INTEGER NOT NULL DEFAULT 0,
        UNIQUE(sub_category1_id, name),
        FOREIGN KEY(sub_category1_id) REFERENCES payment_sub_categories1(id) ON DELETE RESTRICT
    );

    CREATE TABLE IF NOT EXISTS rules(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        keyword TEXT NOT NULL,
        target_kind TEXT NOT NULL CHECK(target_kind IN ('receipt','payment')),
        category TEXT NOT NULL,
        sub_category TEXT,
        sub_category2 TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS financial_transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        statement_id INTEGER NOT NULL,
        transaction_date TEXT NOT NULL,
        description TEXT,
        sender_or_recipient_name TEXT,
        payment_details TEXT,
        debit_amount TEXT,
        credit_amount TEXT,
        category_receipt TEXT,
        sub_category_receipt TEXT,
        investment_type TEXT,
        investment_institution TEXT,
        category_payment TEXT,
        sub_category1_payment TEXT,
        sub_category2_payment TEXT,
        notes TEXT,
        period_bucket TEXT NOT NULL DEFAULT 'currentMonth'
            CHECK(period_bucket IN ('previousMonth','currentMonth','nextMonth')),
        updated_at TEXT,
        CHECK(category_receipt IS NULL OR category_payment IS NULL),
        FOREIGN KEY(statement_id) REFERENCES statements(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_financial_transactions_statement
        ON financial_transactions(statement_id);
    "#,
    )
}
