// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Mapping from (statement month, period bucket) to the monthly cash-book a
//! transaction is counted in. The transaction date itself is never moved.

use chrono::{Months, NaiveDate};
use rusqlite::Connection;

use crate::error::{EngineError, Result};
use crate::models::{FinancialTransaction, PeriodBucket};
use crate::repository;

/// First day of a `YYYY-MM` month.
pub fn month_start(month: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
        .map_err(|_| EngineError::InvalidMonth(month.to_string()))
}

pub fn shift_month(month: &str, offset: i32) -> Result<String> {
    let start = month_start(month)?;
    let shifted = if offset >= 0 {
        start.checked_add_months(Months::new(offset.unsigned_abs()))
    } else {
        start.checked_sub_months(Months::new(offset.unsigned_abs()))
    }
    .ok_or_else(|| EngineError::InvalidMonth(month.to_string()))?;
    Ok(shifted.format("%Y-%m").to_string())
}

/// The cash-book month a row of a `statement_month` statement counts toward.
pub fn ledger_month(statement_month: &str, bucket: PeriodBucket) -> Result<String> {
    shift_month(statement_month, bucket.month_offset())
}

/// Rows of one statement in one bucket, for the report generator.
pub fn statement_rows(
    conn: &Connection,
    statement_id: i64,
    bucket: PeriodBucket,
) -> Result<Vec<FinancialTransaction>> {
    repository::get_statement(conn, statement_id)?;
    repository::list_by_period(conn, statement_id, bucket)
}

/// Every row, across statements, whose cash-book month is `month`.
pub fn ledger_rows(conn: &Connection, month: &str) -> Result<Vec<FinancialTransaction>> {
    let month = shift_month(month, 0)?;
    let previous = shift_month(&month, -1)?;
    let next = shift_month(&month, 1)?;
    repository::list_by_ledger_month(conn, &previous, &month, &next)
}
