// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Statement and transaction persistence.
//!
//! Every categorization write goes through [`begin_unit`], which opens an
//! IMMEDIATE SQLite transaction. Writers are serialized by SQLite's write
//! lock; readers in WAL mode keep working against the last committed state.

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use rust_decimal::Decimal;

use crate::error::{EngineError, Result};
use crate::models::{Classification, FinancialTransaction, NewTransaction, PeriodBucket, Statement};

const TX_COLUMNS: &str = "id, statement_id, transaction_date, description, sender_or_recipient_name, \
     payment_details, debit_amount, credit_amount, category_receipt, sub_category_receipt, \
     investment_type, investment_institution, category_payment, sub_category1_payment, \
     sub_category2_payment, notes, period_bucket";

/// What to do with a transaction's notes when its categorization is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotesUpdate {
    Keep,
    Set(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorizationUpdate {
    pub transaction_id: i64,
    pub classification: Classification,
    pub period_bucket: PeriodBucket,
    pub notes: NotesUpdate,
}

pub fn create_statement(conn: &Connection, name: &str, month: &str) -> Result<Statement> {
    let month = crate::period::shift_month(month, 0)?;
    conn.execute(
        "INSERT INTO statements(name, month) VALUES (?1, ?2)",
        params![name.trim(), month],
    )?;
    get_statement(conn, conn.last_insert_rowid())
}

pub fn get_statement(conn: &Connection, id: i64) -> Result<Statement> {
    conn.query_row(
        "SELECT id, name, month, version FROM statements WHERE id=?1",
        params![id],
        row_to_statement,
    )
    .optional()?
    .ok_or(EngineError::StatementNotFound(id))
}

pub fn list_statements(conn: &Connection) -> Result<Vec<Statement>> {
    let mut stmt =
        conn.prepare("SELECT id, name, month, version FROM statements ORDER BY month DESC, id DESC")?;
    let rows = stmt.query_map([], row_to_statement)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn row_to_statement(r: &Row<'_>) -> rusqlite::Result<Statement> {
    Ok(Statement {
        id: r.get(0)?,
        name: r.get(1)?,
        month: r.get(2)?,
        version: r.get(3)?,
    })
}

/// Insert one ingested batch. Rows must carry exactly one positive amount.
/// A non-empty batch bumps the statement version.
pub fn insert_transactions(
    conn: &mut Connection,
    statement_id: i64,
    rows: &[NewTransaction],
) -> Result<usize> {
    get_statement(conn, statement_id)?;
    let tx = begin_unit(conn)?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO financial_transactions(statement_id, transaction_date, description,
                sender_or_recipient_name, payment_details, debit_amount, credit_amount, period_bucket)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
        )?;
        for (i, row) in rows.iter().enumerate() {
            let (debit, credit) = normalize_amounts(row.debit_amount, row.credit_amount)
                .map_err(|msg| EngineError::InvalidAmounts(format!("row {}: {}", i + 1, msg)))?;
            stmt.execute(params![
                statement_id,
                row.transaction_date,
                row.description,
                row.sender_or_recipient_name,
                row.payment_details,
                debit.map(|d| d.to_string()),
                credit.map(|d| d.to_string()),
                PeriodBucket::CurrentMonth,
            ])?;
        }
    }
    if !rows.is_empty() {
        bump_statement_version(&tx, statement_id)?;
    }
    tx.commit()?;
    tracing::info!(statement_id, count = rows.len(), "transactions imported");
    Ok(rows.len())
}

fn normalize_amounts(
    debit: Option<Decimal>,
    credit: Option<Decimal>,
) -> std::result::Result<(Option<Decimal>, Option<Decimal>), &'static str> {
    let d = debit.unwrap_or(Decimal::ZERO);
    let c = credit.unwrap_or(Decimal::ZERO);
    if d < Decimal::ZERO || c < Decimal::ZERO {
        return Err("amounts must not be negative");
    }
    match (d > Decimal::ZERO, c > Decimal::ZERO) {
        (true, false) => Ok((Some(d), None)),
        (false, true) => Ok((None, Some(c))),
        (true, true) => Err("both debit and credit are set"),
        (false, false) => Err("neither debit nor credit is set"),
    }
}

pub fn get_transaction(conn: &Connection, id: i64) -> Result<Option<FinancialTransaction>> {
    let sql = format!("SELECT {TX_COLUMNS} FROM financial_transactions WHERE id=?1");
    Ok(conn
        .query_row(&sql, params![id], row_to_transaction)
        .optional()?)
}

pub fn list_transactions(conn: &Connection, statement_id: i64) -> Result<Vec<FinancialTransaction>> {
    query_transactions(conn, "statement_id=?1", params![statement_id])
}

/// Rows with no category on either axis, in id order.
pub fn list_uncategorized(conn: &Connection, statement_id: i64) -> Result<Vec<FinancialTransaction>> {
    query_transactions(
        conn,
        "statement_id=?1 AND category_receipt IS NULL AND category_payment IS NULL",
        params![statement_id],
    )
}

/// Rows whose receipt or payment category is `category`.
pub fn list_by_category(
    conn: &Connection,
    statement_id: i64,
    category: &str,
) -> Result<Vec<FinancialTransaction>> {
    query_transactions(
        conn,
        "statement_id=?1 AND (category_receipt=?2 OR category_payment=?2)",
        params![statement_id, category],
    )
}

pub fn list_by_period(
    conn: &Connection,
    statement_id: i64,
    bucket: PeriodBucket,
) -> Result<Vec<FinancialTransaction>> {
    query_transactions(
        conn,
        "statement_id=?1 AND period_bucket=?2",
        params![statement_id, bucket],
    )
}

/// Rows across all statements that land in ledger month `month`
/// (statement month shifted by the row's bucket).
pub fn list_by_ledger_month(
    conn: &Connection,
    previous: &str,
    month: &str,
    next: &str,
) -> Result<Vec<FinancialTransaction>> {
    query_transactions(
        conn,
        "statement_id IN (SELECT id FROM statements WHERE month=?2) AND period_bucket='currentMonth'
         OR statement_id IN (SELECT id FROM statements WHERE month=?3) AND period_bucket='previousMonth'
         OR statement_id IN (SELECT id FROM statements WHERE month=?1) AND period_bucket='nextMonth'",
        params![previous, month, next],
    )
}

fn query_transactions(
    conn: &Connection,
    filter: &str,
    args: &[&dyn rusqlite::ToSql],
) -> Result<Vec<FinancialTransaction>> {
    let sql = format!(
        "SELECT {TX_COLUMNS} FROM financial_transactions WHERE {filter} ORDER BY transaction_date, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(args, row_to_transaction)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn decimal_column(r: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = r.get(idx)?;
    raw.map(|s| {
        s.parse::<Decimal>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn row_to_transaction(r: &Row<'_>) -> rusqlite::Result<FinancialTransaction> {
    Ok(FinancialTransaction {
        id: r.get(0)?,
        statement_id: r.get(1)?,
        transaction_date: r.get(2)?,
        description: r.get(3)?,
        sender_or_recipient_name: r.get(4)?,
        payment_details: r.get(5)?,
        debit_amount: decimal_column(r, 6)?,
        credit_amount: decimal_column(r, 7)?,
        category_receipt: r.get(8)?,
        sub_category_receipt: r.get(9)?,
        investment_type: r.get(10)?,
        investment_institution: r.get(11)?,
        category_payment: r.get(12)?,
        sub_category1_payment: r.get(13)?,
        sub_category2_payment: r.get(14)?,
        notes: r.get(15)?,
        period_bucket: r.get(16)?,
    })
}

/// Open one unit of work. Takes the database write lock up front so two
/// categorization runs never interleave row updates.
pub fn begin_unit(conn: &mut Connection) -> Result<Transaction<'_>> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}

pub fn statement_version(conn: &Connection, statement_id: i64) -> Result<i64> {
    Ok(get_statement(conn, statement_id)?.version)
}

pub fn bump_statement_version(conn: &Connection, statement_id: i64) -> Result<i64> {
    conn.execute(
        "UPDATE statements SET version = version + 1 WHERE id=?1",
        params![statement_id],
    )?;
    statement_version(conn, statement_id)
}

/// Write categorizations with full overwrite of both axes. Opposite-axis and
/// investment columns are cleared whenever the new classification does not
/// carry them.
pub fn write_categorizations(conn: &Connection, updates: &[CategorizationUpdate]) -> Result<usize> {
    let mut keep_notes = conn.prepare_cached(
        "UPDATE financial_transactions SET
            category_receipt=?1, sub_category_receipt=?2, investment_type=?3,
            investment_institution=?4, category_payment=?5, sub_category1_payment=?6,
            sub_category2_payment=?7, period_bucket=?8, updated_at=datetime('now')
         WHERE id=?9",
    )?;
    let mut set_notes = conn.prepare_cached(
        "UPDATE financial_transactions SET
            category_receipt=?1, sub_category_receipt=?2, investment_type=?3,
            investment_institution=?4, category_payment=?5, sub_category1_payment=?6,
            sub_category2_payment=?7, period_bucket=?8, updated_at=datetime('now'), notes=?10
         WHERE id=?9",
    )?;

    let mut written = 0usize;
    for u in updates {
        let (r, p) = match &u.classification {
            Classification::Receipt(r) => (Some(r), None),
            Classification::Payment(p) => (None, Some(p)),
        };
        let cols = (
            r.map(|r| r.category.as_str()),
            r.and_then(|r| r.sub_category.as_deref()),
            r.and_then(|r| r.investment_type.as_deref()),
            r.and_then(|r| r.investment_institution.as_deref()),
            p.map(|p| p.category.as_str()),
            p.and_then(|p| p.sub_category1.as_deref()),
            p.and_then(|p| p.sub_category2.as_deref()),
        );
        let n = match &u.notes {
            NotesUpdate::Keep => keep_notes.execute(params![
                cols.0,
                cols.1,
                cols.2,
                cols.3,
                cols.4,
                cols.5,
                cols.6,
                u.period_bucket,
                u.transaction_id,
            ])?,
            NotesUpdate::Set(notes) => set_notes.execute(params![
                cols.0,
                cols.1,
                cols.2,
                cols.3,
                cols.4,
                cols.5,
                cols.6,
                u.period_bucket,
                u.transaction_id,
                notes,
            ])?,
        };
        written += n;
    }
    Ok(written)
}
