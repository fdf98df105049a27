// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Operator-driven categorization of one or many transactions.

use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashSet;

use crate::error::{EngineError, Result};
use crate::models::{Classification, ClassificationInput, FinancialTransaction, PeriodBucket};
use crate::repository::{self, CategorizationUpdate, NotesUpdate};
use crate::taxonomy::Taxonomy;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub updated_count: usize,
    pub failed_ids: Vec<i64>,
}

fn resolve(taxonomy: &Taxonomy, input: &ClassificationInput) -> Result<Classification> {
    let classification = input.resolve()?;
    taxonomy.validate(&classification)?;
    Ok(classification)
}

/// Overwrite every categorization field of one transaction. Nothing is
/// written unless the classification is legal.
pub fn categorize_one(
    conn: &mut Connection,
    transaction_id: i64,
    input: &ClassificationInput,
    bucket: Option<PeriodBucket>,
    notes: Option<String>,
) -> Result<FinancialTransaction> {
    let tx = repository::begin_unit(conn)?;
    let taxonomy = Taxonomy::load(&tx)?;
    let classification = resolve(&taxonomy, input)?;
    let existing = repository::get_transaction(&tx, transaction_id)?
        .ok_or(EngineError::TransactionNotFound(transaction_id))?;

    let update = CategorizationUpdate {
        transaction_id,
        classification,
        period_bucket: bucket.unwrap_or_default(),
        notes: NotesUpdate::Set(notes),
    };
    repository::write_categorizations(&tx, std::slice::from_ref(&update))?;
    repository::bump_statement_version(&tx, existing.statement_id)?;
    let updated = repository::get_transaction(&tx, transaction_id)?
        .ok_or(EngineError::TransactionNotFound(transaction_id))?;
    tx.commit()?;
    tracing::info!(
        transaction_id,
        category = update.classification.category(),
        bucket = %update.period_bucket,
        "transaction categorized"
    );
    Ok(updated)
}

/// Apply one classification to every id in `transaction_ids`. Ids that no
/// longer exist are reported in `failed_ids`; the rest are committed together.
/// An illegal classification fails the whole call before anything is written.
pub fn categorize_many(
    conn: &mut Connection,
    transaction_ids: &[i64],
    input: &ClassificationInput,
    bucket: Option<PeriodBucket>,
    notes: Option<String>,
) -> Result<BulkOutcome> {
    let tx = repository::begin_unit(conn)?;
    let taxonomy = Taxonomy::load(&tx)?;
    let classification = resolve(&taxonomy, input)?;
    let bucket = bucket.unwrap_or_default();

    let mut seen: HashSet<i64> = HashSet::with_capacity(transaction_ids.len());
    let mut touched: HashSet<i64> = HashSet::new();
    let mut statements: Vec<i64> = Vec::new();
    let mut updates = Vec::new();
    let mut failed_ids = Vec::new();
    for &id in transaction_ids {
        if !seen.insert(id) {
            continue;
        }
        match repository::get_transaction(&tx, id)? {
            Some(row) => {
                if touched.insert(row.statement_id) {
                    statements.push(row.statement_id);
                }
                updates.push(CategorizationUpdate {
                    transaction_id: id,
                    classification: classification.clone(),
                    period_bucket: bucket,
                    notes: NotesUpdate::Set(notes.clone()),
                });
            }
            None => {
                tracing::warn!(transaction_id = id, "bulk categorize: transaction not found");
                failed_ids.push(id);
            }
        }
    }

    let updated_count = repository::write_categorizations(&tx, &updates)?;
    for statement_id in statements {
        repository::bump_statement_version(&tx, statement_id)?;
    }
    tx.commit()?;
    tracing::info!(
        updated_count,
        failed = failed_ids.len(),
        category = classification.category(),
        bucket = %bucket,
        "bulk categorize finished"
    );
    Ok(BulkOutcome {
        updated_count,
        failed_ids,
    })
}
