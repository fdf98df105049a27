// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{params, Connection, Row};

use crate::error::{EngineError, Result};
use crate::models::{Classification, PaymentPath, ReceiptPath, Rule, TargetKind};
use crate::taxonomy::Taxonomy;
use crate::utils::bump_rules_version;

/// Rules in registry order. The first matching rule wins, so this order is
/// part of the classification result.
pub fn load_rules(conn: &Connection) -> Result<Vec<Rule>> {
    let mut stmt = conn.prepare(
        "SELECT id, keyword, target_kind, category, sub_category, sub_category2 FROM rules ORDER BY id",
    )?;
    let rows = stmt.query_map([], row_to_rule)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn row_to_rule(r: &Row<'_>) -> rusqlite::Result<Rule> {
    let kind: String = r.get(2)?;
    let kind = kind.parse::<TargetKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, e.into())
    })?;
    let category: String = r.get(3)?;
    let sub: Option<String> = r.get(4)?;
    let sub2: Option<String> = r.get(5)?;
    let target = match kind {
        TargetKind::Receipt => Classification::Receipt(ReceiptPath {
            category,
            sub_category: sub,
            ..Default::default()
        }),
        TargetKind::Payment => Classification::Payment(PaymentPath {
            category,
            sub_category1: sub,
            sub_category2: sub2,
        }),
    };
    Ok(Rule {
        id: r.get(0)?,
        keyword: r.get(1)?,
        target,
    })
}

/// Register a keyword rule. The target must be legal in the current taxonomy
/// and must not carry investment fields.
pub fn add_rule(
    conn: &Connection,
    taxonomy: &Taxonomy,
    keyword: &str,
    target: &Classification,
) -> Result<Rule> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Err(EngineError::InvalidKeyword(keyword.to_string()));
    }
    taxonomy.validate(target)?;
    let (kind, category, sub, sub2) = match target {
        Classification::Receipt(r) => {
            if r.has_investment_fields() {
                return Err(crate::error::TaxonomyError::InvestmentFieldsNotAllowed(
                    r.category.clone(),
                )
                .into());
            }
            (TargetKind::Receipt, &r.category, r.sub_category.as_deref(), None)
        }
        Classification::Payment(p) => (
            TargetKind::Payment,
            &p.category,
            p.sub_category1.as_deref(),
            p.sub_category2.as_deref(),
        ),
    };
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO rules(keyword, target_kind, category, sub_category, sub_category2)
         VALUES (?1,?2,?3,?4,?5)",
        params![keyword, kind.as_str(), category, sub, sub2],
    )?;
    let id = tx.last_insert_rowid();
    bump_rules_version(&tx)?;
    tx.commit()?;
    tracing::info!(id, keyword, kind = kind.as_str(), category = category.as_str(), "rule added");
    Ok(Rule {
        id,
        keyword: keyword.to_string(),
        target: target.clone(),
    })
}

/// Returns false when no rule had that id.
pub fn remove_rule(conn: &Connection, id: i64) -> Result<bool> {
    let tx = conn.unchecked_transaction()?;
    let n = tx.execute("DELETE FROM rules WHERE id=?1", params![id])?;
    if n > 0 {
        bump_rules_version(&tx)?;
    }
    tx.commit()?;
    Ok(n > 0)
}
