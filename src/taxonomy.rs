// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The receipt and payment category trees.
//!
//! [`Taxonomy`] is a snapshot loaded from the database. Validation works purely
//! on the snapshot, so callers can build fixture trees without SQLite. The
//! admin functions at the bottom of this module are the only writers of the
//! taxonomy tables.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashMap;

use crate::error::{EngineError, Result, TaxonomyError};
use crate::models::{
    Classification, PaymentCategory, PaymentPath, PaymentSubCategory1, ReceiptCategory,
    ReceiptPath, TaxonomyNode,
};
use crate::utils::{bump_taxonomy_version, taxonomy_version};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Taxonomy {
    pub version: i64,
    receipt: Vec<ReceiptCategory>,
    payment: Vec<PaymentCategory>,
}

impl Taxonomy {
    pub fn new(version: i64, receipt: Vec<ReceiptCategory>, payment: Vec<PaymentCategory>) -> Self {
        Taxonomy {
            version,
            receipt,
            payment,
        }
    }

    pub fn load(conn: &Connection) -> rusqlite::Result<Self> {
        let version = taxonomy_version(conn)?;

        let mut subs: HashMap<i64, Vec<String>> = HashMap::new();
        let mut stmt =
            conn.prepare("SELECT category_id, name FROM receipt_sub_categories ORDER BY id")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?;
        for row in rows {
            let (cat_id, name) = row?;
            subs.entry(cat_id).or_default().push(name);
        }

        let mut stmt = conn.prepare(
            "SELECT id, name, requires_investment_fields FROM receipt_categories ORDER BY name",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, bool>(2)?,
            ))
        })?;
        let mut receipt = Vec::new();
        for row in rows {
            let (id, name, requires_investment_fields) = row?;
            let sub_categories = subs.remove(&id).unwrap_or_default();
            receipt.push(ReceiptCategory {
                id,
                name,
                has_sub_categories: !sub_categories.is_empty(),
                sub_categories,
                requires_investment_fields,
            });
        }

        let mut level2: HashMap<i64, Vec<TaxonomyNode>> = HashMap::new();
        for (parent, node) in load_nodes(conn, "payment_sub_categories2", "sub_category1_id")? {
            level2.entry(parent).or_default().push(node);
        }
        let mut level1: HashMap<i64, Vec<PaymentSubCategory1>> = HashMap::new();
        for (parent, node) in load_nodes(conn, "payment_sub_categories1", "category_id")? {
            let children = level2.remove(&node.id).unwrap_or_default();
            level1
                .entry(parent)
                .or_default()
                .push(PaymentSubCategory1 { node, children });
        }
        let mut payment = Vec::new();
        for (_, node) in load_nodes(conn, "payment_categories", "NULL")? {
            let children = level1.remove(&node.id).unwrap_or_default();
            payment.push(PaymentCategory { node, children });
        }

        Ok(Taxonomy {
            version,
            receipt,
            payment,
        })
    }

    pub fn receipt_categories(&self) -> &[ReceiptCategory] {
        &self.receipt
    }

    /// The full three-level payment tree, inactive nodes included.
    pub fn payment_categories(&self) -> &[PaymentCategory] {
        &self.payment
    }

    pub fn receipt_category(&self, name: &str) -> Option<&ReceiptCategory> {
        self.receipt.iter().find(|c| c.name == name)
    }

    pub fn validate_receipt_path(
        &self,
        category: &str,
        sub_category: Option<&str>,
    ) -> std::result::Result<&ReceiptCategory, TaxonomyError> {
        let cat = self
            .receipt_category(category)
            .ok_or_else(|| TaxonomyError::UnknownCategory(category.to_string()))?;
        if let Some(sub) = sub_category {
            if !cat.sub_categories.iter().any(|s| s == sub) {
                return Err(TaxonomyError::SubCategoryNotChildOfCategory {
                    category: category.to_string(),
                    sub_category: sub.to_string(),
                });
            }
        }
        Ok(cat)
    }

    /// Inactive nodes count as absent.
    pub fn validate_payment_path(
        &self,
        category: &str,
        sub_category1: Option<&str>,
        sub_category2: Option<&str>,
    ) -> std::result::Result<(), TaxonomyError> {
        let cat = self
            .payment
            .iter()
            .find(|c| c.node.active && c.node.name == category)
            .ok_or_else(|| TaxonomyError::UnknownCategory(category.to_string()))?;

        let sub1 = match sub_category1 {
            Some(name) => Some(
                cat.children
                    .iter()
                    .find(|s| s.node.active && s.node.name == name)
                    .ok_or_else(|| TaxonomyError::SubCategoryNotChildOfCategory {
                        category: category.to_string(),
                        sub_category: name.to_string(),
                    })?,
            ),
            None => None,
        };

        if let Some(name) = sub_category2 {
            let found = sub1
                .map(|s| s.children.iter().any(|n| n.active && n.name == name))
                .unwrap_or(false);
            if !found {
                return Err(TaxonomyError::SubCategory2NotChildOfSubCategory1 {
                    sub_category1: sub_category1.unwrap_or_default().to_string(),
                    sub_category2: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Full legality check for a classification, investment fields included.
    pub fn validate(&self, classification: &Classification) -> std::result::Result<(), TaxonomyError> {
        match classification {
            Classification::Receipt(ReceiptPath {
                category,
                sub_category,
                investment_type,
                investment_institution,
            }) => {
                let cat = self.validate_receipt_path(category, sub_category.as_deref())?;
                let has_investment = investment_type.is_some() || investment_institution.is_some();
                if has_investment && !cat.requires_investment_fields {
                    return Err(TaxonomyError::InvestmentFieldsNotAllowed(category.clone()));
                }
                Ok(())
            }
            Classification::Payment(PaymentPath {
                category,
                sub_category1,
                sub_category2,
            }) => self.validate_payment_path(
                category,
                sub_category1.as_deref(),
                sub_category2.as_deref(),
            ),
        }
    }
}

fn load_nodes(
    conn: &Connection,
    table: &str,
    parent_col: &str,
) -> rusqlite::Result<Vec<(i64, TaxonomyNode)>> {
    let sql = format!(
        "SELECT {parent_col}, id, name, code, description, active, sort_order FROM {table} ORDER BY sort_order, name"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, Option<i64>>(0)?.unwrap_or_default(),
            TaxonomyNode {
                id: r.get(1)?,
                name: r.get(2)?,
                code: r.get(3)?,
                description: r.get(4)?,
                active: r.get(5)?,
                order: r.get(6)?,
            },
        ))
    })?;
    let nodes = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(nodes)
}

/// Fields for a new payment-tree node.
#[derive(Debug, Clone, Default)]
pub struct NewNode {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub order: i64,
}

pub fn add_receipt_category(
    conn: &Connection,
    name: &str,
    requires_investment_fields: bool,
) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO receipt_categories(name, requires_investment_fields) VALUES (?1, ?2)",
        params![name.trim(), requires_investment_fields],
    )?;
    let id = tx.last_insert_rowid();
    bump_taxonomy_version(&tx)?;
    tx.commit()?;
    Ok(id)
}

pub fn add_receipt_sub_category(conn: &Connection, category: &str, sub_category: &str) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    let cat_id = receipt_category_id(&tx, category)?;
    tx.execute(
        "INSERT INTO receipt_sub_categories(category_id, name) VALUES (?1, ?2)",
        params![cat_id, sub_category.trim()],
    )?;
    let id = tx.last_insert_rowid();
    bump_taxonomy_version(&tx)?;
    tx.commit()?;
    Ok(id)
}

/// Refused while any transaction or rule still points at the category.
pub fn remove_receipt_category(conn: &Connection, name: &str) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    let cat_id = receipt_category_id(&tx, name)?;
    let referenced: i64 = tx.query_row(
        "SELECT (SELECT COUNT(*) FROM financial_transactions WHERE category_receipt=?1)
              + (SELECT COUNT(*) FROM rules WHERE target_kind='receipt' AND category=?1)",
        params![name],
        |r| r.get(0),
    )?;
    if referenced > 0 {
        return Err(EngineError::CategoryInUse(name.to_string()));
    }
    tx.execute("DELETE FROM receipt_categories WHERE id=?1", params![cat_id])?;
    bump_taxonomy_version(&tx)?;
    tx.commit()?;
    Ok(())
}

pub fn add_payment_category(conn: &Connection, node: &NewNode) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO payment_categories(name, code, description, sort_order) VALUES (?1,?2,?3,?4)",
        params![node.name.trim(), node.code.trim(), node.description, node.order],
    )?;
    let id = tx.last_insert_rowid();
    bump_taxonomy_version(&tx)?;
    tx.commit()?;
    Ok(id)
}

pub fn add_payment_sub_category1(conn: &Connection, category: &str, node: &NewNode) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    let cat_id = payment_category_id(&tx, category)?;
    tx.execute(
        "INSERT INTO payment_sub_categories1(category_id, name, code, description, sort_order)
         VALUES (?1,?2,?3,?4,?5)",
        params![cat_id, node.name.trim(), node.code.trim(), node.description, node.order],
    )?;
    let id = tx.last_insert_rowid();
    bump_taxonomy_version(&tx)?;
    tx.commit()?;
    Ok(id)
}

pub fn add_payment_sub_category2(
    conn: &Connection,
    category: &str,
    sub_category1: &str,
    node: &NewNode,
) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    let cat_id = payment_category_id(&tx, category)?;
    let sub1_id = payment_sub_category1_id(&tx, cat_id, category, sub_category1)?;
    tx.execute(
        "INSERT INTO payment_sub_categories2(sub_category1_id, name, code, description, sort_order)
         VALUES (?1,?2,?3,?4,?5)",
        params![sub1_id, node.name.trim(), node.code.trim(), node.description, node.order],
    )?;
    let id = tx.last_insert_rowid();
    bump_taxonomy_version(&tx)?;
    tx.commit()?;
    Ok(id)
}

/// Deactivate the addressed node and everything below it. Returns the number
/// of nodes touched.
pub fn deactivate_payment_node(
    conn: &Connection,
    category: &str,
    sub_category1: Option<&str>,
    sub_category2: Option<&str>,
) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let cat_id = payment_category_id(&tx, category)?;
    let touched = match (sub_category1, sub_category2) {
        (None, None) => {
            let mut n = tx.execute(
                "UPDATE payment_sub_categories2 SET active=0 WHERE sub_category1_id IN
                    (SELECT id FROM payment_sub_categories1 WHERE category_id=?1)",
                params![cat_id],
            )?;
            n += tx.execute(
                "UPDATE payment_sub_categories1 SET active=0 WHERE category_id=?1",
                params![cat_id],
            )?;
            n += tx.execute(
                "UPDATE payment_categories SET active=0 WHERE id=?1",
                params![cat_id],
            )?;
            n
        }
        (Some(sub1), None) => {
            let sub1_id = payment_sub_category1_id(&tx, cat_id, category, sub1)?;
            let n = tx.execute(
                "UPDATE payment_sub_categories2 SET active=0 WHERE sub_category1_id=?1",
                params![sub1_id],
            )?;
            n + tx.execute(
                "UPDATE payment_sub_categories1 SET active=0 WHERE id=?1",
                params![sub1_id],
            )?
        }
        (Some(sub1), Some(sub2)) => {
            let sub1_id = payment_sub_category1_id(&tx, cat_id, category, sub1)?;
            let n = tx.execute(
                "UPDATE payment_sub_categories2 SET active=0 WHERE sub_category1_id=?1 AND name=?2",
                params![sub1_id, sub2],
            )?;
            if n == 0 {
                return Err(TaxonomyError::SubCategory2NotChildOfSubCategory1 {
                    sub_category1: sub1.to_string(),
                    sub_category2: sub2.to_string(),
                }
                .into());
            }
            n
        }
        (None, Some(sub2)) => {
            return Err(TaxonomyError::SubCategory2NotChildOfSubCategory1 {
                sub_category1: String::new(),
                sub_category2: sub2.to_string(),
            }
            .into());
        }
    };
    bump_taxonomy_version(&tx)?;
    tx.commit()?;
    tracing::info!(category, ?sub_category1, ?sub_category2, touched, "payment node deactivated");
    Ok(touched)
}

fn receipt_category_id(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM receipt_categories WHERE name=?1",
        params![name],
        |r| r.get(0),
    )
    .optional()?
    .ok_or_else(|| TaxonomyError::UnknownCategory(name.to_string()).into())
}

fn payment_category_id(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM payment_categories WHERE name=?1",
        params![name],
        |r| r.get(0),
    )
    .optional()?
    .ok_or_else(|| TaxonomyError::UnknownCategory(name.to_string()).into())
}

fn payment_sub_category1_id(
    conn: &Connection,
    category_id: i64,
    category: &str,
    name: &str,
) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM payment_sub_categories1 WHERE category_id=?1 AND name=?2",
        params![category_id, name],
        |r| r.get(0),
    )
    .optional()?
    .ok_or_else(|| {
        TaxonomyError::SubCategoryNotChildOfCategory {
            category: category.to_string(),
            sub_category: name.to_string(),
        }
        .into()
    })
}
