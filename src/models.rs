// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// Which monthly cash-book a transaction's amount is counted toward,
/// relative to its statement's month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PeriodBucket {
    PreviousMonth,
    #[default]
    CurrentMonth,
    NextMonth,
}

impl PeriodBucket {
    pub const ALL: [PeriodBucket; 3] = [
        PeriodBucket::PreviousMonth,
        PeriodBucket::CurrentMonth,
        PeriodBucket::NextMonth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodBucket::PreviousMonth => "previousMonth",
            PeriodBucket::CurrentMonth => "currentMonth",
            PeriodBucket::NextMonth => "nextMonth",
        }
    }

    /// Month offset from the statement's nominal month.
    pub fn month_offset(&self) -> i32 {
        match self {
            PeriodBucket::PreviousMonth => -1,
            PeriodBucket::CurrentMonth => 0,
            PeriodBucket::NextMonth => 1,
        }
    }
}

impl fmt::Display for PeriodBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "previousmonth" | "previous" | "prev" => Ok(PeriodBucket::PreviousMonth),
            "currentmonth" | "current" => Ok(PeriodBucket::CurrentMonth),
            "nextmonth" | "next" => Ok(PeriodBucket::NextMonth),
            other => Err(format!(
                "Invalid period bucket '{}', expected previousMonth, currentMonth or nextMonth",
                other
            )),
        }
    }
}

impl ToSql for PeriodBucket {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PeriodBucket {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|_| FromSqlError::InvalidType)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Receipt,
    Payment,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Receipt => "receipt",
            TargetKind::Payment => "payment",
        }
    }
}

impl FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "receipt" | "penerimaan" => Ok(TargetKind::Receipt),
            "payment" | "pembayaran" => Ok(TargetKind::Payment),
            other => Err(format!(
                "Invalid target kind '{}', expected receipt or payment",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptCategory {
    pub id: i64,
    pub name: String,
    pub has_sub_categories: bool,
    pub sub_categories: Vec<String>,
    pub requires_investment_fields: bool,
}

/// One node of the payment tree. Shared by all three levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyNode {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub active: bool,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSubCategory1 {
    pub node: TaxonomyNode,
    pub children: Vec<TaxonomyNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCategory {
    pub node: TaxonomyNode,
    pub children: Vec<PaymentSubCategory1>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReceiptPath {
    pub category: String,
    pub sub_category: Option<String>,
    pub investment_type: Option<String>,
    pub investment_institution: Option<String>,
}

impl ReceiptPath {
    pub fn new(category: impl Into<String>) -> Self {
        ReceiptPath {
            category: category.into(),
            ..Default::default()
        }
    }

    pub fn with_sub_category(mut self, sub: impl Into<String>) -> Self {
        self.sub_category = Some(sub.into());
        self
    }

    pub fn with_investment(mut self, kind: impl Into<String>, institution: impl Into<String>) -> Self {
        self.investment_type = Some(kind.into());
        self.investment_institution = Some(institution.into());
        self
    }

    pub fn has_investment_fields(&self) -> bool {
        self.investment_type.is_some() || self.investment_institution.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaymentPath {
    pub category: String,
    pub sub_category1: Option<String>,
    pub sub_category2: Option<String>,
}

impl PaymentPath {
    pub fn new(category: impl Into<String>) -> Self {
        PaymentPath {
            category: category.into(),
            ..Default::default()
        }
    }

    pub fn with_sub_category1(mut self, sub: impl Into<String>) -> Self {
        self.sub_category1 = Some(sub.into());
        self
    }

    pub fn with_sub_category2(mut self, sub: impl Into<String>) -> Self {
        self.sub_category2 = Some(sub.into());
        self
    }
}

/// A complete classification on exactly one axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Classification {
    Receipt(ReceiptPath),
    Payment(PaymentPath),
}

impl Classification {
    pub fn kind(&self) -> TargetKind {
        match self {
            Classification::Receipt(_) => TargetKind::Receipt,
            Classification::Payment(_) => TargetKind::Payment,
        }
    }

    pub fn category(&self) -> &str {
        match self {
            Classification::Receipt(p) => &p.category,
            Classification::Payment(p) => &p.category,
        }
    }

    /// Sub-category names below the category, outermost first.
    pub fn sub_categories(&self) -> Vec<String> {
        match self {
            Classification::Receipt(p) => p.sub_category.iter().cloned().collect(),
            Classification::Payment(p) => p
                .sub_category1
                .iter()
                .chain(p.sub_category2.iter())
                .cloned()
                .collect(),
        }
    }
}

/// Caller-supplied classification before the axis has been checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationInput {
    pub receipt: Option<ReceiptPath>,
    pub payment: Option<PaymentPath>,
}

impl ClassificationInput {
    pub fn receipt(path: ReceiptPath) -> Self {
        ClassificationInput {
            receipt: Some(path),
            payment: None,
        }
    }

    pub fn payment(path: PaymentPath) -> Self {
        ClassificationInput {
            receipt: None,
            payment: Some(path),
        }
    }

    pub fn resolve(&self) -> Result<Classification, EngineError> {
        match (&self.receipt, &self.payment) {
            (Some(_), Some(_)) => Err(EngineError::AmbiguousAxis),
            (Some(r), None) => Ok(Classification::Receipt(r.clone())),
            (None, Some(p)) => Ok(Classification::Payment(p.clone())),
            (None, None) => Err(EngineError::MissingAxis),
        }
    }
}

impl From<Classification> for ClassificationInput {
    fn from(c: Classification) -> Self {
        match c {
            Classification::Receipt(r) => ClassificationInput::receipt(r),
            Classification::Payment(p) => ClassificationInput::payment(p),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: i64,
    pub keyword: String,
    pub target: Classification,
}

impl Rule {
    pub fn target_kind(&self) -> TargetKind {
        self.target.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub id: i64,
    pub name: String,
    pub month: String, // YYYY-MM
    pub version: i64,
}

/// A normalized row handed over by statement ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub transaction_date: NaiveDate,
    pub description: Option<String>,
    pub sender_or_recipient_name: Option<String>,
    pub payment_details: Option<String>,
    pub debit_amount: Option<Decimal>,
    pub credit_amount: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialTransaction {
    pub id: i64,
    pub statement_id: i64,
    pub transaction_date: NaiveDate,
    pub description: Option<String>,
    pub sender_or_recipient_name: Option<String>,
    pub payment_details: Option<String>,
    pub debit_amount: Option<Decimal>,
    pub credit_amount: Option<Decimal>,
    pub category_receipt: Option<String>,
    pub sub_category_receipt: Option<String>,
    pub investment_type: Option<String>,
    pub investment_institution: Option<String>,
    pub category_payment: Option<String>,
    pub sub_category1_payment: Option<String>,
    pub sub_category2_payment: Option<String>,
    pub notes: Option<String>,
    pub period_bucket: PeriodBucket,
}

impl FinancialTransaction {
    pub fn is_categorized(&self) -> bool {
        self.category_receipt.is_some() || self.category_payment.is_some()
    }

    pub fn classification(&self) -> Option<Classification> {
        if let Some(cat) = &self.category_receipt {
            return Some(Classification::Receipt(ReceiptPath {
                category: cat.clone(),
                sub_category: self.sub_category_receipt.clone(),
                investment_type: self.investment_type.clone(),
                investment_institution: self.investment_institution.clone(),
            }));
        }
        self.category_payment.as_ref().map(|cat| {
            Classification::Payment(PaymentPath {
                category: cat.clone(),
                sub_category1: self.sub_category1_payment.clone(),
                sub_category2: self.sub_category2_payment.clone(),
            })
        })
    }
}
