// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Which level of a category path failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaxonomyError {
    #[error("Unknown category '{0}'")]
    UnknownCategory(String),

    #[error("Sub-category '{sub_category}' is not a child of category '{category}'")]
    SubCategoryNotChildOfCategory {
        category: String,
        sub_category: String,
    },

    #[error("Sub-category '{sub_category2}' is not a child of sub-category '{sub_category1}'")]
    SubCategory2NotChildOfSubCategory1 {
        sub_category1: String,
        sub_category2: String,
    },

    #[error("Category '{0}' does not take investment type/institution")]
    InvestmentFieldsNotAllowed(String),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid category path: {0}")]
    InvalidCategoryPath(#[from] TaxonomyError),

    #[error("Transaction {0} not found")]
    TransactionNotFound(i64),

    #[error("Statement {0} not found")]
    StatementNotFound(i64),

    #[error("Both a receipt and a payment classification were supplied")]
    AmbiguousAxis,

    #[error("Neither a receipt nor a payment classification was supplied")]
    MissingAxis,

    #[error(
        "Statement {statement_id} changed since preview ({component} version {expected}, now {actual})"
    )]
    StaleStatement {
        statement_id: i64,
        component: &'static str,
        expected: i64,
        actual: i64,
    },

    #[error("Invalid amounts: {0}")]
    InvalidAmounts(String),

    #[error("Invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),

    #[error("Invalid rule keyword '{0}'")]
    InvalidKeyword(String),

    #[error("Category '{0}' is still referenced")]
    CategoryInUse(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
