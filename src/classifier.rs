// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Keyword classification of uncategorized statement rows.
//!
//! Preview and apply run the same pure matcher over the statement's current
//! uncategorized rows. Apply never replays an earlier preview; callers that
//! need to know nothing changed in between pass the [`PreviewStamp`] a preview
//! reported.

use rusqlite::Connection;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, Result};
use crate::models::{Classification, FinancialTransaction, PeriodBucket, Rule};
use crate::repository::{self, CategorizationUpdate, NotesUpdate};
use crate::taxonomy::Taxonomy;
use crate::utils::{rules_version, taxonomy_version};

const EXCERPT_CONTEXT_CHARS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub transaction_id: i64,
    pub rule_id: i64,
    pub matched_keyword: String,
    pub proposed: Classification,
    pub proposed_category: String,
    pub proposed_sub_categories: Vec<String>,
    pub source_search_text_excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRule {
    pub rule_id: i64,
    pub keyword: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchOutcome {
    pub matches: Vec<Match>,
    pub skipped_rules: Vec<SkippedRule>,
}

/// Everything a match set depends on: the statement's rows, the rule registry
/// and the taxonomy. Rendered as `STATEMENT:RULES:TAXONOMY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PreviewStamp {
    pub statement_version: i64,
    pub rules_version: i64,
    pub taxonomy_version: i64,
}

impl PreviewStamp {
    fn current(conn: &Connection, statement_id: i64) -> Result<Self> {
        Ok(PreviewStamp {
            statement_version: repository::statement_version(conn, statement_id)?,
            rules_version: rules_version(conn)?,
            taxonomy_version: taxonomy_version(conn)?,
        })
    }

    /// First component that differs, as `(name, expected, actual)`.
    fn first_difference(&self, actual: &PreviewStamp) -> Option<(&'static str, i64, i64)> {
        [
            ("statement", self.statement_version, actual.statement_version),
            ("rules", self.rules_version, actual.rules_version),
            ("taxonomy", self.taxonomy_version, actual.taxonomy_version),
        ]
        .into_iter()
        .find(|(_, expected, actual)| expected != actual)
    }
}

impl fmt::Display for PreviewStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.statement_version, self.rules_version, self.taxonomy_version
        )
    }
}

impl FromStr for PreviewStamp {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || format!("Invalid preview stamp '{}', expected STATEMENT:RULES:TAXONOMY", s);
        let parts = s
            .trim()
            .split(':')
            .map(|p| p.trim().parse::<i64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;
        match parts.as_slice() {
            [statement_version, rules_version, taxonomy_version] => Ok(PreviewStamp {
                statement_version: *statement_version,
                rules_version: *rules_version,
                taxonomy_version: *taxonomy_version,
            }),
            _ => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchSet {
    pub statement_id: i64,
    pub statement_version: i64,
    pub rules_version: i64,
    pub taxonomy_version: i64,
    pub matches: Vec<Match>,
    pub skipped_rules: Vec<SkippedRule>,
}

impl MatchSet {
    pub fn stamp(&self) -> PreviewStamp {
        PreviewStamp {
            statement_version: self.statement_version,
            rules_version: self.rules_version,
            taxonomy_version: self.taxonomy_version,
        }
    }
}

/// Description, counterparty and payment details joined by spaces and
/// lower-cased. Missing fields contribute an empty string.
pub fn search_text(tx: &FinancialTransaction) -> String {
    [
        tx.description.as_deref(),
        tx.sender_or_recipient_name.as_deref(),
        tx.payment_details.as_deref(),
    ]
    .iter()
    .map(|f| f.unwrap_or(""))
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}

struct ActiveRule<'a> {
    rule: &'a Rule,
    needle: String,
}

fn partition_rules<'a>(rules: &'a [Rule], taxonomy: &Taxonomy) -> (Vec<ActiveRule<'a>>, Vec<SkippedRule>) {
    let mut active = Vec::with_capacity(rules.len());
    let mut skipped = Vec::new();
    for rule in rules {
        let needle = rule.keyword.trim().to_lowercase();
        let reason = if needle.is_empty() {
            Some("empty keyword".to_string())
        } else {
            taxonomy.validate(&rule.target).err().map(|e| e.to_string())
        };
        match reason {
            Some(reason) => {
                tracing::warn!(rule_id = rule.id, keyword = %rule.keyword, %reason, "skipping rule");
                skipped.push(SkippedRule {
                    rule_id: rule.id,
                    keyword: rule.keyword.clone(),
                    reason,
                });
            }
            None => active.push(ActiveRule { rule, needle }),
        }
    }
    (active, skipped)
}

/// Propose at most one classification per uncategorized transaction. Rules
/// are tried in slice order and the first whose keyword occurs in the search
/// text wins. Rules whose target is not legal in `taxonomy` are skipped as if
/// absent.
pub fn match_transactions(
    transactions: &[FinancialTransaction],
    rules: &[Rule],
    taxonomy: &Taxonomy,
) -> MatchOutcome {
    let (active, skipped_rules) = partition_rules(rules, taxonomy);
    let mut matches = Vec::new();
    for tx in transactions.iter().filter(|t| !t.is_categorized()) {
        let text = search_text(tx);
        let hit = active
            .iter()
            .find_map(|a| text.find(&a.needle).map(|pos| (a, pos)));
        if let Some((a, pos)) = hit {
            tracing::debug!(transaction_id = tx.id, rule_id = a.rule.id, "keyword matched");
            matches.push(Match {
                transaction_id: tx.id,
                rule_id: a.rule.id,
                matched_keyword: a.rule.keyword.clone(),
                proposed: a.rule.target.clone(),
                proposed_category: a.rule.target.category().to_string(),
                proposed_sub_categories: a.rule.target.sub_categories(),
                source_search_text_excerpt: excerpt(&text, pos, a.needle.len()),
            });
        }
    }
    MatchOutcome {
        matches,
        skipped_rules,
    }
}

fn excerpt(text: &str, pos: usize, len: usize) -> String {
    let start = text[..pos]
        .char_indices()
        .rev()
        .nth(EXCERPT_CONTEXT_CHARS - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let tail = pos + len;
    let end = text[tail..]
        .char_indices()
        .nth(EXCERPT_CONTEXT_CHARS)
        .map(|(i, _)| tail + i)
        .unwrap_or(text.len());
    let mut out = String::new();
    if start > 0 {
        out.push('…');
    }
    out.push_str(&text[start..end]);
    if end < text.len() {
        out.push('…');
    }
    out
}

/// Read-only: compute what apply would write right now.
pub fn preview_classification(conn: &Connection, statement_id: i64) -> Result<MatchSet> {
    let statement = repository::get_statement(conn, statement_id)?;
    let taxonomy = Taxonomy::load(conn)?;
    let rules_version = rules_version(conn)?;
    let rules = crate::rules::load_rules(conn)?;
    let candidates = repository::list_uncategorized(conn, statement_id)?;
    let outcome = match_transactions(&candidates, &rules, &taxonomy);
    tracing::info!(
        statement_id,
        candidates = candidates.len(),
        matches = outcome.matches.len(),
        "classification previewed"
    );
    Ok(MatchSet {
        statement_id,
        statement_version: statement.version,
        rules_version,
        taxonomy_version: taxonomy.version,
        matches: outcome.matches,
        skipped_rules: outcome.skipped_rules,
    })
}

/// Recompute matches and write them in one unit of work. Returns the number
/// of transactions updated. With `expected`, fails with
/// [`EngineError::StaleStatement`] if the statement rows, the rules or the
/// taxonomy were written since that preview.
pub fn apply_classification(
    conn: &mut Connection,
    statement_id: i64,
    bucket: Option<PeriodBucket>,
    expected: Option<PreviewStamp>,
) -> Result<usize> {
    let bucket = bucket.unwrap_or_default();
    let tx = repository::begin_unit(conn)?;
    let actual = PreviewStamp::current(&tx, statement_id)?;
    if let Some((component, expected, actual)) =
        expected.and_then(|stamp| stamp.first_difference(&actual))
    {
        return Err(EngineError::StaleStatement {
            statement_id,
            component,
            expected,
            actual,
        });
    }

    let taxonomy = Taxonomy::load(&tx)?;
    let rules = crate::rules::load_rules(&tx)?;
    let candidates = repository::list_uncategorized(&tx, statement_id)?;
    let outcome = match_transactions(&candidates, &rules, &taxonomy);

    let updates: Vec<CategorizationUpdate> = outcome
        .matches
        .into_iter()
        .map(|m| CategorizationUpdate {
            transaction_id: m.transaction_id,
            classification: m.proposed,
            period_bucket: bucket,
            notes: NotesUpdate::Keep,
        })
        .collect();
    let updated = repository::write_categorizations(&tx, &updates)?;
    if updated > 0 {
        repository::bump_statement_version(&tx, statement_id)?;
    }
    tx.commit()?;
    tracing::info!(
        statement_id,
        updated,
        skipped_rules = outcome.skipped_rules.len(),
        bucket = %bucket,
        "classification applied"
    );
    Ok(updated)
}
