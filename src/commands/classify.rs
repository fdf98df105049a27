// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::classifier::{PreviewStamp, apply_classification, preview_classification};
use crate::commands::rules::path_label;
use crate::commands::transactions::parse_bucket;
use crate::utils::{maybe_print_json, parse_id, pretty_table};
use anyhow::{Result, anyhow};
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("preview", sub)) => preview(conn, sub)?,
        Some(("apply", sub)) => apply(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn preview(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let statement_id = parse_id(sub.get_one::<String>("statement").unwrap(), "statement")?;
    let set = preview_classification(conn, statement_id)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &set)? {
        return Ok(());
    }
    let data = set
        .matches
        .iter()
        .map(|m| {
            vec![
                m.transaction_id.to_string(),
                m.matched_keyword.clone(),
                format!("{}: {}", m.proposed.kind().as_str(), path_label(&m.proposed)),
                m.source_search_text_excerpt.clone(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Transaction", "Keyword", "Proposed", "Matched text"], data)
    );
    for s in &set.skipped_rules {
        println!("Skipped rule {} '{}': {}", s.rule_id, s.keyword, s.reason);
    }
    let stamp = set.stamp();
    println!(
        "{} match(es); preview stamp {} (pass --expect {} to apply exactly this state)",
        set.matches.len(),
        stamp,
        stamp
    );
    Ok(())
}

fn apply(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let statement_id = parse_id(sub.get_one::<String>("statement").unwrap(), "statement")?;
    let bucket = parse_bucket(sub)?;
    let expected = sub
        .get_one::<String>("expect")
        .map(|s| s.parse::<PreviewStamp>().map_err(|e| anyhow!(e)))
        .transpose()?;
    let n = apply_classification(conn, statement_id, bucket, expected)?;
    println!("Classified {} transaction(s) in statement {}", n, statement_id);
    Ok(())
}
