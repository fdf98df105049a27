// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{Classification, PaymentPath, ReceiptPath, TargetKind};
use crate::rules::{add_rule, load_rules, remove_rule};
use crate::taxonomy::Taxonomy;
use crate::utils::{maybe_print_json, parse_id, pretty_table};
use anyhow::{Result, anyhow};
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let keyword = sub.get_one::<String>("keyword").unwrap();
            let kind = sub
                .get_one::<String>("kind")
                .unwrap()
                .parse::<TargetKind>()
                .map_err(|e| anyhow!(e))?;
            let cat = sub.get_one::<String>("category").unwrap().trim().to_string();
            let sub1 = trimmed(sub, "sub");
            let sub2 = trimmed(sub, "sub2");
            let target = match kind {
                TargetKind::Receipt => {
                    if sub2.is_some() {
                        return Err(anyhow!("Receipt rules take at most one sub-category"));
                    }
                    Classification::Receipt(ReceiptPath {
                        category: cat,
                        sub_category: sub1,
                        ..Default::default()
                    })
                }
                TargetKind::Payment => Classification::Payment(PaymentPath {
                    category: cat,
                    sub_category1: sub1,
                    sub_category2: sub2,
                }),
            };
            let taxonomy = Taxonomy::load(conn)?;
            let rule = add_rule(conn, &taxonomy, keyword, &target)?;
            println!(
                "Added rule {}: '{}' -> {} {}",
                rule.id,
                rule.keyword,
                kind.as_str(),
                path_label(&rule.target)
            );
        }
        Some(("list", sub)) => {
            let rules = load_rules(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rules)? {
                let data = rules
                    .iter()
                    .map(|r| {
                        vec![
                            r.id.to_string(),
                            r.keyword.clone(),
                            r.target_kind().as_str().to_string(),
                            path_label(&r.target),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Keyword", "Kind", "Target"], data)
                );
            }
        }
        Some(("rm", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap(), "rule")?;
            if !remove_rule(conn, id)? {
                return Err(anyhow!("Rule {} not found", id));
            }
            println!("Removed rule {}", id);
        }
        _ => {}
    }
    Ok(())
}

fn trimmed(sub: &clap::ArgMatches, name: &str) -> Option<String> {
    sub.get_one::<String>(name)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

pub fn path_label(c: &Classification) -> String {
    let mut parts = vec![c.category().to_string()];
    parts.extend(c.sub_categories());
    parts.join(" / ")
}
