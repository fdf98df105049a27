// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::taxonomy::{self, NewNode, Taxonomy};
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list(conn, sub)?,
        Some(("receipt-add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let investment = sub.get_flag("investment");
            taxonomy::add_receipt_category(conn, name, investment)?;
            println!("Added receipt category '{}'", name);
        }
        Some(("receipt-sub-add", sub)) => {
            let cat = sub.get_one::<String>("category").unwrap().trim();
            let name = sub.get_one::<String>("name").unwrap().trim();
            taxonomy::add_receipt_sub_category(conn, cat, name)?;
            println!("Added receipt sub-category '{}' under '{}'", name, cat);
        }
        Some(("receipt-rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            taxonomy::remove_receipt_category(conn, name)?;
            println!("Removed receipt category '{}'", name);
        }
        Some(("payment-add", sub)) => {
            let node = new_node(sub);
            taxonomy::add_payment_category(conn, &node)?;
            println!("Added payment category '{}' ({})", node.name, node.code);
        }
        Some(("payment-sub1-add", sub)) => {
            let cat = sub.get_one::<String>("category").unwrap().trim();
            let node = new_node(sub);
            taxonomy::add_payment_sub_category1(conn, cat, &node)?;
            println!("Added '{}' under '{}'", node.name, cat);
        }
        Some(("payment-sub2-add", sub)) => {
            let cat = sub.get_one::<String>("category").unwrap().trim();
            let sub1 = sub.get_one::<String>("sub1").unwrap().trim();
            let node = new_node(sub);
            taxonomy::add_payment_sub_category2(conn, cat, sub1, &node)?;
            println!("Added '{}' under '{} / {}'", node.name, cat, sub1);
        }
        Some(("payment-deactivate", sub)) => {
            let cat = sub.get_one::<String>("category").unwrap().trim();
            let sub1 = sub.get_one::<String>("sub1").map(|s| s.trim());
            let sub2 = sub.get_one::<String>("sub2").map(|s| s.trim());
            let n = taxonomy::deactivate_payment_node(conn, cat, sub1, sub2)?;
            println!("Deactivated {} node(s)", n);
        }
        _ => {}
    }
    Ok(())
}

fn new_node(sub: &clap::ArgMatches) -> NewNode {
    NewNode {
        name: sub.get_one::<String>("name").unwrap().trim().to_string(),
        code: sub.get_one::<String>("code").unwrap().trim().to_string(),
        description: sub
            .get_one::<String>("description")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string()),
        order: sub.get_one::<i64>("order").copied().unwrap_or(0),
    }
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let tree = Taxonomy::load(conn)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &tree)? {
        return Ok(());
    }

    let mut data = Vec::new();
    for c in tree.receipt_categories() {
        let subs = c.sub_categories.join(", ");
        let flag = if c.requires_investment_fields { "investment" } else { "" };
        data.push(vec!["receipt".into(), c.name.clone(), subs, String::new(), flag.into()]);
    }
    for c in tree.payment_categories() {
        let state = |active: bool| (if active { "" } else { "inactive" }).to_string();
        data.push(vec![
            "payment".into(),
            format!("{} [{}]", c.node.name, c.node.code),
            String::new(),
            String::new(),
            state(c.node.active),
        ]);
        for s1 in &c.children {
            data.push(vec![
                String::new(),
                String::new(),
                format!("{} [{}]", s1.node.name, s1.node.code),
                String::new(),
                state(s1.node.active),
            ]);
            for s2 in &s1.children {
                data.push(vec![
                    String::new(),
                    String::new(),
                    String::new(),
                    format!("{} [{}]", s2.name, s2.code),
                    state(s2.active),
                ]);
            }
        }
    }
    println!(
        "{}",
        pretty_table(&["Axis", "Category", "Sub-category", "Sub-category 2", "Flags"], data)
    );
    Ok(())
}
