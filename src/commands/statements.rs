// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::repository::{create_statement, list_statements};
use crate::utils::{maybe_print_json, parse_month, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let month = parse_month(sub.get_one::<String>("month").unwrap())?;
            let st = create_statement(conn, name, &month)?;
            println!("Created statement {} '{}' for {}", st.id, st.name, st.month);
        }
        Some(("list", sub)) => {
            let data = list_statements(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .iter()
                    .map(|s| {
                        vec![
                            s.id.to_string(),
                            s.name.clone(),
                            s.month.clone(),
                            s.version.to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Name", "Month", "Version"], rows)
                );
            }
        }
        _ => {}
    }
    Ok(())
}
