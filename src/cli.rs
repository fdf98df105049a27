// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, command};

fn json_flags() -> [Arg; 2] {
    [
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print as JSON lines"),
    ]
}

fn req(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).required(true).help(help)
}

fn opt(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).help(help)
}

fn bucket_arg() -> Arg {
    opt(
        "bucket",
        "Period bucket: previousMonth, currentMonth (default) or nextMonth",
    )
}

fn node_args() -> [Arg; 4] {
    [
        req("name", "Node name"),
        req("code", "Accounting code"),
        opt("description", "Free-text description"),
        Arg::new("order")
            .long("order")
            .value_parser(clap::value_parser!(i64))
            .help("Display order"),
    ]
}

/// Arguments shared by `tx categorize` and `tx bulk`.
fn classification_args() -> [Arg; 9] {
    [
        opt("receipt", "Receipt category"),
        opt("receipt-sub", "Receipt sub-category").requires("receipt"),
        opt("investment-type", "Investment type (investment receipt categories only)")
            .requires("receipt"),
        opt(
            "investment-institution",
            "Investment institution (investment receipt categories only)",
        )
        .requires("receipt"),
        opt("payment", "Payment category"),
        opt("payment-sub1", "Payment sub-category 1").requires("payment"),
        opt("payment-sub2", "Payment sub-category 2").requires("payment"),
        bucket_arg(),
        opt("notes", "Notes stored on the transaction"),
    ]
}

pub fn build_cli() -> Command {
    command!()
        .name("rekonsil")
        .about("Categorize bank-statement transactions and assign cash-book periods")
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("statement")
                .about("Statement batches")
                .subcommand(
                    Command::new("add")
                        .arg(req("name", "Statement name"))
                        .arg(req("month", "Statement month YYYY-MM")),
                )
                .subcommand(Command::new("list").args(json_flags())),
        )
        .subcommand(
            Command::new("import").about("Load ingested rows").subcommand(
                Command::new("rows")
                    .about("CSV: date,description,sender,details,debit,credit")
                    .arg(req("statement", "Statement id"))
                    .arg(req("path", "CSV file path")),
            ),
        )
        .subcommand(
            Command::new("category")
                .about("Receipt and payment taxonomies")
                .subcommand(Command::new("list").args(json_flags()))
                .subcommand(
                    Command::new("receipt-add")
                        .arg(req("name", "Category name"))
                        .arg(
                            Arg::new("investment")
                                .long("investment")
                                .action(ArgAction::SetTrue)
                                .help("Requires investment type/institution"),
                        ),
                )
                .subcommand(
                    Command::new("receipt-sub-add")
                        .arg(req("category", "Receipt category"))
                        .arg(req("name", "Sub-category name")),
                )
                .subcommand(Command::new("receipt-rm").arg(req("name", "Category name")))
                .subcommand(Command::new("payment-add").args(node_args()))
                .subcommand(
                    Command::new("payment-sub1-add")
                        .arg(req("category", "Payment category"))
                        .args(node_args()),
                )
                .subcommand(
                    Command::new("payment-sub2-add")
                        .arg(req("category", "Payment category"))
                        .arg(req("sub1", "Payment sub-category 1"))
                        .args(node_args()),
                )
                .subcommand(
                    Command::new("payment-deactivate")
                        .arg(req("category", "Payment category"))
                        .arg(opt("sub1", "Payment sub-category 1"))
                        .arg(opt("sub2", "Payment sub-category 2").requires("sub1")),
                ),
        )
        .subcommand(
            Command::new("rules")
                .about("Keyword classification rules")
                .subcommand(
                    Command::new("add")
                        .arg(req("keyword", "Case-insensitive substring"))
                        .arg(req("kind", "receipt or payment"))
                        .arg(req("category", "Target category"))
                        .arg(opt("sub", "Target sub-category (sub-category 1 for payments)"))
                        .arg(opt("sub2", "Target payment sub-category 2").requires("sub")),
                )
                .subcommand(Command::new("list").args(json_flags()))
                .subcommand(Command::new("rm").arg(req("id", "Rule id"))),
        )
        .subcommand(
            Command::new("classify")
                .about("Rule-based classification of a statement")
                .subcommand(
                    Command::new("preview")
                        .arg(req("statement", "Statement id"))
                        .args(json_flags()),
                )
                .subcommand(
                    Command::new("apply")
                        .arg(req("statement", "Statement id"))
                        .arg(bucket_arg())
                        .arg(opt(
                            "expect",
                            "Preview stamp STATEMENT:RULES:TAXONOMY; fail if anything changed since",
                        )),
                ),
        )
        .subcommand(
            Command::new("tx")
                .about("Transactions")
                .subcommand(
                    Command::new("show")
                        .arg(req("id", "Transaction id"))
                        .args(json_flags()),
                )
                .subcommand(
                    Command::new("categorize")
                        .arg(req("id", "Transaction id"))
                        .args(classification_args()),
                )
                .subcommand(
                    Command::new("bulk")
                        .arg(req("ids", "Comma-separated transaction ids"))
                        .args(classification_args()),
                )
                .subcommand(
                    Command::new("uncategorized")
                        .arg(req("statement", "Statement id"))
                        .args(json_flags()),
                )
                .subcommand(
                    Command::new("by-category")
                        .arg(req("statement", "Statement id"))
                        .arg(req("category", "Receipt or payment category"))
                        .args(json_flags()),
                ),
        )
        .subcommand(
            Command::new("ledger")
                .about("Rows as seen by the cash-book generator")
                .subcommand(
                    Command::new("rows")
                        .arg(opt("month", "Cash-book month YYYY-MM").conflicts_with("statement"))
                        .arg(opt("statement", "Statement id").requires("bucket"))
                        .arg(bucket_arg())
                        .args(json_flags()),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Settings")
                .subcommand(Command::new("get").arg(req("key", "Setting key")))
                .subcommand(
                    Command::new("set")
                        .arg(req("key", "Setting key"))
                        .arg(req("value", "Setting value")),
                ),
        )
}
