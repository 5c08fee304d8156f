// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use splitmint::{
    BalanceReport, DataWarning, ExpenseId, Partner, Position, SettleUp, Settlement, SettlementId,
    SharedExpense, Split, compute_balance, evaluate_threshold, resolve_split, suggest_settlement,
};
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use thiserror::Error;
use tracing::warn;

/// SplitMint - Couple balance calculator
///
/// Computes who owes whom from shared-expense and settlement CSV files, and
/// exposes the split and budget-threshold rules used by the application.
#[derive(Parser, Debug)]
#[command(name = "splitmint")]
#[command(about = "Couple balance, split and budget threshold calculator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the balance summary from shared expenses and settlements
    ///
    /// Expense columns: id,payer,amount,split_type,split_ratio,date,category,description
    /// Settlement columns: id,paid_by,paid_to,amount,note,created_at
    Balance {
        /// Path to CSV file with shared expenses
        #[arg(value_name = "EXPENSES")]
        expenses: PathBuf,

        /// Path to CSV file with settlements
        #[arg(long, value_name = "FILE")]
        settlements: Option<PathBuf>,

        /// Partner slot to phrase the outcome for
        #[arg(long, env = "SPLITMINT_VIEWER")]
        viewer: Option<Partner>,

        #[arg(long, value_enum, default_value_t = Format::Csv, env = "SPLITMINT_FORMAT")]
        format: Format,
    },
    /// Resolve a split, e.g. `split 1000 percentage:60:40`
    Split {
        amount: Decimal,
        /// equal | percentage:A:B | custom:A:B
        spec: Split,
    },
    /// Classify spend against a limit
    Threshold { spend: Decimal, limit: Decimal },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Csv,
    Json,
}

#[derive(Error, Debug)]
enum CliError {
    #[error("cannot open '{path}': {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("splitmint=info"));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli.command, io::stdout()) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run<W: Write>(command: Command, out: W) -> Result<(), CliError> {
    match command {
        Command::Balance {
            expenses,
            settlements,
            viewer,
            format,
        } => {
            let expenses = read_expenses(BufReader::new(open(&expenses)?))?;
            let settlements = match settlements {
                Some(path) => read_settlements(BufReader::new(open(&path)?))?,
                None => Vec::new(),
            };
            let report = compute_balance(&expenses, &settlements);
            match format {
                Format::Csv => write_balance_csv(&report, viewer, out),
                Format::Json => write_balance_json(&report, viewer, out),
            }
        }
        Command::Split { amount, spec } => {
            let resolution = resolve_split(amount, &spec);
            let mut wtr = Writer::from_writer(out);
            wtr.serialize(resolution)?;
            wtr.flush()?;
            Ok(())
        }
        Command::Threshold { spend, limit } => {
            let evaluation = evaluate_threshold(spend, limit);
            let mut wtr = Writer::from_writer(out);
            wtr.write_record(["status", "percent_used"])?;
            wtr.write_record([
                evaluation.status.to_string(),
                evaluation
                    .percent_used
                    .map(|p| p.round_dp(DECIMAL_PRECISION).normalize().to_string())
                    .unwrap_or_default(),
            ])?;
            wtr.flush()?;
            Ok(())
        }
    }
}

fn open(path: &Path) -> Result<File, CliError> {
    File::open(path).map_err(|source| CliError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .trim(Trim::All) // Handle whitespace in fields like " a "
        .flexible(true) // Allow missing trailing optional fields
        .has_headers(true)
        .from_reader(reader)
}

/// Raw shared-expense CSV row.
#[derive(Debug, Deserialize)]
struct ExpenseRecord {
    id: u32,
    payer: String,
    amount: Decimal,
    split_type: String,
    #[serde(default)]
    split_ratio: String,
    date: NaiveDate,
    category: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    description: Option<String>,
}

impl ExpenseRecord {
    fn into_expense(self) -> Result<SharedExpense, String> {
        let payer: Partner = self.payer.parse()?;
        let split = Split::from_parts(&self.split_type, &self.split_ratio).map_err(|e| e.to_string())?;
        let mut expense = SharedExpense::new(
            ExpenseId(self.id),
            payer,
            self.amount,
            split,
            self.date,
            self.category,
        );
        expense.description = self.description.filter(|d| !d.is_empty());
        Ok(expense)
    }
}

/// Raw settlement CSV row.
#[derive(Debug, Deserialize)]
struct SettlementRecord {
    id: u32,
    paid_by: String,
    paid_to: String,
    amount: Decimal,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    note: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    created_at: Option<DateTime<Utc>>,
}

impl SettlementRecord {
    fn into_settlement(self) -> Result<Settlement, String> {
        let mut settlement = Settlement::new(
            SettlementId(self.id),
            self.paid_by.parse()?,
            self.paid_to.parse()?,
            self.amount,
            self.created_at.unwrap_or_else(Utc::now),
        );
        settlement.note = self.note.filter(|n| !n.is_empty());
        Ok(settlement)
    }
}

/// Reads shared expenses, skipping rows that cannot be parsed.
///
/// Rows that parse but do not reconcile (e.g. mismatched custom shares) are
/// kept; the aggregator reports them.
fn read_expenses<R: Read>(reader: R) -> Result<Vec<SharedExpense>, csv::Error> {
    let mut expenses = Vec::new();
    for (row, result) in csv_reader(reader).deserialize::<ExpenseRecord>().enumerate() {
        match result.map_err(|e| e.to_string()).and_then(ExpenseRecord::into_expense) {
            Ok(expense) => expenses.push(expense),
            Err(e) => warn!(row = row + 1, error = %e, "skipping malformed expense row"),
        }
    }
    Ok(expenses)
}

/// Reads settlements, skipping rows that cannot be parsed.
fn read_settlements<R: Read>(reader: R) -> Result<Vec<Settlement>, csv::Error> {
    let mut settlements = Vec::new();
    for (row, result) in csv_reader(reader).deserialize::<SettlementRecord>().enumerate() {
        match result
            .map_err(|e| e.to_string())
            .and_then(SettlementRecord::into_settlement)
        {
            Ok(settlement) => settlements.push(settlement),
            Err(e) => warn!(row = row + 1, error = %e, "skipping malformed settlement row"),
        }
    }
    Ok(settlements)
}

/// Flat CSV view of a balance summary.
#[derive(Debug, Serialize)]
struct BalanceRow {
    total_shared: Decimal,
    paid_by_a: Decimal,
    paid_by_b: Decimal,
    owe_a: Decimal,
    owe_b: Decimal,
    net_balance: Decimal,
    settlements_total: Decimal,
    net_after_settlements: Decimal,
    all_settled: bool,
    skipped: usize,
    outcome: String,
}

const DECIMAL_PRECISION: u32 = 2;

fn outcome(position: Position) -> String {
    match position {
        Position::Owes(amount) => format!("you owe {}", amount.round_dp(DECIMAL_PRECISION)),
        Position::IsOwed(amount) => format!("partner owes you {}", amount.round_dp(DECIMAL_PRECISION)),
        Position::Settled => "all settled".to_string(),
    }
}

/// Write a balance summary as a single CSV row.
///
/// # CSV Format
///
/// ```csv
/// total_shared,paid_by_a,paid_by_b,owe_a,owe_b,net_balance,settlements_total,net_after_settlements,all_settled,skipped,outcome
/// 1000.00,1000.00,0.00,500.00,500.00,500.00,0.00,500.00,false,0,partner owes you 500.00
/// ```
fn write_balance_csv<W: Write>(
    report: &BalanceReport,
    viewer: Option<Partner>,
    writer: W,
) -> Result<(), CliError> {
    let summary = &report.summary;
    let round = |d: Decimal| d.round_dp(DECIMAL_PRECISION).normalize();
    let row = BalanceRow {
        total_shared: round(summary.total_shared),
        paid_by_a: round(summary.paid_by_a),
        paid_by_b: round(summary.paid_by_b),
        owe_a: round(summary.owe_a),
        owe_b: round(summary.owe_b),
        net_balance: round(summary.net_balance),
        settlements_total: round(summary.settlements_total),
        net_after_settlements: round(summary.net_after_settlements),
        all_settled: summary.all_settled(),
        skipped: report.warnings.len(),
        outcome: viewer.map(|v| outcome(summary.position(v))).unwrap_or_default(),
    };

    let mut wtr = Writer::from_writer(writer);
    wtr.serialize(row)?;
    wtr.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct BalanceDocument<'a> {
    summary: &'a splitmint::BalanceSummary,
    all_settled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<Position>,
    settle_up: Option<SettleUp>,
    warnings: &'a [DataWarning],
}

fn write_balance_json<W: Write>(
    report: &BalanceReport,
    viewer: Option<Partner>,
    mut writer: W,
) -> Result<(), CliError> {
    let document = BalanceDocument {
        summary: &report.summary,
        all_settled: report.summary.all_settled(),
        position: viewer.map(|v| report.summary.position(v)),
        settle_up: suggest_settlement(&report.summary),
        warnings: &report.warnings,
    };
    serde_json::to_writer_pretty(&mut writer, &document)?;
    writeln!(writer)?;
    Ok(())
}
