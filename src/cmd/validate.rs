//! Validate command - surface data quality issues without writing a report

use crate::cmd::read_input;
use crate::config::require_input;
use crate::tax::{calculate_gains, Warning};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Transactions CSV, "-" for stdin
    #[arg(short, long, env = "INPUT_FILE")]
    input: Option<PathBuf>,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct ValidationOutput<'a> {
    rows: usize,
    buys: usize,
    sells: usize,
    issue_count: usize,
    issues: &'a [Warning],
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let input = require_input(self.input.as_deref())?;
        let rows = read_input(&input)?;
        // bad rows are issues to list here, not a reason to stop
        let calc = calculate_gains(&rows, true)?;

        let output = ValidationOutput {
            rows: rows.len(),
            buys: calc.buys.len(),
            sells: calc.sells.len(),
            issue_count: calc.warnings.len(),
            issues: &calc.warnings,
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_text(&output);
        }

        // Exit with code 1 if issues found
        if !calc.warnings.is_empty() {
            std::process::exit(1);
        }
        Ok(())
    }
}

fn print_text(output: &ValidationOutput) {
    println!();
    println!(
        "VALIDATION RESULTS ({} rows: {} buys, {} sells)",
        output.rows, output.buys, output.sells
    );
    println!();

    if output.issues.is_empty() {
        println!("\u{2713} No issues found.");
        return;
    }

    println!("\u{26A0} {} issue(s) found:", output.issue_count);
    println!();
    for (i, issue) in output.issues.iter().enumerate() {
        println!("  {}. [{}] {}", i + 1, issue.kind(), issue);
    }
    println!();
}
