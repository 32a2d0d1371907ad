//! Report command - match sells against lots and write the report tables

use crate::cmd::{read_input, InputArgs};
use crate::config::{Config, OutputFormat};
use crate::sink;
use crate::tax::{calculate_gains, Calculation, SellTxnFragment, Warning};
use crate::utils::{format_money, format_quantity, format_signed};
use clap::Args;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ReportCommand {
    #[command(flatten)]
    source: InputArgs,

    /// Output location: a directory for csv, a file for json
    #[arg(short, long, env = "OUTPUT_FILE")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Also print every sell fragment
    #[arg(long)]
    fragments: bool,

    /// Only print fragments for this asset (e.g. BTC)
    #[arg(short, long)]
    asset: Option<String>,
}

impl ReportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let config = Config::new(
            self.source.input.as_deref(),
            self.output.as_deref(),
            self.format,
            self.source.skip_invalid,
        )?;
        run(&config, self.fragments, self.asset.as_deref())
    }
}

fn run(config: &Config, show_fragments: bool, asset: Option<&str>) -> anyhow::Result<()> {
    let inputs = read_input(&config.input)?;
    let calc = calculate_gains(&inputs, config.skip_invalid)?;

    let written = sink::write_report(&config.output, config.format, &inputs, &calc)?;

    if show_fragments {
        print_fragments(&calc.result.fragments, asset);
    }
    print_summary(&calc);
    print_warnings(&calc.warnings);

    println!();
    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

#[derive(Debug, Clone, Tabled)]
struct AssetRow {
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Fragments")]
    fragments: String,
    #[tabled(rename = "Qty Sold")]
    qty_sold: String,
    #[tabled(rename = "Proceeds")]
    proceeds: String,
    #[tabled(rename = "Cost Basis")]
    cost_basis: String,
    #[tabled(rename = "Gain/Loss")]
    gain_loss: String,
}

#[derive(Debug, Clone, Tabled)]
struct FragmentRow {
    #[tabled(rename = "Fragment")]
    id: String,
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Lot")]
    buy_txn_id: String,
    #[tabled(rename = "Qty")]
    qty: String,
    #[tabled(rename = "Cost Basis")]
    cost_basis: String,
    #[tabled(rename = "Proceeds")]
    proceeds: String,
    #[tabled(rename = "Gain/Loss")]
    gain_loss: String,
    #[tabled(rename = "Sell Left")]
    remaining: String,
}

fn print_summary(calc: &Calculation) {
    let result = &calc.result;

    println!();
    println!("REALIZED GAINS (HIFO)");
    println!();

    if result.fragments.is_empty() {
        println!("No sells were matched against any lot");
        return;
    }

    let mut rows: Vec<AssetRow> = result
        .assets
        .iter()
        .map(|t| AssetRow {
            asset: t.asset.clone(),
            fragments: t.fragments.to_string(),
            qty_sold: format_quantity(t.qty_sold),
            proceeds: format_money(t.proceeds),
            cost_basis: format_money(t.cost_basis),
            gain_loss: format_signed(t.gain_loss),
        })
        .collect();
    rows.push(AssetRow {
        asset: "TOTAL".to_string(),
        fragments: result.fragments.len().to_string(),
        qty_sold: format_quantity(result.qty_sold),
        proceeds: format_money(result.proceeds),
        cost_basis: format_money(result.cost_basis),
        gain_loss: format_signed(result.gain_loss),
    });

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
    println!(
        "Sells: {} ({} fully matched)",
        calc.sells.len(),
        calc.sells.len() - calc.unmatched_sells().count()
    );
}

fn print_fragments(fragments: &[SellTxnFragment], asset: Option<&str>) {
    let rows: Vec<FragmentRow> = fragments
        .iter()
        .filter(|f| asset.is_none_or(|a| f.asset.eq_ignore_ascii_case(a)))
        .map(|f| FragmentRow {
            id: f.id.clone(),
            asset: f.asset.clone(),
            buy_txn_id: f.buy_txn_id.clone(),
            qty: format_quantity(f.fragment_sell_qty),
            cost_basis: format_money(f.cost_basis),
            proceeds: format_money(f.proceeds),
            gain_loss: format_signed(f.gain_loss),
            remaining: format_quantity(f.remaining_sell_qty_after),
        })
        .collect();

    println!();
    if rows.is_empty() {
        println!("No fragments found matching filters");
        return;
    }
    println!("SELL FRAGMENTS");
    println!();
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
}

fn print_warnings(warnings: &[Warning]) {
    if warnings.is_empty() {
        return;
    }
    println!();
    println!("\u{26A0} {} warning(s):", warnings.len());
    for warning in warnings {
        println!("  [{}] {}", warning.kind(), warning);
    }
}
