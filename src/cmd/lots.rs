//! Lots command - remaining purchase lots after every sell is matched

use crate::cmd::{read_input, InputArgs};
use crate::config::require_input;
use crate::tax::{calculate_gains, BuyTransaction};
use crate::utils::{format_money, format_quantity};
use clap::Args;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct LotsCommand {
    #[command(flatten)]
    source: InputArgs,

    /// Filter by asset (e.g., BTC, ETH)
    #[arg(short, long)]
    asset: Option<String>,

    /// Include lots that are fully consumed
    #[arg(long)]
    all: bool,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Tabled)]
struct LotRow {
    #[tabled(rename = "Lot")]
    id: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Exchange")]
    exchange: String,
    #[tabled(rename = "Bought")]
    qty_bought: String,
    #[tabled(rename = "Unit Cost")]
    unit_cost: String,
    #[tabled(rename = "Sold")]
    qty_sold: String,
    #[tabled(rename = "Left")]
    qty_left: String,
    #[tabled(rename = "Cost Left")]
    cost_left: String,
}

impl TryFrom<&BuyTransaction> for LotRow {
    type Error = anyhow::Error;

    fn try_from(lot: &BuyTransaction) -> anyhow::Result<Self> {
        let cost_left = lot
            .remaining_cost()
            .ok_or_else(|| anyhow::anyhow!("remaining cost of lot {} overflows", lot.id))?;
        Ok(LotRow {
            id: lot.id.clone(),
            date: lot.date.format("%Y-%m-%d").to_string(),
            asset: lot.asset.clone(),
            exchange: lot.exchange.clone(),
            qty_bought: format_quantity(lot.qty_bought),
            unit_cost: format_quantity(lot.unit_cost),
            qty_sold: format_quantity(lot.qty_sold),
            qty_left: format_quantity(lot.qty_left),
            cost_left: format_money(cost_left),
        })
    }
}

impl LotsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let input = require_input(self.source.input.as_deref())?;
        let rows = read_input(&input)?;
        let calc = calculate_gains(&rows, self.source.skip_invalid)?;

        // calc.buys is already in HIFO order
        let lots = filter_lots(&calc.buys, self.asset.as_deref(), self.all);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&lots)?);
        } else {
            print_table(&lots)?;
        }
        Ok(())
    }
}

fn filter_lots<'a>(
    buys: &'a [BuyTransaction],
    asset: Option<&str>,
    include_consumed: bool,
) -> Vec<&'a BuyTransaction> {
    buys.iter()
        .filter(|b| include_consumed || !b.is_consumed())
        .filter(|b| asset.is_none_or(|a| b.asset.eq_ignore_ascii_case(a)))
        .collect()
}

fn print_table(lots: &[&BuyTransaction]) -> anyhow::Result<()> {
    if lots.is_empty() {
        println!("No lots found matching filters");
        return Ok(());
    }

    let rows = lots
        .iter()
        .map(|lot| LotRow::try_from(*lot))
        .collect::<anyhow::Result<Vec<_>>>()?;

    println!();
    println!("LOTS (highest unit cost first)");
    println!();
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
    Ok(())
}
