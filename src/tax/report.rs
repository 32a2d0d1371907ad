use super::matcher::SellTxnFragment;
use super::transaction::SellTransaction;
use rust_decimal::{Decimal, RoundingStrategy};
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::BTreeMap;

/// Decimal places for monetary fields in the final report.
pub const PRESENTATION_DP: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    #[error("arithmetic overflow totalling {total}")]
    Overflow { total: &'static str },
}

/// Totals over every fragment, with fragments rounded for presentation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FinalResult {
    pub qty_sold: Decimal,
    pub gain_loss: Decimal,
    pub proceeds: Decimal,
    pub cost_basis: Decimal,
    pub fragments: Vec<SellTxnFragment>,
    /// Subtotals per asset, ordered by asset symbol.
    pub assets: Vec<AssetTotals>,
}

/// Per-asset subtotals.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct AssetTotals {
    pub asset: String,
    pub fragments: usize,
    #[schemars(with = "String")]
    pub qty_sold: Decimal,
    #[schemars(with = "String")]
    pub proceeds: Decimal,
    #[schemars(with = "String")]
    pub cost_basis: Decimal,
    #[schemars(with = "String")]
    pub gain_loss: Decimal,
}

/// Report totals as written alongside the tables.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct Summary {
    pub fragment_count: usize,
    #[schemars(with = "String")]
    pub qty_sold: Decimal,
    #[schemars(with = "String")]
    pub proceeds: Decimal,
    #[schemars(with = "String")]
    pub cost_basis: Decimal,
    #[schemars(with = "String")]
    pub gain_loss: Decimal,
    pub assets: Vec<AssetTotals>,
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRESENTATION_DP, RoundingStrategy::MidpointAwayFromZero)
}

fn checked_sum<I>(values: I, total: &'static str) -> Result<Decimal, ReportError>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value))
        .ok_or(ReportError::Overflow { total })
}

fn add_to(acc: &mut Decimal, value: Decimal, total: &'static str) -> Result<(), ReportError> {
    *acc = acc
        .checked_add(value)
        .ok_or(ReportError::Overflow { total })?;
    Ok(())
}

/// Flatten the sells' fragments (sell order, then fragment order), round the
/// money fields of each copy and total them. The sells keep their
/// full-precision fragments.
pub fn make_final_report(sells: &[SellTransaction]) -> Result<FinalResult, ReportError> {
    let fragments: Vec<SellTxnFragment> = sells
        .iter()
        .flat_map(|sell| sell.fragments.iter())
        .map(|fragment| SellTxnFragment {
            gain_loss: round_money(fragment.gain_loss),
            proceeds: round_money(fragment.proceeds),
            cost_basis: round_money(fragment.cost_basis),
            ..fragment.clone()
        })
        .collect();

    let gain_loss = checked_sum(fragments.iter().map(|f| f.gain_loss), "gain/loss")?;
    let qty_sold = checked_sum(fragments.iter().map(|f| f.fragment_sell_qty), "quantity sold")?;
    let proceeds = checked_sum(fragments.iter().map(|f| f.proceeds), "proceeds")?;
    let cost_basis = checked_sum(fragments.iter().map(|f| f.cost_basis), "cost basis")?;
    let assets = asset_totals(&fragments)?;

    log::info!(
        "{} sells produced {} fragments: qty sold {}, gain/loss {}",
        sells.len(),
        fragments.len(),
        qty_sold,
        gain_loss
    );

    Ok(FinalResult {
        qty_sold,
        gain_loss,
        proceeds,
        cost_basis,
        fragments,
        assets,
    })
}

fn asset_totals(fragments: &[SellTxnFragment]) -> Result<Vec<AssetTotals>, ReportError> {
    let mut by_asset: BTreeMap<&str, AssetTotals> = BTreeMap::new();
    for f in fragments {
        let totals = by_asset.entry(f.asset.as_str()).or_insert_with(|| AssetTotals {
            asset: f.asset.clone(),
            fragments: 0,
            qty_sold: Decimal::ZERO,
            proceeds: Decimal::ZERO,
            cost_basis: Decimal::ZERO,
            gain_loss: Decimal::ZERO,
        });
        totals.fragments += 1;
        add_to(&mut totals.qty_sold, f.fragment_sell_qty, "quantity sold")?;
        add_to(&mut totals.proceeds, f.proceeds, "proceeds")?;
        add_to(&mut totals.cost_basis, f.cost_basis, "cost basis")?;
        add_to(&mut totals.gain_loss, f.gain_loss, "gain/loss")?;
    }
    Ok(by_asset.into_values().collect())
}

impl FinalResult {
    pub fn summary(&self) -> Summary {
        Summary {
            fragment_count: self.fragments.len(),
            qty_sold: self.qty_sold,
            proceeds: self.proceeds,
            cost_basis: self.cost_basis,
            gain_loss: self.gain_loss,
            assets: self.assets.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::matcher::match_sells;
    use crate::tax::transaction::{normalize, InputRow};
    use rust_decimal_macros::dec;

    fn row(id: &str, action: &str, date: &str, asset: &str, qty: &str, amount: &str) -> InputRow {
        InputRow {
            id: id.to_string(),
            exchange: "kraken".to_string(),
            action: action.to_string(),
            date: date.to_string(),
            asset: asset.to_string(),
            quantity: qty.to_string(),
            amount: amount.to_string(),
        }
    }

    fn matched(rows: &[InputRow]) -> Vec<SellTransaction> {
        let mut normalized = normalize(rows);
        match_sells(&mut normalized.sells, &mut normalized.buys).unwrap();
        normalized.sells
    }

    #[test]
    fn empty_input_gives_zero_totals() {
        let result = make_final_report(&[]).unwrap();
        assert_eq!(result, FinalResult::default());
        assert!(result.assets.is_empty());
    }

    #[test]
    fn totals_sum_rounded_fragments() {
        let sells = matched(&[
            row("b1", "Buy", "2021-01-01", "BTC", "3", "100"),
            row("b2", "Buy", "2021-01-02", "ETH", "1", "10"),
            row("s1", "Sell", "2021-02-01", "BTC", "1", "50.005"),
            row("s2", "Sell", "2021-02-02", "BTC", "1", "40"),
            row("s3", "Sell", "2021-02-03", "ETH", "0.5", "9"),
        ]);

        let result = make_final_report(&sells).unwrap();

        let ids: Vec<_> = result.fragments.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["s1-1", "s2-1", "s3-1"]);

        // lot unit cost 33.33333333; proceeds 50.005 rounds away from zero
        let first = &result.fragments[0];
        assert_eq!(first.cost_basis, dec!(33.33));
        assert_eq!(first.proceeds, dec!(50.01));
        assert_eq!(first.gain_loss, dec!(16.67));

        assert_eq!(result.qty_sold, dec!(2.5));
        assert_eq!(result.gain_loss, dec!(16.67) + dec!(6.67) + dec!(4));
        assert_eq!(
            result.gain_loss,
            result.fragments.iter().map(|f| f.gain_loss).sum::<Decimal>()
        );
    }

    #[test]
    fn rounding_does_not_touch_matched_sells() {
        let sells = matched(&[
            row("b1", "Buy", "2021-01-01", "BTC", "3", "100"),
            row("s1", "Sell", "2021-02-01", "BTC", "1", "50"),
        ]);

        let result = make_final_report(&sells).unwrap();

        assert_eq!(sells[0].fragments[0].cost_basis, dec!(33.33333333));
        assert_eq!(result.fragments[0].cost_basis, dec!(33.33));
        assert_eq!(sells[0].gain_loss, dec!(16.66666667));
    }

    #[test]
    fn asset_totals_group_by_symbol() {
        let sells = matched(&[
            row("b1", "Buy", "2021-01-01", "ETH", "2", "20"),
            row("b2", "Buy", "2021-01-01", "BTC", "1", "100"),
            row("s1", "Sell", "2021-02-01", "ETH", "1", "15"),
            row("s2", "Sell", "2021-02-01", "BTC", "1", "80"),
            row("s3", "Sell", "2021-03-01", "ETH", "1", "5"),
        ]);

        let result = make_final_report(&sells).unwrap();
        let totals = &result.assets;

        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].asset, "BTC");
        assert_eq!(totals[0].gain_loss, dec!(-20));
        assert_eq!(totals[1].asset, "ETH");
        assert_eq!(totals[1].fragments, 2);
        assert_eq!(totals[1].qty_sold, dec!(2));
        assert_eq!(totals[1].proceeds, dec!(20));
        assert_eq!(totals[1].gain_loss, Decimal::ZERO);

        let summary = result.summary();
        assert_eq!(summary.fragment_count, 3);
        assert_eq!(summary.proceeds, dec!(100));
        assert_eq!(summary.cost_basis, dec!(120));
        assert_eq!(summary.gain_loss, dec!(-20));
    }

    #[test]
    fn total_overflow_is_an_error() {
        let max = Decimal::MAX.to_string();
        let sells = matched(&[
            row("b1", "Buy", "2021-01-01", "BTC", "1", &max),
            row("b2", "Buy", "2021-01-01", "BTC", "1", &max),
            row("s1", "Sell", "2021-02-01", "BTC", "1", "0"),
            row("s2", "Sell", "2021-02-02", "BTC", "1", "0"),
        ]);
        assert_eq!(sells[0].gain_loss, -Decimal::MAX);
        assert_eq!(sells[1].gain_loss, -Decimal::MAX);

        assert_eq!(
            make_final_report(&sells),
            Err(ReportError::Overflow { total: "gain/loss" })
        );
    }
}
