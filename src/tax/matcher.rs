use super::transaction::{BuyTransaction, SellTransaction};
use super::warnings::Warning;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;
use std::cmp::Ordering;

/// One allocation of a sell against one buy lot.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct SellTxnFragment {
    /// `{sell_txn_id}-{n}`, n counting from 1 within the sell
    pub id: String,
    pub asset: String,
    pub sell_txn_id: String,
    pub buy_txn_id: String,
    #[schemars(with = "String")]
    pub fragment_sell_qty: Decimal,
    #[schemars(with = "String")]
    pub cost_basis: Decimal,
    #[schemars(with = "String")]
    pub proceeds: Decimal,
    #[schemars(with = "String")]
    pub gain_loss: Decimal,
    #[schemars(with = "String")]
    pub buy_txn_total_qty: Decimal,
    #[schemars(with = "String")]
    pub buy_txn_fraction: Decimal,
    #[schemars(with = "String")]
    pub sell_txn_total_qty: Decimal,
    #[schemars(with = "String")]
    pub sell_txn_fraction: Decimal,
    /// Sell quantity still unmatched once this fragment was applied
    #[schemars(with = "String")]
    pub remaining_sell_qty_after: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    #[error("invariant violated matching sell {sell_id} against buy {buy_id}: {detail}")]
    InvariantViolation {
        sell_id: String,
        buy_id: String,
        detail: String,
    },
    #[error("arithmetic overflow matching sell {sell_id} against buy {buy_id}")]
    Overflow { sell_id: String, buy_id: String },
}

/// How a lot's remaining quantity compares to what the sell still needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Allocation {
    /// The lot covers the sell and keeps a remainder.
    Surplus,
    /// The lot and the sell close out together.
    Exact,
    /// The lot is exhausted before the sell is covered.
    Deficit,
}

impl Allocation {
    fn classify(lot_left: Decimal, sell_left: Decimal) -> Self {
        match lot_left.cmp(&sell_left) {
            Ordering::Greater => Allocation::Surplus,
            Ordering::Equal => Allocation::Exact,
            Ordering::Less => Allocation::Deficit,
        }
    }
}

/// Highest unit cost first. The sort is stable, so lots with equal unit cost
/// keep their input order.
pub fn sort_hifo(buys: &mut [BuyTransaction]) {
    buys.sort_by(|a, b| b.unit_cost.cmp(&a.unit_cost));
}

/// A lot can only cover a sell of the same asset made no earlier than it.
pub fn is_eligible(buy: &BuyTransaction, sell: &SellTransaction) -> bool {
    buy.asset == sell.asset && buy.date <= sell.date
}

/// Sort the lot pool and match every sell against it, one sell at a time
/// and in the order given. Lots consumed by one sell are no longer available
/// to the next.
///
/// Sells left with unmatched quantity are not an error; they come back as
/// [`Warning::UnmatchedQuantity`].
pub fn match_sells(
    sells: &mut [SellTransaction],
    buys: &mut [BuyTransaction],
) -> Result<Vec<Warning>, MatchError> {
    sort_hifo(buys);

    let mut warnings = Vec::new();
    for sell in sells.iter_mut() {
        match_sell(sell, buys)?;

        if !sell.is_fully_matched() {
            log::warn!(
                "Sell {} ({} {}) has {} unmatched: no eligible lots left",
                sell.id,
                sell.sale_qty,
                sell.asset,
                sell.qty_left
            );
            warnings.push(Warning::UnmatchedQuantity {
                sell_id: sell.id.clone(),
                asset: sell.asset.clone(),
                date: sell.date,
                sale_qty: sell.sale_qty,
                unmatched: sell.qty_left,
            });
        }
    }
    Ok(warnings)
}

/// Walk `buys` in their current order and allocate `sell` against eligible
/// lots until it is covered or the lots run out. `buys` must already be in
/// HIFO order.
pub fn match_sell(
    sell: &mut SellTransaction,
    buys: &mut [BuyTransaction],
) -> Result<(), MatchError> {
    for buy in buys.iter_mut() {
        if !is_eligible(buy, sell) || buy.is_consumed() {
            continue;
        }

        match Allocation::classify(buy.qty_left, sell.qty_left) {
            Allocation::Surplus => {
                let qty = sell.qty_left;
                allocate(sell, buy, qty)?;
                return Ok(());
            }
            Allocation::Exact => {
                let qty = sell.qty_left;
                allocate(sell, buy, qty)?;
                return Ok(());
            }
            Allocation::Deficit => {
                let qty = buy.qty_left;
                allocate(sell, buy, qty)?;
            }
        }
    }
    Ok(())
}

/// Move `qty` from the lot to the sell and record the fragment.
fn allocate(
    sell: &mut SellTransaction,
    buy: &mut BuyTransaction,
    qty: Decimal,
) -> Result<(), MatchError> {
    let invariant = |detail: String| MatchError::InvariantViolation {
        sell_id: sell.id.clone(),
        buy_id: buy.id.clone(),
        detail,
    };
    if qty <= Decimal::ZERO || qty > buy.qty_left || qty > sell.qty_left {
        return Err(invariant(format!(
            "allocation {} outside lot remainder {} / sell remainder {}",
            qty, buy.qty_left, sell.qty_left
        )));
    }

    let overflow = || MatchError::Overflow {
        sell_id: sell.id.clone(),
        buy_id: buy.id.clone(),
    };
    let cost_basis = qty.checked_mul(buy.unit_cost).ok_or_else(overflow)?;
    let proceeds = qty.checked_mul(sell.unit_cost).ok_or_else(overflow)?;
    let buy_txn_fraction = qty.checked_div(buy.qty_bought).ok_or_else(overflow)?;
    let sell_txn_fraction = qty.checked_div(sell.sale_qty).ok_or_else(overflow)?;
    let gain_loss = proceeds.checked_sub(cost_basis).ok_or_else(overflow)?;
    let sell_gain_loss = sell.gain_loss.checked_add(gain_loss).ok_or_else(overflow)?;

    let sell_left = sell.qty_left - qty;
    let buy_left = buy.qty_left - qty;

    let fragment = SellTxnFragment {
        id: format!("{}-{}", sell.id, sell.fragments.len() + 1),
        asset: sell.asset.clone(),
        sell_txn_id: sell.id.clone(),
        buy_txn_id: buy.id.clone(),
        fragment_sell_qty: qty,
        cost_basis,
        proceeds,
        gain_loss,
        buy_txn_total_qty: buy.qty_bought,
        buy_txn_fraction,
        sell_txn_total_qty: sell.sale_qty,
        sell_txn_fraction,
        remaining_sell_qty_after: sell_left,
    };

    log::debug!(
        "Fragment {}: {} {} from lot {} @ {} (sold @ {}), gain {}. Lot left {}, sell left {}",
        fragment.id,
        qty,
        sell.asset,
        buy.id,
        buy.unit_cost,
        sell.unit_cost,
        gain_loss,
        buy_left,
        sell_left
    );

    sell.qty_left = sell_left;
    sell.gain_loss = sell_gain_loss;
    sell.fragments.push(fragment);
    buy.qty_left = buy_left;
    buy.qty_sold += qty;
    Ok(())
}
