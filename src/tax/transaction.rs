use super::matcher::SellTxnFragment;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use hifo_derive::CsvSchema;
use rust_decimal::{Decimal, RoundingStrategy};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::str::FromStr;

/// Decimal places kept on unit costs used for matching.
pub const UNIT_COST_DP: u32 = 8;

/// A rejected input row. `row` is the 1-based data row (header excluded).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("row {row} (id '{id}'): {kind}")]
pub struct ParseError {
    pub row: usize,
    pub id: String,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("unknown action '{0}', expected Buy or Sell")]
    UnknownAction(String),
    #[error("invalid date '{0}'")]
    InvalidDate(String),
    #[error("{field} '{value}' is not a number")]
    NotANumber { field: &'static str, value: String },
    #[error("{field} must not be negative: {value}")]
    Negative { field: &'static str, value: Decimal },
    #[error("quantity is zero, unit cost is undefined")]
    ZeroQuantity,
    #[error("unit cost {amount}/{quantity} is out of range")]
    Overflow { amount: Decimal, quantity: Decimal },
}

/// Column description produced by `#[derive(CsvSchema)]`.
#[derive(Debug, Clone, Copy)]
pub struct CsvField {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// Raw transaction row as it appears in the input CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, CsvSchema)]
pub struct InputRow {
    /// Unique transaction identifier, used to build fragment ids
    pub id: String,
    /// Exchange or account the transaction happened on
    pub exchange: String,
    /// Buy or Sell
    pub action: String,
    /// Transaction date (YYYY-MM-DD, YYYY-MM-DDThh:mm:ss, RFC 3339 or MM/DD/YYYY)
    pub date: String,
    /// Asset symbol (e.g. BTC, ETH)
    pub asset: String,
    /// Quantity bought or sold
    pub quantity: String,
    /// Total amount paid (Buy) or received (Sell)
    pub amount: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Buy,
    Sell,
}

impl FromStr for Action {
    type Err = ParseErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Buy" => Ok(Action::Buy),
            "Sell" => Ok(Action::Sell),
            other => Err(ParseErrorKind::UnknownAction(other.to_string())),
        }
    }
}

/// A purchase lot.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct BuyTransaction {
    pub id: String,
    pub exchange: String,
    pub asset: String,
    pub date: NaiveDateTime,
    #[schemars(with = "String")]
    pub qty_bought: Decimal,
    #[schemars(with = "String")]
    pub amt: Decimal,
    #[schemars(with = "String")]
    pub unit_cost: Decimal,
    #[schemars(with = "String")]
    pub qty_sold: Decimal,
    #[schemars(with = "String")]
    pub qty_left: Decimal,
}

impl BuyTransaction {
    pub fn is_consumed(&self) -> bool {
        self.qty_left.is_zero()
    }

    /// Cost basis still held in the lot, `None` on overflow.
    pub fn remaining_cost(&self) -> Option<Decimal> {
        self.qty_left.checked_mul(self.unit_cost)
    }
}

/// A disposal, along with the allocations made against it.
#[derive(Debug, Clone, PartialEq)]
pub struct SellTransaction {
    pub id: String,
    pub exchange: String,
    pub asset: String,
    pub date: NaiveDateTime,
    pub sale_qty: Decimal,
    pub amt: Decimal,
    pub unit_cost: Decimal,
    pub qty_left: Decimal,
    pub gain_loss: Decimal,
    pub fragments: Vec<SellTxnFragment>,
}

impl SellTransaction {
    pub fn is_fully_matched(&self) -> bool {
        self.qty_left.is_zero()
    }
}

/// Buys and sells in input order, plus every row that could not be used.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub buys: Vec<BuyTransaction>,
    pub sells: Vec<SellTransaction>,
    pub rejected: Vec<ParseError>,
}

/// Read raw rows from CSV. Cells are trimmed, numbers stay textual until
/// normalization so a bad cell rejects one row instead of the whole file.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<InputRow>, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    rdr.deserialize().collect()
}

/// Split rows into typed buys and sells, computing unit costs.
pub fn normalize(rows: &[InputRow]) -> Normalized {
    let mut normalized = Normalized::default();

    for (index, row) in rows.iter().enumerate() {
        let fail = |kind| ParseError {
            row: index + 1,
            id: row.id.clone(),
            kind,
        };
        match parse_row(row) {
            Ok(Parsed::Buy(buy)) => normalized.buys.push(buy),
            Ok(Parsed::Sell(sell)) => normalized.sells.push(sell),
            Err(kind) => normalized.rejected.push(fail(kind)),
        }
    }

    log::info!(
        "Normalized {} rows: {} buys, {} sells, {} rejected",
        rows.len(),
        normalized.buys.len(),
        normalized.sells.len(),
        normalized.rejected.len()
    );
    normalized
}

enum Parsed {
    Buy(BuyTransaction),
    Sell(SellTransaction),
}

fn parse_row(row: &InputRow) -> Result<Parsed, ParseErrorKind> {
    let action: Action = row.action.parse()?;
    let date = parse_datetime(&row.date)
        .ok_or_else(|| ParseErrorKind::InvalidDate(row.date.clone()))?;
    let quantity = parse_decimal("quantity", &row.quantity)?;
    let amount = parse_decimal("amount", &row.amount)?;
    let unit_cost = unit_cost(amount, quantity)?;

    Ok(match action {
        Action::Buy => Parsed::Buy(BuyTransaction {
            id: row.id.clone(),
            exchange: row.exchange.clone(),
            asset: row.asset.clone(),
            date,
            qty_bought: quantity,
            amt: amount,
            unit_cost,
            qty_sold: Decimal::ZERO,
            qty_left: quantity,
        }),
        Action::Sell => Parsed::Sell(SellTransaction {
            id: row.id.clone(),
            exchange: row.exchange.clone(),
            asset: row.asset.clone(),
            date,
            sale_qty: quantity,
            amt: amount,
            unit_cost,
            qty_left: quantity,
            gain_loss: Decimal::ZERO,
            fragments: Vec::new(),
        }),
    })
}

fn parse_decimal(field: &'static str, value: &str) -> Result<Decimal, ParseErrorKind> {
    let parsed = Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|_| ParseErrorKind::NotANumber {
            field,
            value: value.to_string(),
        })?;
    if parsed.is_sign_negative() && !parsed.is_zero() {
        return Err(ParseErrorKind::Negative {
            field,
            value: parsed,
        });
    }
    Ok(parsed)
}

/// `amount / quantity` rounded half away from zero to [`UNIT_COST_DP`] places.
pub fn unit_cost(amount: Decimal, quantity: Decimal) -> Result<Decimal, ParseErrorKind> {
    if quantity.is_zero() {
        return Err(ParseErrorKind::ZeroQuantity);
    }
    amount
        .checked_div(quantity)
        .map(|cost| {
            cost.round_dp_with_strategy(UNIT_COST_DP, RoundingStrategy::MidpointAwayFromZero)
        })
        .ok_or(ParseErrorKind::Overflow { amount, quantity })
}

/// Parse a date or datetime. Date-only values are midnight; offsets are
/// normalized to UTC.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    for format in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}
