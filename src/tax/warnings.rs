use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

use super::transaction::ParseError;

/// Conditions worth surfacing that do not stop a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Warning {
    /// Eligible lots ran out before the sell was covered.
    /// `unmatched == sale_qty` means no lot could be used at all.
    UnmatchedQuantity {
        sell_id: String,
        asset: String,
        date: NaiveDateTime,
        sale_qty: Decimal,
        unmatched: Decimal,
    },
    /// Input row left out of the calculation.
    SkippedRow { row: usize, id: String, reason: String },
}

impl Warning {
    pub fn kind(&self) -> &'static str {
        match self {
            Warning::UnmatchedQuantity {
                sale_qty,
                unmatched,
                ..
            } if sale_qty == unmatched => "NoEligibleLots",
            Warning::UnmatchedQuantity { .. } => "InsufficientLots",
            Warning::SkippedRow { .. } => "SkippedRow",
        }
    }
}

impl From<&ParseError> for Warning {
    fn from(err: &ParseError) -> Self {
        Warning::SkippedRow {
            row: err.row,
            id: err.id.clone(),
            reason: err.kind.to_string(),
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UnmatchedQuantity {
                sell_id,
                asset,
                date,
                sale_qty,
                unmatched,
            } => write!(
                f,
                "sell {} on {}: {} of {} {} has no eligible lot",
                sell_id,
                date.format("%Y-%m-%d"),
                unmatched,
                sale_qty,
                asset
            ),
            Warning::SkippedRow { row, id, reason } => {
                write!(f, "row {} (id '{}') skipped: {}", row, id, reason)
            }
        }
    }
}
