pub mod matcher;
pub mod report;
pub mod transaction;
pub mod warnings;

pub use matcher::{match_sells, SellTxnFragment};
pub use report::{make_final_report, FinalResult, Summary};
pub use transaction::{
    normalize, read_csv, BuyTransaction, InputRow, Normalized, ParseError, SellTransaction,
};
pub use warnings::Warning;

/// Everything produced by one run over a set of input rows.
#[derive(Debug, Clone)]
pub struct Calculation {
    /// Lots in HIFO order, with their remaining quantities.
    pub buys: Vec<BuyTransaction>,
    /// Sells in input order, each with its full-precision fragments.
    pub sells: Vec<SellTransaction>,
    pub result: FinalResult,
    pub warnings: Vec<Warning>,
}

impl Calculation {
    pub fn unmatched_sells(&self) -> impl Iterator<Item = &SellTransaction> {
        self.sells.iter().filter(|s| !s.is_fully_matched())
    }
}

/// Rows rejected during normalization when the run does not allow skipping.
#[derive(Debug, thiserror::Error)]
#[error("{} input row(s) could not be parsed:\n{}", .0.len(), list_errors(.0))]
pub struct RejectedRows(pub Vec<ParseError>);

fn list_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| format!("  {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Normalize, match and aggregate.
///
/// Rejected rows fail the run unless `skip_invalid` is set, in which case
/// each one becomes a [`Warning::SkippedRow`].
pub fn calculate_gains(rows: &[InputRow], skip_invalid: bool) -> anyhow::Result<Calculation> {
    let Normalized {
        mut buys,
        mut sells,
        rejected,
    } = normalize(rows);

    if !rejected.is_empty() && !skip_invalid {
        return Err(RejectedRows(rejected).into());
    }

    let mut warnings: Vec<Warning> = rejected
        .iter()
        .inspect(|e| log::warn!("Skipping {}", e))
        .map(Warning::from)
        .collect();

    warnings.extend(match_sells(&mut sells, &mut buys)?);
    let result = make_final_report(&sells)?;

    Ok(Calculation {
        buys,
        sells,
        result,
        warnings,
    })
}
