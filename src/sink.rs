//! Report output: the input rows, sells, lots and fragments as four tables.

use crate::config::OutputFormat;
use crate::tax::{
    BuyTransaction, Calculation, InputRow, SellTransaction, SellTxnFragment, Summary,
};
use crate::utils::write_csv;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const INPUTS_FILE: &str = "inputs.csv";
pub const SELL_TXNS_FILE: &str = "sell_txns.csv";
pub const BUY_TXNS_FILE: &str = "buy_txns.csv";
pub const SELL_FRAGMENTS_FILE: &str = "sell_fragments.csv";

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("cannot create output directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("cannot write {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("cannot write {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("cannot write {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Flat sell record; fragments go to their own table.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SellTxnRecord {
    pub id: String,
    pub exchange: String,
    pub asset: String,
    pub date: NaiveDateTime,
    #[schemars(with = "String")]
    pub sale_qty: Decimal,
    #[schemars(with = "String")]
    pub amt: Decimal,
    #[schemars(with = "String")]
    pub unit_cost: Decimal,
    #[schemars(with = "String")]
    pub qty_left: Decimal,
    #[schemars(with = "String")]
    pub gain_loss: Decimal,
    pub fragment_count: usize,
}

impl From<&SellTransaction> for SellTxnRecord {
    fn from(sell: &SellTransaction) -> Self {
        SellTxnRecord {
            id: sell.id.clone(),
            exchange: sell.exchange.clone(),
            asset: sell.asset.clone(),
            date: sell.date,
            sale_qty: sell.sale_qty,
            amt: sell.amt,
            unit_cost: sell.unit_cost,
            qty_left: sell.qty_left,
            gain_loss: sell.gain_loss,
            fragment_count: sell.fragments.len(),
        }
    }
}

/// The JSON output document.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct JsonReport {
    pub inputs: Vec<InputRow>,
    pub sell_txns: Vec<SellTxnRecord>,
    pub buy_txns: Vec<BuyTransaction>,
    pub sell_fragments: Vec<SellTxnFragment>,
    pub summary: Summary,
}

impl JsonReport {
    pub fn new(inputs: &[InputRow], calc: &Calculation) -> Self {
        JsonReport {
            inputs: inputs.to_vec(),
            sell_txns: calc.sells.iter().map(SellTxnRecord::from).collect(),
            buy_txns: calc.buys.clone(),
            sell_fragments: calc.result.fragments.clone(),
            summary: calc.result.summary(),
        }
    }
}

/// Write the report tables to `output` and return the files written.
///
/// For [`OutputFormat::Csv`] `output` is a directory, created if missing.
/// For [`OutputFormat::Json`] it is the file to write.
pub fn write_report(
    output: &Path,
    format: OutputFormat,
    inputs: &[InputRow],
    calc: &Calculation,
) -> Result<Vec<PathBuf>, SinkError> {
    let written = match format {
        OutputFormat::Csv => write_csv_tables(output, inputs, calc)?,
        OutputFormat::Json => {
            write_json(output, &JsonReport::new(inputs, calc))?;
            vec![output.to_path_buf()]
        }
    };
    for path in &written {
        log::info!("Wrote {}", path.display());
    }
    Ok(written)
}

fn write_csv_tables(
    dir: &Path,
    inputs: &[InputRow],
    calc: &Calculation,
) -> Result<Vec<PathBuf>, SinkError> {
    fs::create_dir_all(dir).map_err(|source| SinkError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let sells = calc.sells.iter().map(SellTxnRecord::from);
    Ok(vec![
        write_table(&dir.join(INPUTS_FILE), inputs)?,
        write_table(&dir.join(SELL_TXNS_FILE), sells)?,
        write_table(&dir.join(BUY_TXNS_FILE), &calc.buys)?,
        write_table(&dir.join(SELL_FRAGMENTS_FILE), &calc.result.fragments)?,
    ])
}

fn write_table<I, R>(path: &Path, records: I) -> Result<PathBuf, SinkError>
where
    I: IntoIterator<Item = R>,
    R: Serialize,
{
    let file = create(path)?;
    write_csv(records, file).map_err(|source| SinkError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(path.to_path_buf())
}

fn write_json(path: &Path, report: &JsonReport) -> Result<(), SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| SinkError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let mut writer = BufWriter::new(create(path)?);
    serde_json::to_writer_pretty(&mut writer, report).map_err(|source| SinkError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|source| SinkError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn create(path: &Path) -> Result<File, SinkError> {
    File::create(path).map_err(|source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    })
}
