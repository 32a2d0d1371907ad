pub mod lots;
pub mod report;
pub mod schema;
pub mod validate;

use crate::tax::{self, InputRow};
use anyhow::Context;
use clap::Args;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Input options shared by every command that reads transactions.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Transactions CSV (id,exchange,action,date,asset,quantity,amount), "-" for stdin
    #[arg(short, long, env = "INPUT_FILE")]
    pub input: Option<PathBuf>,

    /// Skip rows that cannot be parsed instead of failing the run
    #[arg(long)]
    pub skip_invalid: bool,
}

/// Read input rows from a CSV file (or stdin with "-")
pub fn read_input(path: &Path) -> anyhow::Result<Vec<InputRow>> {
    let rows = if path.as_os_str() == "-" {
        read_from_stdin()?
    } else {
        let file = File::open(path)
            .with_context(|| format!("cannot open input file {}", path.display()))?;
        tax::read_csv(BufReader::new(file))
            .with_context(|| format!("cannot read {}", path.display()))?
    };
    log::info!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn read_from_stdin() -> anyhow::Result<Vec<InputRow>> {
    let mut buffer = Vec::new();
    io::stdin().lock().read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
    }

    Ok(tax::read_csv(io::Cursor::new(buffer)).context("cannot read stdin")?)
}
