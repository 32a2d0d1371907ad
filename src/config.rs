use clap::ValueEnum;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("input file missing: pass --input or set INPUT_FILE")]
    MissingInput,
    #[error("output location missing: pass --output or set OUTPUT_FILE")]
    MissingOutput,
}

/// How the report tables are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One CSV file per table inside the output directory
    #[default]
    Csv,
    /// A single JSON document holding every table
    Json,
}

/// Settings for a report run, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub skip_invalid: bool,
}

impl Config {
    pub fn new(
        input: Option<&Path>,
        output: Option<&Path>,
        format: OutputFormat,
        skip_invalid: bool,
    ) -> Result<Self, ConfigError> {
        Ok(Config {
            input: require_input(input)?,
            output: non_empty(output).ok_or(ConfigError::MissingOutput)?,
            format,
            skip_invalid,
        })
    }
}

/// Input location for commands that only read.
pub fn require_input(input: Option<&Path>) -> Result<PathBuf, ConfigError> {
    non_empty(input).ok_or(ConfigError::MissingInput)
}

fn non_empty(path: Option<&Path>) -> Option<PathBuf> {
    path.filter(|p| !p.as_os_str().is_empty()).map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_locations_are_required() {
        let input = Path::new("trades.csv");
        let output = Path::new("out");

        assert_eq!(
            Config::new(None, Some(output), OutputFormat::Csv, false),
            Err(ConfigError::MissingInput)
        );
        assert_eq!(
            Config::new(Some(input), None, OutputFormat::Csv, false),
            Err(ConfigError::MissingOutput)
        );
        assert_eq!(
            Config::new(Some(input), Some(Path::new("")), OutputFormat::Csv, false),
            Err(ConfigError::MissingOutput)
        );

        let config = Config::new(Some(input), Some(output), OutputFormat::Json, true).unwrap();
        assert_eq!(config.input, PathBuf::from("trades.csv"));
        assert_eq!(config.output, PathBuf::from("out"));
        assert_eq!(config.format, OutputFormat::Json);
        assert!(config.skip_invalid);
    }
}
