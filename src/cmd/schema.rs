//! Schema command - print the expected input format and the JSON report shape

use crate::sink::JsonReport;
use crate::tax::InputRow;
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// What to print
    #[arg(value_enum, default_value = "csv-fields")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// CSV header row for the input file
    CsvHeader,
    /// Input CSV column descriptions
    CsvFields,
    /// JSON Schema of the report written with --format json
    JsonSchema,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::CsvHeader => println!("{}", InputRow::csv_header().join(",")),
            SchemaFormat::CsvFields => print_csv_fields(),
            SchemaFormat::JsonSchema => {
                let schema = schema_for!(JsonReport);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
        }
        Ok(())
    }
}

fn print_csv_fields() {
    println!("CSV Input Format");
    println!("================");
    println!();
    for field in InputRow::csv_schema() {
        let req = if field.required { "required" } else { "optional" };
        println!("{:10} ({:8})  {}", field.name, req, field.description);
    }
    println!();
    println!("Quantity and amount must be non-negative numbers; quantity must not be zero.");
}
