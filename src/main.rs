use clap::{Parser, Subcommand};

mod cmd;
mod config;
mod sink;
mod tax;
mod utils;

#[derive(Parser, Debug)]
#[command(
    name = "hifo-gains",
    version,
    about = "Calculate realized capital gains by matching sells against the highest-cost lots first"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Match sells against lots and write the report tables
    Report(cmd::report::ReportCommand),
    /// Check input rows and matching without writing anything
    Validate(cmd::validate::ValidateCommand),
    /// Show purchase lots and what is left of them
    Lots(cmd::lots::LotsCommand),
    /// Print the input format or the JSON report schema
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Report(report) => report.exec(),
        Command::Validate(validate) => validate.exec(),
        Command::Lots(lots) => lots.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}
