use std::path::PathBuf;

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};

/// Top-level CLI entry point.
#[derive(Debug, Parser)]
#[command(
    name = "swsearch",
    version,
    about = "SmallWorld chemical similarity search client"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(global = true, short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn print_help() {
        let mut cmd = Cli::command();
        let _ = cmd.print_help();
        println!();
    }
}

/// Supported subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Search structures given inline on the command line.
    Query(QueryArgs),
    /// Search every structure found in a CSV column.
    Batch(BatchArgs),
}

/// Search flags shared by both subcommands.
#[derive(Debug, Args)]
pub struct SearchFlags {
    /// Base URL of the search service.
    #[arg(long)]
    pub url: Option<String>,
    /// Target database to search against.
    #[arg(long)]
    pub db: Option<String>,
    /// Overall distance threshold.
    #[arg(long)]
    pub dist: Option<u32>,
    /// Number of concurrent search workers (>= 1).
    #[arg(long)]
    pub workers: Option<usize>,
    /// Pretty-print JSON output.
    #[arg(long, action = ArgAction::SetTrue)]
    pub pretty: bool,
}

/// Search one or more inline structures.
#[derive(Debug, Args)]
pub struct QueryArgs {
    /// SMILES strings to search.
    #[arg(required = true, value_name = "SMILES")]
    pub smiles: Vec<String>,
    #[command(flatten)]
    pub flags: SearchFlags,
}

/// Search structures loaded from a CSV file.
#[derive(Debug, Args)]
pub struct BatchArgs {
    /// CSV file holding the input structures.
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,
    /// Header of the column holding the structures.
    #[arg(long, default_value = "Smiles")]
    pub column: String,
    #[command(flatten)]
    pub flags: SearchFlags,
}
