use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(name = "listing-etl")]
#[command(about = "Generates and verifies marketplace listings from a product workbook")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "listing-etl.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override monitoring setting from config
    #[arg(long, global = true)]
    pub monitor: Option<bool>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Generate listings for every product row and write the category tabs
    Generate {
        /// Show what would be processed without calling the API
        #[arg(long)]
        dry_run: bool,

        /// Override generation.max_rows
        #[arg(long)]
        max_rows: Option<usize>,
    },
    /// Verify previously generated listings and write the verification tab
    Verify,
    /// Write an HTML description for every product row
    Describe,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Generate { .. } => "generate",
            Command::Verify => "verify",
            Command::Describe => "describe",
        }
    }
}
