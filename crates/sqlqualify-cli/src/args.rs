//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "sqlqualify")]
#[command(
    author,
    version,
    about = "Flag unqualified column references in multi-table SQL"
)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check SQL files for unqualified column references
    Check {
        /// SQL files to check (supports glob patterns)
        files: Vec<PathBuf>,

        /// Configuration file (defaults to sqlqualify.toml in this or a parent directory)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// SQL dialect
        #[arg(short, long, env = "SQLQUALIFY_DIALECT")]
        dialect: Option<String>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Diagnostic codes to suppress (e.g. Q0001)
        #[arg(long, value_name = "CODE")]
        disable: Vec<String>,

        /// Maximum number of findings to report before stopping (0 for no limit)
        #[arg(long, default_value = "100")]
        max_errors: usize,
    },

    /// Print the per-select facts extracted from a SQL file as JSON
    Facts {
        /// SQL file to inspect
        file: PathBuf,

        /// SQL dialect
        #[arg(short, long, default_value = "postgresql")]
        dialect: String,
    },

    /// Parse SQL and display AST (for debugging)
    Parse {
        /// SQL file to parse
        file: PathBuf,

        /// SQL dialect
        #[arg(short, long, default_value = "postgresql")]
        dialect: String,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output
    Json,
    /// SARIF output (for GitHub Code Scanning)
    Sarif,
}
