//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// rollup - roll estimate line items up into totals by markup, use group and
/// classification
#[derive(Parser, Debug)]
#[command(name = "rollup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Rollup config file (defaults to ./rollup.yml when present)
    #[arg(short, long, global = true, env = "ROLLUP_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute estimate stats
    Aggregate(AggregateArgs),

    /// Recompute a single branch of line items without markups
    Preview(PreviewArgs),

    /// Check estimates for errors that would abort aggregation
    Validate(ValidateArgs),

    /// Classification report with code descriptions
    Describe(DescribeArgs),
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}

/// Arguments for the aggregate command
#[derive(Args, Debug)]
pub struct AggregateArgs {
    /// Record file (JSON or YAML tables)
    pub snapshot: PathBuf,

    /// Estimates to aggregate (repeatable, default: all)
    #[arg(short, long = "estimate")]
    pub estimates: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Emit stats for write-back; locked estimates fail
    #[arg(long)]
    pub commit: bool,
}

/// Arguments for the preview command
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Record file (JSON or YAML tables)
    pub snapshot: PathBuf,

    /// Line item at the root of the branch
    #[arg(short, long)]
    pub root: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Record file (JSON or YAML tables)
    pub snapshot: PathBuf,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the describe command
#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// Record file (JSON or YAML tables)
    pub snapshot: PathBuf,

    /// Classification code file (YAML with `mf:` and `uf:` hierarchies)
    #[arg(long)]
    pub codes: Option<PathBuf>,

    /// Estimates to describe (repeatable, default: all)
    #[arg(short, long = "estimate")]
    pub estimates: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
