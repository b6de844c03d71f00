//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// mg - batch-based SQL migrations
///
/// Runs pending migrations when no subcommand is given.
#[derive(Parser, Debug)]
#[command(name = "mg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute (default: migrate)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true, env = "MG_CONFIG")]
    pub config: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter migrate.yml and create the migrations directory
    Init,

    /// Apply all pending migrations as a new batch
    Migrate,

    /// Create a new timestamped migration file
    Create(CreateArgs),

    /// Roll back the most recent batch
    Rollback,

    /// Drop every table, view and sequence, then migrate from scratch
    Fresh(FreshArgs),

    /// Show applied, pending and missing migrations
    Status(StatusArgs),
}

/// Arguments for the create command
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Migration name, appended to the timestamp (e.g. create_users_table)
    pub name: String,
}

/// Arguments for the fresh command
#[derive(Args, Debug)]
pub struct FreshArgs {
    /// Confirm that every object in the database may be dropped
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: StatusOutput,
}

/// Status output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutput {
    /// Aligned text table
    Table,
    /// JSON array
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
