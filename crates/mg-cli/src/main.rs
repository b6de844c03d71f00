//! mg CLI - batch-based SQL migrations

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{create, fresh, init, migrate, rollback, status};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine; credentials may come from the real environment
    dotenvy::dotenv().ok();
    init_logging(cli.global.verbose);

    match &cli.command {
        Some(Commands::Init) => init::execute(&cli.global).await,
        Some(Commands::Migrate) | None => migrate::execute(&cli.global).await,
        Some(Commands::Create(args)) => create::execute(args, &cli.global).await,
        Some(Commands::Rollback) => rollback::execute(&cli.global).await,
        Some(Commands::Fresh(args)) => fresh::execute(args, &cli.global).await,
        Some(Commands::Status(args)) => status::execute(args, &cli.global).await,
    }
}

/// Log to stderr at `info` (or `debug` with `--verbose`); `RUST_LOG` wins.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}
