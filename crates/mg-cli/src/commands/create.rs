//! Create command implementation - scaffolds a new migration file

use anyhow::{Context, Result};

use crate::cli::{CreateArgs, GlobalArgs};
use crate::commands::common::load_project;

/// Execute the create command
///
/// Only the filesystem is touched; no database connection is opened.
pub(crate) async fn execute(args: &CreateArgs, global: &GlobalArgs) -> Result<()> {
    let Some(project) = load_project(global)? else {
        return Ok(());
    };

    let path = project
        .migrations()
        .create_migration(&args.name)
        .with_context(|| format!("Failed to create migration '{}'", args.name))?;

    println!("Created migration: {}", path.display());
    Ok(())
}
