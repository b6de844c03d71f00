//! Init command implementation - writes a starter config

use anyhow::{Context, Result};
use mg_core::config::{CONFIG_FILE_NAMES, DEFAULT_CONFIG_TEMPLATE};
use mg_core::Config;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::GlobalArgs;
use crate::commands::common::config_path;

/// Execute the init command
pub(crate) async fn execute(global: &GlobalArgs) -> Result<()> {
    let root = Path::new(&global.project_dir);

    if let Some(existing) = config_path(global).filter(|p| p.exists()) {
        println!("Config already exists at {}", existing.display());
        return Ok(());
    }

    let path = match &global.config {
        Some(path) => PathBuf::from(path),
        None => root.join(CONFIG_FILE_NAMES[0]),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(&path, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    let config = Config::load(&path).context("Failed to read back the generated config")?;
    let migrations = config.migrations_path_absolute(root);
    fs::create_dir_all(&migrations)
        .with_context(|| format!("Failed to create directory: {}", migrations.display()))?;

    println!("Created {}", path.display());
    println!("Migrations directory: {}", migrations.display());
    println!("\nNext steps:");
    println!("  mg create <name>   # scaffold a migration");
    println!("  mg migrate         # apply pending migrations");
    Ok(())
}
