//! Status command implementation - lists migrations and their ledger state

use anyhow::{Context, Result};
use mg_engine::{MigrationState, StatusEntry};

use crate::cli::{GlobalArgs, StatusArgs, StatusOutput};
use crate::commands::common::{create_migrator, load_project, print_table};

/// Execute the status command
pub(crate) async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let Some(project) = load_project(global)? else {
        return Ok(());
    };
    let migrator = create_migrator(&project).await?;

    let statuses = migrator
        .status()
        .await
        .context("Failed to read migration status")?;

    match args.output {
        StatusOutput::Json => {
            let json =
                serde_json::to_string_pretty(&statuses).context("Failed to serialize status")?;
            println!("{}", json);
        }
        StatusOutput::Table => {
            if statuses.is_empty() {
                println!(
                    "No migrations found in {}",
                    migrator.directory().path().display()
                );
                return Ok(());
            }
            print_table(&["NAME", "STATUS", "BATCH", "NOTE"], &status_rows(&statuses));
            println!();
            println!("{}", summary(&statuses));
        }
    }
    Ok(())
}

fn status_rows(statuses: &[StatusEntry]) -> Vec<Vec<String>> {
    statuses
        .iter()
        .map(|entry| {
            let (label, batch, note) = match entry.state {
                MigrationState::Applied { batch } => ("applied", batch.to_string(), ""),
                MigrationState::Pending => ("pending", "-".to_string(), ""),
                MigrationState::Missing { batch } => {
                    ("missing", batch.to_string(), "file not found")
                }
            };
            let note = if entry.well_formed {
                note
            } else {
                "no -- UP -- / -- DOWN -- markers"
            };
            vec![
                entry.name.to_string(),
                label.to_string(),
                batch,
                note.to_string(),
            ]
        })
        .collect()
}

fn summary(statuses: &[StatusEntry]) -> String {
    let count = |pred: fn(&MigrationState) -> bool| {
        statuses.iter().filter(|s| pred(&s.state)).count()
    };
    let applied = count(|s| matches!(s, MigrationState::Applied { .. }));
    let pending = count(|s| matches!(s, MigrationState::Pending));
    let missing = count(|s| matches!(s, MigrationState::Missing { .. }));

    let mut line = format!("{} applied, {} pending", applied, pending);
    if missing > 0 {
        line.push_str(&format!(", {} missing", missing));
    }
    line
}
