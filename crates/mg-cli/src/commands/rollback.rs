//! Rollback command implementation - reverts the most recent batch

use anyhow::Result;
use mg_core::MigrationName;

use crate::cli::GlobalArgs;
use crate::commands::common::{create_migrator, load_project, nothing_to_do_is_ok};

/// Execute the rollback command
pub(crate) async fn execute(global: &GlobalArgs) -> Result<()> {
    let Some(project) = load_project(global)? else {
        return Ok(());
    };
    let migrator = create_migrator(&project).await?;

    let Some(report) = nothing_to_do_is_ok(migrator.rollback().await, "Rollback failed")? else {
        return Ok(());
    };

    let Some(batch) = report.batch else {
        println!("Nothing to roll back");
        return Ok(());
    };

    if report.is_empty() {
        println!("Batch {} has no migration files left to roll back", batch);
    } else {
        println!(
            "Rolled back batch {}: {} migration(s)",
            batch,
            report.rolled_back.len()
        );
        for name in &report.rolled_back {
            println!("  {}", name);
        }
    }

    if !report.skipped.is_empty() {
        let ledger = migrator.ledger();
        for line in skipped_hint(batch, &report.skipped, ledger.table()) {
            println!("{}", line);
        }
    }
    Ok(())
}

/// Tell the operator how to clear ledger entries whose files are gone.
///
/// They keep `batch` current, so every later rollback stops here until
/// the files are restored or the rows deleted.
fn skipped_hint(batch: i64, skipped: &[MigrationName], table: &str) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        format!(
            "{} ledger entr{} in batch {} have no migration file and were left in place:",
            skipped.len(),
            if skipped.len() == 1 { "y" } else { "ies" },
            batch
        ),
    ];
    lines.extend(skipped.iter().map(|name| format!("  {}", name)));
    lines.push(format!(
        "Restore the file(s), or delete the rows to roll back further:\n  \
         DELETE FROM {} WHERE batch = {};",
        table, batch
    ));
    lines
}
