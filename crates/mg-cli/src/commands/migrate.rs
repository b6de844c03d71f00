//! Migrate command implementation - applies pending migrations

use anyhow::Result;

use crate::cli::GlobalArgs;
use crate::commands::common::{
    create_migrator, load_project, nothing_to_do_is_ok, print_migrate_report,
};

/// Execute the migrate command
pub(crate) async fn execute(global: &GlobalArgs) -> Result<()> {
    let Some(project) = load_project(global)? else {
        return Ok(());
    };
    let migrator = create_migrator(&project).await?;

    if let Some(report) = nothing_to_do_is_ok(migrator.migrate().await, "Migration failed")? {
        print_migrate_report(&report);
    }
    Ok(())
}
