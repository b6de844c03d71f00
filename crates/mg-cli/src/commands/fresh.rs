//! Fresh command implementation - wipes the database and migrates from scratch

use anyhow::Result;

use crate::cli::{FreshArgs, GlobalArgs};
use crate::commands::common::{
    create_migrator, load_project, nothing_to_do_is_ok, print_migrate_report,
};

/// Execute the fresh command
pub(crate) async fn execute(args: &FreshArgs, global: &GlobalArgs) -> Result<()> {
    let Some(project) = load_project(global)? else {
        return Ok(());
    };

    if !args.force {
        anyhow::bail!(
            "`mg fresh` drops every table, view and sequence in the {} database '{}'. \
             Re-run with --force to confirm.",
            project.config.database.driver,
            project.config.database.database
        );
    }

    let migrator = create_migrator(&project).await?;
    if let Some(report) = nothing_to_do_is_ok(migrator.fresh().await, "Fresh migration failed")? {
        print_migrate_report(&report);
    }
    Ok(())
}
