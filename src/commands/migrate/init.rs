use crate::migrator::Migrator;
use anyhow::Result;
use console::style;

pub async fn cmd_migrate_init(migrator: &Migrator) -> Result<()> {
    migrator.initialize().await?;

    let files = migrator.files().await;
    println!(
        "{} Ledger table '{}' is ready ({} migration files under {})",
        style("✓").green(),
        migrator.ledger_table(),
        files.len(),
        migrator.root().display()
    );
    Ok(())
}
