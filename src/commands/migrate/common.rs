use crate::config::Config;
use crate::db::{mask_url_password, open_source};
use crate::migrator::Migrator;
use crate::source::MigrationSource;
use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Connect to the configured database and build a migrator over it
pub async fn connect_migrator(config: &Config, config_dir: &Path) -> Result<Migrator> {
    let url = config.database.url.as_deref().ok_or_else(|| {
        anyhow!(
            "No database URL configured: set database.url in the config file, pass --database-url or export DATABASE_URL"
        )
    })?;

    debug!("Connecting to {}", mask_url_password(url));
    let source = open_source(url).await?;
    build_migrator(config, config_dir, source).await
}

/// Build a migrator over an already opened source
pub async fn build_migrator(
    config: &Config,
    config_dir: &Path,
    source: Arc<dyn MigrationSource>,
) -> Result<Migrator> {
    let root = config.migrations_root(config_dir);

    Migrator::builder(source)
        .root(&root)
        .extension(&config.migrations.extension)
        .dev(config.migrations.dev)
        .ledger_table(&config.database.ledger_table)
        .build()
        .await
        .with_context(|| format!("Failed to load migrations from {}", root.display()))
}
