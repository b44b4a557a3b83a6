use crate::config::{merge::Merge, types::*};
use crate::migration_tracking::validate_ledger_table;
use anyhow::{Result, anyhow};

pub struct ConfigBuilder {
    config_input: ConfigInput,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config_input: ConfigInput::default(),
        }
    }

    pub fn with_file(mut self, file_input: ConfigInput) -> Self {
        self.config_input = self.config_input.merge(file_input);
        self
    }

    pub fn with_cli_args(mut self, cli_input: ConfigInput) -> Self {
        self.config_input = self.config_input.merge(cli_input);
        self
    }

    pub fn resolve(self) -> Result<Config> {
        let defaults = Config::default();

        Ok(Config {
            database: self.resolve_database(&defaults.database)?,
            migrations: self.resolve_migrations(&defaults.migrations)?,
            cli: self.resolve_cli(&defaults.cli),
        })
    }

    fn resolve_database(&self, defaults: &Database) -> Result<Database> {
        let db_input = self.config_input.database.as_ref();

        let url = db_input
            .and_then(|d| d.url.as_ref())
            .cloned()
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .filter(|url| !url.trim().is_empty())
            .or_else(|| defaults.url.clone());

        let ledger_table = db_input
            .and_then(|d| d.ledger_table.as_ref())
            .cloned()
            .unwrap_or_else(|| defaults.ledger_table.clone());
        validate_ledger_table(&ledger_table).map_err(|e| anyhow!("{}", e))?;

        Ok(Database { url, ledger_table })
    }

    fn resolve_migrations(&self, defaults: &Migrations) -> Result<Migrations> {
        let mig_input = self.config_input.migrations.as_ref();

        let root = mig_input
            .and_then(|m| m.root.as_ref())
            .cloned()
            .unwrap_or_else(|| defaults.root.clone());

        let extension = mig_input
            .and_then(|m| m.extension.as_ref())
            .map(|ext| ext.trim_start_matches('.').to_string())
            .unwrap_or_else(|| defaults.extension.clone());
        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(anyhow!(
                "Invalid migration extension '{}': use letters and digits only",
                extension
            ));
        }

        Ok(Migrations {
            root,
            extension,
            dev: mig_input.and_then(|m| m.dev).unwrap_or(defaults.dev),
        })
    }

    fn resolve_cli(&self, defaults: &Cli) -> Cli {
        let cli_input = self.config_input.cli.as_ref();

        Cli {
            stages: cli_input
                .and_then(|c| c.stages.as_ref())
                .cloned()
                .unwrap_or_else(|| defaults.stages.clone()),
            refresh_stages: cli_input
                .and_then(|c| c.refresh_stages.as_ref())
                .cloned()
                .unwrap_or_else(|| defaults.refresh_stages.clone()),
            only: cli_input
                .and_then(|c| c.only.as_ref())
                .cloned()
                .unwrap_or_else(|| defaults.only.clone()),
            exclude: cli_input
                .and_then(|c| c.exclude.as_ref())
                .cloned()
                .unwrap_or_else(|| defaults.exclude.clone()),
            allow_new: cli_input
                .and_then(|c| c.allow_new)
                .unwrap_or(defaults.allow_new),
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
