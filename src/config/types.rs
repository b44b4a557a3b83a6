use clap::Args;
use serde::{Deserialize, Serialize};

/// Raw configuration input - all fields Optional for merging
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigInput {
    pub database: Option<DatabaseInput>,
    pub migrations: Option<MigrationsInput>,
    pub cli: Option<CliInput>,
}

/// Resolved configuration with all defaults applied
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub database: Database,
    pub migrations: Migrations,
    pub cli: Cli,
}

// Database configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatabaseInput {
    pub url: Option<String>,
    pub ledger_table: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Database {
    /// `None` until a URL is given in the file, on the command line or in `DATABASE_URL`
    pub url: Option<String>,
    pub ledger_table: String,
}

// Migration file configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MigrationsInput {
    pub root: Option<String>,
    pub extension: Option<String>,
    pub dev: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct Migrations {
    pub root: String,
    pub extension: String,
    /// Reload migration files before every command
    pub dev: bool,
}

// Command defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliInput {
    pub stages: Option<Vec<String>>,
    pub refresh_stages: Option<Vec<String>>,
    pub only: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub allow_new: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct Cli {
    pub stages: Vec<String>,
    pub refresh_stages: Vec<String>,
    pub only: Vec<String>,
    pub exclude: Vec<String>,
    pub allow_new: bool,
}

// CLI argument groups shared by the migration commands
#[derive(Debug, Clone, Default, Args)]
pub struct DatabaseArgs {
    #[arg(long, help = "Database URL (postgres:// or mysql://)")]
    pub database_url: Option<String>,

    #[arg(long, help = "Ledger table name")]
    pub ledger_table: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct MigrationsArgs {
    #[arg(long, help = "Migrations directory path")]
    pub migrations_dir: Option<String>,

    #[arg(long, help = "Migration file extension")]
    pub extension: Option<String>,

    #[arg(long, help = "Reload migration files before running")]
    pub dev: bool,
}

// Conversion functions from CLI args to config input
impl From<DatabaseArgs> for DatabaseInput {
    fn from(args: DatabaseArgs) -> Self {
        Self {
            url: args.database_url,
            ledger_table: args.ledger_table,
        }
    }
}

impl From<MigrationsArgs> for MigrationsInput {
    fn from(args: MigrationsArgs) -> Self {
        Self {
            root: args.migrations_dir,
            extension: args.extension,
            // Absent flag leaves the file setting alone
            dev: if args.dev { Some(true) } else { None },
        }
    }
}
