//! Staged SQL migrations.
//!
//! Migration files carry up and down scripts per stage. A [`Migrator`] loads
//! them from a directory tree, records what has run in a ledger table and
//! applies or rolls back one stage set per transaction.

pub mod commands;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod migration;
pub mod migration_tracking;
pub mod migrator;
pub mod output;
pub mod prompts;
pub mod source;

pub use error::{MigrationError, Phase};
pub use migration::{Catalog, Direction, LocalFs, MigrationFile, MigrationFs};
pub use migration_tracking::{Migrated, Summary};
pub use migrator::{MigrationOptions, MigrationReport, MigrationResult, Migrator, MigratorBuilder};
pub use source::{
    MemorySource, MigrationSource, MySqlSource, PostgresSource, Row, SourceError,
    SourceTransaction, SqlExecutor, Value,
};
