//! Staged migration engine.
//!
//! A [`Migrator`] owns the parsed catalog behind a read-write lock and runs
//! every up/down/refresh call inside a single database transaction. The
//! ledger decides what has been applied; the catalog only supplies scripts.

pub mod options;
pub mod result;

pub use options::MigrationOptions;
pub use result::{MigrationReport, MigrationResult};

use crate::constants::{
    DEFAULT_EXTENSION, DEFAULT_LEDGER_TABLE, DEFAULT_ROOT, LEDGER_TIMEOUT, TRANSACTION_TIMEOUT,
};
use crate::error::MigrationError;
use crate::migration::{Catalog, Direction, LocalFs, MigrationFile, MigrationFs};
use crate::migration_tracking::{Ledger, Summary};
use crate::source::{MigrationSource, SourceTransaction, Unscoped};
use itertools::Itertools;
use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Up,
    Down,
    Refresh,
}

impl Operation {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Refresh => "refresh",
        }
    }

    fn rolls_back(&self) -> bool {
        matches!(self, Self::Down | Self::Refresh)
    }

    fn applies(&self) -> bool {
        matches!(self, Self::Up | Self::Refresh)
    }
}

/// Applied (name, stage) pairs as seen by the running call
type AppliedSet = HashSet<(String, String)>;

fn key(name: &str, stage: &str) -> (String, String) {
    (name.to_string(), stage.to_string())
}

async fn with_deadline<T, F>(
    operation: &'static str,
    after: Duration,
    future: F,
) -> Result<T, MigrationError>
where
    F: Future<Output = Result<T, MigrationError>>,
{
    match tokio::time::timeout(after, future).await {
        Ok(result) => result,
        Err(_) => {
            warn!("{} did not finish within {:?}", operation, after);
            Err(MigrationError::Timeout { operation, after })
        }
    }
}

/// Chained configuration for a [`Migrator`]. Later calls win; anything left
/// unset keeps its default.
pub struct MigratorBuilder {
    source: Arc<dyn MigrationSource>,
    fs: Arc<dyn MigrationFs>,
    root: PathBuf,
    extension: String,
    dev: bool,
    ledger_table: String,
    ledger_timeout: Duration,
    transaction_timeout: Duration,
}

impl MigratorBuilder {
    fn new(source: Arc<dyn MigrationSource>) -> Self {
        Self {
            source,
            fs: Arc::new(LocalFs),
            root: PathBuf::from(DEFAULT_ROOT),
            extension: DEFAULT_EXTENSION.to_string(),
            dev: false,
            ledger_table: DEFAULT_LEDGER_TABLE.to_string(),
            ledger_timeout: LEDGER_TIMEOUT,
            transaction_timeout: TRANSACTION_TIMEOUT,
        }
    }

    /// Directory searched recursively for migration files. Empty means `.`
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.root = if root.as_os_str().is_empty() {
            PathBuf::from(DEFAULT_ROOT)
        } else {
            root
        };
        self
    }

    /// File extension, with or without the leading dot. Empty is ignored.
    pub fn extension(mut self, extension: &str) -> Self {
        let extension = extension.trim_start_matches('.');
        if !extension.is_empty() {
            self.extension = extension.to_string();
        }
        self
    }

    /// Reload the catalog from disk before every up/down/refresh
    pub fn dev(mut self, dev: bool) -> Self {
        self.dev = dev;
        self
    }

    pub fn filesystem(mut self, fs: Arc<dyn MigrationFs>) -> Self {
        self.fs = fs;
        self
    }

    pub fn ledger_table(mut self, table: &str) -> Self {
        self.ledger_table = table.to_string();
        self
    }

    pub fn ledger_timeout(mut self, timeout: Duration) -> Self {
        self.ledger_timeout = timeout;
        self
    }

    pub fn transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }

    /// Validate the settings and load the catalog once
    pub async fn build(self) -> Result<Migrator, MigrationError> {
        if self.ledger_timeout.is_zero() || self.transaction_timeout.is_zero() {
            return Err(MigrationError::InvalidOption(
                "timeouts must be greater than zero".to_string(),
            ));
        }

        let ledger = Ledger::new(&self.ledger_table, self.source.as_ref())?;
        let migrator = Migrator {
            source: self.source,
            fs: self.fs,
            ledger,
            root: self.root,
            extension: self.extension,
            dev: self.dev,
            ledger_timeout: self.ledger_timeout,
            transaction_timeout: self.transaction_timeout,
            catalog: RwLock::new(Catalog::default()),
        };
        migrator.load().await?;
        Ok(migrator)
    }
}

/// Applies and rolls back staged migrations against one source
pub struct Migrator {
    source: Arc<dyn MigrationSource>,
    fs: Arc<dyn MigrationFs>,
    ledger: Ledger,
    root: PathBuf,
    extension: String,
    dev: bool,
    ledger_timeout: Duration,
    transaction_timeout: Duration,
    catalog: RwLock<Catalog>,
}

impl Migrator {
    pub fn builder(source: Arc<dyn MigrationSource>) -> MigratorBuilder {
        MigratorBuilder::new(source)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn is_dev(&self) -> bool {
        self.dev
    }

    pub fn ledger_table(&self) -> &str {
        self.ledger.table()
    }

    pub fn source(&self) -> &Arc<dyn MigrationSource> {
        &self.source
    }

    /// Snapshot of the cached catalog in forward order
    pub async fn files(&self) -> Vec<MigrationFile> {
        self.catalog.read().await.files().to_vec()
    }

    /// Re-read migration files. The cached catalog is only replaced when the
    /// whole load succeeds.
    pub async fn load(&self) -> Result<(), MigrationError> {
        let catalog = Catalog::load(self.fs.as_ref(), &self.root, &self.extension)?;
        let count = catalog.len();

        *self.catalog.write().await = catalog;
        debug!("Catalog holds {} migration files", count);
        Ok(())
    }

    /// Create the ledger table if needed. Safe to call on every start-up.
    pub async fn initialize(&self) -> Result<(), MigrationError> {
        with_deadline("initialize", self.ledger_timeout, async {
            let mut exec = Unscoped(self.source.as_ref());
            self.ledger.initialize(&mut exec).await?;
            debug!("Ledger table {} is ready", self.ledger.table());
            Ok::<(), MigrationError>(())
        })
        .await
    }

    /// Every ledger row ordered by apply time
    pub async fn summary(&self) -> Result<Summary, MigrationError> {
        with_deadline("summary", self.ledger_timeout, async {
            let mut exec = Unscoped(self.source.as_ref());
            let summary = self.ledger.summary(&mut exec).await?;
            Ok::<Summary, MigrationError>(summary)
        })
        .await
    }

    pub async fn stage_summary(&self, stage: &str) -> Result<Summary, MigrationError> {
        Ok(self.summary().await?.for_stage(stage))
    }

    /// Apply pending migrations for each stage, oldest file first
    pub async fn up<S: AsRef<str>>(
        &self,
        stages: &[S],
        options: &MigrationOptions,
    ) -> Result<MigrationReport, MigrationError> {
        self.run(Operation::Up, stages, options).await
    }

    /// Roll back applied migrations for each stage, newest file first
    pub async fn down<S: AsRef<str>>(
        &self,
        stages: &[S],
        options: &MigrationOptions,
    ) -> Result<MigrationReport, MigrationError> {
        self.run(Operation::Down, stages, options).await
    }

    /// Roll back then re-apply each stage, all or nothing
    pub async fn refresh<S: AsRef<str>>(
        &self,
        stages: &[S],
        options: &MigrationOptions,
    ) -> Result<MigrationReport, MigrationError> {
        self.run(Operation::Refresh, stages, options).await
    }

    async fn run<S: AsRef<str>>(
        &self,
        operation: Operation,
        stages: &[S],
        options: &MigrationOptions,
    ) -> Result<MigrationReport, MigrationError> {
        if self.dev {
            self.load().await?;
        }

        // Held until the transaction finishes so a reload cannot swap scripts mid-call
        let catalog = self.catalog.read().await;
        let snapshot = self.summary().await?;

        let stages: Vec<&str> = stages.iter().map(|s| s.as_ref()).unique().collect();
        let files = catalog.filter(options.only_names(), options.excluded_names());

        if stages.is_empty() || files.is_empty() {
            debug!(
                "Nothing to {}: {} stages, {} files after filtering",
                operation.as_str(),
                stages.len(),
                files.len()
            );
            return Ok(MigrationReport::default());
        }

        let applied: AppliedSet = snapshot
            .into_iter()
            .map(|row| (row.name, row.stage))
            .collect();

        with_deadline(
            operation.as_str(),
            self.transaction_timeout,
            self.execute(operation, &stages, &files, applied),
        )
        .await
    }

    async fn execute(
        &self,
        operation: Operation,
        stages: &[&str],
        files: &[&MigrationFile],
        mut applied: AppliedSet,
    ) -> Result<MigrationReport, MigrationError> {
        let mut tx = self.source.begin().await?;
        let mut report = MigrationReport::default();

        let outcome = self
            .run_stages(
                tx.as_mut(),
                operation,
                stages,
                files,
                &mut applied,
                &mut report,
            )
            .await;

        match outcome {
            Ok(()) => {
                tx.commit().await?;
                debug!(
                    "Committed {} with {} changes",
                    operation.as_str(),
                    report.len()
                );
                Ok(report)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback after failed {} also failed: {}", operation.as_str(), rollback_err);
                }
                Err(err)
            }
        }
    }

    async fn run_stages(
        &self,
        tx: &mut dyn SourceTransaction,
        operation: Operation,
        stages: &[&str],
        files: &[&MigrationFile],
        applied: &mut AppliedSet,
        report: &mut MigrationReport,
    ) -> Result<(), MigrationError> {
        for stage in stages {
            if operation.rolls_back() {
                self.roll_back_stage(&mut *tx, stage, files, applied, report)
                    .await?;
            }
            if operation.applies() {
                self.apply_stage(&mut *tx, stage, files, applied, report)
                    .await?;
            }
        }
        Ok(())
    }

    async fn apply_stage(
        &self,
        tx: &mut dyn SourceTransaction,
        stage: &str,
        files: &[&MigrationFile],
        applied: &mut AppliedSet,
        report: &mut MigrationReport,
    ) -> Result<(), MigrationError> {
        for file in files {
            let name = file.name();
            let pair = key(name, stage);

            if applied.contains(&pair) {
                debug!("{} ({}) already applied, skipping", name, stage);
                continue;
            }
            let Some(script) = file.up_script(stage).filter(|s| !s.is_empty()) else {
                continue;
            };

            let fail = |source| MigrationError::execution(name, stage, Direction::Up, source);
            tx.exec(script, &[]).await.map_err(fail)?;
            self.ledger.record(&mut *tx, name, stage).await.map_err(fail)?;

            info!("Applied {} ({})", name, stage);
            applied.insert(pair);
            report.push(stage, name, Direction::Up);
        }
        Ok(())
    }

    async fn roll_back_stage(
        &self,
        tx: &mut dyn SourceTransaction,
        stage: &str,
        files: &[&MigrationFile],
        applied: &mut AppliedSet,
        report: &mut MigrationReport,
    ) -> Result<(), MigrationError> {
        for file in files.iter().rev() {
            let name = file.name();
            let pair = key(name, stage);

            if !applied.contains(&pair) {
                continue;
            }

            let fail = |source| MigrationError::execution(name, stage, Direction::Down, source);
            match file.down_script(stage).filter(|s| !s.is_empty()) {
                Some(script) => tx.exec(script, &[]).await.map_err(fail)?,
                None => debug!("{} ({}) has no down script, removing ledger row only", name, stage),
            }
            self.ledger.remove(&mut *tx, name, stage).await.map_err(fail)?;

            info!("Rolled back {} ({})", name, stage);
            applied.remove(&pair);
            report.push(stage, name, Direction::Down);
        }
        Ok(())
    }
}
