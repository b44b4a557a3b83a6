use crate::helpers::project::{TestProject, keys, main_stage};
use async_trait::async_trait;
use sqlstage::{
    MemorySource, MigrationError, MigrationOptions, MigrationSource, Phase, Row, SourceError,
    SourceTransaction,
};
use std::sync::Arc;
use std::time::Duration;

fn all() -> MigrationOptions {
    MigrationOptions::default()
}

#[tokio::test]
async fn test_failed_up_rolls_back_the_whole_call() {
    let project = TestProject::new();
    project.migration(10, "a", &main_stage("CREATE TABLE a (id INT);", "DROP TABLE a;"));
    project.migration(20, "b", &main_stage("CREATE TABLE b (id INT); BROKEN", "DROP TABLE b;"));
    project.migration(30, "c", &main_stage("CREATE TABLE c (id INT);", "DROP TABLE c;"));
    let source = MemorySource::new().failing_on("BROKEN");
    let migrator = project.migrator(&source).await;

    let err = migrator.up(&["main"], &all()).await.unwrap_err();
    match &err {
        MigrationError::Execution {
            name, stage, phase, ..
        } => {
            assert_eq!(name, "b");
            assert_eq!(stage, "main");
            assert_eq!(*phase, Phase::Apply);
        }
        other => panic!("expected execution error, got {other:?}"),
    }
    assert!(err.to_string().contains("'b'"));

    assert!(source.ledger().await.is_empty());
    assert!(source.scripts().await.is_empty());
}

#[tokio::test]
async fn test_failed_refresh_leaves_ledger_untouched() {
    let project = TestProject::new();
    project.migration(10, "a", &main_stage("CREATE TABLE a (id INT);", "DROP TABLE a;"));
    let b = project.migration(20, "b", &main_stage("CREATE TABLE b (id INT);", "DROP TABLE b;"));
    let source = MemorySource::new().failing_on("BROKEN");
    let migrator = project
        .builder(&source)
        .dev(true)
        .build()
        .await
        .unwrap();
    migrator.initialize().await.unwrap();
    migrator.up(&["main"], &all()).await.unwrap();
    let before = source.ledger().await;
    let scripts_before = source.scripts().await;

    // The second file's up script now fails after both down scripts ran
    std::fs::write(&b, main_stage("CREATE TABLE b (id INT); BROKEN", "DROP TABLE b;")).unwrap();

    let err = migrator.refresh(&["main"], &all()).await.unwrap_err();
    assert!(matches!(
        err,
        MigrationError::Execution { ref name, phase: Phase::Apply, .. } if name == "b"
    ));

    assert_eq!(source.ledger().await, before);
    assert_eq!(source.scripts().await, scripts_before);
    assert_eq!(before, keys("main", &["a", "b"]));
}

#[tokio::test]
async fn test_failed_down_reports_rollback_phase() {
    let project = TestProject::new();
    project.migration(10, "a", &main_stage("CREATE TABLE a (id INT);", "DROP TABLE a; BROKEN"));
    project.migration(20, "b", &main_stage("CREATE TABLE b (id INT);", "DROP TABLE b;"));
    let source = MemorySource::new().failing_on("BROKEN");
    let migrator = project.migrator(&source).await;
    migrator.up(&["main"], &all()).await.unwrap();

    let err = migrator.down(&["main"], &all()).await.unwrap_err();
    assert!(matches!(
        err,
        MigrationError::Execution { ref name, phase: Phase::Rollback, .. } if name == "a"
    ));
    // b was rolled back first but the transaction discarded it
    assert_eq!(source.ledger().await, keys("main", &["a", "b"]));
}

#[tokio::test]
async fn test_transaction_timeout() {
    let project = TestProject::new();
    project.migration(10, "slow", &main_stage("SELECT pg_sleep(1);", ""));
    let source = MemorySource::new().with_latency(Duration::from_millis(500));
    let migrator = project
        .builder(&source)
        .transaction_timeout(Duration::from_millis(50))
        .build()
        .await
        .unwrap();
    migrator.initialize().await.unwrap();

    let err = migrator.up(&["main"], &all()).await.unwrap_err();
    assert!(matches!(
        err,
        MigrationError::Timeout {
            operation: "up",
            ..
        }
    ));

    // The abandoned transaction was dropped and its changes discarded
    assert!(source.ledger().await.is_empty());
    assert!(source.scripts().await.is_empty());
}

#[tokio::test]
async fn test_zero_timeout_is_rejected() {
    let project = TestProject::new();
    let source = MemorySource::new();

    let result = project
        .builder(&source)
        .ledger_timeout(Duration::ZERO)
        .build()
        .await;
    assert!(matches!(result, Err(MigrationError::InvalidOption(_))));
}

#[tokio::test]
async fn test_invalid_ledger_table_is_rejected() {
    let project = TestProject::new();
    let source = MemorySource::new();

    let result = project
        .builder(&source)
        .ledger_table("migrations; DROP TABLE users")
        .build()
        .await;
    assert!(matches!(result, Err(MigrationError::InvalidOption(_))));
}

#[tokio::test]
async fn test_up_before_initialize_fails() {
    let project = TestProject::new();
    project.migration(10, "a", &main_stage("CREATE TABLE a (id INT);", ""));
    let source = MemorySource::new();
    let migrator = project.builder(&source).build().await.unwrap();

    assert!(migrator.up(&["main"], &all()).await.is_err());
    assert!(!source.has_ledger_table().await);
}

/// Source whose ledger reads never see committed rows, as when another
/// process applies the same migration between our read and our insert
struct StaleReads(MemorySource);

#[async_trait]
impl MigrationSource for StaleReads {
    fn backend(&self) -> &'static str {
        "stale"
    }

    fn placeholder(&self, position: usize) -> String {
        self.0.placeholder(position)
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.0.quote_identifier(ident)
    }

    async fn exec(&self, sql: &str, args: &[&str]) -> Result<(), SourceError> {
        self.0.exec(sql, args).await
    }

    async fn scan(&self, _sql: &str, _args: &[&str]) -> Result<Vec<Row>, SourceError> {
        Ok(Vec::new())
    }

    async fn begin(&self) -> Result<Box<dyn SourceTransaction>, SourceError> {
        self.0.begin().await
    }
}

#[tokio::test]
async fn test_duplicate_ledger_row_surfaces_constraint_violation() {
    let project = TestProject::new();
    project.migration(10, "a", &main_stage("CREATE TABLE a (id INT);", ""));
    let memory = MemorySource::new();
    let migrator = sqlstage::Migrator::builder(Arc::new(StaleReads(memory.clone())))
        .root(&project.root)
        .build()
        .await
        .unwrap();
    migrator.initialize().await.unwrap();

    migrator.up(&["main"], &all()).await.unwrap();
    let err = migrator.up(&["main"], &all()).await.unwrap_err();

    assert!(err.is_constraint_violation());
    assert!(matches!(err, MigrationError::Execution { phase: Phase::Apply, .. }));
    assert_eq!(memory.ledger().await, keys("main", &["a"]));
    assert_eq!(memory.scripts().await.len(), 1);
}
