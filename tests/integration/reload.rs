use crate::helpers::project::{TestProject, keys, main_stage};
use sqlstage::{MemorySource, MigrationError, MigrationFs, MigrationOptions, Migrator};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn all() -> MigrationOptions {
    MigrationOptions::default()
}

#[tokio::test]
async fn test_catalog_is_cached_without_dev_mode() {
    let project = TestProject::new();
    project.migration(10, "a", &main_stage("CREATE TABLE a (id INT);", ""));
    let source = MemorySource::new();
    let migrator = project.migrator(&source).await;

    project.migration(20, "b", &main_stage("CREATE TABLE b (id INT);", ""));
    let report = migrator.up(&["main"], &all()).await.unwrap();
    assert_eq!(report.pairs(), vec![("main", "a")]);

    // An explicit load picks the new file up
    migrator.load().await.unwrap();
    let report = migrator.up(&["main"], &all()).await.unwrap();
    assert_eq!(report.pairs(), vec![("main", "b")]);
}

#[tokio::test]
async fn test_dev_mode_reloads_before_each_call() {
    let project = TestProject::new();
    project.migration(10, "a", &main_stage("CREATE TABLE a (id INT);", ""));
    let source = MemorySource::new();
    let migrator = project.builder(&source).dev(true).build().await.unwrap();
    migrator.initialize().await.unwrap();
    assert!(migrator.is_dev());

    migrator.up(&["main"], &all()).await.unwrap();
    project.migration(20, "b", &main_stage("CREATE TABLE b (id INT);", ""));

    let report = migrator.up(&["main"], &all()).await.unwrap();
    assert_eq!(report.pairs(), vec![("main", "b")]);
    assert_eq!(source.ledger().await, keys("main", &["a", "b"]));
}

#[tokio::test]
async fn test_malformed_and_foreign_files_are_ignored() {
    let project = TestProject::new();
    project.write("migration.sql", &main_stage("CREATE TABLE x (id INT);", ""));
    project.write("10-notes.txt", "not sql");
    project.write("tenant/20-nested.sql", &main_stage("CREATE TABLE n (id INT);", ""));
    let source = MemorySource::new();
    let migrator = project.migrator(&source).await;

    let files = migrator.files().await;
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name(), "nested");
    assert_eq!(files[0].timestamp(), 20);
}

#[tokio::test]
async fn test_extension_setting() {
    let project = TestProject::new();
    project.write("10-a.pgsql", &main_stage("CREATE TABLE a (id INT);", ""));
    project.write("20-b.sql", &main_stage("CREATE TABLE b (id INT);", ""));
    let source = MemorySource::new();
    let migrator = project
        .builder(&source)
        .extension(".pgsql")
        .build()
        .await
        .unwrap();

    assert_eq!(migrator.extension(), "pgsql");
    let names: Vec<String> = migrator
        .files()
        .await
        .iter()
        .map(|f| f.name().to_string())
        .collect();
    assert_eq!(names, vec!["a"]);
}

#[tokio::test]
async fn test_non_utf8_file_fails_the_load() {
    let project = TestProject::new();
    project.migration(10, "a", &main_stage("CREATE TABLE a (id INT);", ""));
    let source = MemorySource::new();
    let migrator = project.migrator(&source).await;

    let latin1 = project.root.join("20-latin1.sql");
    std::fs::write(&latin1, b"-- { up: main }\nINSERT INTO t VALUES ('caf\xe9');\n").unwrap();

    let err = migrator.load().await.unwrap_err();
    match &err {
        MigrationError::Io { path, source } => {
            assert_eq!(path, &latin1);
            assert_eq!(source.kind(), io::ErrorKind::InvalidData);
        }
        other => panic!("expected io error, got {other:?}"),
    }
    assert_eq!(migrator.files().await.len(), 1);

    // A fresh migrator refuses to start on the same tree
    assert!(matches!(
        project.builder(&source).build().await,
        Err(MigrationError::Io { .. })
    ));

    let report = migrator.up(&["main"], &all()).await.unwrap();
    assert_eq!(report.pairs(), vec![("main", "a")]);
    assert_eq!(source.scripts().await, vec!["CREATE TABLE a (id INT);"]);
}

/// Serves files from disk until told to fail
struct FlakyFs {
    root: PathBuf,
    failing: AtomicBool,
}

impl MigrationFs for FlakyFs {
    fn lookup(&self, root: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
        sqlstage::LocalFs.lookup(root, extension)
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        if self.failing.load(Ordering::SeqCst) && path.starts_with(&self.root) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }
        sqlstage::LocalFs.read(path)
    }
}

#[tokio::test]
async fn test_failed_load_keeps_previous_catalog() {
    let project = TestProject::new();
    project.migration(10, "a", &main_stage("CREATE TABLE a (id INT);", ""));
    let fs = Arc::new(FlakyFs {
        root: project.root.clone(),
        failing: AtomicBool::new(false),
    });
    let source = MemorySource::new();
    let migrator = Migrator::builder(Arc::new(source.clone()))
        .root(&project.root)
        .filesystem(fs.clone())
        .build()
        .await
        .unwrap();
    migrator.initialize().await.unwrap();

    project.migration(20, "b", &main_stage("CREATE TABLE b (id INT);", ""));
    fs.failing.store(true, Ordering::SeqCst);

    let err = migrator.load().await.unwrap_err();
    assert!(matches!(err, MigrationError::Io { .. }));
    assert_eq!(migrator.files().await.len(), 1);

    // Engine keeps working off the old catalog
    let report = migrator.up(&["main"], &all()).await.unwrap();
    assert_eq!(report.pairs(), vec![("main", "a")]);
}

#[tokio::test]
async fn test_removed_file_keeps_its_ledger_row() {
    let project = TestProject::new();
    project.migration(10, "a", &main_stage("CREATE TABLE a (id INT);", "DROP TABLE a;"));
    project.migration(20, "b", &main_stage("CREATE TABLE b (id INT);", "DROP TABLE b;"));
    let source = MemorySource::new();
    let migrator = project.migrator(&source).await;
    migrator.up(&["main"], &all()).await.unwrap();

    project.remove("20-b.sql");
    migrator.load().await.unwrap();

    // Only files in the catalog can be rolled back
    let report = migrator.down(&["main"], &all()).await.unwrap();
    assert_eq!(report.pairs(), vec![("main", "a")]);
    assert_eq!(source.ledger().await, keys("main", &["b"]));
}
