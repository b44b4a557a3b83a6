use sqlstage::{MemorySource, MigrationSource, Migrator, MigratorBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Temporary migrations directory
pub struct TestProject {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl TestProject {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("migrations");
        fs::create_dir_all(&root).expect("Failed to create migrations directory");
        Self { temp_dir, root }
    }

    /// Write `content` to `relative` under the migrations root, creating
    /// parent directories as needed
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create directory");
        }
        fs::write(&path, content).expect("Failed to write migration file");
        path
    }

    /// Write `<timestamp>-<slug>.sql` for a logical name such as "create users"
    pub fn migration(&self, timestamp: i64, name: &str, content: &str) -> PathBuf {
        let file_name = format!("{}-{}.sql", timestamp, name.replace(' ', "-"));
        self.write(&file_name, content)
    }

    pub fn remove(&self, relative: &str) {
        fs::remove_file(self.root.join(relative)).expect("Failed to remove migration file");
    }

    pub fn builder(&self, source: &MemorySource) -> MigratorBuilder {
        let source: Arc<dyn MigrationSource> = Arc::new(source.clone());
        Migrator::builder(source).root(&self.root)
    }

    /// Migrator over `source` with the ledger table already created
    pub async fn migrator(&self, source: &MemorySource) -> Migrator {
        let migrator = self
            .builder(source)
            .build()
            .await
            .expect("Failed to build migrator");
        migrator
            .initialize()
            .await
            .expect("Failed to initialize ledger");
        migrator
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// File body with one up/down pair per `(stage, up, down)`
pub fn staged(sections: &[(&str, &str, &str)]) -> String {
    let mut content = String::new();
    for (stage, up, down) in sections {
        content.push_str(&format!("-- {{ up: {} }}\n{}\n", stage, up));
        content.push_str(&format!("-- {{ down: {} }}\n{}\n", stage, down));
    }
    content
}

/// Single `main` stage body
pub fn main_stage(up: &str, down: &str) -> String {
    staged(&[("main", up, down)])
}

/// Ledger keys for `names` on one stage, in the given order
pub fn keys(stage: &str, names: &[&str]) -> Vec<(String, String)> {
    names
        .iter()
        .map(|name| (name.to_string(), stage.to_string()))
        .collect()
}
