use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Temporary project directory for running the binary
pub struct CliTestHelper {
    pub temp_dir: TempDir,
    pub project_root: PathBuf,
}

impl CliTestHelper {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let project_root = temp_dir.path().to_path_buf();
        Self {
            temp_dir,
            project_root,
        }
    }

    /// Write `sqlstage.yaml` with the given body
    pub fn write_config(&self, content: &str) {
        fs::write(self.project_root.join("sqlstage.yaml"), content)
            .expect("Failed to write config file");
    }

    pub fn write_migration(&self, file_name: &str, content: &str) {
        let dir = self.project_root.join("migrations");
        fs::create_dir_all(&dir).expect("Failed to create migrations directory");
        fs::write(dir.join(file_name), content).expect("Failed to write migration file");
    }

    /// Migration files relative to `migrations/`, sorted
    pub fn list_migration_files(&self) -> Vec<String> {
        let root = self.project_root.join("migrations");
        let pattern = format!("{}/**/*.sql", root.display());
        let mut files: Vec<String> = glob::glob(&pattern)
            .expect("valid pattern")
            .filter_map(Result::ok)
            .filter_map(|path| {
                path.strip_prefix(&root)
                    .ok()
                    .map(|p| p.to_string_lossy().into_owned())
            })
            .collect();
        files.sort();
        files
    }

    /// Command for the built binary, run from the project root with a
    /// clean database environment
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("sqlstage").expect("binary is built");
        cmd.current_dir(&self.project_root)
            .env_remove("DATABASE_URL")
            .env_remove("RUST_LOG");
        cmd
    }
}

impl Default for CliTestHelper {
    fn default() -> Self {
        Self::new()
    }
}
