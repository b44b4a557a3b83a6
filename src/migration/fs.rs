use glob::Pattern;
use std::io;
use std::path::{Path, PathBuf};

/// Lists and reads migration files. Swappable so callers can serve
/// migrations from somewhere other than the local disk.
pub trait MigrationFs: Send + Sync {
    /// Every file under `root` (recursively) whose extension is `extension`
    fn lookup(&self, root: &Path, extension: &str) -> io::Result<Vec<PathBuf>>;

    fn read(&self, path: &Path) -> io::Result<String>;
}

/// Local filesystem access through `glob`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl MigrationFs for LocalFs {
    fn lookup(&self, root: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
        let root_str = root.to_string_lossy();
        let pattern = format!(
            "{}/**/*.{}",
            Pattern::escape(root_str.trim_end_matches('/')),
            Pattern::escape(extension)
        );

        let entries =
            glob::glob(&pattern).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(io::Error::from)?;
            if path.is_file() {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    /// Fails with `InvalidData` on non-UTF-8 content
    fn read(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}
