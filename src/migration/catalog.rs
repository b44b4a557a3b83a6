use super::file::MigrationFile;
use super::fs::MigrationFs;
use crate::error::MigrationError;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Timestamp-ordered collection of parsed migration files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    files: Vec<MigrationFile>,
}

impl Catalog {
    /// Sort `files` by timestamp. The sort is stable, so files sharing a
    /// timestamp keep the order they were given in.
    pub fn new(mut files: Vec<MigrationFile>) -> Self {
        files.sort_by_key(MigrationFile::timestamp);
        Self { files }
    }

    /// Read every `*.<extension>` file under `root`. Files with a malformed
    /// name are skipped; listing or read failures abort the whole load.
    pub fn load(
        fs: &dyn MigrationFs,
        root: &Path,
        extension: &str,
    ) -> Result<Self, MigrationError> {
        let mut paths = fs
            .lookup(root, extension)
            .map_err(|source| MigrationError::Lookup {
                root: root.to_path_buf(),
                source,
            })?;
        // Listing order is filesystem dependent
        paths.sort();

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let content = fs.read(&path).map_err(|source| MigrationError::Io {
                path: path.clone(),
                source,
            })?;

            match MigrationFile::parse(&path, &content) {
                Some(file) => files.push(file),
                None => warn!("Skipping {}: not a migration filename", path.display()),
            }
        }

        debug!(
            "Loaded {} migration files from {}",
            files.len(),
            root.display()
        );
        Ok(Self::new(files))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Files in apply order (ascending timestamp)
    pub fn forward(&self) -> impl DoubleEndedIterator<Item = &MigrationFile> {
        self.files.iter()
    }

    /// Files in rollback order: exactly the reverse of [`Catalog::forward`]
    pub fn reverse(&self) -> impl Iterator<Item = &MigrationFile> {
        self.files.iter().rev()
    }

    pub fn files(&self) -> &[MigrationFile] {
        &self.files
    }

    /// Files that survive the name filters, in forward order.
    ///
    /// A file is dropped when its name is empty, when `only` is non-empty and
    /// does not list it, or when `exclude` lists it.
    pub fn filter(&self, only: &HashSet<String>, exclude: &HashSet<String>) -> Vec<&MigrationFile> {
        self.files
            .iter()
            .filter(|file| {
                let name = file.name();
                !name.is_empty()
                    && (only.is_empty() || only.contains(name))
                    && !exclude.contains(name)
            })
            .collect()
    }
}
