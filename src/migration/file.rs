use super::parsing::parse_migration_path;
use super::section_parser::{Direction, StageScripts, parse_stage_scripts};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// One parsed migration file. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    path: PathBuf,
    timestamp: i64,
    name: String,
    extension: String,
    up_scripts: HashMap<String, String>,
    down_scripts: HashMap<String, String>,
}

impl MigrationFile {
    /// Build a migration from its path and content.
    ///
    /// Returns `None` when the filename is not `<timestamp>-<slug>.<ext>`;
    /// such files are skipped by the catalog rather than reported.
    pub fn parse(path: &Path, content: &str) -> Option<Self> {
        let parsed = parse_migration_path(path)?;
        let StageScripts { up, down } = parse_stage_scripts(content);

        Some(Self {
            path: path.to_path_buf(),
            timestamp: parsed.timestamp,
            name: parsed.name,
            extension: parsed.extension,
            up_scripts: up,
            down_scripts: down,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Up script for `stage`, if the file defines one
    pub fn up_script(&self, stage: &str) -> Option<&str> {
        self.up_scripts.get(stage).map(String::as_str)
    }

    /// Down script for `stage`, if the file defines one
    pub fn down_script(&self, stage: &str) -> Option<&str> {
        self.down_scripts.get(stage).map(String::as_str)
    }

    pub fn script(&self, direction: Direction, stage: &str) -> Option<&str> {
        match direction {
            Direction::Up => self.up_script(stage),
            Direction::Down => self.down_script(stage),
        }
    }

    /// True when the up script for `stage` exists and is not empty
    pub fn applies_to(&self, stage: &str) -> bool {
        self.up_script(stage).is_some_and(|s| !s.is_empty())
    }

    /// Every stage mentioned by an up or down section, sorted
    pub fn stages(&self) -> BTreeSet<&str> {
        self.up_scripts
            .keys()
            .chain(self.down_scripts.keys())
            .map(String::as_str)
            .collect()
    }
}
