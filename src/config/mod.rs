pub mod builder;
pub mod defaults;
pub mod merge;
pub mod types;


pub use builder::ConfigBuilder;
pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Main configuration loading function. A missing file yields an empty input.
pub fn load_config(config_file: &str) -> Result<(ConfigInput, PathBuf)> {
    let config_dir = Path::new(config_file)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    let config_input = if Path::new(config_file).exists() {
        let contents = std::fs::read_to_string(config_file)
            .with_context(|| format!("Failed to read {}", config_file))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", config_file))?
    } else {
        ConfigInput::default()
    };

    Ok((config_input, config_dir))
}

impl Config {
    /// Migrations directory; relative paths are taken from the config file's directory
    pub fn migrations_root(&self, config_dir: &Path) -> PathBuf {
        let root = Path::new(&self.migrations.root);
        if root.is_absolute() {
            root.to_path_buf()
        } else {
            config_dir.join(root)
        }
    }
}
