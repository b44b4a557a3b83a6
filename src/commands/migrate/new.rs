use crate::config::Config;
use crate::migration::create_migration_file;
use crate::prompts::{prompt_required_string_with_validation, validate_migration_name};
use anyhow::{Result, bail};
use console::style;
use std::path::{Path, PathBuf};

pub fn cmd_migrate_new(
    config: &Config,
    config_dir: &Path,
    name: Option<&str>,
    stages: &[String],
) -> Result<PathBuf> {
    if !config.cli.allow_new {
        bail!("Creating migrations is disabled: set cli.allow_new to true in the config file");
    }

    let name = prompt_required_string_with_validation(
        name,
        "Enter migration name",
        validate_migration_name,
    )?;

    // `tenant/add users` lands in <root>/tenant
    let (subdir, name) = match name.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, name.as_str()),
    };
    let mut root = config.migrations_root(config_dir);
    if let Some(dir) = subdir.filter(|d| !d.is_empty()) {
        root = root.join(dir);
    }

    let stages = if stages.is_empty() {
        config.cli.stages.as_slice()
    } else {
        stages
    };

    let path = create_migration_file(&root, name.trim(), &config.migrations.extension, stages)?;
    println!(
        "{} Created migration: {}",
        style("✓").green(),
        path.display()
    );
    Ok(path)
}
