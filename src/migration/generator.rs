use super::parsing::slugify;
use crate::constants::DEFAULT_STAGE;
use anyhow::{Result, bail};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Scaffold body with an empty up/down pair for each stage
pub fn scaffold_content<S: AsRef<str>>(stages: &[S]) -> String {
    let mut content = String::new();
    let stages: Vec<&str> = if stages.is_empty() {
        vec![DEFAULT_STAGE]
    } else {
        stages.iter().map(|s| s.as_ref()).collect()
    };

    for stage in stages {
        // Writing to a String cannot fail
        let _ = write!(content, "-- {{ up: {stage} }}\n\n-- {{ down: {stage} }}\n\n");
    }
    content
}

/// Write a new, empty migration named `<unix seconds>-<slug>.<extension>` under `root`
pub fn create_migration_file<S: AsRef<str>>(
    root: &Path,
    name: &str,
    extension: &str,
    stages: &[S],
) -> Result<PathBuf> {
    if root.as_os_str().is_empty() {
        bail!("Migration root cannot be empty");
    }
    if name.trim().is_empty() {
        bail!("Migration name cannot be empty");
    }

    let extension = extension.trim_start_matches('.');
    if extension.is_empty() {
        bail!("Migration extension cannot be empty");
    }

    let slug = slugify(name);
    if slug.is_empty() {
        bail!(
            "Migration name '{}' must contain at least one ASCII letter or digit",
            name
        );
    }

    if let Some(stage) = stages.iter().map(AsRef::as_ref).find(|s| !is_valid_stage(s)) {
        bail!(
            "Invalid stage '{}': use letters, digits, underscores and spaces",
            stage
        );
    }

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("System time is before Unix epoch: {}", e))?
        .as_secs();

    std::fs::create_dir_all(root)?;
    let path = root.join(format!("{}-{}.{}", timestamp, slug, extension));
    if path.exists() {
        bail!("Migration file {} already exists", path.display());
    }

    std::fs::write(&path, scaffold_content(stages))?;
    debug!("Wrote migration scaffold {}", path.display());
    Ok(path)
}

/// Stage labels must survive a round trip through the tag parser
fn is_valid_stage(stage: &str) -> bool {
    !stage.trim().is_empty()
        && stage
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ')
}
