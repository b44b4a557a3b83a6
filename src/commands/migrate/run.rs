use crate::config::Config;
use crate::migrator::{MigrationOptions, MigrationReport, Migrator};
use crate::output::{CommandKind, render_report};
use anyhow::{Result, bail};
use std::time::Instant;
use tracing::info;

/// Stage and file selection for up/down/refresh
#[derive(Debug, Clone, Default)]
pub struct RunSelection {
    pub stages: Vec<String>,
    pub name: Option<String>,
    pub skip: Vec<String>,
}

/// Logical migration name for a name given on the command line; accepts the
/// hyphenated slug form as well
pub fn normalize_name(name: &str) -> String {
    name.trim().replace('-', " ")
}

/// Stages to run: explicit ones first, then the configured defaults
pub fn resolve_stages(kind: CommandKind, selection: &RunSelection, config: &Config) -> Result<Vec<String>> {
    let stages = if !selection.stages.is_empty() {
        selection.stages.clone()
    } else if kind == CommandKind::Refresh {
        config.cli.refresh_stages.clone()
    } else {
        config.cli.stages.clone()
    };

    if stages.is_empty() {
        let key = if kind == CommandKind::Refresh {
            "cli.refresh_stages"
        } else {
            "cli.stages"
        };
        bail!(
            "No stage specified: pass stage names or set {} in the config file",
            key
        );
    }
    Ok(stages)
}

/// `--name` replaces the configured `only` list; `--skip` adds to `exclude`
pub fn resolve_options(selection: &RunSelection, config: &Config) -> MigrationOptions {
    let only: Vec<String> = match &selection.name {
        Some(name) => vec![normalize_name(name)],
        None => config.cli.only.iter().map(|n| normalize_name(n)).collect(),
    };
    let exclude = config
        .cli
        .exclude
        .iter()
        .chain(selection.skip.iter())
        .map(|n| normalize_name(n));

    MigrationOptions::new().only(only).exclude(exclude)
}

pub async fn cmd_migrate_run(
    migrator: &Migrator,
    config: &Config,
    kind: CommandKind,
    selection: &RunSelection,
) -> Result<MigrationReport> {
    let stages = resolve_stages(kind, selection, config)?;
    let options = resolve_options(selection, config);

    migrator.initialize().await?;

    info!("Running {:?} for stages {}", kind, stages.join(", "));
    let started = Instant::now();
    let report = match kind {
        CommandKind::Up => migrator.up(&stages, &options).await?,
        CommandKind::Down => migrator.down(&stages, &options).await?,
        CommandKind::Refresh => migrator.refresh(&stages, &options).await?,
    };

    print!("{}", render_report(kind, &report, started.elapsed()));
    Ok(report)
}
