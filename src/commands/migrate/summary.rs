use crate::migration_tracking::Summary;
use crate::migrator::Migrator;
use crate::output::render_summary;
use anyhow::Result;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SummaryFormat {
    #[default]
    Human,
    Json,
}

pub fn format_summary(summary: &Summary, format: SummaryFormat) -> Result<String> {
    match format {
        SummaryFormat::Human => Ok(render_summary(summary)),
        SummaryFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(summary)?)),
    }
}

pub async fn cmd_migrate_summary(
    migrator: &Migrator,
    stage: Option<&str>,
    format: SummaryFormat,
) -> Result<Summary> {
    migrator.initialize().await?;

    let summary = match stage {
        Some(stage) => migrator.stage_summary(stage).await?,
        None => migrator.summary().await?,
    };

    print!("{}", format_summary(&summary, format)?);
    Ok(summary)
}
