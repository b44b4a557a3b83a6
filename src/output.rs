use crate::migration::Direction;
use crate::migration_tracking::Summary;
use crate::migrator::MigrationReport;
use console::style;
use std::fmt::Write as _;
use std::time::Duration;

/// The three ledger-changing commands, for headings and empty-result messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Up,
    Down,
    Refresh,
}

impl CommandKind {
    fn title(&self) -> &'static str {
        match self {
            Self::Up => "Migrate",
            Self::Down => "Rollback",
            Self::Refresh => "Refresh",
        }
    }

    fn nothing_message(&self) -> &'static str {
        match self {
            Self::Up => "nothing to migrate",
            Self::Down => "nothing to roll back",
            Self::Refresh => "nothing to refresh",
        }
    }
}

fn direction_label(direction: Direction) -> console::StyledObject<&'static str> {
    match direction {
        Direction::Up => style("UP:").green(),
        Direction::Down => style("DOWN:").yellow(),
    }
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

/// Human-readable result of an up/down/refresh call, grouped by stage
pub fn render_report(kind: CommandKind, report: &MigrationReport, elapsed: Duration) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", style(format!("{} summary:", kind.title())).bold());

    if report.is_empty() {
        let _ = writeln!(out, "  {}", style(kind.nothing_message()).italic());
        return out;
    }

    for (stage, results) in report.group_by_stage() {
        let _ = writeln!(
            out,
            "{} stage ({}):",
            style(stage.to_uppercase()).bold().underlined(),
            plural(results.len(), "change")
        );
        for result in results {
            let _ = writeln!(out, "    {} {}", direction_label(result.direction), result.name);
        }
    }

    let _ = writeln!(
        out,
        "{} Completed in {}",
        style("✓").green(),
        style(format_duration(elapsed)).green()
    );
    out
}

/// Ledger rows grouped by stage
pub fn render_summary(summary: &Summary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", style("Migration summary:").bold());

    if summary.is_empty() {
        let _ = writeln!(out, "  {}", style("no migrations applied").italic());
        return out;
    }

    for (stage, rows) in summary.group_by_stage() {
        let _ = writeln!(
            out,
            "{} stage ({}):",
            style(stage.to_uppercase()).bold().underlined(),
            plural(rows.len(), "migration")
        );
        for row in rows {
            let applied_at = row
                .created_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(out, "    {}  {}", style(applied_at).dim(), row.name);
        }
    }
    out
}

pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let millis = d.subsec_millis();

    if total_secs == 0 {
        format!("{}ms", millis)
    } else if total_secs < 60 {
        if millis >= 100 {
            format!("{}.{}s", total_secs, millis / 100)
        } else {
            format!("{}s", total_secs)
        }
    } else {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        if secs > 0 {
            format!("{}m{}s", mins, secs)
        } else {
            format!("{}m", mins)
        }
    }
}
