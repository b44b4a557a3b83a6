use crate::constants::LEDGER_COLUMN_WIDTH;
use crate::error::MigrationError;
use crate::source::{MigrationSource, SourceError, SqlExecutor};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Check that a ledger table name is a plain SQL identifier: a letter or
/// underscore followed by letters, digits, underscores or dollar signs
pub fn validate_ledger_table(name: &str) -> Result<(), MigrationError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_alphabetic() || first == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(MigrationError::InvalidOption(format!(
            "Invalid ledger table name '{}': must contain only letters, numbers, underscores, and dollar signs, starting with letter or underscore",
            name
        )))
    }
}

/// One applied (name, stage) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Migrated {
    pub name: String,
    pub stage: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Ledger rows in the order they were applied
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Summary {
    rows: Vec<Migrated>,
}

impl Summary {
    pub fn new(rows: Vec<Migrated>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Migrated] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &Migrated> {
        self.rows.iter()
    }

    pub fn contains(&self, name: &str, stage: &str) -> bool {
        self.rows
            .iter()
            .any(|row| row.name == name && row.stage == stage)
    }

    /// Distinct migration names in first-applied order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !names.contains(&row.name.as_str()) {
                names.push(&row.name);
            }
        }
        names
    }

    pub fn for_stage(&self, stage: &str) -> Summary {
        Summary::new(
            self.rows
                .iter()
                .filter(|row| row.stage == stage)
                .cloned()
                .collect(),
        )
    }

    /// Rows grouped by stage, stages in order of first appearance
    pub fn group_by_stage(&self) -> Vec<(&str, Vec<&Migrated>)> {
        group_in_order(&self.rows, |row| row.stage.as_str())
    }

    /// Rows grouped by migration name, names in order of first appearance
    pub fn group_by_file(&self) -> Vec<(&str, Vec<&Migrated>)> {
        group_in_order(&self.rows, |row| row.name.as_str())
    }
}

impl IntoIterator for Summary {
    type Item = Migrated;
    type IntoIter = std::vec::IntoIter<Migrated>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// Group items by key without reordering keys or items
fn group_in_order<'a, T>(
    items: &'a [T],
    key: impl Fn(&'a T) -> &'a str,
) -> Vec<(&'a str, Vec<&'a T>)> {
    let mut groups: Vec<(&'a str, Vec<&'a T>)> = Vec::new();
    for item in items {
        let k = key(item);
        match groups.iter_mut().find(|(existing, _)| *existing == k) {
            Some((_, members)) => members.push(item),
            None => groups.push((k, vec![item])),
        }
    }
    groups
}

/// Statements for the ledger table, rendered once for a source's dialect
#[derive(Debug, Clone)]
pub struct Ledger {
    table: String,
    create_sql: String,
    select_sql: String,
    insert_sql: String,
    delete_sql: String,
}

impl Ledger {
    pub fn new(table: &str, source: &dyn MigrationSource) -> Result<Self, MigrationError> {
        validate_ledger_table(table)?;
        let quoted = source.quote_identifier(table);
        let (p1, p2) = (source.placeholder(1), source.placeholder(2));
        let created_at = source.timestamp_column();

        Ok(Self {
            table: table.to_string(),
            create_sql: format!(
                "CREATE TABLE IF NOT EXISTS {quoted} (\
                 name VARCHAR({LEDGER_COLUMN_WIDTH}) NOT NULL, \
                 stage VARCHAR({LEDGER_COLUMN_WIDTH}) NOT NULL, \
                 created_at {created_at}, \
                 PRIMARY KEY (name, stage))"
            ),
            select_sql: format!("SELECT name, stage, created_at FROM {quoted} ORDER BY created_at"),
            insert_sql: format!("INSERT INTO {quoted} (name, stage) VALUES ({p1}, {p2})"),
            delete_sql: format!("DELETE FROM {quoted} WHERE name = {p1} AND stage = {p2}"),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the ledger table if it does not exist yet
    pub async fn initialize<E: SqlExecutor + ?Sized>(&self, exec: &mut E) -> Result<(), SourceError> {
        exec.exec(&self.create_sql, &[]).await
    }

    /// All ledger rows ordered by `created_at`
    pub async fn summary<E: SqlExecutor + ?Sized>(&self, exec: &mut E) -> Result<Summary, SourceError> {
        let rows = exec.scan(&self.select_sql, &[]).await?;

        rows.iter()
            .map(|row| {
                Ok(Migrated {
                    name: row.text(0)?.to_string(),
                    stage: row.text(1)?.to_string(),
                    created_at: row.timestamp(2)?,
                })
            })
            .collect::<Result<Vec<_>, SourceError>>()
            .map(Summary::new)
    }

    pub async fn record<E: SqlExecutor + ?Sized>(
        &self,
        exec: &mut E,
        name: &str,
        stage: &str,
    ) -> Result<(), SourceError> {
        exec.exec(&self.insert_sql, &[name, stage]).await
    }

    pub async fn remove<E: SqlExecutor + ?Sized>(
        &self,
        exec: &mut E,
        name: &str,
        stage: &str,
    ) -> Result<(), SourceError> {
        exec.exec(&self.delete_sql, &[name, stage]).await
    }
}
