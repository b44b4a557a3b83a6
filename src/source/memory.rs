use super::{MigrationSource, Row, SourceError, SourceTransaction, SqlExecutor, Value};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone)]
struct LedgerRow {
    name: String,
    stage: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    ledger_created: bool,
    ledger: Vec<LedgerRow>,
    scripts: Vec<String>,
}

#[derive(Debug)]
struct Settings {
    ledger_table: String,
    fail_marker: Option<String>,
    latency: Duration,
}

/// In-process source that emulates a database holding only the ledger table.
///
/// Ledger statements (create/select/insert/delete on the ledger table) update
/// an in-memory table with a `(name, stage)` primary key. Every other statement
/// is treated as a migration script and appended to a log once committed.
/// Transactions lock the whole state until they finish, so they are serializable.
#[derive(Debug, Clone)]
pub struct MemorySource {
    state: Arc<Mutex<MemoryState>>,
    settings: Arc<Settings>,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            settings: Arc::new(Settings {
                ledger_table: "migrations".to_string(),
                fail_marker: None,
                latency: Duration::ZERO,
            }),
        }
    }

    /// Name of the table treated as the ledger
    pub fn with_ledger_table(self, table: &str) -> Self {
        self.reconfigure(|s| s.ledger_table = table.to_string())
    }

    /// Scripts containing `marker` fail instead of being recorded
    pub fn failing_on(self, marker: &str) -> Self {
        self.reconfigure(|s| s.fail_marker = Some(marker.to_string()))
    }

    /// Delay applied to every script execution
    pub fn with_latency(self, latency: Duration) -> Self {
        self.reconfigure(|s| s.latency = latency)
    }

    fn reconfigure(self, f: impl FnOnce(&mut Settings)) -> Self {
        let mut settings = Settings {
            ledger_table: self.settings.ledger_table.clone(),
            fail_marker: self.settings.fail_marker.clone(),
            latency: self.settings.latency,
        };
        f(&mut settings);
        Self {
            state: self.state,
            settings: Arc::new(settings),
        }
    }

    /// Committed ledger keys in insertion order
    pub async fn ledger(&self) -> Vec<(String, String)> {
        let state = self.state.lock().await;
        state
            .ledger
            .iter()
            .map(|row| (row.name.clone(), row.stage.clone()))
            .collect()
    }

    /// Committed scripts in execution order
    pub async fn scripts(&self) -> Vec<String> {
        self.state.lock().await.scripts.clone()
    }

    pub async fn has_ledger_table(&self) -> bool {
        self.state.lock().await.ledger_created
    }
}

#[async_trait]
impl MigrationSource for MemorySource {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn placeholder(&self, position: usize) -> String {
        format!("${}", position)
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!(r#""{}""#, ident)
    }

    async fn exec(&self, sql: &str, args: &[&str]) -> Result<(), SourceError> {
        let mut state = self.state.lock().await;
        execute(&mut state, &self.settings, sql, args).await
    }

    async fn scan(&self, sql: &str, _args: &[&str]) -> Result<Vec<Row>, SourceError> {
        let state = self.state.lock().await;
        query(&state, &self.settings, sql)
    }

    async fn begin(&self) -> Result<Box<dyn SourceTransaction>, SourceError> {
        let guard = self.state.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            working,
            settings: self.settings.clone(),
        }))
    }
}

/// Holds the state lock; changes are written back only on commit
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    settings: Arc<Settings>,
}

#[async_trait]
impl SqlExecutor for MemoryTransaction {
    async fn exec(&mut self, sql: &str, args: &[&str]) -> Result<(), SourceError> {
        execute(&mut self.working, &self.settings, sql, args).await
    }

    async fn scan(&mut self, sql: &str, _args: &[&str]) -> Result<Vec<Row>, SourceError> {
        query(&self.working, &self.settings, sql)
    }
}

#[async_trait]
impl SourceTransaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<(), SourceError> {
        let MemoryTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), SourceError> {
        Ok(())
    }
}

enum Statement {
    CreateLedger,
    Insert,
    Delete,
    Script,
}

fn classify(sql: &str, settings: &Settings) -> Statement {
    let normalized = sql.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let targets_ledger = |rest: &str| table_token(rest) == settings.ledger_table.to_lowercase();

    if let Some(rest) = normalized.strip_prefix("create table if not exists ")
        && targets_ledger(rest)
    {
        return Statement::CreateLedger;
    }
    if let Some(rest) = normalized.strip_prefix("insert into ")
        && targets_ledger(rest)
    {
        return Statement::Insert;
    }
    if let Some(rest) = normalized.strip_prefix("delete from ")
        && targets_ledger(rest)
    {
        return Statement::Delete;
    }
    Statement::Script
}

fn table_token(rest: &str) -> String {
    rest.split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
        .trim_matches(|c| c == '"' || c == '`')
        .to_string()
}

fn missing_ledger(settings: &Settings) -> SourceError {
    SourceError::Script(format!(
        "relation \"{}\" does not exist",
        settings.ledger_table
    ))
}

fn ledger_key<'a>(args: &[&'a str]) -> Result<(&'a str, &'a str), SourceError> {
    match args {
        [name, stage] => Ok((*name, *stage)),
        _ => Err(SourceError::Unsupported(format!(
            "ledger statements take (name, stage), got {} arguments",
            args.len()
        ))),
    }
}

async fn execute(
    state: &mut MemoryState,
    settings: &Settings,
    sql: &str,
    args: &[&str],
) -> Result<(), SourceError> {
    match classify(sql, settings) {
        Statement::CreateLedger => {
            state.ledger_created = true;
        }
        Statement::Insert => {
            if !state.ledger_created {
                return Err(missing_ledger(settings));
            }
            let (name, stage) = ledger_key(args)?;
            if state
                .ledger
                .iter()
                .any(|row| row.name == name && row.stage == stage)
            {
                return Err(SourceError::ConstraintViolation(format!(
                    "{}, {}",
                    name, stage
                )));
            }
            state.ledger.push(LedgerRow {
                name: name.to_string(),
                stage: stage.to_string(),
                created_at: Utc::now(),
            });
        }
        Statement::Delete => {
            if !state.ledger_created {
                return Err(missing_ledger(settings));
            }
            let (name, stage) = ledger_key(args)?;
            state
                .ledger
                .retain(|row| !(row.name == name && row.stage == stage));
        }
        Statement::Script => {
            if !settings.latency.is_zero() {
                tokio::time::sleep(settings.latency).await;
            }
            if let Some(marker) = &settings.fail_marker
                && sql.contains(marker.as_str())
            {
                return Err(SourceError::Script(format!(
                    "syntax error near \"{}\"",
                    marker
                )));
            }
            state.scripts.push(sql.to_string());
        }
    }
    Ok(())
}

fn query(state: &MemoryState, settings: &Settings, sql: &str) -> Result<Vec<Row>, SourceError> {
    let normalized = sql.to_lowercase();
    let from = normalized
        .split_once(" from ")
        .map(|(_, rest)| table_token(rest.trim_start()));

    if !normalized.trim_start().starts_with("select")
        || from.as_deref() != Some(settings.ledger_table.to_lowercase().as_str())
    {
        return Err(SourceError::Unsupported(format!(
            "memory source only answers ledger queries: {}",
            sql
        )));
    }
    if !state.ledger_created {
        return Err(missing_ledger(settings));
    }

    Ok(state
        .ledger
        .iter()
        .map(|row| {
            Row::new(vec![
                Value::Text(row.name.clone()),
                Value::Text(row.stage.clone()),
                Value::Timestamp(row.created_at),
            ])
        })
        .collect())
}
