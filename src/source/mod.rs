pub mod memory;
pub mod mysql;
pub mod postgres;

pub use memory::MemorySource;
pub use mysql::MySqlSource;
pub use postgres::PostgresSource;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Errors raised by a source adapter while talking to its database
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("duplicate key ({0}) violates ledger primary key")]
    ConstraintViolation(String),

    #[error("script failed: {0}")]
    Script(String),

    #[error("cannot decode column {index}: {message}")]
    Decode { index: usize, message: String },

    #[error("{0}")]
    Unsupported(String),
}

/// A single decoded column value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

/// One result row returned by [`SqlExecutor::scan`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn text(&self, index: usize) -> Result<&str, SourceError> {
        match self.values.get(index) {
            Some(Value::Text(v)) => Ok(v),
            other => Err(SourceError::Decode {
                index,
                message: format!("expected text, found {:?}", other),
            }),
        }
    }

    /// Timestamp columns may legitimately be NULL (no default on some engines)
    pub fn timestamp(&self, index: usize) -> Result<Option<DateTime<Utc>>, SourceError> {
        match self.values.get(index) {
            Some(Value::Timestamp(v)) => Ok(Some(*v)),
            Some(Value::Null) => Ok(None),
            other => Err(SourceError::Decode {
                index,
                message: format!("expected timestamp, found {:?}", other),
            }),
        }
    }
}

/// Executes SQL and scans rows. Implemented by sources and by open transactions.
#[async_trait]
pub trait SqlExecutor: Send {
    /// Execute a statement. Without arguments the text is sent as raw SQL and
    /// may hold several statements.
    async fn exec(&mut self, sql: &str, args: &[&str]) -> Result<(), SourceError>;

    /// Run a query and collect every row
    async fn scan(&mut self, sql: &str, args: &[&str]) -> Result<Vec<Row>, SourceError>;
}

/// A transaction opened by [`MigrationSource::begin`].
///
/// Dropping a transaction without calling `commit` rolls it back.
#[async_trait]
pub trait SourceTransaction: SqlExecutor {
    async fn commit(self: Box<Self>) -> Result<(), SourceError>;

    async fn rollback(self: Box<Self>) -> Result<(), SourceError>;
}

/// Binds the migrator to a concrete database engine
#[async_trait]
pub trait MigrationSource: Send + Sync {
    /// Short engine name used in log lines
    fn backend(&self) -> &'static str;

    /// Bind placeholder for the 1-based parameter `position`
    fn placeholder(&self, position: usize) -> String;

    /// Quote an identifier that has already been validated
    fn quote_identifier(&self, ident: &str) -> String;

    /// Column definition for the ledger's `created_at`. The default must
    /// advance between statements of one transaction so rows sort in the
    /// order they were written.
    fn timestamp_column(&self) -> &'static str {
        "TIMESTAMP DEFAULT CURRENT_TIMESTAMP"
    }

    async fn exec(&self, sql: &str, args: &[&str]) -> Result<(), SourceError>;

    async fn scan(&self, sql: &str, args: &[&str]) -> Result<Vec<Row>, SourceError>;

    async fn begin(&self) -> Result<Box<dyn SourceTransaction>, SourceError>;
}

/// Adapter so ledger helpers can run against either a source or a transaction
pub(crate) struct Unscoped<'a>(pub &'a dyn MigrationSource);

#[async_trait]
impl SqlExecutor for Unscoped<'_> {
    async fn exec(&mut self, sql: &str, args: &[&str]) -> Result<(), SourceError> {
        self.0.exec(sql, args).await
    }

    async fn scan(&mut self, sql: &str, args: &[&str]) -> Result<Vec<Row>, SourceError> {
        self.0.scan(sql, args).await
    }
}
