use super::{MigrationSource, Row, SourceError, SourceTransaction, SqlExecutor, Value};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::{Column, MySql, Row as _, Transaction, TypeInfo};

/// MySQL / MariaDB adapter backed by an sqlx connection pool
#[derive(Debug, Clone)]
pub struct MySqlSource {
    pool: MySqlPool,
}

impl MySqlSource {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl MigrationSource for MySqlSource {
    fn backend(&self) -> &'static str {
        "mysql"
    }

    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident)
    }

    // Whole seconds would tie every row written by one call
    fn timestamp_column(&self) -> &'static str {
        "TIMESTAMP(6) DEFAULT CURRENT_TIMESTAMP(6)"
    }

    async fn exec(&self, sql: &str, args: &[&str]) -> Result<(), SourceError> {
        execute(&self.pool, sql, args).await
    }

    async fn scan(&self, sql: &str, args: &[&str]) -> Result<Vec<Row>, SourceError> {
        fetch(&self.pool, sql, args).await
    }

    async fn begin(&self) -> Result<Box<dyn SourceTransaction>, SourceError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlTransaction { tx }))
    }
}

/// Open MySQL transaction. DDL statements commit implicitly on MySQL, so only
/// DML inside a script is covered by rollback.
pub struct MySqlTransaction {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl SqlExecutor for MySqlTransaction {
    async fn exec(&mut self, sql: &str, args: &[&str]) -> Result<(), SourceError> {
        execute(&mut *self.tx, sql, args).await
    }

    async fn scan(&mut self, sql: &str, args: &[&str]) -> Result<Vec<Row>, SourceError> {
        fetch(&mut *self.tx, sql, args).await
    }
}

#[async_trait]
impl SourceTransaction for MySqlTransaction {
    async fn commit(self: Box<Self>) -> Result<(), SourceError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), SourceError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

async fn execute<'c, E>(executor: E, sql: &'c str, args: &'c [&'c str]) -> Result<(), SourceError>
where
    E: sqlx::Executor<'c, Database = MySql>,
{
    if args.is_empty() {
        executor.execute(sqlx::raw_sql(sql)).await?;
    } else {
        let mut query = sqlx::query(sql);
        for arg in args {
            query = query.bind(*arg);
        }
        query.execute(executor).await?;
    }
    Ok(())
}

async fn fetch<'c, E>(executor: E, sql: &'c str, args: &'c [&'c str]) -> Result<Vec<Row>, SourceError>
where
    E: sqlx::Executor<'c, Database = MySql>,
{
    let mut query = sqlx::query(sql);
    for arg in args {
        query = query.bind(*arg);
    }

    query
        .fetch_all(executor)
        .await?
        .iter()
        .map(decode_row)
        .collect()
}

fn decode_row(row: &MySqlRow) -> Result<Row, SourceError> {
    let mut values = Vec::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        let value = match column.type_info().name() {
            "BOOLEAN" => row.try_get::<Option<bool>, _>(index)?.map(Value::Bool),
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                row.try_get::<Option<i64>, _>(index)?.map(Value::Int)
            }
            "TIMESTAMP" => row
                .try_get::<Option<DateTime<Utc>>, _>(index)?
                .map(Value::Timestamp),
            "DATETIME" => row
                .try_get::<Option<NaiveDateTime>, _>(index)?
                .map(|v| Value::Timestamp(v.and_utc())),
            _ => row.try_get::<Option<String>, _>(index)?.map(Value::Text),
        };
        values.push(value.unwrap_or(Value::Null));
    }
    Ok(Row::new(values))
}
