use super::{MigrationSource, Row, SourceError, SourceTransaction, SqlExecutor, Value};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Column, Postgres, Row as _, Transaction, TypeInfo};

/// PostgreSQL adapter backed by an sqlx connection pool
#[derive(Debug, Clone)]
pub struct PostgresSource {
    pool: PgPool,
}

impl PostgresSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MigrationSource for PostgresSource {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self, position: usize) -> String {
        format!("${}", position)
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!(r#""{}""#, ident)
    }

    // CURRENT_TIMESTAMP is fixed at transaction start
    fn timestamp_column(&self) -> &'static str {
        "TIMESTAMP DEFAULT clock_timestamp()"
    }

    async fn exec(&self, sql: &str, args: &[&str]) -> Result<(), SourceError> {
        execute(&self.pool, sql, args).await
    }

    async fn scan(&self, sql: &str, args: &[&str]) -> Result<Vec<Row>, SourceError> {
        fetch(&self.pool, sql, args).await
    }

    async fn begin(&self) -> Result<Box<dyn SourceTransaction>, SourceError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }
}

/// Open PostgreSQL transaction; sqlx rolls it back when dropped uncommitted
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl SqlExecutor for PostgresTransaction {
    async fn exec(&mut self, sql: &str, args: &[&str]) -> Result<(), SourceError> {
        execute(&mut *self.tx, sql, args).await
    }

    async fn scan(&mut self, sql: &str, args: &[&str]) -> Result<Vec<Row>, SourceError> {
        fetch(&mut *self.tx, sql, args).await
    }
}

#[async_trait]
impl SourceTransaction for PostgresTransaction {
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
    E: sqlx::Executor<'c, Database = Postgres>,
{
    // Raw SQL keeps multi-statement scripts working; bound statements are prepared
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
    E: sqlx::Executor<'c, Database = Postgres>,
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

fn decode_row(row: &PgRow) -> Result<Row, SourceError> {
    let mut values = Vec::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        let value = match column.type_info().name() {
            "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(Value::Bool),
            "INT2" => row
                .try_get::<Option<i16>, _>(index)?
                .map(|v| Value::Int(v.into())),
            "INT4" => row
                .try_get::<Option<i32>, _>(index)?
                .map(|v| Value::Int(v.into())),
            "INT8" => row.try_get::<Option<i64>, _>(index)?.map(Value::Int),
            "TIMESTAMP" => row
                .try_get::<Option<NaiveDateTime>, _>(index)?
                .map(|v| Value::Timestamp(v.and_utc())),
            "TIMESTAMPTZ" => row
                .try_get::<Option<DateTime<Utc>>, _>(index)?
                .map(Value::Timestamp),
            _ => row.try_get::<Option<String>, _>(index)?.map(Value::Text),
        };
        values.push(value.unwrap_or(Value::Null));
    }
    Ok(Row::new(values))
}
