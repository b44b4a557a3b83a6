use sqlx::PgPool;
use uuid::Uuid;

/// Connects to an external PostgreSQL server named by `DATABASE_URL`.
/// Tests that need it skip themselves when the variable is unset.
pub struct PgTestInstance {
    pub base_url: String,
}

impl PgTestInstance {
    pub fn from_env() -> Option<Self> {
        dotenv::dotenv().ok();
        std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| url.starts_with("postgres"))
            .map(|base_url| Self { base_url })
    }

    /// Create an isolated database and return its URL
    pub async fn create_test_database(&self) -> TestDatabase {
        let db_name = format!("sqlstage_test_{}", Uuid::new_v4().simple());
        let pool = PgPool::connect(&self.base_url)
            .await
            .expect("Failed to connect to postgres");
        sqlx::query(&format!("CREATE DATABASE \"{}\"", db_name))
            .execute(&pool)
            .await
            .expect("Failed to create test database");
        pool.close().await;

        let url = match self.base_url.rfind('/') {
            Some(last_slash) => format!("{}/{}", &self.base_url[..last_slash], db_name),
            None => format!("{}/{}", self.base_url, db_name),
        };

        TestDatabase {
            url,
            db_name,
            base_url: self.base_url.clone(),
        }
    }
}

pub struct TestDatabase {
    pub url: String,
    db_name: String,
    base_url: String,
}

impl TestDatabase {
    /// Best-effort drop with a timeout so a stuck server cannot hang the run
    pub async fn cleanup(self) {
        let cleanup_future = async move {
            if let Ok(pool) = PgPool::connect(&self.base_url).await {
                let drop_sql = format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", self.db_name);
                let _ = sqlx::query(&drop_sql).execute(&pool).await;
                pool.close().await;
            }
        };

        let _ = tokio::time::timeout(std::time::Duration::from_secs(5), cleanup_future).await;
    }
}
