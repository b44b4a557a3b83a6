use crate::constants::{CONNECT_ACQUIRE_TIMEOUT, CONNECT_MAX_RETRIES, CONNECT_RETRY_DELAY};
use crate::source::{MigrationSource, MySqlSource, PostgresSource};
use anyhow::{Result, anyhow, bail};
use sqlx::ConnectOptions;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing::log::LevelFilter;

/// Mask password in database URL for display
pub fn mask_url_password(url: &str) -> String {
    let Some((protocol, rest)) = url.split_once("://") else {
        return url.to_string();
    };

    // Check if there's user info (user:pass@host or user@host)
    if let Some(at_pos) = rest.rfind('@') {
        let user_info = &rest[..at_pos];
        let host_and_path = &rest[at_pos + 1..];

        if let Some((username, _)) = user_info.split_once(':') {
            return format!("{}://{}:***@{}", protocol, username, host_and_path);
        }
    }

    url.to_string()
}

/// Database engines a URL can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    MySql,
}

impl Backend {
    /// Pick the engine from the URL scheme
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .ok_or_else(|| anyhow!("Invalid database URL {}: missing scheme", mask_url_password(url)))?;

        match scheme.as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySql),
            other => bail!(
                "Unsupported database scheme '{}': use postgres:// or mysql://",
                other
            ),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Maximum number of retries for database connections
    pub max_retries: u32,
    /// Delay between connection retries
    pub retry_delay: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_retries: CONNECT_MAX_RETRIES,
            retry_delay: CONNECT_RETRY_DELAY,
        }
    }
}

/// Connect to the database behind `url` and wrap it in the matching source adapter
pub async fn open_source(url: &str) -> Result<Arc<dyn MigrationSource>> {
    open_source_with_config(url, &ConnectionConfig::default()).await
}

pub async fn open_source_with_config(
    url: &str,
    config: &ConnectionConfig,
) -> Result<Arc<dyn MigrationSource>> {
    let source: Arc<dyn MigrationSource> = match Backend::from_url(url)? {
        Backend::Postgres => {
            // Long migration scripts would otherwise be logged in full as slow statements
            let options = PgConnectOptions::from_str(url)
                .map_err(|e| anyhow!("Invalid database URL: {}", e))?
                .log_slow_statements(LevelFilter::Off, Duration::from_secs(0));
            let pool = with_retry(url, config, || {
                PgPoolOptions::new()
                    .acquire_timeout(CONNECT_ACQUIRE_TIMEOUT)
                    .connect_with(options.clone())
            })
            .await?;
            Arc::new(PostgresSource::new(pool))
        }
        Backend::MySql => {
            let options = MySqlConnectOptions::from_str(url)
                .map_err(|e| anyhow!("Invalid database URL: {}", e))?
                .log_slow_statements(LevelFilter::Off, Duration::from_secs(0));
            let pool = with_retry(url, config, || {
                MySqlPoolOptions::new()
                    .acquire_timeout(CONNECT_ACQUIRE_TIMEOUT)
                    .connect_with(options.clone())
            })
            .await?;
            Arc::new(MySqlSource::new(pool))
        }
    };

    Ok(source)
}

/// Retry a connection attempt to ride out container start-up and other
/// transient failures
async fn with_retry<T, F, Fut>(url: &str, config: &ConnectionConfig, mut connect: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempt = 0;
    loop {
        match connect().await {
            Ok(pool) => {
                if attempt > 0 {
                    info!(
                        "Connected to database (after {} retr{})",
                        attempt,
                        if attempt == 1 { "y" } else { "ies" }
                    );
                } else {
                    info!("Connected to database");
                }
                return Ok(pool);
            }
            Err(e) if attempt < config.max_retries => {
                if attempt == 0 {
                    info!("Database not ready, retrying...");
                }
                tracing::debug!("Connection attempt {} failed: {}", attempt + 1, e);
                attempt += 1;
                tokio::time::sleep(config.retry_delay).await;
            }
            Err(e) => {
                return Err(anyhow!(
                    "Failed to connect to database at {} after {} attempts: {}",
                    mask_url_password(url),
                    config.max_retries + 1,
                    e
                ));
            }
        }
    }
}
