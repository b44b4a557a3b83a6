use std::time::Duration;

// Deadlines for database work
pub const LEDGER_TIMEOUT: Duration = Duration::from_secs(10);
pub const TRANSACTION_TIMEOUT: Duration = Duration::from_secs(300);

// Connection retry policy
pub const CONNECT_MAX_RETRIES: u32 = 5;
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(200);
pub const CONNECT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

// Ledger defaults
pub const DEFAULT_LEDGER_TABLE: &str = "migrations";
pub const LEDGER_COLUMN_WIDTH: usize = 100;

// Migration file defaults
pub const DEFAULT_ROOT: &str = ".";
pub const DEFAULT_EXTENSION: &str = "sql";
pub const DEFAULT_STAGE: &str = "main";
pub const DEFAULT_MIGRATIONS_DIR: &str = "migrations";

// Configuration file name
pub const CONFIG_FILENAME: &str = "sqlstage.yaml";
