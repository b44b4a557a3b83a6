use crate::config::types::*;
use crate::constants::{DEFAULT_EXTENSION, DEFAULT_LEDGER_TABLE, DEFAULT_MIGRATIONS_DIR};

impl Default for Database {
    fn default() -> Self {
        Self {
            url: None,
            ledger_table: DEFAULT_LEDGER_TABLE.to_string(),
        }
    }
}

impl Default for Migrations {
    fn default() -> Self {
        Self {
            root: DEFAULT_MIGRATIONS_DIR.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            dev: false,
        }
    }
}
