pub mod common;
pub mod init;
pub mod new;
pub mod run;
pub mod summary;

// Re-export all command functions
pub use common::{build_migrator, connect_migrator};
pub use init::cmd_migrate_init;
pub use new::cmd_migrate_new;
pub use run::{RunSelection, cmd_migrate_run};
pub use summary::{SummaryFormat, cmd_migrate_summary};
