pub mod migrate;

pub use migrate::{
    RunSelection, SummaryFormat, build_migrator, cmd_migrate_init, cmd_migrate_new,
    cmd_migrate_run, cmd_migrate_summary, connect_migrator,
};
