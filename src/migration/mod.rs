pub mod catalog;
pub mod file;
pub mod fs;
pub mod generator;
pub mod parsing;
pub mod section_parser;

pub use catalog::Catalog;
pub use file::MigrationFile;
pub use fs::{LocalFs, MigrationFs};
pub use generator::{create_migration_file, scaffold_content};
pub use parsing::{ParsedFilename, parse_migration_filename, parse_migration_path, slugify};
pub use section_parser::{Direction, StageScripts, parse_stage_scripts};
