use crate::config::types::*;

/// Trait for merging optional configuration values
pub trait Merge<T> {
    fn merge(self, other: T) -> T;
}

impl<T> Merge<Option<T>> for Option<T> {
    fn merge(self, other: Option<T>) -> Option<T> {
        other.or(self)
    }
}

fn merge_sections<T>(a: Option<T>, b: Option<T>, merge_with: impl FnOnce(T, T) -> T) -> Option<T> {
    match (a, b) {
        (None, None) => None,
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (Some(a), Some(b)) => Some(merge_with(a, b)),
    }
}

impl Merge<ConfigInput> for ConfigInput {
    fn merge(self, other: ConfigInput) -> ConfigInput {
        ConfigInput {
            database: merge_sections(self.database, other.database, DatabaseInput::merge_with),
            migrations: merge_sections(
                self.migrations,
                other.migrations,
                MigrationsInput::merge_with,
            ),
            cli: merge_sections(self.cli, other.cli, CliInput::merge_with),
        }
    }
}

// Field-wise merges: the later layer wins per field
impl DatabaseInput {
    pub fn merge_with(self, other: DatabaseInput) -> DatabaseInput {
        DatabaseInput {
            url: self.url.merge(other.url),
            ledger_table: self.ledger_table.merge(other.ledger_table),
        }
    }
}

impl MigrationsInput {
    pub fn merge_with(self, other: MigrationsInput) -> MigrationsInput {
        MigrationsInput {
            root: self.root.merge(other.root),
            extension: self.extension.merge(other.extension),
            dev: self.dev.merge(other.dev),
        }
    }
}

impl CliInput {
    pub fn merge_with(self, other: CliInput) -> CliInput {
        CliInput {
            stages: self.stages.merge(other.stages),
            refresh_stages: self.refresh_stages.merge(other.refresh_stages),
            only: self.only.merge(other.only),
            exclude: self.exclude.merge(other.exclude),
            allow_new: self.allow_new.merge(other.allow_new),
        }
    }
}
