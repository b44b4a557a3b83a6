use crate::migration::Direction;
use crate::source::SourceError;
use std::path::PathBuf;
use std::time::Duration;

/// Errors returned by the migration engine and its catalog
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("failed to read migration file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to list migration files under {}", root.display())]
    Lookup {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Source(#[from] SourceError),

    /// A script or ledger write failed; the whole call was rolled back
    #[error("migration '{name}' failed on stage '{stage}' ({phase})")]
    Execution {
        name: String,
        stage: String,
        phase: Phase,
        #[source]
        source: SourceError,
    },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("invalid option: {0}")]
    InvalidOption(String),
}

impl MigrationError {
    pub(crate) fn execution(
        name: &str,
        stage: &str,
        direction: Direction,
        source: SourceError,
    ) -> Self {
        Self::Execution {
            name: name.to_string(),
            stage: stage.to_string(),
            phase: direction.into(),
            source,
        }
    }

    /// True when the failure came from a duplicate ledger key, usually a
    /// concurrent process applying the same migration
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::Execution { source, .. } | Self::Source(source) => match source {
                SourceError::ConstraintViolation(_) => true,
                SourceError::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
                _ => false,
            },
            _ => false,
        }
    }
}

/// Which half of an operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Apply,
    Rollback,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Apply => f.write_str("apply"),
            Self::Rollback => f.write_str("rollback"),
        }
    }
}

impl From<Direction> for Phase {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => Self::Apply,
            Direction::Down => Self::Rollback,
        }
    }
}
