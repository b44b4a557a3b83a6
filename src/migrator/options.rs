use std::collections::HashSet;

/// File-name filters for a single up/down/refresh call.
///
/// Repeated calls accumulate; names are matched exactly against the logical
/// migration name (slug with hyphens as spaces).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationOptions {
    only: HashSet<String>,
    exclude: HashSet<String>,
}

impl MigrationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the call to these migrations
    pub fn only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only.extend(names.into_iter().map(Into::into));
        self
    }

    /// Leave these migrations out of the call
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn only_names(&self) -> &HashSet<String> {
        &self.only
    }

    pub fn excluded_names(&self) -> &HashSet<String> {
        &self.exclude
    }
}
