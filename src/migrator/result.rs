use crate::migration::Direction;
use serde::Serialize;

/// One (file, stage) pair executed by a call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationResult {
    pub stage: String,
    pub name: String,
    pub direction: Direction,
}

/// Everything a single up/down/refresh call executed, in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MigrationReport {
    results: Vec<MigrationResult>,
}

impl MigrationReport {
    pub(crate) fn push(&mut self, stage: &str, name: &str, direction: Direction) {
        self.results.push(MigrationResult {
            stage: stage.to_string(),
            name: name.to_string(),
            direction,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn results(&self) -> &[MigrationResult] {
        &self.results
    }

    pub fn iter(&self) -> impl Iterator<Item = &MigrationResult> {
        self.results.iter()
    }

    /// `(stage, name)` pairs in execution order
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        self.results
            .iter()
            .map(|r| (r.stage.as_str(), r.name.as_str()))
            .collect()
    }

    /// Results grouped by stage, stages in the order they ran
    pub fn group_by_stage(&self) -> Vec<(&str, Vec<&MigrationResult>)> {
        let mut groups: Vec<(&str, Vec<&MigrationResult>)> = Vec::new();
        for result in &self.results {
            match groups.iter_mut().find(|(stage, _)| *stage == result.stage) {
                Some((_, members)) => members.push(result),
                None => groups.push((&result.stage, vec![result])),
            }
        }
        groups
    }

    pub fn count(&self, direction: Direction) -> usize {
        self.results
            .iter()
            .filter(|r| r.direction == direction)
            .count()
    }
}

impl IntoIterator for MigrationReport {
    type Item = MigrationResult;
    type IntoIter = std::vec::IntoIter<MigrationResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}
