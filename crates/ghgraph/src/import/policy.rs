//! Which import failures abort an account and which are only counted.

use std::collections::BTreeMap;
use std::fmt;

/// One step of importing an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImportStage {
    Account,
    Gists,
    Repositories,
    /// The repository node with its language, license and topics.
    Repository,
    Subscribers,
    PullRequests,
    Issues,
    Contributors,
}

impl ImportStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Gists => "gists",
            Self::Repositories => "repositories",
            Self::Repository => "repository",
            Self::Subscribers => "subscribers",
            Self::PullRequests => "pull requests",
            Self::Issues => "issues",
            Self::Contributors => "contributors",
        }
    }
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a failed stage does to the account being imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Abort the account. The run continues with the next one.
    Fatal,
    /// Log and count the failure, then continue with the next stage.
    Isolated,
}

/// Failure mode per stage. Stages without an explicit entry are fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPolicy {
    modes: BTreeMap<ImportStage, FailureMode>,
}

impl Default for ImportPolicy {
    /// Only contributor links are isolated.
    fn default() -> Self {
        Self::all_fatal().with_mode(ImportStage::Contributors, FailureMode::Isolated)
    }
}

impl ImportPolicy {
    /// A policy where every failure aborts the account.
    pub fn all_fatal() -> Self {
        Self {
            modes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_mode(mut self, stage: ImportStage, mode: FailureMode) -> Self {
        self.modes.insert(stage, mode);
        self
    }

    pub fn mode(&self, stage: ImportStage) -> FailureMode {
        self.modes
            .get(&stage)
            .copied()
            .unwrap_or(FailureMode::Fatal)
    }

    #[inline]
    pub fn is_isolated(&self, stage: ImportStage) -> bool {
        self.mode(stage) == FailureMode::Isolated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_isolates_only_contributors() {
        let policy = ImportPolicy::default();
        assert!(policy.is_isolated(ImportStage::Contributors));
        for stage in [
            ImportStage::Account,
            ImportStage::Gists,
            ImportStage::Repositories,
            ImportStage::Repository,
            ImportStage::Subscribers,
            ImportStage::PullRequests,
            ImportStage::Issues,
        ] {
            assert_eq!(policy.mode(stage), FailureMode::Fatal, "{stage}");
        }
    }

    #[test]
    fn modes_can_be_overridden() {
        let policy = ImportPolicy::default()
            .with_mode(ImportStage::Issues, FailureMode::Isolated)
            .with_mode(ImportStage::Contributors, FailureMode::Fatal);
        assert!(policy.is_isolated(ImportStage::Issues));
        assert!(!policy.is_isolated(ImportStage::Contributors));
    }
}
