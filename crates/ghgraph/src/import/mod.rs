//! Graph importer: replays cache artifacts into a [`GraphStore`].
//!
//! The importer only reads the cache; it never fetches. A missing artifact
//! means there is nothing to import for that resource.

mod policy;

pub use policy::{FailureMode, ImportPolicy, ImportStage};

use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::cache::{CacheError, CacheStore};
use crate::entity::activity::parse_for_repository;
use crate::entity::prelude::*;
use crate::entity::{is_not_found, parse_list};
use crate::github::short_error_message;
use crate::graph::{AccountLink, GraphError, GraphStore};
use crate::locator::Locator;
use crate::progress::{Progress, ProgressCallback, emit};

/// A failed import stage.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{stage}: {source}")]
    Cache {
        stage: ImportStage,
        #[source]
        source: CacheError,
    },

    #[error("{stage}: malformed {path}: {source}")]
    Decode {
        stage: ImportStage,
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{stage}: {source}")]
    Graph {
        stage: ImportStage,
        #[source]
        source: GraphError,
    },
}

impl ImportError {
    pub fn stage(&self) -> ImportStage {
        match self {
            Self::Cache { stage, .. } | Self::Decode { stage, .. } | Self::Graph { stage, .. } => {
                *stage
            }
        }
    }
}

/// Counts for one imported account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountImport {
    pub gists: usize,
    pub repositories: usize,
    pub subscribers: usize,
    pub pull_requests: usize,
    pub issues: usize,
    pub contributors: usize,
    /// Failures of isolated stages.
    pub isolated_failures: usize,
}

/// What happened to one account.
#[derive(Debug)]
pub enum ImportOutcome {
    Imported(AccountImport),
    /// No usable account artifact.
    Skipped { reason: String },
    /// A fatal stage failed. Earlier stages stay in the graph.
    Failed(ImportError),
}

/// Totals for an import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub accounts: usize,
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
    pub repositories: usize,
    pub gists: usize,
    pub issues: usize,
    pub pull_requests: usize,
    pub isolated_failures: usize,
}

impl ImportSummary {
    fn record(&mut self, outcome: &ImportOutcome) {
        match outcome {
            ImportOutcome::Imported(counts) => {
                self.imported += 1;
                self.repositories += counts.repositories;
                self.gists += counts.gists;
                self.issues += counts.issues;
                self.pull_requests += counts.pull_requests;
                self.isolated_failures += counts.isolated_failures;
            }
            ImportOutcome::Skipped { .. } => self.skipped += 1,
            ImportOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Reads cache artifacts and writes them to a graph.
pub struct Importer {
    cache: Arc<dyn CacheStore>,
    graph: Arc<dyn GraphStore>,
    policy: ImportPolicy,
    on_progress: Option<ProgressCallback>,
}

impl Importer {
    pub fn new(cache: Arc<dyn CacheStore>, graph: Arc<dyn GraphStore>) -> Self {
        Self {
            cache,
            graph,
            policy: ImportPolicy::default(),
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ImportPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn policy(&self) -> &ImportPolicy {
        &self.policy
    }

    /// Import `accounts` in order.
    ///
    /// Fails only if the schema cannot be prepared. Per-account failures
    /// are counted in the summary.
    pub async fn run(&self, accounts: &[String]) -> Result<ImportSummary, GraphError> {
        self.graph.ensure_schema().await?;

        let mut summary = ImportSummary {
            accounts: accounts.len(),
            ..ImportSummary::default()
        };

        for (index, login) in accounts.iter().enumerate() {
            emit(
                self.progress(),
                Progress::AccountStarted {
                    login: login.clone(),
                    position: index + 1,
                    total: accounts.len(),
                },
            );
            let outcome = self.import_account(login).await;
            summary.record(&outcome);
        }

        tracing::info!(
            accounts = summary.accounts,
            imported = summary.imported,
            skipped = summary.skipped,
            failed = summary.failed,
            "import complete"
        );
        emit(
            self.progress(),
            Progress::ImportComplete {
                imported: summary.imported,
                skipped: summary.skipped,
                failed: summary.failed,
            },
        );
        Ok(summary)
    }

    /// Import one account and everything cached under it.
    pub async fn import_account(&self, login: &str) -> ImportOutcome {
        let outcome = match self.load_account(login).await {
            Ok(Some(account)) => match self.import_resolved(&account).await {
                Ok(counts) => ImportOutcome::Imported(counts),
                Err(e) => ImportOutcome::Failed(e),
            },
            Ok(None) => ImportOutcome::Skipped {
                reason: "no account artifact or account not found".to_string(),
            },
            Err(e) => ImportOutcome::Failed(e),
        };

        match &outcome {
            ImportOutcome::Imported(counts) => {
                tracing::debug!(login, ?counts, "account imported");
                emit(
                    self.progress(),
                    Progress::AccountImported {
                        login: login.to_string(),
                        repositories: counts.repositories,
                        gists: counts.gists,
                        issues: counts.issues,
                        pull_requests: counts.pull_requests,
                    },
                );
            }
            ImportOutcome::Skipped { reason } => {
                tracing::info!(login, reason, "account skipped");
                emit(
                    self.progress(),
                    Progress::AccountSkipped {
                        login: login.to_string(),
                        reason: reason.clone(),
                    },
                );
            }
            ImportOutcome::Failed(e) => {
                tracing::warn!(login, stage = %e.stage(), error = %e, "account import aborted");
                emit(
                    self.progress(),
                    Progress::ImportStepFailed {
                        login: login.to_string(),
                        stage: e.stage().as_str(),
                        error: short_error_message(e),
                        fatal: true,
                    },
                );
            }
        }
        outcome
    }

    fn progress(&self) -> Option<&ProgressCallback> {
        self.on_progress.as_ref()
    }

    /// The account payload, or `None` when it is missing or reports "Not Found".
    async fn load_account(&self, login: &str) -> Result<Option<Account>, ImportError> {
        let stage = ImportStage::Account;
        let locator = Locator::Account(login.to_string());
        let Some(bytes) = self.read(stage, &locator).await? else {
            return Ok(None);
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|source| decode(stage, &locator, source))?;
        if is_not_found(&value) {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| decode(stage, &locator, source))
    }

    async fn import_resolved(&self, account: &Account) -> Result<AccountImport, ImportError> {
        let mut counts = AccountImport::default();
        let login = account.login.as_str();

        let result = self
            .graph
            .upsert_account(account)
            .await
            .map_err(|source| graph(ImportStage::Account, source));
        self.apply_policy(login, ImportStage::Account, result, &mut counts)?;

        let result = self.import_gists(login).await;
        let gists = self.apply_policy(login, ImportStage::Gists, result, &mut counts)?;
        counts.gists = gists.unwrap_or_default();

        let repositories: Vec<Repository> = match self
            .read_list(
                ImportStage::Repositories,
                &Locator::AccountRepositories(login.to_string()),
            )
            .await
        {
            Ok(repositories) => repositories,
            Err(e) => {
                self.apply_policy::<()>(login, ImportStage::Repositories, Err(e), &mut counts)?;
                Vec::new()
            }
        };

        for repository in &repositories {
            let result = self
                .graph
                .upsert_repository(repository)
                .await
                .map_err(|source| graph(ImportStage::Repository, source));
            if self
                .apply_policy(login, ImportStage::Repository, result, &mut counts)?
                .is_none()
            {
                continue;
            }
            counts.repositories += 1;

            let result = self
                .link_accounts(ImportStage::Subscribers, AccountLink::Subscribes, repository)
                .await;
            let count = self.apply_policy(login, ImportStage::Subscribers, result, &mut counts)?;
            counts.subscribers += count.unwrap_or_default();

            let result = self.import_pull_requests(repository).await;
            let count = self.apply_policy(login, ImportStage::PullRequests, result, &mut counts)?;
            counts.pull_requests += count.unwrap_or_default();

            let result = self.import_issues(repository).await;
            let count = self.apply_policy(login, ImportStage::Issues, result, &mut counts)?;
            counts.issues += count.unwrap_or_default();

            let result = self
                .link_accounts(
                    ImportStage::Contributors,
                    AccountLink::Contributes,
                    repository,
                )
                .await;
            let count = self.apply_policy(login, ImportStage::Contributors, result, &mut counts)?;
            counts.contributors += count.unwrap_or_default();
        }

        Ok(counts)
    }

    /// Pass fatal failures through; swallow isolated ones.
    fn apply_policy<T>(
        &self,
        login: &str,
        stage: ImportStage,
        result: Result<T, ImportError>,
        counts: &mut AccountImport,
    ) -> Result<Option<T>, ImportError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if self.policy.is_isolated(stage) => {
                counts.isolated_failures += 1;
                tracing::warn!(login, stage = %stage, error = %e, "isolated import failure");
                emit(
                    self.progress(),
                    Progress::ImportStepFailed {
                        login: login.to_string(),
                        stage: stage.as_str(),
                        error: short_error_message(&e),
                        fatal: false,
                    },
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn import_gists(&self, login: &str) -> Result<usize, ImportError> {
        let stage = ImportStage::Gists;
        let gists: Vec<Gist> = self
            .read_list(stage, &Locator::AccountGists(login.to_string()))
            .await?;
        for gist in &gists {
            self.graph
                .upsert_gist(gist)
                .await
                .map_err(|source| graph(stage, source))?;
        }
        Ok(gists.len())
    }

    async fn import_pull_requests(&self, repository: &Repository) -> Result<usize, ImportError> {
        let stage = ImportStage::PullRequests;
        let locator = Locator::RepositoryPulls(repository.full_name.clone());
        let pulls: Vec<PullRequest> = self
            .read_activity(stage, &locator, &repository.full_name)
            .await?;
        for pull in &pulls {
            self.graph
                .upsert_pull_request(pull)
                .await
                .map_err(|source| graph(stage, source))?;
        }
        Ok(pulls.len())
    }

    async fn import_issues(&self, repository: &Repository) -> Result<usize, ImportError> {
        let stage = ImportStage::Issues;
        let locator = Locator::RepositoryIssues(repository.full_name.clone());
        let issues: Vec<Issue> = self
            .read_activity(stage, &locator, &repository.full_name)
            .await?;
        for issue in &issues {
            self.graph
                .upsert_issue(issue)
                .await
                .map_err(|source| graph(stage, source))?;
        }
        Ok(issues.len())
    }

    async fn link_accounts(
        &self,
        stage: ImportStage,
        link: AccountLink,
        repository: &Repository,
    ) -> Result<usize, ImportError> {
        let locator = match link {
            AccountLink::Contributes => {
                Locator::RepositoryContributors(repository.full_name.clone())
            }
            AccountLink::Subscribes => Locator::RepositorySubscribers(repository.full_name.clone()),
        };
        let accounts: Vec<Account> = self.read_list(stage, &locator).await?;
        for account in &accounts {
            self.graph
                .link_account(account, link, repository)
                .await
                .map_err(|source| graph(stage, source))?;
        }
        Ok(accounts.len())
    }

    async fn read(
        &self,
        stage: ImportStage,
        locator: &Locator,
    ) -> Result<Option<Vec<u8>>, ImportError> {
        self.cache
            .get(locator)
            .await
            .map_err(|source| ImportError::Cache { stage, source })
    }

    /// A list artifact. Missing, empty and `null` artifacts are empty lists.
    async fn read_list<T: DeserializeOwned>(
        &self,
        stage: ImportStage,
        locator: &Locator,
    ) -> Result<Vec<T>, ImportError> {
        match self.read(stage, locator).await? {
            Some(bytes) => parse_list(&bytes).map_err(|source| decode(stage, locator, source)),
            None => Ok(Vec::new()),
        }
    }

    async fn read_activity<T>(
        &self,
        stage: ImportStage,
        locator: &Locator,
        full_name: &str,
    ) -> Result<Vec<T>, ImportError>
    where
        T: crate::entity::activity::RepositoryActivity + DeserializeOwned,
    {
        match self.read(stage, locator).await? {
            Some(bytes) => parse_for_repository(&bytes, full_name)
                .map_err(|source| decode(stage, locator, source)),
            None => Ok(Vec::new()),
        }
    }
}

fn decode(stage: ImportStage, locator: &Locator, source: serde_json::Error) -> ImportError {
    ImportError::Decode {
        stage,
        path: locator.cache_file_name(),
        source,
    }
}

fn graph(stage: ImportStage, source: GraphError) -> ImportError {
    ImportError::Graph { stage, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FsCacheStore;
    use crate::graph::{MemoryGraph, NodeKey, NodeLabel, RelType};
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn write(dir: &TempDir, locator: Locator, body: &str) {
        std::fs::write(dir.path().join(locator.cache_file_name()), body).unwrap();
    }

    fn importer(dir: &TempDir, graph: &Arc<MemoryGraph>) -> Importer {
        Importer::new(
            Arc::new(FsCacheStore::new(dir.path())),
            Arc::clone(graph) as Arc<dyn GraphStore>,
        )
    }

    const REPOS: &str = r#"[{
        "id": 10, "name": "tool", "full_name": "octocat/tool", "default_branch": "main",
        "owner": { "login": "octocat", "id": 1, "type": "User" }
    }]"#;

    #[tokio::test]
    async fn missing_account_artifact_is_skipped() {
        let dir = TempDir::new().unwrap();
        let graph = Arc::new(MemoryGraph::new());

        let outcome = importer(&dir, &graph).import_account("nobody").await;
        assert!(matches!(outcome, ImportOutcome::Skipped { .. }));
        assert_eq!(graph.node_count().await, 0);
    }

    #[tokio::test]
    async fn contributor_failure_is_isolated() {
        let dir = TempDir::new().unwrap();
        write(&dir, Locator::Account("octocat".into()), r#"{"login":"octocat","id":1}"#);
        write(&dir, Locator::AccountRepositories("octocat".into()), REPOS);
        write(
            &dir,
            Locator::RepositoryContributors("octocat/tool".into()),
            "this is not json",
        );
        write(
            &dir,
            Locator::RepositoryIssues("octocat/tool".into()),
            r#"[{"id":7,"title":"t","user":{"login":"hubot","id":2},"created_at":"2020-01-01T00:00:00Z"}]"#,
        );

        let graph = Arc::new(MemoryGraph::new());
        let events: Arc<Mutex<Vec<Progress>>> = Arc::new(Mutex::new(Vec::new()));
        let capture = Arc::clone(&events);
        let outcome = importer(&dir, &graph)
            .with_progress(Box::new(move |e| capture.lock().unwrap().push(e)))
            .import_account("octocat")
            .await;

        match outcome {
            ImportOutcome::Imported(counts) => {
                assert_eq!(counts.repositories, 1);
                assert_eq!(counts.issues, 1);
                assert_eq!(counts.isolated_failures, 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(events.lock().unwrap().iter().any(|e| matches!(
            e,
            Progress::ImportStepFailed {
                stage: "contributors",
                fatal: false,
                ..
            }
        )));
        assert!(
            graph
                .has_relationship(&NodeKey::Repository(10), RelType::Has, &NodeKey::Issue(7))
                .await
        );
    }

    #[tokio::test]
    async fn fatal_failure_aborts_the_account_only() {
        let dir = TempDir::new().unwrap();
        write(&dir, Locator::Account("octocat".into()), r#"{"login":"octocat","id":1}"#);
        write(&dir, Locator::AccountRepositories("octocat".into()), REPOS);
        write(&dir, Locator::RepositoryIssues("octocat/tool".into()), "{broken");
        write(&dir, Locator::Account("hubot".into()), r#"{"login":"hubot","id":2}"#);

        let graph = Arc::new(MemoryGraph::new());
        let summary = importer(&dir, &graph)
            .run(&["octocat".to_string(), "hubot".to_string()])
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.imported, 1);
        assert_eq!(graph.count_nodes(NodeLabel::Account).await.unwrap(), 2);
        assert_eq!(graph.count_nodes(NodeLabel::Repository).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn fatal_stage_can_be_isolated_by_policy() {
        let dir = TempDir::new().unwrap();
        write(&dir, Locator::Account("octocat".into()), r#"{"login":"octocat","id":1}"#);
        write(&dir, Locator::AccountRepositories("octocat".into()), REPOS);
        write(&dir, Locator::RepositoryIssues("octocat/tool".into()), "{broken");

        let graph = Arc::new(MemoryGraph::new());
        let importer = importer(&dir, &graph)
            .with_policy(ImportPolicy::default().with_mode(ImportStage::Issues, FailureMode::Isolated));

        let outcome = importer.import_account("octocat").await;
        assert!(matches!(outcome, ImportOutcome::Imported(ref c) if c.isolated_failures == 1));
    }

    #[tokio::test]
    async fn import_never_touches_the_network_and_keeps_cache_intact() {
        let dir = TempDir::new().unwrap();
        write(&dir, Locator::Account("octocat".into()), r#"{"login":"octocat","id":1}"#);

        let graph = Arc::new(MemoryGraph::new());
        let summary = importer(&dir, &graph).run(&["octocat".to_string()]).await.unwrap();

        assert_eq!(summary.imported, 1);
        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 1);
    }
}
