//! Harvest driver: fetch every resource of every account, one at a time.
//!
//! Failures are isolated per resource. A failed resource is written to the
//! [`ErrorLog`] and the driver moves on; nothing short of a progress log
//! write failure stops a run.

mod error_log;

pub use error_log::{ErrorKey, ErrorLog};

use crate::accounts::{AccountsError, ProgressLog};
use crate::entity::prelude::*;
use crate::github::{FetchClient, FetchError, short_error_message};
use crate::progress::{Progress, emit};

/// What happened to one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountOutcome {
    /// Profile resolved; `failures` resources failed.
    Harvested { repositories: usize, failures: usize },
    /// The API reports the account does not exist.
    NotFound,
    /// The profile could not be fetched.
    Failed { error: String },
}

impl AccountOutcome {
    /// Whether the account needs no further harvesting.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Totals for a harvest run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub accounts: usize,
    pub harvested: usize,
    pub not_found: usize,
    pub failed_accounts: usize,
    /// Failed resources across all accounts, including failed profiles.
    pub failures: usize,
}

/// Drives a [`FetchClient`] over a list of accounts.
pub struct Harvester {
    client: FetchClient,
    errors: ErrorLog,
    progress_log: ProgressLog,
}

impl Harvester {
    pub fn new(client: FetchClient, errors: ErrorLog, progress_log: ProgressLog) -> Self {
        Self {
            client,
            errors,
            progress_log,
        }
    }

    pub fn client(&self) -> &FetchClient {
        &self.client
    }

    pub fn into_client(self) -> FetchClient {
        self.client
    }

    /// Harvest `accounts` in order.
    ///
    /// Each account that reaches a terminal outcome is appended to the
    /// progress log as soon as it is done. An account whose profile failed
    /// is not logged so a resumed run tries it again.
    pub async fn run(&mut self, accounts: &[String]) -> Result<HarvestSummary, AccountsError> {
        let mut summary = HarvestSummary {
            accounts: accounts.len(),
            ..HarvestSummary::default()
        };

        for (index, login) in accounts.iter().enumerate() {
            emit(
                self.client.progress(),
                Progress::AccountStarted {
                    login: login.clone(),
                    position: index + 1,
                    total: accounts.len(),
                },
            );

            let outcome = self.harvest_account(login).await;
            match &outcome {
                AccountOutcome::Harvested {
                    repositories,
                    failures,
                } => {
                    summary.harvested += 1;
                    summary.failures += failures;
                    emit(
                        self.client.progress(),
                        Progress::AccountFinished {
                            login: login.clone(),
                            repositories: *repositories,
                            failures: *failures,
                        },
                    );
                }
                AccountOutcome::NotFound => {
                    summary.not_found += 1;
                    emit(
                        self.client.progress(),
                        Progress::AccountSkipped {
                            login: login.clone(),
                            reason: "not found".to_string(),
                        },
                    );
                }
                AccountOutcome::Failed { error } => {
                    summary.failed_accounts += 1;
                    summary.failures += 1;
                    emit(
                        self.client.progress(),
                        Progress::AccountSkipped {
                            login: login.clone(),
                            reason: error.clone(),
                        },
                    );
                }
            }

            if outcome.is_terminal() {
                self.progress_log.append(login).await?;
            }
        }

        tracing::info!(
            accounts = summary.accounts,
            harvested = summary.harvested,
            not_found = summary.not_found,
            failures = summary.failures,
            "harvest complete"
        );
        emit(
            self.client.progress(),
            Progress::HarvestComplete {
                accounts: summary.accounts,
                failures: summary.failures,
            },
        );
        Ok(summary)
    }

    /// Harvest one account: profile, gists, repositories, then issues, pull
    /// requests, contributors and subscribers of each repository.
    pub async fn harvest_account(&mut self, login: &str) -> AccountOutcome {
        let account = match self.client.fetch_account(login).await {
            Ok(account) => account,
            Err(e @ FetchError::NotFound { .. }) => {
                tracing::info!(login, "account not found");
                self.fail(ErrorKey::Account(login.to_string()), &e).await;
                return AccountOutcome::NotFound;
            }
            Err(e) => {
                let error = short_error_message(&e);
                self.fail(ErrorKey::Account(login.to_string()), &e).await;
                return AccountOutcome::Failed { error };
            }
        };

        let mut failures = 0;

        let gists = self.client.fetch_gists(&account.login).await;
        failures += self
            .isolate(ErrorKey::Gists(account.login.clone()), gists)
            .await
            .is_none() as usize;

        let repositories = self.client.fetch_repositories(&account.login).await;
        let repositories = self
            .isolate(ErrorKey::Repositories(account.login.clone()), repositories)
            .await;
        let repositories = match repositories {
            Some(repositories) => repositories,
            None => {
                return AccountOutcome::Harvested {
                    repositories: 0,
                    failures: failures + 1,
                };
            }
        };

        for repository in &repositories {
            failures += self.harvest_repository(repository).await;
        }

        AccountOutcome::Harvested {
            repositories: repositories.len(),
            failures,
        }
    }

    /// Fetch every sub-resource of a repository. Returns the failure count.
    async fn harvest_repository(&mut self, repository: &Repository) -> usize {
        let full_name = repository.full_name.clone();
        let mut failures = 0;

        let issues = self.client.fetch_issues(&full_name).await;
        failures += self
            .isolate(ErrorKey::Issues(full_name.clone()), issues)
            .await
            .is_none() as usize;

        let pulls = self.client.fetch_pull_requests(&full_name).await;
        failures += self
            .isolate(ErrorKey::PullRequests(full_name.clone()), pulls)
            .await
            .is_none() as usize;

        let contributors = self.client.fetch_contributors(&full_name).await;
        failures += self
            .isolate(ErrorKey::Contributors(full_name.clone()), contributors)
            .await
            .is_none() as usize;

        let subscribers = self.client.fetch_subscribers(&full_name).await;
        failures += self
            .isolate(ErrorKey::Subscribers(full_name), subscribers)
            .await
            .is_none() as usize;

        failures
    }

    async fn isolate<T>(&self, key: ErrorKey, result: Result<T, FetchError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.fail(key, &e).await;
                None
            }
        }
    }

    async fn fail(&self, key: ErrorKey, error: &FetchError) {
        let message = short_error_message(error);
        tracing::warn!(key = %key, error = %message, "resource failed");

        if let Err(e) = self.errors.record(&key, &error.to_string()).await {
            tracing::error!(key = %key, error = %e, "could not write error artifact");
        }
        emit(
            self.client.progress(),
            Progress::ResourceFailed {
                key: key.to_string(),
                error: message,
            },
        );
    }
}
