//! Resource locators: every remote resource the harvester reads.
//!
//! A locator renders to an API path relative to the base URL, and the path
//! renders to a cache file name by replacing `/` with `__` and appending
//! `.json`. [`Locator::from_cache_file_name`] inverts that mapping.

use std::fmt;

const CACHE_SUFFIX: &str = ".json";
const PATH_SEPARATOR_ESCAPE: &str = "__";

/// A remote resource, identified by the account or repository it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// `users/{login}`
    Account(String),
    /// `users/{login}/repos`
    AccountRepositories(String),
    /// `users/{login}/gists`
    AccountGists(String),
    /// `repos/{owner}/{name}/issues`
    RepositoryIssues(String),
    /// `repos/{owner}/{name}/pulls`
    RepositoryPulls(String),
    /// `repos/{owner}/{name}/contributors`
    RepositoryContributors(String),
    /// `repos/{owner}/{name}/subscribers`
    RepositorySubscribers(String),
    /// `rate_limit`
    RateLimit,
}

impl Locator {
    /// API path relative to the base URL, without a leading slash.
    pub fn path(&self) -> String {
        match self {
            Self::Account(login) => format!("users/{login}"),
            Self::AccountRepositories(login) => format!("users/{login}/repos"),
            Self::AccountGists(login) => format!("users/{login}/gists"),
            Self::RepositoryIssues(full_name) => format!("repos/{full_name}/issues"),
            Self::RepositoryPulls(full_name) => format!("repos/{full_name}/pulls"),
            Self::RepositoryContributors(full_name) => format!("repos/{full_name}/contributors"),
            Self::RepositorySubscribers(full_name) => format!("repos/{full_name}/subscribers"),
            Self::RateLimit => "rate_limit".to_string(),
        }
    }

    /// Absolute URL under `base_url`.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.path())
    }

    /// File name of this resource's cache artifact.
    pub fn cache_file_name(&self) -> String {
        let mut name = self.path().replace('/', PATH_SEPARATOR_ESCAPE);
        name.push_str(CACHE_SUFFIX);
        name
    }

    /// Recover a locator from a cache file name.
    ///
    /// Returns `None` for files that are not cache artifacts.
    pub fn from_cache_file_name(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(CACHE_SUFFIX)?;
        let segments: Vec<&str> = stem.split(PATH_SEPARATOR_ESCAPE).collect();

        match segments.as_slice() {
            ["rate_limit"] => Some(Self::RateLimit),
            ["users", login] => Some(Self::Account(login.to_string())),
            ["users", login, "repos"] => Some(Self::AccountRepositories(login.to_string())),
            ["users", login, "gists"] => Some(Self::AccountGists(login.to_string())),
            ["repos", owner, name, resource] => {
                let full_name = format!("{owner}/{name}");
                match *resource {
                    "issues" => Some(Self::RepositoryIssues(full_name)),
                    "pulls" => Some(Self::RepositoryPulls(full_name)),
                    "contributors" => Some(Self::RepositoryContributors(full_name)),
                    "subscribers" => Some(Self::RepositorySubscribers(full_name)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Whether reads of this resource are exempt from caching and quota.
    #[inline]
    pub fn is_quota_endpoint(&self) -> bool {
        matches!(self, Self::RateLimit)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
