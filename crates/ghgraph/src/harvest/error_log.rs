//! One file per failed unit of work.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::accounts::AccountsError;

/// The unit of work a failure belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKey {
    Account(String),
    Gists(String),
    Repositories(String),
    Issues(String),
    PullRequests(String),
    Contributors(String),
    Subscribers(String),
}

impl ErrorKey {
    /// File name of the error artifact for this key.
    pub fn file_name(&self) -> String {
        self.to_string().replace('/', "__")
    }
}

impl fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account(login) => write!(f, "__user__{login}"),
            Self::Gists(login) => write!(f, "{login}/gists"),
            Self::Repositories(login) => write!(f, "{login}/repos"),
            Self::Issues(full_name) => write!(f, "{full_name}/issues"),
            Self::PullRequests(full_name) => write!(f, "{full_name}/pullrequests"),
            Self::Contributors(full_name) => write!(f, "{full_name}/contributors"),
            Self::Subscribers(full_name) => write!(f, "{full_name}/subscriptions"),
        }
    }
}

/// Directory of error artifacts. A later failure for the same key
/// replaces the earlier artifact.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    dir: PathBuf,
}

impl ErrorLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &ErrorKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Write `detail` as the artifact for `key`.
    pub async fn record(&self, key: &ErrorKey, detail: &str) -> Result<(), AccountsError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| AccountsError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.path_for(key);
        tokio::fs::write(&path, format!("{detail}\n"))
            .await
            .map_err(|source| AccountsError::Io { path, source })
    }
}
