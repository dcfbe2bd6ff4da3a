//! Account lists: the input names file, the progress log of finished
//! accounts, and seeding the names file from a JSON-lines dump.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Default number of names taken by [`extract_names`].
pub const DEFAULT_EXTRACT_LIMIT: usize = 600;

#[derive(Debug, Error)]
pub enum AccountsError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line} is not valid JSON: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl AccountsError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Parse account names: one per line, trimmed, blank lines dropped.
pub fn parse_account_names(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read the account names file.
pub async fn read_account_names(path: &Path) -> Result<Vec<String>, AccountsError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AccountsError::io(path, e))?;
    Ok(parse_account_names(&text))
}

/// Names from `all` that are not in `done`, in input order.
pub fn pending_accounts(all: &[String], done: &HashSet<String>) -> Vec<String> {
    all.iter().filter(|name| !done.contains(*name)).cloned().collect()
}

/// Collect the `login` field of the first `limit` records of a JSON-lines dump.
///
/// Blank lines are ignored. Records without a string `login` are skipped
/// but still count toward the limit.
pub fn extract_names(jsonl: &str, limit: usize) -> Result<Vec<String>, AccountsError> {
    let mut names = Vec::new();
    let records = jsonl
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .take(limit);

    for (index, line) in records {
        let record: serde_json::Value =
            serde_json::from_str(line).map_err(|source| AccountsError::Json {
                line: index + 1,
                source,
            })?;
        if let Some(login) = record.get("login").and_then(serde_json::Value::as_str) {
            names.push(login.to_string());
        }
    }
    Ok(names)
}

/// Append-only log of accounts that reached a terminal outcome.
#[derive(Debug, Clone)]
pub struct ProgressLog {
    path: PathBuf,
}

impl ProgressLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names already logged. A missing log is empty.
    pub async fn load(&self) -> Result<HashSet<String>, AccountsError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(parse_account_names(&text).into_iter().collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashSet::new()),
            Err(e) => Err(AccountsError::io(&self.path, e)),
        }
    }

    /// Append one name and flush it to disk.
    pub async fn append(&self, name: &str) -> Result<(), AccountsError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AccountsError::io(parent, e))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| AccountsError::io(&self.path, e))?;
        file.write_all(format!("{name}\n").as_bytes())
            .await
            .map_err(|e| AccountsError::io(&self.path, e))?;
        file.sync_data()
            .await
            .map_err(|e| AccountsError::io(&self.path, e))?;
        Ok(())
    }
}
