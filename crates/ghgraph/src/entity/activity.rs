//! Issues and pull requests.
//!
//! Both carry the full name of their repository instead of a reference to
//! it. GitHub's list payloads do not embed that name in a uniform place, so
//! it is attached by the reader that knows which repository it asked for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::Account;

/// An issue opened against a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    /// Author.
    pub user: Account,
    pub created_at: DateTime<Utc>,
    /// `owner/name` of the repository this issue belongs to.
    #[serde(default)]
    pub repository: String,
}

/// A pull request opened against a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    /// Author.
    pub user: Account,
    pub created_at: DateTime<Utc>,
    /// `owner/name` of the repository this pull request targets.
    #[serde(default)]
    pub repository: String,
}

/// Records that belong to a repository by name.
pub trait RepositoryActivity {
    fn set_repository(&mut self, full_name: &str);
}

impl RepositoryActivity for Issue {
    fn set_repository(&mut self, full_name: &str) {
        self.repository = full_name.to_string();
    }
}

impl RepositoryActivity for PullRequest {
    fn set_repository(&mut self, full_name: &str) {
        self.repository = full_name.to_string();
    }
}

/// Parse a list artifact and stamp every record with `full_name`.
pub fn parse_for_repository<T>(bytes: &[u8], full_name: &str) -> Result<Vec<T>, serde_json::Error>
where
    T: RepositoryActivity + serde::de::DeserializeOwned,
{
    let mut items: Vec<T> = super::parse_list(bytes)?;
    for item in &mut items {
        item.set_repository(full_name);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUES: &str = r#"[
        {
            "id": 1,
            "number": 1347,
            "title": "Found a bug",
            "body": "I'm having a problem with this.",
            "user": { "login": "octocat", "id": 1, "type": "User" },
            "created_at": "2011-04-22T13:33:48Z",
            "repository_url": "https://api.github.com/repos/octocat/Hello-World"
        },
        {
            "id": 2,
            "title": "No body",
            "body": null,
            "user": { "login": "hubot", "id": 2 },
            "created_at": "2012-01-01T00:00:00Z"
        }
    ]"#;

    #[test]
    fn issues_are_stamped_with_repository() {
        let issues: Vec<Issue> =
            parse_for_repository(ISSUES.as_bytes(), "octocat/Hello-World").unwrap();

        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.repository == "octocat/Hello-World"));
        assert_eq!(issues[0].user.login, "octocat");
        assert_eq!(issues[1].body, None);
        assert_eq!(issues[0].created_at.to_rfc3339(), "2011-04-22T13:33:48+00:00");
    }

    #[test]
    fn pull_requests_parse_from_empty_artifact() {
        let pulls: Vec<PullRequest> = parse_for_repository(b"[]", "octocat/Hello-World").unwrap();
        assert!(pulls.is_empty());
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        let result: Result<Vec<PullRequest>, _> = parse_for_repository(
            br#"[{"id":1,"title":"t","user":{"login":"a","id":1},"created_at":"yesterday"}]"#,
            "a/b",
        );
        assert!(result.is_err());
    }
}
