//! Repositories and their licenses.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::account::Account;
use super::non_empty;

/// A repository license as embedded in the repository payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// GitHub's license key (e.g. `"mit"`).
    pub key: String,
    /// Display name.
    pub name: String,
    /// SPDX identifier. GitHub returns `null` for some licenses.
    #[serde(default)]
    pub spdx_id: Option<String>,
    /// Reference URL. GitHub returns `null` for unrecognized licenses.
    #[serde(default)]
    pub url: Option<String>,
}

impl License {
    /// Graph identity: the SPDX id, or the license key when GitHub has none.
    pub fn identity(&self) -> &str {
        self.spdx_id.as_deref().unwrap_or(&self.key)
    }
}

/// A repository owned by an [`Account`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    /// Short name (`Hello-World`).
    pub name: String,
    /// Fully-qualified name (`octocat/Hello-World`).
    pub full_name: String,
    pub owner: Account,
    /// Primary language, if GitHub detected one.
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub homepage: Option<String>,
    pub default_branch: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub license: Option<License>,
    /// Topic strings. Order is irrelevant and duplicates collapse.
    #[serde(default, deserialize_with = "topics")]
    pub topics: BTreeSet<String>,
}

impl Repository {
    /// The owner login taken from `full_name`, falling back to the embedded owner.
    pub fn owner_login(&self) -> &str {
        self.full_name
            .split_once('/')
            .map(|(owner, _)| owner)
            .unwrap_or(&self.owner.login)
    }
}

fn topics<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let topics = Option::<Vec<String>>::deserialize(deserializer)?;
    Ok(topics.unwrap_or_default().into_iter().collect())
}
