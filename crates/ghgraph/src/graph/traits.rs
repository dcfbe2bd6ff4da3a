//! GraphStore trait definition.

use async_trait::async_trait;

use crate::entity::prelude::*;

use super::error::GraphError;
use super::model::{AccountLink, NodeLabel, RelType};

/// Idempotent writes of harvested entities into a property graph.
///
/// Every write merges on natural keys, both for nodes and for
/// relationships, so replaying the same entities leaves the graph unchanged.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create constraints and indexes on natural keys, if missing.
    async fn ensure_schema(&self) -> Result<(), GraphError>;

    /// Merge an account node.
    ///
    /// Website and email are only overwritten by present values, so an
    /// account seen again through an embedded payload keeps its profile data.
    async fn upsert_account(&self, account: &Account) -> Result<(), GraphError>;

    /// Merge a gist, its owner, its files and their languages.
    async fn upsert_gist(&self, gist: &Gist) -> Result<(), GraphError>;

    /// Merge a repository, its owner, language, license and topics.
    async fn upsert_repository(&self, repository: &Repository) -> Result<(), GraphError>;

    /// Merge an issue and its author, linked to the repository named by
    /// `issue.repository`, which must already be in the graph.
    async fn upsert_issue(&self, issue: &Issue) -> Result<(), GraphError>;

    /// Merge a pull request and its author, linked like an issue.
    async fn upsert_pull_request(&self, pull_request: &PullRequest) -> Result<(), GraphError>;

    /// Merge `account` and link it to an existing repository.
    async fn link_account(
        &self,
        account: &Account,
        link: AccountLink,
        repository: &Repository,
    ) -> Result<(), GraphError>;

    /// Number of nodes carrying `label`.
    async fn count_nodes(&self, label: NodeLabel) -> Result<usize, GraphError>;

    /// Number of relationships of type `rel`.
    async fn count_relationships(&self, rel: RelType) -> Result<usize, GraphError>;
}
