//! In-memory GraphStore.
//!
//! Backs dry runs and tests. Nodes and relationships live in
//! `tokio::sync::RwLock` collections keyed by natural key, so merges are
//! plain map inserts.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::RwLock;

use crate::entity::prelude::*;

use super::error::GraphError;
use super::model::{AccountLink, NodeKey, NodeLabel, RelType};
use super::traits::GraphStore;

/// A stored node: its labels and properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeRecord {
    pub labels: BTreeSet<NodeLabel>,
    pub properties: BTreeMap<&'static str, Value>,
}

impl NodeRecord {
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn has_label(&self, label: NodeLabel) -> bool {
        self.labels.contains(&label)
    }
}

type Relationship = (NodeKey, RelType, NodeKey);

/// Property graph held in memory.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    nodes: RwLock<HashMap<NodeKey, NodeRecord>>,
    relationships: RwLock<HashSet<Relationship>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The node stored under `key`.
    pub async fn node(&self, key: &NodeKey) -> Option<NodeRecord> {
        self.nodes.read().await.get(key).cloned()
    }

    /// Whether `from -[rel]-> to` exists.
    pub async fn has_relationship(&self, from: &NodeKey, rel: RelType, to: &NodeKey) -> bool {
        self.relationships
            .read()
            .await
            .contains(&(from.clone(), rel, to.clone()))
    }

    /// Keys reached from `from` over `rel`, sorted.
    pub async fn targets(&self, from: &NodeKey, rel: RelType) -> Vec<NodeKey> {
        let mut targets: Vec<NodeKey> = self
            .relationships
            .read()
            .await
            .iter()
            .filter(|(f, r, _)| f == from && *r == rel)
            .map(|(_, _, to)| to.clone())
            .collect();
        targets.sort();
        targets
    }

    /// Keys of all nodes carrying `label`, sorted.
    pub async fn keys_with_label(&self, label: NodeLabel) -> Vec<NodeKey> {
        let mut keys: Vec<NodeKey> = self
            .nodes
            .read()
            .await
            .iter()
            .filter(|(_, node)| node.has_label(label))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub async fn node_count(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn relationship_count(&self) -> usize {
        self.relationships.read().await.len()
    }

    async fn repository_key(&self, full_name: &str) -> Result<NodeKey, GraphError> {
        self.nodes
            .read()
            .await
            .iter()
            .find(|(key, node)| {
                matches!(key, NodeKey::Repository(_))
                    && node.property("fullName").and_then(Value::as_str) == Some(full_name)
            })
            .map(|(key, _)| key.clone())
            .ok_or_else(|| GraphError::MissingNode {
                label: NodeLabel::Repository.as_str(),
                key: full_name.to_string(),
            })
    }

    async fn merge_activity(
        &self,
        label: NodeLabel,
        key: NodeKey,
        properties: [(&'static str, Value); 3],
        author: &Account,
        repository: &str,
    ) -> Result<(), GraphError> {
        let repository = self.repository_key(repository).await?;
        self.upsert_account(author).await?;

        let mut nodes = self.nodes.write().await;
        let mut rels = self.relationships.write().await;
        let node = merge_node(&mut nodes, key.clone(), label);
        for (name, value) in properties {
            node.properties.insert(name, value);
        }
        rels.insert((repository, RelType::Has, key.clone()));
        rels.insert((account_key(author), RelType::Created, key));
        Ok(())
    }
}

fn account_key(account: &Account) -> NodeKey {
    NodeKey::account(account.id, account.login.clone())
}

fn merge_node(
    nodes: &mut HashMap<NodeKey, NodeRecord>,
    key: NodeKey,
    label: NodeLabel,
) -> &mut NodeRecord {
    let node = nodes.entry(key).or_default();
    node.labels.insert(label);
    node
}

fn optional(value: &Option<String>) -> Value {
    value.as_deref().map_or(Value::Null, |s| json!(s))
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn ensure_schema(&self) -> Result<(), GraphError> {
        Ok(())
    }

    async fn upsert_account(&self, account: &Account) -> Result<(), GraphError> {
        let mut nodes = self.nodes.write().await;
        let node = merge_node(&mut nodes, account_key(account), NodeLabel::Account);

        let kind_label = NodeLabel::for_kind(account.kind);
        node.labels.remove(&NodeLabel::User);
        node.labels.remove(&NodeLabel::Organization);
        node.labels.insert(kind_label);

        node.properties.insert("id", json!(account.id));
        node.properties.insert("login", json!(account.login));
        if let Some(website) = &account.website {
            node.properties.insert("website", json!(website));
        }
        if let Some(email) = &account.email {
            node.properties.insert("email", json!(email));
        }
        Ok(())
    }

    async fn upsert_gist(&self, gist: &Gist) -> Result<(), GraphError> {
        self.upsert_account(&gist.owner).await?;

        let mut nodes = self.nodes.write().await;
        let mut rels = self.relationships.write().await;

        let gist_key = NodeKey::Gist(gist.id.clone());
        let node = merge_node(&mut nodes, gist_key.clone(), NodeLabel::Gist);
        node.properties.insert("id", json!(gist.id));
        node.properties
            .insert("description", optional(&gist.description));
        rels.insert((account_key(&gist.owner), RelType::Created, gist_key.clone()));

        for file in &gist.files {
            let file_key = NodeKey::GistFile {
                gist_id: gist.id.clone(),
                name: file.filename.clone(),
            };
            let node = merge_node(&mut nodes, file_key.clone(), NodeLabel::GistFile);
            node.properties.insert("gistId", json!(gist.id));
            node.properties.insert("name", json!(file.filename));
            node.properties.insert("type", json!(file.mime_type));
            node.properties.insert("size", json!(file.size));

            let language_key = NodeKey::Language(file.language.clone());
            merge_node(&mut nodes, language_key.clone(), NodeLabel::Language)
                .properties
                .insert("name", json!(file.language));

            rels.insert((gist_key.clone(), RelType::Contains, file_key.clone()));
            rels.insert((file_key, RelType::IsWrittenIn, language_key));
        }
        Ok(())
    }

    async fn upsert_repository(&self, repository: &Repository) -> Result<(), GraphError> {
        self.upsert_account(&repository.owner).await?;

        let mut nodes = self.nodes.write().await;
        let mut rels = self.relationships.write().await;

        let repo_key = NodeKey::Repository(repository.id);
        let node = merge_node(&mut nodes, repo_key.clone(), NodeLabel::Repository);
        node.properties.insert("id", json!(repository.id));
        node.properties.insert("name", json!(repository.name));
        node.properties
            .insert("fullName", json!(repository.full_name));
        node.properties
            .insert("description", optional(&repository.description));
        node.properties
            .insert("homepage", optional(&repository.homepage));
        node.properties
            .insert("defaultBranch", json!(repository.default_branch));
        rels.insert((account_key(&repository.owner), RelType::Owns, repo_key.clone()));

        if let Some(language) = &repository.language {
            let key = NodeKey::Language(language.clone());
            merge_node(&mut nodes, key.clone(), NodeLabel::Language)
                .properties
                .insert("name", json!(language));
            rels.insert((repo_key.clone(), RelType::IsWrittenIn, key));
        }

        if let Some(license) = &repository.license {
            let key = NodeKey::License(license.identity().to_string());
            let node = merge_node(&mut nodes, key.clone(), NodeLabel::License);
            node.properties.insert("spdxId", json!(license.identity()));
            node.properties.insert("key", json!(license.key));
            node.properties.insert("name", json!(license.name));
            node.properties.insert("url", optional(&license.url));
            rels.insert((repo_key.clone(), RelType::HasLicense, key));
        }

        for topic in &repository.topics {
            let key = NodeKey::Topic(topic.clone());
            merge_node(&mut nodes, key.clone(), NodeLabel::Topic)
                .properties
                .insert("name", json!(topic));
            rels.insert((repo_key.clone(), RelType::RelatesTo, key));
        }
        Ok(())
    }

    async fn upsert_issue(&self, issue: &Issue) -> Result<(), GraphError> {
        self.merge_activity(
            NodeLabel::Issue,
            NodeKey::Issue(issue.id),
            [
                ("title", json!(issue.title)),
                ("body", optional(&issue.body)),
                ("createdAt", json!(issue.created_at.to_rfc3339())),
            ],
            &issue.user,
            &issue.repository,
        )
        .await
    }

    async fn upsert_pull_request(&self, pull_request: &PullRequest) -> Result<(), GraphError> {
        self.merge_activity(
            NodeLabel::PullRequest,
            NodeKey::PullRequest(pull_request.id),
            [
                ("title", json!(pull_request.title)),
                ("body", optional(&pull_request.body)),
                ("createdAt", json!(pull_request.created_at.to_rfc3339())),
            ],
            &pull_request.user,
            &pull_request.repository,
        )
        .await
    }

    async fn link_account(
        &self,
        account: &Account,
        link: AccountLink,
        repository: &Repository,
    ) -> Result<(), GraphError> {
        let repo_key = NodeKey::Repository(repository.id);
        if !self.nodes.read().await.contains_key(&repo_key) {
            return Err(GraphError::MissingNode {
                label: NodeLabel::Repository.as_str(),
                key: repository.full_name.clone(),
            });
        }
        self.upsert_account(account).await?;
        self.relationships
            .write()
            .await
            .insert((account_key(account), link.rel_type(), repo_key));
        Ok(())
    }

    async fn count_nodes(&self, label: NodeLabel) -> Result<usize, GraphError> {
        Ok(self
            .nodes
            .read()
            .await
            .values()
            .filter(|node| node.has_label(label))
            .count())
    }

    async fn count_relationships(&self, rel: RelType) -> Result<usize, GraphError> {
        Ok(self
            .relationships
            .read()
            .await
            .iter()
            .filter(|(_, r, _)| *r == rel)
            .count())
    }
}
