//! Neo4j GraphStore over Bolt.
//!
//! Each upsert runs as one transaction of parameterized MERGE statements.
//! The only interpolated fragments are labels and relationship types taken
//! from the closed vocabularies in [`super::model`].

use std::sync::Arc;

use async_trait::async_trait;
use neo4rs::{Graph, Query, query};

use crate::entity::prelude::*;

use super::error::GraphError;
use super::model::{AccountLink, NodeLabel, RelType};
use super::traits::GraphStore;

const CONSTRAINTS: &[&str] = &[
    "CREATE CONSTRAINT repository_id IF NOT EXISTS FOR (r:Repository) REQUIRE r.id IS UNIQUE",
    "CREATE CONSTRAINT license_spdx IF NOT EXISTS FOR (l:License) REQUIRE l.spdxId IS UNIQUE",
    "CREATE CONSTRAINT language_name IF NOT EXISTS FOR (l:Language) REQUIRE l.name IS UNIQUE",
    "CREATE CONSTRAINT topic_name IF NOT EXISTS FOR (t:Topic) REQUIRE t.name IS UNIQUE",
    "CREATE CONSTRAINT gist_id IF NOT EXISTS FOR (g:Gist) REQUIRE g.id IS UNIQUE",
    "CREATE CONSTRAINT issue_id IF NOT EXISTS FOR (i:Issue) REQUIRE i.id IS UNIQUE",
    "CREATE CONSTRAINT pull_request_id IF NOT EXISTS FOR (p:PullRequest) REQUIRE p.id IS UNIQUE",
];

const INDEXES: &[&str] = &[
    "CREATE INDEX account_id_login IF NOT EXISTS FOR (a:Account) ON (a.id, a.login)",
    "CREATE INDEX repository_full_name IF NOT EXISTS FOR (r:Repository) ON (r.fullName)",
    "CREATE INDEX gist_file_key IF NOT EXISTS FOR (f:GistFile) ON (f.gistId, f.name)",
];

const REPOSITORY_CYPHER: &str = r#"
MATCH (owner:Account {id: $owner_id, login: $owner_login})
MERGE (r:Repository {id: $id})
SET r.name = $name,
    r.fullName = $full_name,
    r.description = $description,
    r.homepage = $homepage,
    r.defaultBranch = $default_branch
MERGE (owner)-[:OWNS]->(r)
"#;

const REPOSITORY_LANGUAGE_CYPHER: &str = r#"
MATCH (r:Repository {id: $id})
MERGE (l:Language {name: $language})
MERGE (r)-[:IS_WRITTEN_IN]->(l)
"#;

const REPOSITORY_LICENSE_CYPHER: &str = r#"
MATCH (r:Repository {id: $id})
MERGE (l:License {spdxId: $spdx_id})
SET l.key = $key, l.name = $name, l.url = $url
MERGE (r)-[:HAS_LICENSE]->(l)
"#;

const REPOSITORY_TOPICS_CYPHER: &str = r#"
MATCH (r:Repository {id: $id})
UNWIND $topics AS topic
MERGE (t:Topic {name: topic})
MERGE (r)-[:RELATES_TO]->(t)
"#;

const GIST_CYPHER: &str = r#"
MATCH (owner:Account {id: $owner_id, login: $owner_login})
MERGE (g:Gist {id: $id})
SET g.description = $description
MERGE (owner)-[:CREATED]->(g)
"#;

const GIST_FILE_CYPHER: &str = r#"
MATCH (g:Gist {id: $gist_id})
MERGE (f:GistFile {gistId: $gist_id, name: $name})
SET f.type = $mime_type, f.size = $size
MERGE (l:Language {name: $language})
MERGE (g)-[:CONTAINS]->(f)
MERGE (f)-[:IS_WRITTEN_IN]->(l)
"#;

const REPOSITORY_EXISTS_CYPHER: &str =
    "MATCH (r:Repository {fullName: $full_name}) RETURN count(r) AS c";

/// Cypher that merges an account and sets its kind label.
pub fn account_cypher(kind: AccountKind) -> String {
    let (set, remove) = match kind {
        AccountKind::Individual => (NodeLabel::User, NodeLabel::Organization),
        AccountKind::Organization => (NodeLabel::Organization, NodeLabel::User),
    };
    format!(
        "MERGE (a:{account} {{id: $id, login: $login}})\n\
         SET a:{set}\n\
         REMOVE a:{remove}\n\
         SET a.website = coalesce($website, a.website), a.email = coalesce($email, a.email)",
        account = NodeLabel::Account,
    )
}

/// Cypher that merges an issue or pull request and links it to its
/// repository and author.
pub fn activity_cypher(label: NodeLabel) -> String {
    format!(
        "MATCH (r:{repository} {{fullName: $repository}})\n\
         MATCH (author:{account} {{id: $author_id, login: $author_login}})\n\
         MERGE (n:{label} {{id: $id}})\n\
         SET n.title = $title, n.body = $body, n.createdAt = $created_at\n\
         MERGE (r)-[:{has}]->(n)\n\
         MERGE (author)-[:{created}]->(n)",
        repository = NodeLabel::Repository,
        account = NodeLabel::Account,
        has = RelType::Has,
        created = RelType::Created,
    )
}

/// Cypher that links an account to a repository.
pub fn link_cypher(link: AccountLink) -> String {
    format!(
        "MATCH (r:{repository} {{id: $repo_id}})\n\
         MATCH (a:{account} {{id: $id, login: $login}})\n\
         MERGE (a)-[:{rel}]->(r)",
        repository = NodeLabel::Repository,
        account = NodeLabel::Account,
        rel = link.rel_type(),
    )
}

/// Neo4j integers are signed; ids past `i64::MAX` are rejected, not wrapped.
fn graph_id(id: u64) -> Result<i64, GraphError> {
    i64::try_from(id).map_err(|_| GraphError::IdOutOfRange(id))
}

/// Schema statements that fail only because an equivalent rule exists.
fn is_existing_schema_rule(message: &str) -> bool {
    message.contains("AlreadyExists") || message.to_ascii_lowercase().contains("already exists")
}

fn account_query(account: &Account) -> Result<Query, GraphError> {
    Ok(query(&account_cypher(account.kind))
        .param("id", graph_id(account.id)?)
        .param("login", account.login.clone())
        .param("website", account.website.clone())
        .param("email", account.email.clone()))
}

/// Client for a Neo4j database.
pub struct Neo4jGraph {
    graph: Arc<Graph>,
}

impl Neo4jGraph {
    /// Connect to Neo4j.
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, GraphError> {
        let graph = Graph::new(uri, user, password)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;
        Ok(Self {
            graph: Arc::new(graph),
        })
    }

    async fn run_in_txn(
        &self,
        operation: &'static str,
        queries: Vec<Query>,
    ) -> Result<(), GraphError> {
        let mut txn = self
            .graph
            .start_txn()
            .await
            .map_err(|e| GraphError::write(operation, e))?;
        txn.run_queries(queries)
            .await
            .map_err(|e| GraphError::write(operation, e))?;
        txn.commit()
            .await
            .map_err(|e| GraphError::write(operation, e))
    }

    async fn count(&self, q: Query) -> Result<usize, GraphError> {
        let mut result = self
            .graph
            .execute(q)
            .await
            .map_err(|e| GraphError::Decode(e.to_string()))?;
        let row = result
            .next()
            .await
            .map_err(|e| GraphError::Decode(e.to_string()))?
            .ok_or_else(|| GraphError::Decode("count query returned no rows".to_string()))?;
        let count: i64 = row
            .get("c")
            .map_err(|e| GraphError::Decode(e.to_string()))?;
        usize::try_from(count).map_err(|e| GraphError::Decode(e.to_string()))
    }

    async fn ensure_repository(&self, full_name: &str) -> Result<(), GraphError> {
        let found = self
            .count(query(REPOSITORY_EXISTS_CYPHER).param("full_name", full_name.to_string()))
            .await?;
        if found == 0 {
            return Err(GraphError::MissingNode {
                label: NodeLabel::Repository.as_str(),
                key: full_name.to_string(),
            });
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn upsert_activity(
        &self,
        operation: &'static str,
        label: NodeLabel,
        id: u64,
        title: &str,
        body: &Option<String>,
        created_at: String,
        author: &Account,
        repository: &str,
    ) -> Result<(), GraphError> {
        self.ensure_repository(repository).await?;

        let activity = query(&activity_cypher(label))
            .param("repository", repository.to_string())
            .param("author_id", graph_id(author.id)?)
            .param("author_login", author.login.clone())
            .param("id", graph_id(id)?)
            .param("title", title.to_string())
            .param("body", body.clone())
            .param("created_at", created_at);

        self.run_in_txn(operation, vec![account_query(author)?, activity])
            .await
    }
}

#[async_trait]
impl GraphStore for Neo4jGraph {
    async fn ensure_schema(&self) -> Result<(), GraphError> {
        for statement in CONSTRAINTS.iter().chain(INDEXES) {
            match self.graph.run(query(statement)).await {
                Ok(()) => {}
                Err(e @ (neo4rs::Error::IOError { .. } | neo4rs::Error::ConnectionError)) => {
                    return Err(GraphError::Connection(e.to_string()));
                }
                Err(e) if is_existing_schema_rule(&e.to_string()) => {
                    tracing::debug!("Schema rule already present: {}", e);
                }
                Err(e) => return Err(GraphError::write("schema", e)),
            }
        }
        Ok(())
    }

    async fn upsert_account(&self, account: &Account) -> Result<(), GraphError> {
        self.run_in_txn("account", vec![account_query(account)?])
            .await
    }

    async fn upsert_gist(&self, gist: &Gist) -> Result<(), GraphError> {
        let mut queries = vec![
            account_query(&gist.owner)?,
            query(GIST_CYPHER)
                .param("owner_id", graph_id(gist.owner.id)?)
                .param("owner_login", gist.owner.login.clone())
                .param("id", gist.id.clone())
                .param("description", gist.description.clone()),
        ];
        for file in &gist.files {
            queries.push(
                query(GIST_FILE_CYPHER)
                    .param("gist_id", gist.id.clone())
                    .param("name", file.filename.clone())
                    .param("mime_type", file.mime_type.clone())
                    .param("size", graph_id(file.size)?)
                    .param("language", file.language.clone()),
            );
        }
        self.run_in_txn("gist", queries).await
    }

    async fn upsert_repository(&self, repository: &Repository) -> Result<(), GraphError> {
        let id = graph_id(repository.id)?;
        let mut queries = vec![
            account_query(&repository.owner)?,
            query(REPOSITORY_CYPHER)
                .param("owner_id", graph_id(repository.owner.id)?)
                .param("owner_login", repository.owner.login.clone())
                .param("id", id)
                .param("name", repository.name.clone())
                .param("full_name", repository.full_name.clone())
                .param("description", repository.description.clone())
                .param("homepage", repository.homepage.clone())
                .param("default_branch", repository.default_branch.clone()),
        ];

        if let Some(language) = &repository.language {
            queries.push(
                query(REPOSITORY_LANGUAGE_CYPHER)
                    .param("id", id)
                    .param("language", language.clone()),
            );
        }

        if let Some(license) = &repository.license {
            queries.push(
                query(REPOSITORY_LICENSE_CYPHER)
                    .param("id", id)
                    .param("spdx_id", license.identity().to_string())
                    .param("key", license.key.clone())
                    .param("name", license.name.clone())
                    .param("url", license.url.clone()),
            );
        }

        if !repository.topics.is_empty() {
            let topics: Vec<String> = repository.topics.iter().cloned().collect();
            queries.push(
                query(REPOSITORY_TOPICS_CYPHER)
                    .param("id", id)
                    .param("topics", topics),
            );
        }

        self.run_in_txn("repository", queries).await
    }

    async fn upsert_issue(&self, issue: &Issue) -> Result<(), GraphError> {
        self.upsert_activity(
            "issue",
            NodeLabel::Issue,
            issue.id,
            &issue.title,
            &issue.body,
            issue.created_at.to_rfc3339(),
            &issue.user,
            &issue.repository,
        )
        .await
    }

    async fn upsert_pull_request(&self, pull_request: &PullRequest) -> Result<(), GraphError> {
        self.upsert_activity(
            "pull request",
            NodeLabel::PullRequest,
            pull_request.id,
            &pull_request.title,
            &pull_request.body,
            pull_request.created_at.to_rfc3339(),
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
        self.ensure_repository(&repository.full_name).await?;

        let link_query = query(&link_cypher(link))
            .param("repo_id", graph_id(repository.id)?)
            .param("id", graph_id(account.id)?)
            .param("login", account.login.clone());
        self.run_in_txn("account link", vec![account_query(account)?, link_query])
            .await
    }

    async fn count_nodes(&self, label: NodeLabel) -> Result<usize, GraphError> {
        self.count(query(&format!("MATCH (n:{label}) RETURN count(n) AS c")))
            .await
    }

    async fn count_relationships(&self, rel: RelType) -> Result<usize, GraphError> {
        self.count(query(&format!("MATCH ()-[r:{rel}]->() RETURN count(r) AS c")))
            .await
    }
}
