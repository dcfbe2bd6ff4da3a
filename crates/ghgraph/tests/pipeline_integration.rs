//! End-to-end tests: harvest into a cache directory, then import the cache
//! into the in-memory graph.
//!
//! The remote API is a scripted transport; nothing here opens a socket.
//!
//! Key scenarios tested:
//! - Repository topics, language and license become MERGEd relationships
//! - Re-importing leaves node and relationship counts unchanged
//! - Missing accounts are skipped by both halves of the pipeline
//! - A failed resource is recorded and imports as nothing
//! - Not-found and blank account artifacts import as nothing
//! - Cached resources never cost quota a second time

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ghgraph::graph::{NodeKey, NodeLabel, RelType};
use ghgraph::harvest::ErrorKey;
use ghgraph::http::{HttpError, HttpRequest, HttpResponse, HttpTransport};
use ghgraph::retry::RetryConfig;
use ghgraph::{
    ErrorLog, FetchClient, FetchClientConfig, FsCacheStore, GraphStore, HarvestSummary, Harvester,
    ImportOutcome, Importer, MemoryGraph, ProgressLog,
};
use tempfile::TempDir;

const BASE: &str = "https://api.test";

/// If exceeded, the pipeline is likely stuck waiting on the quota.
const PIPELINE_TIMEOUT: Duration = Duration::from_secs(10);

const HELLO_WORLD_ID: u64 = 1296269;
const SPOON_KNIFE_ID: u64 = 1300192;

/// Answers every GET from a fixed route table and counts requests.
#[derive(Default)]
struct ScriptedTransport {
    routes: HashMap<String, HttpResponse>,
    hits: Mutex<HashMap<String, usize>>,
}

impl ScriptedTransport {
    fn route(&mut self, path: &str, status: u16, body: &str) {
        self.routes
            .insert(format!("{BASE}/{path}"), HttpResponse::new(status, body));
    }

    fn hits(&self, path: &str) -> usize {
        self.hits
            .lock()
            .unwrap()
            .get(&format!("{BASE}/{path}"))
            .copied()
            .unwrap_or(0)
    }

    fn billable_hits(&self) -> usize {
        self.hits
            .lock()
            .unwrap()
            .iter()
            .filter(|(url, _)| !url.ends_with("/rate_limit"))
            .map(|(_, count)| count)
            .sum()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        *self
            .hits
            .lock()
            .unwrap()
            .entry(request.url.clone())
            .or_default() += 1;
        self.routes
            .get(&request.url)
            .cloned()
            .ok_or(HttpError::NoMockResponse { url: request.url })
    }
}

fn scripted_github() -> ScriptedTransport {
    let reset = Utc::now().timestamp() + 3600;
    let octocat = r#"{"login":"octocat","id":1,"type":"User"}"#;
    let hubot = r#"{"login":"hubot","id":2,"type":"User"}"#;

    let mut transport = ScriptedTransport::default();
    transport.route(
        "rate_limit",
        200,
        &format!(
            r#"{{"resources":{{"core":{{"limit":5000,"used":0,"remaining":5000,"reset":{reset}}}}}}}"#
        ),
    );

    transport.route(
        "users/octocat",
        200,
        r#"{"login":"octocat","id":1,"type":"User","blog":"https://github.blog","email":""}"#,
    );
    transport.route("users/ghost-missing", 404, r#"{"message":"Not Found"}"#);

    transport.route(
        "users/octocat/gists",
        200,
        &format!(
            r#"[{{
                "id": "aa5a315d61ae9438b18d",
                "description": "notes",
                "owner": {octocat},
                "files": {{
                    "notes.txt": {{"filename":"notes.txt","type":"text/plain","language":null,"size":12}},
                    "blob.bin": {{"filename":"blob.bin","type":"application/octet-stream","language":null,"size":4}},
                    "main.rs": {{"filename":"main.rs","type":"text/plain","language":"Rust","size":40}}
                }}
            }}]"#
        ),
    );

    transport.route(
        "users/octocat/repos",
        200,
        &format!(
            r#"[
                {{
                    "id": {HELLO_WORLD_ID}, "name": "Hello-World", "full_name": "octocat/Hello-World",
                    "owner": {octocat}, "language": "C", "homepage": "", "default_branch": "master",
                    "description": "My first repository on GitHub!",
                    "license": {{"key":"mit","name":"MIT License","spdx_id":"mit","url":null}},
                    "topics": ["demo", "sample"]
                }},
                {{
                    "id": {SPOON_KNIFE_ID}, "name": "Spoon-Knife", "full_name": "octocat/Spoon-Knife",
                    "owner": {octocat}, "language": null, "default_branch": "main",
                    "license": null, "topics": null
                }}
            ]"#
        ),
    );

    transport.route(
        "repos/octocat/Hello-World/issues",
        200,
        &format!(
            r#"[{{"id":501,"title":"Found a bug","body":null,"user":{hubot},"created_at":"2011-04-22T13:33:48Z"}}]"#
        ),
    );
    transport.route(
        "repos/octocat/Hello-World/pulls",
        200,
        &format!(
            r#"[{{"id":601,"title":"Fix the bug","body":"Closes the issue","user":{hubot},"created_at":"2011-04-23T09:00:00Z"}}]"#
        ),
    );
    transport.route(
        "repos/octocat/Hello-World/contributors",
        200,
        &format!("[{hubot}]"),
    );
    transport.route("repos/octocat/Hello-World/subscribers", 204, "");

    transport.route(
        "repos/octocat/Spoon-Knife/issues",
        500,
        r#"{"message":"Server Error"}"#,
    );
    transport.route("repos/octocat/Spoon-Knife/pulls", 200, "[]");
    transport.route("repos/octocat/Spoon-Knife/contributors", 200, "[]");
    transport.route("repos/octocat/Spoon-Knife/subscribers", 200, "[]");

    transport
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn cache(&self) -> Arc<FsCacheStore> {
        Arc::new(FsCacheStore::new(self.dir.path().join(".cached_results")))
    }

    fn errors(&self) -> ErrorLog {
        ErrorLog::new(self.dir.path().join(".errors"))
    }

    fn progress_log(&self) -> ProgressLog {
        ProgressLog::new(self.dir.path().join(".fetched_users.txt"))
    }

    async fn harvest(&self, transport: &Arc<ScriptedTransport>, accounts: &[&str]) -> HarvestSummary {
        let config = FetchClientConfig {
            base_url: BASE.to_string(),
            retry: RetryConfig::disabled(),
            ..FetchClientConfig::default()
        };
        let client = FetchClient::with_transport(
            config,
            Arc::clone(transport) as Arc<dyn HttpTransport>,
            self.cache(),
        );
        let mut harvester = Harvester::new(client, self.errors(), self.progress_log());
        let accounts: Vec<String> = accounts.iter().map(|s| s.to_string()).collect();

        tokio::time::timeout(PIPELINE_TIMEOUT, harvester.run(&accounts))
            .await
            .expect("harvest timed out")
            .expect("harvest failed")
    }

    fn importer(&self, graph: &Arc<MemoryGraph>) -> Importer {
        Importer::new(self.cache(), Arc::clone(graph) as Arc<dyn GraphStore>)
    }
}

fn accounts() -> Vec<String> {
    vec!["octocat".to_string(), "ghost-missing".to_string()]
}

#[tokio::test]
async fn harvest_records_failures_and_progress() {
    let workspace = Workspace::new();
    let transport = Arc::new(scripted_github());

    let summary = workspace
        .harvest(&transport, &["octocat", "ghost-missing"])
        .await;

    assert_eq!(summary.accounts, 2);
    assert_eq!(summary.harvested, 1);
    assert_eq!(summary.not_found, 1);
    assert_eq!(summary.failures, 1);

    let failed = workspace
        .errors()
        .path_for(&ErrorKey::Issues("octocat/Spoon-Knife".into()));
    let detail = std::fs::read_to_string(failed).unwrap();
    assert!(detail.contains("500"), "{detail}");

    let missing = workspace
        .errors()
        .path_for(&ErrorKey::Account("ghost-missing".into()));
    assert!(missing.exists());

    let done = workspace.progress_log().load().await.unwrap();
    assert!(done.contains("octocat"));
    assert!(done.contains("ghost-missing"));

    let cache_dir = workspace.dir.path().join(".cached_results");
    assert!(cache_dir.join("users__octocat.json").exists());
    assert!(!cache_dir.join("repos__octocat__Spoon-Knife__issues.json").exists());
    assert!(!cache_dir.join("users__ghost-missing.json").exists());
}

#[tokio::test]
async fn cached_resources_cost_quota_once() {
    let workspace = Workspace::new();
    let transport = Arc::new(scripted_github());

    workspace.harvest(&transport, &["octocat"]).await;
    let first_run = transport.billable_hits();
    workspace.harvest(&transport, &["octocat"]).await;

    assert_eq!(transport.hits("users/octocat"), 1);
    assert_eq!(transport.hits("repos/octocat/Hello-World/issues"), 1);
    // Only the uncached failure is asked for again.
    assert_eq!(transport.hits("repos/octocat/Spoon-Knife/issues"), 2);
    assert_eq!(transport.billable_hits(), first_run + 1);
}

#[tokio::test]
async fn import_projects_repository_topics_and_license() {
    let workspace = Workspace::new();
    let transport = Arc::new(scripted_github());
    workspace
        .harvest(&transport, &["octocat", "ghost-missing"])
        .await;
    let before = transport.billable_hits();

    let graph = Arc::new(MemoryGraph::new());
    let summary = workspace.importer(&graph).run(&accounts()).await.unwrap();

    assert_eq!(summary.imported, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.repositories, 2);
    assert_eq!(transport.billable_hits(), before, "import must not fetch");

    let hello_world = NodeKey::Repository(HELLO_WORLD_ID);
    assert_eq!(graph.count_nodes(NodeLabel::Repository).await.unwrap(), 2);
    assert_eq!(
        graph.targets(&hello_world, RelType::RelatesTo).await,
        vec![
            NodeKey::Topic("demo".into()),
            NodeKey::Topic("sample".into())
        ]
    );
    assert!(
        graph
            .has_relationship(&hello_world, RelType::HasLicense, &NodeKey::License("mit".into()))
            .await
    );
    assert!(
        graph
            .has_relationship(&hello_world, RelType::IsWrittenIn, &NodeKey::Language("C".into()))
            .await
    );
    assert_eq!(graph.count_nodes(NodeLabel::License).await.unwrap(), 1);

    let octocat = graph.node(&NodeKey::account(1, "octocat")).await.unwrap();
    assert!(octocat.has_label(NodeLabel::User));
    assert_eq!(
        octocat.property("website").and_then(|v| v.as_str()),
        Some("https://github.blog")
    );
    assert!(octocat.property("email").is_none());

    let hubot = NodeKey::account(2, "hubot");
    assert!(
        graph
            .has_relationship(&hubot, RelType::ContributesTo, &hello_world)
            .await
    );
    assert!(
        graph
            .has_relationship(&hello_world, RelType::Has, &NodeKey::Issue(501))
            .await
    );
    assert!(
        graph
            .has_relationship(&hello_world, RelType::Has, &NodeKey::PullRequest(601))
            .await
    );
}

#[tokio::test]
async fn failed_issue_fetch_imports_no_issues() {
    let workspace = Workspace::new();
    let transport = Arc::new(scripted_github());
    workspace.harvest(&transport, &["octocat"]).await;

    let graph = Arc::new(MemoryGraph::new());
    let summary = workspace
        .importer(&graph)
        .run(&["octocat".to_string()])
        .await
        .unwrap();

    assert_eq!(summary.imported, 1);
    assert!(
        graph
            .targets(&NodeKey::Repository(SPOON_KNIFE_ID), RelType::Has)
            .await
            .is_empty()
    );
    assert_eq!(graph.count_nodes(NodeLabel::Issue).await.unwrap(), 1);
}

#[tokio::test]
async fn gist_files_get_default_languages() {
    let workspace = Workspace::new();
    let transport = Arc::new(scripted_github());
    workspace.harvest(&transport, &["octocat"]).await;

    let graph = Arc::new(MemoryGraph::new());
    workspace
        .importer(&graph)
        .run(&["octocat".to_string()])
        .await
        .unwrap();

    let file = |name: &str| NodeKey::GistFile {
        gist_id: "aa5a315d61ae9438b18d".into(),
        name: name.into(),
    };
    for (name, language) in [
        ("notes.txt", "Text"),
        ("blob.bin", "Unknown"),
        ("main.rs", "Rust"),
    ] {
        assert!(
            graph
                .has_relationship(&file(name), RelType::IsWrittenIn, &NodeKey::Language(language.into()))
                .await,
            "{name} should be written in {language}"
        );
    }
}

#[tokio::test]
async fn reimport_is_a_fixed_point() {
    let workspace = Workspace::new();
    let transport = Arc::new(scripted_github());
    workspace
        .harvest(&transport, &["octocat", "ghost-missing"])
        .await;

    let graph = Arc::new(MemoryGraph::new());
    let importer = workspace.importer(&graph);

    importer.run(&accounts()).await.unwrap();
    let nodes = graph.node_count().await;
    let relationships = graph.relationship_count().await;

    importer.run(&accounts()).await.unwrap();
    assert_eq!(graph.node_count().await, nodes);
    assert_eq!(graph.relationship_count().await, relationships);
    for label in [
        NodeLabel::Account,
        NodeLabel::Repository,
        NodeLabel::License,
        NodeLabel::Language,
        NodeLabel::Topic,
    ] {
        assert!(graph.count_nodes(label).await.unwrap() > 0, "{label}");
    }
}

async fn import_cached_account(account_body: &str) -> (ImportOutcome, Arc<MemoryGraph>) {
    let workspace = Workspace::new();
    let cache_dir = workspace.dir.path().join(".cached_results");
    std::fs::create_dir_all(&cache_dir).unwrap();
    std::fs::write(cache_dir.join("users__nobody.json"), account_body).unwrap();
    std::fs::write(
        cache_dir.join("users__nobody__repos.json"),
        r#"[{"id": 9, "name": "x", "full_name": "nobody/x",
            "owner": {"login": "nobody", "id": 99}, "default_branch": "main"}]"#,
    )
    .unwrap();

    let graph = Arc::new(MemoryGraph::new());
    let outcome = workspace.importer(&graph).import_account("nobody").await;
    (outcome, graph)
}

#[tokio::test]
async fn cached_not_found_account_imports_nothing() {
    let (outcome, graph) =
        import_cached_account(r#"{"message":"Not Found","documentation_url":"https://docs.github.com"}"#)
            .await;

    assert!(matches!(outcome, ImportOutcome::Skipped { .. }), "{outcome:?}");
    assert_eq!(graph.node_count().await, 0);
    assert_eq!(graph.relationship_count().await, 0);
}

#[tokio::test]
async fn blank_account_artifact_imports_nothing() {
    let (outcome, graph) = import_cached_account("  \n").await;

    assert!(matches!(outcome, ImportOutcome::Skipped { .. }), "{outcome:?}");
    assert_eq!(graph.node_count().await, 0);
    assert_eq!(graph.relationship_count().await, 0);
}
