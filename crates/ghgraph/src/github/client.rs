//! The fetch client: cache lookup, quota suspension, remote call, quota
//! accounting and cache write for every resource the harvester reads.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use serde::de::DeserializeOwned;

use crate::budget::{DEFAULT_POLL_INTERVAL, RateBudgetTracker, RequestPacer};
use crate::cache::CacheStore;
use crate::entity::activity::parse_for_repository;
use crate::entity::parse_list;
use crate::entity::prelude::*;
use crate::http::{HttpError, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use crate::locator::Locator;
use crate::progress::{Progress, ProgressCallback, emit};
use crate::retry::{RetryConfig, with_retry};

use super::error::FetchError;

/// Default GitHub REST API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";
/// Default `User-Agent` header. GitHub rejects requests without one.
pub const DEFAULT_USER_AGENT: &str = "ghgraph";
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Connection settings for [`FetchClient`].
#[derive(Debug, Clone)]
pub struct FetchClientConfig {
    pub base_url: String,
    /// Sent as `Authorization: token …` when present.
    pub token: Option<String>,
    pub user_agent: String,
    pub timeout: StdDuration,
    /// Longest single sleep while suspended on an exhausted quota.
    pub poll_interval: StdDuration,
    /// Backoff for transport failures.
    pub retry: RetryConfig,
}

impl Default for FetchClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry: RetryConfig::default(),
        }
    }
}

/// Reads GitHub resources through the cache under a request budget.
///
/// The client owns the only [`RateBudgetTracker`]; every operation takes
/// `&mut self` so the budget has a single writer.
pub struct FetchClient {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<dyn CacheStore>,
    budget: RateBudgetTracker,
    pacer: Option<RequestPacer>,
    config: FetchClientConfig,
    on_progress: Option<ProgressCallback>,
}

impl FetchClient {
    /// Create a client backed by reqwest.
    pub fn new(config: FetchClientConfig, cache: Arc<dyn CacheStore>) -> Result<Self, HttpError> {
        let transport = ReqwestTransport::with_timeout(config.timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport), cache))
    }

    pub fn with_transport(
        config: FetchClientConfig,
        transport: Arc<dyn HttpTransport>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            transport,
            cache,
            budget: RateBudgetTracker::new(),
            pacer: None,
            config,
            on_progress: None,
        }
    }

    /// Pace requests in addition to the hourly quota.
    #[must_use]
    pub fn with_pacer(mut self, pacer: Option<RequestPacer>) -> Self {
        self.pacer = pacer;
        self
    }

    /// Start from a known budget instead of asking the API first.
    #[must_use]
    pub fn with_budget(mut self, budget: RateBudgetTracker) -> Self {
        self.budget = budget;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn budget(&self) -> &RateBudgetTracker {
        &self.budget
    }

    pub fn progress(&self) -> Option<&ProgressCallback> {
        self.on_progress.as_ref()
    }

    /// Read a resource as JSON.
    ///
    /// Cached artifacts are returned without a remote call unless
    /// `skip_cache` is set. Otherwise the call waits for quota, fetches,
    /// counts the request, stores the body verbatim and parses it. An empty
    /// body parses as `null`.
    pub async fn fetch(
        &mut self,
        locator: &Locator,
        skip_cache: bool,
    ) -> Result<serde_json::Value, FetchError> {
        let bytes = self.fetch_bytes(locator, skip_cache).await?;
        parse_body(locator, &bytes)
    }

    /// Read a resource's raw bytes, with the same caching and quota rules as [`fetch`](Self::fetch).
    pub async fn fetch_bytes(
        &mut self,
        locator: &Locator,
        skip_cache: bool,
    ) -> Result<Vec<u8>, FetchError> {
        if locator.is_quota_endpoint() {
            let response = self.remote_get(locator).await?;
            return check_status(locator, response).map(|r| r.body);
        }

        if !skip_cache && let Some(bytes) = self.cache.get(locator).await? {
            tracing::debug!(path = %locator, "cache hit");
            emit(
                self.on_progress.as_ref(),
                Progress::ResourceFetched {
                    path: locator.path(),
                    from_cache: true,
                },
            );
            return Ok(bytes);
        }

        self.wait_for_budget().await?;

        let response = self.remote_get(locator).await?;
        self.budget.consume();
        let response = check_status(locator, response)?;

        self.cache.put(locator, &response.body).await?;
        tracing::debug!(
            path = %locator,
            remaining = ?self.budget.remaining(),
            "fetched from API"
        );
        emit(
            self.on_progress.as_ref(),
            Progress::ResourceFetched {
                path: locator.path(),
                from_cache: false,
            },
        );
        Ok(response.body)
    }

    /// Read a fresh budget snapshot. Never cached, never counted.
    pub async fn refresh_budget(&mut self) -> Result<RateBudget, FetchError> {
        let locator = Locator::RateLimit;
        let response = self.remote_get(&locator).await?;
        let response = check_status(&locator, response)?;
        let value = parse_body(&locator, &response.body)?;
        let budget = RateBudget::from_response(&value).map_err(|source| FetchError::Decode {
            path: locator.path(),
            source,
        })?;
        self.budget.apply(budget);

        tracing::debug!(
            remaining = budget.remaining,
            limit = budget.limit,
            reset_at = %budget.reset_at(),
            "rate budget refreshed"
        );
        emit(
            self.on_progress.as_ref(),
            Progress::BudgetRefreshed {
                remaining: budget.remaining,
                limit: budget.limit,
                reset_at: budget.reset_at(),
            },
        );
        Ok(budget)
    }

    /// Block until the budget allows another request.
    ///
    /// Sleeps in steps of at most the poll interval until the reset
    /// instant, then re-reads the budget. If the API still reports an
    /// exhausted quota after its own reset instant, waits one more poll
    /// interval before asking again.
    async fn wait_for_budget(&mut self) -> Result<(), FetchError> {
        if self.budget.needs_refresh() {
            self.refresh_budget().await?;
        }

        while self.budget.is_exhausted() {
            if let Some(until) = self.budget.reset_at() {
                tracing::info!(reset_at = %until, "rate budget exhausted, suspending");
                emit(self.on_progress.as_ref(), Progress::BudgetSuspended { until });
            }

            while let Some(step) = self.budget.next_sleep(self.config.poll_interval) {
                tokio::time::sleep(step).await;
            }

            self.refresh_budget().await?;

            if self.budget.is_exhausted() && self.budget.time_until_reset().is_none() {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }
        Ok(())
    }

    async fn remote_get(&self, locator: &Locator) -> Result<HttpResponse, FetchError> {
        if let Some(pacer) = &self.pacer {
            pacer.wait().await;
        }

        let request = self.build_request(locator);
        let path = locator.path();

        with_retry(
            || self.transport.send(request.clone()),
            |e: &HttpError| matches!(e, HttpError::Transport(_)),
            &self.config.retry,
            &path,
            self.on_progress.as_ref(),
        )
        .await
        .map_err(|source| FetchError::Transport { path, source })
    }

    fn build_request(&self, locator: &Locator) -> HttpRequest {
        let mut request = HttpRequest::get(locator.url(&self.config.base_url))
            .with_header("Accept", "application/vnd.github+json")
            .with_header("User-Agent", self.config.user_agent.as_str());
        if let Some(token) = &self.config.token {
            request = request.with_header("Authorization", format!("token {token}"));
        }
        request
    }

    // ---------- Typed resources ----------

    /// The account profile. A 404 maps to [`FetchError::NotFound`].
    pub async fn fetch_account(&mut self, login: &str) -> Result<Account, FetchError> {
        let locator = Locator::Account(login.to_string());
        let value = self.fetch(&locator, false).await?;
        if crate::entity::is_not_found(&value) {
            return Err(FetchError::NotFound {
                login: login.to_string(),
            });
        }
        serde_json::from_value(value).map_err(|source| FetchError::Decode {
            path: locator.path(),
            source,
        })
    }

    pub async fn fetch_repositories(&mut self, login: &str) -> Result<Vec<Repository>, FetchError> {
        self.fetch_list(&Locator::AccountRepositories(login.to_string()))
            .await
    }

    pub async fn fetch_gists(&mut self, login: &str) -> Result<Vec<Gist>, FetchError> {
        self.fetch_list(&Locator::AccountGists(login.to_string()))
            .await
    }

    pub async fn fetch_issues(&mut self, full_name: &str) -> Result<Vec<Issue>, FetchError> {
        let locator = Locator::RepositoryIssues(full_name.to_string());
        let bytes = self.fetch_bytes(&locator, false).await?;
        parse_for_repository(&bytes, full_name).map_err(|source| FetchError::Decode {
            path: locator.path(),
            source,
        })
    }

    pub async fn fetch_pull_requests(
        &mut self,
        full_name: &str,
    ) -> Result<Vec<PullRequest>, FetchError> {
        let locator = Locator::RepositoryPulls(full_name.to_string());
        let bytes = self.fetch_bytes(&locator, false).await?;
        parse_for_repository(&bytes, full_name).map_err(|source| FetchError::Decode {
            path: locator.path(),
            source,
        })
    }

    pub async fn fetch_contributors(&mut self, full_name: &str) -> Result<Vec<Account>, FetchError> {
        self.fetch_list(&Locator::RepositoryContributors(full_name.to_string()))
            .await
    }

    pub async fn fetch_subscribers(&mut self, full_name: &str) -> Result<Vec<Account>, FetchError> {
        self.fetch_list(&Locator::RepositorySubscribers(full_name.to_string()))
            .await
    }

    async fn fetch_list<T: DeserializeOwned>(
        &mut self,
        locator: &Locator,
    ) -> Result<Vec<T>, FetchError> {
        let bytes = self.fetch_bytes(locator, false).await?;
        parse_list(&bytes).map_err(|source| FetchError::Decode {
            path: locator.path(),
            source,
        })
    }
}

fn check_status(locator: &Locator, response: HttpResponse) -> Result<HttpResponse, FetchError> {
    if response.is_success() {
        return Ok(response);
    }
    if response.status == 404
        && let Locator::Account(login) = locator
    {
        return Err(FetchError::NotFound {
            login: login.clone(),
        });
    }
    Err(FetchError::Remote {
        path: locator.path(),
        status: response.status,
        detail: error_detail(&response.body),
    })
}

/// The `message` of a GitHub error body, or the body text.
fn error_detail(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string())
}

fn parse_body(locator: &Locator, bytes: &[u8]) -> Result<serde_json::Value, FetchError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|source| FetchError::Decode {
        path: locator.path(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FsCacheStore;
    use crate::http::MockTransport;
    use chrono::Utc;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const BASE: &str = "https://api.test";

    fn url(path: &str) -> String {
        format!("{BASE}/{path}")
    }

    fn rate_limit_body(remaining: u32, reset_in_secs: i64) -> String {
        serde_json::json!({
            "resources": {
                "core": {
                    "limit": 5000,
                    "used": 5000 - remaining,
                    "remaining": remaining,
                    "reset": Utc::now().timestamp() + reset_in_secs
                }
            }
        })
        .to_string()
    }

    fn client(transport: &MockTransport, dir: &TempDir) -> FetchClient {
        let config = FetchClientConfig {
            base_url: BASE.to_string(),
            token: Some("secret".to_string()),
            retry: RetryConfig::disabled(),
            ..FetchClientConfig::default()
        };
        FetchClient::with_transport(
            config,
            Arc::new(transport.clone()),
            Arc::new(FsCacheStore::new(dir.path())),
        )
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new();
        transport.push_response(url("rate_limit"), HttpResponse::new(200, rate_limit_body(10, 3600)));
        transport.push_response(
            url("users/octocat"),
            HttpResponse::new(200, r#"{"login":"octocat","id":1,"type":"User"}"#),
        );

        let mut client = client(&transport, &dir);
        let first = client
            .fetch(&Locator::Account("octocat".into()), false)
            .await
            .unwrap();
        let second = client
            .fetch(&Locator::Account("octocat".into()), false)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(transport.request_count(&url("users/octocat")), 1);
        assert_eq!(client.budget().remaining(), Some(9));
    }

    #[tokio::test]
    async fn skip_cache_forces_a_remote_call() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new();
        transport.push_response(url("rate_limit"), HttpResponse::new(200, rate_limit_body(10, 3600)));
        for _ in 0..2 {
            transport.push_response(url("users/octocat/gists"), HttpResponse::new(200, "[]"));
        }

        let mut client = client(&transport, &dir);
        let locator = Locator::AccountGists("octocat".into());
        client.fetch(&locator, false).await.unwrap();
        client.fetch(&locator, true).await.unwrap();

        assert_eq!(transport.request_count(&url("users/octocat/gists")), 2);
        assert_eq!(client.budget().remaining(), Some(8));
    }

    #[tokio::test]
    async fn requests_carry_auth_and_user_agent() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new();
        transport.push_response(url("rate_limit"), HttpResponse::new(200, rate_limit_body(10, 3600)));

        let mut client = client(&transport, &dir);
        client.refresh_budget().await.unwrap();

        let requests = transport.requests();
        let req = &requests[0];
        assert_eq!(
            crate::http::header_get(&req.headers, "authorization"),
            Some("token secret")
        );
        assert_eq!(
            crate::http::header_get(&req.headers, "user-agent"),
            Some(DEFAULT_USER_AGENT)
        );
    }

    #[tokio::test]
    async fn failure_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new();
        transport.push_response(url("rate_limit"), HttpResponse::new(200, rate_limit_body(10, 3600)));
        transport.push_response(
            url("repos/octocat/Hello-World/issues"),
            HttpResponse::new(410, r#"{"message":"Issues are disabled for this repo"}"#),
        );

        let mut client = client(&transport, &dir);
        let err = client.fetch_issues("octocat/Hello-World").await.unwrap_err();

        match err {
            FetchError::Remote { status, detail, .. } => {
                assert_eq!(status, 410);
                assert_eq!(detail, "Issues are disabled for this repo");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(
            !dir.path()
                .join("repos__octocat__Hello-World__issues.json")
                .exists()
        );
    }

    #[tokio::test]
    async fn account_404_is_not_found() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new();
        transport.push_response(url("rate_limit"), HttpResponse::new(200, rate_limit_body(10, 3600)));
        transport.push_response(
            url("users/ghost-account"),
            HttpResponse::new(404, r#"{"message":"Not Found"}"#),
        );

        let mut client = client(&transport, &dir);
        let err = client.fetch_account("ghost-account").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn cached_not_found_payload_is_not_found() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("users__ghost-account.json"),
            r#"{"message":"Not Found","documentation_url":"https://docs.github.com"}"#,
        )
        .unwrap();
        let transport = MockTransport::new();

        let mut client = client(&transport, &dir);
        let err = client.fetch_account("ghost-account").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn empty_body_is_cached_and_reads_as_empty_list() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new();
        transport.push_response(url("rate_limit"), HttpResponse::new(200, rate_limit_body(10, 3600)));
        transport.push_response(
            url("repos/octocat/empty/contributors"),
            HttpResponse::new(204, ""),
        );

        let mut client = client(&transport, &dir);
        let contributors = client.fetch_contributors("octocat/empty").await.unwrap();
        assert!(contributors.is_empty());
        assert!(dir.path().join("repos__octocat__empty__contributors.json").exists());

        let value = client
            .fetch(&Locator::RepositoryContributors("octocat/empty".into()), false)
            .await
            .unwrap();
        assert!(value.is_null());
    }

    #[tokio::test]
    async fn rate_limit_endpoint_does_not_consume_budget() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new();
        transport.push_response(url("rate_limit"), HttpResponse::new(200, rate_limit_body(10, 3600)));
        transport.push_response(url("rate_limit"), HttpResponse::new(200, rate_limit_body(10, 3600)));

        let mut client = client(&transport, &dir);
        client.refresh_budget().await.unwrap();
        client.refresh_budget().await.unwrap();

        assert_eq!(client.budget().remaining(), Some(10));
        assert!(!dir.path().join("rate_limit.json").exists());
    }

    #[tokio::test]
    async fn refresh_ignores_an_exhausted_budget() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new();
        transport.push_response(url("rate_limit"), HttpResponse::new(200, rate_limit_body(0, 3600)));

        let exhausted = RateBudget {
            used: 5000,
            limit: 5000,
            remaining: 0,
            reset: Utc::now().timestamp() + 3600,
        };
        let mut client =
            client(&transport, &dir).with_budget(RateBudgetTracker::with_snapshot(exhausted));

        let budget = tokio::time::timeout(StdDuration::from_secs(5), client.refresh_budget())
            .await
            .expect("refresh must not wait for the quota")
            .unwrap();

        assert_eq!(budget.remaining, 0);
        assert_eq!(transport.request_count(&url("rate_limit")), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_suspends_until_reset() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new();
        transport.push_response(url("rate_limit"), HttpResponse::new(200, rate_limit_body(5000, 3600)));
        transport.push_response(url("users/octocat"), HttpResponse::new(200, r#"{"login":"octocat","id":1}"#));

        let exhausted = RateBudget {
            used: 5000,
            limit: 5000,
            remaining: 0,
            reset: Utc::now().timestamp() + 120,
        };
        let events: Arc<Mutex<Vec<Progress>>> = Arc::new(Mutex::new(Vec::new()));
        let capture = Arc::clone(&events);
        let mut client = client(&transport, &dir)
            .with_budget(RateBudgetTracker::with_snapshot(exhausted))
            .with_progress(Box::new(move |e| capture.lock().unwrap().push(e)));

        let started = tokio::time::Instant::now();
        client.fetch_account("octocat").await.unwrap();

        assert!(started.elapsed() >= StdDuration::from_secs(119));
        let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec![url("rate_limit"), url("users/octocat")]);
        assert!(
            events
                .lock()
                .unwrap()
                .iter()
                .any(|e| matches!(e, Progress::BudgetSuspended { .. }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stale_reset_waits_another_poll_before_rechecking() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new();
        transport.push_response(url("rate_limit"), HttpResponse::new(200, rate_limit_body(0, -5)));
        transport.push_response(url("rate_limit"), HttpResponse::new(200, rate_limit_body(100, 3600)));
        transport.push_response(url("users/octocat"), HttpResponse::new(200, r#"{"login":"octocat","id":1}"#));

        let exhausted = RateBudget {
            used: 5000,
            limit: 5000,
            remaining: 0,
            reset: Utc::now().timestamp() - 1,
        };
        let mut client =
            client(&transport, &dir).with_budget(RateBudgetTracker::with_snapshot(exhausted));

        let started = tokio::time::Instant::now();
        client.fetch_account("octocat").await.unwrap();

        assert!(started.elapsed() >= DEFAULT_POLL_INTERVAL);
        assert_eq!(transport.request_count(&url("rate_limit")), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_are_retried() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new();
        transport.push_response(url("rate_limit"), HttpResponse::new(200, rate_limit_body(10, 3600)));
        transport.push_failure(url("users/octocat"), "connection reset");
        transport.push_response(url("users/octocat"), HttpResponse::new(200, r#"{"login":"octocat","id":1}"#));

        let config = FetchClientConfig {
            base_url: BASE.to_string(),
            ..FetchClientConfig::default()
        };
        let mut client = FetchClient::with_transport(
            config,
            Arc::new(transport.clone()),
            Arc::new(FsCacheStore::new(dir.path())),
        );

        let account = client.fetch_account("octocat").await.unwrap();
        assert_eq!(account.login, "octocat");
        assert_eq!(transport.request_count(&url("users/octocat")), 2);
    }
}
