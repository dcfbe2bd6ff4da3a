//! Progress reporting for harvest and import runs.
//!
//! Library components never print. They emit [`Progress`] events through an
//! optional callback and leave rendering to the caller.

use chrono::{DateTime, Utc};

/// Progress events emitted while harvesting or importing.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Progress {
    /// Account list resolved for a run.
    AccountsQueued {
        /// Accounts that will be processed.
        total: usize,
        /// Accounts skipped because the progress log already lists them.
        already_done: usize,
    },

    /// Starting work on an account.
    AccountStarted {
        login: String,
        /// 1-indexed position in the run.
        position: usize,
        total: usize,
    },

    /// Finished an account.
    AccountFinished {
        login: String,
        /// Repositories seen for this account.
        repositories: usize,
        /// Resources that failed for this account.
        failures: usize,
    },

    /// Account skipped without further work.
    AccountSkipped {
        login: String,
        /// Why it was skipped.
        reason: String,
    },

    /// A resource was read, either from the cache or the remote API.
    ResourceFetched {
        /// Remote path of the resource.
        path: String,
        /// True when the cache served it and no quota was spent.
        from_cache: bool,
    },

    /// A resource failed and was recorded in the error log.
    ResourceFailed {
        /// Error log key.
        key: String,
        /// Short error message.
        error: String,
    },

    /// Transport failure, backing off before retry.
    TransportRetry {
        path: String,
        /// Time to wait before retry (ms).
        retry_after_ms: u64,
        /// Current attempt number.
        attempt: u32,
    },

    /// A fresh budget snapshot was read from the API.
    BudgetRefreshed {
        remaining: u32,
        limit: u32,
        reset_at: DateTime<Utc>,
    },

    /// Quota exhausted, suspending until the reset instant.
    BudgetSuspended { until: DateTime<Utc> },

    /// An account was written to the graph.
    AccountImported {
        login: String,
        repositories: usize,
        gists: usize,
        issues: usize,
        pull_requests: usize,
    },

    /// An import step failed.
    ImportStepFailed {
        login: String,
        /// Stage name.
        stage: &'static str,
        error: String,
        /// True when the failure aborted the account.
        fatal: bool,
    },

    /// Harvest run complete.
    HarvestComplete {
        accounts: usize,
        failures: usize,
    },

    /// Import run complete.
    ImportComplete {
        imported: usize,
        skipped: usize,
        failed: usize,
    },
}

/// Callback for progress updates.
pub type ProgressCallback = Box<dyn Fn(Progress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: Progress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
