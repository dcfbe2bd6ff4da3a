use ghgraph::progress::Progress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: Progress) {
        match event {
            Progress::AccountsQueued {
                total,
                already_done,
            } => {
                tracing::info!(total, already_done, "Accounts queued");
            }

            Progress::AccountStarted {
                login,
                position,
                total,
            } => {
                tracing::info!(login = %login, position, total, "Processing account");
            }

            Progress::AccountFinished {
                login,
                repositories,
                failures,
            } => {
                if failures > 0 {
                    tracing::warn!(login = %login, repositories, failures, "Account harvested with failures");
                } else {
                    tracing::info!(login = %login, repositories, "Account harvested");
                }
            }

            Progress::AccountSkipped { login, reason } => {
                tracing::info!(login = %login, reason = %reason, "Account skipped");
            }

            Progress::ResourceFetched { path, from_cache } => {
                tracing::debug!(path = %path, from_cache, "Resource fetched");
            }

            Progress::ResourceFailed { key, error } => {
                tracing::warn!(key = %key, error = %error, "Resource failed");
            }

            Progress::TransportRetry {
                path,
                retry_after_ms,
                attempt,
            } => {
                tracing::warn!(path = %path, retry_after_ms, attempt, "Transport error, retrying");
            }

            Progress::BudgetRefreshed {
                remaining,
                limit,
                reset_at,
            } => {
                tracing::debug!(remaining, limit, reset_at = %reset_at, "Rate budget refreshed");
            }

            Progress::BudgetSuspended { until } => {
                tracing::info!(until = %until, "Rate budget exhausted, waiting for reset");
            }

            Progress::AccountImported {
                login,
                repositories,
                gists,
                issues,
                pull_requests,
            } => {
                tracing::info!(
                    login = %login,
                    repositories,
                    gists,
                    issues,
                    pull_requests,
                    "Account imported"
                );
            }

            Progress::ImportStepFailed {
                login,
                stage,
                error,
                fatal,
            } => {
                if fatal {
                    tracing::error!(login = %login, stage, error = %error, "Account import aborted");
                } else {
                    tracing::warn!(login = %login, stage, error = %error, "Import step failed");
                }
            }

            Progress::HarvestComplete { accounts, failures } => {
                tracing::info!(accounts, failures, "Harvest complete");
            }

            Progress::ImportComplete {
                imported,
                skipped,
                failed,
            } => {
                tracing::info!(imported, skipped, failed, "Import complete");
            }

            _ => {
                tracing::debug!(?event, "Progress");
            }
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
