use std::sync::Mutex;
use std::time::Duration;

use console::style;
use ghgraph::progress::Progress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Consolidated progress state to avoid multiple mutex locks.
#[derive(Default)]
struct ProgressState {
    /// One bar over the account list.
    accounts_bar: Option<ProgressBar>,
    /// Spinner showing the resource currently being read.
    fetch_bar: Option<ProgressBar>,
    /// Resources served from the cache.
    cache_hits: usize,
    /// Resources fetched from the API.
    remote: usize,
    /// Failed resources or import steps.
    failures: usize,
}

/// Interactive progress reporter using indicatif.
///
/// Shows an account bar plus a fetch spinner. Failures and quota
/// suspensions are printed above the bars so they stay visible.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    /// Handle a progress event.
    pub fn handle(&self, event: Progress) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };

        match event {
            Progress::AccountsQueued {
                total,
                already_done,
            } => {
                let pb = self.accounts_bar(&mut state, total);
                if already_done > 0 {
                    pb.set_message(format!("{already_done} already done"));
                }
            }
            Progress::AccountStarted {
                login,
                position,
                total,
            } => {
                let pb = self.accounts_bar(&mut state, total);
                pb.set_position(position.saturating_sub(1) as u64);
                pb.set_message(login);
            }
            Progress::AccountFinished {
                login,
                repositories,
                failures,
            } => {
                if let Some(pb) = &state.accounts_bar {
                    pb.inc(1);
                    let symbol = if failures > 0 { "!" } else { "✓" };
                    pb.set_message(format!("{symbol} {login} ({repositories} repos)"));
                }
            }
            Progress::AccountSkipped { login, reason } => {
                if let Some(pb) = &state.accounts_bar {
                    pb.inc(1);
                    pb.set_message(format!("· {login}: {reason}"));
                }
            }
            Progress::AccountImported {
                login,
                repositories,
                gists,
                ..
            } => {
                if let Some(pb) = &state.accounts_bar {
                    pb.inc(1);
                    pb.set_message(format!("✓ {login} ({repositories} repos, {gists} gists)"));
                }
            }
            Progress::ResourceFetched { path, from_cache } => {
                if from_cache {
                    state.cache_hits += 1;
                } else {
                    state.remote += 1;
                }
                let message = format!(
                    "{path}  [{} cached, {} fetched]",
                    state.cache_hits, state.remote
                );
                self.fetch_bar(&mut state).set_message(message);
            }
            Progress::ResourceFailed { key, error } => {
                state.failures += 1;
                self.println(format!("{} {key}: {error}", style("✗").red()));
            }
            Progress::TransportRetry {
                path,
                retry_after_ms,
                attempt,
            } => {
                self.fetch_bar(&mut state).set_message(format!(
                    "{path}  retry {attempt} in {:.1}s",
                    retry_after_ms as f64 / 1000.0
                ));
            }
            Progress::BudgetRefreshed {
                remaining, limit, ..
            } => {
                if let Some(pb) = &state.accounts_bar {
                    pb.set_prefix(format!("{:12}", format!("{remaining}/{limit}")));
                }
            }
            Progress::BudgetSuspended { until } => {
                let until = until.with_timezone(&chrono::Local).format("%H:%M:%S");
                self.fetch_bar(&mut state)
                    .set_message(format!("quota exhausted, waiting until {until}"));
            }
            Progress::ImportStepFailed {
                login,
                stage,
                error,
                fatal,
            } => {
                state.failures += 1;
                let symbol = if fatal {
                    style("✗").red()
                } else {
                    style("!").yellow()
                };
                self.println(format!("{symbol} {login} ({stage}): {error}"));
                if fatal && let Some(pb) = &state.accounts_bar {
                    pb.inc(1);
                }
            }
            Progress::HarvestComplete { accounts, failures } => {
                if let Some(pb) = state.fetch_bar.take() {
                    pb.finish_and_clear();
                }
                if let Some(pb) = &state.accounts_bar {
                    pb.finish_with_message(format!(
                        "✓ {accounts} accounts, {failures} failures ({} cached, {} fetched)",
                        state.cache_hits, state.remote
                    ));
                }
            }
            Progress::ImportComplete {
                imported,
                skipped,
                failed,
            } => {
                if let Some(pb) = &state.accounts_bar {
                    pb.finish_with_message(format!(
                        "✓ {imported} imported, {skipped} skipped, {failed} failed"
                    ));
                }
            }
            _ => {}
        }
    }

    /// Finish all progress bars.
    pub fn finish(&self) {
        let Ok(state) = self.state.lock() else {
            return;
        };
        if let Some(ref pb) = state.fetch_bar
            && !pb.is_finished()
        {
            pb.finish_and_clear();
        }
        if let Some(ref pb) = state.accounts_bar
            && !pb.is_finished()
        {
            pb.finish();
        }
    }

    fn accounts_bar(&self, state: &mut ProgressState, total: usize) -> ProgressBar {
        let pb = state.accounts_bar.get_or_insert_with(|| {
            let pb = self.multi.add(ProgressBar::new(total as u64));
            pb.set_style(Self::bar_style());
            pb.set_prefix(format!("{:12}", "Accounts"));
            pb
        });
        if pb.length() != Some(total as u64) {
            pb.set_length(total as u64);
        }
        pb.clone()
    }

    fn fetch_bar(&self, state: &mut ProgressState) -> ProgressBar {
        state
            .fetch_bar
            .get_or_insert_with(|| {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::spinner_style());
                pb.set_prefix(format!("{:12}", "Fetching"));
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            })
            .clone()
    }

    fn println(&self, line: String) {
        if self.multi.println(&line).is_err() {
            eprintln!("{line}");
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .map(|s| s.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .map(|s| s.progress_chars("█▓░"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
