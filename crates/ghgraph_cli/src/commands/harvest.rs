use std::path::PathBuf;
use std::sync::Arc;

use console::style;
use ghgraph::accounts::{pending_accounts, read_account_names};
use ghgraph::{
    ErrorLog, FetchClient, FsCacheStore, HarvestSummary, Harvester, Progress, ProgressLog,
    RequestPacer,
};

use crate::config::Config;
use crate::progress::ProgressReporter;

/// Harvest every account in the list into the cache directory.
pub(crate) async fn handle_harvest(
    accounts: Option<PathBuf>,
    resume: bool,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = accounts.unwrap_or_else(|| config.paths.accounts_file.clone());
    let all = read_account_names(&path).await?;
    let progress_log = ProgressLog::new(&config.paths.progress_log);

    let queue = if resume {
        let done = progress_log.load().await?;
        pending_accounts(&all, &done)
    } else {
        all.clone()
    };

    if config.github.token.is_none() {
        tracing::warn!("No GitHub token configured; the unauthenticated quota is 60 requests per hour");
    }

    let reporter = Arc::new(ProgressReporter::new());
    reporter.handle(Progress::AccountsQueued {
        total: queue.len(),
        already_done: all.len() - queue.len(),
    });

    let cache = Arc::new(FsCacheStore::new(&config.paths.cache_dir));
    let client = FetchClient::new(config.fetch_client_config(), cache)?
        .with_pacer(RequestPacer::per_second(config.harvest.requests_per_second))
        .with_progress(reporter.as_callback());

    let mut harvester = Harvester::new(
        client,
        ErrorLog::new(&config.paths.error_dir),
        progress_log,
    );
    let summary = harvester.run(&queue).await?;
    reporter.finish();

    print_summary(&summary, config);
    Ok(())
}

fn print_summary(summary: &HarvestSummary, config: &Config) {
    println!(
        "\n{} {} accounts: {} harvested, {} not found, {} failed",
        style("Harvest").bold().green(),
        summary.accounts,
        summary.harvested,
        summary.not_found,
        summary.failed_accounts,
    );
    if summary.failures > 0 {
        println!(
            "{} {} resources failed; details in {}",
            style("!").yellow(),
            summary.failures,
            config.paths.error_dir.display()
        );
    }
}
