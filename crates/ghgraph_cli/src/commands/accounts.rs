use std::io::Write;
use std::path::{Path, PathBuf};

use ghgraph::ProgressLog;
use ghgraph::accounts::{extract_names, pending_accounts, read_account_names};

use crate::config::Config;

/// Print the accounts that are not in the progress log yet.
pub(crate) async fn handle_pending(
    accounts: Option<PathBuf>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = accounts.unwrap_or_else(|| config.paths.accounts_file.clone());
    let all = read_account_names(&path).await?;
    let done = ProgressLog::new(&config.paths.progress_log).load().await?;

    let mut stdout = std::io::stdout().lock();
    for name in pending_accounts(&all, &done) {
        writeln!(stdout, "{name}")?;
    }
    Ok(())
}

/// Seed an account list from a JSON-lines dump of account records.
pub(crate) async fn handle_extract_names(
    input: &Path,
    limit: usize,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let jsonl = tokio::fs::read_to_string(input).await?;
    let names = extract_names(&jsonl, limit)?;
    let text = render_names(&names);

    match output {
        Some(path) => {
            tokio::fs::write(&path, text).await?;
            tracing::info!(count = names.len(), path = %path.display(), "Wrote account list");
        }
        None => std::io::stdout().lock().write_all(text.as_bytes())?,
    }
    Ok(())
}

fn render_names(names: &[String]) -> String {
    names.iter().map(|name| format!("{name}\n")).collect()
}
