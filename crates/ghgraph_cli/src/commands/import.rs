use std::path::PathBuf;
use std::sync::Arc;

use console::style;
use ghgraph::accounts::read_account_names;
use ghgraph::graph::{NodeLabel, RelType};
use ghgraph::{FsCacheStore, GraphStore, ImportSummary, Importer, MemoryGraph, Progress};

use crate::config::Config;
use crate::progress::ProgressReporter;

/// Import cached artifacts into Neo4j, or into an in-memory graph for a dry run.
pub(crate) async fn handle_import(
    accounts: Option<PathBuf>,
    dry_run: bool,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = accounts.unwrap_or_else(|| config.paths.accounts_file.clone());
    let names = read_account_names(&path).await?;

    let graph = connect(dry_run, config).await?;

    let reporter = Arc::new(ProgressReporter::new());
    reporter.handle(Progress::AccountsQueued {
        total: names.len(),
        already_done: 0,
    });

    let cache = Arc::new(FsCacheStore::new(&config.paths.cache_dir));
    let importer =
        Importer::new(cache, Arc::clone(&graph)).with_progress(reporter.as_callback());
    let summary = importer.run(&names).await?;
    reporter.finish();

    print_summary(&summary, dry_run);
    if dry_run {
        print_counts(graph.as_ref()).await?;
    }
    Ok(())
}

#[cfg(feature = "neo4j")]
async fn connect(
    dry_run: bool,
    config: &Config,
) -> Result<Arc<dyn GraphStore>, Box<dyn std::error::Error>> {
    if dry_run {
        return Ok(Arc::new(MemoryGraph::new()));
    }
    let neo4j = &config.neo4j;
    tracing::info!(uri = %neo4j.uri, user = %neo4j.user, "Connecting to Neo4j");
    let graph = ghgraph::Neo4jGraph::connect(&neo4j.uri, &neo4j.user, &neo4j.password).await?;
    Ok(Arc::new(graph))
}

#[cfg(not(feature = "neo4j"))]
async fn connect(
    dry_run: bool,
    _config: &Config,
) -> Result<Arc<dyn GraphStore>, Box<dyn std::error::Error>> {
    if !dry_run {
        return Err("built without the neo4j feature; use --dry-run".into());
    }
    Ok(Arc::new(MemoryGraph::new()))
}

fn print_summary(summary: &ImportSummary, dry_run: bool) {
    let title = if dry_run { "Dry run" } else { "Import" };
    println!(
        "\n{} {} accounts: {} imported, {} skipped, {} failed",
        style(title).bold().green(),
        summary.accounts,
        summary.imported,
        summary.skipped,
        summary.failed,
    );
    println!(
        "  {} repositories, {} gists, {} issues, {} pull requests",
        summary.repositories, summary.gists, summary.issues, summary.pull_requests
    );
    if summary.isolated_failures > 0 {
        println!(
            "{} {} isolated step failures",
            style("!").yellow(),
            summary.isolated_failures
        );
    }
}

async fn print_counts(graph: &dyn GraphStore) -> Result<(), Box<dyn std::error::Error>> {
    println!("\nNodes:");
    for label in NodeLabel::ALL {
        println!("  {:14} {}", label.as_str(), graph.count_nodes(label).await?);
    }
    println!("Relationships:");
    for rel in RelType::ALL {
        println!("  {:14} {}", rel.as_str(), graph.count_relationships(rel).await?);
    }
    Ok(())
}
