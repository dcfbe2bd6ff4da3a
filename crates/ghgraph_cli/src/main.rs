//! ghgraph CLI - harvest GitHub accounts and import them into a graph.

mod commands;
mod config;
mod progress;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use ghgraph::accounts::DEFAULT_EXTRACT_LIMIT;
use tracing_subscriber::EnvFilter;

use crate::commands::limits::OutputFormat;

#[derive(Parser)]
#[command(name = "ghgraph")]
#[command(version)]
#[command(about = "Harvest GitHub accounts under a rate budget and import them into a graph")]
#[command(
    long_about = "ghgraph fetches accounts, repositories, gists, issues, pull requests, \
contributors and subscribers from the GitHub REST API into a file cache, waiting out \
the hourly quota when it runs dry. The import step replays the cache into Neo4j with \
MERGE semantics, so it can be re-run safely."
)]
#[command(after_long_help = r#"EXAMPLES
    Seed an account list from a JSON-lines dump:
        $ ghgraph extract-names --input users.jsonl --output users_to_fetch.txt

    Harvest, skipping accounts that are already done:
        $ ghgraph harvest --resume

    Preview an import without touching Neo4j:
        $ ghgraph import --dry-run

    Show the remaining quota:
        $ ghgraph limits

CONFIGURATION
    ghgraph reads configuration from:
      1. ~/.config/ghgraph/config.toml (or $XDG_CONFIG_HOME/ghgraph/config.toml)
      2. ./ghgraph.toml
      3. Environment variables (GHGRAPH_ prefix, "__" between section and key)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    GHGRAPH_GITHUB__TOKEN       GitHub personal access token
    GHGRAPH_PATHS__CACHE_DIR    Cache directory (default: .cached_results)
    GHGRAPH_NEO4J__URI          Neo4j URI (default: neo4j://localhost:7687)
    GHGRAPH_NEO4J__USER         Neo4j user (default: neo4j)
    GHGRAPH_NEO4J__PASSWORD     Neo4j password
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every account in the list into the cache
    Harvest {
        /// Account list, one name per line (default from config)
        #[arg(short, long)]
        accounts: Option<PathBuf>,

        /// Skip accounts already in the progress log
        #[arg(short, long)]
        resume: bool,
    },
    /// Import cached accounts into the graph
    Import {
        /// Account list, one name per line (default from config)
        #[arg(short, long)]
        accounts: Option<PathBuf>,

        /// Import into an in-memory graph and print node and relationship counts
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
    /// Show current rate limit status
    Limits {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Print accounts not yet in the progress log
    Pending {
        /// Account list, one name per line (default from config)
        #[arg(short, long)]
        accounts: Option<PathBuf>,
    },
    /// Build an account list from a JSON-lines dump of account records
    ExtractNames {
        /// JSON-lines file with one account record per line
        #[arg(short, long)]
        input: PathBuf,

        /// Number of records to read
        #[arg(short, long, default_value_t = DEFAULT_EXTRACT_LIMIT)]
        limit: usize,

        /// Output file (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Structured logging only when progress bars are not drawn
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("ghgraph=info,ghgraph_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    let config = config::Config::load();

    match cli.command {
        Commands::Harvest { accounts, resume } => {
            commands::harvest::handle_harvest(accounts, resume, &config).await?;
        }
        Commands::Import { accounts, dry_run } => {
            commands::import::handle_import(accounts, dry_run, &config).await?;
        }
        Commands::Limits { output } => {
            commands::limits::handle_limits(output, &config).await?;
        }
        Commands::Pending { accounts } => {
            commands::accounts::handle_pending(accounts, &config).await?;
        }
        Commands::ExtractNames {
            input,
            limit,
            output,
        } => {
            commands::accounts::handle_extract_names(&input, limit, output).await?;
        }
        Commands::Completions { shell } => {
            commands::meta::handle_completions(shell)?;
        }
        Commands::Man { output } => {
            commands::meta::handle_man(output)?;
        }
    }

    Ok(())
}
