//! ghgraph - GitHub harvesting under a rate budget, and an idempotent
//! property-graph importer for the harvested artifacts.
//!
//! The pipeline has two halves that share only the on-disk cache:
//!
//! - [`harvest`] walks an account list through a [`github::FetchClient`],
//!   which answers from the [`cache`] first and otherwise suspends on the
//!   hourly quota tracked by [`budget`].
//! - [`import`] replays cached artifacts into a [`graph::GraphStore`] with
//!   `MERGE` semantics, so running it twice leaves the graph unchanged.
//!
//! # Features
//!
//! - `neo4j` (default) - Enables [`graph::Neo4jGraph`] backed by `neo4rs`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ghgraph::{ErrorLog, FetchClient, FetchClientConfig, FsCacheStore, Harvester, ProgressLog};
//!
//! let cache = Arc::new(FsCacheStore::new(".cached_results"));
//! let client = FetchClient::new(FetchClientConfig::default(), cache)?;
//! let mut harvester = Harvester::new(
//!     client,
//!     ErrorLog::new(".errors"),
//!     ProgressLog::new("progress.txt"),
//! );
//! let summary = harvester.run(&["octocat".to_string()]).await?;
//! ```

pub mod accounts;
pub mod budget;
pub mod cache;
pub mod entity;
pub mod github;
pub mod graph;
pub mod harvest;
pub mod http;
pub mod import;
pub mod locator;
pub mod progress;
pub mod retry;

pub use accounts::{AccountsError, ProgressLog};
pub use budget::{RateBudgetTracker, RequestPacer};
pub use cache::{CacheError, CacheStore, FsCacheStore};
pub use entity::prelude::*;
pub use github::{FetchClient, FetchClientConfig, FetchError};
pub use graph::{GraphError, GraphStore, MemoryGraph};
#[cfg(feature = "neo4j")]
pub use graph::Neo4jGraph;
pub use harvest::{AccountOutcome, ErrorLog, HarvestSummary, Harvester};
pub use import::{ImportError, ImportOutcome, ImportPolicy, ImportSummary, Importer};
pub use locator::Locator;
pub use progress::{Progress, ProgressCallback};
