//! GitHub REST client for the harvester.
//!
//! # Module Structure
//!
//! - [`error`] - Error types for fetch operations
//! - [`client`] - The cached, budgeted fetch client
//!
//! ```ignore
//! use ghgraph::github::{FetchClient, FetchClientConfig};
//!
//! let cache = Arc::new(FsCacheStore::new(".cached_results"));
//! let mut client = FetchClient::new(FetchClientConfig::default(), cache)?;
//! let account = client.fetch_account("octocat").await?;
//! ```

mod client;
mod error;

pub use client::{
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, FetchClient, FetchClientConfig,
};
pub use error::{FetchError, short_error_message};
