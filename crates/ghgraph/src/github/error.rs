//! Fetch client error types.

use thiserror::Error;

use crate::cache::CacheError;
use crate::http::HttpError;

/// Errors that can occur while fetching a resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The API answered with a non-success status.
    #[error("GET {path} failed with HTTP {status}: {detail}")]
    Remote {
        path: String,
        status: u16,
        detail: String,
    },

    /// The request never produced a response.
    #[error("GET {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: HttpError,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The API reports that the account does not exist.
    #[error("account not found: {login}")]
    NotFound { login: String },

    /// The response body is not the JSON the caller expected.
    #[error("malformed response for {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// Whether retrying the same request may succeed.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Extract a short, single-line error message from an error.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}
