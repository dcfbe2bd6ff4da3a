use thiserror::Error;

/// Errors returned by graph backends.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("could not connect to graph database: {0}")]
    Connection(String),

    /// The database rejected or failed a write.
    #[error("graph write failed ({operation}): {message}")]
    Write {
        operation: &'static str,
        message: String,
    },

    /// A write referenced a node that is not in the graph.
    #[error("{label} {key} is not in the graph")]
    MissingNode { label: &'static str, key: String },

    #[error("unexpected graph result: {0}")]
    Decode(String),

    #[error("id {0} does not fit a graph integer")]
    IdOutOfRange(u64),
}

impl GraphError {
    pub(crate) fn write(operation: &'static str, e: impl std::fmt::Display) -> Self {
        Self::Write {
            operation,
            message: e.to_string(),
        }
    }
}
