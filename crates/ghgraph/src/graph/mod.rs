//! Property graph projection of harvested entities.
//!
//! - [`model`] - Labels, relationship types and node keys
//! - [`traits`] - The [`GraphStore`] interface
//! - [`memory`] - In-memory backend
//! - `neo4j` - Neo4j backend (feature `neo4j`)

mod error;
pub mod memory;
pub mod model;
#[cfg(feature = "neo4j")]
pub mod neo4j;
pub mod traits;

pub use error::GraphError;
pub use memory::{MemoryGraph, NodeRecord};
pub use model::{AccountLink, NodeKey, NodeLabel, RelType};
#[cfg(feature = "neo4j")]
pub use neo4j::Neo4jGraph;
pub use traits::GraphStore;
