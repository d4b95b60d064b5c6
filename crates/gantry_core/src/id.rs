//! Unique identifiers for graph entities.
//!
//! Vertex identity survives recompilation when a vertex is reused, so
//! callers can attach runtime state keyed by [`VertexId`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Vertex identifier - identifies one vertex object across generations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(Uuid);

impl VertexId {
    /// Create a new random VertexId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VertexId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VertexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "vtx_{}", self.0)
    }
}
