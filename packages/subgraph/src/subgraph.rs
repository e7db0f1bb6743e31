//! The [`Subgraph`] container.

use serde::{Deserialize, Serialize};

use crate::depths::GraphResolveDepths;
use crate::edge::Edges;
use crate::ids::GraphElementEditionId;
use crate::vertex::Vertices;

/// A rooted, depth-bounded slice of the knowledge graph.
///
/// Immutable once built. Consumers that need a newer view receive a whole new
/// subgraph, usually behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subgraph {
    roots: Vec<GraphElementEditionId>,
    vertices: Vertices,
    edges: Edges,
    depths: GraphResolveDepths,
}

impl Subgraph {
    pub fn new(
        roots: Vec<GraphElementEditionId>,
        vertices: Vertices,
        edges: Edges,
        depths: GraphResolveDepths,
    ) -> Self {
        Self {
            roots,
            vertices,
            edges,
            depths,
        }
    }

    pub fn roots(&self) -> &[GraphElementEditionId] {
        &self.roots
    }

    pub fn vertices(&self) -> &Vertices {
        &self.vertices
    }

    pub fn edges(&self) -> &Edges {
        &self.edges
    }

    pub fn depths(&self) -> &GraphResolveDepths {
        &self.depths
    }
}
