//! Error types for the subgraph model.

use thiserror::Error;

use crate::ids::{EntityId, GraphElementEditionId};
use crate::vertex::VertexKind;

/// Which side of a link entity an endpoint sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSide {
    Left,
    Right,
}

impl std::fmt::Display for LinkSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkSide::Left => f.write_str("left"),
            LinkSide::Right => f.write_str("right"),
        }
    }
}

/// Consistency and programmer errors raised by the subgraph model.
///
/// Temporal absence (an entity that did not exist yet at the requested
/// moment) is never an error; lookups return `None` for that.
#[derive(Debug, Error)]
pub enum SubgraphError {
    /// A base URL failed validation.
    #[error("invalid base URL `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// A versioned URL could not be split into base URL and version.
    #[error("invalid versioned URL `{url}`: {reason}")]
    InvalidVersionedUrl { url: String, reason: String },

    /// Two vertices of different kinds were placed under the same base id.
    #[error("vertices under `{base_id}` must share one kind: expected {expected}, found {found}")]
    MixedVertexKinds {
        base_id: String,
        expected: VertexKind,
        found: VertexKind,
    },

    /// The vertex at an address is not of the kind the caller asked for.
    #[error("vertex `{id}` is a {found}, expected a {expected}")]
    UnexpectedVertexKind {
        id: String,
        expected: VertexKind,
        found: VertexKind,
    },

    /// A link entity has no outward edge to one of its endpoints.
    #[error("link entity `{entity_id}` has no {side} entity edge")]
    MissingLinkEndpoint { entity_id: EntityId, side: LinkSide },

    /// A builder was asked for a root that is not among its vertices.
    #[error("root `{0}` is not present in the subgraph vertices")]
    MissingRoot(GraphElementEditionId),

    /// A raw vertex or edge key could not be interpreted.
    #[error("invalid version key `{key}` under `{base_id}`")]
    InvalidVersionKey { base_id: String, key: String },
}

/// Result type alias for subgraph operations.
pub type Result<T> = std::result::Result<T, SubgraphError>;
