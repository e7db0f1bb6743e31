//! Error types for the graph service.

use blockgraph_core::ServiceError;
use blockgraph_subgraph::SubgraphError;
use thiserror::Error;

/// Errors from typed graph requests and notifications.
///
/// Resource errors reported by the other side are not errors at this level;
/// typed requests return them as the `Err` half of a
/// [`MessageReturn`](blockgraph_core::MessageReturn).
#[derive(Debug, Error)]
pub enum GraphError {
    /// The underlying service rejected the message or the exchange failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// A payload did not have the shape its message requires.
    #[error("payload of `{message_name}` has the wrong shape: {source}")]
    Payload {
        message_name: String,
        source: serde_json::Error,
    },

    /// A subgraph was internally inconsistent.
    #[error(transparent)]
    Subgraph(#[from] SubgraphError),
}

impl GraphError {
    pub(crate) fn payload(message_name: &str, source: serde_json::Error) -> Self {
        GraphError::Payload {
            message_name: message_name.to_string(),
            source,
        }
    }
}

/// Result type alias for graph service operations.
pub type Result<T> = std::result::Result<T, GraphError>;
