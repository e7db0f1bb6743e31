//! Error types for message services.

use thiserror::Error;

use crate::message::{ErrorCode, SourceRole};

/// Protocol violations and programmer errors.
///
/// These never travel over the wire. Resource errors the other side reports
/// arrive as [`ResourceErrors`](crate::ResourceErrors) instead.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The catalog has no such message for this sender.
    #[error("service `{service}` has no message `{message_name}` sent by the {sender}")]
    UnknownMessage {
        service: String,
        message_name: String,
        sender: SourceRole,
    },

    /// A notification was used where a request was expected.
    #[error("`{0}` is a notification, not a request")]
    NotARequest(String),

    /// A request was used where a notification was expected.
    #[error("`{0}` is a request, not a notification")]
    NotANotification(String),

    /// The handler was destroyed.
    #[error("service handler for `{0}` has been destroyed")]
    Destroyed(String),

    /// The channel was closed.
    #[error("channel closed")]
    ChannelClosed,

    /// Too many messages were queued before the handshake completed.
    #[error("outbound queue is full ({0} messages waiting for the handshake)")]
    QueueFull(usize),

    /// A response arrived under a different name than the request expected.
    #[error("request `{request_id}` expected `{expected}`, received `{received}`")]
    UnexpectedResponse {
        request_id: String,
        expected: String,
        received: String,
    },

    /// A response did not carry exactly one of data or errors.
    #[error("malformed response to `{message_name}`: {reason}")]
    MalformedResponse { message_name: String, reason: String },

    /// A response carried an error code the request may not fail with.
    #[error("`{message_name}` may not fail with {code}")]
    DisallowedErrorCode { message_name: String, code: ErrorCode },

    /// The pending request was dropped before a response arrived.
    #[error("request `{0}` was dropped before a response arrived")]
    RequestDropped(String),

    /// Block metadata did not describe a loadable block.
    #[error("invalid block metadata: {0}")]
    InvalidBlockMetadata(String),

    /// A URL in block metadata could not be resolved.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A payload failed to serialize.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
