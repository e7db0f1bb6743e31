//! The wire envelope and its payload types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ServiceError};

/// Message name the block sends to open a service.
pub const INIT: &str = "init";

/// Message name the embedder answers [`INIT`] with.
pub const INIT_RESPONSE: &str = "initResponse";

/// Name of the response to a request called `request_name`.
pub fn response_name(request_name: &str) -> String {
    format!("{request_name}Response")
}

/// Which side of a block/embedder pair a message comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceRole {
    Block,
    Embedder,
}

impl SourceRole {
    /// The role on the other end of the channel.
    pub fn peer(self) -> Self {
        match self {
            SourceRole::Block => SourceRole::Embedder,
            SourceRole::Embedder => SourceRole::Block,
        }
    }
}

impl fmt::Display for SourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRole::Block => f.write_str("block"),
            SourceRole::Embedder => f.write_str("embedder"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Forbidden,
    InvalidInput,
    NotFound,
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        f.write_str(code)
    }
}

/// A resource error carried in a response's `errors` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorItem {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorItem {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A non-empty list of resource errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResourceErrors(Vec<ErrorItem>);

impl ResourceErrors {
    /// `None` if `errors` is empty.
    pub fn new(errors: Vec<ErrorItem>) -> Option<Self> {
        (!errors.is_empty()).then_some(Self(errors))
    }

    pub fn single(code: ErrorCode, message: impl Into<String>) -> Self {
        Self(vec![ErrorItem::new(code, message)])
    }

    pub fn first(&self) -> &ErrorItem {
        &self.0[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorItem> {
        self.0.iter()
    }

    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.0.iter().any(|error| error.code == code)
    }

    pub fn into_vec(self) -> Vec<ErrorItem> {
        self.0
    }
}

impl fmt::Display for ResourceErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            error.fmt(f)?;
        }
        Ok(())
    }
}

impl std::error::Error for ResourceErrors {}

/// Outcome of a request: typed data, or the errors the other side reported.
pub type MessageReturn<T> = std::result::Result<T, ResourceErrors>;

/// The `data`/`errors` half of a message, as seen by callbacks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageData {
    pub data: Option<Value>,
    pub errors: Option<Vec<ErrorItem>>,
}

impl MessageData {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: None,
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::errors(ResourceErrors::single(code, message))
    }

    pub fn errors(errors: ResourceErrors) -> Self {
        Self {
            data: None,
            errors: Some(errors.into_vec()),
        }
    }

    /// Split a response into exactly one of data or errors.
    pub fn into_return(self, message_name: &str) -> Result<MessageReturn<Value>> {
        let errors = self.errors.and_then(ResourceErrors::new);
        match (self.data, errors) {
            (Some(data), None) => Ok(Ok(data)),
            (None, Some(errors)) => Ok(Err(errors)),
            (Some(_), Some(_)) => Err(ServiceError::MalformedResponse {
                message_name: message_name.to_string(),
                reason: "both data and errors are present".to_string(),
            }),
            (None, None) => Err(ServiceError::MalformedResponse {
                message_name: message_name.to_string(),
                reason: "neither data nor errors are present".to_string(),
            }),
        }
    }
}

impl From<MessageReturn<Value>> for MessageData {
    fn from(result: MessageReturn<Value>) -> Self {
        match result {
            Ok(data) => MessageData::data(data),
            Err(errors) => MessageData::errors(errors),
        }
    }
}

/// A message as it travels over a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub service: String,
    pub message_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorItem>>,
}

impl Message {
    pub fn new(service: impl Into<String>, message_name: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            message_name: message_name.into(),
            request_id: None,
            data: None,
            errors: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_payload(mut self, payload: MessageData) -> Self {
        self.data = payload.data;
        self.errors = payload.errors;
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn payload(&self) -> MessageData {
        MessageData {
            data: self.data.clone(),
            errors: self.errors.clone(),
        }
    }

    pub fn into_payload(self) -> MessageData {
        MessageData {
            data: self.data,
            errors: self.errors,
        }
    }
}
