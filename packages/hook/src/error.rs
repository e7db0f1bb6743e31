use blockgraph_core::ServiceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HookError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("payload of `{message_name}` has the wrong shape: {source}")]
    Payload {
        message_name: String,
        source: serde_json::Error,
    },
}

impl HookError {
    pub(crate) fn payload(message_name: &str, source: serde_json::Error) -> Self {
        HookError::Payload {
            message_name: message_name.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, HookError>;
