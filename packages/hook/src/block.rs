//! The block side of the hook service.

use std::sync::Arc;

use blockgraph_core::{response_name, Channel, MessageReturn, ServiceConfig, ServiceHandler, SourceRole};
use blockgraph_subgraph::EntityId;
use serde_json::Value;

use crate::catalog::{HOOK, HOOK_SERVICE};
use crate::error::{HookError, Result};
use crate::types::{HookData, HookResponse, PathComponent};

/// Asks the embedder to render views of entity properties.
pub struct HookBlockHandler {
    service: ServiceHandler,
}

impl HookBlockHandler {
    /// Must be called from within a Tokio runtime, after the embedder's
    /// handler is listening.
    pub fn connect(channel: Arc<dyn Channel>, config: ServiceConfig) -> Result<Self> {
        let service = ServiceHandler::new(&HOOK_SERVICE, SourceRole::Block, channel, config);
        service.initialize()?;
        Ok(Self { service })
    }

    pub async fn hook(&self, data: &HookData) -> Result<MessageReturn<HookResponse>> {
        let payload = serde_json::to_value(data).map_err(|err| HookError::payload(HOOK, err))?;
        match self.service.request(HOOK, payload).await? {
            Ok(value) => serde_json::from_value(value)
                .map(Ok)
                .map_err(|err| HookError::payload(&response_name(HOOK), err)),
            Err(errors) => Ok(Err(errors)),
        }
    }

    /// Create a hook showing `node` for the value at `path`.
    pub async fn create(
        &self,
        entity_id: EntityId,
        path: Vec<PathComponent>,
        hook_type: &str,
        node: Value,
    ) -> Result<MessageReturn<HookResponse>> {
        self.hook(&HookData {
            hook_id: None,
            entity_id,
            path,
            hook_type: hook_type.to_string(),
            node: Some(node),
        })
        .await
    }

    /// Remove a hook created earlier.
    pub async fn remove(
        &self,
        hook_id: &str,
        entity_id: EntityId,
        path: Vec<PathComponent>,
        hook_type: &str,
    ) -> Result<MessageReturn<HookResponse>> {
        self.hook(&HookData {
            hook_id: Some(hook_id.to_string()),
            entity_id,
            path,
            hook_type: hook_type.to_string(),
            node: None,
        })
        .await
    }

    pub async fn ready(&self) -> Result<()> {
        self.service.ready().await?;
        Ok(())
    }

    pub fn destroy(&self) {
        self.service.destroy();
    }
}
