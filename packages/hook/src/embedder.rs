//! The embedder side of the hook service.
//!
//! Hooks live in an arena keyed by `hookId`. A request without an id creates
//! a hook, one with an id and a node updates it, and one with an id and a
//! `null` node removes it. The [`HookRenderer`] is told about each change.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use blockgraph_core::{
    Channel, ErrorCode, MessageData, MessageReturn, ResourceErrors, ServiceConfig, ServiceHandler,
    SourceRole,
};
use tokio::sync::Mutex;
use tracing::{debug, error};
use uuid::Uuid;

use crate::catalog::{HOOK, HOOK_SERVICE};
use crate::error::Result;
use crate::types::{Hook, HookData, HookResponse};

/// Draws hooks for the embedder.
///
/// Errors are passed back to the block; on a failed `render` the arena is
/// left as it was.
#[async_trait]
pub trait HookRenderer: Send + Sync {
    async fn render(&self, hook_id: &str, hook: &Hook) -> MessageReturn<()>;

    async fn teardown(&self, hook_id: &str, hook: &Hook) -> MessageReturn<()> {
        let _ = (hook_id, hook);
        Ok(())
    }
}

/// Live hooks by id.
#[derive(Debug, Default)]
pub struct HookArena {
    hooks: BTreeMap<String, Hook>,
}

impl HookArena {
    pub fn get(&self, hook_id: &str) -> Option<&Hook> {
        self.hooks.get(hook_id)
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Apply one `hook` request, telling `renderer` before committing.
    pub async fn apply(&mut self, data: HookData, renderer: &dyn HookRenderer) -> MessageReturn<HookResponse> {
        let HookData {
            hook_id,
            entity_id,
            path,
            hook_type,
            node,
        } = data;

        match (hook_id, node) {
            (None, None) => Err(ResourceErrors::single(
                ErrorCode::InvalidInput,
                "hook requires a 'node' when no 'hookId' is given",
            )),
            (None, Some(node)) => {
                let hook_id = Uuid::new_v4().to_string();
                let hook = Hook {
                    entity_id,
                    path,
                    hook_type,
                    node,
                };
                renderer.render(&hook_id, &hook).await?;
                debug!(%hook_id, "hook created");
                self.hooks.insert(hook_id.clone(), hook);
                Ok(HookResponse { hook_id })
            }
            (Some(hook_id), node) => {
                let Some(existing) = self.hooks.get(&hook_id) else {
                    return Err(ResourceErrors::single(
                        ErrorCode::NotFound,
                        format!("Could not find hook with hookId '{hook_id}'"),
                    ));
                };
                match node {
                    Some(node) => {
                        let hook = Hook {
                            entity_id,
                            path,
                            hook_type,
                            node,
                        };
                        renderer.render(&hook_id, &hook).await?;
                        debug!(%hook_id, "hook updated");
                        self.hooks.insert(hook_id.clone(), hook);
                    }
                    None => {
                        renderer.teardown(&hook_id, existing).await?;
                        debug!(%hook_id, "hook removed");
                        self.hooks.remove(&hook_id);
                    }
                }
                Ok(HookResponse { hook_id })
            }
        }
    }
}

/// Serves `hook` requests from a block.
pub struct HookEmbedderHandler {
    service: ServiceHandler,
    arena: Arc<Mutex<HookArena>>,
}

impl HookEmbedderHandler {
    /// Must be called from within a Tokio runtime.
    pub fn connect(
        channel: Arc<dyn Channel>,
        config: ServiceConfig,
        renderer: Arc<dyn HookRenderer>,
    ) -> Result<Self> {
        let service = ServiceHandler::new(&HOOK_SERVICE, SourceRole::Embedder, channel, config);
        let arena = Arc::new(Mutex::new(HookArena::default()));

        let requests = Arc::clone(&arena);
        service.on(HOOK, move |message: MessageData| {
            let arena = Arc::clone(&requests);
            let renderer = Arc::clone(&renderer);
            async move {
                let data = message
                    .data
                    .map(serde_json::from_value::<HookData>)
                    .transpose()
                    .map_err(|err| format!("invalid `{HOOK}` data: {err}"))
                    .and_then(|data| data.ok_or_else(|| format!("{HOOK} requires 'data' input")));
                let data = match data {
                    Ok(data) => data,
                    Err(message) => return MessageData::error(ErrorCode::InvalidInput, message),
                };

                let result = arena.lock().await.apply(data, renderer.as_ref()).await;
                match result.map(serde_json::to_value) {
                    Ok(Ok(value)) => MessageData::data(value),
                    Ok(Err(err)) => {
                        error!(%err, "failed to encode hook response");
                        MessageData::error(ErrorCode::InternalError, "could not encode hook response")
                    }
                    Err(errors) => MessageData::errors(errors),
                }
            }
        })?;

        Ok(Self { service, arena })
    }

    /// A copy of the hook under `hook_id`.
    pub async fn hook(&self, hook_id: &str) -> Option<Hook> {
        self.arena.lock().await.get(hook_id).cloned()
    }

    pub async fn hook_count(&self) -> usize {
        self.arena.lock().await.len()
    }

    pub async fn ready(&self) -> Result<()> {
        self.service.ready().await?;
        Ok(())
    }

    pub fn destroy(&self) {
        self.service.destroy();
    }
}

/// A renderer that draws nothing. Useful where hooks only need tracking.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRenderer;

#[async_trait]
impl HookRenderer for NoopRenderer {
    async fn render(&self, _hook_id: &str, _hook: &Hook) -> MessageReturn<()> {
        Ok(())
    }
}
