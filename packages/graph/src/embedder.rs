//! The embedder side of the graph service.
//!
//! An application serves graph requests by implementing [`GraphEmbedder`]
//! and connecting it to a channel with [`GraphEmbedderHandler::connect`].
//! The handler decodes each request, refuses mutations while the block is
//! read-only, and pushes block state as notifications.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use blockgraph_core::{
    Channel, ErrorCode, MessageData, MessageReturn, ResourceErrors, ServiceConfig, ServiceHandler,
    SourceRole,
};
use blockgraph_subgraph::{Entity, EntityTypeWithMetadata, Subgraph};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::catalog::*;
use crate::error::{GraphError, Result};
use crate::types::*;

pub const READONLY_MESSAGE: &str = "Operation can't be carried out in read-only mode";

fn unsupported(message_name: &str) -> ResourceErrors {
    ResourceErrors::single(
        ErrorCode::InternalError,
        format!("`{message_name}` is not supported by this embedder"),
    )
}

/// The data store behind an embedder.
///
/// Every method has a default that reports `INTERNAL_ERROR`, so an embedder
/// implements only what it supports.
#[async_trait]
pub trait GraphEmbedder: Send + Sync {
    async fn create_entity(&self, data: CreateEntityData) -> MessageReturn<Entity> {
        let _ = data;
        Err(unsupported(CREATE_ENTITY))
    }

    async fn update_entity(&self, data: UpdateEntityData) -> MessageReturn<Entity> {
        let _ = data;
        Err(unsupported(UPDATE_ENTITY))
    }

    async fn delete_entity(&self, data: DeleteEntityData) -> MessageReturn<bool> {
        let _ = data;
        Err(unsupported(DELETE_ENTITY))
    }

    async fn get_entity(&self, data: GetEntityData) -> MessageReturn<Subgraph> {
        let _ = data;
        Err(unsupported(GET_ENTITY))
    }

    async fn aggregate_entities(
        &self,
        data: AggregateEntitiesData,
    ) -> MessageReturn<AggregateEntitiesResult> {
        let _ = data;
        Err(unsupported(AGGREGATE_ENTITIES))
    }

    async fn query_entities(&self, data: QueryEntitiesData) -> MessageReturn<QueryEntitiesResult> {
        let _ = data;
        Err(unsupported(QUERY_ENTITIES))
    }

    async fn create_entity_type(
        &self,
        data: CreateEntityTypeData,
    ) -> MessageReturn<EntityTypeWithMetadata> {
        let _ = data;
        Err(unsupported(CREATE_ENTITY_TYPE))
    }

    async fn update_entity_type(
        &self,
        data: UpdateEntityTypeData,
    ) -> MessageReturn<EntityTypeWithMetadata> {
        let _ = data;
        Err(unsupported(UPDATE_ENTITY_TYPE))
    }

    async fn delete_entity_type(&self, data: DeleteEntityTypeData) -> MessageReturn<bool> {
        let _ = data;
        Err(unsupported(DELETE_ENTITY_TYPE))
    }

    async fn get_entity_type(&self, data: GetEntityTypeData) -> MessageReturn<Subgraph> {
        let _ = data;
        Err(unsupported(GET_ENTITY_TYPE))
    }

    async fn aggregate_entity_types(
        &self,
        data: AggregateEntityTypesData,
    ) -> MessageReturn<AggregateEntityTypesResult> {
        let _ = data;
        Err(unsupported(AGGREGATE_ENTITY_TYPES))
    }

    async fn create_link(&self, data: CreateLinkData) -> MessageReturn<Entity> {
        let _ = data;
        Err(unsupported(CREATE_LINK))
    }

    async fn update_link(&self, data: UpdateLinkData) -> MessageReturn<Entity> {
        let _ = data;
        Err(unsupported(UPDATE_LINK))
    }

    async fn delete_link(&self, data: DeleteLinkData) -> MessageReturn<bool> {
        let _ = data;
        Err(unsupported(DELETE_LINK))
    }

    async fn get_link(&self, data: GetLinkData) -> MessageReturn<Entity> {
        let _ = data;
        Err(unsupported(GET_LINK))
    }

    async fn create_linked_aggregation(
        &self,
        data: CreateLinkedAggregationData,
    ) -> MessageReturn<LinkedAggregationDefinition> {
        let _ = data;
        Err(unsupported(CREATE_LINKED_AGGREGATION))
    }

    async fn update_linked_aggregation(
        &self,
        data: UpdateLinkedAggregationData,
    ) -> MessageReturn<LinkedAggregationDefinition> {
        let _ = data;
        Err(unsupported(UPDATE_LINKED_AGGREGATION))
    }

    async fn delete_linked_aggregation(
        &self,
        data: DeleteLinkedAggregationData,
    ) -> MessageReturn<bool> {
        let _ = data;
        Err(unsupported(DELETE_LINKED_AGGREGATION))
    }

    async fn get_linked_aggregation(
        &self,
        data: GetLinkedAggregationData,
    ) -> MessageReturn<LinkedAggregation> {
        let _ = data;
        Err(unsupported(GET_LINKED_AGGREGATION))
    }

    async fn upload_file(&self, data: UploadFileData) -> MessageReturn<UploadFileReturn> {
        let _ = data;
        Err(unsupported(UPLOAD_FILE))
    }
}

/// Decode a request payload. A missing payload decodes as `{}`, so requests
/// whose fields all have defaults may omit it.
fn decode<P: DeserializeOwned>(message_name: &str, data: Option<Value>) -> MessageReturn<P> {
    let present = data.is_some();
    let data = data.unwrap_or_else(|| Value::Object(Map::new()));
    serde_json::from_value(data).map_err(|err| {
        let message = if present {
            format!("invalid `{message_name}` data: {err}")
        } else {
            format!("{message_name} requires 'data' input")
        };
        ResourceErrors::single(ErrorCode::InvalidInput, message)
    })
}

fn encode<R: Serialize>(message_name: &str, result: MessageReturn<R>) -> MessageData {
    match result.map(serde_json::to_value) {
        Ok(Ok(data)) => MessageData::data(data),
        Ok(Err(err)) => {
            error!(message_name, %err, "failed to encode response");
            MessageData::error(ErrorCode::InternalError, format!("could not encode `{message_name}` result"))
        }
        Err(errors) => MessageData::errors(errors),
    }
}

/// Serves graph requests from a block and pushes block state to it.
pub struct GraphEmbedderHandler {
    service: ServiceHandler,
    readonly: Arc<AtomicBool>,
}

impl GraphEmbedderHandler {
    /// Start serving `embedder` on `channel`.
    ///
    /// `properties` become the values the block receives in the handshake.
    /// Must be called from within a Tokio runtime.
    pub fn connect(
        channel: Arc<dyn Channel>,
        config: ServiceConfig,
        properties: BlockGraphProperties,
        embedder: Arc<dyn GraphEmbedder>,
    ) -> Result<Self> {
        let service = ServiceHandler::new(&GRAPH_SERVICE, SourceRole::Embedder, channel, config);
        let handler = Self {
            service,
            readonly: Arc::new(AtomicBool::new(properties.readonly)),
        };
        handler.register_routes(&embedder)?;

        if let Some(entity) = &properties.block_entity {
            handler.push_block_entity(entity)?;
        }
        if let Some(subgraph) = &properties.block_graph {
            handler.push_block_graph(subgraph)?;
        }
        if let Some(entity_types) = &properties.entity_types {
            handler.push_entity_types(entity_types)?;
        }
        if let Some(aggregations) = &properties.linked_aggregations {
            handler.push_linked_aggregations(aggregations)?;
        }
        handler.set_readonly(properties.readonly)?;
        Ok(handler)
    }

    fn register_routes(&self, embedder: &Arc<dyn GraphEmbedder>) -> Result<()> {
        macro_rules! route {
            ($($name:ident => $method:ident),* $(,)?) => {
                $(
                    self.route($name, embedder, |embedder: Arc<dyn GraphEmbedder>, data| async move {
                        embedder.$method(data).await
                    })?;
                )*
            };
        }

        route! {
            CREATE_ENTITY => create_entity,
            UPDATE_ENTITY => update_entity,
            DELETE_ENTITY => delete_entity,
            GET_ENTITY => get_entity,
            AGGREGATE_ENTITIES => aggregate_entities,
            QUERY_ENTITIES => query_entities,
            CREATE_ENTITY_TYPE => create_entity_type,
            UPDATE_ENTITY_TYPE => update_entity_type,
            DELETE_ENTITY_TYPE => delete_entity_type,
            GET_ENTITY_TYPE => get_entity_type,
            AGGREGATE_ENTITY_TYPES => aggregate_entity_types,
            CREATE_LINK => create_link,
            UPDATE_LINK => update_link,
            DELETE_LINK => delete_link,
            GET_LINK => get_link,
            CREATE_LINKED_AGGREGATION => create_linked_aggregation,
            UPDATE_LINKED_AGGREGATION => update_linked_aggregation,
            DELETE_LINKED_AGGREGATION => delete_linked_aggregation,
            GET_LINKED_AGGREGATION => get_linked_aggregation,
            UPLOAD_FILE => upload_file,
        }
        Ok(())
    }

    fn route<P, R, F, Fut>(
        &self,
        message_name: &'static str,
        embedder: &Arc<dyn GraphEmbedder>,
        handle: F,
    ) -> Result<()>
    where
        P: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(Arc<dyn GraphEmbedder>, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = MessageReturn<R>> + Send + 'static,
    {
        let embedder = Arc::clone(embedder);
        let readonly = Arc::clone(&self.readonly);
        let mutation = is_mutation(message_name);

        self.service.on(message_name, move |message: MessageData| {
            let call = if mutation && readonly.load(Ordering::SeqCst) {
                Err(ResourceErrors::single(ErrorCode::Forbidden, READONLY_MESSAGE))
            } else {
                decode::<P>(message_name, message.data)
                    .map(|payload| handle(Arc::clone(&embedder), payload))
            };
            async move {
                match call {
                    Ok(pending) => encode(message_name, pending.await),
                    Err(errors) => MessageData::errors(errors),
                }
            }
        })?;
        Ok(())
    }

    fn push<T: Serialize + ?Sized>(&self, message_name: &str, value: &T) -> Result<()> {
        let data = serde_json::to_value(value).map_err(|err| GraphError::payload(message_name, err))?;
        debug!(message_name, "pushing to block");
        self.service.send(message_name, data)?;
        Ok(())
    }

    pub fn push_block_entity(&self, entity: &Entity) -> Result<()> {
        self.push(BLOCK_ENTITY, entity)
    }

    pub fn push_block_graph(&self, subgraph: &Subgraph) -> Result<()> {
        self.push(BLOCK_GRAPH, subgraph)
    }

    pub fn push_entity_types(&self, entity_types: &[EntityTypeWithMetadata]) -> Result<()> {
        self.push(ENTITY_TYPES, entity_types)
    }

    pub fn push_linked_aggregations(&self, aggregations: &[LinkedAggregation]) -> Result<()> {
        self.push(LINKED_AGGREGATIONS, aggregations)
    }

    /// Switch read-only mode and tell the block.
    pub fn set_readonly(&self, readonly: bool) -> Result<()> {
        self.readonly.store(readonly, Ordering::SeqCst);
        self.push(READONLY, &readonly)
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly.load(Ordering::SeqCst)
    }

    pub fn is_initialized(&self) -> bool {
        self.service.is_initialized()
    }

    /// Wait until the block has sent `init` and been answered.
    pub async fn ready(&self) -> Result<()> {
        self.service.ready().await?;
        Ok(())
    }

    pub fn destroy(&self) {
        self.service.destroy();
    }
}
