//! The block side of the graph service.

use std::sync::Arc;

use blockgraph_core::{
    response_name, Channel, MessageData, MessageReturn, ServiceConfig, ServiceHandler, SourceRole,
};
use blockgraph_subgraph::{Entity, EntityTypeWithMetadata, Subgraph};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tracing::warn;

use crate::catalog::*;
use crate::error::{GraphError, Result};
use crate::types::*;

type Tracked<T> = watch::Receiver<Option<Arc<T>>>;

/// Graph requests from a block, and the block state its embedder pushes.
///
/// Each pushed value is kept as the latest one received; `watch_*` hands out
/// a receiver that is woken whenever it changes.
pub struct GraphBlockHandler {
    service: ServiceHandler,
    block_entity: Tracked<Entity>,
    block_graph: Tracked<Subgraph>,
    entity_types: Tracked<Vec<EntityTypeWithMetadata>>,
    linked_aggregations: Tracked<Vec<LinkedAggregation>>,
    readonly: Tracked<bool>,
}

impl GraphBlockHandler {
    /// Register for pushed state on `channel` and send `init`.
    ///
    /// Must be called from within a Tokio runtime, after the embedder's
    /// handler is listening.
    pub fn connect(channel: Arc<dyn Channel>, config: ServiceConfig) -> Result<Self> {
        let service = ServiceHandler::new(&GRAPH_SERVICE, SourceRole::Block, channel, config);
        let handler = Self {
            block_entity: track(&service, BLOCK_ENTITY)?,
            block_graph: track(&service, BLOCK_GRAPH)?,
            entity_types: track(&service, ENTITY_TYPES)?,
            linked_aggregations: track(&service, LINKED_AGGREGATIONS)?,
            readonly: track(&service, READONLY)?,
            service,
        };
        handler.service.initialize()?;
        Ok(handler)
    }

    pub fn block_entity(&self) -> Option<Arc<Entity>> {
        self.block_entity.borrow().clone()
    }

    pub fn block_graph(&self) -> Option<Arc<Subgraph>> {
        self.block_graph.borrow().clone()
    }

    pub fn entity_types(&self) -> Option<Arc<Vec<EntityTypeWithMetadata>>> {
        self.entity_types.borrow().clone()
    }

    pub fn linked_aggregations(&self) -> Option<Arc<Vec<LinkedAggregation>>> {
        self.linked_aggregations.borrow().clone()
    }

    /// Whether the embedder has marked the block read-only. `false` until told.
    pub fn is_readonly(&self) -> bool {
        self.readonly.borrow().as_deref().copied().unwrap_or(false)
    }

    pub fn watch_block_entity(&self) -> Tracked<Entity> {
        self.block_entity.clone()
    }

    pub fn watch_block_graph(&self) -> Tracked<Subgraph> {
        self.block_graph.clone()
    }

    pub fn watch_entity_types(&self) -> Tracked<Vec<EntityTypeWithMetadata>> {
        self.entity_types.clone()
    }

    pub fn watch_linked_aggregations(&self) -> Tracked<Vec<LinkedAggregation>> {
        self.linked_aggregations.clone()
    }

    pub fn watch_readonly(&self) -> Tracked<bool> {
        self.readonly.clone()
    }

    /// Wait for the embedder's `initResponse`.
    pub async fn ready(&self) -> Result<()> {
        self.service.ready().await?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.service.is_initialized()
    }

    pub fn destroy(&self) {
        self.service.destroy();
    }

    async fn call<P, R>(&self, message_name: &str, payload: &P) -> Result<MessageReturn<R>>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let data = serde_json::to_value(payload).map_err(|err| GraphError::payload(message_name, err))?;
        match self.service.request(message_name, data).await? {
            Ok(value) => serde_json::from_value(value)
                .map(Ok)
                .map_err(|err| GraphError::payload(&response_name(message_name), err)),
            Err(errors) => Ok(Err(errors)),
        }
    }

    pub async fn create_entity(&self, data: &CreateEntityData) -> Result<MessageReturn<Entity>> {
        self.call(CREATE_ENTITY, data).await
    }

    pub async fn update_entity(&self, data: &UpdateEntityData) -> Result<MessageReturn<Entity>> {
        self.call(UPDATE_ENTITY, data).await
    }

    pub async fn delete_entity(&self, data: &DeleteEntityData) -> Result<MessageReturn<bool>> {
        self.call(DELETE_ENTITY, data).await
    }

    pub async fn get_entity(&self, data: &GetEntityData) -> Result<MessageReturn<Subgraph>> {
        self.call(GET_ENTITY, data).await
    }

    pub async fn aggregate_entities(
        &self,
        data: &AggregateEntitiesData,
    ) -> Result<MessageReturn<AggregateEntitiesResult>> {
        self.call(AGGREGATE_ENTITIES, data).await
    }

    pub async fn query_entities(&self, data: &QueryEntitiesData) -> Result<MessageReturn<QueryEntitiesResult>> {
        self.call(QUERY_ENTITIES, data).await
    }

    pub async fn create_entity_type(
        &self,
        data: &CreateEntityTypeData,
    ) -> Result<MessageReturn<EntityTypeWithMetadata>> {
        self.call(CREATE_ENTITY_TYPE, data).await
    }

    pub async fn update_entity_type(
        &self,
        data: &UpdateEntityTypeData,
    ) -> Result<MessageReturn<EntityTypeWithMetadata>> {
        self.call(UPDATE_ENTITY_TYPE, data).await
    }

    pub async fn delete_entity_type(&self, data: &DeleteEntityTypeData) -> Result<MessageReturn<bool>> {
        self.call(DELETE_ENTITY_TYPE, data).await
    }

    pub async fn get_entity_type(&self, data: &GetEntityTypeData) -> Result<MessageReturn<Subgraph>> {
        self.call(GET_ENTITY_TYPE, data).await
    }

    pub async fn aggregate_entity_types(
        &self,
        data: &AggregateEntityTypesData,
    ) -> Result<MessageReturn<AggregateEntityTypesResult>> {
        self.call(AGGREGATE_ENTITY_TYPES, data).await
    }

    pub async fn create_link(&self, data: &CreateLinkData) -> Result<MessageReturn<Entity>> {
        self.call(CREATE_LINK, data).await
    }

    pub async fn update_link(&self, data: &UpdateLinkData) -> Result<MessageReturn<Entity>> {
        self.call(UPDATE_LINK, data).await
    }

    pub async fn delete_link(&self, data: &DeleteLinkData) -> Result<MessageReturn<bool>> {
        self.call(DELETE_LINK, data).await
    }

    pub async fn get_link(&self, data: &GetLinkData) -> Result<MessageReturn<Entity>> {
        self.call(GET_LINK, data).await
    }

    pub async fn create_linked_aggregation(
        &self,
        data: &CreateLinkedAggregationData,
    ) -> Result<MessageReturn<LinkedAggregationDefinition>> {
        self.call(CREATE_LINKED_AGGREGATION, data).await
    }

    pub async fn update_linked_aggregation(
        &self,
        data: &UpdateLinkedAggregationData,
    ) -> Result<MessageReturn<LinkedAggregationDefinition>> {
        self.call(UPDATE_LINKED_AGGREGATION, data).await
    }

    pub async fn delete_linked_aggregation(
        &self,
        data: &DeleteLinkedAggregationData,
    ) -> Result<MessageReturn<bool>> {
        self.call(DELETE_LINKED_AGGREGATION, data).await
    }

    pub async fn get_linked_aggregation(
        &self,
        data: &GetLinkedAggregationData,
    ) -> Result<MessageReturn<LinkedAggregation>> {
        self.call(GET_LINKED_AGGREGATION, data).await
    }

    pub async fn upload_file(&self, data: &UploadFileData) -> Result<MessageReturn<UploadFileReturn>> {
        self.call(UPLOAD_FILE, data).await
    }
}

/// Keep the latest value pushed under `message_name`.
///
/// A value that does not decode is logged and dropped; the previous one stays.
fn track<T>(service: &ServiceHandler, message_name: &'static str) -> Result<Tracked<T>>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let (tx, rx) = watch::channel(None);
    service.on(message_name, move |message: MessageData| {
        match message.data.map(serde_json::from_value::<T>) {
            Some(Ok(value)) => {
                tx.send_replace(Some(Arc::new(value)));
            }
            Some(Err(err)) => warn!(message_name, %err, "dropping undecodable value"),
            None => warn!(message_name, "notification without data"),
        }
        async { MessageData::empty() }
    })?;
    Ok(rx)
}
