//! Payloads and results of graph service messages.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use blockgraph_subgraph::{
    Entity, EntityId, EntityProperties, EntityTypeWithMetadata, GraphResolveDepths, LinkData,
    Subgraph, VersionedUrl,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::{AggregateOperation, AggregateOperationOutput, MultiFilter};

// --- Entities ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntityData {
    pub entity_type_id: VersionedUrl,
    #[serde(default)]
    pub properties: EntityProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_data: Option<LinkData>,
}

/// Writes a new edition. Omitted fields keep the previous edition's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntityData {
    pub entity_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type_id: Option<VersionedUrl>,
    pub properties: EntityProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_to_right_order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_to_left_order: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEntityData {
    pub entity_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEntityData {
    pub entity_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_resolve_depths: Option<GraphResolveDepths>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateEntitiesData {
    #[serde(default)]
    pub operation: AggregateOperation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_resolve_depths: Option<GraphResolveDepths>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateEntitiesResult {
    pub results: Subgraph,
    pub operation: AggregateOperationOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOperation {
    pub multi_filter: MultiFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEntitiesData {
    pub operation: QueryOperation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_resolve_depths: Option<GraphResolveDepths>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEntitiesResult {
    pub results: Subgraph,
    pub operation: QueryOperation,
}

// --- Entity types ---

/// The schema's `$id` becomes the type's id. Without one, an id is minted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntityTypeData {
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntityTypeData {
    pub entity_type_id: VersionedUrl,
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEntityTypeData {
    pub entity_type_id: VersionedUrl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEntityTypeData {
    pub entity_type_id: VersionedUrl,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_resolve_depths: Option<GraphResolveDepths>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateEntityTypesData {
    #[serde(default)]
    pub operation: AggregateOperation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_resolve_depths: Option<GraphResolveDepths>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateEntityTypesResult {
    pub results: Subgraph,
    pub operation: AggregateOperationOutput,
}

// --- Links ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkData {
    pub left_entity_id: EntityId,
    pub right_entity_id: EntityId,
    pub link_entity_type_id: VersionedUrl,
    #[serde(default)]
    pub properties: EntityProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_to_right_order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_to_left_order: Option<i64>,
}

impl CreateLinkData {
    pub fn link_data(&self) -> LinkData {
        LinkData {
            left_entity_id: self.left_entity_id.clone(),
            right_entity_id: self.right_entity_id.clone(),
            left_to_right_order: self.left_to_right_order,
            right_to_left_order: self.right_to_left_order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLinkData {
    pub link_entity_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<EntityProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_to_right_order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_to_left_order: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteLinkData {
    pub link_entity_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLinkData {
    pub link_entity_id: EntityId,
}

// --- Linked aggregations ---

/// A stored aggregation hanging off `source_entity_id` at `path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedAggregationDefinition {
    pub aggregation_id: String,
    pub source_entity_id: EntityId,
    pub path: String,
    pub operation: AggregateOperation,
}

/// A linked aggregation together with its current results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedAggregation {
    pub aggregation_id: String,
    pub source_entity_id: EntityId,
    pub path: String,
    pub results: Vec<Entity>,
    pub operation: AggregateOperationOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkedAggregationData {
    pub source_entity_id: EntityId,
    pub path: String,
    #[serde(default)]
    pub operation: AggregateOperation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLinkedAggregationData {
    pub aggregation_id: String,
    pub operation: AggregateOperation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteLinkedAggregationData {
    pub aggregation_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLinkedAggregationData {
    pub aggregation_id: String,
}

// --- Files ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileMediaType {
    Image,
    Video,
}

impl FileMediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            FileMediaType::Image => "image",
            FileMediaType::Video => "video",
        }
    }
}

/// File contents carried inline, base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub data: String,
}

impl FileContent {
    pub fn from_bytes(name: impl Into<String>, mime_type: Option<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            mime_type,
            data: STANDARD.encode(bytes),
        }
    }

    pub fn bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.data)
    }

    /// The contents as a `data:` URL. Fails if `data` is not valid base64.
    pub fn to_data_url(&self) -> Result<String, base64::DecodeError> {
        let bytes = self.bytes()?;
        let mime_type = self
            .mime_type
            .as_deref()
            .unwrap_or("application/octet-stream");
        Ok(format!("data:{mime_type};base64,{}", STANDARD.encode(bytes)))
    }
}

/// Either `file` or `url` must be given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub media_type: FileMediaType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileReturn {
    pub entity_id: EntityId,
    pub url: String,
    pub media_type: FileMediaType,
}

// --- Embedder state ---

/// What the embedder pushes to a block on initialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockGraphProperties {
    pub block_entity: Option<Entity>,
    pub block_graph: Option<Subgraph>,
    pub entity_types: Option<Vec<EntityTypeWithMetadata>>,
    pub linked_aggregations: Option<Vec<LinkedAggregation>>,
    pub readonly: bool,
}
