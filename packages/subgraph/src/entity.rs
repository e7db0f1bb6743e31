//! Entities and link entities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{EntityEditionId, EntityId, EntityRecordId, Timestamp};
use crate::interval::TimeInterval;
use crate::url::VersionedUrl;

/// Property map keyed by property type base URL.
pub type EntityProperties = BTreeMap<String, Value>;

/// Validity of an edition along both temporal axes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTemporalVersioning {
    pub decision_time: TimeInterval,
    pub transaction_time: TimeInterval,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadata {
    pub record_id: EntityRecordId,
    pub entity_type_id: VersionedUrl,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_versioning: Option<EntityTemporalVersioning>,
}

/// Marks an entity as a link from `left_entity_id` to `right_entity_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkData {
    pub left_entity_id: EntityId,
    pub right_entity_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_to_right_order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_to_left_order: Option<i64>,
}

impl LinkData {
    pub fn new(left: impl Into<EntityId>, right: impl Into<EntityId>) -> Self {
        Self {
            left_entity_id: left.into(),
            right_entity_id: right.into(),
            left_to_right_order: None,
            right_to_left_order: None,
        }
    }
}

/// One immutable edition of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub metadata: EntityMetadata,
    #[serde(default)]
    pub properties: EntityProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_data: Option<LinkData>,
}

impl Entity {
    pub fn new(record_id: EntityRecordId, entity_type_id: VersionedUrl) -> Self {
        Self {
            metadata: EntityMetadata {
                record_id,
                entity_type_id,
                temporal_versioning: None,
            },
            properties: EntityProperties::new(),
            link_data: None,
        }
    }

    pub fn with_properties(mut self, properties: EntityProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_link_data(mut self, link_data: LinkData) -> Self {
        self.link_data = Some(link_data);
        self
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.metadata.record_id.entity_id
    }

    /// The timestamp at which this edition became valid.
    pub fn edition_timestamp(&self) -> &Timestamp {
        &self.metadata.record_id.edition_id
    }

    pub fn edition_id(&self) -> EntityEditionId {
        self.metadata.record_id.edition_id()
    }

    pub fn entity_type_id(&self) -> &VersionedUrl {
        &self.metadata.entity_type_id
    }

    pub fn is_link(&self) -> bool {
        self.link_data.is_some()
    }
}
