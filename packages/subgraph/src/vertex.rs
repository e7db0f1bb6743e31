//! Subgraph vertices.
//!
//! Vertices are addressed by `(baseId, version)`. Entities are keyed by
//! [`EntityId`] and edition [`Timestamp`]; ontology types by [`BaseUrl`] and
//! integer version. Every vertex under one base id has the same kind.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::entity::Entity;
use crate::error::{Result, SubgraphError};
use crate::ids::{EntityEditionId, EntityId, OntologyTypeEditionId, Timestamp};
use crate::ontology::{DataTypeWithMetadata, EntityTypeWithMetadata, PropertyTypeWithMetadata};
use crate::url::BaseUrl;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VertexKind {
    DataType,
    PropertyType,
    EntityType,
    Entity,
}

impl fmt::Display for VertexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VertexKind::DataType => "dataType",
            VertexKind::PropertyType => "propertyType",
            VertexKind::EntityType => "entityType",
            VertexKind::Entity => "entity",
        };
        f.write_str(name)
    }
}

/// A vertex as it appears on the wire: `{ kind, inner }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "inner", rename_all = "camelCase")]
pub enum Vertex {
    DataType(DataTypeWithMetadata),
    PropertyType(PropertyTypeWithMetadata),
    EntityType(EntityTypeWithMetadata),
    Entity(Entity),
}

impl Vertex {
    pub fn kind(&self) -> VertexKind {
        match self {
            Vertex::DataType(_) => VertexKind::DataType,
            Vertex::PropertyType(_) => VertexKind::PropertyType,
            Vertex::EntityType(_) => VertexKind::EntityType,
            Vertex::Entity(_) => VertexKind::Entity,
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Vertex::Entity(entity) => Some(entity),
            _ => None,
        }
    }
}

/// An ontology vertex. Split out so the entity map can hold [`Entity`]
/// directly.
#[derive(Debug, Clone, PartialEq)]
pub enum OntologyVertex {
    DataType(DataTypeWithMetadata),
    PropertyType(PropertyTypeWithMetadata),
    EntityType(EntityTypeWithMetadata),
}

impl OntologyVertex {
    pub fn kind(&self) -> VertexKind {
        match self {
            OntologyVertex::DataType(_) => VertexKind::DataType,
            OntologyVertex::PropertyType(_) => VertexKind::PropertyType,
            OntologyVertex::EntityType(_) => VertexKind::EntityType,
        }
    }

    pub fn record_id(&self) -> &OntologyTypeEditionId {
        match self {
            OntologyVertex::DataType(inner) => inner.record_id(),
            OntologyVertex::PropertyType(inner) => inner.record_id(),
            OntologyVertex::EntityType(inner) => inner.record_id(),
        }
    }

    fn to_vertex(&self) -> Vertex {
        match self.clone() {
            OntologyVertex::DataType(inner) => Vertex::DataType(inner),
            OntologyVertex::PropertyType(inner) => Vertex::PropertyType(inner),
            OntologyVertex::EntityType(inner) => Vertex::EntityType(inner),
        }
    }
}

impl From<DataTypeWithMetadata> for OntologyVertex {
    fn from(inner: DataTypeWithMetadata) -> Self {
        OntologyVertex::DataType(inner)
    }
}

impl From<PropertyTypeWithMetadata> for OntologyVertex {
    fn from(inner: PropertyTypeWithMetadata) -> Self {
        OntologyVertex::PropertyType(inner)
    }
}

impl From<EntityTypeWithMetadata> for OntologyVertex {
    fn from(inner: EntityTypeWithMetadata) -> Self {
        OntologyVertex::EntityType(inner)
    }
}

/// `baseId -> version -> vertex`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vertices {
    entities: BTreeMap<EntityId, BTreeMap<Timestamp, Entity>>,
    ontology: BTreeMap<BaseUrl, BTreeMap<u32, OntologyVertex>>,
}

impl Vertices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity edition, replacing an identical edition id.
    pub fn insert_entity(&mut self, entity: Entity) {
        self.entities
            .entry(entity.entity_id().clone())
            .or_default()
            .insert(entity.edition_timestamp().clone(), entity);
    }

    /// Insert an ontology type. Fails if another kind is already stored
    /// under the same base URL.
    pub fn insert_ontology_type(&mut self, vertex: impl Into<OntologyVertex>) -> Result<()> {
        let vertex = vertex.into();
        let record_id = vertex.record_id().clone();
        let versions = self.ontology.entry(record_id.base_id.clone()).or_default();
        if let Some(existing) = versions.values().next() {
            if existing.kind() != vertex.kind() {
                return Err(SubgraphError::MixedVertexKinds {
                    base_id: record_id.base_id.to_string(),
                    expected: existing.kind(),
                    found: vertex.kind(),
                });
            }
        }
        versions.insert(record_id.version_id, vertex);
        Ok(())
    }

    /// All editions of an entity, ordered by edition timestamp.
    pub fn entity_editions(&self, entity_id: &EntityId) -> Option<&BTreeMap<Timestamp, Entity>> {
        self.entities.get(entity_id)
    }

    pub fn entity(&self, id: &EntityEditionId) -> Option<&Entity> {
        self.entities.get(&id.base_id)?.get(&id.timestamp)
    }

    pub fn entities(&self) -> impl Iterator<Item = (&EntityId, &BTreeMap<Timestamp, Entity>)> {
        self.entities.iter()
    }

    /// All versions of an ontology type, ordered by version.
    pub fn ontology_versions(&self, base_url: &BaseUrl) -> Option<&BTreeMap<u32, OntologyVertex>> {
        self.ontology.get(base_url)
    }

    pub fn ontology_type(&self, id: &OntologyTypeEditionId) -> Option<&OntologyVertex> {
        self.ontology.get(&id.base_id)?.get(&id.version_id)
    }

    pub fn ontology_types(&self) -> impl Iterator<Item = &OntologyVertex> {
        self.ontology.values().flat_map(BTreeMap::values)
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.ontology.is_empty()
    }
}

impl Serialize for Vertices {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entities.len() + self.ontology.len()))?;
        for (entity_id, editions) in &self.entities {
            let editions: BTreeMap<&str, Vertex> = editions
                .iter()
                .map(|(timestamp, entity)| (timestamp.as_str(), Vertex::Entity(entity.clone())))
                .collect();
            map.serialize_entry(entity_id.as_str(), &editions)?;
        }
        for (base_url, versions) in &self.ontology {
            let versions: BTreeMap<String, Vertex> = versions
                .iter()
                .map(|(version, vertex)| (version.to_string(), vertex.to_vertex()))
                .collect();
            map.serialize_entry(base_url.as_str(), &versions)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Vertices {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, BTreeMap<String, Vertex>>::deserialize(deserializer)?;
        Vertices::from_raw(raw).map_err(de::Error::custom)
    }
}

impl Vertices {
    fn from_raw(raw: BTreeMap<String, BTreeMap<String, Vertex>>) -> Result<Self> {
        let mut vertices = Vertices::new();
        for (base_id, versions) in raw {
            let mut kind = None;
            for (key, vertex) in versions {
                let found = vertex.kind();
                match kind {
                    None => kind = Some(found),
                    Some(expected) if expected != found => {
                        return Err(SubgraphError::MixedVertexKinds {
                            base_id,
                            expected,
                            found,
                        });
                    }
                    Some(_) => {}
                }

                match vertex {
                    Vertex::Entity(entity) => {
                        if entity.entity_id().as_str() != base_id
                            || entity.edition_timestamp().as_str() != key
                        {
                            return Err(SubgraphError::InvalidVersionKey { base_id, key });
                        }
                        vertices.insert_entity(entity);
                    }
                    Vertex::DataType(inner) => {
                        check_ontology_key(inner.record_id(), &base_id, &key)?;
                        vertices.insert_ontology_type(inner)?;
                    }
                    Vertex::PropertyType(inner) => {
                        check_ontology_key(inner.record_id(), &base_id, &key)?;
                        vertices.insert_ontology_type(inner)?;
                    }
                    Vertex::EntityType(inner) => {
                        check_ontology_key(inner.record_id(), &base_id, &key)?;
                        vertices.insert_ontology_type(inner)?;
                    }
                }
            }
        }
        Ok(vertices)
    }
}

fn check_ontology_key(record_id: &OntologyTypeEditionId, base_id: &str, key: &str) -> Result<()> {
    if record_id.base_id.as_str() != base_id || record_id.version_id.to_string() != key {
        return Err(SubgraphError::InvalidVersionKey {
            base_id: base_id.to_string(),
            key: key.to_string(),
        });
    }
    Ok(())
}
