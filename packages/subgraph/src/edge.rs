//! Subgraph edges.
//!
//! Edges are stored on their left vertex as [`OutwardEdge`]s, grouped by the
//! key of the left vertex edition that created them: an edition timestamp for
//! entities, a version for ontology types. A `reversed` edge is the mirror
//! image stored on the right vertex.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SubgraphError};
use crate::ids::{EntityEditionId, EntityId, OntologyTypeEditionId, Timestamp};
use crate::url::BaseUrl;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    HasLeftEntity,
    HasRightEntity,
    IsOfType,
    InheritsFrom,
    ConstrainsValuesOn,
    ConstrainsPropertiesOn,
    ConstrainsLinksOn,
    ConstrainsLinkDestinationsOn,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EdgeKind::HasLeftEntity => "HAS_LEFT_ENTITY",
            EdgeKind::HasRightEntity => "HAS_RIGHT_ENTITY",
            EdgeKind::IsOfType => "IS_OF_TYPE",
            EdgeKind::InheritsFrom => "INHERITS_FROM",
            EdgeKind::ConstrainsValuesOn => "CONSTRAINS_VALUES_ON",
            EdgeKind::ConstrainsPropertiesOn => "CONSTRAINS_PROPERTIES_ON",
            EdgeKind::ConstrainsLinksOn => "CONSTRAINS_LINKS_ON",
            EdgeKind::ConstrainsLinkDestinationsOn => "CONSTRAINS_LINK_DESTINATIONS_ON",
        };
        f.write_str(name)
    }
}

/// Points at an entity as it was at `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityIdWithTimestamp {
    pub entity_id: EntityId,
    pub timestamp: Timestamp,
}

impl From<EntityEditionId> for EntityIdWithTimestamp {
    fn from(id: EntityEditionId) -> Self {
        Self {
            entity_id: id.base_id,
            timestamp: id.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EdgeEndpoint {
    Entity(EntityIdWithTimestamp),
    OntologyType(OntologyTypeEditionId),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutwardEdge {
    pub kind: EdgeKind,
    pub reversed: bool,
    pub right_endpoint: EdgeEndpoint,
}

impl OutwardEdge {
    pub fn new(kind: EdgeKind, reversed: bool, right_endpoint: impl Into<EdgeEndpoint>) -> Self {
        Self {
            kind,
            reversed,
            right_endpoint: right_endpoint.into(),
        }
    }

    /// Stored on an entity: the right endpoint is a link leaving it.
    pub fn is_outgoing_link(&self) -> bool {
        self.kind == EdgeKind::HasLeftEntity && self.reversed
    }

    /// Stored on an entity: the right endpoint is a link arriving at it.
    pub fn is_incoming_link(&self) -> bool {
        self.kind == EdgeKind::HasRightEntity && self.reversed
    }

    /// Stored on a link entity: the right endpoint is its left entity.
    pub fn is_has_left_entity(&self) -> bool {
        self.kind == EdgeKind::HasLeftEntity && !self.reversed
    }

    /// Stored on a link entity: the right endpoint is its right entity.
    pub fn is_has_right_entity(&self) -> bool {
        self.kind == EdgeKind::HasRightEntity && !self.reversed
    }

    pub fn entity_endpoint(&self) -> Option<&EntityIdWithTimestamp> {
        match &self.right_endpoint {
            EdgeEndpoint::Entity(endpoint) => Some(endpoint),
            EdgeEndpoint::OntologyType(_) => None,
        }
    }

    pub fn ontology_endpoint(&self) -> Option<&OntologyTypeEditionId> {
        match &self.right_endpoint {
            EdgeEndpoint::OntologyType(endpoint) => Some(endpoint),
            EdgeEndpoint::Entity(_) => None,
        }
    }

    /// Whether this edge can only be stored on an entity vertex.
    fn leaves_entity(&self) -> bool {
        match self.kind {
            EdgeKind::HasLeftEntity | EdgeKind::HasRightEntity => true,
            EdgeKind::IsOfType => !self.reversed,
            _ => false,
        }
    }
}

impl From<EntityIdWithTimestamp> for EdgeEndpoint {
    fn from(endpoint: EntityIdWithTimestamp) -> Self {
        EdgeEndpoint::Entity(endpoint)
    }
}

impl From<OntologyTypeEditionId> for EdgeEndpoint {
    fn from(endpoint: OntologyTypeEditionId) -> Self {
        EdgeEndpoint::OntologyType(endpoint)
    }
}

/// `baseId -> creation key -> outward edges`. Append-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Edges {
    knowledge: BTreeMap<EntityId, BTreeMap<Timestamp, Vec<OutwardEdge>>>,
    ontology: BTreeMap<BaseUrl, BTreeMap<u32, Vec<OutwardEdge>>>,
}

impl Edges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edge leaving entity `entity_id`, created at `at`. Adding an
    /// edge that is already present is a no-op.
    pub fn push_knowledge_edge(&mut self, entity_id: EntityId, at: Timestamp, edge: OutwardEdge) {
        let group = self.knowledge.entry(entity_id).or_default().entry(at).or_default();
        if !group.contains(&edge) {
            group.push(edge);
        }
    }

    /// Record an edge leaving ontology type `from`.
    pub fn push_ontology_edge(&mut self, from: &OntologyTypeEditionId, edge: OutwardEdge) {
        let group = self
            .ontology
            .entry(from.base_id.clone())
            .or_default()
            .entry(from.version_id)
            .or_default();
        if !group.contains(&edge) {
            group.push(edge);
        }
    }

    /// Edge groups leaving an entity, keyed by creation timestamp.
    pub fn knowledge_edges(&self, entity_id: &EntityId) -> Option<&BTreeMap<Timestamp, Vec<OutwardEdge>>> {
        self.knowledge.get(entity_id)
    }

    /// Edges leaving one ontology type version.
    pub fn ontology_edges(&self, id: &OntologyTypeEditionId) -> &[OutwardEdge] {
        self.ontology
            .get(&id.base_id)
            .and_then(|versions| versions.get(&id.version_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.knowledge.is_empty() && self.ontology.is_empty()
    }

    fn from_raw(raw: BTreeMap<String, BTreeMap<String, Vec<OutwardEdge>>>) -> Result<Self> {
        let mut edges = Edges::new();
        for (base_id, groups) in raw {
            let knowledge = match groups.values().flatten().next() {
                Some(edge) => edge.leaves_entity(),
                None => BaseUrl::new(base_id.as_str()).is_err(),
            };

            if knowledge {
                let entity_id = EntityId::new(base_id.as_str());
                for (key, group) in groups {
                    for edge in group {
                        edges.push_knowledge_edge(entity_id.clone(), Timestamp::new(key.as_str()), edge);
                    }
                }
            } else {
                let base_url = BaseUrl::new(base_id.as_str())?;
                for (key, group) in groups {
                    let version = key.parse::<u32>().map_err(|_| SubgraphError::InvalidVersionKey {
                        base_id: base_id.clone(),
                        key: key.clone(),
                    })?;
                    let from = OntologyTypeEditionId::new(base_url.clone(), version);
                    for edge in group {
                        edges.push_ontology_edge(&from, edge);
                    }
                }
            }
        }
        Ok(edges)
    }
}

impl Serialize for Edges {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.knowledge.len() + self.ontology.len()))?;
        for (entity_id, groups) in &self.knowledge {
            let groups: BTreeMap<&str, &Vec<OutwardEdge>> =
                groups.iter().map(|(at, group)| (at.as_str(), group)).collect();
            map.serialize_entry(entity_id.as_str(), &groups)?;
        }
        for (base_url, groups) in &self.ontology {
            let groups: BTreeMap<String, &Vec<OutwardEdge>> = groups
                .iter()
                .map(|(version, group)| (version.to_string(), group))
                .collect();
            map.serialize_entry(base_url.as_str(), &groups)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Edges {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, BTreeMap<String, Vec<OutwardEdge>>>::deserialize(deserializer)?;
        Edges::from_raw(raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn edge_wire_shape() {
        let edge = OutwardEdge::new(
            EdgeKind::HasLeftEntity,
            true,
            EntityIdWithTimestamp {
                entity_id: EntityId::new("link-1"),
                timestamp: Timestamp::new("2023-01-01T00:00:00.000Z"),
            },
        );
        assert!(edge.is_outgoing_link());
        assert!(!edge.is_incoming_link());
        assert_eq!(
            serde_json::to_value(&edge).unwrap(),
            json!({
                "kind": "HAS_LEFT_ENTITY",
                "reversed": true,
                "rightEndpoint": {"entityId": "link-1", "timestamp": "2023-01-01T00:00:00.000Z"}
            })
        );
    }

    #[test]
    fn deserialize_splits_knowledge_and_ontology() {
        let json = json!({
            "alice": {
                "2023-01-01T00:00:00.000Z": [{
                    "kind": "IS_OF_TYPE",
                    "reversed": false,
                    "rightEndpoint": {"baseId": "https://example.com/types/entity-type/person/", "versionId": 1}
                }]
            },
            "https://example.com/types/entity-type/person/": {
                "1": [{
                    "kind": "CONSTRAINS_PROPERTIES_ON",
                    "reversed": false,
                    "rightEndpoint": {"baseId": "https://example.com/types/property-type/name/", "versionId": 1}
                }]
            }
        });

        let edges: Edges = serde_json::from_value(json.clone()).unwrap();
        let alice = edges.knowledge_edges(&EntityId::new("alice")).unwrap();
        assert_eq!(alice.len(), 1);

        let person = OntologyTypeEditionId::new(
            BaseUrl::new("https://example.com/types/entity-type/person/").unwrap(),
            1,
        );
        assert_eq!(edges.ontology_edges(&person)[0].kind, EdgeKind::ConstrainsPropertiesOn);

        assert_eq!(serde_json::to_value(&edges).unwrap(), json);
    }

    #[test]
    fn pushing_the_same_edge_twice_keeps_one() {
        let mut edges = Edges::new();
        let edge = OutwardEdge::new(
            EdgeKind::HasRightEntity,
            false,
            EntityIdWithTimestamp {
                entity_id: EntityId::new("bob"),
                timestamp: Timestamp::new("1"),
            },
        );
        edges.push_knowledge_edge(EntityId::new("link"), Timestamp::new("1"), edge.clone());
        edges.push_knowledge_edge(EntityId::new("link"), Timestamp::new("1"), edge);
        let groups = edges.knowledge_edges(&EntityId::new("link")).unwrap();
        assert_eq!(groups[&Timestamp::new("1")].len(), 1);
    }
}
