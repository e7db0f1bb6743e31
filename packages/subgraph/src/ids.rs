//! Identifiers and timestamps for knowledge-graph elements.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::url::{BaseUrl, VersionedUrl};

/// Stable identifier of an entity across all of its editions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// An ISO-8601 instant.
///
/// Ordering is lexicographic on the underlying string. Timestamps produced by
/// [`Timestamp::now`] or converted from [`DateTime<Utc>`] all share one fixed
/// width format, so lexicographic order is chronological order for them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The current wall-clock time, millisecond precision, UTC.
    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse back into a [`DateTime<Utc>`], if the string is RFC 3339.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.0)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl From<&str> for Timestamp {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Record identifier carried in an entity's metadata.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecordId {
    pub entity_id: EntityId,
    pub edition_id: Timestamp,
}

impl EntityRecordId {
    pub fn new(entity_id: impl Into<EntityId>, edition_id: impl Into<Timestamp>) -> Self {
        Self {
            entity_id: entity_id.into(),
            edition_id: edition_id.into(),
        }
    }

    pub fn edition_id(&self) -> EntityEditionId {
        EntityEditionId {
            base_id: self.entity_id.clone(),
            timestamp: self.edition_id.clone(),
        }
    }
}

/// Addresses one entity vertex: `(baseId, edition timestamp)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityEditionId {
    pub base_id: EntityId,
    pub timestamp: Timestamp,
}

impl fmt::Display for EntityEditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.base_id, self.timestamp)
    }
}

/// Addresses one ontology vertex: `(baseUrl, version)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OntologyTypeEditionId {
    pub base_id: BaseUrl,
    pub version_id: u32,
}

impl OntologyTypeEditionId {
    pub fn new(base_id: BaseUrl, version_id: u32) -> Self {
        Self {
            base_id,
            version_id,
        }
    }

    pub fn to_versioned_url(&self) -> VersionedUrl {
        VersionedUrl::new(self.base_id.clone(), self.version_id)
    }
}

impl From<&VersionedUrl> for OntologyTypeEditionId {
    fn from(url: &VersionedUrl) -> Self {
        Self::new(url.base_url.clone(), url.version)
    }
}

impl fmt::Display for OntologyTypeEditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v/{}", self.base_id, self.version_id)
    }
}

/// Either kind of vertex address, as used for subgraph roots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GraphElementEditionId {
    Entity(EntityEditionId),
    OntologyType(OntologyTypeEditionId),
}

impl fmt::Display for GraphElementEditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphElementEditionId::Entity(id) => id.fmt(f),
            GraphElementEditionId::OntologyType(id) => id.fmt(f),
        }
    }
}

impl From<EntityEditionId> for GraphElementEditionId {
    fn from(id: EntityEditionId) -> Self {
        GraphElementEditionId::Entity(id)
    }
}

impl From<OntologyTypeEditionId> for GraphElementEditionId {
    fn from(id: OntologyTypeEditionId) -> Self {
        GraphElementEditionId::OntologyType(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_format_sorts_chronologically() {
        let early = Timestamp::from(Utc.with_ymd_and_hms(2023, 1, 9, 8, 0, 0).unwrap());
        let late = Timestamp::from(Utc.with_ymd_and_hms(2023, 10, 1, 8, 0, 0).unwrap());
        assert_eq!(early.as_str(), "2023-01-09T08:00:00.000Z");
        assert!(early < late);
    }

    #[test]
    fn timestamp_round_trips_through_datetime() {
        let ts = Timestamp::new("2023-05-01T12:30:00.250Z");
        let dt = ts.to_datetime().unwrap();
        assert_eq!(Timestamp::from(dt), ts);
        assert!(Timestamp::new("not a time").to_datetime().is_none());
    }

    #[test]
    fn record_id_wire_shape() {
        let id = EntityRecordId::new("post-1", "2023-01-01T00:00:00.000Z");
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"entityId": "post-1", "editionId": "2023-01-01T00:00:00.000Z"})
        );
        assert_eq!(id.edition_id().base_id, EntityId::new("post-1"));
    }

    #[test]
    fn untagged_edition_ids_deserialize_by_shape() {
        let entity: GraphElementEditionId =
            serde_json::from_value(serde_json::json!({"baseId": "e", "timestamp": "1"})).unwrap();
        assert!(matches!(entity, GraphElementEditionId::Entity(_)));

        let ontology: GraphElementEditionId = serde_json::from_value(serde_json::json!({
            "baseId": "https://example.com/types/entity-type/person/",
            "versionId": 2
        }))
        .unwrap();
        match ontology {
            GraphElementEditionId::OntologyType(id) => assert_eq!(id.version_id, 2),
            other => panic!("expected ontology id, got {other:?}"),
        }
    }
}
