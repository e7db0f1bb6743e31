//! Ontology type lookups.
//!
//! A lookup by id returns `Ok(None)` when nothing is stored at that address,
//! and [`SubgraphError::UnexpectedVertexKind`] when something of another kind
//! is.

use crate::edge::EdgeKind;
use crate::entity::Entity;
use crate::error::{Result, SubgraphError};
use crate::ids::OntologyTypeEditionId;
use crate::ontology::{DataTypeWithMetadata, EntityTypeWithMetadata, PropertyTypeWithMetadata};
use crate::subgraph::Subgraph;
use crate::url::{BaseUrl, VersionedUrl};
use crate::vertex::{OntologyVertex, VertexKind};

fn unexpected(id: impl ToString, expected: VertexKind, vertex: &OntologyVertex) -> SubgraphError {
    SubgraphError::UnexpectedVertexKind {
        id: id.to_string(),
        expected,
        found: vertex.kind(),
    }
}

macro_rules! ontology_lookups {
    (
        $variant:ident, $ty:ty,
        by_id: $by_id:ident,
        by_base_url: $by_base_url:ident,
        all: $all:ident $(,)?
    ) => {
        pub fn $by_id<'a>(subgraph: &'a Subgraph, id: &VersionedUrl) -> Result<Option<&'a $ty>> {
            let edition_id = OntologyTypeEditionId::from(id);
            match subgraph.vertices().ontology_type(&edition_id) {
                None => Ok(None),
                Some(OntologyVertex::$variant(inner)) => Ok(Some(inner)),
                Some(other) => Err(unexpected(id, VertexKind::$variant, other)),
            }
        }

        /// Every version stored under `base_url`, oldest first.
        pub fn $by_base_url<'a>(subgraph: &'a Subgraph, base_url: &BaseUrl) -> Result<Vec<&'a $ty>> {
            let Some(versions) = subgraph.vertices().ontology_versions(base_url) else {
                return Ok(Vec::new());
            };
            versions
                .values()
                .map(|vertex| match vertex {
                    OntologyVertex::$variant(inner) => Ok(inner),
                    other => Err(unexpected(base_url, VertexKind::$variant, other)),
                })
                .collect()
        }

        pub fn $all(subgraph: &Subgraph) -> Vec<&$ty> {
            subgraph
                .vertices()
                .ontology_types()
                .filter_map(|vertex| match vertex {
                    OntologyVertex::$variant(inner) => Some(inner),
                    _ => None,
                })
                .collect()
        }
    };
}

ontology_lookups!(
    DataType, DataTypeWithMetadata,
    by_id: get_data_type_by_id,
    by_base_url: get_data_types_by_base_url,
    all: get_data_types,
);

ontology_lookups!(
    PropertyType, PropertyTypeWithMetadata,
    by_id: get_property_type_by_id,
    by_base_url: get_property_types_by_base_url,
    all: get_property_types,
);

ontology_lookups!(
    EntityType, EntityTypeWithMetadata,
    by_id: get_entity_type_by_id,
    by_base_url: get_entity_types_by_base_url,
    all: get_entity_types,
);

/// Property types an entity type constrains, as far as the subgraph holds
/// them.
pub fn get_property_types_referenced_by_entity_type<'a>(
    subgraph: &'a Subgraph,
    entity_type_id: &VersionedUrl,
) -> Result<Vec<&'a PropertyTypeWithMetadata>> {
    let edition_id = OntologyTypeEditionId::from(entity_type_id);
    let mut found = Vec::new();
    for edge in subgraph.edges().ontology_edges(&edition_id) {
        if edge.kind != EdgeKind::ConstrainsPropertiesOn || edge.reversed {
            continue;
        }
        let Some(target) = edge.ontology_endpoint() else {
            continue;
        };
        if let Some(property_type) = get_property_type_by_id(subgraph, &target.to_versioned_url())? {
            found.push(property_type);
        }
    }
    Ok(found)
}

/// The entity type of an entity edition, if the subgraph holds it.
pub fn get_entity_type_for_entity<'a>(
    subgraph: &'a Subgraph,
    entity: &Entity,
) -> Result<Option<&'a EntityTypeWithMetadata>> {
    get_entity_type_by_id(subgraph, entity.entity_type_id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SubgraphBuilder;
    use crate::depths::GraphResolveDepths;
    use crate::ids::EntityRecordId;
    use serde_json::json;

    const PERSON_BASE: &str = "https://example.com/types/entity-type/person/";
    const NAME_BASE: &str = "https://example.com/types/property-type/name/";
    const TEXT_BASE: &str = "https://example.com/types/data-type/text/";

    fn id(base: &str, version: u32) -> OntologyTypeEditionId {
        OntologyTypeEditionId::new(BaseUrl::new(base).unwrap(), version)
    }

    fn url(base: &str, version: u32) -> VersionedUrl {
        id(base, version).to_versioned_url()
    }

    fn ontology_subgraph() -> Subgraph {
        SubgraphBuilder::new(GraphResolveDepths::default())
            .data_types([DataTypeWithMetadata::new(id(TEXT_BASE, 1), json!({"title": "Text"}))])
            .property_types([PropertyTypeWithMetadata::new(
                id(NAME_BASE, 1),
                json!({"title": "Name", "oneOf": [{"$ref": url(TEXT_BASE, 1).to_string()}]}),
            )])
            .entity_types([
                EntityTypeWithMetadata::new(id(PERSON_BASE, 1), json!({"title": "Person"})),
                EntityTypeWithMetadata::new(
                    id(PERSON_BASE, 2),
                    json!({
                        "title": "Person",
                        "properties": {NAME_BASE: {"$ref": url(NAME_BASE, 1).to_string()}}
                    }),
                ),
            ])
            .build()
            .unwrap()
    }

    #[test]
    fn lookup_by_id() {
        let subgraph = ontology_subgraph();
        let person = get_entity_type_by_id(&subgraph, &url(PERSON_BASE, 2)).unwrap().unwrap();
        assert_eq!(person.record_id().version_id, 2);
        assert!(get_entity_type_by_id(&subgraph, &url(PERSON_BASE, 3)).unwrap().is_none());
        assert!(get_data_type_by_id(&subgraph, &url(TEXT_BASE, 1)).unwrap().is_some());
    }

    #[test]
    fn wrong_kind_is_an_error() {
        let subgraph = ontology_subgraph();
        let err = get_data_type_by_id(&subgraph, &url(PERSON_BASE, 1)).unwrap_err();
        assert!(matches!(
            err,
            SubgraphError::UnexpectedVertexKind {
                expected: VertexKind::DataType,
                found: VertexKind::EntityType,
                ..
            }
        ));
        assert!(get_property_types_by_base_url(&subgraph, &BaseUrl::new(PERSON_BASE).unwrap()).is_err());
    }

    #[test]
    fn listings() {
        let subgraph = ontology_subgraph();
        let versions = get_entity_types_by_base_url(&subgraph, &BaseUrl::new(PERSON_BASE).unwrap()).unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].record_id().version_id, 1);
        assert_eq!(get_entity_types(&subgraph).len(), 2);
        assert_eq!(get_property_types(&subgraph).len(), 1);
        assert_eq!(get_data_types(&subgraph).len(), 1);
    }

    #[test]
    fn referenced_property_types() {
        let subgraph = ontology_subgraph();
        let referenced =
            get_property_types_referenced_by_entity_type(&subgraph, &url(PERSON_BASE, 2)).unwrap();
        assert_eq!(referenced.len(), 1);
        assert_eq!(referenced[0].title(), Some("Name"));
        assert!(get_property_types_referenced_by_entity_type(&subgraph, &url(PERSON_BASE, 1))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn entity_type_of_entity() {
        let subgraph = ontology_subgraph();
        let alice = Entity::new(EntityRecordId::new("alice", "1"), url(PERSON_BASE, 1));
        let entity_type = get_entity_type_for_entity(&subgraph, &alice).unwrap().unwrap();
        assert_eq!(entity_type.record_id(), &id(PERSON_BASE, 1));
    }
}
