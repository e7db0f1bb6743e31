//! Subgraph roots.

use crate::entity::Entity;
use crate::error::{Result, SubgraphError};
use crate::ids::GraphElementEditionId;
use crate::ontology::{DataTypeWithMetadata, EntityTypeWithMetadata, PropertyTypeWithMetadata};
use crate::subgraph::Subgraph;
use crate::vertex::OntologyVertex;

/// A root vertex resolved to its element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RootElement<'a> {
    Entity(&'a Entity),
    DataType(&'a DataTypeWithMetadata),
    PropertyType(&'a PropertyTypeWithMetadata),
    EntityType(&'a EntityTypeWithMetadata),
}

impl<'a> RootElement<'a> {
    pub fn as_entity(&self) -> Option<&'a Entity> {
        match *self {
            RootElement::Entity(entity) => Some(entity),
            _ => None,
        }
    }
}

/// Resolve every root in order. A root missing from the vertices means the
/// subgraph is malformed.
pub fn get_roots(subgraph: &Subgraph) -> Result<Vec<RootElement<'_>>> {
    subgraph
        .roots()
        .iter()
        .map(|root| {
            let element = match root {
                GraphElementEditionId::Entity(id) => {
                    subgraph.vertices().entity(id).map(RootElement::Entity)
                }
                GraphElementEditionId::OntologyType(id) => {
                    subgraph.vertices().ontology_type(id).map(|vertex| match vertex {
                        OntologyVertex::DataType(inner) => RootElement::DataType(inner),
                        OntologyVertex::PropertyType(inner) => RootElement::PropertyType(inner),
                        OntologyVertex::EntityType(inner) => RootElement::EntityType(inner),
                    })
                }
            };
            element.ok_or_else(|| SubgraphError::MissingRoot(root.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SubgraphBuilder;
    use crate::depths::GraphResolveDepths;
    use crate::edge::Edges;
    use crate::ids::EntityRecordId;
    use crate::vertex::Vertices;

    #[test]
    fn roots_resolve_in_order() {
        let alice = Entity::new(
            EntityRecordId::new("alice", "1"),
            "https://example.com/types/entity-type/person/v/1".parse().unwrap(),
        );
        let subgraph = SubgraphBuilder::new(GraphResolveDepths::default())
            .entities([alice.clone()])
            .root(alice.edition_id())
            .build()
            .unwrap();

        let roots = get_roots(&subgraph).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].as_entity(), Some(&alice));
    }

    #[test]
    fn dangling_root_is_an_error() {
        let subgraph = Subgraph::new(
            vec![EntityRecordId::new("ghost", "1").edition_id().into()],
            Vertices::new(),
            Edges::new(),
            GraphResolveDepths::default(),
        );
        assert!(matches!(get_roots(&subgraph), Err(SubgraphError::MissingRoot(_))));
    }
}
