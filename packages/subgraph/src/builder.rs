//! Build a [`Subgraph`] from a flat set of graph elements.
//!
//! The builder trusts the caller's depths. It does check that every root is
//! among the supplied elements, and it derives all edges from the elements
//! themselves: link data, entity types and schema references.

use crate::depths::GraphResolveDepths;
use crate::edge::{EdgeKind, Edges, EntityIdWithTimestamp, OutwardEdge};
use crate::entity::{Entity, LinkData};
use crate::error::{Result, SubgraphError};
use crate::ids::{GraphElementEditionId, OntologyTypeEditionId};
use crate::ontology::{DataTypeWithMetadata, EntityTypeWithMetadata, PropertyTypeWithMetadata};
use crate::subgraph::Subgraph;
use crate::url::VersionedUrl;
use crate::vertex::{OntologyVertex, Vertices};

#[derive(Debug, Default)]
pub struct SubgraphBuilder {
    roots: Vec<GraphElementEditionId>,
    depths: GraphResolveDepths,
    entities: Vec<Entity>,
    ontology: Vec<OntologyVertex>,
}

impl SubgraphBuilder {
    pub fn new(depths: GraphResolveDepths) -> Self {
        Self {
            depths,
            ..Self::default()
        }
    }

    pub fn root(mut self, root: impl Into<GraphElementEditionId>) -> Self {
        self.roots.push(root.into());
        self
    }

    pub fn roots<I, R>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<GraphElementEditionId>,
    {
        self.roots.extend(roots.into_iter().map(Into::into));
        self
    }

    pub fn entities(mut self, entities: impl IntoIterator<Item = Entity>) -> Self {
        self.entities.extend(entities);
        self
    }

    pub fn data_types(mut self, types: impl IntoIterator<Item = DataTypeWithMetadata>) -> Self {
        self.ontology.extend(types.into_iter().map(OntologyVertex::from));
        self
    }

    pub fn property_types(mut self, types: impl IntoIterator<Item = PropertyTypeWithMetadata>) -> Self {
        self.ontology.extend(types.into_iter().map(OntologyVertex::from));
        self
    }

    pub fn entity_types(mut self, types: impl IntoIterator<Item = EntityTypeWithMetadata>) -> Self {
        self.ontology.extend(types.into_iter().map(OntologyVertex::from));
        self
    }

    pub fn build(self) -> Result<Subgraph> {
        let mut vertices = Vertices::new();
        for vertex in &self.ontology {
            vertices.insert_ontology_type(vertex.clone())?;
        }
        for entity in self.entities {
            vertices.insert_entity(entity);
        }

        if let Some(missing) = self.roots.iter().find(|root| !contains(&vertices, root)) {
            return Err(SubgraphError::MissingRoot(missing.clone()));
        }

        let mut edges = Edges::new();
        for vertex in vertices.ontology_types() {
            add_ontology_edges(&mut edges, vertex);
        }
        add_knowledge_edges(&mut edges, &vertices);

        Ok(Subgraph::new(self.roots, vertices, edges, self.depths))
    }
}

fn contains(vertices: &Vertices, root: &GraphElementEditionId) -> bool {
    match root {
        GraphElementEditionId::Entity(id) => vertices.entity(id).is_some(),
        GraphElementEditionId::OntologyType(id) => vertices.ontology_type(id).is_some(),
    }
}

fn add_ontology_edges(edges: &mut Edges, vertex: &OntologyVertex) {
    let from = vertex.record_id();
    let targets: Vec<(EdgeKind, VersionedUrl)> = match vertex {
        OntologyVertex::DataType(_) => Vec::new(),
        OntologyVertex::PropertyType(property_type) => {
            let values = property_type
                .data_type_references()
                .into_iter()
                .map(|url| (EdgeKind::ConstrainsValuesOn, url));
            let properties = property_type
                .property_type_references()
                .into_iter()
                .map(|url| (EdgeKind::ConstrainsPropertiesOn, url));
            values.chain(properties).collect()
        }
        OntologyVertex::EntityType(entity_type) => {
            let tag = |kind: EdgeKind| move |url: VersionedUrl| (kind, url);
            entity_type
                .inherits_from()
                .into_iter()
                .map(tag(EdgeKind::InheritsFrom))
                .chain(
                    entity_type
                        .property_type_references()
                        .into_iter()
                        .map(tag(EdgeKind::ConstrainsPropertiesOn)),
                )
                .chain(
                    entity_type
                        .link_type_references()
                        .into_iter()
                        .map(tag(EdgeKind::ConstrainsLinksOn)),
                )
                .chain(
                    entity_type
                        .link_destination_references()
                        .into_iter()
                        .map(tag(EdgeKind::ConstrainsLinkDestinationsOn)),
                )
                .collect()
        }
    };

    for (kind, url) in targets {
        let to = OntologyTypeEditionId::from(&url);
        edges.push_ontology_edge(from, OutwardEdge::new(kind, false, to.clone()));
        edges.push_ontology_edge(&to, OutwardEdge::new(kind, true, from.clone()));
    }
}

fn add_knowledge_edges(edges: &mut Edges, vertices: &Vertices) {
    for (entity_id, editions) in vertices.entities() {
        let mut previous_type: Option<&VersionedUrl> = None;
        let mut previous_link: Option<&LinkData> = None;

        for (timestamp, entity) in editions {
            let endpoint = EntityIdWithTimestamp {
                entity_id: entity_id.clone(),
                timestamp: timestamp.clone(),
            };

            let entity_type = entity.entity_type_id();
            if previous_type != Some(entity_type) {
                let type_id = OntologyTypeEditionId::from(entity_type);
                edges.push_knowledge_edge(
                    entity_id.clone(),
                    timestamp.clone(),
                    OutwardEdge::new(EdgeKind::IsOfType, false, type_id.clone()),
                );
                if vertices.ontology_type(&type_id).is_some() {
                    edges.push_ontology_edge(
                        &type_id,
                        OutwardEdge::new(EdgeKind::IsOfType, true, endpoint.clone()),
                    );
                }
                previous_type = Some(entity_type);
            }

            let Some(link) = entity.link_data.as_ref() else {
                previous_link = None;
                continue;
            };
            let endpoints_changed = previous_link.map_or(true, |previous| {
                previous.left_entity_id != link.left_entity_id
                    || previous.right_entity_id != link.right_entity_id
            });
            if endpoints_changed {
                for (kind, target) in [
                    (EdgeKind::HasLeftEntity, &link.left_entity_id),
                    (EdgeKind::HasRightEntity, &link.right_entity_id),
                ] {
                    edges.push_knowledge_edge(
                        entity_id.clone(),
                        timestamp.clone(),
                        OutwardEdge::new(
                            kind,
                            false,
                            EntityIdWithTimestamp {
                                entity_id: target.clone(),
                                timestamp: timestamp.clone(),
                            },
                        ),
                    );
                    edges.push_knowledge_edge(
                        target.clone(),
                        timestamp.clone(),
                        OutwardEdge::new(kind, true, endpoint.clone()),
                    );
                }
            }
            previous_link = Some(link);
        }
    }
}
