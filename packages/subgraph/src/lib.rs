//! # blockgraph-subgraph
//!
//! The bitemporal knowledge subgraph exchanged between blocks and their
//! embedders, and the traversal functions used to read it.
//!
//! A [`Subgraph`] holds vertices (entity editions and ontology types) and the
//! edges between them, rooted at the elements a query asked for. Entity
//! editions are immutable; each one is valid from its edition timestamp until
//! the next edition. The [`stdlib`] functions answer "what did the graph look
//! like at moment T".
//!
//! ```
//! use blockgraph_subgraph::{stdlib, Entity, EntityId, EntityRecordId, GraphResolveDepths, SubgraphBuilder, Timestamp};
//!
//! let post = |at: &str| {
//!     Entity::new(
//!         EntityRecordId::new("post-1", at),
//!         "https://example.com/types/entity-type/post/v/1".parse().unwrap(),
//!     )
//! };
//! let subgraph = SubgraphBuilder::new(GraphResolveDepths::default())
//!     .entities([post("2023-01-01T00:00:00.000Z"), post("2023-06-01T00:00:00.000Z")])
//!     .build()
//!     .unwrap();
//!
//! let at = Timestamp::new("2023-03-01T00:00:00.000Z");
//! let edition = stdlib::get_entity(&subgraph, &EntityId::new("post-1"), Some(&at)).unwrap();
//! assert_eq!(edition.edition_timestamp().as_str(), "2023-01-01T00:00:00.000Z");
//! ```

pub mod builder;
pub mod depths;
pub mod edge;
pub mod entity;
pub mod error;
pub mod ids;
pub mod interval;
pub mod ontology;
pub mod stdlib;
pub mod subgraph;
pub mod url;
pub mod vertex;

pub use builder::SubgraphBuilder;
pub use depths::{EdgeResolveDepths, GraphResolveDepths, OutgoingDepth};
pub use edge::{EdgeEndpoint, EdgeKind, Edges, EntityIdWithTimestamp, OutwardEdge};
pub use entity::{Entity, EntityMetadata, EntityProperties, EntityTemporalVersioning, LinkData};
pub use error::{LinkSide, Result, SubgraphError};
pub use ids::{
    EntityEditionId, EntityId, EntityRecordId, GraphElementEditionId, OntologyTypeEditionId,
    Timestamp,
};
pub use interval::{TemporalBound, TimeInterval};
pub use ontology::{
    DataTypeWithMetadata, EntityTypeWithMetadata, OntologyElementMetadata, PropertyTypeWithMetadata,
};
pub use subgraph::Subgraph;
pub use crate::url::{BaseUrl, VersionedUrl};
pub use vertex::{OntologyVertex, Vertex, VertexKind, Vertices};
