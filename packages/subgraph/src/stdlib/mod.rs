//! Pure traversal functions over a [`Subgraph`](crate::Subgraph).
//!
//! Nothing here mutates or caches. "Not there at that moment" is `None`; a
//! malformed subgraph is an error.

pub mod entity;
pub mod link;
pub mod ontology;
pub mod roots;

pub use entity::{get_entities, get_entity, get_entity_edition, get_entity_editions_in_interval};
pub use link::{
    get_incoming_links_for_entity_at_moment, get_left_entity_for_link_entity_at_moment,
    get_outgoing_link_and_target_entities_at_moment, get_outgoing_links_for_entity_at_moment,
    get_right_entity_for_link_entity_at_moment, LinkAndRightEntity,
};
pub use ontology::{
    get_data_type_by_id, get_data_types, get_data_types_by_base_url, get_entity_type_by_id,
    get_entity_type_for_entity, get_entity_types, get_entity_types_by_base_url,
    get_property_type_by_id, get_property_types, get_property_types_by_base_url,
    get_property_types_referenced_by_entity_type,
};
pub use roots::{get_roots, RootElement};
