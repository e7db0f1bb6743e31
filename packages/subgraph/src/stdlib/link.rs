//! Link traversal at a moment in time.

use std::collections::HashSet;

use crate::edge::OutwardEdge;
use crate::entity::Entity;
use crate::error::{LinkSide, Result, SubgraphError};
use crate::ids::{EntityEditionId, EntityId, Timestamp};
use crate::stdlib::entity::get_entity;
use crate::subgraph::Subgraph;

/// A link edition paired with its right entity, both as of one moment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkAndRightEntity<'a> {
    pub link_entity: &'a Entity,
    pub right_entity: &'a Entity,
}

/// Link entities leaving `entity_id`, each resolved to its edition at `at`.
pub fn get_outgoing_links_for_entity_at_moment<'a>(
    subgraph: &'a Subgraph,
    entity_id: &EntityId,
    at: &Timestamp,
) -> Vec<&'a Entity> {
    links_at_moment(subgraph, entity_id, at, OutwardEdge::is_outgoing_link)
}

/// Link entities arriving at `entity_id`, each resolved to its edition at `at`.
pub fn get_incoming_links_for_entity_at_moment<'a>(
    subgraph: &'a Subgraph,
    entity_id: &EntityId,
    at: &Timestamp,
) -> Vec<&'a Entity> {
    links_at_moment(subgraph, entity_id, at, OutwardEdge::is_incoming_link)
}

fn links_at_moment<'a>(
    subgraph: &'a Subgraph,
    entity_id: &EntityId,
    at: &Timestamp,
    keep: fn(&OutwardEdge) -> bool,
) -> Vec<&'a Entity> {
    let Some(groups) = subgraph.edges().knowledge_edges(entity_id) else {
        return Vec::new();
    };

    let mut seen = HashSet::<EntityEditionId>::new();
    groups
        .range(..=at.clone())
        .flat_map(|(_, edges)| edges)
        .filter(|edge| keep(edge))
        .filter_map(OutwardEdge::entity_endpoint)
        .filter_map(|endpoint| get_entity(subgraph, &endpoint.entity_id, Some(at)))
        .filter(|link| seen.insert(link.edition_id()))
        .collect()
}

/// The left entity of a link, as of `at`.
///
/// `Ok(None)` if the link did not exist at `at`, is not a link entity, or its
/// left entity is outside the subgraph. A link entity without a left entity
/// edge is malformed and reported as [`SubgraphError::MissingLinkEndpoint`].
pub fn get_left_entity_for_link_entity_at_moment<'a>(
    subgraph: &'a Subgraph,
    link_entity_id: &EntityId,
    at: &Timestamp,
) -> Result<Option<&'a Entity>> {
    endpoint_at_moment(subgraph, link_entity_id, at, LinkSide::Left)
}

/// The right entity of a link, as of `at`. See
/// [`get_left_entity_for_link_entity_at_moment`].
pub fn get_right_entity_for_link_entity_at_moment<'a>(
    subgraph: &'a Subgraph,
    link_entity_id: &EntityId,
    at: &Timestamp,
) -> Result<Option<&'a Entity>> {
    endpoint_at_moment(subgraph, link_entity_id, at, LinkSide::Right)
}

fn endpoint_at_moment<'a>(
    subgraph: &'a Subgraph,
    link_entity_id: &EntityId,
    at: &Timestamp,
    side: LinkSide,
) -> Result<Option<&'a Entity>> {
    let Some(link) = get_entity(subgraph, link_entity_id, Some(at)) else {
        return Ok(None);
    };
    if !link.is_link() {
        return Ok(None);
    }

    let is_endpoint_edge: fn(&OutwardEdge) -> bool = match side {
        LinkSide::Left => OutwardEdge::is_has_left_entity,
        LinkSide::Right => OutwardEdge::is_has_right_entity,
    };
    let missing = || SubgraphError::MissingLinkEndpoint {
        entity_id: link_entity_id.clone(),
        side,
    };

    let groups = subgraph
        .edges()
        .knowledge_edges(link_entity_id)
        .ok_or_else(missing)?;
    let endpoint = groups
        .range(..=at.clone())
        .rev()
        .flat_map(|(_, edges)| edges)
        .find(|edge| is_endpoint_edge(edge))
        .and_then(OutwardEdge::entity_endpoint)
        .ok_or_else(missing)?;

    Ok(get_entity(subgraph, &endpoint.entity_id, Some(at)))
}

/// Outgoing links of `entity_id` at `at`, each with its right entity.
///
/// Links whose right entity is outside the subgraph at `at` are skipped.
pub fn get_outgoing_link_and_target_entities_at_moment<'a>(
    subgraph: &'a Subgraph,
    entity_id: &EntityId,
    at: &Timestamp,
) -> Result<Vec<LinkAndRightEntity<'a>>> {
    let mut pairs = Vec::new();
    for link_entity in get_outgoing_links_for_entity_at_moment(subgraph, entity_id, at) {
        let right =
            get_right_entity_for_link_entity_at_moment(subgraph, link_entity.entity_id(), at)?;
        if let Some(right_entity) = right {
            pairs.push(LinkAndRightEntity {
                link_entity,
                right_entity,
            });
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SubgraphBuilder;
    use crate::depths::GraphResolveDepths;
    use crate::edge::{EdgeKind, Edges, EntityIdWithTimestamp};
    use crate::entity::LinkData;
    use crate::ids::EntityRecordId;
    use crate::vertex::Vertices;
    use serde_json::json;

    const PERSON: &str = "https://example.com/types/entity-type/person/v/1";
    const FRIEND_OF: &str = "https://example.com/types/entity-type/friend-of/v/1";

    fn ts(s: &str) -> Timestamp {
        Timestamp::new(s)
    }

    fn entity(id: &str, at: &str, type_id: &str) -> Entity {
        Entity::new(EntityRecordId::new(id, at), type_id.parse().unwrap())
    }

    fn friend_of(at: &str, since: i64) -> Entity {
        entity("friendship", at, FRIEND_OF)
            .with_link_data(LinkData::new("alice", "bob"))
            .with_property("https://example.com/types/property-type/since/", json!(since))
    }

    /// alice and bob exist from 1; the friendship link is created at 3 and
    /// updated at 6; bob gets a second edition at 8.
    fn friends() -> Subgraph {
        SubgraphBuilder::new(GraphResolveDepths::links(1))
            .entities([
                entity("alice", "1", PERSON),
                entity("bob", "1", PERSON),
                entity("bob", "8", PERSON).with_property("name", json!("Robert")),
                friend_of("3", 2019),
                friend_of("6", 2020),
            ])
            .root(EntityRecordId::new("alice", "1").edition_id())
            .build()
            .unwrap()
    }

    #[test]
    fn outgoing_links_resolve_to_edition_at_moment() {
        let subgraph = friends();
        let alice = EntityId::new("alice");

        assert!(get_outgoing_links_for_entity_at_moment(&subgraph, &alice, &ts("2")).is_empty());

        let at_four = get_outgoing_links_for_entity_at_moment(&subgraph, &alice, &ts("4"));
        assert_eq!(at_four.len(), 1);
        assert_eq!(at_four[0].edition_timestamp(), &ts("3"));

        let at_seven = get_outgoing_links_for_entity_at_moment(&subgraph, &alice, &ts("7"));
        assert_eq!(at_seven.len(), 1);
        assert_eq!(at_seven[0].edition_timestamp(), &ts("6"));
    }

    #[test]
    fn incoming_links_are_symmetric() {
        let subgraph = friends();
        let bob = EntityId::new("bob");
        let incoming = get_incoming_links_for_entity_at_moment(&subgraph, &bob, &ts("4"));
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].entity_id().as_str(), "friendship");
        assert!(get_outgoing_links_for_entity_at_moment(&subgraph, &bob, &ts("4")).is_empty());
    }

    #[test]
    fn endpoints_resolve_at_moment() {
        let subgraph = friends();
        let link = EntityId::new("friendship");

        let left = get_left_entity_for_link_entity_at_moment(&subgraph, &link, &ts("4")).unwrap();
        assert_eq!(left.unwrap().entity_id().as_str(), "alice");

        let right = get_right_entity_for_link_entity_at_moment(&subgraph, &link, &ts("4"))
            .unwrap()
            .unwrap();
        assert_eq!(right.edition_timestamp(), &ts("1"));
        let right = get_right_entity_for_link_entity_at_moment(&subgraph, &link, &ts("9"))
            .unwrap()
            .unwrap();
        assert_eq!(right.edition_timestamp(), &ts("8"));
    }

    #[test]
    fn endpoint_before_link_exists_is_absent() {
        let subgraph = friends();
        let link = EntityId::new("friendship");
        let left = get_left_entity_for_link_entity_at_moment(&subgraph, &link, &ts("2")).unwrap();
        assert!(left.is_none());
    }

    #[test]
    fn link_without_endpoint_edge_is_an_error() {
        let mut vertices = Vertices::new();
        vertices.insert_entity(friend_of("3", 2019));
        vertices.insert_entity(entity("alice", "1", PERSON));
        let mut edges = Edges::new();
        edges.push_knowledge_edge(
            EntityId::new("friendship"),
            ts("3"),
            OutwardEdge::new(
                EdgeKind::HasLeftEntity,
                false,
                EntityIdWithTimestamp {
                    entity_id: EntityId::new("alice"),
                    timestamp: ts("3"),
                },
            ),
        );
        let subgraph = Subgraph::new(Vec::new(), vertices, edges, GraphResolveDepths::default());
        let link = EntityId::new("friendship");

        assert!(get_left_entity_for_link_entity_at_moment(&subgraph, &link, &ts("4"))
            .unwrap()
            .is_some());
        let err = get_right_entity_for_link_entity_at_moment(&subgraph, &link, &ts("4")).unwrap_err();
        assert!(matches!(
            err,
            SubgraphError::MissingLinkEndpoint {
                side: LinkSide::Right,
                ..
            }
        ));
    }

    /// The friendship points at bob from 3 and is re-pointed at carol at 6.
    fn repointed() -> Subgraph {
        SubgraphBuilder::new(GraphResolveDepths::links(1))
            .entities([
                entity("alice", "1", PERSON),
                entity("bob", "1", PERSON),
                entity("carol", "1", PERSON),
                friend_of("3", 2019),
                entity("friendship", "6", FRIEND_OF).with_link_data(LinkData::new("alice", "carol")),
            ])
            .root(EntityRecordId::new("alice", "1").edition_id())
            .build()
            .unwrap()
    }

    #[test]
    fn repointed_link_is_listed_once() {
        let subgraph = repointed();
        let alice = EntityId::new("alice");

        let at_seven = get_outgoing_links_for_entity_at_moment(&subgraph, &alice, &ts("7"));
        assert_eq!(at_seven.len(), 1);
        assert_eq!(at_seven[0].edition_timestamp(), &ts("6"));

        let pairs = get_outgoing_link_and_target_entities_at_moment(&subgraph, &alice, &ts("7")).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].right_entity.entity_id().as_str(), "carol");

        let pairs = get_outgoing_link_and_target_entities_at_moment(&subgraph, &alice, &ts("4")).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].right_entity.entity_id().as_str(), "bob");
    }

    #[test]
    fn outgoing_links_with_targets() {
        let subgraph = friends();
        let pairs =
            get_outgoing_link_and_target_entities_at_moment(&subgraph, &EntityId::new("alice"), &ts("9"))
                .unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].link_entity.edition_timestamp(), &ts("6"));
        assert_eq!(pairs[0].right_entity.properties["name"], json!("Robert"));
    }
}
