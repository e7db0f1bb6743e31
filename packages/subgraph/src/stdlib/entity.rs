//! Entity lookups.

use crate::entity::Entity;
use crate::ids::{EntityEditionId, EntityId, Timestamp};
use crate::interval::TimeInterval;
use crate::subgraph::Subgraph;

/// The edition of `entity_id` valid at `at`, or the latest edition when `at`
/// is `None`.
///
/// Editions are half-open: the edition at `v_i` answers for every
/// `v_i <= at < v_{i+1}`, and the last one is unbounded above. Returns `None`
/// if the entity is not in the subgraph or `at` precedes its first edition.
pub fn get_entity<'a>(
    subgraph: &'a Subgraph,
    entity_id: &EntityId,
    at: Option<&Timestamp>,
) -> Option<&'a Entity> {
    let editions = subgraph.vertices().entity_editions(entity_id)?;
    let found = match at {
        Some(at) => editions.range(..=at.clone()).next_back(),
        None => editions.iter().next_back(),
    };
    found.map(|(_, entity)| entity)
}

/// Exact lookup by edition id.
pub fn get_entity_edition<'a>(subgraph: &'a Subgraph, id: &EntityEditionId) -> Option<&'a Entity> {
    subgraph.vertices().entity(id)
}

/// Every entity in the subgraph. With `latest_only`, one edition per entity.
pub fn get_entities(subgraph: &Subgraph, latest_only: bool) -> Vec<&Entity> {
    subgraph
        .vertices()
        .entities()
        .flat_map(|(_, editions)| {
            let take = if latest_only { 1 } else { editions.len() };
            editions.values().rev().take(take).rev()
        })
        .collect()
}

/// Editions of `entity_id` whose validity overlaps `interval`, oldest first.
pub fn get_entity_editions_in_interval<'a>(
    subgraph: &'a Subgraph,
    entity_id: &EntityId,
    interval: &TimeInterval,
) -> Vec<&'a Entity> {
    let Some(editions) = subgraph.vertices().entity_editions(entity_id) else {
        return Vec::new();
    };

    let ends = editions.keys().skip(1).map(Some).chain([None]);
    editions
        .iter()
        .zip(ends)
        .filter(|&((start, _), end)| {
            TimeInterval::for_edition(start.clone(), end.cloned()).overlaps(interval)
        })
        .map(|((_, entity), _)| entity)
        .collect()
}
