//! Resolve depths a subgraph was built with.

use serde::{Deserialize, Serialize};

/// Hop bound for edges that are only followed outwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutgoingDepth {
    #[serde(default)]
    pub outgoing: u8,
}

impl OutgoingDepth {
    pub const fn new(outgoing: u8) -> Self {
        Self { outgoing }
    }
}

/// Hop bounds for edges followed in either direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeResolveDepths {
    #[serde(default)]
    pub incoming: u8,
    #[serde(default)]
    pub outgoing: u8,
}

impl EdgeResolveDepths {
    pub const fn new(incoming: u8, outgoing: u8) -> Self {
        Self { incoming, outgoing }
    }
}

/// How many hops of each edge kind were resolved around the roots.
///
/// A hint about how complete the subgraph is. Traversal never re-checks it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphResolveDepths {
    pub inherits_from: OutgoingDepth,
    pub constrains_values_on: OutgoingDepth,
    pub constrains_properties_on: OutgoingDepth,
    pub constrains_links_on: OutgoingDepth,
    pub constrains_link_destinations_on: OutgoingDepth,
    pub is_of_type: OutgoingDepth,
    pub has_left_entity: EdgeResolveDepths,
    pub has_right_entity: EdgeResolveDepths,
}

impl GraphResolveDepths {
    /// Depths that pull in an entity's direct links and their endpoints.
    pub const fn links(depth: u8) -> Self {
        Self {
            inherits_from: OutgoingDepth::new(0),
            constrains_values_on: OutgoingDepth::new(0),
            constrains_properties_on: OutgoingDepth::new(0),
            constrains_links_on: OutgoingDepth::new(0),
            constrains_link_destinations_on: OutgoingDepth::new(0),
            is_of_type: OutgoingDepth::new(0),
            has_left_entity: EdgeResolveDepths::new(depth, depth),
            has_right_entity: EdgeResolveDepths::new(depth, depth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_depths_fill_with_zero() {
        let depths: GraphResolveDepths = serde_json::from_value(json!({
            "hasLeftEntity": {"incoming": 2},
            "isOfType": {"outgoing": 1}
        }))
        .unwrap();
        assert_eq!(depths.has_left_entity, EdgeResolveDepths::new(2, 0));
        assert_eq!(depths.is_of_type.outgoing, 1);
        assert_eq!(depths.has_right_entity, EdgeResolveDepths::default());
    }

    #[test]
    fn depths_outside_u8_are_rejected() {
        let result = serde_json::from_value::<GraphResolveDepths>(json!({
            "inheritsFrom": {"outgoing": 256}
        }));
        assert!(result.is_err());
    }
}
