//! Hook payloads.

use std::fmt;

use blockgraph_subgraph::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One step into an entity's properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathComponent {
    Index(u64),
    Key(String),
}

impl From<&str> for PathComponent {
    fn from(key: &str) -> Self {
        PathComponent::Key(key.to_string())
    }
}

impl From<u64> for PathComponent {
    fn from(index: u64) -> Self {
        PathComponent::Index(index)
    }
}

impl fmt::Display for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathComponent::Index(index) => write!(f, "[{index}]"),
            PathComponent::Key(key) => write!(f, ".{key}"),
        }
    }
}

/// The `hook` request.
///
/// Without `hook_id` this asks for a new hook. With one, `node` replaces the
/// hook's node, and a `null` node removes the hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_id: Option<String>,
    pub entity_id: EntityId,
    pub path: Vec<PathComponent>,
    #[serde(rename = "type")]
    pub hook_type: String,
    #[serde(default)]
    pub node: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookResponse {
    pub hook_id: String,
}

/// A live hook, as kept by the embedder.
#[derive(Debug, Clone, PartialEq)]
pub struct Hook {
    pub entity_id: EntityId,
    pub path: Vec<PathComponent>,
    pub hook_type: String,
    pub node: Value,
}

impl Hook {
    /// The value the hook views in `properties`, if the path leads anywhere.
    pub fn value_in<'a>(&self, properties: &'a Value) -> Option<&'a Value> {
        self.path.iter().try_fold(properties, |value, component| match component {
            PathComponent::Key(key) => value.get(key.as_str()),
            PathComponent::Index(index) => value.get(usize::try_from(*index).ok()?),
        })
    }
}
