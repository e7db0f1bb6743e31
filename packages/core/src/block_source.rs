//! Block metadata and the loaded form of a block's entry point.
//!
//! The kind of block is read once from `blockType.entryPoint` when its source
//! is loaded. Everything downstream matches on [`BlockSource`] instead of
//! re-inspecting the metadata.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::{Result, ServiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryPoint {
    Html,
    CustomElement,
    React,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockType {
    pub entry_point: EntryPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
}

/// The parts of a block's `block-metadata.json` needed to load it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub block_type: BlockType,
    /// Path of the entry point, relative to where the metadata was served.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// A block entry point, resolved and loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockSource {
    /// An HTML fragment, rendered as-is.
    Html { url: Url, source: String },
    /// A script defining a custom element registered under `tag_name`.
    CustomElement {
        tag_name: String,
        entry_point: Url,
        source: String,
    },
    /// A script exporting a component.
    Component { entry_point: Url, source: String },
}

impl BlockSource {
    /// Classify a block from its metadata and the text fetched from
    /// `metadata.source`, resolved against `base_url`.
    pub fn load(metadata: &BlockMetadata, base_url: &Url, source: String) -> Result<Self> {
        let url = base_url.join(&metadata.source)?;
        let block_type = &metadata.block_type;

        Ok(match block_type.entry_point {
            EntryPoint::Html => BlockSource::Html { url, source },
            EntryPoint::CustomElement => {
                let tag_name = block_type
                    .tag_name
                    .clone()
                    .filter(|tag| tag.contains('-'))
                    .ok_or_else(|| {
                        ServiceError::InvalidBlockMetadata(format!(
                            "custom element block `{}` needs a hyphenated tagName",
                            metadata.name
                        ))
                    })?;
                BlockSource::CustomElement {
                    tag_name,
                    entry_point: url,
                    source,
                }
            }
            EntryPoint::React => BlockSource::Component {
                entry_point: url,
                source,
            },
        })
    }

    pub fn url(&self) -> &Url {
        match self {
            BlockSource::Html { url, .. } => url,
            BlockSource::CustomElement { entry_point, .. }
            | BlockSource::Component { entry_point, .. } => entry_point,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            BlockSource::Html { source, .. }
            | BlockSource::CustomElement { source, .. }
            | BlockSource::Component { source, .. } => source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(block_type: Value) -> BlockMetadata {
        serde_json::from_value(json!({
            "name": "@example/paragraph",
            "blockType": block_type,
            "source": "dist/main.js",
        }))
        .unwrap()
    }

    fn base() -> Url {
        Url::parse("https://blocks.example/paragraph/").unwrap()
    }

    #[test]
    fn html_blocks_keep_their_url() {
        let meta = metadata(json!({"entryPoint": "html"}));
        let block = BlockSource::load(&meta, &base(), "<p>hi</p>".to_string()).unwrap();
        assert_eq!(
            block,
            BlockSource::Html {
                url: Url::parse("https://blocks.example/paragraph/dist/main.js").unwrap(),
                source: "<p>hi</p>".to_string(),
            }
        );
    }

    #[test]
    fn custom_elements_need_a_tag_name() {
        let missing = metadata(json!({"entryPoint": "custom-element"}));
        assert!(matches!(
            BlockSource::load(&missing, &base(), String::new()),
            Err(ServiceError::InvalidBlockMetadata(_))
        ));

        let bad = metadata(json!({"entryPoint": "custom-element", "tagName": "paragraph"}));
        assert!(BlockSource::load(&bad, &base(), String::new()).is_err());

        let good = metadata(json!({"entryPoint": "custom-element", "tagName": "my-paragraph"}));
        let block = BlockSource::load(&good, &base(), "class X {}".to_string()).unwrap();
        assert!(matches!(block, BlockSource::CustomElement { ref tag_name, .. } if tag_name == "my-paragraph"));
        assert_eq!(block.source(), "class X {}");
    }

    #[test]
    fn react_blocks_become_components() {
        let meta = metadata(json!({"entryPoint": "react"}));
        let block = BlockSource::load(&meta, &base(), String::new()).unwrap();
        assert!(matches!(block, BlockSource::Component { .. }));
        assert_eq!(block.url().path(), "/paragraph/dist/main.js");
    }

    #[test]
    fn unknown_entry_points_are_rejected() {
        let result: std::result::Result<BlockMetadata, _> = serde_json::from_value(json!({
            "name": "x",
            "blockType": {"entryPoint": "vue"},
            "source": "main.js",
        }));
        assert!(result.is_err());
    }
}
