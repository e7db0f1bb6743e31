//! # blockgraph
//!
//! Block protocol graph services for blocks and the applications that embed
//! them.
//!
//! ## Crates
//!
//! - [`subgraph`]: the bitemporal subgraph model and its traversal functions
//! - [`core`]: channels, service catalogs and the service handler
//! - [`graph`]: the graph service and an in-memory datastore
//! - [`hook`]: the hook service
//!
//! ## Example
//!
//! An embedder serving an in-memory datastore, and a block reading from it:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use blockgraph::core::{MemoryChannel, ServiceConfig};
//! use blockgraph::graph::{GetEntityData, GraphBlockHandler, GraphEmbedderHandler, MockData, MockDatastore};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MockDatastore::new(MockData::default())?);
//! let (block_end, embedder_end) = MemoryChannel::pair(64);
//!
//! let _embedder = GraphEmbedderHandler::connect(
//!     Arc::new(embedder_end),
//!     ServiceConfig::default(),
//!     Default::default(),
//!     store,
//! )?;
//! let block = GraphBlockHandler::connect(Arc::new(block_end), ServiceConfig::default())?;
//! block.ready().await?;
//!
//! let reply = block
//!     .get_entity(&GetEntityData { entity_id: "post-1".into(), graph_resolve_depths: None })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub use blockgraph_core as core;
pub use blockgraph_graph as graph;
pub use blockgraph_hook as hook;
pub use blockgraph_subgraph as subgraph;

pub use blockgraph_subgraph::stdlib;
