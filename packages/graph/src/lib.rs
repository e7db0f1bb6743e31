//! # blockgraph-graph
//!
//! The graph service: entity, entity type, link, linked aggregation and file
//! requests from a block to its embedder, and the block state the embedder
//! pushes back.
//!
//! - [`GraphBlockHandler`] is the block's end. It sends typed requests and
//!   keeps the latest pushed block entity, block graph, entity types, linked
//!   aggregations and read-only flag.
//! - [`GraphEmbedderHandler`] is the embedder's end. It serves requests from
//!   a [`GraphEmbedder`], refusing mutations while read-only.
//! - [`MockDatastore`] is an in-memory [`GraphEmbedder`] for development and
//!   tests.

pub mod block;
pub mod catalog;
pub mod datastore;
pub mod embedder;
pub mod error;
pub mod query;
pub mod types;

pub use block::GraphBlockHandler;
/// Resource errors a graph request can come back with.
pub use blockgraph_core::ResourceErrors as GraphErrors;
pub use catalog::{is_mutation, GRAPH_SERVICE, MUTATIONS, SERVICE_NAME};
pub use datastore::{MockData, MockDatastore};
pub use embedder::{GraphEmbedder, GraphEmbedderHandler, READONLY_MESSAGE};
pub use error::{GraphError, Result};
pub use query::{
    AggregateOperation, AggregateOperationOutput, FieldPath, FilterItem, FilterOperator,
    MultiFilter, MultiFilterOperator, MultiSort, Sort,
};
pub use types::*;
