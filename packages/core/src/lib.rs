//! Message services between a block and its embedder.
//!
//! A block and the application embedding it talk over a [`Channel`]. Each
//! named service on that channel is described by a static
//! [`ServiceCatalog`] and spoken through a [`ServiceHandler`], which checks
//! every message against the catalog, correlates requests with their
//! responses and runs the `init` handshake.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use blockgraph_core::{
//!     ErrorKind, MemoryChannel, MessageData, MessageDefinition, ServiceCatalog, ServiceConfig,
//!     ServiceHandler, SourceRole,
//! };
//! use serde_json::json;
//!
//! static ECHO: ServiceCatalog = ServiceCatalog::new(
//!     "echo",
//!     &[MessageDefinition::request("echo", SourceRole::Block, ErrorKind::ReadOrModify, "")],
//! );
//!
//! # async fn run() -> blockgraph_core::Result<()> {
//! let (block_end, embedder_end) = MemoryChannel::pair(64);
//! let embedder = ServiceHandler::new(&ECHO, SourceRole::Embedder, Arc::new(embedder_end), ServiceConfig::default());
//! embedder.on("echo", |message: MessageData| async move { message })?;
//!
//! let block = ServiceHandler::new(&ECHO, SourceRole::Block, Arc::new(block_end), ServiceConfig::default());
//! block.initialize()?;
//! let reply = block.request("echo", json!("hello")).await?;
//! assert_eq!(reply.ok(), Some(json!("hello")));
//! # Ok(())
//! # }
//! ```

pub mod block_source;
pub mod catalog;
pub mod channel;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;

pub use block_source::{BlockMetadata, BlockSource, BlockType, EntryPoint};
pub use catalog::{ErrorKind, MessageDefinition, MessageKind, ServiceCatalog};
pub use channel::{Channel, Envelope, MemoryChannel, Subscription, BLOCK_ORIGIN, EMBEDDER_ORIGIN};
pub use config::ServiceConfig;
pub use error::{Result, ServiceError};
pub use handler::{MessageCallback, ServiceHandler};
pub use message::{
    response_name, ErrorCode, ErrorItem, Message, MessageData, MessageReturn, ResourceErrors,
    SourceRole, INIT, INIT_RESPONSE,
};
