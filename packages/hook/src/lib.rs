//! # blockgraph-hook
//!
//! The hook service lets a block hand part of its view to the embedder: the
//! block names an entity, a path into its properties and a hook type, and
//! the embedder renders that value itself.

pub mod block;
pub mod catalog;
pub mod embedder;
pub mod error;
pub mod types;

pub use block::HookBlockHandler;
pub use catalog::{HOOK_SERVICE, SERVICE_NAME};
pub use embedder::{HookArena, HookEmbedderHandler, HookRenderer, NoopRenderer};
pub use error::{HookError, Result};
pub use types::{Hook, HookData, HookResponse, PathComponent};
