//! The hook service catalog.

use blockgraph_core::{ErrorKind, MessageDefinition, ServiceCatalog, SourceRole};

pub const SERVICE_NAME: &str = "hook";

pub const HOOK: &str = "hook";

pub static HOOK_SERVICE: ServiceCatalog = ServiceCatalog::new(
    SERVICE_NAME,
    &[MessageDefinition::request(
        HOOK,
        SourceRole::Block,
        ErrorKind::ReadOrModify,
        "Create, update or remove an embedder-rendered view of an entity property",
    )],
);
