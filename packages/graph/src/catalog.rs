//! The graph service catalog.

use blockgraph_core::{ErrorKind, MessageDefinition, ServiceCatalog, SourceRole};

pub const SERVICE_NAME: &str = "graph";

pub const BLOCK_ENTITY: &str = "blockEntity";
pub const BLOCK_GRAPH: &str = "blockGraph";
pub const ENTITY_TYPES: &str = "entityTypes";
pub const LINKED_AGGREGATIONS: &str = "linkedAggregations";
pub const READONLY: &str = "readonly";

pub const CREATE_ENTITY: &str = "createEntity";
pub const UPDATE_ENTITY: &str = "updateEntity";
pub const DELETE_ENTITY: &str = "deleteEntity";
pub const GET_ENTITY: &str = "getEntity";
pub const AGGREGATE_ENTITIES: &str = "aggregateEntities";
pub const QUERY_ENTITIES: &str = "queryEntities";

pub const CREATE_ENTITY_TYPE: &str = "createEntityType";
pub const UPDATE_ENTITY_TYPE: &str = "updateEntityType";
pub const DELETE_ENTITY_TYPE: &str = "deleteEntityType";
pub const GET_ENTITY_TYPE: &str = "getEntityType";
pub const AGGREGATE_ENTITY_TYPES: &str = "aggregateEntityTypes";

pub const CREATE_LINK: &str = "createLink";
pub const UPDATE_LINK: &str = "updateLink";
pub const DELETE_LINK: &str = "deleteLink";
pub const GET_LINK: &str = "getLink";

pub const CREATE_LINKED_AGGREGATION: &str = "createLinkedAggregation";
pub const UPDATE_LINKED_AGGREGATION: &str = "updateLinkedAggregation";
pub const DELETE_LINKED_AGGREGATION: &str = "deleteLinkedAggregation";
pub const GET_LINKED_AGGREGATION: &str = "getLinkedAggregation";

pub const UPLOAD_FILE: &str = "uploadFile";

const fn push(name: &'static str, description: &'static str) -> MessageDefinition {
    MessageDefinition::notification(name, SourceRole::Embedder, description).on_initialization()
}

const fn create(name: &'static str, description: &'static str) -> MessageDefinition {
    MessageDefinition::request(name, SourceRole::Block, ErrorKind::Create, description)
}

const fn read_or_modify(name: &'static str, description: &'static str) -> MessageDefinition {
    MessageDefinition::request(name, SourceRole::Block, ErrorKind::ReadOrModify, description)
}

/// Every message the graph service carries.
pub static GRAPH_SERVICE: ServiceCatalog = ServiceCatalog::new(
    SERVICE_NAME,
    &[
        push(BLOCK_ENTITY, "The entity the block is rendering"),
        push(BLOCK_GRAPH, "Subgraph rooted at the block entity"),
        push(ENTITY_TYPES, "Entity types the block may need"),
        push(LINKED_AGGREGATIONS, "Aggregations linked from the block entity"),
        push(READONLY, "Whether the block must refuse to make changes"),
        create(CREATE_ENTITY, "Create an entity"),
        read_or_modify(UPDATE_ENTITY, "Write a new edition of an entity"),
        read_or_modify(DELETE_ENTITY, "Delete an entity"),
        read_or_modify(GET_ENTITY, "Subgraph rooted at one entity"),
        read_or_modify(AGGREGATE_ENTITIES, "Filter, sort and page entities"),
        read_or_modify(QUERY_ENTITIES, "Filter entities"),
        create(CREATE_ENTITY_TYPE, "Create an entity type"),
        read_or_modify(UPDATE_ENTITY_TYPE, "Write a new version of an entity type"),
        read_or_modify(DELETE_ENTITY_TYPE, "Delete an entity type"),
        read_or_modify(GET_ENTITY_TYPE, "Subgraph rooted at one entity type"),
        read_or_modify(AGGREGATE_ENTITY_TYPES, "Filter, sort and page entity types"),
        create(CREATE_LINK, "Create a link entity"),
        read_or_modify(UPDATE_LINK, "Change a link entity's order or properties"),
        read_or_modify(DELETE_LINK, "Delete a link entity"),
        read_or_modify(GET_LINK, "Latest edition of a link entity"),
        create(CREATE_LINKED_AGGREGATION, "Attach an aggregation to an entity"),
        read_or_modify(UPDATE_LINKED_AGGREGATION, "Replace a linked aggregation's operation"),
        read_or_modify(DELETE_LINKED_AGGREGATION, "Delete a linked aggregation"),
        read_or_modify(GET_LINKED_AGGREGATION, "Run a linked aggregation"),
        create(UPLOAD_FILE, "Store a file and create an entity for it"),
    ],
);

/// Requests that change data and are refused while the block is read-only.
pub const MUTATIONS: &[&str] = &[
    CREATE_ENTITY,
    UPDATE_ENTITY,
    DELETE_ENTITY,
    CREATE_ENTITY_TYPE,
    UPDATE_ENTITY_TYPE,
    DELETE_ENTITY_TYPE,
    CREATE_LINK,
    UPDATE_LINK,
    DELETE_LINK,
    CREATE_LINKED_AGGREGATION,
    UPDATE_LINKED_AGGREGATION,
    DELETE_LINKED_AGGREGATION,
    UPLOAD_FILE,
];

pub fn is_mutation(message_name: &str) -> bool {
    MUTATIONS.contains(&message_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_shape() {
        assert_eq!(GRAPH_SERVICE.outbound(SourceRole::Embedder).count(), 5);
        assert!(GRAPH_SERVICE
            .outbound(SourceRole::Embedder)
            .all(|def| def.sent_on_initialization && !def.is_request()));
        assert_eq!(GRAPH_SERVICE.outbound(SourceRole::Block).count(), 20);
        assert!(GRAPH_SERVICE.outbound(SourceRole::Block).all(MessageDefinition::is_request));
    }

    #[test]
    fn every_mutation_is_a_block_request() {
        for name in MUTATIONS {
            assert!(GRAPH_SERVICE.find(name, SourceRole::Block).is_some(), "{name}");
        }
        assert!(!is_mutation(GET_ENTITY));
        assert!(is_mutation(UPLOAD_FILE));
    }

    #[test]
    fn creates_cannot_report_not_found() {
        let def = GRAPH_SERVICE.find(CREATE_ENTITY, SourceRole::Block).unwrap();
        assert_eq!(
            def.kind,
            blockgraph_core::MessageKind::Request {
                errors: ErrorKind::Create
            }
        );
    }
}
