use std::sync::Arc;
use std::time::Duration;

use blockgraph_core::{ErrorCode, MemoryChannel, ServiceConfig, ServiceHandler, SourceRole};
use blockgraph_graph::{
    catalog, CreateEntityData, DeleteEntityData, GetEntityData, GraphBlockHandler, GraphEmbedder,
    GraphEmbedderHandler, MockData, MockDatastore, UpdateEntityData, GRAPH_SERVICE, READONLY_MESSAGE,
};
use blockgraph_subgraph::{stdlib, Entity, EntityId, EntityProperties, EntityRecordId, Timestamp};
use serde_json::{json, Value};

const POST: &str = "https://example.com/types/entity-type/post/v/1";
const TITLE: &str = "https://example.com/types/property-type/title/";

fn post_edition(at: &str, title: &str) -> Entity {
    Entity::new(EntityRecordId::new("post-1", at), POST.parse().unwrap()).with_property(TITLE, json!(title))
}

fn ts(s: &str) -> Timestamp {
    Timestamp::new(s)
}

/// An embedder serving `store` for the block entity `post-1`, and a
/// connected block.
async fn connect(store: Arc<MockDatastore>) -> (GraphEmbedderHandler, GraphBlockHandler) {
    let (block_end, embedder_end) = MemoryChannel::pair(64);
    let properties = store
        .block_graph_properties(&EntityId::new("post-1"))
        .await
        .unwrap();
    let embedder = GraphEmbedderHandler::connect(
        Arc::new(embedder_end),
        ServiceConfig::default(),
        properties,
        store as Arc<dyn GraphEmbedder>,
    )
    .unwrap();
    let block = GraphBlockHandler::connect(Arc::new(block_end), ServiceConfig::default()).unwrap();
    tokio::time::timeout(Duration::from_secs(1), block.ready())
        .await
        .expect("handshake timed out")
        .unwrap();
    (embedder, block)
}

fn seeded() -> Arc<MockDatastore> {
    let data = MockData {
        entities: vec![
            post_edition("2023-01-01T00:00:00.000Z", "A"),
            post_edition("2023-01-05T00:00:00.000Z", "B"),
        ],
        ..MockData::default()
    };
    Arc::new(MockDatastore::new(data).unwrap())
}

#[tokio::test]
async fn block_reads_editions_at_a_moment() {
    let (_embedder, block) = connect(seeded()).await;

    let subgraph = block
        .get_entity(&GetEntityData {
            entity_id: "post-1".into(),
            graph_resolve_depths: None,
        })
        .await
        .unwrap()
        .unwrap();
    let post = EntityId::new("post-1");
    let title_at = |at: &str| {
        stdlib::get_entity(&subgraph, &post, Some(&ts(at))).map(|entity| entity.properties[TITLE].clone())
    };

    assert_eq!(title_at("2023-01-03T00:00:00.000Z"), Some(json!("A")));
    assert_eq!(title_at("2023-01-05T00:00:00.000Z"), Some(json!("B")));
    assert_eq!(title_at("2023-01-10T00:00:00.000Z"), Some(json!("B")));
    assert_eq!(title_at("2022-12-31T00:00:00.000Z"), None);
    assert_eq!(
        stdlib::get_entity(&subgraph, &post, None).map(|entity| entity.properties[TITLE].clone()),
        Some(json!("B"))
    );
}

#[tokio::test]
async fn handshake_delivers_block_state() {
    let (_embedder, block) = connect(seeded()).await;

    let entity = block.block_entity().unwrap();
    assert_eq!(entity.properties[TITLE], json!("B"));
    let graph = block.block_graph().unwrap();
    assert_eq!(graph.roots().len(), 1);
    assert_eq!(block.entity_types().unwrap().len(), 0);
    assert!(!block.is_readonly());
}

#[tokio::test]
async fn writes_over_the_wire_append_editions() {
    let store = seeded();
    let (_embedder, block) = connect(Arc::clone(&store)).await;

    let created = block
        .create_entity(&CreateEntityData {
            entity_type_id: POST.parse().unwrap(),
            properties: EntityProperties::from([(TITLE.to_string(), json!("C"))]),
            link_data: None,
        })
        .await
        .unwrap()
        .unwrap();
    assert!(store.entity(created.entity_id()).await.is_some());

    let updated = block
        .update_entity(&UpdateEntityData {
            entity_id: created.entity_id().clone(),
            entity_type_id: None,
            properties: EntityProperties::from([(TITLE.to_string(), json!("D"))]),
            left_to_right_order: None,
            right_to_left_order: None,
        })
        .await
        .unwrap()
        .unwrap();
    assert!(updated.edition_timestamp() > created.edition_timestamp());
    assert_eq!(store.entity_editions(created.entity_id()).await.len(), 2);

    let errors = block
        .delete_entity(&DeleteEntityData {
            entity_id: "missing".into(),
        })
        .await
        .unwrap()
        .unwrap_err();
    assert!(errors.has_code(ErrorCode::NotFound));
}

#[tokio::test]
async fn readonly_create_without_data_is_forbidden() {
    let store = seeded();
    let mut properties = store
        .block_graph_properties(&EntityId::new("post-1"))
        .await
        .unwrap();
    properties.readonly = true;

    let (block_end, embedder_end) = MemoryChannel::pair(64);
    let _embedder = GraphEmbedderHandler::connect(
        Arc::new(embedder_end),
        ServiceConfig::default(),
        properties,
        store as Arc<dyn GraphEmbedder>,
    )
    .unwrap();

    // A bare handler, so the request can go out with no usable payload.
    let block = ServiceHandler::new(&GRAPH_SERVICE, SourceRole::Block, Arc::new(block_end), ServiceConfig::default());
    block.initialize().unwrap();
    block.ready().await.unwrap();

    let errors = block
        .request(catalog::CREATE_ENTITY, Value::Null)
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(errors.iter().count(), 1);
    assert_eq!(errors.first().code, ErrorCode::Forbidden);
    assert_eq!(errors.first().message, READONLY_MESSAGE);
}

#[tokio::test]
async fn readonly_changes_reach_the_block() {
    let (embedder, block) = connect(seeded()).await;
    let mut readonly = block.watch_readonly();
    readonly.borrow_and_update();

    embedder.set_readonly(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), readonly.changed())
        .await
        .expect("readonly never arrived")
        .unwrap();
    assert!(block.is_readonly());

    let errors = block
        .create_entity(&CreateEntityData {
            entity_type_id: POST.parse().unwrap(),
            properties: EntityProperties::new(),
            link_data: None,
        })
        .await
        .unwrap()
        .unwrap_err();
    assert!(errors.has_code(ErrorCode::Forbidden));
}
