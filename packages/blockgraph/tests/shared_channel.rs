//! Both services over one channel, end to end.

use std::sync::Arc;
use std::time::Duration;

use blockgraph::core::{Channel, MemoryChannel, ServiceConfig, BLOCK_ORIGIN, EMBEDDER_ORIGIN};
use blockgraph::graph::{
    CreateLinkData, GetEntityData, GraphBlockHandler, GraphEmbedder, GraphEmbedderHandler, MockData,
    MockDatastore,
};
use blockgraph::hook::{HookBlockHandler, HookEmbedderHandler, NoopRenderer};
use blockgraph::stdlib;
use blockgraph::subgraph::{Entity, EntityId, EntityProperties, EntityRecordId, Timestamp};
use serde_json::json;

const PERSON: &str = "https://example.com/types/entity-type/person/v/1";
const KNOWS: &str = "https://example.com/types/entity-type/knows/v/1";

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn person(id: &str, name: &str) -> Entity {
    Entity::new(EntityRecordId::new(id, "2023-01-01T00:00:00.000Z"), PERSON.parse().unwrap())
        .with_property("name", json!(name))
}

struct Session {
    store: Arc<MockDatastore>,
    graph: GraphBlockHandler,
    hook: HookBlockHandler,
    _graph_embedder: GraphEmbedderHandler,
    _hook_embedder: HookEmbedderHandler,
}

async fn session(config: ServiceConfig) -> Session {
    init_logging();
    let store = Arc::new(
        MockDatastore::new(MockData {
            entities: vec![person("alice", "Alice"), person("bob", "Bob")],
            ..MockData::default()
        })
        .unwrap(),
    );
    let properties = store.block_graph_properties(&EntityId::new("alice")).await.unwrap();

    let (block_end, embedder_end) = MemoryChannel::pair(64);
    let block_end: Arc<dyn Channel> = Arc::new(block_end);
    let embedder_end: Arc<dyn Channel> = Arc::new(embedder_end);

    let graph_embedder = GraphEmbedderHandler::connect(
        Arc::clone(&embedder_end),
        config.clone(),
        properties,
        Arc::clone(&store) as Arc<dyn GraphEmbedder>,
    )
    .unwrap();
    let hook_embedder =
        HookEmbedderHandler::connect(embedder_end, config.clone(), Arc::new(NoopRenderer)).unwrap();

    let graph = GraphBlockHandler::connect(Arc::clone(&block_end), config.clone()).unwrap();
    let hook = HookBlockHandler::connect(block_end, config).unwrap();
    tokio::time::timeout(Duration::from_secs(1), async {
        graph.ready().await.unwrap();
        hook.ready().await.unwrap();
    })
    .await
    .expect("handshake timed out");

    Session {
        store,
        graph,
        hook,
        _graph_embedder: graph_embedder,
        _hook_embedder: hook_embedder,
    }
}

#[tokio::test]
async fn graph_and_hook_share_a_channel() {
    let session = session(ServiceConfig::default()).await;
    assert_eq!(session.graph.block_entity().unwrap().entity_id().as_str(), "alice");

    let link = session
        .graph
        .create_link(&CreateLinkData {
            left_entity_id: "alice".into(),
            right_entity_id: "bob".into(),
            link_entity_type_id: KNOWS.parse().unwrap(),
            properties: EntityProperties::new(),
            left_to_right_order: None,
            right_to_left_order: None,
        })
        .await
        .unwrap()
        .unwrap();

    let subgraph = session
        .graph
        .get_entity(&GetEntityData {
            entity_id: "alice".into(),
            graph_resolve_depths: None,
        })
        .await
        .unwrap()
        .unwrap();
    let now = Timestamp::now();
    let outgoing =
        stdlib::get_outgoing_link_and_target_entities_at_moment(&subgraph, &EntityId::new("alice"), &now).unwrap();
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].link_entity.entity_id(), link.entity_id());
    assert_eq!(outgoing[0].right_entity.properties["name"], json!("Bob"));

    let hook = session
        .hook
        .create("alice".into(), vec!["name".into()], "text", json!({}))
        .await
        .unwrap()
        .unwrap();
    assert!(!hook.hook_id.is_empty());
    assert!(session.store.entity(link.entity_id()).await.is_some());
}

#[tokio::test]
async fn origin_allow_lists_admit_the_peer() {
    let config = ServiceConfig::default().with_allowed_origins([BLOCK_ORIGIN, EMBEDDER_ORIGIN]);
    let session = session(config).await;
    assert!(session.graph.is_initialized());
}
