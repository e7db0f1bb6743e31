//! An in-memory graph embedder.
//!
//! [`MockDatastore`] keeps every edition of every entity, a versioned store
//! of ontology types and a set of linked aggregations. Writes never change an
//! edition's contents: updates append a new edition stamped with a strictly
//! increasing timestamp, and only close the previous edition's validity
//! interval. Reads answer with subgraphs resolved from the requested roots
//! out to the requested depths.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use blockgraph_core::{ErrorCode, MessageReturn, ResourceErrors};
use blockgraph_subgraph::{
    BaseUrl, DataTypeWithMetadata, Entity, EntityId, EntityProperties,
    EntityRecordId, EntityTemporalVersioning, EntityTypeWithMetadata, GraphElementEditionId,
    GraphResolveDepths, LinkData, OntologyTypeEditionId, OntologyVertex, PropertyTypeWithMetadata,
    Subgraph, SubgraphBuilder, SubgraphError, TimeInterval, Timestamp, VersionedUrl,
};
use chrono::{TimeDelta, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::embedder::{GraphEmbedder, READONLY_MESSAGE};
use crate::error::Result;
use crate::query::{self, AggregateOperation};
use crate::types::*;

/// Base under which minted ontology types live.
pub const MOCK_TYPE_BASE: &str = "https://mock.example/types/";
pub const FILE_ENTITY_TYPE: &str = "https://mock.example/types/entity-type/file/v/1";
pub const FILE_URL_PROPERTY: &str = "https://mock.example/types/property-type/url/";
pub const FILE_MEDIA_TYPE_PROPERTY: &str = "https://mock.example/types/property-type/media-type/";

/// Depths used for entity reads that do not ask for any: an entity's links
/// and the entities at their other ends.
pub const DEFAULT_ENTITY_DEPTHS: GraphResolveDepths = GraphResolveDepths::links(1);

fn forbidden() -> ResourceErrors {
    ResourceErrors::single(ErrorCode::Forbidden, READONLY_MESSAGE)
}

fn not_found(message: impl Into<String>) -> ResourceErrors {
    ResourceErrors::single(ErrorCode::NotFound, message)
}

fn invalid_input(message: impl Into<String>) -> ResourceErrors {
    ResourceErrors::single(ErrorCode::InvalidInput, message)
}

/// Refuse an operation whose paging could never be run.
fn check_paging(operation: &AggregateOperation) -> MessageReturn<()> {
    query::aggregate(Vec::<(Value, ())>::new(), operation).map(drop)
}

fn internal(err: impl Display) -> ResourceErrors {
    ResourceErrors::single(ErrorCode::InternalError, err.to_string())
}

fn to_json<T: Serialize>(value: &T) -> MessageReturn<Value> {
    serde_json::to_value(value).map_err(internal)
}

/// Initial contents of a [`MockDatastore`].
#[derive(Debug, Clone, Default)]
pub struct MockData {
    pub entities: Vec<Entity>,
    pub data_types: Vec<DataTypeWithMetadata>,
    pub property_types: Vec<PropertyTypeWithMetadata>,
    pub entity_types: Vec<EntityTypeWithMetadata>,
    pub linked_aggregations: Vec<LinkedAggregationDefinition>,
}

/// One hop along an edge kind, in one direction.
#[derive(Debug, Clone, Copy)]
enum Hop {
    InheritsFrom,
    ConstrainsValuesOn,
    ConstrainsPropertiesOn,
    ConstrainsLinksOn,
    ConstrainsLinkDestinationsOn,
    IsOfType,
    HasLeftEntity { incoming: bool },
    HasRightEntity { incoming: bool },
}

impl Hop {
    /// The depths left after taking this hop, or `None` if it is out of range.
    fn take(self, depths: GraphResolveDepths) -> Option<GraphResolveDepths> {
        let mut next = depths;
        let remaining = match self {
            Hop::InheritsFrom => &mut next.inherits_from.outgoing,
            Hop::ConstrainsValuesOn => &mut next.constrains_values_on.outgoing,
            Hop::ConstrainsPropertiesOn => &mut next.constrains_properties_on.outgoing,
            Hop::ConstrainsLinksOn => &mut next.constrains_links_on.outgoing,
            Hop::ConstrainsLinkDestinationsOn => &mut next.constrains_link_destinations_on.outgoing,
            Hop::IsOfType => &mut next.is_of_type.outgoing,
            Hop::HasLeftEntity { incoming: true } => &mut next.has_left_entity.incoming,
            Hop::HasLeftEntity { incoming: false } => &mut next.has_left_entity.outgoing,
            Hop::HasRightEntity { incoming: true } => &mut next.has_right_entity.incoming,
            Hop::HasRightEntity { incoming: false } => &mut next.has_right_entity.outgoing,
        };
        *remaining = remaining.checked_sub(1)?;
        Some(next)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Element {
    Entity(EntityId),
    OntologyType(OntologyTypeEditionId),
}

impl From<&GraphElementEditionId> for Element {
    fn from(id: &GraphElementEditionId) -> Self {
        match id {
            GraphElementEditionId::Entity(id) => Element::Entity(id.base_id.clone()),
            GraphElementEditionId::OntologyType(id) => Element::OntologyType(id.clone()),
        }
    }
}

#[derive(Debug, Default)]
struct Selection {
    entities: BTreeSet<EntityId>,
    ontology: BTreeSet<OntologyTypeEditionId>,
}

#[derive(Debug, Default)]
struct Store {
    entities: BTreeMap<EntityId, BTreeMap<Timestamp, Entity>>,
    ontology: BTreeMap<BaseUrl, BTreeMap<u32, OntologyVertex>>,
    linked_aggregations: BTreeMap<String, LinkedAggregationDefinition>,
    last_timestamp: Option<Timestamp>,
}

impl Store {
    /// Now, or just after the last timestamp handed out if that is later.
    fn next_timestamp(&mut self) -> Timestamp {
        let mut timestamp = Timestamp::from(Utc::now());
        if let Some(last) = &self.last_timestamp {
            if timestamp <= *last {
                if let Some(last) = last.to_datetime() {
                    timestamp = Timestamp::from(last + TimeDelta::milliseconds(1));
                }
            }
        }
        self.last_timestamp = Some(timestamp.clone());
        timestamp
    }

    fn latest(&self, entity_id: &EntityId) -> Option<&Entity> {
        self.entities
            .get(entity_id)
            .and_then(|editions| editions.values().next_back())
    }

    fn latest_link(&self, entity_id: &EntityId) -> MessageReturn<&Entity> {
        self.latest(entity_id)
            .filter(|entity| entity.is_link())
            .ok_or_else(|| not_found(format!("Could not find link with linkEntityId '{entity_id}'")))
    }

    fn latest_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities
            .values()
            .filter_map(|editions| editions.values().next_back())
    }

    /// Store `entity` as the newest edition of its entity.
    fn push_edition(&mut self, mut entity: Entity) -> Entity {
        let start = entity.edition_timestamp().clone();
        let editions = self.entities.entry(entity.entity_id().clone()).or_default();
        if let Some(previous) = editions.values_mut().next_back() {
            let closed = TimeInterval::for_edition(previous.edition_timestamp().clone(), Some(start.clone()));
            previous.metadata.temporal_versioning = Some(EntityTemporalVersioning {
                decision_time: closed.clone(),
                transaction_time: closed,
            });
        }
        let open = TimeInterval::for_edition(start.clone(), None);
        entity.metadata.temporal_versioning = Some(EntityTemporalVersioning {
            decision_time: open.clone(),
            transaction_time: open,
        });
        editions.insert(start, entity.clone());
        entity
    }

    fn create_entity(
        &mut self,
        entity_type_id: VersionedUrl,
        properties: EntityProperties,
        link_data: Option<LinkData>,
    ) -> MessageReturn<Entity> {
        if let Some(link) = &link_data {
            for endpoint in [&link.left_entity_id, &link.right_entity_id] {
                if self.latest(endpoint).is_none() {
                    return Err(invalid_input(format!(
                        "link endpoint '{endpoint}' does not exist"
                    )));
                }
            }
        }
        let entity_id = EntityId::new(Uuid::new_v4().to_string());
        let timestamp = self.next_timestamp();
        let mut entity =
            Entity::new(EntityRecordId::new(entity_id, timestamp), entity_type_id).with_properties(properties);
        entity.link_data = link_data;
        debug!(entity_id = %entity.entity_id(), "entity created");
        Ok(self.push_edition(entity))
    }

    /// A new edition of `previous` carrying `properties`.
    fn next_edition(&mut self, previous: &Entity, properties: EntityProperties) -> Entity {
        let timestamp = self.next_timestamp();
        let mut entity = Entity::new(
            EntityRecordId::new(previous.entity_id().clone(), timestamp),
            previous.entity_type_id().clone(),
        )
        .with_properties(properties);
        entity.link_data = previous.link_data.clone();
        entity
    }

    /// Remove an entity, the links attached to it and its linked aggregations.
    fn remove_entity(&mut self, entity_id: &EntityId) -> bool {
        if self.entities.remove(entity_id).is_none() {
            return false;
        }
        self.entities.retain(|_, editions| {
            !editions.values().any(|edition| {
                edition.link_data.as_ref().is_some_and(|link| {
                    link.left_entity_id == *entity_id || link.right_entity_id == *entity_id
                })
            })
        });
        self.linked_aggregations
            .retain(|_, aggregation| aggregation.source_entity_id != *entity_id);
        true
    }

    fn insert_ontology(&mut self, vertex: OntologyVertex) -> std::result::Result<(), SubgraphError> {
        let id = vertex.record_id().clone();
        let versions = self.ontology.entry(id.base_id.clone()).or_default();
        if let Some(existing) = versions.values().next() {
            if existing.kind() != vertex.kind() {
                return Err(SubgraphError::MixedVertexKinds {
                    base_id: id.base_id.to_string(),
                    expected: existing.kind(),
                    found: vertex.kind(),
                });
            }
        }
        versions.insert(id.version_id, vertex);
        Ok(())
    }

    fn ontology_type(&self, id: &OntologyTypeEditionId) -> Option<&OntologyVertex> {
        self.ontology.get(&id.base_id)?.get(&id.version_id)
    }

    fn entity_type_versions(&self, base_url: &BaseUrl) -> Option<&BTreeMap<u32, OntologyVertex>> {
        self.ontology
            .get(base_url)
            .filter(|versions| versions.values().all(|v| matches!(v, OntologyVertex::EntityType(_))))
    }

    fn entity_type(&self, id: &VersionedUrl) -> MessageReturn<&EntityTypeWithMetadata> {
        match self.entity_type_versions(&id.base_url).and_then(|v| v.get(&id.version)) {
            Some(OntologyVertex::EntityType(entity_type)) => Ok(entity_type),
            _ => Err(not_found(format!(
                "Could not find entity type with entityTypeId '{id}'"
            ))),
        }
    }

    fn latest_entity_types(&self) -> impl Iterator<Item = &EntityTypeWithMetadata> {
        self.ontology
            .values()
            .filter_map(|versions| match versions.values().next_back() {
                Some(OntologyVertex::EntityType(entity_type)) => Some(entity_type),
                _ => None,
            })
    }

    /// Every element reachable from `roots` within `depths`.
    fn traverse(&self, roots: Vec<Element>, depths: GraphResolveDepths) -> Selection {
        let mut selection = Selection::default();
        let mut seen = HashSet::new();
        let mut queue: VecDeque<_> = roots.into_iter().map(|root| (root, depths)).collect();

        while let Some((element, depths)) = queue.pop_front() {
            if !seen.insert((element.clone(), depths)) {
                continue;
            }
            let mut visit = |hop: Hop, next: Element| {
                if let Some(remaining) = hop.take(depths) {
                    queue.push_back((next, remaining));
                }
            };

            match element {
                Element::Entity(entity_id) => {
                    let Some(editions) = self.entities.get(&entity_id) else {
                        continue;
                    };
                    for edition in editions.values() {
                        visit(Hop::IsOfType, Element::OntologyType(edition.entity_type_id().into()));
                        if let Some(link) = &edition.link_data {
                            visit(
                                Hop::HasLeftEntity { incoming: false },
                                Element::Entity(link.left_entity_id.clone()),
                            );
                            visit(
                                Hop::HasRightEntity { incoming: false },
                                Element::Entity(link.right_entity_id.clone()),
                            );
                        }
                    }
                    for (link_id, link_editions) in &self.entities {
                        for link in link_editions.values().filter_map(|e| e.link_data.as_ref()) {
                            if link.left_entity_id == entity_id {
                                visit(Hop::HasLeftEntity { incoming: true }, Element::Entity(link_id.clone()));
                            }
                            if link.right_entity_id == entity_id {
                                visit(Hop::HasRightEntity { incoming: true }, Element::Entity(link_id.clone()));
                            }
                        }
                    }
                    selection.entities.insert(entity_id);
                }
                Element::OntologyType(type_id) => {
                    let Some(vertex) = self.ontology_type(&type_id) else {
                        continue;
                    };
                    let targets: Vec<(Hop, VersionedUrl)> = match vertex {
                        OntologyVertex::DataType(_) => Vec::new(),
                        OntologyVertex::PropertyType(property_type) => {
                            let values = property_type.data_type_references();
                            let properties = property_type.property_type_references();
                            values
                                .into_iter()
                                .map(|url| (Hop::ConstrainsValuesOn, url))
                                .chain(properties.into_iter().map(|url| (Hop::ConstrainsPropertiesOn, url)))
                                .collect()
                        }
                        OntologyVertex::EntityType(entity_type) => {
                            let mut targets = Vec::new();
                            for (hop, urls) in [
                                (Hop::InheritsFrom, entity_type.inherits_from()),
                                (Hop::ConstrainsPropertiesOn, entity_type.property_type_references()),
                                (Hop::ConstrainsLinksOn, entity_type.link_type_references()),
                                (
                                    Hop::ConstrainsLinkDestinationsOn,
                                    entity_type.link_destination_references(),
                                ),
                            ] {
                                targets.extend(urls.into_iter().map(|url| (hop, url)));
                            }
                            targets
                        }
                    };
                    for (hop, url) in targets {
                        visit(hop, Element::OntologyType(OntologyTypeEditionId::from(&url)));
                    }
                    selection.ontology.insert(type_id);
                }
            }
        }
        selection
    }

    /// The subgraph rooted at `roots`, resolved out to `depths`.
    fn subgraph(&self, roots: Vec<GraphElementEditionId>, depths: GraphResolveDepths) -> MessageReturn<Subgraph> {
        let selection = self.traverse(roots.iter().map(Element::from).collect(), depths);

        let entities = selection
            .entities
            .iter()
            .filter_map(|id| self.entities.get(id))
            .flat_map(|editions| editions.values().cloned());
        let mut data_types = Vec::new();
        let mut property_types = Vec::new();
        let mut entity_types = Vec::new();
        for id in &selection.ontology {
            match self.ontology_type(id).cloned() {
                Some(OntologyVertex::DataType(inner)) => data_types.push(inner),
                Some(OntologyVertex::PropertyType(inner)) => property_types.push(inner),
                Some(OntologyVertex::EntityType(inner)) => entity_types.push(inner),
                None => {}
            }
        }

        SubgraphBuilder::new(depths)
            .roots(roots)
            .entities(entities)
            .data_types(data_types)
            .property_types(property_types)
            .entity_types(entity_types)
            .build()
            .map_err(internal)
    }

    /// Latest entity editions paired with their JSON form.
    fn entity_rows(&self) -> MessageReturn<Vec<(Value, &Entity)>> {
        self.latest_entities()
            .map(|entity| Ok((to_json(entity)?, entity)))
            .collect()
    }

    fn run_aggregation(&self, definition: &LinkedAggregationDefinition) -> MessageReturn<LinkedAggregation> {
        let (results, operation) = query::aggregate(self.entity_rows()?, &definition.operation)?;
        Ok(LinkedAggregation {
            aggregation_id: definition.aggregation_id.clone(),
            source_entity_id: definition.source_entity_id.clone(),
            path: definition.path.clone(),
            results: results.into_iter().cloned().collect(),
            operation,
        })
    }

    fn linked_aggregation(&mut self, aggregation_id: &str) -> MessageReturn<&mut LinkedAggregationDefinition> {
        self.linked_aggregations.get_mut(aggregation_id).ok_or_else(|| {
            not_found(format!(
                "Could not find linked aggregation with aggregationId '{aggregation_id}'"
            ))
        })
    }
}

fn edition_roots<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> Vec<GraphElementEditionId> {
    entities
        .into_iter()
        .map(|entity| GraphElementEditionId::from(entity.edition_id()))
        .collect()
}

/// Replace the schema's `$id` with `id`.
fn stamp_schema(mut schema: Value, id: &VersionedUrl) -> Value {
    if let Value::Object(object) = &mut schema {
        object.insert("$id".to_string(), Value::String(id.to_string()));
    }
    schema
}

/// An in-memory [`GraphEmbedder`].
#[derive(Debug, Default)]
pub struct MockDatastore {
    store: Mutex<Store>,
    readonly: AtomicBool,
}

impl MockDatastore {
    pub fn new(data: MockData) -> Result<Self> {
        let mut store = Store::default();
        for vertex in data
            .data_types
            .into_iter()
            .map(OntologyVertex::from)
            .chain(data.property_types.into_iter().map(OntologyVertex::from))
            .chain(data.entity_types.into_iter().map(OntologyVertex::from))
        {
            store.insert_ontology(vertex)?;
        }
        for entity in data.entities {
            if store.last_timestamp.as_ref() < Some(entity.edition_timestamp()) {
                store.last_timestamp = Some(entity.edition_timestamp().clone());
            }
            store
                .entities
                .entry(entity.entity_id().clone())
                .or_default()
                .insert(entity.edition_timestamp().clone(), entity);
        }
        for aggregation in data.linked_aggregations {
            store
                .linked_aggregations
                .insert(aggregation.aggregation_id.clone(), aggregation);
        }

        Ok(Self {
            store: Mutex::new(store),
            readonly: AtomicBool::new(false),
        })
    }

    pub fn set_readonly(&self, readonly: bool) {
        self.readonly.store(readonly, Ordering::SeqCst);
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> MessageReturn<()> {
        if self.is_readonly() {
            Err(forbidden())
        } else {
            Ok(())
        }
    }

    /// Latest edition of an entity.
    pub async fn entity(&self, entity_id: &EntityId) -> Option<Entity> {
        self.store.lock().await.latest(entity_id).cloned()
    }

    /// Every edition of an entity, oldest first.
    pub async fn entity_editions(&self, entity_id: &EntityId) -> Vec<Entity> {
        self.store
            .lock()
            .await
            .entities
            .get(entity_id)
            .map(|editions| editions.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn entity_types(&self) -> Vec<EntityTypeWithMetadata> {
        self.store.lock().await.latest_entity_types().cloned().collect()
    }

    /// What a block rendering `block_entity_id` receives on initialization.
    pub async fn block_graph_properties(&self, block_entity_id: &EntityId) -> MessageReturn<BlockGraphProperties> {
        let store = self.store.lock().await;
        let block_entity = store
            .latest(block_entity_id)
            .cloned()
            .ok_or_else(|| not_found(format!("Could not find entity with entityId '{block_entity_id}'")))?;
        let block_graph = store.subgraph(edition_roots([&block_entity]), DEFAULT_ENTITY_DEPTHS)?;
        let linked_aggregations = store
            .linked_aggregations
            .values()
            .filter(|aggregation| aggregation.source_entity_id == *block_entity_id)
            .map(|aggregation| store.run_aggregation(aggregation))
            .collect::<MessageReturn<Vec<_>>>()?;

        Ok(BlockGraphProperties {
            block_entity: Some(block_entity),
            block_graph: Some(block_graph),
            entity_types: Some(store.latest_entity_types().cloned().collect()),
            linked_aggregations: Some(linked_aggregations),
            readonly: self.is_readonly(),
        })
    }
}

#[async_trait]
impl GraphEmbedder for MockDatastore {
    async fn create_entity(&self, data: CreateEntityData) -> MessageReturn<Entity> {
        self.check_writable()?;
        let mut store = self.store.lock().await;
        store.create_entity(data.entity_type_id, data.properties, data.link_data)
    }

    async fn update_entity(&self, data: UpdateEntityData) -> MessageReturn<Entity> {
        self.check_writable()?;
        let mut store = self.store.lock().await;
        let previous = store.latest(&data.entity_id).cloned().ok_or_else(|| {
            not_found(format!("Could not find entity with entityId '{}'", data.entity_id))
        })?;

        let mut entity = store.next_edition(&previous, data.properties);
        if let Some(entity_type_id) = data.entity_type_id {
            entity.metadata.entity_type_id = entity_type_id;
        }
        if let Some(link) = &mut entity.link_data {
            link.left_to_right_order = data.left_to_right_order.or(link.left_to_right_order);
            link.right_to_left_order = data.right_to_left_order.or(link.right_to_left_order);
        }
        Ok(store.push_edition(entity))
    }

    async fn delete_entity(&self, data: DeleteEntityData) -> MessageReturn<bool> {
        self.check_writable()?;
        let mut store = self.store.lock().await;
        if store.remove_entity(&data.entity_id) {
            Ok(true)
        } else {
            Err(not_found(format!(
                "Could not find entity with entityId '{}'",
                data.entity_id
            )))
        }
    }

    async fn get_entity(&self, data: GetEntityData) -> MessageReturn<Subgraph> {
        let store = self.store.lock().await;
        let entity = store.latest(&data.entity_id).ok_or_else(|| {
            not_found(format!("Could not find entity with entityId '{}'", data.entity_id))
        })?;
        let depths = data.graph_resolve_depths.unwrap_or(DEFAULT_ENTITY_DEPTHS);
        store.subgraph(edition_roots([entity]), depths)
    }

    async fn aggregate_entities(&self, data: AggregateEntitiesData) -> MessageReturn<AggregateEntitiesResult> {
        let store = self.store.lock().await;
        let (page, operation) = query::aggregate(store.entity_rows()?, &data.operation)?;
        let depths = data.graph_resolve_depths.unwrap_or(DEFAULT_ENTITY_DEPTHS);
        let results = store.subgraph(edition_roots(page), depths)?;
        Ok(AggregateEntitiesResult { results, operation })
    }

    async fn query_entities(&self, data: QueryEntitiesData) -> MessageReturn<QueryEntitiesResult> {
        let store = self.store.lock().await;
        let matches = query::filter(store.entity_rows()?, &data.operation.multi_filter);
        let depths = data.graph_resolve_depths.unwrap_or(DEFAULT_ENTITY_DEPTHS);
        let results = store.subgraph(edition_roots(matches.into_iter().map(|(_, e)| e)), depths)?;
        Ok(QueryEntitiesResult {
            results,
            operation: data.operation,
        })
    }

    async fn create_entity_type(&self, data: CreateEntityTypeData) -> MessageReturn<EntityTypeWithMetadata> {
        self.check_writable()?;
        if !data.schema.is_object() {
            return Err(invalid_input("entity type schema must be a JSON object"));
        }
        let mut store = self.store.lock().await;

        let id = match data.schema.get("$id").and_then(Value::as_str) {
            Some(id) => id
                .parse::<VersionedUrl>()
                .map_err(|err| invalid_input(err.to_string()))?,
            None => {
                let base = BaseUrl::new(format!("{MOCK_TYPE_BASE}entity-type/{}/", Uuid::new_v4()))
                    .map_err(internal)?;
                VersionedUrl::new(base, 1)
            }
        };
        if store.ontology.contains_key(&id.base_url) {
            return Err(invalid_input(format!("entity type '{}' already exists", id.base_url)));
        }

        let entity_type = EntityTypeWithMetadata::new(
            OntologyTypeEditionId::from(&id),
            stamp_schema(data.schema, &id),
        );
        store
            .insert_ontology(entity_type.clone().into())
            .map_err(|err| invalid_input(err.to_string()))?;
        Ok(entity_type)
    }

    async fn update_entity_type(&self, data: UpdateEntityTypeData) -> MessageReturn<EntityTypeWithMetadata> {
        self.check_writable()?;
        let mut store = self.store.lock().await;
        store.entity_type(&data.entity_type_id)?;

        let latest = store
            .entity_type_versions(&data.entity_type_id.base_url)
            .and_then(|versions| versions.keys().next_back().copied())
            .unwrap_or(data.entity_type_id.version);
        let version = latest.checked_add(1).ok_or_else(|| {
            invalid_input(format!("entity type '{}' has no versions left", data.entity_type_id.base_url))
        })?;
        let id = VersionedUrl::new(data.entity_type_id.base_url.clone(), version);
        let entity_type = EntityTypeWithMetadata::new(
            OntologyTypeEditionId::from(&id),
            stamp_schema(data.schema, &id),
        );
        store
            .insert_ontology(entity_type.clone().into())
            .map_err(internal)?;
        Ok(entity_type)
    }

    async fn delete_entity_type(&self, data: DeleteEntityTypeData) -> MessageReturn<bool> {
        self.check_writable()?;
        let mut store = self.store.lock().await;
        store.entity_type(&data.entity_type_id)?;
        store.ontology.remove(&data.entity_type_id.base_url);
        Ok(true)
    }

    async fn get_entity_type(&self, data: GetEntityTypeData) -> MessageReturn<Subgraph> {
        let store = self.store.lock().await;
        let entity_type = store.entity_type(&data.entity_type_id)?;
        let root = GraphElementEditionId::from(entity_type.record_id().clone());
        store.subgraph(vec![root], data.graph_resolve_depths.unwrap_or_default())
    }

    async fn aggregate_entity_types(
        &self,
        data: AggregateEntityTypesData,
    ) -> MessageReturn<AggregateEntityTypesResult> {
        let store = self.store.lock().await;
        let rows = store
            .latest_entity_types()
            .map(|entity_type| Ok((to_json(entity_type)?, entity_type.record_id().clone())))
            .collect::<MessageReturn<Vec<_>>>()?;
        let operation = AggregateOperation {
            entity_type_id: None,
            ..data.operation
        };
        let (page, operation) = query::aggregate(rows, &operation)?;
        let roots = page.into_iter().map(GraphElementEditionId::from).collect();
        let results = store.subgraph(roots, data.graph_resolve_depths.unwrap_or_default())?;
        Ok(AggregateEntityTypesResult { results, operation })
    }

    async fn create_link(&self, data: CreateLinkData) -> MessageReturn<Entity> {
        self.check_writable()?;
        let link_data = data.link_data();
        let mut store = self.store.lock().await;
        store.create_entity(data.link_entity_type_id, data.properties, Some(link_data))
    }

    async fn update_link(&self, data: UpdateLinkData) -> MessageReturn<Entity> {
        self.check_writable()?;
        let mut store = self.store.lock().await;
        let previous = store.latest_link(&data.link_entity_id)?.clone();

        let properties = data.properties.unwrap_or_else(|| previous.properties.clone());
        let mut entity = store.next_edition(&previous, properties);
        if let Some(link) = &mut entity.link_data {
            link.left_to_right_order = data.left_to_right_order.or(link.left_to_right_order);
            link.right_to_left_order = data.right_to_left_order.or(link.right_to_left_order);
        }
        Ok(store.push_edition(entity))
    }

    async fn delete_link(&self, data: DeleteLinkData) -> MessageReturn<bool> {
        self.check_writable()?;
        let mut store = self.store.lock().await;
        store.latest_link(&data.link_entity_id)?;
        store.remove_entity(&data.link_entity_id);
        Ok(true)
    }

    async fn get_link(&self, data: GetLinkData) -> MessageReturn<Entity> {
        let store = self.store.lock().await;
        store.latest_link(&data.link_entity_id).cloned()
    }

    async fn create_linked_aggregation(
        &self,
        data: CreateLinkedAggregationData,
    ) -> MessageReturn<LinkedAggregationDefinition> {
        self.check_writable()?;
        let mut store = self.store.lock().await;
        if store.latest(&data.source_entity_id).is_none() {
            return Err(invalid_input(format!(
                "source entity '{}' does not exist",
                data.source_entity_id
            )));
        }
        check_paging(&data.operation)?;
        let definition = LinkedAggregationDefinition {
            aggregation_id: Uuid::new_v4().to_string(),
            source_entity_id: data.source_entity_id,
            path: data.path,
            operation: data.operation,
        };
        store
            .linked_aggregations
            .insert(definition.aggregation_id.clone(), definition.clone());
        Ok(definition)
    }

    async fn update_linked_aggregation(
        &self,
        data: UpdateLinkedAggregationData,
    ) -> MessageReturn<LinkedAggregationDefinition> {
        self.check_writable()?;
        check_paging(&data.operation)?;
        let mut store = self.store.lock().await;
        let definition = store.linked_aggregation(&data.aggregation_id)?;
        definition.operation = data.operation;
        Ok(definition.clone())
    }

    async fn delete_linked_aggregation(&self, data: DeleteLinkedAggregationData) -> MessageReturn<bool> {
        self.check_writable()?;
        let mut store = self.store.lock().await;
        store.linked_aggregation(&data.aggregation_id)?;
        store.linked_aggregations.remove(&data.aggregation_id);
        Ok(true)
    }

    async fn get_linked_aggregation(&self, data: GetLinkedAggregationData) -> MessageReturn<LinkedAggregation> {
        let mut store = self.store.lock().await;
        let definition = store.linked_aggregation(&data.aggregation_id)?.clone();
        store.run_aggregation(&definition)
    }

    async fn upload_file(&self, data: UploadFileData) -> MessageReturn<UploadFileReturn> {
        self.check_writable()?;
        let media_type = data.media_type;
        let url = data.url.as_deref().map(str::trim).filter(|url| !url.is_empty());
        let url = match (url, &data.file) {
            (Some(url), _) => url.to_string(),
            (None, Some(file)) => file
                .to_data_url()
                .map_err(|err| invalid_input(format!("file '{}' is not valid base64: {err}", file.name)))?,
            (None, None) => {
                return Err(invalid_input(format!(
                    "Please enter a valid {} URL or select a file below",
                    media_type.as_str()
                )))
            }
        };

        let entity_type_id = FILE_ENTITY_TYPE.parse::<VersionedUrl>().map_err(internal)?;
        let properties = EntityProperties::from([
            (FILE_URL_PROPERTY.to_string(), Value::String(url.clone())),
            (
                FILE_MEDIA_TYPE_PROPERTY.to_string(),
                Value::String(media_type.as_str().to_string()),
            ),
        ]);
        let mut store = self.store.lock().await;
        let entity = store.create_entity(entity_type_id, properties, None)?;
        Ok(UploadFileReturn {
            entity_id: entity.entity_id().clone(),
            url,
            media_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{FilterItem, FilterOperator, MultiFilter, MultiFilterOperator};
    use blockgraph_subgraph::{stdlib, EntityEditionId};
    use serde_json::json;

    const PERSON: &str = "https://example.com/types/entity-type/person/v/1";
    const FRIEND_OF: &str = "https://example.com/types/entity-type/friend-of/v/1";
    const NAME: &str = "https://example.com/types/property-type/name/";

    fn entity_roots(subgraph: &Subgraph) -> Vec<&EntityEditionId> {
        subgraph
            .roots()
            .iter()
            .filter_map(|root| match root {
                GraphElementEditionId::Entity(id) => Some(id),
                GraphElementEditionId::OntologyType(_) => None,
            })
            .collect()
    }

    fn url(s: &str) -> VersionedUrl {
        s.parse().unwrap()
    }

    async fn person(store: &MockDatastore, name: &str) -> Entity {
        store
            .create_entity(CreateEntityData {
                entity_type_id: url(PERSON),
                properties: EntityProperties::from([(NAME.to_string(), json!(name))]),
                link_data: None,
            })
            .await
            .unwrap()
    }

    async fn friends(store: &MockDatastore, left: &Entity, right: &Entity) -> Entity {
        store
            .create_link(CreateLinkData {
                left_entity_id: left.entity_id().clone(),
                right_entity_id: right.entity_id().clone(),
                link_entity_type_id: url(FRIEND_OF),
                properties: EntityProperties::new(),
                left_to_right_order: None,
                right_to_left_order: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn updates_append_editions_with_increasing_timestamps() {
        let store = MockDatastore::default();
        let alice = person(&store, "Alice").await;
        let updated = store
            .update_entity(UpdateEntityData {
                entity_id: alice.entity_id().clone(),
                entity_type_id: None,
                properties: EntityProperties::from([(NAME.to_string(), json!("Alicia"))]),
                left_to_right_order: None,
                right_to_left_order: None,
            })
            .await
            .unwrap();
        assert!(updated.edition_timestamp() > alice.edition_timestamp());

        let editions = store.entity_editions(alice.entity_id()).await;
        assert_eq!(editions.len(), 2);
        let first = editions[0].metadata.temporal_versioning.as_ref().unwrap();
        assert_eq!(
            first.decision_time,
            TimeInterval::for_edition(
                alice.edition_timestamp().clone(),
                Some(updated.edition_timestamp().clone())
            )
        );

        // Both editions travel in the subgraph; the old one stays readable.
        let subgraph = store
            .get_entity(GetEntityData {
                entity_id: alice.entity_id().clone(),
                graph_resolve_depths: None,
            })
            .await
            .unwrap();
        let then = stdlib::get_entity(&subgraph, alice.entity_id(), Some(alice.edition_timestamp())).unwrap();
        assert_eq!(then.properties[NAME], json!("Alice"));
        let now = stdlib::get_entity(&subgraph, alice.entity_id(), None).unwrap();
        assert_eq!(now.properties[NAME], json!("Alicia"));
    }

    #[tokio::test]
    async fn readonly_refuses_mutations_but_not_reads() {
        let store = MockDatastore::default();
        let alice = person(&store, "Alice").await;
        store.set_readonly(true);

        let errors = store
            .create_entity(CreateEntityData {
                entity_type_id: url(PERSON),
                properties: EntityProperties::new(),
                link_data: None,
            })
            .await
            .unwrap_err();
        assert!(errors.has_code(ErrorCode::Forbidden));
        assert_eq!(errors.first().message, READONLY_MESSAGE);

        assert!(store
            .delete_entity(DeleteEntityData {
                entity_id: alice.entity_id().clone()
            })
            .await
            .unwrap_err()
            .has_code(ErrorCode::Forbidden));
        assert!(store
            .get_entity(GetEntityData {
                entity_id: alice.entity_id().clone(),
                graph_resolve_depths: None,
            })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn missing_things_are_not_found() {
        let store = MockDatastore::default();
        let missing = EntityId::new("nobody");
        let errors = store
            .update_entity(UpdateEntityData {
                entity_id: missing.clone(),
                entity_type_id: None,
                properties: EntityProperties::new(),
                left_to_right_order: None,
                right_to_left_order: None,
            })
            .await
            .unwrap_err();
        assert_eq!(errors.first().message, "Could not find entity with entityId 'nobody'");

        assert!(store
            .get_link(GetLinkData {
                link_entity_id: missing
            })
            .await
            .unwrap_err()
            .has_code(ErrorCode::NotFound));
        assert!(store
            .get_linked_aggregation(GetLinkedAggregationData {
                aggregation_id: "nothing".to_string()
            })
            .await
            .unwrap_err()
            .has_code(ErrorCode::NotFound));
    }

    #[tokio::test]
    async fn links_need_existing_endpoints() {
        let store = MockDatastore::default();
        let alice = person(&store, "Alice").await;
        let errors = store
            .create_link(CreateLinkData {
                left_entity_id: alice.entity_id().clone(),
                right_entity_id: "ghost".into(),
                link_entity_type_id: url(FRIEND_OF),
                properties: EntityProperties::new(),
                left_to_right_order: None,
                right_to_left_order: None,
            })
            .await
            .unwrap_err();
        assert!(errors.has_code(ErrorCode::InvalidInput));
    }

    #[tokio::test]
    async fn get_entity_resolves_links_to_default_depth() {
        let store = MockDatastore::default();
        let alice = person(&store, "Alice").await;
        let bob = person(&store, "Bob").await;
        let carol = person(&store, "Carol").await;
        let alice_bob = friends(&store, &alice, &bob).await;
        friends(&store, &bob, &carol).await;

        let subgraph = store
            .get_entity(GetEntityData {
                entity_id: alice.entity_id().clone(),
                graph_resolve_depths: None,
            })
            .await
            .unwrap();
        assert_eq!(entity_roots(&subgraph), [&alice.edition_id()]);

        let at = alice_bob.edition_timestamp();
        let outgoing = stdlib::get_outgoing_link_and_target_entities_at_moment(&subgraph, alice.entity_id(), at)
            .unwrap();
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].right_entity.entity_id(), bob.entity_id());

        // Carol is two links away.
        assert!(stdlib::get_entity(&subgraph, carol.entity_id(), None).is_none());
    }

    #[tokio::test]
    async fn deleting_an_entity_removes_its_links() {
        let store = MockDatastore::default();
        let alice = person(&store, "Alice").await;
        let bob = person(&store, "Bob").await;
        let link = friends(&store, &alice, &bob).await;

        store
            .delete_entity(DeleteEntityData {
                entity_id: bob.entity_id().clone(),
            })
            .await
            .unwrap();
        assert!(store.entity(link.entity_id()).await.is_none());
        assert!(store.entity(alice.entity_id()).await.is_some());
    }

    #[tokio::test]
    async fn aggregate_and_query_filter_latest_editions() {
        let store = MockDatastore::default();
        for name in ["Alice", "Bob", "Alfred"] {
            person(&store, name).await;
        }
        let field = format!("properties.{NAME}");

        let result = store
            .aggregate_entities(AggregateEntitiesData {
                operation: AggregateOperation {
                    multi_sort: Some(vec![crate::query::Sort {
                        field: field.as_str().into(),
                        desc: false,
                    }]),
                    items_per_page: Some(2),
                    ..AggregateOperation::default()
                },
                graph_resolve_depths: None,
            })
            .await
            .unwrap();
        assert_eq!(result.operation.total_count, 3);
        assert_eq!(result.operation.page_count, 2);
        let names: Vec<_> = stdlib::get_roots(&result.results)
            .unwrap()
            .into_iter()
            .filter_map(|root| root.as_entity())
            .map(|entity| entity.properties[NAME].clone())
            .collect();
        assert_eq!(names, [json!("Alfred"), json!("Alice")]);

        let result = store
            .query_entities(QueryEntitiesData {
                operation: QueryOperation {
                    multi_filter: MultiFilter {
                        filters: vec![FilterItem::new(field.as_str(), FilterOperator::StartsWith, "al")],
                        operator: MultiFilterOperator::And,
                    },
                },
                graph_resolve_depths: None,
            })
            .await
            .unwrap();
        assert_eq!(result.results.roots().len(), 2);
    }

    #[tokio::test]
    async fn entity_types_are_versioned() {
        let store = MockDatastore::default();
        let created = store
            .create_entity_type(CreateEntityTypeData {
                schema: json!({"title": "Book", "type": "object", "properties": {}}),
            })
            .await
            .unwrap();
        let id = created.record_id().to_versioned_url();
        assert_eq!(id.version, 1);
        assert_eq!(created.schema["$id"], json!(id.to_string()));

        let updated = store
            .update_entity_type(UpdateEntityTypeData {
                entity_type_id: id.clone(),
                schema: json!({"title": "Novel", "type": "object", "properties": {}}),
            })
            .await
            .unwrap();
        assert_eq!(updated.record_id().version_id, 2);
        assert_eq!(updated.title(), Some("Novel"));

        let subgraph = store
            .get_entity_type(GetEntityTypeData {
                entity_type_id: id.clone(),
                graph_resolve_depths: None,
            })
            .await
            .unwrap();
        let found = stdlib::get_entity_type_by_id(&subgraph, &id).unwrap().unwrap();
        assert_eq!(found.title(), Some("Book"));

        let listed = store
            .aggregate_entity_types(AggregateEntityTypesData::default())
            .await
            .unwrap();
        assert_eq!(listed.operation.total_count, 1);

        store
            .delete_entity_type(DeleteEntityTypeData {
                entity_type_id: id.clone(),
            })
            .await
            .unwrap();
        assert!(store
            .get_entity_type(GetEntityTypeData {
                entity_type_id: id,
                graph_resolve_depths: None,
            })
            .await
            .unwrap_err()
            .has_code(ErrorCode::NotFound));
    }

    #[tokio::test]
    async fn exhausted_entity_type_version_is_invalid_input() {
        let store = MockDatastore::default();
        let last = format!("{MOCK_TYPE_BASE}entity-type/tome/v/{}", u32::MAX);
        let created = store
            .create_entity_type(CreateEntityTypeData {
                schema: json!({"$id": last, "title": "Tome", "type": "object", "properties": {}}),
            })
            .await
            .unwrap();

        let errors = store
            .update_entity_type(UpdateEntityTypeData {
                entity_type_id: created.record_id().to_versioned_url(),
                schema: json!({"title": "Tome", "type": "object", "properties": {}}),
            })
            .await
            .unwrap_err();
        assert!(errors.has_code(ErrorCode::InvalidInput));
        assert_eq!(store.entity_types().await.len(), 1);
    }

    #[tokio::test]
    async fn unreachable_pages_are_invalid_input() {
        let store = MockDatastore::default();
        let alice = person(&store, "Alice").await;
        let operation = AggregateOperation {
            items_per_page: Some(usize::MAX),
            page_number: Some(3),
            ..AggregateOperation::default()
        };

        let errors = store
            .aggregate_entities(AggregateEntitiesData {
                operation: operation.clone(),
                graph_resolve_depths: None,
            })
            .await
            .unwrap_err();
        assert!(errors.has_code(ErrorCode::InvalidInput));

        let errors = store
            .create_linked_aggregation(CreateLinkedAggregationData {
                source_entity_id: alice.entity_id().clone(),
                path: "$.friends".to_string(),
                operation,
            })
            .await
            .unwrap_err();
        assert!(errors.has_code(ErrorCode::InvalidInput));
    }

    #[tokio::test]
    async fn linked_aggregations_run_on_read() {
        let store = MockDatastore::default();
        let alice = person(&store, "Alice").await;
        person(&store, "Bob").await;

        let definition = store
            .create_linked_aggregation(CreateLinkedAggregationData {
                source_entity_id: alice.entity_id().clone(),
                path: "$.people".to_string(),
                operation: AggregateOperation {
                    entity_type_id: Some(url(PERSON)),
                    ..AggregateOperation::default()
                },
            })
            .await
            .unwrap();

        let aggregation = store
            .get_linked_aggregation(GetLinkedAggregationData {
                aggregation_id: definition.aggregation_id.clone(),
            })
            .await
            .unwrap();
        assert_eq!(aggregation.results.len(), 2);

        let properties = store.block_graph_properties(alice.entity_id()).await.unwrap();
        assert_eq!(properties.linked_aggregations.unwrap().len(), 1);
        assert_eq!(properties.block_entity.unwrap().entity_id(), alice.entity_id());

        store
            .delete_linked_aggregation(DeleteLinkedAggregationData {
                aggregation_id: definition.aggregation_id,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn uploads_become_file_entities() {
        let store = MockDatastore::default();
        let by_url = store
            .upload_file(UploadFileData {
                file: None,
                url: Some(" https://cdn.example/cat.png ".to_string()),
                media_type: FileMediaType::Image,
            })
            .await
            .unwrap();
        assert_eq!(by_url.url, "https://cdn.example/cat.png");
        let entity = store.entity(&by_url.entity_id).await.unwrap();
        assert_eq!(entity.properties[FILE_MEDIA_TYPE_PROPERTY], json!("image"));

        let by_file = store
            .upload_file(UploadFileData {
                file: Some(FileContent::from_bytes("a.txt", Some("text/plain".to_string()), b"hi")),
                url: None,
                media_type: FileMediaType::Image,
            })
            .await
            .unwrap();
        assert_eq!(by_file.url, "data:text/plain;base64,aGk=");

        let errors = store
            .upload_file(UploadFileData {
                file: None,
                url: Some("   ".to_string()),
                media_type: FileMediaType::Video,
            })
            .await
            .unwrap_err();
        assert_eq!(
            errors.first().message,
            "Please enter a valid video URL or select a file below"
        );
    }
}
