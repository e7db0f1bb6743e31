//! Ontology types: data types, property types and entity types.
//!
//! Schemas are kept as raw JSON. The helpers here only read the `$ref`s a
//! subgraph needs to relate types to one another.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::OntologyTypeEditionId;
use crate::url::VersionedUrl;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OntologyElementMetadata {
    pub record_id: OntologyTypeEditionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTypeWithMetadata {
    pub schema: Value,
    pub metadata: OntologyElementMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyTypeWithMetadata {
    pub schema: Value,
    pub metadata: OntologyElementMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTypeWithMetadata {
    pub schema: Value,
    pub metadata: OntologyElementMetadata,
}

macro_rules! ontology_type_impl {
    ($ty:ident) => {
        impl $ty {
            pub fn new(record_id: OntologyTypeEditionId, schema: Value) -> Self {
                Self {
                    schema,
                    metadata: OntologyElementMetadata { record_id },
                }
            }

            pub fn record_id(&self) -> &OntologyTypeEditionId {
                &self.metadata.record_id
            }

            pub fn title(&self) -> Option<&str> {
                self.schema.get("title").and_then(Value::as_str)
            }
        }
    };
}

ontology_type_impl!(DataTypeWithMetadata);
ontology_type_impl!(PropertyTypeWithMetadata);
ontology_type_impl!(EntityTypeWithMetadata);

impl PropertyTypeWithMetadata {
    /// Data types the property's values may take.
    pub fn data_type_references(&self) -> BTreeSet<VersionedUrl> {
        let mut refs = PropertyTypeRefs::default();
        collect_property_values(&self.schema, &mut refs);
        refs.data_types
    }

    /// Property types nested in object values of this property.
    pub fn property_type_references(&self) -> BTreeSet<VersionedUrl> {
        let mut refs = PropertyTypeRefs::default();
        collect_property_values(&self.schema, &mut refs);
        refs.property_types
    }
}

impl EntityTypeWithMetadata {
    /// Property types listed under `properties`.
    pub fn property_type_references(&self) -> BTreeSet<VersionedUrl> {
        self.schema
            .get("properties")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|properties| properties.values())
            .filter_map(ref_or_array_items_ref)
            .collect()
    }

    /// Link entity types listed under `links`.
    pub fn link_type_references(&self) -> BTreeSet<VersionedUrl> {
        self.schema
            .get("links")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|links| links.keys())
            .filter_map(|key| key.parse().ok())
            .collect()
    }

    /// Entity types permitted at the far end of any link.
    pub fn link_destination_references(&self) -> BTreeSet<VersionedUrl> {
        self.schema
            .get("links")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|links| links.values())
            .filter_map(|link| link.get("items"))
            .filter_map(|items| items.get("oneOf"))
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(ref_of)
            .collect()
    }

    /// Entity types this type extends through `allOf`.
    pub fn inherits_from(&self) -> BTreeSet<VersionedUrl> {
        self.schema
            .get("allOf")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(ref_of)
            .collect()
    }
}

#[derive(Default)]
struct PropertyTypeRefs {
    data_types: BTreeSet<VersionedUrl>,
    property_types: BTreeSet<VersionedUrl>,
}

/// Walk a property-values `oneOf` list: a bare `$ref` is a data type, object
/// values reference property types and arrays nest another `oneOf`.
fn collect_property_values(schema: &Value, refs: &mut PropertyTypeRefs) {
    let Some(values) = schema.get("oneOf").and_then(Value::as_array) else {
        return;
    };
    for value in values {
        if let Some(url) = ref_of(value) {
            refs.data_types.insert(url);
        } else if let Some(properties) = value.get("properties").and_then(Value::as_object) {
            refs.property_types
                .extend(properties.values().filter_map(ref_or_array_items_ref));
        } else if let Some(items) = value.get("items") {
            collect_property_values(items, refs);
        }
    }
}

fn ref_of(value: &Value) -> Option<VersionedUrl> {
    value.get("$ref")?.as_str()?.parse().ok()
}

fn ref_or_array_items_ref(value: &Value) -> Option<VersionedUrl> {
    ref_of(value).or_else(|| value.get("items").and_then(ref_of))
}
