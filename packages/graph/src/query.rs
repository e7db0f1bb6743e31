//! Filtering, sorting and paging of graph elements.
//!
//! Elements are matched on their JSON form, so the same operation applies to
//! entities and to entity types. Fields are paths into that form, either a
//! list of keys or a dotted string. A dotted string prefers the longest key
//! that exists, so property keys that are URLs (and contain dots) resolve.

use std::cmp::Ordering;

use blockgraph_core::{ErrorCode, MessageReturn, ResourceErrors};
use blockgraph_subgraph::VersionedUrl;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_PAGE_NUMBER: usize = 1;
pub const DEFAULT_ITEMS_PER_PAGE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldPath {
    Dotted(String),
    Keys(Vec<String>),
}

impl FieldPath {
    /// The value at this path in `element`, if any.
    pub fn resolve<'a>(&self, element: &'a Value) -> Option<&'a Value> {
        match self {
            FieldPath::Dotted(path) => {
                let path = path.strip_prefix("$.").unwrap_or(path);
                resolve_dotted(element, path)
            }
            FieldPath::Keys(keys) => keys
                .iter()
                .try_fold(element, |value, key| value.get(key.as_str())),
        }
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        FieldPath::Dotted(path.to_string())
    }
}

fn resolve_dotted<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    if let Some(found) = value.get(path) {
        return Some(found);
    }
    // Try each split point, longest key first.
    path.rmatch_indices('.')
        .map(|(i, _)| i)
        .find_map(|i| {
            let next = value.get(&path[..i])?;
            resolve_dotted(next, &path[i + 1..])
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperator {
    Contains,
    DoesNotContain,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
    Is,
    IsNot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterItem {
    pub field: FieldPath,
    pub operator: FilterOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl FilterItem {
    pub fn new(field: impl Into<FieldPath>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: Some(value.into()),
        }
    }

    /// `None` when the field is not a string; such filters are skipped.
    fn matches(&self, element: &Value) -> Option<bool> {
        let item = self.field.resolve(element)?.as_str()?.to_lowercase();
        let value = self.value.as_deref().unwrap_or_default().to_lowercase();
        Some(match self.operator {
            FilterOperator::Contains => item.contains(&value),
            FilterOperator::DoesNotContain => !item.contains(&value),
            FilterOperator::StartsWith => item.starts_with(&value),
            FilterOperator::EndsWith => item.ends_with(&value),
            FilterOperator::IsEmpty => item.is_empty(),
            FilterOperator::IsNotEmpty => !item.is_empty(),
            FilterOperator::Is => item == value,
            FilterOperator::IsNot => item != value,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MultiFilterOperator {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiFilter {
    pub filters: Vec<FilterItem>,
    #[serde(default)]
    pub operator: MultiFilterOperator,
}

impl MultiFilter {
    pub fn matches(&self, element: &Value) -> bool {
        let mut results = self.filters.iter().filter_map(|filter| filter.matches(element));
        match self.operator {
            MultiFilterOperator::And => results.all(|matched| matched),
            MultiFilterOperator::Or => results.any(|matched| matched),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: FieldPath,
    #[serde(default)]
    pub desc: bool,
}

pub type MultiSort = Vec<Sort>;

/// Compare two optional JSON values. Missing and `null` sort first.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn compare_by(multi_sort: &[Sort], a: &Value, b: &Value) -> Ordering {
    multi_sort
        .iter()
        .map(|sort| {
            let ordering = compare_values(sort.field.resolve(a), sort.field.resolve(b));
            if sort.desc {
                ordering.reverse()
            } else {
                ordering
            }
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// What to aggregate, as requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateOperation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type_id: Option<VersionedUrl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_filter: Option<MultiFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_sort: Option<MultiSort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_per_page: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<usize>,
}

/// The operation as applied, with paging filled in and counts added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateOperationOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type_id: Option<VersionedUrl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_filter: Option<MultiFilter>,
    #[serde(default)]
    pub multi_sort: MultiSort,
    pub items_per_page: usize,
    pub page_number: usize,
    pub page_count: usize,
    pub total_count: usize,
}

/// Filter `elements` by `filter`, keeping their order.
pub fn filter<T>(elements: Vec<(Value, T)>, filter: &MultiFilter) -> Vec<(Value, T)> {
    elements
        .into_iter()
        .filter(|(json, _)| filter.matches(json))
        .collect()
}

/// Apply an aggregate operation to elements paired with their JSON form.
///
/// `entity_type_id` is matched against `metadata.entityTypeId`, so it only
/// narrows entities. A page whose offset does not fit in `usize` is
/// `INVALID_INPUT`.
pub fn aggregate<T>(
    elements: Vec<(Value, T)>,
    operation: &AggregateOperation,
) -> MessageReturn<(Vec<T>, AggregateOperationOutput)> {
    let page_number = operation
        .page_number
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_PAGE_NUMBER);
    let items_per_page = operation
        .items_per_page
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_ITEMS_PER_PAGE);
    let multi_sort = operation.multi_sort.clone().unwrap_or_default();
    let offset = (page_number - 1).checked_mul(items_per_page).ok_or_else(|| {
        ResourceErrors::single(
            ErrorCode::InvalidInput,
            format!("page {page_number} of {items_per_page} items is out of range"),
        )
    })?;

    let mut elements = match &operation.multi_filter {
        Some(multi_filter) => filter(elements, multi_filter),
        None => elements,
    };
    if let Some(type_id) = &operation.entity_type_id {
        let type_id = type_id.to_string();
        elements.retain(|(json, _)| {
            json.pointer("/metadata/entityTypeId").and_then(Value::as_str) == Some(type_id.as_str())
        });
    }
    elements.sort_by(|(a, _), (b, _)| compare_by(&multi_sort, a, b));

    let total_count = elements.len();
    let page_count = total_count.div_ceil(items_per_page);
    let results = elements
        .into_iter()
        .skip(offset)
        .take(items_per_page)
        .map(|(_, element)| element)
        .collect();

    let output = AggregateOperationOutput {
        entity_type_id: operation.entity_type_id.clone(),
        multi_filter: operation.multi_filter.clone(),
        multi_sort,
        items_per_page,
        page_number,
        page_count,
        total_count,
    };
    Ok((results, output))
}
