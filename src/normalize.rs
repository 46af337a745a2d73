//! # Metadata normalization
//!
//! The provider's token records do not have a stable shape: the identifier may sit under
//! `id.tokenId`, `id` or `tokenId`, and the attribute list may sit under
//! `raw.metadata.attributes`, `metadata.attributes`, `attributes` or
//! `rawMetadata.attributes`. Any of those containers may also arrive as a JSON-encoded string.
//!
//! Each location is an [`Extractor`] strategy. A strategy list is tried in order by
//! [`first_success`] and the first strategy to yield a usable value wins, so every fallback
//! path can be tested on its own.

use serde_json::{Map, Value};
use std::borrow::Cow;

use crate::properties::{AttributeEntry, TokenId};

/// One way of pulling a value out of a raw record.
pub type Extractor<T> = fn(&Map<String, Value>) -> Option<T>;

/// Identifier locations, in priority order.
pub const TOKEN_ID_EXTRACTORS: [Extractor<TokenId>; 3] =
    [nested_token_id, scalar_id, top_level_token_id];

/// Attribute-list locations, in priority order.
pub const ATTRIBUTE_EXTRACTORS: [Extractor<Vec<Value>>; 4] = [
    raw_metadata_attributes,
    metadata_attributes,
    top_level_attributes,
    raw_metadata_field_attributes,
];

/// Field names an attribute's key may be stored under, first non-empty wins.
pub const ATTRIBUTE_KEY_FIELDS: [&str; 3] = ["trait_type", "key", "traitType"];

/// A raw record reduced to the fields the pipeline consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub id: TokenId,
    pub name: String,
    pub attributes: Vec<AttributeEntry>,
}

/// Runs `strategies` in order and returns the first value produced.
pub fn first_success<T>(record: &Map<String, Value>, strategies: &[Extractor<T>]) -> Option<T> {
    strategies.iter().find_map(|extract| extract(record))
}

/// Normalizes one raw provider record. Returns `None` (logged) when no identifier can be
/// resolved; a record with no attributes is still returned with an empty attribute list.
pub fn normalize(raw: &Value) -> Option<NormalizedRecord> {
    let Some(record) = raw.as_object() else {
        tracing::warn!("Skipping metadata record that is not a JSON object");
        return None;
    };
    let Some(id) = first_success(record, &TOKEN_ID_EXTRACTORS) else {
        tracing::warn!(
            "No usable token id in metadata record. Keys: {:?}",
            record.keys().collect::<Vec<_>>()
        );
        return None;
    };
    let attributes = first_success(record, &ATTRIBUTE_EXTRACTORS)
        .map(|list| list.iter().filter_map(attribute_entry).collect())
        .unwrap_or_default();
    Some(NormalizedRecord {
        name: display_name(record),
        id,
        attributes,
    })
}

/// Normalizes a batch, dropping records without an identifier.
pub fn normalize_all<'a, I>(raw: I) -> Vec<NormalizedRecord>
where
    I: IntoIterator<Item = &'a Value>,
{
    raw.into_iter().filter_map(normalize).collect()
}

/// Reads a field that should be structured but may arrive as JSON text. Text that fails to
/// parse is treated as absent.
pub fn structured(value: &Value) -> Option<Cow<'_, Value>> {
    match value {
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(parsed) => Some(Cow::Owned(parsed)),
            Err(e) => {
                tracing::debug!("Ignoring unparseable JSON-encoded field: {e}");
                None
            }
        },
        Value::Null => None,
        other => Some(Cow::Borrowed(other)),
    }
}

/// Follows `path` through nested objects, decoding string-encoded levels along the way.
fn lookup(record: &Map<String, Value>, path: &[&str]) -> Option<Value> {
    let (first, rest) = path.split_first()?;
    let mut current = structured(record.get(*first)?)?.into_owned();
    for key in rest {
        let next = current.as_object()?.get(*key)?;
        current = structured(next)?.into_owned();
    }
    Some(current)
}

fn non_empty_list(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(list) if !list.is_empty() => Some(list),
        _ => None,
    }
}

pub fn nested_token_id(record: &Map<String, Value>) -> Option<TokenId> {
    let raw = record.get("id")?.as_object()?.get("tokenId")?;
    TokenId::from_json(raw)
}

pub fn scalar_id(record: &Map<String, Value>) -> Option<TokenId> {
    match record.get("id")? {
        Value::Object(_) => None,
        raw => TokenId::from_json(raw),
    }
}

pub fn top_level_token_id(record: &Map<String, Value>) -> Option<TokenId> {
    TokenId::from_json(record.get("tokenId")?)
}

pub fn raw_metadata_attributes(record: &Map<String, Value>) -> Option<Vec<Value>> {
    non_empty_list(lookup(record, &["raw", "metadata", "attributes"])?)
}

pub fn metadata_attributes(record: &Map<String, Value>) -> Option<Vec<Value>> {
    non_empty_list(lookup(record, &["metadata", "attributes"])?)
}

pub fn top_level_attributes(record: &Map<String, Value>) -> Option<Vec<Value>> {
    non_empty_list(lookup(record, &["attributes"])?)
}

pub fn raw_metadata_field_attributes(record: &Map<String, Value>) -> Option<Vec<Value>> {
    non_empty_list(lookup(record, &["rawMetadata", "attributes"])?)
}

fn display_name(record: &Map<String, Value>) -> String {
    ["title", "name"]
        .iter()
        .filter_map(|field| record.get(*field).and_then(Value::as_str))
        .find(|name| !name.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Builds an [`AttributeEntry`] from one element of an attribute list; entries with no
/// resolvable key are dropped.
pub fn attribute_entry(raw: &Value) -> Option<AttributeEntry> {
    let attr = raw.as_object()?;
    let key = ATTRIBUTE_KEY_FIELDS
        .iter()
        .filter_map(|field| attr.get(*field).and_then(Value::as_str))
        .find(|key| !key.trim().is_empty())?;
    let value = attr.get("value").cloned().unwrap_or(Value::Null);
    Some(AttributeEntry::new(key, value))
}
