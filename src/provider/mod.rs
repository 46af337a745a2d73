//! # Metadata provider access
//!
//! [`MetadataProvider`] is the seam between the pipeline and the external NFT metadata
//! service. [`AlchemyProvider`] talks to the real HTTP API; tests substitute in-memory
//! implementations or a mock server.
//!
//! The two fetchers built on top of it carry the recovery policy:
//!
//! - [`fetch_collection`]: cursor-paginated enumeration of a whole contract. A failed page
//!   ends enumeration but keeps what was already fetched. [`collect_collection`] also
//!   reports that failure.
//! - [`fetch_tokens_batch`]: explicit token lookup in fixed-size chunks. A failed chunk is
//!   logged and skipped.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt::Debug;

use crate::{error::SoulburnError, properties::TokenId};

pub mod alchemy;
pub mod batch;
pub mod collection;

pub use alchemy::AlchemyProvider;
pub use batch::{fetch_tokens_batch, BatchOptions, BATCH_SIZE};
pub use collection::{collect_collection, fetch_collection, Enumeration, PAGE_SIZE};

/// Response fields the next-page cursor has been observed under.
pub const CURSOR_FIELDS: [&str; 4] = ["nextToken", "next_token", "pageKey", "continuation"];

/// One page of a collection enumeration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionPage {
    pub records: Vec<Value>,
    pub next_cursor: Option<String>,
}

#[async_trait]
pub trait MetadataProvider: Debug + Send + Sync {
    /// Fetch one page of `contract`'s tokens, starting at `cursor` when given.
    async fn collection_page(
        &self,
        contract: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<CollectionPage, SoulburnError>;

    /// Fetch metadata for an explicit set of tokens. Tokens the provider does not return are
    /// simply absent from the result.
    async fn metadata_batch(
        &self,
        contract: &str,
        token_ids: &[TokenId],
    ) -> Result<Vec<Value>, SoulburnError>;

    /// Fetch metadata for a single token.
    async fn token_metadata(
        &self,
        contract: &str,
        token_id: &TokenId,
    ) -> Result<Option<Value>, SoulburnError>;
}

/// Rejects bodies carrying an explicit provider `error` field.
pub fn check_error_field(body: &Map<String, Value>) -> Result<(), SoulburnError> {
    match body.get("error") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(msg)) => Err(SoulburnError::Service(msg.clone())),
        Some(Value::Object(obj)) => Err(SoulburnError::Service(
            obj.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(obj.clone()).to_string()),
        )),
        Some(other) => Err(SoulburnError::Service(other.to_string())),
    }
}

/// Extracts the record list of a provider response envelope.
pub fn parse_records(body: &Value) -> Result<Vec<Value>, SoulburnError> {
    let obj = body
        .as_object()
        .ok_or_else(|| SoulburnError::Shape("response body is not a JSON object".to_string()))?;
    check_error_field(obj)?;
    match obj.get("nfts") {
        Some(Value::Array(records)) => Ok(records.clone()),
        Some(_) => Err(SoulburnError::Shape("'nfts' is not a list".to_string())),
        None => Err(SoulburnError::Shape(format!(
            "no 'nfts' key in response. Response keys: {:?}",
            obj.keys().collect::<Vec<_>>()
        ))),
    }
}

/// Finds the next-page cursor under any of [`CURSOR_FIELDS`]. Blank cursors count as absent.
pub fn parse_cursor(body: &Value) -> Option<String> {
    let obj = body.as_object()?;
    CURSOR_FIELDS.iter().find_map(|field| {
        let cursor = match obj.get(*field)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!cursor.is_empty()).then_some(cursor)
    })
}

/// Parses a full collection-page envelope.
pub fn parse_collection_page(body: &Value) -> Result<CollectionPage, SoulburnError> {
    Ok(CollectionPage {
        records: parse_records(body)?,
        next_cursor: parse_cursor(body),
    })
}
