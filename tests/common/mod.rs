//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use async_trait::async_trait;
use serde_json::{json, Value};
use soulburn::{
    config::{Config, ProviderConfig},
    properties::{BaselineRow, TokenId},
    provider::{CollectionPage, MetadataProvider},
    SoulburnError,
};
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

pub const API_KEY: &str = "test-secret-key";

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Provider config pointing at a mock server.
#[allow(dead_code)]
pub fn provider_config(server_uri: &str) -> ProviderConfig {
    ProviderConfig {
        api_key: API_KEY.to_string(),
        base_url: format!("{server_uri}/nft/v3"),
        request_timeout_secs: 5,
        single_token_fallback: false,
    }
}

/// Path of a provider endpoint on the mock server.
#[allow(dead_code)]
pub fn endpoint_path(name: &str) -> String {
    format!("/nft/v3/{API_KEY}/{name}")
}

#[allow(dead_code)]
pub fn config() -> Config {
    let mut config = Config::default();
    config.provider.api_key = API_KEY.to_string();
    config
}

#[allow(dead_code)]
pub fn id(raw: &str) -> TokenId {
    TokenId::parse(raw).unwrap()
}

/// A soul record in the provider's usual shape, carrying a burn order attribute.
#[allow(dead_code)]
pub fn soul_record(token_id: &str, burn_order: Value) -> Value {
    json!({
        "contract": {"address": "0x251b5f14a825c537ff788604ea1b58e49b70726f"},
        "tokenId": token_id,
        "name": format!("Soul #{token_id}"),
        "raw": {
            "metadata": {
                "attributes": [
                    {"trait_type": "Burn order", "value": burn_order},
                    {"trait_type": "Head", "value": "Ghost Hood"}
                ]
            }
        }
    })
}

/// A wizard record with the given traits.
#[allow(dead_code)]
pub fn wizard_record(token_id: &str, traits: &[(&str, &str)]) -> Value {
    let attributes: Vec<Value> = traits
        .iter()
        .map(|(key, value)| json!({"trait_type": key, "value": value}))
        .collect();
    json!({
        "tokenId": token_id,
        "name": format!("Wizard #{token_id}"),
        "raw": {"metadata": {"attributes": attributes}}
    })
}

/// Plain records with sequential ids, for page-count tests.
#[allow(dead_code)]
pub fn numbered_records(start: usize, count: usize) -> Vec<Value> {
    (start..start + count)
        .map(|n| json!({"tokenId": n.to_string()}))
        .collect()
}

/// Baseline of wizards 1, 2 and 3, all wearing the Wizard Hat.
#[allow(dead_code)]
pub fn hat_baseline() -> Vec<BaselineRow> {
    ["1", "2", "3"]
        .into_iter()
        .map(|raw| BaselineRow::new(id(raw)).with_trait("head", "Wizard Hat"))
        .collect()
}

/// In-memory provider. Souls are served in pages whose cursor is the next start offset;
/// wizards are looked up by id. Optionally delays every page request, and fails every page
/// request from index `fail_after_pages` on.
#[derive(Debug, Default)]
#[allow(dead_code)]
pub struct StaticProvider {
    pub souls: Vec<Value>,
    pub wizards: BTreeMap<TokenId, Value>,
    pub fail_batches: bool,
    pub page_delay: Option<Duration>,
    pub fail_after_pages: Option<usize>,
    pub page_requests: AtomicUsize,
    pub batch_requests: AtomicUsize,
}

#[allow(dead_code)]
impl StaticProvider {
    pub fn new(souls: Vec<Value>, wizards: Vec<Value>) -> Self {
        let wizards = wizards
            .into_iter()
            .map(|w| (id(w["tokenId"].as_str().unwrap()), w))
            .collect();
        StaticProvider {
            souls,
            wizards,
            ..Default::default()
        }
    }

    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    pub fn batch_requests(&self) -> usize {
        self.batch_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for StaticProvider {
    async fn collection_page(
        &self,
        _contract: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<CollectionPage, SoulburnError> {
        let index = self.page_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.page_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_after_pages.is_some_and(|n| index >= n) {
            return Err(SoulburnError::Remote(format!("page {index} unavailable")));
        }
        let start: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
        let end = (start + limit).min(self.souls.len());
        let records = self.souls[start.min(end)..end].to_vec();
        let next_cursor = (end < self.souls.len()).then(|| end.to_string());
        Ok(CollectionPage {
            records,
            next_cursor,
        })
    }

    async fn metadata_batch(
        &self,
        _contract: &str,
        token_ids: &[TokenId],
    ) -> Result<Vec<Value>, SoulburnError> {
        self.batch_requests.fetch_add(1, Ordering::SeqCst);
        if self.fail_batches {
            return Err(SoulburnError::Remote("batch endpoint unavailable".to_string()));
        }
        Ok(token_ids
            .iter()
            .filter_map(|id| self.wizards.get(id).cloned())
            .collect())
    }

    async fn token_metadata(
        &self,
        _contract: &str,
        token_id: &TokenId,
    ) -> Result<Option<Value>, SoulburnError> {
        Ok(self.wizards.get(token_id).cloned())
    }
}
