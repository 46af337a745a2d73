//! HTTP implementation of [`MetadataProvider`] against the Alchemy NFT v3 API.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::{fmt, time::Duration};

use super::{check_error_field, parse_collection_page, parse_records, CollectionPage, MetadataProvider};
use crate::{config::ProviderConfig, error::SoulburnError, properties::TokenId};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchToken<'a> {
    contract_address: &'a str,
    token_id: &'a str,
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    tokens: Vec<BatchToken<'a>>,
}

/// Alchemy-backed metadata provider.
///
/// The API key is a path segment of every request URL, so URLs are never logged or
/// rendered into errors; endpoint names are used instead.
pub struct AlchemyProvider {
    endpoint_root: String,
    http: reqwest::Client,
}

impl fmt::Debug for AlchemyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlchemyProvider").finish_non_exhaustive()
    }
}

impl AlchemyProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, SoulburnError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SoulburnError::Config(format!("HTTP client: {}", e.without_url())))?;
        Ok(Self::with_client(config, http))
    }

    pub fn with_client(config: &ProviderConfig, http: reqwest::Client) -> Self {
        let endpoint_root = format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            config.api_key
        );
        AlchemyProvider {
            endpoint_root,
            http,
        }
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.endpoint_root, name)
    }

    async fn read_json(
        endpoint: &str,
        resp: reqwest::Response,
    ) -> Result<Value, SoulburnError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(SoulburnError::Remote(format!(
                "Unexpected status {status} from {endpoint}"
            )));
        }
        Ok(resp.json::<Value>().await?)
    }
}

#[async_trait]
impl MetadataProvider for AlchemyProvider {
    async fn collection_page(
        &self,
        contract: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<CollectionPage, SoulburnError> {
        let endpoint = "getNFTsForCollection";
        let limit = limit.to_string();
        let mut query = vec![
            ("contractAddress", contract),
            ("withMetadata", "true"),
            ("limit", limit.as_str()),
        ];
        if let Some(cursor) = cursor {
            query.push(("startToken", cursor));
        }
        let resp = self
            .http
            .get(self.endpoint(endpoint))
            .query(&query)
            .send()
            .await?;
        let body = Self::read_json(endpoint, resp).await?;
        parse_collection_page(&body)
    }

    async fn metadata_batch(
        &self,
        contract: &str,
        token_ids: &[TokenId],
    ) -> Result<Vec<Value>, SoulburnError> {
        let endpoint = "getNFTMetadataBatch";
        let payload = BatchRequest {
            tokens: token_ids
                .iter()
                .map(|id| BatchToken {
                    contract_address: contract,
                    token_id: id.as_str(),
                })
                .collect(),
        };
        let resp = self
            .http
            .post(self.endpoint(endpoint))
            .json(&payload)
            .send()
            .await?;
        let body = Self::read_json(endpoint, resp).await?;
        parse_records(&body)
    }

    async fn token_metadata(
        &self,
        contract: &str,
        token_id: &TokenId,
    ) -> Result<Option<Value>, SoulburnError> {
        let endpoint = "getNFTMetadata";
        let resp = self
            .http
            .get(self.endpoint(endpoint))
            .query(&[("contractAddress", contract), ("tokenId", token_id.as_str())])
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = Self::read_json(endpoint, resp).await?;
        let Some(obj) = body.as_object() else {
            return Err(SoulburnError::Shape(format!(
                "{endpoint} returned a non-object body"
            )));
        };
        check_error_field(obj)?;
        Ok(Some(body))
    }
}
