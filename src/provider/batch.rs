//! Explicit token lookup in bounded chunks.

use serde_json::Value;

use super::MetadataProvider;
use crate::properties::TokenId;

/// Tokens per batch request.
pub const BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub chunk_size: usize,
    /// Retry a failed chunk one token at a time instead of skipping it.
    pub single_token_fallback: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            chunk_size: BATCH_SIZE,
            single_token_fallback: false,
        }
    }
}

/// Fetches raw metadata for `token_ids` in chunks of [`BATCH_SIZE`]. A failed chunk is
/// logged and skipped; tokens missing from a response are dropped. Output order follows
/// the provider, not the input.
pub async fn fetch_tokens_batch(
    provider: &dyn MetadataProvider,
    contract: &str,
    token_ids: &[TokenId],
) -> Vec<Value> {
    fetch_tokens_batch_with(provider, contract, token_ids, BatchOptions::default()).await
}

/// [`fetch_tokens_batch`] with explicit [`BatchOptions`].
pub async fn fetch_tokens_batch_with(
    provider: &dyn MetadataProvider,
    contract: &str,
    token_ids: &[TokenId],
    options: BatchOptions,
) -> Vec<Value> {
    let mut records = Vec::with_capacity(token_ids.len());
    let chunk_size = options.chunk_size.max(1);

    for (index, chunk) in token_ids.chunks(chunk_size).enumerate() {
        match provider.metadata_batch(contract, chunk).await {
            Ok(batch) => {
                tracing::info!(
                    contract,
                    "Fetched batch {} with {} of {} requested tokens",
                    index + 1,
                    batch.len(),
                    chunk.len()
                );
                records.extend(batch);
            }
            Err(e) if options.single_token_fallback => {
                tracing::warn!(
                    contract,
                    "Batch {} failed ({e}), fetching {} tokens individually",
                    index + 1,
                    chunk.len()
                );
                records.extend(fetch_individually(provider, contract, chunk).await);
            }
            Err(e) => {
                tracing::warn!(
                    contract,
                    "Skipping batch {} of {} tokens: {e}",
                    index + 1,
                    chunk.len()
                );
            }
        }
    }
    records
}

async fn fetch_individually(
    provider: &dyn MetadataProvider,
    contract: &str,
    token_ids: &[TokenId],
) -> Vec<Value> {
    let mut records = Vec::new();
    for token_id in token_ids {
        match provider.token_metadata(contract, token_id).await {
            Ok(Some(record)) => records.push(record),
            Ok(None) => tracing::debug!(contract, "Token {token_id} not found"),
            Err(e) => tracing::warn!(contract, "Failed to fetch token {token_id}: {e}"),
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::SoulburnError, provider::CollectionPage};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::HashSet;

    /// Serves every requested token except `missing`, failing whole batches that contain any
    /// of `poisoned`.
    #[derive(Debug, Default)]
    struct FakeBatches {
        missing: HashSet<String>,
        poisoned: HashSet<String>,
        requests: Mutex<Vec<usize>>,
        singles: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MetadataProvider for FakeBatches {
        async fn collection_page(
            &self,
            _contract: &str,
            _limit: usize,
            _cursor: Option<&str>,
        ) -> Result<CollectionPage, SoulburnError> {
            unimplemented!()
        }

        async fn metadata_batch(
            &self,
            _contract: &str,
            token_ids: &[TokenId],
        ) -> Result<Vec<Value>, SoulburnError> {
            self.requests.lock().push(token_ids.len());
            if token_ids.iter().any(|id| self.poisoned.contains(id.as_str())) {
                return Err(SoulburnError::Remote("Unexpected status 500".to_string()));
            }
            Ok(token_ids
                .iter()
                .filter(|id| !self.missing.contains(id.as_str()))
                .map(|id| json!({ "id": { "tokenId": id.as_str() } }))
                .collect())
        }

        async fn token_metadata(
            &self,
            _contract: &str,
            token_id: &TokenId,
        ) -> Result<Option<Value>, SoulburnError> {
            self.singles.lock().push(token_id.to_string());
            if token_id.as_str() == "7" {
                return Err(SoulburnError::Remote("timeout".to_string()));
            }
            Ok(Some(json!({ "tokenId": token_id.as_str() })))
        }
    }

    fn ids(range: std::ops::Range<u32>) -> Vec<TokenId> {
        range
            .map(|i| TokenId::parse(&i.to_string()).unwrap())
            .collect()
    }

    #[test_log::test(tokio::test)]
    async fn test_chunks_of_fifty() {
        let provider = FakeBatches::default();
        let records = fetch_tokens_batch(&provider, "0xwizards", &ids(0..120)).await;
        assert_eq!(records.len(), 120);
        assert_eq!(*provider.requests.lock(), vec![50, 50, 20]);
    }

    #[test_log::test(tokio::test)]
    async fn test_missing_tokens_are_not_synthesized() {
        let provider = FakeBatches {
            missing: ["3".to_string(), "4".to_string()].into(),
            ..Default::default()
        };
        let records = fetch_tokens_batch(&provider, "0xwizards", &ids(0..10)).await;
        assert_eq!(records.len(), 8);
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_chunk_is_skipped() {
        let provider = FakeBatches {
            poisoned: ["55".to_string()].into(),
            ..Default::default()
        };
        let records = fetch_tokens_batch(&provider, "0xwizards", &ids(0..120)).await;
        assert_eq!(records.len(), 70);
        assert_eq!(provider.requests.lock().len(), 3);
        assert!(provider.singles.lock().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_single_token_fallback() {
        let provider = FakeBatches {
            poisoned: ["5".to_string()].into(),
            ..Default::default()
        };
        let options = BatchOptions {
            chunk_size: 4,
            single_token_fallback: true,
        };
        let records = fetch_tokens_batch_with(&provider, "0xwizards", &ids(0..10), options).await;
        // chunk [4..8) fails as a batch; token 7 also fails individually
        assert_eq!(records.len(), 9);
        assert_eq!(*provider.singles.lock(), vec!["4", "5", "6", "7"]);
    }
}
