//! # Ingestion pipeline
//!
//! One refresh cycle, end to end:
//!
//! 1. enumerate the soul collection ([`collect_collection`])
//! 2. normalize and reconcile souls into the burn-order index and soul table
//! 3. look up exactly the burned wizards ([`fetch_tokens_batch_with`])
//! 4. normalize them into the wizard trait index
//! 5. aggregate the baseline against the burned set
//!
//! The pipeline holds no state between runs; every [`Pipeline::run`] rebuilds the
//! [`Snapshot`] from nothing.

use std::{collections::BTreeSet, sync::Arc};

use crate::{
    aggregate::aggregate,
    config::{Config, ContractsConfig},
    error::SoulburnError,
    normalize::normalize_all,
    properties::{BaselineRow, Snapshot, TokenId, TraitStat},
    provider::{
        batch::fetch_tokens_batch_with, collect_collection, AlchemyProvider, BatchOptions,
        MetadataProvider,
    },
    reconcile::{index_wizard_traits, reconcile, Reconciliation},
};

#[derive(Debug, Clone)]
pub struct Pipeline {
    provider: Arc<dyn MetadataProvider>,
    contracts: ContractsConfig,
    batch: BatchOptions,
    flames_total: i64,
}

impl Pipeline {
    pub fn new(provider: Arc<dyn MetadataProvider>, config: &Config) -> Self {
        Pipeline {
            provider,
            contracts: config.contracts.clone(),
            batch: BatchOptions {
                single_token_fallback: config.provider.single_token_fallback,
                ..Default::default()
            },
            flames_total: config.stats.flames_total,
        }
    }

    /// Pipeline backed by the HTTP provider described in `config`.
    pub fn from_config(config: &Config) -> Result<Self, SoulburnError> {
        let provider = AlchemyProvider::new(&config.provider)?;
        Ok(Pipeline::new(Arc::new(provider), config))
    }

    pub fn flames_total(&self) -> i64 {
        self.flames_total
    }

    /// Runs one cycle against `baseline`.
    ///
    /// Fetch failures are absorbed by the fetchers. The only error is a failed first soul
    /// page, which would otherwise publish an empty burn state over a good one. An empty
    /// collection publishes the baseline with nothing burned.
    pub async fn run(&self, baseline: &[BaselineRow]) -> Result<Snapshot, SoulburnError> {
        let provider = self.provider.as_ref();

        tracing::info!("Fetching souls from contract: {}", self.contracts.souls);
        let enumeration = collect_collection(provider, &self.contracts.souls).await;
        if let Some(error) = enumeration.first_page_error() {
            return Err(error.clone());
        }
        let raw_souls = enumeration.records;
        tracing::info!("Total fetched {} souls from collection", raw_souls.len());

        let souls = normalize_all(&raw_souls);
        let reconciliation = reconcile(&souls);
        let burned = reconciliation.burned_set();

        let burned_ids = reconciliation.burned_ids();
        tracing::info!(
            "Fetching {} burned wizard tokens from contract: {}",
            burned_ids.len(),
            self.contracts.wizards
        );
        let raw_wizards =
            fetch_tokens_batch_with(provider, &self.contracts.wizards, &burned_ids, self.batch)
                .await;
        let wizards: Vec<_> = normalize_all(&raw_wizards)
            .into_iter()
            .filter(|wizard| {
                let requested = burned.contains(&wizard.id);
                if !requested {
                    tracing::debug!("Ignoring unrequested wizard {} in batch response", wizard.id);
                }
                requested
            })
            .collect();
        tracing::info!("Found {} burned wizards", wizards.len());

        let wizard_traits = index_wizard_traits(&wizards);
        let traits = aggregate(baseline, &burned, &wizard_traits);
        Ok(build_snapshot(reconciliation, traits, self.flames_total))
    }
}

/// Assembles the published snapshot. `burned` and `order` both come from the burn-order
/// index, so they always agree.
pub fn build_snapshot(
    reconciliation: Reconciliation,
    traits: Vec<TraitStat>,
    flames_total: i64,
) -> Snapshot {
    let order: Vec<TokenId> = reconciliation.order();
    let burned = order.len() as u64;
    debug_assert_eq!(
        order.iter().collect::<BTreeSet<_>>(),
        reconciliation.burn_order.keys().collect::<BTreeSet<_>>()
    );
    Snapshot {
        traits,
        burned,
        flames: flames_total - burned as i64,
        order,
        souls: reconciliation.souls,
    }
}
