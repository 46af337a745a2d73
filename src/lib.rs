//! # soulburn
//!
//! Tracks a burn mechanic between two NFT collections: every "wizard" that is burned produces
//! a "soul" token whose metadata records the burn order. soulburn ingests both collections
//! from a third-party metadata provider, reconciles which wizards were burned and when, and
//! aggregates how each wizard trait population has shrunk against a static baseline.
//!
//! ## Overview
//!
//! A refresh cycle produces one [`properties::Snapshot`]:
//!
//! - **traits**: one [`properties::TraitStat`] per `(trait, value)` in the baseline with the
//!   original count, the surviving count, the difference and the burned wizards carrying it
//! - **burned** / **flames**: burned-wizard count and the remaining flame supply
//! - **order**: burned wizard ids, most recently burned first
//! - **souls**: every soul record, keyed by id
//!
//! Snapshots are published atomically. Readers never observe a half-built snapshot, and a
//! failed cycle leaves the previous one in place.
//!
//! ### Key Features
//!
//! - **Tolerant ingestion**: provider records are normalized through ordered extractor
//!   strategies, so identifiers and attribute lists are found wherever the provider put them
//! - **Partial-failure recovery**: a failed page truncates enumeration, a failed batch chunk
//!   is skipped, and neither aborts the cycle
//! - **Single-flight refresh**: overlapping triggers are skipped, never queued
//! - **Secret hygiene**: the provider API key never appears in logs or error values
//!
//! ## Architecture
//!
//! - **[`provider`]**: the [`provider::MetadataProvider`] seam, the HTTP implementation, the
//!   paginated collection fetcher and the batched token fetcher
//! - **[`normalize`]**: raw provider records to [`normalize::NormalizedRecord`]
//! - **[`reconcile`]**: burn-order index, soul table and burned-wizard trait index
//! - **[`aggregate`]**: trait population statistics against the baseline
//! - **[`baseline`]**: the static baseline dataset (CSV)
//! - **[`pipeline`]**: one cycle end to end
//! - **[`refresh`]**: snapshot publication, single-flight guard and the periodic loop
//! - **[`config`]**: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use soulburn::{config::Config, refresh::RefreshService};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads ALCHEMY_API_KEY and friends from the environment
//!     let config = Config::load(None)?;
//!     let service = RefreshService::from_config(&config)?;
//!
//!     let outcome = service.refresh_now().await;
//!     println!("{outcome:?}");
//!
//!     let snapshot = service.snapshot();
//!     println!("{} wizards burned, {} flames left", snapshot.burned, snapshot.flames);
//!     Ok(())
//! }
//! ```
//!
//! ### Periodic refresh
//!
//! ```rust,no_run
//! # use soulburn::{config::Config, refresh::RefreshService};
//! # use std::sync::Arc;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(None)?;
//! let service = Arc::new(RefreshService::from_config(&config)?);
//!
//! // First cycle runs immediately, then every `refresh.interval_secs`
//! let handle = service.spawn(config.refresh.interval());
//! # handle.abort();
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **default**: the library
//! - **bin**: the `soulburn` CLI (`refresh` subcommand)
//! - **service**: adds the `serve` subcommand, an HTTP endpoint over the published snapshot

pub mod aggregate;
pub mod baseline;
pub mod config;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod properties;
pub mod provider;
pub mod reconcile;
pub mod refresh;

pub use error::*;
