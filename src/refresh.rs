//! # Refresh orchestration
//!
//! [`RefreshService`] owns the published [`Snapshot`] and runs refresh cycles against it.
//!
//! - Readers call [`RefreshService::snapshot`] and always get a complete snapshot, either the
//!   one from the last successful cycle or, before any cycle succeeded, an empty one.
//! - A cycle that fails leaves the published snapshot untouched and is recorded in
//!   [`RefreshStatus`].
//! - At most one cycle runs at a time. A trigger that arrives while a cycle is in flight
//!   returns [`RefreshOutcome::Skipped`] without doing any work.
//!
//! [`RefreshService::spawn`] drives cycles on a fixed interval, starting immediately.

use arc_swap::ArcSwap;
use parking_lot::RwLock;
use serde::Serialize;
use std::{
    sync::Arc,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use tokio::{
    sync::Mutex,
    task::{self, JoinHandle},
    time::MissedTickBehavior,
};

use crate::{
    baseline::{BaselineSource, CsvBaseline},
    config::Config,
    error::SoulburnError,
    pipeline::Pipeline,
    properties::Snapshot,
};

/// Result of one trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Published { burned: u64 },
    Skipped,
    Failed(SoulburnError),
}

/// Counters and timestamps describing the refresh history of this process.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshStatus {
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    pub last_success_unix_secs: Option<u64>,
    pub last_error: Option<String>,
    #[serde(skip)]
    pub last_success_at: Option<Instant>,
}

pub struct RefreshService {
    pipeline: Arc<Pipeline>,
    baseline: Arc<dyn BaselineSource>,
    published: ArcSwap<Snapshot>,
    in_flight: Mutex<()>,
    status: RwLock<RefreshStatus>,
}

impl RefreshService {
    pub fn new(pipeline: Pipeline, baseline: Arc<dyn BaselineSource>) -> Self {
        let empty = Snapshot::empty(pipeline.flames_total());
        RefreshService {
            pipeline: Arc::new(pipeline),
            baseline,
            published: ArcSwap::from_pointee(empty),
            in_flight: Mutex::new(()),
            status: RwLock::new(RefreshStatus::default()),
        }
    }

    /// Service wired to the HTTP provider and the CSV baseline named in `config`.
    pub fn from_config(config: &Config) -> Result<Self, SoulburnError> {
        let pipeline = Pipeline::from_config(config)?;
        let baseline = CsvBaseline::new(config.refresh.baseline_path.clone());
        Ok(RefreshService::new(pipeline, Arc::new(baseline)))
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.published.load_full()
    }

    pub fn status(&self) -> RefreshStatus {
        self.status.read().clone()
    }

    /// True when no cycle has succeeded within `max_age`.
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.status
            .read()
            .last_success_at
            .is_none_or(|at| at.elapsed() > max_age)
    }

    /// Runs one cycle now unless another is already in flight.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::info!("Refresh already in progress, skipping trigger");
            self.status.write().skipped += 1;
            return RefreshOutcome::Skipped;
        };
        self.status.write().started += 1;

        let started = Instant::now();
        match self.run_cycle().await {
            Ok(snapshot) => {
                let burned = snapshot.burned;
                self.published.store(Arc::new(snapshot));
                tracing::info!(
                    "Published snapshot with {burned} burned wizards in {:?}",
                    started.elapsed()
                );
                let mut status = self.status.write();
                status.succeeded += 1;
                status.last_error = None;
                status.last_success_at = Some(Instant::now());
                status.last_success_unix_secs = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .ok()
                    .map(|d| d.as_secs());
                RefreshOutcome::Published { burned }
            }
            Err(e) => {
                tracing::error!("Refresh failed, keeping previous snapshot: {e}");
                let mut status = self.status.write();
                status.failed += 1;
                status.last_error = Some(e.to_string());
                RefreshOutcome::Failed(e)
            }
        }
    }

    async fn run_cycle(&self) -> Result<Snapshot, SoulburnError> {
        let source = Arc::clone(&self.baseline);
        let baseline = task::spawn_blocking(move || source.load()).await??;

        // A panic inside the pipeline surfaces as a JoinError instead of unwinding the caller
        let pipeline = Arc::clone(&self.pipeline);
        task::spawn(async move { pipeline.run(&baseline).await }).await?
    }

    /// Refreshes every `period`, the first time immediately. Missed ticks are skipped rather
    /// than bunched up behind a slow cycle.
    pub fn spawn(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                service.refresh_now().await;
            }
        })
    }
}
