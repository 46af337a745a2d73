//! soulburn CLI
//!
//! ## Commands
//!
//! - `refresh`: run one refresh cycle and print the snapshot as JSON
//! - `serve`: keep the snapshot fresh on an interval and serve it over HTTP (feature `service`)
//!
//! Both read `ALCHEMY_API_KEY` from the environment. `SOULBURN_BASE_URL` and
//! `SOULBURN_BASELINE` override the provider endpoint and the baseline CSV path.

use clap::{Parser, Subcommand};
#[cfg(feature = "service")]
mod server;
use soulburn::{
    config::Config,
    refresh::{RefreshOutcome, RefreshService},
};
use std::path::PathBuf;
#[cfg(feature = "service")]
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

#[derive(Parser)]
#[command(name = "soulburn")]
#[command(author, version, about = "Tracks burned wizards and the trait populations they leave behind", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one refresh cycle and print the resulting snapshot
    Refresh {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Baseline CSV path (overrides config and SOULBURN_BASELINE)
        #[arg(short, long)]
        baseline: Option<PathBuf>,

        /// Pretty-print the snapshot JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Refresh on an interval and serve the snapshot over HTTP
    #[cfg(feature = "service")]
    Serve {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Port to listen on
        #[arg(long, default_value = "3000")]
        port: u16,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Refresh {
            config,
            baseline,
            pretty,
        } => {
            let mut config = Config::load(config.as_deref())?;
            if let Some(baseline) = baseline {
                config.refresh.baseline_path = baseline;
            }
            let service = RefreshService::from_config(&config)?;

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            match runtime.block_on(service.refresh_now()) {
                RefreshOutcome::Published { .. } => {
                    let snapshot = service.snapshot();
                    let rendered = if pretty {
                        serde_json::to_string_pretty(snapshot.as_ref())?
                    } else {
                        serde_json::to_string(snapshot.as_ref())?
                    };
                    println!("{rendered}");
                    Ok(())
                }
                RefreshOutcome::Failed(e) => Err(e.into()),
                RefreshOutcome::Skipped => {
                    Err("refresh skipped: another cycle is in progress".into())
                }
            }
        }

        #[cfg(feature = "service")]
        Commands::Serve { config, port } => {
            let config = Config::load(config.as_deref())?;
            let service = Arc::new(RefreshService::from_config(&config)?);

            let running = Arc::new(AtomicBool::new(true));
            let r = running.clone();
            ctrlc::set_handler(move || {
                tracing::info!("Shutting down...");
                r.store(false, Ordering::SeqCst);
            })?;

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(async {
                let refresher = service.spawn(config.refresh.interval());
                let shutdown = async move {
                    while running.load(Ordering::SeqCst) {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                };
                let result = server::serve(service, port, shutdown).await;
                refresher.abort();
                result
            })
        }
    }
}
