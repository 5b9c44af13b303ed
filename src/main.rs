//! PancakeSwap Prediction Bot - Entry Point
//!
//! Initializes configuration, logging and the chain connection, then
//! runs one betting/claiming cycle per round until SIGINT.
//!
//! Wiring sequence:
//! 1. Parse CLI, load `.env` and config.toml, validate
//! 2. Init tracing (JSON structured logging)
//! 3. Load the signing key from `PRIVATE_KEY`
//! 4. Connect the BSC provider and bind the prediction contract
//! 5. Open the JSONL journal
//! 6. Spawn health/metrics server and chain health monitor
//! 7. Spawn the `StartRound` watcher
//! 8. Spawn the round cycle
//! 9. Wait for SIGINT or an unexpected task exit, then shut down

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use clap::error::ErrorKind;
use tokio::signal;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use pancake_prediction_bot::adapters::chain::provider::{PRIVATE_KEY_ENV, parse_signer};
use pancake_prediction_bot::adapters::chain::{BscProvider, PredictionContract, RoundWatcher};
use pancake_prediction_bot::adapters::metrics::{BotMetrics, HealthServer, HealthState};
use pancake_prediction_bot::adapters::persistence::JsonlJournal;
use pancake_prediction_bot::config::cli::Cli;
use pancake_prediction_bot::config::loader::load_config;
use pancake_prediction_bot::domain::error::EngineError;
use pancake_prediction_bot::ports::metrics::CycleMetrics;
use pancake_prediction_bot::ports::repository::Repository;
use pancake_prediction_bot::usecases::{CycleSettings, RoundCycle};

/// Interval between chain connectivity checks.
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. CLI, environment and configuration ───────────────
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => return Err(EngineError::Configuration(e.to_string()).into()),
    };

    dotenvy::dotenv().ok();

    let mut config = load_config(&cli.config).context("Failed to load configuration")?;
    config.bot.dry_run |= cli.dry_run;
    let strategy = cli.selected_strategy();

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.bot.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.bot.name,
        version = env!("CARGO_PKG_VERSION"),
        %strategy,
        dry_run = config.bot.dry_run,
        "Starting PancakeSwap prediction bot"
    );
    config.log_summary();

    // ── 3. Signing key ──────────────────────────────────────
    let private_key = std::env::var(PRIVATE_KEY_ENV)
        .with_context(|| format!("{PRIVATE_KEY_ENV} is not set"))?;
    let signer = parse_signer(&private_key)?;
    drop(private_key);

    // ── 4. Chain connection ─────────────────────────────────
    let provider = Arc::new(
        BscProvider::connect(&config.chain, signer)
            .await
            .context("Failed to connect to BSC")?,
    );
    let contract_address = config.prediction_contract()?;
    let market = Arc::new(
        PredictionContract::connect(&provider, contract_address, config.chain.rpc_requests_per_second)
            .await
            .context("Failed to bind prediction contract")?,
    );

    // ── 5. Journal ──────────────────────────────────────────
    let journal = Arc::new(
        JsonlJournal::new(&config.persistence.data_dir)
            .await
            .context("Failed to open journal")?,
    );
    match journal.load_all().await {
        Ok(entries) => info!(entries = entries.len(), "Journal opened"),
        Err(e) => warn!(error = %e, "Failed to read existing journal"),
    }

    // ── 6. Shutdown channel, metrics and health ─────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let metrics = Arc::new(BotMetrics::new().context("Failed to register metrics")?);
    let health = Arc::new(HealthState::new());

    let health_handle = if config.metrics.enabled {
        let server = HealthServer::new(Arc::clone(&health), Arc::clone(&metrics), config.metrics.health_port);
        let rx = shutdown_tx.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = server.run(rx).await {
                error!(error = %e, "Health server failed");
            }
        }))
    } else {
        None
    };

    let monitor_handle = {
        let provider = Arc::clone(&provider);
        let journal = Arc::clone(&journal);
        let health = Arc::clone(&health);
        let mut rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(HEALTH_CHECK_INTERVAL);
            loop {
                tokio::select! {
                    _ = rx.recv() => break,
                    _ = interval.tick() => {
                        let chain_ok = provider.is_healthy().await;
                        if !chain_ok {
                            warn!("RPC health check failed");
                        }
                        if !journal.is_healthy().await {
                            warn!("Journal directory is not writable");
                        }
                        health.set_chain_healthy(chain_ok);
                    }
                }
            }
        })
    };

    // ── 7. Round watcher ────────────────────────────────────
    let (round_tx, round_rx) = mpsc::channel(16);
    let watcher = RoundWatcher::new(&provider, contract_address);
    let watcher_shutdown = shutdown_tx.subscribe();
    let mut watcher_handle = tokio::spawn(async move {
        if let Err(e) = watcher.run(round_tx, watcher_shutdown).await {
            error!(error = %e, "Round watcher failed");
        }
    });

    // ── 8. Round cycle ──────────────────────────────────────
    let settings = CycleSettings {
        account: provider.account(),
        strategy,
        bet_amount: config.betting.bet_amount,
        claims_enabled: config.claims.enabled,
        fee_recipient: config.fee_recipient()?,
        dry_run: config.bot.dry_run,
    };
    let mut cycle = RoundCycle::new(
        Arc::clone(&market),
        Arc::clone(&journal),
        config.claims.lookback_epochs,
        config.wait_controller()?,
        config.fee_calculator()?,
        settings,
    )
    .with_metrics(Arc::clone(&metrics) as Arc<dyn CycleMetrics>);

    if let Some(recipient) = config.fee_recipient()? {
        info!(%recipient, rate = %config.fee.rate, "Fee transfers enabled");
    }
    if config.bot.dry_run {
        warn!("Dry-run mode: decisions are logged but NO transactions are sent");
    }

    let cycle_shutdown = shutdown_tx.subscribe();
    let mut cycle_handle = tokio::spawn(async move {
        if let Err(e) = cycle.run(round_rx, cycle_shutdown).await {
            error!(error = %e, "Round cycle failed");
        }
    });

    info!("All tasks spawned, bot is running");

    // ── 9. Wait for SIGINT or a core task exiting ───────────
    // Either task ending on its own means rounds are no longer followed.
    let stopped = tokio::select! {
        res = signal::ctrl_c() => {
            res.context("Failed to listen for SIGINT")?;
            info!("SIGINT received, initiating graceful shutdown");
            None
        }
        _ = &mut cycle_handle => Some("round cycle"),
        _ = &mut watcher_handle => Some("round watcher"),
    };

    health.mark_stopping();
    let _ = shutdown_tx.send(());

    if let Some(task) = stopped {
        error!(task, "Core task exited unexpectedly, shutting down");
    }

    // A cycle may be mid-transaction; give it time to see the receipt.
    if stopped != Some("round cycle")
        && tokio::time::timeout(Duration::from_secs(60), cycle_handle).await.is_err()
    {
        warn!("Round cycle did not stop within 60s");
    }
    if stopped != Some("round watcher") {
        let _ = tokio::time::timeout(Duration::from_secs(5), watcher_handle).await;
    }
    let _ = tokio::time::timeout(Duration::from_secs(5), monitor_handle).await;
    if let Some(handle) = health_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    if let Some(task) = stopped {
        bail!("{task} stopped before shutdown was requested");
    }

    info!("Shutdown complete");
    Ok(())
}
