//! Round Watcher - `StartRound` Event Feed
//!
//! Polls the prediction contract's `StartRound` logs and forwards each
//! new epoch to the round cycle over an `mpsc` channel. Replayed or
//! out-of-order logs are dropped so the forwarded sequence is strictly
//! increasing.
//!
//! Public RPC endpoints are load-balanced and forget log filters, which
//! ends the poll stream. The watcher then reinstalls the filter after a
//! short delay and keeps going until shutdown.

use std::future::Future;
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{Context, Result, bail};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, instrument, warn};

use crate::domain::round::Epoch;

use super::contracts::{PancakePredictionV2, PredictionInstance};
use super::provider::{BscProvider, SigningProvider};
use super::units::to_u64;

/// Delay before reinstalling a lost log filter.
const RESTART_DELAY: Duration = Duration::from_secs(5);

/// Epochs decoded from one filter installation.
type EpochStream = BoxStream<'static, Result<Epoch>>;

/// Admits only epochs newer than the last one admitted.
#[derive(Debug, Default, Clone, Copy)]
pub struct EpochGate {
    last: Option<Epoch>,
}

impl EpochGate {
    /// Record `epoch` and return whether it is new.
    pub fn admit(&mut self, epoch: Epoch) -> bool {
        match self.last {
            Some(last) if epoch <= last => false,
            _ => {
                self.last = Some(epoch);
                true
            }
        }
    }

    pub fn last(&self) -> Option<Epoch> {
        self.last
    }
}

/// How a feed session ended without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    ConsumerClosed,
}

/// Watches `StartRound` events on the prediction contract.
pub struct RoundWatcher {
    provider: SigningProvider,
    address: Address,
}

impl RoundWatcher {
    pub fn new(provider: &BscProvider, address: Address) -> Self {
        Self {
            provider: provider.inner(),
            address,
        }
    }

    /// Forward new epochs to `rounds` until shutdown or the consumer goes away.
    ///
    /// A failed or ended log stream is reopened after a delay.
    #[instrument(skip_all, fields(contract = %self.address))]
    pub async fn run(
        self,
        rounds: mpsc::Sender<Epoch>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()> {
        let watcher = &self;
        supervise(move || watcher.open(), RESTART_DELAY, rounds, shutdown_rx).await
    }

    /// Install a fresh `StartRound` filter.
    async fn open(&self) -> Result<EpochStream> {
        let contract: PredictionInstance =
            PancakePredictionV2::new(self.address, self.provider.clone());

        let current = contract
            .currentEpoch()
            .call()
            .await
            .context("currentEpoch() call failed")?
            ._0;
        info!(current_epoch = %current, "Waiting for the next StartRound event");

        let poller = contract
            .StartRound_filter()
            .watch()
            .await
            .context("Failed to install StartRound log filter")?;

        Ok(poller
            .into_stream()
            .map(|item| {
                let (event, _log) = item.context("Undecodable StartRound log")?;
                to_u64(event.epoch, "StartRound.epoch")
            })
            .boxed())
    }
}

/// Keep an epoch feed alive, reopening it after `delay` whenever opening
/// fails or the stream ends.
///
/// The gate lives across restarts, so epochs replayed by a new filter are
/// not forwarded twice.
async fn supervise<F, Fut>(
    mut open: F,
    delay: Duration,
    rounds: mpsc::Sender<Epoch>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<EpochStream>>,
{
    let mut gate = EpochGate::default();
    let mut restarts: u32 = 0;

    loop {
        let session = match open().await {
            Ok(stream) => forward(stream, &mut gate, &rounds, &mut shutdown_rx).await,
            Err(e) => Err(e),
        };

        match session {
            Ok(SessionEnd::Shutdown) => {
                info!("Shutdown signal received, stopping round watcher");
                return Ok(());
            }
            Ok(SessionEnd::ConsumerClosed) => {
                warn!("Round consumer closed, stopping round watcher");
                return Ok(());
            }
            Err(e) => {
                restarts = restarts.saturating_add(1);
                warn!(
                    error = %e,
                    restarts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    last_epoch = ?gate.last(),
                    "StartRound feed lost, reinstalling filter"
                );
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        info!("Shutdown signal received, stopping round watcher");
                        return Ok(());
                    }
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

/// Forward admitted epochs from one stream.
///
/// # Errors
/// Fails when the stream ends, so the caller can reopen it.
async fn forward(
    mut stream: EpochStream,
    gate: &mut EpochGate,
    rounds: &mpsc::Sender<Epoch>,
    shutdown_rx: &mut broadcast::Receiver<()>,
) -> Result<SessionEnd> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => return Ok(SessionEnd::Shutdown),
            item = stream.next() => {
                let epoch = match item {
                    Some(Ok(epoch)) => epoch,
                    Some(Err(e)) => {
                        warn!(error = %e, "Ignoring StartRound log");
                        continue;
                    }
                    None => bail!("StartRound log stream ended"),
                };

                if !gate.admit(epoch) {
                    debug!(epoch, last = ?gate.last(), "Dropping stale StartRound event");
                    continue;
                }

                info!(epoch, "New round started");
                if rounds.send(epoch).await.is_err() {
                    return Ok(SessionEnd::ConsumerClosed);
                }
            }
        }
    }
}
