//! Round Cycle Use Case - Per-Round Betting and Claiming
//!
//! Drives one cycle per `StartRound` notification:
//! 1. Wait the controller's current duration (cancellable only by shutdown)
//! 2. Read the round's pool totals
//! 3. Decide the side with the configured strategy
//! 4. Submit the wager; on failure shorten the wait for later rounds
//! 5. Scan recent rounds for unclaimed payouts
//! 6. Claim them in one transaction
//! 7. Send the configured fee on each claimed payout
//!
//! The betting half and the claiming half are independent: whatever
//! happens to the wager, the claim is still attempted.
//!
//! Cycles run strictly one after another on a single task. The wait
//! controller is owned here, so it has exactly one writer.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{Result, bail};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument, warn};

use crate::domain::backoff::WaitController;
use crate::domain::error::EngineError;
use crate::domain::fees::FeeCalculator;
use crate::domain::round::{BetSide, Epoch};
use crate::domain::strategy::{Strategy, is_bear_bet};
use crate::ports::metrics::CycleMetrics;
use crate::ports::prediction_market::{ClaimReceipt, PredictionMarket};
use crate::ports::repository::{JournalEntry, JournalEvent, Repository};

use super::claim_scanner::ClaimScanner;

/// Per-process settings for the cycle.
#[derive(Debug, Clone)]
pub struct CycleSettings {
  /// Address the bot bets and claims from.
  pub account: Address,
  /// Direction rule, fixed for the process lifetime.
  pub strategy: Strategy,
  /// Stake per round in BNB.
  pub bet_amount: Decimal,
  /// Whether to scan for and claim payouts.
  pub claims_enabled: bool,
  /// Where fees on claimed payouts go. `None` disables the transfer.
  pub fee_recipient: Option<Address>,
  /// Compute everything, send nothing.
  pub dry_run: bool,
}

/// What happened to the wager.
#[derive(Debug)]
pub enum BetOutcome {
  /// Wager mined.
  Placed {
    /// Side bet on.
    side: BetSide,
    /// Transaction hash.
    tx_hash: String,
  },
  /// Wager transaction failed; the wait was shortened.
  Failed {
    /// Side that was attempted.
    side: BetSide,
    /// `TransactionFailure` describing the error.
    error: EngineError,
    /// Wait applied from the next round on.
    new_wait: Duration,
  },
  /// Dry-run: decided but not sent.
  Simulated {
    /// Side that would have been bet.
    side: BetSide,
  },
  /// No decision could be made (pool read failed or bad amounts).
  Skipped {
    /// Why.
    reason: String,
  },
}

impl BetOutcome {
  /// Side decided on, if a decision was made.
  pub fn side(&self) -> Option<BetSide> {
    match self {
      Self::Placed { side, .. } | Self::Failed { side, .. } | Self::Simulated { side } => Some(*side),
      Self::Skipped { .. } => None,
    }
  }
}

/// What happened to the claim.
#[derive(Debug)]
pub enum ClaimOutcome {
  /// Claiming is turned off in config.
  Disabled,
  /// Scan found nothing.
  NothingToClaim,
  /// Dry-run: these epochs would have been claimed.
  Simulated {
    /// Epochs found claimable.
    epochs: Vec<Epoch>,
  },
  /// Claim mined.
  Claimed {
    /// Epochs claimed.
    epochs: Vec<Epoch>,
    /// Receipt with one payout per `Claim` event.
    receipt: ClaimReceipt,
  },
  /// Claim transaction failed.
  Failed {
    /// Epochs attempted.
    epochs: Vec<Epoch>,
    /// `TransactionFailure` describing the error.
    error: EngineError,
  },
}

impl ClaimOutcome {
  /// Epochs included in a mined claim.
  pub fn claimed_epochs(&self) -> &[Epoch] {
    match self {
      Self::Claimed { epochs, .. } => epochs.as_slice(),
      _ => &[],
    }
  }
}

/// Summary of one completed cycle.
#[derive(Debug)]
pub struct CycleReport {
  /// Round that triggered the cycle.
  pub epoch: Epoch,
  /// Wait applied before reading the pools.
  pub waited: Duration,
  /// Wager result.
  pub bet: BetOutcome,
  /// Claim result.
  pub claim: ClaimOutcome,
  /// Epochs skipped by the scan because their reads failed.
  pub scan_failures: Vec<EngineError>,
  /// Total fee sent to the recipient.
  pub fees_sent: Decimal,
  /// Fee transfers that failed.
  pub fee_failures: usize,
}

/// Round-by-round betting and claiming orchestrator.
pub struct RoundCycle<M: PredictionMarket, R: Repository> {
  market: Arc<M>,
  journal: Arc<R>,
  scanner: ClaimScanner<M>,
  wait: WaitController,
  fees: FeeCalculator,
  settings: CycleSettings,
  metrics: Option<Arc<dyn CycleMetrics>>,
}

impl<M: PredictionMarket, R: Repository> RoundCycle<M, R> {
  /// Create a cycle runner.
  pub fn new(
    market: Arc<M>,
    journal: Arc<R>,
    lookback: u64,
    wait: WaitController,
    fees: FeeCalculator,
    settings: CycleSettings,
  ) -> Self {
    let scanner = ClaimScanner::new(Arc::clone(&market), lookback);
    Self {
      market,
      journal,
      scanner,
      wait,
      fees,
      settings,
      metrics: None,
    }
  }

  /// Attach a metrics sink.
  pub fn with_metrics(mut self, metrics: Arc<dyn CycleMetrics>) -> Self {
    metrics.set_wait(self.wait.current_wait());
    self.metrics = Some(metrics);
    self
  }

  /// Wait controller state, for inspection.
  pub fn wait_controller(&self) -> &WaitController {
    &self.wait
  }

  /// Process round notifications until shutdown.
  ///
  /// A round that arrives while a cycle is in progress is queued, not
  /// raced: the in-flight wait is never cut short by a newer round.
  ///
  /// # Errors
  /// Fails if the round feed closes before shutdown, since no further
  /// rounds can be bet on.
  #[instrument(skip_all, name = "round_loop")]
  pub async fn run(
    &mut self,
    mut rounds: mpsc::Receiver<Epoch>,
    mut shutdown_rx: broadcast::Receiver<()>,
  ) -> Result<()> {
    info!(
      strategy = %self.settings.strategy,
      bet_amount = %self.settings.bet_amount,
      wait_ms = millis(self.wait.current_wait()),
      floor_ms = millis(self.wait.floor()),
      lookback = self.scanner.lookback(),
      dry_run = self.settings.dry_run,
      "Waiting for new rounds"
    );

    loop {
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
          info!("Shutdown signal received, stopping round loop");
          break;
        }
        next = rounds.recv() => {
          let Some(epoch) = next else {
            error!("Round feed closed, stopping round loop");
            bail!("round feed closed before shutdown");
          };
          match self.run_cycle(epoch, &mut shutdown_rx).await {
            Some(report) => info!(
              epoch,
              side = ?report.bet.side(),
              claimed = report.claim.claimed_epochs().len(),
              scan_failures = report.scan_failures.len(),
              fees_sent = %report.fees_sent,
              "Cycle complete"
            ),
            None => break,
          }
        }
      }
    }

    info!("Round loop stopped cleanly");
    Ok(())
  }

  /// Run one full cycle for `epoch`.
  ///
  /// Returns `None` only when shutdown arrives during the wait.
  #[instrument(skip(self, shutdown_rx), fields(strategy = %self.settings.strategy))]
  pub async fn run_cycle(
    &mut self,
    epoch: Epoch,
    shutdown_rx: &mut broadcast::Receiver<()>,
  ) -> Option<CycleReport> {
    if let Some(m) = &self.metrics {
      m.record_round();
    }

    let waited = self.wait.current_wait();
    info!(epoch, wait_ms = millis(waited), "Round started, waiting before betting");

    tokio::select! {
      biased;
      _ = shutdown_rx.recv() => {
        info!(epoch, "Shutdown during pre-bet wait");
        return None;
      }
      () = tokio::time::sleep(waited) => {}
    }

    let bet = self.place_bet(epoch, waited).await;

    let scan = if self.settings.claims_enabled {
      Some(self.scanner.get_claimable_epochs(epoch, self.settings.account).await)
    } else {
      None
    };

    let (claim, scan_failures) = match scan {
      None => (ClaimOutcome::Disabled, Vec::new()),
      Some(scan) => {
        if let Some(m) = &self.metrics {
          m.record_scan_failures(scan.failures.len());
        }
        (self.claim(scan.epochs).await, scan.failures)
      }
    };

    let (fees_sent, fee_failures) = match &claim {
      ClaimOutcome::Claimed { receipt, .. } => self.send_fees(receipt).await,
      _ => (Decimal::ZERO, 0),
    };

    Some(CycleReport {
      epoch,
      waited,
      bet,
      claim,
      scan_failures,
      fees_sent,
      fee_failures,
    })
  }

  /// Read pools, decide, and submit the wager.
  async fn place_bet(&mut self, epoch: Epoch, waited: Duration) -> BetOutcome {
    let pools = match self.market.round(epoch).await {
      Ok(round) => round.pools,
      Err(e) => {
        warn!(epoch, error = %e, "Failed to read round pools, not betting");
        return BetOutcome::Skipped { reason: format!("{e:#}") };
      }
    };

    info!(epoch, bull = %pools.bull, bear = %pools.bear, "Pool amounts");

    let side = match is_bear_bet(pools.bull, pools.bear, self.settings.strategy) {
      Ok(bear) => BetSide::from_bear_flag(bear),
      Err(e) => {
        error!(epoch, error = %e, "Rejected pool amounts, not betting");
        return BetOutcome::Skipped { reason: e.to_string() };
      }
    };

    info!(epoch, %side, amount = %self.settings.bet_amount, "Betting");

    if self.settings.dry_run {
      info!(epoch, %side, "Dry-run: wager not sent");
      self.record_bet(side, "simulated");
      return BetOutcome::Simulated { side };
    }

    let event = JournalEvent::Bet {
      epoch,
      side,
      amount: self.settings.bet_amount,
      pools,
      strategy: self.settings.strategy.to_string(),
      wait_ms: millis(waited),
    };

    match self.market.submit_wager(epoch, side, self.settings.bet_amount).await {
      Ok(tx) => {
        info!(epoch, %side, tx_hash = %tx.tx_hash, "Bet transaction succeeded");
        self.record_bet(side, "placed");
        self
          .journal(JournalEntry::succeeded(event, Some(tx.tx_hash.clone())))
          .await;
        BetOutcome::Placed { side, tx_hash: tx.tx_hash }
      }
      Err(e) => {
        let error = EngineError::transaction("bet", &e);
        let new_wait = self.wait.on_bet_failure();
        warn!(
          epoch,
          %side,
          error = %error,
          new_wait_ms = millis(new_wait),
          at_floor = self.wait.at_floor(),
          "Bet transaction failed, shortening wait"
        );
        self.record_bet(side, "failed");
        if let Some(m) = &self.metrics {
          m.set_wait(new_wait);
        }
        self.journal(JournalEntry::failed(event, error.to_string())).await;
        BetOutcome::Failed { side, error, new_wait }
      }
    }
  }

  /// Submit a single claim for all claimable epochs.
  async fn claim(&self, epochs: Vec<Epoch>) -> ClaimOutcome {
    if epochs.is_empty() {
      debug!("Nothing to claim");
      return ClaimOutcome::NothingToClaim;
    }

    if self.settings.dry_run {
      info!(?epochs, "Dry-run: claim not sent");
      return ClaimOutcome::Simulated { epochs };
    }

    info!(?epochs, "Claiming");

    match self.market.submit_claim(&epochs).await {
      Ok(receipt) => {
        let total = receipt.total();
        info!(
          ?epochs,
          tx_hash = %receipt.tx_hash,
          payouts = receipt.payouts.len(),
          total = %total,
          "Claim transaction succeeded"
        );
        if let Some(m) = &self.metrics {
          m.record_claim("claimed", total.to_f64().unwrap_or(0.0));
        }
        self
          .journal(JournalEntry::succeeded(
            JournalEvent::Claim { epochs: epochs.clone(), total },
            Some(receipt.tx_hash.clone()),
          ))
          .await;
        ClaimOutcome::Claimed { epochs, receipt }
      }
      Err(e) => {
        let error = EngineError::transaction("claim", &e);
        warn!(?epochs, error = %error, "Claim transaction failed");
        if let Some(m) = &self.metrics {
          m.record_claim("failed", 0.0);
        }
        self
          .journal(JournalEntry::failed(
            JournalEvent::Claim { epochs: epochs.clone(), total: Decimal::ZERO },
            error.to_string(),
          ))
          .await;
        ClaimOutcome::Failed { epochs, error }
      }
    }
  }

  /// Transfer the fee for each claimed payout to the configured recipient.
  ///
  /// Returns (total sent, failed transfers).
  async fn send_fees(&self, receipt: &ClaimReceipt) -> (Decimal, usize) {
    let Some(recipient) = self.settings.fee_recipient else {
      return (Decimal::ZERO, 0);
    };
    if !self.fees.is_enabled() {
      return (Decimal::ZERO, 0);
    }

    let mut sent = Decimal::ZERO;
    let mut failures = 0;

    for payout in &receipt.payouts {
      let fee = match self.fees.calculate_tax_amount(payout.amount) {
        Ok(fee) if fee.is_zero() => continue,
        Ok(fee) => fee,
        Err(e) => {
          warn!(epoch = payout.epoch, error = %e, "Cannot compute fee for payout");
          failures += 1;
          continue;
        }
      };

      let event = JournalEvent::FeeTransfer {
        epoch: payout.epoch,
        recipient: recipient.to_checksum(None),
        payout: payout.amount,
        fee,
      };

      match self.market.transfer_value(recipient, fee).await {
        Ok(tx) => {
          info!(
            epoch = payout.epoch,
            %recipient,
            %fee,
            tx_hash = %tx.tx_hash,
            "Fee transferred"
          );
          sent += fee;
          if let Some(m) = &self.metrics {
            m.record_fee(fee.to_f64().unwrap_or(0.0));
          }
          self.journal(JournalEntry::succeeded(event, Some(tx.tx_hash))).await;
        }
        Err(e) => {
          let error = EngineError::transaction("fee transfer", &e);
          warn!(epoch = payout.epoch, %recipient, error = %error, "Fee transfer failed");
          failures += 1;
          self.journal(JournalEntry::failed(event, error.to_string())).await;
        }
      }
    }

    (sent, failures)
  }

  fn record_bet(&self, side: BetSide, outcome: &str) {
    if let Some(m) = &self.metrics {
      m.record_bet(side, outcome);
    }
  }

  /// Append to the journal; failures are logged, never propagated.
  async fn journal(&self, entry: JournalEntry) {
    if let Err(e) = self.journal.append(&entry).await {
      warn!(error = %e, entry_id = %entry.id, "Failed to write journal entry");
    }
  }
}

fn millis(d: Duration) -> u64 {
  u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
