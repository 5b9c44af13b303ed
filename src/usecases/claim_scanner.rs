//! Claim Scanner Use Case - Find Rounds With Unclaimed Payouts
//!
//! Rounds settle well after they start, so every cycle re-examines a
//! fixed window of recent rounds and narrows each candidate through four
//! predicates, stopping at the first that fails:
//!
//! 1. closed: at least two newer rounds have started (no I/O)
//! 2. exists: the round has a start timestamp
//! 3. resolved: settled by the oracle, or past its refund deadline
//! 4. unclaimed: the account has a stake it has not claimed yet
//!
//! A failed read for one epoch is logged and skipped; the rest of the
//! window is still scanned.

use std::ops::Range;
use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::domain::error::EngineError;
use crate::domain::round::{Epoch, is_closed_at};
use crate::ports::prediction_market::PredictionMarket;

/// Why a candidate epoch was or was not selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
  /// Round has not ended yet.
  NotClosed,
  /// Round was never started.
  Missing,
  /// Round ended but is not settled.
  Unresolved,
  /// Nothing owed to the account.
  NothingOwed,
  /// Ready to claim.
  Claimable,
}

/// Result of one scan.
#[derive(Debug, Default)]
pub struct ClaimScan {
  /// Claimable epochs, ascending, no duplicates.
  pub epochs: Vec<Epoch>,
  /// Epochs that could not be read, as `CollaboratorRead` errors.
  pub failures: Vec<EngineError>,
}

impl ClaimScan {
  /// Whether there is anything to claim.
  pub fn is_empty(&self) -> bool {
    self.epochs.is_empty()
  }
}

/// Scans a bounded window of past rounds for claimable payouts.
pub struct ClaimScanner<M: PredictionMarket> {
  market: Arc<M>,
  /// Number of previous rounds examined per scan.
  lookback: u64,
}

impl<M: PredictionMarket> ClaimScanner<M> {
  /// Create a scanner over the previous `lookback` rounds.
  pub fn new(market: Arc<M>, lookback: u64) -> Self {
    Self { market, lookback }
  }

  /// Window size.
  pub fn lookback(&self) -> u64 {
    self.lookback
  }

  /// Epochs examined when `current` has just started.
  ///
  /// Starts at epoch 1 at the earliest and always ends before `current`.
  /// Empty when `current <= 1` or the lookback is zero.
  pub fn window(&self, current: Epoch) -> Range<Epoch> {
    if current <= 1 || self.lookback == 0 {
      return 1..1;
    }
    let start = current.saturating_sub(self.lookback).max(1);
    start..current
  }

  /// Collect claimable epochs for `account` given the round that just started.
  #[instrument(skip(self), fields(lookback = self.lookback))]
  pub async fn get_claimable_epochs(&self, current: Epoch, account: Address) -> ClaimScan {
    let mut scan = ClaimScan::default();

    for epoch in self.window(current) {
      match self.check_epoch(epoch, current, account).await {
        Ok(Eligibility::Claimable) => {
          debug!(epoch, "Round claimable");
          scan.epochs.push(epoch);
        }
        Ok(reason) => {
          debug!(epoch, ?reason, "Round not claimable");
        }
        Err(e) => {
          warn!(epoch, error = %e, "Skipping round, state read failed");
          scan.failures.push(EngineError::read(epoch, &e));
        }
      }
    }

    if !scan.epochs.is_empty() || !scan.failures.is_empty() {
      info!(
        current,
        claimable = ?scan.epochs,
        failed = scan.failures.len(),
        "Claim scan complete"
      );
    }

    scan
  }

  /// Run the four predicates for one epoch, short-circuiting.
  async fn check_epoch(
    &self,
    epoch: Epoch,
    current: Epoch,
    account: Address,
  ) -> Result<Eligibility> {
    if !is_closed_at(epoch, current) {
      return Ok(Eligibility::NotClosed);
    }

    let round = self.market.round(epoch).await?;
    if !round.exists() {
      return Ok(Eligibility::Missing);
    }

    if !self.market.is_round_resolved(&round).await? {
      return Ok(Eligibility::Unresolved);
    }

    if !self.market.has_unclaimed_position(epoch, account).await? {
      return Ok(Eligibility::NothingOwed);
    }

    Ok(Eligibility::Claimable)
  }
}
