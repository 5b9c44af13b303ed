//! Metrics Port - Recording Side of Observability
//!
//! The round cycle reports what it did through this trait. The
//! Prometheus registry in `adapters::metrics` implements it; rendering
//! and serving stay in the adapter.

use std::time::Duration;

use crate::domain::round::BetSide;

/// Sink for per-round counters and gauges.
pub trait CycleMetrics: Send + Sync + 'static {
  /// A round notification was processed.
  fn record_round(&self);

  /// A wager decision; `outcome` is `placed`, `failed` or `simulated`.
  fn record_bet(&self, side: BetSide, outcome: &str);

  /// Current pre-bet wait.
  fn set_wait(&self, wait: Duration);

  /// Epochs the claim scan had to skip.
  fn record_scan_failures(&self, count: usize);

  /// A claim attempt; `bnb` is the total recovered (0 on failure).
  fn record_claim(&self, outcome: &str, bnb: f64);

  /// BNB sent to the fee recipient.
  fn record_fee(&self, bnb: f64);
}
