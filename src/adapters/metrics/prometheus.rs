//! Prometheus Metrics Registry - Betting Observability
//!
//! Registers the bot's counters and gauges and renders them in the
//! Prometheus text format for the `/metrics` route on the health server.

use std::time::Duration;

use prometheus::{Counter, Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::domain::round::BetSide;
use crate::ports::metrics::CycleMetrics;

/// Centralized Prometheus metrics for the prediction bot.
///
/// All metrics follow the naming convention `prediction_bot_*`.
pub struct BotMetrics {
    /// Prometheus registry.
    registry: Registry,
    /// Rounds processed.
    pub rounds: IntCounter,
    /// Wagers by side and outcome (placed, failed, simulated).
    pub bets: IntCounterVec,
    /// Current pre-bet wait in milliseconds.
    pub wait_ms: IntGauge,
    /// Epochs skipped by the claim scan because a read failed.
    pub claim_scan_errors: IntCounter,
    /// Claim transactions by outcome (claimed, failed).
    pub claims: IntCounterVec,
    /// BNB recovered through claims.
    pub claimed_bnb: Counter,
    /// BNB sent to the fee recipient.
    pub fees_bnb: Counter,
}

impl BotMetrics {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let rounds = IntCounter::new("prediction_bot_rounds_total", "Rounds processed")?;

        let bets = IntCounterVec::new(
            Opts::new("prediction_bot_bets_total", "Wagers by side and outcome"),
            &["side", "outcome"],
        )?;

        let wait_ms = IntGauge::new(
            "prediction_bot_wait_ms",
            "Current wait between round start and betting, in milliseconds",
        )?;

        let claim_scan_errors = IntCounter::new(
            "prediction_bot_claim_scan_errors_total",
            "Epochs skipped during claim scans due to failed reads",
        )?;

        let claims = IntCounterVec::new(
            Opts::new("prediction_bot_claims_total", "Claim transactions by outcome"),
            &["outcome"],
        )?;

        let claimed_bnb = Counter::new("prediction_bot_claimed_bnb_total", "BNB recovered through claims")?;

        let fees_bnb = Counter::new("prediction_bot_fees_bnb_total", "BNB sent to the fee recipient")?;

        registry.register(Box::new(rounds.clone()))?;
        registry.register(Box::new(bets.clone()))?;
        registry.register(Box::new(wait_ms.clone()))?;
        registry.register(Box::new(claim_scan_errors.clone()))?;
        registry.register(Box::new(claims.clone()))?;
        registry.register(Box::new(claimed_bnb.clone()))?;
        registry.register(Box::new(fees_bnb.clone()))?;

        Ok(Self {
            registry,
            rounds,
            bets,
            wait_ms,
            claim_scan_errors,
            claims,
            claimed_bnb,
            fees_bnb,
        })
    }

    /// Encode every registered metric in the text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl CycleMetrics for BotMetrics {
    fn record_round(&self) {
        self.rounds.inc();
    }

    fn record_bet(&self, side: BetSide, outcome: &str) {
        self.bets.with_label_values(&[side.as_str(), outcome]).inc();
    }

    fn set_wait(&self, wait: Duration) {
        self.wait_ms
            .set(i64::try_from(wait.as_millis()).unwrap_or(i64::MAX));
    }

    fn record_scan_failures(&self, count: usize) {
        self.claim_scan_errors.inc_by(count as u64);
    }

    fn record_claim(&self, outcome: &str, bnb: f64) {
        self.claims.with_label_values(&[outcome]).inc();
        if bnb > 0.0 {
            self.claimed_bnb.inc_by(bnb);
        }
    }

    fn record_fee(&self, bnb: f64) {
        if bnb > 0.0 {
            self.fees_bnb.inc_by(bnb);
        }
    }
}
