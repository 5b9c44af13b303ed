//! Prediction Market Port - On-chain Round Interface
//!
//! Defines the trait the round cycle uses to read round state and submit
//! wagers, claims and value transfers. The concrete implementation binds
//! the PancakeSwap Prediction V2 contract on BNB Smart Chain via alloy-rs.

use alloy::primitives::Address;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::round::{BetSide, Epoch, Round};

/// Outcome of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
  /// Transaction hash.
  pub tx_hash: String,
  /// Gas used by the transaction.
  pub gas_used: u64,
}

/// One `Claim` event emitted by a claim transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimPayout {
  /// Round the payout belongs to.
  pub epoch: Epoch,
  /// Amount paid out, in BNB.
  pub amount: Decimal,
}

/// Receipt of a confirmed claim transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimReceipt {
  /// Transaction hash.
  pub tx_hash: String,
  /// One entry per `Claim` event in the receipt.
  pub payouts: Vec<ClaimPayout>,
}

impl ClaimReceipt {
  /// Sum of all payouts in the receipt.
  pub fn total(&self) -> Decimal {
    self.payouts.iter().map(|p| p.amount).sum()
  }
}

/// Trait for prediction market access.
///
/// Read methods are plain view calls; write methods wait for the
/// transaction receipt and fail if the transaction reverted.
#[async_trait]
pub trait PredictionMarket: Send + Sync + 'static {
  /// Read a round's timeline and pool totals.
  ///
  /// A round that was never started comes back zeroed
  /// (`Round::exists() == false`) rather than as an error.
  async fn round(&self, epoch: Epoch) -> anyhow::Result<Round>;

  /// Whether `round`, as just read by [`PredictionMarket::round`], is
  /// settled: the oracle closed it, or its settlement deadline lapsed and
  /// stakes are refundable.
  async fn is_round_resolved(&self, round: &Round) -> anyhow::Result<bool>;

  /// Whether `account` holds a stake in the round that is not yet
  /// claimed and is either a win or a refund.
  async fn has_unclaimed_position(&self, epoch: Epoch, account: Address) -> anyhow::Result<bool>;

  /// Stake `amount` BNB on `side` for the round.
  async fn submit_wager(&self, epoch: Epoch, side: BetSide, amount: Decimal) -> anyhow::Result<TxOutcome>;

  /// Claim payouts for the given rounds in a single transaction.
  async fn submit_claim(&self, epochs: &[Epoch]) -> anyhow::Result<ClaimReceipt>;

  /// Send `amount` BNB from the bot's wallet to `to`.
  async fn transfer_value(&self, to: Address, amount: Decimal) -> anyhow::Result<TxOutcome>;
}
