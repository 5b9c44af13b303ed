//! Repository Port - Audit Journal Interface
//!
//! Defines the trait for recording every transaction the bot attempts.
//! Append-only JSONL, no database dependency. The journal is an audit
//! trail: the engine never reads its own decisions back from it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::round::{BetSide, Epoch, PoolTotals};

/// What happened, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalEvent {
  /// A wager was decided and (unless dry-run) submitted.
  Bet {
    /// Round bet on.
    epoch: Epoch,
    /// Side chosen.
    side: BetSide,
    /// Stake in BNB.
    amount: Decimal,
    /// Pools observed when deciding.
    pools: PoolTotals,
    /// Strategy that made the decision.
    strategy: String,
    /// Wait applied before reading the pools (ms).
    wait_ms: u64,
  },
  /// A claim transaction for one or more rounds.
  Claim {
    /// Rounds included in the claim.
    epochs: Vec<Epoch>,
    /// Total paid out in BNB (zero when the claim failed).
    total: Decimal,
  },
  /// A fee transfer to the configured recipient.
  FeeTransfer {
    /// Round whose payout the fee was computed from.
    epoch: Epoch,
    /// Recipient address (checksummed hex).
    recipient: String,
    /// Payout the fee applies to.
    payout: Decimal,
    /// Fee sent.
    fee: Decimal,
  },
}

/// One journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
  /// Unique record identifier.
  pub id: Uuid,
  /// When the record was written.
  pub timestamp: DateTime<Utc>,
  /// Transaction hash, if a transaction was mined.
  pub tx_hash: Option<String>,
  /// Whether the attempt succeeded.
  pub success: bool,
  /// Error message for failed attempts.
  pub error: Option<String>,
  /// Event payload.
  #[serde(flatten)]
  pub event: JournalEvent,
}

impl JournalEntry {
  /// Entry for a successful transaction.
  pub fn succeeded(event: JournalEvent, tx_hash: Option<String>) -> Self {
    Self {
      id: Uuid::new_v4(),
      timestamp: Utc::now(),
      tx_hash,
      success: true,
      error: None,
      event,
    }
  }

  /// Entry for a failed attempt.
  pub fn failed(event: JournalEvent, error: impl Into<String>) -> Self {
    Self {
      id: Uuid::new_v4(),
      timestamp: Utc::now(),
      tx_hash: None,
      success: false,
      error: Some(error.into()),
      event,
    }
  }
}

/// Trait for journal storage providers.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
  /// Append one entry.
  async fn append(&self, entry: &JournalEntry) -> anyhow::Result<()>;

  /// Load every entry, oldest first.
  async fn load_all(&self) -> anyhow::Result<Vec<JournalEntry>>;

  /// Check if the repository is writable.
  async fn is_healthy(&self) -> bool;
}
