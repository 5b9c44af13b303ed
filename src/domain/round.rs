//! Prediction round model.
//!
//! A round is identified by its epoch. The bot only ever reads rounds;
//! the contract owns their lifecycle (start → lock → close → settle).

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Round number. Strictly increasing, first round is 1.
pub type Epoch = u64;

/// Decimal places of one BNB (wei precision).
pub const BNB_DECIMALS: u32 = 18;

/// Number of rounds between a round starting and it being closed.
///
/// Starting round `E` locks `E - 1` and ends `E - 2`, so a round can only be
/// settled once two newer rounds have started.
pub const SETTLEMENT_LAG: Epoch = 2;

/// Which pool a wager goes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetSide {
    /// Price goes up.
    Bull,
    /// Price goes down.
    Bear,
}

impl BetSide {
    /// Side from the decider's output.
    pub const fn from_bear_flag(is_bear: bool) -> Self {
        if is_bear { Self::Bear } else { Self::Bull }
    }

    /// Lowercase label for logs and metric labels.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bull => "bull",
            Self::Bear => "bear",
        }
    }
}

impl fmt::Display for BetSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pool totals of a round, in BNB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolTotals {
    /// Total staked on bull.
    pub bull: Decimal,
    /// Total staked on bear.
    pub bear: Decimal,
}

/// Snapshot of a round as stored on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Round {
    /// Round number.
    pub epoch: Epoch,
    /// Unix seconds the round opened; zero when the round does not exist.
    pub start_timestamp: u64,
    /// Unix seconds betting closes.
    pub lock_timestamp: u64,
    /// Unix seconds the round ends.
    pub close_timestamp: u64,
    /// Current pool totals.
    pub pools: PoolTotals,
    /// Whether the oracle already settled the round.
    pub oracle_called: bool,
}

impl Round {
    /// A round that was never started reads back as all zeroes.
    pub const fn exists(&self) -> bool {
        self.start_timestamp != 0
    }

    /// Settled by the oracle, or refundable because `now` (unix seconds)
    /// is past the close time plus the contract's buffer.
    pub const fn is_resolved_at(&self, now: u64, buffer_seconds: u64) -> bool {
        if self.oracle_called {
            return true;
        }
        self.close_timestamp != 0 && now > self.close_timestamp.saturating_add(buffer_seconds)
    }
}

/// Whether `epoch` has ended by the time `current` starts.
pub const fn is_closed_at(epoch: Epoch, current: Epoch) -> bool {
    epoch.saturating_add(SETTLEMENT_LAG) <= current
}
