//! Engine error taxonomy.
//!
//! Every failure the decision/claim engine can report. None of these are
//! fatal: the round cycle logs them and moves on. Process-level failures
//! (missing key, unreachable RPC at startup) stay in `anyhow` land in `main`.

use rust_decimal::Decimal;
use thiserror::Error;

use super::round::Epoch;

/// Errors produced by the betting engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad strategy selection or invalid wait/fee parameters.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A monetary input to a pure function was negative.
    #[error("invalid amount {0}: amounts must be non-negative")]
    InvalidAmount(Decimal),

    /// A wager, claim or fee transfer transaction did not go through.
    #[error("{action} transaction failed: {reason}")]
    TransactionFailure {
        /// What was being submitted (`bet`, `claim`, `fee transfer`).
        action: &'static str,
        /// Error reported by the chain adapter.
        reason: String,
    },

    /// Reading one epoch's state failed while scanning for claims.
    #[error("failed to read round {epoch}: {reason}")]
    CollaboratorRead {
        /// Epoch whose read failed.
        epoch: Epoch,
        /// Error reported by the chain adapter.
        reason: String,
    },
}

impl EngineError {
    /// Wrap an adapter error as a transaction failure.
    pub fn transaction(action: &'static str, err: &anyhow::Error) -> Self {
        Self::TransactionFailure {
            action,
            reason: format!("{err:#}"),
        }
    }

    /// Wrap an adapter error as a per-epoch read failure.
    pub fn read(epoch: Epoch, err: &anyhow::Error) -> Self {
        Self::CollaboratorRead {
            epoch,
            reason: format!("{err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_invalid_amount_message_names_value() {
        let err = EngineError::InvalidAmount(dec!(-1.5));
        assert!(err.to_string().contains("-1.5"));
    }

    #[test]
    fn test_transaction_failure_keeps_context_chain() {
        let source = anyhow::anyhow!("nonce too low").context("betBear reverted");
        let err = EngineError::transaction("bet", &source);
        let msg = err.to_string();
        assert!(msg.starts_with("bet transaction failed"));
        assert!(msg.contains("betBear reverted"));
        assert!(msg.contains("nonce too low"));
    }

    #[test]
    fn test_read_failure_names_epoch() {
        let err = EngineError::read(42, &anyhow::anyhow!("timeout"));
        assert_eq!(err.to_string(), "failed to read round 42: timeout");
    }
}
