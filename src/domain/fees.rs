//! Fee deducted from claimed payouts.
//!
//! The fee is a flat fraction of each claimed amount. It is disabled by
//! default (rate 0) and only ever sent to a recipient that the operator sets
//! explicitly in `config.toml`.

use rust_decimal::{Decimal, RoundingStrategy};

use super::error::EngineError;
use super::round::BNB_DECIMALS;

/// Flat-rate fee calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeCalculator {
    /// Fraction of each payout taken as fee, in `[0, 1]`.
    rate: Decimal,
}

impl FeeCalculator {
    /// Creates a calculator with the given rate.
    ///
    /// # Errors
    /// `EngineError::Configuration` if `rate` is outside `[0, 1]`.
    pub fn new(rate: Decimal) -> Result<Self, EngineError> {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(EngineError::Configuration(format!(
                "fee rate must be within [0, 1], got {rate}"
            )));
        }
        Ok(Self { rate })
    }

    /// Calculator that never charges anything.
    pub const fn disabled() -> Self {
        Self { rate: Decimal::ZERO }
    }

    /// Configured rate.
    pub const fn rate(&self) -> Decimal {
        self.rate
    }

    /// Whether any fee can ever be charged.
    pub fn is_enabled(&self) -> bool {
        !self.rate.is_zero()
    }

    /// Fee owed on a claimed payout: `payout × rate`, rounded down to wei.
    ///
    /// # Errors
    /// `EngineError::InvalidAmount` for a negative payout.
    pub fn calculate_tax_amount(&self, payout: Decimal) -> Result<Decimal, EngineError> {
        if payout < Decimal::ZERO {
            return Err(EngineError::InvalidAmount(payout));
        }

        // Overflow would need a payout near 7.9e28 BNB; saturate instead of panicking.
        let fee = payout.checked_mul(self.rate).unwrap_or(payout);

        Ok(fee
            .round_dp_with_strategy(BNB_DECIMALS, RoundingStrategy::ToZero)
            .normalize())
    }
}

impl Default for FeeCalculator {
    fn default() -> Self {
        Self::disabled()
    }
}
