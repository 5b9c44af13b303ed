//! BNB <-> wei conversion at the contract boundary.

use std::str::FromStr;

use alloy::primitives::U256;
use alloy::primitives::utils::{format_ether, parse_ether};
use anyhow::{Context, Result, bail};
use rust_decimal::Decimal;

use crate::domain::round::BNB_DECIMALS;

/// Convert a BNB amount to wei.
///
/// Negative amounts and amounts finer than one wei are rejected.
pub fn to_wei(amount: Decimal) -> Result<U256> {
    if amount.is_sign_negative() && !amount.is_zero() {
        bail!("Cannot convert negative amount {amount} to wei");
    }
    let amount = amount.normalize();
    if amount.scale() > BNB_DECIMALS {
        bail!("Amount {amount} has more than {BNB_DECIMALS} decimal places");
    }
    parse_ether(&amount.to_string())
        .with_context(|| format!("Amount {amount} is not representable in wei"))
}

/// Convert wei to BNB.
pub fn from_wei(wei: U256) -> Result<Decimal> {
    let text = format_ether(wei);
    Decimal::from_str(&text)
        .map(|d| d.normalize())
        .with_context(|| format!("Wei amount {wei} exceeds decimal range"))
}

/// Narrow an on-chain integer (timestamps, epochs) to `u64`.
pub fn to_u64(value: U256, what: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow::anyhow!("{what} {value} does not fit in u64"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_bet_amount_to_wei() {
        assert_eq!(
            to_wei(dec!(0.2)).unwrap(),
            U256::from(200_000_000_000_000_000u64)
        );
        assert_eq!(to_wei(Decimal::ZERO).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_negative_rejected() {
        assert!(to_wei(dec!(-0.1)).is_err());
    }

    #[test]
    fn test_sub_wei_amount_rejected() {
        assert!(to_wei(dec!(0.0000000000000000001)).is_err());
        assert!(to_wei(dec!(1.0000000000000000001)).is_err());
        // Trailing zeros beyond wei precision are harmless.
        assert_eq!(
            to_wei(dec!(0.10000000000000000000)).unwrap(),
            U256::from(100_000_000_000_000_000u64)
        );
    }

    #[test]
    fn test_wei_to_bnb() {
        let wei = U256::from(1_250_000_000_000_000_000u64);
        assert_eq!(from_wei(wei).unwrap(), dec!(1.25));
        assert_eq!(from_wei(U256::from(1u64)).unwrap(), dec!(0.000000000000000001));
    }

    #[test]
    fn test_u64_narrowing() {
        assert_eq!(to_u64(U256::from(42u64), "epoch").unwrap(), 42);
        assert!(to_u64(U256::MAX, "epoch").is_err());
    }
}
