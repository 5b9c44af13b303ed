//! Bet direction strategies.
//!
//! The decision is a single comparison of the two pool totals. Contrarian
//! backs the smaller pool (higher payout multiplier if it wins); momentum
//! backs the larger one. Momentum is the exact negation of contrarian, so
//! the two strategies never agree, ties included:
//!
//! | pools           | contrarian | momentum |
//! |-----------------|------------|----------|
//! | bear < bull     | bear       | bull     |
//! | bear > bull     | bull       | bear     |
//! | bear == bull    | bull       | bear     |

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::error::EngineError;

/// Closed set of betting strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
    /// Bet against the larger pool. Default when nothing is selected.
    #[default]
    Contrarian,
    /// Bet with the larger pool.
    Momentum,
}

impl Strategy {
    /// Canonical name used in logs and on the command line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contrarian => "contrarian",
            Self::Momentum => "momentum",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contrarian" | "standard" => Ok(Self::Contrarian),
            "momentum" | "experimental" | "exp" => Ok(Self::Momentum),
            _ => Err(EngineError::Configuration(format!(
                "unknown strategy '{s}' (expected 'contrarian' or 'momentum')"
            ))),
        }
    }
}

/// Decide whether to bet on the bear pool.
///
/// Total over all non-negative inputs, zero pools included.
///
/// # Errors
/// `EngineError::InvalidAmount` if either total is negative.
pub fn is_bear_bet(
    bull_amount: Decimal,
    bear_amount: Decimal,
    strategy: Strategy,
) -> Result<bool, EngineError> {
    for amount in [bull_amount, bear_amount] {
        if amount < Decimal::ZERO {
            return Err(EngineError::InvalidAmount(amount));
        }
    }

    let bear_is_smaller = bear_amount < bull_amount;

    Ok(match strategy {
        Strategy::Contrarian => bear_is_smaller,
        Strategy::Momentum => !bear_is_smaller,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_contrarian_backs_smaller_pool() {
        assert!(is_bear_bet(dec!(100), dec!(50), Strategy::Contrarian).unwrap());
        assert!(!is_bear_bet(dec!(50), dec!(100), Strategy::Contrarian).unwrap());
    }

    #[test]
    fn test_momentum_backs_larger_pool() {
        assert!(!is_bear_bet(dec!(100), dec!(50), Strategy::Momentum).unwrap());
        assert!(is_bear_bet(dec!(50), dec!(100), Strategy::Momentum).unwrap());
    }

    #[test]
    fn test_ties_resolve_per_strategy() {
        for _ in 0..3 {
            assert!(!is_bear_bet(dec!(2.5), dec!(2.5), Strategy::Contrarian).unwrap());
            assert!(is_bear_bet(dec!(2.5), dec!(2.5), Strategy::Momentum).unwrap());
        }
    }

    #[test]
    fn test_empty_pools() {
        assert!(!is_bear_bet(Decimal::ZERO, Decimal::ZERO, Strategy::Contrarian).unwrap());
        assert!(is_bear_bet(dec!(1), Decimal::ZERO, Strategy::Contrarian).unwrap());
        assert!(!is_bear_bet(Decimal::ZERO, dec!(1), Strategy::Contrarian).unwrap());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let err = is_bear_bet(dec!(-1), dec!(3), Strategy::Contrarian).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(a) if a == dec!(-1)));

        let err = is_bear_bet(dec!(1), dec!(-0.1), Strategy::Momentum).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }

    #[test]
    fn test_parse_names_and_aliases() {
        assert_eq!("contrarian".parse::<Strategy>().unwrap(), Strategy::Contrarian);
        assert_eq!("Standard".parse::<Strategy>().unwrap(), Strategy::Contrarian);
        assert_eq!("MOMENTUM".parse::<Strategy>().unwrap(), Strategy::Momentum);
        assert_eq!("exp".parse::<Strategy>().unwrap(), Strategy::Momentum);
    }

    #[test]
    fn test_parse_unknown_names_input() {
        let err = "yolo".parse::<Strategy>().unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
        assert!(err.to_string().contains("yolo"));
    }

    #[test]
    fn test_default_is_contrarian() {
        assert_eq!(Strategy::default(), Strategy::Contrarian);
    }
}
