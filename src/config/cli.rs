//! Command-line arguments.
//!
//! Strategy selection policy: with no strategy argument the bot runs
//! `contrarian`. An unknown strategy name is a configuration error that
//! names the rejected value; it never falls back silently.

use std::ffi::OsString;

use clap::Parser;

use crate::domain::error::EngineError;
use crate::domain::strategy::Strategy;

/// PancakeSwap Prediction V2 betting bot.
#[derive(Debug, Clone, Parser)]
#[command(name = "pancake-prediction-bot", version, about)]
pub struct Cli {
  /// Path to the TOML configuration file.
  #[arg(long, default_value = "config.toml")]
  pub config: String,

  /// Betting strategy: contrarian (back the smaller pool) or momentum.
  #[arg(long)]
  pub strategy: Option<Strategy>,

  /// Shorthand for `--strategy momentum`.
  #[arg(long, conflicts_with = "strategy")]
  pub exp: bool,

  /// Decide and scan every round but never send transactions.
  #[arg(long)]
  pub dry_run: bool,
}

impl Cli {
  /// Strategy selected on the command line, or the default.
  pub fn selected_strategy(&self) -> Strategy {
    if self.exp {
      Strategy::Momentum
    } else {
      self.strategy.unwrap_or_default()
    }
  }
}

/// Select the strategy from a full argument list (program name first).
///
/// # Errors
/// `EngineError::Configuration` on an unknown strategy name, on
/// `--exp` combined with `--strategy`, or on any other argument error.
pub fn parse_strategy<I, T>(args: I) -> Result<Strategy, EngineError>
where
  I: IntoIterator<Item = T>,
  T: Into<OsString> + Clone,
{
  Cli::try_parse_from(args)
    .map(|cli| cli.selected_strategy())
    .map_err(|e| EngineError::Configuration(e.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_strategy_defaults_to_contrarian() {
    assert_eq!(parse_strategy(["bot"]).unwrap(), Strategy::Contrarian);
  }

  #[test]
  fn test_named_strategy() {
    assert_eq!(
      parse_strategy(["bot", "--strategy", "momentum"]).unwrap(),
      Strategy::Momentum
    );
    assert_eq!(
      parse_strategy(["bot", "--strategy=contrarian"]).unwrap(),
      Strategy::Contrarian
    );
  }

  #[test]
  fn test_exp_flag_selects_momentum() {
    assert_eq!(parse_strategy(["bot", "--exp"]).unwrap(), Strategy::Momentum);
  }

  #[test]
  fn test_unknown_strategy_names_input() {
    let err = parse_strategy(["bot", "--strategy", "martingale"]).unwrap_err();
    assert!(matches!(err, EngineError::Configuration(_)));
    assert!(err.to_string().contains("martingale"));
  }

  #[test]
  fn test_exp_conflicts_with_strategy() {
    let err = parse_strategy(["bot", "--exp", "--strategy", "contrarian"]).unwrap_err();
    assert!(matches!(err, EngineError::Configuration(_)));
  }

  #[test]
  fn test_other_flags_parse() {
    let cli = Cli::try_parse_from(["bot", "--config", "prod.toml", "--dry-run"]).unwrap();
    assert_eq!(cli.config, "prod.toml");
    assert!(cli.dry_run);
    assert_eq!(cli.selected_strategy(), Strategy::Contrarian);
  }
}
