//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, applying environment overrides,
//! validating all parameters, and providing clear error messages
//! for misconfiguration.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::info;

use super::AppConfig;
use crate::domain::backoff::WaitController;
use crate::domain::fees::FeeCalculator;
use crate::domain::round::BNB_DECIMALS;

/// Environment variable overriding `betting.bet_amount`.
pub const BET_AMOUNT_ENV: &str = "BET_AMOUNT";

/// Largest accepted claim lookback window.
const MAX_LOOKBACK_EPOCHS: u64 = 100;

/// Load and validate configuration from a TOML file.
///
/// # Arguments
/// * `path` - Path to the config.toml file
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - `BET_AMOUNT` is set but not a decimal
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let mut config = parse_config(&content)?;
  apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
  validate_config(&config)?;
  Ok(config)
}

/// Parse TOML text into an unvalidated config.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  toml::from_str(content).with_context(|| "Failed to parse config.toml")
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<()>
where
  F: Fn(&str) -> Option<String>,
{
  if let Some(raw) = lookup(BET_AMOUNT_ENV).filter(|v| !v.trim().is_empty()) {
    config.betting.bet_amount = Decimal::from_str(raw.trim())
      .with_context(|| format!("{BET_AMOUNT_ENV} is not a decimal: {raw}"))?;
  }
  Ok(())
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Parseable addresses and a non-empty RPC URL
/// - A positive stake expressible in wei
/// - Consistent wait/backoff timing
/// - A bounded claim lookback
/// - A fee that can only be charged with an explicit recipient
pub fn validate_config(config: &AppConfig) -> Result<()> {
  // Chain validation
  anyhow::ensure!(
    !config.chain.rpc_url.trim().is_empty(),
    "RPC URL must not be empty"
  );
  config.prediction_contract()?;
  anyhow::ensure!(
    config.chain.block_time_ms > 0,
    "block_time_ms must be positive"
  );
  anyhow::ensure!(
    config.chain.rpc_requests_per_second > 0,
    "rpc_requests_per_second must be positive"
  );

  // Betting validation
  anyhow::ensure!(
    config.betting.bet_amount > Decimal::ZERO,
    "bet_amount must be positive, got {}",
    config.betting.bet_amount
  );
  anyhow::ensure!(
    config.betting.bet_amount.normalize().scale() <= BNB_DECIMALS,
    "bet_amount {} is finer than 1 wei ({BNB_DECIMALS} decimal places)",
    config.betting.bet_amount
  );
  config.wait_controller()?;

  // Claims validation
  anyhow::ensure!(
    (1..=MAX_LOOKBACK_EPOCHS).contains(&config.claims.lookback_epochs),
    "lookback_epochs must be in [1, {MAX_LOOKBACK_EPOCHS}], got {}",
    config.claims.lookback_epochs
  );

  // Fee validation
  config.fee_calculator()?;
  let recipient = config.fee_recipient()?;
  anyhow::ensure!(
    config.fee.rate.is_zero() || recipient.is_some(),
    "fee.rate is {} but no fee.recipient is configured",
    config.fee.rate
  );

  Ok(())
}

impl AppConfig {
  /// Log the settings that shape betting. Call once tracing is installed.
  pub fn log_summary(&self) {
    info!(
      contract = %self.chain.prediction_contract,
      bet_amount = %self.betting.bet_amount,
      initial_wait_ms = self.betting.initial_wait_ms,
      lookback = self.claims.lookback_epochs,
      fee_enabled = !self.fee.rate.is_zero(),
      dry_run = self.bot.dry_run,
      "Configuration loaded successfully"
    );
  }

  /// Prediction contract address.
  pub fn prediction_contract(&self) -> Result<Address> {
    self
      .chain
      .prediction_contract
      .parse()
      .with_context(|| format!("Invalid prediction_contract: {}", self.chain.prediction_contract))
  }

  /// Wait controller seeded from the betting section.
  pub fn wait_controller(&self) -> Result<WaitController> {
    let controller = WaitController::from_block_time(
      Duration::from_millis(self.betting.initial_wait_ms),
      Duration::from_millis(self.chain.block_time_ms),
      Duration::from_millis(self.betting.min_wait_ms),
      Duration::from_secs(self.betting.round_interval_secs),
    )?;
    Ok(controller)
  }

  /// Fee calculator for the configured rate.
  pub fn fee_calculator(&self) -> Result<FeeCalculator> {
    Ok(FeeCalculator::new(self.fee.rate)?)
  }

  /// Explicitly configured fee recipient, if any.
  pub fn fee_recipient(&self) -> Result<Option<Address>> {
    self
      .fee
      .recipient
      .as_deref()
      .map(str::trim)
      .filter(|r| !r.is_empty())
      .map(|r| {
        r.parse::<Address>()
          .with_context(|| format!("Invalid fee.recipient: {r}"))
      })
      .transpose()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  const MINIMAL: &str = r#"
[bot]
name = "test-bot"
"#;

  fn parse_valid(toml: &str) -> AppConfig {
    let config = parse_config(toml).unwrap();
    validate_config(&config).unwrap();
    config
  }

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = parse_valid(MINIMAL);
    assert_eq!(config.chain.chain_id, 56);
    assert_eq!(config.betting.bet_amount, dec!(0.2));
    assert_eq!(config.betting.initial_wait_ms, 270_000);
    assert_eq!(config.claims.lookback_epochs, 10);
    assert!(config.fee.rate.is_zero());
    assert!(config.fee_recipient().unwrap().is_none());
    assert!(!config.bot.dry_run);

    let wait = config.wait_controller().unwrap();
    assert_eq!(wait.decrement(), Duration::from_millis(6_000));
  }

  #[test]
  fn test_fee_rate_requires_recipient() {
    let config = parse_config(
      r#"
[bot]
name = "test-bot"

[fee]
rate = "0.03"
"#,
    )
    .unwrap();
    let err = validate_config(&config).unwrap_err();
    assert!(err.to_string().contains("recipient"));
  }

  #[test]
  fn test_fee_with_recipient_is_valid() {
    let config = parse_valid(
      r#"
[bot]
name = "test-bot"

[fee]
rate = "0.03"
recipient = "0x000000000000000000000000000000000000dEaD"
"#,
    );
    assert_eq!(config.fee_calculator().unwrap().rate(), dec!(0.03));
    assert!(config.fee_recipient().unwrap().is_some());
  }

  #[test]
  fn test_invalid_recipient_rejected() {
    let config = parse_config(
      r#"
[bot]
name = "test-bot"

[fee]
recipient = "not-an-address"
"#,
    )
    .unwrap();
    assert!(validate_config(&config).is_err());
  }

  #[test]
  fn test_wait_longer_than_round_rejected() {
    let config = parse_config(
      r#"
[bot]
name = "test-bot"

[betting]
initial_wait_ms = 300000
"#,
    )
    .unwrap();
    assert!(validate_config(&config).is_err());
  }

  #[test]
  fn test_zero_lookback_rejected() {
    let config = parse_config(
      r#"
[bot]
name = "test-bot"

[claims]
lookback_epochs = 0
"#,
    )
    .unwrap();
    assert!(validate_config(&config).is_err());
  }

  #[test]
  fn test_bet_amount_env_override() {
    let mut config = parse_config(MINIMAL).unwrap();
    apply_env_overrides(&mut config, |key| {
      (key == BET_AMOUNT_ENV).then(|| " 0.05 ".to_string())
    })
    .unwrap();
    assert_eq!(config.betting.bet_amount, dec!(0.05));
  }

  #[test]
  fn test_bad_bet_amount_env_rejected() {
    let mut config = parse_config(MINIMAL).unwrap();
    let result = apply_env_overrides(&mut config, |_| Some("lots".to_string()));
    assert!(result.is_err());
  }

  #[test]
  fn test_sub_wei_bet_amount_rejected() {
    let mut config = parse_config(MINIMAL).unwrap();
    apply_env_overrides(&mut config, |_| Some("0.0000000000000000001".to_string())).unwrap();
    let err = validate_config(&config).unwrap_err();
    assert!(err.to_string().contains("finer than 1 wei"));

    config.betting.bet_amount = dec!(0.000000000000000001);
    assert!(validate_config(&config).is_ok());
  }

  /// Shared buffer the test subscriber writes into.
  #[derive(Clone, Default)]
  struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

  impl std::io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
      self.0.lock().unwrap().extend_from_slice(buf);
      Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
      Ok(())
    }
  }

  #[test]
  fn test_summary_is_logged_through_installed_subscriber() {
    let config = parse_valid(MINIMAL);
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
      .with_writer(move || writer.clone())
      .json()
      .finish();

    tracing::subscriber::with_default(subscriber, || config.log_summary());

    let text = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    assert!(text.contains("Configuration loaded successfully"));
    assert!(text.contains("\"lookback\":10"));
  }

  #[test]
  fn test_zero_bet_amount_rejected() {
    let mut config = parse_config(MINIMAL).unwrap();
    config.betting.bet_amount = Decimal::ZERO;
    assert!(validate_config(&config).is_err());
  }
}
