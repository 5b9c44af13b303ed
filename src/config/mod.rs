//! Configuration Module - TOML-based Bot Configuration
//!
//! Loads and validates configuration from `config.toml` with
//! environment variable overrides via `.env` files.
//! The contract address and fee recipient are externalized
//! here - nothing is hardcoded in the domain layer.
//! The signing key is never read from this file: it comes from
//! the `PRIVATE_KEY` environment variable only.

pub mod cli;
pub mod loader;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Top-level bot configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the bot begins operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Bot identity and metadata.
  pub bot: BotConfig,
  /// Chain connection and contract.
  #[serde(default)]
  pub chain: ChainConfig,
  /// Wager size and timing.
  #[serde(default)]
  pub betting: BettingConfig,
  /// Claim scanning.
  #[serde(default)]
  pub claims: ClaimsConfig,
  /// Optional fee on claimed payouts (disabled by default).
  #[serde(default)]
  pub fee: FeeConfig,
  /// Metrics and monitoring.
  #[serde(default)]
  pub metrics: MetricsConfig,
  /// Persistence configuration.
  #[serde(default)]
  pub persistence: PersistenceConfig,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
  /// Human-readable bot name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Enable dry-run mode (decide and scan, never send transactions).
  #[serde(default)]
  pub dry_run: bool,
}

/// BNB Smart Chain connection.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
  /// JSON-RPC endpoint.
  #[serde(default = "default_rpc_url")]
  pub rpc_url: String,
  /// Expected chain ID (56 = BSC mainnet).
  #[serde(default = "default_chain_id")]
  pub chain_id: u64,
  /// PancakeSwap Prediction V2 contract address.
  #[serde(default = "default_prediction_contract")]
  pub prediction_contract: String,
  /// Average block time in milliseconds.
  #[serde(default = "default_block_time_ms")]
  pub block_time_ms: u64,
  /// Maximum read calls per second against the RPC endpoint.
  #[serde(default = "default_rpc_rps")]
  pub rpc_requests_per_second: u32,
}

/// Wager configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BettingConfig {
  /// Stake per round in BNB. Overridable with `BET_AMOUNT`.
  #[serde(default = "default_bet_amount")]
  pub bet_amount: Decimal,
  /// Wait after a round starts before reading pools (milliseconds).
  #[serde(default = "default_initial_wait_ms")]
  pub initial_wait_ms: u64,
  /// Lowest wait the backoff may reach (milliseconds).
  #[serde(default = "default_min_wait_ms")]
  pub min_wait_ms: u64,
  /// Length of one round (seconds).
  #[serde(default = "default_round_interval")]
  pub round_interval_secs: u64,
}

/// Claim scanning configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimsConfig {
  /// Whether to scan and claim at all.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// How many previous rounds to examine each cycle.
  #[serde(default = "default_lookback")]
  pub lookback_epochs: u64,
}

/// Fee on claimed payouts.
///
/// Both a non-zero rate and an explicit recipient are required
/// before any value leaves the wallet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeeConfig {
  /// Fraction of each payout, in `[0, 1]`.
  #[serde(default)]
  pub rate: Decimal,
  /// Recipient address (hex).
  #[serde(default)]
  pub recipient: Option<String>,
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Serve /live, /ready and /metrics.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Health/metrics server port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
  /// Directory for JSONL journal files.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
}

impl Default for ChainConfig {
  fn default() -> Self {
    Self {
      rpc_url: default_rpc_url(),
      chain_id: default_chain_id(),
      prediction_contract: default_prediction_contract(),
      block_time_ms: default_block_time_ms(),
      rpc_requests_per_second: default_rpc_rps(),
    }
  }
}

impl Default for BettingConfig {
  fn default() -> Self {
    Self {
      bet_amount: default_bet_amount(),
      initial_wait_ms: default_initial_wait_ms(),
      min_wait_ms: default_min_wait_ms(),
      round_interval_secs: default_round_interval(),
    }
  }
}

impl Default for ClaimsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      lookback_epochs: default_lookback(),
    }
  }
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      health_port: default_health_port(),
    }
  }
}

impl Default for PersistenceConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_rpc_url() -> String {
  "https://bsc-dataseed.binance.org/".to_string()
}

fn default_chain_id() -> u64 {
  56
}

fn default_prediction_contract() -> String {
  "0x18B2A687610328590Bc8F2e5fEdDe3b582A49cdA".to_string()
}

fn default_block_time_ms() -> u64 {
  3_000
}

fn default_rpc_rps() -> u32 {
  10
}

fn default_bet_amount() -> Decimal {
  dec!(0.2)
}

fn default_initial_wait_ms() -> u64 {
  270_000 // 4.5 min into a 5 min round
}

fn default_min_wait_ms() -> u64 {
  6_000
}

fn default_round_interval() -> u64 {
  300
}

fn default_lookback() -> u64 {
  10
}

fn default_health_port() -> u16 {
  9090
}

fn default_data_dir() -> String {
  "data".to_string()
}
