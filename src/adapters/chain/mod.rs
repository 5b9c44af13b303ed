//! Chain Adapters - BNB Smart Chain Interaction Layer
//!
//! Provides on-chain access via alloy-rs 0.9 for:
//! - Signing RPC provider with chain ID check
//! - PancakeSwap Prediction V2 reads, bets, claims and transfers
//! - `StartRound` event feed
//! - BNB/wei conversion

pub mod contracts;
pub mod events;
pub mod provider;
pub mod units;

pub use contracts::PredictionContract;
pub use events::RoundWatcher;
pub use provider::BscProvider;
