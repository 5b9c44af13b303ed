//! Domain layer - Core betting logic and models.
//!
//! Pure decision logic for the prediction bot: which side to back, how long
//! to wait before betting, and what fee applies to a claimed payout.
//! Nothing here performs I/O (hexagonal architecture inner ring).

pub mod backoff;
pub mod error;
pub mod fees;
pub mod round;
pub mod strategy;

// Re-export core types for convenience
pub use backoff::WaitController;
pub use error::EngineError;
pub use fees::FeeCalculator;
pub use round::{BetSide, Epoch, PoolTotals, Round};
pub use strategy::{Strategy, is_bear_bet};
