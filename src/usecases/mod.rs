//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement
//! the bot's core workflows.
//!
//! Use cases:
//! - `ClaimScanner`: Find recent rounds with unclaimed payouts
//! - `RoundCycle`: Per-round wait, bet, claim and fee loop

pub mod claim_scanner;
pub mod round_cycle;

pub use claim_scanner::{ClaimScan, ClaimScanner};
pub use round_cycle::{BetOutcome, ClaimOutcome, CycleReport, CycleSettings, RoundCycle};
