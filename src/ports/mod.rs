//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `PredictionMarket`: Round reads, wagers, claims and transfers on-chain
//! - `Repository`: Append-only audit journal (JSONL-based)
//! - `CycleMetrics`: Counters and gauges recorded by the round cycle

pub mod metrics;
pub mod prediction_market;
pub mod repository;
