//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (blockchain RPC, HTTP server, file I/O). Each
//! sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `chain`: BNB Smart Chain interaction via alloy-rs
//! - `metrics`: Prometheus metrics export and health checks
//! - `persistence`: JSONL journal of bets, claims and fees

pub mod chain;
pub mod metrics;
pub mod persistence;
