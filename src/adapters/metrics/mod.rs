//! Metrics and Monitoring Adapters
//!
//! Prometheus counters for rounds, wagers, claims and fees, served
//! alongside /live and /ready by a single axum 0.7 server.

pub mod health;
pub mod prometheus;

pub use self::health::{HealthServer, HealthState};
pub use self::prometheus::BotMetrics;
