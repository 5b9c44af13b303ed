//! Pre-bet wait controller.
//!
//! The bot waits after a round starts so the pools it reads are close to
//! final, then bets before the round locks. A failed wager usually means the
//! transaction landed too late, so every failure shortens the wait by two
//! blocks.
//!
//! The reduction is cumulative for the lifetime of the process and is never
//! reset upward: a run that keeps failing keeps betting earlier. Once the
//! wait reaches its floor, further failures leave it unchanged.

use std::time::Duration;

use super::error::EngineError;

/// Blocks removed from the wait on each failed wager.
pub const BLOCKS_PER_BACKOFF: u32 = 2;

/// Owns the single mutable wait duration used by the round cycle.
#[derive(Debug, Clone)]
pub struct WaitController {
    /// Current wait before reading pools and betting.
    current: Duration,
    /// Amount removed per failed wager (two block intervals).
    decrement: Duration,
    /// Lowest wait the controller will ever return.
    floor: Duration,
}

impl WaitController {
    /// Create a controller.
    ///
    /// # Errors
    /// `EngineError::Configuration` unless
    /// `0 < floor <= initial < round_interval` and `decrement > 0`.
    pub fn new(
        initial: Duration,
        decrement: Duration,
        floor: Duration,
        round_interval: Duration,
    ) -> Result<Self, EngineError> {
        if decrement.is_zero() {
            return Err(EngineError::Configuration(
                "backoff decrement must be positive".to_string(),
            ));
        }
        if floor.is_zero() {
            return Err(EngineError::Configuration(
                "minimum wait must be positive".to_string(),
            ));
        }
        if floor > initial {
            return Err(EngineError::Configuration(format!(
                "minimum wait {}ms exceeds initial wait {}ms",
                floor.as_millis(),
                initial.as_millis()
            )));
        }
        if initial >= round_interval {
            return Err(EngineError::Configuration(format!(
                "initial wait {}ms must be shorter than the round interval {}ms",
                initial.as_millis(),
                round_interval.as_millis()
            )));
        }

        Ok(Self {
            current: initial,
            decrement,
            floor,
        })
    }

    /// Build from the chain's block time (decrement = two blocks).
    ///
    /// # Errors
    /// Same as [`WaitController::new`].
    pub fn from_block_time(
        initial: Duration,
        block_time: Duration,
        floor: Duration,
        round_interval: Duration,
    ) -> Result<Self, EngineError> {
        Self::new(
            initial,
            block_time * BLOCKS_PER_BACKOFF,
            floor,
            round_interval,
        )
    }

    /// Wait to apply to the next round.
    pub const fn current_wait(&self) -> Duration {
        self.current
    }

    /// Amount removed per failure.
    pub const fn decrement(&self) -> Duration {
        self.decrement
    }

    /// Lowest reachable wait.
    pub const fn floor(&self) -> Duration {
        self.floor
    }

    /// Shorten the wait after a failed wager and return the new value.
    pub fn on_bet_failure(&mut self) -> Duration {
        self.current = self
            .current
            .saturating_sub(self.decrement)
            .max(self.floor);
        self.current
    }

    /// Whether further failures can still shorten the wait.
    pub fn at_floor(&self) -> bool {
        self.current <= self.floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUND: Duration = Duration::from_secs(300);

    fn controller() -> WaitController {
        WaitController::from_block_time(
            Duration::from_millis(270_000),
            Duration::from_millis(3_000),
            Duration::from_millis(6_000),
            ROUND,
        )
        .unwrap()
    }

    #[test]
    fn test_three_failures_step_down_by_two_blocks() {
        let mut wait = controller();
        assert_eq!(wait.current_wait(), Duration::from_millis(270_000));
        assert_eq!(wait.on_bet_failure(), Duration::from_millis(264_000));
        assert_eq!(wait.on_bet_failure(), Duration::from_millis(258_000));
        assert_eq!(wait.on_bet_failure(), Duration::from_millis(252_000));
        assert_eq!(wait.current_wait(), Duration::from_millis(252_000));
    }

    #[test]
    fn test_stops_at_floor() {
        let mut wait = controller();
        // 270s / 6s = 45 steps to reach the 6s floor.
        for _ in 0..44 {
            wait.on_bet_failure();
        }
        assert_eq!(wait.current_wait(), Duration::from_millis(6_000));
        assert!(wait.at_floor());

        assert_eq!(wait.on_bet_failure(), Duration::from_millis(6_000));
        assert_eq!(wait.on_bet_failure(), Duration::from_millis(6_000));
    }

    #[test]
    fn test_clamps_when_step_overshoots_floor() {
        let mut wait = WaitController::new(
            Duration::from_millis(10_000),
            Duration::from_millis(6_000),
            Duration::from_millis(5_000),
            ROUND,
        )
        .unwrap();
        assert_eq!(wait.on_bet_failure(), Duration::from_millis(5_000));
        assert_eq!(wait.on_bet_failure(), Duration::from_millis(5_000));
    }

    #[test]
    fn test_rejects_zero_floor() {
        let err = WaitController::new(
            Duration::from_millis(10_000),
            Duration::from_millis(6_000),
            Duration::ZERO,
            ROUND,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn test_rejects_zero_decrement() {
        let err = WaitController::new(
            Duration::from_millis(10_000),
            Duration::ZERO,
            Duration::from_millis(1_000),
            ROUND,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn test_rejects_floor_above_initial() {
        assert!(
            WaitController::new(
                Duration::from_millis(5_000),
                Duration::from_millis(6_000),
                Duration::from_millis(6_000),
                ROUND,
            )
            .is_err()
        );
    }

    #[test]
    fn test_rejects_wait_longer_than_round() {
        assert!(
            WaitController::new(
                ROUND,
                Duration::from_millis(6_000),
                Duration::from_millis(6_000),
                ROUND,
            )
            .is_err()
        );
    }
}
