//! Round Replay - Multi-Round Simulation Against an In-Memory Chain
//!
//! Replays a run of consecutive rounds through the full round loop with
//! a simulated prediction contract that settles rounds two epochs after
//! they start. Validates claim timing, single claiming, backoff drift and
//! strategy symmetry over many cycles before going live.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::{broadcast, mpsc};

use pancake_prediction_bot::domain::backoff::WaitController;
use pancake_prediction_bot::domain::fees::FeeCalculator;
use pancake_prediction_bot::domain::round::{BetSide, Epoch, PoolTotals, Round};
use pancake_prediction_bot::domain::strategy::Strategy;
use pancake_prediction_bot::ports::prediction_market::{
    ClaimPayout, ClaimReceipt, PredictionMarket, TxOutcome,
};
use pancake_prediction_bot::ports::repository::{JournalEntry, JournalEvent, Repository};
use pancake_prediction_bot::usecases::{CycleSettings, RoundCycle};

const FIRST_EPOCH: Epoch = 100;
const ROUNDS: u64 = 30;

/// Chain state as the simulated contract sees it.
#[derive(Default)]
struct SimState {
    /// Newest round started so far.
    current: Epoch,
    bets: BTreeMap<Epoch, (BetSide, Decimal)>,
    claimed: BTreeSet<Epoch>,
    /// (current epoch at claim time, epochs claimed)
    claims: Vec<(Epoch, Vec<Epoch>)>,
}

/// In-memory prediction contract.
///
/// Round `e` is won by bull when `e % 3 == 0`, by bear otherwise, and
/// settles once round `e + 2` has started.
struct SimChain {
    state: Mutex<SimState>,
    failing_bets: BTreeSet<Epoch>,
}

impl SimChain {
    fn new(failing_bets: &[Epoch]) -> Self {
        Self {
            state: Mutex::new(SimState::default()),
            failing_bets: failing_bets.iter().copied().collect(),
        }
    }

    fn winner(epoch: Epoch) -> BetSide {
        if epoch % 3 == 0 { BetSide::Bull } else { BetSide::Bear }
    }

    fn pools(epoch: Epoch) -> PoolTotals {
        PoolTotals {
            bull: Decimal::from(epoch % 5 + 1),
            bear: dec!(3),
        }
    }
}

#[async_trait]
impl PredictionMarket for SimChain {
    async fn round(&self, epoch: Epoch) -> Result<Round> {
        let mut state = self.state.lock().map_err(|_| anyhow!("poisoned"))?;
        // The pool read for a new round is the first call of each cycle.
        state.current = state.current.max(epoch);
        Ok(Round {
            epoch,
            start_timestamp: 1_700_000_000 + epoch * 300,
            lock_timestamp: 1_700_000_300 + epoch * 300,
            close_timestamp: 1_700_000_600 + epoch * 300,
            pools: Self::pools(epoch),
            oracle_called: epoch + 2 <= state.current,
        })
    }

    async fn is_round_resolved(&self, round: &Round) -> Result<bool> {
        Ok(round.oracle_called)
    }

    async fn has_unclaimed_position(&self, epoch: Epoch, _account: Address) -> Result<bool> {
        let state = self.state.lock().map_err(|_| anyhow!("poisoned"))?;
        Ok(match state.bets.get(&epoch) {
            Some((side, _)) => *side == Self::winner(epoch) && !state.claimed.contains(&epoch),
            None => false,
        })
    }

    async fn submit_wager(&self, epoch: Epoch, side: BetSide, amount: Decimal) -> Result<TxOutcome> {
        if self.failing_bets.contains(&epoch) {
            bail!("replacement transaction underpriced");
        }
        let mut state = self.state.lock().map_err(|_| anyhow!("poisoned"))?;
        if state.bets.insert(epoch, (side, amount)).is_some() {
            bail!("Can only bet once per round");
        }
        Ok(TxOutcome {
            tx_hash: format!("0xbet{epoch}"),
            gas_used: 60_000,
        })
    }

    async fn submit_claim(&self, epochs: &[Epoch]) -> Result<ClaimReceipt> {
        let mut state = self.state.lock().map_err(|_| anyhow!("poisoned"))?;
        let current = state.current;
        let mut payouts = Vec::new();
        for &epoch in epochs {
            if epoch + 2 > current {
                bail!("Round {epoch} has not ended");
            }
            if !state.claimed.insert(epoch) {
                bail!("Round {epoch} already claimed");
            }
            let stake = state.bets.get(&epoch).map_or(Decimal::ZERO, |(_, a)| *a);
            payouts.push(ClaimPayout {
                epoch,
                amount: stake * dec!(2),
            });
        }
        state.claims.push((current, epochs.to_vec()));
        Ok(ClaimReceipt {
            tx_hash: format!("0xclaim{current}"),
            payouts,
        })
    }

    async fn transfer_value(&self, _to: Address, _amount: Decimal) -> Result<TxOutcome> {
        Ok(TxOutcome {
            tx_hash: "0xfee".to_string(),
            gas_used: 21_000,
        })
    }
}

/// Journal kept in memory.
#[derive(Default)]
struct MemoryJournal {
    entries: Mutex<Vec<JournalEntry>>,
}

#[async_trait]
impl Repository for MemoryJournal {
    async fn append(&self, entry: &JournalEntry) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("poisoned"))?
            .push(entry.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<JournalEntry>> {
        Ok(self.entries.lock().map_err(|_| anyhow!("poisoned"))?.clone())
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

/// Run `ROUNDS` consecutive rounds and return the chain and journal.
async fn replay(strategy: Strategy, failing_bets: &[Epoch]) -> (Arc<SimChain>, Arc<MemoryJournal>, Duration) {
    let chain = Arc::new(SimChain::new(failing_bets));
    let journal = Arc::new(MemoryJournal::default());

    let wait = WaitController::new(
        Duration::from_millis(270_000),
        Duration::from_millis(6_000),
        Duration::from_millis(6_000),
        Duration::from_secs(300),
    )
    .unwrap();

    let mut cycle = RoundCycle::new(
        Arc::clone(&chain),
        Arc::clone(&journal),
        10,
        wait,
        FeeCalculator::disabled(),
        CycleSettings {
            account: Address::repeat_byte(0x42),
            strategy,
            bet_amount: dec!(0.1),
            claims_enabled: true,
            fee_recipient: None,
            dry_run: false,
        },
    );

    let (round_tx, round_rx) = mpsc::channel(ROUNDS as usize);
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
    for epoch in FIRST_EPOCH..FIRST_EPOCH + ROUNDS {
        round_tx.send(epoch).await.unwrap();
    }
    drop(round_tx);

    // The feed runs dry at the end of the replay, which the loop reports.
    assert!(cycle.run(round_rx, shutdown_rx).await.is_err());
    let final_wait = cycle.wait_controller().current_wait();
    (chain, journal, final_wait)
}

#[tokio::test(start_paused = true)]
async fn test_every_won_round_claimed_exactly_once() {
    let (chain, journal, final_wait) = replay(Strategy::Contrarian, &[]).await;
    let state = chain.state.lock().unwrap();

    let last = FIRST_EPOCH + ROUNDS - 1;
    let expected: BTreeSet<Epoch> = state
        .bets
        .iter()
        .filter(|(epoch, (side, _))| **epoch + 2 <= last && *side == SimChain::winner(**epoch))
        .map(|(epoch, _)| *epoch)
        .collect();

    assert!(!expected.is_empty(), "simulation should produce winning rounds");
    assert_eq!(state.claimed, expected);

    let claimed_total: usize = state.claims.iter().map(|(_, e)| e.len()).sum();
    assert_eq!(claimed_total, expected.len(), "no epoch claimed twice");

    for (current, epochs) in &state.claims {
        assert!(epochs.windows(2).all(|w| w[0] < w[1]), "claims ascending: {epochs:?}");
        assert!(epochs.iter().all(|e| e + 2 <= *current), "claimed unsettled round");
    }

    assert_eq!(final_wait, Duration::from_millis(270_000));

    let bets = journal
        .load_all()
        .await
        .unwrap()
        .into_iter()
        .filter(|e| matches!(e.event, JournalEvent::Bet { .. }))
        .count();
    assert_eq!(bets, ROUNDS as usize);
}

#[tokio::test(start_paused = true)]
async fn test_failed_bets_drift_wait_and_are_never_claimed() {
    let failing = [103, 110, 111];
    let (chain, journal, final_wait) = replay(Strategy::Contrarian, &failing).await;
    let state = chain.state.lock().unwrap();

    assert_eq!(final_wait, Duration::from_millis(270_000 - 3 * 6_000));
    for epoch in failing {
        assert!(!state.bets.contains_key(&epoch));
        assert!(!state.claimed.contains(&epoch));
    }

    let failed = journal
        .load_all()
        .await
        .unwrap()
        .into_iter()
        .filter(|e| !e.success && matches!(e.event, JournalEvent::Bet { .. }))
        .count();
    assert_eq!(failed, failing.len());
}

#[tokio::test(start_paused = true)]
async fn test_strategies_bet_opposite_sides_every_round() {
    let (contrarian, _, _) = replay(Strategy::Contrarian, &[]).await;
    let (momentum, _, _) = replay(Strategy::Momentum, &[]).await;

    let a = contrarian.state.lock().unwrap();
    let b = momentum.state.lock().unwrap();

    assert_eq!(a.bets.len(), ROUNDS as usize);
    for (epoch, (side, _)) in &a.bets {
        let (other, _) = b.bets[epoch];
        assert_ne!(*side, other, "round {epoch}");
    }
}
