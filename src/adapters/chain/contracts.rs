//! PancakeSwap Prediction V2 Contract - `PredictionMarket` over alloy-rs
//!
//! Implements the `PredictionMarket` port against the Prediction V2
//! contract on BNB Smart Chain. The contract address comes from
//! `config.toml` and is checked for deployed code at startup.
//!
//! View calls share a `governor` rate limiter so a claim scan over the
//! lookback window cannot burst past the RPC provider's quota.

use std::num::NonZeroU32;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::sol;
use alloy::transports::BoxTransport;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use crate::domain::round::{BetSide, Epoch, PoolTotals, Round};
use crate::ports::prediction_market::{ClaimPayout, ClaimReceipt, PredictionMarket, TxOutcome};

use super::provider::{BscProvider, SigningProvider};
use super::units::{from_wei, to_u64, to_wei};

sol! {
    /// Subset of the PancakePredictionV2 ABI used by the bot.
    #[sol(rpc)]
    contract PancakePredictionV2 {
        event StartRound(uint256 indexed epoch);
        event Claim(address indexed sender, uint256 indexed epoch, uint256 amount);

        function currentEpoch() external view returns (uint256);
        function bufferSeconds() external view returns (uint256);

        function rounds(uint256) external view returns (
            uint256 epoch,
            uint256 startTimestamp,
            uint256 lockTimestamp,
            uint256 closeTimestamp,
            int256 lockPrice,
            int256 closePrice,
            uint256 lockOracleId,
            uint256 closeOracleId,
            uint256 totalAmount,
            uint256 bullAmount,
            uint256 bearAmount,
            uint256 rewardBaseCalAmount,
            uint256 rewardAmount,
            bool oracleCalled
        );

        function ledger(uint256 epoch, address user) external view returns (
            uint8 position,
            uint256 amount,
            bool claimed
        );

        function claimable(uint256 epoch, address user) external view returns (bool);
        function refundable(uint256 epoch, address user) external view returns (bool);

        function betBull(uint256 epoch) external payable;
        function betBear(uint256 epoch) external payable;
        function claim(uint256[] calldata epochs) external;
    }
}

pub(crate) type PredictionInstance =
    PancakePredictionV2::PancakePredictionV2Instance<BoxTransport, SigningProvider>;

/// Prediction V2 binding implementing `PredictionMarket`.
pub struct PredictionContract {
    provider: SigningProvider,
    address: Address,
    /// Account that bets, claims and pays fees.
    account: Address,
    /// Contract's refund grace period after a round closes.
    buffer_seconds: u64,
    limiter: DefaultDirectRateLimiter,
}

impl PredictionContract {
    /// Bind the contract at `address` and validate it on-chain.
    ///
    /// Fails if no code is deployed there or `bufferSeconds()` cannot be read.
    #[instrument(skip(provider), fields(account = %provider.account()))]
    pub async fn connect(
        provider: &BscProvider,
        address: Address,
        reads_per_second: u32,
    ) -> Result<Self> {
        let inner = provider.inner();

        let code = inner
            .get_code_at(address)
            .await
            .with_context(|| format!("Failed to query code at {address}"))?;
        if code.is_empty() {
            bail!("Prediction contract at {address} has no deployed code, check config.toml");
        }

        let contract: PredictionInstance = PancakePredictionV2::new(address, inner.clone());
        let buffer = contract
            .bufferSeconds()
            .call()
            .await
            .context("bufferSeconds() call failed")?
            ._0;
        let buffer_seconds = to_u64(buffer, "bufferSeconds")?;

        let rps = NonZeroU32::new(reads_per_second).context("rpc_requests_per_second must be positive")?;
        let limiter = RateLimiter::direct(Quota::per_second(rps));

        info!(%address, buffer_seconds, "Validated prediction contract on-chain");

        Ok(Self {
            provider: inner,
            address,
            account: provider.account(),
            buffer_seconds,
            limiter,
        })
    }

    fn contract(&self) -> PredictionInstance {
        PancakePredictionV2::new(self.address, self.provider.clone())
    }

    /// Wait for a read slot.
    async fn throttle(&self) {
        self.limiter.until_ready().await;
    }

    /// Decode this account's `Claim` events from a claim receipt.
    fn claim_payouts(&self, receipt: &TransactionReceipt) -> Result<Vec<ClaimPayout>> {
        let mut payouts = Vec::new();
        for log in receipt.inner.logs() {
            let Ok(decoded) = log.log_decode::<PancakePredictionV2::Claim>() else {
                continue;
            };
            let claim = &decoded.inner.data;
            if claim.sender != self.account {
                continue;
            }
            payouts.push(ClaimPayout {
                epoch: to_u64(claim.epoch, "Claim.epoch")?,
                amount: from_wei(claim.amount)?,
            });
        }
        Ok(payouts)
    }
}

/// Fail on a reverted receipt, otherwise summarize it.
fn confirmed(receipt: &TransactionReceipt, action: &str) -> Result<TxOutcome> {
    let tx_hash = receipt.transaction_hash.to_string();
    if !receipt.status() {
        bail!("{action} transaction {tx_hash} reverted");
    }
    Ok(TxOutcome {
        tx_hash,
        gas_used: u64::try_from(receipt.gas_used).unwrap_or(u64::MAX),
    })
}

#[async_trait]
impl PredictionMarket for PredictionContract {
    #[instrument(skip(self))]
    async fn round(&self, epoch: Epoch) -> Result<Round> {
        self.throttle().await;
        let r = self
            .contract()
            .rounds(U256::from(epoch))
            .call()
            .await
            .with_context(|| format!("rounds({epoch}) call failed"))?;

        Ok(Round {
            epoch,
            start_timestamp: to_u64(r.startTimestamp, "startTimestamp")?,
            lock_timestamp: to_u64(r.lockTimestamp, "lockTimestamp")?,
            close_timestamp: to_u64(r.closeTimestamp, "closeTimestamp")?,
            pools: PoolTotals {
                bull: from_wei(r.bullAmount)?,
                bear: from_wei(r.bearAmount)?,
            },
            oracle_called: r.oracleCalled,
        })
    }

    /// Decided from the round already read plus `bufferSeconds`; no RPC.
    async fn is_round_resolved(&self, round: &Round) -> Result<bool> {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        Ok(round.is_resolved_at(now, self.buffer_seconds))
    }

    #[instrument(skip(self))]
    async fn has_unclaimed_position(&self, epoch: Epoch, account: Address) -> Result<bool> {
        let contract = self.contract();
        let e = U256::from(epoch);

        self.throttle().await;
        let ledger = contract
            .ledger(e, account)
            .call()
            .await
            .with_context(|| format!("ledger({epoch}) call failed"))?;
        if ledger.amount.is_zero() || ledger.claimed {
            return Ok(false);
        }

        self.throttle().await;
        let won = contract
            .claimable(e, account)
            .call()
            .await
            .with_context(|| format!("claimable({epoch}) call failed"))?
            ._0;
        if won {
            return Ok(true);
        }

        self.throttle().await;
        let refund = contract
            .refundable(e, account)
            .call()
            .await
            .with_context(|| format!("refundable({epoch}) call failed"))?
            ._0;
        Ok(refund)
    }

    #[instrument(skip(self), fields(%side, %amount))]
    async fn submit_wager(&self, epoch: Epoch, side: BetSide, amount: Decimal) -> Result<TxOutcome> {
        let value = to_wei(amount)?;
        let contract = self.contract();
        let e = U256::from(epoch);

        let pending = match side {
            BetSide::Bull => contract.betBull(e).value(value).send().await,
            BetSide::Bear => contract.betBear(e).value(value).send().await,
        }
        .with_context(|| format!("Failed to send {side} bet for round {epoch}"))?;

        debug!(tx_hash = %pending.tx_hash(), "Bet submitted, waiting for receipt");

        let receipt = pending
            .get_receipt()
            .await
            .context("Failed to fetch bet receipt")?;
        confirmed(&receipt, "bet")
    }

    #[instrument(skip(self), fields(count = epochs.len()))]
    async fn submit_claim(&self, epochs: &[Epoch]) -> Result<ClaimReceipt> {
        let ids: Vec<U256> = epochs.iter().map(|e| U256::from(*e)).collect();

        let receipt = self
            .contract()
            .claim(ids)
            .send()
            .await
            .context("Failed to send claim")?
            .get_receipt()
            .await
            .context("Failed to fetch claim receipt")?;
        let outcome = confirmed(&receipt, "claim")?;

        Ok(ClaimReceipt {
            tx_hash: outcome.tx_hash,
            payouts: self.claim_payouts(&receipt)?,
        })
    }

    #[instrument(skip(self), fields(%to, %amount))]
    async fn transfer_value(&self, to: Address, amount: Decimal) -> Result<TxOutcome> {
        let tx = TransactionRequest::default()
            .with_from(self.account)
            .with_to(to)
            .with_value(to_wei(amount)?);

        let receipt = self
            .provider
            .send_transaction(tx)
            .await
            .context("Failed to send value transfer")?
            .get_receipt()
            .await
            .context("Failed to fetch transfer receipt")?;
        confirmed(&receipt, "transfer")
    }
}
