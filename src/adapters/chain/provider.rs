//! BSC RPC Provider - alloy-rs 0.9 Connection Management
//!
//! Builds the signing provider used for every on-chain call. The
//! private key comes from the `PRIVATE_KEY` environment variable and
//! is never logged. The chain ID is checked at startup.
//!
//! The provider is kept as the concrete filler stack built by
//! `ProviderBuilder`, so `sol!` contract bindings can be created on it.

use alloy::network::{Ethereum, EthereumWallet};
use alloy::primitives::Address;
use alloy::providers::fillers::{FillProvider, JoinFill, RecommendedFillers, WalletFiller};
use alloy::providers::{Identity, Provider, ProviderBuilder, RootProvider};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::BoxTransport;
use anyhow::{Context, Result, bail};
use tracing::{info, instrument};

use crate::config::ChainConfig;

/// Environment variable holding the hex-encoded signing key.
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

/// Parse a hex private key, with or without `0x`.
pub fn parse_signer(private_key: &str) -> Result<PrivateKeySigner> {
    let key = private_key.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);
    key.parse::<PrivateKeySigner>()
        .context("PRIVATE_KEY is not a valid secp256k1 private key")
}

/// Gas, nonce and chain-id fillers plus the local wallet, over a boxed
/// HTTP/WS transport. Cloning is cheap (the RPC client is shared).
pub type SigningProvider = FillProvider<
    JoinFill<
        JoinFill<Identity, <Ethereum as RecommendedFillers>::RecommendedFillers>,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<BoxTransport>,
    BoxTransport,
    Ethereum,
>;

/// Shared signing provider for BNB Smart Chain.
pub struct BscProvider {
    provider: SigningProvider,
    account: Address,
}

impl BscProvider {
    /// Connect with `signer` and verify the configured chain ID.
    #[instrument(skip_all, fields(chain_id = config.chain_id))]
    pub async fn connect(config: &ChainConfig, signer: PrivateKeySigner) -> Result<Self> {
        let account = signer.address();
        let wallet = EthereumWallet::from(signer);

        let provider: SigningProvider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_builtin(&config.rpc_url)
            .await
            .context("Failed to connect to RPC endpoint")?;

        let chain_id = provider
            .get_chain_id()
            .await
            .context("Failed to query chain ID")?;

        if chain_id != config.chain_id {
            bail!(
                "Expected chain_id={}, RPC endpoint reports {chain_id}",
                config.chain_id
            );
        }

        info!(chain_id, %account, "Connected to BSC RPC");

        Ok(Self { provider, account })
    }

    /// Handle to the signing provider, sharing the same RPC client.
    pub fn inner(&self) -> SigningProvider {
        self.provider.clone()
    }

    /// Address derived from the signing key.
    pub fn account(&self) -> Address {
        self.account
    }

    /// Lightweight connectivity check.
    pub async fn is_healthy(&self) -> bool {
        self.provider.get_block_number().await.is_ok()
    }
}
