//! USDC refunds on EVM chains.
//!
//! One local signer pays refunds on every configured chain. Each chain gets
//! its own alloy provider with the recommended filler stack (gas, nonce,
//! chain id) and the signer's wallet. A refund is a plain ERC-20
//! `transfer(recipient, amount)` on the chain's USDC contract; the executor
//! waits for the receipt and reports `gasUsed × effectiveGasPrice` as the cost.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use alloy_network::{EthereumWallet, ReceiptResponse};
use alloy_primitives::{Address, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use rf402::executor::{ChainExecutor, CostEstimate, REFUND_TOKEN, TransferFailure, TransferReceipt};
use rf402::networks::NetworkId;
use url::Url;

use crate::contract::IERC20;
use crate::error::EvmExecutorError;
use crate::networks::{self, EvmNetwork};

/// Default time to wait for a transfer receipt.
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Native unit of the cost estimate.
pub const COST_UNIT: &str = "wei";

/// [`ChainExecutor`] for EVM networks.
pub struct EvmExecutor {
    wallet: EthereumWallet,
    signer_address: Address,
    providers: HashMap<u64, DynProvider>,
    receipt_timeout: Duration,
}

impl fmt::Debug for EvmExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chains: Vec<_> = self.providers.keys().collect();
        chains.sort_unstable();
        f.debug_struct("EvmExecutor")
            .field("signer_address", &self.signer_address)
            .field("chains", &chains)
            .field("receipt_timeout", &self.receipt_timeout)
            .finish_non_exhaustive()
    }
}

impl EvmExecutor {
    /// Creates an executor signing with `private_key` (hex, with or without `0x`).
    ///
    /// No chain is reachable until [`with_rpc`](Self::with_rpc) adds one.
    ///
    /// # Errors
    ///
    /// Returns [`EvmExecutorError::InvalidPrivateKey`] if the key does not parse.
    pub fn new(private_key: &str) -> Result<Self, EvmExecutorError> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .map_err(|e| EvmExecutorError::InvalidPrivateKey(format!("{e}")))?;
        let signer_address = signer.address();
        Ok(Self {
            wallet: EthereumWallet::from(signer),
            signer_address,
            providers: HashMap::new(),
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        })
    }

    /// Adds an HTTP RPC endpoint for `network` (V1 name or `eip155:<id>`).
    ///
    /// # Errors
    ///
    /// Returns [`EvmExecutorError::UnknownNetwork`] if the network has no
    /// known USDC deployment.
    pub fn with_rpc(mut self, network: &str, rpc_url: Url) -> Result<Self, EvmExecutorError> {
        let chain = networks::lookup(network)
            .ok_or_else(|| EvmExecutorError::UnknownNetwork(network.to_owned()))?;
        let provider = ProviderBuilder::new()
            .wallet(self.wallet.clone())
            .connect_http(rpc_url)
            .erased();
        tracing::info!(
            network = chain.name,
            chain_id = chain.chain_id,
            signer = %self.signer_address,
            "Registered EVM refund chain"
        );
        self.providers.insert(chain.chain_id, provider);
        Ok(self)
    }

    /// Sets how long to wait for a transfer receipt.
    #[must_use]
    pub const fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// Address refunds are paid from.
    #[must_use]
    pub const fn signer_address(&self) -> Address {
        self.signer_address
    }

    /// Returns `true` if an RPC endpoint is configured for `network`.
    #[must_use]
    pub fn supports(&self, network: &str) -> bool {
        networks::lookup(network).is_some_and(|n| self.providers.contains_key(&n.chain_id))
    }

    fn provider_for(&self, network: &str) -> Result<(&'static EvmNetwork, &DynProvider), EvmExecutorError> {
        let chain = networks::lookup(network)
            .ok_or_else(|| EvmExecutorError::UnknownNetwork(network.to_owned()))?;
        let provider = self
            .providers
            .get(&chain.chain_id)
            .ok_or_else(|| EvmExecutorError::NoRpcConfigured(network.to_owned()))?;
        Ok((chain, provider))
    }

    async fn transfer(
        &self,
        network: &NetworkId,
        recipient: &str,
        amount_base_units: u64,
    ) -> Result<TransferReceipt, EvmExecutorError> {
        let (chain, provider) = self.provider_for(network.as_str())?;
        let to: Address = recipient
            .trim()
            .parse()
            .map_err(|_| EvmExecutorError::InvalidRecipient(recipient.to_owned()))?;

        let token = IERC20::new(chain.usdc, provider);
        let pending = token
            .transfer(to, U256::from(amount_base_units))
            .send()
            .await?;
        let tx_hash = *pending.tx_hash();
        tracing::debug!(network = chain.name, %tx_hash, "Refund transfer submitted");

        let receipt = pending
            .with_timeout(Some(self.receipt_timeout))
            .get_receipt()
            .await?;
        if !receipt.status() {
            return Err(EvmExecutorError::Reverted(tx_hash));
        }

        let cost = U256::from(receipt.gas_used()) * U256::from(receipt.effective_gas_price());
        Ok(TransferReceipt {
            tx_id: tx_hash.to_string(),
            network: network.to_string(),
            amount_raw: amount_base_units.to_string(),
            token: REFUND_TOKEN.to_owned(),
            cost_estimate: CostEstimate {
                native_amount: cost.to_string(),
                unit: COST_UNIT.to_owned(),
            },
        })
    }
}

#[async_trait]
impl ChainExecutor for EvmExecutor {
    async fn transfer_token(
        &self,
        network: &NetworkId,
        recipient: &str,
        amount_base_units: u64,
    ) -> Result<TransferReceipt, TransferFailure> {
        self.transfer(network, recipient, amount_base_units)
            .await
            .map_err(TransferFailure::from)
    }
}
