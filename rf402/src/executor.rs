//! The chain execution capability.
//!
//! Signing and broadcasting live in the chain crates (`rf402-evm`, `rf402-svm`).
//! The core only sees [`ChainExecutor`]: "send this many USDC base units to
//! this address on this network". [`ExecutorSet`] holds at most one executor
//! per [`NetworkFamily`] and dispatches on the family resolved when the
//! network id was created.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::networks::{NetworkFamily, NetworkId};

/// Token symbol refunds are paid in.
pub const REFUND_TOKEN: &str = "USDC";

/// Network fee paid for a transfer, in the chain's native unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    /// Amount in the smallest native unit, as a decimal string.
    pub native_amount: String,
    /// Unit name, e.g. `"wei"` or `"lamports"`.
    pub unit: String,
}

/// Proof of an executed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    /// Transaction hash or signature.
    pub tx_id: String,
    /// Network the transfer executed on.
    pub network: String,
    /// Amount in token base units, as a decimal string.
    pub amount_raw: String,
    /// Token symbol.
    pub token: String,
    /// Fee paid.
    pub cost_estimate: CostEstimate,
}

/// A failed transfer.
///
/// Retryable failures are left to the refund authority to re-deliver;
/// non-retryable ones are rejected immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct TransferFailure {
    /// Human-readable detail.
    pub message: String,
    /// Whether a later attempt may succeed.
    pub retryable: bool,
}

impl TransferFailure {
    /// A failure a later attempt may recover from.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    /// A failure that will not go away on retry, e.g. bad configuration.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// Executes USDC transfers on one family of networks.
#[async_trait]
pub trait ChainExecutor: Send + Sync {
    /// Transfers `amount_base_units` of USDC to `recipient` on `network`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferFailure`] classified as retryable or not.
    async fn transfer_token(
        &self,
        network: &NetworkId,
        recipient: &str,
        amount_base_units: u64,
    ) -> Result<TransferReceipt, TransferFailure>;
}

#[async_trait]
impl<T: ChainExecutor + ?Sized> ChainExecutor for Arc<T> {
    async fn transfer_token(
        &self,
        network: &NetworkId,
        recipient: &str,
        amount_base_units: u64,
    ) -> Result<TransferReceipt, TransferFailure> {
        (**self)
            .transfer_token(network, recipient, amount_base_units)
            .await
    }
}

/// Configured executors, at most one per family.
#[derive(Clone, Default)]
pub struct ExecutorSet {
    evm: Option<Arc<dyn ChainExecutor>>,
    solana: Option<Arc<dyn ChainExecutor>>,
}

impl fmt::Debug for ExecutorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorSet")
            .field("evm", &self.evm.is_some())
            .field("solana", &self.solana.is_some())
            .finish()
    }
}

impl ExecutorSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the EVM executor.
    #[must_use]
    pub fn with_evm(mut self, executor: impl ChainExecutor + 'static) -> Self {
        self.evm = Some(Arc::new(executor));
        self
    }

    /// Sets the Solana executor.
    #[must_use]
    pub fn with_solana(mut self, executor: impl ChainExecutor + 'static) -> Self {
        self.solana = Some(Arc::new(executor));
        self
    }

    /// Returns the executor for a family, if configured.
    #[must_use]
    pub fn get(&self, family: NetworkFamily) -> Option<&Arc<dyn ChainExecutor>> {
        match family {
            NetworkFamily::Evm => self.evm.as_ref(),
            NetworkFamily::Solana => self.solana.as_ref(),
            NetworkFamily::Unsupported => None,
        }
    }

    /// Returns the executor for a network, if its family is configured.
    #[must_use]
    pub fn for_network(&self, network: &NetworkId) -> Option<&Arc<dyn ChainExecutor>> {
        self.get(network.family())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    #[async_trait]
    impl ChainExecutor for Fixed {
        async fn transfer_token(
            &self,
            network: &NetworkId,
            _recipient: &str,
            amount_base_units: u64,
        ) -> Result<TransferReceipt, TransferFailure> {
            Ok(TransferReceipt {
                tx_id: self.0.to_owned(),
                network: network.to_string(),
                amount_raw: amount_base_units.to_string(),
                token: REFUND_TOKEN.to_owned(),
                cost_estimate: CostEstimate {
                    native_amount: "0".to_owned(),
                    unit: "wei".to_owned(),
                },
            })
        }
    }

    #[tokio::test]
    async fn test_dispatch_by_family() {
        let set = ExecutorSet::new().with_evm(Fixed("0xabc"));
        let base = NetworkId::new("base");
        let receipt = set
            .for_network(&base)
            .unwrap()
            .transfer_token(&base, "0x1", 10_000)
            .await
            .unwrap();
        assert_eq!(receipt.tx_id, "0xabc");
        assert_eq!(receipt.amount_raw, "10000");
        assert!(set.for_network(&NetworkId::new("solana")).is_none());
        assert!(set.for_network(&NetworkId::new("tron")).is_none());
    }

    #[test]
    fn test_receipt_wire_shape() {
        let receipt = TransferReceipt {
            tx_id: "sig".into(),
            network: "solana".into(),
            amount_raw: "5".into(),
            token: REFUND_TOKEN.into(),
            cost_estimate: CostEstimate {
                native_amount: "5000".into(),
                unit: "lamports".into(),
            },
        };
        let value = serde_json::to_value(&receipt).unwrap();
        assert_eq!(value["txId"], "sig");
        assert_eq!(value["costEstimate"]["nativeAmount"], "5000");
    }
}
