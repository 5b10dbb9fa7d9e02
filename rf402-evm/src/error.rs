//! Error types for the EVM refund executor.

use alloy_primitives::TxHash;
use rf402::executor::TransferFailure;

/// Errors raised while building or running an [`EvmExecutor`](crate::EvmExecutor).
#[derive(Debug, thiserror::Error)]
pub enum EvmExecutorError {
    /// The signer key could not be parsed.
    #[error("invalid EVM private key: {0}")]
    InvalidPrivateKey(String),
    /// The network has no known USDC deployment.
    #[error("unknown EVM network {0}")]
    UnknownNetwork(String),
    /// No RPC endpoint was configured for the network.
    #[error("no RPC endpoint configured for {0}")]
    NoRpcConfigured(String),
    /// The recipient is not an EVM address.
    #[error("invalid EVM recipient {0:?}")]
    InvalidRecipient(String),
    /// Contract call or submission failed.
    #[error(transparent)]
    Contract(#[from] alloy_contract::Error),
    /// Waiting for the receipt failed or timed out.
    #[error(transparent)]
    PendingTransaction(#[from] alloy_provider::PendingTransactionError),
    /// The transfer was mined but reverted.
    #[error("transaction {0} reverted")]
    Reverted(TxHash),
}

impl EvmExecutorError {
    /// Whether the refund authority should redeliver the refund later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidPrivateKey(_)
            | Self::UnknownNetwork(_)
            | Self::NoRpcConfigured(_)
            | Self::InvalidRecipient(_) => false,
            Self::Contract(_) | Self::PendingTransaction(_) | Self::Reverted(_) => true,
        }
    }
}

impl From<EvmExecutorError> for TransferFailure {
    fn from(error: EvmExecutorError) -> Self {
        Self {
            retryable: error.is_retryable(),
            message: error.to_string(),
        }
    }
}
