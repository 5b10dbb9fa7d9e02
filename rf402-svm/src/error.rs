//! Error types for the Solana refund executor.

use rf402::executor::TransferFailure;
use solana_client::client_error::ClientError;

/// Errors raised while building or running a [`SolanaExecutor`](crate::SolanaExecutor).
#[derive(Debug, thiserror::Error)]
pub enum SolanaExecutorError {
    /// The keypair is neither base58 nor a JSON byte array of 64 bytes.
    #[error("invalid Solana keypair: {0}")]
    InvalidKeypair(String),
    /// The network has no known USDC mint.
    #[error("unknown Solana network {0}")]
    UnknownNetwork(String),
    /// No RPC endpoint was configured for the network.
    #[error("no RPC endpoint configured for {0}")]
    NoRpcConfigured(String),
    /// The recipient is not a base58 public key.
    #[error("invalid Solana recipient {0:?}")]
    InvalidRecipient(String),
    /// An instruction, message or signature could not be built.
    #[error("failed to build refund transaction: {0}")]
    Build(String),
    /// The RPC node rejected or failed the request.
    #[error("Solana RPC error: {0}")]
    Rpc(#[source] Box<ClientError>),
}

impl From<ClientError> for SolanaExecutorError {
    fn from(error: ClientError) -> Self {
        Self::Rpc(Box::new(error))
    }
}

impl SolanaExecutorError {
    /// Whether the refund authority should redeliver the refund later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}

impl From<SolanaExecutorError> for TransferFailure {
    fn from(error: SolanaExecutorError) -> Self {
        Self {
            retryable: error.is_retryable(),
            message: error.to_string(),
        }
    }
}
