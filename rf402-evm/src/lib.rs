#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! EIP-155 (EVM) refund executor for rf402.
//!
//! [`EvmExecutor`] implements [`ChainExecutor`](rf402::ChainExecutor) for every
//! EVM network with a known USDC deployment. Refunds are ERC-20 transfers
//! signed by a single local key.
//!
//! # Modules
//!
//! - [`contract`] - The ERC-20 interface
//! - [`error`] - [`EvmExecutorError`] and its retry classification
//! - [`executor`] - The executor
//! - [`networks`] - Known chains and USDC contracts

pub mod contract;
pub mod error;
pub mod executor;
pub mod networks;

pub use error::EvmExecutorError;
pub use executor::EvmExecutor;
pub use networks::{EvmNetwork, KNOWN_NETWORKS};
