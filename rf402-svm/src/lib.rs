#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Solana refund executor for rf402.
//!
//! [`SolanaExecutor`] implements [`ChainExecutor`](rf402::ChainExecutor) for
//! Solana mainnet and devnet. Refunds are SPL Token `transfer_checked`
//! transfers of native USDC, preceded by an idempotent creation of the
//! recipient's associated token account.
//!
//! # Modules
//!
//! - [`error`] - [`SolanaExecutorError`] and its retry classification
//! - [`executor`] - Transaction construction and the executor
//! - [`keypair`] - Base58 and JSON keypair parsing
//! - [`networks`] - Known clusters and USDC mints

pub mod error;
pub mod executor;
pub mod keypair;
pub mod networks;

pub use error::SolanaExecutorError;
pub use executor::SolanaExecutor;
pub use keypair::parse_keypair;
pub use networks::{KNOWN_CLUSTERS, SolanaCluster};
