//! USDC refunds on Solana.
//!
//! A refund transaction is a v0 message paid and signed by the refund keypair:
//!
//! 1. a compute-unit limit (and, when configured, a compute-unit price)
//! 2. an idempotent create of the recipient's associated token account
//! 3. `transfer_checked` of USDC from the keypair's token account
//!
//! The transaction is sent with `send_and_confirm_transaction` at `confirmed`
//! commitment. The reported cost is the base signature fee.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use rf402::executor::{ChainExecutor, CostEstimate, REFUND_TOKEN, TransferFailure, TransferReceipt};
use rf402::networks::NetworkId;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_commitment_config::CommitmentConfig;
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_keypair::Keypair;
use solana_message::VersionedMessage;
use solana_message::v0::Message as MessageV0;
use solana_pubkey::{Pubkey, pubkey};
use solana_signer::Signer;
use solana_transaction::versioned::VersionedTransaction;
use spl_token::solana_program::instruction::{AccountMeta, Instruction};
use url::Url;

use crate::error::SolanaExecutorError;
use crate::keypair::parse_keypair;
use crate::networks;

/// Associated Token Account program.
pub const ATA_PROGRAM: Pubkey = pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// System program.
pub const SYSTEM_PROGRAM: Pubkey = pubkey!("11111111111111111111111111111111");

/// Base fee per signature, in lamports.
pub const SIGNATURE_FEE_LAMPORTS: u64 = 5000;

/// Compute-unit limit for a create-account plus transfer.
pub const COMPUTE_UNIT_LIMIT: u32 = 60_000;

/// Native unit of the cost estimate.
pub const COST_UNIT: &str = "lamports";

/// Decimals of the USDC mint.
pub const USDC_DECIMALS: u8 = 6;

/// `CreateIdempotent` discriminator of the ATA program.
const CREATE_IDEMPOTENT: u8 = 1;

/// Derives the associated token account of `owner` for `mint` under the SPL Token program.
#[must_use]
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    let (address, _) = Pubkey::find_program_address(
        &[owner.as_ref(), spl_token::ID.as_ref(), mint.as_ref()],
        &ATA_PROGRAM,
    );
    address
}

/// Builds the ATA program's `CreateIdempotent` instruction.
#[must_use]
pub fn create_associated_token_account_idempotent(
    payer: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: ATA_PROGRAM,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(associated_token_address(owner, mint), false),
            AccountMeta::new_readonly(*owner, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM, false),
            AccountMeta::new_readonly(spl_token::ID, false),
        ],
        data: vec![CREATE_IDEMPOTENT],
    }
}

/// Instructions of a refund of `amount` USDC base units from `owner` to `recipient`.
///
/// # Errors
///
/// Returns [`SolanaExecutorError::Build`] if the SPL Token instruction cannot be built.
pub fn refund_instructions(
    owner: &Pubkey,
    recipient: &Pubkey,
    mint: &Pubkey,
    amount: u64,
    priority_fee_micro_lamports: u64,
) -> Result<Vec<Instruction>, SolanaExecutorError> {
    let mut instructions = vec![ComputeBudgetInstruction::set_compute_unit_limit(
        COMPUTE_UNIT_LIMIT,
    )];
    if priority_fee_micro_lamports > 0 {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_price(
            priority_fee_micro_lamports,
        ));
    }
    instructions.push(create_associated_token_account_idempotent(owner, recipient, mint));
    let transfer = spl_token::instruction::transfer_checked(
        &spl_token::ID,
        &associated_token_address(owner, mint),
        mint,
        &associated_token_address(recipient, mint),
        owner,
        &[],
        amount,
        USDC_DECIMALS,
    )
    .map_err(|e| SolanaExecutorError::Build(format!("{e}")))?;
    instructions.push(transfer);
    Ok(instructions)
}

/// [`ChainExecutor`] for Solana clusters.
pub struct SolanaExecutor {
    keypair: Keypair,
    clients: HashMap<&'static str, RpcClient>,
    priority_fee_micro_lamports: u64,
}

impl fmt::Debug for SolanaExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut clusters: Vec<_> = self.clients.keys().collect();
        clusters.sort_unstable();
        f.debug_struct("SolanaExecutor")
            .field("pubkey", &self.keypair.pubkey())
            .field("clusters", &clusters)
            .field("priority_fee_micro_lamports", &self.priority_fee_micro_lamports)
            .finish_non_exhaustive()
    }
}

impl SolanaExecutor {
    /// Creates an executor paying from `keypair` (base58 or JSON byte array).
    ///
    /// # Errors
    ///
    /// Returns [`SolanaExecutorError::InvalidKeypair`] if the keypair does not parse.
    pub fn new(keypair: &str) -> Result<Self, SolanaExecutorError> {
        Ok(Self::from_keypair(parse_keypair(keypair)?))
    }

    /// Creates an executor paying from an existing keypair.
    #[must_use]
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair,
            clients: HashMap::new(),
            priority_fee_micro_lamports: 0,
        }
    }

    /// Adds an RPC endpoint for `network` (V1 name or CAIP-2 id).
    ///
    /// # Errors
    ///
    /// Returns [`SolanaExecutorError::UnknownNetwork`] if the network has no
    /// known USDC mint.
    pub fn with_rpc(mut self, network: &str, rpc_url: &Url) -> Result<Self, SolanaExecutorError> {
        let cluster = networks::lookup(network)
            .ok_or_else(|| SolanaExecutorError::UnknownNetwork(network.to_owned()))?;
        let client =
            RpcClient::new_with_commitment(rpc_url.to_string(), CommitmentConfig::confirmed());
        tracing::info!(
            network = cluster.name,
            payer = %self.keypair.pubkey(),
            "Registered Solana refund cluster"
        );
        self.clients.insert(cluster.name, client);
        Ok(self)
    }

    /// Adds the cluster's public RPC endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SolanaExecutorError::UnknownNetwork`] if the network has no
    /// known USDC mint.
    pub fn with_default_rpc(self, network: &str) -> Result<Self, SolanaExecutorError> {
        let cluster = networks::lookup(network)
            .ok_or_else(|| SolanaExecutorError::UnknownNetwork(network.to_owned()))?;
        let url = Url::parse(cluster.default_rpc)
            .map_err(|e| SolanaExecutorError::Build(format!("{e}")))?;
        self.with_rpc(network, &url)
    }

    /// Sets the compute-unit price in micro-lamports. Zero omits the instruction.
    #[must_use]
    pub const fn with_priority_fee(mut self, micro_lamports: u64) -> Self {
        self.priority_fee_micro_lamports = micro_lamports;
        self
    }

    /// Public key refunds are paid from.
    #[must_use]
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Returns `true` if an RPC endpoint is configured for `network`.
    #[must_use]
    pub fn supports(&self, network: &str) -> bool {
        networks::lookup(network).is_some_and(|c| self.clients.contains_key(c.name))
    }

    async fn transfer(
        &self,
        network: &NetworkId,
        recipient: &str,
        amount_base_units: u64,
    ) -> Result<TransferReceipt, SolanaExecutorError> {
        let cluster = networks::lookup(network.as_str())
            .ok_or_else(|| SolanaExecutorError::UnknownNetwork(network.to_string()))?;
        let client = self
            .clients
            .get(cluster.name)
            .ok_or_else(|| SolanaExecutorError::NoRpcConfigured(network.to_string()))?;
        let recipient: Pubkey = recipient
            .trim()
            .parse()
            .map_err(|_| SolanaExecutorError::InvalidRecipient(recipient.to_owned()))?;

        let owner = self.keypair.pubkey();
        let instructions = refund_instructions(
            &owner,
            &recipient,
            &cluster.usdc_mint,
            amount_base_units,
            self.priority_fee_micro_lamports,
        )?;

        let blockhash = client.get_latest_blockhash().await?;
        let message = MessageV0::try_compile(&owner, &instructions, &[], blockhash)
            .map_err(|e| SolanaExecutorError::Build(format!("{e:?}")))?;
        let transaction =
            VersionedTransaction::try_new(VersionedMessage::V0(message), &[&self.keypair])
                .map_err(|e| SolanaExecutorError::Build(format!("{e}")))?;

        let signature = client.send_and_confirm_transaction(&transaction).await?;
        tracing::debug!(network = cluster.name, %signature, "Refund transfer confirmed");

        Ok(TransferReceipt {
            tx_id: signature.to_string(),
            network: network.to_string(),
            amount_raw: amount_base_units.to_string(),
            token: REFUND_TOKEN.to_owned(),
            cost_estimate: CostEstimate {
                native_amount: SIGNATURE_FEE_LAMPORTS.to_string(),
                unit: COST_UNIT.to_owned(),
            },
        })
    }
}

#[async_trait]
impl ChainExecutor for SolanaExecutor {
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
