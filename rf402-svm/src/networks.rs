//! Solana clusters with a known USDC mint.

use solana_pubkey::{Pubkey, pubkey};

/// A Solana cluster refunds can be paid on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolanaCluster {
    /// V1 network name.
    pub name: &'static str,
    /// CAIP-2 reference (truncated genesis hash).
    pub reference: &'static str,
    /// Native Circle USDC mint.
    pub usdc_mint: Pubkey,
    /// Public RPC endpoint.
    pub default_rpc: &'static str,
}

impl SolanaCluster {
    /// The CAIP-2 identifier, e.g. `solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp`.
    #[must_use]
    pub fn caip2(&self) -> String {
        format!("solana:{}", self.reference)
    }
}

/// Solana mainnet-beta.
pub const SOLANA_MAINNET: SolanaCluster = SolanaCluster {
    name: "solana",
    reference: "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp",
    usdc_mint: pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
    default_rpc: "https://api.mainnet-beta.solana.com",
};

/// Solana devnet.
pub const SOLANA_DEVNET: SolanaCluster = SolanaCluster {
    name: "solana-devnet",
    reference: "EtWTRABZaYq6iMfeYKouRu166VU2xqa1",
    usdc_mint: pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU"),
    default_rpc: "https://api.devnet.solana.com",
};

/// Every cluster with a known USDC mint.
pub const KNOWN_CLUSTERS: &[SolanaCluster] = &[SOLANA_MAINNET, SOLANA_DEVNET];

/// Looks up a cluster by V1 name or CAIP-2 id.
///
/// `solana-mainnet` is an alias of `solana`. Testnet has no USDC mint and is
/// not known.
#[must_use]
pub fn lookup(network: &str) -> Option<&'static SolanaCluster> {
    let network = if network == "solana-mainnet" { "solana" } else { network };
    match network.strip_prefix("solana:") {
        Some(reference) => KNOWN_CLUSTERS.iter().find(|c| c.reference == reference),
        None => KNOWN_CLUSTERS.iter().find(|c| c.name == network),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("solana"), Some(&SOLANA_MAINNET));
        assert_eq!(lookup("solana-mainnet"), Some(&SOLANA_MAINNET));
        assert_eq!(lookup(&SOLANA_DEVNET.caip2()), Some(&SOLANA_DEVNET));
        assert_eq!(lookup("solana-devnet").map(|c| c.usdc_mint), Some(SOLANA_DEVNET.usdc_mint));
        assert!(lookup("solana-testnet").is_none());
        assert!(lookup("base").is_none());
    }
}
