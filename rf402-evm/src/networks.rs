//! Known EVM networks and their USDC deployments.
//!
//! Each entry is addressable by its V1 name (`"base"`) or its CAIP-2 id
//! (`"eip155:8453"`).

use alloy_primitives::{Address, address};

/// An EVM chain refunds can be paid on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvmNetwork {
    /// V1 network name.
    pub name: &'static str,
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// USDC contract on this chain.
    pub usdc: Address,
}

impl EvmNetwork {
    /// The CAIP-2 identifier, e.g. `eip155:8453`.
    #[must_use]
    pub fn caip2(&self) -> String {
        format!("eip155:{}", self.chain_id)
    }
}

/// Base Mainnet chain ID.
pub const BASE_MAINNET: u64 = 8453;
/// Base Sepolia chain ID.
pub const BASE_SEPOLIA: u64 = 84532;
/// Ethereum Mainnet chain ID.
pub const ETHEREUM_MAINNET: u64 = 1;
/// Ethereum Sepolia chain ID.
pub const ETHEREUM_SEPOLIA: u64 = 11_155_111;
/// Polygon Mainnet chain ID.
pub const POLYGON_MAINNET: u64 = 137;
/// Polygon Amoy chain ID.
pub const POLYGON_AMOY: u64 = 80002;
/// Avalanche C-Chain chain ID.
pub const AVALANCHE_MAINNET: u64 = 43114;
/// Avalanche Fuji chain ID.
pub const AVALANCHE_FUJI: u64 = 43113;
/// Arbitrum One chain ID.
pub const ARBITRUM_MAINNET: u64 = 42161;
/// Arbitrum Sepolia chain ID.
pub const ARBITRUM_SEPOLIA: u64 = 421_614;
/// OP Mainnet chain ID.
pub const OPTIMISM_MAINNET: u64 = 10;
/// OP Sepolia chain ID.
pub const OPTIMISM_SEPOLIA: u64 = 11_155_420;
/// Celo Mainnet chain ID.
pub const CELO_MAINNET: u64 = 42220;

/// Every EVM network with a known USDC deployment.
pub const KNOWN_NETWORKS: &[EvmNetwork] = &[
    EvmNetwork {
        name: "base",
        chain_id: BASE_MAINNET,
        usdc: address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
    },
    EvmNetwork {
        name: "base-sepolia",
        chain_id: BASE_SEPOLIA,
        usdc: address!("036CbD53842c5426634e7929541eC2318f3dCF7e"),
    },
    EvmNetwork {
        name: "ethereum",
        chain_id: ETHEREUM_MAINNET,
        usdc: address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
    },
    EvmNetwork {
        name: "sepolia",
        chain_id: ETHEREUM_SEPOLIA,
        usdc: address!("1c7D4B196Cb0C7B01d743Fbc6116a902379C7238"),
    },
    EvmNetwork {
        name: "polygon",
        chain_id: POLYGON_MAINNET,
        usdc: address!("3c499c542cEF5E3811e1192ce70d8cC03d5c3359"),
    },
    EvmNetwork {
        name: "polygon-amoy",
        chain_id: POLYGON_AMOY,
        usdc: address!("41E94Eb71Ef8C9fAE0235d1e472b21E21B5a4dbF"),
    },
    EvmNetwork {
        name: "avalanche",
        chain_id: AVALANCHE_MAINNET,
        usdc: address!("B97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E"),
    },
    EvmNetwork {
        name: "avalanche-fuji",
        chain_id: AVALANCHE_FUJI,
        usdc: address!("5425890298aed601595a70AB815c96711a31Bc65"),
    },
    EvmNetwork {
        name: "arbitrum",
        chain_id: ARBITRUM_MAINNET,
        usdc: address!("af88d065e77c8cC2239327C5EDb3A432268e5831"),
    },
    EvmNetwork {
        name: "arbitrum-sepolia",
        chain_id: ARBITRUM_SEPOLIA,
        usdc: address!("75faf114eafb1BDbe2F0316DF893fd58CE46AA4d"),
    },
    EvmNetwork {
        name: "optimism",
        chain_id: OPTIMISM_MAINNET,
        usdc: address!("0b2C639c533813f4Aa9D7837CAf62653d097Ff85"),
    },
    EvmNetwork {
        name: "optimism-sepolia",
        chain_id: OPTIMISM_SEPOLIA,
        usdc: address!("5fd84259d66Cd46123540766Be93DFE6D43130D7"),
    },
    EvmNetwork {
        name: "celo",
        chain_id: CELO_MAINNET,
        usdc: address!("cebA9300f2b948710d2653dD7B07f33A8B32118C"),
    },
];

/// Looks up a network by V1 name or `eip155:<chain id>`.
#[must_use]
pub fn lookup(network: &str) -> Option<&'static EvmNetwork> {
    if let Some(reference) = network.strip_prefix("eip155:") {
        let chain_id: u64 = reference.parse().ok()?;
        return KNOWN_NETWORKS.iter().find(|n| n.chain_id == chain_id);
    }
    KNOWN_NETWORKS.iter().find(|n| n.name == network)
}

#[cfg(test)]
mod tests {
    use rf402::networks::{EVM_NETWORK_NAMES, NetworkFamily};

    use super::*;

    #[test]
    fn test_lookup_by_name_and_caip2() {
        let base = lookup("base").unwrap();
        assert_eq!(base.chain_id, BASE_MAINNET);
        assert_eq!(lookup("eip155:8453"), Some(base));
        assert_eq!(base.caip2(), "eip155:8453");
        assert!(lookup("eip155:999999").is_none());
        assert!(lookup("eip155:base").is_none());
        assert!(lookup("solana").is_none());
    }

    #[test]
    fn test_every_evm_name_has_usdc() {
        for name in EVM_NETWORK_NAMES {
            let network = lookup(name).unwrap_or_else(|| panic!("no USDC for {name}"));
            assert_ne!(network.usdc, Address::ZERO);
            assert_eq!(NetworkFamily::classify(&network.caip2()), NetworkFamily::Evm);
        }
    }
}
