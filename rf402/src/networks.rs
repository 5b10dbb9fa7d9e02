//! Network family classification.
//!
//! Refund instructions name their network with a free-form string: either a
//! V1 human-readable name (`"base-sepolia"`, `"solana-devnet"`) or a CAIP-2 id
//! (`"eip155:8453"`, `"solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp"`). The string is
//! classified once into a [`NetworkFamily`] when it enters the system, so
//! executors dispatch on a closed enum instead of re-parsing prefixes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// V1 names of EVM networks with a known USDC deployment.
pub const EVM_NETWORK_NAMES: &[&str] = &[
    "base",
    "base-sepolia",
    "ethereum",
    "sepolia",
    "polygon",
    "polygon-amoy",
    "avalanche",
    "avalanche-fuji",
    "arbitrum",
    "arbitrum-sepolia",
    "optimism",
    "optimism-sepolia",
    "celo",
];

/// V1 names of Solana clusters.
pub const SOLANA_NETWORK_NAMES: &[&str] =
    &["solana", "solana-devnet", "solana-testnet", "solana-mainnet"];

/// The chain family a network belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkFamily {
    /// EIP-155 chains.
    Evm,
    /// Solana clusters.
    Solana,
    /// Anything this crate cannot refund on.
    Unsupported,
}

impl NetworkFamily {
    /// Classifies a network string.
    #[must_use]
    pub fn classify(network: &str) -> Self {
        if network.starts_with("eip155:") || EVM_NETWORK_NAMES.contains(&network) {
            Self::Evm
        } else if network.starts_with("solana:") || SOLANA_NETWORK_NAMES.contains(&network) {
            Self::Solana
        } else {
            Self::Unsupported
        }
    }
}

impl fmt::Display for NetworkFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Evm => "evm",
            Self::Solana => "solana",
            Self::Unsupported => "unsupported",
        })
    }
}

/// A network string paired with its family.
///
/// Serializes as the plain string; the family is recomputed on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NetworkId {
    name: String,
    family: NetworkFamily,
}

impl NetworkId {
    /// Creates a network id, classifying it.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let family = NetworkFamily::classify(&name);
        Self { name, family }
    }

    /// The network string as received.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// The classified family.
    #[must_use]
    pub const fn family(&self) -> NetworkFamily {
        self.family
    }
}

impl From<String> for NetworkId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for NetworkId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<NetworkId> for String {
    fn from(value: NetworkId) -> Self {
        value.name
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_evm() {
        for name in ["base", "base-sepolia", "celo", "eip155:8453", "eip155:1"] {
            assert_eq!(NetworkFamily::classify(name), NetworkFamily::Evm, "{name}");
        }
    }

    #[test]
    fn test_classify_solana() {
        for name in [
            "solana",
            "solana-devnet",
            "solana-mainnet",
            "solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp",
        ] {
            assert_eq!(NetworkFamily::classify(name), NetworkFamily::Solana, "{name}");
        }
    }

    #[test]
    fn test_classify_unsupported() {
        for name in ["bitcoin", "", "Base", "eip155", "solana-localnet", "cosmos:hub"] {
            assert_eq!(
                NetworkFamily::classify(name),
                NetworkFamily::Unsupported,
                "{name}"
            );
        }
    }

    #[test]
    fn test_network_id_serde_is_plain_string() {
        let id: NetworkId = serde_json::from_str("\"solana-devnet\"").unwrap();
        assert_eq!(id.family(), NetworkFamily::Solana);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"solana-devnet\"");
    }
}
