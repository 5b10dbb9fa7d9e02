//! Agent configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! [channel]
//! url = "wss://refunds.example.com/ws"
//! apiKey = "$RF402_API_KEY"
//!
//! [refunds]
//! maxRefundUsd = 0.50
//! dailyCapUsd = 25
//!
//! [[refunds.endpoints]]
//! pattern = "/api/search*"
//! triggers = { serverError = true, emptyResponse = true, minMeaningfulness = 0.6 }
//!
//! [evm]
//! privateKey = "$EVM_REFUND_KEY"
//!
//! [evm.rpc]
//! base = "https://mainnet.base.org"
//!
//! [solana]
//! privateKey = "${SOLANA_REFUND_KEY}"
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to configuration file (default: `rf402.toml`)
//! - Signer keys and the API key referenced by `$VAR` in the config file

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rf402::RefundConfig;
use serde::Deserialize;
use url::Url;

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "rf402.toml";

/// Errors raised while loading an [`AgentConfig`].
#[derive(Debug, thiserror::Error)]
pub enum AgentConfigError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level agent configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    /// Connection to the refund authority.
    pub channel: ChannelSection,

    /// Local refund policy.
    #[serde(default)]
    pub refunds: RefundConfig,

    /// EVM executor; EVM refunds are unsupported without it.
    #[serde(default)]
    pub evm: Option<EvmSection>,

    /// Solana executor; Solana refunds are unsupported without it.
    #[serde(default)]
    pub solana: Option<SolanaSection>,

    /// Where refund outcome events go. Without it they are only logged.
    #[serde(default)]
    pub events: Option<EventsSection>,
}

/// `[channel]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSection {
    /// WebSocket endpoint of the refund authority.
    pub url: Url,
    /// API key sent as the `apiKey` query parameter.
    pub api_key: String,
    /// Seconds between heartbeat pings (default: `30`).
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    /// Seconds a single refund execution may take (default: `120`).
    #[serde(default = "default_execution_timeout_secs")]
    pub execution_timeout_secs: u64,
}

impl ChannelSection {
    /// Heartbeat interval as a [`Duration`].
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Execution timeout as a [`Duration`].
    #[must_use]
    pub const fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout_secs)
    }
}

/// `[evm]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmSection {
    /// Hex private key of the refund wallet.
    /// Supports `$VAR` / `${VAR}` for environment variable expansion.
    pub private_key: String,
    /// Seconds to wait for a transfer receipt (default: `60`).
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
    /// RPC endpoint per network name or CAIP-2 id.
    #[serde(default)]
    pub rpc: BTreeMap<String, Url>,
}

/// `[solana]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolanaSection {
    /// Keypair as base58 or a JSON byte array.
    /// Supports `$VAR` / `${VAR}` for environment variable expansion.
    pub private_key: String,
    /// Compute unit price in micro-lamports (default: none).
    #[serde(default)]
    pub priority_fee_micro_lamports: u64,
    /// RPC endpoint per cluster. Clusters left out use the public endpoint.
    #[serde(default)]
    pub rpc: BTreeMap<String, Url>,
}

/// `[events]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsSection {
    /// Collector accepting JSON event batches.
    pub url: Url,
    /// Bearer token for the collector.
    #[serde(default)]
    pub api_key: Option<String>,
}

const fn default_heartbeat_interval_secs() -> u64 {
    30
}

const fn default_execution_timeout_secs() -> u64 {
    120
}

const fn default_receipt_timeout_secs() -> u64 {
    60
}

impl AgentConfig {
    /// Loads configuration from `path`, expanding `$VAR` / `${VAR}` references
    /// from the process environment first.
    ///
    /// # Errors
    ///
    /// Returns [`AgentConfigError::Read`] if the file cannot be read and
    /// [`AgentConfigError::Parse`] if it does not match the schema.
    pub fn load_from(path: &Path) -> Result<Self, AgentConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| AgentConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&content, |name| std::env::var(name).ok())
    }

    /// Parses configuration text, resolving variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentConfigError::Parse`] if the expanded text does not match
    /// the schema.
    pub fn parse(
        content: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AgentConfigError> {
        let expanded = expand_vars(content, lookup);
        Ok(toml::from_str(&expanded)?)
    }
}

/// Whether a secret still holds an unexpanded `$VAR` reference or nothing at all.
#[must_use]
pub fn is_unresolved(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.starts_with('$')
}

/// Expands `$VAR` and `${VAR}` patterns through `lookup`.
///
/// Unresolved variables are left as-is.
fn expand_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        let braced = chars.next_if_eq(&'{').is_some();
        let mut name = String::new();
        let mut closed = false;
        while let Some(&c) = chars.peek() {
            if braced && c == '}' {
                chars.next();
                closed = true;
                break;
            }
            if !braced && !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            name.push(c);
            chars.next();
        }

        match (name.is_empty(), lookup(&name)) {
            (false, Some(value)) => result.push_str(&value),
            _ => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&name);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    result
}
