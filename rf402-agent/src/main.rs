//! rf402 refund agent.
//!
//! # Usage
//!
//! ```bash
//! # Run with default config (rf402.toml in current directory)
//! cargo run -p rf402-agent --release
//!
//! # Run with custom config path
//! CONFIG=/path/to/rf402.toml cargo run -p rf402-agent
//!
//! # Configure logging level
//! RUST_LOG=rf402_channel=debug,info cargo run -p rf402-agent
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to TOML configuration file (default: `rf402.toml`)
//! - `RUST_LOG` - Log level filter (default: `info`)

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use rf402::ExecutorSet;
use rf402_channel::{ChannelConfig, RefundChannel, RefundProcessor, WsTransport};
use tracing_subscriber::EnvFilter;

use rf402_agent::config::{AgentConfig, DEFAULT_CONFIG_PATH, is_unresolved};
use rf402_agent::{HttpEventSink, LogEventSink, SigDown, SinkHooks};

/// Executes refunds issued by an x402 refund authority.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, short, env = "CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    if let Err(e) = run(args).await {
        tracing::error!("Refund agent failed: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = AgentConfig::load_from(&args.config)?;
    tracing::info!(
        path = %args.config.display(),
        url = %config.channel.url,
        endpoints = config.refunds.endpoints.len(),
        "Loaded configuration"
    );

    let executors = executors(&config)?;
    if executors.get(rf402::NetworkFamily::Evm).is_none()
        && executors.get(rf402::NetworkFamily::Solana).is_none()
    {
        tracing::warn!("No chain executors configured; every refund will be rejected");
    }

    let hooks = match &config.events {
        Some(events) => {
            tracing::info!(url = %events.url, "Forwarding refund events");
            SinkHooks::new(HttpEventSink::new(events.url.clone(), events.api_key.clone()))
        }
        None => SinkHooks::new(LogEventSink),
    };

    let processor = RefundProcessor::new(config.refunds.clone(), executors)?
        .with_hooks(hooks)
        .with_execution_timeout(config.channel.execution_timeout());

    let mut channel_config =
        ChannelConfig::new(config.channel.url.clone(), config.channel.api_key.clone());
    channel_config.heartbeat_interval = config.channel.heartbeat_interval();

    let sig_down = SigDown::try_new()?;
    let channel = RefundChannel::new(channel_config, WsTransport, Arc::new(processor))
        .with_shutdown_token(sig_down.cancellation_token());

    let result = channel.run().await;
    sig_down.finish().await;
    result?;

    tracing::info!("Refund agent shut down gracefully");
    Ok(())
}

/// Builds the chain executors from the `[evm]` and `[solana]` sections.
///
/// A section whose private key is still an unexpanded `$VAR` is skipped with a
/// warning, leaving that chain family unsupported.
fn executors(config: &AgentConfig) -> Result<ExecutorSet, Box<dyn std::error::Error>> {
    #[cfg_attr(
        not(any(feature = "chain-evm", feature = "chain-solana")),
        allow(unused_mut)
    )]
    let mut set = ExecutorSet::new();

    if let Some(evm) = &config.evm {
        if is_unresolved(&evm.private_key) {
            tracing::warn!("Skipping EVM refunds: privateKey not resolved (missing env var?)");
        } else {
            #[cfg(feature = "chain-evm")]
            {
                let mut executor = rf402_evm::EvmExecutor::new(&evm.private_key)?
                    .with_receipt_timeout(std::time::Duration::from_secs(evm.receipt_timeout_secs));
                for (network, url) in &evm.rpc {
                    executor = executor.with_rpc(network, url.clone())?;
                }
                if evm.rpc.is_empty() {
                    tracing::warn!("EVM signer configured without [evm.rpc] endpoints");
                }
                tracing::info!(signer = %executor.signer_address(), "EVM refunds enabled");
                set = set.with_evm(executor);
            }
            #[cfg(not(feature = "chain-evm"))]
            tracing::warn!("Ignoring [evm]: built without the chain-evm feature");
        }
    }

    if let Some(solana) = &config.solana {
        if is_unresolved(&solana.private_key) {
            tracing::warn!("Skipping Solana refunds: privateKey not resolved (missing env var?)");
        } else {
            #[cfg(feature = "chain-solana")]
            {
                let mut executor = rf402_svm::SolanaExecutor::new(&solana.private_key)?
                    .with_priority_fee(solana.priority_fee_micro_lamports);
                for (network, url) in &solana.rpc {
                    executor = executor.with_rpc(network, url)?;
                }
                for cluster in rf402_svm::KNOWN_CLUSTERS {
                    if !executor.supports(cluster.name) {
                        executor = executor.with_default_rpc(cluster.name)?;
                    }
                }
                tracing::info!(payer = %executor.pubkey(), "Solana refunds enabled");
                set = set.with_solana(executor);
            }
            #[cfg(not(feature = "chain-solana"))]
            tracing::warn!("Ignoring [solana]: built without the chain-solana feature");
        }
    }

    Ok(set)
}
