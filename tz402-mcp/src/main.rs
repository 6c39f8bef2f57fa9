//! Tezos wallet MCP server.
//!
//! # Usage
//!
//! ```bash
//! # Run with default config (tz402.toml in current directory)
//! cargo run -p tz402-mcp --release
//!
//! # Run with a custom config path
//! tz402-mcp --config /path/to/tz402.toml
//!
//! # Configure logging level (logs go to stderr)
//! RUST_LOG=debug tz402-mcp
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to the TOML configuration file (default: `tz402.toml`)
//! - `TEZOS_RPC_URL`, `TEZOS_SIGNER_URL`, `TEZOS_ADDRESS`, `TEZOS_NETWORK`
//! - `RUST_LOG` - Log level filter (default: `info`)
//!
//! A `.env` file in the working directory is loaded first.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tz402_http::PaymentRetryFlow;
use tz402_tezos::{LedgerClient, RemoteSigner, RpcLedger, TezosRpc};

use tz402_mcp::config::DEFAULT_CONFIG_PATH;
use tz402_mcp::{McpServer, ServerConfig, ToolContext, tools};

/// MCP server exposing a Tezos wallet and the HTTP 402 payment flow.
#[derive(Parser, Debug)]
#[command(name = "tz402-mcp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli).await {
        tracing::error!("Server failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::load_from(&cli.config)?;
    let address = config.address()?;
    tracing::info!(
        network = %config.network,
        address = %address,
        confirmations = config.confirmations,
        "Loaded configuration"
    );

    let rpc = TezosRpc::new(config.rpc_url()?, config.rpc_timeout())?;
    let signer = RemoteSigner::new(&config.signer_url()?, &address, config.rpc_timeout())?;
    let ledger: Arc<dyn LedgerClient> = Arc::new(
        RpcLedger::new(rpc, Arc::new(signer), address)
            .with_fees(config.fees)
            .with_confirmation_policy(config.confirmation),
    );

    if config.token.is_none() {
        tracing::warn!("No token contract configured; transfer_token will fail");
    }
    if config.swap.is_none() {
        tracing::warn!("No swap contract configured; swap_xtz_for_tokens will fail");
    }

    let flow = PaymentRetryFlow::new(Arc::clone(&ledger)).with_config(config.flow_config());
    let context = ToolContext {
        ledger,
        network: config.network.clone(),
        confirmations: config.confirmations,
        token: config.token.clone(),
        swap: config.swap.clone(),
    };
    let registry = tools::registry(Arc::new(context), Arc::new(flow));
    tracing::info!(tools = ?registry.names(), "Serving on stdio");

    McpServer::new(registry).run_stdio().await?;
    Ok(())
}
