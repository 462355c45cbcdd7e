use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dlmm_manager_api::{routes, AppState};
use dlmm_manager_sdk::{client::MAINNET_RPC, keeper::BASE_URL, KeeperClient, LiquidityManager};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Read-only HTTP facade over Meteora DLMM pools and the DLMM analytics API.
#[derive(Parser)]
#[command(name = "dlmm-manager-api", version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Solana JSON-RPC endpoint used to load pools
    #[arg(long, env = "SOLANA_RPC_URL", default_value = MAINNET_RPC)]
    rpc_url: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Analytics API origin
    #[arg(long, env = "DLMM_API_URL", default_value = BASE_URL)]
    analytics_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let ip: IpAddr = args
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", args.bind))?;
    let addr = SocketAddr::new(ip, args.port);

    // The server never signs, so only the pool session is kept.
    let (_, session) = LiquidityManager::connect(args.rpc_url.clone());
    let state = Arc::new(AppState::new(session, KeeperClient::with_base_url(args.analytics_url)));

    info!(rpc = %args.rpc_url, "Server running on port {}", args.port);
    warp::serve(routes(state)).run(addr).await;
    Ok(())
}
