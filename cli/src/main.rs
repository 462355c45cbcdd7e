use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use dlmm_manager_sdk::{
    client::MAINNET_RPC,
    math::{BASIS_POINT_MAX, DEFAULT_BIN_RANGE, DEFAULT_SLIPPAGE_BPS},
    wallet, AddOptions, BalancedOptions, ImbalancedOptions, KeeperClient, LiquidityManager,
    MoveOptions, MoveProgress, OneSidedOptions, PoolSession, RemoveOptions, StrategyOverrides,
    StrategyType,
};
use serde_json::json;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
};
use tracing_subscriber::EnvFilter;

/// TRUMP/USDC pool used when no pool is given.
const DEFAULT_POOL: &str = "71HuFmuYAFEFUna2x2R4HJjrFNQHGuagW3gUMFToL9tk";

/// Seconds the cleanup command waits for Ctrl+C before acting.
const CLEANUP_GRACE_SECS: u64 = 5;

/// Expand `~/` to `$HOME/` in keypair paths.
fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        format!("{}/{}", std::env::var("HOME").unwrap_or_default(), rest)
    } else {
        path.to_string()
    }
}

fn load_keypair(path: &str) -> Result<Keypair> {
    let expanded = expand_home(path);
    read_keypair_file(&expanded).map_err(|e| {
        anyhow!(
            "Failed to load keypair from '{}': {}\n  \
             Set KEYPAIR_PATH or pass --keypair to specify a different path.",
            expanded,
            e
        )
    })
}

fn parse_pubkeys(keys: &[String]) -> Result<Option<Vec<Pubkey>>> {
    if keys.is_empty() {
        return Ok(None);
    }
    keys.iter()
        .map(|k| Pubkey::from_str(k).map_err(|_| anyhow!("Invalid position address '{k}'")))
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

fn print_banner() {
    let ver = env!("CARGO_PKG_VERSION");
    println!();
    println!("  DLMM Manager  v{ver}  ·  liquidity orchestration for Meteora DLMM");
    println!("  {}", "─".repeat(62));
    println!("  Program   {}", dlmm_manager_sdk::instructions::DLMM_PROGRAM_ID);
    println!("  Analytics {}", dlmm_manager_sdk::keeper::BASE_URL);
    println!();
}

// ─── CLI definition ───────────────────────────────────────────────────────────

/// DLMM Manager — remove, add, move, swap and analyse Meteora DLMM liquidity.
///
/// Every command supports --json for machine-readable output.
/// Global options can also be set via environment variables:
///   SOLANA_RPC_URL  — Solana JSON-RPC endpoint
///   KEYPAIR_PATH    — path to the wallet keypair JSON
///   DLMM_API_URL    — analytics API origin
#[derive(Parser)]
#[command(name = "dlmm-manager", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Solana JSON-RPC endpoint
    #[arg(long, global = true, value_name = "URL", default_value = MAINNET_RPC, env = "SOLANA_RPC_URL")]
    rpc_url: String,

    /// Path to the wallet's Ed25519 keypair JSON file
    #[arg(long, global = true, value_name = "PATH", default_value = "./id.json", env = "KEYPAIR_PATH")]
    keypair: String,

    /// DLMM analytics API origin
    #[arg(
        long,
        global = true,
        value_name = "URL",
        default_value = dlmm_manager_sdk::keeper::BASE_URL,
        env = "DLMM_API_URL"
    )]
    analytics_url: String,

    /// Output machine-readable JSON instead of human-readable text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Shape {
    Balanced,
    Imbalanced,
    OneSided,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove ALL liquidity and close ALL positions in a pool
    #[command(after_help = "\
EXAMPLES:
  dlmm-manager cleanup
  dlmm-manager cleanup <POOL> --yes")]
    Cleanup {
        /// Pool address
        #[arg(default_value = DEFAULT_POOL)]
        pool: String,

        /// Skip the 5 second abort window
        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    /// List the wallet's positions and their bins
    Positions {
        #[arg(long, default_value = DEFAULT_POOL)]
        pool: String,
    },

    /// Show the pool's active bin
    ActiveBin {
        #[arg(long, default_value = DEFAULT_POOL)]
        pool: String,
    },

    /// Deposit around the active bin by strategy
    Add {
        #[arg(long, default_value = DEFAULT_POOL)]
        pool: String,

        /// Token X amount in atomic units (default: 100 whole tokens)
        #[arg(long)]
        x_amount: Option<u64>,

        /// Token Y amount in atomic units (default: 0)
        #[arg(long)]
        y_amount: Option<u64>,

        /// Bins on each side of the active bin
        #[arg(long, default_value_t = DEFAULT_BIN_RANGE)]
        bin_range: i32,

        /// Spot, Curve or BidAsk
        #[arg(long, default_value = "Spot")]
        strategy: StrategyType,

        /// Override the computed lower bin
        #[arg(long, allow_hyphen_values = true)]
        min_bin: Option<i32>,

        /// Override the computed upper bin
        #[arg(long, allow_hyphen_values = true)]
        max_bin: Option<i32>,

        /// Deposit into this existing position instead of opening one
        #[arg(long)]
        position: Option<String>,
    },

    /// Open a balanced, imbalanced or one-sided position
    CreatePosition {
        #[arg(long, default_value = DEFAULT_POOL)]
        pool: String,

        #[arg(long, value_enum, default_value = "balanced")]
        shape: Shape,

        /// Token X amount (balanced / imbalanced), atomic units
        #[arg(long)]
        x_amount: Option<u64>,

        /// Token Y amount (imbalanced), atomic units
        #[arg(long)]
        y_amount: Option<u64>,

        /// Deposited amount (one-sided), atomic units
        #[arg(long)]
        amount: Option<u64>,

        #[arg(long, default_value_t = DEFAULT_BIN_RANGE)]
        bin_range: i32,

        #[arg(long, default_value = "Spot")]
        strategy: StrategyType,

        /// One-sided: deposit token Y above the active bin instead of X below it
        #[arg(long, default_value_t = false)]
        y_side: bool,

        /// One-sided: shift the whole window by this many bins
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i32,
    },

    /// Withdraw a fraction of every bin from positions
    Remove {
        #[arg(long, default_value = DEFAULT_POOL)]
        pool: String,

        /// Target position (repeatable; default: all owned)
        #[arg(long = "position")]
        positions: Vec<String>,

        /// Fraction to remove in basis points (10000 = 100%)
        #[arg(long, default_value_t = BASIS_POINT_MAX)]
        bps: u16,

        /// Do not claim fees and close the position afterwards
        #[arg(long, default_value_t = false)]
        keep_open: bool,
    },

    /// Swap an exact input amount
    Swap {
        #[arg(long, default_value = DEFAULT_POOL)]
        pool: String,

        /// Input amount in atomic units
        #[arg(long)]
        amount: u64,

        /// Sell token Y for token X (default sells X for Y)
        #[arg(long, default_value_t = false)]
        y_to_x: bool,

        #[arg(long, default_value_t = DEFAULT_SLIPPAGE_BPS)]
        slippage_bps: u16,
    },

    /// Claim accumulated swap fees
    ClaimFees {
        #[arg(long, default_value = DEFAULT_POOL)]
        pool: String,

        #[arg(long = "position")]
        positions: Vec<String>,
    },

    /// Close positions and reclaim rent
    Close {
        #[arg(long, default_value = DEFAULT_POOL)]
        pool: String,

        #[arg(long = "position")]
        positions: Vec<String>,
    },

    /// Remove liquidity from one pool and deposit it into another
    Move {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        #[arg(long, default_value_t = BASIS_POINT_MAX)]
        bps: u16,

        /// Token X amount for the deposit, atomic units
        #[arg(long)]
        x_amount: Option<u64>,

        #[arg(long)]
        y_amount: Option<u64>,

        #[arg(long, default_value_t = DEFAULT_BIN_RANGE)]
        bin_range: i32,

        #[arg(long, default_value = "Spot")]
        strategy: StrategyType,
    },

    /// SOL and pool-token balances of the wallet
    Balance {
        #[arg(long, default_value = DEFAULT_POOL)]
        pool: String,
    },

    /// Request SOL from the cluster faucet (devnet / testnet)
    Airdrop {
        #[arg(long, default_value_t = 1.0)]
        sol: f64,
    },

    /// Protocol-wide analytics
    Metrics,

    /// Analytics for one pair
    Pair {
        address: String,

        /// Also fetch fee / volume / TVL series for this many days
        #[arg(long)]
        days: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().len() == 1 {
        print_banner();
        Cli::command().print_long_help().ok();
        println!();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Cleanup { pool, yes } => cmd_cleanup(&cli, pool, *yes).await?,
        Commands::Positions { pool } => cmd_positions(&cli, pool).await?,
        Commands::ActiveBin { pool } => cmd_active_bin(&cli, pool).await?,
        Commands::Add { pool, x_amount, y_amount, bin_range, strategy, min_bin, max_bin, position } => {
            let existing_position = position
                .as_deref()
                .map(Pubkey::from_str)
                .transpose()
                .map_err(|_| anyhow!("Invalid position address"))?;
            let options = AddOptions {
                x_amount: *x_amount,
                y_amount: *y_amount,
                bin_range: *bin_range,
                strategy_type: *strategy,
                strategy_params: StrategyOverrides { min_bin_id: *min_bin, max_bin_id: *max_bin },
                existing_position,
            };
            cmd_add(&cli, pool, options).await?
        }
        Commands::CreatePosition { pool, shape, x_amount, y_amount, amount, bin_range, strategy, y_side, offset } => {
            let args = PositionArgs {
                shape: *shape,
                x_amount: *x_amount,
                y_amount: *y_amount,
                amount: *amount,
                bin_range: *bin_range,
                strategy: *strategy,
                is_x_side: !*y_side,
                offset: *offset,
            };
            cmd_create_position(&cli, pool, args).await?
        }
        Commands::Remove { pool, positions, bps, keep_open } => {
            let options = RemoveOptions {
                target_positions: parse_pubkeys(positions)?,
                bps_to_remove: *bps,
                claim_and_close: !*keep_open,
            };
            cmd_remove(&cli, pool, options).await?
        }
        Commands::Swap { pool, amount, y_to_x, slippage_bps } => {
            cmd_swap(&cli, pool, *amount, !*y_to_x, *slippage_bps).await?
        }
        Commands::ClaimFees { pool, positions } => {
            cmd_claim_fees(&cli, pool, parse_pubkeys(positions)?).await?
        }
        Commands::Close { pool, positions } => cmd_close(&cli, pool, parse_pubkeys(positions)?).await?,
        Commands::Move { from, to, bps, x_amount, y_amount, bin_range, strategy } => {
            let options = MoveOptions {
                remove: RemoveOptions { bps_to_remove: *bps, ..RemoveOptions::default() },
                add: AddOptions {
                    x_amount: *x_amount,
                    y_amount: *y_amount,
                    bin_range: *bin_range,
                    strategy_type: *strategy,
                    ..AddOptions::default()
                },
            };
            cmd_move(&cli, from, to, options).await?
        }
        Commands::Balance { pool } => cmd_balance(&cli, pool).await?,
        Commands::Airdrop { sol } => cmd_airdrop(&cli, *sol).await?,
        Commands::Metrics => cmd_metrics(&cli).await?,
        Commands::Pair { address, days } => cmd_pair(&cli, address, *days).await?,
    }

    Ok(())
}

// ─── Shared setup ─────────────────────────────────────────────────────────────

/// Connect and register every pool the command touches.
async fn open(cli: &Cli, pools: &[&str]) -> Result<(LiquidityManager, PoolSession)> {
    let (manager, mut session) = LiquidityManager::connect(cli.rpc_url.clone());
    for pool in pools {
        session
            .ensure_initialized(pool)
            .await
            .with_context(|| format!("Cannot load pool '{pool}' from {}", cli.rpc_url))?;
    }
    Ok((manager, session))
}

fn rpc(url: &str) -> RpcClient {
    RpcClient::new_with_commitment(url.to_string(), CommitmentConfig::confirmed())
}

fn base_decimals(session: &PoolSession, pool: &str) -> Result<u8> {
    Ok(session.get_handle(pool)?.token_x().decimals)
}

// ─── cleanup ──────────────────────────────────────────────────────────────────

async fn cmd_cleanup(cli: &Cli, pool: &str, yes: bool) -> Result<()> {
    let payer = load_keypair(&cli.keypair)?;
    println!("─── DLMM Position Cleanup ────────────────────────────────────────");
    println!("  Wallet           {}", payer.pubkey());
    println!("  Pool             {pool}");

    let (manager, session) = open(cli, &[pool]).await?;
    let positions = manager.user_positions(&session, pool, &payer.pubkey()).await?;
    println!("  Positions        {}", positions.len());

    if positions.is_empty() {
        println!();
        println!("  No positions to clean up.");
        return Ok(());
    }
    for (i, p) in positions.iter().enumerate() {
        let bins: Vec<String> = p.bin_ids().iter().map(|b| b.to_string()).collect();
        println!("  {:>3}. {}", i + 1, p.public_key);
        println!("       Bins  {}", bins.join(", "));
    }

    if !yes {
        println!();
        println!("  WARNING: this removes ALL liquidity and closes ALL positions.");
        println!("  Press Ctrl+C now to abort, or wait {CLEANUP_GRACE_SECS} seconds to continue...");
        tokio::time::sleep(Duration::from_secs(CLEANUP_GRACE_SECS)).await;
    }

    let outcome = manager
        .remove_liquidity(&session, &payer, pool, RemoveOptions::default())
        .await
        .context("Cleanup failed")?;
    let remaining = manager.user_positions(&session, pool, &payer.pubkey()).await?;

    if cli.json {
        println!("{}", json!({
            "status":    "ok",
            "command":   "cleanup",
            "pool":      pool,
            "result":    outcome,
            "remaining": remaining.len(),
        }));
    } else {
        println!();
        if let Some(outcome) = &outcome {
            println!("  {}", outcome.message);
            for sig in &outcome.signatures {
                println!("  Transaction      {sig}");
            }
        }
        println!("  Remaining        {}", remaining.len());
        println!();
        println!("  Cleanup complete. All funds should now be back in your wallet.");
    }
    Ok(())
}

// ─── positions ────────────────────────────────────────────────────────────────

async fn cmd_positions(cli: &Cli, pool: &str) -> Result<()> {
    let payer = load_keypair(&cli.keypair)?;
    let (manager, session) = open(cli, &[pool]).await?;
    let positions = manager.user_positions(&session, pool, &payer.pubkey()).await?;

    if cli.json {
        println!("{}", json!({
            "pool":      pool,
            "owner":     payer.pubkey().to_string(),
            "positions": positions,
        }));
        return Ok(());
    }

    println!("─── My Positions ─────────────────────────────────────────────────");
    if positions.is_empty() {
        println!("  No positions in pool {pool}.");
        return Ok(());
    }
    for p in &positions {
        let data = &p.position_data;
        println!("  Position         {}", p.public_key);
        println!("  Bins             [{}, {}]", data.lower_bin_id, data.upper_bin_id);
        println!("  Pending fee X    {:>20}", data.fee_x);
        println!("  Pending fee Y    {:>20}", data.fee_y);
        println!();
    }
    Ok(())
}

// ─── active-bin ───────────────────────────────────────────────────────────────

async fn cmd_active_bin(cli: &Cli, pool: &str) -> Result<()> {
    let (manager, session) = open(cli, &[pool]).await?;
    let active = manager.active_bin(&session, pool).await?;

    if cli.json {
        println!("{}", json!({ "poolAddress": pool, "activeBin": active }));
    } else {
        println!("─── Active Bin ───────────────────────────────────────────────────");
        println!("  Pool             {pool}");
        println!("  Bin id           {}", active.bin_id);
    }
    Ok(())
}

// ─── add / create-position ────────────────────────────────────────────────────

async fn cmd_add(cli: &Cli, pool: &str, options: AddOptions) -> Result<()> {
    let payer = load_keypair(&cli.keypair)?;
    let (manager, session) = open(cli, &[pool]).await?;
    let decimals = base_decimals(&session, pool)?;
    let outcome = manager.add_liquidity(&session, &payer, pool, decimals, options).await?;
    print_outcome(cli, "add", "Liquidity Added", pool, Some(&outcome));
    Ok(())
}

struct PositionArgs {
    shape:     Shape,
    x_amount:  Option<u64>,
    y_amount:  Option<u64>,
    amount:    Option<u64>,
    bin_range: i32,
    strategy:  StrategyType,
    is_x_side: bool,
    offset:    i32,
}

async fn cmd_create_position(cli: &Cli, pool: &str, args: PositionArgs) -> Result<()> {
    let payer = load_keypair(&cli.keypair)?;
    let (manager, session) = open(cli, &[pool]).await?;
    let decimals = base_decimals(&session, pool)?;

    let outcome = match args.shape {
        Shape::Balanced => {
            let options = BalancedOptions {
                x_amount:      args.x_amount,
                bin_range:     args.bin_range,
                strategy_type: args.strategy,
            };
            manager.create_balanced_position(&session, &payer, pool, decimals, options).await?
        }
        Shape::Imbalanced => {
            let options = ImbalancedOptions {
                x_amount:      args.x_amount,
                y_amount:      args.y_amount,
                bin_range:     args.bin_range,
                strategy_type: args.strategy,
            };
            manager.create_imbalanced_position(&session, &payer, pool, decimals, options).await?
        }
        Shape::OneSided => {
            let options = OneSidedOptions {
                amount:    args.amount,
                bin_range: args.bin_range,
                is_x_side: args.is_x_side,
                offset:    args.offset,
            };
            manager.create_one_sided_position(&session, &payer, pool, options).await?
        }
    };
    print_outcome(cli, "create-position", "Position Created", pool, Some(&outcome));
    Ok(())
}

// ─── remove / claim-fees / close ──────────────────────────────────────────────

async fn cmd_remove(cli: &Cli, pool: &str, options: RemoveOptions) -> Result<()> {
    let payer = load_keypair(&cli.keypair)?;
    let (manager, session) = open(cli, &[pool]).await?;
    let outcome = manager.remove_liquidity(&session, &payer, pool, options).await?;
    print_outcome(cli, "remove", "Liquidity Removed", pool, outcome.as_ref());
    Ok(())
}

async fn cmd_claim_fees(cli: &Cli, pool: &str, targets: Option<Vec<Pubkey>>) -> Result<()> {
    let payer = load_keypair(&cli.keypair)?;
    let (manager, session) = open(cli, &[pool]).await?;
    let outcome = manager.claim_swap_fees(&session, &payer, pool, targets).await?;
    print_outcome(cli, "claim-fees", "Fees Claimed", pool, outcome.as_ref());
    Ok(())
}

async fn cmd_close(cli: &Cli, pool: &str, targets: Option<Vec<Pubkey>>) -> Result<()> {
    let payer = load_keypair(&cli.keypair)?;
    let (manager, session) = open(cli, &[pool]).await?;
    let outcome = manager.close_positions(&session, &payer, pool, targets).await?;
    print_outcome(cli, "close", "Positions Closed", pool, outcome.as_ref());
    Ok(())
}

fn print_outcome(
    cli:     &Cli,
    command: &str,
    title:   &str,
    pool:    &str,
    outcome: Option<&dlmm_manager_sdk::BatchOutcome>,
) {
    if cli.json {
        println!("{}", json!({
            "status":  "ok",
            "command": command,
            "pool":    pool,
            "result":  outcome,
        }));
        return;
    }

    println!("─── {title} {}", "─".repeat(60usize.saturating_sub(title.len())));
    println!("  Pool             {pool}");
    let Some(outcome) = outcome else {
        println!("  No positions to act on.");
        return;
    };
    println!("  Result           {}", outcome.message);
    for p in &outcome.positions {
        println!("  Position         {p}");
    }
    for p in &outcome.skipped {
        println!("  Skipped          {p}  (no longer owned)");
    }
    for sig in &outcome.signatures {
        println!("  Transaction      {sig}");
    }
}

// ─── swap ─────────────────────────────────────────────────────────────────────

async fn cmd_swap(cli: &Cli, pool: &str, amount: u64, is_x_to_y: bool, slippage_bps: u16) -> Result<()> {
    if amount == 0 {
        return Err(anyhow!("--amount must be > 0"));
    }
    let payer = load_keypair(&cli.keypair)?;
    let (manager, session) = open(cli, &[pool]).await?;
    let sig = manager
        .swap(&session, &payer, pool, amount, is_x_to_y, slippage_bps)
        .await
        .context("swap transaction failed")?;

    if cli.json {
        println!("{}", json!({
            "status":       "ok",
            "command":      "swap",
            "pool":         pool,
            "amount_in":    amount,
            "x_to_y":       is_x_to_y,
            "slippage_bps": slippage_bps,
            "tx":           sig.to_string(),
        }));
    } else {
        println!("─── Swap Executed ────────────────────────────────────────────────");
        println!("  Pool             {pool}");
        println!("  Direction        {}", if is_x_to_y { "X → Y" } else { "Y → X" });
        println!("  Amount in        {:>20}", amount);
        println!("  Max slippage     {:>19.2}%", slippage_bps as f64 / 100.0);
        println!("  Transaction      {sig}");
    }
    Ok(())
}

// ─── move ─────────────────────────────────────────────────────────────────────

async fn cmd_move(cli: &Cli, from: &str, to: &str, options: MoveOptions) -> Result<()> {
    let payer = load_keypair(&cli.keypair)?;
    let (manager, session) = open(cli, &[from, to]).await?;
    let decimals = base_decimals(&session, to)?;

    let mut progress = MoveProgress::default();
    let result = manager
        .move_funds(&session, &payer, from, to, decimals, options, &mut progress)
        .await;
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) if progress.removal_complete => {
            return Err(anyhow!(e).context(format!(
                "Liquidity was removed from {from} but not deposited into {to}. \
                 Run `dlmm-manager add --pool {to}` to redeposit."
            )));
        }
        Err(e) => return Err(e.into()),
    };

    if cli.json {
        println!("{}", json!({ "status": "ok", "command": "move", "result": outcome }));
    } else {
        println!("─── Funds Moved ──────────────────────────────────────────────────");
        println!("  From             {from}");
        println!("  To               {to}");
        println!("  Result           {}", outcome.message);
        let removal_txs = outcome.removal.as_ref().map(|r| r.signatures.len()).unwrap_or(0);
        println!("  Removal txs      {removal_txs}");
        for sig in &outcome.addition.signatures {
            println!("  Deposit tx       {sig}");
        }
    }
    Ok(())
}

// ─── balance / airdrop ────────────────────────────────────────────────────────

async fn cmd_balance(cli: &Cli, pool: &str) -> Result<()> {
    let payer = load_keypair(&cli.keypair)?;
    let owner = payer.pubkey();
    let (_, session) = open(cli, &[pool]).await?;
    let handle = session.get_handle(pool)?;
    let client = rpc(&cli.rpc_url);

    let sol = wallet::sol_balance(&client, &owner).await?;
    let x = wallet::ata_ui_balance(&client, &owner, &handle.token_x().mint).await?;
    let y = wallet::ata_ui_balance(&client, &owner, &handle.token_y().mint).await?;

    if cli.json {
        println!("{}", json!({
            "owner":   owner.to_string(),
            "sol":     sol,
            "token_x": { "mint": handle.token_x().mint.to_string(), "balance": x },
            "token_y": { "mint": handle.token_y().mint.to_string(), "balance": y },
        }));
    } else {
        let show = |b: Option<f64>| b.map(|v| format!("{v:>20.6}")).unwrap_or_else(|| format!("{:>20}", "no account"));
        println!("─── Wallet Balance ───────────────────────────────────────────────");
        println!("  Wallet           {owner}");
        println!("  SOL              {sol:>20.9}");
        println!("  Token X          {}  ({})", show(x), handle.token_x().mint);
        println!("  Token Y          {}  ({})", show(y), handle.token_y().mint);
    }
    Ok(())
}

async fn cmd_airdrop(cli: &Cli, sol: f64) -> Result<()> {
    let payer = load_keypair(&cli.keypair)?;
    let client = rpc(&cli.rpc_url);
    let sig = wallet::request_airdrop(&client, &payer.pubkey(), sol)
        .await
        .context("Failed to request airdrop")?;

    if cli.json {
        println!("{}", json!({ "status": "ok", "command": "airdrop", "sol": sol, "tx": sig.to_string() }));
    } else {
        println!("─── Airdrop ──────────────────────────────────────────────────────");
        println!("  Wallet           {}", payer.pubkey());
        println!("  Amount           {sol} SOL");
        println!("  Transaction      {sig}");
    }
    Ok(())
}

// ─── analytics ────────────────────────────────────────────────────────────────

async fn cmd_metrics(cli: &Cli) -> Result<()> {
    let keeper = KeeperClient::with_base_url(cli.analytics_url.clone());
    let metrics = keeper.protocol_metrics().await.context("Failed to fetch protocol metrics")?;

    if cli.json {
        println!("{metrics}");
    } else {
        println!("─── Protocol Metrics ─────────────────────────────────────────────");
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    }
    Ok(())
}

async fn cmd_pair(cli: &Cli, address: &str, days: Option<u32>) -> Result<()> {
    let keeper = KeeperClient::with_base_url(cli.analytics_url.clone());
    let pair = keeper.pair(address).await.context("Failed to fetch pair")?;

    let series = match days {
        Some(days) => Some(json!({
            "fee_bps": keeper.pair_fee_bps_by_days(address, days).await?,
            "volume":  keeper.pair_daily_trade_volume_by_days(address, days).await?,
            "tvl":     keeper.pair_tvl_by_days(address, days).await?,
        })),
        None => None,
    };

    if cli.json {
        println!("{}", json!({ "pair": pair, "series": series }));
    } else {
        println!("─── Pair: {address} ───");
        println!("{}", serde_json::to_string_pretty(&pair)?);
        if let Some(series) = series {
            println!();
            println!("{}", serde_json::to_string_pretty(&series)?);
        }
    }
    Ok(())
}
