//! DLMM Manager Rust SDK
//!
//! Liquidity orchestration for Meteora DLMM pools on Solana: remove, add,
//! migrate, swap, claim and close, with a read-only client for the DLMM
//! analytics API alongside.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use dlmm_manager_sdk::{AddOptions, LiquidityManager, RemoveOptions};
//! use solana_sdk::signature::Keypair;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (manager, mut session) = LiquidityManager::connect("https://api.mainnet-beta.solana.com");
//!     let keypair = Keypair::new(); // use a funded keypair
//!     let pool = "71HuFmuYAFEFUna2x2R4HJjrFNQHGuagW3gUMFToL9tk";
//!
//!     // 1. Register the pool once per process
//!     session.ensure_initialized(pool).await?;
//!
//!     // 2. Withdraw everything and close the positions
//!     manager.remove_liquidity(&session, &keypair, pool, RemoveOptions::default()).await?;
//!
//!     // 3. Redeposit 100 whole X tokens around the active bin
//!     let out = manager.add_liquidity(&session, &keypair, pool, 6, AddOptions::default()).await?;
//!     println!("{}: {:?}", out.message, out.signatures);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Feature Overview
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`PoolSession::ensure_initialized`] | Load and cache a pool handle |
//! | [`LiquidityManager::remove_liquidity`] | Withdraw a bps fraction from every bin of each position |
//! | [`LiquidityManager::add_liquidity`] | Deposit around the active bin by strategy |
//! | [`LiquidityManager::create_one_sided_position`] | Single-token deposit on one side of the price |
//! | [`LiquidityManager::swap`] | Quoted exact-in swap with a slippage guard |
//! | [`LiquidityManager::move_funds`] | Remove from one pool, add to another |
//! | [`LiquidityManager::claim_swap_fees`] | Claim accumulated swap fees |
//! | [`LiquidityManager::close_positions`] | Close empty positions and reclaim rent |
//! | [`KeeperClient`] | Protocol, pair, position and wallet analytics |

pub mod client;
pub mod error;
pub mod instructions;
pub mod keeper;
pub mod math;
pub mod pool;
pub mod positions;
pub mod rpc_pool;
pub mod sender;
pub mod session;
pub mod state;
pub mod types;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use client::LiquidityManager;
pub use error::{Error, Operation, Result};
pub use keeper::KeeperClient;
pub use pool::{DlmmPool, PoolLoader};
pub use positions::list_user_positions;
pub use sender::TransactionSender;
pub use session::PoolSession;
pub use types::*;
