//! The pool handle seam.
//!
//! [`DlmmPool`] is everything the planner needs from one DLMM pair: reads
//! of live state and builders that return unsigned transactions. The
//! RPC-backed implementation lives in [`crate::rpc_pool`]; tests substitute
//! recording fakes.

use std::sync::Arc;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;

use crate::error::Result;
use crate::state::BinArrayState;
use crate::types::{
    ActiveBin, AddLiquidityByStrategy, LbPosition, PositionsResponse, RemoveLiquidityRequest,
    SwapQuote, SwapRequest, TokenInfo, TxBatch,
};

/// A bin array account and its decoded contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinArrayAccount {
    pub address: Pubkey,
    pub state:   BinArrayState,
}

/// Handle to one loaded DLMM pool.
#[async_trait]
pub trait DlmmPool: Send + Sync {
    /// Address of the pair account.
    fn address(&self) -> Pubkey;

    fn token_x(&self) -> &TokenInfo;

    fn token_y(&self) -> &TokenInfo;

    async fn active_bin(&self) -> Result<ActiveBin>;

    async fn positions_by_user(&self, user: &Pubkey) -> Result<PositionsResponse>;

    async fn add_liquidity_by_strategy(&self, request: AddLiquidityByStrategy) -> Result<TxBatch>;

    async fn remove_liquidity(&self, request: RemoveLiquidityRequest) -> Result<TxBatch>;

    /// Bin arrays traversed by a swap in the given direction, nearest first.
    async fn bin_arrays_for_swap(&self, swap_for_x: bool) -> Result<Vec<BinArrayAccount>>;

    async fn swap_quote(
        &self,
        amount_in:    u64,
        swap_for_x:   bool,
        slippage_bps: u16,
        bin_arrays:   &[BinArrayAccount],
    ) -> Result<SwapQuote>;

    async fn swap(&self, request: SwapRequest) -> Result<TxBatch>;

    async fn claim_all_swap_fee(&self, owner: &Pubkey, positions: &[LbPosition]) -> Result<TxBatch>;

    async fn close_position(&self, owner: &Pubkey, position: &LbPosition) -> Result<TxBatch>;
}

/// Builds pool handles from a pool address.
#[async_trait]
pub trait PoolLoader: Send + Sync {
    async fn load(&self, address: &Pubkey) -> Result<Arc<dyn DlmmPool>>;
}
