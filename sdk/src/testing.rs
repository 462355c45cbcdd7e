//! Recording fakes for the pool handle, loader, and sender.

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature},
};

use crate::error::{Error, Result};
use crate::pool::{BinArrayAccount, DlmmPool, PoolLoader};
use crate::sender::TransactionSender;
use crate::types::{
    ActiveBin, AddLiquidityByStrategy, LbPosition, PositionBin, PositionData, PositionsResponse,
    RemoveLiquidityRequest, SwapQuote, SwapRequest, TokenInfo, TxBatch, UnsignedTx,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Positions { pool: Pubkey },
    Add { pool: Pubkey, request: AddLiquidityByStrategy },
    Remove { pool: Pubkey, request: RemoveLiquidityRequest },
    BinArrays { swap_for_x: bool },
    Quote { swap_for_x: bool, amount_in: u64 },
    Swap { request: SwapRequest },
    Claim { pool: Pubkey, positions: Vec<Pubkey> },
    Close { pool: Pubkey, position: Pubkey },
    Sent,
}

pub type Log = Arc<Mutex<Vec<Call>>>;

pub fn position(owner: Pubkey, bins: RangeInclusive<i32>) -> LbPosition {
    let lower_bin_id = *bins.start();
    let upper_bin_id = *bins.end();
    LbPosition {
        public_key: Pubkey::new_unique(),
        owner,
        position_data: PositionData {
            lower_bin_id,
            upper_bin_id,
            position_bin_data: bins.map(|bin_id| PositionBin { bin_id, liquidity_share: 1_000 }).collect(),
            fee_x: 0,
            fee_y: 0,
        },
    }
}

pub struct MockPool {
    pub address:        Pubkey,
    pub token_x:        TokenInfo,
    pub token_y:        TokenInfo,
    pub active_id:      i32,
    pub positions:      Mutex<Vec<LbPosition>>,
    pub fail_positions: bool,
    pub log:            Log,
}

impl MockPool {
    pub fn new(active_id: i32, log: Log) -> Self {
        Self {
            address: Pubkey::new_unique(),
            token_x: TokenInfo { mint: Pubkey::new_unique(), decimals: 6 },
            token_y: TokenInfo { mint: Pubkey::new_unique(), decimals: 9 },
            active_id,
            positions: Mutex::new(Vec::new()),
            fail_positions: false,
            log,
        }
    }

    pub fn with_positions(self, positions: Vec<LbPosition>) -> Self {
        *self.positions.lock().unwrap() = positions;
        self
    }

    fn record(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DlmmPool for MockPool {
    fn address(&self) -> Pubkey {
        self.address
    }

    fn token_x(&self) -> &TokenInfo {
        &self.token_x
    }

    fn token_y(&self) -> &TokenInfo {
        &self.token_y
    }

    async fn active_bin(&self) -> Result<ActiveBin> {
        Ok(ActiveBin { bin_id: self.active_id })
    }

    async fn positions_by_user(&self, _user: &Pubkey) -> Result<PositionsResponse> {
        self.record(Call::Positions { pool: self.address });
        if self.fail_positions {
            return Err(Error::Sdk("rpc unavailable".into()));
        }
        Ok(PositionsResponse::List(self.positions.lock().unwrap().clone()))
    }

    async fn add_liquidity_by_strategy(&self, request: AddLiquidityByStrategy) -> Result<TxBatch> {
        let opens_position = request.position.is_none();
        self.record(Call::Add { pool: self.address, request });
        let tx = UnsignedTx::new(Vec::new());
        Ok(TxBatch::Single(if opens_position { tx.with_signer(Keypair::new()) } else { tx }))
    }

    async fn remove_liquidity(&self, request: RemoveLiquidityRequest) -> Result<TxBatch> {
        if request.should_claim_and_close {
            self.positions.lock().unwrap().retain(|p| p.public_key != request.position);
        }
        self.record(Call::Remove { pool: self.address, request });
        Ok(TxBatch::Many(vec![UnsignedTx::default(), UnsignedTx::default()]))
    }

    async fn bin_arrays_for_swap(&self, swap_for_x: bool) -> Result<Vec<BinArrayAccount>> {
        self.record(Call::BinArrays { swap_for_x });
        Ok(Vec::new())
    }

    async fn swap_quote(
        &self,
        amount_in:     u64,
        swap_for_x:    bool,
        _slippage_bps: u16,
        _bin_arrays:   &[BinArrayAccount],
    ) -> Result<SwapQuote> {
        self.record(Call::Quote { swap_for_x, amount_in });
        Ok(SwapQuote {
            amount_in,
            out_amount:        amount_in * 2,
            min_out_amount:    amount_in * 2 - 1,
            fee:               0,
            bin_arrays_pubkey: Vec::new(),
        })
    }

    async fn swap(&self, request: SwapRequest) -> Result<TxBatch> {
        self.record(Call::Swap { request });
        Ok(TxBatch::Single(UnsignedTx::default()))
    }

    async fn claim_all_swap_fee(&self, _owner: &Pubkey, positions: &[LbPosition]) -> Result<TxBatch> {
        self.record(Call::Claim {
            pool:      self.address,
            positions: positions.iter().map(|p| p.public_key).collect(),
        });
        Ok(TxBatch::Many(positions.iter().map(|_| UnsignedTx::default()).collect()))
    }

    async fn close_position(&self, _owner: &Pubkey, position: &LbPosition) -> Result<TxBatch> {
        self.positions.lock().unwrap().retain(|p| p.public_key != position.public_key);
        self.record(Call::Close { pool: self.address, position: position.public_key });
        Ok(TxBatch::Single(UnsignedTx::default()))
    }
}

#[derive(Default)]
pub struct MockLoader {
    pub pools: HashMap<Pubkey, Arc<MockPool>>,
    pub loads: AtomicUsize,
}

impl MockLoader {
    pub fn with(pools: Vec<Arc<MockPool>>) -> Self {
        Self {
            pools: pools.into_iter().map(|p| (p.address, p)).collect(),
            loads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PoolLoader for MockLoader {
    async fn load(&self, address: &Pubkey) -> Result<Arc<dyn DlmmPool>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match self.pools.get(address) {
            Some(pool) => Ok(pool.clone() as Arc<dyn DlmmPool>),
            None => Err(Error::AccountNotFound(*address)),
        }
    }
}

/// Confirms every transaction until `fail_at` sends have succeeded.
pub struct MockSender {
    pub log:     Log,
    pub sent:    AtomicUsize,
    pub fail_at: Option<usize>,
}

impl MockSender {
    pub fn new(log: Log) -> Self {
        Self { log, sent: AtomicUsize::new(0), fail_at: None }
    }
}

#[async_trait]
impl TransactionSender for MockSender {
    async fn send_and_confirm(&self, _tx: UnsignedTx, _payer: &Keypair) -> Result<Signature> {
        if self.fail_at == Some(self.sent.load(Ordering::SeqCst)) {
            return Err(Error::Sdk("blockhash not found".into()));
        }
        self.sent.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(Call::Sent);
        Ok(Signature::new_unique())
    }
}
