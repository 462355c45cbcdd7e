//! Request, response, and option types shared by the pool handle and the planner.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
};

use crate::error::{Error, Result};
use crate::math::{BASIS_POINT_MAX, DEFAULT_BIN_RANGE};

// ─── Serde helpers ────────────────────────────────────────────────────────────

/// Serialize any `Display` value (pubkeys, signatures, u128) as a JSON string.
pub(crate) fn as_string<T: fmt::Display, S: Serializer>(v: &T, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.collect_str(v)
}

pub(crate) fn as_string_vec<T: fmt::Display, S: Serializer>(
    v: &[T],
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.collect_seq(v.iter().map(|x| x.to_string()))
}

// ─── Pool handle views ────────────────────────────────────────────────────────

/// Mint identity and decimal precision of one side of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    #[serde(serialize_with = "as_string")]
    pub mint:     Pubkey,
    pub decimals: u8,
}

/// The bin currently holding the pool's trading price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveBin {
    pub bin_id: i32,
}

/// One bin of a position and the position's liquidity share in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionBin {
    pub bin_id:          i32,
    #[serde(serialize_with = "as_string")]
    pub liquidity_share: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionData {
    pub lower_bin_id:       i32,
    pub upper_bin_id:       i32,
    /// Ordered by bin id, lowest first.
    pub position_bin_data:  Vec<PositionBin>,
    pub fee_x:              u64,
    pub fee_y:              u64,
}

/// A user's liquidity position in one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LbPosition {
    #[serde(serialize_with = "as_string")]
    pub public_key:    Pubkey,
    #[serde(serialize_with = "as_string")]
    pub owner:         Pubkey,
    pub position_data: PositionData,
}

impl LbPosition {
    /// Bin ids covered by this position, lowest first.
    pub fn bin_ids(&self) -> Vec<i32> {
        self.position_data.position_bin_data.iter().map(|b| b.bin_id).collect()
    }
}

/// The two shapes a position listing can come back in.
#[derive(Debug, Clone)]
pub enum PositionsResponse {
    List(Vec<LbPosition>),
    Wrapped { user_positions: Vec<LbPosition> },
}

impl PositionsResponse {
    pub fn into_positions(self) -> Vec<LbPosition> {
        match self {
            PositionsResponse::List(positions) => positions,
            PositionsResponse::Wrapped { user_positions } => user_positions,
        }
    }
}

// ─── Strategy ─────────────────────────────────────────────────────────────────

/// Liquidity distribution shape across the bin window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum StrategyType {
    #[default]
    Spot,
    Curve,
    BidAsk,
}

impl FromStr for StrategyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "spot"                => Ok(StrategyType::Spot),
            "curve"               => Ok(StrategyType::Curve),
            "bidask" | "bid-ask"  => Ok(StrategyType::BidAsk),
            other => Err(Error::InvalidArgument(format!(
                "unknown strategy type '{other}' (expected Spot, Curve or BidAsk)"
            ))),
        }
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StrategyType::Spot   => "Spot",
            StrategyType::Curve  => "Curve",
            StrategyType::BidAsk => "BidAsk",
        })
    }
}

/// Strategy descriptor handed to the pool handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyParameters {
    pub min_bin_id:    i32,
    pub max_bin_id:    i32,
    pub strategy_type: StrategyType,
}

/// Caller-supplied bounds that replace the computed window when present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StrategyOverrides {
    pub min_bin_id: Option<i32>,
    pub max_bin_id: Option<i32>,
}

// ─── Pool handle requests ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLiquidityByStrategy {
    pub user:           Pubkey,
    /// `None` asks the handle to open a fresh position.
    pub position:       Option<Pubkey>,
    pub total_x_amount: u64,
    pub total_y_amount: u64,
    pub strategy:       StrategyParameters,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveLiquidityRequest {
    pub position:                 Pubkey,
    pub user:                     Pubkey,
    pub bin_ids:                  Vec<i32>,
    /// One entry per `bin_ids` element.
    pub liquidities_bps_to_remove: Vec<u16>,
    pub should_claim_and_close:   bool,
}

/// Quote for an exact-in swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapQuote {
    pub amount_in:         u64,
    pub out_amount:        u64,
    pub min_out_amount:    u64,
    pub fee:               u64,
    pub bin_arrays_pubkey: Vec<Pubkey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub in_token:          Pubkey,
    pub out_token:         Pubkey,
    pub in_amount:         u64,
    pub min_out_amount:    u64,
    pub bin_arrays_pubkey: Vec<Pubkey>,
    pub lb_pair:           Pubkey,
    pub user:              Pubkey,
}

// ─── Transactions ─────────────────────────────────────────────────────────────

/// Instructions for one transaction, plus any keypairs besides the user that
/// must co-sign it (e.g. a freshly generated position account).
#[derive(Debug, Default)]
pub struct UnsignedTx {
    pub instructions:  Vec<Instruction>,
    pub extra_signers: Vec<Keypair>,
}

impl UnsignedTx {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions, extra_signers: Vec::new() }
    }

    pub fn with_signer(mut self, signer: Keypair) -> Self {
        self.extra_signers.push(signer);
        self
    }
}

/// What a pool handle builder returns: one transaction or an ordered list.
#[derive(Debug)]
pub enum TxBatch {
    Single(UnsignedTx),
    Many(Vec<UnsignedTx>),
}

impl TxBatch {
    /// Transactions in submission order.
    pub fn into_transactions(self) -> Vec<UnsignedTx> {
        match self {
            TxBatch::Single(tx) => vec![tx],
            TxBatch::Many(txs)  => txs,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TxBatch::Single(_) => 1,
            TxBatch::Many(txs) => txs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<UnsignedTx>> for TxBatch {
    fn from(mut txs: Vec<UnsignedTx>) -> Self {
        if txs.len() == 1 {
            TxBatch::Single(txs.remove(0))
        } else {
            TxBatch::Many(txs)
        }
    }
}

// ─── Planner options ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOptions {
    /// `None` targets every position the user owns in the pool.
    pub target_positions: Option<Vec<Pubkey>>,
    /// Applied uniformly to every bin (10 000 = 100 %).
    pub bps_to_remove:    u16,
    pub claim_and_close:  bool,
}

impl Default for RemoveOptions {
    fn default() -> Self {
        Self { target_positions: None, bps_to_remove: BASIS_POINT_MAX, claim_and_close: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOptions {
    /// Raw token X units. Defaults to 100 whole tokens.
    pub x_amount:          Option<u64>,
    /// Raw token Y units. Defaults to zero.
    pub y_amount:          Option<u64>,
    pub bin_range:         i32,
    pub strategy_type:     StrategyType,
    pub strategy_params:   StrategyOverrides,
    pub existing_position: Option<Pubkey>,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            x_amount:          None,
            y_amount:          None,
            bin_range:         DEFAULT_BIN_RANGE,
            strategy_type:     StrategyType::Spot,
            strategy_params:   StrategyOverrides::default(),
            existing_position: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalancedOptions {
    pub x_amount:      Option<u64>,
    pub bin_range:     i32,
    pub strategy_type: StrategyType,
}

impl Default for BalancedOptions {
    fn default() -> Self {
        Self { x_amount: None, bin_range: DEFAULT_BIN_RANGE, strategy_type: StrategyType::Spot }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImbalancedOptions {
    pub x_amount:      Option<u64>,
    pub y_amount:      Option<u64>,
    pub bin_range:     i32,
    pub strategy_type: StrategyType,
}

impl Default for ImbalancedOptions {
    fn default() -> Self {
        Self {
            x_amount:      None,
            y_amount:      None,
            bin_range:     DEFAULT_BIN_RANGE,
            strategy_type: StrategyType::Spot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneSidedOptions {
    /// Raw units of the deposited side. Defaults to 100 whole tokens.
    pub amount:    Option<u64>,
    pub bin_range: i32,
    /// `true` deposits token X at/below the active bin, `false` token Y at/above it.
    pub is_x_side: bool,
    pub offset:    i32,
}

impl Default for OneSidedOptions {
    fn default() -> Self {
        Self { amount: None, bin_range: DEFAULT_BIN_RANGE, is_x_side: true, offset: 0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveOptions {
    pub remove: RemoveOptions,
    pub add:    AddOptions,
}

/// Completion marker for a two-phase move. Keep it across retries so a
/// failed addition is retried without removing again.
#[derive(Debug, Clone, Default)]
pub struct MoveProgress {
    pub removal_complete: bool,
    pub removal:          Option<BatchOutcome>,
}

// ─── Outcomes ─────────────────────────────────────────────────────────────────

/// Summary of a confirmed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub message:    String,
    #[serde(serialize_with = "as_string_vec")]
    pub signatures: Vec<Signature>,
    /// Positions whose transactions were confirmed.
    #[serde(serialize_with = "as_string_vec")]
    pub positions:  Vec<Pubkey>,
    /// Targets skipped because they were no longer owned by the user.
    #[serde(serialize_with = "as_string_vec")]
    pub skipped:    Vec<Pubkey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    pub success:  bool,
    pub message:  String,
    pub removal:  Option<BatchOutcome>,
    pub addition: BatchOutcome,
}
