//! On-chain account deserialization.
//!
//! Parses raw account bytes for the DLMM `LbPair`, `PositionV2` and `BinArray`
//! accounts plus the SPL `Mint` decimals field. Byte offsets mirror the
//! zero-copy `#[account]` layouts of the DLMM program exactly.

use solana_sdk::pubkey::Pubkey;

use crate::error::{Error, Result};
use crate::math::{BinLiquidity, MAX_BIN_PER_ARRAY};
use crate::types::{LbPosition, PositionBin, PositionData};

// ─── LbPair ───────────────────────────────────────────────────────────────────

/// Deserialized subset of the `LbPair` account.
///
/// Layout (after 8-byte Anchor discriminator):
/// ```text
/// parameters(32)  v_parameters(32)  bump_seed(1)  bin_step_seed(2)  pair_type(1)
/// active_id(4)  bin_step(2)  status(1)  require_base_factor_seed(1)
/// base_factor_seed(2)  activation_type(1)  creator_pool_on_off_control(1)
/// token_x_mint(32)  token_y_mint(32)  reserve_x(32)  reserve_y(32)
/// protocol_fee(16)  padding1(32)  reward_infos(2 × 144)  oracle(32)  …  = 904 bytes
/// ```
/// `parameters` starts with `base_factor(2)` and carries
/// `base_fee_power_factor(1)` at byte 26.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LbPairState {
    pub base_factor:           u16,
    pub base_fee_power_factor: u8,
    pub active_id:             i32,
    pub bin_step:              u16,
    pub status:                u8,
    pub token_x_mint:          Pubkey,
    pub token_y_mint:          Pubkey,
    pub reserve_x:             Pubkey,
    pub reserve_y:             Pubkey,
    pub oracle:                Pubkey,
}

pub const LB_PAIR_SIZE: usize = 904;

/// Deserialize an `LbPair` account from raw bytes.
pub fn parse_lb_pair(data: &[u8]) -> Result<LbPairState> {
    const REQUIRED: usize = 584;
    if data.len() < REQUIRED {
        return Err(Error::ParseError {
            offset: 0,
            reason: format!("LbPair account is {} bytes; expected {}", data.len(), LB_PAIR_SIZE),
        });
    }
    Ok(LbPairState {
        base_factor:           read_u16(data, 8)?,
        base_fee_power_factor: data[34],
        active_id:             read_i32(data, 76)?,
        bin_step:              read_u16(data, 80)?,
        status:                data[82],
        token_x_mint:          read_pubkey(data, 88)?,
        token_y_mint:          read_pubkey(data, 120)?,
        reserve_x:             read_pubkey(data, 152)?,
        reserve_y:             read_pubkey(data, 184)?,
        oracle:                read_pubkey(data, 552)?,
    })
}

// ─── PositionV2 ───────────────────────────────────────────────────────────────

/// Size of a `PositionV2` account, used as a `getProgramAccounts` filter.
pub const POSITION_V2_SIZE: u64 = 8120;
/// Offset of the `lb_pair` field.
pub const POSITION_LB_PAIR_OFFSET: usize = 8;
/// Offset of the `owner` field.
pub const POSITION_OWNER_OFFSET: usize = 40;

const LIQUIDITY_SHARES_OFFSET: usize = 72;
const FEE_INFOS_OFFSET: usize = 4552;
const FEE_INFO_SIZE: usize = 48;
const LOWER_BIN_ID_OFFSET: usize = 7912;
const UPPER_BIN_ID_OFFSET: usize = 7916;

/// Deserialized `PositionV2` account.
///
/// Layout (after 8-byte Anchor discriminator):
/// ```text
/// lb_pair(32)  owner(32)  liquidity_shares(70 × 16)  reward_infos(70 × 48)
/// fee_infos(70 × 48)  lower_bin_id(4)  upper_bin_id(4)  last_updated_at(8)  …
/// = 8120 bytes
/// ```
/// Each fee info is `fee_x_per_token_complete(16) fee_y_per_token_complete(16)
/// fee_x_pending(8) fee_y_pending(8)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionState {
    pub lb_pair:          Pubkey,
    pub owner:            Pubkey,
    pub lower_bin_id:     i32,
    pub upper_bin_id:     i32,
    /// One entry per bin from `lower_bin_id` to `upper_bin_id`.
    pub liquidity_shares: Vec<u128>,
    pub fee_x_pending:    u64,
    pub fee_y_pending:    u64,
}

/// Deserialize a `PositionV2` account from raw bytes.
pub fn parse_position(data: &[u8]) -> Result<PositionState> {
    if data.len() < POSITION_V2_SIZE as usize {
        return Err(Error::ParseError {
            offset: 0,
            reason: format!("Position account is {} bytes; expected {}", data.len(), POSITION_V2_SIZE),
        });
    }

    let lower_bin_id = read_i32(data, LOWER_BIN_ID_OFFSET)?;
    let upper_bin_id = read_i32(data, UPPER_BIN_ID_OFFSET)?;
    let width = i64::from(upper_bin_id) - i64::from(lower_bin_id) + 1;
    if !(1..=i64::from(MAX_BIN_PER_ARRAY)).contains(&width) {
        return Err(Error::ParseError {
            offset: LOWER_BIN_ID_OFFSET,
            reason: format!("position spans [{lower_bin_id}, {upper_bin_id}]"),
        });
    }

    let mut liquidity_shares = Vec::with_capacity(width as usize);
    let mut fee_x_pending: u64 = 0;
    let mut fee_y_pending: u64 = 0;
    for i in 0..width as usize {
        liquidity_shares.push(read_u128(data, LIQUIDITY_SHARES_OFFSET + i * 16)?);
        let fee = FEE_INFOS_OFFSET + i * FEE_INFO_SIZE;
        fee_x_pending = fee_x_pending.saturating_add(read_u64(data, fee + 32)?);
        fee_y_pending = fee_y_pending.saturating_add(read_u64(data, fee + 40)?);
    }

    Ok(PositionState {
        lb_pair: read_pubkey(data, POSITION_LB_PAIR_OFFSET)?,
        owner: read_pubkey(data, POSITION_OWNER_OFFSET)?,
        lower_bin_id,
        upper_bin_id,
        liquidity_shares,
        fee_x_pending,
        fee_y_pending,
    })
}

impl PositionState {
    pub fn into_lb_position(self, address: Pubkey) -> LbPosition {
        let position_bin_data = (self.lower_bin_id..=self.upper_bin_id)
            .zip(self.liquidity_shares)
            .map(|(bin_id, liquidity_share)| PositionBin { bin_id, liquidity_share })
            .collect();
        LbPosition {
            public_key: address,
            owner:      self.owner,
            position_data: PositionData {
                lower_bin_id: self.lower_bin_id,
                upper_bin_id: self.upper_bin_id,
                position_bin_data,
                fee_x: self.fee_x_pending,
                fee_y: self.fee_y_pending,
            },
        }
    }
}

// ─── BinArray ─────────────────────────────────────────────────────────────────

const BIN_ARRAY_BINS_OFFSET: usize = 56;
const BIN_SIZE: usize = 144;

/// Deserialized `BinArray` account.
///
/// Layout (after 8-byte Anchor discriminator):
/// ```text
/// index(8)  version(1)  padding(7)  lb_pair(32)  bins(70 × 144)  = 10136 bytes
/// ```
/// Each bin starts `amount_x(8) amount_y(8) price(16) liquidity_supply(16) …`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinArrayState {
    pub index:   i64,
    pub lb_pair: Pubkey,
    /// Bins in ascending id order.
    pub bins:    Vec<BinLiquidity>,
}

/// Deserialize a `BinArray` account from raw bytes.
pub fn parse_bin_array(data: &[u8]) -> Result<BinArrayState> {
    let expected = BIN_ARRAY_BINS_OFFSET + MAX_BIN_PER_ARRAY as usize * BIN_SIZE;
    if data.len() < expected {
        return Err(Error::ParseError {
            offset: 0,
            reason: format!("BinArray account is {} bytes; expected {}", data.len(), expected),
        });
    }

    let index = read_i64(data, 8)?;
    let first_bin_id = (index * MAX_BIN_PER_ARRAY as i64) as i32;
    let mut bins = Vec::with_capacity(MAX_BIN_PER_ARRAY as usize);
    for i in 0..MAX_BIN_PER_ARRAY as usize {
        let base = BIN_ARRAY_BINS_OFFSET + i * BIN_SIZE;
        bins.push(BinLiquidity {
            bin_id:   first_bin_id + i as i32,
            amount_x: read_u64(data, base)?,
            amount_y: read_u64(data, base + 8)?,
            price:    read_u128(data, base + 16)?,
        });
    }

    Ok(BinArrayState { index, lb_pair: read_pubkey(data, 24)?, bins })
}

// ─── SPL mint ─────────────────────────────────────────────────────────────────

/// Read the `decimals` field from a packed SPL mint account.
///
/// Mint layout: `mint_authority(36) supply(8) decimals(1) …`
pub fn parse_mint_decimals(data: &[u8]) -> Result<u8> {
    if data.len() < 82 {
        return Err(Error::ParseError {
            offset: 44,
            reason: format!("Mint account is {} bytes; need at least 82", data.len()),
        });
    }
    Ok(data[44])
}

// ─── Byte-slice primitives ────────────────────────────────────────────────────

fn slice<const N: usize>(data: &[u8], offset: usize, what: &str) -> Result<[u8; N]> {
    data.get(offset..offset + N)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| Error::ParseError {
            offset,
            reason: format!("slice too short for {what} ({N} bytes)"),
        })
}

pub(crate) fn read_pubkey(data: &[u8], offset: usize) -> Result<Pubkey> {
    Ok(Pubkey::from(slice::<32>(data, offset, "Pubkey")?))
}

pub(crate) fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
    Ok(u16::from_le_bytes(slice(data, offset, "u16")?))
}

pub(crate) fn read_i32(data: &[u8], offset: usize) -> Result<i32> {
    Ok(i32::from_le_bytes(slice(data, offset, "i32")?))
}

pub(crate) fn read_u64(data: &[u8], offset: usize) -> Result<u64> {
    Ok(u64::from_le_bytes(slice(data, offset, "u64")?))
}

pub(crate) fn read_i64(data: &[u8], offset: usize) -> Result<i64> {
    Ok(i64::from_le_bytes(slice(data, offset, "i64")?))
}

pub(crate) fn read_u128(data: &[u8], offset: usize) -> Result<u128> {
    Ok(u128::from_le_bytes(slice(data, offset, "u128")?))
}
