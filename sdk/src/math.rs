//! Bin-window arithmetic and off-chain swap estimation.
//!
//! Window math is the only liquidity-shaping logic this crate owns; the quote
//! helpers approximate the on-chain swap using bin reserves and the pool's
//! base fee (the variable fee component is not modelled).

use std::ops::RangeInclusive;

use serde::Serialize;

use crate::error::{Error, Result};

// ─── Constants ────────────────────────────────────────────────────────────────

/// 100 % expressed in basis points.
pub const BASIS_POINT_MAX: u16 = 10_000;
/// Bins stored per `BinArray` account.
pub const MAX_BIN_PER_ARRAY: i32 = 70;
/// Bins a single (legacy) position may span.
pub const MAX_BIN_PER_POSITION: i32 = 70;
/// Bins on each side of the active bin when the caller gives no range.
pub const DEFAULT_BIN_RANGE: i32 = 10;
/// Whole tokens deposited when the caller gives no X amount.
pub const DEFAULT_DEPOSIT_TOKENS: u64 = 100;
/// Slippage tolerance for swaps when the caller gives none (1 %).
pub const DEFAULT_SLIPPAGE_BPS: u16 = 100;
/// Fee rates are expressed over this denominator.
pub const FEE_PRECISION: u128 = 1_000_000_000;
/// Bin prices are Q64.64 fixed-point.
pub const SCALE_OFFSET: u32 = 64;

// ─── Windows ──────────────────────────────────────────────────────────────────

/// Inclusive bin-id range a deposit is spread over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BinWindow {
    pub min_bin_id: i32,
    pub max_bin_id: i32,
}

impl BinWindow {
    /// `[active - range, active + range]`.
    pub fn balanced(active_id: i32, bin_range: i32) -> Result<Self> {
        Ok(Self {
            min_bin_id: checked_offset(active_id, bin_range.checked_neg())?,
            max_bin_id: checked_offset(active_id, Some(bin_range))?,
        })
    }

    /// One side of the active bin, shifted by `offset`.
    ///
    /// X side: `[active - range + offset, active + offset]`.
    /// Y side: `[active + offset, active + range + offset]`.
    pub fn one_sided(active_id: i32, bin_range: i32, offset: i32, is_x_side: bool) -> Result<Self> {
        let anchor = checked_offset(active_id, Some(offset))?;
        let far = if is_x_side {
            checked_offset(anchor, bin_range.checked_neg())?
        } else {
            checked_offset(anchor, Some(bin_range))?
        };
        Ok(if is_x_side {
            Self { min_bin_id: far, max_bin_id: anchor }
        } else {
            Self { min_bin_id: anchor, max_bin_id: far }
        })
    }

    /// Replace either bound with a caller-supplied value.
    pub fn with_overrides(self, min_bin_id: Option<i32>, max_bin_id: Option<i32>) -> Self {
        Self {
            min_bin_id: min_bin_id.unwrap_or(self.min_bin_id),
            max_bin_id: max_bin_id.unwrap_or(self.max_bin_id),
        }
    }

    /// `max - min`, widened so extreme bounds cannot overflow.
    pub fn width(&self) -> i64 {
        i64::from(self.max_bin_id) - i64::from(self.min_bin_id)
    }

    /// Number of bins covered, or 0 for an inverted window.
    pub fn bin_count(&self) -> i64 {
        (self.width() + 1).max(0)
    }

    pub fn bin_ids(&self) -> RangeInclusive<i32> {
        self.min_bin_id..=self.max_bin_id
    }
}

fn checked_offset(base: i32, delta: Option<i32>) -> Result<i32> {
    delta.and_then(|d| base.checked_add(d)).ok_or(Error::MathOverflow)
}

// ─── Bin arrays ───────────────────────────────────────────────────────────────

/// Index of the `BinArray` holding `bin_id` (floor division).
pub fn bin_array_index(bin_id: i32) -> i64 {
    bin_id.div_euclid(MAX_BIN_PER_ARRAY) as i64
}

/// First and last bin id stored in array `index`.
pub fn bin_array_bounds(index: i64) -> (i32, i32) {
    let lower = (index * MAX_BIN_PER_ARRAY as i64) as i32;
    (lower, lower + MAX_BIN_PER_ARRAY - 1)
}

// ─── Amounts ──────────────────────────────────────────────────────────────────

/// `tokens × 10^decimals`, checked.
pub fn scale_ui_amount(tokens: u64, decimals: u8) -> Result<u64> {
    10u64
        .checked_pow(decimals as u32)
        .and_then(|unit| tokens.checked_mul(unit))
        .ok_or(Error::MathOverflow)
}

/// Minimum acceptable output after applying `slippage_bps` to `out_amount`.
pub fn min_amount_out(out_amount: u64, slippage_bps: u16) -> u64 {
    let keep = BASIS_POINT_MAX.saturating_sub(slippage_bps) as u128;
    (out_amount as u128 * keep / BASIS_POINT_MAX as u128) as u64
}

/// Base fee rate over [`FEE_PRECISION`]:
/// `base_factor × bin_step × 10 × 10^base_fee_power_factor`.
pub fn base_fee_rate(base_factor: u16, bin_step: u16, base_fee_power_factor: u8) -> Result<u128> {
    (base_factor as u128)
        .checked_mul(bin_step as u128)
        .and_then(|v| v.checked_mul(10))
        .and_then(|v| v.checked_mul(10u128.checked_pow(base_fee_power_factor as u32)?))
        .ok_or(Error::MathOverflow)
}

// ─── Quote ────────────────────────────────────────────────────────────────────

/// Reserves and price of one bin, as read from a `BinArray`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinLiquidity {
    pub bin_id:   i32,
    pub amount_x: u64,
    pub amount_y: u64,
    /// Token Y per token X, Q64.64.
    pub price:    u128,
}

/// Result of walking bins for an exact-in swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteResult {
    pub amount_in:  u64,
    pub amount_out: u64,
    pub fee:        u64,
}

/// Walk `bins` (already in traversal order) and fill `amount_in`.
///
/// `swap_for_x = false` sells X for Y (bins walked downward),
/// `swap_for_x = true` sells Y for X (bins walked upward). The fee is charged
/// on input at `fee_rate / FEE_PRECISION`.
pub fn quote_exact_in(
    bins:       &[BinLiquidity],
    amount_in:  u64,
    swap_for_x: bool,
    fee_rate:   u128,
) -> Result<QuoteResult> {
    if fee_rate >= FEE_PRECISION {
        return Err(Error::InvalidArgument(format!("fee rate {fee_rate} ≥ 100 %")));
    }

    let mut remaining: u128 = amount_in as u128;
    let mut out: u128 = 0;
    let mut fees: u128 = 0;

    for bin in bins {
        if remaining == 0 {
            break;
        }
        if bin.price == 0 {
            continue;
        }

        let reserve_out = (if swap_for_x { bin.amount_x } else { bin.amount_y }) as u128;
        if reserve_out == 0 {
            continue;
        }

        // Input (after fee) needed to drain this bin's output reserve.
        let max_net_in = if swap_for_x {
            mul_shr_ceil(reserve_out, bin.price)?
        } else {
            shl_div_ceil(reserve_out, bin.price)?
        };
        let max_fee = ceil_div(
            max_net_in.checked_mul(fee_rate).ok_or(Error::MathOverflow)?,
            FEE_PRECISION - fee_rate,
        );
        let max_gross_in = max_net_in.checked_add(max_fee).ok_or(Error::MathOverflow)?;

        if remaining >= max_gross_in {
            out += reserve_out;
            fees += max_fee;
            remaining -= max_gross_in;
        } else {
            let fee = ceil_div(
                remaining.checked_mul(fee_rate).ok_or(Error::MathOverflow)?,
                FEE_PRECISION,
            );
            let net = remaining - fee;
            let bin_out = if swap_for_x {
                shl_div(net, bin.price)?
            } else {
                mul_shr(net, bin.price)?
            };
            out += bin_out.min(reserve_out);
            fees += fee;
            remaining = 0;
        }
    }

    if remaining > 0 {
        return Err(Error::InsufficientLiquidity {
            requested: amount_in,
            filled:    (amount_in as u128 - remaining) as u64,
        });
    }

    Ok(QuoteResult {
        amount_in,
        amount_out: u64::try_from(out).map_err(|_| Error::MathOverflow)?,
        fee:        u64::try_from(fees).map_err(|_| Error::MathOverflow)?,
    })
}

// ─── Fixed-point primitives ───────────────────────────────────────────────────

const LOW_MASK: u128 = u64::MAX as u128;

/// `(x × y) >> 64` without overflowing the intermediate product.
fn mul_shr(x: u128, y: u128) -> Result<u128> {
    let hi = x.checked_mul(y >> SCALE_OFFSET).ok_or(Error::MathOverflow)?;
    let lo = mul_lo_shr(x, y & LOW_MASK)?;
    hi.checked_add(lo).ok_or(Error::MathOverflow)
}

fn mul_shr_ceil(x: u128, y: u128) -> Result<u128> {
    let floor = mul_shr(x, y)?;
    let exact = x
        .checked_mul(y & LOW_MASK)
        .map(|p| p & LOW_MASK == 0)
        .unwrap_or(false);
    Ok(if exact { floor } else { floor + 1 })
}

/// `(x × lo) >> 64` for `lo < 2^64`, splitting `x` when the product would overflow.
fn mul_lo_shr(x: u128, lo: u128) -> Result<u128> {
    match x.checked_mul(lo) {
        Some(p) => Ok(p >> SCALE_OFFSET),
        None => {
            let x_hi = x >> SCALE_OFFSET;
            let x_lo = x & LOW_MASK;
            let a = x_hi.checked_mul(lo).ok_or(Error::MathOverflow)?;
            a.checked_add((x_lo * lo) >> SCALE_OFFSET).ok_or(Error::MathOverflow)
        }
    }
}

/// `(x << 64) / y`.
fn shl_div(x: u128, y: u128) -> Result<u128> {
    if x > LOW_MASK {
        return Err(Error::MathOverflow);
    }
    Ok((x << SCALE_OFFSET) / y)
}

fn shl_div_ceil(x: u128, y: u128) -> Result<u128> {
    if x > LOW_MASK {
        return Err(Error::MathOverflow);
    }
    Ok(ceil_div(x << SCALE_OFFSET, y))
}

fn ceil_div(n: u128, d: u128) -> u128 {
    n / d + u128::from(n % d != 0)
}
