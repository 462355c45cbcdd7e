//! Low-level DLMM instruction builders.
//!
//! Each function constructs a [`solana_sdk::instruction::Instruction`] ready
//! for signing and submission. Account order mirrors the `#[derive(Accounts)]`
//! structs of the DLMM program exactly.
//!
//! Anchor instruction discriminators: `sha256("global:{name}")[..8]`.

use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    instruction::{AccountMeta, Instruction},
    pubkey,
    pubkey::Pubkey,
    system_program, sysvar,
};

use crate::types::StrategyType;

// ─── Well-known program IDs ───────────────────────────────────────────────────

/// Meteora DLMM program.
pub const DLMM_PROGRAM_ID: Pubkey = pubkey!("LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YuVaPwxo");
pub const SPL_TOKEN_ID:    Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
pub const ATA_PROGRAM_ID:  Pubkey = pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// Compute budget requested by every liquidity transaction.
pub const COMPUTE_UNIT_LIMIT: u32 = 1_400_000;

/// How far the active bin may drift between quote and execution.
pub const MAX_ACTIVE_BIN_SLIPPAGE: i32 = 3;

// ─── PDA seeds ────────────────────────────────────────────────────────────────

pub const BIN_ARRAY_SEED:        &[u8] = b"bin_array";
pub const BITMAP_SEED:           &[u8] = b"bitmap";
pub const EVENT_AUTHORITY_SEED:  &[u8] = b"__event_authority";

// ─── PDA derivation helpers ───────────────────────────────────────────────────

/// Derive the bin array PDA holding bins `[index * 70, index * 70 + 69]`.
pub fn derive_bin_array(lb_pair: &Pubkey, index: i64) -> Pubkey {
    Pubkey::find_program_address(
        &[BIN_ARRAY_SEED, lb_pair.as_ref(), &index.to_le_bytes()],
        &DLMM_PROGRAM_ID,
    )
    .0
}

/// Derive the bin array bitmap extension PDA for a pair.
pub fn derive_bitmap_extension(lb_pair: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[BITMAP_SEED, lb_pair.as_ref()], &DLMM_PROGRAM_ID).0
}

/// Derive the Anchor event-CPI authority.
pub fn derive_event_authority() -> Pubkey {
    Pubkey::find_program_address(&[EVENT_AUTHORITY_SEED], &DLMM_PROGRAM_ID).0
}

/// Derive the Associated Token Account for a wallet + mint.
pub fn derive_ata(wallet: &Pubkey, mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[wallet.as_ref(), SPL_TOKEN_ID.as_ref(), mint.as_ref()],
        &ATA_PROGRAM_ID,
    )
    .0
}

// ─── Discriminator ────────────────────────────────────────────────────────────

fn disc(name: &str) -> Vec<u8> {
    let preimage = format!("global:{name}");
    let h = solana_sdk::hash::hash(preimage.as_bytes());
    h.to_bytes()[..8].to_vec()
}

// ─── Shared account sets ──────────────────────────────────────────────────────

/// Accounts shared by liquidity instructions that touch a position.
#[derive(Debug, Clone, Copy)]
pub struct LiquidityAccounts {
    pub position:        Pubkey,
    pub lb_pair:         Pubkey,
    /// `None` when the pair has no bitmap extension.
    pub bitmap_ext:      Option<Pubkey>,
    pub user_token_x:    Pubkey,
    pub user_token_y:    Pubkey,
    pub reserve_x:       Pubkey,
    pub reserve_y:       Pubkey,
    pub token_x_mint:    Pubkey,
    pub token_y_mint:    Pubkey,
    pub bin_array_lower: Pubkey,
    pub bin_array_upper: Pubkey,
    pub sender:          Pubkey,
}

impl LiquidityAccounts {
    fn metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.position, false),
            AccountMeta::new(self.lb_pair, false),
            optional(self.bitmap_ext, true),
            AccountMeta::new(self.user_token_x, false),
            AccountMeta::new(self.user_token_y, false),
            AccountMeta::new(self.reserve_x, false),
            AccountMeta::new(self.reserve_y, false),
            AccountMeta::new_readonly(self.token_x_mint, false),
            AccountMeta::new_readonly(self.token_y_mint, false),
            AccountMeta::new(self.bin_array_lower, false),
            AccountMeta::new(self.bin_array_upper, false),
            AccountMeta::new_readonly(self.sender, true),
            AccountMeta::new_readonly(SPL_TOKEN_ID, false), // token_x_program
            AccountMeta::new_readonly(SPL_TOKEN_ID, false), // token_y_program
            AccountMeta::new_readonly(derive_event_authority(), false),
            AccountMeta::new_readonly(DLMM_PROGRAM_ID, false),
        ]
    }
}

/// Anchor encodes an absent optional account as the program id itself.
fn optional(key: Option<Pubkey>, writable: bool) -> AccountMeta {
    match key {
        Some(k) if writable => AccountMeta::new(k, false),
        Some(k) => AccountMeta::new_readonly(k, false),
        None => AccountMeta::new_readonly(DLMM_PROGRAM_ID, false),
    }
}

// ─── compute budget ───────────────────────────────────────────────────────────

pub fn compute_budget_ix() -> Instruction {
    ComputeBudgetInstruction::set_compute_unit_limit(COMPUTE_UNIT_LIMIT)
}

// ─── create_associated_token_account_idempotent ───────────────────────────────

/// Build the ATA program's `CreateIdempotent` instruction.
pub fn create_ata_idempotent_ix(payer: &Pubkey, owner: &Pubkey, mint: &Pubkey) -> Instruction {
    Instruction {
        program_id: ATA_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(derive_ata(owner, mint), false),
            AccountMeta::new_readonly(*owner, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(system_program::ID, false),
            AccountMeta::new_readonly(SPL_TOKEN_ID, false),
        ],
        data: vec![1],
    }
}

// ─── initialize_bin_array ─────────────────────────────────────────────────────

pub fn initialize_bin_array_ix(lb_pair: &Pubkey, index: i64, funder: &Pubkey) -> Instruction {
    let mut data = disc("initialize_bin_array");
    data.extend_from_slice(&index.to_le_bytes());

    Instruction {
        program_id: DLMM_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new_readonly(*lb_pair, false),
            AccountMeta::new(derive_bin_array(lb_pair, index), false),
            AccountMeta::new(*funder, true),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
        data,
    }
}

// ─── initialize_position ──────────────────────────────────────────────────────

/// Build the `initialize_position` instruction.
///
/// `position` must be a fresh keypair included as an additional signer.
pub fn initialize_position_ix(
    payer:        &Pubkey,
    position:     &Pubkey,
    lb_pair:      &Pubkey,
    owner:        &Pubkey,
    lower_bin_id: i32,
    width:        i32,
) -> Instruction {
    let mut data = disc("initialize_position");
    data.extend_from_slice(&lower_bin_id.to_le_bytes());
    data.extend_from_slice(&width.to_le_bytes());

    Instruction {
        program_id: DLMM_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(*position, true),
            AccountMeta::new_readonly(*lb_pair, false),
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new_readonly(system_program::ID, false),
            AccountMeta::new_readonly(sysvar::rent::ID, false),
            AccountMeta::new_readonly(derive_event_authority(), false),
            AccountMeta::new_readonly(DLMM_PROGRAM_ID, false),
        ],
        data,
    }
}

// ─── add_liquidity_by_strategy ────────────────────────────────────────────────

/// On-chain strategy discriminant.
///
/// A deposit with both sides nonzero uses the `ImBalanced` variants.
pub fn strategy_code(strategy: StrategyType, amount_x: u64, amount_y: u64) -> u8 {
    let base = match strategy {
        StrategyType::Spot   => 0,
        StrategyType::Curve  => 1,
        StrategyType::BidAsk => 2,
    };
    if amount_x > 0 && amount_y > 0 { base + 6 } else { base }
}

#[allow(clippy::too_many_arguments)]
pub fn add_liquidity_by_strategy_ix(
    accounts:   &LiquidityAccounts,
    amount_x:   u64,
    amount_y:   u64,
    active_id:  i32,
    min_bin_id: i32,
    max_bin_id: i32,
    strategy:   StrategyType,
) -> Instruction {
    let mut data = disc("add_liquidity_by_strategy");
    data.extend_from_slice(&amount_x.to_le_bytes());
    data.extend_from_slice(&amount_y.to_le_bytes());
    data.extend_from_slice(&active_id.to_le_bytes());
    data.extend_from_slice(&MAX_ACTIVE_BIN_SLIPPAGE.to_le_bytes());
    data.extend_from_slice(&min_bin_id.to_le_bytes());
    data.extend_from_slice(&max_bin_id.to_le_bytes());
    data.push(strategy_code(strategy, amount_x, amount_y));
    data.extend_from_slice(&[0u8; 64]);

    Instruction { program_id: DLMM_PROGRAM_ID, accounts: accounts.metas(), data }
}

// ─── remove_liquidity ─────────────────────────────────────────────────────────

/// Build `remove_liquidity` from `(bin_id, bps_to_remove)` pairs.
pub fn remove_liquidity_ix(accounts: &LiquidityAccounts, bin_reductions: &[(i32, u16)]) -> Instruction {
    let mut data = disc("remove_liquidity");
    data.extend_from_slice(&(bin_reductions.len() as u32).to_le_bytes());
    for (bin_id, bps) in bin_reductions {
        data.extend_from_slice(&bin_id.to_le_bytes());
        data.extend_from_slice(&bps.to_le_bytes());
    }

    Instruction { program_id: DLMM_PROGRAM_ID, accounts: accounts.metas(), data }
}

// ─── claim_fee ────────────────────────────────────────────────────────────────

pub fn claim_fee_ix(accounts: &LiquidityAccounts) -> Instruction {
    Instruction {
        program_id: DLMM_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(accounts.lb_pair, false),
            AccountMeta::new(accounts.position, false),
            AccountMeta::new(accounts.bin_array_lower, false),
            AccountMeta::new(accounts.bin_array_upper, false),
            AccountMeta::new_readonly(accounts.sender, true),
            AccountMeta::new(accounts.reserve_x, false),
            AccountMeta::new(accounts.reserve_y, false),
            AccountMeta::new(accounts.user_token_x, false),
            AccountMeta::new(accounts.user_token_y, false),
            AccountMeta::new_readonly(accounts.token_x_mint, false),
            AccountMeta::new_readonly(accounts.token_y_mint, false),
            AccountMeta::new_readonly(SPL_TOKEN_ID, false),
            AccountMeta::new_readonly(derive_event_authority(), false),
            AccountMeta::new_readonly(DLMM_PROGRAM_ID, false),
        ],
        data: disc("claim_fee"),
    }
}

// ─── close_position ───────────────────────────────────────────────────────────

/// Rent is returned to the sender.
pub fn close_position_ix(accounts: &LiquidityAccounts) -> Instruction {
    Instruction {
        program_id: DLMM_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(accounts.position, false),
            AccountMeta::new(accounts.lb_pair, false),
            AccountMeta::new(accounts.bin_array_lower, false),
            AccountMeta::new(accounts.bin_array_upper, false),
            AccountMeta::new_readonly(accounts.sender, true),
            AccountMeta::new(accounts.sender, false), // rent_receiver
            AccountMeta::new_readonly(derive_event_authority(), false),
            AccountMeta::new_readonly(DLMM_PROGRAM_ID, false),
        ],
        data: disc("close_position"),
    }
}

// ─── swap ─────────────────────────────────────────────────────────────────────

/// Accounts for the `swap` instruction.
#[derive(Debug, Clone)]
pub struct SwapAccounts {
    pub lb_pair:        Pubkey,
    pub bitmap_ext:     Option<Pubkey>,
    pub reserve_x:      Pubkey,
    pub reserve_y:      Pubkey,
    pub user_token_in:  Pubkey,
    pub user_token_out: Pubkey,
    pub token_x_mint:   Pubkey,
    pub token_y_mint:   Pubkey,
    pub oracle:         Pubkey,
    pub user:           Pubkey,
    /// Traversed bin arrays, passed as remaining accounts.
    pub bin_arrays:     Vec<Pubkey>,
}

pub fn swap_ix(accounts: &SwapAccounts, amount_in: u64, min_amount_out: u64) -> Instruction {
    let mut data = disc("swap");
    data.extend_from_slice(&amount_in.to_le_bytes());
    data.extend_from_slice(&min_amount_out.to_le_bytes());

    let mut metas = vec![
        AccountMeta::new(accounts.lb_pair, false),
        optional(accounts.bitmap_ext, false),
        AccountMeta::new(accounts.reserve_x, false),
        AccountMeta::new(accounts.reserve_y, false),
        AccountMeta::new(accounts.user_token_in, false),
        AccountMeta::new(accounts.user_token_out, false),
        AccountMeta::new_readonly(accounts.token_x_mint, false),
        AccountMeta::new_readonly(accounts.token_y_mint, false),
        AccountMeta::new(accounts.oracle, false),
        optional(None, false), // host_fee_in
        AccountMeta::new_readonly(accounts.user, true),
        AccountMeta::new_readonly(SPL_TOKEN_ID, false),
        AccountMeta::new_readonly(SPL_TOKEN_ID, false),
        AccountMeta::new_readonly(derive_event_authority(), false),
        AccountMeta::new_readonly(DLMM_PROGRAM_ID, false),
    ];
    metas.extend(accounts.bin_arrays.iter().map(|k| AccountMeta::new(*k, false)));

    Instruction { program_id: DLMM_PROGRAM_ID, accounts: metas, data }
}
