//! [`DlmmPool`] backed by a Solana JSON-RPC endpoint.
//!
//! Pool state is read with plain account fetches and decoded by
//! [`crate::state`]; transactions are assembled from
//! [`crate::instructions`] builders.

use std::sync::Arc;

use async_trait::async_trait;
use solana_account_decoder_client_types::UiAccountEncoding;
use solana_client::{
    nonblocking::rpc_client::RpcClient,
    rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig},
    rpc_filter::{Memcmp, MemcmpEncodedBytes, RpcFilterType},
};
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    instructions::{
        add_liquidity_by_strategy_ix, claim_fee_ix, close_position_ix, compute_budget_ix,
        create_ata_idempotent_ix, derive_ata, derive_bin_array, derive_bitmap_extension,
        initialize_bin_array_ix, initialize_position_ix, remove_liquidity_ix, swap_ix,
        LiquidityAccounts, SwapAccounts, DLMM_PROGRAM_ID,
    },
    math::{
        base_fee_rate, bin_array_index, min_amount_out, quote_exact_in, BinLiquidity, BinWindow,
        MAX_BIN_PER_POSITION,
    },
    pool::{BinArrayAccount, DlmmPool, PoolLoader},
    state::{
        parse_bin_array, parse_lb_pair, parse_mint_decimals, parse_position, LbPairState,
        POSITION_LB_PAIR_OFFSET, POSITION_OWNER_OFFSET, POSITION_V2_SIZE,
    },
    types::{
        ActiveBin, AddLiquidityByStrategy, LbPosition, PositionsResponse, RemoveLiquidityRequest,
        SwapQuote, SwapRequest, TokenInfo, TxBatch, UnsignedTx,
    },
};

/// Bin arrays fetched ahead of the active one when quoting a swap.
const SWAP_BIN_ARRAY_LOOKAHEAD: i64 = 4;

// ─── Loader ───────────────────────────────────────────────────────────────────

/// Loads [`RpcDlmmPool`] handles over a shared RPC client.
pub struct RpcPoolLoader {
    rpc: Arc<RpcClient>,
}

impl RpcPoolLoader {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl PoolLoader for RpcPoolLoader {
    async fn load(&self, address: &Pubkey) -> Result<Arc<dyn DlmmPool>> {
        Ok(Arc::new(RpcDlmmPool::load(self.rpc.clone(), *address).await?))
    }
}

// ─── Pool handle ──────────────────────────────────────────────────────────────

pub struct RpcDlmmPool {
    rpc:        Arc<RpcClient>,
    address:    Pubkey,
    pair:       LbPairState,
    token_x:    TokenInfo,
    token_y:    TokenInfo,
    bitmap_ext: Option<Pubkey>,
    fee_rate:   u128,
}

impl RpcDlmmPool {
    /// Read the pair, both mints, and the bitmap extension.
    pub async fn load(rpc: Arc<RpcClient>, address: Pubkey) -> Result<Self> {
        let bitmap = derive_bitmap_extension(&address);
        let accounts = rpc.get_multiple_accounts(&[address, bitmap]).await?;
        let pair_account = accounts
            .first()
            .cloned()
            .flatten()
            .ok_or(Error::AccountNotFound(address))?;
        let pair = parse_lb_pair(&pair_account.data)?;
        let bitmap_ext = accounts.get(1).and_then(|a| a.as_ref()).map(|_| bitmap);

        let mints = rpc.get_multiple_accounts(&[pair.token_x_mint, pair.token_y_mint]).await?;
        let decimals = |i: usize, mint: Pubkey| -> Result<u8> {
            let acc = mints.get(i).and_then(|a| a.as_ref()).ok_or(Error::AccountNotFound(mint))?;
            parse_mint_decimals(&acc.data)
        };
        let token_x = TokenInfo { mint: pair.token_x_mint, decimals: decimals(0, pair.token_x_mint)? };
        let token_y = TokenInfo { mint: pair.token_y_mint, decimals: decimals(1, pair.token_y_mint)? };
        let fee_rate = base_fee_rate(pair.base_factor, pair.bin_step, pair.base_fee_power_factor)?;

        debug!(
            pool = %address,
            active_id = pair.active_id,
            bin_step = pair.bin_step,
            "loaded lb pair"
        );
        Ok(Self { rpc, address, pair, token_x, token_y, bitmap_ext, fee_rate })
    }

    async fn live_pair(&self) -> Result<LbPairState> {
        parse_lb_pair(&self.rpc.get_account_data(&self.address).await?)
    }

    /// Accounts for a position whose lowest bin is `lower_bin_id`.
    fn liquidity_accounts(&self, position: Pubkey, lower_bin_id: i32, user: &Pubkey) -> LiquidityAccounts {
        let lower = bin_array_index(lower_bin_id);
        LiquidityAccounts {
            position,
            lb_pair:         self.address,
            bitmap_ext:      self.bitmap_ext,
            user_token_x:    derive_ata(user, &self.token_x.mint),
            user_token_y:    derive_ata(user, &self.token_y.mint),
            reserve_x:       self.pair.reserve_x,
            reserve_y:       self.pair.reserve_y,
            token_x_mint:    self.token_x.mint,
            token_y_mint:    self.token_y.mint,
            bin_array_lower: derive_bin_array(&self.address, lower),
            bin_array_upper: derive_bin_array(&self.address, lower + 1),
            sender:          *user,
        }
    }

    fn create_user_atas(&self, user: &Pubkey) -> [Instruction; 2] {
        [
            create_ata_idempotent_ix(user, user, &self.token_x.mint),
            create_ata_idempotent_ix(user, user, &self.token_y.mint),
        ]
    }

    /// `initialize_bin_array` for each of the position's two arrays that does not exist yet.
    async fn missing_bin_array_ixs(&self, lower_bin_id: i32, funder: &Pubkey) -> Result<Vec<Instruction>> {
        let lower = bin_array_index(lower_bin_id);
        let indexes = [lower, lower + 1];
        let keys: Vec<Pubkey> = indexes.iter().map(|i| derive_bin_array(&self.address, *i)).collect();
        let existing = self.rpc.get_multiple_accounts(&keys).await?;
        Ok(indexes
            .iter()
            .zip(existing)
            .filter(|(_, acc)| acc.is_none())
            .map(|(index, _)| initialize_bin_array_ix(&self.address, *index, funder))
            .collect())
    }

    async fn position_lower_bin(&self, position: &Pubkey) -> Result<i32> {
        let data = self.rpc.get_account_data(position).await?;
        Ok(parse_position(&data)?.lower_bin_id)
    }
}

#[async_trait]
impl DlmmPool for RpcDlmmPool {
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
        Ok(ActiveBin { bin_id: self.live_pair().await?.active_id })
    }

    async fn positions_by_user(&self, user: &Pubkey) -> Result<PositionsResponse> {
        let config = RpcProgramAccountsConfig {
            filters: Some(vec![
                RpcFilterType::DataSize(POSITION_V2_SIZE),
                RpcFilterType::Memcmp(Memcmp::new(
                    POSITION_LB_PAIR_OFFSET,
                    MemcmpEncodedBytes::Bytes(self.address.to_bytes().to_vec()),
                )),
                RpcFilterType::Memcmp(Memcmp::new(
                    POSITION_OWNER_OFFSET,
                    MemcmpEncodedBytes::Bytes(user.to_bytes().to_vec()),
                )),
            ]),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                ..Default::default()
            },
            ..Default::default()
        };

        let raw = self
            .rpc
            .get_program_accounts_with_config(&DLMM_PROGRAM_ID, config)
            .await?;

        let mut user_positions = Vec::with_capacity(raw.len());
        for (address, account) in raw {
            match parse_position(&account.data) {
                Ok(state) => user_positions.push(state.into_lb_position(address)),
                Err(e) => warn!(position = %address, error = %e, "skipping undecodable position"),
            }
        }
        Ok(PositionsResponse::Wrapped { user_positions })
    }

    async fn add_liquidity_by_strategy(&self, request: AddLiquidityByStrategy) -> Result<TxBatch> {
        let strategy = request.strategy;
        let width = BinWindow { min_bin_id: strategy.min_bin_id, max_bin_id: strategy.max_bin_id }.bin_count();
        if !(1..=i64::from(MAX_BIN_PER_POSITION)).contains(&width) {
            return Err(Error::Sdk(format!(
                "bin range [{}, {}] must span 1..={} bins",
                strategy.min_bin_id, strategy.max_bin_id, MAX_BIN_PER_POSITION
            )));
        }

        let user = request.user;
        let mut ixs = vec![compute_budget_ix()];
        ixs.extend(self.create_user_atas(&user));

        let (position, lower_bin_id, new_position) = match request.position {
            Some(position) => (position, self.position_lower_bin(&position).await?, None),
            None => {
                let keypair = Keypair::new();
                (keypair.pubkey(), strategy.min_bin_id, Some(keypair))
            }
        };

        ixs.extend(self.missing_bin_array_ixs(lower_bin_id, &user).await?);
        if let Some(keypair) = &new_position {
            ixs.push(initialize_position_ix(
                &user,
                &keypair.pubkey(),
                &self.address,
                &user,
                strategy.min_bin_id,
                width as i32,
            ));
        }

        let active_id = self.live_pair().await?.active_id;
        let accounts = self.liquidity_accounts(position, lower_bin_id, &user);
        ixs.push(add_liquidity_by_strategy_ix(
            &accounts,
            request.total_x_amount,
            request.total_y_amount,
            active_id,
            strategy.min_bin_id,
            strategy.max_bin_id,
            strategy.strategy_type,
        ));

        let tx = UnsignedTx::new(ixs);
        Ok(TxBatch::Single(match new_position {
            Some(keypair) => tx.with_signer(keypair),
            None => tx,
        }))
    }

    async fn remove_liquidity(&self, request: RemoveLiquidityRequest) -> Result<TxBatch> {
        if request.bin_ids.len() != request.liquidities_bps_to_remove.len() {
            return Err(Error::Sdk(format!(
                "{} bin ids but {} removal fractions",
                request.bin_ids.len(),
                request.liquidities_bps_to_remove.len()
            )));
        }

        let lower_bin_id = self.position_lower_bin(&request.position).await?;
        let accounts = self.liquidity_accounts(request.position, lower_bin_id, &request.user);
        let reductions: Vec<(i32, u16)> = request
            .bin_ids
            .iter()
            .copied()
            .zip(request.liquidities_bps_to_remove.iter().copied())
            .collect();

        let mut ixs = vec![compute_budget_ix()];
        ixs.extend(self.create_user_atas(&request.user));
        ixs.push(remove_liquidity_ix(&accounts, &reductions));
        let remove = UnsignedTx::new(ixs);

        if !request.should_claim_and_close {
            return Ok(TxBatch::Single(remove));
        }
        let claim_and_close = UnsignedTx::new(vec![
            compute_budget_ix(),
            claim_fee_ix(&accounts),
            close_position_ix(&accounts),
        ]);
        Ok(TxBatch::Many(vec![remove, claim_and_close]))
    }

    async fn bin_arrays_for_swap(&self, swap_for_x: bool) -> Result<Vec<BinArrayAccount>> {
        let start = bin_array_index(self.live_pair().await?.active_id);
        let step = if swap_for_x { 1 } else { -1 };
        let indexes: Vec<i64> = (0..SWAP_BIN_ARRAY_LOOKAHEAD).map(|i| start + i * step).collect();
        let keys: Vec<Pubkey> = indexes.iter().map(|i| derive_bin_array(&self.address, *i)).collect();
        let accounts = self.rpc.get_multiple_accounts(&keys).await?;

        let mut arrays = Vec::new();
        for (address, account) in keys.into_iter().zip(accounts) {
            if let Some(account) = account {
                arrays.push(BinArrayAccount { address, state: parse_bin_array(&account.data)? });
            }
        }
        Ok(arrays)
    }

    async fn swap_quote(
        &self,
        amount_in:    u64,
        swap_for_x:   bool,
        slippage_bps: u16,
        bin_arrays:   &[BinArrayAccount],
    ) -> Result<SwapQuote> {
        let active_id = self.live_pair().await?.active_id;

        let mut bins: Vec<BinLiquidity> = bin_arrays
            .iter()
            .flat_map(|a| a.state.bins.iter().copied())
            .filter(|b| if swap_for_x { b.bin_id >= active_id } else { b.bin_id <= active_id })
            .collect();
        if swap_for_x {
            bins.sort_by_key(|b| b.bin_id);
        } else {
            bins.sort_by_key(|b| std::cmp::Reverse(b.bin_id));
        }

        let quote = quote_exact_in(&bins, amount_in, swap_for_x, self.fee_rate)?;
        Ok(SwapQuote {
            amount_in,
            out_amount:        quote.amount_out,
            min_out_amount:    min_amount_out(quote.amount_out, slippage_bps),
            fee:               quote.fee,
            bin_arrays_pubkey: bin_arrays.iter().map(|a| a.address).collect(),
        })
    }

    async fn swap(&self, request: SwapRequest) -> Result<TxBatch> {
        let accounts = SwapAccounts {
            lb_pair:        request.lb_pair,
            bitmap_ext:     self.bitmap_ext,
            reserve_x:      self.pair.reserve_x,
            reserve_y:      self.pair.reserve_y,
            user_token_in:  derive_ata(&request.user, &request.in_token),
            user_token_out: derive_ata(&request.user, &request.out_token),
            token_x_mint:   self.token_x.mint,
            token_y_mint:   self.token_y.mint,
            oracle:         self.pair.oracle,
            user:           request.user,
            bin_arrays:     request.bin_arrays_pubkey,
        };
        Ok(TxBatch::Single(UnsignedTx::new(vec![
            compute_budget_ix(),
            create_ata_idempotent_ix(&request.user, &request.user, &request.out_token),
            swap_ix(&accounts, request.in_amount, request.min_out_amount),
        ])))
    }

    async fn claim_all_swap_fee(&self, owner: &Pubkey, positions: &[LbPosition]) -> Result<TxBatch> {
        let txs = positions
            .iter()
            .map(|p| {
                let accounts = self.liquidity_accounts(p.public_key, p.position_data.lower_bin_id, owner);
                let mut ixs = vec![compute_budget_ix()];
                ixs.extend(self.create_user_atas(owner));
                ixs.push(claim_fee_ix(&accounts));
                UnsignedTx::new(ixs)
            })
            .collect::<Vec<_>>();
        Ok(TxBatch::Many(txs))
    }

    async fn close_position(&self, owner: &Pubkey, position: &LbPosition) -> Result<TxBatch> {
        let accounts = self.liquidity_accounts(position.public_key, position.position_data.lower_bin_id, owner);
        Ok(TxBatch::Single(UnsignedTx::new(vec![compute_budget_ix(), close_position_ix(&accounts)])))
    }
}
