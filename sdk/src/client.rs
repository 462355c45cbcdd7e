//! [`LiquidityManager`], the operation planner.
//!
//! Every write operation resolves its pool handle from a [`PoolSession`],
//! shapes requests for the handle, then signs and confirms the resulting
//! transactions one at a time.

use std::sync::Arc;

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};
use tracing::{debug, error, info, warn};

use crate::{
    error::{Error, Operation, Result},
    math::{scale_ui_amount, BinWindow, BASIS_POINT_MAX, DEFAULT_DEPOSIT_TOKENS},
    pool::DlmmPool,
    positions::list_user_positions,
    rpc_pool::RpcPoolLoader,
    sender::{RpcSender, TransactionSender},
    session::PoolSession,
    types::{
        ActiveBin, AddLiquidityByStrategy, AddOptions, BalancedOptions, BatchOutcome,
        ImbalancedOptions, LbPosition, MoveOptions, MoveOutcome, MoveProgress, OneSidedOptions,
        RemoveLiquidityRequest, RemoveOptions, StrategyParameters, StrategyType, SwapRequest,
        UnsignedTx,
    },
};

// ─── Constants ────────────────────────────────────────────────────────────────

pub const DEVNET_RPC:  &str = "https://api.devnet.solana.com";
pub const MAINNET_RPC: &str = "https://api.mainnet-beta.solana.com";

// ─── Batch bookkeeping ────────────────────────────────────────────────────────

#[derive(Default)]
struct Tally {
    signatures: Vec<Signature>,
    positions:  Vec<Pubkey>,
    skipped:    Vec<Pubkey>,
}

impl Tally {
    fn finish(self, message: &str) -> BatchOutcome {
        BatchOutcome {
            message:    message.to_string(),
            signatures: self.signatures,
            positions:  self.positions,
            skipped:    self.skipped,
        }
    }
}

fn fail(operation: Operation, completed: Vec<Pubkey>, e: Error) -> Error {
    error!(%operation, completed = completed.len(), error = %e, "operation failed");
    e.during(operation, completed)
}

fn completed_of(e: &Error) -> Vec<Pubkey> {
    match e {
        Error::Failed { completed, .. } => completed.clone(),
        _ => Vec::new(),
    }
}

/// Deposit shape after defaults are applied.
struct Deposit {
    window:        BinWindow,
    x_amount:      u64,
    y_amount:      u64,
    strategy_type: StrategyType,
    position:      Option<Pubkey>,
}

// ─── Planner ──────────────────────────────────────────────────────────────────

/// Async DLMM liquidity planner.
///
/// ```rust,no_run
/// # use dlmm_manager_sdk::{LiquidityManager, RemoveOptions};
/// # use solana_sdk::signature::Keypair;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let (manager, mut session) = LiquidityManager::connect("https://api.mainnet-beta.solana.com");
/// let pool = "71HuFmuYAFEFUna2x2R4HJjrFNQHGuagW3gUMFToL9tk";
/// session.ensure_initialized(pool).await?;
///
/// let user = Keypair::new();
/// if let Some(outcome) = manager.remove_liquidity(&session, &user, pool, RemoveOptions::default()).await? {
///     println!("{}", outcome.message);
/// }
/// # Ok(())
/// # }
/// ```
pub struct LiquidityManager {
    sender: Arc<dyn TransactionSender>,
}

impl LiquidityManager {
    pub fn new(sender: Arc<dyn TransactionSender>) -> Self {
        Self { sender }
    }

    /// Planner and empty session sharing one RPC client at `confirmed` commitment.
    pub fn connect(rpc_url: impl Into<String>) -> (Self, PoolSession) {
        let rpc = Arc::new(RpcClient::new_with_commitment(rpc_url.into(), CommitmentConfig::confirmed()));
        let manager = Self::new(Arc::new(RpcSender::new(rpc.clone())));
        (manager, PoolSession::new(Arc::new(RpcPoolLoader::new(rpc))))
    }

    // ── Read operations ───────────────────────────────────────────────────────

    pub async fn active_bin(&self, session: &PoolSession, pool: &str) -> Result<ActiveBin> {
        session.get_handle(pool)?.active_bin().await
    }

    pub async fn user_positions(&self, session: &PoolSession, pool: &str, user: &Pubkey) -> Result<Vec<LbPosition>> {
        let handle = session.get_handle(pool)?;
        list_user_positions(handle.as_ref(), user).await
    }

    // ── Removal ───────────────────────────────────────────────────────────────

    /// Remove `bps_to_remove` of every bin from each target position.
    ///
    /// Returns `None` when there was nothing to act on. Targets no longer
    /// owned by the user are skipped with a warning.
    pub async fn remove_liquidity(
        &self,
        session: &PoolSession,
        user:    &Keypair,
        pool:    &str,
        options: RemoveOptions,
    ) -> Result<Option<BatchOutcome>> {
        let handle = session.get_handle(pool)?;
        if options.bps_to_remove == 0 || options.bps_to_remove > BASIS_POINT_MAX {
            return Err(Error::InvalidArgument(format!(
                "bps_to_remove must be in 1..={BASIS_POINT_MAX}, got {}",
                options.bps_to_remove
            )));
        }

        let mut tally = Tally::default();
        match self.remove_targets(handle.as_ref(), user, &options, &mut tally).await {
            Ok(true) => Ok(Some(tally.finish("Successfully removed liquidity"))),
            Ok(false) => Ok(None),
            Err(e) => Err(fail(Operation::RemoveLiquidity, tally.positions, e)),
        }
    }

    async fn remove_targets(
        &self,
        pool:    &dyn DlmmPool,
        user:    &Keypair,
        options: &RemoveOptions,
        tally:   &mut Tally,
    ) -> Result<bool> {
        let owner = user.pubkey();
        let targets = match &options.target_positions {
            Some(targets) => targets.clone(),
            None => list_user_positions(pool, &owner)
                .await?
                .into_iter()
                .map(|p| p.public_key)
                .collect(),
        };
        if targets.is_empty() {
            info!(pool = %pool.address(), "no positions to remove liquidity from");
            return Ok(false);
        }

        for target in targets {
            let current = list_user_positions(pool, &owner).await?;
            let Some(position) = current.into_iter().find(|p| p.public_key == target) else {
                warn!(position = %target, "position not found among user positions, skipping");
                tally.skipped.push(target);
                continue;
            };

            let bin_ids = position.bin_ids();
            debug!(position = %target, bins = bin_ids.len(), bps = options.bps_to_remove, "removing liquidity");
            let request = RemoveLiquidityRequest {
                position: target,
                user: owner,
                liquidities_bps_to_remove: vec![options.bps_to_remove; bin_ids.len()],
                bin_ids,
                should_claim_and_close: options.claim_and_close,
            };
            let batch = pool.remove_liquidity(request).await?;
            self.submit(batch.into_transactions(), user, tally).await?;
            tally.positions.push(target);
        }
        Ok(true)
    }

    // ── Addition ──────────────────────────────────────────────────────────────

    /// Deposit into `[active - bin_range, active + bin_range]`, or the
    /// caller's overridden bounds.
    pub async fn add_liquidity(
        &self,
        session:       &PoolSession,
        user:          &Keypair,
        pool:          &str,
        base_decimals: u8,
        options:       AddOptions,
    ) -> Result<BatchOutcome> {
        let handle = session.get_handle(pool)?;
        let mut tally = Tally::default();
        let result = self.add_inner(handle.as_ref(), user, base_decimals, &options, &mut tally).await;
        self.settle(result, Operation::AddLiquidity, tally, "Successfully added liquidity")
    }

    async fn add_inner(
        &self,
        pool:          &dyn DlmmPool,
        user:          &Keypair,
        base_decimals: u8,
        options:       &AddOptions,
        tally:         &mut Tally,
    ) -> Result<()> {
        let active = pool.active_bin().await?;
        let overrides = options.strategy_params;
        let window = BinWindow::balanced(active.bin_id, options.bin_range)?
            .with_overrides(overrides.min_bin_id, overrides.max_bin_id);
        let x_amount = match options.x_amount {
            Some(x) => x,
            None => scale_ui_amount(DEFAULT_DEPOSIT_TOKENS, base_decimals)?,
        };
        let deposit = Deposit {
            window,
            x_amount,
            y_amount: options.y_amount.unwrap_or(0),
            strategy_type: options.strategy_type,
            position: options.existing_position,
        };
        self.deposit(pool, user, deposit, tally).await
    }

    /// Symmetric window, token X only.
    pub async fn create_balanced_position(
        &self,
        session:       &PoolSession,
        user:          &Keypair,
        pool:          &str,
        base_decimals: u8,
        options:       BalancedOptions,
    ) -> Result<BatchOutcome> {
        let handle = session.get_handle(pool)?;
        let add = AddOptions {
            x_amount: options.x_amount,
            bin_range: options.bin_range,
            strategy_type: options.strategy_type,
            ..AddOptions::default()
        };
        let mut tally = Tally::default();
        let result = self.add_inner(handle.as_ref(), user, base_decimals, &add, &mut tally).await;
        self.settle(result, Operation::CreateBalancedPosition, tally, "Successfully added liquidity")
    }

    /// Explicit X and Y amounts over a symmetric window.
    pub async fn create_imbalanced_position(
        &self,
        session:       &PoolSession,
        user:          &Keypair,
        pool:          &str,
        base_decimals: u8,
        options:       ImbalancedOptions,
    ) -> Result<BatchOutcome> {
        let handle = session.get_handle(pool)?;
        let add = AddOptions {
            x_amount: options.x_amount,
            y_amount: options.y_amount,
            bin_range: options.bin_range,
            strategy_type: options.strategy_type,
            ..AddOptions::default()
        };
        let mut tally = Tally::default();
        let result = self.add_inner(handle.as_ref(), user, base_decimals, &add, &mut tally).await;
        self.settle(result, Operation::CreateImbalancedPosition, tally, "Successfully added liquidity")
    }

    /// Single-token deposit on one side of the active bin.
    ///
    /// The X side covers `[a - r + offset, a + offset]` and is funded in X;
    /// the Y side covers `[a + offset, a + r + offset]` and is funded in Y.
    /// A missing amount defaults to 100 whole tokens of the deposited side.
    pub async fn create_one_sided_position(
        &self,
        session: &PoolSession,
        user:    &Keypair,
        pool:    &str,
        options: OneSidedOptions,
    ) -> Result<BatchOutcome> {
        let handle = session.get_handle(pool)?;
        let mut tally = Tally::default();
        let result = self.one_sided_inner(handle.as_ref(), user, &options, &mut tally).await;
        self.settle(result, Operation::CreateOneSidedPosition, tally, "Successfully added liquidity")
    }

    async fn one_sided_inner(
        &self,
        pool:    &dyn DlmmPool,
        user:    &Keypair,
        options: &OneSidedOptions,
        tally:   &mut Tally,
    ) -> Result<()> {
        let active = pool.active_bin().await?;
        let window = BinWindow::one_sided(active.bin_id, options.bin_range, options.offset, options.is_x_side)?;
        let side = if options.is_x_side { pool.token_x() } else { pool.token_y() };
        let amount = match options.amount {
            Some(amount) => amount,
            None => scale_ui_amount(DEFAULT_DEPOSIT_TOKENS, side.decimals)?,
        };
        let (x_amount, y_amount) = if options.is_x_side { (amount, 0) } else { (0, amount) };
        let deposit = Deposit { window, x_amount, y_amount, strategy_type: StrategyType::Spot, position: None };
        self.deposit(pool, user, deposit, tally).await
    }

    async fn deposit(&self, pool: &dyn DlmmPool, user: &Keypair, deposit: Deposit, tally: &mut Tally) -> Result<()> {
        // Bound ordering is left to the pool handle.
        let window = deposit.window;
        debug!(
            pool = %pool.address(),
            min_bin_id = window.min_bin_id,
            max_bin_id = window.max_bin_id,
            x = deposit.x_amount,
            y = deposit.y_amount,
            strategy = %deposit.strategy_type,
            "adding liquidity"
        );

        let request = AddLiquidityByStrategy {
            user:           user.pubkey(),
            position:       deposit.position,
            total_x_amount: deposit.x_amount,
            total_y_amount: deposit.y_amount,
            strategy: StrategyParameters {
                min_bin_id:    window.min_bin_id,
                max_bin_id:    window.max_bin_id,
                strategy_type: deposit.strategy_type,
            },
        };
        let txs = pool.add_liquidity_by_strategy(request).await?.into_transactions();
        let opened: Vec<Pubkey> = txs
            .iter()
            .flat_map(|tx| tx.extra_signers.iter().map(|k| k.pubkey()))
            .collect();
        self.submit(txs, user, tally).await?;
        tally.positions.extend(deposit.position.into_iter().chain(opened));
        Ok(())
    }

    // ── Swap ──────────────────────────────────────────────────────────────────

    /// Exact-in swap guarded by a quoted minimum output.
    ///
    /// `is_x_to_y = true` sells token X for token Y.
    pub async fn swap(
        &self,
        session:      &PoolSession,
        user:         &Keypair,
        pool:         &str,
        amount:       u64,
        is_x_to_y:    bool,
        slippage_bps: u16,
    ) -> Result<Signature> {
        let handle = session.get_handle(pool)?;
        self.swap_inner(handle.as_ref(), user, amount, is_x_to_y, slippage_bps)
            .await
            .map_err(|e| fail(Operation::Swap, Vec::new(), e))
    }

    async fn swap_inner(
        &self,
        pool:         &dyn DlmmPool,
        user:         &Keypair,
        amount:       u64,
        is_x_to_y:    bool,
        slippage_bps: u16,
    ) -> Result<Signature> {
        let swap_for_x = !is_x_to_y;
        let bin_arrays = pool.bin_arrays_for_swap(swap_for_x).await?;
        let quote = pool.swap_quote(amount, swap_for_x, slippage_bps, &bin_arrays).await?;
        debug!(amount, out = quote.out_amount, min_out = quote.min_out_amount, fee = quote.fee, "swap quote");

        let (in_token, out_token) = if is_x_to_y {
            (pool.token_x().mint, pool.token_y().mint)
        } else {
            (pool.token_y().mint, pool.token_x().mint)
        };
        let batch = pool
            .swap(SwapRequest {
                in_token,
                out_token,
                in_amount:         amount,
                min_out_amount:    quote.min_out_amount,
                bin_arrays_pubkey: quote.bin_arrays_pubkey,
                lb_pair:           pool.address(),
                user:              user.pubkey(),
            })
            .await?;

        let mut tally = Tally::default();
        self.submit(batch.into_transactions(), user, &mut tally).await?;
        tally
            .signatures
            .last()
            .copied()
            .ok_or_else(|| Error::Sdk("swap produced no transaction".into()))
    }

    // ── Migration ─────────────────────────────────────────────────────────────

    /// Withdraw from `from_pool`, then deposit into `to_pool`.
    ///
    /// `progress` records a confirmed removal. Passing the same marker again
    /// after an addition fault skips straight to the deposit. An addition
    /// fault lists the withdrawn positions in `completed` too.
    #[allow(clippy::too_many_arguments)]
    pub async fn move_funds(
        &self,
        session:       &PoolSession,
        user:          &Keypair,
        from_pool:     &str,
        to_pool:       &str,
        base_decimals: u8,
        options:       MoveOptions,
        progress:      &mut MoveProgress,
    ) -> Result<MoveOutcome> {
        session.get_handle(from_pool)?;
        session.get_handle(to_pool)?;

        if progress.removal_complete {
            info!(from = from_pool, "removal already confirmed, resuming at addition");
        } else {
            let removal = self
                .remove_liquidity(session, user, from_pool, options.remove)
                .await
                .map_err(|e| fail(Operation::MoveFunds, completed_of(&e), e))?;
            progress.removal = removal;
            progress.removal_complete = true;
            info!(from = from_pool, "removal phase confirmed");
        }

        let addition = self
            .add_liquidity(session, user, to_pool, base_decimals, options.add)
            .await
            .map_err(|e| {
                let mut completed = progress.removal.as_ref().map(|r| r.positions.clone()).unwrap_or_default();
                completed.extend(completed_of(&e));
                fail(Operation::MoveFunds, completed, e)
            })?;

        Ok(MoveOutcome {
            success:  true,
            message:  format!("Successfully moved funds from {from_pool} to {to_pool}"),
            removal:  progress.removal.clone(),
            addition,
        })
    }

    // ── Fees and closing ──────────────────────────────────────────────────────

    /// Claim accumulated swap fees for the target positions (default: all owned).
    pub async fn claim_swap_fees(
        &self,
        session: &PoolSession,
        user:    &Keypair,
        pool:    &str,
        targets: Option<Vec<Pubkey>>,
    ) -> Result<Option<BatchOutcome>> {
        let handle = session.get_handle(pool)?;
        let mut tally = Tally::default();
        match self.claim_inner(handle.as_ref(), user, targets, &mut tally).await {
            Ok(true) => Ok(Some(tally.finish("Successfully claimed swap fees"))),
            Ok(false) => Ok(None),
            Err(e) => Err(fail(Operation::ClaimSwapFees, tally.positions, e)),
        }
    }

    async fn claim_inner(
        &self,
        pool:    &dyn DlmmPool,
        user:    &Keypair,
        targets: Option<Vec<Pubkey>>,
        tally:   &mut Tally,
    ) -> Result<bool> {
        let Some(positions) = self.resolve_targets(pool, &user.pubkey(), targets, tally).await? else {
            return Ok(false);
        };
        if positions.is_empty() {
            return Ok(true);
        }
        let batch = pool.claim_all_swap_fee(&user.pubkey(), &positions).await?;
        self.submit(batch.into_transactions(), user, tally).await?;
        tally.positions.extend(positions.iter().map(|p| p.public_key));
        Ok(true)
    }

    /// Close the target positions one by one (default: all owned).
    pub async fn close_positions(
        &self,
        session: &PoolSession,
        user:    &Keypair,
        pool:    &str,
        targets: Option<Vec<Pubkey>>,
    ) -> Result<Option<BatchOutcome>> {
        let handle = session.get_handle(pool)?;
        let mut tally = Tally::default();
        match self.close_inner(handle.as_ref(), user, targets, &mut tally).await {
            Ok(true) => Ok(Some(tally.finish("Successfully closed positions"))),
            Ok(false) => Ok(None),
            Err(e) => Err(fail(Operation::ClosePositions, tally.positions, e)),
        }
    }

    async fn close_inner(
        &self,
        pool:    &dyn DlmmPool,
        user:    &Keypair,
        targets: Option<Vec<Pubkey>>,
        tally:   &mut Tally,
    ) -> Result<bool> {
        let Some(positions) = self.resolve_targets(pool, &user.pubkey(), targets, tally).await? else {
            return Ok(false);
        };
        for position in positions {
            let batch = pool.close_position(&user.pubkey(), &position).await?;
            self.submit(batch.into_transactions(), user, tally).await?;
            tally.positions.push(position.public_key);
        }
        Ok(true)
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    /// Owned positions matching `targets`, or all owned positions.
    ///
    /// `None` means there was nothing to act on at all.
    async fn resolve_targets(
        &self,
        pool:    &dyn DlmmPool,
        owner:   &Pubkey,
        targets: Option<Vec<Pubkey>>,
        tally:   &mut Tally,
    ) -> Result<Option<Vec<LbPosition>>> {
        let owned = list_user_positions(pool, owner).await?;
        let Some(targets) = targets else {
            return Ok((!owned.is_empty()).then_some(owned));
        };
        if targets.is_empty() {
            return Ok(None);
        }

        let mut selected = Vec::with_capacity(targets.len());
        for target in targets {
            match owned.iter().find(|p| p.public_key == target) {
                Some(position) => selected.push(position.clone()),
                None => {
                    warn!(position = %target, "position not found among user positions, skipping");
                    tally.skipped.push(target);
                }
            }
        }
        Ok(Some(selected))
    }

    fn settle(&self, result: Result<()>, operation: Operation, tally: Tally, message: &str) -> Result<BatchOutcome> {
        match result {
            Ok(()) => Ok(tally.finish(message)),
            Err(e) => Err(fail(operation, tally.positions, e)),
        }
    }

    /// Sign and confirm `txs` in order, stopping at the first failure.
    async fn submit(&self, txs: Vec<UnsignedTx>, user: &Keypair, tally: &mut Tally) -> Result<()> {
        let total = txs.len();
        for (i, tx) in txs.into_iter().enumerate() {
            let sig = self.sender.send_and_confirm(tx, user).await?;
            info!(signature = %sig, "confirmed transaction {}/{}", i + 1, total);
            tally.signatures.push(sig);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::testing::{position, Call, Log, MockLoader, MockPool, MockSender};
    use crate::types::StrategyOverrides;

    struct Harness {
        manager: LiquidityManager,
        session: PoolSession,
        user:    Keypair,
        log:     Log,
    }

    async fn harness(pools: Vec<Arc<MockPool>>, log: Log, sender: MockSender) -> Harness {
        let addresses: Vec<String> = pools.iter().map(|p| p.address.to_string()).collect();
        let mut session = PoolSession::new(Arc::new(MockLoader::with(pools)));
        for address in &addresses {
            session.ensure_initialized(address).await.unwrap();
        }
        Harness { manager: LiquidityManager::new(Arc::new(sender)), session, user: Keypair::new(), log }
    }

    fn new_log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn calls(log: &Log) -> Vec<Call> {
        log.lock().unwrap().clone()
    }

    fn adds(log: &Log) -> Vec<AddLiquidityByStrategy> {
        calls(log)
            .into_iter()
            .filter_map(|c| match c {
                Call::Add { request, .. } => Some(request),
                _ => None,
            })
            .collect()
    }

    fn removes(log: &Log) -> Vec<RemoveLiquidityRequest> {
        calls(log)
            .into_iter()
            .filter_map(|c| match c {
                Call::Remove { request, .. } => Some(request),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn remove_with_no_positions_returns_none() {
        let log = new_log();
        let pool = Arc::new(MockPool::new(100, log.clone()));
        let addr = pool.address.to_string();
        let h = harness(vec![pool], log.clone(), MockSender::new(log.clone())).await;

        let out = h.manager.remove_liquidity(&h.session, &h.user, &addr, RemoveOptions::default()).await.unwrap();

        assert!(out.is_none());
        assert!(removes(&log).is_empty());
        assert!(!calls(&log).contains(&Call::Sent));
    }

    #[tokio::test]
    async fn remove_applies_bps_to_every_bin() {
        let log = new_log();
        let user = Keypair::new();
        let p = position(user.pubkey(), 98..=102);
        let pool = Arc::new(MockPool::new(100, log.clone()).with_positions(vec![p.clone()]));
        let addr = pool.address.to_string();
        let mut h = harness(vec![pool], log.clone(), MockSender::new(log.clone())).await;
        h.user = user;

        let out = h
            .manager
            .remove_liquidity(&h.session, &h.user, &addr, RemoveOptions::default())
            .await
            .unwrap()
            .unwrap();

        let reqs = removes(&log);
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].position, p.public_key);
        assert_eq!(reqs[0].bin_ids, vec![98, 99, 100, 101, 102]);
        assert_eq!(reqs[0].liquidities_bps_to_remove, vec![10_000; 5]);
        assert!(reqs[0].should_claim_and_close);
        assert_eq!(out.message, "Successfully removed liquidity");
        assert_eq!(out.signatures.len(), 2);
        assert_eq!(out.positions, vec![p.public_key]);
    }

    #[tokio::test]
    async fn remove_skips_targets_the_user_no_longer_owns() {
        let log = new_log();
        let user = Keypair::new();
        let p = position(user.pubkey(), 0..=0);
        let gone = Pubkey::new_unique();
        let pool = Arc::new(MockPool::new(0, log.clone()).with_positions(vec![p.clone()]));
        let addr = pool.address.to_string();
        let mut h = harness(vec![pool], log.clone(), MockSender::new(log.clone())).await;
        h.user = user;

        let options = RemoveOptions {
            target_positions: Some(vec![gone, p.public_key]),
            bps_to_remove: 5_000,
            claim_and_close: false,
        };
        let out = h.manager.remove_liquidity(&h.session, &h.user, &addr, options).await.unwrap().unwrap();

        assert_eq!(out.skipped, vec![gone]);
        assert_eq!(out.positions, vec![p.public_key]);
        assert_eq!(removes(&log)[0].liquidities_bps_to_remove, vec![5_000]);
    }

    #[tokio::test]
    async fn remove_rejects_out_of_range_bps() {
        let log = new_log();
        let pool = Arc::new(MockPool::new(0, log.clone()));
        let addr = pool.address.to_string();
        let h = harness(vec![pool], log.clone(), MockSender::new(log.clone())).await;

        let options = RemoveOptions { bps_to_remove: 10_001, ..RemoveOptions::default() };
        let err = h.manager.remove_liquidity(&h.session, &h.user, &addr, options).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn partial_failure_reports_completed_positions() {
        let log = new_log();
        let user = Keypair::new();
        let first = position(user.pubkey(), 0..=2);
        let second = position(user.pubkey(), 3..=5);
        let pool = Arc::new(
            MockPool::new(0, log.clone()).with_positions(vec![first.clone(), second.clone()]),
        );
        let addr = pool.address.to_string();
        // Each removal is two transactions; the third send fails.
        let sender = MockSender { fail_at: Some(2), ..MockSender::new(log.clone()) };
        let mut h = harness(vec![pool], log.clone(), sender).await;
        h.user = user;

        let err = h
            .manager
            .remove_liquidity(&h.session, &h.user, &addr, RemoveOptions::default())
            .await
            .unwrap_err();

        match err {
            Error::Failed { operation, completed, .. } => {
                assert_eq!(operation, Operation::RemoveLiquidity);
                assert_eq!(completed, vec![first.public_key]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn position_query_fault_is_not_an_empty_list() {
        let log = new_log();
        let mut pool = MockPool::new(0, log.clone());
        pool.fail_positions = true;
        let pool = Arc::new(pool);
        let addr = pool.address.to_string();
        let h = harness(vec![pool], log.clone(), MockSender::new(log.clone())).await;

        let err = h
            .manager
            .remove_liquidity(&h.session, &h.user, &addr, RemoveOptions::default())
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Failed to remove liquidity"));
        match err {
            Error::Failed { source, .. } => assert!(matches!(*source, Error::PositionQuery { .. })),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn operations_on_unknown_pool_are_not_initialized() {
        let log = new_log();
        let h = harness(Vec::new(), log.clone(), MockSender::new(log.clone())).await;
        let unknown = Pubkey::new_unique().to_string();

        let err = h
            .manager
            .add_liquidity(&h.session, &h.user, &unknown, 6, AddOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotInitialized(ref p) if *p == unknown));
        assert!(err.to_string().contains("not initialized"));
    }

    #[tokio::test]
    async fn add_defaults_to_100_tokens_of_x_over_balanced_window() {
        let log = new_log();
        let pool = Arc::new(MockPool::new(100, log.clone()));
        let addr = pool.address.to_string();
        let h = harness(vec![pool], log.clone(), MockSender::new(log.clone())).await;

        let out = h
            .manager
            .add_liquidity(&h.session, &h.user, &addr, 6, AddOptions::default())
            .await
            .unwrap();

        let req = &adds(&log)[0];
        assert_eq!((req.strategy.min_bin_id, req.strategy.max_bin_id), (90, 110));
        assert_eq!(req.strategy.strategy_type, StrategyType::Spot);
        assert_eq!(req.total_x_amount, 100_000_000);
        assert_eq!(req.total_y_amount, 0);
        assert!(req.position.is_none());
        assert_eq!(out.message, "Successfully added liquidity");
        // The freshly opened position is reported.
        assert_eq!(out.positions.len(), 1);
    }

    #[tokio::test]
    async fn add_strategy_params_override_computed_bounds() {
        let log = new_log();
        let pool = Arc::new(MockPool::new(100, log.clone()));
        let addr = pool.address.to_string();
        let h = harness(vec![pool], log.clone(), MockSender::new(log.clone())).await;

        let options = AddOptions {
            strategy_params: StrategyOverrides { min_bin_id: Some(95), max_bin_id: None },
            ..AddOptions::default()
        };
        h.manager.add_liquidity(&h.session, &h.user, &addr, 6, options).await.unwrap();

        let req = &adds(&log)[0];
        assert_eq!((req.strategy.min_bin_id, req.strategy.max_bin_id), (95, 110));
    }

    #[tokio::test]
    async fn one_sided_positions_shift_the_window() {
        let log = new_log();
        let pool = Arc::new(MockPool::new(100, log.clone()));
        let addr = pool.address.to_string();
        let h = harness(vec![pool], log.clone(), MockSender::new(log.clone())).await;

        let x_side = OneSidedOptions { bin_range: 5, ..OneSidedOptions::default() };
        h.manager.create_one_sided_position(&h.session, &h.user, &addr, x_side).await.unwrap();
        let y_side = OneSidedOptions { bin_range: 5, is_x_side: false, offset: 2, ..OneSidedOptions::default() };
        h.manager.create_one_sided_position(&h.session, &h.user, &addr, y_side).await.unwrap();

        let reqs = adds(&log);
        assert_eq!((reqs[0].strategy.min_bin_id, reqs[0].strategy.max_bin_id), (95, 100));
        assert_eq!((reqs[0].total_x_amount, reqs[0].total_y_amount), (100_000_000, 0));
        assert_eq!((reqs[1].strategy.min_bin_id, reqs[1].strategy.max_bin_id), (102, 107));
        // Token Y has 9 decimals in the mock pool.
        assert_eq!((reqs[1].total_x_amount, reqs[1].total_y_amount), (0, 100_000_000_000));
    }

    #[tokio::test]
    async fn swap_negates_direction_for_the_pool_handle() {
        let log = new_log();
        let pool = Arc::new(MockPool::new(0, log.clone()));
        let addr = pool.address.to_string();
        let (x, y) = (pool.token_x.mint, pool.token_y.mint);
        let h = harness(vec![pool], log.clone(), MockSender::new(log.clone())).await;

        h.manager.swap(&h.session, &h.user, &addr, 1_000, true, 100).await.unwrap();

        let calls = calls(&log);
        assert!(calls.contains(&Call::BinArrays { swap_for_x: false }));
        assert!(calls.contains(&Call::Quote { swap_for_x: false, amount_in: 1_000 }));
        let request = calls
            .iter()
            .find_map(|c| match c {
                Call::Swap { request } => Some(request.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!((request.in_token, request.out_token), (x, y));
        assert_eq!(request.min_out_amount, 1_999);
    }

    #[tokio::test]
    async fn move_removes_from_source_before_adding_to_target() {
        let log = new_log();
        let user = Keypair::new();
        let p = position(user.pubkey(), 10..=12);
        let from = Arc::new(MockPool::new(11, log.clone()).with_positions(vec![p.clone()]));
        let to = Arc::new(MockPool::new(50, log.clone()));
        let (from_addr, to_addr) = (from.address, to.address);
        let mut h = harness(vec![from, to], log.clone(), MockSender::new(log.clone())).await;
        h.user = user;

        let mut progress = MoveProgress::default();
        let out = h
            .manager
            .move_funds(
                &h.session,
                &h.user,
                &from_addr.to_string(),
                &to_addr.to_string(),
                6,
                MoveOptions::default(),
                &mut progress,
            )
            .await
            .unwrap();

        let calls = calls(&log);
        let remove_at = calls
            .iter()
            .position(|c| matches!(c, Call::Remove { pool, .. } if *pool == from_addr))
            .unwrap();
        let add_at = calls
            .iter()
            .position(|c| matches!(c, Call::Add { pool, .. } if *pool == to_addr))
            .unwrap();
        assert!(remove_at < add_at);
        assert_eq!(removes(&log)[0].liquidities_bps_to_remove, vec![10_000; 3]);
        assert!(progress.removal_complete);
        assert!(out.success);
        assert_eq!(out.message, format!("Successfully moved funds from {from_addr} to {to_addr}"));
    }

    #[tokio::test]
    async fn move_resumes_at_addition_when_removal_already_confirmed() {
        let log = new_log();
        let user = Keypair::new();
        let from = Arc::new(MockPool::new(0, log.clone()).with_positions(vec![position(user.pubkey(), 0..=0)]));
        let to = Arc::new(MockPool::new(0, log.clone()));
        let (from_addr, to_addr) = (from.address.to_string(), to.address.to_string());
        let mut h = harness(vec![from, to], log.clone(), MockSender::new(log.clone())).await;
        h.user = user;

        let mut progress = MoveProgress { removal_complete: true, removal: None };
        h.manager
            .move_funds(&h.session, &h.user, &from_addr, &to_addr, 6, MoveOptions::default(), &mut progress)
            .await
            .unwrap();

        assert!(removes(&log).is_empty());
        assert_eq!(adds(&log).len(), 1);
    }

    #[tokio::test]
    async fn claim_covers_all_owned_positions_by_default() {
        let log = new_log();
        let user = Keypair::new();
        let a = position(user.pubkey(), 0..=1);
        let b = position(user.pubkey(), 2..=3);
        let pool = Arc::new(MockPool::new(0, log.clone()).with_positions(vec![a.clone(), b.clone()]));
        let pool_addr = pool.address;
        let mut h = harness(vec![pool], log.clone(), MockSender::new(log.clone())).await;
        h.user = user;

        let out = h
            .manager
            .claim_swap_fees(&h.session, &h.user, &pool_addr.to_string(), None)
            .await
            .unwrap()
            .unwrap();

        assert!(calls(&log).contains(&Call::Claim { pool: pool_addr, positions: vec![a.public_key, b.public_key] }));
        assert_eq!(out.signatures.len(), 2);
        assert_eq!(out.message, "Successfully claimed swap fees");
    }

    #[tokio::test]
    async fn close_runs_one_position_at_a_time() {
        let log = new_log();
        let user = Keypair::new();
        let a = position(user.pubkey(), 0..=1);
        let b = position(user.pubkey(), 2..=3);
        let pool = Arc::new(MockPool::new(0, log.clone()).with_positions(vec![a.clone(), b.clone()]));
        let pool_addr = pool.address;
        let mut h = harness(vec![pool], log.clone(), MockSender::new(log.clone())).await;
        h.user = user;

        let out = h
            .manager
            .close_positions(&h.session, &h.user, &pool_addr.to_string(), None)
            .await
            .unwrap()
            .unwrap();

        let sequence: Vec<Call> = calls(&log)
            .into_iter()
            .filter(|c| matches!(c, Call::Close { .. } | Call::Sent))
            .collect();
        assert_eq!(
            sequence,
            vec![
                Call::Close { pool: pool_addr, position: a.public_key },
                Call::Sent,
                Call::Close { pool: pool_addr, position: b.public_key },
                Call::Sent,
            ]
        );
        assert_eq!(out.positions, vec![a.public_key, b.public_key]);
    }

    #[tokio::test]
    async fn close_with_no_positions_returns_none() {
        let log = new_log();
        let pool = Arc::new(MockPool::new(0, log.clone()));
        let addr = pool.address.to_string();
        let h = harness(vec![pool], log.clone(), MockSender::new(log.clone())).await;

        assert!(h.manager.close_positions(&h.session, &h.user, &addr, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn add_with_extreme_range_is_an_overflow_error() {
        let log = new_log();
        let pool = Arc::new(MockPool::new(100, log.clone()));
        let addr = pool.address.to_string();
        let h = harness(vec![pool], log.clone(), MockSender::new(log.clone())).await;

        let options = AddOptions { bin_range: i32::MAX, ..AddOptions::default() };
        let err = h.manager.add_liquidity(&h.session, &h.user, &addr, 6, options).await.unwrap_err();

        match err {
            Error::Failed { operation, source, .. } => {
                assert_eq!(operation, Operation::AddLiquidity);
                assert!(matches!(*source, Error::MathOverflow));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(adds(&log).is_empty());
    }

    #[tokio::test]
    async fn inverted_override_is_passed_to_the_pool_handle() {
        let log = new_log();
        let pool = Arc::new(MockPool::new(100, log.clone()));
        let addr = pool.address.to_string();
        let h = harness(vec![pool], log.clone(), MockSender::new(log.clone())).await;

        let options = AddOptions {
            strategy_params: StrategyOverrides { min_bin_id: Some(200), max_bin_id: None },
            ..AddOptions::default()
        };
        h.manager.add_liquidity(&h.session, &h.user, &addr, 6, options).await.unwrap();

        let req = &adds(&log)[0];
        assert_eq!((req.strategy.min_bin_id, req.strategy.max_bin_id), (200, 110));
    }

    #[tokio::test]
    async fn add_into_existing_position_reports_that_position() {
        let log = new_log();
        let pool = Arc::new(MockPool::new(100, log.clone()));
        let addr = pool.address.to_string();
        let h = harness(vec![pool], log.clone(), MockSender::new(log.clone())).await;
        let existing = Pubkey::new_unique();

        let options = AddOptions { existing_position: Some(existing), x_amount: Some(42), ..AddOptions::default() };
        let out = h.manager.add_liquidity(&h.session, &h.user, &addr, 6, options).await.unwrap();

        let req = &adds(&log)[0];
        assert_eq!(req.position, Some(existing));
        assert_eq!(req.total_x_amount, 42);
        assert_eq!(out.positions, vec![existing]);
        assert_eq!(out.signatures.len(), 1);
    }

    #[tokio::test]
    async fn balanced_position_deposits_x_over_symmetric_window() {
        let log = new_log();
        let pool = Arc::new(MockPool::new(100, log.clone()));
        let addr = pool.address.to_string();
        let h = harness(vec![pool], log.clone(), MockSender::new(log.clone())).await;

        let options = BalancedOptions { x_amount: Some(5_000), bin_range: 3, strategy_type: StrategyType::Curve };
        let out = h.manager.create_balanced_position(&h.session, &h.user, &addr, 6, options).await.unwrap();

        let req = &adds(&log)[0];
        assert_eq!((req.strategy.min_bin_id, req.strategy.max_bin_id), (97, 103));
        assert_eq!((req.total_x_amount, req.total_y_amount), (5_000, 0));
        assert_eq!(req.strategy.strategy_type, StrategyType::Curve);
        assert_eq!(out.message, "Successfully added liquidity");
    }

    #[tokio::test]
    async fn imbalanced_position_deposits_both_sides() {
        let log = new_log();
        let pool = Arc::new(MockPool::new(-20, log.clone()));
        let addr = pool.address.to_string();
        let h = harness(vec![pool], log.clone(), MockSender::new(log.clone())).await;

        let options = ImbalancedOptions {
            x_amount: Some(1_000),
            y_amount: Some(3_000),
            bin_range: 7,
            ..ImbalancedOptions::default()
        };
        h.manager.create_imbalanced_position(&h.session, &h.user, &addr, 6, options).await.unwrap();

        let req = &adds(&log)[0];
        assert_eq!((req.strategy.min_bin_id, req.strategy.max_bin_id), (-27, -13));
        assert_eq!((req.total_x_amount, req.total_y_amount), (1_000, 3_000));
    }

    #[tokio::test]
    async fn position_variants_name_themselves_in_failures() {
        let log = new_log();
        let pool = Arc::new(MockPool::new(0, log.clone()));
        let addr = pool.address.to_string();
        let sender = MockSender { fail_at: Some(0), ..MockSender::new(log.clone()) };
        let h = harness(vec![pool], log.clone(), sender).await;

        let balanced = h
            .manager
            .create_balanced_position(&h.session, &h.user, &addr, 6, BalancedOptions::default())
            .await
            .unwrap_err();
        assert!(balanced.to_string().starts_with("Failed to create balanced position"));

        let imbalanced = h
            .manager
            .create_imbalanced_position(&h.session, &h.user, &addr, 6, ImbalancedOptions::default())
            .await
            .unwrap_err();
        assert!(imbalanced.to_string().starts_with("Failed to create imbalanced position"));
    }

    #[tokio::test]
    async fn move_addition_fault_lists_withdrawn_positions() {
        let log = new_log();
        let user = Keypair::new();
        let p = position(user.pubkey(), 0..=1);
        let from = Arc::new(MockPool::new(0, log.clone()).with_positions(vec![p.clone()]));
        let to = Arc::new(MockPool::new(0, log.clone()));
        let (from_addr, to_addr) = (from.address.to_string(), to.address.to_string());
        // Removal sends two transactions; the addition's send fails.
        let sender = MockSender { fail_at: Some(2), ..MockSender::new(log.clone()) };
        let mut h = harness(vec![from, to], log.clone(), sender).await;
        h.user = user;

        let mut progress = MoveProgress::default();
        let err = h
            .manager
            .move_funds(&h.session, &h.user, &from_addr, &to_addr, 6, MoveOptions::default(), &mut progress)
            .await
            .unwrap_err();

        assert!(progress.removal_complete);
        match err {
            Error::Failed { operation, completed, .. } => {
                assert_eq!(operation, Operation::MoveFunds);
                assert_eq!(completed, vec![p.public_key]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn claim_skips_targets_the_user_does_not_own() {
        let log = new_log();
        let user = Keypair::new();
        let mine = position(user.pubkey(), 0..=1);
        let stranger = Pubkey::new_unique();
        let pool = Arc::new(MockPool::new(0, log.clone()).with_positions(vec![mine.clone()]));
        let pool_addr = pool.address;
        let mut h = harness(vec![pool], log.clone(), MockSender::new(log.clone())).await;
        h.user = user;

        let out = h
            .manager
            .claim_swap_fees(&h.session, &h.user, &pool_addr.to_string(), Some(vec![stranger, mine.public_key]))
            .await
            .unwrap()
            .unwrap();

        assert!(calls(&log).contains(&Call::Claim { pool: pool_addr, positions: vec![mine.public_key] }));
        assert_eq!(out.skipped, vec![stranger]);
        assert_eq!(out.positions, vec![mine.public_key]);
    }

    #[tokio::test]
    async fn close_skips_targets_the_user_does_not_own() {
        let log = new_log();
        let user = Keypair::new();
        let mine = position(user.pubkey(), 0..=1);
        let stranger = Pubkey::new_unique();
        let pool = Arc::new(MockPool::new(0, log.clone()).with_positions(vec![mine.clone()]));
        let pool_addr = pool.address;
        let mut h = harness(vec![pool], log.clone(), MockSender::new(log.clone())).await;
        h.user = user;

        let out = h
            .manager
            .close_positions(&h.session, &h.user, &pool_addr.to_string(), Some(vec![mine.public_key, stranger]))
            .await
            .unwrap()
            .unwrap();

        let closed: Vec<Call> = calls(&log).into_iter().filter(|c| matches!(c, Call::Close { .. })).collect();
        assert_eq!(closed, vec![Call::Close { pool: pool_addr, position: mine.public_key }]);
        assert_eq!(out.skipped, vec![stranger]);
        assert_eq!(out.positions, vec![mine.public_key]);
    }
}
