//! Registry of loaded pool handles, keyed by the caller's address string.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info};

use crate::error::{Error, Operation, Result};
use crate::pool::{DlmmPool, PoolLoader};

/// Owns every pool handle for the lifetime of the process.
///
/// Keys are the address strings exactly as supplied; no normalization is
/// applied, so two spellings of the same key are two entries.
pub struct PoolSession {
    loader: Arc<dyn PoolLoader>,
    pools:  HashMap<String, Arc<dyn DlmmPool>>,
}

impl PoolSession {
    pub fn new(loader: Arc<dyn PoolLoader>) -> Self {
        Self { loader, pools: HashMap::new() }
    }

    /// Load a handle for `pool_address` unless one is already registered.
    pub async fn ensure_initialized(&mut self, pool_address: &str) -> Result<()> {
        if self.pools.contains_key(pool_address) {
            debug!(pool = pool_address, "pool already initialized");
            return Ok(());
        }
        let handle = Self::load_handle(self.loader.as_ref(), pool_address).await?;
        self.register(pool_address, handle);
        Ok(())
    }

    /// Loader shared with callers that load outside the session's lock.
    pub fn loader(&self) -> Arc<dyn PoolLoader> {
        self.loader.clone()
    }

    /// Parse `pool_address` and load its handle without touching any session.
    pub async fn load_handle(loader: &dyn PoolLoader, pool_address: &str) -> Result<Arc<dyn DlmmPool>> {
        let address = Pubkey::from_str(pool_address)
            .map_err(|_| Error::InvalidAddress(pool_address.to_string()))
            .map_err(|e| e.during(Operation::InitializePool, Vec::new()))?;
        loader
            .load(&address)
            .await
            .map_err(|e| e.during(Operation::InitializePool, Vec::new()))
    }

    /// Store `handle` under `pool_address`. A handle registered first wins
    /// and is returned in place of `handle`.
    pub fn register(&mut self, pool_address: &str, handle: Arc<dyn DlmmPool>) -> Arc<dyn DlmmPool> {
        self.pools
            .entry(pool_address.to_string())
            .or_insert_with(|| {
                info!(pool = pool_address, "initialized DLMM pool");
                handle
            })
            .clone()
    }

    /// The registered handle, or `NotInitialized`.
    pub fn get_handle(&self, pool_address: &str) -> Result<Arc<dyn DlmmPool>> {
        self.pools
            .get(pool_address)
            .cloned()
            .ok_or_else(|| Error::NotInitialized(pool_address.to_string()))
    }

    pub fn contains(&self, pool_address: &str) -> bool {
        self.pools.contains_key(pool_address)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}
