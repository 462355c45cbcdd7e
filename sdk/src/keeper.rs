//! Read-only client for the DLMM analytics API.
//!
//! One method per endpoint. Each call is a single GET whose JSON body is
//! passed through untouched; there is no retry, caching, or page walking.

use std::collections::BTreeMap;

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, error};

use crate::error::{Error, Result};

/// Public analytics origin.
pub const BASE_URL: &str = "https://dlmm-api.meteora.ag";

/// Free-form query parameters forwarded as-is.
pub type Params = BTreeMap<String, String>;

#[derive(Debug, Clone)]
pub struct KeeperClient {
    http:     reqwest::Client,
    base_url: String,
}

impl Default for KeeperClient {
    fn default() -> Self {
        Self::new()
    }
}

impl KeeperClient {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    /// Point the client at another origin (a mirror or a local mock).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http:     reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ── Protocol ──────────────────────────────────────────────────────────────

    pub async fn protocol_metrics(&self) -> Result<Value> {
        self.get("/info/protocol_metrics", &[]).await
    }

    // ── Pairs ─────────────────────────────────────────────────────────────────

    pub async fn all_pairs(&self, include_unknown: bool) -> Result<Value> {
        self.get("/pair/all", &[("include_unknown", include_unknown.to_string())]).await
    }

    pub async fn all_pairs_by_groups(&self, params: &Params) -> Result<Value> {
        self.get("/pair/all_by_groups", &pairs(params)).await
    }

    pub async fn all_pairs_by_groups_metadata(&self, params: &Params) -> Result<Value> {
        self.get("/pair/all_by_groups_metadata", &pairs(params)).await
    }

    pub async fn all_pairs_with_pagination(&self, params: &Params) -> Result<Value> {
        self.get("/pair/all_with_pagination", &pairs(params)).await
    }

    /// Group for a mint pair; the order the mints are given in does not matter.
    pub async fn single_group_pair(&self, mint_a: &Pubkey, mint_b: &Pubkey) -> Result<Value> {
        self.get(&format!("/pair/group_pair/{}", lexical_pair_key(mint_a, mint_b)), &[]).await
    }

    pub async fn pair(&self, pair: &str) -> Result<Value> {
        self.get(&format!("/pair/{pair}"), &[]).await
    }

    pub async fn pair_fee_bps_by_days(&self, pair: &str, num_of_days: u32) -> Result<Value> {
        self.get(
            &format!("/pair/{pair}/analytic/pair_fee_bps"),
            &[("num_of_days", num_of_days.to_string())],
        )
        .await
    }

    pub async fn pair_daily_trade_volume_by_days(&self, pair: &str, num_of_days: u32) -> Result<Value> {
        self.get(
            &format!("/pair/{pair}/analytic/pair_trade_volume"),
            &[("num_of_days", num_of_days.to_string())],
        )
        .await
    }

    pub async fn pair_tvl_by_days(&self, pair: &str, num_of_days: u32) -> Result<Value> {
        self.get(
            &format!("/pair/{pair}/analytic/pair_tvl"),
            &[("num_of_days", num_of_days.to_string())],
        )
        .await
    }

    pub async fn pair_swap_records(&self, pair: &str, rows_to_take: u32) -> Result<Value> {
        self.get(
            &format!("/pair/{pair}/analytic/swap_history"),
            &[("rows_to_take", rows_to_take.to_string())],
        )
        .await
    }

    pub async fn pair_positions_lock(&self, pair: &str) -> Result<Value> {
        self.get(&format!("/pair/{pair}/positions_lock"), &[]).await
    }

    // ── Positions ─────────────────────────────────────────────────────────────

    pub async fn position(&self, position: &str) -> Result<Value> {
        self.get(&format!("/position/{position}"), &[]).await
    }

    pub async fn position_v2(&self, position: &str) -> Result<Value> {
        self.get(&format!("/position_v2/{position}"), &[]).await
    }

    pub async fn position_claim_fees(&self, position: &str) -> Result<Value> {
        self.get(&format!("/position/{position}/claim_fees"), &[]).await
    }

    pub async fn position_claim_rewards(&self, position: &str) -> Result<Value> {
        self.get(&format!("/position/{position}/claim_rewards"), &[]).await
    }

    pub async fn position_deposits(&self, position: &str) -> Result<Value> {
        self.get(&format!("/position/{position}/deposits"), &[]).await
    }

    pub async fn position_withdraws(&self, position: &str) -> Result<Value> {
        self.get(&format!("/position/{position}/withdraws"), &[]).await
    }

    // ── Wallets ───────────────────────────────────────────────────────────────

    pub async fn wallet_earning(&self, wallet: &str, pair: &str) -> Result<Value> {
        self.get(&format!("/wallet/{wallet}/{pair}/earning"), &[]).await
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?query, "analytics request");

        let response = self
            .http
            .get(&url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .query(query)
            .send()
            .await
            .map_err(|e| {
                error!(%url, error = %e, "analytics request failed");
                Error::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%url, status = status.as_u16(), "analytics API error");
            return Err(Error::Api { status: status.as_u16(), body });
        }
        Ok(response.json::<Value>().await?)
    }
}

fn pairs(params: &Params) -> Vec<(&str, String)> {
    params.iter().map(|(k, v)| (k.as_str(), v.clone())).collect()
}

/// `"<lower>-<higher>"` by base-58 string order.
pub fn lexical_pair_key(mint_a: &Pubkey, mint_b: &Pubkey) -> String {
    let (a, b) = (mint_a.to_string(), mint_b.to_string());
    if a <= b { format!("{a}-{b}") } else { format!("{b}-{a}") }
}
