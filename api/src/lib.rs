//! Read-only JSON facade over pool sessions and the DLMM analytics API.
//!
//! Every failure is answered with HTTP 500 and `{"error": <message>}`;
//! unknown routes get 404 with the same body shape.

use std::collections::HashMap;
use std::convert::Infallible;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use dlmm_manager_sdk::{
    list_user_positions, ActiveBin, DlmmPool, KeeperClient, LbPosition, PoolSession,
};
use serde_json::{json, Value};
use solana_sdk::pubkey::Pubkey;
use tokio::sync::Mutex;
use tracing::error;
use warp::http::StatusCode;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

/// Shared state behind every route.
pub struct AppState {
    session: Mutex<PoolSession>,
    keeper:  KeeperClient,
}

impl AppState {
    pub fn new(session: PoolSession, keeper: KeeperClient) -> Self {
        Self { session: Mutex::new(session), keeper }
    }

    /// Handle for `pool`, loading it on first use.
    ///
    /// The session lock is not held during a load, so requests for cached
    /// pools never wait on another pool's RPC round trips.
    async fn pool(&self, pool: &str) -> dlmm_manager_sdk::Result<Arc<dyn DlmmPool>> {
        let loader = {
            let session = self.session.lock().await;
            if let Ok(handle) = session.get_handle(pool) {
                return Ok(handle);
            }
            session.loader()
        };
        let handle = PoolSession::load_handle(loader.as_ref(), pool).await?;
        Ok(self.session.lock().await.register(pool, handle))
    }

    async fn active_bin(&self, pool: &str) -> dlmm_manager_sdk::Result<ActiveBin> {
        self.pool(pool).await?.active_bin().await
    }

    async fn user_positions(&self, user: &str, pool: &str) -> dlmm_manager_sdk::Result<Vec<LbPosition>> {
        let user = Pubkey::from_str(user)
            .map_err(|_| dlmm_manager_sdk::Error::InvalidAddress(user.to_string()))?;
        let handle = self.pool(pool).await?;
        list_user_positions(handle.as_ref(), &user).await
    }
}

/// All routes, with CORS for any origin and JSON 404s.
pub fn routes(state: Arc<AppState>) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path!("health").and(warp::get()).map(|| {
        warp::reply::json(&json!({
            "status":    "OK",
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }))
        .into_response()
    });

    let metrics = warp::path!("api" / "metrics")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_metrics);

    let pairs = warp::path!("api" / "pairs")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state.clone()))
        .and_then(get_pairs);

    let pair = warp::path!("api" / "pairs" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_pair);

    let active_bin = warp::path!("api" / "pools" / String / "active-bin")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_active_bin);

    let positions = warp::path!("api" / "users" / String / "pools" / String / "positions")
        .and(warp::get())
        .and(with_state(state))
        .and_then(get_user_positions);

    health
        .or(metrics)
        .unify()
        .or(pairs)
        .unify()
        .or(pair)
        .unify()
        .or(active_bin)
        .unify()
        .or(positions)
        .unify()
        .with(warp::cors().allow_any_origin().allow_methods(vec!["GET"]))
        .recover(not_found)
}

fn with_state(state: Arc<AppState>) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

fn ok(body: &Value) -> Response {
    warp::reply::json(body).into_response()
}

fn failure(message: &str) -> Response {
    warp::reply::with_status(
        warp::reply::json(&json!({ "error": message })),
        StatusCode::INTERNAL_SERVER_ERROR,
    )
    .into_response()
}

async fn get_metrics(state: Arc<AppState>) -> Result<Response, Rejection> {
    Ok(match state.keeper.protocol_metrics().await {
        Ok(metrics) => ok(&metrics),
        Err(e) => {
            error!(error = %e, "error fetching protocol metrics");
            failure("Failed to fetch protocol metrics")
        }
    })
}

async fn get_pairs(query: HashMap<String, String>, state: Arc<AppState>) -> Result<Response, Rejection> {
    let include_unknown = query.get("include_unknown").map(String::as_str) != Some("false");
    Ok(match state.keeper.all_pairs(include_unknown).await {
        Ok(pairs) => ok(&pairs),
        Err(e) => {
            error!(error = %e, "error fetching pairs");
            failure("Failed to fetch pairs")
        }
    })
}

async fn get_pair(pair_address: String, state: Arc<AppState>) -> Result<Response, Rejection> {
    Ok(match state.keeper.pair(&pair_address).await {
        Ok(pair) => ok(&pair),
        Err(e) => {
            error!(pair = %pair_address, error = %e, "error fetching pair");
            failure("Failed to fetch pair data")
        }
    })
}

async fn get_active_bin(pool_address: String, state: Arc<AppState>) -> Result<Response, Rejection> {
    Ok(match state.active_bin(&pool_address).await {
        Ok(active) => ok(&json!({ "poolAddress": pool_address, "activeBin": active })),
        Err(e) => {
            error!(pool = %pool_address, error = %e, "error fetching active bin");
            failure("Failed to fetch active bin")
        }
    })
}

async fn get_user_positions(
    user_address: String,
    pool_address: String,
    state:        Arc<AppState>,
) -> Result<Response, Rejection> {
    Ok(match state.user_positions(&user_address, &pool_address).await {
        Ok(positions) => ok(&json!({
            "poolAddress": pool_address,
            "userAddress": user_address,
            "positions":   positions,
        })),
        Err(e) => {
            error!(user = %user_address, pool = %pool_address, error = %e, "error fetching user positions");
            failure("Failed to fetch user positions")
        }
    })
}

async fn not_found(_: Rejection) -> Result<Response, Infallible> {
    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "error": "Not found" })),
        StatusCode::NOT_FOUND,
    )
    .into_response())
}
