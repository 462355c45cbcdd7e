//! Position listing.

use solana_sdk::pubkey::Pubkey;
use tracing::error;

use crate::error::{Error, Result};
use crate::pool::DlmmPool;
use crate::types::LbPosition;

/// All positions `user` owns in `pool`, in the order the handle returned them.
///
/// Either response shape is accepted. A failed query is reported as
/// [`Error::PositionQuery`] so callers can tell it apart from an empty list.
pub async fn list_user_positions(pool: &dyn DlmmPool, user: &Pubkey) -> Result<Vec<LbPosition>> {
    match pool.positions_by_user(user).await {
        Ok(response) => Ok(response.into_positions()),
        Err(e) => {
            error!(pool = %pool.address(), user = %user, error = %e, "error getting user positions");
            Err(Error::PositionQuery { pool: pool.address(), source: Box::new(e) })
        }
    }
}
