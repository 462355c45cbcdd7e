//! Wallet balance and devnet funding helpers.

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    native_token::{lamports_to_sol, sol_to_lamports},
    pubkey::Pubkey,
    signature::Signature,
};
use tracing::info;

use crate::error::{Error, Result};
use crate::instructions::derive_ata;

/// SOL held by `owner`.
pub async fn sol_balance(rpc: &RpcClient, owner: &Pubkey) -> Result<f64> {
    Ok(lamports_to_sol(rpc.get_balance(owner).await?))
}

/// UI amount held by an SPL token account.
pub async fn token_ui_balance(rpc: &RpcClient, token_account: &Pubkey) -> Result<f64> {
    let amount = rpc.get_token_account_balance(token_account).await?;
    match amount.ui_amount {
        Some(ui) => Ok(ui),
        None => amount
            .ui_amount_string
            .parse()
            .map_err(|_| Error::ParseError { offset: 0, reason: format!("token amount '{}'", amount.ui_amount_string) }),
    }
}

/// UI balance of `owner`'s associated account for `mint`, or `None` if it does not exist.
pub async fn ata_ui_balance(rpc: &RpcClient, owner: &Pubkey, mint: &Pubkey) -> Result<Option<f64>> {
    let ata = derive_ata(owner, mint);
    if rpc.get_account_with_commitment(&ata, rpc.commitment()).await?.value.is_none() {
        return Ok(None);
    }
    token_ui_balance(rpc, &ata).await.map(Some)
}

/// Request `sol` from the cluster faucet and wait until the airdrop lands.
pub async fn request_airdrop(rpc: &RpcClient, to: &Pubkey, sol: f64) -> Result<Signature> {
    let signature = rpc.request_airdrop(to, sol_to_lamports(sol)).await?;
    rpc.poll_for_signature(&signature).await?;
    info!(%to, sol, %signature, "airdrop confirmed");
    Ok(signature)
}
