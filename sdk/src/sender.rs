//! Signing and submission of planner transactions.

use std::sync::Arc;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use tracing::debug;

use crate::error::Result;
use crate::types::UnsignedTx;

/// Signs a transaction with the payer (plus its extra signers), submits it,
/// and waits for confirmation.
#[async_trait]
pub trait TransactionSender: Send + Sync {
    async fn send_and_confirm(&self, tx: UnsignedTx, payer: &Keypair) -> Result<Signature>;
}

/// [`TransactionSender`] over a nonblocking JSON-RPC client.
pub struct RpcSender {
    rpc: Arc<RpcClient>,
}

impl RpcSender {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl TransactionSender for RpcSender {
    async fn send_and_confirm(&self, tx: UnsignedTx, payer: &Keypair) -> Result<Signature> {
        let blockhash = self.rpc.get_latest_blockhash().await?;
        // `&dyn Signer` is not `Send`; the signer list must not live across an await.
        let signed = {
            let mut signers: Vec<&dyn Signer> = vec![payer];
            signers.extend(tx.extra_signers.iter().map(|k| k as &dyn Signer));
            Transaction::new_signed_with_payer(&tx.instructions, Some(&payer.pubkey()), &signers, blockhash)
        };
        let sig = self.rpc.send_and_confirm_transaction(&signed).await?;
        debug!(signature = %sig, "transaction confirmed");
        Ok(sig)
    }
}
