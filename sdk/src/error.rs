//! SDK error type.

use std::fmt;

use solana_sdk::pubkey::Pubkey;

/// Planner operation named in a wrapped upstream fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    InitializePool,
    RemoveLiquidity,
    AddLiquidity,
    MoveFunds,
    ClaimSwapFees,
    ClosePositions,
    CreateBalancedPosition,
    CreateImbalancedPosition,
    CreateOneSidedPosition,
    Swap,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::InitializePool           => "initialize DLMM pool",
            Operation::RemoveLiquidity          => "remove liquidity",
            Operation::AddLiquidity             => "add liquidity",
            Operation::MoveFunds                => "move funds",
            Operation::ClaimSwapFees            => "claim swap fees",
            Operation::ClosePositions           => "close positions",
            Operation::CreateBalancedPosition   => "create balanced position",
            Operation::CreateImbalancedPosition => "create imbalanced position",
            Operation::CreateOneSidedPosition   => "create one-sided position",
            Operation::Swap                     => "swap",
        };
        f.write_str(s)
    }
}

/// All errors returned by the DLMM Manager SDK.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ── RPC / network ────────────────────────────────────────────────────────
    /// A Solana JSON-RPC call failed.
    #[error("RPC error: {0}")]
    Rpc(#[from] solana_client::client_error::ClientError),

    /// The analytics API could not be reached or returned an undecodable body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The analytics API answered with a non-success status.
    #[error("API Error {status}: {body}")]
    Api { status: u16, body: String },

    // ── Session ──────────────────────────────────────────────────────────────
    /// An operation targeted a pool that was never registered with the session.
    #[error("Pool {0} not initialized. Call ensure_initialized first.")]
    NotInitialized(String),

    /// A string could not be parsed as a base-58 public key.
    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    /// An account the pool handle depends on does not exist.
    #[error("Account {0} not found")]
    AccountNotFound(Pubkey),

    // ── Planner ──────────────────────────────────────────────────────────────
    /// Listing the user's positions failed; distinct from "no positions".
    #[error("Failed to query positions in pool {pool}: {source}")]
    PositionQuery {
        pool:   Pubkey,
        #[source]
        source: Box<Error>,
    },

    /// An upstream fault terminated an operation.
    ///
    /// `completed` lists positions whose transactions were already confirmed
    /// before the fault; their on-chain changes are not rolled back.
    #[error("Failed to {operation}: {source}")]
    Failed {
        operation: Operation,
        completed: Vec<Pubkey>,
        #[source]
        source:    Box<Error>,
    },

    /// The pool handle rejected a request.
    #[error("Pool SDK error: {0}")]
    Sdk(String),

    /// The bins passed to the quote cannot fill the requested input.
    #[error("Insufficient liquidity: filled {filled} of {requested}")]
    InsufficientLiquidity { requested: u64, filled: u64 },

    // ── Arithmetic ───────────────────────────────────────────────────────────
    #[error("Integer overflow in amount / price math")]
    MathOverflow,

    // ── Account parsing ──────────────────────────────────────────────────────
    /// Raw account bytes could not be deserialized.
    #[error("Account parse error at offset {offset}: {reason}")]
    ParseError { offset: usize, reason: String },

    // ── Validation ───────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Wrap `self` as the cause of a failed `operation`.
    pub fn during(self, operation: Operation, completed: Vec<Pubkey>) -> Self {
        Error::Failed { operation, completed, source: Box::new(self) }
    }
}

/// Convenience alias so every module can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;
