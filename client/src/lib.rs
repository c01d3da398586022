pub mod casino;
pub mod config;
pub mod history;
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
pub mod persistence;
pub mod reconcile;
pub mod rpc;
pub mod session;
pub mod stats;
pub mod submitter;
pub mod wallet;
pub mod watcher;

mod backoff;

pub use casino::CasinoView;
pub use config::{ClientConfig, Config, ConfigError};
pub use history::{GameStore, HistoryStore, StatusUpdate};
pub use persistence::RecentGames;
pub use reconcile::{BalanceSnapshot, Evidence, Reconciler, Strategy};
pub use rpc::{RetryPolicy, RpcClient};
pub use session::{GameSession, PlayRequest, PlayResult};
pub use stats::{GameStats, StatsEntry};
pub use submitter::TransactionSubmitter;
pub use wallet::{
    AccountInfo, Confirmation, Ledger, Simulation, TransactionDetails, Wallet, WalletError,
};
pub use watcher::BalanceWatcher;

use solsgame_types::{AddressError, OperationKind, ValidationError};
use thiserror::Error;

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),
    #[error("address derivation failed: {0}")]
    Address(#[from] AddressError),
    #[error("wallet error: {0}")]
    Wallet(WalletError),
    #[error("transaction cancelled by user")]
    Cancelled,
    #[error("Game already in progress: {0}")]
    GameInProgress(OperationKind),
    #[error("transaction failed{}: {reason}", signature.as_deref().map(|s| format!(" ({s})")).unwrap_or_default())]
    TransactionFailed {
        signature: Option<String>,
        reason: String,
        logs: Vec<String>,
    },
    #[error("confirmation timed out for {signature}")]
    ConfirmationTimeout { signature: String },
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("failed: {status}: {body}")]
    FailedWithBody {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("account decode error: {0}")]
    Decode(#[from] commonware_codec::Error),
    #[error("transaction encode error: {0}")]
    Encode(#[from] bincode::Error),
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl From<WalletError> for Error {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Cancelled => Error::Cancelled,
            other => Error::Wallet(other),
        }
    }
}

/// Coarse classification used to pick how an error is shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected locally before anything was sent.
    Validation,
    /// Wallet missing, unable to sign, or the user declined.
    Wallet,
    /// Submission, confirmation, or RPC failure.
    Network,
    /// Local storage or encoding failure.
    Local,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) | Error::Address(_) | Error::GameInProgress(_) => {
                ErrorKind::Validation
            }
            Error::Wallet(_) | Error::Cancelled => ErrorKind::Wallet,
            Error::Storage(_) | Error::Encode(_) => ErrorKind::Local,
            Error::TransactionFailed { .. }
            | Error::ConfirmationTimeout { .. }
            | Error::Reqwest(_)
            | Error::FailedWithBody { .. }
            | Error::Rpc { .. }
            | Error::UnexpectedResponse(_)
            | Error::Url(_)
            | Error::InvalidScheme(_)
            | Error::Json(_)
            | Error::Decode(_) => ErrorKind::Network,
        }
    }

    /// True when funds may already have moved on-chain, so the caller must
    /// re-check the balance instead of retrying.
    pub fn may_have_landed(&self) -> bool {
        matches!(
            self,
            Error::TransactionFailed {
                signature: Some(_),
                ..
            } | Error::ConfirmationTimeout { .. }
        )
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
