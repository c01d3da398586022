//! Capabilities the client is handed by its host: a wallet that can sign and
//! a ledger that can be read.
//!
//! The client never holds private keys. Everything that needs a signature goes
//! through [Wallet::sign_and_send].

use crate::Result;
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction};
use std::future::Future;
use thiserror::Error;

/// Failures reported by a wallet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("wallet not connected")]
    NotConnected,
    #[error("wallet cannot sign transactions")]
    SigningUnavailable,
    #[error("User rejected the request")]
    Cancelled,
    #[error("wallet rejected transaction: {0}")]
    Rejected(String),
}

impl WalletError {
    /// Maps a wallet adapter's error message, recognizing user rejection.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains("User rejected") {
            WalletError::Cancelled
        } else {
            WalletError::Rejected(message)
        }
    }
}

/// A connected wallet.
pub trait Wallet: Clone + Send + Sync + 'static {
    /// Public key of the connected account, if any.
    fn address(&self) -> Option<Pubkey>;

    /// Signs the transaction and broadcasts it, returning the first signature.
    fn sign_and_send(
        &self,
        transaction: Transaction,
    ) -> impl Future<Output = std::result::Result<Signature, WalletError>> + Send;
}

/// Status of a transaction that reached the requested commitment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Confirmation {
    pub slot: u64,
    /// Program error, if execution failed.
    pub err: Option<String>,
}

/// The parts of a confirmed transaction the reconciler reads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionDetails {
    pub slot: u64,
    pub logs: Vec<String>,
}

/// An account as returned by `getAccountInfo`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountInfo {
    pub lamports: u64,
    pub owner: Pubkey,
    pub data: Vec<u8>,
}

/// Result of simulating a transaction before asking the wallet to sign it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Simulation {
    /// Execution error, if the transaction would fail.
    pub err: Option<String>,
    pub logs: Vec<String>,
}

/// Read access to the chain.
pub trait Ledger: Clone + Send + Sync + 'static {
    fn latest_blockhash(&self) -> impl Future<Output = Result<Hash>> + Send;

    /// Lamport balance of `address`.
    fn balance(&self, address: &Pubkey) -> impl Future<Output = Result<u64>> + Send;

    /// Waits until the signature reaches confirmed commitment.
    fn confirm(&self, signature: &Signature) -> impl Future<Output = Result<Confirmation>> + Send;

    /// Fetches slot and logs, `None` if the node does not know the signature.
    fn transaction(
        &self,
        signature: &Signature,
    ) -> impl Future<Output = Result<Option<TransactionDetails>>> + Send;

    /// Fetches an account, `None` if it does not exist.
    fn account(&self, address: &Pubkey) -> impl Future<Output = Result<Option<AccountInfo>>> + Send;

    /// Executes `transaction` without signatures and without committing it.
    fn simulate(
        &self,
        transaction: &Transaction,
    ) -> impl Future<Output = Result<Simulation>> + Send;
}
