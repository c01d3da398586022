//! In-memory wallet and ledger for tests.

use crate::{
    wallet::{
        AccountInfo, Confirmation, Ledger, Simulation, TransactionDetails, Wallet, WalletError,
    },
    Error, Result,
};
use solana_sdk::{
    hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction,
};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};
use tokio::sync::Notify;

#[derive(Default)]
struct WalletState {
    address: Option<Pubkey>,
    reject_with: Option<WalletError>,
    sent: Vec<Transaction>,
    gate: Option<Arc<Notify>>,
}

/// Wallet that records what it is asked to sign.
#[derive(Clone, Default)]
pub struct MockWallet {
    state: Arc<Mutex<WalletState>>,
}

impl MockWallet {
    pub fn connected(address: Pubkey) -> Self {
        let wallet = Self::default();
        wallet.lock().address = Some(address);
        wallet
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WalletState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes every following `sign_and_send` fail with `err`.
    pub fn reject_with(&self, err: WalletError) {
        self.lock().reject_with = Some(err);
    }

    /// Makes `sign_and_send` wait for the returned handle to be notified.
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().gate = Some(gate.clone());
        gate
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.lock().sent.clone()
    }
}

impl Wallet for MockWallet {
    fn address(&self) -> Option<Pubkey> {
        self.lock().address
    }

    async fn sign_and_send(
        &self,
        transaction: Transaction,
    ) -> std::result::Result<Signature, WalletError> {
        let gate = {
            let mut state = self.lock();
            if state.address.is_none() {
                return Err(WalletError::NotConnected);
            }
            if let Some(err) = state.reject_with.clone() {
                return Err(err);
            }
            state.sent.push(transaction);
            state.gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(Signature::new_unique())
    }
}

struct LedgerState {
    blockhash: Hash,
    balances: VecDeque<Option<u64>>,
    last_balance: Option<u64>,
    balance_calls: usize,
    confirmation: Option<Confirmation>,
    confirm_error: Option<(i64, String)>,
    details: Option<TransactionDetails>,
    accounts: HashMap<Pubkey, AccountInfo>,
    simulation: Simulation,
    simulated: Vec<Transaction>,
}

/// Ledger with scripted responses.
///
/// Balances are served from a queue. `None` entries fail the call. Once the
/// queue is drained the last served balance repeats.
#[derive(Clone)]
pub struct MockLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState {
                blockhash: Hash::new_unique(),
                balances: VecDeque::new(),
                last_balance: None,
                balance_calls: 0,
                confirmation: Some(Confirmation { slot: 1, err: None }),
                confirm_error: None,
                details: None,
                accounts: HashMap::new(),
                simulation: Simulation::default(),
                simulated: Vec::new(),
            })),
        }
    }
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push_balance(&self, balance: Option<u64>) {
        self.lock().balances.push_back(balance);
    }

    /// Drops any queued balances and serves `balance` from now on.
    pub fn set_balance(&self, balance: u64) {
        let mut state = self.lock();
        state.balances.clear();
        state.last_balance = Some(balance);
    }

    /// Makes confirmation fail with an RPC error.
    pub fn fail_confirm(&self, code: i64, message: &str) {
        self.lock().confirm_error = Some((code, message.to_string()));
    }

    pub fn set_account(&self, address: Pubkey, account: AccountInfo) {
        self.lock().accounts.insert(address, account);
    }

    pub fn set_simulation(&self, simulation: Simulation) {
        self.lock().simulation = simulation;
    }

    pub fn simulated(&self) -> Vec<Transaction> {
        self.lock().simulated.clone()
    }

    /// `None` makes confirmation time out.
    pub fn set_confirmation(&self, confirmation: Option<Confirmation>) {
        self.lock().confirmation = confirmation;
    }

    pub fn set_transaction(&self, details: Option<TransactionDetails>) {
        self.lock().details = details;
    }

    pub fn balance_calls(&self) -> usize {
        self.lock().balance_calls
    }
}

impl Ledger for MockLedger {
    async fn latest_blockhash(&self) -> Result<Hash> {
        Ok(self.lock().blockhash)
    }

    async fn balance(&self, _address: &Pubkey) -> Result<u64> {
        let mut state = self.lock();
        state.balance_calls += 1;
        let next = match state.balances.pop_front() {
            Some(next) => next,
            None => state.last_balance,
        };
        match next {
            Some(balance) => {
                state.last_balance = Some(balance);
                Ok(balance)
            }
            None => Err(Error::UnexpectedResponse("balance unavailable".to_string())),
        }
    }

    async fn confirm(&self, signature: &Signature) -> Result<Confirmation> {
        let state = self.lock();
        if let Some((code, message)) = state.confirm_error.clone() {
            return Err(Error::Rpc { code, message });
        }
        state
            .confirmation
            .clone()
            .ok_or_else(|| Error::ConfirmationTimeout {
                signature: signature.to_string(),
            })
    }

    async fn transaction(&self, _signature: &Signature) -> Result<Option<TransactionDetails>> {
        Ok(self.lock().details.clone())
    }

    async fn account(&self, address: &Pubkey) -> Result<Option<AccountInfo>> {
        Ok(self.lock().accounts.get(address).cloned())
    }

    async fn simulate(&self, transaction: &Transaction) -> Result<Simulation> {
        let mut state = self.lock();
        state.simulated.push(transaction.clone());
        Ok(state.simulation.clone())
    }
}
