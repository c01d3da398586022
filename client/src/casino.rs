//! Read-only view of the casino's on-chain state.

use crate::{wallet::Ledger, Result};
use futures::future::try_join;
use solsgame_types::{CasinoState, ProgramAddresses};
use tracing::debug;

/// Casino state together with the vault's balance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CasinoStatistics {
    pub state: CasinoState,
    /// Lamports held by the vault.
    pub vault_balance: u64,
}

impl CasinoStatistics {
    pub fn house_profit(&self) -> i64 {
        self.state.house_profit()
    }
}

/// Reads the casino and vault accounts of one deployment.
#[derive(Clone)]
pub struct CasinoView<L: Ledger> {
    ledger: L,
    addresses: ProgramAddresses,
}

impl<L: Ledger> CasinoView<L> {
    pub fn new(ledger: L, addresses: ProgramAddresses) -> Self {
        Self { ledger, addresses }
    }

    /// Decoded casino account, `None` before `initialize` has run.
    pub async fn state(&self) -> Result<Option<CasinoState>> {
        let address = self.addresses.casino.address;
        let Some(account) = self.ledger.account(&address).await? else {
            debug!(%address, "casino account not found");
            return Ok(None);
        };
        Ok(Some(CasinoState::from_account_data(&account.data)?))
    }

    /// Lamports held by the vault.
    pub async fn vault_balance(&self) -> Result<u64> {
        self.ledger.balance(&self.addresses.vault.address).await
    }

    /// Whether the casino account exists and holds data.
    pub async fn is_initialized(&self) -> Result<bool> {
        let account = self.ledger.account(&self.addresses.casino.address).await?;
        Ok(account.is_some_and(|account| !account.data.is_empty()))
    }

    pub async fn statistics(&self) -> Result<Option<CasinoStatistics>> {
        let (state, vault_balance) = try_join(self.state(), self.vault_balance()).await?;
        Ok(state.map(|state| CasinoStatistics {
            state,
            vault_balance,
        }))
    }
}
