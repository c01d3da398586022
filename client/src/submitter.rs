use crate::{
    wallet::{Confirmation, Ledger, Wallet, WalletError},
    Error, Result,
};
use solana_sdk::{signature::Signature, transaction::Transaction};
use solsgame_types::{Operation, ProgramAddresses};
use tracing::{debug, info, warn};

/// Wraps operations in transactions and drives them to confirmation.
#[derive(Clone)]
pub struct TransactionSubmitter<W: Wallet, L: Ledger> {
    wallet: W,
    ledger: L,
    addresses: ProgramAddresses,
    preflight: bool,
}

impl<W: Wallet, L: Ledger> TransactionSubmitter<W, L> {
    pub fn new(wallet: W, ledger: L, addresses: ProgramAddresses) -> Self {
        Self {
            wallet,
            ledger,
            addresses,
            preflight: true,
        }
    }

    /// Whether plays are simulated before the wallet is asked to sign.
    pub fn with_preflight(mut self, preflight: bool) -> Self {
        self.preflight = preflight;
        self
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn addresses(&self) -> &ProgramAddresses {
        &self.addresses
    }

    /// Builds the unsigned transaction for `operation`, paid by the wallet.
    pub async fn build(&self, operation: &Operation) -> Result<Transaction> {
        let payer = self.wallet.address().ok_or(WalletError::NotConnected)?;
        let instruction = operation.instruction(&self.addresses, &payer);
        let blockhash = self.ledger.latest_blockhash().await?;
        let mut transaction = Transaction::new_with_payer(&[instruction], Some(&payer));
        transaction.message.recent_blockhash = blockhash;
        Ok(transaction)
    }

    /// Simulates the transaction, failing without a signature if it would
    /// not execute.
    pub async fn simulate(&self, transaction: &Transaction) -> Result<()> {
        let simulation = self.ledger.simulate(transaction).await?;
        match simulation.err {
            None => Ok(()),
            Some(reason) => {
                warn!(%reason, "simulation failed, not sending");
                Err(Error::TransactionFailed {
                    signature: None,
                    reason: format!("simulation failed: {reason}"),
                    logs: simulation.logs,
                })
            }
        }
    }

    /// Hands the transaction to the wallet. Nothing is retried.
    pub async fn send(&self, operation: &Operation) -> Result<Signature> {
        let transaction = self.build(operation).await?;
        if self.preflight && operation.kind().is_play() {
            self.simulate(&transaction).await?;
        }
        match self.wallet.sign_and_send(transaction).await {
            Ok(signature) => {
                info!(kind = %operation.kind(), %signature, "transaction sent");
                Ok(signature)
            }
            Err(WalletError::Cancelled) => {
                debug!(kind = %operation.kind(), "signing cancelled by user");
                Err(Error::Cancelled)
            }
            Err(err) => {
                warn!(kind = %operation.kind(), ?err, "wallet refused transaction");
                Err(err.into())
            }
        }
    }

    /// Waits for confirmation. Once a signature exists every failure other
    /// than a timeout is reported as [Error::TransactionFailed] carrying it,
    /// with log lines when the transaction executed with an error.
    pub async fn confirm(&self, signature: &Signature) -> Result<Confirmation> {
        let confirmation = match self.ledger.confirm(signature).await {
            Ok(confirmation) => confirmation,
            Err(err @ Error::ConfirmationTimeout { .. }) => return Err(err),
            Err(err) => {
                warn!(%signature, ?err, "confirmation polling failed");
                return Err(Error::TransactionFailed {
                    signature: Some(signature.to_string()),
                    reason: err.to_string(),
                    logs: Vec::new(),
                });
            }
        };
        let Some(reason) = confirmation.err.clone() else {
            return Ok(confirmation);
        };
        let logs = match self.ledger.transaction(signature).await {
            Ok(details) => details.map(|d| d.logs).unwrap_or_default(),
            Err(err) => {
                debug!(%signature, ?err, "failed to fetch logs for failed transaction");
                Vec::new()
            }
        };
        Err(Error::TransactionFailed {
            signature: Some(signature.to_string()),
            reason,
            logs,
        })
    }

    /// Sends and confirms.
    pub async fn submit(&self, operation: &Operation) -> Result<(Signature, Confirmation)> {
        let signature = self.send(operation).await?;
        let confirmation = self.confirm(&signature).await?;
        Ok((signature, confirmation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mocks::{MockLedger, MockWallet},
        wallet::{Simulation, TransactionDetails},
    };
    use solana_sdk::pubkey::Pubkey;
    use solsgame_types::{CoinSide, OperationKind};

    fn submitter(wallet: MockWallet, ledger: MockLedger) -> TransactionSubmitter<MockWallet, MockLedger> {
        let addresses = ProgramAddresses::derive(Pubkey::new_unique()).unwrap();
        TransactionSubmitter::new(wallet, ledger, addresses)
    }

    #[tokio::test]
    async fn test_submit_builds_program_instruction() {
        let player = Pubkey::new_unique();
        let wallet = MockWallet::connected(player);
        let submitter = submitter(wallet.clone(), MockLedger::new());
        let operation = Operation::coin_flip(100_000_000, CoinSide::Tails).unwrap();

        let (_, confirmation) = submitter.submit(&operation).await.unwrap();
        assert_eq!(confirmation.err, None);

        let sent = wallet.sent();
        assert_eq!(sent.len(), 1);
        let message = &sent[0].message;
        assert_eq!(message.account_keys[0], player);
        assert_eq!(message.instructions.len(), 1);
        let data = &message.instructions[0].data;
        assert_eq!(&data[..8], &OperationKind::PlayCoinFlip.discriminator());
        assert_eq!(data, &operation.data());
    }

    #[tokio::test]
    async fn test_cancel_is_distinct() {
        let wallet = MockWallet::connected(Pubkey::new_unique());
        wallet.reject_with(WalletError::Cancelled);
        let submitter = submitter(wallet, MockLedger::new());

        let err = submitter.send(&Operation::initialize()).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn test_disconnected_wallet() {
        let submitter = submitter(MockWallet::disconnected(), MockLedger::new());
        let err = submitter.send(&Operation::initialize()).await.unwrap_err();
        assert!(matches!(err, Error::Wallet(WalletError::NotConnected)));
    }

    #[tokio::test]
    async fn test_failed_execution_carries_logs() {
        let ledger = MockLedger::new();
        ledger.set_confirmation(Some(Confirmation {
            slot: 5,
            err: Some("custom program error: 0x1".to_string()),
        }));
        ledger.set_transaction(Some(TransactionDetails {
            slot: 5,
            logs: vec!["Program log: Error: InsufficientFunds".to_string()],
        }));
        let submitter = submitter(MockWallet::connected(Pubkey::new_unique()), ledger);

        let err = submitter
            .submit(&Operation::slots(50_000_000).unwrap())
            .await
            .unwrap_err();
        let Error::TransactionFailed {
            signature,
            reason,
            logs,
        } = err
        else {
            panic!("expected TransactionFailed, got {err:?}");
        };
        assert!(signature.is_some());
        assert_eq!(reason, "custom program error: 0x1");
        assert_eq!(logs.len(), 1);
    }

    #[tokio::test]
    async fn test_confirmation_timeout() {
        let ledger = MockLedger::new();
        ledger.set_confirmation(None);
        let submitter = submitter(MockWallet::connected(Pubkey::new_unique()), ledger);

        let err = submitter
            .submit(&Operation::slots(50_000_000).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfirmationTimeout { .. }));
    }

    #[tokio::test]
    async fn test_confirm_rpc_failure_keeps_signature() {
        let ledger = MockLedger::new();
        ledger.fail_confirm(-32005, "node is behind");
        let submitter = submitter(MockWallet::connected(Pubkey::new_unique()), ledger);

        let signature = submitter
            .send(&Operation::slots(50_000_000).unwrap())
            .await
            .unwrap();
        let err = submitter.confirm(&signature).await.unwrap_err();
        assert!(err.may_have_landed());
        let Error::TransactionFailed {
            signature: Some(reported),
            reason,
            logs,
        } = err
        else {
            panic!("expected TransactionFailed with a signature, got {err:?}");
        };
        assert_eq!(reported, signature.to_string());
        assert!(reason.contains("node is behind"));
        assert!(logs.is_empty());
    }

    #[tokio::test]
    async fn test_failed_simulation_never_reaches_wallet() {
        let wallet = MockWallet::connected(Pubkey::new_unique());
        let ledger = MockLedger::new();
        ledger.set_simulation(Simulation {
            err: Some("custom program error: 0x1771".to_string()),
            logs: vec!["Program log: Error: BetTooHigh".to_string()],
        });
        let submitter = submitter(wallet.clone(), ledger.clone());

        let err = submitter
            .send(&Operation::slots(50_000_000).unwrap())
            .await
            .unwrap_err();
        assert!(!err.may_have_landed());
        let Error::TransactionFailed {
            signature: None,
            reason,
            logs,
        } = err
        else {
            panic!("expected TransactionFailed without a signature, got {err:?}");
        };
        assert!(reason.starts_with("simulation failed"));
        assert_eq!(logs.len(), 1);
        assert!(wallet.sent().is_empty());
        assert_eq!(ledger.simulated().len(), 1);
    }

    #[tokio::test]
    async fn test_preflight_skips_admin_operations_and_can_be_disabled() {
        let wallet = MockWallet::connected(Pubkey::new_unique());
        let ledger = MockLedger::new();
        let submitter = submitter(wallet.clone(), ledger.clone());

        submitter.send(&Operation::initialize()).await.unwrap();
        assert!(ledger.simulated().is_empty());

        let submitter = submitter.with_preflight(false);
        submitter
            .send(&Operation::slots(50_000_000).unwrap())
            .await
            .unwrap();
        assert!(ledger.simulated().is_empty());
        assert_eq!(wallet.sent().len(), 2);
    }
}
