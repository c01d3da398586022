//! Playing a game end to end: validate, snapshot, send, record, confirm,
//! reconcile, persist.

use crate::{
    casino::CasinoView,
    config::ClientConfig,
    history::GameStore,
    now_ms,
    persistence::RecentGames,
    reconcile::{BalanceSnapshot, Evidence, Reconciler},
    rpc::RpcClient,
    stats::GameStats,
    submitter::TransactionSubmitter,
    wallet::{Confirmation, Ledger, Wallet, WalletError},
    watcher::BalanceWatcher,
    Error, Result,
};
use futures::future::join;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use solsgame_types::{
    CoinSide, Game, Operation, OperationKind, ProgramAddresses, RecentGame, ResolvedOutcome,
    SubmittedTransaction, TxStatus, ValidationError, BALANCE_REFRESH_INTERVAL,
};
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing::{info, warn};

/// A bet as requested by the player, validated when played.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayRequest {
    CoinFlip { bet: u64, side: CoinSide },
    /// `target` is a face (1-6) or a legacy percentage (7-99).
    DiceRoll { bet: u64, target: u32, is_over: bool },
    Slots { bet: u64 },
}

impl PlayRequest {
    pub fn game(&self) -> Game {
        match self {
            PlayRequest::CoinFlip { .. } => Game::CoinFlip,
            PlayRequest::DiceRoll { .. } => Game::DiceRoll,
            PlayRequest::Slots { .. } => Game::Slots,
        }
    }

    pub fn bet(&self) -> u64 {
        match self {
            PlayRequest::CoinFlip { bet, .. }
            | PlayRequest::DiceRoll { bet, .. }
            | PlayRequest::Slots { bet } => *bet,
        }
    }

    pub fn operation(&self) -> std::result::Result<Operation, ValidationError> {
        match *self {
            PlayRequest::CoinFlip { bet, side } => Operation::coin_flip(bet, side),
            PlayRequest::DiceRoll {
                bet,
                target,
                is_over,
            } => Operation::dice_roll(bet, target, is_over),
            PlayRequest::Slots { bet } => Operation::slots(bet),
        }
    }
}

/// A settled play.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayResult {
    pub signature: Signature,
    pub game: Game,
    pub bet: u64,
    pub outcome: ResolvedOutcome,
    /// Balance observed after confirmation.
    pub balance: Option<u64>,
}

struct InFlight {
    kinds: Arc<Mutex<HashSet<OperationKind>>>,
    kind: OperationKind,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut kinds = self.kinds.lock().unwrap_or_else(|e| e.into_inner());
        kinds.remove(&self.kind);
    }
}

/// Drives plays and admin operations for one wallet.
#[derive(Clone)]
pub struct GameSession<W: Wallet, L: Ledger> {
    submitter: TransactionSubmitter<W, L>,
    store: GameStore,
    reconciler: Reconciler,
    recent_games: Option<RecentGames>,
    in_flight: Arc<Mutex<HashSet<OperationKind>>>,
    balance_refresh: Duration,
}

impl<W: Wallet> GameSession<W, RpcClient> {
    /// Builds a session against the configured RPC endpoint, seeding stats
    /// from the local recent-games file.
    pub fn from_config(wallet: W, config: &ClientConfig) -> Result<Self> {
        let ledger = config.rpc_client()?;
        let recent_games = config.recent_games();
        let seed = match recent_games.as_ref().map(RecentGames::load).transpose() {
            Ok(seed) => seed.unwrap_or_default(),
            Err(err) => {
                warn!(?err, "failed to load recent games");
                Vec::new()
            }
        };
        let store = GameStore::new(config.history_retention).with_recent_games(&seed);
        let mut session = Self::new(wallet, ledger, config.addresses, store)
            .with_balance_refresh(config.balance_refresh);
        session.submitter = session.submitter.with_preflight(config.preflight);
        session.recent_games = recent_games;
        Ok(session)
    }
}

impl<W: Wallet, L: Ledger> GameSession<W, L> {
    pub fn new(wallet: W, ledger: L, addresses: ProgramAddresses, store: GameStore) -> Self {
        Self {
            submitter: TransactionSubmitter::new(wallet, ledger, addresses),
            store,
            reconciler: Reconciler::default(),
            recent_games: None,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            balance_refresh: BALANCE_REFRESH_INTERVAL,
        }
    }

    pub fn with_balance_refresh(mut self, period: Duration) -> Self {
        self.balance_refresh = period;
        self
    }

    pub fn with_recent_games(mut self, recent_games: RecentGames) -> Self {
        self.recent_games = Some(recent_games);
        self
    }

    pub fn with_reconciler(mut self, reconciler: Reconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn store(&self) -> &GameStore {
        &self.store
    }

    pub fn history(&self) -> Vec<SubmittedTransaction> {
        self.store.history()
    }

    pub fn stats(&self) -> GameStats {
        self.store.stats()
    }

    fn player(&self) -> Result<Pubkey> {
        Ok(self
            .submitter
            .wallet()
            .address()
            .ok_or(WalletError::NotConnected)?)
    }

    pub async fn balance(&self) -> Result<u64> {
        let player = self.player()?;
        self.submitter.ledger().balance(&player).await
    }

    /// Starts refreshing the wallet balance at the configured interval.
    pub fn watch_balance(&self) -> Result<BalanceWatcher> {
        let player = self.player()?;
        Ok(BalanceWatcher::spawn(
            self.submitter.ledger().clone(),
            player,
            self.balance_refresh,
        ))
    }

    /// Read-only view of the casino and vault accounts.
    pub fn casino(&self) -> CasinoView<L> {
        CasinoView::new(
            self.submitter.ledger().clone(),
            *self.submitter.addresses(),
        )
    }

    fn begin(&self, kind: OperationKind) -> Result<InFlight> {
        let mut kinds = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !kinds.insert(kind) {
            return Err(Error::GameInProgress(kind));
        }
        Ok(InFlight {
            kinds: self.in_flight.clone(),
            kind,
        })
    }

    /// Sends, records, and confirms an operation. The record ends up
    /// Confirmed or Failed; nothing is retried.
    async fn send_and_confirm(
        &self,
        operation: &Operation,
    ) -> Result<(Signature, Confirmation)> {
        let signature = self.submitter.send(operation).await?;
        self.store.append(SubmittedTransaction::pending(
            signature.to_string(),
            operation.kind(),
            operation.amount(),
            now_ms(),
        ));

        let signature_str = signature.to_string();
        match self.submitter.confirm(&signature).await {
            Ok(confirmation) => {
                self.store.update_status(&signature_str, TxStatus::Confirmed);
                Ok((signature, confirmation))
            }
            Err(err) => {
                warn!(signature = %signature_str, ?err, "transaction did not confirm");
                self.store.update_status(&signature_str, TxStatus::Failed);
                Err(err)
            }
        }
    }

    /// Plays one game and reconstructs its outcome.
    pub async fn play(&self, request: PlayRequest) -> Result<PlayResult> {
        let operation = request.operation()?;
        let player = self.player()?;
        let _in_flight = self.begin(operation.kind())?;
        let game = request.game();
        let bet = request.bet();

        let pre = self.submitter.ledger().balance(&player).await?;
        if pre < bet {
            return Err(ValidationError::InsufficientBalance {
                balance: pre,
                required: bet,
            }
            .into());
        }

        let (signature, confirmation) = self.send_and_confirm(&operation).await?;

        let ledger = self.submitter.ledger();
        let (post, details) = join(ledger.balance(&player), ledger.transaction(&signature)).await;
        let post = match post {
            Ok(balance) => Some(balance),
            Err(err) => {
                warn!(%signature, ?err, "failed to read balance after confirmation");
                None
            }
        };
        let details = match details {
            Ok(details) => details,
            Err(err) => {
                warn!(%signature, ?err, "failed to fetch transaction logs");
                None
            }
        };
        let (slot, logs) = match details {
            Some(details) => (details.slot, details.logs),
            None => (confirmation.slot, Vec::new()),
        };

        let outcome = self.reconciler.reconcile(&Evidence {
            game,
            bet,
            player,
            slot: Some(slot),
            logs: &logs,
            balances: BalanceSnapshot {
                pre: Some(pre),
                post,
            },
        });
        self.store.set_outcome(&signature.to_string(), outcome);
        info!(
            %signature,
            %game,
            bet,
            won = outcome.won,
            payout = outcome.payout,
            raw = outcome.raw_outcome,
            "play settled"
        );

        if let Some(recent_games) = &self.recent_games {
            let entry = RecentGame::new(game, &outcome, now_ms());
            if let Err(err) = recent_games.append(entry) {
                warn!(?err, "failed to persist recent game");
            }
        }

        Ok(PlayResult {
            signature,
            game,
            bet,
            outcome,
            balance: post,
        })
    }

    /// Runs a non-game operation such as `initialize` or `fund_vault`.
    pub async fn execute(&self, operation: Operation) -> Result<Signature> {
        let _in_flight = self.begin(operation.kind())?;
        let (signature, _) = self.send_and_confirm(&operation).await?;
        info!(%signature, kind = %operation.kind(), "operation confirmed");
        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mocks::{MockLedger, MockWallet},
        wallet::TransactionDetails,
        ErrorKind,
    };
    use solsgame_types::{Confidence, OutcomeSource, LAMPORTS_PER_SOL};

    const BET: u64 = 100_000_000;

    fn session(wallet: MockWallet, ledger: MockLedger) -> GameSession<MockWallet, MockLedger> {
        let addresses = ProgramAddresses::derive(Pubkey::new_unique()).unwrap();
        GameSession::new(wallet, ledger, addresses, GameStore::new(100))
    }

    fn dice_logs(result: u16) -> TransactionDetails {
        TransactionDetails {
            slot: 42,
            logs: vec![
                "Program log: Instruction: PlayDiceRoll".to_string(),
                format!("Program log: Dice Roll Result: {result}"),
            ],
        }
    }

    #[tokio::test]
    async fn test_winning_play() {
        let wallet = MockWallet::connected(Pubkey::new_unique());
        let ledger = MockLedger::new();
        ledger.push_balance(Some(LAMPORTS_PER_SOL));
        ledger.push_balance(Some(LAMPORTS_PER_SOL + 94_995_000));
        ledger.set_transaction(Some(dice_logs(5)));
        let dir = tempfile::tempdir().unwrap();
        let recent = RecentGames::new(dir.path());
        let session = session(wallet.clone(), ledger).with_recent_games(recent.clone());

        let result = session
            .play(PlayRequest::DiceRoll {
                bet: BET,
                target: 3,
                is_over: true,
            })
            .await
            .unwrap();
        assert!(result.outcome.won);
        assert_eq!(result.outcome.payout, 94_995_000);
        assert_eq!(result.outcome.raw_outcome, 5);
        assert_eq!(result.outcome.source, OutcomeSource::ResultMarker);
        assert_eq!(result.balance, Some(LAMPORTS_PER_SOL + 94_995_000));
        assert_eq!(wallet.sent().len(), 1);

        let history = session.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, TxStatus::Confirmed);
        assert_eq!(history[0].signature, result.signature.to_string());
        assert_eq!(history[0].outcome, Some(result.outcome));

        let stats = session.stats();
        assert_eq!(stats.total_games, 1);
        assert_eq!(stats.total_won, 94_995_000);

        let stored = recent.load().unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].won);
        assert_eq!(stored[0].amount, 94_995_000);
    }

    #[tokio::test]
    async fn test_losing_play_records_bet() {
        let ledger = MockLedger::new();
        ledger.push_balance(Some(LAMPORTS_PER_SOL));
        ledger.push_balance(Some(LAMPORTS_PER_SOL - BET - 5_000));
        let session = session(MockWallet::connected(Pubkey::new_unique()), ledger);

        let result = session
            .play(PlayRequest::CoinFlip {
                bet: BET,
                side: CoinSide::Heads,
            })
            .await
            .unwrap();
        assert!(!result.outcome.won);
        assert_eq!(result.outcome.payout, BET);
        assert_eq!(result.outcome.source, OutcomeSource::Derived);

        let stats = session.stats();
        assert_eq!(stats.total_lost, BET);
        assert_eq!(stats.current_streak, -1);
    }

    #[tokio::test]
    async fn test_validation_happens_before_network() {
        let wallet = MockWallet::connected(Pubkey::new_unique());
        let ledger = MockLedger::new();
        let session = session(wallet.clone(), ledger.clone());

        let err = session
            .play(PlayRequest::Slots { bet: 1_000 })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = session
            .play(PlayRequest::DiceRoll {
                bet: BET,
                target: 0,
                is_over: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InvalidDiceFace(0))
        ));
        assert_eq!(ledger.balance_calls(), 0);
        assert!(wallet.sent().is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_balance() {
        let wallet = MockWallet::connected(Pubkey::new_unique());
        let ledger = MockLedger::new();
        ledger.push_balance(Some(BET - 1));
        let session = session(wallet.clone(), ledger);

        let err = session
            .play(PlayRequest::Slots { bet: BET })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InsufficientBalance { .. })
        ));
        assert!(wallet.sent().is_empty());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_writes_nothing_and_clears_flag() {
        let wallet = MockWallet::connected(Pubkey::new_unique());
        wallet.reject_with(WalletError::Cancelled);
        let ledger = MockLedger::new();
        ledger.push_balance(Some(LAMPORTS_PER_SOL));
        let session = session(wallet.clone(), ledger);

        let err = session
            .play(PlayRequest::Slots { bet: BET })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(session.history().is_empty());

        // The flag was released, so the next attempt reaches the wallet again.
        let err = session
            .play(PlayRequest::Slots { bet: BET })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn test_failed_confirmation_marks_failed() {
        let ledger = MockLedger::new();
        ledger.push_balance(Some(LAMPORTS_PER_SOL));
        ledger.set_confirmation(Some(Confirmation {
            slot: 8,
            err: Some("custom program error: 0x1770".to_string()),
        }));
        let session = session(MockWallet::connected(Pubkey::new_unique()), ledger);

        let err = session
            .play(PlayRequest::Slots { bet: BET })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TransactionFailed { .. }));
        assert!(err.may_have_landed());

        let history = session.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, TxStatus::Failed);
        assert_eq!(history[0].outcome, None);
        assert_eq!(session.stats().total_games, 0);
    }

    #[tokio::test]
    async fn test_missing_post_balance_degrades() {
        let ledger = MockLedger::new();
        ledger.push_balance(Some(LAMPORTS_PER_SOL));
        ledger.push_balance(None);
        ledger.set_transaction(Some(dice_logs(6)));
        let session = session(MockWallet::connected(Pubkey::new_unique()), ledger);

        let result = session
            .play(PlayRequest::DiceRoll {
                bet: BET,
                target: 50,
                is_over: false,
            })
            .await
            .unwrap();
        assert_eq!(result.outcome.confidence, Confidence::Degraded);
        assert!(!result.outcome.won);
        assert_eq!(result.outcome.payout, 0);
        assert_eq!(result.outcome.raw_outcome, 1);
        assert_eq!(result.balance, None);
        assert_eq!(session.history()[0].status, TxStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_same_game_rejected_while_in_flight() {
        let wallet = MockWallet::connected(Pubkey::new_unique());
        let gate = wallet.hold();
        let ledger = MockLedger::new();
        ledger.push_balance(Some(LAMPORTS_PER_SOL));
        let session = session(wallet.clone(), ledger);

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.play(PlayRequest::Slots { bet: BET }).await }
        });
        while wallet.sent().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let err = session
            .play(PlayRequest::Slots { bet: BET })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GameInProgress(OperationKind::PlaySlots)));
        assert_eq!(err.to_string(), "Game already in progress: play_slots");

        gate.notify_one();
        first.await.unwrap().unwrap();
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn test_execute_fund_vault() {
        let wallet = MockWallet::connected(Pubkey::new_unique());
        let session = session(wallet.clone(), MockLedger::new());

        let signature = session
            .execute(Operation::fund_vault(5 * LAMPORTS_PER_SOL).unwrap())
            .await
            .unwrap();
        let record = session.store().get(&signature.to_string()).unwrap();
        assert_eq!(record.kind, OperationKind::FundVault);
        assert_eq!(record.amount, 5 * LAMPORTS_PER_SOL);
        assert_eq!(record.status, TxStatus::Confirmed);
        assert_eq!(session.stats().total_games, 0);
    }

    #[tokio::test]
    async fn test_disconnected_wallet() {
        let session = session(MockWallet::disconnected(), MockLedger::new());
        let err = session
            .play(PlayRequest::Slots { bet: BET })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Wallet(WalletError::NotConnected)));
        assert_eq!(err.kind(), ErrorKind::Wallet);
    }

    #[tokio::test]
    async fn test_confirmation_rpc_failure_keeps_signature() {
        let wallet = MockWallet::connected(Pubkey::new_unique());
        let ledger = MockLedger::new();
        ledger.push_balance(Some(LAMPORTS_PER_SOL));
        ledger.fail_confirm(-32005, "node is behind");
        let session = session(wallet.clone(), ledger);

        let err = session
            .play(PlayRequest::Slots { bet: BET })
            .await
            .unwrap_err();
        assert_eq!(wallet.sent().len(), 1);
        assert!(err.may_have_landed());
        assert_eq!(err.kind(), ErrorKind::Network);
        let Error::TransactionFailed {
            signature: Some(signature),
            ..
        } = err
        else {
            panic!("expected TransactionFailed with a signature, got {err:?}");
        };

        let history = session.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].signature, signature);
        assert_eq!(history[0].status, TxStatus::Failed);
    }

    #[tokio::test]
    async fn test_snapshots_ignore_background_refresh() {
        let wallet = MockWallet::connected(Pubkey::new_unique());
        let gate = wallet.hold();
        let ledger = MockLedger::new();
        ledger.set_balance(LAMPORTS_PER_SOL);
        let session =
            session(wallet.clone(), ledger.clone()).with_balance_refresh(Duration::from_millis(1));

        let watcher = session.watch_balance().unwrap();
        let mut rx = watcher.subscribe();
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|b| *b == Some(LAMPORTS_PER_SOL)))
            .await
            .unwrap()
            .unwrap();

        let play = tokio::spawn({
            let session = session.clone();
            async move { session.play(PlayRequest::Slots { bet: BET }).await }
        });
        while wallet.sent().is_empty() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        // The payout lands while the wallet is still signing; the watcher sees
        // it first but the pre-send snapshot must not move.
        let landed = LAMPORTS_PER_SOL + 2 * BET;
        ledger.set_balance(landed);
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|b| *b == Some(landed)))
            .await
            .unwrap()
            .unwrap();
        let calls_before_release = ledger.balance_calls();

        gate.notify_one();
        let result = play.await.unwrap().unwrap();
        assert!(result.outcome.won);
        assert_eq!(result.outcome.payout, 2 * BET);
        assert_eq!(result.balance, Some(landed));
        assert_eq!(watcher.latest(), Some(landed));
        assert!(ledger.balance_calls() > calls_before_release);
    }

    #[tokio::test]
    async fn test_casino_view_uses_session_addresses() {
        let ledger = MockLedger::new();
        ledger.set_balance(3 * LAMPORTS_PER_SOL);
        let session = session(MockWallet::connected(Pubkey::new_unique()), ledger);

        let casino = session.casino();
        assert!(!casino.is_initialized().await.unwrap());
        assert_eq!(casino.vault_balance().await.unwrap(), 3 * LAMPORTS_PER_SOL);
    }
}
