//! Bounded history of submitted transactions and the shared game state built
//! on top of it.

use crate::stats::GameStats;
use solsgame_types::{RecentGame, ResolvedOutcome, SubmittedTransaction, TxStatus};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{debug, warn};

/// Result of [HistoryStore::update_status].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusUpdate {
    Applied,
    /// Status was already the requested one.
    Unchanged,
    /// The record is terminal and cannot move back.
    Refused,
    /// No record has this signature.
    Missing,
}

/// Newest-first list capped at `retention` entries.
#[derive(Clone, Debug)]
pub struct HistoryStore {
    entries: VecDeque<SubmittedTransaction>,
    retention: usize,
}

impl HistoryStore {
    pub fn new(retention: usize) -> Self {
        let retention = retention.max(1);
        Self {
            entries: VecDeque::with_capacity(retention),
            retention,
        }
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts at the front, evicting the oldest entry past the cap.
    pub fn append(&mut self, tx: SubmittedTransaction) {
        self.entries.push_front(tx);
        self.entries.truncate(self.retention);
    }

    pub fn get(&self, signature: &str) -> Option<&SubmittedTransaction> {
        self.entries.iter().find(|tx| tx.signature == signature)
    }

    fn get_mut(&mut self, signature: &str) -> Option<&mut SubmittedTransaction> {
        self.entries.iter_mut().find(|tx| tx.signature == signature)
    }

    pub fn update_status(&mut self, signature: &str, status: TxStatus) -> StatusUpdate {
        let Some(tx) = self.get_mut(signature) else {
            return StatusUpdate::Missing;
        };
        if tx.status == status {
            return StatusUpdate::Unchanged;
        }
        if !tx.status.can_become(status) {
            warn!(signature, from = %tx.status, to = %status, "refusing status change");
            return StatusUpdate::Refused;
        }
        tx.status = status;
        StatusUpdate::Applied
    }

    /// Attaches an outcome. Returns false when the signature is unknown.
    pub fn set_outcome(&mut self, signature: &str, outcome: ResolvedOutcome) -> bool {
        match self.get_mut(signature) {
            Some(tx) => {
                tx.outcome = Some(outcome);
                true
            }
            None => false,
        }
    }

    /// Newest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &SubmittedTransaction> {
        self.entries.iter()
    }

    pub fn list(&self) -> Vec<SubmittedTransaction> {
        self.entries.iter().cloned().collect()
    }
}

struct State {
    history: HistoryStore,
    seed: Vec<RecentGame>,
    stats: GameStats,
}

impl State {
    fn refresh(&mut self) {
        self.stats = GameStats::compute(&self.seed, self.history.iter());
    }
}

/// History plus derived stats, shared between the session and its readers.
///
/// Locks are only taken for the duration of a single call.
#[derive(Clone)]
pub struct GameStore {
    state: Arc<Mutex<State>>,
}

impl GameStore {
    pub fn new(retention: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                history: HistoryStore::new(retention),
                seed: Vec::new(),
                stats: GameStats::default(),
            })),
        }
    }

    /// Seeds the stats with persisted games, newest first.
    pub fn with_recent_games(self, recent: &[RecentGame]) -> Self {
        {
            let mut state = self.lock();
            state.seed = recent.iter().rev().cloned().collect();
            state.refresh();
        }
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn append(&self, tx: SubmittedTransaction) {
        debug!(signature = %tx.signature, kind = %tx.kind, "recording transaction");
        let mut state = self.lock();
        state.history.append(tx);
        state.refresh();
    }

    pub fn update_status(&self, signature: &str, status: TxStatus) -> StatusUpdate {
        let mut state = self.lock();
        let update = state.history.update_status(signature, status);
        if update == StatusUpdate::Applied {
            state.refresh();
        }
        update
    }

    pub fn set_outcome(&self, signature: &str, outcome: ResolvedOutcome) -> bool {
        let mut state = self.lock();
        let found = state.history.set_outcome(signature, outcome);
        if found {
            state.refresh();
        }
        found
    }

    pub fn get(&self, signature: &str) -> Option<SubmittedTransaction> {
        self.lock().history.get(signature).cloned()
    }

    /// Newest first.
    pub fn history(&self) -> Vec<SubmittedTransaction> {
        self.lock().history.list()
    }

    pub fn stats(&self) -> GameStats {
        self.lock().stats.clone()
    }
}
