use serde::Serialize;
use solsgame_types::{RecentGame, SubmittedTransaction};

/// One resolved play as seen by the aggregator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatsEntry {
    pub won: bool,
    /// Lamports staked, 0 when unknown.
    pub wagered: u64,
    /// Payout on a win, amount lost on a loss.
    pub amount: u64,
}

impl StatsEntry {
    /// Entry for a confirmed, resolved play. Anything else is skipped.
    pub fn from_transaction(tx: &SubmittedTransaction) -> Option<Self> {
        let outcome = tx.settled()?;
        Some(Self {
            won: outcome.won,
            wagered: tx.amount,
            amount: outcome.payout,
        })
    }
}

impl From<&RecentGame> for StatsEntry {
    // Persisted games keep only the net amount, so the stake of a win is unknown.
    fn from(game: &RecentGame) -> Self {
        Self {
            won: game.won,
            wagered: if game.won { 0 } else { game.amount },
            amount: game.amount,
        }
    }
}

/// Running totals over resolved plays.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GameStats {
    pub total_games: u64,
    pub wins: u64,
    pub losses: u64,
    pub total_wagered: u64,
    pub total_won: u64,
    pub total_lost: u64,
    pub net_profit: i64,
    /// Fraction of games won, 0 with no games.
    pub win_rate: f64,
    /// Positive for a run of wins, negative for a run of losses.
    pub current_streak: i64,
    /// Longest run of either outcome.
    pub best_streak: u64,
    pub biggest_win: u64,
}

impl GameStats {
    /// Folds entries ordered oldest to newest.
    pub fn from_entries(entries: impl IntoIterator<Item = StatsEntry>) -> Self {
        let mut stats = Self::default();
        for entry in entries {
            stats.record(entry);
        }
        stats.finish();
        stats
    }

    /// Stats over persisted games (oldest first) followed by the history
    /// (newest first, as the store keeps it).
    pub fn compute<'a>(
        seed: &[RecentGame],
        history: impl DoubleEndedIterator<Item = &'a SubmittedTransaction>,
    ) -> Self {
        let seeded = seed.iter().map(StatsEntry::from);
        let recent = history.rev().filter_map(StatsEntry::from_transaction);
        Self::from_entries(seeded.chain(recent))
    }

    fn record(&mut self, entry: StatsEntry) {
        self.total_games += 1;
        self.total_wagered = self.total_wagered.saturating_add(entry.wagered);
        if entry.won {
            self.wins += 1;
            self.total_won = self.total_won.saturating_add(entry.amount);
            self.biggest_win = self.biggest_win.max(entry.amount);
            self.current_streak = if self.current_streak > 0 {
                self.current_streak + 1
            } else {
                1
            };
        } else {
            self.losses += 1;
            self.total_lost = self.total_lost.saturating_add(entry.amount);
            self.current_streak = if self.current_streak < 0 {
                self.current_streak - 1
            } else {
                -1
            };
        }
        self.best_streak = self.best_streak.max(self.current_streak.unsigned_abs());
    }

    fn finish(&mut self) {
        let net = self.total_won as i128 - self.total_lost as i128;
        self.net_profit = net.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        let resolved = self.wins + self.losses;
        self.win_rate = if resolved == 0 {
            0.0
        } else {
            self.wins as f64 / resolved as f64
        };
    }
}
