//! Records shared between the submitter, the history, and local storage.

use crate::instruction::{Game, OperationKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a submitted transaction. Only `Pending` may transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

impl TxStatus {
    /// Whether moving from `self` to `next` is allowed.
    pub fn can_become(&self, next: TxStatus) -> bool {
        match self {
            TxStatus::Pending => true,
            terminal => *terminal == next,
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStatus::Pending => f.write_str("pending"),
            TxStatus::Confirmed => f.write_str("confirmed"),
            TxStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Where the displayed raw outcome came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeSource {
    /// `Dice Roll Result: <n>` log line.
    ResultMarker,
    /// `GamePlayed` event decoded from `Program data:`.
    ProgramEvent,
    /// Recomputed from the confirming slot and the player's address.
    Derived,
    /// Nothing usable was observed.
    Fallback,
}

/// How much the record can be trusted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Degraded: balance inspection failed, win/loss is a placeholder.
    Degraded,
    /// Win/loss from the balance delta, raw outcome inferred.
    Inferred,
    /// Win/loss from the balance delta, raw outcome read from the program.
    Authoritative,
}

/// Outcome of a play, reconstructed after confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOutcome {
    pub won: bool,
    /// Balance delta on a win, the bet on a loss, 0 when degraded.
    pub payout: u64,
    /// Display value: coin side, dice face, or reels as `r1*100 + r2*10 + r3`.
    pub raw_outcome: u16,
    pub source: OutcomeSource,
    pub confidence: Confidence,
}

impl ResolvedOutcome {
    pub fn is_low_confidence(&self) -> bool {
        self.confidence < Confidence::Authoritative
    }
}

/// One operation sent to the network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedTransaction {
    pub signature: String,
    pub status: TxStatus,
    pub kind: OperationKind,
    /// Lamports moved by the operation.
    pub amount: u64,
    pub timestamp_ms: u64,
    pub outcome: Option<ResolvedOutcome>,
}

impl SubmittedTransaction {
    pub fn pending(signature: String, kind: OperationKind, amount: u64, timestamp_ms: u64) -> Self {
        Self {
            signature,
            status: TxStatus::Pending,
            kind,
            amount,
            timestamp_ms,
            outcome: None,
        }
    }

    /// Resolved play with a confirmed status.
    pub fn settled(&self) -> Option<&ResolvedOutcome> {
        if self.status != TxStatus::Confirmed || !self.kind.is_play() {
            return None;
        }
        self.outcome.as_ref()
    }
}

/// A resolved game as kept in local storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentGame {
    pub game: Game,
    /// Payout on a win, the amount lost on a loss (0 when degraded).
    pub amount: u64,
    pub won: bool,
    pub timestamp_ms: u64,
}

impl RecentGame {
    pub fn new(game: Game, outcome: &ResolvedOutcome, timestamp_ms: u64) -> Self {
        Self {
            game,
            amount: outcome.payout,
            won: outcome.won,
            timestamp_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_monotonic() {
        assert!(TxStatus::Pending.can_become(TxStatus::Confirmed));
        assert!(TxStatus::Pending.can_become(TxStatus::Failed));
        assert!(TxStatus::Confirmed.can_become(TxStatus::Confirmed));
        assert!(!TxStatus::Confirmed.can_become(TxStatus::Pending));
        assert!(!TxStatus::Failed.can_become(TxStatus::Confirmed));
    }

    #[test]
    fn test_settled_requires_confirmed_play() {
        let outcome = ResolvedOutcome {
            won: true,
            payout: 10,
            raw_outcome: 3,
            source: OutcomeSource::ResultMarker,
            confidence: Confidence::Authoritative,
        };
        let mut tx = SubmittedTransaction::pending("sig".into(), OperationKind::PlaySlots, 5, 1);
        tx.outcome = Some(outcome);
        assert!(tx.settled().is_none());

        tx.status = TxStatus::Confirmed;
        assert_eq!(tx.settled(), Some(&outcome));

        tx.kind = OperationKind::FundVault;
        assert!(tx.settled().is_none());
    }

    #[test]
    fn test_recent_game_serialization() {
        let game = RecentGame {
            game: Game::CoinFlip,
            amount: 42,
            won: false,
            timestamp_ms: 7,
        };
        let json = serde_json::to_string(&game).unwrap();
        assert_eq!(
            json,
            r#"{"game":"coin_flip","amount":42,"won":false,"timestamp_ms":7}"#
        );
        let back: RecentGame = serde_json::from_str(&json).unwrap();
        assert_eq!(back, game);
    }

    #[test]
    fn test_recent_game_keeps_settled_amount() {
        let lost = ResolvedOutcome {
            won: false,
            payout: 50,
            raw_outcome: 1,
            source: OutcomeSource::Derived,
            confidence: Confidence::Inferred,
        };
        assert_eq!(RecentGame::new(Game::Slots, &lost, 3).amount, 50);

        let degraded = ResolvedOutcome {
            payout: 0,
            source: OutcomeSource::Fallback,
            confidence: Confidence::Degraded,
            ..lost
        };
        let game = RecentGame::new(Game::Slots, &degraded, 3);
        assert!(!game.won);
        assert_eq!(game.amount, 0);
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::Degraded < Confidence::Inferred);
        assert!(Confidence::Inferred < Confidence::Authoritative);
    }
}
