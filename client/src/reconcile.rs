//! Reconstructing a play's outcome after confirmation.
//!
//! Win or loss always comes from the balance delta between the snapshot taken
//! just before sending and the one taken just after confirmation. The raw
//! outcome shown to the player comes from the first [Strategy] that produces
//! one. Reconciliation never fails: missing evidence degrades the result.

use solana_sdk::pubkey::Pubkey;
use solsgame_types::{
    find_result_marker, Confidence, Game, GamePlayed, OutcomeSource, ResolvedOutcome,
    FALLBACK_RAW_OUTCOME,
};
use tracing::{debug, warn};

/// Balances of the player around one operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub pre: Option<u64>,
    pub post: Option<u64>,
}

impl BalanceSnapshot {
    /// Signed change, if both sides were observed.
    pub fn delta(&self) -> Option<i128> {
        Some(self.post? as i128 - self.pre? as i128)
    }
}

/// Everything observed about a confirmed play.
#[derive(Clone, Debug)]
pub struct Evidence<'a> {
    pub game: Game,
    pub bet: u64,
    pub player: Pubkey,
    /// Slot the transaction was confirmed in.
    pub slot: Option<u64>,
    pub logs: &'a [String],
    pub balances: BalanceSnapshot,
}

/// A way of recovering the raw outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// `Dice Roll Result: <n>` log line.
    ResultMarker,
    /// `GamePlayed` event emitted by the program.
    ProgramEvent,
    /// Recompute the program's formula from the slot and player address.
    Derived,
}

impl Strategy {
    pub fn source(&self) -> OutcomeSource {
        match self {
            Strategy::ResultMarker => OutcomeSource::ResultMarker,
            Strategy::ProgramEvent => OutcomeSource::ProgramEvent,
            Strategy::Derived => OutcomeSource::Derived,
        }
    }

    pub fn confidence(&self) -> Confidence {
        match self {
            Strategy::ResultMarker | Strategy::ProgramEvent => Confidence::Authoritative,
            Strategy::Derived => Confidence::Inferred,
        }
    }

    fn raw_outcome(&self, evidence: &Evidence<'_>) -> Option<u16> {
        let logs = evidence.logs.iter().map(String::as_str);
        match self {
            Strategy::ResultMarker => match evidence.game {
                Game::DiceRoll => {
                    find_result_marker(logs).filter(|raw| in_range(evidence.game, *raw))
                }
                _ => None,
            },
            Strategy::ProgramEvent => {
                // The program packs three reels into a u8, which wraps.
                if evidence.game == Game::Slots {
                    return None;
                }
                logs.filter_map(GamePlayed::from_log)
                    .find(|event| event.player == evidence.player && event.game == evidence.game)
                    .map(|event| event.result as u16)
                    .filter(|raw| in_range(evidence.game, *raw))
            }
            Strategy::Derived => Some(derive_outcome(
                evidence.game,
                evidence.slot?,
                &evidence.player,
            )),
        }
    }
}

/// Whether `raw` is a value the program can produce for `game`.
fn in_range(game: Game, raw: u16) -> bool {
    match game {
        Game::CoinFlip => raw <= 1,
        Game::DiceRoll => (1..=6).contains(&raw),
        Game::Slots => raw <= 999,
    }
}

/// The program's outcome formula for `game` at `slot`.
pub fn derive_outcome(game: Game, slot: u64, player: &Pubkey) -> u16 {
    let bytes = player.to_bytes();
    let roll = |i: usize, m: u64| ((slot ^ bytes[i] as u64) % m) as u16;
    match game {
        Game::CoinFlip => roll(0, 2),
        Game::DiceRoll => roll(0, 6) + 1,
        Game::Slots => roll(0, 10) * 100 + roll(1, 10) * 10 + roll(2, 10),
    }
}

/// Ordered list of strategies.
#[derive(Clone, Debug)]
pub struct Reconciler {
    strategies: Vec<Strategy>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self {
            strategies: vec![
                Strategy::ResultMarker,
                Strategy::ProgramEvent,
                Strategy::Derived,
            ],
        }
    }
}

impl Reconciler {
    pub fn new(strategies: Vec<Strategy>) -> Self {
        Self { strategies }
    }

    pub fn reconcile(&self, evidence: &Evidence<'_>) -> ResolvedOutcome {
        let Some(delta) = evidence.balances.delta() else {
            warn!(
                game = %evidence.game,
                pre = ?evidence.balances.pre,
                post = ?evidence.balances.post,
                "balance unavailable, recording degraded loss"
            );
            return ResolvedOutcome {
                won: false,
                payout: 0,
                raw_outcome: FALLBACK_RAW_OUTCOME,
                source: OutcomeSource::Fallback,
                confidence: Confidence::Degraded,
            };
        };

        let won = delta > 0;
        let payout = if won {
            u64::try_from(delta).unwrap_or(u64::MAX)
        } else {
            evidence.bet
        };

        let found = self
            .strategies
            .iter()
            .find_map(|strategy| strategy.raw_outcome(evidence).map(|raw| (strategy, raw)));
        let outcome = match found {
            Some((strategy, raw_outcome)) => ResolvedOutcome {
                won,
                payout,
                raw_outcome,
                source: strategy.source(),
                confidence: strategy.confidence(),
            },
            None => {
                warn!(game = %evidence.game, "no raw outcome observed");
                ResolvedOutcome {
                    won,
                    payout,
                    raw_outcome: FALLBACK_RAW_OUTCOME,
                    source: OutcomeSource::Fallback,
                    confidence: Confidence::Inferred,
                }
            }
        };
        debug!(
            game = %evidence.game,
            won,
            payout,
            raw = outcome.raw_outcome,
            source = ?outcome.source,
            "reconciled play"
        );
        outcome
    }
}
