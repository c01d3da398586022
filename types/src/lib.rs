//! Wire types for the solsgame casino program.
//!
//! Nothing in this crate performs I/O: it derives the program's addresses,
//! encodes and decodes instruction payloads, decodes program events from
//! transaction logs and the casino state account, and defines the records
//! the client keeps.

pub mod account;
pub mod address;
pub mod amount;
pub mod constants;
pub mod event;
pub mod instruction;
pub mod record;

pub use account::{CasinoState, CASINO_ACCOUNT_DISCRIMINATOR};
pub use address::{parse_pubkey, AddressError, DerivedAddress, ProgramAddresses, Seed};
pub use amount::{check_bet_bounds, lamports_to_sol, sol_to_lamports, ValidationError};
pub use constants::*;
pub use event::{find_game_played, find_result_marker, GamePlayed};
pub use instruction::{CoinSide, DiceBet, Game, Operation, OperationKind};
pub use record::{
    Confidence, OutcomeSource, RecentGame, ResolvedOutcome, SubmittedTransaction, TxStatus,
};
