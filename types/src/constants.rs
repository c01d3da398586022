use std::time::Duration;

/// Base58 id of the deployed casino program (devnet).
pub const PROGRAM_ID: &str = "8zD2fbTQHQRkdQrNs1f7Sd1ApZaUqN5c9GGZ6tSSy62M";

/// Default JSON-RPC endpoint.
pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

/// Seed of the casino state account.
pub const CASINO_SEED: &[u8] = b"casino";

/// Seed of the vault account holding house funds.
pub const VAULT_SEED: &[u8] = b"vault";

/// Lamports per whole SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Minimum bet advertised by the program (0.01 SOL).
pub const MIN_BET_LAMPORTS: u64 = 10_000_000;

/// Maximum bet advertised by the program (10 SOL).
pub const MAX_BET_LAMPORTS: u64 = 10_000_000_000;

/// Number of submitted transactions retained in memory.
pub const HISTORY_RETENTION: usize = 100;

/// Number of resolved games kept in local storage.
pub const RECENT_GAMES_LIMIT: usize = 50;

/// Local storage key for resolved games.
pub const RECENT_GAMES_KEY: &str = "solsgame.recent-games";

/// Interval between background balance refreshes.
pub const BALANCE_REFRESH_INTERVAL: Duration = Duration::from_secs(15);

/// Textual result marker the program logs for dice rolls.
pub const DICE_RESULT_MARKER: &str = "Dice Roll Result:";

/// Prefix of log lines carrying base64-encoded program events.
pub const PROGRAM_DATA_PREFIX: &str = "Program data: ";

/// Raw outcome reported when reconciliation has nothing to go on.
pub const FALLBACK_RAW_OUTCOME: u16 = 1;
