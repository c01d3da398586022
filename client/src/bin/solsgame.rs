//! Offline and read-only tooling for the solsgame casino program.
//!
//! Usage:
//!   solsgame addresses
//!   solsgame encode dice-roll --sol 0.1 --target 4 --over --player <PUBKEY>
//!   solsgame balance <PUBKEY>
//!   solsgame inspect <SIGNATURE> --player <PUBKEY> --game dice-roll
//!   solsgame stats
//!   solsgame casino
//!   solsgame vault-balance
//!   solsgame is-initialized

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use solana_sdk::signature::Signature;
use solsgame_client::{
    reconcile::derive_outcome, CasinoView, ClientConfig, Config, GameStats, RpcClient,
    StatsEntry,
};
use solsgame_types::{
    find_game_played, find_result_marker, lamports_to_sol, parse_pubkey, sol_to_lamports,
    CoinSide, Game, Operation,
};
use std::{fs, str::FromStr};
use tracing::{debug, Level};

#[derive(Parser, Debug)]
#[command(author, version, about = "solsgame casino client tooling")]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// JSON-RPC endpoint, overriding the configuration
    #[arg(long)]
    rpc_url: Option<String>,

    /// Log level, overriding the configuration
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the program id and its derived accounts.
    Addresses,
    /// Encode an instruction and print its data and accounts.
    Encode {
        #[command(subcommand)]
        operation: EncodeOperation,
        /// Caller account; accounts are only printed when set
        #[arg(long, global = true)]
        player: Option<String>,
    },
    /// Print the balance of an account.
    Balance { address: String },
    /// Read the logs of a confirmed play and recover its raw outcome.
    Inspect {
        signature: String,
        #[arg(long)]
        player: Option<String>,
        #[arg(long, value_enum)]
        game: Option<GameArg>,
    },
    /// Print stats over the locally stored recent games.
    Stats,
    /// Print the casino account and vault balance.
    Casino,
    /// Print the vault balance.
    VaultBalance,
    /// Exit with status 1 unless the casino account exists.
    IsInitialized,
}

#[derive(Subcommand, Debug)]
enum EncodeOperation {
    Initialize,
    FundVault {
        #[arg(long)]
        sol: f64,
    },
    CoinFlip {
        #[arg(long)]
        sol: f64,
        #[arg(long, value_enum)]
        side: SideArg,
    },
    DiceRoll {
        #[arg(long)]
        sol: f64,
        /// Face 1-6, or a legacy percentage 7-99
        #[arg(long)]
        target: u32,
        #[arg(long)]
        over: bool,
    },
    Slots {
        #[arg(long)]
        sol: f64,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SideArg {
    Heads,
    Tails,
}

impl From<SideArg> for CoinSide {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Heads => CoinSide::Heads,
            SideArg::Tails => CoinSide::Tails,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum GameArg {
    CoinFlip,
    DiceRoll,
    Slots,
}

impl From<GameArg> for Game {
    fn from(game: GameArg) -> Self {
        match game {
            GameArg::CoinFlip => Game::CoinFlip,
            GameArg::DiceRoll => Game::DiceRoll,
            GameArg::Slots => Game::Slots,
        }
    }
}

fn load_config(args: &Args) -> Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {path}"))?;
            Config::from_yaml(&contents).context("Failed to parse config")?
        }
        None => Config::default(),
    };
    if let Some(rpc_url) = &args.rpc_url {
        config.rpc_url = rpc_url.clone();
    }
    if let Some(log_level) = &args.log_level {
        config.log_level = log_level.clone();
    }
    config.validate().context("Invalid configuration")
}

fn init_logging(level: Level, json: bool) {
    if json {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_max_level(level).init();
    }
}

fn encode(config: &ClientConfig, operation: EncodeOperation, player: Option<String>) -> Result<()> {
    let operation = match operation {
        EncodeOperation::Initialize => Operation::initialize(),
        EncodeOperation::FundVault { sol } => Operation::fund_vault(sol_to_lamports(sol)?)?,
        EncodeOperation::CoinFlip { sol, side } => {
            Operation::coin_flip(sol_to_lamports(sol)?, side.into())?
        }
        EncodeOperation::DiceRoll { sol, target, over } => {
            Operation::dice_roll(sol_to_lamports(sol)?, target, over)?
        }
        EncodeOperation::Slots { sol } => Operation::slots(sol_to_lamports(sol)?)?,
    };

    println!("instruction: {}", operation.kind());
    println!("program: {}", config.addresses.program_id);
    println!("data: {}", hex::encode(operation.data()));
    if let Some(player) = player {
        let player = parse_pubkey(&player)?;
        for (i, meta) in operation
            .accounts(&config.addresses, &player)
            .iter()
            .enumerate()
        {
            println!(
                "account {i}: {} writable={} signer={}",
                meta.pubkey, meta.is_writable, meta.is_signer
            );
        }
    }
    Ok(())
}

async fn inspect(
    client: &RpcClient,
    signature: &str,
    player: Option<String>,
    game: Option<GameArg>,
) -> Result<()> {
    let signature =
        Signature::from_str(signature).map_err(|_| anyhow!("Invalid signature {signature}"))?;
    let details = client
        .get_transaction(&signature)
        .await?
        .ok_or_else(|| anyhow!("Transaction {signature} not found"))?;
    debug!(slot = details.slot, lines = details.logs.len(), "fetched transaction");

    println!("slot: {}", details.slot);
    let logs = details.logs.iter().map(String::as_str);
    match find_result_marker(logs.clone()) {
        Some(result) => println!("result marker: {result}"),
        None => println!("result marker: none"),
    }
    match find_game_played(logs) {
        Some(event) => println!(
            "event: player={} game={} bet={} SOL prediction={} result={} won={} payout={} SOL",
            event.player,
            event.game,
            lamports_to_sol(event.bet_amount),
            event.prediction,
            event.result,
            event.won,
            lamports_to_sol(event.payout)
        ),
        None => println!("event: none"),
    }
    if let (Some(player), Some(game)) = (player, game) {
        let player = parse_pubkey(&player)?;
        let game = Game::from(game);
        println!(
            "derived {game}: {}",
            derive_outcome(game, details.slot, &player)
        );
    }
    Ok(())
}

fn stats(config: &ClientConfig) -> Result<()> {
    let recent_games = config
        .recent_games()
        .ok_or_else(|| anyhow!("No data directory available"))?;
    let games = recent_games
        .load()
        .with_context(|| format!("Failed to read {}", recent_games.path().display()))?;
    // Stored newest first.
    let stats = GameStats::from_entries(games.iter().rev().map(StatsEntry::from));
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

async fn casino(view: &CasinoView<RpcClient>) -> Result<()> {
    let Some(statistics) = view.statistics().await? else {
        println!("casino: not initialized");
        return Ok(());
    };
    let state = &statistics.state;
    println!("authority: {}", state.authority);
    println!("vault bump: {}", state.vault_bump);
    println!("total wagered: {} SOL", lamports_to_sol(state.total_wagered));
    println!("total payout: {} SOL", lamports_to_sol(state.total_payout));
    println!("house profit: {} lamports", statistics.house_profit());
    println!("house edge: {}%", state.house_edge_percent());
    println!(
        "bets: {} - {} SOL",
        lamports_to_sol(state.min_bet),
        lamports_to_sol(state.max_bet)
    );
    println!("vault balance: {} SOL", lamports_to_sol(statistics.vault_balance));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_logging(config.log_level, args.json_logs);

    match args.command {
        Command::Addresses => {
            let addresses = config.addresses;
            println!("program: {}", addresses.program_id);
            println!(
                "casino: {} (bump {})",
                addresses.casino.address, addresses.casino.bump
            );
            println!(
                "vault: {} (bump {})",
                addresses.vault.address, addresses.vault.bump
            );
            println!("system: {}", addresses.system_program());
        }
        Command::Encode { operation, player } => encode(&config, operation, player)?,
        Command::Balance { address } => {
            let address = parse_pubkey(&address)?;
            let client = config.rpc_client()?;
            let balance = client.get_balance(&address).await?;
            println!("{balance} lamports ({} SOL)", lamports_to_sol(balance));
        }
        Command::Inspect {
            signature,
            player,
            game,
        } => {
            let client = config.rpc_client()?;
            inspect(&client, &signature, player, game).await?;
        }
        Command::Stats => stats(&config)?,
        Command::Casino => {
            let view = CasinoView::new(config.rpc_client()?, config.addresses);
            casino(&view).await?;
        }
        Command::VaultBalance => {
            let view = CasinoView::new(config.rpc_client()?, config.addresses);
            let balance = view.vault_balance().await?;
            println!("{balance} lamports ({} SOL)", lamports_to_sol(balance));
        }
        Command::IsInitialized => {
            let view = CasinoView::new(config.rpc_client()?, config.addresses);
            let initialized = view.is_initialized().await?;
            println!("{initialized}");
            if !initialized {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_encode_command() {
        let args = Args::parse_from([
            "solsgame",
            "--log-level",
            "debug",
            "encode",
            "dice-roll",
            "--sol",
            "0.5",
            "--target",
            "4",
            "--over",
        ]);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        let Command::Encode { operation, player } = args.command else {
            panic!("expected encode");
        };
        assert!(player.is_none());
        assert!(matches!(
            operation,
            EncodeOperation::DiceRoll {
                target: 4,
                over: true,
                ..
            }
        ));
    }

    #[test]
    fn parses_state_commands() {
        let args = Args::parse_from(["solsgame", "vault-balance"]);
        assert!(matches!(args.command, Command::VaultBalance));
        let args = Args::parse_from(["solsgame", "is-initialized"]);
        assert!(matches!(args.command, Command::IsInitialized));
        let args = Args::parse_from(["solsgame", "casino"]);
        assert!(matches!(args.command, Command::Casino));
    }

    #[test]
    fn overrides_apply_before_validation() {
        let args = Args::parse_from([
            "solsgame",
            "--rpc-url",
            "http://127.0.0.1:8899",
            "addresses",
        ]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.rpc_url.as_str(), "http://127.0.0.1:8899/");
    }
}
