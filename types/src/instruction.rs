//! Instruction payloads of the casino program.
//!
//! Every payload is an 8-byte discriminator (the first 8 bytes of
//! `sha256("global:<instruction_name>")`) followed by the instruction's
//! arguments in declaration order, little-endian and fixed width.

use crate::{
    address::ProgramAddresses,
    amount::{check_bet_bounds, ValidationError},
};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, Write};
use serde::{Deserialize, Serialize};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use std::fmt;

pub const DISCRIMINATOR_LEN: usize = 8;

const INITIALIZE: [u8; DISCRIMINATOR_LEN] = [175, 175, 109, 31, 13, 152, 155, 237];
const FUND_VAULT: [u8; DISCRIMINATOR_LEN] = [26, 33, 207, 242, 119, 108, 134, 73];
const PLAY_COIN_FLIP: [u8; DISCRIMINATOR_LEN] = [221, 213, 139, 239, 108, 34, 18, 12];
const PLAY_DICE_ROLL: [u8; DISCRIMINATOR_LEN] = [111, 158, 153, 47, 87, 64, 11, 126];
const PLAY_SLOTS: [u8; DISCRIMINATOR_LEN] = [143, 50, 70, 130, 212, 96, 69, 23];

/// Face used when the legacy percentage mapping computes 0.
const LEGACY_DEFAULT_FACE: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Initialize,
    FundVault,
    PlayCoinFlip,
    PlayDiceRoll,
    PlaySlots,
}

impl OperationKind {
    pub const ALL: [OperationKind; 5] = [
        OperationKind::Initialize,
        OperationKind::FundVault,
        OperationKind::PlayCoinFlip,
        OperationKind::PlayDiceRoll,
        OperationKind::PlaySlots,
    ];

    pub fn discriminator(&self) -> [u8; DISCRIMINATOR_LEN] {
        match self {
            OperationKind::Initialize => INITIALIZE,
            OperationKind::FundVault => FUND_VAULT,
            OperationKind::PlayCoinFlip => PLAY_COIN_FLIP,
            OperationKind::PlayDiceRoll => PLAY_DICE_ROLL,
            OperationKind::PlaySlots => PLAY_SLOTS,
        }
    }

    pub fn from_discriminator(bytes: &[u8; DISCRIMINATOR_LEN]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| &kind.discriminator() == bytes)
    }

    /// Name of the instruction in the program (the discriminator preimage).
    pub fn instruction_name(&self) -> &'static str {
        match self {
            OperationKind::Initialize => "initialize",
            OperationKind::FundVault => "fund_vault",
            OperationKind::PlayCoinFlip => "play_coin_flip",
            OperationKind::PlayDiceRoll => "play_dice_roll",
            OperationKind::PlaySlots => "play_slots",
        }
    }

    pub fn game(&self) -> Option<Game> {
        match self {
            OperationKind::PlayCoinFlip => Some(Game::CoinFlip),
            OperationKind::PlayDiceRoll => Some(Game::DiceRoll),
            OperationKind::PlaySlots => Some(Game::Slots),
            OperationKind::Initialize | OperationKind::FundVault => None,
        }
    }

    pub fn is_play(&self) -> bool {
        self.game().is_some()
    }

    /// Whether the casino account is written by this instruction.
    fn writes_casino(&self) -> bool {
        !matches!(self, OperationKind::FundVault)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.instruction_name())
    }
}

/// Games offered by the program, numbered as in its `GamePlayed` event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Game {
    CoinFlip = 0,
    DiceRoll = 1,
    Slots = 2,
}

impl Game {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Game::CoinFlip),
            1 => Some(Game::DiceRoll),
            2 => Some(Game::Slots),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Game::CoinFlip => "Coin Flip",
            Game::DiceRoll => "Dice Roll",
            Game::Slots => "Slots",
        }
    }

    pub fn operation(&self) -> OperationKind {
        match self {
            Game::CoinFlip => OperationKind::PlayCoinFlip,
            Game::DiceRoll => OperationKind::PlayDiceRoll,
            Game::Slots => OperationKind::PlaySlots,
        }
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CoinSide {
    Heads = 0,
    Tails = 1,
}

impl TryFrom<u8> for CoinSide {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CoinSide::Heads),
            1 => Ok(CoinSide::Tails),
            other => Err(ValidationError::InvalidCoinSide(other)),
        }
    }
}

/// A dice prediction: the face to beat and the direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DiceBet {
    face: u8,
    is_over: bool,
}

impl DiceBet {
    /// Builds a prediction from a caller-supplied target.
    ///
    /// Targets 1-6 are faces and pass through. Larger targets are read as a
    /// legacy 1-99 percentage and scaled onto a face (see [map_legacy_target]).
    pub fn new(target: u32, is_over: bool) -> Result<Self, ValidationError> {
        let face = if target > 6 {
            map_legacy_target(target)
        } else {
            target
        };
        if !(1..=6).contains(&face) {
            return Err(ValidationError::InvalidDiceFace(face));
        }
        Ok(Self {
            face: face as u8,
            is_over,
        })
    }

    pub fn face(&self) -> u8 {
        self.face
    }

    pub fn is_over(&self) -> bool {
        self.is_over
    }
}

/// Lossy percentage-to-face conversion kept for compatibility with older
/// front-ends: `floor(target / 100 * 6)` clamped to 1-6, with 0 becoming 3.
/// It is a placeholder mapping, not a game rule.
pub fn map_legacy_target(target: u32) -> u32 {
    let scaled = (target as u64 * 6 / 100) as u32;
    if scaled == 0 {
        return LEGACY_DEFAULT_FACE;
    }
    scaled.clamp(1, 6)
}

/// A request to the casino program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Initialize,
    FundVault { amount: u64 },
    PlayCoinFlip { bet: u64, side: CoinSide },
    PlayDiceRoll { bet: u64, dice: DiceBet },
    PlaySlots { bet: u64 },
}

impl Operation {
    pub fn initialize() -> Self {
        Operation::Initialize
    }

    pub fn fund_vault(amount: u64) -> Result<Self, ValidationError> {
        if amount == 0 {
            return Err(ValidationError::NonPositiveAmount);
        }
        Ok(Operation::FundVault { amount })
    }

    pub fn coin_flip(bet: u64, side: CoinSide) -> Result<Self, ValidationError> {
        check_bet_bounds(bet)?;
        Ok(Operation::PlayCoinFlip { bet, side })
    }

    pub fn dice_roll(bet: u64, target: u32, is_over: bool) -> Result<Self, ValidationError> {
        check_bet_bounds(bet)?;
        Ok(Operation::PlayDiceRoll {
            bet,
            dice: DiceBet::new(target, is_over)?,
        })
    }

    pub fn slots(bet: u64) -> Result<Self, ValidationError> {
        check_bet_bounds(bet)?;
        Ok(Operation::PlaySlots { bet })
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Initialize => OperationKind::Initialize,
            Operation::FundVault { .. } => OperationKind::FundVault,
            Operation::PlayCoinFlip { .. } => OperationKind::PlayCoinFlip,
            Operation::PlayDiceRoll { .. } => OperationKind::PlayDiceRoll,
            Operation::PlaySlots { .. } => OperationKind::PlaySlots,
        }
    }

    /// Lamports moved from the caller by this operation (0 for initialize).
    pub fn amount(&self) -> u64 {
        match self {
            Operation::Initialize => 0,
            Operation::FundVault { amount } => *amount,
            Operation::PlayCoinFlip { bet, .. }
            | Operation::PlayDiceRoll { bet, .. }
            | Operation::PlaySlots { bet } => *bet,
        }
    }

    /// Encoded instruction data.
    pub fn data(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.encode_size());
        self.write(&mut data);
        data
    }

    /// Accounts in program order: casino, vault, caller, system program.
    pub fn accounts(&self, addresses: &ProgramAddresses, caller: &Pubkey) -> Vec<AccountMeta> {
        let casino = if self.kind().writes_casino() {
            AccountMeta::new(addresses.casino.address, false)
        } else {
            AccountMeta::new_readonly(addresses.casino.address, false)
        };
        vec![
            casino,
            AccountMeta::new(addresses.vault.address, false),
            AccountMeta::new(*caller, true),
            AccountMeta::new_readonly(addresses.system_program(), false),
        ]
    }

    pub fn instruction(&self, addresses: &ProgramAddresses, caller: &Pubkey) -> Instruction {
        Instruction {
            program_id: addresses.program_id,
            accounts: self.accounts(addresses, caller),
            data: self.data(),
        }
    }
}

impl Write for Operation {
    fn write(&self, writer: &mut impl BufMut) {
        writer.put_slice(&self.kind().discriminator());
        match self {
            Operation::Initialize => {}
            Operation::FundVault { amount } => writer.put_u64_le(*amount),
            Operation::PlayCoinFlip { bet, side } => {
                writer.put_u64_le(*bet);
                writer.put_u8(*side as u8);
            }
            Operation::PlayDiceRoll { bet, dice } => {
                writer.put_u64_le(*bet);
                writer.put_u8(dice.face);
                writer.put_u8(dice.is_over as u8);
            }
            Operation::PlaySlots { bet } => writer.put_u64_le(*bet),
        }
    }
}

impl EncodeSize for Operation {
    fn encode_size(&self) -> usize {
        DISCRIMINATOR_LEN
            + match self {
                Operation::Initialize => 0,
                Operation::FundVault { .. } | Operation::PlaySlots { .. } => 8,
                Operation::PlayCoinFlip { .. } => 9,
                Operation::PlayDiceRoll { .. } => 10,
            }
    }
}

impl Read for Operation {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let mut discriminator = [0u8; DISCRIMINATOR_LEN];
        if reader.remaining() < DISCRIMINATOR_LEN {
            return Err(Error::EndOfBuffer);
        }
        reader.copy_to_slice(&mut discriminator);
        let kind = OperationKind::from_discriminator(&discriminator)
            .ok_or(Error::Invalid("Operation", "unknown discriminator"))?;

        match kind {
            OperationKind::Initialize => Ok(Operation::Initialize),
            OperationKind::FundVault => {
                let amount = read_u64_le(reader)?;
                Operation::fund_vault(amount)
                    .map_err(|_| Error::Invalid("FundVault", "amount must be positive"))
            }
            OperationKind::PlayCoinFlip => {
                let bet = read_u64_le(reader)?;
                let side = CoinSide::try_from(read_u8(reader)?)
                    .map_err(|_| Error::Invalid("PlayCoinFlip", "prediction must be 0 or 1"))?;
                Ok(Operation::PlayCoinFlip { bet, side })
            }
            OperationKind::PlayDiceRoll => {
                let bet = read_u64_le(reader)?;
                let face = read_u8(reader)?;
                if !(1..=6).contains(&face) {
                    return Err(Error::Invalid("PlayDiceRoll", "prediction must be 1-6"));
                }
                let is_over = read_bool(reader)?;
                Ok(Operation::PlayDiceRoll {
                    bet,
                    dice: DiceBet { face, is_over },
                })
            }
            OperationKind::PlaySlots => Ok(Operation::PlaySlots {
                bet: read_u64_le(reader)?,
            }),
        }
    }
}

pub(crate) fn read_u8(reader: &mut impl Buf) -> Result<u8, Error> {
    if !reader.has_remaining() {
        return Err(Error::EndOfBuffer);
    }
    Ok(reader.get_u8())
}

pub(crate) fn read_bool(reader: &mut impl Buf) -> Result<bool, Error> {
    match read_u8(reader)? {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(Error::Invalid("bool", "must be 0 or 1")),
    }
}

pub(crate) fn read_u16_le(reader: &mut impl Buf) -> Result<u16, Error> {
    if reader.remaining() < 2 {
        return Err(Error::EndOfBuffer);
    }
    Ok(reader.get_u16_le())
}

pub(crate) fn read_u64_le(reader: &mut impl Buf) -> Result<u64, Error> {
    if reader.remaining() < 8 {
        return Err(Error::EndOfBuffer);
    }
    Ok(reader.get_u64_le())
}

pub(crate) fn read_i64_le(reader: &mut impl Buf) -> Result<i64, Error> {
    if reader.remaining() < 8 {
        return Err(Error::EndOfBuffer);
    }
    Ok(reader.get_i64_le())
}
