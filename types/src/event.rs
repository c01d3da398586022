//! Evidence the casino program leaves in transaction logs.

use crate::{
    constants::{DICE_RESULT_MARKER, PROGRAM_DATA_PREFIX},
    instruction::{read_bool, read_i64_le, read_u64_le, read_u8, Game, DISCRIMINATOR_LEN},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::{Buf, BufMut};
use commonware_codec::{DecodeExt, EncodeSize, Error, FixedSize, Read, Write};
use solana_sdk::pubkey::Pubkey;

/// Discriminator of the `GamePlayed` event (`sha256("event:GamePlayed")[..8]`).
pub const GAME_PLAYED_DISCRIMINATOR: [u8; DISCRIMINATOR_LEN] = [34, 108, 235, 57, 253, 173, 228, 36];

/// Event emitted by every play instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GamePlayed {
    pub player: Pubkey,
    pub game: Game,
    pub bet_amount: u64,
    pub prediction: u8,
    pub result: u8,
    pub won: bool,
    pub payout: u64,
    pub timestamp: i64,
}

impl Write for GamePlayed {
    fn write(&self, writer: &mut impl BufMut) {
        writer.put_slice(&GAME_PLAYED_DISCRIMINATOR);
        writer.put_slice(self.player.as_ref());
        writer.put_u8(self.game as u8);
        writer.put_u64_le(self.bet_amount);
        writer.put_u8(self.prediction);
        writer.put_u8(self.result);
        writer.put_u8(self.won as u8);
        writer.put_u64_le(self.payout);
        writer.put_i64_le(self.timestamp);
    }
}

impl FixedSize for GamePlayed {
    const SIZE: usize = DISCRIMINATOR_LEN + 32 + 1 + 8 + 1 + 1 + 1 + 8 + 8;
}

impl Read for GamePlayed {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        if reader.remaining() < DISCRIMINATOR_LEN + 32 {
            return Err(Error::EndOfBuffer);
        }
        let mut discriminator = [0u8; DISCRIMINATOR_LEN];
        reader.copy_to_slice(&mut discriminator);
        if discriminator != GAME_PLAYED_DISCRIMINATOR {
            return Err(Error::Invalid("GamePlayed", "unknown discriminator"));
        }
        let mut player = [0u8; 32];
        reader.copy_to_slice(&mut player);
        let game = read_u8(reader)?;
        let game = Game::from_u8(game).ok_or(Error::InvalidEnum(game))?;

        Ok(Self {
            player: Pubkey::new_from_array(player),
            game,
            bet_amount: read_u64_le(reader)?,
            prediction: read_u8(reader)?,
            result: read_u8(reader)?,
            won: read_bool(reader)?,
            payout: read_u64_le(reader)?,
            timestamp: read_i64_le(reader)?,
        })
    }
}

impl GamePlayed {
    /// Decodes a `Program data:` log line, if it carries this event.
    pub fn from_log(line: &str) -> Option<Self> {
        let payload = line.trim().strip_prefix(PROGRAM_DATA_PREFIX)?;
        let bytes = STANDARD.decode(payload.trim()).ok()?;
        if !bytes.starts_with(&GAME_PLAYED_DISCRIMINATOR) {
            return None;
        }
        Self::decode(bytes.as_slice()).ok()
    }

    /// Renders the event as the program would log it.
    pub fn to_log(&self) -> String {
        let mut bytes = Vec::with_capacity(self.encode_size());
        self.write(&mut bytes);
        format!("{PROGRAM_DATA_PREFIX}{}", STANDARD.encode(bytes))
    }
}

/// Returns the value of the first `Dice Roll Result: <n>` marker.
pub fn find_result_marker<'a, I>(logs: I) -> Option<u16>
where
    I: IntoIterator<Item = &'a str>,
{
    logs.into_iter().find_map(|line| {
        let (_, rest) = line.split_once(DICE_RESULT_MARKER)?;
        let digits: String = rest
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    })
}

/// Returns the first `GamePlayed` event in the logs.
pub fn find_game_played<'a, I>(logs: I) -> Option<GamePlayed>
where
    I: IntoIterator<Item = &'a str>,
{
    logs.into_iter().find_map(GamePlayed::from_log)
}
