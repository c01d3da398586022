//! Accounts owned by the casino program.

use crate::instruction::{read_u16_le, read_u64_le, read_u8, DISCRIMINATOR_LEN};
use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, ReadExt, Write};
use solana_sdk::pubkey::Pubkey;

/// Discriminator of the `Casino` account (`sha256("account:Casino")[..8]`).
pub const CASINO_ACCOUNT_DISCRIMINATOR: [u8; DISCRIMINATOR_LEN] =
    [159, 97, 152, 221, 184, 65, 3, 124];

/// Contents of the casino state account at the `casino` address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CasinoState {
    pub authority: Pubkey,
    pub vault_bump: u8,
    /// Lamports staked across all plays.
    pub total_wagered: u64,
    /// Lamports paid out across all plays.
    pub total_payout: u64,
    pub house_edge_bps: u16,
    pub min_bet: u64,
    pub max_bet: u64,
}

impl Write for CasinoState {
    fn write(&self, writer: &mut impl BufMut) {
        writer.put_slice(&CASINO_ACCOUNT_DISCRIMINATOR);
        writer.put_slice(self.authority.as_ref());
        writer.put_u8(self.vault_bump);
        writer.put_u64_le(self.total_wagered);
        writer.put_u64_le(self.total_payout);
        writer.put_u16_le(self.house_edge_bps);
        writer.put_u64_le(self.min_bet);
        writer.put_u64_le(self.max_bet);
    }
}

impl FixedSize for CasinoState {
    const SIZE: usize = DISCRIMINATOR_LEN + 32 + 1 + 8 + 8 + 2 + 8 + 8;
}

impl Read for CasinoState {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        if reader.remaining() < DISCRIMINATOR_LEN + 32 {
            return Err(Error::EndOfBuffer);
        }
        let mut discriminator = [0u8; DISCRIMINATOR_LEN];
        reader.copy_to_slice(&mut discriminator);
        if discriminator != CASINO_ACCOUNT_DISCRIMINATOR {
            return Err(Error::Invalid("CasinoState", "unknown discriminator"));
        }
        let mut authority = [0u8; 32];
        reader.copy_to_slice(&mut authority);

        Ok(Self {
            authority: Pubkey::new_from_array(authority),
            vault_bump: read_u8(reader)?,
            total_wagered: read_u64_le(reader)?,
            total_payout: read_u64_le(reader)?,
            house_edge_bps: read_u16_le(reader)?,
            min_bet: read_u64_le(reader)?,
            max_bet: read_u64_le(reader)?,
        })
    }
}

impl CasinoState {
    /// Decodes raw account data. Bytes past the fixed layout are ignored.
    pub fn from_account_data(mut data: &[u8]) -> Result<Self, Error> {
        Self::read(&mut data)
    }

    /// Wagered minus paid out. Negative when players are ahead.
    pub fn house_profit(&self) -> i64 {
        let profit = self.total_wagered as i128 - self.total_payout as i128;
        profit.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub fn house_edge_percent(&self) -> f64 {
        self.house_edge_bps as f64 / 100.0
    }

    pub fn accepts_bet(&self, bet: u64) -> bool {
        (self.min_bet..=self.max_bet).contains(&bet)
    }
}
