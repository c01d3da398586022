//! Program-derived addresses of the casino program.

use crate::constants::{CASINO_SEED, PROGRAM_ID, VAULT_SEED};
use solana_sdk::{pubkey::Pubkey, system_program};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("no viable bump for seed {seed}")]
    Exhausted { seed: Seed },
    #[error("invalid address {value}: {reason}")]
    Invalid { value: String, reason: String },
}

/// Seeds the casino program derives its accounts from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Seed {
    Casino,
    Vault,
}

impl Seed {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Seed::Casino => CASINO_SEED,
            Seed::Vault => VAULT_SEED,
        }
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seed::Casino => f.write_str("casino"),
            Seed::Vault => f.write_str("vault"),
        }
    }
}

/// An address owned by the program together with its bump.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DerivedAddress {
    pub address: Pubkey,
    pub bump: u8,
}

impl DerivedAddress {
    pub fn derive(seed: Seed, program_id: &Pubkey) -> Result<Self, AddressError> {
        let (address, bump) = Pubkey::try_find_program_address(&[seed.as_bytes()], program_id)
            .ok_or(AddressError::Exhausted { seed })?;
        Ok(Self { address, bump })
    }
}

/// Every fixed address an instruction touches, derived once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgramAddresses {
    pub program_id: Pubkey,
    pub casino: DerivedAddress,
    pub vault: DerivedAddress,
}

impl ProgramAddresses {
    pub fn derive(program_id: Pubkey) -> Result<Self, AddressError> {
        Ok(Self {
            program_id,
            casino: DerivedAddress::derive(Seed::Casino, &program_id)?,
            vault: DerivedAddress::derive(Seed::Vault, &program_id)?,
        })
    }

    /// Addresses of the deployed program.
    pub fn deployed() -> Result<Self, AddressError> {
        Self::derive(parse_pubkey(PROGRAM_ID)?)
    }

    pub fn system_program(&self) -> Pubkey {
        system_program::id()
    }
}

pub fn parse_pubkey(value: &str) -> Result<Pubkey, AddressError> {
    Pubkey::from_str(value.trim()).map_err(|err| AddressError::Invalid {
        value: value.to_string(),
        reason: err.to_string(),
    })
}
