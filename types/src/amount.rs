use crate::constants::{LAMPORTS_PER_SOL, MAX_BET_LAMPORTS, MIN_BET_LAMPORTS};
use thiserror::Error;

/// Rejections raised locally, before anything reaches the network.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("amount must be greater than 0")]
    NonPositiveAmount,
    #[error("amount is not a finite number: {0}")]
    NotFinite(f64),
    #[error("amount {value} SOL exceeds the representable range")]
    Overflow { value: f64 },
    #[error("bet too low: minimum is {min} lamports, got {got}")]
    BetTooLow { min: u64, got: u64 },
    #[error("bet too high: maximum is {max} lamports, got {got}")]
    BetTooHigh { max: u64, got: u64 },
    #[error("invalid dice face {0}: must be 1-6")]
    InvalidDiceFace(u32),
    #[error("invalid coin side {0}: must be 0 or 1")]
    InvalidCoinSide(u8),
    #[error("insufficient balance: have {balance} lamports, need {required}")]
    InsufficientBalance { balance: u64, required: u64 },
}

/// Converts a whole-SOL amount into lamports, truncating toward zero.
pub fn sol_to_lamports(sol: f64) -> Result<u64, ValidationError> {
    if !sol.is_finite() {
        return Err(ValidationError::NotFinite(sol));
    }
    if sol <= 0.0 {
        return Err(ValidationError::NonPositiveAmount);
    }
    let lamports = (sol * LAMPORTS_PER_SOL as f64).trunc();
    if lamports >= u64::MAX as f64 {
        return Err(ValidationError::Overflow { value: sol });
    }
    let lamports = lamports as u64;
    if lamports == 0 {
        return Err(ValidationError::NonPositiveAmount);
    }
    Ok(lamports)
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Client-side pre-check of the program's advertised bet bounds.
pub fn check_bet_bounds(lamports: u64) -> Result<(), ValidationError> {
    if lamports == 0 {
        return Err(ValidationError::NonPositiveAmount);
    }
    if lamports < MIN_BET_LAMPORTS {
        return Err(ValidationError::BetTooLow {
            min: MIN_BET_LAMPORTS,
            got: lamports,
        });
    }
    if lamports > MAX_BET_LAMPORTS {
        return Err(ValidationError::BetTooHigh {
            max: MAX_BET_LAMPORTS,
            got: lamports,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sol_to_lamports_truncates() {
        assert_eq!(sol_to_lamports(1.0).unwrap(), LAMPORTS_PER_SOL);
        assert_eq!(sol_to_lamports(0.5).unwrap(), 500_000_000);
        assert_eq!(sol_to_lamports(0.000_000_001_9).unwrap(), 1);
    }

    #[test]
    fn test_sol_to_lamports_rejects_non_positive() {
        assert_eq!(sol_to_lamports(0.0), Err(ValidationError::NonPositiveAmount));
        assert_eq!(sol_to_lamports(-1.0), Err(ValidationError::NonPositiveAmount));
        // Rounds down to zero lamports.
        assert_eq!(
            sol_to_lamports(0.000_000_000_1),
            Err(ValidationError::NonPositiveAmount)
        );
        assert!(matches!(
            sol_to_lamports(f64::NAN),
            Err(ValidationError::NotFinite(_))
        ));
    }

    #[test]
    fn test_bet_bounds() {
        assert!(check_bet_bounds(MIN_BET_LAMPORTS).is_ok());
        assert!(check_bet_bounds(MAX_BET_LAMPORTS).is_ok());
        assert_eq!(
            check_bet_bounds(MIN_BET_LAMPORTS - 1),
            Err(ValidationError::BetTooLow {
                min: MIN_BET_LAMPORTS,
                got: MIN_BET_LAMPORTS - 1
            })
        );
        assert!(matches!(
            check_bet_bounds(MAX_BET_LAMPORTS + 1),
            Err(ValidationError::BetTooHigh { .. })
        ));
        assert_eq!(check_bet_bounds(0), Err(ValidationError::NonPositiveAmount));
    }

    #[test]
    fn test_lamports_to_sol() {
        assert_eq!(lamports_to_sol(MIN_BET_LAMPORTS), 0.01);
        assert_eq!(lamports_to_sol(MAX_BET_LAMPORTS), 10.0);
    }
}
