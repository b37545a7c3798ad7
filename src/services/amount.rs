//! The `amount` field of a cart update and the quantity rule it drives.

use std::str::FromStr;
use thiserror::Error;

pub const MIN_AMOUNT: u32 = 1;
pub const MAX_AMOUNT: u32 = 1_000;
pub const AMOUNT_STEP: u32 = 1;
/// A line whose quantity lands on this value is deleted instead of saved.
pub const REMOVAL_AMOUNT: u32 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Amount {
    Absolute(u32),
    Increment,
    Decrement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Keep(u32),
    Remove,
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum AmountError {
    #[error("Invalid amount format. Expected a number, '+' or '-'.")]
    Format,
    #[error("Amount can not be greater than {}.", MAX_AMOUNT)]
    TooLarge,
    #[error("Amount can not be less than {}.", MIN_AMOUNT)]
    TooSmall,
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Amount::Increment),
            "-" => Ok(Amount::Decrement),
            digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => digits
                .parse()
                .map(Amount::Absolute)
                .map_err(|_| AmountError::Format),
            _ => Err(AmountError::Format),
        }
    }
}

impl Amount {
    /// New quantity for a line currently holding `current`.
    pub fn apply(self, current: u32) -> Result<Outcome, AmountError> {
        let next = match self {
            Amount::Absolute(value) => value,
            Amount::Increment => current.saturating_add(AMOUNT_STEP),
            Amount::Decrement => current.saturating_sub(AMOUNT_STEP).max(MIN_AMOUNT),
        };

        if next == REMOVAL_AMOUNT {
            Ok(Outcome::Remove)
        } else if next > MAX_AMOUNT {
            Err(AmountError::TooLarge)
        } else {
            Ok(Outcome::Keep(next))
        }
    }
}

/// Initial quantity of a new line, 1 unless the client asks for more.
pub fn initial_amount(requested: Option<u32>) -> Result<u32, AmountError> {
    match requested.unwrap_or(MIN_AMOUNT) {
        value if value < MIN_AMOUNT => Err(AmountError::TooSmall),
        value if value > MAX_AMOUNT => Err(AmountError::TooLarge),
        value => Ok(value),
    }
}
