//! Token amounts.
//!
//! Pool totals and stakes are whole units of the settlement token (wei for ETH) and
//! can exceed anything a float or u128 holds, so they are carried as 256-bit
//! unsigned integers and exchanged as decimal strings.

use primitive_types::{U256, U512};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Decimals of the native settlement token.
pub const ETHER_DECIMALS: usize = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("amount must be a non-negative integer, got {0:?}")]
    InvalidDigits(String),

    #[error("amount {0} does not fit in 256 bits")]
    TooLarge(String),

    #[error("amount must be greater than zero")]
    NotPositive,

    #[error("amount {0} has more than 18 decimal places")]
    TooPrecise(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(U256);

impl TokenAmount {
    pub const ZERO: TokenAmount = TokenAmount(U256([0; 4]));

    pub fn new(value: U256) -> Self {
        Self(value)
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Parse a decimal integer string. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        let digits = input.trim();
        if digits.is_empty() {
            return Err(AmountError::Empty);
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::InvalidDigits(digits.to_string()));
        }
        U256::from_dec_str(digits)
            .map(Self)
            .map_err(|_| AmountError::TooLarge(digits.to_string()))
    }

    /// Parse a stake: like [`TokenAmount::parse`] but zero is rejected.
    pub fn parse_positive(input: &str) -> Result<Self, AmountError> {
        let amount = Self::parse(input)?;
        if amount.is_zero() {
            return Err(AmountError::NotPositive);
        }
        Ok(amount)
    }

    pub fn checked_add(self, other: TokenAmount) -> Option<TokenAmount> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Share of `self` in `self + other`, as a whole percentage rounded down.
    /// Computed in 512 bits so neither the sum nor the scaling can overflow.
    pub fn percent_of_pool(self, other: TokenAmount) -> Option<u64> {
        let part = U512::from(self.0);
        let total = part + U512::from(other.0);
        if total.is_zero() {
            return None;
        }
        Some((part * U512::from(100u8) / total).low_u64())
    }
}

impl From<u64> for TokenAmount {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl FromStr for TokenAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // U256's Display is decimal
        write!(f, "{}", self.0)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct TokenAmountVisitor;

impl<'de> Visitor<'de> for TokenAmountVisitor {
    type Value = TokenAmount;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative integer or a decimal integer string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        TokenAmount::parse(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(TokenAmount::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .map(TokenAmount::from)
            .map_err(|_| E::custom(format!("amount must be non-negative, got {v}")))
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TokenAmountVisitor)
    }
}

/// Convert a decimal ether string ("1", "0.25", "3.") into wei.
pub fn parse_ether(input: &str) -> Result<TokenAmount, AmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(AmountError::InvalidDigits(trimmed.to_string()));
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(AmountError::InvalidDigits(trimmed.to_string()));
    }
    if fraction.len() > ETHER_DECIMALS {
        return Err(AmountError::TooPrecise(trimmed.to_string()));
    }

    let too_large = || AmountError::TooLarge(trimmed.to_string());
    let whole = if whole.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(whole).map_err(|_| too_large())?
    };
    let fraction = if fraction.is_empty() {
        U256::zero()
    } else {
        let padded = format!("{fraction:0<width$}", width = ETHER_DECIMALS);
        U256::from_dec_str(&padded).map_err(|_| too_large())?
    };

    let unit = U256::exp10(ETHER_DECIMALS);
    whole
        .checked_mul(unit)
        .and_then(|wei| wei.checked_add(fraction))
        .map(TokenAmount)
        .ok_or_else(too_large)
}
