//! # Amounts
//!
//! Stake and coverage balances are unsigned integers in the token's smallest
//! unit. Serialized as decimal strings so values above `u64::MAX` survive
//! JSON round trips and canonicalization.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PcovError;

/// A non-negative token amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(0);

    /// Wrap a raw value.
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// The raw value.
    pub const fn get(&self) -> u128 {
        self.0
    }

    /// Whether the amount is zero.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Addition that reports overflow as a [`PcovError::Overflow`].
    pub fn try_add(self, other: Amount) -> Result<Amount, PcovError> {
        self.checked_add(other)
            .ok_or_else(|| PcovError::Overflow(format!("{self} + {other}")))
    }

    /// Parse a decimal string.
    pub fn parse(s: &str) -> Result<Self, PcovError> {
        s.parse::<u128>()
            .map(Amount)
            .map_err(|e| PcovError::Validation(format!("invalid amount {s:?}: {e}")))
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(u128::from(value))
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Amount::parse(&s).map_err(serde::de::Error::custom)
    }
}
