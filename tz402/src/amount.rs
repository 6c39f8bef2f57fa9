//! Native currency amounts.
//!
//! Tezos denominates its native currency (XTZ, "tez") in **mutez**, the smallest
//! indivisible unit: `1 XTZ = 1_000_000 mutez`. Payment requirements always carry
//! mutez as a decimal string; agents and humans usually think in XTZ.
//!
//! - [`Mutez`] - integer smallest-unit amount, serialized as a string
//! - [`Xtz`] - decimal XTZ amount, converted to mutez with [`Xtz::to_mutez`]

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of mutez in one XTZ.
pub const MUTEZ_PER_XTZ: u64 = 1_000_000;

/// Errors produced while parsing or converting amounts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// The input is not a number.
    #[error("invalid amount: {0}")]
    Invalid(String),
    /// Negative amounts are never meaningful for payments.
    #[error("amount must not be negative: {0}")]
    Negative(String),
    /// The amount does not fit into 64 bits of mutez.
    #[error("amount out of range: {0}")]
    Overflow(String),
}

/// An amount of the native currency in its smallest unit.
///
/// Serializes as a decimal string to survive JSON parsers that cannot hold
/// 64-bit integers. Deserialization accepts both a decimal string and a
/// non-negative JSON integer, since resource servers emit either.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mutez(u64);

impl Mutez {
    /// Zero mutez.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from raw mutez.
    #[must_use]
    pub const fn new(mutez: u64) -> Self {
        Self(mutez)
    }

    /// Returns the raw mutez value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Adds two amounts, returning `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Adds two amounts, clamping at `u64::MAX`.
    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Converts to a decimal XTZ amount.
    #[must_use]
    pub fn to_xtz(self) -> Xtz {
        Xtz(Decimal::from(self.0) / Decimal::from(MUTEZ_PER_XTZ))
    }
}

impl Display for Mutez {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Mutez {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Mutez> for u64 {
    fn from(value: Mutez) -> Self {
        value.0
    }
}

impl FromStr for Mutez {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.starts_with('-') {
            return Err(AmountError::Negative(s.to_owned()));
        }
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::Invalid(s.to_owned()));
        }
        trimmed
            .parse::<u64>()
            .map(Self)
            .map_err(|_| AmountError::Overflow(s.to_owned()))
    }
}

impl Serialize for Mutez {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

/// Wire representation accepted for numeric fields: a string or a JSON number.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(serde_json::Number),
    String(String),
}

impl NumberOrString {
    fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::String(s) => s,
        }
    }
}

impl<'de> Deserialize<'de> for Mutez {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = NumberOrString::deserialize(deserializer)?.into_string();
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// An amount of the native currency in whole XTZ, with decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Xtz(Decimal);

impl Xtz {
    /// One XTZ.
    pub const ONE: Self = Self(Decimal::ONE);

    /// Wraps a decimal value.
    #[must_use]
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the decimal value.
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Converts to mutez, truncating sub-mutez precision toward zero.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::Negative`] for negative amounts and
    /// [`AmountError::Overflow`] when the result does not fit in a `u64`.
    pub fn to_mutez(&self) -> Result<Mutez, AmountError> {
        if self.0.is_sign_negative() && !self.0.is_zero() {
            return Err(AmountError::Negative(self.0.to_string()));
        }
        let scaled = self
            .0
            .checked_mul(Decimal::from(MUTEZ_PER_XTZ))
            .ok_or_else(|| AmountError::Overflow(self.0.to_string()))?;
        scaled
            .trunc()
            .to_u64()
            .map(Mutez)
            .ok_or_else(|| AmountError::Overflow(self.0.to_string()))
    }
}

impl Default for Xtz {
    fn default() -> Self {
        Self::ONE
    }
}

impl Display for Xtz {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Xtz {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .map(Self)
            .map_err(|_| AmountError::Invalid(s.to_owned()))
    }
}

impl Serialize for Xtz {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Xtz {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = NumberOrString::deserialize(deserializer)?.into_string();
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutez_deserializes_from_string_and_number() {
        let from_str: Mutez = serde_json::from_str("\"100000\"").unwrap();
        let from_num: Mutez = serde_json::from_str("100000").unwrap();
        assert_eq!(from_str, Mutez::new(100_000));
        assert_eq!(from_num, Mutez::new(100_000));
    }

    #[test]
    fn test_mutez_serializes_as_string() {
        let json = serde_json::to_string(&Mutez::new(42)).unwrap();
        assert_eq!(json, "\"42\"");
    }

    #[test]
    fn test_mutez_rejects_garbage() {
        assert!(matches!("1.5".parse::<Mutez>(), Err(AmountError::Invalid(_))));
        assert!(matches!("".parse::<Mutez>(), Err(AmountError::Invalid(_))));
        assert!(matches!("-3".parse::<Mutez>(), Err(AmountError::Negative(_))));
        assert!(matches!(
            "99999999999999999999999".parse::<Mutez>(),
            Err(AmountError::Overflow(_))
        ));
        assert!(serde_json::from_str::<Mutez>("-1").is_err());
    }

    #[test]
    fn test_xtz_to_mutez() {
        assert_eq!(Xtz::ONE.to_mutez().unwrap(), Mutez::new(1_000_000));
        let half: Xtz = "0.05".parse().unwrap();
        assert_eq!(half.to_mutez().unwrap(), Mutez::new(50_000));
        let tiny: Xtz = "0.0000019".parse().unwrap();
        assert_eq!(tiny.to_mutez().unwrap(), Mutez::new(1));
    }

    #[test]
    fn test_xtz_negative_is_rejected() {
        let neg: Xtz = "-0.1".parse().unwrap();
        assert!(matches!(neg.to_mutez(), Err(AmountError::Negative(_))));
    }

    #[test]
    fn test_xtz_deserializes_from_number() {
        let v: Xtz = serde_json::from_str("0.25").unwrap();
        assert_eq!(v.to_mutez().unwrap(), Mutez::new(250_000));
    }

    #[test]
    fn test_mutez_to_xtz_display() {
        assert_eq!(Mutez::new(1_500_000).to_xtz().to_string(), "1.5");
    }

    #[test]
    fn test_checked_add_overflow() {
        assert!(Mutez::new(u64::MAX).checked_add(Mutez::new(1)).is_none());
        assert_eq!(
            Mutez::new(u64::MAX).saturating_add(Mutez::new(1)),
            Mutez::new(u64::MAX)
        );
    }
}
