//! Tezos account addresses.
//!
//! Addresses are base58check strings whose three-character prefix tells the
//! account kind: `tz1` (Ed25519) and `tz2` (Secp256k1) are externally-owned
//! implicit accounts, `KT1` is an originated contract. All of them are exactly
//! 36 characters long.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

static ADDRESS_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(tz1|tz2|KT1)[1-9A-HJ-NP-Za-km-z]{33}$").expect("address regex is valid")
});

/// The string does not have the shape of a Tezos address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid Tezos address: {0}")]
pub struct InvalidAddress(pub String);

/// Kind of account an address points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    /// `tz1…` implicit account.
    Ed25519,
    /// `tz2…` implicit account.
    Secp256k1,
    /// `KT1…` originated contract.
    Contract,
}

/// A Tezos address whose shape has been validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TezosAddress(String);

impl TezosAddress {
    /// Returns `true` if `s` has the shape of a supported Tezos address.
    #[must_use]
    pub fn is_valid(s: &str) -> bool {
        ADDRESS_SHAPE.is_match(s)
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the account kind encoded in the prefix.
    #[must_use]
    pub fn kind(&self) -> AddressKind {
        match &self.0[..3] {
            "tz1" => AddressKind::Ed25519,
            "tz2" => AddressKind::Secp256k1,
            _ => AddressKind::Contract,
        }
    }

    /// Returns `true` for `KT1…` contract addresses.
    #[must_use]
    pub fn is_contract(&self) -> bool {
        self.kind() == AddressKind::Contract
    }
}

impl FromStr for TezosAddress {
    type Err = InvalidAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if Self::is_valid(trimmed) {
            Ok(Self(trimmed.to_owned()))
        } else {
            Err(InvalidAddress(s.to_owned()))
        }
    }
}

impl Display for TezosAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TezosAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for TezosAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TezosAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
