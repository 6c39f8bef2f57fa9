//! Base64 encoding and decoding utilities.
//!
//! Payment proofs and counter-proofs travel in HTTP headers as base64-encoded
//! JSON. [`Base64Bytes`] wraps that representation.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Display;

/// A wrapper for base64-encoded byte data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Bytes(pub Vec<u8>);

impl Base64Bytes {
    /// Decodes the base64 string bytes to raw binary data.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        b64.decode(self.0.trim_ascii())
    }

    /// Encodes raw binary data into base64 string bytes.
    pub fn encode<T: AsRef<[u8]>>(input: T) -> Self {
        let encoded = b64.encode(input.as_ref());
        Self(encoded.into_bytes())
    }

    /// Serializes `value` to JSON and base64-encodes the result.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized.
    pub fn encode_json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_vec(value)?;
        Ok(Self::encode(json))
    }

    /// Decodes base64 and parses the result as JSON.
    ///
    /// Returns `None` on either failure; callers treat undecodable headers as absent.
    #[must_use]
    pub fn decode_json<T: DeserializeOwned>(&self) -> Option<T> {
        let bytes = self.decode().ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

impl AsRef<[u8]> for Base64Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for Base64Bytes {
    fn from(slice: &[u8]) -> Self {
        Self(slice.to_vec())
    }
}

impl From<&str> for Base64Bytes {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl Display for Base64Bytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_json_tolerates_whitespace() {
        let encoded = Base64Bytes::encode_json(&serde_json::json!({"ok": true})).unwrap();
        let padded = Base64Bytes(format!("  {encoded}\n").into_bytes());
        let value: serde_json::Value = padded.decode_json().unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn test_decode_json_rejects_non_json() {
        let encoded = Base64Bytes::encode("not json");
        assert!(encoded.decode_json::<serde_json::Value>().is_none());
        assert!(Base64Bytes::from("%%%").decode_json::<serde_json::Value>().is_none());
    }
}
