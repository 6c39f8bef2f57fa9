//! Wire format types for the 402 payment flow.
//!
//! A resource server answers an unpaid request with `402 Payment Required`
//! and describes what it accepts. The client pays on-chain and retries the
//! request with a [`PaymentProof`] attached.
//!
//! # Key Types
//!
//! - [`PaymentRequirement`] - One acceptable way to pay, as sent by the server
//! - [`PaymentRequiredBody`] - The JSON body of a 402 response
//! - [`PaymentProof`] - Transcript of a committed payment, sent on retry
//!
//! # Wire Format
//!
//! All types serialize to JSON using camelCase field names.

use serde::{Deserialize, Serialize};
use serde_with::{VecSkipError, serde_as};

use crate::amount::Mutez;
use crate::networks;
use crate::timestamp::UnixTimestamp;

mod proof;

pub use proof::*;

/// Currency code of the chain's native asset.
pub const NATIVE_ASSET: &str = "XTZ";

/// A unit struct representing the string literal `"exact"`.
///
/// The only proof format this client produces: pay exactly the required
/// amount and present the operation hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExactScheme;

impl ExactScheme {
    /// The string literal value: `"exact"`.
    pub const VALUE: &'static str = "exact";
}

impl std::fmt::Display for ExactScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(Self::VALUE)
    }
}

impl AsRef<str> for ExactScheme {
    fn as_ref(&self) -> &str {
        Self::VALUE
    }
}

fn default_scheme() -> String {
    ExactScheme::VALUE.to_owned()
}

/// Payment terms set by the resource server.
///
/// Parsed once from a 402 response and only read afterwards; the flow derives
/// its payment action from it but never alters it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirement {
    /// The payment scheme (only `"exact"` is produced by this client).
    /// Servers that omit it are taken to mean `"exact"`.
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Target chain identifier, e.g. `"tezos-test"`.
    pub network: String,
    /// Amount to pay, in mutez.
    pub max_amount_required: Mutez,
    /// The resource URL the payment authorizes access to.
    #[serde(default)]
    pub resource: String,
    /// Recipient address. Kept raw here; its shape is checked before paying.
    pub pay_to: String,
    /// Currency code; only [`NATIVE_ASSET`] can be paid by this client.
    pub asset: String,
    /// Unix timestamp after which the requirement is no longer valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<UnixTimestamp>,
    /// Human-readable description of the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Maximum time in seconds the server waits for the payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_timeout_seconds: Option<u64>,
    /// Optional JSON schema for the resource output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,
    /// Scheme-specific extra data, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl PaymentRequirement {
    /// Returns `true` if the network identifier denotes the Tezos chain.
    #[must_use]
    pub fn is_supported_network(&self) -> bool {
        networks::is_supported_network(&self.network)
    }

    /// Returns `true` if the option asks for the `"exact"` scheme, the only
    /// one this client can pay.
    #[must_use]
    pub fn is_exact_scheme(&self) -> bool {
        self.scheme == ExactScheme::VALUE
    }

    /// Returns `true` if the asset is the native currency.
    #[must_use]
    pub fn is_native_asset(&self) -> bool {
        self.asset.trim().eq_ignore_ascii_case(NATIVE_ASSET)
    }

    /// Returns `true` if an expiry is set and lies before `now`.
    #[must_use]
    pub fn is_expired(&self, now: UnixTimestamp) -> bool {
        self.expiry.is_some_and(|expiry| expiry.is_past(now))
    }
}

/// JSON body of a 402 Payment Required response.
///
/// Entries of `accepts` that fail to parse are skipped rather than failing
/// the whole body, so one malformed option does not hide the usable ones.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequiredBody {
    /// Protocol version, if the server states one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x402_version: Option<u8>,
    /// Server-provided reason for requiring payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Acceptable payment options, in server preference order.
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    pub accepts: Vec<PaymentRequirement>,
}

impl PaymentRequiredBody {
    /// Picks the option to pay: the first `"exact"` one on a Tezos network,
    /// otherwise the first `"exact"` one overall. Options in other schemes
    /// are never picked.
    #[must_use]
    pub fn preferred(&self) -> Option<&PaymentRequirement> {
        let mut exact = self.accepts.iter().filter(|r| r.is_exact_scheme());
        exact
            .clone()
            .find(|r| r.is_supported_network())
            .or_else(|| exact.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn option(network: &str, pay_to: &str) -> serde_json::Value {
        json!({
            "scheme": "exact",
            "network": network,
            "maxAmountRequired": "100000",
            "resource": "https://api.example.com/resource",
            "payTo": pay_to,
            "asset": "XTZ",
        })
    }

    #[test]
    fn test_preferred_picks_first_tezos_option() {
        let body: PaymentRequiredBody = serde_json::from_value(json!({
            "x402Version": 1,
            "accepts": [
                option("base-sepolia", "0xabc"),
                option("tezos-test", "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx"),
                option("tezos-ghostnet", "tz2BFTyPeYRzxd5aiBchbXN3WCZhx7BqbMBq"),
            ]
        }))
        .unwrap();
        let chosen = body.preferred().unwrap();
        assert_eq!(chosen.network, "tezos-test");
        assert_eq!(chosen.max_amount_required, Mutez::new(100_000));
    }

    #[test]
    fn test_preferred_falls_back_to_first() {
        let body: PaymentRequiredBody = serde_json::from_value(json!({
            "accepts": [option("base-sepolia", "0xabc"), option("solana", "abc")]
        }))
        .unwrap();
        assert_eq!(body.preferred().unwrap().network, "base-sepolia");
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let body: PaymentRequiredBody = serde_json::from_value(json!({
            "accepts": [
                {"scheme": "exact", "network": "tezos-test"},
                option("tezos-test", "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx"),
            ]
        }))
        .unwrap();
        assert_eq!(body.accepts.len(), 1);
    }

    #[test]
    fn test_scheme_defaults_to_exact() {
        let mut raw = option("tezos-test", "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx");
        raw.as_object_mut().unwrap().remove("scheme");
        let req: PaymentRequirement = serde_json::from_value(raw).unwrap();
        assert_eq!(req.scheme, "exact");
    }

    #[test]
    fn test_preferred_skips_other_schemes() {
        let mut upto = option("tezos-test", "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx");
        upto["scheme"] = json!("upto");
        let body: PaymentRequiredBody = serde_json::from_value(json!({
            "accepts": [upto.clone(), option("base", "0xabc")]
        }))
        .unwrap();
        assert_eq!(body.preferred().unwrap().network, "base");

        let only_upto: PaymentRequiredBody =
            serde_json::from_value(json!({ "accepts": [upto] })).unwrap();
        assert!(only_upto.preferred().is_none());
    }

    #[test]
    fn test_missing_accepts_is_empty() {
        let body: PaymentRequiredBody = serde_json::from_value(json!({"error": "pay"})).unwrap();
        assert!(body.preferred().is_none());
    }

    #[test]
    fn test_passthrough_metadata_survives() {
        let mut raw = option("tezos-test", "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx");
        raw["extra"] = json!({"name": "premium"});
        raw["mimeType"] = json!("application/json");
        raw["expiry"] = json!(1_900_000_000u64);
        let req: PaymentRequirement = serde_json::from_value(raw).unwrap();
        assert_eq!(req.extra.as_ref().unwrap()["name"], "premium");
        assert_eq!(req.mime_type.as_deref(), Some("application/json"));
        assert!(!req.is_expired(UnixTimestamp::from_secs(1_800_000_000)));
        assert!(req.is_expired(UnixTimestamp::from_secs(1_900_000_001)));
    }

    #[test]
    fn test_native_asset_is_case_insensitive() {
        let mut req: PaymentRequirement =
            serde_json::from_value(option("tezos-test", "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx"))
                .unwrap();
        assert!(req.is_native_asset());
        req.asset = "xtz".into();
        assert!(req.is_native_asset());
        req.asset = "USDT".into();
        assert!(!req.is_native_asset());
    }
}
