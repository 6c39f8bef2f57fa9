//! Error types for the HTTP layer and the payment retry flow.

use std::time::Duration;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{Value, json};
use tz402::amount::AmountError;
use tz402::timestamp::UnixTimestamp;
use tz402::{Mutez, PaymentRequirement};
use tz402_tezos::LedgerError;

use crate::client::PaymentSummary;

/// Errors that can occur during HTTP header encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Base64 decoding failed.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Terminal failure of one fetch-pay-retry call.
///
/// Every variant maps to a stable [`kind`](FlowError::kind) the caller can
/// branch on. Serializes as `{ "kind", "message", "context" }`.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FlowError {
    /// The caller's payment limit is not a valid amount.
    #[error("invalid payment limit: {0}")]
    InvalidPaymentLimit(#[source] AmountError),

    /// The initial request failed at the transport level or timed out.
    #[error("request to {url} failed: {reason}")]
    Fetch {
        /// Requested URL.
        url: String,
        /// Transport error text.
        reason: String,
        /// Timeout that elapsed, if this was a timeout.
        timeout: Option<Duration>,
    },

    /// The 402 response carried no usable payment requirement.
    #[error("402 response carried no usable payment requirement")]
    UnparsablePaymentRequirement {
        /// Raw response body, for diagnosis.
        raw_body: String,
    },

    /// The requirement targets a network other than Tezos.
    #[error("unsupported network {:?}: only Tezos networks can be paid", requirement.network)]
    UnsupportedNetwork {
        /// The rejected requirement.
        requirement: Box<PaymentRequirement>,
    },

    /// The required amount is above the caller's limit.
    #[error("payment of {required} mutez exceeds the limit of {limit} mutez")]
    PaymentLimitExceeded {
        /// Amount asked by the server.
        required: Mutez,
        /// Caller's limit, converted to mutez.
        limit: Mutez,
        /// The rejected requirement.
        requirement: Box<PaymentRequirement>,
    },

    /// The requirement asks for a currency other than XTZ.
    #[error("unsupported asset {:?}: only XTZ payments are handled", requirement.asset)]
    UnsupportedAsset {
        /// The rejected requirement.
        requirement: Box<PaymentRequirement>,
    },

    /// The requirement's expiry has passed.
    #[error("payment requirement expired at {expiry} (now {now})")]
    PaymentExpired {
        /// Expiry stated by the server.
        expiry: UnixTimestamp,
        /// Time of the check.
        now: UnixTimestamp,
        /// The rejected requirement.
        requirement: Box<PaymentRequirement>,
    },

    /// The recipient is not a Tezos address.
    #[error("invalid recipient address {:?}", requirement.pay_to)]
    InvalidAddress {
        /// The rejected requirement.
        requirement: Box<PaymentRequirement>,
    },

    /// The wallet's balance could not be read.
    #[error("could not read wallet balance: {cause}")]
    BalanceCheckFailed {
        /// Underlying ledger error.
        #[source]
        cause: LedgerError,
        /// The requirement being paid.
        requirement: Box<PaymentRequirement>,
    },

    /// The wallet cannot cover the amount plus the fee reserve.
    #[error("insufficient balance: have {balance} mutez, need {needed} mutez including fee reserve")]
    InsufficientBalance {
        /// Current spendable balance.
        balance: Mutez,
        /// Amount plus fee reserve.
        needed: Mutez,
        /// The requirement being paid.
        requirement: Box<PaymentRequirement>,
    },

    /// Submitting or confirming the transfer failed.
    #[error("payment failed: {cause}")]
    PaymentExecutionFailed {
        /// Underlying ledger error.
        #[source]
        cause: LedgerError,
        /// The requirement being paid.
        requirement: Box<PaymentRequirement>,
    },

    /// Funds moved, but the retried request could not be completed.
    #[error("paid (operation {}) but the retried request failed: {reason}", summary.op_hash)]
    PaymentMadeRetryFailed {
        /// The committed payment.
        summary: Box<PaymentSummary>,
        /// Transport error text.
        reason: String,
    },
}

impl FlowError {
    /// Machine-readable error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPaymentLimit(_) => "InvalidPaymentLimit",
            Self::Fetch { timeout: Some(_), .. } => "TimeoutError",
            Self::Fetch { .. } => "FetchError",
            Self::UnparsablePaymentRequirement { .. } => "UnparsablePaymentRequirement",
            Self::UnsupportedNetwork { .. } => "UnsupportedNetwork",
            Self::PaymentLimitExceeded { .. } => "PaymentLimitExceeded",
            Self::UnsupportedAsset { .. } => "UnsupportedAsset",
            Self::PaymentExpired { .. } => "PaymentExpired",
            Self::InvalidAddress { .. } => "InvalidAddress",
            Self::BalanceCheckFailed { .. } => "BalanceCheckFailed",
            Self::InsufficientBalance { .. } => "InsufficientBalance",
            Self::PaymentExecutionFailed { .. } => "PaymentExecutionFailed",
            Self::PaymentMadeRetryFailed { .. } => "PaymentMadeRetryFailed",
        }
    }

    /// Returns `true` if funds left the wallet before the failure.
    #[must_use]
    pub const fn funds_moved(&self) -> bool {
        matches!(self, Self::PaymentMadeRetryFailed { .. })
    }

    /// The requirement the failure refers to, when one was parsed.
    #[must_use]
    pub fn requirement(&self) -> Option<&PaymentRequirement> {
        match self {
            Self::UnsupportedNetwork { requirement }
            | Self::PaymentLimitExceeded { requirement, .. }
            | Self::UnsupportedAsset { requirement }
            | Self::PaymentExpired { requirement, .. }
            | Self::InvalidAddress { requirement }
            | Self::BalanceCheckFailed { requirement, .. }
            | Self::InsufficientBalance { requirement, .. }
            | Self::PaymentExecutionFailed { requirement, .. } => Some(requirement),
            _ => None,
        }
    }

    /// Structured context attached to the serialized error.
    #[must_use]
    pub fn context(&self) -> Value {
        let mut context = match self {
            Self::Fetch { url, timeout, .. } => json!({
                "url": url,
                "timeoutSecs": timeout.map(|t| t.as_secs()),
            }),
            Self::UnparsablePaymentRequirement { raw_body } => json!({ "rawBody": raw_body }),
            Self::PaymentLimitExceeded { required, limit, .. } => json!({
                "required": required,
                "limit": limit,
            }),
            Self::PaymentExpired { expiry, now, .. } => json!({ "expiry": expiry, "now": now }),
            Self::InsufficientBalance { balance, needed, .. } => json!({
                "balance": balance,
                "needed": needed,
            }),
            Self::PaymentMadeRetryFailed { summary, .. } => json!({
                "payment": summary,
                "opHash": summary.op_hash,
            }),
            _ => json!({}),
        };
        if let (Some(requirement), Some(map)) = (self.requirement(), context.as_object_mut()) {
            map.insert(
                "requirement".to_owned(),
                serde_json::to_value(requirement).unwrap_or(Value::Null),
            );
        }
        context
    }
}

impl Serialize for FlowError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FlowError", 3)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.serialize_field("context", &self.context())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requirement() -> PaymentRequirement {
        serde_json::from_value(json!({
            "network": "tezos-test",
            "maxAmountRequired": "100000",
            "payTo": "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx",
            "asset": "XTZ",
        }))
        .unwrap()
    }

    #[test]
    fn test_serialized_shape() {
        let err = FlowError::PaymentLimitExceeded {
            required: Mutez::new(100_000),
            limit: Mutez::new(50_000),
            requirement: Box::new(requirement()),
        };
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["kind"], "PaymentLimitExceeded");
        assert_eq!(value["context"]["required"], "100000");
        assert_eq!(value["context"]["limit"], "50000");
        assert_eq!(value["context"]["requirement"]["payTo"], "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx");
        assert!(value["message"].as_str().unwrap().contains("exceeds"));
    }

    #[test]
    fn test_timeout_kind() {
        let err = FlowError::Fetch {
            url: "http://x".into(),
            reason: "timed out".into(),
            timeout: Some(Duration::from_secs(30)),
        };
        assert_eq!(err.kind(), "TimeoutError");
        assert!(!err.funds_moved());
    }
}
