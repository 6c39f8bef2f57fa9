//! Payment proof attached to the retried request.

use serde::{Deserialize, Serialize};

use crate::amount::Mutez;
use crate::encoding::Base64Bytes;
use crate::proto::PaymentRequirement;
use crate::transfer::ConfirmedTransfer;

/// Transcript of the executed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    /// Paying address.
    pub from: String,
    /// Receiving address.
    pub to: String,
    /// Transferred amount in mutez.
    pub amount: Mutez,
    /// Currency code, copied from the requirement.
    pub asset: String,
    /// On-chain operation hash.
    pub op_hash: String,
}

/// Scheme-specific payload of a [`PaymentProof`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofPayload {
    /// The transfer transcript.
    pub authorization: Authorization,
}

/// Proof of a committed payment, sent base64-encoded in the payment header.
///
/// The only constructor is [`PaymentProof::from_confirmed`]; a proof cannot
/// be assembled before the transfer reached its confirmation depth.
///
/// ```json
/// {
///   "scheme": "exact",
///   "network": "tezos-test",
///   "payload": {
///     "authorization": {
///       "from": "tz1…", "to": "tz1…", "amount": "100000",
///       "asset": "XTZ", "opHash": "oo…"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    scheme: String,
    network: String,
    payload: ProofPayload,
}

impl PaymentProof {
    /// Builds the proof for `requirement` from the confirmed transfer that paid it.
    #[must_use]
    pub fn from_confirmed(requirement: &PaymentRequirement, transfer: &ConfirmedTransfer) -> Self {
        Self {
            scheme: requirement.scheme.clone(),
            network: requirement.network.clone(),
            payload: ProofPayload {
                authorization: Authorization {
                    from: transfer.from().to_string(),
                    to: transfer.to().to_string(),
                    amount: transfer.amount(),
                    asset: requirement.asset.clone(),
                    op_hash: transfer.op_hash().to_owned(),
                },
            },
        }
    }

    /// Payment scheme, copied from the requirement.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Network identifier, copied from the requirement.
    #[must_use]
    pub fn network(&self) -> &str {
        &self.network
    }

    /// The transfer transcript.
    #[must_use]
    pub const fn authorization(&self) -> &Authorization {
        &self.payload.authorization
    }

    /// Base64 of the JSON serialization, ready for the payment header.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn to_header_value(&self) -> Result<String, serde_json::Error> {
        Base64Bytes::encode_json(self).map(|b| b.to_string())
    }

    /// Decodes a payment header value.
    ///
    /// Returns `None` if the value is not base64 JSON of a proof.
    #[must_use]
    pub fn from_header_value(value: &str) -> Option<Self> {
        Base64Bytes::from(value).decode_json()
    }
}
