//! Inputs and results of [`PaymentRetryFlow`](super::PaymentRetryFlow).

use std::collections::BTreeMap;

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tz402::{Mutez, PaymentRequirement, Xtz};
use url::Url;

/// HTTP method of the resource request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`
    #[default]
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Delete => Self::DELETE,
        }
    }
}

const fn default_auto_retry() -> bool {
    true
}

/// A resource request that may be paid for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    /// Resource URL.
    pub url: Url,
    /// Request method.
    #[serde(default)]
    pub method: HttpMethod,
    /// Request headers, sent on both the initial and the retried request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Largest payment the flow may make, in XTZ.
    #[serde(default, rename = "maxPaymentAllowed")]
    pub max_payment: Xtz,
    /// Pay automatically; when `false`, a 402 is returned as a manual-pay instruction.
    #[serde(default = "default_auto_retry")]
    pub auto_retry: bool,
}

impl FetchRequest {
    /// A `GET` request with a 1 XTZ limit and automatic payment.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self {
            url,
            method: HttpMethod::Get,
            headers: BTreeMap::new(),
            body: None,
            max_payment: Xtz::default(),
            auto_retry: true,
        }
    }

    /// Sets the method.
    #[must_use]
    pub const fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the payment limit.
    #[must_use]
    pub const fn with_max_payment(mut self, max_payment: Xtz) -> Self {
        self.max_payment = max_payment;
        self
    }

    /// Enables or disables automatic payment.
    #[must_use]
    pub const fn with_auto_retry(mut self, auto_retry: bool) -> Self {
        self.auto_retry = auto_retry;
        self
    }
}

/// A response as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers by lowercase name. Every value of a repeated header
    /// is kept in arrival order; bytes that are not UTF-8 are replaced.
    pub headers: BTreeMap<String, Vec<String>>,
    /// Response body, lossily decoded as UTF-8.
    pub body: String,
}

impl ResourceResponse {
    pub(crate) fn new(status: u16, headers: &HeaderMap, body: &[u8]) -> Self {
        let mut collected: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in headers {
            collected
                .entry(name.as_str().to_owned())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
        Self {
            status,
            headers: collected,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }
}

/// What was paid, reported alongside the retried response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    /// Amount paid, in mutez.
    pub amount: Mutez,
    /// Amount paid, in XTZ.
    pub amount_xtz: Xtz,
    /// Recipient address.
    pub recipient: String,
    /// Operation hash of the payment.
    pub op_hash: String,
    /// Network named by the requirement.
    pub network: String,
    /// Confirmations observed before the retry.
    pub confirmations: u32,
    /// Block explorer link, for known networks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    /// Decoded `X-PAYMENT-RESPONSE` header of the retried response, if present.
    /// Not verified against the chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_proof: Option<Value>,
}

/// Result of a fetch-pay-retry call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum FetchOutcome {
    /// The server did not ask for payment; its response is returned verbatim.
    Completed {
        /// The server's response.
        response: ResourceResponse,
    },
    /// Payment is required but automatic payment is disabled.
    PaymentRequired {
        /// What the server asks for.
        requirement: Box<PaymentRequirement>,
        /// The 402 response.
        response: ResourceResponse,
    },
    /// A payment was made and the request retried with its proof.
    Paid {
        /// The retried response, whatever its status.
        response: ResourceResponse,
        /// The committed payment.
        payment: Box<PaymentSummary>,
    },
}

impl FetchOutcome {
    /// The response returned to the caller.
    #[must_use]
    pub const fn response(&self) -> &ResourceResponse {
        match self {
            Self::Completed { response }
            | Self::PaymentRequired { response, .. }
            | Self::Paid { response, .. } => response,
        }
    }

    /// The payment made, if any.
    #[must_use]
    pub fn payment(&self) -> Option<&PaymentSummary> {
        match self {
            Self::Paid { payment, .. } => Some(payment),
            _ => None,
        }
    }
}
