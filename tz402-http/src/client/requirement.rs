//! Extraction of the payment requirement from a 402 response.
//!
//! Servers describe what they want in several shapes. Each shape has its own
//! parse attempt; attempts are pure, never fail, and are tried in a fixed
//! order until one yields a requirement.

use reqwest::header::HeaderMap;
use serde_json::Value;
use tz402::proto::{ExactScheme, NATIVE_ASSET};
use tz402::{Mutez, PaymentRequiredBody, PaymentRequirement};

use crate::constants::{
    DEFAULT_HEADER_NETWORK, PAYMENT_REQUIRED_HEADER, X_PAYMENT_ADDRESS_HEADER,
    X_PAYMENT_AMOUNT_HEADER, X_PAYMENT_ASSET_HEADER, X_PAYMENT_NETWORK_HEADER,
};
use crate::headers::decode_payment_required;

/// Where a payment requirement was found.
#[derive(Debug, Clone, PartialEq)]
pub enum RequirementSource {
    /// Body `accepts` list; the first Tezos option, else the first option.
    FromAcceptsList(PaymentRequirement),
    /// Body `paymentRequirements` field, or the body itself.
    FromSingleField(PaymentRequirement),
    /// Base64 JSON in the `PAYMENT-REQUIRED` header.
    FromEncodedHeader(PaymentRequirement),
    /// Plain `X-Payment-*` headers.
    FromHeaders(PaymentRequirement),
    /// Nothing usable.
    Unrecognized,
}

impl RequirementSource {
    /// Resolves the requirement of a 402 response.
    #[must_use]
    pub fn resolve(headers: &HeaderMap, body: &[u8]) -> Self {
        let json = serde_json::from_slice::<Value>(body).ok();
        if let Some(requirement) = json.as_ref().and_then(from_accepts_list) {
            return Self::FromAcceptsList(requirement);
        }
        if let Some(requirement) = json.as_ref().and_then(from_single_field) {
            return Self::FromSingleField(requirement);
        }
        if let Some(requirement) = from_encoded_header(headers) {
            return Self::FromEncodedHeader(requirement);
        }
        if let Some(requirement) = from_headers(headers) {
            return Self::FromHeaders(requirement);
        }
        Self::Unrecognized
    }

    /// Short name of the source, for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FromAcceptsList(_) => "accepts_list",
            Self::FromSingleField(_) => "single_field",
            Self::FromEncodedHeader(_) => "encoded_header",
            Self::FromHeaders(_) => "headers",
            Self::Unrecognized => "unrecognized",
        }
    }

    /// The resolved requirement, if any.
    #[must_use]
    pub const fn requirement(&self) -> Option<&PaymentRequirement> {
        match self {
            Self::FromAcceptsList(r)
            | Self::FromSingleField(r)
            | Self::FromEncodedHeader(r)
            | Self::FromHeaders(r) => Some(r),
            Self::Unrecognized => None,
        }
    }

    /// Consumes the source, returning the requirement if any.
    #[must_use]
    pub fn into_requirement(self) -> Option<PaymentRequirement> {
        match self {
            Self::FromAcceptsList(r)
            | Self::FromSingleField(r)
            | Self::FromEncodedHeader(r)
            | Self::FromHeaders(r) => Some(r),
            Self::Unrecognized => None,
        }
    }
}

/// Reads the `accepts` list of a 402 body.
#[must_use]
pub fn from_accepts_list(body: &Value) -> Option<PaymentRequirement> {
    body.get("accepts")?.as_array()?;
    let parsed: PaymentRequiredBody = serde_json::from_value(body.clone()).ok()?;
    parsed.preferred().cloned()
}

/// Reads a single requirement: the `paymentRequirements` field (object or
/// list), or the body itself when it carries `payTo`. Options in a scheme
/// other than `"exact"` are not usable and read as absent.
#[must_use]
pub fn from_single_field(body: &Value) -> Option<PaymentRequirement> {
    match body.get("paymentRequirements") {
        Some(Value::Array(options)) => {
            let parsed = PaymentRequiredBody {
                accepts: options
                    .iter()
                    .filter_map(|o| serde_json::from_value(o.clone()).ok())
                    .collect(),
                ..PaymentRequiredBody::default()
            };
            parsed.preferred().cloned()
        }
        Some(single @ Value::Object(_)) => exact_option(single),
        _ if body.get("payTo").is_some() => exact_option(body),
        _ => None,
    }
}

fn exact_option(value: &Value) -> Option<PaymentRequirement> {
    serde_json::from_value::<PaymentRequirement>(value.clone())
        .ok()
        .filter(PaymentRequirement::is_exact_scheme)
}

/// Reads the base64 JSON `PAYMENT-REQUIRED` header, resolved like a body.
#[must_use]
pub fn from_encoded_header(headers: &HeaderMap) -> Option<PaymentRequirement> {
    let raw = headers.get(PAYMENT_REQUIRED_HEADER)?.to_str().ok()?;
    let value = decode_payment_required(raw).ok()?;
    from_accepts_list(&value).or_else(|| from_single_field(&value))
}

/// Reads the plain `X-Payment-*` headers.
///
/// Address and amount are mandatory; network and asset default to Tezos and XTZ.
#[must_use]
pub fn from_headers(headers: &HeaderMap) -> Option<PaymentRequirement> {
    let text = |name| header_text(headers, name);
    let pay_to = text(X_PAYMENT_ADDRESS_HEADER)?;
    let amount: Mutez = text(X_PAYMENT_AMOUNT_HEADER)?.parse().ok()?;
    Some(PaymentRequirement {
        scheme: ExactScheme::VALUE.to_owned(),
        network: text(X_PAYMENT_NETWORK_HEADER)
            .unwrap_or(DEFAULT_HEADER_NETWORK)
            .to_owned(),
        max_amount_required: amount,
        resource: String::new(),
        pay_to: pay_to.to_owned(),
        asset: text(X_PAYMENT_ASSET_HEADER)
            .unwrap_or(NATIVE_ASSET)
            .to_owned(),
        expiry: None,
        description: None,
        mime_type: None,
        max_timeout_seconds: None,
        output_schema: None,
        extra: None,
    })
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
