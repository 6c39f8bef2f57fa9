//! Decoding and encoding of the base64 JSON payment headers.

use serde_json::Value;
use tz402::PaymentProof;
use tz402::encoding::Base64Bytes;

use crate::error::HttpError;

/// Encodes a [`PaymentProof`] for the `X-PAYMENT` header.
///
/// # Errors
///
/// Returns [`HttpError::Serialize`] if JSON serialization fails.
pub fn encode_x_payment(proof: &PaymentProof) -> Result<String, HttpError> {
    Ok(proof.to_header_value()?)
}

/// Decodes an `X-PAYMENT-RESPONSE` counter-proof.
///
/// The content is server-defined and is returned as JSON without being checked
/// against the chain.
///
/// # Errors
///
/// Returns [`HttpError`] on base64 or JSON decode failure.
pub fn decode_payment_response(header_value: &str) -> Result<Value, HttpError> {
    decode_json(header_value)
}

/// Decodes a `PAYMENT-REQUIRED` header into raw JSON, to be resolved like a 402 body.
///
/// # Errors
///
/// Returns [`HttpError`] on base64 or JSON decode failure.
pub fn decode_payment_required(header_value: &str) -> Result<Value, HttpError> {
    decode_json(header_value)
}

fn decode_json(header_value: &str) -> Result<Value, HttpError> {
    let bytes = Base64Bytes::from(header_value).decode()?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_payment_response() {
        let encoded = Base64Bytes::encode_json(&json!({"success": true, "transaction": "ooAbc"}))
            .unwrap()
            .to_string();
        let decoded = decode_payment_response(&encoded).unwrap();
        assert_eq!(decoded["transaction"], "ooAbc");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_payment_response("%%%"),
            Err(HttpError::Base64(_))
        ));
        let not_json = Base64Bytes::encode(b"hello").to_string();
        assert!(matches!(
            decode_payment_required(&not_json),
            Err(HttpError::Serialize(_))
        ));
    }
}
