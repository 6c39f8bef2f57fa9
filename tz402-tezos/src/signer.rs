//! Operation signing through a remote signer.
//!
//! Private keys never live in this process. Signing requests go to a signer
//! that speaks the Tezos remote-signer HTTP protocol (`octez-signer`, `signatory`
//! and compatible services).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tz402::TezosAddress;
use url::Url;

use crate::ledger::LedgerError;

/// Watermark prefixed to manager operation bytes before signing.
pub const GENERIC_OPERATION_WATERMARK: u8 = 0x03;

/// Length of a raw Ed25519 / secp256k1 / P-256 signature.
pub const RAW_SIGNATURE_LEN: usize = 64;

/// Signs forged operations on behalf of one identity.
#[async_trait]
pub trait OperationSigner: Send + Sync {
    /// Base58 public key of the identity, used to reveal it.
    async fn public_key(&self) -> Result<String, LedgerError>;

    /// Signs forged operation bytes (without watermark), returning the raw signature.
    async fn sign(&self, forged: &[u8]) -> Result<[u8; RAW_SIGNATURE_LEN], LedgerError>;
}

#[derive(Deserialize)]
struct PublicKeyResponse {
    public_key: String,
}

#[derive(Deserialize)]
struct SignatureResponse {
    signature: String,
}

/// HTTP client for a remote signer holding the key of `address`.
#[derive(Debug, Clone)]
pub struct RemoteSigner {
    http: Client,
    key_url: Url,
}

impl RemoteSigner {
    /// Creates a signer client for `address` on the signer at `base`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the HTTP client cannot be built or the URL is unusable.
    pub fn new(base: &Url, address: &TezosAddress, timeout: Duration) -> Result<Self, LedgerError> {
        let http = Client::builder().timeout(timeout).build()?;
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let key_url = base
            .join(&format!("keys/{address}"))
            .map_err(|e| LedgerError::Signer(format!("invalid signer URL: {e}")))?;
        Ok(Self { http, key_url })
    }
}

#[async_trait]
impl OperationSigner for RemoteSigner {
    async fn public_key(&self) -> Result<String, LedgerError> {
        let response = self.http.get(self.key_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Signer(format!("public key lookup: {status}: {body}")));
        }
        let key: PublicKeyResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Signer(format!("public key lookup: {e}")))?;
        Ok(key.public_key)
    }

    async fn sign(&self, forged: &[u8]) -> Result<[u8; RAW_SIGNATURE_LEN], LedgerError> {
        let mut payload = Vec::with_capacity(forged.len() + 1);
        payload.push(GENERIC_OPERATION_WATERMARK);
        payload.extend_from_slice(forged);

        let response = self
            .http
            .post(self.key_url.clone())
            .json(&hex::encode(payload))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Signer(format!("signing refused: {status}: {body}")));
        }
        let signed: SignatureResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Signer(format!("signature response: {e}")))?;
        decode_signature(&signed.signature)
    }
}

/// Extracts the raw 64 bytes from a base58check signature (`edsig…`, `spsig1…`, `p2sig…`, `sig…`).
///
/// # Errors
///
/// Returns [`LedgerError::Signer`] if the string is not valid base58check or is too short.
pub fn decode_signature(encoded: &str) -> Result<[u8; RAW_SIGNATURE_LEN], LedgerError> {
    let bytes = bs58::decode(encoded)
        .with_check(None)
        .into_vec()
        .map_err(|e| LedgerError::Signer(format!("invalid signature encoding: {e}")))?;
    let start = bytes
        .len()
        .checked_sub(RAW_SIGNATURE_LEN)
        .ok_or_else(|| LedgerError::Signer(format!("signature too short: {encoded}")))?;
    let mut raw = [0u8; RAW_SIGNATURE_LEN];
    raw.copy_from_slice(&bytes[start..]);
    Ok(raw)
}
