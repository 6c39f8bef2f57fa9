//! Minimal Tezos node RPC client.
//!
//! Only the endpoints needed to query balances, forge, inject and follow
//! manager operations are covered. All calls target the `main` chain.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use tz402::{Mutez, TezosAddress};
use url::Url;

use crate::ledger::LedgerError;

/// Validation pass holding manager operations (transactions, reveals).
pub const MANAGER_OPERATIONS_PASS: u8 = 3;

/// Header fields of a block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlockHeader {
    /// Block hash (`B…`).
    pub hash: String,
    /// Block level.
    pub level: u64,
}

/// Limits and fee shared by every manager operation.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagerFields {
    /// Account paying the fee.
    pub source: TezosAddress,
    /// Baker fee.
    pub fee: Mutez,
    /// Account counter for this operation.
    #[serde_as(as = "DisplayFromStr")]
    pub counter: u64,
    /// Gas limit.
    #[serde_as(as = "DisplayFromStr")]
    pub gas_limit: u64,
    /// Storage limit in bytes.
    #[serde_as(as = "DisplayFromStr")]
    pub storage_limit: u64,
}

/// Content of a manager operation, in the node's JSON encoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ManagerOperation {
    /// Publishes the source's public key; required once per implicit account.
    Reveal {
        /// Common manager fields.
        #[serde(flatten)]
        fields: ManagerFields,
        /// Base58 public key (`edpk…`, `sppk…`).
        public_key: String,
    },
    /// Transfers native currency, optionally calling an entrypoint.
    Transaction {
        /// Common manager fields.
        #[serde(flatten)]
        fields: ManagerFields,
        /// Amount sent.
        amount: Mutez,
        /// Receiving account or contract.
        destination: TezosAddress,
        /// Entrypoint and Micheline argument.
        #[serde(skip_serializing_if = "Option::is_none")]
        parameters: Option<crate::ledger::ContractCall>,
    },
}

/// An operation as listed in a block, with application results.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockOperation {
    /// Operation hash.
    pub hash: String,
    /// Contents with their metadata.
    #[serde(default)]
    pub contents: Vec<AppliedContent>,
}

/// One content of an included operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppliedContent {
    /// Operation kind, e.g. `"transaction"`.
    pub kind: String,
    /// Application metadata.
    #[serde(default)]
    pub metadata: Option<ContentMetadata>,
}

/// Metadata of an applied content.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentMetadata {
    /// Result of applying the content.
    #[serde(default)]
    pub operation_result: Option<OperationResult>,
}

/// Application status of a content.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationResult {
    /// `applied`, `failed`, `backtracked` or `skipped`.
    pub status: String,
    /// Protocol errors, when not applied.
    #[serde(default)]
    pub errors: Option<serde_json::Value>,
}

impl BlockOperation {
    /// Returns the first failure among the contents, if any.
    ///
    /// Contents without a result (e.g. missing metadata) are not counted as failures.
    #[must_use]
    pub fn failure(&self) -> Option<String> {
        self.contents.iter().find_map(|content| {
            let result = content.metadata.as_ref()?.operation_result.as_ref()?;
            (result.status != "applied").then(|| {
                let errors = result
                    .errors
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                format!("{} {}: {errors}", content.kind, result.status)
            })
        })
    }
}

#[derive(Serialize)]
struct ForgeRequest<'a> {
    branch: &'a str,
    contents: &'a [ManagerOperation],
}

#[serde_as]
#[derive(Deserialize)]
#[serde(transparent)]
struct StringU64(#[serde_as(as = "DisplayFromStr")] u64);

/// HTTP client for a Tezos node.
#[derive(Debug, Clone)]
pub struct TezosRpc {
    http: Client,
    base: Url,
}

impl TezosRpc {
    /// Creates a client for the node at `base`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Http`] if the HTTP client cannot be built.
    pub fn new(base: Url, timeout: Duration) -> Result<Self, LedgerError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base))
    }

    /// Creates a client reusing an existing `reqwest` client.
    #[must_use]
    pub fn with_client(http: Client, mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { http, base }
    }

    /// Returns the node base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, LedgerError> {
        self.base
            .join(path)
            .map_err(|e| LedgerError::Rpc(format!("invalid RPC path {path}: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, LedgerError> {
        let response = self.http.get(self.url(path)?).send().await?;
        decode(path, response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, LedgerError> {
        let response = self.http.post(self.url(path)?).json(body).send().await?;
        decode(path, response).await
    }

    /// Spendable balance of `address`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the node call fails.
    pub async fn balance(&self, address: &TezosAddress) -> Result<Mutez, LedgerError> {
        self.get(&format!(
            "chains/main/blocks/head/context/contracts/{address}/balance"
        ))
        .await
    }

    /// Current counter of an implicit account.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the node call fails.
    pub async fn counter(&self, address: &TezosAddress) -> Result<u64, LedgerError> {
        let counter: StringU64 = self
            .get(&format!(
                "chains/main/blocks/head/context/contracts/{address}/counter"
            ))
            .await?;
        Ok(counter.0)
    }

    /// Revealed public key of an implicit account, `None` if not revealed yet.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the node call fails.
    pub async fn manager_key(&self, address: &TezosAddress) -> Result<Option<String>, LedgerError> {
        self.get(&format!(
            "chains/main/blocks/head/context/contracts/{address}/manager_key"
        ))
        .await
    }

    /// Header of the current head block.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the node call fails.
    pub async fn head_header(&self) -> Result<BlockHeader, LedgerError> {
        self.get("chains/main/blocks/head/header").await
    }

    /// Forges `contents` on top of `branch`, returning the unsigned bytes as hex.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the node refuses to forge.
    pub async fn forge_operations(
        &self,
        branch: &str,
        contents: &[ManagerOperation],
    ) -> Result<String, LedgerError> {
        self.post(
            "chains/main/blocks/head/helpers/forge/operations",
            &ForgeRequest { branch, contents },
        )
        .await
    }

    /// Injects a signed operation, returning its hash.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Rejected`] if the node refuses the operation.
    pub async fn inject_operation(&self, signed_hex: &str) -> Result<String, LedgerError> {
        self.post::<str, String>("injection/operation?chain=main", signed_hex)
            .await
            .map_err(|e| match e {
                LedgerError::Rpc(msg) => LedgerError::Rejected(msg),
                other => other,
            })
    }

    /// Manager operations included in the block at `level`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the node call fails.
    pub async fn manager_operations(&self, level: u64) -> Result<Vec<BlockOperation>, LedgerError> {
        self.get(&format!(
            "chains/main/blocks/{level}/operations/{MANAGER_OPERATIONS_PASS}"
        ))
        .await
    }
}

async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, LedgerError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LedgerError::Rpc(format!("{path}: {status}: {body}")));
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| LedgerError::Decode(format!("{path}: {e}")))
}
