//! Ledger collaborator traits.
//!
//! The payment flow never talks to a node directly. It is handed a
//! [`LedgerClient`] bound to one identity and asks it to move funds and to
//! report balances. [`RpcLedger`](crate::wallet::RpcLedger) is the production
//! implementation; tests substitute in-memory fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tz402::address::InvalidAddress;
use tz402::{ConfirmedTransfer, Mutez, TezosAddress};

/// Errors raised by ledger operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LedgerError {
    /// The node answered with an error status.
    #[error("node RPC error: {0}")]
    Rpc(String),

    /// The node could not be reached.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote signer refused or failed to sign.
    #[error("signer error: {0}")]
    Signer(String),

    /// The operation was refused at injection or failed when applied.
    #[error("operation rejected: {0}")]
    Rejected(String),

    /// The operation did not reach the confirmation depth in time.
    #[error("operation {op_hash} not confirmed: {reason}")]
    ConfirmationTimeout {
        /// Hash of the injected operation.
        op_hash: String,
        /// What ran out (blocks or wall-clock time).
        reason: String,
    },

    /// An address failed shape validation.
    #[error(transparent)]
    InvalidAddress(#[from] InvalidAddress),

    /// A response could not be interpreted.
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// A Tezos operation hash (`oo…`).
pub type OperationHash = String;

/// Entrypoint call attached to a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractCall {
    /// Entrypoint name, e.g. `"transfer"`.
    pub entrypoint: String,
    /// Argument in Micheline JSON.
    pub value: serde_json::Value,
}

/// A transaction to submit from the ledger's own identity.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferOperation {
    /// Receiving account or contract.
    pub destination: TezosAddress,
    /// Native currency sent along.
    pub amount: Mutez,
    /// Entrypoint call, for contract invocations.
    pub parameters: Option<ContractCall>,
}

impl TransferOperation {
    /// A plain native-currency transfer.
    #[must_use]
    pub const fn native(destination: TezosAddress, amount: Mutez) -> Self {
        Self {
            destination,
            amount,
            parameters: None,
        }
    }

    /// A contract entrypoint call, optionally sending native currency.
    #[must_use]
    pub const fn call(destination: TezosAddress, amount: Mutez, call: ContractCall) -> Self {
        Self {
            destination,
            amount,
            parameters: Some(call),
        }
    }
}

/// An operation accepted by the node but not yet confirmed.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedTransfer {
    /// Operation hash returned by injection.
    pub op_hash: OperationHash,
    /// The submitted operation.
    pub operation: TransferOperation,
    /// Head level at submission; inclusion can only happen above it.
    pub branch_level: u64,
}

/// Source of spendable balances.
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    /// Returns the current spendable balance of `address`.
    async fn balance(&self, address: &TezosAddress) -> Result<Mutez, LedgerError>;
}

/// A wallet capability bound to a single identity.
#[async_trait]
pub trait LedgerClient: BalanceOracle {
    /// Address of the identity this client pays from.
    fn address(&self) -> &TezosAddress;

    /// Signs and injects `operation`, returning once the node accepted it.
    async fn submit(&self, operation: TransferOperation) -> Result<SubmittedTransfer, LedgerError>;

    /// Waits until `submitted` is included and `depth` blocks are observed,
    /// counting the including block as the first.
    async fn confirm(
        &self,
        submitted: &SubmittedTransfer,
        depth: u32,
    ) -> Result<ConfirmedTransfer, LedgerError>;

    /// Submits `operation` and waits for `depth` confirmations.
    async fn transfer_and_confirm(
        &self,
        operation: TransferOperation,
        depth: u32,
    ) -> Result<ConfirmedTransfer, LedgerError> {
        let submitted = self.submit(operation).await?;
        self.confirm(&submitted, depth).await
    }

    /// Balance of this client's own identity.
    async fn own_balance(&self) -> Result<Mutez, LedgerError> {
        let address = self.address().clone();
        self.balance(&address).await
    }
}
