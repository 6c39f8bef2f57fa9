//! Wallet, contract and payment tools.
//!
//! All tools share one [`ToolContext`]: the ledger bound to the server's
//! identity, the network it lives on, and the contracts it may call.

mod contracts;
mod fetch;
mod wallet;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tz402::networks::network_by_name;
use tz402::{ConfirmedTransfer, Mutez, TezosAddress, Xtz};
use tz402_http::PaymentRetryFlow;
use tz402_tezos::LedgerClient;

use crate::capability::ToolRegistry;
use crate::error::ValidationError;

pub use contracts::{
    SwapReceipt, SwapXtzForTokens, TokenTransferReceipt, TransferToken, TransferTokenParams,
};
pub use fetch::FetchWithPayment;
pub use wallet::{BalanceReport, GetBalance, GetWalletInfo, SendXtz, SendXtzParams, WalletInfo};

/// An FA2 token contract the server may transfer from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenContract {
    /// Contract address.
    pub address: TezosAddress,
    /// Token id within the contract.
    #[serde(default)]
    pub token_id: u64,
}

/// A fixed-rate swap contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapContract {
    /// Contract address.
    pub address: TezosAddress,
    /// Token units paid per mutez sent.
    pub rate: u64,
}

/// State shared by every tool.
#[derive(Clone)]
pub struct ToolContext {
    /// Wallet bound to the server's identity.
    pub ledger: Arc<dyn LedgerClient>,
    /// Network name, used for display and explorer links.
    pub network: String,
    /// Confirmation depth awaited by transfers.
    pub confirmations: u32,
    /// Token contract for `transfer_token`.
    pub token: Option<TokenContract>,
    /// Swap contract for `swap_xtz_for_tokens`.
    pub swap: Option<SwapContract>,
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("address", self.ledger.address())
            .field("network", &self.network)
            .field("confirmations", &self.confirmations)
            .field("token", &self.token)
            .field("swap", &self.swap)
            .finish()
    }
}

impl ToolContext {
    fn explorer_url(&self, op_hash: &str) -> Option<String> {
        network_by_name(&self.network).map(|n| n.explorer_operation_url(op_hash))
    }

    fn receipt(&self, transfer: &ConfirmedTransfer) -> TransferReceipt {
        TransferReceipt {
            op_hash: transfer.op_hash().to_owned(),
            from: transfer.from().clone(),
            to: transfer.to().clone(),
            amount: transfer.amount(),
            amount_xtz: transfer.amount().to_xtz(),
            included_level: transfer.included_level(),
            confirmations: transfer.confirmations(),
            explorer_url: self.explorer_url(transfer.op_hash()),
        }
    }
}

/// A confirmed operation as reported to the agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    /// Operation hash.
    pub op_hash: String,
    /// Sender.
    pub from: TezosAddress,
    /// Receiving account or contract.
    pub to: TezosAddress,
    /// XTZ sent, in mutez.
    pub amount: Mutez,
    /// XTZ sent.
    pub amount_xtz: Xtz,
    /// Level of the including block.
    pub included_level: u64,
    /// Confirmations observed.
    pub confirmations: u32,
    /// Block explorer link, for known networks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
}

/// Builds the registry with every tool, in the order `tools/list` reports them.
#[must_use]
pub fn registry(context: Arc<ToolContext>, flow: Arc<PaymentRetryFlow>) -> ToolRegistry {
    ToolRegistry::new()
        .register(GetWalletInfo::new(Arc::clone(&context)))
        .register(GetBalance::new(Arc::clone(&context)))
        .register(SendXtz::new(Arc::clone(&context)))
        .register(TransferToken::new(Arc::clone(&context)))
        .register(SwapXtzForTokens::new(context))
        .register(FetchWithPayment::new(flow))
}

fn required<'a>(arguments: &'a Map<String, Value>, field: &str) -> Result<&'a Value, ValidationError> {
    match arguments.get(field) {
        None | Some(Value::Null) => Err(ValidationError::Missing(field.to_owned())),
        Some(value) => Ok(value),
    }
}

fn required_address(arguments: &Map<String, Value>, field: &str) -> Result<TezosAddress, ValidationError> {
    let value = required(arguments, field)?;
    let text = value
        .as_str()
        .ok_or_else(|| ValidationError::invalid(field, "expected a string"))?;
    text.parse()
        .map_err(|_| ValidationError::invalid(field, format!("{text} is not a Tezos address")))
}

/// A positive XTZ amount, converted to mutez.
fn required_xtz(arguments: &Map<String, Value>, field: &str) -> Result<Mutez, ValidationError> {
    let value = required(arguments, field)?;
    let xtz: Xtz = serde_json::from_value(value.clone())
        .map_err(|_| ValidationError::invalid(field, "expected a decimal amount of XTZ"))?;
    let mutez = xtz
        .to_mutez()
        .map_err(|e| ValidationError::invalid(field, e))?;
    if mutez == Mutez::ZERO {
        return Err(ValidationError::invalid(field, "must be at least 0.000001 XTZ"));
    }
    Ok(mutez)
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tz402::{ConfirmedTransfer, Mutez, TezosAddress};
    use tz402_tezos::{
        BalanceOracle, LedgerClient, LedgerError, SubmittedTransfer, TransferOperation,
    };

    pub(crate) const OWNER: &str = "tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb";

    /// In-memory ledger recording submitted operations.
    pub(crate) struct FakeLedger {
        pub address: TezosAddress,
        pub balance: Mutez,
        pub submitted: Mutex<Vec<TransferOperation>>,
        pub fail_with_timeout: bool,
    }

    impl FakeLedger {
        pub(crate) fn new(balance: u64) -> Self {
            Self {
                address: OWNER.parse().unwrap(),
                balance: Mutez::new(balance),
                submitted: Mutex::new(Vec::new()),
                fail_with_timeout: false,
            }
        }

        pub(crate) fn submitted(&self) -> Vec<TransferOperation> {
            self.submitted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BalanceOracle for FakeLedger {
        async fn balance(&self, _address: &TezosAddress) -> Result<Mutez, LedgerError> {
            Ok(self.balance)
        }
    }

    #[async_trait]
    impl LedgerClient for FakeLedger {
        fn address(&self) -> &TezosAddress {
            &self.address
        }

        async fn submit(
            &self,
            operation: TransferOperation,
        ) -> Result<SubmittedTransfer, LedgerError> {
            self.submitted.lock().unwrap().push(operation.clone());
            Ok(SubmittedTransfer {
                op_hash: "ooFakeOperation".to_owned(),
                operation,
                branch_level: 100,
            })
        }

        async fn confirm(
            &self,
            submitted: &SubmittedTransfer,
            depth: u32,
        ) -> Result<ConfirmedTransfer, LedgerError> {
            if self.fail_with_timeout {
                return Err(LedgerError::ConfirmationTimeout {
                    op_hash: submitted.op_hash.clone(),
                    reason: "not included within 30 blocks".to_owned(),
                });
            }
            Ok(ConfirmedTransfer::new(
                submitted.op_hash.clone(),
                self.address.clone(),
                submitted.operation.destination.clone(),
                submitted.operation.amount,
                101,
                depth,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_required_xtz_converts_and_rejects() {
        assert_eq!(
            required_xtz(&args(json!({"amount": "0.5"})), "amount").unwrap(),
            Mutez::new(500_000)
        );
        assert_eq!(
            required_xtz(&args(json!({"amount": 2})), "amount").unwrap(),
            Mutez::new(2_000_000)
        );
        assert!(matches!(
            required_xtz(&args(json!({})), "amount"),
            Err(ValidationError::Missing(_))
        ));
        assert!(required_xtz(&args(json!({"amount": "0"})), "amount").is_err());
        assert!(required_xtz(&args(json!({"amount": "-1"})), "amount").is_err());
        assert!(required_xtz(&args(json!({"amount": "lots"})), "amount").is_err());
    }

    #[test]
    fn test_required_address_shape() {
        assert!(required_address(&args(json!({"to": fake::OWNER})), "to").is_ok());
        let err = required_address(&args(json!({"to": "0xdeadbeef"})), "to").unwrap_err();
        assert_eq!(err.kind(), "InvalidArguments");
        assert!(matches!(
            required_address(&args(json!({"to": null})), "to"),
            Err(ValidationError::Missing(_))
        ));
    }
}
