//! Balance queries and plain XTZ transfers.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tz402::{Mutez, TezosAddress, Xtz};
use tz402_tezos::TransferOperation;
use tracing::info;

use super::{ToolContext, TransferReceipt, required_address, required_xtz};
use crate::capability::Capability;
use crate::error::{ExecutionError, ValidationError};
use crate::types::ToolDefinition;

/// Balance of one address.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceReport {
    /// Queried address.
    pub address: TezosAddress,
    /// Balance in mutez.
    pub balance: Mutez,
    /// Balance in XTZ.
    pub balance_xtz: Xtz,
}

/// The server's own wallet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    /// Network the wallet lives on.
    pub network: String,
    /// Address and balance.
    #[serde(flatten)]
    pub balance: BalanceReport,
}

/// `get_wallet_info`: address, network and balance of the server's wallet.
#[derive(Debug)]
pub struct GetWalletInfo {
    context: Arc<ToolContext>,
}

impl GetWalletInfo {
    /// Creates the tool.
    #[must_use]
    pub const fn new(context: Arc<ToolContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Capability for GetWalletInfo {
    type Params = ();
    type Output = WalletInfo;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "get_wallet_info",
            "Get the address, network and XTZ balance of the agent's wallet.",
            json!({ "type": "object", "properties": {} }),
        )
    }

    fn validate(&self, _arguments: &Map<String, Value>) -> Result<(), ValidationError> {
        Ok(())
    }

    async fn execute(&self, _params: ()) -> Result<WalletInfo, ExecutionError> {
        let ledger = &self.context.ledger;
        let balance = ledger.own_balance().await?;
        Ok(WalletInfo {
            network: self.context.network.clone(),
            balance: BalanceReport {
                address: ledger.address().clone(),
                balance,
                balance_xtz: balance.to_xtz(),
            },
        })
    }
}

/// `get_balance`: XTZ balance of any address.
#[derive(Debug)]
pub struct GetBalance {
    context: Arc<ToolContext>,
}

impl GetBalance {
    /// Creates the tool.
    #[must_use]
    pub const fn new(context: Arc<ToolContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Capability for GetBalance {
    type Params = TezosAddress;
    type Output = BalanceReport;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "get_balance",
            "Get the XTZ balance of a Tezos address (tz1, tz2 or KT1).",
            json!({
                "type": "object",
                "properties": {
                    "address": { "type": "string", "description": "Tezos address" }
                },
                "required": ["address"]
            }),
        )
    }

    fn validate(&self, arguments: &Map<String, Value>) -> Result<TezosAddress, ValidationError> {
        required_address(arguments, "address")
    }

    async fn execute(&self, address: TezosAddress) -> Result<BalanceReport, ExecutionError> {
        let balance = self.context.ledger.balance(&address).await?;
        Ok(BalanceReport {
            address,
            balance,
            balance_xtz: balance.to_xtz(),
        })
    }
}

/// Validated `send_xtz` arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendXtzParams {
    to: TezosAddress,
    amount: Mutez,
}

/// `send_xtz`: transfer XTZ and wait for confirmation.
#[derive(Debug)]
pub struct SendXtz {
    context: Arc<ToolContext>,
}

impl SendXtz {
    /// Creates the tool.
    #[must_use]
    pub const fn new(context: Arc<ToolContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Capability for SendXtz {
    type Params = SendXtzParams;
    type Output = TransferReceipt;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "send_xtz",
            "Send XTZ from the agent's wallet and wait for the transfer to be confirmed.",
            json!({
                "type": "object",
                "properties": {
                    "to": { "type": "string", "description": "Recipient Tezos address" },
                    "amount": {
                        "type": ["string", "number"],
                        "description": "Amount in XTZ, e.g. \"0.5\""
                    }
                },
                "required": ["to", "amount"]
            }),
        )
    }

    fn validate(&self, arguments: &Map<String, Value>) -> Result<SendXtzParams, ValidationError> {
        Ok(SendXtzParams {
            to: required_address(arguments, "to")?,
            amount: required_xtz(arguments, "amount")?,
        })
    }

    async fn execute(&self, params: SendXtzParams) -> Result<TransferReceipt, ExecutionError> {
        info!(to = %params.to, amount = %params.amount, "sending XTZ");
        let operation = TransferOperation::native(params.to, params.amount);
        let confirmed = self
            .context
            .ledger
            .transfer_and_confirm(operation, self.context.confirmations)
            .await?;
        Ok(self.context.receipt(&confirmed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fake::{FakeLedger, OWNER};

    const BOB: &str = "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx";

    fn context(ledger: FakeLedger) -> (Arc<FakeLedger>, Arc<ToolContext>) {
        let ledger = Arc::new(ledger);
        let context = ToolContext {
            ledger: ledger.clone(),
            network: "ghostnet".to_owned(),
            confirmations: 3,
            token: None,
            swap: None,
        };
        (ledger, Arc::new(context))
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_wallet_info_reports_own_balance() {
        let (_, ctx) = context(FakeLedger::new(2_500_000));
        let tool = GetWalletInfo::new(ctx);
        let info = tool.execute(()).await.unwrap();
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["address"], OWNER);
        assert_eq!(value["network"], "ghostnet");
        assert_eq!(value["balance"], "2500000");
        assert_eq!(value["balanceXtz"], "2.5");
    }

    #[tokio::test]
    async fn test_get_balance_requires_valid_address() {
        let (_, ctx) = context(FakeLedger::new(1));
        let tool = GetBalance::new(ctx);
        assert!(tool.validate(&args(json!({"address": "tz9nope"}))).is_err());
        let address = tool.validate(&args(json!({"address": BOB}))).unwrap();
        let report = tool.execute(address).await.unwrap();
        assert_eq!(report.balance, Mutez::new(1));
    }

    #[tokio::test]
    async fn test_send_xtz_waits_for_configured_depth() {
        let (ledger, ctx) = context(FakeLedger::new(10_000_000));
        let tool = SendXtz::new(ctx);
        let params = tool
            .validate(&args(json!({"to": BOB, "amount": "1.25"})))
            .unwrap();
        let receipt = tool.execute(params).await.unwrap();

        assert_eq!(receipt.amount, Mutez::new(1_250_000));
        assert_eq!(receipt.confirmations, 3);
        assert_eq!(
            receipt.explorer_url.as_deref(),
            Some("https://ghostnet.tzkt.io/ooFakeOperation")
        );
        let submitted = ledger.submitted();
        assert_eq!(submitted.len(), 1);
        assert!(submitted[0].parameters.is_none());
    }

    #[tokio::test]
    async fn test_send_xtz_timeout_is_reported_with_hash() {
        let mut fake = FakeLedger::new(10_000_000);
        fake.fail_with_timeout = true;
        let (_, ctx) = context(fake);
        let tool = SendXtz::new(ctx);
        let params = tool.validate(&args(json!({"to": BOB, "amount": 1}))).unwrap();
        let err = tool.execute(params).await.unwrap_err();
        assert_eq!(err.kind(), "ConfirmationTimeout");
        assert_eq!(err.report()["context"]["opHash"], "ooFakeOperation");
    }
}
