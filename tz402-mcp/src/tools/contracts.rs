//! Calls into the configured FA2 token and swap contracts.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tz402::{Mutez, TezosAddress};
use tz402_tezos::{TransferOperation, michelson};
use tracing::info;

use super::{ToolContext, TransferReceipt, required, required_address, required_xtz};
use crate::capability::Capability;
use crate::error::{ExecutionError, ValidationError};
use crate::types::ToolDefinition;

/// Token units, given as a JSON integer or a decimal string.
fn required_token_amount(arguments: &Map<String, Value>, field: &str) -> Result<u128, ValidationError> {
    let value = required(arguments, field)?;
    let amount = match value {
        Value::Number(n) => n.as_u64().map(u128::from),
        Value::String(s) => s.trim().parse::<u128>().ok(),
        _ => None,
    }
    .ok_or_else(|| ValidationError::invalid(field, "expected a non-negative integer"))?;
    if amount == 0 {
        return Err(ValidationError::invalid(field, "must be greater than zero"));
    }
    Ok(amount)
}

/// A confirmed token transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransferReceipt {
    /// Token contract.
    pub contract: TezosAddress,
    /// Token id.
    pub token_id: u64,
    /// Token recipient.
    pub recipient: TezosAddress,
    /// Token units sent.
    pub token_amount: String,
    /// The contract call.
    pub operation: TransferReceipt,
}

/// Validated `transfer_token` arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTokenParams {
    to: TezosAddress,
    amount: u128,
}

/// `transfer_token`: FA2 transfer of the configured token.
#[derive(Debug)]
pub struct TransferToken {
    context: Arc<ToolContext>,
}

impl TransferToken {
    /// Creates the tool.
    #[must_use]
    pub const fn new(context: Arc<ToolContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Capability for TransferToken {
    type Params = TransferTokenParams;
    type Output = TokenTransferReceipt;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "transfer_token",
            "Transfer test tokens (FA2) from the agent's wallet to another address.",
            json!({
                "type": "object",
                "properties": {
                    "to": { "type": "string", "description": "Recipient Tezos address" },
                    "amount": {
                        "type": ["string", "integer"],
                        "description": "Token units to send"
                    }
                },
                "required": ["to", "amount"]
            }),
        )
    }

    fn validate(&self, arguments: &Map<String, Value>) -> Result<TransferTokenParams, ValidationError> {
        Ok(TransferTokenParams {
            to: required_address(arguments, "to")?,
            amount: required_token_amount(arguments, "amount")?,
        })
    }

    async fn execute(&self, params: TransferTokenParams) -> Result<TokenTransferReceipt, ExecutionError> {
        let token = self
            .context
            .token
            .as_ref()
            .ok_or(ExecutionError::NotConfigured("token contract"))?;
        let ledger = &self.context.ledger;
        info!(contract = %token.address, to = %params.to, amount = params.amount, "transferring tokens");

        let call = michelson::fa2_transfer(ledger.address(), &params.to, token.token_id, params.amount);
        let operation = TransferOperation::call(token.address.clone(), Mutez::ZERO, call);
        let confirmed = ledger
            .transfer_and_confirm(operation, self.context.confirmations)
            .await?;

        Ok(TokenTransferReceipt {
            contract: token.address.clone(),
            token_id: token.token_id,
            recipient: params.to,
            token_amount: params.amount.to_string(),
            operation: self.context.receipt(&confirmed),
        })
    }
}

/// A confirmed swap.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapReceipt {
    /// Swap contract.
    pub contract: TezosAddress,
    /// Rate applied, in token units per mutez.
    pub rate: u64,
    /// Token units the contract pays out at that rate.
    pub expected_tokens: String,
    /// The contract call, carrying the XTZ sent.
    pub operation: TransferReceipt,
}

/// `swap_xtz_for_tokens`: send XTZ to the swap contract for tokens.
#[derive(Debug)]
pub struct SwapXtzForTokens {
    context: Arc<ToolContext>,
}

impl SwapXtzForTokens {
    /// Creates the tool.
    #[must_use]
    pub const fn new(context: Arc<ToolContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Capability for SwapXtzForTokens {
    type Params = Mutez;
    type Output = SwapReceipt;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "swap_xtz_for_tokens",
            "Swap XTZ for test tokens at the swap contract's fixed rate.",
            json!({
                "type": "object",
                "properties": {
                    "amount": {
                        "type": ["string", "number"],
                        "description": "XTZ to swap, e.g. \"0.1\""
                    }
                },
                "required": ["amount"]
            }),
        )
    }

    fn validate(&self, arguments: &Map<String, Value>) -> Result<Mutez, ValidationError> {
        required_xtz(arguments, "amount")
    }

    async fn execute(&self, amount: Mutez) -> Result<SwapReceipt, ExecutionError> {
        let swap = self
            .context
            .swap
            .as_ref()
            .ok_or(ExecutionError::NotConfigured("swap contract"))?;
        info!(contract = %swap.address, amount = %amount, "swapping XTZ for tokens");

        let operation = TransferOperation::call(swap.address.clone(), amount, michelson::swap());
        let confirmed = self
            .context
            .ledger
            .transfer_and_confirm(operation, self.context.confirmations)
            .await?;

        let expected = u128::from(amount.as_u64()) * u128::from(swap.rate);
        Ok(SwapReceipt {
            contract: swap.address.clone(),
            rate: swap.rate,
            expected_tokens: expected.to_string(),
            operation: self.context.receipt(&confirmed),
        })
    }
}
