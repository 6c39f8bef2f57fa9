//! The `fetch_with_payment` tool.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tz402_http::{FetchOutcome, FetchRequest, PaymentRetryFlow};

use crate::capability::{Capability, parse_arguments};
use crate::error::{ExecutionError, ValidationError};
use crate::types::ToolDefinition;

/// `fetch_with_payment`: fetch a URL, paying in XTZ if the server asks for it.
#[derive(Debug)]
pub struct FetchWithPayment {
    flow: Arc<PaymentRetryFlow>,
}

impl FetchWithPayment {
    /// Creates the tool.
    #[must_use]
    pub const fn new(flow: Arc<PaymentRetryFlow>) -> Self {
        Self { flow }
    }
}

#[async_trait]
impl Capability for FetchWithPayment {
    type Params = FetchRequest;
    type Output = FetchOutcome;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "fetch_with_payment",
            "Fetch a URL. If the server answers 402 Payment Required, pay the requested XTZ \
             amount, wait for confirmation and retry with proof of payment.",
            json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "Resource URL" },
                    "method": {
                        "type": "string",
                        "enum": ["GET", "POST", "PUT", "DELETE"],
                        "default": "GET"
                    },
                    "headers": {
                        "type": "object",
                        "additionalProperties": { "type": "string" }
                    },
                    "body": { "type": "string" },
                    "maxPaymentAllowed": {
                        "type": ["string", "number"],
                        "description": "Largest payment in XTZ",
                        "default": "1"
                    },
                    "autoRetry": {
                        "type": "boolean",
                        "description": "Pay automatically; when false, return the payment requirement instead",
                        "default": true
                    }
                },
                "required": ["url"]
            }),
        )
    }

    fn validate(&self, arguments: &Map<String, Value>) -> Result<FetchRequest, ValidationError> {
        if !arguments.contains_key("url") {
            return Err(ValidationError::Missing("url".to_owned()));
        }
        let request: FetchRequest = parse_arguments(arguments)?;
        if !matches!(request.url.scheme(), "http" | "https") {
            return Err(ValidationError::invalid("url", "only http and https URLs can be fetched"));
        }
        Ok(request)
    }

    async fn execute(&self, request: FetchRequest) -> Result<FetchOutcome, ExecutionError> {
        Ok(self.flow.fetch_with_payment(&request).await?)
    }
}
