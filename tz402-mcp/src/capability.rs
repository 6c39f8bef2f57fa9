//! The generic tool interface and the registry that dispatches to it.
//!
//! Every tool is a [`Capability`]: it turns raw JSON arguments into typed
//! parameters (`validate`), then runs with them (`execute`). The
//! [`ToolRegistry`] handles the shared parts: listing, lookup, and shaping
//! both kinds of failure into `isError` results.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{ExecutionError, ValidationError};
use crate::types::{CallToolParams, CallToolResult, ToolDefinition};

/// One tool operation.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Typed, validated arguments.
    type Params: Send;
    /// Result returned to the agent.
    type Output: Serialize + Send;

    /// Name, description and argument schema.
    fn definition(&self) -> ToolDefinition;

    /// Checks the raw arguments and converts them to [`Self::Params`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for missing or malformed arguments.
    fn validate(&self, arguments: &Map<String, Value>) -> Result<Self::Params, ValidationError>;

    /// Runs the operation.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError`] if the operation fails.
    async fn execute(&self, params: Self::Params) -> Result<Self::Output, ExecutionError>;
}

/// Deserializes tool arguments into `T`.
///
/// # Errors
///
/// Returns [`ValidationError::Invalid`] naming the serde error.
pub fn parse_arguments<T: DeserializeOwned>(
    arguments: &Map<String, Value>,
) -> Result<T, ValidationError> {
    serde_json::from_value(Value::Object(arguments.clone()))
        .map_err(|e| ValidationError::invalid("arguments", e))
}

#[async_trait]
trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn call(&self, arguments: &Map<String, Value>) -> CallToolResult;
}

#[async_trait]
impl<C: Capability> Tool for C {
    fn definition(&self) -> ToolDefinition {
        Capability::definition(self)
    }

    async fn call(&self, arguments: &Map<String, Value>) -> CallToolResult {
        let params = match self.validate(arguments) {
            Ok(params) => params,
            Err(err) => {
                debug!(error = %err, "tool arguments rejected");
                return CallToolResult::error(err.report());
            }
        };
        match self.execute(params).await {
            Ok(output) => match serde_json::to_value(output) {
                Ok(value) => CallToolResult::success(value),
                Err(err) => CallToolResult::error(serde_json::json!({
                    "kind": "SerializationError",
                    "message": err.to_string(),
                })),
            },
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "tool execution failed");
                CallToolResult::error(err.report())
            }
        }
    }
}

/// Ordered set of tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool. A later tool with the same name replaces the earlier one.
    #[must_use]
    pub fn register<C: Capability + 'static>(mut self, capability: C) -> Self {
        let name = Capability::definition(&capability).name;
        self.tools.retain(|tool| tool.definition().name != name);
        self.tools.push(Box::new(capability));
        self
    }

    /// Tool names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.definition().name).collect()
    }

    /// Definitions of all tools, in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Dispatches a call. Unknown tools, invalid arguments and execution
    /// failures all come back as `isError` results.
    pub async fn call(&self, params: CallToolParams) -> CallToolResult {
        let Some(tool) = self
            .tools
            .iter()
            .find(|tool| tool.definition().name == params.name)
        else {
            return CallToolResult::error(ValidationError::UnknownTool(params.name).report());
        };
        debug!(tool = %params.name, "calling tool");
        tool.call(&params.arguments).await
    }
}
