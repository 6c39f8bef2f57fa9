//! MCP server built on the official Rust SDK ([`rmcp`]).
//!
//! `rmcp` owns the JSON-RPC framing, the `initialize` handshake and the
//! protocol-level errors. This module maps `tools/list` and `tools/call` onto
//! a [`ToolRegistry`] and converts between the registry's types and `rmcp`'s.
//!
//! `rmcp` dispatches requests concurrently; tool calls are serialized behind
//! a lock so two calls never pay from the wallet at the same time.

use std::sync::Arc;

use rmcp::model as mcp;
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler, ServiceExt};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::capability::ToolRegistry;
use crate::types::{CallToolParams, CallToolResult, ToolDefinition};

const INSTRUCTIONS: &str = "Tezos wallet tools. Amounts are in XTZ unless a field says mutez. \
     fetch_with_payment pays 402 Payment Required responses up to maxPaymentAllowed.";

/// Converts tool definitions to an `rmcp` `tools/list` result.
///
/// # Errors
///
/// Returns an error if a definition does not fit `rmcp`'s tool shape, such as
/// an input schema that is not a JSON object.
pub fn tools_to_rmcp(tools: &[ToolDefinition]) -> Result<mcp::ListToolsResult, serde_json::Error> {
    serde_json::from_value(json!({ "tools": tools }))
}

/// Converts a registry result to `rmcp`'s [`CallToolResult`](mcp::CallToolResult).
///
/// # Errors
///
/// Returns an error if the result cannot be represented by `rmcp`.
pub fn result_to_rmcp(result: &CallToolResult) -> Result<mcp::CallToolResult, serde_json::Error> {
    serde_json::to_value(result).and_then(serde_json::from_value)
}

impl From<mcp::CallToolRequestParams> for CallToolParams {
    fn from(params: mcp::CallToolRequestParams) -> Self {
        Self {
            name: params.name.into_owned(),
            arguments: params.arguments.unwrap_or_default(),
            meta: params.meta.map(|m| m.0),
        }
    }
}

/// MCP server dispatching tool calls to a [`ToolRegistry`].
#[derive(Debug, Clone)]
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    calls: Arc<Mutex<()>>,
    name: String,
    version: String,
}

impl McpServer {
    /// Creates a server for `registry`, reporting this crate's name and version.
    #[must_use]
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            calls: Arc::new(Mutex::new(())),
            name: env!("CARGO_PKG_NAME").to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    /// Overrides the name and version reported by `initialize`.
    #[must_use]
    pub fn with_identity(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.name = name.into();
        self.version = version.into();
        self
    }

    /// Serves on the process's stdin and stdout until the client disconnects.
    ///
    /// # Errors
    ///
    /// Returns an error if the `initialize` handshake fails or the service
    /// task aborts.
    pub async fn run_stdio(self) -> Result<(), Box<dyn std::error::Error>> {
        let service = self.serve(rmcp::transport::stdio()).await?;
        let reason = service.waiting().await?;
        info!(?reason, "client disconnected");
        Ok(())
    }
}

fn internal(context: &str, error: &serde_json::Error) -> ErrorData {
    ErrorData::internal_error(format!("{context}: {error}"), None)
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> mcp::ServerInfo {
        let mut info = mcp::ServerInfo::default();
        info.capabilities = mcp::ServerCapabilities::builder().enable_tools().build();
        info.server_info.name.clone_from(&self.name);
        info.server_info.version.clone_from(&self.version);
        info.instructions = Some(INSTRUCTIONS.to_owned());
        info
    }

    async fn list_tools(
        &self,
        _request: Option<mcp::PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<mcp::ListToolsResult, ErrorData> {
        tools_to_rmcp(&self.registry.list()).map_err(|e| internal("invalid tool definition", &e))
    }

    async fn call_tool(
        &self,
        request: mcp::CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<mcp::CallToolResult, ErrorData> {
        let params = CallToolParams::from(request);
        let _turn = self.calls.lock().await;
        debug!(tool = %params.name, "tools/call");
        let result = self.registry.call(params).await;
        result_to_rmcp(&result).map_err(|e| internal("unserializable tool result", &e))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use tokio::io::{
        AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
    };

    use super::*;
    use crate::capability::Capability;
    use crate::error::{ExecutionError, ValidationError};

    struct Ping;

    #[async_trait]
    impl Capability for Ping {
        type Params = ();
        type Output = Value;

        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("pong", "Answers pong", json!({"type": "object"}))
        }

        fn validate(&self, _arguments: &Map<String, Value>) -> Result<(), ValidationError> {
            Ok(())
        }

        async fn execute(&self, _params: ()) -> Result<Value, ExecutionError> {
            Ok(json!({"reply": "pong"}))
        }
    }

    fn server() -> McpServer {
        McpServer::new(ToolRegistry::new().register(Ping))
    }

    /// A raw JSON-RPC client on the other end of an in-memory pipe.
    struct Client {
        lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
        writer: WriteHalf<DuplexStream>,
    }

    impl Client {
        async fn send(&mut self, message: Value) {
            let mut line = message.to_string();
            line.push('\n');
            self.writer.write_all(line.as_bytes()).await.unwrap();
            self.writer.flush().await.unwrap();
        }

        async fn recv(&mut self) -> Value {
            let line = tokio::time::timeout(Duration::from_secs(5), self.lines.next_line())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            serde_json::from_str(&line).unwrap()
        }

        async fn request(&mut self, id: u64, method: &str, params: Value) -> Value {
            self.send(json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
                .await;
            let response = self.recv().await;
            assert_eq!(response["id"], id);
            response
        }
    }

    async fn connect(server: McpServer) -> (Client, Value) {
        let (client, transport) = tokio::io::duplex(64 * 1024);
        tokio::spawn(async move {
            if let Ok(running) = server.serve(tokio::io::split(transport)).await {
                let _ = running.waiting().await;
            }
        });
        let (read, writer) = tokio::io::split(client);
        let mut client = Client {
            lines: BufReader::new(read).lines(),
            writer,
        };
        let initialized = client
            .request(
                1,
                "initialize",
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "agent", "version": "1.0.0"}
                }),
            )
            .await;
        client
            .send(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await;
        (client, initialized)
    }

    #[test]
    fn test_definitions_convert_to_rmcp() {
        let listed = tools_to_rmcp(&[Ping.definition()]).unwrap();
        assert_eq!(listed.tools.len(), 1);
        let tool = serde_json::to_value(&listed.tools[0]).unwrap();
        assert_eq!(tool["name"], "pong");
        assert_eq!(tool["description"], "Answers pong");
        assert_eq!(tool["inputSchema"], json!({"type": "object"}));
    }

    #[test]
    fn test_results_convert_to_rmcp() {
        let failed = CallToolResult::error(json!({"kind": "UnknownTool", "message": "nope"}));
        let converted = serde_json::to_value(result_to_rmcp(&failed).unwrap()).unwrap();
        assert_eq!(converted["isError"], true);
        assert_eq!(converted["structuredContent"]["kind"], "UnknownTool");
        assert_eq!(converted["content"][0]["type"], "text");
    }

    #[test]
    fn test_call_params_from_rmcp() {
        let request: mcp::CallToolRequestParams =
            serde_json::from_value(json!({"name": "send_xtz", "arguments": {"amount": "1"}}))
                .unwrap();
        let params = CallToolParams::from(request);
        assert_eq!(params.name, "send_xtz");
        assert_eq!(params.arguments["amount"], "1");

        let bare: mcp::CallToolRequestParams =
            serde_json::from_value(json!({"name": "get_wallet_info"})).unwrap();
        assert!(CallToolParams::from(bare).arguments.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_reports_identity_and_tools() {
        let (_client, initialized) =
            connect(server().with_identity("wallet", "9.9.9")).await;
        let result = &initialized["result"];
        assert_eq!(result["serverInfo"]["name"], "wallet");
        assert_eq!(result["serverInfo"]["version"], "9.9.9");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_tools_list_and_call_over_stdio_framing() {
        let (mut client, _) = connect(server()).await;

        let list = client.request(2, "tools/list", json!({})).await;
        assert_eq!(list["result"]["tools"][0]["name"], "pong");
        assert!(list["result"]["tools"][0]["inputSchema"].is_object());

        let call = client
            .request(3, "tools/call", json!({"name": "pong", "arguments": {}}))
            .await;
        assert_eq!(call["result"]["isError"], false);
        assert_eq!(call["result"]["structuredContent"]["reply"], "pong");

        let unknown = client
            .request(4, "tools/call", json!({"name": "nope", "arguments": {}}))
            .await;
        assert_eq!(unknown["result"]["isError"], true);
        assert_eq!(unknown["result"]["structuredContent"]["kind"], "UnknownTool");
    }

    #[tokio::test]
    async fn test_ping() {
        let (mut client, _) = connect(server()).await;
        let pong = client.request(5, "ping", json!({})).await;
        assert!(pong.get("error").is_none());
    }
}
