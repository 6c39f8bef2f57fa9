#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Model Context Protocol tool server for a Tezos wallet.
//!
//! Exposes balance queries, XTZ and token transfers, a fixed-rate swap and
//! the 402 fetch-pay-retry flow as tools an agent can call over JSON-RPC on
//! stdio.
//!
//! # Architecture
//!
//! Every tool implements [`Capability`](capability::Capability): a `validate`
//! step turning raw arguments into typed parameters, and an `execute` step.
//! The [`ToolRegistry`](capability::ToolRegistry) turns both kinds of failure
//! into `isError` results with a `{kind, message}` payload, so no tool repeats
//! that shaping. [`McpServer`](server::McpServer) is an `rmcp` server
//! handler that answers `tools/list` and `tools/call` from the registry.
//!
//! # Modules
//!
//! - [`capability`] - The tool interface and registry
//! - [`tools`] - Wallet, contract and payment tools
//! - [`server`] - `rmcp` server handler and stdio transport
//! - [`config`] - TOML configuration with environment expansion
//! - [`types`] - MCP message types
//! - [`error`] - Validation, execution and configuration errors

pub mod capability;
pub mod config;
pub mod error;
pub mod server;
pub mod tools;
pub mod types;

pub use capability::{Capability, ToolRegistry};
pub use config::ServerConfig;
pub use server::McpServer;
pub use tools::ToolContext;
