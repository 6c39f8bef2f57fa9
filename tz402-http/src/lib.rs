#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP transport for the 402 payment flow on Tezos.
//!
//! Provides header constants, proof and counter-proof header encoding, and the
//! [`PaymentRetryFlow`](client::PaymentRetryFlow) that turns a `402 Payment
//! Required` answer into an on-chain payment and a retried request.
//!
//! # Modules
//!
//! - [`constants`] - HTTP header names, status code and flow defaults
//! - [`headers`] - Base64 JSON encoding/decoding of payment headers
//! - [`error`] - Header errors and the flow's [`FlowError`](error::FlowError)
//! - [`client`] - The fetch-pay-retry flow
//!
//! # Feature Flags
//!
//! - `telemetry` - `tracing` spans and state transition events

pub mod client;
pub mod constants;
pub mod error;
pub mod headers;

pub use client::{FetchOutcome, FetchRequest, FlowConfig, PaymentRetryFlow};
pub use error::FlowError;
