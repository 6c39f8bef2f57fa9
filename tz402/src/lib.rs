#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the HTTP 402 payment flow on Tezos.
//!
//! When a client requests a paid resource, the server responds with
//! `402 Payment Required` and a list of payment requirements. The client pays
//! in the chain's native currency, waits for the transfer to be confirmed, and
//! retries the request with a proof of payment.
//!
//! This crate holds the chain-agnostic wire types and the Tezos value types
//! they are expressed in. It performs no I/O.
//!
//! # Modules
//!
//! - [`address`] - Tezos address shape validation
//! - [`amount`] - Mutez / XTZ amounts and conversion
//! - [`encoding`] - Base64 wrapper for header payloads
//! - [`networks`] - Known Tezos networks and network identifier matching
//! - [`proto`] - Payment requirement, 402 body and payment proof
//! - [`timestamp`] - Unix timestamps for requirement expiry
//! - [`transfer`] - Confirmed transfer record

pub mod address;
pub mod amount;
pub mod encoding;
pub mod networks;
pub mod proto;
pub mod timestamp;
pub mod transfer;

pub use address::TezosAddress;
pub use amount::{Mutez, Xtz};
pub use proto::{PaymentProof, PaymentRequiredBody, PaymentRequirement};
pub use transfer::ConfirmedTransfer;
