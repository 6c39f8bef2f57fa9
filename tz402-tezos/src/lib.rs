#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Tezos chain support for the 402 payment flow.
//!
//! The payment flow depends only on the [`LedgerClient`] and [`BalanceOracle`]
//! traits. This crate defines them and provides [`RpcLedger`], an
//! implementation that talks to a Tezos node over its JSON RPC and delegates
//! signing to a remote signer, so no secret key ever lives in this process.
//!
//! # Architecture
//!
//! - [`ledger`] - Collaborator traits, transfer operations and [`LedgerError`]
//! - [`rpc`] - Node RPC client (balances, counters, forge, inject, block operations)
//! - [`signer`] - Remote signer client and signature decoding
//! - [`wallet`] - [`RpcLedger`], the wallet capability bound to one identity
//! - [`michelson`] - Entrypoint parameters for FA2 transfers and swaps
//! - [`config`] - Fee limits and confirmation policy
//!
//! # Feature Flags
//!
//! - `telemetry` - `tracing` spans and events on node round-trips
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tz402_tezos::{LedgerClient, RemoteSigner, RpcLedger, TezosRpc, TransferOperation};
//!
//! let address = "tz1...".parse()?;
//! let rpc = TezosRpc::new("https://rpc.ghostnet.teztnets.com".parse()?, Duration::from_secs(30))?;
//! let signer = RemoteSigner::new(&"http://localhost:6732".parse()?, &address, Duration::from_secs(30))?;
//! let ledger = RpcLedger::new(rpc, Arc::new(signer), address);
//!
//! let op = TransferOperation::native("tz1...".parse()?, 100_000.into());
//! let confirmed = ledger.transfer_and_confirm(op, 3).await?;
//! ```

pub mod config;
pub mod ledger;
pub mod michelson;
pub mod rpc;
pub mod signer;
pub mod wallet;

pub use config::{ConfirmationPolicy, FeeConfig, OperationLimits};
pub use ledger::{
    BalanceOracle, ContractCall, LedgerClient, LedgerError, OperationHash, SubmittedTransfer,
    TransferOperation,
};
pub use rpc::TezosRpc;
pub use signer::{OperationSigner, RemoteSigner};
pub use wallet::RpcLedger;
