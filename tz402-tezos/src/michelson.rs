//! Micheline parameters for the contract entrypoints the tools call.

use serde_json::{Value, json};
use tz402::TezosAddress;

use crate::ledger::ContractCall;

/// FA2 `transfer` entrypoint name.
pub const FA2_TRANSFER: &str = "transfer";

/// Fixed-rate swap entrypoint name.
pub const SWAP: &str = "swap";

fn pair(left: Value, right: Value) -> Value {
    json!({ "prim": "Pair", "args": [left, right] })
}

fn string(value: &str) -> Value {
    json!({ "string": value })
}

fn int(value: u128) -> Value {
    json!({ "int": value.to_string() })
}

/// Single-transfer FA2 batch: `from` sends `amount` of `token_id` to `to`.
///
/// Encodes `list (pair address (list (pair address (pair nat nat))))`.
#[must_use]
pub fn fa2_transfer(from: &TezosAddress, to: &TezosAddress, token_id: u64, amount: u128) -> ContractCall {
    let tx = pair(string(to.as_str()), pair(int(token_id.into()), int(amount)));
    ContractCall {
        entrypoint: FA2_TRANSFER.to_owned(),
        value: json!([pair(string(from.as_str()), json!([tx]))]),
    }
}

/// Call to the swap entrypoint; the exchanged XTZ travels as the transaction amount.
#[must_use]
pub fn swap() -> ContractCall {
    ContractCall {
        entrypoint: SWAP.to_owned(),
        value: json!({ "prim": "Unit" }),
    }
}
