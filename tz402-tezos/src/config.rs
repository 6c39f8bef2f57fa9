//! Fee and confirmation settings for [`RpcLedger`](crate::wallet::RpcLedger).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tz402::Mutez;

/// Fee and limits applied to one kind of manager operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationLimits {
    /// Baker fee.
    pub fee: Mutez,
    /// Gas limit.
    pub gas_limit: u64,
    /// Storage limit in bytes.
    pub storage_limit: u64,
}

impl OperationLimits {
    /// Creates limits from raw values.
    #[must_use]
    pub const fn new(fee: u64, gas_limit: u64, storage_limit: u64) -> Self {
        Self {
            fee: Mutez::new(fee),
            gas_limit,
            storage_limit,
        }
    }
}

/// Fees used when building operations.
///
/// Values are fixed rather than simulated. They cover a plain transfer to an
/// implicit account, and typical FA2 or swap entrypoint calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    /// Plain native transfers.
    pub transfer: OperationLimits,
    /// Contract entrypoint calls.
    pub contract_call: OperationLimits,
    /// Public key reveal, prepended on first use of an account.
    pub reveal: OperationLimits,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            transfer: OperationLimits::new(2_000, 10_000, 350),
            contract_call: OperationLimits::new(10_000, 60_000, 1_000),
            reveal: OperationLimits::new(1_000, 1_000, 0),
        }
    }
}

/// How inclusion and confirmations are awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationPolicy {
    /// Delay between head polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Blocks after submission within which the operation must be included.
    pub max_wait_blocks: u64,
    /// Upper bound on the whole wait, in seconds.
    pub timeout_secs: u64,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            max_wait_blocks: 30,
            timeout_secs: 600,
        }
    }
}

impl ConfirmationPolicy {
    /// Delay between head polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Upper bound on the whole wait.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
