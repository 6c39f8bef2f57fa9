//! Record of a native-currency transfer that reached its confirmation depth.

use serde::{Deserialize, Serialize};

use crate::address::TezosAddress;
use crate::amount::Mutez;

/// A transfer that has been included on chain and confirmed to the depth the
/// caller asked for.
///
/// Ledger implementations create this value only once the confirmation wait
/// has succeeded; a [`PaymentProof`](crate::proto::PaymentProof) can only be
/// built from one, so no proof ever refers to an unconfirmed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedTransfer {
    op_hash: String,
    from: TezosAddress,
    to: TezosAddress,
    amount: Mutez,
    included_level: u64,
    confirmations: u32,
}

impl ConfirmedTransfer {
    /// Records a confirmed transfer.
    ///
    /// Meant for ledger implementations, after observing `confirmations`
    /// blocks on top of (and including) the block at `included_level`.
    #[must_use]
    pub fn new(
        op_hash: String,
        from: TezosAddress,
        to: TezosAddress,
        amount: Mutez,
        included_level: u64,
        confirmations: u32,
    ) -> Self {
        Self {
            op_hash,
            from,
            to,
            amount,
            included_level,
            confirmations,
        }
    }

    /// On-chain operation hash (`oo…`).
    #[must_use]
    pub fn op_hash(&self) -> &str {
        &self.op_hash
    }

    /// Paying account.
    #[must_use]
    pub const fn from(&self) -> &TezosAddress {
        &self.from
    }

    /// Receiving account.
    #[must_use]
    pub const fn to(&self) -> &TezosAddress {
        &self.to
    }

    /// Transferred amount.
    #[must_use]
    pub const fn amount(&self) -> Mutez {
        self.amount
    }

    /// Level of the block that included the operation.
    #[must_use]
    pub const fn included_level(&self) -> u64 {
        self.included_level
    }

    /// Number of blocks observed, the including block counted as the first.
    #[must_use]
    pub const fn confirmations(&self) -> u32 {
        self.confirmations
    }
}
