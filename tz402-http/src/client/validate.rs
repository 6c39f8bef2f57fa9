//! The ordered validation gate between a parsed requirement and a payment.
//!
//! Checks run in a fixed order and stop at the first failure, so each error
//! can assume every earlier check passed:
//!
//! 1. network is Tezos
//! 2. automatic payment is enabled (otherwise: manual-pay instruction)
//! 3. amount within the caller's limit
//! 4. asset is XTZ
//! 5. requirement not expired
//! 6. recipient is a Tezos address
//! 7. balance covers amount plus fee reserve
//!
//! Checks 1 to 6 are pure; only the last one touches the chain.

use tz402::timestamp::UnixTimestamp;
use tz402::{Mutez, PaymentRequirement, TezosAddress, Xtz};
use tz402_tezos::BalanceOracle;

use crate::error::FlowError;

/// Caller-side inputs to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateLimits {
    /// Whether the flow may pay on its own.
    pub auto_retry: bool,
    /// Largest acceptable amount, as given by the caller. Converted to mutez
    /// only when the limit check runs.
    pub max_payment: Xtz,
    /// Mutez kept aside for fees.
    pub fee_reserve: Mutez,
    /// Time of the check.
    pub now: UnixTimestamp,
}

/// A requirement that passed the pure checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedPayment {
    /// Validated recipient.
    pub recipient: TezosAddress,
    /// Amount to send.
    pub amount: Mutez,
}

/// Outcome of the pure checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Automatic payment is off; hand the requirement back to the caller.
    Manual,
    /// Pay, subject to the balance check.
    Pay(ApprovedPayment),
}

/// Runs checks 1 to 6.
///
/// # Errors
///
/// Returns the [`FlowError`] of the first failing check.
pub fn check_requirement(
    requirement: &PaymentRequirement,
    limits: &GateLimits,
) -> Result<Decision, FlowError> {
    let reject = || Box::new(requirement.clone());

    if !requirement.is_supported_network() {
        return Err(FlowError::UnsupportedNetwork {
            requirement: reject(),
        });
    }
    if !limits.auto_retry {
        return Ok(Decision::Manual);
    }
    let limit = limits
        .max_payment
        .to_mutez()
        .map_err(FlowError::InvalidPaymentLimit)?;
    let amount = requirement.max_amount_required;
    if amount > limit {
        return Err(FlowError::PaymentLimitExceeded {
            required: amount,
            limit,
            requirement: reject(),
        });
    }
    if !requirement.is_native_asset() {
        return Err(FlowError::UnsupportedAsset {
            requirement: reject(),
        });
    }
    if let Some(expiry) = requirement.expiry.filter(|_| requirement.is_expired(limits.now)) {
        return Err(FlowError::PaymentExpired {
            expiry,
            now: limits.now,
            requirement: reject(),
        });
    }
    let recipient: TezosAddress =
        requirement
            .pay_to
            .parse()
            .map_err(|_| FlowError::InvalidAddress {
                requirement: reject(),
            })?;

    Ok(Decision::Pay(ApprovedPayment { recipient, amount }))
}

/// Runs check 7 against `payer`'s balance.
///
/// # Errors
///
/// Returns [`FlowError::InsufficientBalance`] if the balance is short, or
/// [`FlowError::BalanceCheckFailed`] if it cannot be read.
pub async fn check_balance<O: BalanceOracle + ?Sized>(
    oracle: &O,
    payer: &TezosAddress,
    payment: &ApprovedPayment,
    fee_reserve: Mutez,
    requirement: &PaymentRequirement,
) -> Result<Mutez, FlowError> {
    let balance = oracle
        .balance(payer)
        .await
        .map_err(|cause| FlowError::BalanceCheckFailed {
            cause,
            requirement: Box::new(requirement.clone()),
        })?;
    let needed = payment.amount.saturating_add(fee_reserve);
    if balance < needed {
        return Err(FlowError::InsufficientBalance {
            balance,
            needed,
            requirement: Box::new(requirement.clone()),
        });
    }
    Ok(balance)
}
