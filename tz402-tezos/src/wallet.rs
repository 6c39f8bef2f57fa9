//! [`RpcLedger`]: a [`LedgerClient`] backed by a Tezos node and a remote signer.
//!
//! Submitting an operation follows the usual manager-operation pipeline:
//!
//! 1. read the head block (branch) and the account counter,
//! 2. prepend a `reveal` if the account's public key is not yet on chain,
//! 3. forge the contents on the node,
//! 4. sign the forged bytes through the [`OperationSigner`],
//! 5. inject the signed operation.
//!
//! Confirmation walks the blocks above the submission level, looking for the
//! operation hash in the manager-operation pass, then waits until the head is
//! far enough above the including block.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tz402::{ConfirmedTransfer, Mutez, TezosAddress};
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::config::{ConfirmationPolicy, FeeConfig, OperationLimits};
use crate::ledger::{BalanceOracle, LedgerClient, LedgerError, SubmittedTransfer, TransferOperation};
use crate::rpc::{ManagerFields, ManagerOperation, TezosRpc};
use crate::signer::OperationSigner;

/// Wallet capability bound to one Tezos identity.
#[derive(Clone)]
pub struct RpcLedger {
    rpc: TezosRpc,
    signer: Arc<dyn OperationSigner>,
    address: TezosAddress,
    fees: FeeConfig,
    policy: ConfirmationPolicy,
}

impl fmt::Debug for RpcLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcLedger")
            .field("node", &self.rpc.base_url().as_str())
            .field("address", &self.address)
            .field("fees", &self.fees)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RpcLedger {
    /// Creates a ledger paying from `address`, whose key is held by `signer`.
    #[must_use]
    pub fn new(rpc: TezosRpc, signer: Arc<dyn OperationSigner>, address: TezosAddress) -> Self {
        Self {
            rpc,
            signer,
            address,
            fees: FeeConfig::default(),
            policy: ConfirmationPolicy::default(),
        }
    }

    /// Replaces the fee settings.
    #[must_use]
    pub const fn with_fees(mut self, fees: FeeConfig) -> Self {
        self.fees = fees;
        self
    }

    /// Replaces the confirmation policy.
    #[must_use]
    pub const fn with_confirmation_policy(mut self, policy: ConfirmationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The underlying node client.
    #[must_use]
    pub const fn rpc(&self) -> &TezosRpc {
        &self.rpc
    }

    fn fields(&self, limits: OperationLimits, counter: u64) -> ManagerFields {
        ManagerFields {
            source: self.address.clone(),
            fee: limits.fee,
            counter,
            gas_limit: limits.gas_limit,
            storage_limit: limits.storage_limit,
        }
    }

    async fn build_contents(
        &self,
        operation: &TransferOperation,
    ) -> Result<Vec<ManagerOperation>, LedgerError> {
        let mut counter = self.rpc.counter(&self.address).await? + 1;
        let mut contents = Vec::with_capacity(2);

        if self.rpc.manager_key(&self.address).await?.is_none() {
            #[cfg(feature = "telemetry")]
            tracing::debug!(address = %self.address, "account not revealed, prepending reveal");
            let public_key = self.signer.public_key().await?;
            contents.push(ManagerOperation::Reveal {
                fields: self.fields(self.fees.reveal, counter),
                public_key,
            });
            counter += 1;
        }

        let limits = if operation.parameters.is_some() {
            self.fees.contract_call
        } else {
            self.fees.transfer
        };
        contents.push(ManagerOperation::Transaction {
            fields: self.fields(limits, counter),
            amount: operation.amount,
            destination: operation.destination.clone(),
            parameters: operation.parameters.clone(),
        });
        Ok(contents)
    }

    async fn await_confirmations(
        &self,
        submitted: &SubmittedTransfer,
        depth: u32,
    ) -> Result<ConfirmedTransfer, LedgerError> {
        let mut next_level = submitted.branch_level + 1;
        let mut included: Option<u64> = None;

        loop {
            let head = self.rpc.head_header().await?;

            if included.is_none() {
                while next_level <= head.level {
                    let operations = self.rpc.manager_operations(next_level).await?;
                    if let Some(op) = operations.iter().find(|op| op.hash == submitted.op_hash) {
                        if let Some(failure) = op.failure() {
                            return Err(LedgerError::Rejected(failure));
                        }
                        #[cfg(feature = "telemetry")]
                        tracing::debug!(op_hash = %submitted.op_hash, level = next_level, "operation included");
                        included = Some(next_level);
                        break;
                    }
                    next_level += 1;
                }
                if included.is_none()
                    && head.level > submitted.branch_level + self.policy.max_wait_blocks
                {
                    return Err(LedgerError::ConfirmationTimeout {
                        op_hash: submitted.op_hash.clone(),
                        reason: format!(
                            "not included within {} blocks",
                            self.policy.max_wait_blocks
                        ),
                    });
                }
            }

            if let Some(level) = included {
                let observed = head.level.saturating_sub(level) + 1;
                if observed >= u64::from(depth) {
                    return Ok(ConfirmedTransfer::new(
                        submitted.op_hash.clone(),
                        self.address.clone(),
                        submitted.operation.destination.clone(),
                        submitted.operation.amount,
                        level,
                        u32::try_from(observed).unwrap_or(u32::MAX),
                    ));
                }
            }

            tokio::time::sleep(self.policy.poll_interval()).await;
        }
    }
}

#[async_trait]
impl BalanceOracle for RpcLedger {
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(address = %address)))]
    async fn balance(&self, address: &TezosAddress) -> Result<Mutez, LedgerError> {
        self.rpc.balance(address).await
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    fn address(&self) -> &TezosAddress {
        &self.address
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(
        destination = %operation.destination,
        amount = %operation.amount
    )))]
    async fn submit(&self, operation: TransferOperation) -> Result<SubmittedTransfer, LedgerError> {
        let branch = self.rpc.head_header().await?;
        let contents = self.build_contents(&operation).await?;

        let forged_hex = self.rpc.forge_operations(&branch.hash, &contents).await?;
        let forged = hex::decode(&forged_hex)
            .map_err(|e| LedgerError::Decode(format!("forged operation is not hex: {e}")))?;
        let signature = self.signer.sign(&forged).await?;
        let signed_hex = format!("{forged_hex}{}", hex::encode(signature));

        let op_hash = self.rpc.inject_operation(&signed_hex).await?;
        #[cfg(feature = "telemetry")]
        tracing::info!(op_hash = %op_hash, branch_level = branch.level, "operation injected");

        Ok(SubmittedTransfer {
            op_hash,
            operation,
            branch_level: branch.level,
        })
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(op_hash = %submitted.op_hash, depth = depth)))]
    async fn confirm(
        &self,
        submitted: &SubmittedTransfer,
        depth: u32,
    ) -> Result<ConfirmedTransfer, LedgerError> {
        tokio::time::timeout(self.policy.timeout(), self.await_confirmations(submitted, depth))
            .await
            .map_err(|_| LedgerError::ConfirmationTimeout {
                op_hash: submitted.op_hash.clone(),
                reason: format!("no {depth} confirmations after {:?}", self.policy.timeout()),
            })?
    }
}
