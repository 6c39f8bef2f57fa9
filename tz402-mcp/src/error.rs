//! Error types for tool validation, execution and configuration.

use serde_json::{Value, json};
use tz402_http::FlowError;
use tz402_tezos::LedgerError;

/// Tool arguments were rejected before anything ran.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// A required argument is absent.
    #[error("missing required argument `{0}`")]
    Missing(String),

    /// An argument is present but unusable.
    #[error("invalid argument `{field}`: {reason}")]
    Invalid {
        /// Argument name.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No tool is registered under this name.
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Invalid`].
    pub fn invalid(field: impl Into<String>, reason: impl ToString) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.to_string(),
        }
    }

    /// Machine-readable error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Missing(_) | Self::Invalid { .. } => "InvalidArguments",
            Self::UnknownTool(_) => "UnknownTool",
        }
    }

    /// Payload returned to the agent.
    #[must_use]
    pub fn report(&self) -> Value {
        json!({ "kind": self.kind(), "message": self.to_string() })
    }
}

/// A validated tool call failed while running.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExecutionError {
    /// Chain or signer failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The payment flow failed.
    #[error(transparent)]
    Flow(#[from] FlowError),

    /// The tool needs a setting that is absent.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl ExecutionError {
    /// Machine-readable error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Ledger(LedgerError::ConfirmationTimeout { .. }) => "ConfirmationTimeout",
            Self::Ledger(LedgerError::Rejected(_)) => "OperationRejected",
            Self::Ledger(_) => "LedgerError",
            Self::Flow(flow) => flow.kind(),
            Self::NotConfigured(_) => "NotConfigured",
        }
    }

    /// Payload returned to the agent.
    #[must_use]
    pub fn report(&self) -> Value {
        match self {
            Self::Flow(flow) => serde_json::to_value(flow)
                .unwrap_or_else(|_| json!({ "kind": flow.kind(), "message": flow.to_string() })),
            Self::Ledger(LedgerError::ConfirmationTimeout { op_hash, .. }) => json!({
                "kind": self.kind(),
                "message": self.to_string(),
                "context": { "opHash": op_hash },
            }),
            _ => json!({ "kind": self.kind(), "message": self.to_string() }),
        }
    }
}

/// Configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but cannot be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// Config file path.
        path: String,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is present but unusable.
    #[error("invalid configuration value `{field}`: {reason}")]
    Invalid {
        /// Setting name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}
