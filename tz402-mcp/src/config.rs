//! Tool server configuration.
//!
//! Loads a TOML file with `$VAR` / `${VAR}` expansion in its text. Missing
//! files are treated as empty so the server can run from environment
//! variables alone.
//!
//! # Example Configuration
//!
//! ```toml
//! network = "ghostnet"
//! rpc_url = "https://rpc.ghostnet.teztnets.com"
//! signer_url = "http://localhost:6732"
//! address = "$TEZOS_ADDRESS"
//! confirmations = 3
//! fee_reserve = 100000
//!
//! [token]
//! address = "KT1..."
//! token_id = 0
//!
//! [swap]
//! address = "KT1..."
//! rate = 1000
//!
//! [fees.transfer]
//! fee = 2000
//! gas_limit = 10000
//! storage_limit = 350
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to the configuration file (default: `tz402.toml`)
//! - `TEZOS_RPC_URL`, `TEZOS_SIGNER_URL`, `TEZOS_ADDRESS`, `TEZOS_NETWORK` -
//!   override the matching file values

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tz402::{Mutez, TezosAddress};
use tz402_http::FlowConfig;
use tz402_http::constants::{DEFAULT_CONFIRMATIONS, DEFAULT_FEE_RESERVE_MUTEZ, DEFAULT_FETCH_TIMEOUT_SECS};
use tz402_tezos::{ConfirmationPolicy, FeeConfig};
use url::Url;

use crate::error::ConfigError;
use crate::tools::{SwapContract, TokenContract};

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "tz402.toml";

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Network name (default: `ghostnet`).
    #[serde(default = "default_network")]
    pub network: String,

    /// Tezos node RPC endpoint.
    #[serde(default)]
    pub rpc_url: Option<String>,

    /// Remote signer endpoint.
    #[serde(default)]
    pub signer_url: Option<String>,

    /// Address of the wallet; its key must be held by the signer.
    #[serde(default)]
    pub address: Option<String>,

    /// Confirmations awaited for every transfer (default: 3).
    #[serde(default = "default_confirmations")]
    pub confirmations: u32,

    /// Mutez kept aside for fees when paying for resources.
    #[serde(default = "default_fee_reserve")]
    pub fee_reserve: Mutez,

    /// Timeout of resource requests, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Timeout of node and signer requests, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub rpc_timeout_secs: u64,

    /// FA2 token contract for `transfer_token`.
    #[serde(default)]
    pub token: Option<TokenContract>,

    /// Swap contract for `swap_xtz_for_tokens`.
    #[serde(default)]
    pub swap: Option<SwapContract>,

    /// Operation fees and limits.
    #[serde(default)]
    pub fees: FeeConfig,

    /// Inclusion polling.
    #[serde(default)]
    pub confirmation: ConfirmationPolicy,
}

fn default_network() -> String {
    "ghostnet".to_owned()
}

const fn default_confirmations() -> u32 {
    DEFAULT_CONFIRMATIONS
}

const fn default_fee_reserve() -> Mutez {
    Mutez::new(DEFAULT_FEE_RESERVE_MUTEZ)
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

impl ServerConfig {
    /// Loads configuration from `path`, expanding variables from the process
    /// environment and applying `TEZOS_*` overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let content = if Path::new(path).exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_owned(),
                source,
            })?
        } else {
            String::new()
        };
        Self::from_toml(&content, |name| std::env::var(name).ok())
    }

    /// Parses `content` with variables and overrides taken from `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid TOML.
    pub fn from_toml<F>(content: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expanded = expand_env_vars(content, &lookup);
        let mut config: Self = toml::from_str(&expanded)?;

        if let Some(network) = lookup("TEZOS_NETWORK") {
            config.network = network;
        }
        if let Some(url) = lookup("TEZOS_RPC_URL") {
            config.rpc_url = Some(url);
        }
        if let Some(url) = lookup("TEZOS_SIGNER_URL") {
            config.signer_url = Some(url);
        }
        if let Some(address) = lookup("TEZOS_ADDRESS") {
            config.address = Some(address);
        }
        Ok(config)
    }

    /// The node endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if it is unset or not a URL.
    pub fn rpc_url(&self) -> Result<Url, ConfigError> {
        parse_url("rpc_url", self.rpc_url.as_deref())
    }

    /// The signer endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if it is unset or not a URL.
    pub fn signer_url(&self) -> Result<Url, ConfigError> {
        parse_url("signer_url", self.signer_url.as_deref())
    }

    /// The wallet address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if it is unset or malformed.
    pub fn address(&self) -> Result<TezosAddress, ConfigError> {
        let raw = required("address", self.address.as_deref())?;
        raw.parse().map_err(|e: tz402::address::InvalidAddress| ConfigError::Invalid {
            field: "address",
            reason: e.to_string(),
        })
    }

    /// Timeout of node and signer requests.
    #[must_use]
    pub const fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    /// Settings of the payment flow.
    #[must_use]
    pub const fn flow_config(&self) -> FlowConfig {
        FlowConfig {
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            confirmations: self.confirmations,
            fee_reserve: self.fee_reserve,
        }
    }
}

fn required<'a>(field: &'static str, value: Option<&'a str>) -> Result<&'a str, ConfigError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() && !v.starts_with('$') => Ok(v),
        Some(v) if v.starts_with('$') => Err(ConfigError::Invalid {
            field,
            reason: format!("unresolved variable {v}"),
        }),
        _ => Err(ConfigError::Invalid {
            field,
            reason: "not set".to_owned(),
        }),
    }
}

fn parse_url(field: &'static str, value: Option<&str>) -> Result<Url, ConfigError> {
    let raw = required(field, value)?;
    Url::parse(raw).map_err(|e| ConfigError::Invalid {
        field,
        reason: format!("{raw}: {e}"),
    })
}

/// Expands `$VAR` and `${VAR}` patterns using `lookup`.
///
/// Unresolved variables are left as-is.
fn expand_env_vars<F>(input: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if braced {
                if c == '}' {
                    chars.next();
                    break;
                }
            } else if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            name.push(c);
            chars.next();
        }

        match lookup(&name) {
            Some(value) if !name.is_empty() => result.push_str(&value),
            _ => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&name);
                if braced && !name.is_empty() {
                    result.push('}');
                }
            }
        }
    }

    result
}
