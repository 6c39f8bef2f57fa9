//! Tezos network identification.
//!
//! Resource servers name the chain they want to be paid on with free-form
//! identifiers such as `"tezos-test"`, `"tezos-ghostnet"` or the CAIP-2 form
//! `"tezos:NetXnHfVqm9iesp"`. Any identifier mentioning `tezos` is accepted as
//! denoting the supported chain; [`TEZOS_NETWORKS`] lists the well-known ones
//! for configuration and display.

/// Substring that marks a network identifier as Tezos.
pub const TEZOS_NETWORK_MARKER: &str = "tezos";

/// CAIP-2 namespace for Tezos chains.
pub const TEZOS_NAMESPACE: &str = "tezos";

/// A known network definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Human-readable network name (e.g., "ghostnet").
    pub name: &'static str,
    /// CAIP-2 chain reference: the first 15 characters of the chain id.
    pub reference: &'static str,
    /// Public block explorer base URL.
    pub explorer: &'static str,
    /// Whether this is a test network with worthless funds.
    pub testnet: bool,
}

impl NetworkInfo {
    /// Returns the CAIP-2 identifier, e.g. `tezos:NetXnHfVqm9iesp`.
    #[must_use]
    pub fn caip2(&self) -> String {
        format!("{TEZOS_NAMESPACE}:{}", self.reference)
    }

    /// Returns the explorer URL for an operation hash.
    #[must_use]
    pub fn explorer_operation_url(&self, op_hash: &str) -> String {
        format!("{}/{op_hash}", self.explorer.trim_end_matches('/'))
    }
}

/// Well-known Tezos networks.
pub static TEZOS_NETWORKS: &[NetworkInfo] = &[
    NetworkInfo {
        name: "mainnet",
        reference: "NetXdQprcVkpaWU",
        explorer: "https://tzkt.io",
        testnet: false,
    },
    NetworkInfo {
        name: "ghostnet",
        reference: "NetXnHfVqm9iesp",
        explorer: "https://ghostnet.tzkt.io",
        testnet: true,
    },
    NetworkInfo {
        name: "shadownet",
        reference: "NetXsqzbfFenSTS",
        explorer: "https://shadownet.tzkt.io",
        testnet: true,
    },
];

/// Looks up a known network by name, case-insensitively.
///
/// Accepts both the bare name (`"ghostnet"`) and the prefixed form
/// (`"tezos-ghostnet"`).
#[must_use]
pub fn network_by_name(name: &str) -> Option<&'static NetworkInfo> {
    let lower = name.trim().to_ascii_lowercase();
    let bare = lower
        .strip_prefix("tezos-")
        .or_else(|| lower.strip_prefix("tezos:"))
        .unwrap_or(&lower);
    TEZOS_NETWORKS
        .iter()
        .find(|n| n.name == bare || n.reference.eq_ignore_ascii_case(bare))
}

/// Returns `true` if `network` denotes the Tezos chain.
#[must_use]
pub fn is_supported_network(network: &str) -> bool {
    network
        .to_ascii_lowercase()
        .contains(TEZOS_NETWORK_MARKER)
}
