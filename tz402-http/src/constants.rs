//! HTTP-specific constants for the 402 payment flow.

/// Header carrying the payment proof on the retried request (client → server).
pub const X_PAYMENT_HEADER: &str = "X-PAYMENT";

/// Header carrying the server's counter-proof on the paid response (server → client).
pub const X_PAYMENT_RESPONSE_HEADER: &str = "X-PAYMENT-RESPONSE";

/// Header carrying base64-encoded payment requirements (server → client).
pub const PAYMENT_REQUIRED_HEADER: &str = "PAYMENT-REQUIRED";

/// Plain-header fallback: recipient address.
pub const X_PAYMENT_ADDRESS_HEADER: &str = "X-Payment-Address";

/// Plain-header fallback: amount in mutez.
pub const X_PAYMENT_AMOUNT_HEADER: &str = "X-Payment-Amount";

/// Plain-header fallback: network identifier.
pub const X_PAYMENT_NETWORK_HEADER: &str = "X-Payment-Network";

/// Plain-header fallback: asset code.
pub const X_PAYMENT_ASSET_HEADER: &str = "X-Payment-Asset";

/// Network assumed when the plain-header fallback omits it.
pub const DEFAULT_HEADER_NETWORK: &str = "tezos";

/// Confirmations awaited before a payment counts as committed.
pub const DEFAULT_CONFIRMATIONS: u32 = 3;

/// Mutez kept aside for the operation fee and storage burn when checking balance.
pub const DEFAULT_FEE_RESERVE_MUTEZ: u64 = 100_000;

/// Timeout applied to each resource request, in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
