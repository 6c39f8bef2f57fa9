//! Client side of the 402 flow: fetch a resource, pay when asked, retry with proof.
//!
//! [`PaymentRetryFlow`] drives one call through its stages:
//!
//! ```text
//! Requesting → AwaitingPaymentDecision → Validating → Paying → Retrying → Done | Failed
//! ```
//!
//! Requirement extraction lives in [`requirement`], the ordered checks in
//! [`validate`].

mod flow;
pub mod requirement;
mod types;
pub mod validate;

pub use flow::{FlowConfig, FlowState, PaymentRetryFlow};
pub use requirement::RequirementSource;
pub use types::{FetchOutcome, FetchRequest, HttpMethod, PaymentSummary, ResourceResponse};
