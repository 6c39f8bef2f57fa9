//! The fetch-pay-retry flow.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use tz402::networks::network_by_name;
use tz402::timestamp::UnixTimestamp;
use tz402::{ConfirmedTransfer, Mutez, PaymentProof, PaymentRequirement};
use tz402_tezos::{LedgerClient, TransferOperation};
#[cfg(feature = "telemetry")]
use tracing::{debug, info, instrument, warn};

use super::requirement::RequirementSource;
use super::types::{FetchOutcome, FetchRequest, PaymentSummary, ResourceResponse};
use super::validate::{self, Decision, GateLimits};
use crate::constants::{
    DEFAULT_CONFIRMATIONS, DEFAULT_FEE_RESERVE_MUTEZ, DEFAULT_FETCH_TIMEOUT_SECS,
    X_PAYMENT_HEADER, X_PAYMENT_RESPONSE_HEADER,
};
use crate::error::FlowError;
use crate::headers::{decode_payment_response, encode_x_payment};

/// Tunables of the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowConfig {
    /// Timeout of each resource request.
    pub fetch_timeout: Duration,
    /// Confirmations awaited before the proof is built.
    pub confirmations: u32,
    /// Mutez required on top of the amount when checking balance.
    pub fee_reserve: Mutez,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            confirmations: DEFAULT_CONFIRMATIONS,
            fee_reserve: Mutez::new(DEFAULT_FEE_RESERVE_MUTEZ),
        }
    }
}

/// Stages of one call. A call only ever moves forward through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FlowState {
    /// Initial request in flight.
    Requesting,
    /// 402 received, requirement being extracted.
    AwaitingPaymentDecision,
    /// Requirement being checked.
    Validating,
    /// Transfer submitted or awaiting confirmations.
    Paying,
    /// Request reissued with the proof.
    Retrying,
    /// Finished with a result.
    Done,
    /// Finished with an error.
    Failed,
}

#[derive(Debug)]
struct Progress {
    state: FlowState,
}

impl Progress {
    const fn start() -> Self {
        Self {
            state: FlowState::Requesting,
        }
    }

    fn advance(&mut self, next: FlowState) {
        debug_assert!(next >= self.state, "flow moved back from {:?} to {next:?}", self.state);
        #[cfg(feature = "telemetry")]
        debug!(from = ?self.state, to = ?next, "payment flow transition");
        self.state = next;
    }

    fn fail(&mut self, error: FlowError) -> FlowError {
        #[cfg(feature = "telemetry")]
        warn!(state = ?self.state, kind = error.kind(), error = %error, "payment flow failed");
        self.state = FlowState::Failed;
        error
    }
}

/// Fetches a resource, paying for it on Tezos when the server answers 402.
///
/// The flow is bound to one [`LedgerClient`], and so to one paying identity.
/// Each call is independent; calls share no state besides the ledger.
#[derive(Clone)]
pub struct PaymentRetryFlow {
    http: Client,
    ledger: Arc<dyn LedgerClient>,
    config: FlowConfig,
}

impl std::fmt::Debug for PaymentRetryFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentRetryFlow")
            .field("payer", self.ledger.address())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PaymentRetryFlow {
    /// Creates a flow paying through `ledger` with default settings.
    #[must_use]
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            http: Client::new(),
            ledger,
            config: FlowConfig::default(),
        }
    }

    /// Replaces the settings.
    #[must_use]
    pub const fn with_config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the HTTP client used for resource requests.
    #[must_use]
    pub fn with_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    /// Current settings.
    #[must_use]
    pub const fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Fetches `request.url`, paying and retrying once if the server asks for payment.
    ///
    /// Non-402 responses are returned untouched without any chain call. Once
    /// the transfer is submitted the call runs to completion: it never pays
    /// twice and never returns to validation.
    ///
    /// # Errors
    ///
    /// Returns a [`FlowError`] whose [`kind`](FlowError::kind) tells the
    /// caller which stage failed. [`FlowError::PaymentMadeRetryFailed`] is the
    /// only error raised after funds moved.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "tz402.fetch_with_payment", skip_all, err, fields(url = %request.url))
    )]
    pub async fn fetch_with_payment(&self, request: &FetchRequest) -> Result<FetchOutcome, FlowError> {
        let mut progress = Progress::start();
        match self.run(request, &mut progress).await {
            Ok(outcome) => {
                progress.advance(FlowState::Done);
                Ok(outcome)
            }
            Err(error) => Err(progress.fail(error)),
        }
    }

    async fn run(
        &self,
        request: &FetchRequest,
        progress: &mut Progress,
    ) -> Result<FetchOutcome, FlowError> {
        let headers = request_headers(request)?;

        let (status, response_headers, body) = self
            .send(request, headers.clone())
            .await
            .map_err(|e| self.fetch_error(request, &e))?;
        if status != StatusCode::PAYMENT_REQUIRED {
            #[cfg(feature = "telemetry")]
            debug!(status = status.as_u16(), "no payment required");
            return Ok(FetchOutcome::Completed {
                response: ResourceResponse::new(status.as_u16(), &response_headers, &body),
            });
        }

        progress.advance(FlowState::AwaitingPaymentDecision);
        let source = RequirementSource::resolve(&response_headers, &body);
        #[cfg(feature = "telemetry")]
        info!(source = source.name(), "received 402 Payment Required");
        let requirement =
            source
                .into_requirement()
                .ok_or_else(|| FlowError::UnparsablePaymentRequirement {
                    raw_body: String::from_utf8_lossy(&body).into_owned(),
                })?;

        progress.advance(FlowState::Validating);
        let limits = GateLimits {
            auto_retry: request.auto_retry,
            max_payment: request.max_payment,
            fee_reserve: self.config.fee_reserve,
            now: UnixTimestamp::now(),
        };
        let payment = match validate::check_requirement(&requirement, &limits)? {
            Decision::Manual => {
                return Ok(FetchOutcome::PaymentRequired {
                    requirement: Box::new(requirement),
                    response: ResourceResponse::new(status.as_u16(), &response_headers, &body),
                });
            }
            Decision::Pay(payment) => payment,
        };
        validate::check_balance(
            self.ledger.as_ref(),
            self.ledger.address(),
            &payment,
            self.config.fee_reserve,
            &requirement,
        )
        .await?;

        progress.advance(FlowState::Paying);
        #[cfg(feature = "telemetry")]
        info!(to = %payment.recipient, amount = %payment.amount, "paying");
        let confirmed = self
            .ledger
            .transfer_and_confirm(
                TransferOperation::native(payment.recipient, payment.amount),
                self.config.confirmations,
            )
            .await
            .map_err(|cause| FlowError::PaymentExecutionFailed {
                cause,
                requirement: Box::new(requirement.clone()),
            })?;

        progress.advance(FlowState::Retrying);
        let mut summary = summarize(&requirement, &confirmed);
        let proof = PaymentProof::from_confirmed(&requirement, &confirmed);
        let paid_headers = encode_x_payment(&proof)
            .map_err(|e| e.to_string())
            .and_then(|value| {
                let mut headers = headers;
                let value = HeaderValue::from_str(&value).map_err(|e| e.to_string())?;
                headers.insert(X_PAYMENT_HEADER, value);
                Ok(headers)
            });
        let retried = match paid_headers {
            Ok(headers) => self.send(request, headers).await.map_err(|e| e.to_string()),
            Err(reason) => Err(reason),
        };
        let (status, response_headers, body) = retried.map_err(|reason| {
            FlowError::PaymentMadeRetryFailed {
                summary: Box::new(summary.clone()),
                reason,
            }
        })?;

        summary.counter_proof = response_headers
            .get(X_PAYMENT_RESPONSE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| decode_payment_response(v).ok());
        #[cfg(feature = "telemetry")]
        info!(status = status.as_u16(), op_hash = %summary.op_hash, "retried with payment proof");

        Ok(FetchOutcome::Paid {
            response: ResourceResponse::new(status.as_u16(), &response_headers, &body),
            payment: Box::new(summary),
        })
    }

    async fn send(
        &self,
        request: &FetchRequest,
        headers: HeaderMap,
    ) -> Result<(StatusCode, HeaderMap, Vec<u8>), reqwest::Error> {
        let mut builder = self
            .http
            .request(request.method.into(), request.url.clone())
            .headers(headers)
            .timeout(self.config.fetch_timeout);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok((status, headers, body.to_vec()))
    }

    fn fetch_error(&self, request: &FetchRequest, error: &reqwest::Error) -> FlowError {
        FlowError::Fetch {
            url: request.url.to_string(),
            reason: error.to_string(),
            timeout: error.is_timeout().then_some(self.config.fetch_timeout),
        }
    }
}

fn request_headers(request: &FetchRequest) -> Result<HeaderMap, FlowError> {
    let mut headers = HeaderMap::with_capacity(request.headers.len() + 1);
    for (name, value) in &request.headers {
        let invalid = |reason: String| FlowError::Fetch {
            url: request.url.to_string(),
            reason,
            timeout: None,
        };
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| invalid(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| invalid(format!("invalid value for header {name}: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn summarize(requirement: &PaymentRequirement, confirmed: &ConfirmedTransfer) -> PaymentSummary {
    PaymentSummary {
        amount: confirmed.amount(),
        amount_xtz: confirmed.amount().to_xtz(),
        recipient: confirmed.to().to_string(),
        op_hash: confirmed.op_hash().to_owned(),
        network: requirement.network.clone(),
        confirmations: confirmed.confirmations(),
        explorer_url: network_by_name(&requirement.network)
            .map(|network| network.explorer_operation_url(confirmed.op_hash())),
        counter_proof: None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tz402::encoding::Base64Bytes;
    use tz402::{TezosAddress, Xtz};
    use tz402_tezos::{BalanceOracle, LedgerError, SubmittedTransfer};
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const PAYER: &str = "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx";
    const RECIPIENT: &str = "tz2BFTyPeYRzxd5aiBchbXN3WCZhx7BqbMBq";

    struct FakeLedger {
        address: TezosAddress,
        balance: Mutez,
        fail_balance: bool,
        fail_transfer: bool,
        balance_calls: AtomicUsize,
        transfers: Mutex<Vec<TransferOperation>>,
    }

    impl FakeLedger {
        fn new(mutez: u64, fail_balance: bool, fail_transfer: bool) -> Arc<Self> {
            Arc::new(Self {
                address: PAYER.parse().unwrap(),
                balance: Mutez::new(mutez),
                fail_balance,
                fail_transfer,
                balance_calls: AtomicUsize::new(0),
                transfers: Mutex::new(Vec::new()),
            })
        }

        fn with_balance(mutez: u64) -> Arc<Self> {
            Self::new(mutez, false, false)
        }

        fn failing() -> Arc<Self> {
            Self::new(10_000_000, false, true)
        }

        fn unreadable() -> Arc<Self> {
            Self::new(10_000_000, true, false)
        }

        fn chain_calls(&self) -> usize {
            self.balance_calls.load(Ordering::SeqCst) + self.transfers.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl BalanceOracle for FakeLedger {
        async fn balance(&self, _address: &TezosAddress) -> Result<Mutez, LedgerError> {
            self.balance_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_balance {
                return Err(LedgerError::Rpc("node unreachable".into()));
            }
            Ok(self.balance)
        }
    }

    #[async_trait]
    impl LedgerClient for FakeLedger {
        fn address(&self) -> &TezosAddress {
            &self.address
        }

        async fn submit(
            &self,
            operation: TransferOperation,
        ) -> Result<SubmittedTransfer, LedgerError> {
            self.transfers.lock().unwrap().push(operation.clone());
            if self.fail_transfer {
                return Err(LedgerError::Rejected("balance_too_low".into()));
            }
            Ok(SubmittedTransfer {
                op_hash: "ooFakeHash".into(),
                operation,
                branch_level: 10,
            })
        }

        async fn confirm(
            &self,
            submitted: &SubmittedTransfer,
            depth: u32,
        ) -> Result<ConfirmedTransfer, LedgerError> {
            Ok(ConfirmedTransfer::new(
                submitted.op_hash.clone(),
                self.address.clone(),
                submitted.operation.destination.clone(),
                submitted.operation.amount,
                11,
                depth,
            ))
        }
    }

    fn accepts(overrides: Value) -> Value {
        let mut option = json!({
            "network": "tezos-test",
            "maxAmountRequired": "100000",
            "payTo": RECIPIENT,
            "asset": "XTZ",
        });
        if let (Some(option), Some(extra)) = (option.as_object_mut(), overrides.as_object()) {
            option.extend(extra.clone());
        }
        json!({ "x402Version": 1, "accepts": [option] })
    }

    fn flow(ledger: &Arc<FakeLedger>) -> PaymentRetryFlow {
        PaymentRetryFlow::new(ledger.clone()).with_config(FlowConfig {
            fetch_timeout: Duration::from_millis(500),
            ..FlowConfig::default()
        })
    }

    fn request(server: &MockServer) -> FetchRequest {
        FetchRequest::get(format!("{}/resource", server.uri()).parse().unwrap())
    }

    async fn mount_paywall(server: &MockServer, body: Value) {
        Mock::given(method("GET"))
            .and(path("/resource"))
            .and(header_exists(X_PAYMENT_HEADER))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("premium content")
                    .insert_header(
                        X_PAYMENT_RESPONSE_HEADER,
                        Base64Bytes::encode_json(&json!({"success": true}))
                            .unwrap()
                            .to_string()
                            .as_str(),
                    ),
            )
            .with_priority(1)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/resource"))
            .respond_with(ResponseTemplate::new(402).set_body_json(body))
            .with_priority(2)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_non_402_returned_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/resource"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("free content")
                    .insert_header("x-custom", "yes"),
            )
            .mount(&server)
            .await;
        let ledger = FakeLedger::with_balance(10_000_000);

        let outcome = flow(&ledger).fetch_with_payment(&request(&server)).await.unwrap();
        let FetchOutcome::Completed { response } = outcome else {
            panic!("expected completed outcome");
        };
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "free content");
        assert_eq!(response.headers["x-custom"], vec!["yes"]);
        assert_eq!(ledger.chain_calls(), 0);
    }

    #[tokio::test]
    async fn test_bad_limit_ignored_without_402() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/resource"))
            .respond_with(ResponseTemplate::new(200).set_body_string("free content"))
            .mount(&server)
            .await;
        let ledger = FakeLedger::with_balance(10_000_000);

        let req = request(&server).with_max_payment("-1".parse::<Xtz>().unwrap());
        let outcome = flow(&ledger).fetch_with_payment(&req).await.unwrap();
        assert_eq!(outcome.response().status, 200);
        assert_eq!(outcome.response().body, "free content");
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
        assert_eq!(ledger.chain_calls(), 0);
    }

    #[tokio::test]
    async fn test_bad_limit_fails_at_limit_check() {
        let server = MockServer::start().await;
        mount_paywall(&server, accepts(json!({}))).await;
        let ledger = FakeLedger::with_balance(10_000_000);

        let req = request(&server).with_max_payment("-1".parse::<Xtz>().unwrap());
        let err = flow(&ledger).fetch_with_payment(&req).await.unwrap_err();
        assert_eq!(err.kind(), "InvalidPaymentLimit");
        assert_eq!(ledger.chain_calls(), 0);

        let manual = req.with_auto_retry(false);
        let outcome = flow(&ledger).fetch_with_payment(&manual).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::PaymentRequired { .. }));
    }

    #[tokio::test]
    async fn test_pays_and_retries_with_proof() {
        let server = MockServer::start().await;
        mount_paywall(&server, accepts(json!({}))).await;
        let ledger = FakeLedger::with_balance(10_000_000);

        let req = request(&server).with_header("Authorization", "Bearer abc");
        let outcome = flow(&ledger).fetch_with_payment(&req).await.unwrap();

        let payment = outcome.payment().unwrap().clone();
        assert_eq!(outcome.response().status, 200);
        assert_eq!(outcome.response().body, "premium content");
        assert_eq!(payment.amount, Mutez::new(100_000));
        assert_eq!(payment.recipient, RECIPIENT);
        assert_eq!(payment.op_hash, "ooFakeHash");
        assert_eq!(payment.confirmations, DEFAULT_CONFIRMATIONS);
        assert_eq!(payment.counter_proof, Some(json!({"success": true})));

        let transfers = ledger.transfers.lock().unwrap().clone();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].destination.as_str(), RECIPIENT);
        assert_eq!(transfers[0].amount, Mutez::new(100_000));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        let retry = &requests[1];
        assert_eq!(retry.headers.get("authorization").unwrap(), "Bearer abc");
        let proof: Value = Base64Bytes::from(retry.headers.get(X_PAYMENT_HEADER).unwrap().to_str().unwrap())
            .decode_json()
            .unwrap();
        assert_eq!(
            proof,
            json!({
                "scheme": "exact",
                "network": "tezos-test",
                "payload": {"authorization": {
                    "from": PAYER,
                    "to": RECIPIENT,
                    "amount": "100000",
                    "asset": "XTZ",
                    "opHash": "ooFakeHash",
                }}
            })
        );
    }

    #[tokio::test]
    async fn test_limit_exceeded_makes_no_chain_call() {
        let server = MockServer::start().await;
        mount_paywall(&server, accepts(json!({}))).await;
        let ledger = FakeLedger::with_balance(10_000_000);

        let req = request(&server).with_max_payment("0.05".parse::<Xtz>().unwrap());
        let err = flow(&ledger).fetch_with_payment(&req).await.unwrap_err();
        assert_eq!(err.kind(), "PaymentLimitExceeded");
        assert_eq!(ledger.chain_calls(), 0);
    }

    #[tokio::test]
    async fn test_insufficient_balance_submits_nothing() {
        let server = MockServer::start().await;
        mount_paywall(&server, accepts(json!({}))).await;
        let ledger = FakeLedger::with_balance(150_000);

        let err = flow(&ledger)
            .fetch_with_payment(&request(&server))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FlowError::InsufficientBalance { balance, needed, .. }
                if balance == Mutez::new(150_000) && needed == Mutez::new(200_000)
        ));
        assert!(ledger.transfers.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_balance_submits_nothing() {
        let server = MockServer::start().await;
        mount_paywall(&server, accepts(json!({}))).await;
        let ledger = FakeLedger::unreadable();

        let err = flow(&ledger)
            .fetch_with_payment(&request(&server))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "BalanceCheckFailed");
        assert!(!err.funds_moved());
        assert_eq!(ledger.balance_calls.load(Ordering::SeqCst), 1);
        assert!(ledger.transfers.lock().unwrap().is_empty());
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_recipient_makes_no_chain_call() {
        let server = MockServer::start().await;
        mount_paywall(
            &server,
            accepts(json!({"payTo": "tz3WEJYwJ6pPwVbSL8FrSoAXRmFHHZTuEnMA"})),
        )
        .await;
        let ledger = FakeLedger::with_balance(10_000_000);

        let err = flow(&ledger)
            .fetch_with_payment(&request(&server))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidAddress");
        assert_eq!(ledger.balance_calls.load(Ordering::SeqCst), 0);
        assert!(ledger.transfers.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retry_transport_failure_reports_payment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/resource"))
            .and(header_exists(X_PAYMENT_HEADER))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/resource"))
            .respond_with(ResponseTemplate::new(402).set_body_json(accepts(json!({}))))
            .with_priority(2)
            .mount(&server)
            .await;
        let ledger = FakeLedger::with_balance(10_000_000);

        let err = flow(&ledger)
            .fetch_with_payment(&request(&server))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "PaymentMadeRetryFailed");
        assert!(err.funds_moved());
        let serialized = serde_json::to_value(&err).unwrap();
        assert_eq!(serialized["context"]["opHash"], "ooFakeHash");
        assert_eq!(ledger.transfers.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_token_asset_makes_no_chain_call() {
        let server = MockServer::start().await;
        mount_paywall(&server, accepts(json!({"asset": "TEST"}))).await;
        let ledger = FakeLedger::with_balance(10_000_000);

        let err = flow(&ledger)
            .fetch_with_payment(&request(&server))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "UnsupportedAsset");
        assert_eq!(ledger.chain_calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_before_balance_query() {
        let server = MockServer::start().await;
        mount_paywall(&server, accepts(json!({"expiry": 1_000_000_000u64}))).await;
        let ledger = FakeLedger::with_balance(10_000_000);

        let err = flow(&ledger)
            .fetch_with_payment(&request(&server))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "PaymentExpired");
        assert_eq!(ledger.balance_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_earlier_gate_wins() {
        let server = MockServer::start().await;
        mount_paywall(
            &server,
            accepts(json!({"network": "base-sepolia", "expiry": 1_000_000_000u64})),
        )
        .await;
        let ledger = FakeLedger::with_balance(10_000_000);

        let err = flow(&ledger)
            .fetch_with_payment(&request(&server))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "UnsupportedNetwork");
    }

    #[tokio::test]
    async fn test_manual_mode_returns_requirement() {
        let server = MockServer::start().await;
        mount_paywall(&server, accepts(json!({}))).await;
        let ledger = FakeLedger::with_balance(10_000_000);

        let req = request(&server).with_auto_retry(false);
        let outcome = flow(&ledger).fetch_with_payment(&req).await.unwrap();
        let FetchOutcome::PaymentRequired { requirement, response } = outcome else {
            panic!("expected manual-pay outcome");
        };
        assert_eq!(requirement.pay_to, RECIPIENT);
        assert_eq!(response.status, 402);
        assert_eq!(ledger.chain_calls(), 0);
    }

    #[tokio::test]
    async fn test_unparsable_requirement_surfaces_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/resource"))
            .respond_with(ResponseTemplate::new(402).set_body_string("pay up"))
            .mount(&server)
            .await;
        let ledger = FakeLedger::with_balance(10_000_000);

        let err = flow(&ledger)
            .fetch_with_payment(&request(&server))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::UnparsablePaymentRequirement { ref raw_body } if raw_body == "pay up"));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_execution_failure_is_not_retried() {
        let server = MockServer::start().await;
        mount_paywall(&server, accepts(json!({}))).await;
        let ledger = FakeLedger::failing();

        let err = flow(&ledger)
            .fetch_with_payment(&request(&server))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "PaymentExecutionFailed");
        assert!(!err.funds_moved());
        assert_eq!(ledger.transfers.lock().unwrap().len(), 1);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_initial_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/resource"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;
        let ledger = FakeLedger::with_balance(10_000_000);

        let err = flow(&ledger)
            .fetch_with_payment(&request(&server))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "TimeoutError");
        assert_eq!(ledger.chain_calls(), 0);
    }
}
