//! HTTP clients for remote payment facilitators.
//!
//! Two backends speak to two different kinds of service. [`DirectFacilitator`]
//! talks the standard x402 dialect: `POST /verify`, `POST /settle`,
//! `GET /supported`, `GET /discovery/resources` with flat request and response
//! bodies. [`AggregatorFacilitator`] talks to routing services that take a
//! base64 payment header at their own `/verify` and `/settle` endpoints and
//! answer inside a `data` envelope. [`FacilitatorRouter`] picks one of the two at construction and
//! never re-decides per call.

use http::{HeaderMap, StatusCode};
use reqwest::Client;
use std::time::Duration;
use tokio::sync::RwLock;
use url::Url;

use crate::proto::{
    DiscoveryParams, DiscoveryResponse, SettleRequest, SettleResponse, SupportedResponse,
    VerifyRequest, VerifyResponse,
};
use crate::util::Base64Bytes;

/// Errors that can occur while interacting with a remote facilitator.
#[derive(Debug, thiserror::Error)]
pub enum FacilitatorError {
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        context: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("Cannot serialize request body: {context}: {source}")]
    Serialize {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("HTTP error: {context}: {source}")]
    Http {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        context: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("Failed to read response body as text: {context}: {source}")]
    ResponseBodyRead {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("Malformed facilitator response: {context}")]
    MalformedResponse { context: &'static str },
}

/// A service that can verify and settle payment payloads.
pub trait Facilitator {
    fn verify(
        &self,
        request: &VerifyRequest<'_>,
    ) -> impl Future<Output = Result<VerifyResponse, FacilitatorError>> + Send;
    fn settle(
        &self,
        request: &SettleRequest<'_>,
    ) -> impl Future<Output = Result<SettleResponse, FacilitatorError>> + Send;
}

/// Generic POST helper shared by both backends. Non-2xx responses are read
/// as text, never parsed as JSON.
///
/// `context` is a human-readable identifier used in tracing and error
/// messages (e.g. `"POST /verify"`).
async fn post_json<T, R>(
    client: &Client,
    url: &Url,
    headers: &HeaderMap,
    context: &'static str,
    payload: &T,
) -> Result<R, FacilitatorError>
where
    T: serde::Serialize + ?Sized,
    R: serde::de::DeserializeOwned,
{
    let mut req = client.post(url.clone()).json(payload);
    for (key, value) in headers.iter() {
        req = req.header(key, value);
    }
    let http_response = req
        .send()
        .await
        .map_err(|e| FacilitatorError::Http { context, source: e })?;

    if http_response.status().is_success() {
        http_response
            .json::<R>()
            .await
            .map_err(|e| FacilitatorError::JsonDeserialization { context, source: e })
    } else {
        let status = http_response.status();
        let body = http_response
            .text()
            .await
            .map_err(|e| FacilitatorError::ResponseBodyRead { context, source: e })?;
        tracing::warn!(%status, context, "facilitator returned an error status");
        Err(FacilitatorError::HttpStatus {
            context,
            status,
            body,
        })
    }
}

/// Generic GET helper with the same error mapping as [`post_json`].
async fn get_json<R>(
    client: &Client,
    url: &Url,
    headers: &HeaderMap,
    context: &'static str,
) -> Result<R, FacilitatorError>
where
    R: serde::de::DeserializeOwned,
{
    let mut req = client.get(url.clone());
    for (key, value) in headers.iter() {
        req = req.header(key, value);
    }
    let http_response = req
        .send()
        .await
        .map_err(|e| FacilitatorError::Http { context, source: e })?;

    if http_response.status().is_success() {
        http_response
            .json::<R>()
            .await
            .map_err(|e| FacilitatorError::JsonDeserialization { context, source: e })
    } else {
        let status = http_response.status();
        let body = http_response
            .text()
            .await
            .map_err(|e| FacilitatorError::ResponseBodyRead { context, source: e })?;
        Err(FacilitatorError::HttpStatus {
            context,
            status,
            body,
        })
    }
}

/// TTL cache entry for [`SupportedResponse`].
#[derive(Clone, Debug)]
struct SupportedCacheState {
    response: SupportedResponse,
    expires_at: std::time::Instant,
}

/// TTL cache for the `/supported` endpoint response.
///
/// Each clone has an independent cache state.
#[derive(Debug)]
pub struct SupportedCache {
    ttl: Duration,
    state: RwLock<Option<SupportedCacheState>>,
}

impl SupportedCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: RwLock::new(None),
        }
    }

    /// Returns the cached response if still valid.
    pub async fn get(&self) -> Option<SupportedResponse> {
        let guard = self.state.read().await;
        let cache = guard.as_ref()?;
        if std::time::Instant::now() < cache.expires_at {
            Some(cache.response.clone())
        } else {
            None
        }
    }

    pub async fn set(&self, response: SupportedResponse) {
        let mut guard = self.state.write().await;
        *guard = Some(SupportedCacheState {
            response,
            expires_at: std::time::Instant::now() + self.ttl,
        });
    }
}

impl Clone for SupportedCache {
    fn clone(&self) -> Self {
        Self::new(self.ttl)
    }
}

/// A client for a standard x402 facilitator service.
///
/// Endpoint URLs are computed once at construction, relative to the base URL.
#[derive(Clone, Debug)]
pub struct DirectFacilitator {
    base_url: Url,
    verify_url: Url,
    settle_url: Url,
    supported_url: Url,
    discovery_url: Url,
    client: Client,
    headers: HeaderMap,
    supported_cache: SupportedCache,
}

impl DirectFacilitator {
    /// Default TTL for caching the supported endpoint response (10 minutes).
    pub const DEFAULT_SUPPORTED_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

    /// Constructs a client from a base URL, precomputing the endpoint URLs.
    pub fn try_new(base_url: Url) -> Result<Self, FacilitatorError> {
        let client = Client::new();
        let verify_url = base_url
            .join("./verify")
            .map_err(|e| FacilitatorError::UrlParse {
                context: "Failed to construct ./verify URL",
                source: e,
            })?;
        let settle_url = base_url
            .join("./settle")
            .map_err(|e| FacilitatorError::UrlParse {
                context: "Failed to construct ./settle URL",
                source: e,
            })?;
        let supported_url =
            base_url
                .join("./supported")
                .map_err(|e| FacilitatorError::UrlParse {
                    context: "Failed to construct ./supported URL",
                    source: e,
                })?;
        let discovery_url =
            base_url
                .join("./discovery/resources")
                .map_err(|e| FacilitatorError::UrlParse {
                    context: "Failed to construct ./discovery/resources URL",
                    source: e,
                })?;
        Ok(Self {
            base_url,
            verify_url,
            settle_url,
            supported_url,
            discovery_url,
            client,
            headers: HeaderMap::new(),
            supported_cache: SupportedCache::new(Self::DEFAULT_SUPPORTED_CACHE_TTL),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn verify_url(&self) -> &Url {
        &self.verify_url
    }

    pub fn settle_url(&self) -> &Url {
        &self.settle_url
    }

    /// Attaches custom headers to all future requests.
    pub fn with_headers(&self, headers: HeaderMap) -> Self {
        let mut this = self.clone();
        this.headers = headers;
        this
    }

    /// Sets the TTL for caching the supported endpoint response.
    pub fn with_supported_cache_ttl(&self, ttl: Duration) -> Self {
        let mut this = self.clone();
        this.supported_cache = SupportedCache::new(ttl);
        this
    }

    /// Sends a `POST /verify` request to the facilitator.
    pub async fn verify(
        &self,
        request: &VerifyRequest<'_>,
    ) -> Result<VerifyResponse, FacilitatorError> {
        post_json(
            &self.client,
            &self.verify_url,
            &self.headers,
            "POST /verify",
            request,
        )
        .await
    }

    /// Sends a `POST /settle` request to the facilitator.
    pub async fn settle(
        &self,
        request: &SettleRequest<'_>,
    ) -> Result<SettleResponse, FacilitatorError> {
        post_json(
            &self.client,
            &self.settle_url,
            &self.headers,
            "POST /settle",
            request,
        )
        .await
    }

    /// Fetches the payment kinds this facilitator supports.
    ///
    /// Responses are cached with a configurable TTL (default: 10 minutes).
    pub async fn supported(&self) -> Result<SupportedResponse, FacilitatorError> {
        if let Some(response) = self.supported_cache.get().await {
            return Ok(response);
        }
        let response: SupportedResponse = get_json(
            &self.client,
            &self.supported_url,
            &self.headers,
            "GET /supported",
        )
        .await?;
        self.supported_cache.set(response.clone()).await;
        Ok(response)
    }

    /// Queries the facilitator's resource directory.
    pub async fn discover_resources(
        &self,
        params: &DiscoveryParams,
    ) -> Result<DiscoveryResponse, FacilitatorError> {
        let mut url = self.discovery_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(resource_type) = &params.resource_type {
                pairs.append_pair("type", resource_type);
            }
            if let Some(limit) = params.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            if let Some(offset) = params.offset {
                pairs.append_pair("offset", &offset.to_string());
            }
        }
        get_json(
            &self.client,
            &url,
            &self.headers,
            "GET /discovery/resources",
        )
        .await
    }
}

impl Facilitator for DirectFacilitator {
    async fn verify(&self, request: &VerifyRequest<'_>) -> Result<VerifyResponse, FacilitatorError> {
        DirectFacilitator::verify(self, request).await
    }

    async fn settle(&self, request: &SettleRequest<'_>) -> Result<SettleResponse, FacilitatorError> {
        DirectFacilitator::settle(self, request).await
    }
}

impl TryFrom<&str> for DirectFacilitator {
    type Error = FacilitatorError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        // Normalize: strip trailing slashes and add a single trailing slash
        let mut normalized = value.trim_end_matches('/').to_string();
        normalized.push('/');
        let url = Url::parse(&normalized).map_err(|e| FacilitatorError::UrlParse {
            context: "Failed to parse base url",
            source: e,
        })?;
        DirectFacilitator::try_new(url)
    }
}

impl TryFrom<String> for DirectFacilitator {
    type Error = FacilitatorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DirectFacilitator::try_from(value.as_str())
    }
}

/// Body of a verify or settle request in aggregator mode.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregatorRequest {
    /// Base64 of the JSON-encoded payment payload.
    payment_header: String,
    source_network: String,
    destination_network: String,
    /// Human-decimal amount with exactly six fractional digits.
    expected_amount: String,
    expected_token: String,
    recipient_address: String,
    priority: String,
}

/// Envelope every aggregator response arrives in. A response without `data`
/// is malformed.
#[derive(Debug, serde::Deserialize)]
struct AggregatorEnvelope {
    #[serde(default)]
    data: Option<AggregatorData>,
}

/// Inner aggregator response fields. All lenient: an absent flag reads as
/// false, an absent field as None.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregatorData {
    #[serde(default)]
    valid: bool,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    settled: bool,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    tx_hash: Option<String>,
}

/// Renders an atomic USDC amount with exactly six fractional digits, the
/// shape aggregator services expect.
fn six_decimal_amount(atomic: &str) -> String {
    let padded = format!("{atomic:0>7}");
    let (int, frac) = padded.split_at(padded.len() - 6);
    format!("{int}.{frac}")
}

/// A client for aggregator-style routing services.
///
/// Verify and settle post the same request shape, but to distinct
/// `./verify` and `./settle` paths under the configured base URL; the
/// envelope coming back is the same for both.
#[derive(Clone, Debug)]
pub struct AggregatorFacilitator {
    base_url: Url,
    verify_url: Url,
    settle_url: Url,
    api_key: Option<String>,
    client: Client,
}

impl AggregatorFacilitator {
    /// Constructs a client from the aggregator's base URL, precomputing the
    /// `./verify` and `./settle` endpoint URLs.
    pub fn try_new(base_url: Url, api_key: Option<String>) -> Result<Self, FacilitatorError> {
        let mut base_url = base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let verify_url = base_url
            .join("./verify")
            .map_err(|e| FacilitatorError::UrlParse {
                context: "Failed to construct aggregator ./verify URL",
                source: e,
            })?;
        let settle_url = base_url
            .join("./settle")
            .map_err(|e| FacilitatorError::UrlParse {
                context: "Failed to construct aggregator ./settle URL",
                source: e,
            })?;
        Ok(Self {
            base_url,
            verify_url,
            settle_url,
            api_key,
            client: Client::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn verify_url(&self) -> &Url {
        &self.verify_url
    }

    pub fn settle_url(&self) -> &Url {
        &self.settle_url
    }

    fn build_request(
        request: &VerifyRequest<'_>,
        context: &'static str,
    ) -> Result<AggregatorRequest, FacilitatorError> {
        let payload_json = serde_json::to_vec(request.payment_payload)
            .map_err(|e| FacilitatorError::Serialize { context, source: e })?;
        let network = request.payment_payload.network.as_str().to_string();
        Ok(AggregatorRequest {
            payment_header: Base64Bytes::encode(payload_json).to_string(),
            source_network: network.clone(),
            destination_network: network,
            expected_amount: six_decimal_amount(
                &request.payment_requirements.max_amount_required,
            ),
            expected_token: "USDC".to_string(),
            recipient_address: request.payment_requirements.pay_to.to_string(),
            priority: "balanced".to_string(),
        })
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            if let Ok(value) = api_key.parse() {
                headers.insert("x-api-key", value);
            }
        }
        headers
    }

    async fn post(
        &self,
        url: &Url,
        request: &VerifyRequest<'_>,
        context: &'static str,
    ) -> Result<AggregatorData, FacilitatorError> {
        let body = Self::build_request(request, context)?;
        let envelope: AggregatorEnvelope =
            post_json(&self.client, url, &self.headers(), context, &body).await?;
        envelope
            .data
            .ok_or(FacilitatorError::MalformedResponse { context })
    }
}

impl Facilitator for AggregatorFacilitator {
    /// Verifies through the aggregator and normalizes the envelope into a
    /// standard [`VerifyResponse`].
    async fn verify(&self, request: &VerifyRequest<'_>) -> Result<VerifyResponse, FacilitatorError> {
        let data = self
            .post(&self.verify_url, request, "POST aggregator /verify")
            .await?;
        if data.valid {
            Ok(VerifyResponse::Valid {
                payer: data.from.unwrap_or_default(),
            })
        } else {
            Ok(VerifyResponse::Invalid {
                reason: "Payment validation failed".to_string(),
                payer: data.from,
            })
        }
    }

    /// Settles through the aggregator. Either `success` or `settled` counts
    /// as settled.
    async fn settle(&self, request: &SettleRequest<'_>) -> Result<SettleResponse, FacilitatorError> {
        let network = request.payment_payload.network.to_string();
        let data = self
            .post(&self.settle_url, request, "POST aggregator /settle")
            .await?;
        if data.success || data.settled {
            Ok(SettleResponse::Success {
                payer: data.from.unwrap_or_default(),
                transaction: data.tx_hash.unwrap_or_default(),
                network,
            })
        } else {
            Ok(SettleResponse::Error {
                reason: "Settlement failed".to_string(),
                network,
            })
        }
    }
}

/// Which backend carries verify and settle traffic.
#[derive(Clone, Debug)]
enum FacilitatorBackend {
    Direct(DirectFacilitator),
    Aggregator(AggregatorFacilitator),
}

/// Routes verify/settle to one backend, chosen once at construction.
///
/// Directory traffic (`supported`, `discovery/resources`) always goes to the
/// direct facilitator: aggregators have no such endpoints.
#[derive(Clone, Debug)]
pub struct FacilitatorRouter {
    backend: FacilitatorBackend,
    directory: DirectFacilitator,
}

impl FacilitatorRouter {
    /// Routes everything to the direct facilitator.
    pub fn direct(facilitator: DirectFacilitator) -> Self {
        Self {
            backend: FacilitatorBackend::Direct(facilitator.clone()),
            directory: facilitator,
        }
    }

    /// Routes verify/settle to the aggregator; directory traffic still goes
    /// to the direct facilitator.
    pub fn aggregator(aggregator: AggregatorFacilitator, directory: DirectFacilitator) -> Self {
        Self {
            backend: FacilitatorBackend::Aggregator(aggregator),
            directory,
        }
    }

    pub fn is_aggregator(&self) -> bool {
        matches!(self.backend, FacilitatorBackend::Aggregator(_))
    }

    pub async fn supported(&self) -> Result<SupportedResponse, FacilitatorError> {
        self.directory.supported().await
    }

    pub async fn discover_resources(
        &self,
        params: &DiscoveryParams,
    ) -> Result<DiscoveryResponse, FacilitatorError> {
        self.directory.discover_resources(params).await
    }
}

impl Facilitator for FacilitatorRouter {
    async fn verify(&self, request: &VerifyRequest<'_>) -> Result<VerifyResponse, FacilitatorError> {
        match &self.backend {
            FacilitatorBackend::Direct(f) => f.verify(request).await,
            FacilitatorBackend::Aggregator(f) => Facilitator::verify(f, request).await,
        }
    }

    async fn settle(&self, request: &SettleRequest<'_>) -> Result<SettleResponse, FacilitatorError> {
        match &self.backend {
            FacilitatorBackend::Direct(f) => f.settle(request).await,
            FacilitatorBackend::Aggregator(f) => Facilitator::settle(f, request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Address;
    use crate::networks::SolanaNetwork;
    use crate::proto::{
        ExactSolanaPayload, PaymentPayload, PaymentRequirement, PaymentScheme, X402Version1,
    };
    use std::str::FromStr;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payload() -> PaymentPayload {
        PaymentPayload {
            x402_version: X402Version1,
            scheme: PaymentScheme::Exact,
            network: SolanaNetwork::Mainnet,
            payload: ExactSolanaPayload {
                transaction: "AQID".to_string(),
            },
        }
    }

    fn requirement() -> PaymentRequirement {
        PaymentRequirement {
            scheme: PaymentScheme::Exact,
            network: SolanaNetwork::Mainnet,
            max_amount_required: "10000".to_string(),
            resource: "https://example.com/article".to_string(),
            description: "An article".to_string(),
            mime_type: "application/json".to_string(),
            output_schema: None,
            pay_to: Address::from_str("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").unwrap(),
            max_timeout_seconds: 60,
            asset: Address::from_str("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU").unwrap(),
            extra: None,
        }
    }

    #[test]
    fn six_decimal_amount_pads_and_splits() {
        assert_eq!(six_decimal_amount("10000"), "0.010000");
        assert_eq!(six_decimal_amount("1000000"), "1.000000");
        assert_eq!(six_decimal_amount("1"), "0.000001");
        assert_eq!(six_decimal_amount("2500000000"), "2500.000000");
    }

    #[test]
    fn endpoint_urls_are_joined_once() {
        let client = DirectFacilitator::try_from("https://facilitator.example/api").unwrap();
        assert_eq!(client.verify_url().as_str(), "https://facilitator.example/api/verify");
        assert_eq!(client.settle_url().as_str(), "https://facilitator.example/api/settle");

        // Trailing slashes collapse to one.
        let client = DirectFacilitator::try_from("https://facilitator.example///").unwrap();
        assert_eq!(client.verify_url().as_str(), "https://facilitator.example/verify");
    }

    #[tokio::test]
    async fn direct_verify_parses_valid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .and(body_partial_json(serde_json::json!({
                "paymentPayload": { "x402Version": 1 },
                "paymentRequirements": { "maxAmountRequired": "10000" },
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"isValid": true, "payer": "abc"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = DirectFacilitator::try_from(server.uri().as_str()).unwrap();
        let payload = payload();
        let requirement = requirement();
        let response = client
            .verify(&VerifyRequest {
                payment_payload: &payload,
                payment_requirements: &requirement,
            })
            .await
            .unwrap();
        assert_eq!(
            response,
            VerifyResponse::Valid {
                payer: "abc".to_string()
            }
        );
    }

    #[tokio::test]
    async fn direct_settle_parses_error_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/settle"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "errorReason": "insufficient funds",
                "network": "solana",
            })))
            .mount(&server)
            .await;

        let client = DirectFacilitator::try_from(server.uri().as_str()).unwrap();
        let payload = payload();
        let requirement = requirement();
        let response = client
            .settle(&SettleRequest {
                payment_payload: &payload,
                payment_requirements: &requirement,
            })
            .await
            .unwrap();
        assert_eq!(
            response,
            SettleResponse::Error {
                reason: "insufficient funds".to_string(),
                network: "solana".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn non_json_error_body_is_reported_as_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let client = DirectFacilitator::try_from(server.uri().as_str()).unwrap();
        let payload = payload();
        let requirement = requirement();
        let err = client
            .verify(&VerifyRequest {
                payment_payload: &payload,
                payment_requirements: &requirement,
            })
            .await
            .unwrap_err();
        match err {
            FacilitatorError::HttpStatus { status, body, .. } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn supported_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/supported"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "kinds": [{"x402Version": 1, "scheme": "exact", "network": "solana"}],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = DirectFacilitator::try_from(server.uri().as_str()).unwrap();
        let first = client.supported().await.unwrap();
        let second = client.supported().await.unwrap();
        assert_eq!(first.kinds.len(), 1);
        assert_eq!(second.kinds[0].scheme, "exact");
    }

    #[tokio::test]
    async fn discovery_passes_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/discovery/resources"))
            .and(wiremock::matchers::query_param("limit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "x402Version": 1,
                "items": [],
                "pagination": {"limit": 5, "offset": 0, "total": 0},
            })))
            .mount(&server)
            .await;

        let client = DirectFacilitator::try_from(server.uri().as_str()).unwrap();
        let response = client
            .discover_resources(&DiscoveryParams {
                limit: Some(5),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(response.items.is_empty());
        assert_eq!(response.pagination.limit, 5);
    }

    #[tokio::test]
    async fn aggregator_verify_normalizes_valid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .and(header("x-api-key", "secret"))
            .and(body_partial_json(serde_json::json!({
                "sourceNetwork": "solana",
                "destinationNetwork": "solana",
                "expectedAmount": "0.010000",
                "expectedToken": "USDC",
                "recipientAddress": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
                "priority": "balanced",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"valid": true, "from": "payer1"},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = AggregatorFacilitator::try_new(
            server.uri().parse().unwrap(),
            Some("secret".to_string()),
        )
        .unwrap();
        let payload = payload();
        let requirement = requirement();
        let response = Facilitator::verify(
            &client,
            &VerifyRequest {
                payment_payload: &payload,
                payment_requirements: &requirement,
            },
        )
        .await
        .unwrap();
        assert_eq!(
            response,
            VerifyResponse::Valid {
                payer: "payer1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn aggregator_rejection_becomes_invalid_with_fixed_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": {"valid": false}})),
            )
            .mount(&server)
            .await;

        let client = AggregatorFacilitator::try_new(server.uri().parse().unwrap(), None).unwrap();
        let payload = payload();
        let requirement = requirement();
        let response = Facilitator::verify(
            &client,
            &VerifyRequest {
                payment_payload: &payload,
                payment_requirements: &requirement,
            },
        )
        .await
        .unwrap();
        assert_eq!(
            response,
            VerifyResponse::Invalid {
                reason: "Payment validation failed".to_string(),
                payer: None,
            }
        );
    }

    #[tokio::test]
    async fn aggregator_response_without_data_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let client = AggregatorFacilitator::try_new(server.uri().parse().unwrap(), None).unwrap();
        let payload = payload();
        let requirement = requirement();
        let err = Facilitator::verify(
            &client,
            &VerifyRequest {
                payment_payload: &payload,
                payment_requirements: &requirement,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FacilitatorError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn aggregator_settled_flag_counts_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/settle"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"settled": true, "from": "payer1", "txHash": "sig123"},
            })))
            .mount(&server)
            .await;

        let client = AggregatorFacilitator::try_new(server.uri().parse().unwrap(), None).unwrap();
        let payload = payload();
        let requirement = requirement();
        let response = Facilitator::settle(
            &client,
            &SettleRequest {
                payment_payload: &payload,
                payment_requirements: &requirement,
            },
        )
        .await
        .unwrap();
        assert_eq!(
            response,
            SettleResponse::Success {
                payer: "payer1".to_string(),
                transaction: "sig123".to_string(),
                network: "solana".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn aggregator_settle_posts_to_the_settle_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": {"valid": true}})),
            )
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/settle"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"success": true, "from": "payer1", "txHash": "sig123"},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = AggregatorFacilitator::try_new(server.uri().parse().unwrap(), None).unwrap();
        assert!(client.settle_url().as_str().ends_with("/settle"));
        let payload = payload();
        let requirement = requirement();
        let response = Facilitator::settle(
            &client,
            &SettleRequest {
                payment_payload: &payload,
                payment_requirements: &requirement,
            },
        )
        .await
        .unwrap();
        assert!(matches!(response, SettleResponse::Success { .. }));
    }

    #[tokio::test]
    async fn router_sends_verify_to_the_selected_backend_only() {
        let direct_server = MockServer::start().await;
        let aggregator_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/verify"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"isValid": true, "payer": "abc"})),
            )
            .expect(0)
            .mount(&direct_server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"valid": true, "from": "payer1"},
            })))
            .expect(1)
            .mount(&aggregator_server)
            .await;

        let router = FacilitatorRouter::aggregator(
            AggregatorFacilitator::try_new(aggregator_server.uri().parse().unwrap(), None).unwrap(),
            DirectFacilitator::try_from(direct_server.uri().as_str()).unwrap(),
        );
        assert!(router.is_aggregator());

        let payload = payload();
        let requirement = requirement();
        let response = router
            .verify(&VerifyRequest {
                payment_payload: &payload,
                payment_requirements: &requirement,
            })
            .await
            .unwrap();
        assert_eq!(
            response,
            VerifyResponse::Valid {
                payer: "payer1".to_string()
            }
        );
    }
}
