//! HTTP transport used by the contract runner.
//!
//! The runner never talks to reqwest directly. It hands a
//! [`PreparedRequest`] to an [`HttpTransport`] and gets back a
//! [`RawResponse`] (status, body bytes, elapsed time) or a
//! [`TransportError`]. Tests and alternative clients plug in at this seam.
//!
//! [`ReqwestTransport`] is the production implementation:
//! - One `reqwest::Client` is shared by every execution, so connection
//!   pooling is handled by reqwest.
//! - The connect timeout covers TCP + TLS only. The request timeout covers
//!   the whole round-trip including body download and aborts the call. It is
//!   unrelated to a contract's `max_response_time`, which is checked after
//!   the fact as an assertion.
//! - Exactly one attempt per request. No retries, no status-based error
//!   conversion: a 403 is a perfectly good response to a contract that
//!   expects one.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde_json::Value;

use crate::contract::{EndpointContract, HttpMethod};
use crate::error::{ContractError, TransportError};

/// Connect timeout for contract requests.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall per-call timeout. The original suites budget 3 seconds for the
/// slowest endpoints, so 30 seconds only trips on a hung service.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the transport needs to send one request.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl From<&EndpointContract> for PreparedRequest {
    fn from(contract: &EndpointContract) -> Self {
        PreparedRequest {
            method: contract.method(),
            url: contract.url().to_string(),
            query: contract.query().clone(),
            headers: contract.headers().clone(),
            body: contract.body().cloned(),
        }
    }
}

/// What came back over the wire.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Bytes,
    /// Dispatch to full body receipt.
    pub elapsed: Duration,
}

/// The HTTP client collaborator.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends the request once and returns the full response.
    async fn send(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError>;
}

/// Timeouts applied to the underlying reqwest client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl TransportConfig {
    /// Overrides the per-call request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// reqwest-backed [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a transport with explicit timeouts.
    ///
    /// # Errors
    ///
    /// `ContractError::Client` if the TLS backend cannot be initialised.
    pub fn new(config: &TransportConfig) -> crate::error::Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(concat!("endpoint-contracts/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ContractError::Client)?;
        Ok(ReqwestTransport { client })
    }

    /// Wraps an existing client, e.g. one with a custom proxy or root store.
    pub fn with_client(client: Client) -> Self {
        ReqwestTransport { client }
    }

    /// Attaches query, headers and optional JSON body.
    ///
    /// Headers are attached verbatim. They were validated when the contract
    /// was built, so reqwest will not reject them here.
    fn build_request(
        &self,
        request: &PreparedRequest,
    ) -> Result<reqwest::RequestBuilder, TransportError> {
        let mut req = self.client.request(request.method.into(), &request.url);
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            let encoded = serde_json::to_vec(body).map_err(TransportError::Encode)?;
            req = req.body(encoded);
            if !request
                .headers
                .keys()
                .any(|name| name.eq_ignore_ascii_case("content-type"))
            {
                req = req.header(reqwest::header::CONTENT_TYPE, "application/json");
            }
        }
        Ok(req)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError> {
        let builder = self.build_request(request)?;

        let started = Instant::now();
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        let elapsed = started.elapsed();

        Ok(RawResponse {
            status,
            body,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared() -> PreparedRequest {
        let contract = EndpointContract::builder("users", "http://localhost:5000/", "/v1/users")
            .query("page", "1")
            .query("sortBy", "createdAt:desc")
            .header("Content-Type", "application/json")
            .bearer_token("tok")
            .build()
            .unwrap();
        PreparedRequest::from(&contract)
    }

    #[test]
    fn prepared_request_copies_contract() {
        let req = prepared();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:5000/v1/users");
        assert_eq!(req.query.len(), 2);
        assert_eq!(req.headers.get("authorization").map(String::as_str), Some("Bearer tok"));
        assert!(req.body.is_none());
    }

    #[test]
    fn build_request_encodes_query_and_attaches_headers() {
        let transport = ReqwestTransport::new(&TransportConfig::default()).unwrap();
        let built = transport.build_request(&prepared()).unwrap().build().unwrap();
        assert_eq!(built.method(), reqwest::Method::GET);
        let query = built.url().query().unwrap_or_default();
        assert!(query.contains("page=1"));
        assert!(query.contains("sortBy=createdAt%3Adesc"), "query was {query}");
        assert_eq!(built.headers()["authorization"], "Bearer tok");
    }

    #[test]
    fn json_body_gets_content_type() {
        let transport = ReqwestTransport::new(&TransportConfig::default()).unwrap();
        let mut req = prepared();
        req.method = HttpMethod::Post;
        req.headers.clear();
        req.body = Some(serde_json::json!({ "name": "x" }));
        let built = transport.build_request(&req).unwrap().build().unwrap();
        assert_eq!(built.headers()["content-type"], "application/json");
        assert_eq!(built.body().and_then(|b| b.as_bytes()), Some(&br#"{"name":"x"}"#[..]));
    }

    #[test]
    fn transport_config_default_has_sane_values() {
        let config = TransportConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        let config = config.with_request_timeout(Duration::from_millis(250));
        assert_eq!(config.request_timeout, Duration::from_millis(250));
    }
}
