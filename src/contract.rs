//! Declarative endpoint contracts.
//!
//! An [`EndpointContract`] describes one HTTP request and the outcome it is
//! expected to produce: which status codes are acceptable, which JSON fields
//! must hold which values, and (optionally) how quickly the response must
//! arrive. It is the data-driven replacement for a hand-written test method.
//!
//! Contracts are built through [`ContractBuilder`], which validates
//! everything that could otherwise fail mid-run (base URL, relative path,
//! header names and values, status codes). Once built, a contract is
//! immutable: fields are private and only exposed through accessors, so a
//! contract can be cloned into concurrent tasks without any shared mutable
//! state.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assertion::FieldAssertion;
use crate::error::{ContractError, Result};

// ── HTTP method ───────────────────────────────────────────────────────

/// HTTP verbs a contract may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl HttpMethod {
    /// Canonical upper-case verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Expected status ───────────────────────────────────────────────────

/// The status code(s) a contract accepts.
///
/// Different endpoints of the same service answer a missing or invalid
/// token with 401, 403 or 502. That divergence is kept per contract:
/// a contract either names one exact status or a set of acceptable ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpectedStatus {
    /// Exactly this status.
    Exact(u16),
    /// Any member of this set.
    AnyOf(Vec<u16>),
}

impl ExpectedStatus {
    /// True when `status` satisfies the expectation.
    pub fn matches(&self, status: u16) -> bool {
        match self {
            ExpectedStatus::Exact(code) => *code == status,
            ExpectedStatus::AnyOf(codes) => codes.contains(&status),
        }
    }

    fn codes(&self) -> &[u16] {
        match self {
            ExpectedStatus::Exact(code) => std::slice::from_ref(code),
            ExpectedStatus::AnyOf(codes) => codes,
        }
    }
}

impl Default for ExpectedStatus {
    fn default() -> Self {
        ExpectedStatus::Exact(200)
    }
}

impl From<u16> for ExpectedStatus {
    fn from(code: u16) -> Self {
        ExpectedStatus::Exact(code)
    }
}

impl fmt::Display for ExpectedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedStatus::Exact(code) => write!(f, "{code}"),
            ExpectedStatus::AnyOf(codes) => {
                let joined: Vec<String> = codes.iter().map(u16::to_string).collect();
                write!(f, "one of [{}]", joined.join(", "))
            }
        }
    }
}

// ── Contract ──────────────────────────────────────────────────────────

/// One HTTP scenario and its expected outcome.
#[derive(Debug, Clone)]
pub struct EndpointContract {
    name: String,
    description: Option<String>,
    base_url: String,
    path: String,
    url: String,
    method: HttpMethod,
    query: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    body: Option<Value>,
    expected_status: ExpectedStatus,
    assertions: Vec<FieldAssertion>,
    max_response_time: Option<Duration>,
}

impl EndpointContract {
    /// Starts building a contract for `path` relative to `base_url`.
    pub fn builder(
        name: impl Into<String>,
        base_url: impl Into<String>,
        path: impl Into<String>,
    ) -> ContractBuilder {
        ContractBuilder {
            name: name.into(),
            description: None,
            base_url: base_url.into(),
            path: path.into(),
            method: HttpMethod::Get,
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
            expected_status: ExpectedStatus::default(),
            assertions: Vec::new(),
            max_response_time: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// `base_url` and `path` joined with exactly one `/` between them.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Query parameters, sent URL-encoded. Order is irrelevant.
    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    /// Headers, sent verbatim.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// True when an `Authorization` header is attached.
    pub fn is_authenticated(&self) -> bool {
        self.headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case(AUTHORIZATION.as_str()))
    }

    /// Optional JSON request body.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn expected_status(&self) -> &ExpectedStatus {
        &self.expected_status
    }

    /// Body assertions in declared (evaluation) order.
    pub fn assertions(&self) -> &[FieldAssertion] {
        &self.assertions
    }

    /// Latency budget checked after the response arrives.
    pub fn max_response_time(&self) -> Option<Duration> {
        self.max_response_time
    }
}

/// Validating builder for [`EndpointContract`].
#[derive(Debug, Clone)]
#[must_use]
pub struct ContractBuilder {
    name: String,
    description: Option<String>,
    base_url: String,
    path: String,
    method: HttpMethod,
    query: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    body: Option<Value>,
    expected_status: ExpectedStatus,
    assertions: Vec<FieldAssertion>,
    max_response_time: Option<Duration>,
}

impl ContractBuilder {
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Adds a header. A later header with the same name (compared
    /// case-insensitively) replaces the earlier one.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
        self
    }

    /// Shorthand for `Authorization: Bearer <token>`.
    pub fn bearer_token(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.header(AUTHORIZATION.as_str(), value)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn expect_status(mut self, expected: impl Into<ExpectedStatus>) -> Self {
        self.expected_status = expected.into();
        self
    }

    /// Accept any of the given statuses.
    pub fn expect_any_status(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.expected_status = ExpectedStatus::AnyOf(codes.into_iter().collect());
        self
    }

    pub fn assert(mut self, assertion: FieldAssertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    pub fn max_response_time(mut self, budget: Duration) -> Self {
        self.max_response_time = Some(budget);
        self
    }

    /// Validates and freezes the contract.
    ///
    /// # Errors
    ///
    /// `ContractError::InvalidContract` when the name is empty, the base URL
    /// is missing or not http(s), the path is not a plain relative path, a
    /// header name or value cannot be sent, or the expected status set is
    /// empty or holds a code outside 100..=599.
    pub fn build(self) -> Result<EndpointContract> {
        let fail = |message: String| ContractError::InvalidContract {
            name: self.name.clone(),
            message,
        };

        if self.name.trim().is_empty() {
            return Err(fail("contract name must not be empty".to_string()));
        }

        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(fail("base URL is not set".to_string()));
        }
        let parsed = reqwest::Url::parse(base_url)
            .map_err(|e| fail(format!("base URL '{base_url}' is invalid: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(fail(format!(
                "base URL '{base_url}' must use http or https"
            )));
        }

        validate_relative_path(&self.path).map_err(fail)?;

        for (name, value) in &self.headers {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| fail(format!("invalid header name '{name}'")))?;
            HeaderValue::from_str(value)
                .map_err(|_| fail(format!("invalid value for header '{name}'")))?;
        }

        let codes = self.expected_status.codes();
        if codes.is_empty() {
            return Err(fail("expected status set is empty".to_string()));
        }
        if let Some(bad) = codes.iter().find(|c| !(100..=599).contains(*c)) {
            return Err(fail(format!("expected status {bad} is not an HTTP status")));
        }

        let url = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        );

        Ok(EndpointContract {
            name: self.name,
            description: self.description,
            base_url: base_url.to_string(),
            path: self.path,
            url,
            method: self.method,
            query: self.query,
            headers: self.headers,
            body: self.body,
            expected_status: self.expected_status,
            assertions: self.assertions,
            max_response_time: self.max_response_time,
        })
    }
}

/// Query strings and fragments belong in `query`, and absolute URLs in
/// `base_url`; the path itself is only the relative resource location.
fn validate_relative_path(path: &str) -> std::result::Result<(), String> {
    if path.contains("://") || path.starts_with("//") {
        return Err(format!("path '{path}' must be relative, not an absolute URL"));
    }
    if path.contains('?') || path.contains('#') {
        return Err(format!(
            "path '{path}' must not carry a query string or fragment"
        ));
    }
    if path.chars().any(char::is_whitespace) {
        return Err(format!("path '{path}' must not contain whitespace"));
    }
    Ok(())
}
