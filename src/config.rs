//! Suite files: contracts as TOML, secrets from the environment.
//!
//! A suite file holds a `[defaults]` table and any number of
//! `[[contracts]]` entries:
//!
//! ```toml
//! [defaults]
//! base_url = "${PORTAL_BASE_URL}"
//! bearer_token = "${PORTAL_TOKEN}"
//! headers = { Content-Type = "application/json" }
//! max_response_time_ms = 3000
//!
//! [[contracts]]
//! name = "agenda tracker lists results"
//! path = "/v1/agenda-tracker"
//! query = { page = 1, limit = 10 }
//! expected_status = 200
//! assertions = [
//!   { path = "results", check = "list_not_empty" },
//!   { path = "results[0].agendaName", check = "not_null" },
//! ]
//! ```
//!
//! Resolution rules:
//! - `${VAR}` in `base_url`, `bearer_token`, `path`, header values and
//!   string query values is replaced from the environment. `$$` yields a
//!   literal `$`. An unset variable aborts loading.
//! - Contract `base_url`, `bearer_token` and `max_response_time_ms` override
//!   the defaults. Default headers and query parameters are merged with the
//!   contract's own, which win on conflict.
//! - `auth = false` sends no `Authorization` header at all (neither the
//!   token nor a default header of that name), which is how rejection paths
//!   are exercised. The token is only interpolated for contracts that use it.
//!
//! Loading validates every contract, so all configuration errors surface
//! before the first request is sent.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::Value;

use crate::assertion::{AssertionKind, FieldAssertion};
use crate::contract::{EndpointContract, ExpectedStatus, HttpMethod};
use crate::error::{ContractError, Result};

// ── File schema ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SuiteFile {
    #[serde(default)]
    defaults: Defaults,
    #[serde(default)]
    contracts: Vec<ContractSpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Defaults {
    base_url: Option<String>,
    bearer_token: Option<String>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    query: BTreeMap<String, QueryValue>,
    max_response_time_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContractSpec {
    name: String,
    description: Option<String>,
    base_url: Option<String>,
    path: String,
    #[serde(default)]
    method: HttpMethod,
    #[serde(default)]
    query: BTreeMap<String, QueryValue>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    bearer_token: Option<String>,
    #[serde(default = "default_auth")]
    auth: bool,
    body: Option<Value>,
    #[serde(default)]
    expected_status: ExpectedStatus,
    max_response_time_ms: Option<u64>,
    #[serde(default)]
    assertions: Vec<AssertionSpec>,
}

fn default_auth() -> bool {
    true
}

/// One `{ path = ..., check = ..., <operand> = ... }` entry.
///
/// Read through a raw table so that a misspelled `path` or a stray operand
/// is rejected instead of silently dropped.
#[derive(Debug, Deserialize)]
#[serde(try_from = "toml::Table")]
struct AssertionSpec {
    path: String,
    kind: AssertionKind,
}

impl TryFrom<toml::Table> for AssertionSpec {
    type Error = String;

    fn try_from(mut table: toml::Table) -> std::result::Result<Self, Self::Error> {
        let path = match table.remove("path") {
            Some(toml::Value::String(path)) => path,
            Some(other) => {
                return Err(format!("assertion `path` must be a string, got {}", other.type_str()));
            }
            None => {
                return Err(
                    "assertion is missing `path` (use path = \"\" for the whole body)".to_string(),
                );
            }
        };

        let kind: AssertionKind = toml::Value::Table(table.clone())
            .try_into()
            .map_err(|e: toml::de::Error| e.message().to_string())?;

        let operand = kind.operand_key();
        if let Some(unknown) = table
            .keys()
            .find(|key| key.as_str() != "check" && Some(key.as_str()) != operand)
        {
            let check = table.get("check").and_then(toml::Value::as_str).unwrap_or("?");
            return Err(format!(
                "unknown key `{unknown}` in `{check}` assertion on `{path}`"
            ));
        }

        Ok(AssertionSpec { path, kind })
    }
}

/// Query values may be written as TOML scalars (`page = 1`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum QueryValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

impl QueryValue {
    fn resolve(&self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<String> {
        match self {
            QueryValue::Text(text) => interpolate(text, lookup),
            QueryValue::Integer(n) => Ok(n.to_string()),
            QueryValue::Float(n) => Ok(n.to_string()),
            QueryValue::Flag(b) => Ok(b.to_string()),
        }
    }
}

// ── Suite ─────────────────────────────────────────────────────────────

/// A validated, fully resolved set of contracts.
#[derive(Debug, Clone)]
pub struct Suite {
    contracts: Vec<EndpointContract>,
}

impl Suite {
    /// Loads a suite file, resolving `${VAR}` from the process environment.
    ///
    /// # Errors
    ///
    /// `ContractError::Io` if the file cannot be read, plus everything
    /// [`Suite::from_toml_str`] reports.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Loads a suite file with a caller-supplied variable lookup.
    pub fn load_with(path: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ContractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let suite = Self::from_toml_str(&text, lookup)?;
        tracing::debug!(
            path = %path.display(),
            contracts = suite.contracts.len(),
            "loaded contract suite"
        );
        Ok(suite)
    }

    /// Parses and resolves a suite document.
    ///
    /// # Errors
    ///
    /// - `ContractError::Toml` for syntax or schema errors.
    /// - `ContractError::MissingVariable` for an unset `${VAR}`.
    /// - `ContractError::InvalidContract` for duplicate names, a missing
    ///   base URL, a malformed assertion path, or anything the contract
    ///   builder rejects.
    pub fn from_toml_str(text: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let file: SuiteFile = toml::from_str(text)?;

        let mut seen = HashSet::new();
        let mut contracts = Vec::with_capacity(file.contracts.len());
        for spec in &file.contracts {
            if !seen.insert(spec.name.as_str()) {
                return Err(ContractError::InvalidContract {
                    name: spec.name.clone(),
                    message: "duplicate contract name".to_string(),
                });
            }
            contracts.push(resolve_contract(&file.defaults, spec, &lookup)?);
        }

        Ok(Suite { contracts })
    }

    pub fn contracts(&self) -> &[EndpointContract] {
        &self.contracts
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Keeps only the named contracts, in suite order. An empty `names`
    /// selects everything.
    ///
    /// # Errors
    ///
    /// `ContractError::Config` when a name matches no contract.
    pub fn select(&self, names: &[String]) -> Result<Vec<EndpointContract>> {
        if names.is_empty() {
            return Ok(self.contracts.clone());
        }
        if let Some(unknown) = names
            .iter()
            .find(|n| !self.contracts.iter().any(|c| c.name() == n.as_str()))
        {
            return Err(ContractError::Config(format!(
                "no contract named '{unknown}' in suite"
            )));
        }
        Ok(self
            .contracts
            .iter()
            .filter(|c| names.iter().any(|n| n == c.name()))
            .cloned()
            .collect())
    }
}

fn resolve_contract(
    defaults: &Defaults,
    spec: &ContractSpec,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<EndpointContract> {
    let invalid = |message: String| ContractError::InvalidContract {
        name: spec.name.clone(),
        message,
    };

    let base_url = spec
        .base_url
        .as_deref()
        .or(defaults.base_url.as_deref())
        .ok_or_else(|| {
            invalid("base URL is not set (add base_url to [defaults] or the contract)".to_string())
        })?;
    let base_url = interpolate(base_url, lookup)?;
    let path = interpolate(&spec.path, lookup)?;

    let mut builder = EndpointContract::builder(&spec.name, base_url, path)
        .method(spec.method)
        .expect_status(spec.expected_status.clone());

    if let Some(description) = &spec.description {
        builder = builder.description(description);
    }

    for (key, value) in defaults.query.iter().chain(&spec.query) {
        builder = builder.query(key, value.resolve(lookup)?);
    }

    for (name, value) in &defaults.headers {
        if !spec.auth && name.eq_ignore_ascii_case(AUTHORIZATION.as_str()) {
            continue;
        }
        builder = builder.header(name, interpolate(value, lookup)?);
    }
    if spec.auth {
        if let Some(token) = spec.bearer_token.as_deref().or(defaults.bearer_token.as_deref()) {
            builder = builder.bearer_token(interpolate(token, lookup)?);
        }
    }
    for (name, value) in &spec.headers {
        builder = builder.header(name, interpolate(value, lookup)?);
    }

    if let Some(body) = &spec.body {
        builder = builder.body(body.clone());
    }

    if let Some(ms) = spec.max_response_time_ms.or(defaults.max_response_time_ms) {
        builder = builder.max_response_time(std::time::Duration::from_millis(ms));
    }

    for assertion in &spec.assertions {
        let parsed = FieldAssertion::new(&assertion.path, assertion.kind.clone())
            .map_err(|e| invalid(e.to_string()))?;
        builder = builder.assert(parsed);
    }

    builder.build()
}

/// Replaces `${VAR}` references. `$$` is a literal `$`; a `$` followed by
/// anything else is kept as-is.
fn interpolate(input: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
        } else if let Some(tail) = after.strip_prefix('{') {
            let end = tail.find('}').ok_or_else(|| {
                ContractError::Config(format!("unterminated '${{' in \"{input}\""))
            })?;
            let name = tail[..end].trim();
            if name.is_empty() {
                return Err(ContractError::Config(format!(
                    "empty variable reference in \"{input}\""
                )));
            }
            let value = lookup(name).ok_or_else(|| ContractError::MissingVariable(name.to_string()))?;
            out.push_str(&value);
            rest = &tail[end + 1..];
        } else {
            out.push('$');
            rest = after;
        }
    }
    out.push_str(rest);
    Ok(out)
}
