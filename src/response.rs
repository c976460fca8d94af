//! The observed outcome of one dispatched request.

use std::sync::OnceLock;
use std::time::Duration;

use serde_json::Value;

/// Status, latency and body of a single response.
///
/// The body is parsed as JSON lazily, on the first assertion that needs a
/// parsed tree, and the outcome (tree or parse error) is cached so a
/// contract with many field assertions parses at most once. Assertions that
/// only inspect the raw text never trigger a parse.
#[derive(Debug)]
pub struct ExecutionResult {
    status: u16,
    elapsed: Duration,
    raw_body: String,
    parsed: OnceLock<Result<Value, String>>,
}

impl ExecutionResult {
    pub fn new(status: u16, elapsed: Duration, body: &[u8]) -> Self {
        ExecutionResult {
            status,
            elapsed,
            raw_body: String::from_utf8_lossy(body).into_owned(),
            parsed: OnceLock::new(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Wall-clock time from dispatch to full body receipt.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }

    /// The parsed body, or the parser's message when the body is not JSON.
    pub fn json(&self) -> Result<&Value, &str> {
        self.parsed
            .get_or_init(|| serde_json::from_str(&self.raw_body).map_err(|e| e.to_string()))
            .as_ref()
            .map_err(String::as_str)
    }
}
