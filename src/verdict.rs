//! Per-contract verdicts.
//!
//! A [`Verdict`] is produced once per contract execution. Its outcome is one
//! of three categories:
//!
//! - `Passed`: status matched and every assertion held.
//! - `Failed`: a response arrived but at least one check failed. Every
//!   failing check is listed, in evaluation order (status first, then the
//!   latency budget, then body assertions in declared order).
//! - `Error`: no response arrived (connection refused, DNS, per-call
//!   timeout). The failures list is empty and `error` carries the cause.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::assertion::FieldAssertion;
use crate::contract::ExpectedStatus;

/// Which check a failure belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Check {
    /// Status code expectation.
    Status {
        /// What the contract accepted.
        expected: ExpectedStatus,
    },
    /// `max_response_time` budget.
    ResponseTime {
        /// Budget in milliseconds.
        budget_ms: u64,
    },
    /// One body assertion.
    Body {
        /// The assertion that failed.
        assertion: FieldAssertion,
    },
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Status { expected } => write!(f, "status {expected}"),
            Check::ResponseTime { budget_ms } => write!(f, "response time <= {budget_ms}ms"),
            Check::Body { assertion } => write!(f, "{assertion}"),
        }
    }
}

/// One violated check and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub check: Check,
    pub reason: String,
}

/// Overall outcome category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    Error,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Passed => "PASS",
            Outcome::Failed => "FAIL",
            Outcome::Error => "ERROR",
        })
    }
}

/// Result of executing one contract.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub contract: String,
    pub outcome: Outcome,
    /// Observed status, when a response arrived.
    pub status: Option<u16>,
    /// Observed latency in milliseconds, when a response arrived.
    pub elapsed_ms: Option<u64>,
    pub failures: Vec<Failure>,
    /// Transport error message for `Outcome::Error`.
    pub error: Option<String>,
}

impl Verdict {
    /// Builds the verdict for a response that arrived. The outcome follows
    /// from whether any failure was collected.
    pub fn from_checks(
        contract: impl Into<String>,
        status: u16,
        elapsed: Duration,
        failures: Vec<Failure>,
    ) -> Self {
        let outcome = if failures.is_empty() {
            Outcome::Passed
        } else {
            Outcome::Failed
        };
        Verdict {
            contract: contract.into(),
            outcome,
            status: Some(status),
            elapsed_ms: Some(duration_ms(elapsed)),
            failures,
            error: None,
        }
    }

    /// Builds the verdict for a request that produced no response.
    pub fn transport_error(contract: impl Into<String>, message: impl Into<String>) -> Self {
        Verdict {
            contract: contract.into(),
            outcome: Outcome::Error,
            status: None,
            elapsed_ms: None,
            failures: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }
}

/// Saturating millisecond conversion; a run will never approach `u64::MAX`.
pub(crate) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
