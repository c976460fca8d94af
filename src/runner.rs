//! The contract runner: one request, then collect-all evaluation.
//!
//! [`ContractRunner::execute`] performs a single synchronous-looking cycle:
//!
//! 1. Build a [`PreparedRequest`] from the contract.
//! 2. Dispatch it once through the injected [`HttpTransport`].
//! 3. Evaluate every check against the response and fold the failures into
//!    a [`Verdict`].
//!
//! Evaluation is collect-all, not fail-fast. The status check, the latency
//! budget and each body assertion are evaluated independently and in that
//! order, so one verdict lists every violated expectation. A transport error
//! short-circuits to an error verdict because there is nothing to evaluate.
//!
//! The runner holds no per-execution state. [`ContractRunner::run_suite`]
//! exploits that to run independent contracts concurrently.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::client::{HttpTransport, PreparedRequest};
use crate::contract::EndpointContract;
use crate::response::ExecutionResult;
use crate::verdict::{Check, Failure, Verdict, duration_ms};

/// Default number of contracts in flight during a suite run.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Executes contracts through a shared transport.
///
/// Cloning is cheap: clones share the transport (and therefore reqwest's
/// connection pool).
#[derive(Clone)]
pub struct ContractRunner {
    transport: Arc<dyn HttpTransport>,
}

impl ContractRunner {
    pub fn new(transport: impl HttpTransport + 'static) -> Self {
        ContractRunner {
            transport: Arc::new(transport),
        }
    }

    /// Uses a transport that is already shared elsewhere.
    pub fn with_shared(transport: Arc<dyn HttpTransport>) -> Self {
        ContractRunner { transport }
    }

    /// Executes one contract and returns its verdict.
    ///
    /// Exactly one request is sent. Transport failures are reported as an
    /// error verdict, never retried and never raised.
    pub async fn execute(&self, contract: &EndpointContract) -> Verdict {
        let span = tracing::info_span!(
            "contract",
            contract = contract.name(),
            method = %contract.method(),
            url = contract.url(),
        );

        async {
            let request = PreparedRequest::from(contract);
            let raw = match self.transport.send(&request).await {
                Ok(raw) => raw,
                Err(err) => {
                    tracing::warn!(error = %err, "request produced no response");
                    return Verdict::transport_error(contract.name(), err.to_string());
                }
            };

            let result = ExecutionResult::new(raw.status, raw.elapsed, &raw.body);
            let failures = evaluate(contract, &result);
            let verdict =
                Verdict::from_checks(contract.name(), result.status(), result.elapsed(), failures);

            if verdict.passed() {
                tracing::info!(
                    status = result.status(),
                    elapsed_ms = duration_ms(result.elapsed()),
                    "contract passed"
                );
            } else {
                tracing::warn!(
                    status = result.status(),
                    elapsed_ms = duration_ms(result.elapsed()),
                    failures = verdict.failures.len(),
                    "contract failed"
                );
            }
            verdict
        }
        .instrument(span)
        .await
    }

    /// Executes independent contracts with at most `concurrency` in flight.
    ///
    /// Verdicts are returned in the same order as `contracts`, regardless of
    /// completion order.
    pub async fn run_suite(&self, contracts: &[EndpointContract], concurrency: usize) -> Vec<Verdict> {
        let permits = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut joins = JoinSet::new();

        for (idx, contract) in contracts.iter().enumerate() {
            let runner = self.clone();
            let contract = contract.clone();
            let permits = Arc::clone(&permits);
            joins.spawn(async move {
                // The semaphore is never closed, so acquisition only fails
                // if that changes; run unthrottled in that case.
                let _permit = permits.acquire_owned().await.ok();
                (idx, runner.execute(&contract).await)
            });
        }

        let mut verdicts: Vec<Option<Verdict>> = vec![None; contracts.len()];
        while let Some(joined) = joins.join_next().await {
            match joined {
                Ok((idx, verdict)) => verdicts[idx] = Some(verdict),
                Err(err) => tracing::error!(error = %err, "contract task did not complete"),
            }
        }

        verdicts
            .into_iter()
            .zip(contracts)
            .map(|(verdict, contract)| {
                verdict.unwrap_or_else(|| {
                    Verdict::transport_error(contract.name(), "execution task aborted")
                })
            })
            .collect()
    }
}

/// Evaluates every check of `contract` against an observed response.
///
/// Order: status, latency budget, then body assertions as declared. All
/// checks run; the returned list holds one entry per violated check.
pub fn evaluate(contract: &EndpointContract, result: &ExecutionResult) -> Vec<Failure> {
    let mut failures = Vec::new();

    let expected = contract.expected_status();
    if !expected.matches(result.status()) {
        failures.push(Failure {
            check: Check::Status {
                expected: expected.clone(),
            },
            reason: format!("expected status {expected}, got {}", result.status()),
        });
    }

    if let Some(budget) = contract.max_response_time() {
        if result.elapsed() > budget {
            failures.push(Failure {
                check: Check::ResponseTime {
                    budget_ms: duration_ms(budget),
                },
                reason: format!(
                    "took {}ms, budget is {}ms",
                    duration_ms(result.elapsed()),
                    duration_ms(budget)
                ),
            });
        }
    }

    for assertion in contract.assertions() {
        if let Err(reason) = assertion.evaluate(result) {
            failures.push(Failure {
                check: Check::Body {
                    assertion: assertion.clone(),
                },
                reason,
            });
        }
    }

    failures
}
