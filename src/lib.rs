//! Declarative HTTP contract verification for REST endpoints.
//!
//! An [`EndpointContract`](contract::EndpointContract) describes one request
//! (method, path, query, headers) and what its response must look like
//! (acceptable status codes, JSON field assertions, latency budget). The
//! [`ContractRunner`](runner::ContractRunner) sends the request exactly once
//! through an injected transport and evaluates every expectation, collecting
//! all failures into a [`Verdict`](verdict::Verdict).
//!
//! # Modules
//!
//! - [`assertion`] — Field assertions and their evaluation.
//! - [`client`] — HTTP transport seam and the reqwest implementation.
//! - [`config`] — TOML suite files with environment interpolation.
//! - [`contract`] — Contract model and validating builder.
//! - [`error`] — Typed error hierarchy.
//! - [`json_path`] — Dotted/indexed path expressions.
//! - [`logging`] — `tracing` subscriber setup.
//! - [`report`] — Run summary.
//! - [`response`] — Observed response with lazily parsed body.
//! - [`runner`] — Single-contract execution and concurrent suite runs.
//! - [`verdict`] — Per-contract outcome and failures.
//!
//! # Quick Start
//!
//! ```ignore
//! use endpoint_contracts::assertion::{AssertionKind, FieldAssertion};
//! use endpoint_contracts::client::{ReqwestTransport, TransportConfig};
//! use endpoint_contracts::contract::EndpointContract;
//! use endpoint_contracts::runner::ContractRunner;
//!
//! let contract = EndpointContract::builder("items", base_url, "/items")
//!     .bearer_token(token)
//!     .query("page", "1")
//!     .assert(FieldAssertion::new("results", AssertionKind::ListNotEmpty)?)
//!     .build()?;
//! let runner = ContractRunner::new(ReqwestTransport::new(&TransportConfig::default())?);
//! let verdict = runner.execute(&contract).await;
//! assert!(verdict.passed());
//! ```

pub mod assertion;
pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod json_path;
pub mod logging;
pub mod report;
pub mod response;
pub mod runner;
pub mod verdict;
