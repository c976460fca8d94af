//! Run summary: counts plus a plain-text listing of every verdict.

use std::fmt;

use crate::verdict::{Outcome, Verdict};

/// Aggregated view of one suite run.
#[derive(Debug)]
pub struct Summary<'a> {
    verdicts: &'a [Verdict],
    passed: usize,
    failed: usize,
    errored: usize,
}

impl<'a> Summary<'a> {
    pub fn from_verdicts(verdicts: &'a [Verdict]) -> Self {
        let count = |outcome: Outcome| verdicts.iter().filter(|v| v.outcome == outcome).count();
        Summary {
            verdicts,
            passed: count(Outcome::Passed),
            failed: count(Outcome::Failed),
            errored: count(Outcome::Error),
        }
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn errored(&self) -> usize {
        self.errored
    }

    /// True when no contract failed or errored.
    pub fn success(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for verdict in self.verdicts {
            write!(f, "{:<5} {}", verdict.outcome.to_string(), verdict.contract)?;
            if let (Some(status), Some(ms)) = (verdict.status, verdict.elapsed_ms) {
                write!(f, " ({status}, {ms}ms)")?;
            }
            writeln!(f)?;
            for failure in &verdict.failures {
                writeln!(f, "      - {}: {}", failure.check, failure.reason)?;
            }
            if let Some(error) = &verdict.error {
                writeln!(f, "      - {error}")?;
            }
        }
        write!(
            f,
            "\n{} contract(s): {} passed, {} failed, {} errored",
            self.verdicts.len(),
            self.passed,
            self.failed,
            self.errored
        )
    }
}
