//! Reports produced by running a retriable test.

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::classify::BoxError;
use crate::error::RetriableResult;

/// How one attempt was reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum AttemptStatus {
    /// The attempt passed
    Passed,
    /// The attempt failed, but more attempts follow
    Aborted(String),
    /// The attempt failed after the quota was met; the failure is swallowed
    Tolerated(String),
    /// The attempt failed and the failure was propagated
    Failed(String),
    /// The attempt did not run
    Skipped(String),
}

impl AttemptStatus {
    /// Whether the attempt body ran
    pub fn executed(&self) -> bool {
        !matches!(self, Self::Skipped(_))
    }
}

/// One attempt as seen by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    /// 1-based attempt number
    pub attempt: u32,
    /// Rendered display name
    pub display_name: String,
    /// How the attempt was reported
    pub status: AttemptStatus,
}

/// Counters collected while running an invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvocationMetrics {
    /// Attempts produced, including skipped ones
    pub attempts: u32,
    /// Attempts whose body ran
    pub executed: u32,
    /// Passing attempts
    pub successes: u32,
    /// Failures that were retried or tolerated
    pub retriable_failures: u32,
    /// Attempts that did not run
    pub skipped: u32,
}

impl InvocationMetrics {
    /// Create new metrics with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one attempt record
    pub fn observe(&mut self, status: &AttemptStatus) {
        self.attempts += 1;
        match status {
            AttemptStatus::Passed => self.successes += 1,
            AttemptStatus::Aborted(_) | AttemptStatus::Tolerated(_) => self.retriable_failures += 1,
            AttemptStatus::Failed(_) => {}
            AttemptStatus::Skipped(_) => self.skipped += 1,
        }
        if status.executed() {
            self.executed += 1;
        }
    }

    /// Fraction of executed attempts that passed
    pub fn pass_rate(&self) -> f64 {
        if self.executed == 0 {
            0.0
        } else {
            f64::from(self.successes) / f64::from(self.executed)
        }
    }
}

impl fmt::Display for InvocationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvocationMetrics {{ attempts: {}, executed: {}, successes: {}, retriable_failures: {}, skipped: {} }}",
            self.attempts, self.executed, self.successes, self.retriable_failures, self.skipped
        )
    }
}

/// Why an invocation failed
#[derive(Debug)]
pub enum FailureCause {
    /// An attempt error was propagated
    Attempt(BoxError),
    /// Attempts ran out below the success quota
    QuotaUnreachable {
        /// Passing attempts observed
        successes: u32,
        /// Passing attempts required
        required: u32,
    },
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attempt(err) => write!(f, "{err}"),
            Self::QuotaUnreachable { successes, required } => write!(
                f,
                "only {successes} of the required {required} successful attempt(s) can be reached"
            ),
        }
    }
}

/// Overall outcome of one invocation
#[derive(Debug)]
pub enum InvocationVerdict {
    /// The success quota was met
    Passed,
    /// The invocation failed
    Failed(FailureCause),
}

impl InvocationVerdict {
    /// Whether the invocation passed
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl Serialize for InvocationVerdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Passed => {
                let mut state = serializer.serialize_struct("InvocationVerdict", 1)?;
                state.serialize_field("outcome", "passed")?;
                state.end()
            }
            Self::Failed(cause) => {
                let mut state = serializer.serialize_struct("InvocationVerdict", 2)?;
                state.serialize_field("outcome", "failed")?;
                state.serialize_field("reason", &cause.to_string())?;
                state.end()
            }
        }
    }
}

/// Everything that happened during one invocation
#[derive(Debug, Serialize)]
pub struct InvocationReport {
    /// Logical name of the test
    pub display_name: String,
    /// Parameter-set index, `None` for plain tests
    pub invocation_index: Option<u32>,
    /// Rendered arguments of the parameter set
    pub arguments: Vec<String>,
    /// Attempts in order
    pub attempts: Vec<AttemptRecord>,
    /// Counters over `attempts`
    pub metrics: InvocationMetrics,
    /// Overall outcome
    pub verdict: InvocationVerdict,
}

impl InvocationReport {
    /// Whether the invocation passed
    pub fn passed(&self) -> bool {
        self.verdict.is_passed()
    }

    /// The propagated attempt error, if any
    pub fn error(&self) -> Option<&BoxError> {
        match &self.verdict {
            InvocationVerdict::Failed(FailureCause::Attempt(err)) => Some(err),
            _ => None,
        }
    }

    /// Display names of every attempt, in order
    pub fn display_names(&self) -> Vec<&str> {
        self.attempts.iter().map(|record| record.display_name.as_str()).collect()
    }

    /// Serialize the report as pretty JSON
    pub fn to_json(&self) -> RetriableResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Reports for every parameter set of a data-driven test
#[derive(Debug, Serialize)]
pub struct ParameterizedReport {
    /// One report per parameter set, in order
    pub invocations: Vec<InvocationReport>,
}

impl ParameterizedReport {
    /// Whether every parameter set passed
    pub fn passed(&self) -> bool {
        self.invocations.iter().all(InvocationReport::passed)
    }

    /// Reports of the parameter sets that failed
    pub fn failures(&self) -> Vec<&InvocationReport> {
        self.invocations.iter().filter(|report| !report.passed()).collect()
    }

    /// Serialize the report as pretty JSON
    pub fn to_json(&self) -> RetriableResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::AssertionFailure;

    /// Validates `InvocationMetrics::observe` behavior for the mixed status
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms each status lands in the right counter.
    /// - Confirms the pass rate only counts executed attempts.
    #[test]
    fn metrics_count_statuses() {
        let mut metrics = InvocationMetrics::new();
        for status in [
            AttemptStatus::Aborted("x".into()),
            AttemptStatus::Passed,
            AttemptStatus::Tolerated("y".into()),
            AttemptStatus::Skipped("quota met".into()),
        ] {
            metrics.observe(&status);
        }
        assert_eq!(metrics.attempts, 4);
        assert_eq!(metrics.executed, 3);
        assert_eq!(metrics.successes, 1);
        assert_eq!(metrics.retriable_failures, 2);
        assert_eq!(metrics.skipped, 1);
        assert!((metrics.pass_rate() - 1.0 / 3.0).abs() < f64::EPSILON);
        assert!(metrics.to_string().contains("skipped: 1"));
    }

    /// Validates `InvocationReport::to_json` behavior for the failed
    /// invocation scenario.
    ///
    /// Assertions:
    /// - Confirms statuses serialize with a tag and detail.
    /// - Confirms the verdict carries the failure reason.
    #[test]
    fn report_serializes_to_json() {
        let report = InvocationReport {
            display_name: "login".into(),
            invocation_index: None,
            arguments: Vec::new(),
            attempts: vec![AttemptRecord {
                attempt: 1,
                display_name: "login".into(),
                status: AttemptStatus::Failed("assertion failed: nope".into()),
            }],
            metrics: InvocationMetrics::default(),
            verdict: InvocationVerdict::Failed(FailureCause::Attempt(Box::new(AssertionFailure::new("nope")))),
        };

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["attempts"][0]["status"]["status"], "failed");
        assert_eq!(json["verdict"]["outcome"], "failed");
        assert_eq!(json["verdict"]["reason"], "assertion failed: nope");
        assert!(report.error().is_some());
        assert!(!report.passed());
    }
}
