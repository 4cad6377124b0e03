//! Retry decision engine.
//!
//! Two operations drive a sequence:
//!
//! - [`DecisionEngine::should_run_attempt`] answers, before an attempt runs,
//!   whether it runs at all. It is pure over a [`HistorySnapshot`].
//! - [`DecisionEngine::on_attempt_completed`] classifies the attempt, appends
//!   its outcome to the history and tells the host whether the failure is
//!   swallowed, reported as an abort, or propagated.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::classify::{classify, AttemptResult, BoxError, Classification};
use crate::history::{AttemptHistory, AttemptOutcome, HistorySnapshot};
use crate::policy::RetryPolicy;

/// Whether an attempt should execute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionDecision {
    /// Run the attempt
    Enabled,
    /// The success quota is met; skip the attempt, the invocation passed
    DisabledPassed,
    /// The quota can no longer be met; skip the attempt, the invocation failed
    DisabledFailed,
}

impl ExecutionDecision {
    /// Whether the attempt runs
    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }

    /// Human readable reason for a skipped attempt
    pub fn reason(self) -> &'static str {
        match self {
            Self::Enabled => "attempt enabled",
            Self::DisabledPassed => "minimum successes reached, test passed",
            Self::DisabledFailed => "minimum successes can no longer be reached, test failed",
        }
    }
}

/// What the host does with a completed attempt
#[derive(Debug)]
pub enum CompletionAction {
    /// Proceed; a failure is reported as aborted, not failed
    Continue,
    /// Swallow the failure; the quota was already met
    Suppress,
    /// Report the failure; no further attempts follow
    Propagate(BoxError),
}

impl CompletionAction {
    /// Short label for logs and reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Suppress => "suppress",
            Self::Propagate(_) => "propagate",
        }
    }
}

/// Applies a [`RetryPolicy`] to an [`AttemptHistory`]
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    policy: Arc<RetryPolicy>,
}

impl DecisionEngine {
    /// Create an engine for the given policy
    pub fn new(policy: Arc<RetryPolicy>) -> Self {
        Self { policy }
    }

    /// The policy this engine applies
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Decide whether attempt `next_attempt` runs given the prior outcomes
    ///
    /// Failure is checked before success, so a terminated or hopeless
    /// history is reported as failed even if the quota was met earlier.
    pub fn should_run_attempt(&self, snapshot: &HistorySnapshot, next_attempt: u32) -> ExecutionDecision {
        let decision = if snapshot.terminated()
            || !self.policy.quota_reachable(snapshot.retriable_failures)
        {
            ExecutionDecision::DisabledFailed
        } else if snapshot.successes >= self.policy.min_successes() {
            ExecutionDecision::DisabledPassed
        } else {
            ExecutionDecision::Enabled
        };

        trace!(
            attempt = next_attempt,
            successes = snapshot.successes,
            retriable_failures = snapshot.retriable_failures,
            decision = ?decision,
            "Evaluated attempt execution"
        );
        decision
    }

    /// Record a completed attempt and decide what the host reports
    ///
    /// The append happens under the history's write lock, and the decision
    /// uses the snapshot returned by that append.
    pub fn on_attempt_completed(&self, history: &AttemptHistory, result: AttemptResult) -> CompletionAction {
        match classify(&result, self.policy.retriable()) {
            Classification::NoError => {
                let snapshot = history.record(AttemptOutcome::Success);
                debug!(attempt = snapshot.attempts_taken(), "Attempt passed");
                CompletionAction::Continue
            }
            Classification::NonRetriable => {
                let snapshot = history.record(AttemptOutcome::NonRetriableFailure);
                debug!(attempt = snapshot.attempts_taken(), "Attempt failed with a non-retriable error");
                propagate(result)
            }
            Classification::Retriable => {
                let snapshot = history.record(AttemptOutcome::RetriableFailure);
                let attempt = snapshot.attempts_taken();
                if snapshot.successes >= self.policy.min_successes() {
                    debug!(attempt, "Suppressing failure, minimum successes already reached");
                    CompletionAction::Suppress
                } else if self.policy.quota_reachable(snapshot.retriable_failures) {
                    debug!(
                        attempt,
                        retriable_failures = snapshot.retriable_failures,
                        "Retriable failure, further attempts allowed"
                    );
                    CompletionAction::Continue
                } else {
                    debug!(
                        attempt,
                        retriable_failures = snapshot.retriable_failures,
                        "Retriable failure, minimum successes can no longer be reached"
                    );
                    propagate(result)
                }
            }
        }
    }
}

fn propagate(result: AttemptResult) -> CompletionAction {
    match result.into_error() {
        Some(err) => CompletionAction::Propagate(err),
        // classification never yields a failure for a passed result
        None => CompletionAction::Continue,
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::classify::{AssertionFailure, ErrorMatcher};

    fn engine(max: u32, min: u32) -> DecisionEngine {
        let policy = RetryPolicy::builder().max_attempts(max).min_successes(min).build().unwrap();
        DecisionEngine::new(Arc::new(policy))
    }

    fn snapshot(successes: u32, retriable_failures: u32, non_retriable_failures: u32) -> HistorySnapshot {
        HistorySnapshot { successes, retriable_failures, non_retriable_failures }
    }

    /// Validates `DecisionEngine::should_run_attempt` behavior for the
    /// decision table scenario.
    ///
    /// Assertions:
    /// - Confirms the first attempt is enabled.
    /// - Confirms reaching the quota disables with a pass.
    /// - Confirms an unreachable quota or a terminal entry disables with a
    ///   failure, and failure wins over success.
    #[test]
    fn decision_table() {
        let engine = engine(5, 2);
        assert_eq!(engine.should_run_attempt(&snapshot(0, 0, 0), 1), ExecutionDecision::Enabled);
        assert_eq!(engine.should_run_attempt(&snapshot(1, 3, 0), 5), ExecutionDecision::Enabled);
        assert_eq!(engine.should_run_attempt(&snapshot(2, 0, 0), 3), ExecutionDecision::DisabledPassed);
        assert_eq!(engine.should_run_attempt(&snapshot(0, 4, 0), 5), ExecutionDecision::DisabledFailed);
        assert_eq!(engine.should_run_attempt(&snapshot(2, 0, 1), 4), ExecutionDecision::DisabledFailed);
    }

    /// Validates `DecisionEngine::should_run_attempt` behavior for the min
    /// above max scenario.
    ///
    /// Assertions:
    /// - Confirms even the first attempt is disabled as failed.
    #[test]
    fn unreachable_policy_disables_first_attempt() {
        let engine = engine(2, 3);
        assert_eq!(engine.should_run_attempt(&snapshot(0, 0, 0), 1), ExecutionDecision::DisabledFailed);
    }

    /// Validates `DecisionEngine::on_attempt_completed` behavior for the
    /// retriable failure scenario.
    ///
    /// Assertions:
    /// - Confirms a failure with headroom continues.
    /// - Confirms the failure that exhausts the quota propagates.
    /// - Confirms both are recorded as retriable failures.
    #[test]
    fn retriable_failures_continue_then_propagate() {
        let engine = engine(2, 1);
        let history = AttemptHistory::new();

        let first = engine.on_attempt_completed(&history, AttemptResult::failed(AssertionFailure::new("a")));
        assert!(matches!(first, CompletionAction::Continue));

        let second = engine.on_attempt_completed(&history, AttemptResult::failed(AssertionFailure::new("b")));
        match second {
            CompletionAction::Propagate(err) => assert_eq!(err.to_string(), "assertion failed: b"),
            other => panic!("expected propagate, got {other:?}"),
        }
        assert_eq!(history.outcomes(), vec![AttemptOutcome::RetriableFailure; 2]);
    }

    /// Validates `DecisionEngine::on_attempt_completed` behavior for the
    /// quota already met scenario.
    ///
    /// Assertions:
    /// - Confirms a retriable failure after the quota is met is suppressed.
    #[test]
    fn failure_after_quota_is_suppressed() {
        let engine = engine(3, 1);
        let history = AttemptHistory::new();
        history.record(AttemptOutcome::Success);

        let action = engine.on_attempt_completed(&history, AttemptResult::failed(AssertionFailure::new("late")));
        assert!(matches!(action, CompletionAction::Suppress));
        assert_eq!(action.label(), "suppress");
    }

    /// Validates `DecisionEngine::on_attempt_completed` behavior for the
    /// non-retriable scenario.
    ///
    /// Assertions:
    /// - Confirms an error outside the allow-list propagates immediately.
    /// - Confirms it is recorded as terminal and disables later attempts.
    #[test]
    fn non_retriable_error_propagates_and_terminates() {
        let policy = RetryPolicy::builder()
            .max_attempts(5)
            .retry_on(ErrorMatcher::of::<io::Error>())
            .build()
            .unwrap();
        let engine = DecisionEngine::new(Arc::new(policy));
        let history = AttemptHistory::new();

        let action = engine.on_attempt_completed(&history, AttemptResult::failed(AssertionFailure::new("x")));
        assert!(matches!(action, CompletionAction::Propagate(_)));
        assert_eq!(history.get(1), Some(AttemptOutcome::NonRetriableFailure));
        assert_eq!(
            engine.should_run_attempt(&history.snapshot(), 2),
            ExecutionDecision::DisabledFailed
        );
    }

    /// Validates `DecisionEngine::on_attempt_completed` behavior for the
    /// abort scenario.
    ///
    /// Assertions:
    /// - Confirms an abort outside the allow-list still continues.
    #[test]
    fn aborts_continue_regardless_of_allow_list() {
        let policy = RetryPolicy::builder().retry_on_type::<io::Error>().build().unwrap();
        let engine = DecisionEngine::new(Arc::new(policy));
        let history = AttemptHistory::new();

        let action = engine.on_attempt_completed(&history, AttemptResult::aborted("precondition"));
        assert!(matches!(action, CompletionAction::Continue));
        assert_eq!(history.get(1), Some(AttemptOutcome::RetriableFailure));
    }
}
