//! Lazy sequence of attempts for one invocation.
//!
//! A sequence hands out [`AttemptDescriptor`]s one at a time. Each descriptor
//! carries the history snapshot taken when it was produced, so its
//! [`should_run`](AttemptDescriptor::should_run) answer does not move while
//! other attempts complete. Attempt `n + 1` is only produced after attempt
//! `n` reported back through [`complete`](AttemptDescriptor::complete).

use std::sync::Arc;

use tracing::debug;

use crate::classify::AttemptResult;
use crate::decision::{CompletionAction, DecisionEngine, ExecutionDecision};
use crate::error::{RetriableError, RetriableResult};
use crate::formatter::{DisplayNameFormatter, FormatContext};
use crate::history::{AttemptHistory, HistorySnapshot};
use crate::policy::RetryPolicy;

/// Something that produces attempts until the decision engine stops it
///
/// Every produced attempt that the host runs must be handed back through its
/// `complete` method before the next one is requested. An attempt dropped
/// without completing leaves the source waiting on it: `next_attempt` keeps
/// returning [`RetriableError::AttemptInFlight`] and no verdict is reached.
pub trait AttemptSource {
    /// The attempt type handed to the host
    type Attempt;

    /// Whether another attempt can be produced
    fn has_next(&self) -> bool;

    /// Produce the next attempt
    ///
    /// # Errors
    ///
    /// [`RetriableError::Exhausted`] once `has_next` is false,
    /// [`RetriableError::AttemptInFlight`] if the previous attempt has not
    /// completed, and [`RetriableError::InvalidTemplate`] if its display name
    /// cannot be rendered.
    fn next_attempt(&mut self) -> RetriableResult<Self::Attempt>;
}

/// Overall result of a finished sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceVerdict {
    /// The success quota was met and nothing was propagated
    Passed,
    /// A failure was propagated or the quota was never met
    Failed,
}

/// One attempt handed to the host
#[derive(Debug)]
pub struct AttemptDescriptor {
    attempt: u32,
    display_name: String,
    snapshot: HistorySnapshot,
    engine: DecisionEngine,
    history: Arc<AttemptHistory>,
}

impl AttemptDescriptor {
    /// 1-based attempt number
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Rendered display name
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// History tallies captured when this attempt was produced
    pub fn snapshot(&self) -> HistorySnapshot {
        self.snapshot
    }

    /// Whether the host should execute this attempt
    pub fn should_run(&self) -> ExecutionDecision {
        self.engine.should_run_attempt(&self.snapshot, self.attempt)
    }

    /// Report how the attempt finished
    pub fn complete(self, result: AttemptResult) -> CompletionAction {
        self.engine.on_attempt_completed(&self.history, result)
    }
}

/// Lazily produces the attempts of one invocation
#[derive(Debug)]
pub struct AttemptSequence {
    engine: DecisionEngine,
    history: Arc<AttemptHistory>,
    formatter: Arc<DisplayNameFormatter>,
    arguments: Arc<[String]>,
    invocation_index: Option<u32>,
    attempts_started: u32,
    first_retriable_failure_seen: bool,
    reported_in_flight: Option<u32>,
}

impl AttemptSequence {
    /// Create a sequence for a plain test
    pub fn new(policy: RetryPolicy, formatter: DisplayNameFormatter) -> Self {
        Self::with_binding(Arc::new(policy), Arc::new(formatter), Arc::from(Vec::new()), None)
    }

    /// Create a sequence bound to one parameter set
    pub(crate) fn with_binding(
        policy: Arc<RetryPolicy>,
        formatter: Arc<DisplayNameFormatter>,
        arguments: Arc<[String]>,
        invocation_index: Option<u32>,
    ) -> Self {
        Self {
            engine: DecisionEngine::new(policy),
            history: Arc::new(AttemptHistory::new()),
            formatter,
            arguments,
            invocation_index,
            attempts_started: 0,
            first_retriable_failure_seen: false,
            reported_in_flight: None,
        }
    }

    /// The policy driving this sequence
    pub fn policy(&self) -> &RetryPolicy {
        self.engine.policy()
    }

    /// Shared history of completed attempts
    pub fn history(&self) -> &Arc<AttemptHistory> {
        &self.history
    }

    /// Attempts produced so far
    pub fn attempts_started(&self) -> u32 {
        self.attempts_started
    }

    /// Rendered arguments of the bound parameter set
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Parameter-set index, `None` for plain tests
    pub fn invocation_index(&self) -> Option<u32> {
        self.invocation_index
    }

    /// Whether a retriable failure was seen when the last attempt was produced
    ///
    /// Data-driven display names carry the retry marker exactly when this is
    /// set, so an attempt after a pass keeps the unmarked name there.
    pub fn is_retrying(&self) -> bool {
        self.first_retriable_failure_seen
    }

    /// Overall result, or `None` while attempts may still be produced
    ///
    /// An attempt produced but never completed only counts as finished when
    /// it was disabled, i.e. the host skipped it.
    pub fn verdict(&self) -> Option<SequenceVerdict> {
        let snapshot = self.history.snapshot();
        let decision = self.engine.should_run_attempt(&snapshot, snapshot.attempts_taken() + 1);
        match decision {
            ExecutionDecision::Enabled if self.awaiting_completion() || self.has_next() => None,
            ExecutionDecision::DisabledPassed => Some(SequenceVerdict::Passed),
            // out of attempts below the quota
            ExecutionDecision::Enabled | ExecutionDecision::DisabledFailed => {
                Some(SequenceVerdict::Failed)
            }
        }
    }

    /// Whether the last produced attempt was enabled but has not completed
    ///
    /// A disabled attempt never completes, so it does not block the sequence.
    fn awaiting_completion(&self) -> bool {
        let snapshot = self.history.snapshot();
        snapshot.attempts_taken() < self.attempts_started
            && self.engine.should_run_attempt(&snapshot, self.attempts_started).is_enabled()
    }
}

impl AttemptSource for AttemptSequence {
    type Attempt = AttemptDescriptor;

    fn has_next(&self) -> bool {
        if self.attempts_started == 0 {
            return true;
        }
        if self.attempts_started >= self.policy().max_attempts() {
            return false;
        }
        let snapshot = self.history.snapshot();
        self.engine.should_run_attempt(&snapshot, self.attempts_started + 1).is_enabled()
    }

    fn next_attempt(&mut self) -> RetriableResult<AttemptDescriptor> {
        if self.awaiting_completion() {
            return Err(RetriableError::AttemptInFlight { attempt: self.attempts_started });
        }
        if !self.has_next() {
            return Err(RetriableError::Exhausted { attempts: self.attempts_started });
        }

        let attempt = self.attempts_started + 1;
        let snapshot = self.history.snapshot();
        let retriable_failure_seen =
            self.first_retriable_failure_seen || snapshot.retriable_failures > 0;
        // plain tests mark every repeat, data-driven ones only after a retriable failure
        let is_retry = match self.invocation_index {
            None => attempt > 1,
            Some(_) => retriable_failure_seen,
        };
        let display_name = self.formatter.format(&FormatContext {
            invocation_index: self.invocation_index.unwrap_or(attempt),
            attempt,
            arguments: &self.arguments,
            is_retry,
        })?;

        self.attempts_started = attempt;
        self.first_retriable_failure_seen = retriable_failure_seen;
        debug!(
            attempt,
            max_attempts = self.policy().max_attempts(),
            display_name = %display_name,
            "Produced attempt"
        );

        Ok(AttemptDescriptor {
            attempt,
            display_name,
            snapshot,
            engine: self.engine.clone(),
            history: Arc::clone(&self.history),
        })
    }
}

/// Yields attempts until the decision engine stops the sequence.
///
/// An attempt still in flight is reported once as
/// [`RetriableError::AttemptInFlight`]; further pulls return `None` until it
/// completes.
impl Iterator for AttemptSequence {
    type Item = RetriableResult<AttemptDescriptor>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.awaiting_completion() {
            if self.reported_in_flight == Some(self.attempts_started) {
                return None;
            }
            self.reported_in_flight = Some(self.attempts_started);
        } else if !self.has_next() {
            return None;
        }
        Some(self.next_attempt())
    }
}
