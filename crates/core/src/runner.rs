//! Declarations and a synchronous runner for retriable tests.
//!
//! [`RetriableTest`] and [`RetriableParameterizedTest`] carry the declared
//! configuration, build the matching attempt source and drive it: every
//! attempt body runs under `catch_unwind`, so a panicking assertion is an
//! ordinary [`AssertionFailure`].

use std::panic::{self, AssertUnwindSafe};

use retriable_common::error::ErrorClassification;
use tracing::warn;

use crate::classify::{AssertionFailure, AttemptResult, BoxError, ErrorMatcher, RetriableErrors};
use crate::constants::{DEFAULT_DISPLAY_NAME, DEFAULT_PARAMETERIZED_DISPLAY_NAME};
use crate::decision::{CompletionAction, ExecutionDecision};
use crate::error::{RetriableError, RetriableResult};
use crate::formatter::{ArgumentSet, DisplayNameFormatter};
use crate::parameterized::ParameterSetSequence;
use crate::policy::RetryPolicy;
use crate::report::{
    AttemptRecord, AttemptStatus, FailureCause, InvocationMetrics, InvocationReport,
    InvocationVerdict, ParameterizedReport,
};
use crate::sequence::{AttemptSequence, AttemptSource, SequenceVerdict};
use crate::settings::RetriableSettings;
use crate::tracing::{InvocationSpan, InvocationTracer};

/// What an attempt body is told about the attempt it runs
#[derive(Debug, Clone, Copy)]
pub struct AttemptContext<'a> {
    /// 1-based attempt number
    pub attempt: u32,
    /// Rendered display name
    pub display_name: &'a str,
    /// Parameter-set index, `None` for plain tests
    pub invocation_index: Option<u32>,
}

#[derive(Debug, Clone)]
struct Declaration {
    display_name: String,
    repeats: u32,
    min_success: u32,
    exceptions: Vec<ErrorMatcher>,
    name: String,
}

impl Declaration {
    fn new(display_name: String, settings: &RetriableSettings, name: String) -> Self {
        Self {
            display_name,
            repeats: settings.max_attempts,
            min_success: settings.min_successes,
            exceptions: Vec::new(),
            name,
        }
    }

    fn policy(&self) -> RetriableResult<RetryPolicy> {
        RetryPolicy::new(self.repeats, self.min_success, RetriableErrors::new(self.exceptions.clone()))
    }

    fn formatter(&self) -> RetriableResult<DisplayNameFormatter> {
        DisplayNameFormatter::new(self.name.clone(), self.display_name.clone())
    }
}

macro_rules! impl_declaration_builders {
    ($declaration:ty) => {
        impl $declaration {
            /// Require this many passing attempts per invocation
            #[must_use]
            pub fn min_success(mut self, min_success: u32) -> Self {
                self.declaration.min_success = min_success;
                self
            }

            /// Only retry errors accepted by `matcher` (plus aborts)
            #[must_use]
            pub fn exception(mut self, matcher: ErrorMatcher) -> Self {
                self.declaration.exceptions.push(matcher);
                self
            }

            /// Only retry errors of type `E` (plus aborts)
            #[must_use]
            pub fn retry_on<E: std::error::Error + 'static>(self) -> Self {
                self.exception(ErrorMatcher::of::<E>())
            }

            /// Override the display name pattern
            #[must_use]
            pub fn name<P: Into<String>>(mut self, pattern: P) -> Self {
                self.declaration.name = pattern.into();
                self
            }

            /// Logical name of the test
            pub fn display_name(&self) -> &str {
                &self.declaration.display_name
            }

            /// Validate the declaration and build its policy
            pub fn policy(&self) -> RetriableResult<RetryPolicy> {
                self.declaration.policy()
            }
        }
    };
}

/// A test run up to `repeats` times until `min_success` attempts pass
#[derive(Debug, Clone)]
pub struct RetriableTest {
    declaration: Declaration,
}

impl_declaration_builders!(RetriableTest);

impl RetriableTest {
    /// Declare a test with the default success quota
    pub fn new<N: Into<String>>(display_name: N, repeats: u32) -> Self {
        Self::from_settings(display_name, &RetriableSettings { max_attempts: repeats, ..Default::default() })
    }

    /// Declare a test from shared settings
    pub fn from_settings<N: Into<String>>(display_name: N, settings: &RetriableSettings) -> Self {
        let name = settings.name.clone().unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());
        Self { declaration: Declaration::new(display_name.into(), settings, name) }
    }

    /// Build the attempt sequence for one invocation
    pub fn sequence(&self) -> RetriableResult<AttemptSequence> {
        Ok(AttemptSequence::new(self.policy()?, self.declaration.formatter()?))
    }

    /// Run the test body until the decision engine stops it
    ///
    /// # Errors
    ///
    /// Configuration and template errors. Attempt failures are part of the
    /// returned report, not errors.
    pub fn run<F>(&self, mut body: F) -> RetriableResult<InvocationReport>
    where
        F: FnMut(&AttemptContext<'_>) -> Result<(), BoxError>,
    {
        let mut sequence = self.sequence().inspect_err(|err| rejected(self.display_name(), err))?;
        let policy = sequence.policy().clone();
        let mut invocation = Invocation::start(None, self.display_name(), &policy);

        while sequence.has_next() {
            let descriptor = sequence.next_attempt()?;
            let context = AttemptContext {
                attempt: descriptor.attempt(),
                display_name: descriptor.display_name(),
                invocation_index: None,
            };
            let decision = descriptor.should_run();
            if !decision.is_enabled() {
                invocation.skip(context.attempt, context.display_name, decision);
                break;
            }

            let (attempt, display_name) = (context.attempt, context.display_name.to_string());
            let result = execute(&mut invocation.span, &context, || body(&context));
            invocation.settle(attempt, display_name, result, |result| descriptor.complete(result));
            if invocation.propagated.is_some() {
                break;
            }
        }

        Ok(invocation.finish(self.display_name(), Vec::new(), sequence.verdict(), &policy))
    }
}

/// A data-driven test whose every parameter set is retried independently
#[derive(Debug, Clone)]
pub struct RetriableParameterizedTest {
    declaration: Declaration,
}

impl_declaration_builders!(RetriableParameterizedTest);

impl RetriableParameterizedTest {
    /// Declare a data-driven test with the default success quota
    pub fn new<N: Into<String>>(display_name: N, repeats: u32) -> Self {
        Self::from_settings(display_name, &RetriableSettings { max_attempts: repeats, ..Default::default() })
    }

    /// Declare a data-driven test from shared settings
    pub fn from_settings<N: Into<String>>(display_name: N, settings: &RetriableSettings) -> Self {
        let name = settings
            .parameterized_name
            .clone()
            .unwrap_or_else(|| DEFAULT_PARAMETERIZED_DISPLAY_NAME.to_string());
        Self { declaration: Declaration::new(display_name.into(), settings, name) }
    }

    /// Bind every parameter set to its own attempt sequence
    pub fn sequence<A: ArgumentSet>(&self, parameter_sets: Vec<A>) -> RetriableResult<ParameterSetSequence<A>> {
        ParameterSetSequence::new(&self.policy()?, self.declaration.formatter()?, parameter_sets)
    }

    /// Run the body against every parameter set
    ///
    /// A failing parameter set does not stop the ones after it.
    ///
    /// # Errors
    ///
    /// Configuration and template errors, including an empty `parameter_sets`.
    pub fn run<A, F>(&self, parameter_sets: Vec<A>, mut body: F) -> RetriableResult<ParameterizedReport>
    where
        A: ArgumentSet,
        F: FnMut(&A, &AttemptContext<'_>) -> Result<(), BoxError>,
    {
        let mut sets =
            self.sequence(parameter_sets).inspect_err(|err| rejected(self.display_name(), err))?;
        let policy = self.policy()?;
        let mut invocations = Vec::with_capacity(sets.len());
        let mut current: Option<Invocation> = None;

        while sets.has_next() {
            let attempt = sets.next_attempt()?;
            let index = attempt.invocation_index();
            if current.as_ref().and_then(|invocation| invocation.index) != Some(index) {
                if let Some(done) = current.take() {
                    invocations.push(finish_set(done, &sets, self.display_name(), &policy));
                }
                current = Some(Invocation::start(Some(index), self.display_name(), &policy));
            }
            let Some(invocation) = current.as_mut() else { continue };

            let decision = attempt.should_run();
            let context = AttemptContext {
                attempt: attempt.attempt(),
                display_name: attempt.display_name(),
                invocation_index: Some(index),
            };
            if !decision.is_enabled() {
                invocation.skip(context.attempt, context.display_name, decision);
                continue;
            }

            let (number, display_name) = (context.attempt, context.display_name.to_string());
            let result = execute(&mut invocation.span, &context, || body(attempt.arguments(), &context));
            invocation.settle(number, display_name, result, |result| attempt.complete(result));
        }
        if let Some(done) = current.take() {
            invocations.push(finish_set(done, &sets, self.display_name(), &policy));
        }

        Ok(ParameterizedReport { invocations })
    }
}

/// Attempts of one invocation, collected while it runs
struct Invocation {
    index: Option<u32>,
    span: InvocationSpan,
    records: Vec<AttemptRecord>,
    propagated: Option<BoxError>,
}

impl Invocation {
    fn start(index: Option<u32>, display_name: &str, policy: &RetryPolicy) -> Self {
        let name = match index {
            Some(index) => format!("{display_name} [{index}]"),
            None => display_name.to_string(),
        };
        let span = InvocationTracer::new().start_invocation_span(
            &name,
            policy.max_attempts(),
            policy.min_successes(),
        );
        Self { index, span, records: Vec::new(), propagated: None }
    }

    fn skip(&mut self, attempt: u32, display_name: &str, decision: ExecutionDecision) {
        self.span.record_skipped(attempt, decision);
        self.records.push(AttemptRecord {
            attempt,
            display_name: display_name.to_string(),
            status: AttemptStatus::Skipped(decision.reason().to_string()),
        });
    }

    /// Report the result and record the attempt; a propagated error is kept
    fn settle(
        &mut self,
        attempt: u32,
        display_name: String,
        result: AttemptResult,
        complete: impl FnOnce(AttemptResult) -> CompletionAction,
    ) {
        let failure = result.error().map(|err| err.to_string());
        let action = complete(result);
        if let Some(message) = &failure {
            self.span.record_failure(attempt, message, action.label());
        }
        let status = match (action, failure) {
            (CompletionAction::Propagate(err), _) => {
                let status = AttemptStatus::Failed(err.to_string());
                self.propagated = Some(err);
                status
            }
            (CompletionAction::Suppress, failure) => AttemptStatus::Tolerated(failure.unwrap_or_default()),
            (CompletionAction::Continue, Some(message)) => AttemptStatus::Aborted(message),
            (CompletionAction::Continue, None) => AttemptStatus::Passed,
        };
        self.records.push(AttemptRecord { attempt, display_name, status });
    }

    fn finish(
        mut self,
        display_name: &str,
        arguments: Vec<String>,
        verdict: Option<SequenceVerdict>,
        policy: &RetryPolicy,
    ) -> InvocationReport {
        let mut metrics = InvocationMetrics::new();
        for record in &self.records {
            metrics.observe(&record.status);
        }

        let verdict = match (self.propagated, verdict) {
            (Some(err), _) => InvocationVerdict::Failed(FailureCause::Attempt(err)),
            (None, Some(SequenceVerdict::Passed)) => InvocationVerdict::Passed,
            (None, _) => InvocationVerdict::Failed(FailureCause::QuotaUnreachable {
                successes: metrics.successes,
                required: policy.min_successes(),
            }),
        };
        match &verdict {
            InvocationVerdict::Passed => self.span.record_passed(metrics.attempts, metrics.successes),
            InvocationVerdict::Failed(cause) => {
                self.span.record_failed(metrics.attempts, metrics.successes, &cause.to_string());
            }
        }
        self.span.end();

        InvocationReport {
            display_name: display_name.to_string(),
            invocation_index: self.index,
            arguments,
            attempts: self.records,
            metrics,
            verdict,
        }
    }
}

fn finish_set<A>(
    invocation: Invocation,
    sets: &ParameterSetSequence<A>,
    display_name: &str,
    policy: &RetryPolicy,
) -> InvocationReport {
    let sequence = invocation.index.and_then(|index| sets.sequence(index));
    let arguments = sequence.map(|seq| seq.arguments().to_vec()).unwrap_or_default();
    let verdict = sequence.and_then(AttemptSequence::verdict);
    invocation.finish(display_name, arguments, verdict, policy)
}

fn execute(
    span: &mut InvocationSpan,
    context: &AttemptContext<'_>,
    body: impl FnOnce() -> Result<(), BoxError>,
) -> AttemptResult {
    span.record_attempt(context.attempt, context.display_name);
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(result) => AttemptResult::from_result(result),
        Err(payload) => AttemptResult::failed(AssertionFailure::from_panic(payload.as_ref())),
    }
}

fn rejected(display_name: &str, err: &RetriableError) {
    warn!(
        test = display_name,
        severity = %err.severity(),
        error = %err,
        "Rejected retriable declaration"
    );
}
