//! Structured logging for retriable invocations
//!
//! Uses the standard `tracing` crate; attach any subscriber to collect the
//! events.

use tracing::{debug, info, warn};

use crate::decision::ExecutionDecision;

/// Emits events for the lifecycle of an invocation
pub struct InvocationTracer;

impl InvocationTracer {
    /// Create a new invocation tracer
    pub fn new() -> Self {
        Self
    }

    /// Start an invocation span
    pub fn start_invocation_span(
        &self,
        display_name: &str,
        max_attempts: u32,
        min_successes: u32,
    ) -> InvocationSpan {
        info!(
            test = display_name,
            max_attempts = max_attempts,
            min_successes = min_successes,
            "Starting retriable invocation"
        );

        InvocationSpan { display_name: display_name.to_string(), max_attempts, min_successes }
    }
}

impl Default for InvocationTracer {
    fn default() -> Self {
        Self::new()
    }
}

/// A span representing one invocation and its attempts
pub struct InvocationSpan {
    display_name: String,
    max_attempts: u32,
    min_successes: u32,
}

impl InvocationSpan {
    /// Record that an attempt is starting
    pub fn record_attempt(&mut self, attempt: u32, attempt_name: &str) {
        debug!(
            test = %self.display_name,
            attempt = attempt,
            attempt_name = %attempt_name,
            "Running attempt"
        );
    }

    /// Record a skipped attempt
    pub fn record_skipped(&mut self, attempt: u32, decision: ExecutionDecision) {
        info!(
            test = %self.display_name,
            attempt = attempt,
            reason = decision.reason(),
            "Attempt skipped"
        );
    }

    /// Record a failed attempt and what happens next
    pub fn record_failure(&mut self, attempt: u32, error: &str, action: &str) {
        warn!(
            test = %self.display_name,
            attempt = attempt,
            max_attempts = self.max_attempts,
            error = %error,
            action = action,
            "Attempt failed"
        );
    }

    /// Record that the invocation passed
    pub fn record_passed(&mut self, attempts: u32, successes: u32) {
        info!(
            test = %self.display_name,
            attempts = attempts,
            successes = successes,
            "Retriable invocation passed"
        );
    }

    /// Record that the invocation failed
    pub fn record_failed(&mut self, attempts: u32, successes: u32, reason: &str) {
        warn!(
            test = %self.display_name,
            attempts = attempts,
            successes = successes,
            min_successes = self.min_successes,
            reason = %reason,
            "Retriable invocation failed"
        );
    }

    /// End the span
    pub fn end(self) {
        // Span will be dropped, which ends it in tracing
    }
}
