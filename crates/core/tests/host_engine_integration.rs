//! Host engine call-sequence tests
//!
//! A scripted host pulls attempts, asks whether each one runs and reports
//! completion, exactly as a test framework would. The log of calls makes the
//! ordering contract between production and completion explicit.

use std::io;
use std::sync::Arc;
use std::thread;

use retriable_core::{
    AssertionFailure, AttemptResult, AttemptSequence, AttemptSource, CompletionAction,
    DisplayNameFormatter, ErrorMatcher, ExecutionDecision, ParameterSetSequence, RetriableError,
    RetryPolicy, SequenceVerdict,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostEvent {
    Produced(u32, String),
    Skipped(u32),
    Completed(u32, &'static str),
}

/// Pulls attempts from `sequence` and completes each with the next scripted
/// outcome, stopping when the source is exhausted or an error propagates.
fn drive(sequence: &mut AttemptSequence, mut script: Vec<AttemptResult>) -> Vec<HostEvent> {
    script.reverse();
    let mut events = Vec::new();
    while sequence.has_next() {
        let attempt = sequence.next_attempt().expect("attempt");
        let number = attempt.attempt();
        events.push(HostEvent::Produced(number, attempt.display_name().to_string()));
        if attempt.should_run() != ExecutionDecision::Enabled {
            events.push(HostEvent::Skipped(number));
            break;
        }
        let action = attempt.complete(script.pop().unwrap_or(AttemptResult::Passed));
        events.push(HostEvent::Completed(number, action.label()));
        if matches!(action, CompletionAction::Propagate(_)) {
            break;
        }
    }
    events
}

fn sequence(max: u32, min: u32) -> AttemptSequence {
    let policy = RetryPolicy::builder()
        .max_attempts(max)
        .min_successes(min)
        .retry_on(ErrorMatcher::of::<AssertionFailure>())
        .build()
        .unwrap();
    AttemptSequence::new(policy, DisplayNameFormatter::new("{displayName}", "case").unwrap())
}

fn assertion() -> AttemptResult {
    AttemptResult::failed(AssertionFailure::new("flaky"))
}

/// Validates the recovering host call sequence.
///
/// Assertions:
/// - Confirms every attempt is produced, run and completed in order.
/// - Confirms the retry marker appears from the second attempt on.
#[test]
fn host_sees_ordered_produce_complete_pairs() {
    let mut seq = sequence(3, 1);
    let events = drive(&mut seq, vec![assertion(), assertion(), AttemptResult::Passed]);

    assert_eq!(
        events,
        vec![
            HostEvent::Produced(1, "case".into()),
            HostEvent::Completed(1, "continue"),
            HostEvent::Produced(2, "case [Retry 2]".into()),
            HostEvent::Completed(2, "continue"),
            HostEvent::Produced(3, "case [Retry 3]".into()),
            HostEvent::Completed(3, "continue"),
        ]
    );
    assert_eq!(seq.verdict(), Some(SequenceVerdict::Passed));
}

/// Validates the non-retriable host call sequence.
///
/// Assertions:
/// - Confirms exactly one attempt is produced and it propagates.
/// - Confirms the sequence reports failure.
#[test]
fn host_stops_after_non_retriable_error() {
    let mut seq = sequence(2, 1);
    let events = drive(&mut seq, vec![AttemptResult::failed(io::Error::other("io"))]);

    assert_eq!(
        events,
        vec![HostEvent::Produced(1, "case".into()), HostEvent::Completed(1, "propagate")]
    );
    assert!(!seq.has_next());
    assert_eq!(seq.verdict(), Some(SequenceVerdict::Failed));
}

/// Validates `has_next` idempotence and over-pull exhaustion.
///
/// Assertions:
/// - Confirms repeated `has_next` calls do not change the answer or state.
/// - Confirms `next_attempt` after termination fails with `Exhausted` every
///   time.
#[test]
fn terminal_state_is_idempotent() {
    let mut seq = sequence(3, 1);
    drive(&mut seq, vec![AttemptResult::Passed]);

    for _ in 0..5 {
        assert!(!seq.has_next());
    }
    assert_eq!(seq.attempts_started(), 1);
    for _ in 0..3 {
        assert!(matches!(seq.next_attempt(), Err(RetriableError::Exhausted { attempts: 1 })));
    }
    assert!(seq.next().is_none());
}

/// Validates `has_next` idempotence while attempts remain.
///
/// Assertions:
/// - Confirms polling before `next_attempt` never produces an attempt.
#[test]
fn polling_has_next_does_not_advance() {
    let mut seq = sequence(3, 1);
    for _ in 0..4 {
        assert!(seq.has_next());
    }
    assert_eq!(seq.attempts_started(), 0);
    assert_eq!(seq.next_attempt().unwrap().attempt(), 1);
}

/// Validates completion on a different thread than production.
///
/// Assertions:
/// - Confirms the history update is visible before the next attempt.
/// - Confirms the retry marker reflects the completed failure.
#[test]
fn completion_from_another_thread_is_observed() {
    let mut seq = sequence(3, 1);
    let first = seq.next_attempt().unwrap();
    let action = thread::spawn(move || first.complete(assertion())).join().unwrap();
    assert!(matches!(action, CompletionAction::Continue));

    let second = seq.next_attempt().unwrap();
    assert_eq!(second.display_name(), "case [Retry 2]");
    assert_eq!(Arc::strong_count(seq.history()), 2);
    second.complete(AttemptResult::Passed);
    assert_eq!(seq.history().len(), 2);
}

/// Validates the uncompleted attempt ordering rule.
///
/// Assertions:
/// - Confirms the next attempt cannot be produced until completion.
#[test]
fn next_attempt_requires_completion() {
    let mut seq = sequence(3, 1);
    let first = seq.next_attempt().unwrap();
    assert!(matches!(seq.next_attempt(), Err(RetriableError::AttemptInFlight { attempt: 1 })));
    first.complete(assertion());
    assert_eq!(seq.next_attempt().unwrap().attempt(), 2);
}

/// Validates the min above max host call sequence.
///
/// Assertions:
/// - Confirms the first attempt is produced but disabled.
/// - Confirms nothing further is produced and the verdict is failed.
#[test]
fn unreachable_quota_disables_first_attempt() {
    let mut seq = sequence(2, 3);
    let events = drive(&mut seq, Vec::new());

    assert_eq!(events, vec![HostEvent::Produced(1, "case".into()), HostEvent::Skipped(1)]);
    assert!(!seq.has_next());
    assert_eq!(seq.verdict(), Some(SequenceVerdict::Failed));
}

/// Validates the flattened data-driven pull sequence.
///
/// Assertions:
/// - Confirms set 1 is exhausted before set 2 and each set has its own
///   budget.
/// - Confirms over-pull fails with `Exhausted`.
#[test]
fn parameter_sets_are_pulled_in_order() {
    let policy = RetryPolicy::builder().max_attempts(2).build().unwrap();
    let formatter = DisplayNameFormatter::new("[{index}] {arguments}", "sum").unwrap();
    let mut sets = ParameterSetSequence::new(&policy, formatter, vec![("a",), ("b",)]).unwrap();

    let mut produced = Vec::new();
    while let Some(attempt) = sets.next() {
        let attempt = attempt.unwrap();
        produced.push((attempt.invocation_index(), attempt.attempt()));
        attempt.complete(assertion());
    }

    assert_eq!(produced, vec![(1, 1), (1, 2), (2, 1), (2, 2)]);
    assert!(!sets.has_next());
    assert!(matches!(sets.next_attempt(), Err(RetriableError::Exhausted { attempts: 4 })));
    assert!(sets
        .verdicts()
        .into_iter()
        .all(|(_, verdict)| verdict == Some(SequenceVerdict::Failed)));
}
