//! Retries for data-driven tests.
//!
//! Every parameter set gets its own [`AttemptSequence`] with its own history
//! and policy instance. The flattened stream exhausts set `i` before it
//! produces anything for set `i + 1`.

use std::sync::Arc;

use retriable_common::error::CommonError;
use tracing::debug;

use crate::classify::AttemptResult;
use crate::decision::{CompletionAction, ExecutionDecision};
use crate::error::{RetriableError, RetriableResult};
use crate::formatter::{ArgumentSet, DisplayNameFormatter};
use crate::policy::RetryPolicy;
use crate::sequence::{AttemptDescriptor, AttemptSequence, AttemptSource, SequenceVerdict};

/// One attempt for one parameter set
#[derive(Debug)]
pub struct ParameterizedAttempt<A> {
    invocation_index: u32,
    arguments: Arc<A>,
    descriptor: AttemptDescriptor,
}

impl<A> ParameterizedAttempt<A> {
    /// 1-based index of the parameter set
    pub fn invocation_index(&self) -> u32 {
        self.invocation_index
    }

    /// The bound arguments
    pub fn arguments(&self) -> &A {
        &self.arguments
    }

    /// 1-based attempt number within the parameter set
    pub fn attempt(&self) -> u32 {
        self.descriptor.attempt()
    }

    /// Rendered display name
    pub fn display_name(&self) -> &str {
        self.descriptor.display_name()
    }

    /// Whether the host should execute this attempt
    pub fn should_run(&self) -> ExecutionDecision {
        self.descriptor.should_run()
    }

    /// Report how the attempt finished
    pub fn complete(self, result: AttemptResult) -> CompletionAction {
        self.descriptor.complete(result)
    }
}

#[derive(Debug)]
struct Binding<A> {
    arguments: Arc<A>,
    sequence: AttemptSequence,
}

/// Flattened attempts across all parameter sets
#[derive(Debug)]
pub struct ParameterSetSequence<A> {
    bindings: Vec<Binding<A>>,
    current: usize,
}

impl<A: ArgumentSet> ParameterSetSequence<A> {
    /// Bind every parameter set to its own attempt sequence
    ///
    /// # Errors
    ///
    /// A configuration error when `parameter_sets` is empty.
    pub fn new(
        policy: &RetryPolicy,
        formatter: DisplayNameFormatter,
        parameter_sets: Vec<A>,
    ) -> RetriableResult<Self> {
        if parameter_sets.is_empty() {
            return Err(CommonError::config_field(
                "arguments",
                "You must configure at least one set of arguments",
            )
            .into());
        }

        let formatter = Arc::new(formatter);
        let bindings = parameter_sets
            .into_iter()
            .zip(1_u32..)
            .map(|(arguments, index)| {
                let rendered: Arc<[String]> = Arc::from(arguments.render());
                Binding {
                    arguments: Arc::new(arguments),
                    sequence: AttemptSequence::with_binding(
                        Arc::new(policy.clone()),
                        Arc::clone(&formatter),
                        rendered,
                        Some(index),
                    ),
                }
            })
            .collect::<Vec<_>>();

        debug!(parameter_sets = bindings.len(), "Bound parameter sets");
        Ok(Self { bindings, current: 0 })
    }
}

impl<A> ParameterSetSequence<A> {
    /// Number of parameter sets
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Always false; construction rejects empty input
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// The sequence bound to the parameter set with the given 1-based index
    pub fn sequence(&self, invocation_index: u32) -> Option<&AttemptSequence> {
        let position = usize::try_from(invocation_index.checked_sub(1)?).ok()?;
        self.bindings.get(position).map(|binding| &binding.sequence)
    }

    /// Arguments and verdict of every parameter set, in order
    pub fn verdicts(&self) -> Vec<(Arc<A>, Option<SequenceVerdict>)> {
        self.bindings
            .iter()
            .map(|binding| (Arc::clone(&binding.arguments), binding.sequence.verdict()))
            .collect()
    }

    fn attempts_started(&self) -> u32 {
        self.bindings.iter().map(|binding| binding.sequence.attempts_started()).sum()
    }
}

impl<A> AttemptSource for ParameterSetSequence<A> {
    type Attempt = ParameterizedAttempt<A>;

    fn has_next(&self) -> bool {
        self.bindings[self.current..].iter().any(|binding| binding.sequence.has_next())
    }

    fn next_attempt(&mut self) -> RetriableResult<ParameterizedAttempt<A>> {
        while let Some(binding) = self.bindings.get(self.current) {
            // an in-flight attempt keeps the set current so the error surfaces
            if binding.sequence.has_next() || binding.sequence.verdict().is_none() {
                break;
            }
            self.current += 1;
        }

        if self.current >= self.bindings.len() {
            return Err(RetriableError::Exhausted { attempts: self.attempts_started() });
        }
        let binding = &mut self.bindings[self.current];
        let descriptor = binding.sequence.next_attempt()?;
        let invocation_index = u32::try_from(self.current + 1).unwrap_or(u32::MAX);

        Ok(ParameterizedAttempt {
            invocation_index,
            arguments: Arc::clone(&binding.arguments),
            descriptor,
        })
    }
}

impl<A> Iterator for ParameterSetSequence<A> {
    type Item = RetriableResult<ParameterizedAttempt<A>>;

    fn next(&mut self) -> Option<Self::Item> {
        let pending = self.bindings[self.current..]
            .iter()
            .any(|binding| binding.sequence.has_next() || binding.sequence.verdict().is_none());
        if !pending {
            return None;
        }
        Some(self.next_attempt())
    }
}

#[cfg(test)]
mod tests {
    use retriable_common::assert_config_error;

    use super::*;
    use crate::classify::AssertionFailure;
    use crate::constants::DEFAULT_PARAMETERIZED_DISPLAY_NAME;

    fn formatter() -> DisplayNameFormatter {
        DisplayNameFormatter::new(DEFAULT_PARAMETERIZED_DISPLAY_NAME, "sum").unwrap()
    }

    /// Validates `ParameterSetSequence::new` behavior for the empty input
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms an empty argument list is a configuration error.
    #[test]
    fn empty_parameter_sets_are_rejected() {
        let result = ParameterSetSequence::<Vec<u8>>::new(&RetryPolicy::default(), formatter(), Vec::new());
        assert_config_error!(result, "arguments");
    }

    /// Validates `ParameterSetSequence` behavior for the ordering scenario.
    ///
    /// Assertions:
    /// - Confirms set 1 is exhausted before set 2 starts.
    /// - Confirms names use the set index and rendered arguments.
    #[test]
    fn exhausts_each_set_before_the_next() {
        let mut sets =
            ParameterSetSequence::new(&RetryPolicy::default(), formatter(), vec![(1, 2), (3, 4)]).unwrap();
        let mut names = Vec::new();
        while sets.has_next() {
            let attempt = sets.next_attempt().unwrap();
            names.push(attempt.display_name().to_string());
            let result = if attempt.invocation_index() == 1 && attempt.attempt() == 1 {
                AttemptResult::failed(AssertionFailure::new("flaky"))
            } else {
                AttemptResult::Passed
            };
            attempt.complete(result);
        }
        assert_eq!(names, vec!["[1] 1, 2", "[1] 1, 2 [Retry 2]", "[2] 3, 4"]);
        assert!(sets
            .verdicts()
            .iter()
            .all(|(_, verdict)| *verdict == Some(SequenceVerdict::Passed)));
    }

    /// Validates `ParameterSetSequence::next_attempt` behavior for the
    /// in-flight scenario.
    ///
    /// Assertions:
    /// - Confirms an uncompleted attempt is not skipped over.
    #[test]
    fn in_flight_attempt_blocks_advancing() {
        let mut sets = ParameterSetSequence::new(&RetryPolicy::default(), formatter(), vec![[1], [2]]).unwrap();
        let _first = sets.next_attempt().unwrap();
        assert!(matches!(sets.next_attempt(), Err(RetriableError::AttemptInFlight { attempt: 1 })));
        assert_eq!(sets.sequence(2).map(AttemptSequence::attempts_started), Some(0));
    }
}
