//! Ordered record of attempt outcomes for one invocation.
//!
//! The history is append-only. Appends take the write lock and hand back the
//! snapshot that includes the new entry, so a reader never sees a partially
//! applied completion.

use parking_lot::RwLock;
use serde::Serialize;

/// Outcome of a completed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The attempt passed
    Success,
    /// The attempt failed with a retriable error
    RetriableFailure,
    /// The attempt failed with a non-retriable error; nothing follows it
    NonRetriableFailure,
}

impl AttemptOutcome {
    /// Whether no further attempt may follow this outcome
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::NonRetriableFailure)
    }
}

/// Tallies of a history at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistorySnapshot {
    /// Passing attempts
    pub successes: u32,
    /// Attempts that failed with a retriable error
    pub retriable_failures: u32,
    /// Attempts that failed with a non-retriable error (0 or 1)
    pub non_retriable_failures: u32,
}

impl HistorySnapshot {
    /// Total attempts recorded
    pub fn attempts_taken(&self) -> u32 {
        self.successes + self.retriable_failures + self.non_retriable_failures
    }

    /// Whether a non-retriable failure ended the history
    pub fn terminated(&self) -> bool {
        self.non_retriable_failures > 0
    }

    fn count(&mut self, outcome: AttemptOutcome) {
        match outcome {
            AttemptOutcome::Success => self.successes += 1,
            AttemptOutcome::RetriableFailure => self.retriable_failures += 1,
            AttemptOutcome::NonRetriableFailure => self.non_retriable_failures += 1,
        }
    }
}

/// Append-only list of attempt outcomes, indexed by attempt number
#[derive(Debug, Default)]
pub struct AttemptHistory {
    outcomes: RwLock<Vec<AttemptOutcome>>,
}

impl AttemptHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an outcome and return the snapshot that includes it
    pub fn record(&self, outcome: AttemptOutcome) -> HistorySnapshot {
        let mut outcomes = self.outcomes.write();
        outcomes.push(outcome);
        tally(&outcomes)
    }

    /// Current tallies
    pub fn snapshot(&self) -> HistorySnapshot {
        tally(&self.outcomes.read())
    }

    /// Number of recorded attempts
    pub fn len(&self) -> u32 {
        u32::try_from(self.outcomes.read().len()).unwrap_or(u32::MAX)
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.outcomes.read().is_empty()
    }

    /// Outcome of the attempt with the given 1-based number
    pub fn get(&self, attempt: u32) -> Option<AttemptOutcome> {
        let index = usize::try_from(attempt.checked_sub(1)?).ok()?;
        self.outcomes.read().get(index).copied()
    }

    /// Copy of all recorded outcomes in attempt order
    pub fn outcomes(&self) -> Vec<AttemptOutcome> {
        self.outcomes.read().clone()
    }

    /// Number of passing attempts
    pub fn successes(&self) -> u32 {
        self.snapshot().successes
    }

    /// Whether any attempt failed with a retriable error
    pub fn any_retriable_failure(&self) -> bool {
        self.outcomes.read().contains(&AttemptOutcome::RetriableFailure)
    }
}

fn tally(outcomes: &[AttemptOutcome]) -> HistorySnapshot {
    outcomes.iter().fold(HistorySnapshot::default(), |mut snapshot, outcome| {
        snapshot.count(*outcome);
        snapshot
    })
}
