use serde::Serialize;

use crate::http::response::FailureKind;

use super::assertion::Verdict;

/// One failed call within a scenario. `index` is the dispatch index for a
/// concurrent batch, or the step number for a sequential scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub index: usize,
    pub step: String,
    pub kind: FailureKind,
    pub reason: String,
}

/// Aggregate outcome of a scenario or batch. The order of `failures` is an
/// implementation detail; compare by membership and count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioVerdict {
    pub passed: bool,
    pub failures: Vec<StepFailure>,
}

impl ScenarioVerdict {
    pub fn passing() -> Self {
        Self {
            passed: true,
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, index: usize, step: impl Into<String>, verdict: &Verdict) {
        if verdict.passed {
            return;
        }
        self.failures.push(StepFailure {
            index,
            step: step.into(),
            kind: verdict.kind.unwrap_or(FailureKind::ContractViolation),
            reason: verdict
                .reason
                .clone()
                .unwrap_or_else(|| "expectation failed".to_string()),
        });
        self.passed = false;
    }

    /// Fold another verdict's failures into this one.
    pub fn absorb(&mut self, other: ScenarioVerdict) {
        if !other.passed {
            self.passed = false;
        }
        self.failures.extend(other.failures);
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.failures.iter().map(|failure| failure.index).collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

impl Default for ScenarioVerdict {
    fn default() -> Self {
        Self::passing()
    }
}
