//! Outcome to canonical status mapping.

use crate::model::{CanonicalStatus, ExecutionOutcome};

/// Maps a host outcome onto the canonical status vocabulary. Total and pure.
pub fn map_outcome(outcome: ExecutionOutcome) -> CanonicalStatus {
    match outcome {
        ExecutionOutcome::Passed => CanonicalStatus::Pass,
        ExecutionOutcome::Failed | ExecutionOutcome::TimedOut | ExecutionOutcome::Interrupted => {
            CanonicalStatus::Fail
        }
        ExecutionOutcome::Skipped => CanonicalStatus::Blocked,
        ExecutionOutcome::Unrecognized => CanonicalStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_table() {
        let table = [
            (ExecutionOutcome::Passed, CanonicalStatus::Pass),
            (ExecutionOutcome::Failed, CanonicalStatus::Fail),
            (ExecutionOutcome::Skipped, CanonicalStatus::Blocked),
            (ExecutionOutcome::TimedOut, CanonicalStatus::Fail),
            (ExecutionOutcome::Interrupted, CanonicalStatus::Fail),
            (ExecutionOutcome::Unrecognized, CanonicalStatus::Unknown),
        ];
        for (outcome, expected) in table {
            assert_eq!(map_outcome(outcome), expected, "{outcome:?}");
            assert_eq!(map_outcome(outcome), map_outcome(outcome));
        }
    }
}
