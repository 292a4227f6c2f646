//! Step narrative sent as the execution's script results.

use crate::model::{StepResult, StepStatus, TestStep};

const STEP_OK: &str = "Step executed successfully";

/// Removes ANSI escape sequences (colour codes from assertion diffs).
pub fn strip_ansi(text: &str) -> String {
    strip_ansi_escapes::strip_str(text)
}

/// Builds the ordered step narrative, leaving out setup/teardown steps.
pub fn build_step_narrative(steps: &[TestStep]) -> Vec<StepResult> {
    steps
        .iter()
        .filter(|step| !step.category.is_setup_or_teardown())
        .map(|step| match &step.error {
            Some(err) => StepResult {
                status_name: StepStatus::Fail,
                actual_result: format!(
                    "Step \"{}\" failed with error: {}",
                    step.title,
                    strip_ansi(err)
                ),
            },
            None => StepResult {
                status_name: StepStatus::Pass,
                actual_result: STEP_OK.to_string(),
            },
        })
        .collect()
}
