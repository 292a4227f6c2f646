//! Defect decision table.
//!
//! Given the latest canonical status of a test case and what the tracker
//! currently holds for it, decide the single action to take. The table is
//! pure; executing the action lives in the engine crate.

use crate::model::{CanonicalStatus, ExternalIssue, IssueRef};
use crate::transition::IssueTransition;

/// Status names from which a new failure moves the defect back to in-progress.
const REOPENABLE_STATUSES: [&str; 2] = ["Ready For Testing", "testing"];
const DONE_STATUS: &str = "Done";

/// External defect state discovered by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefectState {
    /// No defect tagged with the test case.
    NoIssue,
    /// Exactly one defect, with its freshly read status.
    SingleIssue(ExternalIssue),
    /// Ambiguous; never auto-resolved.
    MultipleIssues(Vec<IssueRef>),
}

/// Why no tracker mutation is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoOpReason {
    /// No defect exists and the test did not fail.
    NothingToReport,
    /// The defect is already `Done`.
    AlreadyDone,
    /// The defect is in a status a new failure must not disturb.
    AlreadyBeingWorked {
        /// Status the tracker reported.
        status_name: String,
    },
    /// Blocked or unknown results never touch an existing defect.
    StatusNotActionable(CanonicalStatus),
}

/// The single action to take for one test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefectAction {
    /// Open a new defect and link it to the test case.
    Create,
    /// Move an existing defect along the workflow.
    Transition {
        /// Defect to move.
        issue_key: String,
        /// Target transition.
        transition: IssueTransition,
    },
    /// Leave the tracker untouched.
    NoOp(NoOpReason),
    /// Report the ambiguity for manual review.
    Flag {
        /// Every matching defect.
        issue_keys: Vec<String>,
    },
}

fn status_is(current: &str, expected: &str) -> bool {
    current.trim().eq_ignore_ascii_case(expected)
}

/// Applies the decision table to the latest status and the discovered state.
pub fn decide(status: CanonicalStatus, state: &DefectState) -> DefectAction {
    match state {
        DefectState::MultipleIssues(issues) => DefectAction::Flag {
            issue_keys: issues.iter().map(|i| i.key.clone()).collect(),
        },
        DefectState::NoIssue => match status {
            CanonicalStatus::Fail => DefectAction::Create,
            _ => DefectAction::NoOp(NoOpReason::NothingToReport),
        },
        DefectState::SingleIssue(issue) => match status {
            CanonicalStatus::Fail => {
                if REOPENABLE_STATUSES
                    .iter()
                    .any(|s| status_is(&issue.status_name, s))
                {
                    DefectAction::Transition {
                        issue_key: issue.key.clone(),
                        transition: IssueTransition::InProgress,
                    }
                } else {
                    DefectAction::NoOp(NoOpReason::AlreadyBeingWorked {
                        status_name: issue.status_name.clone(),
                    })
                }
            }
            CanonicalStatus::Pass => {
                if status_is(&issue.status_name, DONE_STATUS) {
                    DefectAction::NoOp(NoOpReason::AlreadyDone)
                } else {
                    DefectAction::Transition {
                        issue_key: issue.key.clone(),
                        transition: IssueTransition::Done,
                    }
                }
            }
            other => DefectAction::NoOp(NoOpReason::StatusNotActionable(other)),
        },
    }
}
