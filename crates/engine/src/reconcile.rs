//! Defect reconciliation: discover the tracker's state for a test case, decide,
//! and issue at most one action.
//!
//! There is no locking on the tracker side. The current status is read right
//! before the decision, and a transition is considered applied once the tracker
//! answers without error. Nothing is retried.

use std::sync::Arc;

use resultsync_core::description::{describe_failure, issue_summary};
use resultsync_core::model::{ReconciliationRecord, TestCaseKey};
use resultsync_core::{decide, DefectAction, DefectState, IssueTransition, NoOpReason, TransitionTable};

use crate::error::ServiceError;
use crate::services::{IssueTracker, NewIssue, TestManagement};

/// What happened to the issue link after a create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    /// Linked to the test case.
    Linked,
    /// Test-management integration disabled.
    Skipped,
    /// Created but left unlinked.
    Failed(String),
}

/// Result of reconciling one test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A defect was opened.
    Created {
        /// Key of the new issue.
        issue_key: String,
        /// Link result.
        link: LinkStatus,
    },
    /// The existing defect was moved.
    Transitioned {
        /// Issue moved.
        issue_key: String,
        /// Transition applied.
        transition: IssueTransition,
    },
    /// Nothing to do.
    NoOp(NoOpReason),
    /// Several defects matched; none was touched.
    Flagged {
        /// Matching issue keys, in search order.
        issue_keys: Vec<String>,
    },
    /// Issue tracking disabled.
    Skipped,
}

impl ReconcileOutcome {
    /// Created but not linked.
    pub fn is_partial_failure(&self) -> bool {
        matches!(
            self,
            Self::Created {
                link: LinkStatus::Failed(_),
                ..
            }
        )
    }
}

/// Drives one test case's defect through the decision table.
pub struct DefectReconciler {
    tracker: Arc<dyn IssueTracker>,
    links: Option<Arc<dyn TestManagement>>,
    transitions: TransitionTable,
}

impl DefectReconciler {
    /// `links` receives the issue↔test-case link after a create; `None` skips linking.
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        links: Option<Arc<dyn TestManagement>>,
        transitions: TransitionTable,
    ) -> Self {
        Self {
            tracker,
            links,
            transitions,
        }
    }

    /// Searches the tracker and reads the status of a single match.
    pub async fn discover(&self, test_case_key: &TestCaseKey) -> Result<DefectState, ServiceError> {
        let mut found = self.tracker.search_issues(test_case_key).await?;
        match found.len() {
            0 => Ok(DefectState::NoIssue),
            1 => {
                let only = found.remove(0);
                let issue = self.tracker.get_issue(&only.key).await?;
                Ok(DefectState::SingleIssue(issue))
            }
            _ => Ok(DefectState::MultipleIssues(found)),
        }
    }

    /// Discovers, decides and applies at most one tracker mutation.
    pub async fn reconcile(
        &self,
        test_case_key: &TestCaseKey,
        record: &ReconciliationRecord,
    ) -> Result<ReconcileOutcome, ServiceError> {
        let state = self.discover(test_case_key).await?;
        let action = decide(record.status, &state);
        tracing::debug!(test_case = %test_case_key, status = %record.status, ?action, "defect action decided");

        match action {
            DefectAction::Create => self.create(test_case_key, record).await,
            DefectAction::Transition {
                issue_key,
                transition,
            } => {
                let id = self.transitions.id(transition);
                self.tracker.transition_issue(&issue_key, id).await?;
                tracing::info!(
                    test_case = %test_case_key,
                    issue = %issue_key,
                    transition = %transition,
                    "defect transitioned"
                );
                Ok(ReconcileOutcome::Transitioned {
                    issue_key,
                    transition,
                })
            }
            DefectAction::NoOp(reason) => {
                tracing::debug!(test_case = %test_case_key, ?reason, "no defect change");
                Ok(ReconcileOutcome::NoOp(reason))
            }
            DefectAction::Flag { issue_keys } => {
                tracing::warn!(
                    test_case = %test_case_key,
                    issues = ?issue_keys,
                    "multiple defects match test case; manual review required"
                );
                Ok(ReconcileOutcome::Flagged { issue_keys })
            }
        }
    }

    async fn create(
        &self,
        test_case_key: &TestCaseKey,
        record: &ReconciliationRecord,
    ) -> Result<ReconcileOutcome, ServiceError> {
        let description = describe_failure(record);
        description.validate()?;
        let issue = NewIssue {
            summary: issue_summary(record),
            description,
            test_case_key: test_case_key.clone(),
        };

        let created = self.tracker.create_issue(&issue).await?;
        tracing::info!(test_case = %test_case_key, issue = %created.key, "defect created");

        let link = match &self.links {
            None => {
                tracing::info!(issue = %created.key, "test management disabled; defect not linked");
                LinkStatus::Skipped
            }
            Some(tm) => match tm.link_issue(test_case_key, &created.id).await {
                Ok(()) => LinkStatus::Linked,
                Err(err) => {
                    tracing::error!(
                        test_case = %test_case_key,
                        error = %err,
                        "linking defect to test case failed"
                    );
                    tracing::error!(
                        issue = %created.key,
                        issue_id = %created.id,
                        "defect exists without a test case link; issue is orphaned"
                    );
                    LinkStatus::Failed(err.to_string())
                }
            },
        };

        Ok(ReconcileOutcome::Created {
            issue_key: created.key,
            link,
        })
    }
}
