//! In-memory service doubles. Not durable; they record every call so tests
//! and dry runs can inspect what would have been sent.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use resultsync_core::model::{CreatedIssue, ExternalIssue, IssueRef, TestCaseKey};
use resultsync_core::{IssueTransition, TransitionTable};

use crate::error::ServiceError;
use crate::services::{ExecutionReceipt, ExecutionUpsert, IssueTracker, NewIssue, TestManagement};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unavailable(service: &'static str) -> ServiceError {
    ServiceError::Status {
        service,
        status: 503,
        body: "scripted failure".to_string(),
    }
}

/// Test-management double that records upserts and links.
#[derive(Default)]
pub struct RecordingTestManagement {
    inner: Mutex<TmInner>,
}

#[derive(Default)]
struct TmInner {
    upserts: Vec<ExecutionUpsert>,
    links: Vec<(TestCaseKey, String)>,
    fail_upserts_for: BTreeSet<TestCaseKey>,
    fail_links: bool,
}

impl RecordingTestManagement {
    /// Empty double.
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts for `key` fail with HTTP 503.
    pub fn fail_upserts_for(&self, key: &str) {
        lock(&self.inner).fail_upserts_for.insert(TestCaseKey::new(key));
    }

    /// Every link call fails with HTTP 503.
    pub fn fail_links(&self) {
        lock(&self.inner).fail_links = true;
    }

    /// Accepted upserts, in call order.
    pub fn upserts(&self) -> Vec<ExecutionUpsert> {
        lock(&self.inner).upserts.clone()
    }

    /// Accepted links as `(test case, issue id)`.
    pub fn links(&self) -> Vec<(TestCaseKey, String)> {
        lock(&self.inner).links.clone()
    }
}

#[async_trait]
impl TestManagement for RecordingTestManagement {
    async fn upsert_execution(
        &self,
        execution: &ExecutionUpsert,
    ) -> Result<ExecutionReceipt, ServiceError> {
        let mut inner = lock(&self.inner);
        if inner.fail_upserts_for.contains(&execution.test_case_key) {
            return Err(unavailable("zephyr"));
        }
        inner.upserts.push(execution.clone());
        Ok(ExecutionReceipt {
            id: Some(inner.upserts.len() as i64),
            key: None,
        })
    }

    async fn link_issue(
        &self,
        test_case_key: &TestCaseKey,
        issue_id: &str,
    ) -> Result<(), ServiceError> {
        let mut inner = lock(&self.inner);
        if inner.fail_links {
            return Err(unavailable("zephyr"));
        }
        inner.links.push((test_case_key.clone(), issue_id.to_string()));
        Ok(())
    }
}

/// Call log entry of [`RecordingIssueTracker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCall {
    /// Defect search for a test case.
    Search(TestCaseKey),
    /// Status read of an issue.
    Get(String),
    /// Defect creation.
    Create {
        /// Summary sent.
        summary: String,
        /// Test case the defect is tagged with.
        test_case_key: TestCaseKey,
    },
    /// Transition request.
    Transition {
        /// Issue transitioned.
        issue_key: String,
        /// Transition id requested.
        transition_id: String,
    },
}

impl TrackerCall {
    /// Create or transition.
    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::Create { .. } | Self::Transition { .. })
    }
}

#[derive(Debug, Clone)]
struct TrackedIssue {
    key: String,
    summary: String,
    status_name: String,
    test_case_key: TestCaseKey,
}

/// Issue-tracker double with a call log and status changes per transition.
pub struct RecordingIssueTracker {
    inner: Mutex<TrackerInner>,
    transitions: TransitionTable,
}

#[derive(Default)]
struct TrackerInner {
    issues: Vec<TrackedIssue>,
    calls: Vec<TrackerCall>,
    fail_searches_for: BTreeSet<TestCaseKey>,
    fail_creates: bool,
    next_id: u64,
}

impl Default for RecordingIssueTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn status_after(transition: IssueTransition) -> &'static str {
    match transition {
        IssueTransition::ToDo => "To Do",
        IssueTransition::InProgress => "In Progress",
        IssueTransition::Done => "Done",
        IssueTransition::ReadyForTesting => "Ready For Testing",
        IssueTransition::Testing => "testing",
    }
}

impl RecordingIssueTracker {
    /// Tracker with no issues, using the default transition ids.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TrackerInner {
                next_id: 10_000,
                ..TrackerInner::default()
            }),
            transitions: TransitionTable::default(),
        }
    }

    /// Adds an existing defect tagged with `test_case_key`.
    pub fn seed_issue(&self, issue_key: &str, status_name: &str, test_case_key: &str) {
        lock(&self.inner).issues.push(TrackedIssue {
            key: issue_key.to_string(),
            summary: format!("[{test_case_key}] seeded"),
            status_name: status_name.to_string(),
            test_case_key: TestCaseKey::new(test_case_key),
        });
    }

    /// Searches for `key` fail with HTTP 503.
    pub fn fail_searches_for(&self, key: &str) {
        lock(&self.inner).fail_searches_for.insert(TestCaseKey::new(key));
    }

    /// Every create fails with HTTP 503.
    pub fn fail_creates(&self) {
        lock(&self.inner).fail_creates = true;
    }

    /// Full call log.
    pub fn calls(&self) -> Vec<TrackerCall> {
        lock(&self.inner).calls.clone()
    }

    /// Number of create and transition calls.
    pub fn mutating_calls(&self) -> usize {
        lock(&self.inner).calls.iter().filter(|c| c.is_mutating()).count()
    }

    /// Number of create calls.
    pub fn create_calls(&self) -> usize {
        lock(&self.inner)
            .calls
            .iter()
            .filter(|c| matches!(c, TrackerCall::Create { .. }))
            .count()
    }

    /// Transitions as `(issue key, transition id)`.
    pub fn transition_calls(&self) -> Vec<(String, String)> {
        lock(&self.inner)
            .calls
            .iter()
            .filter_map(|c| match c {
                TrackerCall::Transition {
                    issue_key,
                    transition_id,
                } => Some((issue_key.clone(), transition_id.clone())),
                _ => None,
            })
            .collect()
    }

    /// Current matches for `key`, without recording a call.
    pub fn search(&self, key: &TestCaseKey) -> Vec<IssueRef> {
        lock(&self.inner)
            .issues
            .iter()
            .filter(|i| &i.test_case_key == key)
            .map(|i| IssueRef {
                key: i.key.clone(),
                summary: i.summary.clone(),
            })
            .collect()
    }

    /// Current status of `issue_key`.
    pub fn status_of(&self, issue_key: &str) -> Option<String> {
        lock(&self.inner)
            .issues
            .iter()
            .find(|i| i.key == issue_key)
            .map(|i| i.status_name.clone())
    }
}

#[async_trait]
impl IssueTracker for RecordingIssueTracker {
    async fn search_issues(
        &self,
        test_case_key: &TestCaseKey,
    ) -> Result<Vec<IssueRef>, ServiceError> {
        {
            let mut inner = lock(&self.inner);
            inner.calls.push(TrackerCall::Search(test_case_key.clone()));
            if inner.fail_searches_for.contains(test_case_key) {
                return Err(unavailable("jira"));
            }
        }
        Ok(self.search(test_case_key))
    }

    async fn get_issue(&self, issue_key: &str) -> Result<ExternalIssue, ServiceError> {
        let mut inner = lock(&self.inner);
        inner.calls.push(TrackerCall::Get(issue_key.to_string()));
        inner
            .issues
            .iter()
            .find(|i| i.key == issue_key)
            .map(|i| ExternalIssue {
                key: i.key.clone(),
                status_name: i.status_name.clone(),
            })
            .ok_or_else(|| ServiceError::Status {
                service: "jira",
                status: 404,
                body: format!("issue {issue_key} does not exist"),
            })
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<CreatedIssue, ServiceError> {
        let mut inner = lock(&self.inner);
        inner.calls.push(TrackerCall::Create {
            summary: issue.summary.clone(),
            test_case_key: issue.test_case_key.clone(),
        });
        if inner.fail_creates {
            return Err(unavailable("jira"));
        }
        inner.next_id += 1;
        let id = inner.next_id.to_string();
        let key = format!("BUG-{id}");
        inner.issues.push(TrackedIssue {
            key: key.clone(),
            summary: issue.summary.clone(),
            status_name: "To Do".to_string(),
            test_case_key: issue.test_case_key.clone(),
        });
        Ok(CreatedIssue { id, key })
    }

    async fn transition_issue(
        &self,
        issue_key: &str,
        transition_id: &str,
    ) -> Result<(), ServiceError> {
        let next_status = self.transitions.transition(transition_id).map(status_after);
        let mut inner = lock(&self.inner);
        inner.calls.push(TrackerCall::Transition {
            issue_key: issue_key.to_string(),
            transition_id: transition_id.to_string(),
        });
        let Some(issue) = inner.issues.iter_mut().find(|i| i.key == issue_key) else {
            return Err(ServiceError::Status {
                service: "jira",
                status: 404,
                body: format!("issue {issue_key} does not exist"),
            });
        };
        if let Some(status) = next_status {
            issue.status_name = status.to_string();
        }
        Ok(())
    }
}
