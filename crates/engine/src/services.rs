//! Collaborator contracts for the two external systems of record.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use resultsync_core::description::Document;
use resultsync_core::model::{CreatedIssue, ExternalIssue, IssueRef, StepResult, TestCaseKey};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Upsert of one execution, keyed upstream by test case + cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionUpsert {
    /// Project the execution belongs to.
    pub project_key: String,
    /// Test case executed.
    pub test_case_key: TestCaseKey,
    /// Cycle the execution is recorded in.
    pub test_cycle_key: String,
    /// `Pass`, `Fail`, `Blocked` or `In Progress`.
    pub status_name: String,
    /// Execution environment name.
    pub environment_name: String,
    /// Executor name.
    pub executed_by: String,
    /// Assignee account id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<String>,
    /// Completion time.
    pub execution_date: DateTime<Utc>,
    /// Completion time.
    pub actual_end_date: DateTime<Utc>,
    /// Milliseconds.
    pub execution_time: u64,
    /// Free-text comment.
    pub comment: String,
    /// Step narrative.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub test_script_results: Vec<StepResult>,
    /// Extra custom fields.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, serde_json::Value>,
}

/// What the test-management service returns for an upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExecutionReceipt {
    /// Execution id, when returned.
    #[serde(default)]
    pub id: Option<i64>,
    /// Execution key, when returned.
    #[serde(default)]
    pub key: Option<String>,
}

/// Defect to open for a failing test case.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIssue {
    /// One-line summary.
    pub summary: String,
    /// Validated rich-text description.
    pub description: Document,
    /// Test case the defect is tagged with.
    pub test_case_key: TestCaseKey,
}

/// Test-management service (Zephyr Scale).
#[async_trait]
pub trait TestManagement: Send + Sync {
    /// Creates or updates the execution keyed by test case and cycle.
    async fn upsert_execution(
        &self,
        execution: &ExecutionUpsert,
    ) -> Result<ExecutionReceipt, ServiceError>;

    /// Links the issue with numeric id `issue_id` to the test case.
    async fn link_issue(&self, test_case_key: &TestCaseKey, issue_id: &str)
        -> Result<(), ServiceError>;
}

/// Issue tracker (Jira).
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Defects tagged with `test_case_key`, in the tracker's order.
    async fn search_issues(&self, test_case_key: &TestCaseKey)
        -> Result<Vec<IssueRef>, ServiceError>;

    /// Reads the issue's current status.
    async fn get_issue(&self, issue_key: &str) -> Result<ExternalIssue, ServiceError>;

    /// Creates a defect.
    async fn create_issue(&self, issue: &NewIssue) -> Result<CreatedIssue, ServiceError>;

    /// Requests `transition_id` on the issue.
    async fn transition_issue(&self, issue_key: &str, transition_id: &str)
        -> Result<(), ServiceError>;
}
