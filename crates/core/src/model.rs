//! Data model shared by the collector, the decision table and the engine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

macro_rules! key_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps `s` without validating its shape.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Borrowed key text.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

key_newtype!(
    /// Test case identity, `<PROJECT>-T<digits>`.
    TestCaseKey
);
key_newtype!(
    /// Test cycle identity, `<PROJECT>-R<digits>`.
    TestCycleKey
);

/// Raw outcome reported by the test-execution host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionOutcome {
    /// Test passed.
    Passed,
    /// Test failed an assertion or threw.
    Failed,
    /// Test was skipped.
    Skipped,
    /// Test exceeded its timeout.
    TimedOut,
    /// Run was interrupted while the test executed.
    Interrupted,
    /// Any outcome string the host may add later.
    Unrecognized,
}

impl ExecutionOutcome {
    /// Parses a host outcome string. Never fails: unknown strings are `Unrecognized`.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "passed" => Self::Passed,
            "failed" => Self::Failed,
            "skipped" => Self::Skipped,
            "timedOut" | "timed-out" | "timed_out" => Self::TimedOut,
            "interrupted" => Self::Interrupted,
            _ => Self::Unrecognized,
        }
    }
}

impl<'de> Deserialize<'de> for ExecutionOutcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// Execution status vocabulary of the test-management service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalStatus {
    /// Execution passed.
    Pass,
    /// Execution failed.
    Fail,
    /// Execution could not run.
    Blocked,
    /// Execution still running.
    InProgress,
    /// Outcome had no mapping.
    Unknown,
}

impl CanonicalStatus {
    /// Status name as sent to the test-management service.
    ///
    /// `Unknown` has no upstream counterpart and is reported as `Blocked`.
    pub fn status_name(self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::Fail => "Fail",
            Self::Blocked | Self::Unknown => "Blocked",
            Self::InProgress => "In Progress",
        }
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pass => "Pass",
            Self::Fail => "Fail",
            Self::Blocked => "Blocked",
            Self::InProgress => "InProgress",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Category the host assigns to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepCategory {
    /// Setup/teardown (`beforeEach`, `afterAll`, ...).
    #[serde(rename = "hook")]
    Hook,
    /// Fixture setup.
    #[serde(rename = "fixture")]
    Fixture,
    /// User-defined step.
    #[serde(rename = "test.step")]
    TestStep,
    /// Assertion.
    #[serde(rename = "expect")]
    Expect,
    /// Browser API call.
    #[serde(rename = "pw:api")]
    Api,
    /// Any other category.
    #[serde(other)]
    Other,
}

impl StepCategory {
    /// Whether the step is excluded from the narrative.
    pub fn is_setup_or_teardown(self) -> bool {
        matches!(self, Self::Hook)
    }
}

impl Default for StepCategory {
    fn default() -> Self {
        Self::Other
    }
}

/// One step of a completed test, in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestStep {
    /// Step title as shown by the host.
    pub title: String,
    /// Host category; unknown categories become `Other`.
    #[serde(default)]
    pub category: StepCategory,
    /// Error text if the step failed.
    #[serde(default)]
    pub error: Option<String>,
}

/// Everything the host delivers when one test finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCompletion {
    /// Free-text title carrying the `[..-T..]` and `[..-R..]` tokens.
    pub title: String,
    /// Raw outcome.
    pub outcome: ExecutionOutcome,
    /// Wall time in milliseconds.
    #[serde(default, alias = "durationMs", alias = "duration")]
    pub duration_ms: u64,
    /// First error message, possibly with ANSI escapes.
    #[serde(default)]
    pub error: Option<String>,
    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<TestStep>,
}

/// Per-step outcome in the narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Step ran without error.
    Pass,
    /// Step reported an error.
    Fail,
}

/// One entry of the step-by-step narrative (`testScriptResults`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    /// `pass` or `fail` on the wire.
    pub status_name: StepStatus,
    /// Human-readable step outcome.
    pub actual_result: String,
}

/// Latest observed result for one test case within a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationRecord {
    /// Test case this record reconciles.
    pub test_case_key: TestCaseKey,
    /// Title the key was extracted from.
    pub title: String,
    /// Mapped status of the latest completion.
    pub status: CanonicalStatus,
    /// Cycle from the title, else the run default. `None` skips execution sync.
    pub test_cycle_key: Option<TestCycleKey>,
    /// Error text with ANSI escapes removed.
    pub error: Option<String>,
    /// Step narrative, setup and teardown excluded.
    pub steps: Vec<StepResult>,
    /// Wall time in milliseconds.
    pub duration_ms: u64,
    /// When the collector saw the completion.
    pub finished_at: DateTime<Utc>,
}

/// Issue reference returned by a tracker search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    /// Issue key, e.g. `BUG-12`.
    pub key: String,
    /// Summary text, possibly empty.
    #[serde(default)]
    pub summary: String,
}

/// Externally owned defect and the status name the tracker last reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIssue {
    /// Issue key.
    pub key: String,
    /// Workflow status name, e.g. `Ready For Testing`.
    pub status_name: String,
}

/// Identity of an issue the tracker just created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedIssue {
    /// Numeric id, used for linking.
    pub id: String,
    /// Issue key.
    pub key: String,
}
