#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Async side of resultsync: service contracts, their HTTP clients, and the
//! batch pipeline that syncs executions and reconciles defects at run end.

pub mod error;
mod http;
pub mod jira;
pub mod memory;
pub mod orchestrator;
pub mod reconcile;
pub mod reporter;
pub mod services;
pub mod sync;
pub mod zephyr;

pub use error::{PipelineError, ServiceError};
pub use jira::JiraClient;
pub use orchestrator::{BatchOrchestrator, BatchReport, Services};
pub use reconcile::{DefectReconciler, LinkStatus, ReconcileOutcome};
pub use reporter::Reporter;
pub use services::{ExecutionReceipt, ExecutionUpsert, IssueTracker, NewIssue, TestManagement};
pub use sync::TestManagementSync;
pub use zephyr::ZephyrClient;
