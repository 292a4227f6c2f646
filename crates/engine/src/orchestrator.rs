//! Concurrent per-record pipelines for one run.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use resultsync_core::model::{ReconciliationRecord, TestCaseKey};
use resultsync_core::SyncConfig;
use tracing::Instrument;

use crate::error::PipelineError;
use crate::reconcile::{DefectReconciler, ReconcileOutcome};
use crate::services::{IssueTracker, TestManagement};
use crate::sync::TestManagementSync;

/// Service handles for one run. `None` means the integration is off.
#[derive(Clone, Default)]
pub struct Services {
    /// Zephyr Scale client.
    pub test_management: Option<Arc<dyn TestManagement>>,
    /// Jira client.
    pub issue_tracker: Option<Arc<dyn IssueTracker>>,
}

/// Result of one `finalize` call.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Records handed to the orchestrator.
    pub processed: usize,
    /// Pipelines that completed.
    pub outcomes: Vec<(TestCaseKey, ReconcileOutcome)>,
    /// Pipelines that returned an error or panicked.
    pub failed: Vec<(TestCaseKey, PipelineError)>,
}

impl BatchReport {
    /// Number of completed pipelines.
    pub fn succeeded(&self) -> usize {
        self.outcomes.len()
    }

    /// Records whose defect was created but could not be linked.
    pub fn partial_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.is_partial_failure())
            .count()
    }

    /// Outcome for `key`, if its pipeline completed.
    pub fn outcome(&self, key: &TestCaseKey) -> Option<&ReconcileOutcome> {
        self.outcomes.iter().find(|(k, _)| k == key).map(|(_, o)| o)
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} succeeded ({} partial), {} failed",
            self.processed,
            self.succeeded(),
            self.partial_failures(),
            self.failed.len()
        )
    }
}

/// Fans out one sync-then-reconcile pipeline per record.
pub struct BatchOrchestrator {
    sync: Option<TestManagementSync>,
    defects: Option<DefectReconciler>,
}

impl BatchOrchestrator {
    /// An integration runs only when it is both configured and has a handle.
    pub fn new(config: &SyncConfig, services: Services) -> Self {
        let test_management = config
            .zephyr
            .as_ref()
            .and(services.test_management);
        let sync = match (&config.zephyr, &test_management) {
            (Some(settings), Some(client)) => {
                Some(TestManagementSync::new(client.clone(), settings.clone()))
            }
            _ => None,
        };
        let defects = match (&config.jira, services.issue_tracker) {
            (Some(settings), Some(tracker)) => Some(DefectReconciler::new(
                tracker,
                test_management,
                settings.transitions.clone(),
            )),
            _ => None,
        };
        Self { sync, defects }
    }

    /// At least one integration will run.
    pub fn is_active(&self) -> bool {
        self.sync.is_some() || self.defects.is_some()
    }

    /// Runs every record's pipeline concurrently and waits for all of them.
    /// Individual failures, panics included, land in [`BatchReport::failed`].
    pub async fn finalize(&self, records: Vec<ReconciliationRecord>) -> BatchReport {
        let pipelines = records.iter().map(|record| {
            let span = tracing::info_span!("pipeline", test_case = %record.test_case_key);
            AssertUnwindSafe(self.pipeline(record))
                .catch_unwind()
                .map(|caught| caught.unwrap_or_else(|payload| Err(panicked(payload))))
                .instrument(span)
        });
        let results = join_all(pipelines).await;

        let mut report = BatchReport {
            processed: records.len(),
            ..BatchReport::default()
        };
        for (record, result) in records.into_iter().zip(results) {
            match result {
                Ok(outcome) => report.outcomes.push((record.test_case_key, outcome)),
                Err(err) => {
                    tracing::error!(test_case = %record.test_case_key, error = %err, "record pipeline failed");
                    report.failed.push((record.test_case_key, err));
                }
            }
        }
        report
    }

    async fn pipeline(
        &self,
        record: &ReconciliationRecord,
    ) -> Result<ReconcileOutcome, PipelineError> {
        if let Some(sync) = &self.sync {
            sync.sync_execution(record)
                .await
                .map_err(PipelineError::Sync)?;
        }
        match &self.defects {
            Some(defects) => defects
                .reconcile(&record.test_case_key, record)
                .await
                .map_err(PipelineError::Reconcile),
            None => Ok(ReconcileOutcome::Skipped),
        }
    }
}

fn panicked(payload: Box<dyn Any + Send>) -> PipelineError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    PipelineError::Panicked(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use resultsync_core::model::{CanonicalStatus, TestCycleKey};
    use resultsync_core::{JiraSettings, Secret, TransitionTable, ZephyrSettings};

    use crate::error::ServiceError;
    use crate::memory::{RecordingIssueTracker, RecordingTestManagement};
    use crate::services::{ExecutionReceipt, ExecutionUpsert};

    fn config() -> SyncConfig {
        SyncConfig {
            default_cycle: Some(TestCycleKey::new("ABC-R1")),
            zephyr: Some(ZephyrSettings {
                base_url: "https://zephyr.example/v2".into(),
                access_token: Secret::new("z"),
                default_cycle: TestCycleKey::new("ABC-R1"),
                project_key: "ABC".into(),
                environment_name: "TEST".into(),
                executed_by: "Automated Test Runner".into(),
                assigned_to_id: None,
            }),
            jira: Some(JiraSettings {
                base_url: "https://example.atlassian.net".into(),
                email: "qa@example.com".into(),
                access_token: Secret::new("j"),
                project_key: "ABC".into(),
                issue_type_id: "10004".into(),
                reporter_id: None,
                test_case_field: "customfield_10069".into(),
                test_case_jql_field: "TestCaseID".into(),
                transitions: TransitionTable::default(),
            }),
        }
    }

    fn record(key: &str, status: CanonicalStatus) -> ReconciliationRecord {
        ReconciliationRecord {
            test_case_key: TestCaseKey::new(key),
            title: format!("[{key}] case"),
            status,
            test_cycle_key: Some(TestCycleKey::new("ABC-R1")),
            error: None,
            steps: vec![],
            duration_ms: 1,
            finished_at: Utc::now(),
        }
    }

    struct PanickingTestManagement;

    #[async_trait]
    impl TestManagement for PanickingTestManagement {
        async fn upsert_execution(
            &self,
            execution: &ExecutionUpsert,
        ) -> Result<ExecutionReceipt, ServiceError> {
            if execution.test_case_key.as_str() == "ABC-T2" {
                panic!("upsert exploded");
            }
            Ok(ExecutionReceipt::default())
        }

        async fn link_issue(&self, _: &TestCaseKey, _: &str) -> Result<(), ServiceError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_sync_skips_reconcile_for_that_record_only() {
        let tm = Arc::new(RecordingTestManagement::new());
        tm.fail_upserts_for("ABC-T2");
        let tracker = Arc::new(RecordingIssueTracker::new());
        let orchestrator = BatchOrchestrator::new(
            &config(),
            Services {
                test_management: Some(tm.clone()),
                issue_tracker: Some(tracker.clone()),
            },
        );

        let report = orchestrator
            .finalize(vec![
                record("ABC-T1", CanonicalStatus::Fail),
                record("ABC-T2", CanonicalStatus::Fail),
                record("ABC-T3", CanonicalStatus::Fail),
            ])
            .await;

        assert_eq!(report.processed, 3);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, TestCaseKey::new("ABC-T2"));
        assert!(matches!(report.failed[0].1, PipelineError::Sync(_)));
        assert!(tracker.search(&TestCaseKey::new("ABC-T2")).is_empty());
        assert_eq!(tracker.create_calls(), 2);
    }

    #[tokio::test]
    async fn panic_in_one_pipeline_is_contained() {
        let orchestrator = BatchOrchestrator::new(
            &config(),
            Services {
                test_management: Some(Arc::new(PanickingTestManagement)),
                issue_tracker: None,
            },
        );

        let report = orchestrator
            .finalize(vec![
                record("ABC-T1", CanonicalStatus::Pass),
                record("ABC-T2", CanonicalStatus::Pass),
                record("ABC-T3", CanonicalStatus::Pass),
            ])
            .await;

        assert_eq!(report.succeeded(), 2);
        match &report.failed[..] {
            [(key, PipelineError::Panicked(msg))] => {
                assert_eq!(key.as_str(), "ABC-T2");
                assert_eq!(msg, "upsert exploded");
            }
            other => panic!("unexpected failures: {other:?}"),
        }
    }

    #[tokio::test]
    async fn disabled_tracker_reports_skipped() {
        let mut cfg = config();
        cfg.jira = None;
        let tracker = Arc::new(RecordingIssueTracker::new());
        let orchestrator = BatchOrchestrator::new(
            &cfg,
            Services {
                test_management: Some(Arc::new(RecordingTestManagement::new())),
                issue_tracker: Some(tracker.clone()),
            },
        );

        let report = orchestrator
            .finalize(vec![record("ABC-T1", CanonicalStatus::Fail)])
            .await;

        assert_eq!(
            report.outcome(&TestCaseKey::new("ABC-T1")),
            Some(&ReconcileOutcome::Skipped)
        );
        assert!(tracker.calls().is_empty());
    }

    #[tokio::test]
    async fn jira_only_run_reconciles_records_without_cycle() {
        let mut cfg = config();
        cfg.zephyr = None;
        cfg.default_cycle = None;
        let tm = Arc::new(RecordingTestManagement::new());
        let tracker = Arc::new(RecordingIssueTracker::new());
        let orchestrator = BatchOrchestrator::new(
            &cfg,
            Services {
                test_management: Some(tm.clone()),
                issue_tracker: Some(tracker.clone()),
            },
        );
        let mut r = record("ABC-T1", CanonicalStatus::Fail);
        r.test_cycle_key = None;

        let report = orchestrator.finalize(vec![r]).await;

        assert!(report.failed.is_empty());
        assert!(matches!(
            report.outcome(&TestCaseKey::new("ABC-T1")),
            Some(ReconcileOutcome::Created { .. })
        ));
        assert_eq!(tracker.create_calls(), 1);
        assert!(tm.upserts().is_empty());
    }

    #[test]
    fn unconfigured_services_leave_orchestrator_inactive() {
        let orchestrator = BatchOrchestrator::new(&SyncConfig::default(), Services::default());
        assert!(!orchestrator.is_active());
    }
}
