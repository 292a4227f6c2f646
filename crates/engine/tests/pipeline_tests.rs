//! End-to-end runs through the reporter lifecycle against in-memory services.

use std::sync::Arc;

use resultsync_core::model::{ExecutionOutcome, TestCaseKey, TestCompletion, TestCycleKey};
use resultsync_core::{JiraSettings, Secret, SyncConfig, TransitionTable, ZephyrSettings};
use resultsync_engine::memory::{RecordingIssueTracker, RecordingTestManagement};
use resultsync_engine::{LinkStatus, PipelineError, ReconcileOutcome, Reporter, Services};

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

fn completion(title: &str, outcome: ExecutionOutcome, error: Option<&str>) -> TestCompletion {
    TestCompletion {
        title: title.into(),
        outcome,
        duration_ms: 42,
        error: error.map(Into::into),
        steps: vec![],
    }
}

struct Harness {
    tm: Arc<RecordingTestManagement>,
    tracker: Arc<RecordingIssueTracker>,
}

impl Harness {
    fn new() -> Self {
        Self {
            tm: Arc::new(RecordingTestManagement::new()),
            tracker: Arc::new(RecordingIssueTracker::new()),
        }
    }

    fn reporter(&self, config: &SyncConfig) -> Reporter {
        Reporter::new(
            config,
            Services {
                test_management: Some(self.tm.clone()),
                issue_tracker: Some(self.tracker.clone()),
            },
        )
    }
}

#[tokio::test]
async fn test_pass_and_fail_are_synced_and_only_failure_opens_defect() {
    let h = Harness::new();
    let mut reporter = h.reporter(&config());
    reporter.on_begin(2);
    reporter.on_test_end(completion("login works [ABC-T1]", ExecutionOutcome::Passed, None));
    reporter.on_test_end(completion(
        "checkout works [ABC-T2]",
        ExecutionOutcome::Failed,
        Some("\u{1b}[31mexpected 200\u{1b}[39m"),
    ));

    let report = reporter.on_end().await;

    assert_eq!(report.processed, 2);
    assert!(report.failed.is_empty());

    let mut upserts = h.tm.upserts();
    upserts.sort_by(|a, b| a.test_case_key.cmp(&b.test_case_key));
    let statuses: Vec<_> = upserts
        .iter()
        .map(|u| (u.test_case_key.as_str(), u.status_name.as_str()))
        .collect();
    assert_eq!(statuses, [("ABC-T1", "Pass"), ("ABC-T2", "Fail")]);
    assert_eq!(upserts[1].comment, "Test failed with error: expected 200");

    assert_eq!(h.tracker.create_calls(), 1);
    assert!(matches!(
        report.outcome(&TestCaseKey::new("ABC-T2")),
        Some(ReconcileOutcome::Created {
            link: LinkStatus::Linked,
            ..
        })
    ));
    assert_eq!(h.tm.links().len(), 1);
    assert_eq!(h.tm.links()[0].0, TestCaseKey::new("ABC-T2"));
}

#[tokio::test]
async fn test_one_failing_service_call_does_not_stop_the_batch() {
    let h = Harness::new();
    h.tracker.fail_searches_for("ABC-T3");
    let mut reporter = h.reporter(&config());
    for n in 1..=5 {
        reporter.on_test_end(completion(
            &format!("case {n} [ABC-T{n}]"),
            ExecutionOutcome::Failed,
            Some("boom"),
        ));
    }

    let report = reporter.on_end().await;

    assert_eq!(report.processed, 5);
    assert_eq!(report.succeeded(), 4);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, TestCaseKey::new("ABC-T3"));
    assert!(matches!(report.failed[0].1, PipelineError::Reconcile(_)));
    assert_eq!(h.tm.upserts().len(), 5);
    assert_eq!(h.tracker.create_calls(), 4);
}

#[tokio::test]
async fn test_rerun_of_recovered_test_closes_defect_once() {
    let h = Harness::new();
    h.tracker.seed_issue("BUG-3", "Ready For Testing", "ABC-T1");

    for _ in 0..2 {
        let mut reporter = h.reporter(&config());
        reporter.on_test_end(completion("[ABC-T1] login", ExecutionOutcome::Passed, None));
        reporter.on_end().await;
    }

    assert_eq!(h.tracker.transition_calls(), [("BUG-3".to_string(), "31".to_string())]);
    assert_eq!(h.tracker.status_of("BUG-3").as_deref(), Some("Done"));
}

#[tokio::test]
async fn test_untracked_dropped_and_cycleless_reconciled_without_sync() {
    let h = Harness::new();
    let mut cfg = config();
    cfg.default_cycle = None;
    let mut reporter = h.reporter(&cfg);
    reporter.on_test_end(completion("no key here", ExecutionOutcome::Failed, None));
    reporter.on_test_end(completion("[ABC-T1] no cycle", ExecutionOutcome::Failed, None));
    reporter.on_test_end(completion(
        "[ABC-T2] [ABC-R9] own cycle",
        ExecutionOutcome::Failed,
        None,
    ));

    let report = reporter.on_end().await;

    assert_eq!(report.processed, 2);
    assert!(report.failed.is_empty());
    let upserts = h.tm.upserts();
    assert_eq!(upserts.len(), 1);
    assert_eq!(upserts[0].test_case_key, TestCaseKey::new("ABC-T2"));
    assert_eq!(upserts[0].test_cycle_key, "ABC-R9");
    assert_eq!(h.tracker.create_calls(), 2);
    assert_eq!(h.tracker.search(&TestCaseKey::new("ABC-T1")).len(), 1);
}

#[tokio::test]
async fn test_jira_only_run_opens_defect_without_cycle() {
    let h = Harness::new();
    let mut cfg = config();
    cfg.zephyr = None;
    cfg.default_cycle = None;
    let mut reporter = h.reporter(&cfg);
    reporter.on_test_end(completion(
        "checkout works [ABC-T2]",
        ExecutionOutcome::Failed,
        Some("expected 200"),
    ));

    let report = reporter.on_end().await;

    assert_eq!(report.processed, 1);
    assert!(report.failed.is_empty());
    assert!(h.tm.upserts().is_empty());
    assert_eq!(h.tracker.create_calls(), 1);
    assert!(matches!(
        report.outcome(&TestCaseKey::new("ABC-T2")),
        Some(ReconcileOutcome::Created {
            link: LinkStatus::Skipped,
            ..
        })
    ));
}

#[tokio::test]
async fn test_all_integrations_disabled_makes_no_calls() {
    let h = Harness::new();
    let mut reporter = h.reporter(&SyncConfig::default());
    reporter.on_test_end(completion("[ABC-T1] [ABC-R1] x", ExecutionOutcome::Failed, None));

    let report = reporter.on_end().await;

    assert_eq!(report.processed, 0);
    assert!(h.tm.upserts().is_empty());
    assert!(h.tracker.calls().is_empty());
}
