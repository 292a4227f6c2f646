//! Run-scoped adapter for the test host's lifecycle hooks.

use std::sync::Arc;

use resultsync_core::model::TestCompletion;
use resultsync_core::{RecordDisposition, ResultCollector, SyncConfig};
use tracing::Instrument;
use ulid::Ulid;

use crate::jira::JiraClient;
use crate::orchestrator::{BatchOrchestrator, BatchReport, Services};
use crate::services::{IssueTracker, TestManagement};
use crate::zephyr::ZephyrClient;

impl Services {
    /// HTTP clients for every enabled integration.
    pub fn http(config: &SyncConfig) -> Self {
        Self {
            test_management: config
                .zephyr
                .as_ref()
                .map(|s| Arc::new(ZephyrClient::new(s)) as Arc<dyn TestManagement>),
            issue_tracker: config
                .jira
                .as_ref()
                .map(|s| Arc::new(JiraClient::new(s)) as Arc<dyn IssueTracker>),
        }
    }
}

/// One test run: collects completions, then finalizes them at run end.
pub struct Reporter {
    run_id: Ulid,
    collector: ResultCollector,
    orchestrator: BatchOrchestrator,
}

impl Reporter {
    /// Reporter with a fresh run id.
    pub fn new(config: &SyncConfig, services: Services) -> Self {
        Self {
            run_id: Ulid::new(),
            collector: ResultCollector::new(config.default_cycle.clone()),
            orchestrator: BatchOrchestrator::new(config, services),
        }
    }

    /// Id of this run.
    pub fn run_id(&self) -> Ulid {
        self.run_id
    }

    /// Run start hook.
    pub fn on_begin(&self, total: usize) {
        tracing::info!(run_id = %self.run_id, total, "test run started");
        if !self.orchestrator.is_active() {
            tracing::info!("no integration enabled; results will not be synced");
        }
    }

    /// Per-test completion hook.
    pub fn on_test_end(&mut self, completion: TestCompletion) -> RecordDisposition {
        let disposition = self.collector.record(completion);
        if let RecordDisposition::Recorded { key, replaced: true } = &disposition {
            tracing::debug!(test_case = %key, "earlier result for test case replaced");
        }
        disposition
    }

    /// Finalizes every collected record. Resolves once all pipelines are done.
    pub async fn on_end(self) -> BatchReport {
        if !self.orchestrator.is_active() {
            tracing::info!(run_id = %self.run_id, "integrations disabled; skipping finalize");
            return BatchReport::default();
        }
        let span = tracing::info_span!("finalize", run_id = %self.run_id);
        let records = self.collector.into_records();
        let report = self.orchestrator.finalize(records).instrument(span).await;
        tracing::info!(
            run_id = %self.run_id,
            processed = report.processed,
            succeeded = report.succeeded(),
            partial = report.partial_failures(),
            failed = report.failed.len(),
            "results synced"
        );
        report
    }
}
