//! Execution sync against the test-management service.

use std::collections::BTreeMap;
use std::sync::Arc;

use resultsync_core::model::ReconciliationRecord;
use resultsync_core::ZephyrSettings;

use crate::error::ServiceError;
use crate::services::{ExecutionReceipt, ExecutionUpsert, TestManagement};

/// Pushes one record's execution status and narrative to the test-management service.
pub struct TestManagementSync {
    client: Arc<dyn TestManagement>,
    settings: ZephyrSettings,
}

impl TestManagementSync {
    /// Sync step using `client` with the given project settings.
    pub fn new(client: Arc<dyn TestManagement>, settings: ZephyrSettings) -> Self {
        Self { client, settings }
    }

    /// Builds the upsert for `record`, or `None` when it has no test cycle.
    /// Deterministic for a given record.
    pub fn execution_for(&self, record: &ReconciliationRecord) -> Option<ExecutionUpsert> {
        let test_cycle_key = record.test_cycle_key.as_ref()?;
        let status_name = record.status.status_name();
        let comment = match &record.error {
            Some(err) => format!("Test failed with error: {err}"),
            None => format!(
                "Test execution {} updated to status: {status_name}",
                record.test_case_key
            ),
        };
        Some(ExecutionUpsert {
            project_key: self.settings.project_key.clone(),
            test_case_key: record.test_case_key.clone(),
            test_cycle_key: test_cycle_key.to_string(),
            status_name: status_name.to_string(),
            environment_name: self.settings.environment_name.clone(),
            executed_by: self.settings.executed_by.clone(),
            assigned_to_id: self.settings.assigned_to_id.clone(),
            execution_date: record.finished_at,
            actual_end_date: record.finished_at,
            execution_time: record.duration_ms,
            comment,
            test_script_results: record.steps.clone(),
            custom_fields: BTreeMap::new(),
        })
    }

    /// Upserts the execution for `record`. `Ok(None)` means the record has no
    /// cycle and nothing was sent.
    pub async fn sync_execution(
        &self,
        record: &ReconciliationRecord,
    ) -> Result<Option<ExecutionReceipt>, ServiceError> {
        let Some(execution) = self.execution_for(record) else {
            tracing::info!(test_case = %record.test_case_key, "no test cycle; execution not synced");
            return Ok(None);
        };
        let receipt = self.client.upsert_execution(&execution).await?;
        tracing::info!(
            test_case = %record.test_case_key,
            cycle = %execution.test_cycle_key,
            status = %execution.status_name,
            "test execution updated"
        );
        Ok(Some(receipt))
    }
}
