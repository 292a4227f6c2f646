//! Run-scoped result collection.

use std::collections::BTreeMap;

use chrono::Utc;

use crate::identity::extract_keys;
use crate::model::{ReconciliationRecord, TestCaseKey, TestCompletion, TestCycleKey};
use crate::narrative::{build_step_narrative, strip_ansi};
use crate::status::map_outcome;

/// What happened to a completion handed to the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordDisposition {
    /// Stored under `key`.
    Recorded {
        /// Test case the record is stored under.
        key: TestCaseKey,
        /// An earlier result for the same key was overwritten.
        replaced: bool,
    },
    /// No test-case key in the title; not tracked externally.
    Untracked,
}

/// Run-scoped store of the latest result per test case.
///
/// The host delivers completions one at a time, so this is plain owned state.
#[derive(Debug, Default)]
pub struct ResultCollector {
    default_cycle: Option<TestCycleKey>,
    records: BTreeMap<TestCaseKey, ReconciliationRecord>,
}

impl ResultCollector {
    /// `default_cycle` applies to titles without an `[..-R..]` token.
    pub fn new(default_cycle: Option<TestCycleKey>) -> Self {
        Self {
            default_cycle,
            records: BTreeMap::new(),
        }
    }

    /// Stores the completion as the latest result for its test case.
    pub fn record(&mut self, completion: TestCompletion) -> RecordDisposition {
        let keys = extract_keys(&completion.title);
        let Some(test_case_key) = keys.test_case_key else {
            tracing::info!(title = %completion.title, "no test case key in title; not tracked");
            return RecordDisposition::Untracked;
        };

        let test_cycle_key = keys.test_cycle_key.or_else(|| self.default_cycle.clone());
        if test_cycle_key.is_none() {
            tracing::info!(
                test_case = %test_case_key,
                "no test cycle key for test; execution will not be synced"
            );
        }

        let record = ReconciliationRecord {
            test_case_key: test_case_key.clone(),
            status: map_outcome(completion.outcome),
            test_cycle_key,
            error: completion
                .error
                .as_deref()
                .map(strip_ansi)
                .filter(|e| !e.trim().is_empty()),
            steps: build_step_narrative(&completion.steps),
            duration_ms: completion.duration_ms,
            finished_at: Utc::now(),
            title: completion.title,
        };

        tracing::debug!(test_case = %test_case_key, status = %record.status, "recorded result");
        let replaced = self.records.insert(test_case_key.clone(), record).is_some();
        RecordDisposition::Recorded {
            key: test_case_key,
            replaced,
        }
    }

    /// Number of distinct test cases recorded.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Latest record for `key`.
    pub fn get(&self, key: &TestCaseKey) -> Option<&ReconciliationRecord> {
        self.records.get(key)
    }

    /// Hands the run's records to the finalize step, ordered by key.
    pub fn into_records(self) -> Vec<ReconciliationRecord> {
        self.records.into_values().collect()
    }
}
