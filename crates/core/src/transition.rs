//! Workflow transition vocabulary and its configured ids.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Workflow transitions the engine may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueTransition {
    /// Back to the backlog.
    ToDo,
    /// Work resumed.
    InProgress,
    /// Fixed and verified.
    Done,
    /// Fix awaiting verification.
    ReadyForTesting,
    /// Verification running.
    Testing,
}

impl IssueTransition {
    /// Every transition, in declaration order.
    pub const ALL: [IssueTransition; 5] = [
        Self::ToDo,
        Self::InProgress,
        Self::Done,
        Self::ReadyForTesting,
        Self::Testing,
    ];

    /// Symbolic name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::ToDo => "to-do",
            Self::InProgress => "in-progress",
            Self::Done => "done",
            Self::ReadyForTesting => "ready-for-testing",
            Self::Testing => "testing",
        }
    }
}

impl fmt::Display for IssueTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Transition ids configured on the tracker's workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionIds {
    /// Id of the to-do transition.
    pub to_do: String,
    /// Id of the in-progress transition.
    pub in_progress: String,
    /// Id of the done transition.
    pub done: String,
    /// Id of the ready-for-testing transition.
    pub ready_for_testing: String,
    /// Id of the testing transition.
    pub testing: String,
}

impl TransitionIds {
    fn pairs(&self) -> [(IssueTransition, &str); 5] {
        [
            (IssueTransition::ToDo, &self.to_do),
            (IssueTransition::InProgress, &self.in_progress),
            (IssueTransition::Done, &self.done),
            (IssueTransition::ReadyForTesting, &self.ready_for_testing),
            (IssueTransition::Testing, &self.testing),
        ]
    }
}

impl Default for TransitionIds {
    fn default() -> Self {
        Self {
            to_do: "11".to_string(),
            in_progress: "21".to_string(),
            done: "31".to_string(),
            ready_for_testing: "3".to_string(),
            testing: "2".to_string(),
        }
    }
}

/// Bidirectional transition ↔ id table, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    by_transition: BTreeMap<IssueTransition, String>,
    by_id: BTreeMap<String, IssueTransition>,
}

impl TransitionTable {
    /// Builds the table. Two transitions sharing an id is a config error.
    pub fn new(ids: &TransitionIds) -> Result<Self, ConfigError> {
        let mut by_transition = BTreeMap::new();
        let mut by_id = BTreeMap::new();
        for (transition, id) in ids.pairs() {
            if let Some(&first) = by_id.get(id) {
                return Err(ConfigError::DuplicateTransitionId {
                    id: id.to_string(),
                    first,
                    second: transition,
                });
            }
            by_transition.insert(transition, id.to_string());
            by_id.insert(id.to_string(), transition);
        }
        Ok(Self {
            by_transition,
            by_id,
        })
    }

    /// Configured id for `transition`.
    pub fn id(&self, transition: IssueTransition) -> &str {
        // every variant is inserted in `new`
        self.by_transition
            .get(&transition)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Transition configured under `id`, if any.
    pub fn transition(&self, id: &str) -> Option<IssueTransition> {
        self.by_id.get(id).copied()
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        let ids = TransitionIds::default();
        let pairs = ids.pairs();
        Self {
            by_transition: pairs.iter().map(|&(t, id)| (t, id.to_string())).collect(),
            by_id: pairs.iter().map(|&(t, id)| (id.to_string(), t)).collect(),
        }
    }
}
