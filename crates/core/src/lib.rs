#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Domain model and pure decision logic for reconciling test results against
//! a test-management service and an issue tracker.

pub mod collector;
pub mod config;
pub mod decision;
pub mod description;
pub mod error;
pub mod identity;
pub mod model;
pub mod narrative;
pub mod status;
pub mod transition;

pub use collector::{RecordDisposition, ResultCollector};
pub use config::{FileConfig, JiraSettings, Secret, SyncConfig, ZephyrSettings};
pub use decision::{decide, DefectAction, DefectState, NoOpReason};
pub use error::{ConfigError, DescriptionError};
pub use identity::{extract_keys, ExtractedKeys};
pub use status::map_outcome;
pub use transition::{IssueTransition, TransitionIds, TransitionTable};
