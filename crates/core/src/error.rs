//! Error types of the core crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::transition::IssueTransition;

/// Configuration could not be loaded or resolved.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field of an enabled service is unset.
    #[error("{service} is enabled but `{field}` is not set")]
    Missing {
        /// `zephyr` or `jira`.
        service: &'static str,
        /// Field name as written in the config file.
        field: &'static str,
    },

    /// An enable flag in the environment is not a boolean.
    #[error("environment variable {var} has invalid boolean value '{value}'")]
    InvalidBool {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },

    /// Two transitions are configured with the same id.
    #[error("transition id '{id}' is configured for both {first} and {second}")]
    DuplicateTransitionId {
        /// The shared id.
        id: String,
        /// Transition that claimed the id first.
        first: IssueTransition,
        /// Transition that reused it.
        second: IssueTransition,
    },

    /// The config file could not be read.
    #[error("read config {path}: {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`FileConfig`](crate::FileConfig).
    #[error("parse config {path}: {source}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },
}

/// A rich-text document violates a constraint the tracker enforces.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptionError {
    /// A node that must have children has none.
    #[error("empty node at {0}")]
    EmptyNode(String),

    /// A text node is empty.
    #[error("empty text node at {0}")]
    EmptyText(String),

    /// Heading level outside 1..=6.
    #[error("heading level {0} outside 1..=6")]
    HeadingLevel(u8),
}
