//! Error types of the engine crate.

use resultsync_core::DescriptionError;
use thiserror::Error;

/// Failure talking to one of the external services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Network or TLS failure.
    #[error("{service} request failed: {source}")]
    Transport {
        /// `zephyr` or `jira`.
        service: &'static str,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status.
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        /// `zephyr` or `jira`.
        service: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// Response body had an unexpected shape.
    #[error("{service} response could not be decoded: {message}")]
    Decode {
        /// `zephyr` or `jira`.
        service: &'static str,
        /// Decoder message.
        message: String,
    },

    /// Request URL could not be built.
    #[error("{service} url could not be built: {message}")]
    Url {
        /// `zephyr` or `jira`.
        service: &'static str,
        /// Parser message.
        message: String,
    },

    /// Payload failed validation and was never sent.
    #[error("payload rejected before sending: {0}")]
    InvalidPayload(#[from] DescriptionError),
}

/// Terminal failure of one record's pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Execution upsert failed; reconciliation did not run.
    #[error("test execution sync failed: {0}")]
    Sync(#[source] ServiceError),

    /// Search, read or mutation against the tracker failed.
    #[error("defect reconciliation failed: {0}")]
    Reconcile(#[source] ServiceError),

    /// The pipeline panicked; payload message attached.
    #[error("pipeline panicked: {0}")]
    Panicked(String),
}
