//! Error types for icewatch-client
//!
//! Every expected failure is an explicit `Result` outcome. Callers decide
//! how to message the user; nothing here panics for a foreseeable condition.

use crate::models::DraftField;
use thiserror::Error;

/// Position acquisition failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PositionError {
    /// Location permission not granted after a request
    #[error("Location permission denied")]
    PermissionDenied,

    /// Platform policy forbids location access; no recovery is offered
    #[error("Location access restricted by platform policy")]
    PermissionRestricted,

    /// The OS could not produce a fix (timeout, sensors off)
    #[error("Position unavailable: {0}")]
    PositionUnavailable(String),
}

/// Sighting refresh failure; the previous snapshot stays current
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Fetch failed: {reason}")]
pub struct FetchError {
    pub reason: String,
}

impl FetchError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Submission failures; the draft is left intact for a retry
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SubmissionError {
    /// Required draft fields are absent (no I/O was attempted)
    #[error("Missing required fields: {}", format_fields(.missing))]
    Validation { missing: Vec<DraftField> },

    /// Image read, transport, or server failure
    #[error("Submit failed: {reason}")]
    Submit { reason: String },

    /// A submission of the same draft is still in flight
    #[error("Submission already in progress")]
    AlreadySubmitting,
}

fn format_fields(fields: &[DraftField]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Any client failure
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Position(#[from] PositionError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    /// icewatch-common error (configuration, I/O)
    #[error("Common error: {0}")]
    Common(#[from] icewatch_common::Error),
}

/// Result type for client operations that can fail in more than one component
pub type ClientResult<T> = std::result::Result<T, ClientError>;
