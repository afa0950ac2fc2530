//! # Error Types
//!
//! Structured error types for bridge_core. Setup problems (an inconsistent
//! timeline, bad geometry) are reported as complete lists so a caller can show
//! every problem at once. Problems found mid-computation abort the pass.
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::errors::{BridgeError, BridgeResult};
//!
//! fn validate_length(length: f64) -> BridgeResult<()> {
//!     if length <= 0.0 {
//!         return Err(BridgeError::geometry("segment 0", "length must be positive"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(validate_length(-1.0).is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::timeline::TimelineIssue;

/// Result type alias for bridge_core operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Structured error type for analysis operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum BridgeError {
    /// The timeline failed validation. Every issue found is listed.
    #[error("Timeline is inconsistent ({} issue(s)): {}", .issues.len(), summarize(.issues))]
    TimelineConsistency { issues: Vec<TimelineIssue> },

    /// A code-provision model was evaluated outside its assumptions
    #[error("Assumption violated in {model} for '{parameter}' = {value}: {reason}")]
    AssumptionViolated {
        model: String,
        parameter: String,
        value: String,
        reason: String,
    },

    /// A computation stage's inputs failed self-check
    #[error("{stage} validation failed: {reason}")]
    AgentValidationFailure { stage: String, reason: String },

    /// An approximate method is not applicable; a refined method is required
    #[error("Refined analysis required for {method}: {reason}")]
    RefinedAnalysisRequired { method: String, reason: String },

    /// Invalid bridge geometry
    #[error("Geometry error in {element}: {reason}")]
    GeometryError { element: String, reason: String },

    /// The analysis pass was cancelled at a checkpoint
    #[error("Computation aborted during {stage}{}", .interval.map(|i| format!(" at interval {}", i)).unwrap_or_default())]
    ComputationAborted { stage: String, interval: Option<usize> },

    /// An input value is invalid (out of range, wrong type, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn summarize(issues: &[TimelineIssue]) -> String {
    issues
        .iter()
        .map(|issue| issue.code())
        .collect::<Vec<_>>()
        .join(", ")
}

impl BridgeError {
    /// Create an AssumptionViolated error
    pub fn assumption(
        model: impl Into<String>,
        parameter: impl Into<String>,
        value: f64,
        reason: impl Into<String>,
    ) -> Self {
        BridgeError::AssumptionViolated {
            model: model.into(),
            parameter: parameter.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an AgentValidationFailure error
    pub fn validation(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::AgentValidationFailure {
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    /// Create a RefinedAnalysisRequired error
    pub fn refined_analysis(method: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::RefinedAnalysisRequired {
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// Create a GeometryError
    pub fn geometry(element: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::GeometryError {
            element: element.into(),
            reason: reason.into(),
        }
    }

    /// Create a ComputationAborted error
    pub fn aborted(stage: impl Into<String>, interval: Option<usize>) -> Self {
        BridgeError::ComputationAborted {
            stage: stage.into(),
            interval,
        }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        BridgeError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        BridgeError::Internal {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BridgeError::FileLocked { .. } | BridgeError::ComputationAborted { .. }
        )
    }

    /// Timeline issues carried by this error, if any
    pub fn timeline_issues(&self) -> &[TimelineIssue] {
        match self {
            BridgeError::TimelineConsistency { issues } => issues,
            _ => &[],
        }
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            BridgeError::TimelineConsistency { .. } => "TIMELINE_CONSISTENCY",
            BridgeError::AssumptionViolated { .. } => "ASSUMPTION_VIOLATED",
            BridgeError::AgentValidationFailure { .. } => "AGENT_VALIDATION_FAILURE",
            BridgeError::RefinedAnalysisRequired { .. } => "REFINED_ANALYSIS_REQUIRED",
            BridgeError::GeometryError { .. } => "GEOMETRY_ERROR",
            BridgeError::ComputationAborted { .. } => "COMPUTATION_ABORTED",
            BridgeError::InvalidInput { .. } => "INVALID_INPUT",
            BridgeError::FileError { .. } => "FILE_ERROR",
            BridgeError::FileLocked { .. } => "FILE_LOCKED",
            BridgeError::SerializationError { .. } => "SERIALIZATION_ERROR",
            BridgeError::VersionMismatch { .. } => "VERSION_MISMATCH",
            BridgeError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{EventId, TimelineIssue, TimelineIssueKind};

    #[test]
    fn test_error_serialization() {
        let error = BridgeError::assumption("AASHTO LRFD", "age", -2.0, "Concrete age must be positive");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("AssumptionViolated"));
        let roundtrip: BridgeError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(BridgeError::geometry("segment 1", "bad").error_code(), "GEOMETRY_ERROR");
        assert_eq!(
            BridgeError::refined_analysis("distribution factors", "S out of range").error_code(),
            "REFINED_ANALYSIS_REQUIRED"
        );
        assert_eq!(BridgeError::aborted("losses", Some(3)).error_code(), "COMPUTATION_ABORTED");
    }

    #[test]
    fn test_recoverable() {
        assert!(BridgeError::aborted("sections", None).is_recoverable());
        assert!(BridgeError::file_locked("a.pgx", "me", "now").is_recoverable());
        assert!(!BridgeError::validation("losses", "out of order").is_recoverable());
    }

    #[test]
    fn test_timeline_error_lists_every_issue() {
        let error = BridgeError::TimelineConsistency {
            issues: vec![
                TimelineIssue::new(TimelineIssueKind::CastDeckActivityRequired, None),
                TimelineIssue::new(TimelineIssueKind::FinalEventHasActivities, Some(EventId(4))),
            ],
        };
        let message = error.to_string();
        assert!(message.contains("2 issue(s)"));
        assert!(message.contains("TLM_CAST_DECK_ACTIVITY_REQUIRED"));
        assert!(message.contains("TLM_FINAL_EVENT_HAS_ACTIVITIES"));
        assert_eq!(error.timeline_issues().len(), 2);
    }

    #[test]
    fn test_aborted_message_includes_interval() {
        let error = BridgeError::aborted("time-step losses", Some(2));
        assert_eq!(error.to_string(), "Computation aborted during time-step losses at interval 2");
    }
}
