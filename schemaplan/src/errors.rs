use thiserror::Error;

use crate::step::StepKind;

/// Top-level error type returned by the planning pipeline.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The schema is not well formed (duplicate identity keys, dangling references).
    #[error("malformed schema at '{key}': {reason}")]
    MalformedSchema { key: String, reason: String },

    /// A structural change exists that the step vocabulary cannot express.
    #[error("unsupported change at '{target}': {detail}")]
    UnsupportedChange { target: String, detail: String },

    /// Policy gate: the plan contains destructive steps and no override was given.
    #[error("plan contains destructive steps without override: {}", .targets.join(", "))]
    DestructiveWithoutOverride { targets: Vec<String> },

    /// A step reached the aggregator without an assigned risk level.
    #[error("step {kind} at '{}' was never classified", .target.as_deref().unwrap_or("<none>"))]
    Unclassified { kind: StepKind, target: Option<String> },

    /// Writing an output document failed; the input itself was fine.
    #[error("failed to write {path}: {source}")]
    Write { path: String, source: std::io::Error },

    /// Reading a schema or snapshot document failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A schema or snapshot document could not be decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlanError {
    pub fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedSchema {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported(target: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::UnsupportedChange {
            target: target.into(),
            detail: detail.into(),
        }
    }

    /// Whether this error stems from bad input rather than from policy.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PlanError::MalformedSchema { .. }
                | PlanError::UnsupportedChange { .. }
                | PlanError::Io(_)
                | PlanError::Json(_)
        )
    }
}

/// Errors raised by the drift baseline store.
#[derive(Debug, Error)]
pub enum BaselineError {
    /// The stored hash did not match the caller's expectation.
    #[error("baseline conflict (expected {expected:?}, actual {actual:?})")]
    Conflict {
        expected: Option<String>,
        actual: Option<String>,
    },

    /// Another process currently holds the baseline lock.
    #[error("baseline is locked by another process: {path}")]
    Locked { path: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the library.
pub type PlanResult<T> = Result<T, PlanError>;
