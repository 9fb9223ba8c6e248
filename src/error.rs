//! Error types for each layer of the audit pipeline
//!
//! - `ArtifactError`: raw artifact lookup and computed artifact derivation
//! - `AuditError`: fatal audit contract violations (score out of range)
//! - `ScoringError`: aggregation input that cannot be scored
//! - `ConfigError`: invalid category/audit configuration
//! - `RunError`: everything that aborts a whole run
//!
//! Recoverable per-audit failures are not errors at this level: the runner
//! turns them into `AuditResult`s with `scoreDisplayMode = error`.

use thiserror::Error;

/// Failure to provide a raw or computed artifact.
///
/// Cloneable so a single failed computation can be handed to every caller
/// waiting on the same cache key.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArtifactError {
    #[error("Required {0} gatherer did not run.")]
    Missing(String),

    #[error("Required {name} gatherer encountered an error: {message}")]
    GathererFailed { name: String, message: String },

    #[error("artifact {name} has an unexpected shape: {message}")]
    Malformed { name: String, message: String },

    #[error("computed artifact {computation} failed: {message}")]
    Computation {
        computation: &'static str,
        message: String,
    },

    #[error("could not fingerprint input for {computation}: {message}")]
    Fingerprint {
        computation: &'static str,
        message: String,
    },

    #[error("cached value for {computation} has a different type than requested")]
    TypeMismatch { computation: &'static str },
}

impl ArtifactError {
    /// Convenience constructor for computations reporting a failure
    pub fn computation(computation: &'static str, message: impl Into<String>) -> Self {
        ArtifactError::Computation {
            computation,
            message: message.into(),
        }
    }
}

/// Audit contract violations. These indicate a broken audit implementation
/// and abort the run instead of being isolated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuditError {
    #[error("invalid score for {audit_id}: {score}")]
    InvalidScore { audit_id: String, score: String },

    #[error("audit score for {audit_id} is > 1")]
    ScoreAboveOne { audit_id: String },

    #[error("audit score for {audit_id} is < 0")]
    ScoreBelowZero { audit_id: String },
}

/// Aggregation failures. Degenerate input (all-null, zero weight) is not an
/// error; it produces a `None` score.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("no categories configured, refusing to compute an overall score")]
    NoCategories,

    #[error("weight for {id} must be a finite, non-negative number (got {weight})")]
    InvalidWeight { id: String, weight: f64 },

    #[error("score for {id} must be within [0, 1] (got {score})")]
    ScoreOutOfRange { id: String, score: f64 },

    #[error("audit {id} is {mode} but carries no score")]
    MissingScore { id: String, mode: String },

    #[error("invalid log-normal curve: p10 ({p10}) must be positive and below the median ({median})")]
    InvalidCurve { p10: f64, median: f64 },
}

/// Invalid configuration, detected before any audit runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("category {category} references unknown audit {audit}")]
    UnknownAudit { category: String, audit: String },

    #[error("audit {0} is configured but not registered")]
    UnregisteredAudit(String),

    #[error("overall weights reference unknown category {0}")]
    UnknownCategory(String),

    #[error("weight for {id} must be a finite, non-negative number (got {weight})")]
    InvalidWeight { id: String, weight: f64 },

    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Errors that abort a whole run
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("audit task could not be joined: {0}")]
    Join(String),
}

pub type RunResult<T> = std::result::Result<T, RunError>;

/// Text of a caught panic payload (`panic!` with a literal or a format string)
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
