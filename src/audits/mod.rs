//! Audit framework
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       AuditRunner                           │
//! │  - Spawns every configured audit concurrently (tokio)       │
//! │  - Checks required artifacts before running an audit        │
//! │  - Normalizes products into AuditResults                    │
//! │  - Isolates audit failures, aborts on contract violations   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Audit Trait                          │
//! │  - meta(): id, titles, required artifacts, display mode     │
//! │  - default_options(): merged under config options           │
//! │  - audit(artifacts, context): produce an AuditProduct       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Audits are registered by id in an `AuditRegistry`; there is no audit
//! class hierarchy.

mod registry;
mod runner;
pub mod statistics;

mod document_title;
mod errors_in_console;
mod is_on_https;
mod resource_summary;
mod structured_data;
mod total_byte_weight;
mod viewport;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::artifacts::Artifacts;
use crate::computed::ComputedCache;
use crate::config::Settings;
use crate::models::{GatherMode, ScoreDisplayMode};

pub use registry::AuditRegistry;
pub use runner::{
    make_audit_result, merge_options, run_audit, AuditRunOutput, AuditRunner, AuditSummary,
    ConfiguredAudit, ProgressCallback,
};

pub use document_title::DocumentTitleAudit;
pub use errors_in_console::ErrorsInConsoleAudit;
pub use is_on_https::IsOnHttpsAudit;
pub use resource_summary::ResourceSummaryAudit;
pub use structured_data::StructuredDataAudit;
pub use total_byte_weight::TotalByteWeightAudit;
pub use viewport::ViewportAudit;

/// Static description of an audit
#[derive(Debug, Clone, PartialEq)]
pub struct AuditMeta {
    pub id: String,
    pub title: String,
    /// Shown instead of `title` when a scored result is below the pass threshold
    pub failure_title: Option<String>,
    pub description: String,
    pub required_artifacts: Vec<String>,
    pub score_display_mode: ScoreDisplayMode,
    /// Gather modes the audit can run in (default: all)
    pub supported_modes: Option<Vec<GatherMode>>,
}

impl AuditMeta {
    pub fn new(id: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            failure_title: None,
            description: description.into(),
            required_artifacts: Vec::new(),
            score_display_mode: ScoreDisplayMode::Binary,
            supported_modes: None,
        }
    }

    pub fn failure_title(mut self, title: impl Into<String>) -> Self {
        self.failure_title = Some(title.into());
        self
    }

    pub fn requires(mut self, artifacts: &[&str]) -> Self {
        self.required_artifacts = artifacts.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn display_mode(mut self, mode: ScoreDisplayMode) -> Self {
        self.score_display_mode = mode;
        self
    }

    pub fn modes(mut self, modes: &[GatherMode]) -> Self {
        self.supported_modes = Some(modes.to_vec());
        self
    }

    pub fn supports(&self, mode: GatherMode) -> bool {
        self.supported_modes
            .as_ref()
            .map(|modes| modes.contains(&mode))
            .unwrap_or(true)
    }
}

/// Score as returned by an audit, before validation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawScore {
    Null,
    Bool(bool),
    Number(f64),
}

impl From<bool> for RawScore {
    fn from(value: bool) -> Self {
        RawScore::Bool(value)
    }
}

impl From<f64> for RawScore {
    fn from(value: f64) -> Self {
        RawScore::Number(value)
    }
}

impl From<Option<f64>> for RawScore {
    fn from(value: Option<f64>) -> Self {
        value.map(RawScore::Number).unwrap_or(RawScore::Null)
    }
}

/// What an audit returns
#[derive(Debug, Clone, PartialEq)]
pub struct AuditProduct {
    pub score: RawScore,
    /// Overrides the display mode declared in the audit's meta
    pub score_display_mode: Option<ScoreDisplayMode>,
    pub not_applicable: bool,
    pub numeric_value: Option<f64>,
    pub numeric_unit: Option<String>,
    pub display_value: Option<String>,
    pub explanation: Option<String>,
    /// Turns the result into an error result
    pub error_message: Option<String>,
    pub warnings: Vec<String>,
    pub details: Option<Value>,
}

impl AuditProduct {
    pub fn new(score: impl Into<RawScore>) -> Self {
        Self {
            score: score.into(),
            score_display_mode: None,
            not_applicable: false,
            numeric_value: None,
            numeric_unit: None,
            display_value: None,
            explanation: None,
            error_message: None,
            warnings: Vec::new(),
            details: None,
        }
    }

    /// Nothing to check on this page
    pub fn not_applicable() -> Self {
        Self {
            not_applicable: true,
            ..Self::new(RawScore::Null)
        }
    }

    /// Unscored result of an informative or manual audit
    pub fn unscored() -> Self {
        Self::new(RawScore::Null)
    }

    pub fn with_mode(mut self, mode: ScoreDisplayMode) -> Self {
        self.score_display_mode = Some(mode);
        self
    }

    pub fn with_numeric(mut self, value: f64, unit: impl Into<String>) -> Self {
        self.numeric_value = Some(value);
        self.numeric_unit = Some(unit.into());
        self
    }

    pub fn with_display_value(mut self, display_value: impl Into<String>) -> Self {
        self.display_value = Some(display_value.into());
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// Everything an audit can reach besides the raw artifacts
#[derive(Clone)]
pub struct AuditContext {
    pub settings: Arc<Settings>,
    /// Shared per-run computed artifact cache
    pub computed: Arc<ComputedCache>,
    /// Default options merged with config overrides
    pub options: Value,
    pub gather_mode: GatherMode,
}

impl AuditContext {
    /// Get a typed option value
    pub fn option<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.options
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Get an option with a default value
    pub fn option_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.option(key).unwrap_or(default)
    }
}

/// Trait for all audits
///
/// # Example Implementation
///
/// ```ignore
/// pub struct HasTitleAudit {
///     meta: AuditMeta,
/// }
///
/// #[async_trait]
/// impl Audit for HasTitleAudit {
///     fn meta(&self) -> &AuditMeta {
///         &self.meta
///     }
///
///     async fn audit(&self, artifacts: &Artifacts, _ctx: &AuditContext) -> anyhow::Result<AuditProduct> {
///         let title: String = artifacts.get_as("DocumentTitle")?;
///         Ok(AuditProduct::new(!title.trim().is_empty()))
///     }
/// }
/// ```
#[async_trait]
pub trait Audit: Send + Sync {
    fn meta(&self) -> &AuditMeta;

    /// Options used when the config supplies none
    fn default_options(&self) -> Value {
        Value::Null
    }

    /// Run the audit. Errors are isolated by the runner and reported as an
    /// error result; they never abort the run.
    async fn audit(&self, artifacts: &Artifacts, context: &AuditContext) -> anyhow::Result<AuditProduct>;
}
