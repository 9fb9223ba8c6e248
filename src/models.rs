//! Data models shared by the runner, the scorer and the reporters

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::config::{GroupConfig, Settings};

/// Score at or above which a scored audit is shown as passing
pub const PASS_THRESHOLD: f64 = 0.9;

/// How the raw artifacts were gathered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatherMode {
    #[default]
    Navigation,
    Timespan,
    Snapshot,
}

impl fmt::Display for GatherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatherMode::Navigation => write!(f, "navigation"),
            GatherMode::Timespan => write!(f, "timespan"),
            GatherMode::Snapshot => write!(f, "snapshot"),
        }
    }
}

impl std::str::FromStr for GatherMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "navigation" => Ok(GatherMode::Navigation),
            "timespan" => Ok(GatherMode::Timespan),
            "snapshot" => Ok(GatherMode::Snapshot),
            _ => Err(format!(
                "unknown gather mode '{}' (expected navigation, timespan or snapshot)",
                s
            )),
        }
    }
}

/// How an audit's score is meant to be displayed and aggregated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoreDisplayMode {
    Binary,
    Numeric,
    Informative,
    Manual,
    NotApplicable,
    Error,
}

impl ScoreDisplayMode {
    /// Whether results in this mode carry a numeric score
    pub fn is_scored(self) -> bool {
        matches!(self, ScoreDisplayMode::Binary | ScoreDisplayMode::Numeric)
    }
}

impl fmt::Display for ScoreDisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScoreDisplayMode::Binary => "binary",
            ScoreDisplayMode::Numeric => "numeric",
            ScoreDisplayMode::Informative => "informative",
            ScoreDisplayMode::Manual => "manual",
            ScoreDisplayMode::NotApplicable => "notApplicable",
            ScoreDisplayMode::Error => "error",
        };
        f.write_str(s)
    }
}

/// Normalized output of one audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// `None` iff `score_display_mode` is unscored
    pub score: Option<f64>,
    pub score_display_mode: ScoreDisplayMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl AuditResult {
    /// Build an error result for an audit that failed to run
    pub fn error(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            score: None,
            score_display_mode: ScoreDisplayMode::Error,
            numeric_value: None,
            numeric_unit: None,
            display_value: None,
            explanation: None,
            error_message: Some(message.into()),
            warnings: Vec::new(),
            details: None,
        }
    }

    /// Whether the result should be displayed as passing
    pub fn passed(&self) -> bool {
        self.score.map(|s| s >= PASS_THRESHOLD).unwrap_or(false)
    }
}

/// One audit reference inside a category, in configured display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRefResult {
    pub id: String,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acronym: Option<String>,
}

/// A scored category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResult {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_modes: Option<Vec<GatherMode>>,
    pub score: Option<f64>,
    pub audit_refs: Vec<AuditRefResult>,
}

/// A single timing measurement recorded during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingEntry {
    pub name: String,
    /// Offset from the start of the run, in milliseconds
    pub start_time: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub entries: Vec<TimingEntry>,
    /// Total run time in milliseconds
    pub total: f64,
}

/// Final result of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResult {
    pub tool_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_document_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_displayed_url: Option<String>,
    pub fetch_time: String,
    pub gather_mode: GatherMode,
    #[serde(default)]
    pub run_warnings: Vec<String>,
    pub config_settings: Settings,
    /// Weighted geometric mean of category scores
    pub score: Option<f64>,
    pub categories: IndexMap<String, CategoryResult>,
    pub audits: IndexMap<String, AuditResult>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub category_groups: IndexMap<String, GroupConfig>,
    pub timing: Timing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_mode_parsing() {
        assert_eq!("Snapshot".parse::<GatherMode>(), Ok(GatherMode::Snapshot));
        assert!("headless".parse::<GatherMode>().is_err());
    }

    #[test]
    fn test_score_display_mode_serializes_camel_case() {
        let json = serde_json::to_string(&ScoreDisplayMode::NotApplicable).unwrap();
        assert_eq!(json, "\"notApplicable\"");
        let mode: ScoreDisplayMode = serde_json::from_str("\"informative\"").unwrap();
        assert_eq!(mode, ScoreDisplayMode::Informative);
    }

    #[test]
    fn test_scored_modes() {
        assert!(ScoreDisplayMode::Binary.is_scored());
        assert!(ScoreDisplayMode::Numeric.is_scored());
        assert!(!ScoreDisplayMode::Manual.is_scored());
        assert!(!ScoreDisplayMode::Error.is_scored());
    }

    #[test]
    fn test_error_result_has_null_score() {
        let result = AuditResult::error("viewport", "Viewport", "", "boom");
        assert_eq!(result.score, None);
        assert_eq!(result.score_display_mode, ScoreDisplayMode::Error);
        assert!(!result.passed());
    }
}
