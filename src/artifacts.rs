//! Raw artifact store
//!
//! Raw artifacts are produced once by the gathering collaborator and are
//! immutable for the rest of the run. Each slot holds either a JSON value or
//! the error its gatherer hit.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::ArtifactError;
use crate::models::GatherMode;

/// Key marking a gatherer failure in serialized artifacts
pub const GATHERER_ERROR_KEY: &str = "__gathererError";

/// URLs describing the page that was audited
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlArtifact {
    #[serde(default)]
    pub requested_url: Option<String>,
    #[serde(default)]
    pub main_document_url: Option<String>,
    #[serde(default)]
    pub final_displayed_url: Option<String>,
}

/// How and when the artifacts were gathered
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatherContext {
    #[serde(default)]
    pub gather_mode: GatherMode,
}

/// One artifact slot
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactValue {
    Value(Arc<Value>),
    GathererError(String),
}

impl ArtifactValue {
    fn from_json(value: Value) -> Self {
        if let Value::Object(map) = &value {
            if map.len() == 1 {
                if let Some(message) = map.get(GATHERER_ERROR_KEY) {
                    let message = message
                        .as_str()
                        .map(String::from)
                        .unwrap_or_else(|| message.to_string());
                    return ArtifactValue::GathererError(message);
                }
            }
        }
        ArtifactValue::Value(Arc::new(value))
    }
}

/// All raw artifacts of one run
#[derive(Debug, Clone, Default)]
pub struct Artifacts {
    entries: HashMap<String, ArtifactValue>,
    pub url: UrlArtifact,
    pub gather_context: GatherContext,
    pub fetch_time: Option<String>,
    pub run_warnings: Vec<String>,
}

impl Artifacts {
    pub fn new(gather_mode: GatherMode) -> Self {
        Self {
            gather_context: GatherContext { gather_mode },
            ..Default::default()
        }
    }

    /// Build from a JSON object of artifact name to value.
    ///
    /// `URL`, `GatherContext`, `fetchTime` and `RunWarnings` are lifted into
    /// typed fields and also stay available as regular artifacts.
    pub fn from_json(value: Value) -> Result<Self, ArtifactError> {
        let Value::Object(map) = value else {
            return Err(ArtifactError::Malformed {
                name: "artifacts".to_string(),
                message: "expected a JSON object".to_string(),
            });
        };

        let mut artifacts = Artifacts::default();
        for (name, value) in map {
            artifacts.insert_json(name, value);
        }

        if let Ok(url) = artifacts.get_as::<UrlArtifact>("URL") {
            artifacts.url = url;
        }
        if let Ok(context) = artifacts.get_as::<GatherContext>("GatherContext") {
            artifacts.gather_context = context;
        }
        if let Ok(fetch_time) = artifacts.get_as::<String>("fetchTime") {
            artifacts.fetch_time = Some(fetch_time);
        }
        if let Ok(warnings) = artifacts.get_as::<Vec<String>>("RunWarnings") {
            artifacts.run_warnings = warnings;
        }

        Ok(artifacts)
    }

    /// Read an artifacts JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        Ok(Self::from_json(value)?)
    }

    /// Insert a raw JSON value (gatherer error markers are recognised)
    pub fn insert_json(&mut self, name: impl Into<String>, value: Value) {
        self.entries.insert(name.into(), ArtifactValue::from_json(value));
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.entries
            .insert(name.into(), ArtifactValue::Value(Arc::new(value)));
    }

    /// Record that a gatherer failed
    pub fn insert_error(&mut self, name: impl Into<String>, message: impl Into<String>) {
        self.entries
            .insert(name.into(), ArtifactValue::GathererError(message.into()));
    }

    pub fn gather_mode(&self) -> GatherMode {
        self.gather_context.gather_mode
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Check that an artifact is present and was gathered successfully
    pub fn check(&self, name: &str) -> Result<(), ArtifactError> {
        self.get(name).map(|_| ())
    }

    /// Get a raw artifact value
    pub fn get(&self, name: &str) -> Result<Arc<Value>, ArtifactError> {
        match self.entries.get(name) {
            Some(ArtifactValue::Value(value)) => Ok(Arc::clone(value)),
            Some(ArtifactValue::GathererError(message)) => Err(ArtifactError::GathererFailed {
                name: name.to_string(),
                message: message.clone(),
            }),
            None => Err(ArtifactError::Missing(name.to_string())),
        }
    }

    /// Get a raw artifact deserialized into `T`
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, ArtifactError> {
        let value = self.get(name)?;
        T::deserialize(value.as_ref()).map_err(|e| ArtifactError::Malformed {
            name: name.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_lifts_metadata() {
        let artifacts = Artifacts::from_json(json!({
            "URL": {
                "requestedUrl": "http://example.com",
                "mainDocumentUrl": "https://example.com/",
                "finalDisplayedUrl": "https://example.com/"
            },
            "GatherContext": {"gatherMode": "snapshot"},
            "fetchTime": "2024-01-01T00:00:00Z",
            "RunWarnings": ["Page was slow"],
            "DocumentTitle": "Example"
        }))
        .unwrap();

        assert_eq!(artifacts.gather_mode(), GatherMode::Snapshot);
        assert_eq!(
            artifacts.url.main_document_url.as_deref(),
            Some("https://example.com/")
        );
        assert_eq!(artifacts.fetch_time.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(artifacts.run_warnings, vec!["Page was slow"]);
        assert_eq!(artifacts.get_as::<String>("DocumentTitle").unwrap(), "Example");
    }

    #[test]
    fn test_missing_and_failed_artifacts() {
        let artifacts = Artifacts::from_json(json!({
            "MetaElements": {"__gathererError": "Protocol timeout"}
        }))
        .unwrap();

        assert_eq!(
            artifacts.check("DocumentTitle"),
            Err(ArtifactError::Missing("DocumentTitle".to_string()))
        );
        assert_eq!(
            artifacts.check("MetaElements"),
            Err(ArtifactError::GathererFailed {
                name: "MetaElements".to_string(),
                message: "Protocol timeout".to_string()
            })
        );
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(Artifacts::from_json(json!([1, 2, 3])).is_err());
    }

    #[test]
    fn test_get_as_reports_malformed() {
        let mut artifacts = Artifacts::new(GatherMode::Navigation);
        artifacts.insert("DocumentTitle", json!(42));
        assert!(matches!(
            artifacts.get_as::<String>("DocumentTitle"),
            Err(ArtifactError::Malformed { .. })
        ));
    }
}
