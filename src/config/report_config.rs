//! Report configuration support
//!
//! Loads category/audit configuration from `pagescore.toml` or
//! `.pagescorerc.json`, falling back to the built-in default.
//!
//! # Configuration Format
//!
//! ```toml
//! # pagescore.toml
//!
//! [settings]
//! locale = "en-US"
//! only_categories = ["performance"]
//! skip_audits = ["errors-in-console"]
//!
//! [overall]
//! performance = 1
//! seo = 1
//!
//! [categories.performance]
//! title = "Performance"
//! audit_refs = [{ id = "total-byte-weight", weight = 1, group = "diagnostics" }]
//!
//! [audits.total-byte-weight]
//! options = { p10 = 2731008, median = 4096000 }
//!
//! [groups.diagnostics]
//! title = "Diagnostics"
//! ```

use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::debug;

use crate::audits::AuditRegistry;
use crate::error::ConfigError;
use crate::models::GatherMode;

/// Built-in configuration used when no project config exists
pub const DEFAULT_CONFIG_TOML: &str = include_str!("default_config.toml");

/// Run settings. Opaque to the scoring core beyond the filters; passed
/// through to audits and echoed in the report (camelCase, which is also
/// accepted when reading a saved report back).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Settings {
    #[serde(default = "default_locale")]
    pub locale: String,

    /// mobile or desktop
    #[serde(default = "default_form_factor", alias = "formFactor")]
    pub form_factor: String,

    #[serde(default = "default_throttling_method", alias = "throttlingMethod")]
    pub throttling_method: String,

    /// Only run and score these categories
    #[serde(default, alias = "onlyCategories", skip_serializing_if = "Option::is_none")]
    pub only_categories: Option<Vec<String>>,

    /// Only run these audits
    #[serde(default, alias = "onlyAudits", skip_serializing_if = "Option::is_none")]
    pub only_audits: Option<Vec<String>>,

    /// Never run these audits
    #[serde(default, alias = "skipAudits", skip_serializing_if = "Option::is_none")]
    pub skip_audits: Option<Vec<String>>,

    /// Anything else (budgets, throttling numbers, ...) is carried as-is
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            form_factor: default_form_factor(),
            throttling_method: default_throttling_method(),
            only_categories: None,
            only_audits: None,
            skip_audits: None,
            extra: BTreeMap::new(),
        }
    }
}

fn default_locale() -> String {
    "en-US".to_string()
}
fn default_form_factor() -> String {
    "mobile".to_string()
}
fn default_throttling_method() -> String {
    "simulate".to_string()
}

/// An audit's place and weight inside a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRefConfig {
    pub id: String,
    pub weight: f64,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub acronym: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub manual_description: Option<String>,
    /// Gather modes this category is meaningful in (default: all)
    #[serde(default)]
    pub supported_modes: Option<Vec<GatherMode>>,
    #[serde(default)]
    pub audit_refs: Vec<AuditRefConfig>,
}

impl CategoryConfig {
    fn supports(&self, mode: GatherMode) -> bool {
        self.supported_modes
            .as_ref()
            .map(|modes| modes.contains(&mode))
            .unwrap_or(true)
    }
}

/// Per-audit overrides
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuditSettings {
    /// Merged over the audit's default options
    #[serde(default)]
    pub options: Option<Value>,
}

/// Display grouping for audit refs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Full report configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub settings: Settings,

    /// Categories in display order
    #[serde(default)]
    pub categories: IndexMap<String, CategoryConfig>,

    /// Audits to run in addition to those referenced by categories, and
    /// per-audit options
    #[serde(default)]
    pub audits: IndexMap<String, AuditSettings>,

    #[serde(default)]
    pub groups: IndexMap<String, GroupConfig>,

    /// Category weights for the overall score (default: 1 per category)
    #[serde(default)]
    pub overall: Option<IndexMap<String, f64>>,
}

impl ReportConfig {
    /// Parse the built-in default configuration
    pub fn default_config() -> Result<Self, ConfigError> {
        Self::from_toml_str(DEFAULT_CONFIG_TOML)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Every audit id this config wants run, in order: category refs first,
    /// then the `[audits]` table.
    pub fn audit_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        let referenced = self
            .categories
            .values()
            .flat_map(|c| c.audit_refs.iter().map(|r| r.id.as_str()));
        for id in referenced.chain(self.audits.keys().map(String::as_str)) {
            if seen.insert(id) {
                ids.push(id.to_string());
            }
        }
        ids
    }

    /// Options configured for an audit, if any
    pub fn audit_options(&self, audit_id: &str) -> Option<&Value> {
        self.audits.get(audit_id).and_then(|a| a.options.as_ref())
    }

    /// Overall-score weights in category order
    pub fn overall_weights(&self) -> Vec<(String, f64)> {
        self.categories
            .keys()
            .map(|id| {
                let weight = match &self.overall {
                    Some(weights) => weights.get(id).copied().unwrap_or(0.0),
                    None => 1.0,
                };
                (id.clone(), weight)
            })
            .collect()
    }

    /// Check the config against the registered audits
    pub fn validate(&self, registry: &AuditRegistry) -> Result<(), ConfigError> {
        for (category_id, category) in &self.categories {
            for audit_ref in &category.audit_refs {
                check_weight(&audit_ref.id, audit_ref.weight)?;
                if !registry.contains(&audit_ref.id) {
                    return Err(ConfigError::UnknownAudit {
                        category: category_id.clone(),
                        audit: audit_ref.id.clone(),
                    });
                }
            }
        }

        for audit_id in self.audits.keys() {
            if !registry.contains(audit_id) {
                return Err(ConfigError::UnregisteredAudit(audit_id.clone()));
            }
        }

        if let Some(overall) = &self.overall {
            for (category_id, weight) in overall {
                check_weight(category_id, *weight)?;
                if !self.categories.contains_key(category_id) {
                    return Err(ConfigError::UnknownCategory(category_id.clone()));
                }
            }
        }

        Ok(())
    }
}

fn check_weight(id: &str, weight: f64) -> Result<(), ConfigError> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(ConfigError::InvalidWeight {
            id: id.to_string(),
            weight,
        });
    }
    Ok(())
}

/// Narrow a config to what should run: `only_categories`, `only_audits`,
/// `skip_audits`, and gather-mode support of categories and audits.
pub fn filter_config(
    config: &ReportConfig,
    gather_mode: GatherMode,
    audit_supports_mode: impl Fn(&str, GatherMode) -> bool,
) -> ReportConfig {
    let settings = &config.settings;
    let skipped: HashSet<&str> = settings
        .skip_audits
        .iter()
        .flatten()
        .map(String::as_str)
        .collect();
    let only_audits: Option<HashSet<&str>> = settings
        .only_audits
        .as_ref()
        .map(|ids| ids.iter().map(String::as_str).collect());

    let keep_audit = |id: &str| -> bool {
        !skipped.contains(id) && audit_supports_mode(id, gather_mode)
    };

    let mut categories = IndexMap::new();
    for (id, category) in &config.categories {
        if let Some(only) = &settings.only_categories {
            if !only.contains(id) {
                continue;
            }
        }
        if !category.supports(gather_mode) {
            debug!("Category {} does not support {} mode", id, gather_mode);
            continue;
        }

        let mut category = category.clone();
        category.audit_refs.retain(|r| {
            keep_audit(&r.id)
                && only_audits
                    .as_ref()
                    .map(|only| only.contains(r.id.as_str()) || settings.only_categories.is_some())
                    .unwrap_or(true)
        });

        // With an audit whitelist, categories emptied by it disappear
        if only_audits.is_some() && settings.only_categories.is_none() && category.audit_refs.is_empty() {
            continue;
        }
        categories.insert(id.clone(), category);
    }

    let mut audits = IndexMap::new();
    for (id, audit) in &config.audits {
        if !keep_audit(id) {
            continue;
        }
        let whitelisted = only_audits
            .as_ref()
            .map(|only| only.contains(id.as_str()))
            .unwrap_or(false);
        let referenced = categories
            .values()
            .any(|c: &CategoryConfig| c.audit_refs.iter().any(|r| &r.id == id));
        let unfiltered = only_audits.is_none() && settings.only_categories.is_none();
        if whitelisted || referenced || unfiltered {
            audits.insert(id.clone(), audit.clone());
        }
    }
    if let Some(only) = &settings.only_audits {
        for id in only {
            if keep_audit(id) && !audits.contains_key(id) {
                audits.insert(id.clone(), AuditSettings::default());
            }
        }
    }

    let overall = config.overall.as_ref().map(|weights| {
        weights
            .iter()
            .filter(|(id, _)| categories.contains_key(*id))
            .map(|(id, w)| (id.clone(), *w))
            .collect()
    });

    ReportConfig {
        settings: config.settings.clone(),
        categories,
        audits,
        groups: config.groups.clone(),
        overall,
    }
}

/// Load configuration from an explicit path. Fails loudly.
pub fn load_config(path: &Path) -> anyhow::Result<ReportConfig> {
    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let config = if is_json {
        ReportConfig::from_json_str(&content)?
    } else {
        ReportConfig::from_toml_str(&content)?
    };
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Load configuration from a project directory.
///
/// Searches for configuration files in this order:
/// 1. `pagescore.toml`
/// 2. `.pagescorerc.json`
///
/// Returns the built-in default configuration if none is found. A file that
/// exists but does not load is an error, never a silent fallback.
pub fn load_project_config(dir: &Path) -> anyhow::Result<ReportConfig> {
    for name in ["pagescore.toml", ".pagescorerc.json"] {
        let path = dir.join(name);
        if path.exists() {
            return load_config(&path)
                .with_context(|| format!("Failed to load project config {}", path.display()));
        }
    }

    debug!("No project config found, using defaults");
    Ok(ReportConfig::default_config()?)
}
