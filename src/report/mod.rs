//! Report assembly
//!
//! Packages scores, audit results and run metadata into a `ReportResult`.

mod timing;

pub use timing::{Timer, TimerMark};

use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;

use crate::artifacts::Artifacts;
use crate::config::ReportConfig;
use crate::models::{AuditResult, ReportResult, Timing};
use crate::scoring::ReportScores;

pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything a finished run hands to the assembler
#[derive(Debug, Clone)]
pub struct ReportParts {
    pub audits: IndexMap<String, AuditResult>,
    pub scores: ReportScores,
    pub timing: Timing,
    /// Warnings raised during this run, appended after gather-time warnings
    pub warnings: Vec<String>,
}

/// Build the final report. The result is not modified afterwards.
pub fn assemble_report(artifacts: &Artifacts, config: &ReportConfig, parts: ReportParts) -> ReportResult {
    let fetch_time = artifacts
        .fetch_time
        .clone()
        .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));

    let mut run_warnings = artifacts.run_warnings.clone();
    for warning in parts.warnings {
        if !run_warnings.contains(&warning) {
            run_warnings.push(warning);
        }
    }

    // Only groups some remaining audit ref points at
    let category_groups = config
        .groups
        .iter()
        .filter(|(id, _)| {
            parts
                .scores
                .categories
                .values()
                .flat_map(|c| c.audit_refs.iter())
                .any(|r| r.group.as_deref() == Some(id.as_str()))
        })
        .map(|(id, group)| (id.clone(), group.clone()))
        .collect();

    ReportResult {
        tool_version: TOOL_VERSION.to_string(),
        requested_url: artifacts.url.requested_url.clone(),
        main_document_url: artifacts.url.main_document_url.clone(),
        final_displayed_url: artifacts.url.final_displayed_url.clone(),
        fetch_time,
        gather_mode: artifacts.gather_mode(),
        run_warnings,
        config_settings: config.settings.clone(),
        score: parts.scores.score,
        categories: parts.scores.categories,
        audits: parts.audits,
        category_groups,
        timing: parts.timing,
    }
}
