//! Audit pipeline
//!
//! Orchestrates one run:
//! 1. Validate the config against the registered audits
//! 2. Narrow it to the run's gather mode and settings filters
//! 3. Run every audit concurrently against a fresh computed-artifact cache
//! 4. Score categories and the overall score
//! 5. Assemble the report

use anyhow::Context;
use indexmap::IndexMap;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::artifacts::Artifacts;
use crate::audits::{AuditRegistry, AuditRunner, AuditSummary};
use crate::computed::{CacheStats, ComputedCache};
use crate::config::{filter_config, ReportConfig};
use crate::error::RunResult;
use crate::models::{AuditResult, GatherMode, ReportResult};
use crate::report::{assemble_report, ReportParts, Timer};
use crate::scoring::compute_report_result;

/// Outcome of one pipeline run
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub report: ReportResult,
    pub summary: AuditSummary,
    pub cache_stats: CacheStats,
}

/// Full audit pipeline.
pub struct Pipeline {
    registry: AuditRegistry,
    config: ReportConfig,
}

impl Pipeline {
    /// Create a pipeline with the built-in audits.
    pub fn new(config: ReportConfig) -> Self {
        Self {
            registry: AuditRegistry::with_defaults(),
            config,
        }
    }

    /// Use a custom audit registry.
    pub fn with_registry(mut self, registry: AuditRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &AuditRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Drop unknown ids from the settings filters, returning a warning for each
    fn sanitize_filters(&self, config: &mut ReportConfig) -> Vec<String> {
        let mut warnings = Vec::new();
        let registry = &self.registry;
        let settings = &mut config.settings;

        for (label, ids) in [
            ("onlyAudits", &mut settings.only_audits),
            ("skipAudits", &mut settings.skip_audits),
        ] {
            if let Some(ids) = ids {
                ids.retain(|id| {
                    let known = registry.contains(id);
                    if !known {
                        warnings.push(format!("{} contains unrecognized audit {}", label, id));
                    }
                    known
                });
            }
        }

        if let Some(ids) = &mut settings.only_categories {
            let categories = &config.categories;
            ids.retain(|id| {
                let known = categories.contains_key(id);
                if !known {
                    warnings.push(format!("onlyCategories contains unrecognized category {}", id));
                }
                known
            });
        }

        for warning in &warnings {
            warn!("{}", warning);
        }
        warnings
    }

    /// Run every configured audit against `artifacts` and build the report.
    ///
    /// Each call uses its own computed-artifact cache.
    pub async fn run(&self, artifacts: Artifacts) -> RunResult<RunOutput> {
        let timer = Timer::new();
        let gather_mode = artifacts.gather_mode();
        info!("Starting {} run", gather_mode);

        let mark = timer.start("pagescore:config");
        self.config.validate(&self.registry)?;
        let mut config = self.config.clone();
        let warnings = self.sanitize_filters(&mut config);
        let config = filter_config(&config, gather_mode, |id, mode| {
            self.registry.supports_mode(id, mode)
        });
        debug!(
            "{} categories and {} audits after filtering",
            config.categories.len(),
            config.audit_ids().len()
        );
        let runner = AuditRunner::from_config(&self.registry, &config)?;
        timer.end(mark);

        let cache = Arc::new(ComputedCache::new());
        let artifacts = Arc::new(artifacts);

        let mark = timer.start("pagescore:runAudits");
        let output = runner
            .run(
                Arc::clone(&artifacts),
                Arc::new(config.settings.clone()),
                Arc::clone(&cache),
                &timer,
            )
            .await?;
        timer.end(mark);

        let mark = timer.start("pagescore:scoring");
        let scores = compute_report_result(&output.results, &config)?;
        timer.end(mark);

        let cache_stats = cache.stats();
        debug!(
            "Computed artifacts: {} requests, {} computations, {} entries",
            cache_stats.requests, cache_stats.computations, cache_stats.entries
        );

        let report = assemble_report(
            &artifacts,
            &config,
            ReportParts {
                audits: output.results,
                scores,
                timing: timer.finish(),
                warnings,
            },
        );

        Ok(RunOutput {
            report,
            summary: output.summary,
            cache_stats,
        })
    }

    /// Score saved audit results without running any audit.
    ///
    /// The report carries no page metadata beyond the gather mode.
    pub fn score_audits(
        &self,
        audits: IndexMap<String, AuditResult>,
        gather_mode: GatherMode,
    ) -> RunResult<ReportResult> {
        let timer = Timer::new();
        self.config.validate(&self.registry)?;
        let config = filter_config(&self.config, gather_mode, |id, mode| {
            self.registry.supports_mode(id, mode)
        });

        let mark = timer.start("pagescore:scoring");
        let scores = compute_report_result(&audits, &config)?;
        timer.end(mark);

        Ok(assemble_report(
            &Artifacts::new(gather_mode),
            &config,
            ReportParts {
                audits,
                scores,
                timing: timer.finish(),
                warnings: Vec::new(),
            },
        ))
    }
}

/// Audit results read back from disk
#[derive(Debug, Clone)]
pub struct SavedResults {
    pub audits: IndexMap<String, AuditResult>,
    /// Present when the file was a full report
    pub gather_mode: Option<GatherMode>,
}

/// Read saved audit results: either a full report (its `audits` table is
/// used) or a bare `{id: AuditResult}` map.
pub fn load_audit_results(path: &Path) -> anyhow::Result<SavedResults> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let wrapped = value.get_mut("audits").map(Value::take);
    let (audits, gather_mode) = match wrapped {
        Some(audits) => {
            let gather_mode: Option<GatherMode> = value
                .get("gatherMode")
                .and_then(|m| serde_json::from_value(m.clone()).ok());
            (audits, gather_mode)
        }
        None => (value, None),
    };
    let audits: IndexMap<String, AuditResult> = serde_json::from_value(audits)
        .context("Audit results do not match the expected shape")?;
    Ok(SavedResults { audits, gather_mode })
}
