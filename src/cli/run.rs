//! Run and score commands

use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use tracing::{debug, info};

use crate::artifacts::Artifacts;
use crate::config::{load_config, load_project_config, ReportConfig};
use crate::models::{GatherMode, ReportResult};
use crate::pipeline::{load_audit_results, Pipeline};
use crate::reporters::{report_with_format, OutputFormat};

/// Explicit `--config` wins over project discovery; either must load
fn resolve_config(config: Option<&Path>) -> Result<ReportConfig> {
    match config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            load_project_config(&cwd)
        }
    }
}

fn write_report(report: &ReportResult, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let rendered = report_with_format(report, format)?;
    debug!("Rendered {} report ({} bytes)", format, rendered.len());
    match output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} Report written to {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

/// Run the configured audits against an artifacts file
pub async fn run(
    artifacts_path: &Path,
    config: Option<&Path>,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let config = resolve_config(config)?;
    let artifacts = Artifacts::load(artifacts_path)
        .with_context(|| format!("Failed to load artifacts {}", artifacts_path.display()))?;

    let output_data = Pipeline::new(config).run(artifacts).await?;
    let summary = &output_data.summary;
    info!(
        "{} audits run ({} passed, {} errors) in {}ms",
        summary.audits_run, summary.passed, summary.errors, summary.duration_ms
    );

    write_report(&output_data.report, format, output)
}

/// Re-score saved audit results
pub fn score(
    results_path: &Path,
    config: Option<&Path>,
    gather_mode: Option<GatherMode>,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let config = resolve_config(config)?;
    let saved = load_audit_results(results_path)?;
    let gather_mode = gather_mode.or(saved.gather_mode).unwrap_or_default();
    info!("Scoring {} saved audits ({})", saved.audits.len(), gather_mode);

    let report = Pipeline::new(config).score_audits(saved.audits, gather_mode)?;
    write_report(&report, format, output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_config(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }

    #[test]
    fn test_write_report_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = crate::reporters::tests::test_report();

        write_report(&report, OutputFormat::Json, Some(&path)).unwrap();
        let back: ReportResult =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, report);
    }
}
