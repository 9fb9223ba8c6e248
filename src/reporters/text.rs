//! Text (terminal) reporter with colors and formatting

use crate::models::{AuditResult, CategoryResult, ReportResult, ScoreDisplayMode, PASS_THRESHOLD};
use anyhow::Result;

/// Reset ANSI color
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Failing audits listed per category
const MAX_FAILED_SHOWN: usize = 10;

/// Score colors (ANSI escape codes), same bands as the pass threshold
fn score_color(score: Option<f64>) -> &'static str {
    match score {
        Some(s) if s >= PASS_THRESHOLD => "\x1b[32m", // Green
        Some(s) if s >= 0.5 => "\x1b[33m",            // Yellow
        Some(_) => "\x1b[31m",                        // Red
        None => "\x1b[90m",                           // Gray
    }
}

/// Scores are shown out of 100 like the rendered report gauges
fn format_score(score: Option<f64>) -> String {
    let c = score_color(score);
    match score {
        Some(s) => format!("{c}{:.0}{RESET}", s * 100.0),
        None => format!("{c}--{RESET}"),
    }
}

fn audit_tag(result: &AuditResult) -> String {
    match result.score_display_mode {
        ScoreDisplayMode::Error => format!("\x1b[31m[!]{RESET}"),
        ScoreDisplayMode::NotApplicable => format!("{DIM}[-]{RESET}"),
        ScoreDisplayMode::Manual | ScoreDisplayMode::Informative => format!("{DIM}[i]{RESET}"),
        ScoreDisplayMode::Binary | ScoreDisplayMode::Numeric => {
            let c = score_color(result.score);
            if result.passed() {
                format!("{c}[✓]{RESET}")
            } else {
                format!("{c}[✗]{RESET}")
            }
        }
    }
}

fn render_audit_line(out: &mut String, result: &AuditResult) {
    out.push_str(&format!("    {}  {}", audit_tag(result), result.title));
    if let Some(display_value) = &result.display_value {
        out.push_str(&format!("  {DIM}{}{RESET}", display_value));
    }
    out.push('\n');
    if let Some(message) = &result.error_message {
        out.push_str(&format!("         {DIM}{}{RESET}\n", message));
    }
}

fn render_category(out: &mut String, category: &CategoryResult, report: &ReportResult) {
    out.push_str(&format!(
        "  {BOLD}{:<24}{RESET} {}\n",
        category.title,
        format_score(category.score)
    ));

    let results: Vec<&AuditResult> = category
        .audit_refs
        .iter()
        .filter_map(|r| report.audits.get(&r.id))
        .collect();

    let failed: Vec<&AuditResult> = results
        .iter()
        .copied()
        .filter(|r| r.score_display_mode.is_scored() && !r.passed())
        .collect();
    let errors: Vec<&AuditResult> = results
        .iter()
        .copied()
        .filter(|r| r.score_display_mode == ScoreDisplayMode::Error)
        .collect();
    let passed = results.iter().filter(|r| r.passed()).count();
    let manual = results
        .iter()
        .filter(|r| r.score_display_mode == ScoreDisplayMode::Manual)
        .count();
    let not_applicable = results
        .iter()
        .filter(|r| r.score_display_mode == ScoreDisplayMode::NotApplicable)
        .count();

    for result in failed.iter().take(MAX_FAILED_SHOWN) {
        render_audit_line(out, result);
    }
    let remaining = failed.len().saturating_sub(MAX_FAILED_SHOWN);
    if remaining > 0 {
        out.push_str(&format!("    {DIM}...and {} more failing audits{RESET}\n", remaining));
    }
    for result in &errors {
        render_audit_line(out, result);
    }

    let mut summary_parts = vec![format!("{} passed", passed)];
    if manual > 0 {
        summary_parts.push(format!("{} manual", manual));
    }
    if not_applicable > 0 {
        summary_parts.push(format!("{} not applicable", not_applicable));
    }
    out.push_str(&format!("    {DIM}{}{RESET}\n\n", summary_parts.join(" | ")));
}

/// Render report as formatted terminal output
pub fn render(report: &ReportResult) -> Result<String> {
    let mut out = String::new();

    // Header
    out.push_str(&format!("\n{BOLD}pagescore report{RESET}\n"));
    out.push_str(&format!(
        "{DIM}──────────────────────────────────────{RESET}\n"
    ));
    if let Some(url) = report.final_displayed_url.as_ref().or(report.requested_url.as_ref()) {
        out.push_str(&format!("URL: {}\n", url));
    }
    out.push_str(&format!(
        "Overall: {BOLD}{}{RESET}  Mode: {}  Fetched: {}\n\n",
        format_score(report.score),
        report.gather_mode,
        report.fetch_time
    ));

    // Categories
    out.push_str(&format!("{BOLD}CATEGORIES{RESET}\n"));
    for category in report.categories.values() {
        render_category(&mut out, category, report);
    }

    // Run warnings
    if !report.run_warnings.is_empty() {
        out.push_str(&format!("{BOLD}WARNINGS{RESET}\n"));
        for warning in &report.run_warnings {
            out.push_str(&format!("  \x1b[33m!{RESET} {}\n", warning));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "{DIM}{} audits in {:.0}ms  ·  pagescore {}{RESET}\n",
        report.audits.len(),
        report.timing.total,
        report.tool_version
    ));

    Ok(out)
}
