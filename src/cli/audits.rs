//! Audits command - list the registered audits

use anyhow::Result;
use console::style;

use crate::audits::AuditRegistry;

fn describe_modes(registry: &AuditRegistry, id: &str) -> String {
    registry
        .get(id)
        .and_then(|audit| audit.meta().supported_modes.clone())
        .map(|modes| {
            modes
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_else(|| "all".to_string())
}

/// Run the audits command
pub fn run() -> Result<()> {
    let registry = AuditRegistry::with_defaults();
    println!("\n{} registered audits\n", style(registry.len()).bold());

    for audit in registry.iter() {
        let meta = audit.meta();
        println!(
            "  {:<20} {}  {}",
            style(&meta.id).cyan(),
            style(format!("[{}]", meta.score_display_mode)).dim(),
            meta.title
        );
        println!(
            "  {:<20} {}",
            "",
            style(format!(
                "requires: {}  modes: {}",
                if meta.required_artifacts.is_empty() {
                    "-".to_string()
                } else {
                    meta.required_artifacts.join(", ")
                },
                describe_modes(&registry, &meta.id)
            ))
            .dim()
        );
    }
    println!();
    Ok(())
}
