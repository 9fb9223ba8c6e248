//! Request counts and transfer sizes by resource type

use async_trait::async_trait;
use serde_json::{json, Value};

use super::total_byte_weight::kib;
use super::{Audit, AuditContext, AuditMeta, AuditProduct};
use crate::artifacts::Artifacts;
use crate::computed::{ResourceSummary, ResourceSummaryInput};
use crate::models::{GatherMode, ScoreDisplayMode};

fn label(resource_type: &str) -> &'static str {
    match resource_type {
        "total" => "Total",
        "document" => "Document",
        "script" => "Script",
        "stylesheet" => "Stylesheet",
        "image" => "Image",
        "font" => "Font",
        "media" => "Media",
        "third-party" => "Third-party",
        _ => "Other",
    }
}

pub struct ResourceSummaryAudit {
    meta: AuditMeta,
}

impl ResourceSummaryAudit {
    pub fn new() -> Self {
        Self {
            meta: AuditMeta::new(
                "resource-summary",
                "Keep request counts low and transfer sizes small",
                "To set budgets for the quantity and size of page resources, add a budget.json file.",
            )
            .requires(&["DevtoolsLog", "URL"])
            .display_mode(ScoreDisplayMode::Informative)
            .modes(&[GatherMode::Navigation]),
        }
    }
}

impl Default for ResourceSummaryAudit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Audit for ResourceSummaryAudit {
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }

    async fn audit(&self, artifacts: &Artifacts, ctx: &AuditContext) -> anyhow::Result<AuditProduct> {
        let input = ResourceSummaryInput::from_artifacts(artifacts)?;
        let summary = ctx.computed.request(&ResourceSummary, &input).await?;

        let items: Vec<Value> = summary
            .iter()
            .map(|(resource_type, count)| {
                json!({
                    "resourceType": resource_type,
                    "label": label(resource_type),
                    "requestCount": count.count,
                    "transferSize": count.transfer_size,
                })
            })
            .collect();

        let total = summary.get("total").copied().unwrap_or_default();
        Ok(AuditProduct::unscored()
            .with_display_value(format!(
                "{} requests • {} KiB",
                total.count,
                kib(total.transfer_size)
            ))
            .with_details(json!({
                "type": "table",
                "headings": [
                    { "key": "label", "valueType": "text", "label": "Resource Type" },
                    { "key": "requestCount", "valueType": "numeric", "label": "Requests" },
                    { "key": "transferSize", "valueType": "bytes", "label": "Transfer Size" }
                ],
                "items": items,
            })))
    }
}
