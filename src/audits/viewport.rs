//! `<meta name="viewport">` with `width` or `initial-scale`

use async_trait::async_trait;
use serde::Deserialize;

use super::{Audit, AuditContext, AuditMeta, AuditProduct};
use crate::artifacts::Artifacts;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetaElement {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

pub struct ViewportAudit {
    meta: AuditMeta,
}

impl ViewportAudit {
    pub fn new() -> Self {
        Self {
            meta: AuditMeta::new(
                "viewport",
                "Has a `<meta name=\"viewport\">` tag with `width` or `initial-scale`",
                "A `<meta name=\"viewport\">` not only optimizes your app for mobile screen \
                 sizes, but also prevents a 300 millisecond delay to user input.",
            )
            .failure_title("Does not have a `<meta name=\"viewport\">` tag with `width` or `initial-scale`")
            .requires(&["MetaElements"]),
        }
    }
}

impl Default for ViewportAudit {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `key=value` pairs separated by commas or semicolons
fn viewport_properties(content: &str) -> Vec<(String, String)> {
    content
        .split([',', ';'])
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            Some((key.trim().to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect()
}

#[async_trait]
impl Audit for ViewportAudit {
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }

    async fn audit(&self, artifacts: &Artifacts, _ctx: &AuditContext) -> anyhow::Result<AuditProduct> {
        let elements: Vec<MetaElement> = artifacts.get_as("MetaElements")?;
        let viewport = elements
            .iter()
            .find(|m| m.name.as_deref().map(|n| n.eq_ignore_ascii_case("viewport")).unwrap_or(false));

        let Some(viewport) = viewport else {
            return Ok(AuditProduct::new(false).with_explanation("No `<meta name=\"viewport\">` tag found"));
        };

        let properties = viewport_properties(viewport.content.as_deref().unwrap_or(""));
        let has_width_or_scale = properties
            .iter()
            .any(|(key, _)| key == "width" || key == "initial-scale");

        let mut product = AuditProduct::new(has_width_or_scale);
        if !has_width_or_scale {
            product = product.with_explanation("No `width` or `initial-scale` property found");
        }
        if properties.iter().any(|(key, value)| key == "user-scalable" && value == "no") {
            product = product.with_warning("Invalid properties found: {\"user-scalable\":\"no\"}");
        }
        Ok(product)
    }
}
