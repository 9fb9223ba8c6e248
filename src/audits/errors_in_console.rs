//! No browser errors logged to the console

use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Audit, AuditContext, AuditMeta, AuditProduct};
use crate::artifacts::Artifacts;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConsoleMessage {
    #[serde(default)]
    source: String,
    level: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    url: Option<String>,
}

pub struct ErrorsInConsoleAudit {
    meta: AuditMeta,
}

impl ErrorsInConsoleAudit {
    pub fn new() -> Self {
        Self {
            meta: AuditMeta::new(
                "errors-in-console",
                "No browser errors logged to the console",
                "Errors logged to the console indicate unresolved problems. They can come from \
                 network request failures and other browser concerns.",
            )
            .failure_title("Browser errors were logged to the console")
            .requires(&["ConsoleMessages"]),
        }
    }
}

impl Default for ErrorsInConsoleAudit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Audit for ErrorsInConsoleAudit {
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }

    /// `ignoredPatterns`: regexes matched against the message text
    fn default_options(&self) -> Value {
        json!({ "ignoredPatterns": ["ERR_BLOCKED_BY_CLIENT.Inspector"] })
    }

    async fn audit(&self, artifacts: &Artifacts, ctx: &AuditContext) -> anyhow::Result<AuditProduct> {
        let messages: Vec<ConsoleMessage> = artifacts.get_as("ConsoleMessages")?;
        let patterns: Vec<String> = ctx.option_or("ignoredPatterns", Vec::new());
        let ignored = patterns
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("invalid ignoredPatterns entry {:?}", p)))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let items: Vec<Value> = messages
            .iter()
            .filter(|m| m.level == "error")
            .filter(|m| !ignored.iter().any(|re| re.is_match(&m.text)))
            .map(|m| {
                json!({
                    "source": m.source,
                    "description": m.text,
                    "sourceLocation": m.url,
                })
            })
            .collect();

        let mut product = AuditProduct::new(items.is_empty());
        if !items.is_empty() {
            product = product.with_display_value(format!("{} errors", items.len()));
        }
        Ok(product.with_details(json!({
            "type": "table",
            "headings": [
                { "key": "sourceLocation", "valueType": "source-location", "label": "Source" },
                { "key": "description", "valueType": "code", "label": "Description" }
            ],
            "items": items,
        })))
    }
}
