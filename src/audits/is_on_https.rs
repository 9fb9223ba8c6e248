//! Every request uses a secure transport

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashSet;

use super::{Audit, AuditContext, AuditMeta, AuditProduct};
use crate::artifacts::Artifacts;
use crate::computed::{NetworkRecords, NetworkRecordsInput};

pub struct IsOnHttpsAudit {
    meta: AuditMeta,
}

impl IsOnHttpsAudit {
    pub fn new() -> Self {
        Self {
            meta: AuditMeta::new(
                "is-on-https",
                "Uses HTTPS",
                "All sites should be protected with HTTPS, even ones that don't handle \
                 sensitive data. This includes avoiding mixed content, where some resources \
                 are loaded over HTTP despite the initial request being served over HTTPS.",
            )
            .failure_title("Does not use HTTPS")
            .requires(&["DevtoolsLog"]),
        }
    }
}

impl Default for IsOnHttpsAudit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Audit for IsOnHttpsAudit {
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }

    async fn audit(&self, artifacts: &Artifacts, ctx: &AuditContext) -> anyhow::Result<AuditProduct> {
        let input = NetworkRecordsInput::from_artifacts(artifacts)?;
        let records = ctx.computed.request(&NetworkRecords, &input).await?;

        if records.is_empty() {
            return Ok(AuditProduct::not_applicable());
        }

        // One row per URL, first-seen order
        let mut seen = HashSet::new();
        let insecure_urls: Vec<&str> = records
            .iter()
            .filter(|r| !r.is_secure())
            .map(|r| r.url.as_str())
            .filter(|url| seen.insert(*url))
            .collect();

        let items: Vec<_> = insecure_urls.iter().map(|url| json!({ "url": url })).collect();
        let mut product = AuditProduct::new(insecure_urls.is_empty()).with_details(json!({
            "type": "table",
            "headings": [{ "key": "url", "valueType": "url", "label": "Insecure URL" }],
            "items": items,
        }));

        match insecure_urls.len() {
            0 => {}
            1 => product = product.with_display_value("1 insecure request found"),
            n => product = product.with_display_value(format!("{} insecure requests found", n)),
        }
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audits::run_audit;
    use crate::computed::ComputedCache;
    use crate::config::Settings;
    use crate::models::{AuditResult, ScoreDisplayMode};
    use serde_json::Value;
    use std::sync::Arc;

    fn request(id: &str, url: &str) -> Value {
        json!({"method": "Network.requestWillBeSent", "params": {
            "requestId": id, "timestamp": 1.0, "type": "Document", "request": {"url": url}}})
    }

    async fn run(log: Value) -> AuditResult {
        let mut artifacts = Artifacts::default();
        artifacts.insert("DevtoolsLog", log);
        let ctx = AuditContext {
            settings: Arc::new(Settings::default()),
            computed: Arc::new(ComputedCache::new()),
            options: Value::Null,
            gather_mode: Default::default(),
        };
        run_audit(&IsOnHttpsAudit::new(), &artifacts, &ctx).await.unwrap()
    }

    #[tokio::test]
    async fn test_all_secure() {
        let result = run(json!([
            request("1", "https://example.com/"),
            request("2", "http://localhost:8080/dev.js"),
            request("3", "data:image/png;base64,AAAA"),
        ]))
        .await;
        assert_eq!(result.score, Some(1.0));
        assert_eq!(result.display_value, None);
    }

    #[tokio::test]
    async fn test_insecure_requests() {
        let result = run(json!([
            request("1", "https://example.com/"),
            request("2", "http://cdn.example.com/a.js"),
            request("3", "http://cdn.example.com/b.js"),
        ]))
        .await;
        assert_eq!(result.score, Some(0.0));
        assert_eq!(result.title, "Does not use HTTPS");
        assert_eq!(result.display_value.as_deref(), Some("2 insecure requests found"));
        assert_eq!(result.details.unwrap()["items"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_no_requests_is_not_applicable() {
        let result = run(json!([])).await;
        assert_eq!(result.score, None);
        assert_eq!(result.score_display_mode, ScoreDisplayMode::NotApplicable);
    }

    #[tokio::test]
    async fn test_malformed_log_is_an_error_result() {
        let result = run(json!({"not": "a log"})).await;
        assert_eq!(result.score_display_mode, ScoreDisplayMode::Error);
        assert!(result.error_message.unwrap().contains("DevtoolsLog"));
    }
}
