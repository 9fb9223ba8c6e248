//! Document has a `<title>` element

use async_trait::async_trait;

use super::{Audit, AuditContext, AuditMeta, AuditProduct};
use crate::artifacts::Artifacts;

pub struct DocumentTitleAudit {
    meta: AuditMeta,
}

impl DocumentTitleAudit {
    pub fn new() -> Self {
        Self {
            meta: AuditMeta::new(
                "document-title",
                "Document has a `<title>` element",
                "The title gives screen reader users an overview of the page, and search \
                 engine users rely on it heavily to determine if a page is relevant to their search.",
            )
            .failure_title("Document doesn't have a `<title>` element")
            .requires(&["DocumentTitle"]),
        }
    }
}

impl Default for DocumentTitleAudit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Audit for DocumentTitleAudit {
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }

    async fn audit(&self, artifacts: &Artifacts, _ctx: &AuditContext) -> anyhow::Result<AuditProduct> {
        let title: Option<String> = artifacts.get_as("DocumentTitle")?;
        let has_title = title.map(|t| !t.trim().is_empty()).unwrap_or(false);
        Ok(AuditProduct::new(has_title))
    }
}
