//! Manual check: structured data is valid

use async_trait::async_trait;

use super::{Audit, AuditContext, AuditMeta, AuditProduct};
use crate::artifacts::Artifacts;
use crate::models::ScoreDisplayMode;

pub struct StructuredDataAudit {
    meta: AuditMeta,
}

impl StructuredDataAudit {
    pub fn new() -> Self {
        Self {
            meta: AuditMeta::new(
                "structured-data",
                "Structured data is valid",
                "Run the Structured Data Testing Tool and the Structured Data Linter to validate \
                 structured data.",
            )
            .display_mode(ScoreDisplayMode::Manual),
        }
    }
}

impl Default for StructuredDataAudit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Audit for StructuredDataAudit {
    fn meta(&self) -> &AuditMeta {
        &self.meta
    }

    async fn audit(&self, _artifacts: &Artifacts, _ctx: &AuditContext) -> anyhow::Result<AuditProduct> {
        Ok(AuditProduct::unscored())
    }
}
