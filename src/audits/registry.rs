//! Audits by id

use indexmap::IndexMap;
use std::sync::Arc;
use tracing::warn;

use super::{
    Audit, DocumentTitleAudit, ErrorsInConsoleAudit, IsOnHttpsAudit, ResourceSummaryAudit,
    StructuredDataAudit, TotalByteWeightAudit, ViewportAudit,
};
use crate::models::GatherMode;

/// Registered audits, in registration order
#[derive(Default, Clone)]
pub struct AuditRegistry {
    audits: IndexMap<String, Arc<dyn Audit>>,
}

impl AuditRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in audit
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DocumentTitleAudit::new()));
        registry.register(Arc::new(ViewportAudit::new()));
        registry.register(Arc::new(StructuredDataAudit::new()));
        registry.register(Arc::new(IsOnHttpsAudit::new()));
        registry.register(Arc::new(ErrorsInConsoleAudit::new()));
        registry.register(Arc::new(TotalByteWeightAudit::new()));
        registry.register(Arc::new(ResourceSummaryAudit::new()));
        registry
    }

    /// Register an audit, replacing any audit with the same id
    pub fn register(&mut self, audit: Arc<dyn Audit>) {
        let id = audit.meta().id.clone();
        if self.audits.insert(id.clone(), audit).is_some() {
            warn!("Audit {} registered twice, keeping the last one", id);
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Audit>> {
        self.audits.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.audits.contains_key(id)
    }

    /// Whether the audit exists and can run in `mode`.
    /// Unknown ids are treated as supported so validation can report them.
    pub fn supports_mode(&self, id: &str, mode: GatherMode) -> bool {
        self.audits
            .get(id)
            .map(|audit| audit.meta().supports(mode))
            .unwrap_or(true)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.audits.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Audit>> {
        self.audits.values()
    }

    pub fn len(&self) -> usize {
        self.audits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.audits.is_empty()
    }
}

impl std::fmt::Debug for AuditRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRegistry")
            .field("audits", &self.audits.keys().collect::<Vec<_>>())
            .finish()
    }
}
