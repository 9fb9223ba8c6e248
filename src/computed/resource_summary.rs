//! Request counts and transfer sizes grouped by resource type

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;

use super::network_records::url_host;
use super::{ComputedArtifact, ComputedCache, NetworkRecords, NetworkRecordsInput};
use crate::artifacts::Artifacts;
use crate::error::ArtifactError;

/// Buckets in display order
const RESOURCE_TYPES: &[&str] = &[
    "total",
    "document",
    "script",
    "stylesheet",
    "image",
    "font",
    "media",
    "other",
    "third-party",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCount {
    pub count: usize,
    pub transfer_size: u64,
}

pub type ResourceSummaryOutput = IndexMap<&'static str, ResourceCount>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSummaryInput {
    #[serde(flatten)]
    pub network: NetworkRecordsInput,
    pub main_document_url: String,
}

impl ResourceSummaryInput {
    pub fn from_artifacts(artifacts: &Artifacts) -> Result<Self, ArtifactError> {
        let main_document_url = artifacts
            .url
            .main_document_url
            .clone()
            .ok_or_else(|| ArtifactError::Missing("URL".to_string()))?;
        Ok(Self {
            network: NetworkRecordsInput::from_artifacts(artifacts)?,
            main_document_url,
        })
    }
}

pub struct ResourceSummary;

fn bucket(resource_type: &str) -> &'static str {
    match resource_type {
        "Document" => "document",
        "Script" => "script",
        "Stylesheet" => "stylesheet",
        "Image" => "image",
        "Font" => "font",
        "Media" => "media",
        _ => "other",
    }
}

/// Registrable-ish domain: the last two host labels
fn root_domain(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').collect();
    let start = labels.len().saturating_sub(2);
    labels[start..].join(".").to_ascii_lowercase()
}

#[async_trait]
impl ComputedArtifact for ResourceSummary {
    type Input = ResourceSummaryInput;
    type Output = ResourceSummaryOutput;

    fn name(&self) -> &'static str {
        "ResourceSummary"
    }

    async fn compute(
        &self,
        input: &ResourceSummaryInput,
        cache: &ComputedCache,
    ) -> Result<ResourceSummaryOutput, ArtifactError> {
        let records = cache.request(&NetworkRecords, &input.network).await?;
        let first_party = url_host(&input.main_document_url).map(root_domain);

        let mut summary: ResourceSummaryOutput = RESOURCE_TYPES
            .iter()
            .map(|t| (*t, ResourceCount::default()))
            .collect();

        for record in records.iter().filter(|r| !r.is_non_network()) {
            let mut add = |key: &'static str| {
                if let Some(entry) = summary.get_mut(key) {
                    entry.count += 1;
                    entry.transfer_size += record.transfer_size;
                }
            };
            add("total");
            add(bucket(&record.resource_type));

            let is_third_party = match (&first_party, record.host()) {
                (Some(first), Some(host)) => &root_domain(host) != first,
                _ => false,
            };
            if is_third_party {
                add("third-party");
            }
        }

        Ok(summary)
    }
}
