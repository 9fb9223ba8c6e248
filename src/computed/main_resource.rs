//! The network record of the main document

use async_trait::async_trait;
use serde::Serialize;

use super::{ComputedArtifact, ComputedCache, NetworkRecord, NetworkRecords, NetworkRecordsInput};
use crate::artifacts::Artifacts;
use crate::error::ArtifactError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MainResourceInput {
    #[serde(flatten)]
    pub network: NetworkRecordsInput,
    pub main_document_url: String,
}

impl MainResourceInput {
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

pub struct MainResource;

fn strip_fragment(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}

#[async_trait]
impl ComputedArtifact for MainResource {
    type Input = MainResourceInput;
    type Output = NetworkRecord;

    fn name(&self) -> &'static str {
        "MainResource"
    }

    async fn compute(
        &self,
        input: &MainResourceInput,
        cache: &ComputedCache,
    ) -> Result<NetworkRecord, ArtifactError> {
        let records = cache.request(&NetworkRecords, &input.network).await?;
        let wanted = strip_fragment(&input.main_document_url);

        records
            .iter()
            .find(|r| r.resource_type == "Document" && strip_fragment(&r.url) == wanted)
            .or_else(|| records.iter().find(|r| strip_fragment(&r.url) == wanted))
            .cloned()
            .ok_or_else(|| {
                ArtifactError::computation(self.name(), "Unable to identify the main resource")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(url: &str) -> MainResourceInput {
        MainResourceInput {
            network: NetworkRecordsInput {
                devtools_log: json!([
                    {"method": "Network.requestWillBeSent", "params": {
                        "requestId": "7", "timestamp": 2.0, "type": "Document",
                        "request": {"url": "https://example.com/"}}}
                ]),
            },
            main_document_url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn test_finds_document_ignoring_fragment() {
        let cache = ComputedCache::new();
        let record = cache
            .request(&MainResource, &input("https://example.com/#top"))
            .await
            .unwrap();
        assert_eq!(record.request_id, "7");
        // NetworkRecords was computed through the shared cache
        assert_eq!(cache.stats().computations, 2);
    }

    #[tokio::test]
    async fn test_missing_main_resource_is_an_error() {
        let cache = ComputedCache::new();
        let err = cache
            .request(&MainResource, &input("https://other.example/"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ArtifactError::computation("MainResource", "Unable to identify the main resource")
        );
    }
}
