//! Computed artifacts
//!
//! A computed artifact is a named async derivation over some input (raw
//! artifacts, settings, other computed artifacts). Dependencies are not
//! declared up front: a computation simply requests what it needs through the
//! `ComputedCache` it is handed, and the cache guarantees each distinct input
//! is computed once per run.
//!
//! ```text
//! DevtoolsLog ──► NetworkRecords ──┬──► ResourceSummary
//!                                  └──► MainResource
//! ```
//!
//! # Hazard: cycles
//!
//! Nothing detects a computation that requests itself, directly or through
//! other computations. Such a request waits on its own in-flight slot and
//! never completes.

mod cache;
pub mod fingerprint;
mod main_resource;
mod network_records;
mod resource_summary;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ArtifactError;

pub use cache::{CacheKey, CacheStats, ComputedCache};
pub use main_resource::{MainResource, MainResourceInput};
pub use network_records::{NetworkRecord, NetworkRecords, NetworkRecordsInput};
pub use resource_summary::{ResourceCount, ResourceSummary, ResourceSummaryInput, ResourceSummaryOutput};

/// A memoizable derivation
///
/// # Example Implementation
///
/// ```ignore
/// struct PageBytes;
///
/// #[async_trait]
/// impl ComputedArtifact for PageBytes {
///     type Input = NetworkRecordsInput;
///     type Output = u64;
///
///     fn name(&self) -> &'static str {
///         "PageBytes"
///     }
///
///     async fn compute(&self, input: &Self::Input, cache: &ComputedCache) -> Result<u64, ArtifactError> {
///         let records = cache.request(&NetworkRecords, input).await?;
///         Ok(records.iter().map(|r| r.transfer_size).sum())
///     }
/// }
/// ```
#[async_trait]
pub trait ComputedArtifact: Send + Sync + 'static {
    /// Input identifying one derivation. Serialized to build the cache key,
    /// so every field that affects the output must be serialized.
    type Input: Serialize + Send + Sync;

    type Output: Send + Sync + 'static;

    /// Unique name, the first half of the cache key
    fn name(&self) -> &'static str;

    /// Derive the output. May request other computed artifacts via `cache`.
    async fn compute(
        &self,
        input: &Self::Input,
        cache: &ComputedCache,
    ) -> Result<Self::Output, ArtifactError>;
}
