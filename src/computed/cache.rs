//! Per-run computed artifact cache
//!
//! Keys are `(computation name, content fingerprint of the input)`. Each key
//! owns a `OnceCell` slot:
//! - the first caller runs the computation inside the slot
//! - callers arriving while it is in flight await the same slot
//! - the stored outcome, success or failure, is returned to every later
//!   caller for the rest of the run; a computation that panics is stored as
//!   a failure
//!
//! If the future running a computation is dropped before it finishes, the
//! slot stays empty and the next caller computes again.
//!
//! A cache belongs to one run. Start every run (and every retry) with a
//! fresh instance.

use dashmap::DashMap;
use std::any::Any;
use std::future::{poll_fn, Future};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::Poll;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::fingerprint::fingerprint;
use super::ComputedArtifact;
use crate::error::{panic_message, ArtifactError};

type StoredValue = Arc<dyn Any + Send + Sync>;
type Slot = Arc<OnceCell<Result<StoredValue, ArtifactError>>>;

/// Cache key for one computed artifact request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub computation: &'static str,
    pub fingerprint: String,
}

/// Counters for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Calls to `request`
    pub requests: usize,
    /// Computation bodies actually started
    pub computations: usize,
    /// Distinct keys seen
    pub entries: usize,
}

/// Thread-safe memoization layer for computed artifacts
#[derive(Default)]
pub struct ComputedCache {
    slots: DashMap<CacheKey, Slot>,
    requests: AtomicUsize,
    computations: AtomicUsize,
}

impl ComputedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the output of `computation` for `input`.
    ///
    /// Structurally equal inputs resolve to the same `Arc`.
    pub async fn request<C: ComputedArtifact>(
        &self,
        computation: &C,
        input: &C::Input,
    ) -> Result<Arc<C::Output>, ArtifactError> {
        let name = computation.name();
        let fingerprint = fingerprint(input).map_err(|e| ArtifactError::Fingerprint {
            computation: name,
            message: e.to_string(),
        })?;
        let key = CacheKey {
            computation: name,
            fingerprint,
        };

        self.requests.fetch_add(1, Ordering::Relaxed);
        let slot = self.slot(key);

        let stored = slot
            .get_or_init(|| async {
                self.computations.fetch_add(1, Ordering::Relaxed);
                let start = Instant::now();
                debug!("Computing {}", name);

                // A panic is stored as a failure like any other
                let mut computing = Box::pin(computation.compute(input, self));
                let result = poll_fn(|cx| {
                    match panic::catch_unwind(AssertUnwindSafe(|| computing.as_mut().poll(cx))) {
                        Ok(poll) => poll,
                        Err(payload) => Poll::Ready(Err(ArtifactError::computation(
                            name,
                            format!("panicked: {}", panic_message(payload.as_ref())),
                        ))),
                    }
                })
                .await
                .map(|output| Arc::new(output) as StoredValue);

                match &result {
                    Ok(_) => debug!("Computed {} in {:?}", name, start.elapsed()),
                    Err(e) => warn!("Computed artifact {} failed: {}", name, e),
                }
                result
            })
            .await;

        match stored {
            Ok(value) => Arc::clone(value)
                .downcast::<C::Output>()
                .map_err(|_| ArtifactError::TypeMismatch { computation: name }),
            Err(e) => Err(e.clone()),
        }
    }

    /// Get or create the slot for a key without holding the map lock across
    /// an await point
    fn slot(&self, key: CacheKey) -> Slot {
        Arc::clone(self.slots.entry(key).or_default().value())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            requests: self.requests.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
            entries: self.slots.len(),
        }
    }
}

impl std::fmt::Debug for ComputedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputedCache")
            .field("stats", &self.stats())
            .finish()
    }
}
