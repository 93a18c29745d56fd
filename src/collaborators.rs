//! External collaborators
//!
//! Hosts can plug in a geocoder, a trained duplicate model and a sentence
//! similarity function. Calls that leave the process (geocoder, model) go
//! through [`BoundedInvoker`] so they can never block a batch indefinitely.

use crate::error::{DedupError, Result};
use crate::types::FeatureVector;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

/// Distance between two free-text locations
pub trait DistanceLookup: Send + Sync {
    /// Kilometres between the two locations, or `None` when unknown
    fn distance_km(&self, a: &str, b: &str) -> Option<f64>;
}

/// Trained duplicate model
pub trait ModelScorer: Send + Sync {
    /// Duplicate probability in [0, 1] for a pairwise feature vector
    fn predict(&self, features: &FeatureVector) -> anyhow::Result<f64>;
}

/// Sentence-level similarity (embedding based or otherwise)
pub trait SentenceSimilarity: Send + Sync {
    /// Similarity in [0, 1] between two sentences
    fn similarity(&self, a: &str, b: &str) -> f64;
}

impl<F> DistanceLookup for F
where
    F: Fn(&str, &str) -> Option<f64> + Send + Sync,
{
    fn distance_km(&self, a: &str, b: &str) -> Option<f64> {
        self(a, b)
    }
}

impl<F> SentenceSimilarity for F
where
    F: Fn(&str, &str) -> f64 + Send + Sync,
{
    fn similarity(&self, a: &str, b: &str) -> f64 {
        self(a, b)
    }
}

/// Runs collaborator calls on a blocking pool under a fixed time bound
pub struct BoundedInvoker {
    runtime: Option<Runtime>,
    timeout: Duration,
}

impl BoundedInvoker {
    /// Create an invoker with the given per-call bound
    pub fn new(timeout: Duration) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("jobdedup-collab")
            .enable_time()
            .build()?;
        Ok(BoundedInvoker {
            runtime: Some(runtime),
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `f` and wait at most the configured bound.
    ///
    /// Must be called from a blocking context, not from inside an async task.
    /// A timed-out call is abandoned; its eventual result is discarded.
    pub fn call<T, F>(&self, what: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let runtime = self.runtime.as_ref().ok_or_else(|| {
            DedupError::CollaboratorFailure(format!("{}: runtime shut down", what))
        })?;
        let timeout = self.timeout;

        runtime.block_on(async move {
            let task = tokio::task::spawn_blocking(f);
            match tokio::time::timeout(timeout, task).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(DedupError::CollaboratorFailure(format!(
                    "{}: task panicked: {}",
                    what, e
                ))),
                Err(_) => Err(DedupError::CollaboratorTimeout(format!(
                    "{} exceeded {} ms",
                    what,
                    timeout.as_millis()
                ))),
            }
        })
    }
}

impl Drop for BoundedInvoker {
    fn drop(&mut self) {
        // Do not wait for abandoned calls
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for BoundedInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedInvoker")
            .field("timeout", &self.timeout)
            .finish()
    }
}
