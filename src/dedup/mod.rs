//! Bulk deduplication: LSH candidate retrieval, staged pair evaluation,
//! union-find grouping and representative selection

pub mod lsh;
pub mod pipeline;
pub mod representative;
pub mod union_find;

pub use lsh::{embed, embedding_tokens, exact_key, LshIndex};
pub use pipeline::{DedupRun, PairEvaluator, PairOutcome, RunState};
pub use representative::{completeness_score, select_representative};
pub use union_find::UnionFind;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation shared between a caller and a running batch.
///
/// Checked before each candidate pair is evaluated.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_shared() {
        let flag = CancellationFlag::new();
        let clone = flag.clone();
        assert!(!flag.is_cancelled());
        clone.cancel();
        assert!(flag.is_cancelled());
    }
}
