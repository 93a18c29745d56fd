//! Strategy backed by an externally supplied model

use super::rule_based::decision_confidence;
use super::{ClassificationStrategy, Verdict};
use crate::collaborators::{BoundedInvoker, ModelScorer};
use crate::error::{DedupError, Result};
use crate::types::FeatureVector;
use std::sync::Arc;

pub const NAME: &str = "learned";

pub struct LearnedStrategy {
    model: Arc<dyn ModelScorer>,
    invoker: Arc<BoundedInvoker>,
    threshold: f64,
}

impl LearnedStrategy {
    pub fn new(model: Arc<dyn ModelScorer>, invoker: Arc<BoundedInvoker>, threshold: f64) -> Self {
        Self {
            model,
            invoker,
            threshold,
        }
    }
}

impl std::fmt::Debug for LearnedStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearnedStrategy")
            .field("invoker", &self.invoker)
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl ClassificationStrategy for LearnedStrategy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn evaluate(&self, features: &FeatureVector) -> Result<Verdict> {
        let model = Arc::clone(&self.model);
        let input = features.clone();
        let probability = match self.invoker.call("model", move || model.predict(&input)) {
            Ok(Ok(p)) => p,
            Ok(Err(e)) => {
                return Err(DedupError::ClassifierFailure(format!("model error: {:#}", e)));
            }
            Err(e) => return Err(DedupError::ClassifierFailure(e.to_string())),
        };
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(DedupError::ClassifierFailure(format!(
                "model returned out-of-range probability {}",
                probability
            )));
        }
        Ok(Verdict {
            probability,
            confidence: decision_confidence(probability, self.threshold),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Fixed(f64);

    impl ModelScorer for Fixed {
        fn predict(&self, _: &FeatureVector) -> anyhow::Result<f64> {
            Ok(self.0)
        }
    }

    struct Broken;

    impl ModelScorer for Broken {
        fn predict(&self, _: &FeatureVector) -> anyhow::Result<f64> {
            anyhow::bail!("weights not loaded")
        }
    }

    fn strategy(model: impl ModelScorer + 'static, ms: u64) -> LearnedStrategy {
        let invoker = Arc::new(BoundedInvoker::new(Duration::from_millis(ms)).unwrap());
        LearnedStrategy::new(Arc::new(model), invoker, 0.75)
    }

    #[test]
    fn test_valid_probability() {
        let v = strategy(Fixed(0.9), 500).evaluate(&FeatureVector::new()).unwrap();
        assert_eq!(v.probability, 0.9);
        assert!(v.confidence > 0.5);
    }

    #[test]
    fn test_failures_are_classifier_failures() {
        for s in [
            strategy(Fixed(1.5), 500),
            strategy(Fixed(f64::NAN), 500),
            strategy(Broken, 500),
        ] {
            let err = s.evaluate(&FeatureVector::new()).unwrap_err();
            assert!(matches!(err, DedupError::ClassifierFailure(_)));
        }
    }

    #[test]
    fn test_slow_model_times_out() {
        struct Slow;
        impl ModelScorer for Slow {
            fn predict(&self, _: &FeatureVector) -> anyhow::Result<f64> {
                std::thread::sleep(Duration::from_millis(300));
                Ok(1.0)
            }
        }
        let err = strategy(Slow, 20).evaluate(&FeatureVector::new()).unwrap_err();
        assert!(matches!(err, DedupError::ClassifierFailure(_)));
    }
}
