//! Duplicate classifier
//!
//! One feature-extraction step feeds a configurable strategy. The rule-based
//! strategy is always constructed and serves as the fallback whenever the
//! selected strategy fails for a pair.

pub mod features;
pub mod learned;
pub mod rule_based;

pub use features::FeatureExtractor;
pub use learned::LearnedStrategy;
pub use rule_based::RuleBasedStrategy;

use crate::collaborators::{BoundedInvoker, ModelScorer};
use crate::config::{Config, StrategyKind};
use crate::error::Result;
use crate::types::{FeatureVector, JobRecord, SimilarityResult};
use std::sync::Arc;
use tracing::warn;

/// Probability and confidence produced by a strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub probability: f64,
    pub confidence: f64,
}

/// Turns a pairwise feature vector into a duplicate probability
pub trait ClassificationStrategy: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn evaluate(&self, features: &FeatureVector) -> Result<Verdict>;
}

#[derive(Debug)]
pub struct DuplicateClassifier {
    extractor: FeatureExtractor,
    selected: Option<Box<dyn ClassificationStrategy>>,
    fallback: RuleBasedStrategy,
    threshold: f64,
}

impl DuplicateClassifier {
    /// Build the classifier the configuration asks for.
    ///
    /// A learned strategy without a model logs a warning and runs rule-based.
    pub fn new(
        config: &Config,
        extractor: FeatureExtractor,
        model: Option<Arc<dyn ModelScorer>>,
        invoker: Arc<BoundedInvoker>,
    ) -> Self {
        let threshold = config.thresholds.ml_confidence;
        let fallback = RuleBasedStrategy::new(config.classifier.weights.clone(), threshold);
        let selected: Option<Box<dyn ClassificationStrategy>> =
            match (config.classifier.strategy, model) {
                (StrategyKind::Learned, Some(model)) => {
                    Some(Box::new(LearnedStrategy::new(model, invoker, threshold)))
                }
                (StrategyKind::Learned, None) => {
                    warn!("Learned strategy configured but no model supplied; using rule-based");
                    None
                }
                (StrategyKind::RuleBased, _) => None,
            };
        Self {
            extractor,
            selected,
            fallback,
            threshold,
        }
    }

    /// Rule-based classifier with string-only scorers
    pub fn rule_based(config: &Config) -> Self {
        Self {
            extractor: FeatureExtractor::new(config),
            selected: None,
            fallback: RuleBasedStrategy::new(
                config.classifier.weights.clone(),
                config.thresholds.ml_confidence,
            ),
            threshold: config.thresholds.ml_confidence,
        }
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn strategy_name(&self) -> &'static str {
        self.selected
            .as_ref()
            .map(|s| s.name())
            .unwrap_or(rule_based::NAME)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Classify a pair of records
    pub fn classify(&self, a: &JobRecord, b: &JobRecord) -> SimilarityResult {
        let features = self.extractor.build(a, b);
        self.classify_features(features)
    }

    /// Classify an already built feature vector
    pub fn classify_features(&self, features: FeatureVector) -> SimilarityResult {
        let (verdict, strategy) = match &self.selected {
            Some(strategy) => match strategy.evaluate(&features) {
                Ok(v) => (v, strategy.name()),
                Err(e) => {
                    warn!("{} strategy failed, falling back to rule-based: {}", strategy.name(), e);
                    (self.rule_based_verdict(&features), rule_based::NAME)
                }
            },
            None => (self.rule_based_verdict(&features), rule_based::NAME),
        };

        SimilarityResult {
            score: verdict.probability,
            is_duplicate: verdict.probability > self.threshold,
            features,
            confidence: verdict.confidence.clamp(0.0, 1.0),
            strategy: strategy.to_string(),
        }
    }

    fn rule_based_verdict(&self, features: &FeatureVector) -> Verdict {
        let (probability, coverage) = self.fallback.probability(features);
        Verdict {
            probability,
            confidence: coverage * rule_based::decision_confidence(probability, self.threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record(id: &str, title: &str, company: &str) -> JobRecord {
        JobRecord {
            id: id.into(),
            title: title.into(),
            company: company.into(),
            ..Default::default()
        }
    }

    fn invoker() -> Arc<BoundedInvoker> {
        Arc::new(BoundedInvoker::new(Duration::from_millis(500)).unwrap())
    }

    struct Constant(f64);

    impl ModelScorer for Constant {
        fn predict(&self, _: &FeatureVector) -> anyhow::Result<f64> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_rule_based_default() {
        let c = DuplicateClassifier::rule_based(&Config::default());
        let r = c.classify(
            &record("a", "Data Engineer", "Acme"),
            &record("b", "Data Engineer", "Acme Inc"),
        );
        assert!(r.is_duplicate);
        assert_eq!(r.strategy, "rule_based");
        assert_eq!(c.strategy_name(), "rule_based");
    }

    #[test]
    fn test_learned_without_model_uses_rules() {
        let mut config = Config::default();
        config.classifier.strategy = StrategyKind::Learned;
        let c = DuplicateClassifier::new(&config, FeatureExtractor::new(&config), None, invoker());
        assert_eq!(c.strategy_name(), "rule_based");
    }

    #[test]
    fn test_learned_model_used() {
        let mut config = Config::default();
        config.classifier.strategy = StrategyKind::Learned;
        let c = DuplicateClassifier::new(
            &config,
            FeatureExtractor::new(&config),
            Some(Arc::new(Constant(0.1))),
            invoker(),
        );
        let r = c.classify(
            &record("a", "Data Engineer", "Acme"),
            &record("b", "Data Engineer", "Acme"),
        );
        assert_eq!(r.strategy, "learned");
        assert_eq!(r.score, 0.1);
        assert!(!r.is_duplicate);
    }

    #[test]
    fn test_bad_model_output_falls_back() {
        let mut config = Config::default();
        config.classifier.strategy = StrategyKind::Learned;
        let c = DuplicateClassifier::new(
            &config,
            FeatureExtractor::new(&config),
            Some(Arc::new(Constant(7.0))),
            invoker(),
        );
        let a = record("a", "Data Engineer", "Acme");
        let b = record("b", "Data Engineer", "Acme");
        let r = c.classify(&a, &b);
        assert_eq!(r.strategy, "rule_based");
        let rules = DuplicateClassifier::rule_based(&config).classify(&a, &b);
        assert_eq!(r.score, rules.score);
    }
}
