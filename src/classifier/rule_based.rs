//! Deterministic weighted-sum strategy

use super::features::{
    combine_title_scores, COMPANY_EXACT, COMPANY_FUZZY, DESCRIPTION_SIMILARITY, LOCATION_MATCH,
    SENIORITY_CONFLICT, TIME_DELTA_DAYS, TITLE_FUZZY, TITLE_ROLE_MATCH, TITLE_SIMILARITY,
    URL_SIMILARITY,
};
use super::{ClassificationStrategy, Verdict};
use crate::config::RuleWeights;
use crate::error::Result;
use crate::types::FeatureVector;

pub const NAME: &str = "rule_based";

/// Weighted sum over the observed subset of features, divided by the weight
/// actually used
#[derive(Debug, Clone)]
pub struct RuleBasedStrategy {
    weights: RuleWeights,
    threshold: f64,
}

impl RuleBasedStrategy {
    pub fn new(weights: RuleWeights, threshold: f64) -> Self {
        Self { weights, threshold }
    }

    fn total_weight(&self) -> f64 {
        let w = &self.weights;
        w.title
            + w.company_exact
            + w.company_fuzzy
            + w.url_similarity
            + w.location_match
            + w.description_similarity
            + w.time_delta
    }

    /// Probability and the fraction of total weight that had data behind it
    pub fn probability(&self, fv: &FeatureVector) -> (f64, f64) {
        let w = &self.weights;
        // Vectors without the role flags keep the plain best-of behaviour
        let same_role = fv.get(TITLE_ROLE_MATCH).map_or(true, |v| v >= 0.5);
        let conflict = fv.get(SENIORITY_CONFLICT).is_some_and(|v| v >= 0.5);
        let title = match (fv.get(TITLE_SIMILARITY), fv.get(TITLE_FUZZY)) {
            (Some(blended), Some(fuzzy)) => {
                Some(combine_title_scores(blended, fuzzy, same_role, conflict))
            }
            (Some(t), None) | (None, Some(t)) => Some(combine_title_scores(t, t, true, conflict)),
            (None, None) => None,
        };
        let time = fv
            .get(TIME_DELTA_DAYS)
            .map(|days| 1.0 - (days / w.time_window_days).min(1.0));

        let signals = [
            (title, w.title),
            (fv.get(COMPANY_EXACT), w.company_exact),
            (fv.get(COMPANY_FUZZY), w.company_fuzzy),
            (fv.get(URL_SIMILARITY), w.url_similarity),
            (fv.get(LOCATION_MATCH), w.location_match),
            (fv.get(DESCRIPTION_SIMILARITY), w.description_similarity),
            (time, w.time_delta),
        ];

        let mut weighted_sum = 0.0;
        let mut weight_used = 0.0;
        for (value, weight) in signals {
            if let Some(v) = value {
                weighted_sum += v.clamp(0.0, 1.0) * weight;
                weight_used += weight;
            }
        }
        if weight_used <= 0.0 {
            return (0.0, 0.0);
        }
        let total = self.total_weight();
        let coverage = if total > 0.0 { weight_used / total } else { 0.0 };
        (weighted_sum / weight_used, coverage)
    }
}

impl ClassificationStrategy for RuleBasedStrategy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn evaluate(&self, features: &FeatureVector) -> Result<Verdict> {
        let (probability, coverage) = self.probability(features);
        Ok(Verdict {
            probability,
            confidence: coverage * decision_confidence(probability, self.threshold),
        })
    }
}

/// `0.5 + 0.5 * margin`, where margin is the distance from the threshold
/// scaled to the room available on that side
pub fn decision_confidence(probability: f64, threshold: f64) -> f64 {
    let room = if probability > threshold {
        1.0 - threshold
    } else {
        threshold
    };
    let margin = if room > 0.0 {
        ((probability - threshold).abs() / room).min(1.0)
    } else {
        1.0
    };
    0.5 + 0.5 * margin
}
