//! Title scorer: weighted blend of six string signals over normalized titles

use super::{weighted_mean, FieldScore};
use crate::config::TitleWeights;
use crate::similarity::{
    bigram_overlap, cosine_tokens, jaccard_tokens, normalized_levenshtein, phonetic_similarity,
};
use crate::text::{analyze, normalize_title};
use crate::types::FeatureVector;

#[derive(Debug, Clone, Default)]
pub struct TitleScorer {
    weights: TitleWeights,
}

impl TitleScorer {
    pub fn new(weights: TitleWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &TitleWeights {
        &self.weights
    }

    /// Compare two raw titles
    pub fn score(&self, a: &str, b: &str) -> FieldScore {
        let na = normalize_title(a);
        let nb = normalize_title(b);
        if na.is_empty() || nb.is_empty() {
            return FieldScore::zero();
        }

        let components = if na == nb {
            [1.0; 6]
        } else {
            let ta = analyze(&na);
            let tb = analyze(&nb);
            [
                0.0,
                jaccard_tokens(&ta, &tb),
                cosine_tokens(&ta, &tb),
                normalized_levenshtein(&na, &nb),
                bigram_overlap(&na, &nb),
                phonetic_similarity(&na, &nb),
            ]
        };

        let w = &self.weights;
        let weights = [w.exact, w.jaccard, w.cosine, w.levenshtein, w.bigram, w.phonetic];
        let score = weighted_mean(components.iter().zip(weights).map(|(c, w)| (Some(*c), w)))
            .unwrap_or(0.0);

        let mut features = FeatureVector::new();
        for (name, value) in ["exact", "jaccard", "cosine", "levenshtein", "bigram", "phonetic"]
            .iter()
            .zip(components)
        {
            features.insert(name, value);
        }
        FieldScore { score, features }
    }
}
