//! Description scorer
//!
//! Produces a bundle of independent signals. Collapsing them into one number
//! is left to the caller via [`DescriptionFeatures::combined`].

use super::weighted_mean;
use crate::collaborators::{BoundedInvoker, SentenceSimilarity};
use crate::config::DescriptionWeights;
use crate::similarity::{cosine, jaccard, ratio};
use crate::text::{analyze, extract_keywords, split_paragraphs, split_sentences, HEURISTIC_IDF};
use crate::types::FeatureVector;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::warn;

/// Keywords taken from each description for the overlap signal
const KEYWORD_COUNT: usize = 20;

/// Sentences considered per description when a sentence scorer is plugged in
const MAX_SENTENCES: usize = 40;

/// Signals comparing two descriptions, each in [0, 1]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptionFeatures {
    pub tfidf_cosine: f64,
    pub keyword_overlap: f64,
    pub structure: f64,
    /// Present only when a sentence similarity implementation is available
    pub sentence: Option<f64>,
}

impl DescriptionFeatures {
    /// Single similarity from the configured weights
    pub fn combined(&self, weights: &DescriptionWeights) -> f64 {
        weighted_mean([
            (Some(self.tfidf_cosine), weights.tfidf),
            (Some(self.keyword_overlap), weights.keywords),
            (Some(self.structure), weights.structure),
            (self.sentence, weights.sentence),
        ])
        .unwrap_or(0.0)
    }

    pub fn to_features(&self) -> FeatureVector {
        let mut fv = FeatureVector::new();
        fv.insert("tfidf", self.tfidf_cosine);
        fv.insert("keywords", self.keyword_overlap);
        fv.insert("structure", self.structure);
        fv.insert_opt("sentence", self.sentence);
        fv
    }
}

struct SentencePlugin {
    scorer: Arc<dyn SentenceSimilarity>,
    invoker: Arc<BoundedInvoker>,
}

#[derive(Default)]
pub struct DescriptionScorer {
    sentence: Option<SentencePlugin>,
}

impl DescriptionScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable the sentence-pair signal, bounded by `invoker`
    pub fn with_sentence_similarity(
        scorer: Arc<dyn SentenceSimilarity>,
        invoker: Arc<BoundedInvoker>,
    ) -> Self {
        Self {
            sentence: Some(SentencePlugin { scorer, invoker }),
        }
    }

    pub fn score(&self, a: &str, b: &str) -> DescriptionFeatures {
        if a.trim().is_empty() || b.trim().is_empty() {
            return DescriptionFeatures::default();
        }
        DescriptionFeatures {
            tfidf_cosine: tfidf_cosine(a, b),
            keyword_overlap: keyword_overlap(a, b),
            structure: structural_similarity(a, b),
            sentence: self.sentence_similarity(a, b),
        }
    }

    fn sentence_similarity(&self, a: &str, b: &str) -> Option<f64> {
        let plugin = self.sentence.as_ref()?;
        let sa: Vec<String> = split_sentences(a).into_iter().take(MAX_SENTENCES).collect();
        let sb: Vec<String> = split_sentences(b).into_iter().take(MAX_SENTENCES).collect();
        if sa.is_empty() || sb.is_empty() {
            return Some(0.0);
        }
        let scorer = Arc::clone(&plugin.scorer);
        let result = plugin.invoker.call("sentence similarity", move || {
            let forward = best_match_mean(scorer.as_ref(), &sa, &sb);
            let backward = best_match_mean(scorer.as_ref(), &sb, &sa);
            (forward + backward) / 2.0
        });
        match result {
            Ok(v) if v.is_finite() => Some(v.clamp(0.0, 1.0)),
            Ok(v) => {
                warn!("Sentence similarity returned {}, ignoring", v);
                None
            }
            Err(e) => {
                warn!("Sentence similarity unavailable: {}", e);
                None
            }
        }
    }
}

impl std::fmt::Debug for DescriptionScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptionScorer")
            .field("sentence", &self.sentence.is_some())
            .finish()
    }
}

/// Mean over `from` of the best similarity against any sentence in `to`
fn best_match_mean(scorer: &dyn SentenceSimilarity, from: &[String], to: &[String]) -> f64 {
    let total: f64 = from
        .iter()
        .map(|s| {
            to.iter()
                .map(|t| scorer.similarity(s, t))
                .fold(0.0f64, f64::max)
        })
        .sum();
    total / from.len() as f64
}

fn tfidf_vector(text: &str) -> BTreeMap<String, f64> {
    let mut vec = BTreeMap::new();
    for token in analyze(text) {
        *vec.entry(token).or_insert(0.0) += HEURISTIC_IDF;
    }
    vec
}

/// Cosine over term vectors weighted with the constant heuristic IDF
pub fn tfidf_cosine(a: &str, b: &str) -> f64 {
    cosine(&tfidf_vector(a), &tfidf_vector(b))
}

/// Jaccard of the top keywords of each description
pub fn keyword_overlap(a: &str, b: &str) -> f64 {
    let ka: HashSet<String> = extract_keywords(a, KEYWORD_COUNT).into_iter().collect();
    let kb: HashSet<String> = extract_keywords(b, KEYWORD_COUNT).into_iter().collect();
    jaccard(&ka, &kb)
}

struct Shape {
    sentences: f64,
    paragraphs: f64,
    list_ratio: f64,
    punctuation_density: f64,
}

fn is_list_line(line: &str) -> bool {
    let t = line.trim_start();
    if t.starts_with(['-', '*', '•', '·']) {
        return true;
    }
    let digits = t.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && matches!(t[digits..].chars().next(), Some('.') | Some(')'))
}

fn shape(text: &str) -> Shape {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let list_lines = lines.iter().filter(|l| is_list_line(l)).count();
    let chars = text.chars().filter(|c| !c.is_whitespace()).count();
    let punct = text.chars().filter(|c| c.is_ascii_punctuation()).count();
    Shape {
        sentences: split_sentences(text).len() as f64,
        paragraphs: split_paragraphs(text).len() as f64,
        list_ratio: if lines.is_empty() {
            0.0
        } else {
            list_lines as f64 / lines.len() as f64
        },
        punctuation_density: if chars == 0 {
            0.0
        } else {
            punct as f64 / chars as f64
        },
    }
}

/// Mean of ratios over sentence count, paragraph count, list usage and
/// punctuation density
pub fn structural_similarity(a: &str, b: &str) -> f64 {
    let sa = shape(a);
    let sb = shape(b);
    (ratio(sa.sentences, sb.sentences)
        + ratio(sa.paragraphs, sb.paragraphs)
        + ratio(sa.list_ratio, sb.list_ratio)
        + ratio(sa.punctuation_density, sb.punctuation_density))
        / 4.0
}
