//! String and token-set similarity metrics
//!
//! Every metric returns a score in [0, 1]. Empty input on either side scores 0.
//! Raw distances are named as such.

pub mod phonetic;

pub use phonetic::{metaphone, metaphone_match, soundex, soundex_match};

use crate::text;
use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

/// Jaccard similarity: |intersection| / |union|
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Jaccard similarity over the distinct tokens of two token lists
pub fn jaccard_tokens(a: &[String], b: &[String]) -> f64 {
    let set_a: HashSet<&str> = a.iter().map(|s| s.as_str()).collect();
    let set_b: HashSet<&str> = b.iter().map(|s| s.as_str()).collect();
    jaccard(&set_a, &set_b)
}

/// Cosine similarity between two sparse term vectors
pub fn cosine(a: &BTreeMap<String, f64>, b: &BTreeMap<String, f64>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .filter_map(|(k, va)| b.get(k).map(|vb| va * vb))
        .sum();
    let norm_a = a.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b = b.values().map(|v| v * v).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

/// Cosine similarity over term-frequency vectors of two token lists
pub fn cosine_tokens(a: &[String], b: &[String]) -> f64 {
    cosine(&text::term_frequencies(a), &text::term_frequencies(b))
}

/// Raw character edit distance
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// `1 - edit_distance / max(len_a, len_b)` over characters
pub fn normalized_levenshtein(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    if len_a == 0 || len_b == 0 {
        return 0.0;
    }
    let max_len = len_a.max(len_b) as f64;
    1.0 - levenshtein_distance(a, b) as f64 / max_len
}

/// Dice overlap of character n-gram sets
pub fn ngram_overlap(a: &str, b: &str, n: usize) -> f64 {
    let grams_a: HashSet<String> = text::ngrams(a, n).into_iter().collect();
    let grams_b: HashSet<String> = text::ngrams(b, n).into_iter().collect();
    if grams_a.is_empty() || grams_b.is_empty() {
        return 0.0;
    }
    let shared = grams_a.intersection(&grams_b).count();
    2.0 * shared as f64 / (grams_a.len() + grams_b.len()) as f64
}

/// Character bigram overlap
pub fn bigram_overlap(a: &str, b: &str) -> f64 {
    ngram_overlap(a, b, 2)
}

fn words(s: &str) -> Vec<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Edit similarity after sorting the words of both strings
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let mut wa = words(a);
    let mut wb = words(b);
    wa.sort_unstable();
    wb.sort_unstable();
    normalized_levenshtein(&wa.join(" "), &wb.join(" "))
}

/// Intersection over union of the word sets of both strings
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    jaccard_tokens(&words(a), &words(b))
}

/// Best edit similarity between the shorter string and any equally long
/// window of the longer one
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let ca: Vec<char> = a.chars().collect();
    let cb: Vec<char> = b.chars().collect();
    if ca.is_empty() || cb.is_empty() {
        return 0.0;
    }
    if ca.len() == cb.len() {
        return normalized_levenshtein(a, b);
    }
    let (short, long) = if ca.len() < cb.len() { (&ca, &cb) } else { (&cb, &ca) };
    let short_str: String = short.iter().collect();
    let mut best = 0.0f64;
    for window in long.windows(short.len()) {
        let window_str: String = window.iter().collect();
        let score = normalized_levenshtein(&short_str, &window_str);
        if score > best {
            best = score;
            if best >= 1.0 {
                break;
            }
        }
    }
    best
}

/// Jaccard similarity of per-word Metaphone codes.
///
/// Falls back to exact comparison when neither side yields a code (e.g. digits only).
pub fn phonetic_similarity(a: &str, b: &str) -> f64 {
    let wa = words(a);
    let wb = words(b);
    if wa.is_empty() || wb.is_empty() {
        return 0.0;
    }
    let codes = |words: &[String]| -> HashSet<String> {
        words
            .iter()
            .map(|w| metaphone(w))
            .filter(|c| !c.is_empty())
            .collect()
    };
    let codes_a = codes(&wa);
    let codes_b = codes(&wb);
    if codes_a.is_empty() && codes_b.is_empty() {
        return if wa == wb { 1.0 } else { 0.0 };
    }
    jaccard(&codes_a, &codes_b)
}

/// `min / max` of two non-negative quantities; both zero counts as identical
pub fn ratio(a: f64, b: f64) -> f64 {
    let hi = a.max(b);
    if hi <= 0.0 {
        return 1.0;
    }
    (a.min(b) / hi).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_jaccard_identical() {
        assert_abs_diff_eq!(jaccard_tokens(&toks("hello world"), &toks("hello world")), 1.0);
    }

    #[test]
    fn test_jaccard_partial() {
        assert_abs_diff_eq!(jaccard_tokens(&toks("a b c"), &toks("b c d")), 0.5);
    }

    #[test]
    fn test_empty_inputs_score_zero() {
        assert_eq!(jaccard_tokens(&[], &[]), 0.0);
        assert_eq!(jaccard_tokens(&toks("hello"), &[]), 0.0);
        assert_eq!(cosine_tokens(&[], &toks("a")), 0.0);
        assert_eq!(normalized_levenshtein("", ""), 0.0);
        assert_eq!(ngram_overlap("", "abc", 2), 0.0);
        assert_eq!(partial_ratio("abc", ""), 0.0);
        assert_eq!(phonetic_similarity("", "acme"), 0.0);
    }

    #[test]
    fn test_cosine() {
        assert_abs_diff_eq!(cosine_tokens(&toks("a b"), &toks("a b")), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cosine_tokens(&toks("a"), &toks("b")), 0.0);
        let c = cosine_tokens(&toks("a a b"), &toks("a b b"));
        assert_abs_diff_eq!(c, 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_normalized_levenshtein() {
        assert_abs_diff_eq!(normalized_levenshtein("kitten", "sitting"), 1.0 - 3.0 / 7.0);
        assert_abs_diff_eq!(normalized_levenshtein("same", "same"), 1.0);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_bigram_overlap() {
        assert_abs_diff_eq!(bigram_overlap("night", "night"), 1.0);
        // {ni, ig, gh, ht} vs {na, ac, ch, ht}
        assert_abs_diff_eq!(bigram_overlap("night", "nacht"), 0.25);
    }

    #[test]
    fn test_fuzzy_ratios() {
        assert_abs_diff_eq!(token_sort_ratio("fuzzy wuzzy", "wuzzy fuzzy"), 1.0);
        assert_abs_diff_eq!(token_set_ratio("a a b", "b a"), 1.0);
        assert_abs_diff_eq!(partial_ratio("test", "this is a test!"), 1.0);
        assert_abs_diff_eq!(
            partial_ratio("acme", "acme labs"),
            partial_ratio("acme labs", "acme")
        );
    }

    #[test]
    fn test_phonetic_similarity() {
        assert_abs_diff_eq!(phonetic_similarity("Philips Labs", "Phillips Labs"), 1.0);
        assert_abs_diff_eq!(phonetic_similarity("2024", "2024"), 1.0);
        assert!(phonetic_similarity("Acme", "Globex") < 0.5);
    }

    #[test]
    fn test_ratio() {
        assert_abs_diff_eq!(ratio(0.0, 0.0), 1.0);
        assert_abs_diff_eq!(ratio(2.0, 4.0), 0.5);
        assert_abs_diff_eq!(ratio(0.0, 4.0), 0.0);
    }
}
