//! Suffix-stripping stemmer and closed stopword list

/// Minimum characters that must remain after a suffix is removed
const MIN_STEM_LEN: usize = 3;

/// Inflectional suffixes, first match wins
const STEP1_RULES: &[(&str, &str)] = &[
    ("sses", "ss"),
    ("ies", "y"),
    ("ings", ""),
    ("ing", ""),
    ("edly", ""),
    ("ed", ""),
    ("ly", ""),
    ("s", ""),
];

/// Derivational suffixes, first match wins
const STEP2_RULES: &[(&str, &str)] = &[
    ("ational", "ate"),
    ("tional", "tion"),
    ("ization", "ize"),
    ("isation", "ize"),
    ("iveness", "ive"),
    ("fulness", "ful"),
    ("ousness", "ous"),
    ("ment", ""),
    ("ness", ""),
];

const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be",
    "been", "being", "but", "by", "can", "could", "do", "does", "each", "etc", "for", "from",
    "has", "have", "he", "her", "his", "how", "i", "if", "in", "into", "is", "it", "its", "may",
    "more", "most", "must", "no", "not", "of", "on", "or", "other", "our", "out", "over", "own",
    "per", "she", "should", "so", "some", "such", "than", "that", "the", "their", "them", "then",
    "there", "these", "they", "this", "those", "through", "to", "too", "up", "us", "very", "was",
    "we", "were", "what", "when", "where", "which", "while", "who", "will", "with", "within",
    "would", "you", "your",
];

/// Whether a lowercase token is in the stopword list
pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.binary_search(&token).is_ok()
}

/// Drop stopwords, keeping order
pub fn remove_stopwords(tokens: Vec<String>) -> Vec<String> {
    tokens.into_iter().filter(|t| !is_stopword(t)).collect()
}

fn apply_rules(word: &str, rules: &[(&str, &str)]) -> Option<String> {
    for (suffix, replacement) in rules {
        if let Some(base) = word.strip_suffix(suffix) {
            if base.chars().count() < MIN_STEM_LEN {
                return None;
            }
            if *suffix == "s" && (base.ends_with('s') || base.ends_with('u') || base.ends_with('i'))
            {
                return None;
            }
            return Some(format!("{}{}", base, replacement));
        }
    }
    None
}

/// Porter-style stemmer over a fixed rule table.
///
/// Words that are not plain ASCII letters (numbers, CJK bigrams, `c++`) are
/// returned unchanged.
pub fn stem(word: &str) -> String {
    if word.chars().count() <= MIN_STEM_LEN || !word.chars().all(|c| c.is_ascii_lowercase()) {
        return word.to_string();
    }
    let mut w = word.to_string();
    if let Some(s) = apply_rules(&w, STEP1_RULES) {
        w = s;
    }
    if let Some(s) = apply_rules(&w, STEP2_RULES) {
        w = s;
    }
    if w.chars().count() > MIN_STEM_LEN + 1 && w.ends_with('e') {
        w.pop();
    }
    w
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopwords_sorted() {
        let mut sorted = STOPWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOPWORDS);
    }

    #[test]
    fn test_stemming() {
        assert_eq!(stem("engineers"), "engineer");
        assert_eq!(stem("engineering"), "engineer");
        assert_eq!(stem("requirements"), "requir");
        assert_eq!(stem("required"), "requir");
        assert_eq!(stem("services"), "servic");
        assert_eq!(stem("classes"), "class");
        assert_eq!(stem("status"), "status");
        assert_eq!(stem("api"), "api");
        assert_eq!(stem("c++"), "c++");
    }

    #[test]
    fn test_remove_stopwords() {
        let tokens = vec!["the".to_string(), "rust".to_string(), "and".to_string()];
        assert_eq!(remove_stopwords(tokens), vec!["rust"]);
    }
}
