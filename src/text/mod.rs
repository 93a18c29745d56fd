//! Text normalization for job postings
//!
//! Pure functions only: tokenization (Latin words + CJK character bigrams),
//! stemming, stopword removal, n-grams, keyword ranking, and canonical
//! forms for job titles and company names.

pub mod stem;

pub use stem::{is_stopword, remove_stopwords, stem};

use std::collections::BTreeMap;

/// Stand-in IDF weight for keyword ranking.
///
/// There is no document corpus to calibrate against, so every term gets the
/// same weight and ranking reduces to term frequency. This is an approximation.
pub const HEURISTIC_IDF: f64 = 1.5;

/// Title tokens rewritten to a canonical form
const TITLE_REWRITES: &[(&str, &[&str])] = &[
    ("sr", &["senior"]),
    ("snr", &["senior"]),
    ("lead", &["senior"]),
    ("principal", &["senior"]),
    ("staff", &["senior"]),
    ("jr", &["junior"]),
    ("jnr", &["junior"]),
    ("associate", &["junior"]),
    ("eng", &["engineer"]),
    ("engr", &["engineer"]),
    ("dev", &["developer"]),
    ("mgr", &["manager"]),
    ("swe", &["software", "engineer"]),
    ("sde", &["software", "engineer"]),
];

/// Legal-entity suffixes stripped from the end of company names
const LEGAL_SUFFIXES: &[&str] = &[
    "ag",
    "co",
    "company",
    "corp",
    "corporation",
    "gmbh",
    "inc",
    "incorporated",
    "limited",
    "llc",
    "llp",
    "ltd",
    "plc",
    "sa",
];

/// Check if a character is in CJK Unicode ranges
fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'   // CJK Unified Ideographs
        | '\u{3400}'..='\u{4DBF}' // CJK Unified Ideographs Extension A
        | '\u{3040}'..='\u{309F}' // Hiragana
        | '\u{30A0}'..='\u{30FF}' // Katakana
        | '\u{AC00}'..='\u{D7AF}' // Hangul Syllables
        | '\u{F900}'..='\u{FAFF}' // CJK Compatibility Ideographs
    )
}

/// Hybrid tokenizer: Latin words + CJK character bigrams
///
/// - Latin/alphanumeric: lowercase word tokens of at least 2 chars
/// - CJK characters: sliding window of 2 characters (bigrams)
///
/// Example: "Rust工程师 - 東京" → ["rust", "工程", "程师", "東京"]
pub fn tokenize(text: &str) -> Vec<String> {
    let text = text.to_lowercase();
    let mut tokens = Vec::new();
    let mut word_buf = String::new();
    let mut cjk_chars: Vec<char> = Vec::new();

    let flush_word = |buf: &mut String, tokens: &mut Vec<String>| {
        if buf.chars().count() >= 2 {
            tokens.push(buf.clone());
        }
        buf.clear();
    };

    let flush_cjk = |chars: &mut Vec<char>, tokens: &mut Vec<String>| {
        if chars.len() == 1 {
            tokens.push(chars[0].to_string());
        } else {
            for window in chars.windows(2) {
                tokens.push(window.iter().collect());
            }
        }
        chars.clear();
    };

    for c in text.chars() {
        if is_cjk(c) {
            flush_word(&mut word_buf, &mut tokens);
            cjk_chars.push(c);
        } else if c.is_alphanumeric() {
            if !cjk_chars.is_empty() {
                flush_cjk(&mut cjk_chars, &mut tokens);
            }
            word_buf.push(c);
        } else {
            flush_word(&mut word_buf, &mut tokens);
            if !cjk_chars.is_empty() {
                flush_cjk(&mut cjk_chars, &mut tokens);
            }
        }
    }

    flush_word(&mut word_buf, &mut tokens);
    if !cjk_chars.is_empty() {
        flush_cjk(&mut cjk_chars, &mut tokens);
    }

    tokens
}

/// Full pipeline: tokenize, drop stopwords, stem
pub fn analyze(text: &str) -> Vec<String> {
    remove_stopwords(tokenize(text))
        .iter()
        .map(|t| stem(t))
        .collect()
}

/// Lowercase and split on anything that is not alphanumeric (or `+`/`#`)
fn clean_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace('&', " and ")
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '+' || c == '#' {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Canonical job title: lowercase, no punctuation, single spaces, and
/// seniority synonyms folded ("sr"/"lead"/"principal"/"staff" → "senior",
/// "jr"/"associate"/"entry level" → "junior").
///
/// Idempotent: `normalize_title(&normalize_title(x)) == normalize_title(x)`.
pub fn normalize_title(title: &str) -> String {
    let words = clean_words(title);
    let mut out: Vec<&str> = Vec::with_capacity(words.len());
    let mut i = 0;
    while i < words.len() {
        let word = words[i].as_str();
        if word == "entry" && words.get(i + 1).map(String::as_str) == Some("level") {
            out.push("junior");
            i += 2;
            continue;
        }
        match TITLE_REWRITES.iter().find(|(from, _)| *from == word) {
            Some((_, to)) => out.extend(to.iter().copied()),
            None => out.push(word),
        }
        i += 1;
    }
    out.dedup();
    out.join(" ")
}

/// Canonical company name: lowercase, no punctuation, trailing legal suffixes
/// (inc, corp, ltd, llc, co, company, ...) removed.
pub fn normalize_company(name: &str) -> String {
    let mut words = clean_words(name);
    while words.len() > 1 {
        match words.last() {
            Some(last) if LEGAL_SUFFIXES.contains(&last.as_str()) => {
                words.pop();
            }
            _ => break,
        }
    }
    words.join(" ")
}

/// Character n-grams over lowercase text with whitespace collapsed.
///
/// Text shorter than `n` yields itself as the only gram.
pub fn ngrams(text: &str, n: usize) -> Vec<String> {
    let collapsed = text
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let chars: Vec<char> = collapsed.chars().collect();
    if chars.is_empty() || n == 0 {
        return Vec::new();
    }
    if chars.len() < n {
        return vec![collapsed];
    }
    chars.windows(n).map(|w| w.iter().collect()).collect()
}

/// Word n-grams joined with a single space
pub fn word_ngrams(tokens: &[String], n: usize) -> Vec<String> {
    if n == 0 || tokens.len() < n {
        return Vec::new();
    }
    tokens.windows(n).map(|w| w.join(" ")).collect()
}

/// Raw term counts
pub fn term_frequencies(tokens: &[String]) -> BTreeMap<String, f64> {
    let mut tf = BTreeMap::new();
    for t in tokens {
        *tf.entry(t.clone()).or_insert(0.0) += 1.0;
    }
    tf
}

/// Top keywords by term frequency weighted with [`HEURISTIC_IDF`].
///
/// Ties are broken alphabetically so the output is deterministic.
pub fn extract_keywords(text: &str, top_n: usize) -> Vec<String> {
    let tokens: Vec<String> = analyze(text)
        .into_iter()
        .filter(|t| t.chars().count() >= 3 && !t.chars().all(|c| c.is_ascii_digit()))
        .collect();
    if tokens.is_empty() {
        return Vec::new();
    }
    let total = tokens.len() as f64;
    let mut weighted: Vec<(String, f64)> = term_frequencies(&tokens)
        .into_iter()
        .map(|(term, count)| (term, count / total * HEURISTIC_IDF))
        .collect();
    weighted.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    weighted.into_iter().take(top_n).map(|(t, _)| t).collect()
}

/// Split free text into trimmed sentences
pub fn split_sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?', '\n', ';'])
        .map(str::trim)
        .filter(|s| s.chars().any(char::is_alphanumeric))
        .map(str::to_string)
        .collect()
}

/// Split free text into paragraphs separated by blank lines
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.trim().is_empty() {
                paragraphs.push(current.trim().to_string());
            }
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    if !current.trim().is_empty() {
        paragraphs.push(current.trim().to_string());
    }
    paragraphs
}
