//! Company and job-title entity matching
//!
//! Companies: normalize → exact → alias table → weighted phonetic/edit/token blend.
//! Titles: normalize → role family → synonym table → generic fuzzy, best of the three,
//! halved when both titles name a different seniority level.
//!
//! Alias tables live on the [`EntityMatcher`] instance so each engine carries
//! its own copy, extended from configuration.

pub mod fuzzy_logic;

pub use fuzzy_logic::{combine_entity_scores, gaussian_membership};

use crate::similarity::{
    jaccard, metaphone_match, normalized_levenshtein, partial_ratio, soundex_match,
    token_set_ratio, token_sort_ratio,
};
use crate::text::{normalize_company, normalize_title};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Score for two names that resolve to the same canonical alias
pub const ALIAS_MATCH_SCORE: f64 = 0.95;

/// Built-in company aliases (alias → canonical), already normalized
const DEFAULT_COMPANY_ALIASES: &[(&str, &str)] = &[
    ("alphabet", "google"),
    ("facebook", "meta"),
    ("meta platforms", "meta"),
    ("aws", "amazon"),
    ("amazon web services", "amazon"),
    ("amazon com", "amazon"),
    ("ibm", "international business machines"),
    ("msft", "microsoft"),
    ("hp", "hewlett packard"),
    ("hewlett packard enterprise", "hpe"),
    ("pwc", "pricewaterhousecoopers"),
    ("ey", "ernst and young"),
    ("jp morgan", "jpmorgan chase"),
    ("jpmorgan", "jpmorgan chase"),
    ("jp morgan chase", "jpmorgan chase"),
    ("bofa", "bank of america"),
    ("ge", "general electric"),
    ("gm", "general motors"),
    ("p and g", "procter and gamble"),
    ("twitter", "x"),
];

/// Company blend weights: soundex, metaphone, edit, token sort, token set, partial
const COMPANY_WEIGHTS: [f64; 6] = [0.15, 0.15, 0.25, 0.15, 0.15, 0.15];

/// Canonical role families and the head nouns that select them
const ROLE_FAMILIES: &[(&str, &[&str])] = &[
    ("engineering", &["engineer", "developer", "programmer", "coder"]),
    ("data", &["scientist", "analyst", "statistician"]),
    ("design", &["designer", "ux", "ui"]),
    ("management", &["manager", "director", "head", "vp"]),
    ("qa", &["tester", "qa", "sdet"]),
    ("operations", &["administrator", "admin", "sre", "devops", "technician", "operator"]),
    ("sales", &["representative", "rep", "executive", "salesperson"]),
    ("support", &["specialist", "support", "agent"]),
    ("consulting", &["consultant", "advisor", "architect"]),
];

/// Seniority words and the level each one names
const SENIORITY_RANKS: &[(&str, u8)] = &[
    ("intern", 0),
    ("junior", 1),
    ("i", 1),
    ("mid", 2),
    ("ii", 2),
    ("senior", 3),
    ("iii", 3),
    ("iv", 4),
];

/// Title words that describe the arrangement rather than the role
const TITLE_FILLER_WORDS: &[&str] = &[
    "remote",
    "hybrid",
    "onsite",
    "wfh",
    "fulltime",
    "parttime",
    "full",
    "part",
    "time",
    "contract",
    "contractor",
    "temporary",
    "permanent",
];

/// Multiplier applied to a title score when the two titles name different levels
pub const SENIORITY_CONFLICT_FACTOR: f64 = 0.5;

/// Share of the role score kept when two titles sit in one family but name
/// different head nouns (scientist vs analyst)
const SIBLING_ROLE_FACTOR: f64 = 0.6;

/// Title word synonyms (word → canonical word)
const TITLE_SYNONYMS: &[(&str, &str)] = &[
    ("developer", "engineer"),
    ("programmer", "engineer"),
    ("coder", "engineer"),
    ("admin", "administrator"),
    ("sysadmin", "administrator"),
    ("js", "javascript"),
    ("ml", "machine-learning"),
    ("ai", "machine-learning"),
    ("sre", "devops"),
    ("tester", "qa"),
    ("sdet", "qa"),
    ("frontend", "front-end"),
    ("backend", "back-end"),
    ("fullstack", "full-stack"),
    ("ux", "design"),
    ("ui", "design"),
];

/// Fuzzy matcher for company names and job titles
#[derive(Debug, Clone)]
pub struct EntityMatcher {
    aliases: HashMap<String, String>,
    fuzzy_match_threshold: f64,
}

impl Default for EntityMatcher {
    fn default() -> Self {
        Self::new(&BTreeMap::new(), 0.8)
    }
}

impl EntityMatcher {
    /// Build a matcher from the built-in alias table plus `extra_aliases`
    pub fn new(extra_aliases: &BTreeMap<String, String>, fuzzy_match_threshold: f64) -> Self {
        let mut aliases: HashMap<String, String> = DEFAULT_COMPANY_ALIASES
            .iter()
            .map(|(a, c)| (a.to_string(), c.to_string()))
            .collect();
        for (alias, canonical) in extra_aliases {
            let alias = normalize_company(alias);
            let canonical = normalize_company(canonical);
            if !alias.is_empty() && !canonical.is_empty() {
                aliases.insert(alias, canonical);
            }
        }
        EntityMatcher {
            aliases,
            fuzzy_match_threshold,
        }
    }

    /// Resolve a normalized company name through the alias table
    pub fn canonical_company<'a>(&'a self, normalized: &'a str) -> &'a str {
        self.aliases
            .get(normalized)
            .map(String::as_str)
            .unwrap_or(normalized)
    }

    /// Fuzzy company similarity in [0, 1]
    pub fn company_match(&self, a: &str, b: &str) -> f64 {
        let na = normalize_company(a);
        let nb = normalize_company(b);
        if na.is_empty() || nb.is_empty() {
            return 0.0;
        }
        if na == nb {
            return 1.0;
        }
        if self.canonical_company(&na) == self.canonical_company(&nb) {
            return ALIAS_MATCH_SCORE;
        }

        let signals = [
            if soundex_match(&na, &nb) { 1.0 } else { 0.0 },
            if metaphone_match(&na, &nb) { 1.0 } else { 0.0 },
            normalized_levenshtein(&na, &nb),
            token_sort_ratio(&na, &nb),
            token_set_ratio(&na, &nb),
            partial_ratio(&na, &nb),
        ];
        signals
            .iter()
            .zip(COMPANY_WEIGHTS.iter())
            .map(|(s, w)| s * w)
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }

    pub fn fuzzy_match_threshold(&self) -> f64 {
        self.fuzzy_match_threshold
    }

    /// Whether two company names clear the fuzzy match threshold
    pub fn is_same_company(&self, a: &str, b: &str) -> bool {
        self.company_match(a, b) >= self.fuzzy_match_threshold
    }

    /// Fuzzy title similarity in [0, 1]
    pub fn title_match(&self, a: &str, b: &str) -> f64 {
        let na = normalize_title(a);
        let nb = normalize_title(b);
        if na.is_empty() || nb.is_empty() {
            return 0.0;
        }
        if na == nb {
            return 1.0;
        }
        let hierarchy = role_hierarchy_score(&na, &nb);
        let synonym = synonym_score(&na, &nb);
        let generic = (normalized_levenshtein(&na, &nb)
            + token_sort_ratio(&na, &nb)
            + token_set_ratio(&na, &nb))
            / 3.0;
        let best = hierarchy.max(synonym).max(generic);
        if levels_conflict(&na, &nb) {
            best * SENIORITY_CONFLICT_FACTOR
        } else {
            best
        }
    }

    /// Whether both titles state a seniority level and the levels differ
    pub fn seniority_conflict(&self, a: &str, b: &str) -> bool {
        levels_conflict(&normalize_title(a), &normalize_title(b))
    }

    /// Whether two titles name the same role: same head noun after synonym
    /// folding, same domain words, and no seniority conflict
    pub fn same_role(&self, a: &str, b: &str) -> bool {
        let na = normalize_title(a);
        let nb = normalize_title(b);
        if na.is_empty() || nb.is_empty() {
            return false;
        }
        !levels_conflict(&na, &nb)
            && head_noun(&na) == head_noun(&nb)
            && domain_words(&na) == domain_words(&nb)
    }

    /// Order-independent role tokens of a title: `r:<head>` plus one `t:<word>`
    /// per domain word, with seniority and arrangement words removed
    pub fn title_key(&self, title: &str) -> Vec<String> {
        let normalized = normalize_title(title);
        let mut key: Vec<String> = domain_words(&normalized)
            .into_iter()
            .map(|w| format!("t:{w}"))
            .collect();
        key.sort();
        if let Some(head) = head_noun(&normalized) {
            key.push(format!("r:{head}"));
        }
        key
    }

    /// Normalized company name resolved through the alias table
    pub fn company_key(&self, company: &str) -> String {
        let normalized = normalize_company(company);
        self.canonical_company(&normalized).to_string()
    }
}

/// Role family of a normalized title, taken from its last head noun
fn role_family(normalized: &str) -> Option<&'static str> {
    normalized.split_whitespace().rev().find_map(|word| {
        ROLE_FAMILIES
            .iter()
            .find(|(_, nouns)| nouns.contains(&word))
            .map(|(family, _)| *family)
    })
}

fn is_role_noun(word: &str) -> bool {
    ROLE_FAMILIES.iter().any(|(_, nouns)| nouns.contains(&word))
}

fn seniority_rank(normalized: &str) -> Option<u8> {
    normalized.split_whitespace().find_map(|word| {
        SENIORITY_RANKS
            .iter()
            .find(|(w, _)| *w == word)
            .map(|(_, rank)| *rank)
    })
}

fn levels_conflict(a: &str, b: &str) -> bool {
    matches!((seniority_rank(a), seniority_rank(b)), (Some(ra), Some(rb)) if ra != rb)
}

fn is_qualifier(word: &str) -> bool {
    SENIORITY_RANKS.iter().any(|(w, _)| *w == word) || TITLE_FILLER_WORDS.contains(&word)
}

fn canonical_word(word: &str) -> String {
    TITLE_SYNONYMS
        .iter()
        .find(|(from, _)| *from == word)
        .map(|(_, to)| to.to_string())
        .unwrap_or_else(|| word.to_string())
}

/// Last role noun of a normalized title, synonym-folded
fn head_noun(normalized: &str) -> Option<String> {
    normalized
        .split_whitespace()
        .rev()
        .find(|w| is_role_noun(w))
        .map(canonical_word)
}

/// Synonym-folded title words that are neither role nouns nor qualifiers
fn domain_words(normalized: &str) -> HashSet<String> {
    normalized
        .split_whitespace()
        .filter(|w| !is_role_noun(w) && !is_qualifier(w))
        .map(canonical_word)
        .collect()
}

/// Same-family titles score by shared domain words, discounted when the head
/// nouns differ
fn role_hierarchy_score(a: &str, b: &str) -> f64 {
    match (role_family(a), role_family(b)) {
        (Some(fa), Some(fb)) if fa == fb => {
            let da = domain_words(a);
            let db = domain_words(b);
            let overlap = if da.is_empty() && db.is_empty() {
                1.0
            } else {
                jaccard(&da, &db)
            };
            let head = if head_noun(a) == head_noun(b) {
                1.0
            } else {
                SIBLING_ROLE_FACTOR
            };
            overlap * head
        }
        _ => 0.0,
    }
}

/// Jaccard of title words after synonym folding
fn synonym_score(a: &str, b: &str) -> f64 {
    let ca = canonical_words(a);
    let cb = canonical_words(b);
    jaccard(&ca, &cb)
}

fn canonical_words(normalized: &str) -> HashSet<String> {
    normalized.split_whitespace().map(canonical_word).collect()
}
