//! Configuration management for the deduplication engine
//!
//! Loads settings from TOML file at ~/.jobdedup/config.toml. Every field has a
//! default, so a partial file (or no file) is valid.

use crate::error::{DedupError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Decision thresholds
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Title scorer blend weights
    #[serde(default)]
    pub title_weights: TitleWeights,

    /// Description feature blend weights
    #[serde(default)]
    pub description_weights: DescriptionWeights,

    /// Classifier strategy and rule weights
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Gaussian membership functions for the company/title fuzzy combiner
    #[serde(default)]
    pub fuzzy: FuzzyConfig,

    /// LSH index parameters
    #[serde(default)]
    pub lsh: LshConfig,

    /// Staged pipeline and quick-reject parameters
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// External collaborator limits
    #[serde(default)]
    pub collaborators: CollaboratorConfig,

    /// Extra company aliases (alias → canonical name)
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

/// Decision thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    /// Content-only (title + description) duplicate threshold
    #[serde(default = "default_similarity_threshold")]
    pub similarity: f64,

    /// Company name fuzzy match threshold
    #[serde(default = "default_fuzzy_match_threshold")]
    pub fuzzy_match: f64,

    /// URL similarity threshold for "same posting"
    #[serde(default = "default_url_similarity_threshold")]
    pub url_similarity: f64,

    /// Probability above which a pair is a duplicate
    #[serde(default = "default_ml_confidence_threshold")]
    pub ml_confidence: f64,
}

fn default_similarity_threshold() -> f64 {
    0.85
}

fn default_fuzzy_match_threshold() -> f64 {
    0.8
}

fn default_url_similarity_threshold() -> f64 {
    0.9
}

fn default_ml_confidence_threshold() -> f64 {
    0.75
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            similarity: default_similarity_threshold(),
            fuzzy_match: default_fuzzy_match_threshold(),
            url_similarity: default_url_similarity_threshold(),
            ml_confidence: default_ml_confidence_threshold(),
        }
    }
}

/// Title scorer blend weights
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleWeights {
    pub exact: f64,
    pub jaccard: f64,
    pub cosine: f64,
    pub levenshtein: f64,
    pub bigram: f64,
    pub phonetic: f64,
}

impl Default for TitleWeights {
    fn default() -> Self {
        TitleWeights {
            exact: 0.30,
            jaccard: 0.20,
            cosine: 0.20,
            levenshtein: 0.10,
            bigram: 0.10,
            phonetic: 0.10,
        }
    }
}

impl TitleWeights {
    fn all(&self) -> [f64; 6] {
        [
            self.exact,
            self.jaccard,
            self.cosine,
            self.levenshtein,
            self.bigram,
            self.phonetic,
        ]
    }
}

/// Weights used to collapse description features into one similarity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptionWeights {
    pub tfidf: f64,
    pub keywords: f64,
    pub structure: f64,
    /// Only applied when a sentence similarity implementation is plugged in
    pub sentence: f64,
}

impl Default for DescriptionWeights {
    fn default() -> Self {
        DescriptionWeights {
            tfidf: 0.5,
            keywords: 0.3,
            structure: 0.2,
            sentence: 0.2,
        }
    }
}

/// Which classification strategy to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    RuleBased,
    Learned,
}

/// Classifier configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// "rule_based" (default) or "learned"
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Rule-based strategy weights
    #[serde(default)]
    pub weights: RuleWeights,
}

/// Rule-based weighted-sum weights
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleWeights {
    pub title: f64,
    pub company_exact: f64,
    pub company_fuzzy: f64,
    pub url_similarity: f64,
    pub location_match: f64,
    pub description_similarity: f64,
    pub time_delta: f64,
    /// Days after which the time signal contributes nothing
    pub time_window_days: f64,
}

impl Default for RuleWeights {
    fn default() -> Self {
        RuleWeights {
            title: 0.25,
            company_exact: 0.20,
            company_fuzzy: 0.15,
            url_similarity: 0.15,
            location_match: 0.10,
            description_similarity: 0.10,
            time_delta: 0.05,
            time_window_days: 30.0,
        }
    }
}

impl RuleWeights {
    fn all(&self) -> [f64; 7] {
        [
            self.title,
            self.company_exact,
            self.company_fuzzy,
            self.url_similarity,
            self.location_match,
            self.description_similarity,
            self.time_delta,
        ]
    }
}

/// Gaussian membership function parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Membership {
    pub center: f64,
    pub sigma: f64,
}

/// Fuzzy combiner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzyConfig {
    pub company: Membership,
    pub title: Membership,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        FuzzyConfig {
            company: Membership {
                center: 0.8,
                sigma: 0.1,
            },
            title: Membership {
                center: 0.7,
                sigma: 0.15,
            },
        }
    }
}

/// LSH index parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LshConfig {
    /// Number of independent hash tables
    pub num_tables: usize,
    /// Hyperplanes (bits) per table, at most 128
    pub hash_bits: usize,
    /// Length of the per-record embedding
    pub embedding_dim: usize,
    /// Seed for hyperplane generation
    pub seed: u64,
    /// Upper bound on projection floats allocated for one index
    pub max_projection_floats: usize,
}

impl Default for LshConfig {
    fn default() -> Self {
        LshConfig {
            num_tables: 20,
            hash_bits: 128,
            embedding_dim: 64,
            seed: 42,
            max_projection_floats: 50_000_000,
        }
    }
}

/// Staged pipeline parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Stage 1 (lexical) score below which a pair is dropped
    pub stage1_min: f64,
    /// Stage 2 (combined) score below which a pair is dropped
    pub stage2_min: f64,
    /// Cross-platform postings further apart than this are rejected
    pub quick_reject_days: f64,
    /// Salary overlap fraction below which a pair is rejected
    pub min_salary_overlap: f64,
    /// Seniority level difference above which a pair is rejected
    pub max_level_delta: u8,
    /// Evaluate candidate pairs on the rayon pool
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            stage1_min: 0.3,
            stage2_min: 0.6,
            quick_reject_days: 7.0,
            min_salary_overlap: 0.1,
            max_level_delta: 2,
            parallel: true,
        }
    }
}

/// External collaborator limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorConfig {
    /// Time bound for one geocoder or model call
    pub timeout_ms: u64,
    /// Distance at which two locations stop counting as close
    pub max_distance_km: f64,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        CollaboratorConfig {
            timeout_ms: 500,
            max_distance_km: 50.0,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = expand_path(path.as_ref());

        if !expanded_path.exists() {
            return Err(DedupError::Config(format!(
                "Configuration file not found: {}",
                expanded_path.display()
            )));
        }

        let content = std::fs::read_to_string(&expanded_path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from file or use defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|p| p.join(".jobdedup").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".jobdedup/config.toml"))
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DedupError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Some(seed) = env_parse("JOBDEDUP_SEED") {
            self.lsh.seed = seed;
        }
        if let Some(tables) = env_parse("JOBDEDUP_NUM_TABLES") {
            self.lsh.num_tables = tables;
        }
        if let Some(bits) = env_parse("JOBDEDUP_HASH_BITS") {
            self.lsh.hash_bits = bits;
        }
        if let Some(ms) = env_parse("JOBDEDUP_COLLABORATOR_TIMEOUT_MS") {
            self.collaborators.timeout_ms = ms;
        }
    }

    /// Check weights, thresholds and index sizes are usable
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f64| -> Result<()> {
            if !(0.0..=1.0).contains(&v) {
                return Err(DedupError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, v
                )));
            }
            Ok(())
        };
        unit("thresholds.similarity", self.thresholds.similarity)?;
        unit("thresholds.fuzzy_match", self.thresholds.fuzzy_match)?;
        unit("thresholds.url_similarity", self.thresholds.url_similarity)?;
        unit("thresholds.ml_confidence", self.thresholds.ml_confidence)?;
        unit("pipeline.stage1_min", self.pipeline.stage1_min)?;
        unit("pipeline.stage2_min", self.pipeline.stage2_min)?;
        unit("pipeline.min_salary_overlap", self.pipeline.min_salary_overlap)?;

        let weights = self
            .title_weights
            .all()
            .into_iter()
            .chain(self.classifier.weights.all())
            .chain([
                self.description_weights.tfidf,
                self.description_weights.keywords,
                self.description_weights.structure,
                self.description_weights.sentence,
            ]);
        for w in weights {
            if !w.is_finite() || w < 0.0 {
                return Err(DedupError::Config(format!(
                    "weights must be finite and non-negative, got {}",
                    w
                )));
            }
        }
        if self.title_weights.all().iter().sum::<f64>() <= 0.0 {
            return Err(DedupError::Config("title weights sum to zero".to_string()));
        }
        if self.classifier.weights.time_window_days <= 0.0 {
            return Err(DedupError::Config(
                "classifier.weights.time_window_days must be positive".to_string(),
            ));
        }
        let memberships = [
            ("fuzzy.company", self.fuzzy.company),
            ("fuzzy.title", self.fuzzy.title),
        ];
        for (name, m) in memberships {
            if m.sigma.is_nan() || m.sigma <= 0.0 {
                return Err(DedupError::Config(format!("{}.sigma must be positive", name)));
            }
        }
        if self.lsh.num_tables == 0 || self.lsh.embedding_dim == 0 {
            return Err(DedupError::Config(
                "lsh.num_tables and lsh.embedding_dim must be >= 1".to_string(),
            ));
        }
        if !(1..=128).contains(&self.lsh.hash_bits) {
            return Err(DedupError::Config(format!(
                "lsh.hash_bits must be within [1, 128], got {}",
                self.lsh.hash_bits
            )));
        }
        if self.collaborators.timeout_ms == 0 {
            return Err(DedupError::Config(
                "collaborators.timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a default configuration file at the given path
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let content = r#"# Jobdedup Configuration

[thresholds]
# Content-only (title + description) comparisons
similarity = 0.85
# Company name fuzzy matching
fuzzy_match = 0.8
# URLs counted as the same posting
url_similarity = 0.9
# Classifier probability above which a pair is a duplicate
ml_confidence = 0.75

[title_weights]
exact = 0.30
jaccard = 0.20
cosine = 0.20
levenshtein = 0.10
bigram = 0.10
phonetic = 0.10

[description_weights]
tfidf = 0.5
keywords = 0.3
structure = 0.2
# Only used when a sentence similarity implementation is supplied
sentence = 0.2

[classifier]
# "rule_based" or "learned" (learned needs a model supplied by the host)
strategy = "rule_based"

[classifier.weights]
title = 0.25
company_exact = 0.20
company_fuzzy = 0.15
url_similarity = 0.15
location_match = 0.10
description_similarity = 0.10
time_delta = 0.05
time_window_days = 30.0

[fuzzy.company]
center = 0.8
sigma = 0.1

[fuzzy.title]
center = 0.7
sigma = 0.15

[lsh]
num_tables = 20
hash_bits = 128
embedding_dim = 64
seed = 42
max_projection_floats = 50000000

[pipeline]
stage1_min = 0.3
stage2_min = 0.6
quick_reject_days = 7.0
min_salary_overlap = 0.1
max_level_delta = 2
parallel = true

[collaborators]
# Bound for each geocoder / model call
timeout_ms = 500
max_distance_km = 50.0

# Extra company aliases, alias = canonical
[aliases]
# "the facebook" = "meta"
"#;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Expand ~ to home directory in paths
pub fn expand_path(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.lsh.num_tables, 20);
        assert_eq!(config.lsh.hash_bits, 128);
        assert_eq!(config.thresholds.ml_confidence, 0.75);
        assert_eq!(config.classifier.strategy, StrategyKind::RuleBased);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[thresholds]
ml_confidence = 0.6

[classifier]
strategy = "learned"

[lsh]
num_tables = 4

[aliases]
"the facebook" = "meta"
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.thresholds.ml_confidence, 0.6);
        assert_eq!(config.thresholds.similarity, 0.85);
        assert_eq!(config.classifier.strategy, StrategyKind::Learned);
        assert_eq!(config.classifier.weights.title, 0.25);
        assert_eq!(config.lsh.num_tables, 4);
        assert_eq!(config.lsh.hash_bits, 128);
        assert_eq!(config.aliases.get("the facebook").map(String::as_str), Some("meta"));
    }

    #[test]
    fn test_default_template_matches_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        Config::create_default(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        let defaults = Config::default();
        assert_eq!(loaded.title_weights.exact, defaults.title_weights.exact);
        assert_eq!(loaded.lsh.seed, defaults.lsh.seed);
        assert_eq!(loaded.pipeline.max_level_delta, defaults.pipeline.max_level_delta);
        assert!(loaded.aliases.is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.lsh.seed = 7;
        config.aliases.insert("fb".into(), "meta".into());
        config.save_to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.lsh.seed, 7);
        assert_eq!(loaded.aliases.len(), 1);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.lsh.hash_bits = 129;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.thresholds.ml_confidence = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.classifier.weights.title = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, DedupError::Config(_)));
        assert_eq!(Config::load_or_default("/definitely/not/here.toml").lsh.num_tables, 20);
    }
}
