//! Shared data model
//!
//! Job records are owned by the caller and never mutated by the engine.
//! Everything else here is derived output.

use crate::error::{DedupError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Salary range attached to a posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Salary {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub currency: Option<String>,
}

impl Salary {
    /// Lower and upper bound, tolerating reversed input
    pub fn bounds(&self) -> (f64, f64) {
        if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        }
    }

    /// Overlap of the two ranges as a fraction of their combined span.
    ///
    /// Returns `None` when the currencies are known and differ.
    pub fn overlap_fraction(&self, other: &Salary) -> Option<f64> {
        if let (Some(a), Some(b)) = (&self.currency, &other.currency) {
            if !a.eq_ignore_ascii_case(b) {
                return None;
            }
        }
        let (a_min, a_max) = self.bounds();
        let (b_min, b_max) = other.bounds();
        let span = a_max.max(b_max) - a_min.min(b_min);
        if span <= 0.0 {
            // Both are the same single point
            return Some(1.0);
        }
        let overlap = (a_max.min(b_max) - a_min.max(b_min)).max(0.0);
        Some((overlap / span).clamp(0.0, 1.0))
    }
}

/// A scraped job posting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub salary: Option<Salary>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub posted_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scraped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience_years: Option<f64>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub company_size: Option<String>,
}

impl JobRecord {
    /// Check the record carries enough identity to be scored pairwise
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(DedupError::MalformedInput {
                id: self.id.clone(),
                reason: "missing id".to_string(),
            });
        }
        if self.title.trim().is_empty() && self.company.trim().is_empty() {
            return Err(DedupError::MalformedInput {
                id: self.id.clone(),
                reason: "missing both title and company".to_string(),
            });
        }
        Ok(())
    }

    /// Requirements joined into one block of free text
    pub fn requirements_text(&self) -> String {
        self.requirements.join("\n")
    }

    /// Whole days between the two posting dates, if both are known
    pub fn days_between(&self, other: &JobRecord) -> Option<f64> {
        match (self.posted_date, other.posted_date) {
            (Some(a), Some(b)) => Some((a - b).num_seconds().abs() as f64 / 86_400.0),
            _ => None,
        }
    }

    /// Platforms compared case-insensitively; `None` when either is blank
    pub fn same_platform(&self, other: &JobRecord) -> Option<bool> {
        let a = self.platform.trim();
        let b = other.platform.trim();
        if a.is_empty() || b.is_empty() {
            return None;
        }
        Some(a.eq_ignore_ascii_case(b))
    }
}

/// Named numeric features for one comparison.
///
/// Ordered by name so that iteration (and therefore float summation) is stable
/// regardless of argument order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(BTreeMap<String, f64>);

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), value);
    }

    /// Insert only when a value is available
    pub fn insert_opt(&mut self, name: &str, value: Option<f64>) {
        if let Some(v) = value {
            self.insert(name, v);
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Copy every feature of `other` in under `prefix`
    pub fn extend_prefixed(&mut self, prefix: &str, other: &FeatureVector) {
        for (k, v) in other.iter() {
            self.0.insert(format!("{}{}", prefix, k), v);
        }
    }
}

/// Outcome of one pairwise comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityResult {
    pub score: f64,
    pub is_duplicate: bool,
    pub features: FeatureVector,
    pub confidence: f64,
    /// Strategy that produced the score ("rule_based" or "learned")
    pub strategy: String,
}

impl SimilarityResult {
    /// Result used when a comparison could not be completed
    pub fn not_duplicate(strategy: &str) -> Self {
        SimilarityResult {
            score: 0.0,
            is_duplicate: false,
            features: FeatureVector::new(),
            confidence: 0.0,
            strategy: strategy.to_string(),
        }
    }
}

/// Cluster of records describing the same posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    /// Member ids in input order
    pub member_ids: Vec<String>,
    pub representative_id: String,
}

impl DuplicateGroup {
    pub fn len(&self) -> usize {
        self.member_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_ids.is_empty()
    }

    pub fn is_duplicate_group(&self) -> bool {
        self.member_ids.len() > 1
    }
}

/// A record left out of pairwise scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRecord {
    pub id: String,
    pub index: usize,
    pub reason: String,
}

/// A known record matching a probe
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownMatch {
    pub id: String,
    /// Position in the known-record slice
    pub index: usize,
    pub result: SimilarityResult,
}

/// Counters collected while running the staged pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStats {
    pub candidate_pairs: usize,
    pub quick_rejected: usize,
    pub stage1_aborted: usize,
    pub stage2_aborted: usize,
    pub classified: usize,
    pub duplicates_accepted: usize,
    pub pair_failures: usize,
    pub cancelled_pairs: usize,
}

/// Result of a deduplication run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupReport {
    pub run_id: String,
    pub total_records: usize,
    /// Number of groups with more than one member
    pub duplicate_groups: usize,
    /// Number of groups, i.e. records left after deduplication
    pub unique_record_count: usize,
    /// Every group, singletons included, ordered by first member
    pub groups: Vec<DuplicateGroup>,
    /// Representative ids in input order
    pub representatives: Vec<String>,
    pub skipped: Vec<SkippedRecord>,
    /// True when the run was cancelled before every candidate pair was evaluated
    pub partial: bool,
    pub stats: PipelineStats,
}
