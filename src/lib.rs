//! Jobdedup - duplicate detection for scraped job postings
//!
//! This crate provides:
//! - Text normalization and string similarity metrics
//! - Fuzzy company/title matching and URL canonicalization
//! - A pairwise duplicate classifier (rule-based, or a pluggable model)
//! - Bulk deduplication over an LSH index with staged pair evaluation
//!
//! # Usage
//!
//! ```ignore
//! use jobdedup::{Config, DedupEngine};
//!
//! let engine = DedupEngine::new(Config::default())?;
//! let report = engine.deduplicate(&records)?;
//! for group in report.groups.iter().filter(|g| g.is_duplicate_group()) {
//!     println!("{} <- {:?}", group.representative_id, group.member_ids);
//! }
//! ```
//!
//! Collaborator calls (distance lookup, model, sentence similarity) block on
//! an internal runtime, so engine methods must be called from a blocking
//! context, not from inside an async task.

pub mod classifier;
pub mod collaborators;
pub mod config;
pub mod dedup;
pub mod entity;
pub mod error;
pub mod scoring;
pub mod similarity;
pub mod text;
pub mod types;
pub mod urlmatch;

// Re-export main types for convenience
pub use collaborators::{DistanceLookup, ModelScorer, SentenceSimilarity};
pub use config::Config;
pub use dedup::CancellationFlag;
pub use error::{DedupError, Result};
pub use types::{
    DedupReport, DuplicateGroup, FeatureVector, JobRecord, KnownMatch, Salary, SimilarityResult,
};

use chrono::{DateTime, Utc};
use classifier::{DuplicateClassifier, FeatureExtractor};
use collaborators::BoundedInvoker;
use dedup::{embed, exact_key, DedupRun, LshIndex, PairEvaluator, PairOutcome};
use scoring::{DescriptionScorer, LocationScorer};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Options for one bulk run
#[derive(Debug, Clone, Default)]
pub struct DedupOptions {
    /// Checked between candidate pair evaluations
    pub cancel: CancellationFlag,
    /// Reference time for freshness scoring (defaults to now)
    pub now: Option<DateTime<Utc>>,
}

/// Deduplication engine: owns its configuration, alias tables, scorers and
/// collaborators. Holds no state between calls.
#[derive(Debug)]
pub struct DedupEngine {
    config: Config,
    classifier: DuplicateClassifier,
}

/// Builder attaching optional collaborators to an engine
#[derive(Default)]
pub struct DedupEngineBuilder {
    config: Config,
    model: Option<Arc<dyn ModelScorer>>,
    distance: Option<Arc<dyn DistanceLookup>>,
    sentence: Option<Arc<dyn SentenceSimilarity>>,
}

impl DedupEngineBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Trained model used when `classifier.strategy = "learned"`
    pub fn model(mut self, model: Arc<dyn ModelScorer>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn distance_lookup(mut self, lookup: Arc<dyn DistanceLookup>) -> Self {
        self.distance = Some(lookup);
        self
    }

    pub fn sentence_similarity(mut self, sentence: Arc<dyn SentenceSimilarity>) -> Self {
        self.sentence = Some(sentence);
        self
    }

    pub fn build(self) -> Result<DedupEngine> {
        let config = self.config;
        config.validate()?;

        let invoker = Arc::new(BoundedInvoker::new(Duration::from_millis(
            config.collaborators.timeout_ms,
        ))?);
        let description = match self.sentence {
            Some(s) => DescriptionScorer::with_sentence_similarity(s, Arc::clone(&invoker)),
            None => DescriptionScorer::new(),
        };
        let location = match self.distance {
            Some(d) => LocationScorer::with_distance_lookup(
                d,
                Arc::clone(&invoker),
                config.collaborators.max_distance_km,
            ),
            None => LocationScorer::string_only(),
        };
        let extractor = FeatureExtractor::with_scorers(&config, description, location);
        let classifier = DuplicateClassifier::new(&config, extractor, self.model, invoker);

        debug!("Engine ready with {} strategy", classifier.strategy_name());
        Ok(DedupEngine { config, classifier })
    }
}

impl DedupEngine {
    /// Engine with no collaborators
    pub fn new(config: Config) -> Result<Self> {
        DedupEngineBuilder::new(config).build()
    }

    pub fn builder(config: Config) -> DedupEngineBuilder {
        DedupEngineBuilder::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn classifier(&self) -> &DuplicateClassifier {
        &self.classifier
    }

    /// Pairwise duplicate check.
    ///
    /// A malformed record on either side is never a duplicate.
    pub fn classify(&self, a: &JobRecord, b: &JobRecord) -> SimilarityResult {
        if let Err(e) = a.validate().and_then(|_| b.validate()) {
            debug!("Not classifying malformed pair: {}", e);
            return SimilarityResult::not_duplicate(self.classifier.strategy_name());
        }
        self.classifier.classify(a, b)
    }

    /// Title and description content at or above the similarity threshold
    pub fn is_content_duplicate(&self, a: &JobRecord, b: &JobRecord) -> bool {
        self.classifier.extractor().is_content_duplicate(a, b)
    }

    /// Group `records` into duplicate clusters
    pub fn deduplicate(&self, records: &[JobRecord]) -> Result<DedupReport> {
        self.deduplicate_with(records, &DedupOptions::default())
    }

    pub fn deduplicate_with(
        &self,
        records: &[JobRecord],
        options: &DedupOptions,
    ) -> Result<DedupReport> {
        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Run {}: deduplicating {} records", run_id, records.len());

        let mut run = DedupRun::new(&self.classifier, &self.config.pipeline, &self.config.lsh);
        run.build_index(records)?;
        run.group(
            &options.cancel,
            self.config.pipeline.parallel,
            options.now.unwrap_or_else(Utc::now),
            run_id,
        )
    }

    /// Known records that duplicate `probe`, best match first
    pub fn find_known_duplicates(
        &self,
        probe: &JobRecord,
        known: &[JobRecord],
    ) -> Result<Vec<KnownMatch>> {
        probe.validate()?;
        let valid: Vec<usize> = (0..known.len()).filter(|&i| known[i].validate().is_ok()).collect();
        let dim = self.config.lsh.embedding_dim;
        let entities = self.classifier.extractor().entities();
        let embeddings: Vec<Vec<f64>> = valid
            .iter()
            .map(|&i| embed(&known[i], entities, dim))
            .collect();
        let exact_keys: Vec<Option<String>> = valid.iter().map(|&i| exact_key(&known[i])).collect();
        let index = LshIndex::build(&embeddings, &self.config.lsh)?.with_exact_keys(&exact_keys)?;

        let evaluator = PairEvaluator::new(&self.classifier, &self.config.pipeline);
        let probe_sketch = evaluator.sketch(probe);
        let mut matches: Vec<KnownMatch> = index
            .query(&embed(probe, entities, dim), exact_key(probe).as_deref())
            .into_iter()
            .filter_map(|pos| {
                let i = valid[pos];
                let sketch = evaluator.sketch(&known[i]);
                match evaluator.evaluate_isolated(probe, &known[i], &probe_sketch, &sketch) {
                    PairOutcome::Classified(result) if result.is_duplicate => Some(KnownMatch {
                        id: known[i].id.clone(),
                        index: i,
                        result,
                    }),
                    _ => None,
                }
            })
            .collect();
        matches.sort_by(|a, b| {
            b.result
                .score
                .total_cmp(&a.result.score)
                .then_with(|| a.index.cmp(&b.index))
        });
        Ok(matches)
    }

    /// Representative records of a report, in input order
    pub fn deduplicated<'r>(
        &self,
        records: &'r [JobRecord],
        report: &DedupReport,
    ) -> Vec<&'r JobRecord> {
        let keep: HashSet<&str> = report.representatives.iter().map(String::as_str).collect();
        records.iter().filter(|r| keep.contains(r.id.as_str())).collect()
    }
}
