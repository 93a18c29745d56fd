//! Staged candidate evaluation and grouping
//!
//! A [`DedupRun`] moves through `Empty → Indexed → Grouped` exactly once.
//! Candidate pairs are evaluated on the rayon pool; results are applied to
//! the union-find structure by the run alone, in pair order.

use super::lsh::{embed, exact_key, LshIndex};
use super::representative::select_representative;
use super::union_find::UnionFind;
use super::CancellationFlag;
use crate::classifier::DuplicateClassifier;
use crate::config::{LshConfig, PipelineConfig};
use crate::error::{DedupError, Result};
use crate::similarity::jaccard_tokens;
use crate::text::{analyze, normalize_company, normalize_title};
use crate::types::{
    DedupReport, DuplicateGroup, JobRecord, PipelineStats, SimilarityResult, SkippedRecord,
};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, info, warn};

const STAGE1_TITLE_WEIGHT: f64 = 0.6;
const STAGE1_COMPANY_WEIGHT: f64 = 0.4;
const STAGE2_TITLE_WEIGHT: f64 = 0.4;
const STAGE2_COMPANY_WEIGHT: f64 = 0.35;
const STAGE2_URL_WEIGHT: f64 = 0.25;

/// Lifecycle of one deduplication run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Empty,
    Indexed,
    Grouped,
}

/// What happened to one candidate pair
#[derive(Debug, Clone)]
pub enum PairOutcome {
    QuickRejected,
    Stage1Aborted(f64),
    Stage2Aborted(f64),
    Classified(SimilarityResult),
    Failed,
    Cancelled,
}

/// Per-record data computed once per run
#[derive(Debug, Clone)]
pub struct RecordSketch {
    title_tokens: Vec<String>,
    company_tokens: Vec<String>,
    level: Option<u8>,
}

/// Runs the cheap-to-expensive checks for a single pair
pub struct PairEvaluator<'a> {
    classifier: &'a DuplicateClassifier,
    config: &'a PipelineConfig,
}

impl<'a> PairEvaluator<'a> {
    pub fn new(classifier: &'a DuplicateClassifier, config: &'a PipelineConfig) -> Self {
        Self { classifier, config }
    }

    pub fn sketch(&self, record: &JobRecord) -> RecordSketch {
        let extractor = self.classifier.extractor();
        RecordSketch {
            title_tokens: analyze(&normalize_title(&record.title)),
            company_tokens: normalize_company(&record.company)
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            level: extractor
                .requirements()
                .estimate_level(&record.title, record.experience_years),
        }
    }

    /// Cheap checks that rule a pair out without scoring it
    pub fn quick_reject(
        &self,
        a: &JobRecord,
        b: &JobRecord,
        sa: &RecordSketch,
        sb: &RecordSketch,
    ) -> bool {
        if a.same_platform(b) == Some(false) {
            if let Some(days) = a.days_between(b) {
                if days > self.config.quick_reject_days {
                    return true;
                }
            }
        }
        if let (Some(x), Some(y)) = (&a.salary, &b.salary) {
            if let Some(overlap) = x.overlap_fraction(y) {
                if overlap < self.config.min_salary_overlap {
                    return true;
                }
            }
        }
        if let (Some(la), Some(lb)) = (sa.level, sb.level) {
            if la.abs_diff(lb) > self.config.max_level_delta {
                return true;
            }
        }
        false
    }

    /// Token Jaccard of titles and companies
    pub fn stage1(&self, sa: &RecordSketch, sb: &RecordSketch) -> f64 {
        let title = (!sa.title_tokens.is_empty() && !sb.title_tokens.is_empty())
            .then(|| jaccard_tokens(&sa.title_tokens, &sb.title_tokens));
        let company = (!sa.company_tokens.is_empty() && !sb.company_tokens.is_empty())
            .then(|| jaccard_tokens(&sa.company_tokens, &sb.company_tokens));
        blend(&[(title, STAGE1_TITLE_WEIGHT), (company, STAGE1_COMPANY_WEIGHT)])
    }

    /// Title scorer, fuzzy company match and URL similarity
    pub fn stage2(&self, a: &JobRecord, b: &JobRecord) -> f64 {
        let extractor = self.classifier.extractor();
        let present = |x: &str, y: &str| !x.trim().is_empty() && !y.trim().is_empty();
        let title = present(&a.title, &b.title)
            .then(|| extractor.title_signal(&a.title, &b.title));
        let company = present(&a.company, &b.company)
            .then(|| extractor.entities().company_match(&a.company, &b.company));
        let url = present(&a.url, &b.url).then(|| extractor.urls().similarity(&a.url, &b.url));
        blend(&[
            (title, STAGE2_TITLE_WEIGHT),
            (company, STAGE2_COMPANY_WEIGHT),
            (url, STAGE2_URL_WEIGHT),
        ])
    }

    /// Quick reject, stage 1, stage 2, then the full classifier
    pub fn evaluate(
        &self,
        a: &JobRecord,
        b: &JobRecord,
        sa: &RecordSketch,
        sb: &RecordSketch,
    ) -> PairOutcome {
        if self.quick_reject(a, b, sa, sb) {
            return PairOutcome::QuickRejected;
        }
        let s1 = self.stage1(sa, sb);
        if s1 < self.config.stage1_min {
            return PairOutcome::Stage1Aborted(s1);
        }
        let s2 = self.stage2(a, b);
        if s2 < self.config.stage2_min {
            return PairOutcome::Stage2Aborted(s2);
        }
        PairOutcome::Classified(self.classifier.classify(a, b))
    }

    /// [`Self::evaluate`] with panics contained to the pair
    pub fn evaluate_isolated(
        &self,
        a: &JobRecord,
        b: &JobRecord,
        sa: &RecordSketch,
        sb: &RecordSketch,
    ) -> PairOutcome {
        match catch_unwind(AssertUnwindSafe(|| self.evaluate(a, b, sa, sb))) {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    "Comparison of {:?} and {:?} panicked; treating as not duplicate",
                    a.id, b.id
                );
                PairOutcome::Failed
            }
        }
    }
}

fn blend(parts: &[(Option<f64>, f64)]) -> f64 {
    let mut sum = 0.0;
    let mut used = 0.0;
    for (value, weight) in parts {
        if let Some(v) = value {
            sum += v * weight;
            used += weight;
        }
    }
    if used > 0.0 {
        sum / used
    } else {
        0.0
    }
}

/// One deduplication run over a fixed record slice
pub struct DedupRun<'a> {
    evaluator: PairEvaluator<'a>,
    lsh: &'a LshConfig,
    state: RunState,
    records: &'a [JobRecord],
    /// Input indices of records that passed validation
    valid: Vec<usize>,
    skipped: Vec<SkippedRecord>,
    sketches: Vec<RecordSketch>,
    index: Option<LshIndex>,
}

impl<'a> DedupRun<'a> {
    pub fn new(
        classifier: &'a DuplicateClassifier,
        pipeline: &'a PipelineConfig,
        lsh: &'a LshConfig,
    ) -> Self {
        Self {
            evaluator: PairEvaluator::new(classifier, pipeline),
            lsh,
            state: RunState::Empty,
            records: &[],
            valid: Vec::new(),
            skipped: Vec::new(),
            sketches: Vec::new(),
            index: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Validate records and build the LSH index (`Empty → Indexed`)
    pub fn build_index(&mut self, records: &'a [JobRecord]) -> Result<()> {
        if self.state != RunState::Empty {
            return Err(DedupError::InvalidState(format!(
                "cannot index a run in state {:?}",
                self.state
            )));
        }

        self.records = records;
        self.valid.clear();
        self.skipped.clear();
        for (i, record) in records.iter().enumerate() {
            match record.validate() {
                Ok(()) => self.valid.push(i),
                Err(DedupError::MalformedInput { id, reason }) => {
                    warn!("Skipping record {} ({:?}): {}", i, id, reason);
                    self.skipped.push(SkippedRecord { id, index: i, reason });
                }
                Err(e) => return Err(e),
            }
        }

        let dim = self.lsh.embedding_dim;
        let entities = self.evaluator.classifier.extractor().entities();
        let embeddings: Vec<Vec<f64>> = self
            .valid
            .par_iter()
            .map(|&i| embed(&records[i], entities, dim))
            .collect();
        let exact_keys: Vec<Option<String>> =
            self.valid.iter().map(|&i| exact_key(&records[i])).collect();
        self.sketches = self
            .valid
            .par_iter()
            .map(|&i| self.evaluator.sketch(&records[i]))
            .collect();
        let index = LshIndex::build(&embeddings, self.lsh)?.with_exact_keys(&exact_keys)?;
        self.index = Some(index);
        self.state = RunState::Indexed;

        debug!(
            "Indexed {} records ({} skipped) into {} tables",
            self.valid.len(),
            self.skipped.len(),
            self.lsh.num_tables
        );
        Ok(())
    }

    /// Evaluate candidates and form groups (`Indexed → Grouped`)
    pub fn group(
        &mut self,
        cancel: &CancellationFlag,
        parallel: bool,
        now: DateTime<Utc>,
        run_id: String,
    ) -> Result<DedupReport> {
        if self.state != RunState::Indexed {
            return Err(DedupError::InvalidState(format!(
                "cannot group a run in state {:?}",
                self.state
            )));
        }
        let index = self
            .index
            .as_ref()
            .ok_or_else(|| DedupError::InvalidState("index missing".to_string()))?;

        // Positions here are into `valid`, not the input slice
        let pairs = index.candidate_pairs();
        let evaluate = |&(p, q): &(usize, usize)| {
            if cancel.is_cancelled() {
                return PairOutcome::Cancelled;
            }
            self.evaluator.evaluate_isolated(
                &self.records[self.valid[p]],
                &self.records[self.valid[q]],
                &self.sketches[p],
                &self.sketches[q],
            )
        };
        let outcomes: Vec<PairOutcome> = if parallel {
            pairs.par_iter().map(evaluate).collect()
        } else {
            pairs.iter().map(evaluate).collect()
        };

        let mut stats = PipelineStats {
            candidate_pairs: pairs.len(),
            ..Default::default()
        };
        let mut uf = UnionFind::new(self.records.len());
        for (&(p, q), outcome) in pairs.iter().zip(&outcomes) {
            match outcome {
                PairOutcome::QuickRejected => stats.quick_rejected += 1,
                PairOutcome::Stage1Aborted(_) => stats.stage1_aborted += 1,
                PairOutcome::Stage2Aborted(_) => stats.stage2_aborted += 1,
                PairOutcome::Failed => stats.pair_failures += 1,
                PairOutcome::Cancelled => stats.cancelled_pairs += 1,
                PairOutcome::Classified(result) => {
                    stats.classified += 1;
                    if result.is_duplicate {
                        stats.duplicates_accepted += 1;
                        uf.union(self.valid[p], self.valid[q]);
                    }
                }
            }
        }
        debug!(
            "Pairs: {} candidates, {} quick-rejected, {} stage-1 aborted, \
             {} stage-2 aborted, {} classified",
            stats.candidate_pairs,
            stats.quick_rejected,
            stats.stage1_aborted,
            stats.stage2_aborted,
            stats.classified
        );

        // Skipped records were never unioned, so they stay singletons
        let components = uf.components();
        let mut groups = Vec::with_capacity(components.len());
        let mut representatives: Vec<usize> = Vec::with_capacity(components.len());
        for members in &components {
            let rep = select_representative(members, self.records, now);
            representatives.push(rep);
            groups.push(DuplicateGroup {
                member_ids: members.iter().map(|&i| self.records[i].id.clone()).collect(),
                representative_id: self.records[rep].id.clone(),
            });
        }
        representatives.sort_unstable();

        let partial = stats.cancelled_pairs > 0;
        let report = DedupReport {
            run_id,
            total_records: self.records.len(),
            duplicate_groups: groups.iter().filter(|g| g.is_duplicate_group()).count(),
            unique_record_count: groups.len(),
            groups,
            representatives: representatives
                .into_iter()
                .map(|i| self.records[i].id.clone())
                .collect(),
            skipped: std::mem::take(&mut self.skipped),
            partial,
            stats,
        };
        self.state = RunState::Grouped;

        info!(
            "Run {}: {} records → {} unique, {} duplicate groups{}",
            report.run_id,
            report.total_records,
            report.unique_record_count,
            report.duplicate_groups,
            if partial { " (partial, cancelled)" } else { "" }
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::types::Salary;
    use chrono::TimeZone;

    fn record(id: &str, title: &str, company: &str) -> JobRecord {
        JobRecord {
            id: id.into(),
            title: title.into(),
            company: company.into(),
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_quick_reject_rules() {
        let config = Config::default();
        let classifier = DuplicateClassifier::rule_based(&config);
        let ev = PairEvaluator::new(&classifier, &config.pipeline);

        let mut a = record("a", "Engineer", "Acme");
        let mut b = record("b", "Engineer", "Acme");
        a.salary = Some(Salary { min: 30_000.0, max: 40_000.0, currency: Some("USD".into()) });
        b.salary = Some(Salary { min: 200_000.0, max: 250_000.0, currency: Some("USD".into()) });
        let (sa, sb) = (ev.sketch(&a), ev.sketch(&b));
        assert!(ev.quick_reject(&a, &b, &sa, &sb));
        assert!(matches!(ev.evaluate(&a, &b, &sa, &sb), PairOutcome::QuickRejected));

        let mut a = record("a", "Engineer", "Acme");
        let mut b = record("b", "Engineer", "Acme");
        a.platform = "indeed".into();
        b.platform = "linkedin".into();
        a.posted_date = Some(now());
        b.posted_date = Some(now() - chrono::Duration::days(8));
        let (sa, sb) = (ev.sketch(&a), ev.sketch(&b));
        assert!(ev.quick_reject(&a, &b, &sa, &sb));
        b.platform = "indeed".into();
        assert!(!ev.quick_reject(&a, &b, &sa, &sb));

        let a = record("a", "Junior Engineer", "Acme");
        let b = record("b", "Principal Engineer", "Acme");
        let (sa, sb) = (ev.sketch(&a), ev.sketch(&b));
        assert!(ev.quick_reject(&a, &b, &sa, &sb));
    }

    #[test]
    fn test_stages() {
        let config = Config::default();
        let classifier = DuplicateClassifier::rule_based(&config);
        let ev = PairEvaluator::new(&classifier, &config.pipeline);
        let a = record("a", "Software Engineer", "Acme Inc.");
        let b = record("b", "Software Engineer", "Acme");
        let (sa, sb) = (ev.sketch(&a), ev.sketch(&b));
        assert_eq!(ev.stage1(&sa, &sb), 1.0);
        assert!(ev.stage2(&a, &b) > 0.99);
        assert!(matches!(
            ev.evaluate(&a, &b, &sa, &sb),
            PairOutcome::Classified(r) if r.is_duplicate
        ));

        let c = record("c", "Pastry Chef", "Globex");
        let sc = ev.sketch(&c);
        assert!(matches!(ev.evaluate(&a, &c, &sa, &sc), PairOutcome::Stage1Aborted(_)));
    }

    #[test]
    fn test_state_machine() {
        let config = Config::default();
        let classifier = DuplicateClassifier::rule_based(&config);
        let records = vec![record("a", "Engineer", "Acme")];
        let mut run = DedupRun::new(&classifier, &config.pipeline, &config.lsh);
        assert_eq!(run.state(), RunState::Empty);
        let err = run
            .group(&CancellationFlag::new(), false, now(), "r".into())
            .unwrap_err();
        assert!(matches!(err, DedupError::InvalidState(_)));

        run.build_index(&records).unwrap();
        assert_eq!(run.state(), RunState::Indexed);
        assert!(run.build_index(&records).is_err());

        run.group(&CancellationFlag::new(), false, now(), "r".into()).unwrap();
        assert_eq!(run.state(), RunState::Grouped);
        assert!(run.group(&CancellationFlag::new(), false, now(), "r".into()).is_err());
    }

    #[test]
    fn test_skipped_records_are_singletons() {
        let config = Config::default();
        let classifier = DuplicateClassifier::rule_based(&config);
        let records = vec![
            record("a", "Engineer", "Acme"),
            record("b", "", ""),
            record("c", "Engineer", "Acme"),
        ];
        let mut run = DedupRun::new(&classifier, &config.pipeline, &config.lsh);
        run.build_index(&records).unwrap();
        let report = run.group(&CancellationFlag::new(), true, now(), "r".into()).unwrap();
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 1);
        assert_eq!(report.unique_record_count, 2);
        assert_eq!(report.groups[0].member_ids, vec!["a", "c"]);
        assert_eq!(report.groups[1].member_ids, vec!["b"]);
        assert_eq!(report.representatives, vec!["a", "b"]);
    }

    #[test]
    fn test_cancelled_run_is_partial() {
        let config = Config::default();
        let classifier = DuplicateClassifier::rule_based(&config);
        let records = vec![record("a", "Engineer", "Acme"), record("b", "Engineer", "Acme")];
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let mut run = DedupRun::new(&classifier, &config.pipeline, &config.lsh);
        run.build_index(&records).unwrap();
        let report = run.group(&cancel, true, now(), "r".into()).unwrap();
        assert!(report.partial);
        assert_eq!(report.stats.cancelled_pairs, 1);
        assert_eq!(report.duplicate_groups, 0);
        assert_eq!(report.unique_record_count, 2);
    }
}
