//! Pluggable model, distance and sentence collaborators

use jobdedup::config::StrategyKind;
use jobdedup::{
    Config, DedupEngine, DistanceLookup, FeatureVector, JobRecord, ModelScorer, SentenceSimilarity,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn record(id: &str, title: &str, company: &str) -> JobRecord {
    JobRecord {
        id: id.into(),
        title: title.into(),
        company: company.into(),
        ..Default::default()
    }
}

fn learned_config() -> Config {
    let mut config = Config::default();
    config.classifier.strategy = StrategyKind::Learned;
    config.collaborators.timeout_ms = 100;
    config
}

struct Constant(f64);

impl ModelScorer for Constant {
    fn predict(&self, _: &FeatureVector) -> anyhow::Result<f64> {
        Ok(self.0)
    }
}

struct Broken;

impl ModelScorer for Broken {
    fn predict(&self, _: &FeatureVector) -> anyhow::Result<f64> {
        anyhow::bail!("model file is corrupt")
    }
}

struct Slow;

impl ModelScorer for Slow {
    fn predict(&self, _: &FeatureVector) -> anyhow::Result<f64> {
        std::thread::sleep(Duration::from_millis(1_000));
        Ok(1.0)
    }
}

#[test]
fn test_learned_model_used() {
    let engine = DedupEngine::builder(learned_config())
        .model(Arc::new(Constant(0.95)))
        .build()
        .unwrap();
    let r = engine.classify(&record("a", "Welder", "Forge"), &record("b", "Nurse", "Clinic"));
    assert_eq!(r.strategy, "learned");
    assert_eq!(r.score, 0.95);
    assert!(r.is_duplicate);
}

#[test]
fn test_learned_failure_falls_back() {
    let a = record("a", "Data Engineer", "Acme");
    let b = record("b", "Data Engineer", "Acme Inc");

    for model in [
        Arc::new(Broken) as Arc<dyn ModelScorer>,
        Arc::new(Slow),
        Arc::new(Constant(f64::NAN)),
        Arc::new(Constant(1.5)),
    ] {
        let engine = DedupEngine::builder(learned_config()).model(model).build().unwrap();
        let r = engine.classify(&a, &b);
        assert_eq!(r.strategy, "rule_based");
        assert!(r.is_duplicate);
    }
}

#[test]
fn test_learned_without_model_runs_rules() {
    let engine = DedupEngine::new(learned_config()).unwrap();
    assert_eq!(engine.classifier().strategy_name(), "rule_based");
    let r = engine.classify(&record("a", "Welder", "Forge"), &record("b", "Welder", "Forge"));
    assert_eq!(r.strategy, "rule_based");
}

#[test]
fn test_learned_model_in_bulk_run() {
    let calls = Arc::new(AtomicUsize::new(0));
    struct Counting(Arc<AtomicUsize>);
    impl ModelScorer for Counting {
        fn predict(&self, _: &FeatureVector) -> anyhow::Result<f64> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(0.9)
        }
    }

    let engine = DedupEngine::builder(learned_config())
        .model(Arc::new(Counting(Arc::clone(&calls))))
        .build()
        .unwrap();
    let records = vec![
        record("a", "Data Engineer", "Acme"),
        record("b", "Data Engineer", "Acme"),
        record("c", "Line Cook", "Bistro"),
    ];
    let report = engine.deduplicate(&records).unwrap();
    assert_eq!(report.duplicate_groups, 1);
    assert_eq!(report.stats.classified, calls.load(Ordering::SeqCst));
}

#[test]
fn test_distance_lookup_raises_location_score() {
    let lookup = |a: &str, b: &str| -> Option<f64> {
        let pair = (a.to_lowercase(), b.to_lowercase());
        match (pair.0.as_str(), pair.1.as_str()) {
            ("oakland", "san francisco") | ("san francisco", "oakland") => Some(13.0),
            _ => None,
        }
    };
    let engine = DedupEngine::builder(Config::default())
        .distance_lookup(Arc::new(lookup))
        .build()
        .unwrap();

    let mut a = record("a", "Barista", "Blue Cup");
    a.location = "Oakland".into();
    let mut b = record("b", "Barista", "Blue Cup");
    b.location = "San Francisco".into();

    let ab = engine.classify(&a, &b).features.get("locationMatch").unwrap();
    let ba = engine.classify(&b, &a).features.get("locationMatch").unwrap();
    assert!(ab > 0.5, "location {}", ab);
    assert_eq!(ab, ba);

    let plain = DedupEngine::new(Config::default()).unwrap();
    assert_eq!(plain.classify(&a, &b).features.get("locationMatch"), Some(0.0));
}

#[test]
fn test_sentence_similarity_feature() {
    let sentence = |a: &str, b: &str| -> f64 {
        if a.len() == b.len() {
            1.0
        } else {
            0.5
        }
    };
    let engine = DedupEngine::builder(Config::default())
        .sentence_similarity(Arc::new(sentence))
        .build()
        .unwrap();

    let mut a = record("a", "Barista", "Blue Cup");
    a.description = "Pull espresso shots. Keep the bar clean.".into();
    let mut b = record("b", "Barista", "Blue Cup");
    b.description = "Pull espresso shots. Greet every guest warmly.".into();

    let r = engine.classify(&a, &b);
    assert!(r.features.contains("descriptionSentence"));

    let plain = DedupEngine::new(Config::default()).unwrap();
    assert!(!plain.classify(&a, &b).features.contains("descriptionSentence"));
}
