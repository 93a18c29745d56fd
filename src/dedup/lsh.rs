//! Random-hyperplane LSH over canonical record embeddings
//!
//! Each record is hashed into a signed bag of canonical tokens: the
//! alias-resolved company plus the title's head noun and domain words, with
//! seniority and arrangement words ("remote", "full time") dropped. Titles
//! that only differ in those words embed identically, so they share every
//! bucket. Records with the same normalized posting URL are paired through an
//! exact bucket regardless of their embeddings.
//!
//! Every table draws `hash_bits` hyperplanes from a `StdRng` seeded with
//! `seed + table`, and tokens are hashed with seeded XXH3, so an index built
//! twice from the same records and configuration is identical across builds
//! and toolchains. Tables are built in parallel; each table is written only by
//! the task that builds it and the index is read-only afterwards.

use crate::config::LshConfig;
use crate::entity::EntityMatcher;
use crate::error::{DedupError, Result};
use crate::types::JobRecord;
use crate::urlmatch::normalize_url;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Bucket key: one bit per hyperplane
pub type BucketKey = u128;

/// Prefix keeping the company token apart from title tokens
const COMPANY_PREFIX: &str = "c:";

const TOKEN_HASH_SEED: u64 = 0;

fn token_hash(token: &str) -> u64 {
    xxh3_64_with_seed(token.as_bytes(), TOKEN_HASH_SEED)
}

/// Canonical tokens a record is embedded from
pub fn embedding_tokens(record: &JobRecord, entities: &EntityMatcher) -> Vec<String> {
    let mut tokens = entities.title_key(&record.title);
    let company = entities.company_key(&record.company);
    if !company.is_empty() {
        tokens.push(format!("{}{}", COMPANY_PREFIX, company));
    }
    tokens
}

/// L2-normalized hashed embedding of a record's canonical title and company
pub fn embed(record: &JobRecord, entities: &EntityMatcher, dim: usize) -> Vec<f64> {
    let mut v = vec![0.0; dim];
    if dim == 0 {
        return v;
    }
    for token in embedding_tokens(record, entities) {
        let h = token_hash(&token);
        let idx = (h % dim as u64) as usize;
        let sign = if (h >> 63) & 1 == 1 { -1.0 } else { 1.0 };
        v[idx] += sign;
    }

    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// Exact bucket key of a record: its normalized URL, if it has one
pub fn exact_key(record: &JobRecord) -> Option<String> {
    if record.url.trim().is_empty() {
        return None;
    }
    let normalized = normalize_url(&record.url);
    (!normalized.is_empty()).then_some(normalized)
}

struct Table {
    /// `hash_bits * dim` row-major hyperplane coefficients
    planes: Vec<f64>,
    buckets: HashMap<BucketKey, Vec<usize>>,
}

/// Multi-table LSH index over a fixed set of embeddings
pub struct LshIndex {
    tables: Vec<Table>,
    /// Exact-key buckets unioned with the hyperplane buckets
    exact: HashMap<String, Vec<usize>>,
    num_tables: usize,
    hash_bits: usize,
    dim: usize,
    len: usize,
}

impl std::fmt::Debug for LshIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LshIndex")
            .field("num_tables", &self.num_tables)
            .field("hash_bits", &self.hash_bits)
            .field("dim", &self.dim)
            .field("len", &self.len)
            .field("exact_keys", &self.exact.len())
            .finish()
    }
}

impl LshIndex {
    /// Build all tables over `embeddings`; position `i` is reported as index `i`
    pub fn build(embeddings: &[Vec<f64>], config: &LshConfig) -> Result<Self> {
        let LshConfig {
            num_tables,
            hash_bits,
            embedding_dim: dim,
            seed,
            max_projection_floats,
        } = *config;

        if num_tables == 0 || dim == 0 || !(1..=128).contains(&hash_bits) {
            return Err(DedupError::IndexBuildFailure(format!(
                "invalid index shape: {} tables x {} bits x {} dims",
                num_tables, hash_bits, dim
            )));
        }
        let per_table = hash_bits.checked_mul(dim).ok_or_else(|| {
            DedupError::IndexBuildFailure("projection size overflows".to_string())
        })?;
        let total = per_table.checked_mul(num_tables).ok_or_else(|| {
            DedupError::IndexBuildFailure("projection size overflows".to_string())
        })?;
        if total > max_projection_floats {
            return Err(DedupError::IndexBuildFailure(format!(
                "{} projection floats exceed the limit of {}; use fewer tables or bits",
                total, max_projection_floats
            )));
        }
        if let Some(bad) = embeddings.iter().position(|e| e.len() != dim) {
            return Err(DedupError::IndexBuildFailure(format!(
                "embedding {} has length {}, expected {}",
                bad,
                embeddings[bad].len(),
                dim
            )));
        }

        let tables = (0..num_tables)
            .into_par_iter()
            .map(|t| -> Result<Table> {
                let mut planes: Vec<f64> = Vec::new();
                planes.try_reserve_exact(per_table).map_err(|e| {
                    DedupError::IndexBuildFailure(format!("table {}: {}", t, e))
                })?;
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
                planes.extend((0..per_table).map(|_| rng.gen_range(-1.0..=1.0)));

                let mut buckets: HashMap<BucketKey, Vec<usize>> = HashMap::new();
                for (i, e) in embeddings.iter().enumerate() {
                    buckets.entry(signature(&planes, hash_bits, e)).or_default().push(i);
                }
                Ok(Table { planes, buckets })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            tables,
            exact: HashMap::new(),
            num_tables,
            hash_bits,
            dim,
            len: embeddings.len(),
        })
    }

    /// Add exact buckets; `keys[i]` belongs to embedding `i`
    pub fn with_exact_keys(mut self, keys: &[Option<String>]) -> Result<Self> {
        if keys.len() != self.len {
            return Err(DedupError::IndexBuildFailure(format!(
                "{} exact keys for {} embeddings",
                keys.len(),
                self.len
            )));
        }
        self.exact.clear();
        for (i, key) in keys.iter().enumerate() {
            if let Some(key) = key {
                self.exact.entry(key.clone()).or_default().push(i);
            }
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn num_tables(&self) -> usize {
        self.num_tables
    }

    /// Bucket key of `embedding` in table `table`
    pub fn bucket(&self, table: usize, embedding: &[f64]) -> Option<BucketKey> {
        let t = self.tables.get(table)?;
        if embedding.len() != self.dim {
            return None;
        }
        Some(signature(&t.planes, self.hash_bits, embedding))
    }

    /// Indexed records sharing a hyperplane bucket with `embedding` or the
    /// exact bucket of `exact_key`
    pub fn query(&self, embedding: &[f64], exact_key: Option<&str>) -> BTreeSet<usize> {
        let mut out = BTreeSet::new();
        if let Some(members) = exact_key.and_then(|k| self.exact.get(k)) {
            out.extend(members.iter().copied());
        }
        if embedding.len() != self.dim {
            return out;
        }
        for t in &self.tables {
            let key = signature(&t.planes, self.hash_bits, embedding);
            if let Some(members) = t.buckets.get(&key) {
                out.extend(members.iter().copied());
            }
        }
        out
    }

    /// Every unordered pair `(i, j)`, `i < j`, sharing a bucket in some table
    /// or an exact bucket.
    ///
    /// Sorted and free of duplicates.
    pub fn candidate_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = BTreeSet::new();
        let buckets = self
            .tables
            .iter()
            .flat_map(|t| t.buckets.values())
            .chain(self.exact.values());
        for members in buckets {
            for (k, &i) in members.iter().enumerate() {
                for &j in &members[k + 1..] {
                    pairs.insert((i.min(j), i.max(j)));
                }
            }
        }
        pairs.into_iter().collect()
    }
}

/// Sign-of-dot-product bits, hyperplane `b` setting bit `b`
fn signature(planes: &[f64], hash_bits: usize, embedding: &[f64]) -> BucketKey {
    let dim = embedding.len();
    let mut key: BucketKey = 0;
    for (b, plane) in planes.chunks_exact(dim).take(hash_bits).enumerate() {
        let dot: f64 = plane.iter().zip(embedding).map(|(p, x)| p * x).sum();
        if dot > 0.0 {
            key |= 1u128 << b;
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, company: &str) -> JobRecord {
        JobRecord {
            id: title.into(),
            title: title.into(),
            company: company.into(),
            ..Default::default()
        }
    }

    fn embed_default(r: &JobRecord, dim: usize) -> Vec<f64> {
        embed(r, &EntityMatcher::default(), dim)
    }

    fn small_config() -> LshConfig {
        LshConfig {
            num_tables: 4,
            hash_bits: 8,
            ..Default::default()
        }
    }

    #[test]
    fn test_embedding_normalized_and_canonical() {
        let a = embed_default(&record("Sr. Software Engineer", "Acme Inc."), 64);
        let b = embed_default(&record("senior software engineer", "ACME"), 64);
        assert_eq!(a, b);
        let norm: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
        assert!(embed_default(&record("", ""), 8).iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_embedding_ignores_qualifiers_and_aliases() {
        let base = embed_default(&record("Backend Engineer", "Meta"), 64);
        for (title, company) in [
            ("Backend Developer", "Facebook"),
            ("Backend Engineer (Remote)", "Meta Platforms, Inc."),
            ("Backend Engineer II", "Meta"),
            ("Senior Backend Engineer - Full Time", "Meta"),
        ] {
            assert_eq!(embed_default(&record(title, company), 64), base, "{title} @ {company}");
        }
        let m = EntityMatcher::default();
        let tokens = embedding_tokens(&record("Backend Engineer", "Meta"), &m);
        assert_ne!(embedding_tokens(&record("Frontend Engineer", "Meta"), &m), tokens);
        assert_ne!(embedding_tokens(&record("Backend Engineer", "Globex"), &m), tokens);
    }

    #[test]
    fn test_embedding_tokens() {
        let tokens = embedding_tokens(
            &record("Remote Data Analyst", "Initech LLC"),
            &EntityMatcher::default(),
        );
        assert_eq!(tokens, vec!["t:data", "r:analyst", "c:initech"]);
    }

    #[test]
    fn test_token_hash_is_fixed() {
        // XXH3-64 of empty input with seed 0
        assert_eq!(token_hash(""), 0x2D06_8005_38D3_94C2);
        assert_eq!(token_hash("r:engineer"), token_hash("r:engineer"));
        assert_ne!(token_hash("r:engineer"), token_hash("r:analyst"));
    }

    #[test]
    fn test_identical_records_collide() {
        let records = [
            record("Software Engineer", "Acme"),
            record("Nurse Practitioner", "General Hospital"),
            record("Software Engineer", "Acme Inc"),
        ];
        let embeddings: Vec<Vec<f64>> = records.iter().map(|r| embed_default(r, 64)).collect();
        let index = LshIndex::build(&embeddings, &LshConfig::default()).unwrap();
        assert!(index.candidate_pairs().contains(&(0, 2)));
        assert!(index.query(&embeddings[0], None).contains(&2));
    }

    #[test]
    fn test_exact_url_bucket_pairs_records() {
        let mut a = record("Platform Engineer", "Acme");
        a.url = "https://jobs.example.com/posting/991?utm_source=feed".into();
        let mut b = record("Site Reliability Lead", "Acme Holdings");
        b.url = "https://jobs.example.com/posting/991".into();
        let c = record("Pastry Chef", "Bistro");
        let records = [a, b, c];

        let embeddings: Vec<Vec<f64>> = records.iter().map(|r| embed_default(r, 64)).collect();
        let keys: Vec<Option<String>> = records.iter().map(exact_key).collect();
        assert_eq!(keys[0], keys[1]);
        assert_eq!(keys[2], None);

        let index = LshIndex::build(&embeddings, &LshConfig::default())
            .unwrap()
            .with_exact_keys(&keys)
            .unwrap();
        assert!(index.candidate_pairs().contains(&(0, 1)));
        assert!(index.query(&embeddings[2], keys[0].as_deref()).contains(&1));

        let short = LshIndex::build(&embeddings, &small_config())
            .unwrap()
            .with_exact_keys(&keys[..1]);
        assert!(matches!(short, Err(DedupError::IndexBuildFailure(_))));
    }

    #[test]
    fn test_build_is_deterministic() {
        let embeddings: Vec<Vec<f64>> = ["Data Engineer", "Data Scientist", "Chef", "Line Cook"]
            .iter()
            .map(|t| embed_default(&record(t, "Acme"), 64))
            .collect();
        let a = LshIndex::build(&embeddings, &small_config()).unwrap();
        let b = LshIndex::build(&embeddings, &small_config()).unwrap();
        assert_eq!(a.candidate_pairs(), b.candidate_pairs());
        for t in 0..a.num_tables() {
            assert_eq!(a.bucket(t, &embeddings[1]), b.bucket(t, &embeddings[1]));
        }
    }

    #[test]
    fn test_pairs_sorted_and_unique() {
        let e = embed_default(&record("Chef", "Bistro"), 64);
        let keys = vec![Some("bistro.com/jobs/1".to_string()); 3];
        let index = LshIndex::build(&[e.clone(), e.clone(), e], &small_config())
            .unwrap()
            .with_exact_keys(&keys)
            .unwrap();
        assert_eq!(index.candidate_pairs(), vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn test_oversized_index_fails() {
        let config = LshConfig {
            max_projection_floats: 1000,
            ..Default::default()
        };
        let err = LshIndex::build(&[], &config).unwrap_err();
        assert!(matches!(err, DedupError::IndexBuildFailure(_)));
        assert!(err.is_fatal());

        let config = LshConfig {
            hash_bits: 0,
            ..Default::default()
        };
        assert!(LshIndex::build(&[], &config).is_err());
    }

    #[test]
    fn test_dimension_mismatch_fails() {
        let err = LshIndex::build(&[vec![1.0; 3]], &small_config()).unwrap_err();
        assert!(matches!(err, DedupError::IndexBuildFailure(_)));
    }
}
