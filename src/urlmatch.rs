//! URL canonicalization and matching
//!
//! Normalized form: host without `www.`, lowercased path with empty segments
//! dropped, tracking parameters removed and the rest sorted. The scheme and
//! fragment are not part of the normalized form. Unparseable input never
//! errors; it degrades to a lowercase string comparison.

use crate::similarity::{jaccard, normalized_levenshtein};
use std::collections::HashSet;
use url::Url;

/// Query parameters that only track the visitor
const TRACKING_PARAMS: &[&str] = &[
    "_hsenc", "_hsmi", "fbclid", "gclid", "mc_cid", "mc_eid", "msclkid", "ref", "refid", "source",
    "src", "trackingid", "trk",
];

/// Query parameters that identify the posting itself
const JOB_PARAMS: &[&str] = &[
    "currentjobid", "gh_jid", "id", "job", "job_id", "jobid", "jk", "lever_id", "position",
    "positionid", "posting", "postingid", "req", "reqid", "requisitionid", "vacancy", "vjk",
];

const EXACT_WEIGHT: f64 = 0.20;
const NORMALIZED_WEIGHT: f64 = 0.25;
const PATTERN_WEIGHT: f64 = 0.15;
const PARAMS_WEIGHT: f64 = 0.15;
const DOMAIN_WEIGHT: f64 = 0.15;
const PATH_WEIGHT: f64 = 0.10;

/// Shortest all-hex segment treated as a hash
const MIN_HASH_LEN: usize = 16;

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

/// Parsed pieces of a URL in normalized form
#[derive(Debug, Clone, PartialEq)]
struct UrlParts {
    host: String,
    segments: Vec<String>,
    /// Non-tracking query pairs, sorted
    query: Vec<(String, String)>,
}

impl UrlParts {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let parsed = match Url::parse(raw) {
            Ok(u) => u,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse(&format!("https://{}", raw)).ok()?
            }
            Err(_) => return None,
        };
        let host = parsed.host_str()?.to_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
        let segments = parsed
            .path()
            .to_lowercase()
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let mut query: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.to_lowercase(), v.into_owned()))
            .filter(|(k, _)| !is_tracking_param(k))
            .collect();
        query.sort();
        Some(UrlParts {
            host,
            segments,
            query,
        })
    }

    fn path(&self) -> String {
        self.segments.join("/")
    }

    fn normalized(&self) -> String {
        let mut out = self.host.clone();
        if !self.segments.is_empty() {
            out.push('/');
            out.push_str(&self.path());
        }
        if !self.query.is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.query.iter())
                .finish();
            out.push('?');
            out.push_str(&query);
        }
        out
    }

    fn pattern(&self) -> String {
        let mut out = self.host.clone();
        for segment in &self.segments {
            out.push('/');
            out.push_str(segment_pattern(segment));
        }
        out
    }

    /// Last two labels of the host
    fn domain(&self) -> String {
        let labels: Vec<&str> = self.host.split('.').collect();
        let start = labels.len().saturating_sub(2);
        labels[start..].join(".")
    }

    fn job_params(&self) -> HashSet<String> {
        self.query
            .iter()
            .filter(|(k, _)| JOB_PARAMS.contains(&k.as_str()))
            .map(|(k, v)| format!("{}={}", k, v))
            .collect()
    }
}

fn segment_pattern(segment: &str) -> &str {
    if segment.chars().all(|c| c.is_ascii_digit()) {
        "{id}"
    } else if segment.len() == 36 && uuid::Uuid::try_parse(segment).is_ok() {
        "{uuid}"
    } else if segment.len() >= MIN_HASH_LEN && segment.chars().all(|c| c.is_ascii_hexdigit()) {
        "{hash}"
    } else {
        segment
    }
}

fn raw_fallback(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Canonical form used to decide whether two URLs point at the same page
pub fn normalize_url(raw: &str) -> String {
    match UrlParts::parse(raw) {
        Some(parts) => parts.normalized(),
        None => raw_fallback(raw),
    }
}

/// Host plus path template, with ids, UUIDs and hashes replaced by placeholders
pub fn extract_pattern(raw: &str) -> String {
    match UrlParts::parse(raw) {
        Some(parts) => parts.pattern(),
        None => raw_fallback(raw),
    }
}

/// Weighted URL similarity in [0, 1]; blank input scores 0
pub fn url_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (a.trim(), b.trim());
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (pa, pb) = match (UrlParts::parse(a), UrlParts::parse(b)) {
        (Some(pa), Some(pb)) => (pa, pb),
        _ => {
            let (ra, rb) = (raw_fallback(a), raw_fallback(b));
            return if ra == rb {
                1.0
            } else {
                normalized_levenshtein(&ra, &rb)
            };
        }
    };

    let flag = |same: bool| if same { 1.0 } else { 0.0 };
    let ja = pa.job_params();
    let jb = pb.job_params();
    let params = if ja.is_empty() && jb.is_empty() {
        None
    } else {
        Some(jaccard(&ja, &jb))
    };
    let (path_a, path_b) = (pa.path(), pb.path());
    let path = if path_a == path_b {
        1.0
    } else {
        normalized_levenshtein(&path_a, &path_b)
    };

    let parts = [
        (Some(flag(raw_fallback(a) == raw_fallback(b))), EXACT_WEIGHT),
        (Some(flag(pa.normalized() == pb.normalized())), NORMALIZED_WEIGHT),
        (Some(flag(pa.pattern() == pb.pattern())), PATTERN_WEIGHT),
        (params, PARAMS_WEIGHT),
        (Some(flag(pa.domain() == pb.domain())), DOMAIN_WEIGHT),
        (Some(path), PATH_WEIGHT),
    ];
    let mut sum = 0.0;
    let mut used = 0.0;
    for (value, weight) in parts {
        if let Some(v) = value {
            sum += v * weight;
            used += weight;
        }
    }
    (sum / used).clamp(0.0, 1.0)
}

/// Threshold-aware URL matcher
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    threshold: f64,
}

impl Default for UrlMatcher {
    fn default() -> Self {
        Self::new(0.9)
    }
}

impl UrlMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        url_similarity(a, b)
    }

    /// Whether two URLs are close enough to be the same posting
    pub fn is_same_posting(&self, a: &str, b: &str) -> bool {
        url_similarity(a, b) >= self.threshold
    }
}
