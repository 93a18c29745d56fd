//! Location scorer
//!
//! String comparison always works. A distance lookup, when supplied, can only
//! raise the score, and any failure degrades to the string score.

use crate::collaborators::{BoundedInvoker, DistanceLookup};
use crate::similarity::jaccard;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Score when one location string contains the other
const CONTAINMENT_SCORE: f64 = 0.8;

struct GeoLookup {
    lookup: Arc<dyn DistanceLookup>,
    invoker: Arc<BoundedInvoker>,
}

pub struct LocationScorer {
    geo: Option<GeoLookup>,
    max_distance_km: f64,
}

impl Default for LocationScorer {
    fn default() -> Self {
        Self::string_only()
    }
}

impl LocationScorer {
    pub fn string_only() -> Self {
        Self {
            geo: None,
            max_distance_km: 50.0,
        }
    }

    pub fn with_distance_lookup(
        lookup: Arc<dyn DistanceLookup>,
        invoker: Arc<BoundedInvoker>,
        max_distance_km: f64,
    ) -> Self {
        Self {
            geo: Some(GeoLookup { lookup, invoker }),
            max_distance_km,
        }
    }

    /// Location similarity, or `None` when either side is blank
    pub fn score(&self, a: &str, b: &str) -> Option<f64> {
        let na = normalize_location(a);
        let nb = normalize_location(b);
        if na.is_empty() || nb.is_empty() {
            return None;
        }
        let string = string_score(&na, &nb);
        if string >= 1.0 {
            return Some(string);
        }
        match self.distance_score(&na, &nb) {
            Some(d) => Some(string.max(d)),
            None => Some(string),
        }
    }

    fn distance_score(&self, a: &str, b: &str) -> Option<f64> {
        let geo = self.geo.as_ref()?;
        if self.max_distance_km <= 0.0 {
            return None;
        }
        // Fixed argument order keeps the score symmetric
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        let (first, second) = (first.to_string(), second.to_string());
        let lookup = Arc::clone(&geo.lookup);

        match geo
            .invoker
            .call("distance lookup", move || lookup.distance_km(&first, &second))
        {
            Ok(Some(km)) if km.is_finite() && km >= 0.0 => {
                Some((1.0 - km / self.max_distance_km).max(0.0))
            }
            Ok(Some(km)) => {
                warn!("Distance lookup returned invalid value {}", km);
                None
            }
            Ok(None) => {
                debug!("No distance for {:?} / {:?}", a, b);
                None
            }
            Err(e) => {
                warn!("Distance lookup failed, using string comparison: {}", e);
                None
            }
        }
    }
}

impl std::fmt::Debug for LocationScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationScorer")
            .field("geo", &self.geo.is_some())
            .field("max_distance_km", &self.max_distance_km)
            .finish()
    }
}

fn normalize_location(s: &str) -> String {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Equality, shared "remote", containment, then word-set Jaccard
pub fn string_score(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let wa: HashSet<&str> = a.split_whitespace().collect();
    let wb: HashSet<&str> = b.split_whitespace().collect();
    if wa.contains("remote") && wb.contains("remote") {
        return 1.0;
    }
    if contains_words(a, b) || contains_words(b, a) {
        return CONTAINMENT_SCORE;
    }
    jaccard(&wa, &wb)
}

fn contains_words(haystack: &str, needle: &str) -> bool {
    format!(" {} ", haystack).contains(&format!(" {} ", needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_string_scores() {
        let s = LocationScorer::default();
        assert_eq!(s.score("San Francisco, CA", "san francisco ca"), Some(1.0));
        assert_eq!(s.score("San Francisco", "San Francisco, CA"), Some(0.8));
        assert_eq!(s.score("Remote (US)", "Remote - EU"), Some(1.0));
        assert_eq!(s.score("", "Berlin"), None);
        assert_eq!(s.score("Berlin", "Munich"), Some(0.0));
    }

    #[test]
    fn test_containment_needs_whole_words() {
        assert!(string_score("newark", "new york") < CONTAINMENT_SCORE);
    }

    fn invoker(ms: u64) -> Arc<BoundedInvoker> {
        Arc::new(BoundedInvoker::new(Duration::from_millis(ms)).unwrap())
    }

    #[test]
    fn test_distance_lookup_raises_score() {
        let lookup: Arc<dyn DistanceLookup> = Arc::new(|_: &str, _: &str| Some(10.0));
        let s = LocationScorer::with_distance_lookup(lookup, invoker(500), 50.0);
        let score = s.score("Palo Alto", "Mountain View").unwrap();
        assert!((score - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_distance_lookup_failure_degrades() {
        let slow: Arc<dyn DistanceLookup> = Arc::new(|_: &str, _: &str| {
            std::thread::sleep(Duration::from_millis(200));
            Some(0.0)
        });
        let s = LocationScorer::with_distance_lookup(slow, invoker(20), 50.0);
        assert_eq!(s.score("Palo Alto", "Mountain View"), Some(0.0));

        let unknown: Arc<dyn DistanceLookup> = Arc::new(|_: &str, _: &str| None);
        let s = LocationScorer::with_distance_lookup(unknown, invoker(500), 50.0);
        assert_eq!(s.score("Palo Alto", "Mountain View"), Some(0.0));
    }

    #[test]
    fn test_distance_lookup_sees_ordered_arguments() {
        let lookup: Arc<dyn DistanceLookup> =
            Arc::new(|a: &str, _: &str| if a.starts_with('a') { Some(0.0) } else { Some(500.0) });
        let s = LocationScorer::with_distance_lookup(lookup, invoker(500), 50.0);
        assert_eq!(s.score("Zurich", "Aarau"), s.score("Aarau", "Zurich"));
    }
}
