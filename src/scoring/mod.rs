//! Field similarity scorers
//!
//! Each scorer compares one field of two postings and returns a score in
//! [0, 1] together with the components it was built from.

pub mod description;
pub mod location;
pub mod requirements;
pub mod title;

pub use description::{DescriptionFeatures, DescriptionScorer};
pub use location::LocationScorer;
pub use requirements::{RequirementsExtractor, RequirementsProfile, MAX_LEVEL};
pub use title::TitleScorer;

use crate::types::FeatureVector;

/// A blended field score and its named components
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldScore {
    pub score: f64,
    pub features: FeatureVector,
}

impl FieldScore {
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Weighted mean over the components that are present.
///
/// Returns `None` when no component carries weight.
pub(crate) fn weighted_mean<I>(parts: I) -> Option<f64>
where
    I: IntoIterator<Item = (Option<f64>, f64)>,
{
    let mut sum = 0.0;
    let mut used = 0.0;
    for (value, weight) in parts {
        if let Some(v) = value {
            sum += v * weight;
            used += weight;
        }
    }
    if used > 0.0 {
        Some((sum / used).clamp(0.0, 1.0))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_weighted_mean_skips_missing() {
        let m = weighted_mean([(Some(1.0), 0.5), (None, 0.3), (Some(0.0), 0.5)]).unwrap();
        assert_abs_diff_eq!(m, 0.5);
        assert!(weighted_mean([(None, 1.0)]).is_none());
        assert!(weighted_mean([(Some(1.0), 0.0)]).is_none());
    }
}
