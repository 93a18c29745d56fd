//! Fuzzy-logic combination of company and title match scores

use crate::config::{FuzzyConfig, Membership};

/// Weight of the fuzzy AND (min) term
const AND_WEIGHT: f64 = 0.6;

/// Weight of the fuzzy OR (max) term
const OR_WEIGHT: f64 = 0.4;

/// Gaussian membership degree of `x` for the given centre and spread
pub fn gaussian_membership(x: f64, m: &Membership) -> f64 {
    if m.sigma <= 0.0 {
        return if (x - m.center).abs() < f64::EPSILON { 1.0 } else { 0.0 };
    }
    let d = x - m.center;
    (-(d * d) / (2.0 * m.sigma * m.sigma)).exp()
}

/// `0.6 * min(mu_company, mu_title) + 0.4 * max(mu_company, mu_title)`
pub fn combine_entity_scores(company_score: f64, title_score: f64, cfg: &FuzzyConfig) -> f64 {
    let mu_company = gaussian_membership(company_score, &cfg.company);
    let mu_title = gaussian_membership(title_score, &cfg.title);
    AND_WEIGHT * mu_company.min(mu_title) + OR_WEIGHT * mu_company.max(mu_title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_membership_peaks_at_center() {
        let cfg = FuzzyConfig::default();
        assert_abs_diff_eq!(gaussian_membership(0.8, &cfg.company), 1.0);
        assert_abs_diff_eq!(
            gaussian_membership(0.9, &cfg.company),
            (-0.5f64).exp(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_combiner_formula() {
        let cfg = FuzzyConfig::default();
        let mu_c = gaussian_membership(0.9, &cfg.company);
        let mu_t = gaussian_membership(0.7, &cfg.title);
        let expected = 0.6 * mu_c.min(mu_t) + 0.4 * mu_c.max(mu_t);
        assert_abs_diff_eq!(combine_entity_scores(0.9, 0.7, &cfg), expected);
        assert_abs_diff_eq!(combine_entity_scores(0.8, 0.7, &cfg), 1.0);
    }

    #[test]
    fn test_combiner_not_symmetric_in_fields() {
        // Swapping the company and title arguments changes the result because
        // each field has its own membership function. Pairwise order independence
        // comes only from the inputs themselves being symmetric similarity scores.
        let cfg = FuzzyConfig::default();
        let a = combine_entity_scores(0.95, 0.5, &cfg);
        let b = combine_entity_scores(0.5, 0.95, &cfg);
        assert!((a - b).abs() > 1e-6);
    }
}
