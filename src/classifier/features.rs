//! Pairwise feature extraction
//!
//! A feature is left out when its input is missing on either side, so
//! strategies only weigh signals that were actually observed. Every feature
//! is symmetric in its two records.

use crate::config::{Config, DescriptionWeights, FuzzyConfig};
use crate::entity::{combine_entity_scores, EntityMatcher, SENIORITY_CONFLICT_FACTOR};
use crate::scoring::requirements::skill_overlap;
use crate::scoring::{DescriptionScorer, LocationScorer, RequirementsExtractor, TitleScorer};
use crate::text::normalize_company;
use crate::types::{FeatureVector, JobRecord};
use crate::urlmatch::UrlMatcher;

pub const TITLE_SIMILARITY: &str = "titleSimilarity";
pub const TITLE_FUZZY: &str = "titleFuzzy";
pub const TITLE_ROLE_MATCH: &str = "titleRoleMatch";
pub const SENIORITY_CONFLICT: &str = "seniorityConflict";
pub const COMPANY_EXACT: &str = "companyExact";
pub const COMPANY_FUZZY: &str = "companyFuzzy";
pub const COMPANY_FUZZY_MATCH: &str = "companyFuzzyMatch";
pub const ENTITY_MEMBERSHIP: &str = "entityMembership";
pub const LOCATION_MATCH: &str = "locationMatch";
pub const DESCRIPTION_TFIDF: &str = "descriptionTfidf";
pub const DESCRIPTION_KEYWORDS: &str = "descriptionKeywords";
pub const DESCRIPTION_STRUCTURE: &str = "descriptionStructure";
pub const DESCRIPTION_SENTENCE: &str = "descriptionSentence";
pub const DESCRIPTION_SIMILARITY: &str = "descriptionSimilarity";
pub const CONTENT_MATCH: &str = "contentMatch";
pub const REQUIREMENTS_SIMILARITY: &str = "requirementsSimilarity";
pub const URL_SIMILARITY: &str = "urlSimilarity";
pub const URL_MATCH: &str = "urlMatch";
pub const SAME_PLATFORM: &str = "samePlatform";
pub const TIME_DELTA_DAYS: &str = "timeDeltaDays";
pub const SALARY_OVERLAP: &str = "salaryOverlap";
pub const SKILLS_OVERLAP: &str = "skillsOverlap";
pub const EXPERIENCE_DELTA: &str = "experienceDelta";

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Single title score from the blended and fuzzy scores.
///
/// The fuzzy score only counts when both titles name the same role, and a
/// seniority conflict halves whatever is left.
pub fn combine_title_scores(blended: f64, fuzzy: f64, same_role: bool, conflict: bool) -> f64 {
    let score = if same_role { blended.max(fuzzy) } else { blended };
    if conflict {
        score * SENIORITY_CONFLICT_FACTOR
    } else {
        score
    }
}

/// Builds [`FeatureVector`]s for record pairs
#[derive(Debug)]
pub struct FeatureExtractor {
    title: TitleScorer,
    description: DescriptionScorer,
    requirements: RequirementsExtractor,
    location: LocationScorer,
    urls: UrlMatcher,
    entities: EntityMatcher,
    description_weights: DescriptionWeights,
    fuzzy: FuzzyConfig,
    similarity_threshold: f64,
}

impl FeatureExtractor {
    /// Extractor with string-only scorers
    pub fn new(config: &Config) -> Self {
        Self::with_scorers(config, DescriptionScorer::new(), LocationScorer::string_only())
    }

    /// Extractor using the given (possibly collaborator-backed) scorers
    pub fn with_scorers(
        config: &Config,
        description: DescriptionScorer,
        location: LocationScorer,
    ) -> Self {
        Self {
            title: TitleScorer::new(config.title_weights.clone()),
            description,
            requirements: RequirementsExtractor::new(),
            location,
            urls: UrlMatcher::new(config.thresholds.url_similarity),
            entities: EntityMatcher::new(&config.aliases, config.thresholds.fuzzy_match),
            description_weights: config.description_weights.clone(),
            fuzzy: config.fuzzy.clone(),
            similarity_threshold: config.thresholds.similarity,
        }
    }

    pub fn title_scorer(&self) -> &TitleScorer {
        &self.title
    }

    pub fn entities(&self) -> &EntityMatcher {
        &self.entities
    }

    pub fn urls(&self) -> &UrlMatcher {
        &self.urls
    }

    pub fn requirements(&self) -> &RequirementsExtractor {
        &self.requirements
    }

    /// Blended title score, raised to the fuzzy match only for the same role
    pub fn title_signal(&self, a: &str, b: &str) -> f64 {
        combine_title_scores(
            self.title.score(a, b).score,
            self.entities.title_match(a, b),
            self.entities.same_role(a, b),
            self.entities.seniority_conflict(a, b),
        )
    }

    /// Combined description similarity, `None` when either side is blank
    pub fn description_similarity(&self, a: &str, b: &str) -> Option<f64> {
        if blank(a) || blank(b) {
            return None;
        }
        Some(self.description.score(a, b).combined(&self.description_weights))
    }

    /// Title-plus-description content score
    pub fn content_score(&self, a: &JobRecord, b: &JobRecord) -> Option<f64> {
        if blank(&a.title) || blank(&b.title) {
            return None;
        }
        let title = self.title_signal(&a.title, &b.title);
        Some(match self.description_similarity(&a.description, &b.description) {
            Some(desc) => (title + desc) / 2.0,
            None => title,
        })
    }

    /// Whether title and description content clears the similarity threshold
    pub fn is_content_duplicate(&self, a: &JobRecord, b: &JobRecord) -> bool {
        self.content_score(a, b)
            .map(|s| s >= self.similarity_threshold)
            .unwrap_or(false)
    }

    /// All pairwise features for `a` and `b`
    pub fn build(&self, a: &JobRecord, b: &JobRecord) -> FeatureVector {
        let mut fv = FeatureVector::new();

        // Title
        let mut title_signal = None;
        if !blank(&a.title) && !blank(&b.title) {
            let blended = self.title.score(&a.title, &b.title).score;
            let fuzzy = self.entities.title_match(&a.title, &b.title);
            let same_role = self.entities.same_role(&a.title, &b.title);
            let conflict = self.entities.seniority_conflict(&a.title, &b.title);
            fv.insert(TITLE_SIMILARITY, blended);
            fv.insert(TITLE_FUZZY, fuzzy);
            fv.insert(TITLE_ROLE_MATCH, flag(same_role));
            fv.insert(SENIORITY_CONFLICT, flag(conflict));
            title_signal = Some(combine_title_scores(blended, fuzzy, same_role, conflict));
        }

        // Company
        if !blank(&a.company) && !blank(&b.company) {
            let fuzzy = self.entities.company_match(&a.company, &b.company);
            fv.insert(
                COMPANY_EXACT,
                flag(normalize_company(&a.company) == normalize_company(&b.company)),
            );
            fv.insert(COMPANY_FUZZY, fuzzy);
            fv.insert(
                COMPANY_FUZZY_MATCH,
                flag(fuzzy >= self.entities.fuzzy_match_threshold()),
            );
            if let Some(title) = title_signal {
                fv.insert(ENTITY_MEMBERSHIP, combine_entity_scores(fuzzy, title, &self.fuzzy));
            }
        }

        fv.insert_opt(LOCATION_MATCH, self.location.score(&a.location, &b.location));

        // Description
        let mut description_similarity = None;
        if !blank(&a.description) && !blank(&b.description) {
            let d = self.description.score(&a.description, &b.description);
            fv.insert(DESCRIPTION_TFIDF, d.tfidf_cosine);
            fv.insert(DESCRIPTION_KEYWORDS, d.keyword_overlap);
            fv.insert(DESCRIPTION_STRUCTURE, d.structure);
            fv.insert_opt(DESCRIPTION_SENTENCE, d.sentence);
            let combined = d.combined(&self.description_weights);
            fv.insert(DESCRIPTION_SIMILARITY, combined);
            description_similarity = Some(combined);
        }

        if let Some(title) = title_signal {
            let content = match description_similarity {
                Some(desc) => (title + desc) / 2.0,
                None => title,
            };
            fv.insert(CONTENT_MATCH, flag(content >= self.similarity_threshold));
        }

        // Requirements
        let pa = self.requirements.profile(a);
        let pb = self.requirements.profile(b);
        if let Some(req) = self.requirements.compare(&pa, &pb) {
            fv.insert(REQUIREMENTS_SIMILARITY, req.score);
        }
        if !pa.skills.is_empty() && !pb.skills.is_empty() {
            fv.insert(SKILLS_OVERLAP, skill_overlap(&pa, &pb));
        }
        if let (Some(la), Some(lb)) = (pa.level, pb.level) {
            fv.insert(EXPERIENCE_DELTA, la.abs_diff(lb) as f64);
        }

        // URL
        if !blank(&a.url) && !blank(&b.url) {
            let sim = self.urls.similarity(&a.url, &b.url);
            fv.insert(URL_SIMILARITY, sim);
            fv.insert(URL_MATCH, flag(self.urls.is_same_posting(&a.url, &b.url)));
        }

        fv.insert_opt(SAME_PLATFORM, a.same_platform(b).map(flag));
        fv.insert_opt(TIME_DELTA_DAYS, a.days_between(b));
        if let (Some(sa), Some(sb)) = (&a.salary, &b.salary) {
            fv.insert_opt(SALARY_OVERLAP, sa.overlap_fraction(sb));
        }

        fv
    }
}
