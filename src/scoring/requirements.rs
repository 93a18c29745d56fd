//! Requirements scorer
//!
//! Pulls a skill set, an experience level and education/certification terms
//! out of free text with fixed dictionaries, then compares two profiles.

use super::{weighted_mean, FieldScore};
use crate::similarity::jaccard;
use crate::types::{FeatureVector, JobRecord};
use regex::Regex;
use std::collections::BTreeSet;

/// Highest seniority level (executive)
pub const MAX_LEVEL: u8 = 8;

const SKILL_WEIGHT: f64 = 0.6;
const EXPERIENCE_WEIGHT: f64 = 0.25;
const EDUCATION_WEIGHT: f64 = 0.15;

/// Canonical skill → spellings found in postings
const SKILLS: &[(&str, &[&str])] = &[
    // Languages
    ("rust", &["rust"]),
    ("python", &["python"]),
    ("java", &["java"]),
    ("javascript", &["javascript", "js", "ecmascript"]),
    ("typescript", &["typescript", "ts"]),
    ("go", &["golang"]),
    ("c++", &["c++", "cpp"]),
    ("c#", &["c#", "csharp"]),
    ("ruby", &["ruby"]),
    ("php", &["php"]),
    ("kotlin", &["kotlin"]),
    ("swift", &["swift"]),
    ("scala", &["scala"]),
    ("sql", &["sql"]),
    // Frameworks
    ("react", &["react", "reactjs", "react.js"]),
    ("angular", &["angular", "angularjs"]),
    ("vue", &["vue", "vuejs", "vue.js"]),
    ("node", &["node", "nodejs", "node.js"]),
    ("django", &["django"]),
    ("flask", &["flask"]),
    ("spring", &["spring", "spring boot"]),
    ("rails", &["rails", "ruby on rails"]),
    (".net", &[".net", "dotnet"]),
    ("tensorflow", &["tensorflow"]),
    ("pytorch", &["pytorch"]),
    // Data stores
    ("postgres", &["postgres", "postgresql"]),
    ("mysql", &["mysql"]),
    ("mongodb", &["mongodb", "mongo"]),
    ("redis", &["redis"]),
    ("kafka", &["kafka"]),
    ("elasticsearch", &["elasticsearch"]),
    // Cloud / devops
    ("aws", &["aws", "amazon web services"]),
    ("gcp", &["gcp", "google cloud"]),
    ("azure", &["azure"]),
    ("docker", &["docker"]),
    ("kubernetes", &["kubernetes", "k8s"]),
    ("terraform", &["terraform"]),
    ("ansible", &["ansible"]),
    ("jenkins", &["jenkins"]),
    ("linux", &["linux"]),
    ("git", &["git"]),
    ("ci/cd", &["ci/cd", "continuous integration"]),
];

/// Seniority keyword patterns and their level, highest wins
const LEVEL_PATTERNS: &[(&str, u8)] = &[
    (r"\b(?:intern|internship|trainee)\b", 0),
    (r"\b(?:junior|jr|entry[- ]level|graduate)\b", 1),
    (r"\bassociate\b", 2),
    (r"\b(?:mid[- ]level|mid|intermediate)\b", 3),
    (r"\b(?:senior|sr|snr)\b", 4),
    (r"\b(?:lead|staff)\b", 5),
    (r"\bprincipal\b", 6),
    (r"\b(?:director|head of)\b", 7),
    (r"\b(?:vp|vice president|chief|cto|cio|ceo)\b", 8),
];

/// Canonical education/certification term → pattern
const EDUCATION_PATTERNS: &[(&str, &str)] = &[
    ("bachelor", r"\b(?:bachelor'?s?|b\.?sc?|b\.?a|undergraduate degree)\b"),
    ("master", r"\b(?:master'?s?|m\.?sc?|mba)\b"),
    ("phd", r"\b(?:ph\.?d|doctorate)\b"),
    ("degree", r"\bdegree\b"),
    ("aws-certified", r"\baws certified\b"),
    ("pmp", r"\bpmp\b"),
    ("cissp", r"\bcissp\b"),
    ("ccna", r"\bccna\b"),
    ("cka", r"\bcka\b"),
    ("scrum", r"\b(?:csm|certified scrum master|scrum master)\b"),
    ("cpa", r"\bcpa\b"),
];

/// What a posting asks for
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequirementsProfile {
    pub skills: BTreeSet<String>,
    pub years: Option<f64>,
    pub level: Option<u8>,
    pub education: BTreeSet<String>,
}

impl RequirementsProfile {
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty() && self.level.is_none() && self.education.is_empty()
    }
}

/// Dictionary- and regex-based requirements extractor
pub struct RequirementsExtractor {
    skills: Vec<(&'static str, Regex)>,
    levels: Vec<(Regex, u8)>,
    education: Vec<(&'static str, Regex)>,
    years_regex: Regex,
}

impl RequirementsExtractor {
    pub fn new() -> Self {
        let skills = SKILLS
            .iter()
            .map(|(canonical, spellings)| {
                let alternatives = spellings
                    .iter()
                    .map(|s| regex::escape(s))
                    .collect::<Vec<_>>()
                    .join("|");
                // Word-ish boundaries that tolerate '+', '#', '.' and '/' inside names
                let pattern = format!(
                    r"(?i)(?:^|[^a-z0-9+#./])(?:{})(?:$|[^a-z0-9+#/])",
                    alternatives
                );
                (*canonical, Regex::new(&pattern).unwrap())
            })
            .collect();
        let levels = LEVEL_PATTERNS
            .iter()
            .map(|(p, level)| (Regex::new(&format!("(?i){}", p)).unwrap(), *level))
            .collect();
        let education = EDUCATION_PATTERNS
            .iter()
            .map(|(name, p)| (*name, Regex::new(&format!("(?i){}", p)).unwrap()))
            .collect();

        Self {
            skills,
            levels,
            education,
            years_regex: Regex::new(
                r"(?i)(\d{1,2}(?:\.\d)?)\s*\+?\s*(?:(?:-|to)\s*\d{1,2}\s*)?(?:years?|yrs?)",
            )
            .unwrap(),
        }
    }

    /// Canonical skills mentioned in `text`
    pub fn skills_in(&self, text: &str) -> BTreeSet<String> {
        self.skills
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Largest "N years" figure in `text`
    pub fn years_in(&self, text: &str) -> Option<f64> {
        self.years_regex
            .captures_iter(text)
            .filter_map(|c| c.get(1)?.as_str().parse::<f64>().ok())
            .filter(|y| *y <= 40.0)
            .fold(None, |acc: Option<f64>, y| Some(acc.map_or(y, |a| a.max(y))))
    }

    /// Highest seniority keyword level in `text`
    pub fn keyword_level(&self, text: &str) -> Option<u8> {
        self.levels
            .iter()
            .filter(|(re, _)| re.is_match(text))
            .map(|(_, level)| *level)
            .max()
    }

    pub fn education_in(&self, text: &str) -> BTreeSet<String> {
        self.education
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Job level from the title, falling back to years of experience
    pub fn estimate_level(&self, title: &str, years: Option<f64>) -> Option<u8> {
        self.keyword_level(title).or_else(|| years.map(level_for_years))
    }

    /// Profile of a record: title, requirements, description and declared fields
    pub fn profile(&self, record: &JobRecord) -> RequirementsProfile {
        let text = format!("{}\n{}", record.requirements_text(), record.description);

        let mut skills = self.skills_in(&text);
        for declared in &record.skills {
            let found = self.skills_in(declared);
            if found.is_empty() {
                let s = declared.trim().to_lowercase();
                if !s.is_empty() {
                    skills.insert(s);
                }
            } else {
                skills.extend(found);
            }
        }

        let years = record.experience_years.or_else(|| self.years_in(&text));
        let level = self
            .keyword_level(&record.title)
            .or_else(|| self.keyword_level(&record.requirements_text()))
            .or_else(|| years.map(level_for_years));

        RequirementsProfile {
            skills,
            years,
            level,
            education: self.education_in(&text),
        }
    }

    /// Compare two profiles over whichever components both sides have.
    ///
    /// Returns `None` when nothing is comparable.
    pub fn compare(&self, a: &RequirementsProfile, b: &RequirementsProfile) -> Option<FieldScore> {
        let skills = (!a.skills.is_empty() && !b.skills.is_empty()).then(|| skill_overlap(a, b));
        let experience = match (a.level, b.level) {
            (Some(la), Some(lb)) => Some(1.0 - la.abs_diff(lb) as f64 / MAX_LEVEL as f64),
            _ => None,
        };
        let education = (!a.education.is_empty() && !b.education.is_empty()).then(|| {
            let ea: std::collections::HashSet<&String> = a.education.iter().collect();
            let eb: std::collections::HashSet<&String> = b.education.iter().collect();
            jaccard(&ea, &eb)
        });

        let score = weighted_mean([
            (skills, SKILL_WEIGHT),
            (experience, EXPERIENCE_WEIGHT),
            (education, EDUCATION_WEIGHT),
        ])?;

        let mut features = FeatureVector::new();
        features.insert_opt("skills", skills);
        features.insert_opt("experience", experience);
        features.insert_opt("education", education);
        Some(FieldScore { score, features })
    }
}

impl Default for RequirementsExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RequirementsExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequirementsExtractor")
            .field("skills", &self.skills.len())
            .finish()
    }
}

/// Jaccard of the two skill sets; 0 when either is empty
pub fn skill_overlap(a: &RequirementsProfile, b: &RequirementsProfile) -> f64 {
    let sa: std::collections::HashSet<&String> = a.skills.iter().collect();
    let sb: std::collections::HashSet<&String> = b.skills.iter().collect();
    jaccard(&sa, &sb)
}

/// Map years of experience onto the 0-8 level scale
pub fn level_for_years(years: f64) -> u8 {
    match years {
        y if y < 1.0 => 1,
        y if y < 3.0 => 2,
        y if y < 5.0 => 3,
        y if y < 8.0 => 4,
        y if y < 10.0 => 5,
        y if y < 15.0 => 6,
        _ => 7,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_skills_dictionary() {
        let ex = RequirementsExtractor::new();
        let skills = ex.skills_in("Strong C++ and Node.js, some K8s on AWS. Javascript a plus.");
        for s in ["c++", "node", "kubernetes", "aws", "javascript"] {
            assert!(skills.contains(s), "missing {s} in {skills:?}");
        }
        assert!(!skills.contains("java"));
        assert!(ex.skills_in("We trust our team").is_empty());
    }

    #[test]
    fn test_years_and_levels() {
        let ex = RequirementsExtractor::new();
        assert_eq!(ex.years_in("3-5 years of Rust, 7+ yrs overall"), Some(7.0));
        assert_eq!(ex.years_in("no numbers here"), None);
        assert_eq!(ex.keyword_level("Senior Staff Engineer"), Some(5));
        assert_eq!(ex.keyword_level("VP of Engineering"), Some(8));
        assert_eq!(ex.keyword_level("Entry-level Analyst"), Some(1));
        assert_eq!(ex.keyword_level("Backend Engineer"), None);
        assert_eq!(ex.estimate_level("Backend Engineer", Some(6.0)), Some(4));
    }

    #[test]
    fn test_education() {
        let ex = RequirementsExtractor::new();
        let edu = ex.education_in("Bachelor's degree in CS; PMP preferred");
        assert!(edu.contains("bachelor"));
        assert!(edu.contains("degree"));
        assert!(edu.contains("pmp"));
    }

    #[test]
    fn test_profile_uses_declared_fields() {
        let ex = RequirementsExtractor::new();
        let record = JobRecord {
            id: "1".into(),
            title: "Senior Engineer".into(),
            skills: vec!["Golang".into(), "Event Sourcing".into()],
            experience_years: Some(6.0),
            ..Default::default()
        };
        let p = ex.profile(&record);
        assert!(p.skills.contains("go"));
        assert!(p.skills.contains("event sourcing"));
        assert_eq!(p.level, Some(4));
        assert_eq!(p.years, Some(6.0));
    }

    #[test]
    fn test_compare() {
        let ex = RequirementsExtractor::new();
        let a = RequirementsProfile {
            skills: ["rust", "aws"].iter().map(|s| s.to_string()).collect(),
            level: Some(4),
            ..Default::default()
        };
        let b = RequirementsProfile {
            skills: ["rust", "docker"].iter().map(|s| s.to_string()).collect(),
            level: Some(2),
            ..Default::default()
        };
        let s = ex.compare(&a, &b).unwrap();
        let expected = (0.6 * (1.0 / 3.0) + 0.25 * (1.0 - 2.0 / 8.0)) / 0.85;
        assert_abs_diff_eq!(s.score, expected, epsilon = 1e-12);
        assert!(s.features.get("education").is_none());
        assert_eq!(ex.compare(&a, &b).unwrap().score, ex.compare(&b, &a).unwrap().score);
        assert!(ex
            .compare(&RequirementsProfile::default(), &RequirementsProfile::default())
            .is_none());
    }
}
