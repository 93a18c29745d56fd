//! Representative selection: most complete, then freshest, then earliest

use crate::types::JobRecord;
use chrono::{DateTime, Utc};

const SHORT_DESCRIPTION: usize = 100;
const LONG_DESCRIPTION: usize = 500;
const MAX_FRESHNESS: f64 = 10.0;

/// Completeness points plus a freshness bonus of `max(0, 10 - days_old)`
pub fn completeness_score(record: &JobRecord, now: DateTime<Utc>) -> f64 {
    let present = |s: &str| !s.trim().is_empty();
    let description_len = record.description.trim().chars().count();

    let mut score = 0.0;
    if present(&record.title) {
        score += 10.0;
    }
    if present(&record.company) {
        score += 10.0;
    }
    if description_len >= SHORT_DESCRIPTION {
        score += 10.0;
    }
    if record.requirements.iter().any(|r| present(r)) {
        score += 5.0;
    }
    if record.salary.is_some() {
        score += 5.0;
    }
    if present(&record.location) {
        score += 5.0;
    }
    if description_len >= LONG_DESCRIPTION {
        score += 5.0;
    }
    if record.benefits.iter().any(|b| present(b)) {
        score += 3.0;
    }
    if record.company_size.as_deref().is_some_and(present) {
        score += 2.0;
    }
    score + freshness(record, now)
}

fn freshness(record: &JobRecord, now: DateTime<Utc>) -> f64 {
    match record.posted_date.or(record.scraped_at) {
        Some(date) => {
            let days_old = (now - date).num_seconds() as f64 / 86_400.0;
            (MAX_FRESHNESS - days_old).clamp(0.0, MAX_FRESHNESS)
        }
        None => 0.0,
    }
}

/// Member with the highest score; ties go to the smallest index.
///
/// `members` must be non-empty and ascending.
pub fn select_representative(
    members: &[usize],
    records: &[JobRecord],
    now: DateTime<Utc>,
) -> usize {
    let mut best = members[0];
    let mut best_score = completeness_score(&records[best], now);
    for &i in &members[1..] {
        let score = completeness_score(&records[i], now);
        if score > best_score {
            best = i;
            best_score = score;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Salary;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap()
    }

    fn record(id: &str, description: &str) -> JobRecord {
        JobRecord {
            id: id.into(),
            title: "Engineer".into(),
            company: "Acme".into(),
            description: description.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_completeness_points() {
        let mut r = record("a", &"x".repeat(600));
        r.requirements = vec!["Rust".into()];
        r.salary = Some(Salary {
            min: 1.0,
            max: 2.0,
            currency: None,
        });
        r.location = "Berlin".into();
        r.benefits = vec!["Dental".into()];
        r.company_size = Some("51-200".into());
        assert_eq!(completeness_score(&r, now()), 55.0);
        assert_eq!(completeness_score(&record("b", ""), now()), 20.0);
    }

    #[test]
    fn test_freshness_bonus() {
        let mut r = record("a", "");
        r.posted_date = Some(now() - Duration::days(3));
        assert_eq!(completeness_score(&r, now()), 27.0);
        r.posted_date = Some(now() - Duration::days(30));
        assert_eq!(completeness_score(&r, now()), 20.0);
        r.posted_date = None;
        r.scraped_at = Some(now());
        assert_eq!(completeness_score(&r, now()), 30.0);
    }

    #[test]
    fn test_longer_description_wins() {
        let records = vec![record("a", "short"), record("b", &"long text ".repeat(20))];
        assert_eq!(select_representative(&[0, 1], &records, now()), 1);
    }

    #[test]
    fn test_tie_goes_to_earliest() {
        let records = vec![record("a", "same"), record("b", "same"), record("c", "same")];
        assert_eq!(select_representative(&[1, 2], &records, now()), 1);
        assert_eq!(select_representative(&[0, 1, 2], &records, now()), 0);
    }
}
