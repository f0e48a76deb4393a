//! Duplicate detection for freshly drafted reports.
//!
//! A draft is compared against open issues of the same category. Issues more
//! than `distance_threshold_m` away are never candidates. Within that radius an
//! issue matches when its title/description overlap enough with the draft, or
//! unconditionally when it sits within `close_location_m`.

use std::collections::HashSet;
use tracing::debug;

use crate::config::DuplicateConfig;
use crate::geo::haversine_meters;
use crate::schema::{DuplicateMatch, ExistingIssue, IssueDraft, RESOLVED_STATUS};

pub fn detect_duplicates(draft: &IssueDraft, existing: &[ExistingIssue]) -> Vec<DuplicateMatch> {
    detect_duplicates_with(draft, existing, &DuplicateConfig::default())
}

/// Returns candidate duplicates ordered by similarity, highest first. Ties keep
/// the order of `existing`.
pub fn detect_duplicates_with(
    draft: &IssueDraft,
    existing: &[ExistingIssue],
    config: &DuplicateConfig,
) -> Vec<DuplicateMatch> {
    let mut matches: Vec<DuplicateMatch> = existing
        .iter()
        .filter_map(|issue| match_issue(draft, issue, config))
        .collect();

    matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

    debug!(
        candidates = existing.len(),
        matches = matches.len(),
        category = %draft.category,
        "duplicate scan complete"
    );
    matches
}

fn match_issue(
    draft: &IssueDraft,
    issue: &ExistingIssue,
    config: &DuplicateConfig,
) -> Option<DuplicateMatch> {
    if issue.status == RESOLVED_STATUS {
        return None;
    }
    if !draft.category.matches(&issue.category) {
        return None;
    }

    let distance = haversine_meters(draft.latitude, draft.longitude, issue.latitude, issue.longitude);
    // NaN coordinates fall out here too.
    if !(distance <= config.distance_threshold_m) {
        return None;
    }

    let title_similarity = text_similarity(&draft.title, &issue.title);
    let description_similarity = text_similarity(&draft.description, &issue.description);
    let text = (title_similarity + description_similarity) / 2.0;

    let very_close = distance <= config.close_location_m;
    if text < config.text_similarity_threshold && !very_close {
        return None;
    }

    let proximity = 1.0 - distance / config.distance_threshold_m;
    let similarity = text.max(proximity).clamp(0.0, 1.0);

    let meters = distance.round() as i64;
    let reason = if very_close {
        format!("Very close location ({meters}m away)")
    } else {
        let percent = (text * 100.0).round() as i64;
        format!("Similar issue nearby ({meters}m away, {percent}% similar)")
    };

    Some(DuplicateMatch {
        issue_id: issue.id.clone(),
        similarity,
        reason,
    })
}

/// Jaccard overlap of the lower-cased, whitespace-separated word sets of two
/// strings. Two empty strings score 0.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let words_a = word_set(a);
    let words_b = word_set(b);

    let union = words_a.union(&words_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = words_a.intersection(&words_b).count();
    intersection as f64 / union as f64
}

fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(|word| word.to_lowercase()).collect()
}

pub fn should_warn_duplicate(matches: &[DuplicateMatch]) -> bool {
    should_warn_duplicate_with(matches, DuplicateConfig::default().warn_threshold)
}

/// True when the strongest match is confident enough to interrupt submission.
pub fn should_warn_duplicate_with(matches: &[DuplicateMatch], threshold: f64) -> bool {
    matches
        .iter()
        .map(|m| m.similarity)
        .max_by(|a, b| a.total_cmp(b))
        .is_some_and(|best| best > threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::meters_to_lat_degrees;
    use crate::schema::Category;
    use time::macros::datetime;

    const BASE_LAT: f64 = 8.4840;
    const BASE_LNG: f64 = -13.2299;

    fn draft(title: &str, description: &str, category: Category) -> IssueDraft {
        IssueDraft {
            title: title.to_string(),
            description: description.to_string(),
            category,
            latitude: BASE_LAT,
            longitude: BASE_LNG,
        }
    }

    fn existing(id: &str, title: &str, description: &str, meters_north: f64) -> ExistingIssue {
        ExistingIssue {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            category: Category::Roads,
            latitude: BASE_LAT + meters_to_lat_degrees(meters_north),
            longitude: BASE_LNG,
            status: "Reported".to_string(),
            upvote_count: 0,
            created_at: datetime!(2024-05-01 12:00 UTC),
        }
    }

    fn pothole_draft() -> IssueDraft {
        draft(
            "Large pothole on Main Road",
            "deep pothole near the market",
            Category::Roads,
        )
    }

    #[test]
    fn identical_text_similarity_is_one() {
        assert_eq!(text_similarity("Broken street light", "broken  Street light"), 1.0);
    }

    #[test]
    fn disjoint_text_similarity_is_zero() {
        assert_eq!(text_similarity("burst pipe", "garbage pile"), 0.0);
    }

    #[test]
    fn empty_text_similarity_is_zero_not_nan() {
        assert_eq!(text_similarity("", ""), 0.0);
        assert_eq!(text_similarity("   ", "\t"), 0.0);
        assert_eq!(text_similarity("", "pothole"), 0.0);
    }

    #[test]
    fn partial_overlap_uses_unique_words() {
        // {a, b} vs {b, c}: 1 shared of 3
        let s = text_similarity("a b b", "B c");
        assert!((s - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn resolved_issues_are_never_matched() {
        let mut issue = existing("1", "Large pothole on Main Road", "deep pothole near the market", 1.0);
        issue.status = "Resolved".to_string();
        assert!(detect_duplicates(&pothole_draft(), &[issue]).is_empty());
    }

    #[test]
    fn resolved_check_is_case_sensitive() {
        let mut issue = existing("1", "Large pothole on Main Road", "deep pothole near the market", 1.0);
        issue.status = "resolved".to_string();
        assert_eq!(detect_duplicates(&pothole_draft(), &[issue]).len(), 1);
    }

    #[test]
    fn other_categories_are_never_matched() {
        let mut issue = existing("1", "Large pothole on Main Road", "deep pothole near the market", 1.0);
        issue.category = Category::Water;
        assert!(detect_duplicates(&pothole_draft(), &[issue]).is_empty());
    }

    #[test]
    fn unknown_categories_never_match_each_other() {
        let draft = draft("Fallen tree", "tree across lane", Category::from("Trees"));
        let mut issue = existing("1", "Fallen tree", "tree across lane", 1.0);
        issue.category = Category::from("Trees");
        assert!(detect_duplicates(&draft, &[issue]).is_empty());
    }

    #[test]
    fn very_close_issue_matches_despite_unrelated_text() {
        let issue = existing("near", "Faded lane markings", "paint worn away", 19.9999);
        let matches = detect_duplicates(&pothole_draft(), &[issue]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].reason, "Very close location (20m away)");
        assert!((matches[0].similarity - 0.6).abs() < 1e-4);
    }

    #[test]
    fn beyond_override_radius_needs_text_overlap() {
        let issue = existing("mid", "Faded lane markings", "paint worn away", 20.5);
        assert!(detect_duplicates(&pothole_draft(), &[issue]).is_empty());
    }

    #[test]
    fn similar_text_within_radius_reports_percentage() {
        let issue = existing("1", "Large pothole on Main Road", "deep pothole near the market", 30.0);
        let matches = detect_duplicates(&pothole_draft(), &[issue]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].similarity, 1.0);
        assert_eq!(matches[0].reason, "Similar issue nearby (30m away, 100% similar)");
    }

    #[test]
    fn far_issue_never_matches_even_with_identical_text() {
        let issue = existing("far", "Large pothole on Main Road", "deep pothole near the market", 100.0);
        assert!(detect_duplicates(&pothole_draft(), &[issue]).is_empty());
    }

    #[test]
    fn nan_coordinates_never_match() {
        let mut issue = existing("nan", "Large pothole on Main Road", "deep pothole near the market", 0.0);
        issue.latitude = f64::NAN;
        assert!(detect_duplicates(&pothole_draft(), &[issue]).is_empty());
    }

    #[test]
    fn matches_are_sorted_by_similarity() {
        let issues = vec![
            existing("text", "Large pothole on Main Road", "deep pothole by the market", 40.0),
            existing("close", "Faded lane markings", "paint worn away", 5.0),
            existing("exact", "Large pothole on Main Road", "deep pothole near the market", 45.0),
        ];
        let matches = detect_duplicates(&pothole_draft(), &issues);
        let ids: Vec<&str> = matches.iter().map(|m| m.issue_id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "close", "text"]);
        for m in &matches {
            assert!((0.0..=1.0).contains(&m.similarity));
        }
    }

    #[test]
    fn empty_existing_yields_no_matches() {
        assert!(detect_duplicates(&pothole_draft(), &[]).is_empty());
    }

    #[test]
    fn custom_radius_widens_search() {
        let config = DuplicateConfig {
            distance_threshold_m: 150.0,
            ..DuplicateConfig::default()
        };
        let issue = existing("far", "Large pothole on Main Road", "deep pothole near the market", 100.0);
        let matches = detect_duplicates_with(&pothole_draft(), &[issue], &config);
        assert_eq!(matches.len(), 1);
    }

    fn with_similarity(similarity: f64) -> DuplicateMatch {
        DuplicateMatch {
            issue_id: "x".to_string(),
            similarity,
            reason: String::new(),
        }
    }

    #[test]
    fn warn_threshold() {
        assert!(!should_warn_duplicate(&[]));
        assert!(should_warn_duplicate(&[with_similarity(0.71)]));
        assert!(!should_warn_duplicate(&[with_similarity(0.69)]));
        assert!(!should_warn_duplicate(&[with_similarity(0.7)]));
        assert!(should_warn_duplicate(&[with_similarity(0.2), with_similarity(0.9)]));
    }
}
