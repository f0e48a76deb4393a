use time::OffsetDateTime;
use tracing::debug;

use crate::clock::Clock;
use crate::config::PriorityConfig;
use crate::schema::{Category, ExistingIssue, PriorityFactors, PriorityRank, PriorityScore, RankedIssue};

pub const UPVOTE_CAP: f64 = 40.0;
pub const SEVERITY_CAP: f64 = 30.0;
pub const AGE_CAP: f64 = 20.0;
pub const LOCATION_CAP: f64 = 10.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

pub fn calculate_priority_score(issue: &ExistingIssue, clock: &impl Clock) -> PriorityScore {
    compute_priority_score(issue, clock.now(), &PriorityConfig::default())
}

/// Scores an issue against a fixed `now`. The location factor is a flat
/// `config.location_score` until a hotspot model exists.
pub fn compute_priority_score(
    issue: &ExistingIssue,
    now: OffsetDateTime,
    config: &PriorityConfig,
) -> PriorityScore {
    let upvotes = clamp_score(
        f64::from(issue.upvote_count) / config.upvote_saturation * UPVOTE_CAP,
        0.0,
        UPVOTE_CAP,
    );
    let severity = severity_points(&issue.category);

    let age_days = (now - issue.created_at).as_seconds_f64() / SECONDS_PER_DAY;
    // Timestamps in the future count as brand new.
    let age = clamp_score(age_days / config.age_saturation_days * AGE_CAP, 0.0, AGE_CAP);

    let location = clamp_score(config.location_score, 0.0, LOCATION_CAP);

    let factors = PriorityFactors {
        upvotes,
        severity,
        age,
        location,
    };
    let score = factors.total();

    PriorityScore {
        score,
        rank: rank_for_score(score),
        factors,
    }
}

pub fn severity_points(category: &Category) -> f64 {
    match category {
        Category::Water => 30.0,
        Category::Electricity => 25.0,
        Category::Roads => 20.0,
        Category::Garbage => 15.0,
        Category::Drainage
        | Category::PublicSafety
        | Category::StreetLighting
        | Category::Other
        | Category::Unknown(_) => 10.0,
    }
}

pub fn rank_for_score(score: f64) -> PriorityRank {
    if score >= 75.0 {
        PriorityRank::Critical
    } else if score >= 50.0 {
        PriorityRank::High
    } else if score >= 25.0 {
        PriorityRank::Medium
    } else {
        PriorityRank::Low
    }
}

pub fn sort_by_priority(issues: Vec<ExistingIssue>, clock: &impl Clock) -> Vec<RankedIssue> {
    sort_by_priority_with(issues, clock, &PriorityConfig::default())
}

/// Scores every issue against a single reading of the clock and orders them by
/// score, highest first. The sort is stable: equal scores keep input order.
pub fn sort_by_priority_with(
    issues: Vec<ExistingIssue>,
    clock: &impl Clock,
    config: &PriorityConfig,
) -> Vec<RankedIssue> {
    let now = clock.now();
    let mut ranked: Vec<RankedIssue> = issues
        .into_iter()
        .map(|issue| {
            let priority_score = compute_priority_score(&issue, now, config);
            RankedIssue {
                issue,
                priority_score,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.priority_score.score.total_cmp(&a.priority_score.score));
    debug!(issues = ranked.len(), "issues ranked by priority");
    ranked
}

pub const GRAY: &str = "#6B7280";

impl PriorityRank {
    pub fn color(&self) -> &'static str {
        match self {
            PriorityRank::Critical => "#DC2626",
            PriorityRank::High => "#F59E0B",
            PriorityRank::Medium => "#3B82F6",
            PriorityRank::Low => "#10B981",
        }
    }

    pub fn parse_label(value: &str) -> Option<Self> {
        match value {
            "Critical" => Some(PriorityRank::Critical),
            "High" => Some(PriorityRank::High),
            "Medium" => Some(PriorityRank::Medium),
            "Low" => Some(PriorityRank::Low),
            _ => None,
        }
    }
}

/// Display color for a rank label; unrecognised labels are gray.
pub fn priority_color(rank: &str) -> &'static str {
    PriorityRank::parse_label(rank).map_or(GRAY, |rank| rank.color())
}

fn clamp_score(value: f64, floor: f64, ceiling: f64) -> f64 {
    value.max(floor).min(ceiling)
}
