use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Issue category as agreed with the backend. Labels outside the known set are
/// kept verbatim in `Unknown` so they round-trip to the store unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Roads,
    Water,
    Electricity,
    Garbage,
    Drainage,
    PublicSafety,
    StreetLighting,
    Other,
    Unknown(String),
}

impl Category {
    pub const KNOWN: [Category; 8] = [
        Category::Roads,
        Category::Water,
        Category::Electricity,
        Category::Garbage,
        Category::Drainage,
        Category::PublicSafety,
        Category::StreetLighting,
        Category::Other,
    ];

    pub fn label(&self) -> &str {
        match self {
            Category::Roads => "Roads",
            Category::Water => "Water",
            Category::Electricity => "Electricity",
            Category::Garbage => "Garbage",
            Category::Drainage => "Drainage",
            Category::PublicSafety => "Public Safety",
            Category::StreetLighting => "Street Lighting",
            Category::Other => "Other",
            Category::Unknown(raw) => raw,
        }
    }

    /// Category equality as used for duplicate detection: an unknown label
    /// never matches anything, itself included.
    pub fn matches(&self, other: &Category) -> bool {
        !matches!(self, Category::Unknown(_)) && self == other
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        match value {
            "Roads" => Category::Roads,
            "Water" => Category::Water,
            "Electricity" => Category::Electricity,
            "Garbage" => Category::Garbage,
            "Drainage" => Category::Drainage,
            "Public Safety" => Category::PublicSafety,
            "Street Lighting" => Category::StreetLighting,
            "Other" => Category::Other,
            _ => Category::Unknown(value.to_string()),
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Category::from(value.as_str())
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        match value {
            Category::Unknown(raw) => raw,
            known => known.label().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum IssueStatus {
    Reported,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Rejected,
}

impl IssueStatus {
    /// Case-insensitive lookup of a store status label.
    pub fn parse_label(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "reported" => Some(IssueStatus::Reported),
            "in progress" => Some(IssueStatus::InProgress),
            "resolved" => Some(IssueStatus::Resolved),
            "rejected" => Some(IssueStatus::Rejected),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IssueStatus::Reported => "Reported",
            IssueStatus::InProgress => "In Progress",
            IssueStatus::Resolved => "Resolved",
            IssueStatus::Rejected => "Rejected",
        }
    }
}

/// Literal status value that excludes an issue from duplicate matching.
pub const RESOLVED_STATUS: &str = "Resolved";

/// A report drafted on the device that has not been submitted yet.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IssueDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[schemars(with = "String")]
    pub category: Category,
    pub latitude: f64,  // WGS84 degrees
    pub longitude: f64, // WGS84 degrees
}

/// An issue as stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExistingIssue {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[schemars(with = "String")]
    pub category: Category,
    pub latitude: f64,
    pub longitude: f64,
    pub status: String, // raw store label, e.g. "Reported", "In Progress"
    #[serde(default)]
    pub upvote_count: u32,
    #[serde(with = "time::serde::rfc3339")]
    #[schemars(with = "String")]
    pub created_at: OffsetDateTime,
}

impl ExistingIssue {
    pub fn lifecycle(&self) -> Option<IssueStatus> {
        IssueStatus::parse_label(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateMatch {
    pub issue_id: String,
    pub similarity: f64, // 0.0..=1.0
    pub reason: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum PriorityRank {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for PriorityRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            PriorityRank::Low => "Low",
            PriorityRank::Medium => "Medium",
            PriorityRank::High => "High",
            PriorityRank::Critical => "Critical",
        };
        write!(f, "{value}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PriorityFactors {
    pub upvotes: f64,  // 0..=40
    pub severity: f64, // 0..=30
    pub age: f64,      // 0..=20
    pub location: f64, // 0..=10
}

impl PriorityFactors {
    pub fn total(&self) -> f64 {
        self.upvotes + self.severity + self.age + self.location
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PriorityScore {
    pub score: f64, // 0..=100
    pub rank: PriorityRank,
    pub factors: PriorityFactors,
}

/// An issue paired with its computed priority, as returned by priority sorting.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RankedIssue {
    #[serde(flatten)]
    pub issue: ExistingIssue,
    pub priority_score: PriorityScore,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_round_trip() {
        for category in Category::KNOWN {
            let label: String = category.clone().into();
            assert_eq!(Category::from(label), category);
        }
        assert_eq!(
            Category::from("Potholes"),
            Category::Unknown("Potholes".to_string())
        );
    }

    #[test]
    fn category_matching_is_exact_and_rejects_unknown() {
        assert!(Category::Water.matches(&Category::Water));
        assert!(Category::Other.matches(&Category::Other));
        assert!(!Category::Water.matches(&Category::Roads));
        let unknown = Category::from("water");
        assert!(!unknown.matches(&unknown.clone()));
    }

    #[test]
    fn status_parsing_ignores_case() {
        assert_eq!(
            IssueStatus::parse_label("in progress"),
            Some(IssueStatus::InProgress)
        );
        assert_eq!(IssueStatus::parse_label("RESOLVED"), Some(IssueStatus::Resolved));
        assert_eq!(IssueStatus::parse_label("closed"), None);
    }

    #[test]
    fn duplicate_match_uses_camel_case_issue_id() {
        let value = serde_json::to_value(DuplicateMatch {
            issue_id: "abc".to_string(),
            similarity: 0.5,
            reason: "r".to_string(),
        })
        .unwrap();
        assert_eq!(value["issueId"], "abc");
    }

    #[test]
    fn existing_issue_parses_backend_row() {
        let raw = r#"{
            "id": "42",
            "title": "Burst pipe",
            "category": "Water",
            "latitude": 8.48,
            "longitude": -13.23,
            "status": "Reported",
            "upvote_count": 3,
            "created_at": "2024-03-01T10:15:00.123+00:00"
        }"#;
        let issue: ExistingIssue = serde_json::from_str(raw).unwrap();
        assert_eq!(issue.category, Category::Water);
        assert_eq!(issue.description, "");
        assert_eq!(issue.lifecycle(), Some(IssueStatus::Reported));
    }
}
