//! Keyword-based category suggestion for a report description.
//!
//! Rules are tried in order and the first rule with a keyword found anywhere in
//! the lower-cased description wins. Substring matching is intentional: "street
//! light" hits the Roads rule through "street" before Electricity is consulted.

use anyhow::{Result, bail};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::schema::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CategorySuggestion {
    #[schemars(with = "String")]
    pub category: Category,
    pub confidence: f64,
    pub urgency: Urgency,
    pub suggested_title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordRule {
    pub category: Category,
    pub keywords: Vec<String>,
    pub confidence: f64,
    pub title: String,
    pub urgency: Urgency,
    #[serde(default)]
    pub escalate_on: Vec<String>,
    pub escalated_urgency: Option<Urgency>,
}

#[derive(Debug, Clone, Deserialize)]
struct KeywordRulesFile {
    rules: Vec<KeywordRule>,
}

#[derive(Debug, Clone)]
pub struct KeywordRules {
    pub rules: Vec<KeywordRule>,
}

impl KeywordRules {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let file: KeywordRulesFile = serde_yaml::from_str(&raw)?;
        for rule in &file.rules {
            if !(0.0..=1.0).contains(&rule.confidence) {
                bail!("Rule for {} has confidence outside 0..=1", rule.category);
            }
            if rule.keywords.is_empty() {
                bail!("Rule for {} has no keywords", rule.category);
            }
        }
        Ok(Self { rules: file.rules })
    }
}

impl Default for KeywordRules {
    fn default() -> Self {
        Self {
            rules: vec![
                rule(
                    Category::Roads,
                    &["pothole", "road", "street", "pavement", "asphalt", "crack", "bump"],
                    0.85,
                    "Road Issue Detected",
                    Urgency::Medium,
                    &["large", "deep"],
                    Urgency::High,
                ),
                rule(
                    Category::Water,
                    &["water", "pipe", "leak", "burst", "flood", "drain", "sewer"],
                    0.85,
                    "Water Infrastructure Issue",
                    Urgency::High,
                    &["burst", "flood"],
                    Urgency::Critical,
                ),
                rule(
                    Category::Electricity,
                    &["light", "electric", "power", "wire", "pole", "lamp"],
                    0.80,
                    "Electrical Issue",
                    Urgency::Medium,
                    &["down", "broken"],
                    Urgency::High,
                ),
                rule(
                    Category::Garbage,
                    &["garbage", "trash", "waste", "dump", "litter", "rubbish"],
                    0.80,
                    "Waste Management Issue",
                    Urgency::Low,
                    &["pile", "overflow"],
                    Urgency::Medium,
                ),
            ],
        }
    }
}

fn rule(
    category: Category,
    keywords: &[&str],
    confidence: f64,
    title: &str,
    urgency: Urgency,
    escalate_on: &[&str],
    escalated: Urgency,
) -> KeywordRule {
    KeywordRule {
        category,
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        confidence,
        title: title.to_string(),
        urgency,
        escalate_on: escalate_on.iter().map(|k| k.to_string()).collect(),
        escalated_urgency: Some(escalated),
    }
}

pub fn suggest_category(description: &str, rules: &KeywordRules) -> CategorySuggestion {
    let lowered = description.to_lowercase();

    let hit = rules.rules.iter().find(|rule| {
        rule.keywords
            .iter()
            .any(|keyword| lowered.contains(&keyword.to_lowercase()))
    });

    let Some(rule) = hit else {
        debug!("no category keyword matched");
        return CategorySuggestion {
            category: Category::Other,
            confidence: 0.5,
            urgency: Urgency::Medium,
            suggested_title: "Community Issue".to_string(),
        };
    };

    let escalate = rule
        .escalate_on
        .iter()
        .any(|word| lowered.contains(&word.to_lowercase()));
    let urgency = match (escalate, rule.escalated_urgency) {
        (true, Some(escalated)) => escalated,
        _ => rule.urgency,
    };

    debug!(category = %rule.category, "category keyword matched");
    CategorySuggestion {
        category: rule.category.clone(),
        confidence: rule.confidence,
        urgency,
        suggested_title: rule.title.clone(),
    }
}
