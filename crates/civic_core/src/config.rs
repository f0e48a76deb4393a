use anyhow::{Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Tunables for duplicate detection and priority scoring. Every field has a
/// default, so an empty or missing file yields the stock behavior.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub duplicates: DuplicateConfig,
    pub priority: PriorityConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DuplicateConfig {
    pub distance_threshold_m: f64,
    pub close_location_m: f64,
    pub text_similarity_threshold: f64,
    pub warn_threshold: f64,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            distance_threshold_m: 50.0,
            close_location_m: 20.0,
            text_similarity_threshold: 0.6,
            warn_threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    pub upvote_saturation: f64,
    pub age_saturation_days: f64,
    pub location_score: f64,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            upvote_saturation: 50.0,
            age_saturation_days: 30.0,
            location_score: 5.0,
        }
    }
}

impl TriageConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: TriageConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let dup = &self.duplicates;
        if !(dup.distance_threshold_m > 0.0) {
            bail!("duplicates.distance_threshold_m must be positive");
        }
        if !(0.0..=dup.distance_threshold_m).contains(&dup.close_location_m) {
            bail!("duplicates.close_location_m must lie within the distance threshold");
        }
        if !(0.0..=1.0).contains(&dup.text_similarity_threshold) {
            bail!("duplicates.text_similarity_threshold must be between 0 and 1");
        }
        if !(0.0..=1.0).contains(&dup.warn_threshold) {
            bail!("duplicates.warn_threshold must be between 0 and 1");
        }

        let pri = &self.priority;
        if !(pri.upvote_saturation > 0.0) {
            bail!("priority.upvote_saturation must be positive");
        }
        if !(pri.age_saturation_days > 0.0) {
            bail!("priority.age_saturation_days must be positive");
        }
        if !(0.0..=10.0).contains(&pri.location_score) {
            bail!("priority.location_score must be between 0 and 10");
        }
        Ok(())
    }
}
