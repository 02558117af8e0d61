use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{EtlError, Result};

/// Top-level pipeline configuration. Every tunable of the transform stage
/// lives here so thresholds can change without code changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub data: DataConfig,
    pub workweek: WorkweekConfig,
    pub attrition: AttritionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding the four raw CSV exports.
    pub raw_dir: PathBuf,
    /// Directory the processed tables are published to.
    pub processed_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkweekConfig {
    /// Hours in a standard workweek, the baseline for activity percentage.
    pub standard_hours: f64,
    /// Cap on the reported activity percentage.
    pub max_activity_pct: f64,
}

/// Weights of the individual risk components. They are normalized by their
/// sum at scoring time, so they express relative importance only.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub satisfaction: f64,
    pub overwork: f64,
    pub low_productivity: f64,
    pub completion: f64,
    pub on_time: f64,
    pub tenure: f64,
}

/// Neutral fallbacks used when an employee has no data for a component.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NeutralDefaults {
    pub satisfaction: f64,
    pub weekly_hours: f64,
    pub productivity: f64,
    pub completion_rate: f64,
    pub on_time_rate: f64,
}

/// Bucket boundaries for the categorical risk level. A probability exactly
/// on a boundary lands in the lower bucket.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub medium: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AttritionConfig {
    pub weights: RiskWeights,
    /// Average weekly hours above which the overwork component starts rising.
    pub overwork_start_hours: f64,
    /// Hours over the start point at which the overwork component saturates.
    pub overwork_span_hours: f64,
    /// Tenure in days at which the short-tenure component reaches zero.
    pub tenure_ramp_days: i64,
    pub defaults: NeutralDefaults,
    pub thresholds: RiskThresholds,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
        }
    }
}

impl Default for WorkweekConfig {
    fn default() -> Self {
        Self {
            standard_hours: 40.0,
            max_activity_pct: 300.0,
        }
    }
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            satisfaction: 0.35,
            overwork: 0.20,
            low_productivity: 0.10,
            completion: 0.15,
            on_time: 0.10,
            tenure: 0.10,
        }
    }
}

impl Default for NeutralDefaults {
    fn default() -> Self {
        Self {
            satisfaction: 3.5,
            weekly_hours: 40.0,
            productivity: 0.7,
            completion_rate: 0.8,
            on_time_rate: 0.9,
        }
    }
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: 0.4,
            high: 0.7,
        }
    }
}

impl Default for AttritionConfig {
    fn default() -> Self {
        Self {
            weights: RiskWeights::default(),
            overwork_start_hours: 45.0,
            overwork_span_hours: 20.0,
            tenure_ramp_days: 730,
            defaults: NeutralDefaults::default(),
            thresholds: RiskThresholds::default(),
        }
    }
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            workweek: WorkweekConfig::default(),
            attrition: AttritionConfig::default(),
        }
    }
}

impl EtlConfig {
    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist. Environment variables `HR_INSIGHTS_RAW_DIR` and
    /// `HR_INSIGHTS_PROCESSED_DIR` override the data directories either way.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                EtlError::Config(format!("failed to read config file '{}': {}", path.display(), e))
            })?;
            let config: EtlConfig = toml::from_str(&content)?;
            info!(config = %path.display(), "loaded pipeline configuration");
            config
        } else {
            debug!(config = %path.display(), "config file not found, using defaults");
            EtlConfig::default()
        };

        if let Ok(raw_dir) = std::env::var("HR_INSIGHTS_RAW_DIR") {
            config.data.raw_dir = PathBuf::from(raw_dir);
        }
        if let Ok(processed_dir) = std::env::var("HR_INSIGHTS_PROCESSED_DIR") {
            config.data.processed_dir = PathBuf::from(processed_dir);
        }

        config.validate()?;
        Ok(config)
    }

    /// Sanity checks on values that would silently corrupt the scoring.
    pub fn validate(&self) -> Result<()> {
        let t = &self.attrition.thresholds;
        if !(0.0..=1.0).contains(&t.medium) || !(0.0..=1.0).contains(&t.high) {
            return Err(EtlError::Config(
                "risk thresholds must lie in [0, 1]".to_string(),
            ));
        }
        if t.medium > t.high {
            return Err(EtlError::Config(format!(
                "medium risk threshold {} exceeds high threshold {}",
                t.medium, t.high
            )));
        }

        let w = &self.attrition.weights;
        let weights = [
            w.satisfaction,
            w.overwork,
            w.low_productivity,
            w.completion,
            w.on_time,
            w.tenure,
        ];
        if weights.iter().any(|w| *w < 0.0) {
            return Err(EtlError::Config("risk weights must be non-negative".to_string()));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(EtlError::Config("at least one risk weight must be positive".to_string()));
        }

        if !self.workweek.standard_hours.is_finite() || self.workweek.standard_hours <= 0.0 {
            return Err(EtlError::Config(
                "workweek standard_hours must be positive".to_string(),
            ));
        }
        if !self.workweek.max_activity_pct.is_finite() || self.workweek.max_activity_pct < 0.0 {
            return Err(EtlError::Config(
                "workweek max_activity_pct must be non-negative".to_string(),
            ));
        }
        if self.attrition.overwork_span_hours <= 0.0 {
            return Err(EtlError::Config(
                "overwork_span_hours must be positive".to_string(),
            ));
        }
        if self.attrition.tenure_ramp_days <= 0 {
            return Err(EtlError::Config("tenure_ramp_days must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EtlConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let mut config = EtlConfig::default();
        config.attrition.thresholds.medium = 0.9;
        config.attrition.thresholds.high = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: EtlConfig = toml::from_str(
            r#"
            [attrition.thresholds]
            medium = 0.3
            high = 0.6
            "#,
        )
        .unwrap();
        assert!((config.attrition.thresholds.medium - 0.3).abs() < f64::EPSILON);
        assert!((config.workweek.standard_hours - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn negative_activity_cap_is_rejected() {
        // An unchecked negative cap would reach the clamp inside the weekly
        // aggregation and panic there instead of failing at load time.
        let mut config = EtlConfig::default();
        config.workweek.max_activity_pct = -1.0;
        assert!(config.validate().is_err());

        config.workweek.max_activity_pct = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_finite_standard_hours_are_rejected() {
        let mut config = EtlConfig::default();
        config.workweek.standard_hours = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_weight_is_rejected() {
        let mut config = EtlConfig::default();
        config.attrition.weights.overwork = -0.1;
        assert!(config.validate().is_err());
    }
}
