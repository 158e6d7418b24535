use crate::breakpoints::builtin::DEFAULT_PRESET;
use crate::cluster::DEFAULT_TRANSMISSION_THRESHOLD;
use crate::error::AmrError;
use crate::risk::{RiskThresholds, RiskWeighting};
use crate::stats::rate::{z_score, IntervalMethod, RateOptions};
use crate::stats::ChangePointOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options for one surveillance run. Every field has a default, so a
/// configuration file only needs the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Breakpoint table version id, e.g. "eucast-14".
    pub standard_version: String,
    pub seasonal_period: usize,
    pub cluster_threshold: f64,
    pub min_cluster_size: usize,
    pub confidence_level: f64,
    pub interval_method: IntervalMethod,
    pub change_point_multiplier: f64,
    /// Defaults to the seasonal period.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_point_window: Option<usize>,
    pub risk_weighting: RiskWeighting,
    pub risk_thresholds: RiskThresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            standard_version: DEFAULT_PRESET.to_string(),
            seasonal_period: 12,
            cluster_threshold: DEFAULT_TRANSMISSION_THRESHOLD,
            min_cluster_size: 1,
            confidence_level: 0.95,
            interval_method: IntervalMethod::Wald,
            change_point_multiplier: 3.0,
            change_point_window: None,
            risk_weighting: RiskWeighting::default(),
            risk_thresholds: RiskThresholds::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), AmrError> {
        if self.standard_version.trim().is_empty() {
            return Err(AmrError::ConfigInvalid(
                "standard_version must not be empty".into(),
            ));
        }
        if self.seasonal_period < 2 {
            return Err(AmrError::ConfigInvalid(format!(
                "seasonal_period must be at least 2, got {}",
                self.seasonal_period
            )));
        }
        if !self.cluster_threshold.is_finite() || self.cluster_threshold < 0.0 {
            return Err(AmrError::ConfigInvalid(format!(
                "cluster_threshold must be finite and non-negative, got {}",
                self.cluster_threshold
            )));
        }
        if self.min_cluster_size == 0 {
            return Err(AmrError::ConfigInvalid(
                "min_cluster_size must be at least 1".into(),
            ));
        }
        z_score(self.confidence_level)
            .map_err(|e| AmrError::ConfigInvalid(format!("confidence_level: {e}")))?;
        if !self.change_point_multiplier.is_finite() || self.change_point_multiplier <= 0.0 {
            return Err(AmrError::ConfigInvalid(format!(
                "change_point_multiplier must be positive, got {}",
                self.change_point_multiplier
            )));
        }
        if matches!(self.change_point_window, Some(w) if w < 2) {
            return Err(AmrError::ConfigInvalid(
                "change_point_window must be at least 2".into(),
            ));
        }
        self.risk_thresholds.validate()
    }

    pub fn rate_options(&self) -> RateOptions {
        RateOptions {
            confidence_level: self.confidence_level,
            method: self.interval_method,
        }
    }

    pub fn change_point_options(&self) -> ChangePointOptions {
        ChangePointOptions {
            window: self.change_point_window.unwrap_or(self.seasonal_period),
            multiple: self.change_point_multiplier,
        }
    }
}

/// Load and validate an analysis configuration from a JSON file.
pub fn load_config(path: &Path) -> Result<AnalysisConfig, AmrError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AmrError::ConfigInvalid(format!("{}: {e}", path.display()))
    })?;
    let config: AnalysisConfig = serde_json::from_str(&content)
        .map_err(|e| AmrError::ConfigInvalid(format!("{}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}
