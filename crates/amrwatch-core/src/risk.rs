//! Weighted risk-factor scoring and tier stratification.
//!
//! Weights and tier cutoffs are configuration. The scorer never mutates them
//! and holds no cutoffs of its own.

use crate::error::AmrError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Observed state of one patient or institutional factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactorState {
    Present(bool),
    Level(String),
}

pub type PatientFactors = BTreeMap<String, FactorState>;

/// Points contributed by a factor: a flat value when a boolean factor is
/// present, or a value per categorical level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactorWeight {
    Flag(u32),
    Levels(BTreeMap<String, u32>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskWeighting {
    pub factors: BTreeMap<String, FactorWeight>,
}

impl Default for RiskWeighting {
    fn default() -> Self {
        let factors = [
            ("age_over_65", 1),
            ("recent_hospitalization", 2),
            ("recent_antibiotic_use", 1),
        ]
        .into_iter()
        .map(|(name, points)| (name.to_string(), FactorWeight::Flag(points)))
        .collect();
        Self { factors }
    }
}

/// Weighted sum of the factors present. Factors absent from the weighting
/// are ignored; a state of the wrong shape for its weight is an error.
pub fn score(factors: &PatientFactors, weighting: &RiskWeighting) -> Result<u32, AmrError> {
    let mut total: u32 = 0;
    for (name, state) in factors {
        let Some(weight) = weighting.factors.get(name) else {
            tracing::debug!(factor = %name, "ignoring unweighted risk factor");
            continue;
        };
        let points = match (weight, state) {
            (FactorWeight::Flag(p), FactorState::Present(true)) => *p,
            (FactorWeight::Flag(_), FactorState::Present(false)) => 0,
            (FactorWeight::Levels(levels), FactorState::Level(level)) => {
                *levels.get(level).ok_or_else(|| {
                    AmrError::Validation(format!(
                        "factor '{name}' has no weight for level '{level}' (known: {})",
                        levels.keys().cloned().collect::<Vec<_>>().join(", ")
                    ))
                })?
            }
            (FactorWeight::Flag(_), FactorState::Level(level)) => {
                return Err(AmrError::Validation(format!(
                    "factor '{name}' is a yes/no factor, got level '{level}'"
                )))
            }
            (FactorWeight::Levels(_), FactorState::Present(v)) => {
                return Err(AmrError::Validation(format!(
                    "factor '{name}' expects a level, got {v}"
                )))
            }
        };
        total = total.checked_add(points).ok_or_else(|| {
            AmrError::Validation(format!("risk score overflows at factor '{name}'"))
        })?;
    }
    Ok(total)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskTier {
    pub min_score: u32,
    pub tier: String,
}

/// Ordered score cutoffs. A score falls into the tier with the largest
/// `min_score` not above it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskThresholds {
    pub tiers: Vec<RiskTier>,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            tiers: vec![
                RiskTier {
                    min_score: 0,
                    tier: "low".into(),
                },
                RiskTier {
                    min_score: 1,
                    tier: "medium".into(),
                },
                RiskTier {
                    min_score: 2,
                    tier: "high".into(),
                },
            ],
        }
    }
}

impl RiskThresholds {
    pub fn validate(&self) -> Result<(), AmrError> {
        let mut cutoffs: Vec<u32> = self.tiers.iter().map(|t| t.min_score).collect();
        cutoffs.sort_unstable();
        if cutoffs.windows(2).any(|w| w[0] == w[1]) {
            return Err(AmrError::ConfigInvalid(
                "risk thresholds contain duplicate min_score values".into(),
            ));
        }
        if let Some(t) = self.tiers.iter().find(|t| t.tier.trim().is_empty()) {
            return Err(AmrError::ConfigInvalid(format!(
                "risk tier at min_score {} has no name",
                t.min_score
            )));
        }
        Ok(())
    }

    /// `None` when the score is below every cutoff.
    pub fn stratify(&self, score: u32) -> Option<&str> {
        self.tiers
            .iter()
            .filter(|t| t.min_score <= score)
            .max_by_key(|t| t.min_score)
            .map(|t| t.tier.as_str())
    }
}
