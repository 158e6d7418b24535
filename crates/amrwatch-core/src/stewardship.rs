//! Antimicrobial stewardship scenarios: projected usage and resistance under
//! an intervention, and its first-year cost-benefit.

use crate::error::AmrError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const INTERVENTIONS_JSON: &str = include_str!("../../../breakpoints/interventions.json");

/// Horizon used by [`compare`].
pub const COMPARISON_YEARS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intervention {
    pub name: String,
    /// Usage reduction reached at the end of the simulation, in percent.
    pub usage_reduction_pct: f64,
    /// Relative change in resistance over the simulation (sign ignored).
    pub resistance_impact: f64,
    pub implementation_cost: Decimal,
    pub annual_cost: Decimal,
    pub infections_prevented: u32,
}

impl Intervention {
    pub fn validate(&self) -> Result<(), AmrError> {
        if self.name.trim().is_empty() {
            return Err(AmrError::Validation("intervention name is empty".into()));
        }
        if !(0.0..=100.0).contains(&self.usage_reduction_pct) {
            return Err(AmrError::Validation(format!(
                "'{}': usage reduction {}% outside [0, 100]",
                self.name, self.usage_reduction_pct
            )));
        }
        if !self.resistance_impact.is_finite() {
            return Err(AmrError::Validation(format!(
                "'{}': resistance impact must be finite",
                self.name
            )));
        }
        if self.implementation_cost.is_sign_negative() || self.annual_cost.is_sign_negative() {
            return Err(AmrError::Validation(format!(
                "'{}': costs must be non-negative",
                self.name
            )));
        }
        Ok(())
    }
}

/// Built-in intervention presets.
pub fn preset_interventions() -> Result<Vec<Intervention>, AmrError> {
    let interventions: Vec<Intervention> = serde_json::from_str(INTERVENTIONS_JSON)?;
    for i in &interventions {
        i.validate()?;
    }
    Ok(interventions)
}

/// Case-insensitive lookup by name.
pub fn find_intervention<'a>(
    interventions: &'a [Intervention],
    name: &str,
) -> Result<&'a Intervention, AmrError> {
    interventions
        .iter()
        .find(|i| i.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| {
            AmrError::Validation(format!(
                "unknown intervention '{name}'. Available: {}",
                interventions
                    .iter()
                    .map(|i| i.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Baseline {
    /// Resistance rate at year 0, in percent.
    pub resistance_rate: f64,
    /// Usage index at year 0.
    pub usage_rate: f64,
    /// Years before resistance responds to reduced usage.
    pub resistance_delay_years: u32,
}

impl Default for Baseline {
    fn default() -> Self {
        Self {
            resistance_rate: 30.0,
            usage_rate: 100.0,
            resistance_delay_years: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationYear {
    pub year: u32,
    pub resistance_rate: f64,
    pub usage_rate: f64,
}

/// Year-by-year projection from year 0 to `years`. Usage falls linearly to
/// the full reduction at the last year; resistance holds for the delay
/// period and then falls linearly. Both are floored at zero.
pub fn simulate(
    intervention: &Intervention,
    years: u32,
    baseline: &Baseline,
) -> Result<Vec<SimulationYear>, AmrError> {
    intervention.validate()?;
    if years == 0 {
        return Err(AmrError::Validation(
            "simulation needs at least one year".into(),
        ));
    }

    let horizon = years as f64;
    let reduction = intervention.usage_reduction_pct / 100.0;
    let impact = intervention.resistance_impact.abs();

    Ok((0..=years)
        .map(|year| {
            let t = year as f64;
            let usage = baseline.usage_rate * (1.0 - reduction * t / horizon);
            let resistance = if year > baseline.resistance_delay_years {
                let lagged = (year - baseline.resistance_delay_years) as f64;
                baseline.resistance_rate * (1.0 - impact * lagged / horizon)
            } else {
                baseline.resistance_rate
            };
            SimulationYear {
                year,
                resistance_rate: resistance.max(0.0),
                usage_rate: usage.max(0.0),
            }
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HospitalParams {
    pub daily_bed_cost: Decimal,
    pub avg_length_of_stay_days: Decimal,
}

impl Default for HospitalParams {
    fn default() -> Self {
        Self {
            daily_bed_cost: Decimal::from(1500),
            avg_length_of_stay_days: Decimal::from(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBenefit {
    pub annual_savings: Decimal,
    pub implementation_cost: Decimal,
    pub annual_cost: Decimal,
    pub net_benefit_year1: Decimal,
    /// Net first-year benefit as a percentage of the implementation cost.
    pub roi_year1_pct: Decimal,
    pub payback_years: Decimal,
}

pub fn cost_benefit(
    intervention: &Intervention,
    hospital: &HospitalParams,
) -> Result<CostBenefit, AmrError> {
    intervention.validate()?;

    let bed_days = Decimal::from(intervention.infections_prevented) * hospital.avg_length_of_stay_days;
    let annual_savings = bed_days * hospital.daily_bed_cost;
    let net_benefit_year1 = annual_savings - intervention.annual_cost;

    let roi_year1_pct = (net_benefit_year1 * Decimal::ONE_HUNDRED)
        .checked_div(intervention.implementation_cost)
        .ok_or_else(|| {
            AmrError::Undefined(format!(
                "'{}': ROI over a zero implementation cost",
                intervention.name
            ))
        })?
        .round_dp(2);
    let payback_years = intervention
        .implementation_cost
        .checked_div(annual_savings.max(Decimal::ONE))
        .ok_or_else(|| AmrError::Undefined("payback period overflow".into()))?
        .round_dp(2);

    Ok(CostBenefit {
        annual_savings,
        implementation_cost: intervention.implementation_cost,
        annual_cost: intervention.annual_cost,
        net_benefit_year1,
        roi_year1_pct,
        payback_years,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionComparison {
    pub name: String,
    pub resistance_rate_end: f64,
    pub usage_rate_end: f64,
    pub annual_savings: Decimal,
    pub payback_years: Decimal,
}

/// Outcomes after [`COMPARISON_YEARS`] for each intervention, in input order.
pub fn compare(
    interventions: &[Intervention],
    baseline: &Baseline,
    hospital: &HospitalParams,
) -> Result<Vec<InterventionComparison>, AmrError> {
    interventions
        .iter()
        .map(|i| {
            let path = simulate(i, COMPARISON_YEARS, baseline)?;
            let last = path.last().ok_or_else(|| {
                AmrError::Undefined(format!("'{}': empty simulation", i.name))
            })?;
            let cb = cost_benefit(i, hospital)?;
            Ok(InterventionComparison {
                name: i.name.clone(),
                resistance_rate_end: last.resistance_rate,
                usage_rate_end: last.usage_rate,
                annual_savings: cb.annual_savings,
                payback_years: cb.payback_years,
            })
        })
        .collect()
}
