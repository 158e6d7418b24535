use crate::interpret::outcome::{InterpretedCall, IsolateInterpretation};
use crate::model::{MeasuredValue, SusceptibilityCall};
use crate::report::SurveillanceReport;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const TRACE_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceSeverity {
    Important,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceVisibility {
    Always,
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStepType {
    NormalizeOrganism,
    NormalizeAntibiotic,
    ParseValue,
    BreakpointLookup,
    ThresholdCompare,
    RateEstimate,
    TrendDecomposition,
    ClusterDetection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceStep {
    pub step_type: TraceStepType,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceValueKind {
    Measured,
    OffScaleLow,
    OffScaleHigh,
    Reported,
}

/// Audit record of one interpreted laboratory result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub entry_id: String,
    pub isolate_id: String,
    pub organism: String,
    pub raw_name: String,
    pub normalized_name: String,
    pub raw_value: String,
    pub value_kind: TraceValueKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_value: Option<Decimal>,
    /// Breakpoint table the call was made against, e.g. "EUCAST 14.0".
    pub table: String,
    pub call: SusceptibilityCall,
    pub uncertain: bool,
    pub reason: String,
    pub steps: Vec<TraceStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceDecisionTarget {
    Rate,
    Trend,
    Clusters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceDecision {
    pub decision_id: String,
    /// Display form of the surveillance key.
    pub key: String,
    pub target: TraceDecisionTarget,
    pub reason: String,
    pub severity: TraceSeverity,
    pub visibility: TraceVisibility,
    pub steps: Vec<TraceStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceWarning {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub message: String,
    pub severity: TraceSeverity,
    pub visibility: TraceVisibility,
}

impl TraceWarning {
    pub fn for_key(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            message: message.into(),
            severity: TraceSeverity::Important,
            visibility: TraceVisibility::Always,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceBundle {
    pub trace_schema_version: String,
    pub entries: Vec<TraceEntry>,
    pub decisions: Vec<TraceDecision>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<TraceWarning>,
}

impl Default for TraceBundle {
    fn default() -> Self {
        Self {
            trace_schema_version: TRACE_SCHEMA_VERSION.to_string(),
            entries: Vec::new(),
            decisions: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

pub fn build_entry_trace(
    isolate: &IsolateInterpretation,
    entry_idx: usize,
    call: &InterpretedCall,
    table: &str,
) -> TraceEntry {
    let value_kind = match call.value {
        MeasuredValue::Mic(_) => TraceValueKind::Measured,
        MeasuredValue::AtMost(_) => TraceValueKind::OffScaleLow,
        MeasuredValue::Above(_) => TraceValueKind::OffScaleHigh,
        MeasuredValue::Reported(_) => TraceValueKind::Reported,
    };

    let mut steps = vec![
        TraceStep {
            step_type: TraceStepType::NormalizeOrganism,
            message: format!(
                "Normalized '{}' -> '{}'",
                isolate.raw_organism, isolate.organism
            ),
        },
        TraceStep {
            step_type: TraceStepType::NormalizeAntibiotic,
            message: format!("Normalized '{}' -> '{}'", call.raw_name, call.antibiotic),
        },
        TraceStep {
            step_type: TraceStepType::ParseValue,
            message: format!("Read value '{}' as {:?}", call.value, value_kind),
        },
    ];
    match &call.breakpoint {
        Some(bp) => steps.push(TraceStep {
            step_type: TraceStepType::ThresholdCompare,
            message: format!(
                "S <= {} {}, R >= {} {}",
                bp.susceptible_max, bp.unit, bp.resistant_min, bp.unit
            ),
        }),
        None if call.call == SusceptibilityCall::NotEstablished => steps.push(TraceStep {
            step_type: TraceStepType::BreakpointLookup,
            message: format!("No entry in {table} for {} / {}", isolate.organism, call.antibiotic),
        }),
        None => {}
    }

    TraceEntry {
        entry_id: format!("ent_{}_{}", isolate.isolate_id, entry_idx),
        isolate_id: isolate.isolate_id.clone(),
        organism: isolate.organism.clone(),
        raw_name: call.raw_name.clone(),
        normalized_name: call.antibiotic.clone(),
        raw_value: call.value.to_string(),
        value_kind,
        numeric_value: call.value.numeric(),
        table: table.to_string(),
        call: call.call,
        uncertain: call.uncertain,
        reason: call.reason.clone(),
        steps,
    }
}

pub fn build_report_decisions(report: &SurveillanceReport) -> Vec<TraceDecision> {
    let key = report.key.to_string();
    let est = &report.resistance.estimate;
    let mut decisions = vec![TraceDecision {
        decision_id: format!("dec_{}_rate", key),
        key: key.clone(),
        target: TraceDecisionTarget::Rate,
        reason: format!(
            "{} of {} resistant = {:.1}% [{:.1}, {:.1}]",
            est.resistant, est.total, est.percent, est.lower, est.upper
        ),
        severity: TraceSeverity::Important,
        visibility: TraceVisibility::Always,
        steps: vec![TraceStep {
            step_type: TraceStepType::RateEstimate,
            message: format!(
                "{:?} interval at {}% confidence; {} not-established and {} uncertain calls",
                est.method,
                est.confidence_level * 100.0,
                report.resistance.not_established,
                report.resistance.uncertain
            ),
        }],
    }];

    if let Some(trend) = &report.trend {
        decisions.push(TraceDecision {
            decision_id: format!("dec_{}_trend", key),
            key: key.clone(),
            target: TraceDecisionTarget::Trend,
            reason: format!(
                "slope {:+.3} per month, seasonal amplitude {:.2}",
                trend.summary.slope, trend.summary.seasonal_amplitude
            ),
            severity: if trend.change_points.is_empty() {
                TraceSeverity::Info
            } else {
                TraceSeverity::Important
            },
            visibility: TraceVisibility::Auto,
            steps: vec![TraceStep {
                step_type: TraceStepType::TrendDecomposition,
                message: format!(
                    "period {}, {} change-point candidate(s)",
                    trend.decomposition.period,
                    trend.change_points.len()
                ),
            }],
        });
    }

    if let Some(clusters) = &report.clusters {
        let largest = clusters.clusters.first().map(|c| c.size).unwrap_or(0);
        decisions.push(TraceDecision {
            decision_id: format!("dec_{}_clusters", key),
            key,
            target: TraceDecisionTarget::Clusters,
            reason: format!(
                "{} cluster(s) at threshold {}, largest {}",
                clusters.clusters.len(),
                clusters.threshold,
                largest
            ),
            severity: if largest > 1 {
                TraceSeverity::Important
            } else {
                TraceSeverity::Info
            },
            visibility: TraceVisibility::Auto,
            steps: vec![TraceStep {
                step_type: TraceStepType::ClusterDetection,
                message: format!("single linkage over {} resistant isolate(s)", clusters.isolates),
            }],
        });
    }

    decisions
}
