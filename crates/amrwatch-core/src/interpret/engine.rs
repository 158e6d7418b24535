use crate::breakpoints::schema::{BreakpointEntry, BreakpointTable};
use crate::error::AmrError;
use crate::interpret::outcome::{AppliedBreakpoint, InterpretedCall, IsolateInterpretation};
use crate::model::{Isolate, MeasuredValue, SusceptibilityCall};
use crate::parsing::{normalize_antibiotic, normalize_organism};
use rust_decimal::Decimal;
use tracing::debug;

/// Interpret a measured value for an organism/antibiotic pair.
///
/// Names are normalized before lookup. A missing breakpoint yields
/// `NotEstablished`, which is a valid outcome rather than an error.
pub fn interpret(
    table: &BreakpointTable,
    organism: &str,
    antibiotic: &str,
    value: Decimal,
) -> SusceptibilityCall {
    match table.lookup(&normalize_organism(organism), &normalize_antibiotic(antibiotic)) {
        Some(entry) => categorize(value, entry),
        None => SusceptibilityCall::NotEstablished,
    }
}

fn categorize(value: Decimal, entry: &BreakpointEntry) -> SusceptibilityCall {
    if value <= entry.susceptible_max {
        SusceptibilityCall::Susceptible
    } else if value >= entry.resistant_min {
        SusceptibilityCall::Resistant
    } else {
        SusceptibilityCall::Intermediate
    }
}

type Classifier =
    fn(Decimal, &str, &BreakpointEntry, &str) -> (SusceptibilityCall, String, bool);

/// Interpret one laboratory result, with reasoning.
///
/// `organism` must already be a canonical key.
pub fn interpret_value(
    table: &BreakpointTable,
    organism: &str,
    raw_antibiotic: &str,
    value: &MeasuredValue,
) -> InterpretedCall {
    let antibiotic = normalize_antibiotic(raw_antibiotic);

    let (classify, bound): (Classifier, Decimal) = match value {
        MeasuredValue::Reported(call) => return reported_call(antibiotic, raw_antibiotic, *call),
        MeasuredValue::Mic(v) => (classify_on_scale, *v),
        MeasuredValue::AtMost(v) => (classify_at_most, *v),
        MeasuredValue::Above(v) => (classify_above, *v),
    };

    let entry = match table.lookup(organism, &antibiotic) {
        Some(entry) => entry,
        None => {
            return InterpretedCall {
                reason: format!(
                    "{}: no {} breakpoint for {} -> not established",
                    raw_antibiotic,
                    table.label(),
                    organism
                ),
                antibiotic,
                raw_name: raw_antibiotic.to_string(),
                value: value.clone(),
                call: SusceptibilityCall::NotEstablished,
                uncertain: false,
                breakpoint: None,
            };
        }
    };

    let unit = table.unit_for(entry).to_string();
    let (call, reason, uncertain) = classify(bound, raw_antibiotic, entry, &unit);

    InterpretedCall {
        antibiotic,
        raw_name: raw_antibiotic.to_string(),
        value: value.clone(),
        call,
        reason,
        uncertain,
        breakpoint: Some(AppliedBreakpoint {
            susceptible_max: entry.susceptible_max,
            resistant_min: entry.resistant_min,
            unit,
        }),
    }
}

/// Categorical calls from the laboratory are kept as reported.
fn reported_call(
    antibiotic: String,
    raw_antibiotic: &str,
    call: SusceptibilityCall,
) -> InterpretedCall {
    InterpretedCall {
        antibiotic,
        raw_name: raw_antibiotic.to_string(),
        value: MeasuredValue::Reported(call),
        call,
        reason: format!("{}: reported by laboratory as {}", raw_antibiotic, call),
        uncertain: false,
        breakpoint: None,
    }
}

fn classify_on_scale(
    value: Decimal,
    raw_name: &str,
    entry: &BreakpointEntry,
    unit: &str,
) -> (SusceptibilityCall, String, bool) {
    let call = categorize(value, entry);
    let reason = match call {
        SusceptibilityCall::Susceptible => format!(
            "{}: {} {} <= S:{} -> {}",
            raw_name, value, unit, entry.susceptible_max, call
        ),
        SusceptibilityCall::Resistant => format!(
            "{}: {} {} >= R:{} -> {}",
            raw_name, value, unit, entry.resistant_min, call
        ),
        _ => format!(
            "{}: {} {} > S:{} but < R:{} -> {}",
            raw_name, value, unit, entry.susceptible_max, entry.resistant_min, call
        ),
    };
    (call, reason, false)
}

/// Off-scale low. If the bound is within the susceptible range the call is
/// certain; otherwise the true value may be lower and the bound's category is
/// reported as an uncertain worst case.
fn classify_at_most(
    bound: Decimal,
    raw_name: &str,
    entry: &BreakpointEntry,
    unit: &str,
) -> (SusceptibilityCall, String, bool) {
    if bound <= entry.susceptible_max {
        let call = SusceptibilityCall::Susceptible;
        return (
            call,
            format!(
                "{}: <={} {}, bound within S:{} -> {}",
                raw_name, bound, unit, entry.susceptible_max, call
            ),
            false,
        );
    }

    let call = categorize(bound, entry);
    (
        call,
        format!(
            "{}: <={} {}, bound above S:{} -> {} (uncertain)",
            raw_name, bound, unit, entry.susceptible_max, call
        ),
        true,
    )
}

/// Off-scale high. A bound at or above the resistant threshold is certain;
/// otherwise the value is escalated one category and flagged uncertain.
fn classify_above(
    bound: Decimal,
    raw_name: &str,
    entry: &BreakpointEntry,
    unit: &str,
) -> (SusceptibilityCall, String, bool) {
    if bound >= entry.resistant_min {
        let call = SusceptibilityCall::Resistant;
        return (
            call,
            format!(
                "{}: >{} {}, bound at or above R:{} -> {}",
                raw_name, bound, unit, entry.resistant_min, call
            ),
            false,
        );
    }

    let call = categorize(bound, entry).escalate();
    (
        call,
        format!(
            "{}: >{} {}, bound below R:{} -> {} (uncertain)",
            raw_name, bound, unit, entry.resistant_min, call
        ),
        true,
    )
}

/// Interpret every result recorded on an isolate.
///
/// Results recorded under several aliases of one antibiotic are kept once.
/// Aliases that disagree on the call are rejected.
pub fn interpret_isolate(
    isolate: &Isolate,
    table: &BreakpointTable,
) -> Result<IsolateInterpretation, AmrError> {
    let organism = normalize_organism(&isolate.organism);

    let mut calls: Vec<InterpretedCall> = Vec::with_capacity(isolate.results.len());
    for (raw_name, value) in &isolate.results {
        let call = interpret_value(table, &organism, raw_name, value);
        match calls.iter().find(|c| c.antibiotic == call.antibiotic) {
            Some(kept) if kept.call != call.call => {
                return Err(AmrError::Validation(format!(
                    "isolate '{}': '{}' ({}) and '{}' ({}) are both {} but disagree",
                    isolate.id, kept.raw_name, kept.value, call.raw_name, call.value, call.antibiotic
                )));
            }
            Some(kept) => {
                debug!(
                    isolate = %isolate.id,
                    kept = %kept.raw_name,
                    dropped = %call.raw_name,
                    "duplicate antibiotic result"
                );
            }
            None => calls.push(call),
        }
    }

    let mut not_established: Vec<String> = calls
        .iter()
        .filter(|c| c.call == SusceptibilityCall::NotEstablished)
        .map(|c| c.antibiotic.clone())
        .collect();
    not_established.sort();
    not_established.dedup();

    if !not_established.is_empty() {
        debug!(
            isolate = %isolate.id,
            organism = %organism,
            missing = ?not_established,
            "no breakpoint for some antibiotics"
        );
    }

    Ok(IsolateInterpretation {
        isolate_id: isolate.id.clone(),
        organism,
        raw_organism: isolate.organism.clone(),
        calls,
        not_established,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoints::schema::BreakpointEntry;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn make_table() -> BreakpointTable {
        BreakpointTable {
            name: "Test".into(),
            standard: "TEST".into(),
            version: "1.0".into(),
            description: None,
            unit: "mg/L".into(),
            entries: vec![
                BreakpointEntry {
                    organism: "escherichia_coli".into(),
                    antibiotic: "ciprofloxacin".into(),
                    susceptible_max: dec!(0.25),
                    resistant_min: dec!(1),
                    unit: None,
                    note: None,
                },
                BreakpointEntry {
                    organism: "escherichia_coli".into(),
                    antibiotic: "meropenem".into(),
                    susceptible_max: dec!(2),
                    resistant_min: dec!(16),
                    unit: None,
                    note: None,
                },
            ],
        }
    }

    #[test]
    fn test_susceptible_at_boundary() {
        let t = make_table();
        assert_eq!(
            interpret(&t, "E. coli", "Ciprofloxacin", dec!(0.25)),
            SusceptibilityCall::Susceptible
        );
    }

    #[test]
    fn test_intermediate_between_thresholds() {
        let t = make_table();
        assert_eq!(
            interpret(&t, "E. coli", "CIP", dec!(0.5)),
            SusceptibilityCall::Intermediate
        );
    }

    #[test]
    fn test_resistant_at_boundary() {
        let t = make_table();
        assert_eq!(
            interpret(&t, "escherichia_coli", "ciprofloxacin", dec!(1)),
            SusceptibilityCall::Resistant
        );
    }

    #[test]
    fn test_missing_entry_not_established() {
        let t = make_table();
        assert_eq!(
            interpret(&t, "X", "Y", dec!(4)),
            SusceptibilityCall::NotEstablished
        );
    }

    #[test]
    fn test_at_most_within_susceptible_is_certain() {
        let t = make_table();
        let c = interpret_value(
            &t,
            "escherichia_coli",
            "Meropenem",
            &MeasuredValue::AtMost(dec!(0.125)),
        );
        assert_eq!(c.call, SusceptibilityCall::Susceptible);
        assert!(!c.uncertain);
    }

    #[test]
    fn test_at_most_above_susceptible_is_uncertain() {
        let t = make_table();
        let c = interpret_value(
            &t,
            "escherichia_coli",
            "Ciprofloxacin",
            &MeasuredValue::AtMost(dec!(0.5)),
        );
        assert_eq!(c.call, SusceptibilityCall::Intermediate);
        assert!(c.uncertain);
        assert!(c.reason.contains("uncertain"));
    }

    #[test]
    fn test_above_resistant_is_certain() {
        let t = make_table();
        let c = interpret_value(
            &t,
            "escherichia_coli",
            "Ciprofloxacin",
            &MeasuredValue::Above(dec!(4)),
        );
        assert_eq!(c.call, SusceptibilityCall::Resistant);
        assert!(!c.uncertain);
    }

    #[test]
    fn test_above_below_resistant_escalates() {
        let t = make_table();
        // >0.5: true value is above 0.5, so at least I, possibly R
        let c = interpret_value(
            &t,
            "escherichia_coli",
            "Ciprofloxacin",
            &MeasuredValue::Above(dec!(0.5)),
        );
        assert_eq!(c.call, SusceptibilityCall::Resistant);
        assert!(c.uncertain);

        // >0.25: exceeds S, so at least I
        let c = interpret_value(
            &t,
            "escherichia_coli",
            "Ciprofloxacin",
            &MeasuredValue::Above(dec!(0.25)),
        );
        assert_eq!(c.call, SusceptibilityCall::Intermediate);
        assert!(c.uncertain);
    }

    #[test]
    fn test_reported_call_passes_through() {
        let t = make_table();
        let c = interpret_value(
            &t,
            "escherichia_coli",
            "Colistin",
            &MeasuredValue::Reported(SusceptibilityCall::Resistant),
        );
        assert_eq!(c.call, SusceptibilityCall::Resistant);
        assert!(c.breakpoint.is_none());
    }

    #[test]
    fn test_reason_strings_populated() {
        let t = make_table();
        let c = interpret_value(&t, "escherichia_coli", "Meropenem", &MeasuredValue::Mic(dec!(32)));
        assert_eq!(c.call, SusceptibilityCall::Resistant);
        assert!(c.reason.contains("32"));
        assert!(c.reason.contains("R:16"));
    }

    #[test]
    fn test_interpret_isolate_tracks_not_established() {
        let t = make_table();
        let isolate = Isolate {
            id: "ISO-1".into(),
            organism: "E. coli".into(),
            specimen: None,
            collected: NaiveDate::from_ymd_opt(2023, 5, 2).unwrap(),
            ward: None,
            results: BTreeMap::from([
                ("Ciprofloxacin".to_string(), MeasuredValue::Mic(dec!(2))),
                ("Vancomycin".to_string(), MeasuredValue::Mic(dec!(1))),
            ]),
        };
        let result = interpret_isolate(&isolate, &t).unwrap();
        assert_eq!(result.organism, "escherichia_coli");
        assert_eq!(
            result.call_for("ciprofloxacin").unwrap().call,
            SusceptibilityCall::Resistant
        );
        assert_eq!(result.not_established, vec!["vancomycin".to_string()]);
    }

    #[test]
    fn test_reinterpretation_with_other_table_leaves_isolate_untouched() {
        let old = make_table();
        let mut new = make_table();
        new.version = "2.0".into();
        new.entries[0].susceptible_max = dec!(0.06);
        new.entries[0].resistant_min = dec!(0.5);

        let isolate = Isolate {
            id: "ISO-2".into(),
            organism: "E. coli".into(),
            specimen: None,
            collected: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
            ward: None,
            results: BTreeMap::from([("CIP".to_string(), MeasuredValue::Mic(dec!(0.5)))]),
        };
        let before = interpret_isolate(&isolate, &old).unwrap();
        let after = interpret_isolate(&isolate, &new).unwrap();
        assert_eq!(before.calls[0].call, SusceptibilityCall::Intermediate);
        assert_eq!(after.calls[0].call, SusceptibilityCall::Resistant);
        assert_eq!(isolate.results["CIP"], MeasuredValue::Mic(dec!(0.5)));
    }

    #[test]
    fn test_conflicting_aliases_rejected() {
        let t = make_table();
        let isolate = Isolate {
            id: "ISO-3".into(),
            organism: "E. coli".into(),
            specimen: None,
            collected: NaiveDate::from_ymd_opt(2023, 5, 2).unwrap(),
            ward: None,
            results: BTreeMap::from([
                ("CIP".to_string(), MeasuredValue::Mic(dec!(4))),
                ("Ciprofloxacin".to_string(), MeasuredValue::Mic(dec!(0.06))),
            ]),
        };
        let err = interpret_isolate(&isolate, &t).unwrap_err();
        assert!(matches!(err, AmrError::Validation(_)));
        assert!(err.to_string().contains("ISO-3"));
    }
}
