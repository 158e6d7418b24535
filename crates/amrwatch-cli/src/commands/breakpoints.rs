use amrwatch_core::breakpoints::{builtin, load_table, BreakpointRegistry};
use amrwatch_core::error::AmrError;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub fn list() -> Result<(), AmrError> {
    println!("Available breakpoint tables:\n");
    let registry = BreakpointRegistry::with_presets()?;
    for id in registry.ids() {
        let table = registry.get(id)?;
        let default_marker = if id == builtin::DEFAULT_PRESET {
            " [default]"
        } else {
            ""
        };
        println!(
            "  {:<10} {} ({}){}",
            id,
            table.name,
            table.label(),
            default_marker
        );
        if let Some(ref desc) = table.description {
            println!("             {}", desc);
        }
        println!("             {} entries", table.entries.len());
        println!();
    }
    Ok(())
}

pub fn explain(id: &str) -> Result<(), AmrError> {
    let table = builtin::load_preset(id)?;

    println!("{} ({})\n", table.name, table.label());
    if let Some(ref desc) = table.description {
        println!("{}\n", desc);
    }
    println!("A value at or below S is Susceptible, at or above R is Resistant,");
    println!("and anything between is Intermediate. Pairs not listed are");
    println!("reported as not established.\n");

    let mut by_organism: BTreeMap<&str, Vec<_>> = BTreeMap::new();
    for entry in &table.entries {
        by_organism.entry(entry.organism.as_str()).or_default().push(entry);
    }

    let width = table
        .entries
        .iter()
        .map(|e| e.antibiotic.len())
        .max()
        .unwrap_or(20);

    for (organism, entries) in by_organism {
        println!("  {organism}");
        println!(
            "    {:<width$}  {:<8}  {:<8}  Unit",
            "Antibiotic",
            "S <=",
            "R >=",
            width = width
        );
        for entry in entries {
            print!(
                "    {:<width$}  {:<8}  {:<8}  {}",
                entry.antibiotic,
                entry.susceptible_max.to_string(),
                entry.resistant_min.to_string(),
                table.unit_for(entry),
                width = width
            );
            if let Some(ref note) = entry.note {
                print!("  ({note})");
            }
            println!();
        }
        println!();
    }

    Ok(())
}

pub fn schema() -> Result<(), AmrError> {
    print!(
        r#"Breakpoint Table Schema
=======================

A breakpoint table maps (organism, antibiotic) pairs to the MIC thresholds
used by `amrwatch interpret`, `rates` and `report`. Each measured value is
compared against the entry for its isolate's organism and antibiotic.

Fields:
  name          (string, required)  Human-readable name.
  standard      (string, required)  Issuing standard, e.g. "EUCAST" or "CLSI".
  version       (string, required)  Standard version, e.g. "14.0".
  description   (string, optional)  Free text shown by `breakpoints list`.
  unit          (string, optional)  Default unit. Default: "mg/L"
  entries       (array, required)   One object per organism/antibiotic pair:

Entry fields:
  organism         (string, required)  Canonical organism key, lowercase with
                                       underscores (e.g. "escherichia_coli").
  antibiotic       (string, required)  Canonical antibiotic key
                                       (e.g. "ciprofloxacin").
  susceptible_max  (string, required)  Values at or below are Susceptible.
  resistant_min    (string, required)  Values at or above are Resistant.
                                       Must be greater than susceptible_max.
                                       Without an intermediate zone, use the
                                       next dilution step above S.
  unit             (string, optional)  Overrides the table unit.
  note             (string, optional)  Source reference or remark.

Example:
{{
  "name": "Local surveillance breakpoints",
  "standard": "LOCAL",
  "version": "2024.1",
  "unit": "mg/L",
  "entries": [
    {{
      "organism": "escherichia_coli",
      "antibiotic": "ciprofloxacin",
      "susceptible_max": "0.25",
      "resistant_min": "1",
      "note": "R > 0.5"
    }}
  ]
}}

Note: threshold values must be quoted strings, not bare numbers,
to preserve exact decimal precision (e.g., "0.25" not 0.25).
"#
    );
    Ok(())
}

pub fn validate(file: &Path) -> Result<(), AmrError> {
    let table = load_table(file)?;

    println!("Breakpoint table '{}' ({}) is valid.", table.name, table.label());
    println!("  Entries: {}", table.entries.len());

    let organisms: BTreeSet<&str> =
        table.entries.iter().map(|e| e.organism.as_str()).collect();
    println!(
        "  Organisms: {}",
        organisms.into_iter().collect::<Vec<_>>().join(", ")
    );

    let mut warnings = Vec::new();
    for entry in &table.entries {
        let wide = entry
            .susceptible_max
            .checked_mul(Decimal::from(64))
            .map_or(false, |limit| entry.resistant_min > limit);
        if wide {
            warnings.push(format!(
                "{}/{}: R ({}) is more than six dilutions above S ({})",
                entry.organism, entry.antibiotic, entry.resistant_min, entry.susceptible_max
            ));
        }
    }

    if !warnings.is_empty() {
        println!("\nWarnings:");
        for w in &warnings {
            println!("  - {}", w);
        }
    }

    Ok(())
}
