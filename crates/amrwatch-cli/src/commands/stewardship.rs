use amrwatch_core::error::AmrError;
use amrwatch_core::stewardship::{
    compare as compare_interventions, cost_benefit, find_intervention, preset_interventions,
    simulate as simulate_intervention, Baseline, HospitalParams,
};
use rust_decimal::Decimal;

use crate::commands::is_json;
use crate::output;

pub fn list() -> Result<(), AmrError> {
    println!("Preset stewardship interventions:\n");
    for i in preset_interventions()? {
        println!("  {}", i.name);
        println!(
            "    usage -{}%, resistance impact {}, implementation {}, annual {}, {} infections prevented/yr",
            i.usage_reduction_pct,
            i.resistance_impact,
            i.implementation_cost,
            i.annual_cost,
            i.infections_prevented
        );
        println!();
    }
    Ok(())
}

pub fn simulate(name: &str, years: u32, output_format: &str) -> Result<(), AmrError> {
    let presets = preset_interventions()?;
    let intervention = find_intervention(&presets, name)?;
    let path = simulate_intervention(intervention, years, &Baseline::default())?;

    if is_json(output_format) {
        output::json::print(&path)?;
    } else {
        output::table::print_simulation(&intervention.name, &path);
    }
    Ok(())
}

pub fn cost(
    name: &str,
    bed_cost: Decimal,
    length_of_stay: Decimal,
    output_format: &str,
) -> Result<(), AmrError> {
    let presets = preset_interventions()?;
    let intervention = find_intervention(&presets, name)?;
    let hospital = HospitalParams {
        daily_bed_cost: bed_cost,
        avg_length_of_stay_days: length_of_stay,
    };
    let cb = cost_benefit(intervention, &hospital)?;

    if is_json(output_format) {
        output::json::print(&cb)?;
    } else {
        output::table::print_cost_benefit(&intervention.name, &cb);
    }
    Ok(())
}

pub fn compare(output_format: &str) -> Result<(), AmrError> {
    let presets = preset_interventions()?;
    let rows = compare_interventions(&presets, &Baseline::default(), &HospitalParams::default())?;

    if is_json(output_format) {
        output::json::print(&rows)?;
    } else {
        output::table::print_comparison(&rows);
    }
    Ok(())
}
