use amrwatch_core::cluster::ClusterSummary;
use amrwatch_core::interpret::InterpretationResult;
use amrwatch_core::report::{PriorityThreat, RateTable, RunOutput};
use amrwatch_core::stats::{Decomposition, Forecast, TrendSummary};
use amrwatch_core::stewardship::{CostBenefit, InterventionComparison, SimulationYear};
use amrwatch_core::trace::TraceWarning;

pub fn print_interpretation(result: &InterpretationResult, reasons: bool) {
    println!("=== {} ===\n", result.table);

    for iso in &result.isolates {
        println!("  {} ({})", iso.isolate_id, iso.organism);

        let width = iso
            .calls
            .iter()
            .map(|c| c.raw_name.len())
            .max()
            .unwrap_or(10);
        for call in &iso.calls {
            let uncertain_marker = if call.uncertain { " (?)" } else { "" };
            println!(
                "    {:<width$}  {:<8} -> {}{}",
                call.raw_name,
                call.value.to_string(),
                call.call.code(),
                uncertain_marker,
                width = width
            );
            if reasons {
                println!("      {}", call.reason);
            }
        }

        if !iso.not_established.is_empty() {
            println!("    No breakpoint: {}", iso.not_established.join(", "));
        }
        println!();
    }
}

pub fn print_rate_table(table: &RateTable) {
    println!("=== {} rates by {} ===\n", table.table, table.granularity);
    println!(
        "  {:<28} {:<26} {:<12} {:>5} {:>5}  {:>6}  {:<16}",
        "Organism", "Antibiotic", "Period", "R", "N", "%R", "CI"
    );
    println!("  {}", "-".repeat(108));
    for row in &table.rows {
        let e = &row.estimate;
        println!(
            "  {:<28} {:<26} {:<12} {:>5} {:>5}  {:>6.1}  [{:.1}, {:.1}]",
            row.key.organism,
            row.key.antibiotic,
            row.key.period.to_string(),
            e.resistant,
            e.total,
            e.percent,
            e.lower,
            e.upper
        );
    }
    println!();
    print_warnings(&table.warnings);
}

pub fn print_threats(threats: &[PriorityThreat], threshold: f64) {
    if threats.is_empty() {
        println!("No combinations with a mean resistance of {threshold}% or more.\n");
        return;
    }
    println!("Priority threats (mean >= {threshold}%):\n");
    for t in threats {
        println!(
            "  {} / {}: mean {:.1}%, max {:.1}% over {} periods",
            t.organism, t.antibiotic, t.mean_percent, t.max_percent, t.data_points
        );
    }
    println!();
}

pub fn print_run(out: &RunOutput) {
    println!("=== {} surveillance, {} ===\n", out.table, out.window);

    for report in &out.reports {
        let e = &report.resistance.estimate;
        println!("  {} / {}", report.key.organism, report.key.antibiotic);
        println!(
            "    Resistance: {:.1}% ({} of {}), {:.0}% CI [{:.1}, {:.1}]",
            e.percent,
            e.resistant,
            e.total,
            e.confidence_level * 100.0,
            e.lower,
            e.upper
        );
        if report.resistance.not_established > 0 || report.resistance.uncertain > 0 {
            println!(
                "    Not established: {}, uncertain: {}",
                report.resistance.not_established, report.resistance.uncertain
            );
        }
        if let Some(trend) = &report.trend {
            print_trend_summary(&trend.summary, "    ");
            if !trend.change_points.is_empty() {
                let dates: Vec<String> = trend.change_points.iter().map(|d| d.to_string()).collect();
                println!("    Change-point candidates: {}", dates.join(", "));
            }
        }
        if let Some(clusters) = &report.clusters {
            let multi: Vec<&ClusterSummary> =
                clusters.clusters.iter().filter(|c| c.size > 1).collect();
            println!(
                "    Clusters: {} linked group(s) among {} resistant isolate(s)",
                multi.len(),
                clusters.isolates
            );
            for c in multi {
                println!("      [{}] {}", c.size, c.members.join(", "));
            }
        }
        println!();
    }

    print_warnings(&out.trace.warnings);
}

pub fn print_clusters(clusters: &[ClusterSummary], threshold: f64) {
    println!("Clusters at threshold {threshold}:\n");
    for (i, c) in clusters.iter().enumerate() {
        println!(
            "  #{:<3} size {:<4} max link {:<6} {}",
            i + 1,
            c.size,
            c.max_link_distance,
            c.members.join(", ")
        );
    }
    println!();
}

fn print_trend_summary(summary: &TrendSummary, indent: &str) {
    println!(
        "{indent}Trend: {:+.3} per step, seasonal amplitude {:.2}",
        summary.slope, summary.seasonal_amplitude
    );
}

pub fn print_decomposition(d: &Decomposition, change_points: &[usize]) {
    print_trend_summary(&d.summary(), "");
    println!();
    println!(
        "  {:<12} {:>9} {:>9} {:>9} {:>9}",
        "Date", "Observed", "Trend", "Seasonal", "Residual"
    );
    let fmt = |v: Option<f64>| v.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".into());
    for i in 0..d.observed.len() {
        let marker = if change_points.contains(&i) { "  *" } else { "" };
        println!(
            "  {:<12} {:>9.2} {:>9} {:>9.2} {:>9}{}",
            d.dates[i].to_string(),
            d.observed[i],
            fmt(d.trend[i]),
            d.seasonal[i],
            fmt(d.residual[i]),
            marker
        );
    }
    println!();
    if !change_points.is_empty() {
        println!("  * change-point candidate\n");
    }
}

pub fn print_forecast(f: &Forecast) {
    println!(
        "Quadratic fit over {} points (MSE {:.3})\n",
        f.fit.n, f.fit.mse
    );
    println!(
        "  {:<8} {:>9}  {:.0}% interval",
        "x",
        "Predicted",
        f.confidence_level * 100.0
    );
    for p in &f.points {
        println!(
            "  {:<8} {:>8.1}%  [{:.1}, {:.1}]",
            p.x, p.predicted, p.lower, p.upper
        );
    }
    println!();
}

pub fn print_risk(score: u32, tier: Option<&str>) {
    println!("Risk score: {score}");
    println!("Tier: {}", tier.unwrap_or("(below all thresholds)"));
}

pub fn print_simulation(name: &str, path: &[SimulationYear]) {
    println!("=== {name} ===\n");
    println!("  {:<6} {:>10} {:>12}", "Year", "Usage", "Resistance");
    for y in path {
        println!(
            "  {:<6} {:>10.1} {:>11.1}%",
            y.year, y.usage_rate, y.resistance_rate
        );
    }
    println!();
}

pub fn print_cost_benefit(name: &str, cb: &CostBenefit) {
    println!("=== {name} ===\n");
    println!("  Annual savings:       {}", cb.annual_savings);
    println!("  Implementation cost:  {}", cb.implementation_cost);
    println!("  Annual cost:          {}", cb.annual_cost);
    println!("  Net benefit (year 1): {}", cb.net_benefit_year1);
    println!("  ROI (year 1):         {}%", cb.roi_year1_pct);
    println!("  Payback:              {} years", cb.payback_years);
    println!();
}

pub fn print_comparison(rows: &[InterventionComparison]) {
    let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(12);
    println!(
        "  {:<width$}  {:>11}  {:>8}  {:>14}  {:>8}",
        "Intervention",
        "Resistance",
        "Usage",
        "Savings/yr",
        "Payback",
        width = width
    );
    for r in rows {
        println!(
            "  {:<width$}  {:>10.1}%  {:>8.1}  {:>14}  {:>8}",
            r.name,
            r.resistance_rate_end,
            r.usage_rate_end,
            r.annual_savings.to_string(),
            r.payback_years.to_string(),
            width = width
        );
    }
    println!();
}

fn print_warnings(warnings: &[TraceWarning]) {
    if warnings.is_empty() {
        return;
    }
    println!("Warnings:");
    for w in warnings {
        match &w.key {
            Some(key) => println!("  - {key}: {}", w.message),
            None => println!("  - {}", w.message),
        }
    }
    println!();
}
