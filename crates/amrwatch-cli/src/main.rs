mod commands;
mod output;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "amrwatch",
    version,
    about = "Antimicrobial resistance surveillance: breakpoints, rates, trends and transmission clusters"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Breakpoint table and analysis configuration selection, shared by the
/// commands that interpret isolates.
#[derive(clap::Args)]
struct TableArgs {
    /// Analysis configuration file (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Breakpoint table version (e.g., "eucast-14", "clsi-34"); overrides the config
    #[arg(short, long, value_name = "ID")]
    standard: Option<String>,

    /// Custom breakpoint table file (JSON); overrides --standard
    #[arg(short, long, value_name = "FILE")]
    breakpoints: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interpret isolate results into S/I/R calls
    Interpret {
        /// Path to isolates JSON file
        input_file: PathBuf,

        #[command(flatten)]
        table: TableArgs,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Show the reasoning behind every call
        #[arg(long)]
        reasons: bool,
    },
    /// Resistance rates per organism, antibiotic and period
    Rates {
        /// Path to isolates JSON file
        input_file: PathBuf,

        #[command(flatten)]
        table: TableArgs,

        /// Period bucket: year (default), quarter or month
        #[arg(short, long, default_value = "year")]
        granularity: String,

        /// Also list combinations whose mean rate is at least this percentage
        #[arg(long, value_name = "PCT")]
        priority: Option<f64>,

        /// Minimum number of periods for a priority listing
        #[arg(long, default_value_t = 3)]
        min_points: usize,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Full surveillance report for a date window
    Report {
        /// Path to isolates JSON file
        input_file: PathBuf,

        #[command(flatten)]
        table: TableArgs,

        /// First day of the window (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last day of the window (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,

        /// Pairwise genetic distances (JSON) for cluster detection
        #[arg(short, long, value_name = "FILE")]
        distances: Option<PathBuf>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Transmission clusters from pairwise distances or aligned sequences
    Cluster {
        /// Path to distances JSON file
        input_file: PathBuf,

        /// Single-linkage distance threshold (SNPs)
        #[arg(short, long, default_value_t = amrwatch_core::cluster::DEFAULT_TRANSMISSION_THRESHOLD)]
        threshold: f64,

        /// Hide clusters smaller than this
        #[arg(long, default_value_t = 1)]
        min_size: usize,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Additive trend/seasonal decomposition of a rate series
    Decompose {
        /// Path to series JSON file ([{"date": ..., "rate": ...}])
        input_file: PathBuf,

        /// Seasonal period in points
        #[arg(short, long, default_value_t = 12)]
        period: usize,

        /// Linearly interpolate interior missing points first
        #[arg(long)]
        interpolate: bool,

        /// Residual-variance multiple that flags a change point
        #[arg(long, default_value_t = 3.0)]
        multiple: f64,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Quadratic extrapolation of yearly resistance rates
    Forecast {
        /// Path to yearly rates JSON file ([{"year": ..., "rate": ...}])
        input_file: PathBuf,

        /// Number of years to forecast
        #[arg(long, default_value_t = 5)]
        horizon: usize,

        /// Confidence level of the prediction interval
        #[arg(long, default_value_t = 0.95)]
        confidence: f64,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Score patient risk factors and assign a tier
    Risk {
        /// Path to patient factors JSON file
        input_file: PathBuf,

        /// Analysis configuration file with risk_weighting / risk_thresholds
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Stewardship intervention scenarios
    Stewardship {
        #[command(subcommand)]
        action: StewardshipAction,
    },
    /// Manage and inspect breakpoint tables
    Breakpoints {
        #[command(subcommand)]
        action: BreakpointsAction,
    },
}

#[derive(Subcommand)]
enum StewardshipAction {
    /// List preset interventions
    List,
    /// Project usage and resistance under an intervention
    Simulate {
        /// Intervention name (see `stewardship list`)
        name: String,

        /// Years to simulate
        #[arg(long, default_value_t = 5)]
        years: u32,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// First-year cost-benefit of an intervention
    Cost {
        /// Intervention name (see `stewardship list`)
        name: String,

        /// Cost of one bed-day
        #[arg(long, default_value = "1500")]
        bed_cost: Decimal,

        /// Average length of stay per infection, in days
        #[arg(long, default_value = "5")]
        length_of_stay: Decimal,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Three-year comparison of all preset interventions
    Compare {
        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
}

#[derive(Subcommand)]
enum BreakpointsAction {
    /// List embedded breakpoint tables
    List,
    /// Print a breakpoint table
    Explain {
        /// Table id (e.g., "eucast-14")
        id: String,
    },
    /// Print the JSON schema with field descriptions and example
    Schema,
    /// Validate a custom breakpoint table file
    Validate {
        /// Path to JSON breakpoint table
        file: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Interpret {
            input_file,
            table,
            output,
            reasons,
        } => commands::interpret::run(&input_file, &table, &output, reasons),
        Commands::Rates {
            input_file,
            table,
            granularity,
            priority,
            min_points,
            output,
        } => commands::rates::run(&input_file, &table, &granularity, priority, min_points, &output),
        Commands::Report {
            input_file,
            table,
            from,
            to,
            distances,
            output,
        } => commands::report::run(&input_file, &table, from, to, distances.as_deref(), &output),
        Commands::Cluster {
            input_file,
            threshold,
            min_size,
            output,
        } => commands::analyze::cluster(&input_file, threshold, min_size, &output),
        Commands::Decompose {
            input_file,
            period,
            interpolate,
            multiple,
            output,
        } => commands::analyze::decompose(&input_file, period, interpolate, multiple, &output),
        Commands::Forecast {
            input_file,
            horizon,
            confidence,
            output,
        } => commands::analyze::forecast(&input_file, horizon, confidence, &output),
        Commands::Risk {
            input_file,
            config,
            output,
        } => commands::analyze::risk(&input_file, config.as_deref(), &output),
        Commands::Stewardship { action } => match action {
            StewardshipAction::List => commands::stewardship::list(),
            StewardshipAction::Simulate {
                name,
                years,
                output,
            } => commands::stewardship::simulate(&name, years, &output),
            StewardshipAction::Cost {
                name,
                bed_cost,
                length_of_stay,
                output,
            } => commands::stewardship::cost(&name, bed_cost, length_of_stay, &output),
            StewardshipAction::Compare { output } => commands::stewardship::compare(&output),
        },
        Commands::Breakpoints { action } => match action {
            BreakpointsAction::List => commands::breakpoints::list(),
            BreakpointsAction::Explain { id } => commands::breakpoints::explain(&id),
            BreakpointsAction::Schema => commands::breakpoints::schema(),
            BreakpointsAction::Validate { file } => commands::breakpoints::validate(&file),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
