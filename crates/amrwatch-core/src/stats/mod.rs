pub mod decompose;
pub mod forecast;
pub mod rate;

pub use decompose::{
    decompose, detect_change_points, interpolate_missing, ChangePointOptions, Decomposition,
    TimeSeriesPoint, TrendSummary,
};
pub use forecast::{fit_quadratic, forecast, Forecast, ForecastPoint, QuadraticFit};
pub use rate::{
    estimate_rate, pool_estimates, pool_site_rates, z_score, IntervalMethod, PooledRate,
    RateEstimate, RateOptions, SiteRate,
};
