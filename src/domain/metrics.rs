//! Performance metrics over the recorded equity curve.
//!
//! Every metric is computed uniformly per series (strategy, benchmark,
//! basket) and reported as `None` on degenerate input (a single point,
//! zero variance, non-positive initial value) rather than panicking or
//! dividing by zero.

use chrono::NaiveDate;

use super::portfolio::EquityPoint;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const CALENDAR_DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMetrics {
    /// Compound annual growth rate over elapsed calendar days.
    pub cagr: Option<f64>,
    /// Largest peak-to-trough decline, as a positive magnitude.
    pub max_drawdown: Option<f64>,
    /// Mean periodic return over its standard deviation, annualized;
    /// zero risk-free rate.
    pub sharpe_ratio: Option<f64>,
    /// Date of the running maximum immediately preceding the trough.
    pub peak_date: Option<NaiveDate>,
    /// Date of the minimum value inside the worst drawdown.
    pub trough_date: Option<NaiveDate>,
}

impl PerformanceMetrics {
    pub fn compute(series: &[(NaiveDate, f64)], periods_per_year: f64) -> Self {
        let (max_drawdown, peak_date, trough_date) = compute_drawdown(series);
        PerformanceMetrics {
            cagr: compute_cagr(series),
            max_drawdown,
            sharpe_ratio: compute_sharpe(series, periods_per_year),
            peak_date,
            trough_date,
        }
    }
}

/// Metrics for the three columns of the equity curve.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsReport {
    pub strategy: PerformanceMetrics,
    pub benchmark: PerformanceMetrics,
    pub basket: PerformanceMetrics,
}

impl MetricsReport {
    pub fn compute(curve: &[EquityPoint]) -> Self {
        let column = |pick: fn(&EquityPoint) -> f64| -> Vec<(NaiveDate, f64)> {
            curve.iter().map(|p| (p.date, pick(p))).collect()
        };
        MetricsReport {
            strategy: PerformanceMetrics::compute(&column(|p| p.strategy), TRADING_DAYS_PER_YEAR),
            benchmark: PerformanceMetrics::compute(&column(|p| p.benchmark), TRADING_DAYS_PER_YEAR),
            basket: PerformanceMetrics::compute(&column(|p| p.basket), TRADING_DAYS_PER_YEAR),
        }
    }
}

fn compute_cagr(series: &[(NaiveDate, f64)]) -> Option<f64> {
    let (first_date, initial) = *series.first()?;
    let (last_date, last) = *series.last()?;

    let days = (last_date - first_date).num_days();
    if days <= 0 || initial <= 0.0 || last <= 0.0 {
        return None;
    }
    Some((last / initial).powf(CALENDAR_DAYS_PER_YEAR / days as f64) - 1.0)
}

fn compute_drawdown(
    series: &[(NaiveDate, f64)],
) -> (Option<f64>, Option<NaiveDate>, Option<NaiveDate>) {
    if series.len() < 2 {
        return (None, None, None);
    }

    let (mut peak_date, mut peak) = series[0];
    let mut max_dd = 0.0_f64;
    let mut worst: Option<(NaiveDate, NaiveDate)> = None;

    for &(date, value) in series {
        if value > peak {
            peak = value;
            peak_date = date;
        } else if peak > 0.0 {
            let dd = (peak - value) / peak;
            if dd > max_dd {
                max_dd = dd;
                worst = Some((peak_date, date));
            }
        }
    }

    match worst {
        Some((peak_date, trough_date)) => (Some(max_dd), Some(peak_date), Some(trough_date)),
        None => (Some(0.0), None, None),
    }
}

fn compute_sharpe(series: &[(NaiveDate, f64)], periods_per_year: f64) -> Option<f64> {
    if series.len() < 2 {
        return None;
    }

    let returns: Vec<f64> = series
        .windows(2)
        .filter_map(|w| {
            let prev = w[0].1;
            let curr = w[1].1;
            (prev > 0.0).then(|| curr / prev - 1.0)
        })
        .collect();

    if returns.is_empty() {
        return None;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    if stddev == 0.0 {
        return None;
    }
    Some(mean / stddev * periods_per_year.sqrt())
}
