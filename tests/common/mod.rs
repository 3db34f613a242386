#![allow(dead_code)]

use chrono::NaiveDate;
use trendfolio::domain::backtest::SimConfig;
use trendfolio::domain::error::TrendfolioError;
use trendfolio::domain::indicator::IndicatorConfig;
use trendfolio::domain::price::PriceTable;
use trendfolio::ports::data_port::DataPort;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive calendar dates starting on Monday 2024-01-01, so ISO weeks
/// end on day indices 6, 13, 20, ... and a weekly rebalance lands there.
pub fn daily_dates(count: usize) -> Vec<NaiveDate> {
    (0..count)
        .map(|i| date(2024, 1, 1) + chrono::Duration::days(i as i64))
        .collect()
}

/// Build a daily table from closures of the day index.
pub fn daily_table(count: usize, columns: &[(&str, &dyn Fn(usize) -> Option<f64>)]) -> PriceTable {
    let names = columns.iter().map(|(n, _)| n.to_string()).collect();
    let values = columns
        .iter()
        .map(|(_, f)| (0..count).map(f).collect())
        .collect();
    PriceTable::new(daily_dates(count), names, values).unwrap()
}

/// Weekly table sampled from the daily one: every 7th close, dated on the
/// Sunday that ends each ISO week.
pub fn weekly_from(daily: &PriceTable) -> PriceTable {
    let rows: Vec<usize> = (6..daily.row_count()).step_by(7).collect();
    let dates = rows.iter().map(|&r| daily.dates()[r]).collect();
    let values = daily
        .columns()
        .iter()
        .map(|col| {
            let closes = daily.column(col).unwrap();
            rows.iter().map(|&r| closes[r]).collect()
        })
        .collect();
    PriceTable::new(dates, daily.columns().to_vec(), values).unwrap()
}

/// Weekly table with hand-picked closes on the given Sundays; lets a test
/// pin correlations exactly, independent of the daily trend shapes.
pub fn weekly_table(
    day_indices: &[usize],
    columns: &[(&str, Vec<Option<f64>>)],
) -> PriceTable {
    let all = daily_dates(day_indices.iter().max().map(|&m| m + 1).unwrap_or(0));
    let dates = day_indices.iter().map(|&i| all[i]).collect();
    let names = columns.iter().map(|(n, _)| n.to_string()).collect();
    let values = columns.iter().map(|(_, v)| v.clone()).collect();
    PriceTable::new(dates, names, values).unwrap()
}

/// Short indicator windows so scenarios stay small: SMA 5/10, 3-week
/// correlation lookback (defined after 4 weekly closes).
pub fn fast_config() -> SimConfig {
    SimConfig {
        indicators: IndicatorConfig {
            sma_fast: 5,
            sma_slow: 10,
            correlation_weeks: 3,
        },
        ..SimConfig::default()
    }
}

/// Steadily rising close with a ±1.5 wiggle: stays above both SMAs once
/// they are defined, and keeps weekly returns from having zero variance.
pub fn rising(base: f64) -> impl Fn(usize) -> Option<f64> {
    move |i| Some(base + i as f64 + if i % 2 == 0 { 1.5 } else { -1.5 })
}

/// Steadily falling close: never entry-eligible.
pub fn falling(base: f64) -> impl Fn(usize) -> Option<f64> {
    move |i| Some(base - 0.5 * i as f64 + if i % 2 == 0 { 0.3 } else { -0.3 })
}

/// Compounding growth by a fixed daily factor.
pub fn compounding(base: f64, daily_factor: f64) -> impl Fn(usize) -> Option<f64> {
    move |i| Some(base * daily_factor.powi(i as i32))
}

/// Alternating weekly closes around `base`: returns flip sign each week,
/// so rolling correlations stay defined.
pub fn wiggly_weekly(base: f64, count: usize) -> Vec<Option<f64>> {
    (0..count)
        .map(|w| Some(base * (1.0 + if w % 2 == 0 { 0.02 } else { -0.02 })))
        .collect()
}

pub struct MockDataPort {
    pub daily: PriceTable,
    pub weekly: PriceTable,
}

impl DataPort for MockDataPort {
    fn load_daily(&self) -> Result<PriceTable, TrendfolioError> {
        Ok(self.daily.clone())
    }

    fn load_weekly(&self) -> Result<PriceTable, TrendfolioError> {
        Ok(self.weekly.clone())
    }
}
