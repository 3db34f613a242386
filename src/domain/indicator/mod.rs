//! Indicator computation over the price tables.
//!
//! The engine precomputes, per instrument, the fast/slow SMA series on the
//! daily calendar and the rolling benchmark correlation on the weekly
//! calendar. Every value at row *i* uses only data up to row *i*, so
//! per-date snapshots never look ahead.

pub mod sma;
pub mod correlation;

use chrono::NaiveDate;
use std::collections::BTreeMap;

use self::correlation::{rolling_correlation, simple_returns};
use self::sma::sma_series;
use super::error::TrendfolioError;
use super::price::PriceTable;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    pub sma_fast: usize,
    pub sma_slow: usize,
    pub correlation_weeks: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        IndicatorConfig {
            sma_fast: 50,
            sma_slow: 200,
            correlation_weeks: 26,
        }
    }
}

/// Per-instrument, per-date view of everything the signal and selection
/// layers need. Undefined indicators stay `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub sma_fast: Option<f64>,
    pub sma_slow: Option<f64>,
    pub correlation: Option<f64>,
}

#[derive(Debug, Clone)]
struct InstrumentSeries {
    closes: Vec<Option<f64>>,
    sma_fast: Vec<Option<f64>>,
    sma_slow: Vec<Option<f64>>,
    /// Indexed on the weekly calendar, not the daily one.
    correlation: Vec<Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    series: BTreeMap<String, InstrumentSeries>,
    daily_dates: Vec<NaiveDate>,
    weekly_dates: Vec<NaiveDate>,
}

impl IndicatorEngine {
    /// Precompute indicator series for every instrument column (all
    /// columns except the benchmark, which only contributes returns).
    pub fn compute(
        daily: &PriceTable,
        weekly: &PriceTable,
        benchmark: &str,
        config: &IndicatorConfig,
    ) -> Result<Self, TrendfolioError> {
        let bench_weekly = weekly
            .column(benchmark)
            .ok_or_else(|| TrendfolioError::MissingColumn {
                column: benchmark.to_string(),
            })?;
        let bench_returns = simple_returns(bench_weekly);

        let mut series = BTreeMap::new();
        for instrument in daily.instruments(benchmark) {
            let Some(closes) = daily.column(&instrument).map(|c| c.to_vec()) else {
                continue;
            };
            let weekly_closes =
                weekly
                    .column(&instrument)
                    .ok_or_else(|| TrendfolioError::MissingColumn {
                        column: instrument.clone(),
                    })?;

            let instrument_returns = simple_returns(weekly_closes);
            let correlation = rolling_correlation(
                &instrument_returns,
                &bench_returns,
                config.correlation_weeks,
            );

            series.insert(
                instrument,
                InstrumentSeries {
                    sma_fast: sma_series(&closes, config.sma_fast),
                    sma_slow: sma_series(&closes, config.sma_slow),
                    closes,
                    correlation,
                },
            );
        }

        Ok(Self {
            series,
            daily_dates: daily.dates().to_vec(),
            weekly_dates: weekly.dates().to_vec(),
        })
    }

    /// Snapshot for one instrument on one daily date. `None` when the
    /// instrument has no close on that date; the caller excludes it from
    /// the cycle rather than treating the gap as an error.
    pub fn snapshot(&self, instrument: &str, date: NaiveDate) -> Option<IndicatorSnapshot> {
        let series = self.series.get(instrument)?;
        let row = self.daily_dates.binary_search(&date).ok()?;
        let close = series.closes[row]?;

        // Correlation is as-of: the latest weekly value dated <= the
        // daily evaluation date.
        let weekly_row = self.weekly_dates.partition_point(|&d| d <= date);
        let correlation = weekly_row
            .checked_sub(1)
            .and_then(|r| series.correlation.get(r).copied().flatten());

        Some(IndicatorSnapshot {
            close,
            sma_fast: series.sma_fast[row],
            sma_slow: series.sma_slow[row],
            correlation,
        })
    }

    pub fn instruments(&self) -> impl Iterator<Item = &String> {
        self.series.keys()
    }
}
