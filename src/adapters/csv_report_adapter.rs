//! CSV report adapter.
//!
//! Writes `trades.csv`, `equity.csv`, and `metrics.csv` into an output
//! directory. Undefined metrics become empty cells so downstream tooling
//! can tell "undefined" from zero.

use std::fs;
use std::path::Path;

use crate::domain::backtest::SimResult;
use crate::domain::error::TrendfolioError;
use crate::domain::metrics::{MetricsReport, PerformanceMetrics};
use crate::ports::report_port::ReportPort;

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    fn write_trades(result: &SimResult, path: &Path) -> Result<(), TrendfolioError> {
        let mut wtr = csv::Writer::from_path(path).map_err(io_reason)?;
        wtr.write_record(["date", "instrument", "action", "shares", "price"])
            .map_err(io_reason)?;
        for trade in &result.trades {
            wtr.write_record([
                trade.date.to_string(),
                trade.instrument.clone(),
                trade.action.to_string(),
                format!("{:.6}", trade.shares),
                format!("{:.6}", trade.price),
            ])
            .map_err(io_reason)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_equity(result: &SimResult, path: &Path) -> Result<(), TrendfolioError> {
        let mut wtr = csv::Writer::from_path(path).map_err(io_reason)?;
        wtr.write_record(["date", "strategy", "benchmark", "basket"])
            .map_err(io_reason)?;
        for point in &result.equity_curve {
            wtr.write_record([
                point.date.to_string(),
                format!("{:.2}", point.strategy),
                format!("{:.2}", point.benchmark),
                format!("{:.2}", point.basket),
            ])
            .map_err(io_reason)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_metrics(report: &MetricsReport, path: &Path) -> Result<(), TrendfolioError> {
        let mut wtr = csv::Writer::from_path(path).map_err(io_reason)?;
        wtr.write_record([
            "series",
            "cagr",
            "max_drawdown",
            "sharpe_ratio",
            "peak_date",
            "trough_date",
        ])
        .map_err(io_reason)?;
        for (name, metrics) in [
            ("strategy", &report.strategy),
            ("benchmark", &report.benchmark),
            ("basket", &report.basket),
        ] {
            wtr.write_record(metrics_row(name, metrics)).map_err(io_reason)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn metrics_row(name: &str, metrics: &PerformanceMetrics) -> Vec<String> {
    let opt_num = |v: Option<f64>| v.map(|x| format!("{x:.6}")).unwrap_or_default();
    let opt_date = |v: Option<chrono::NaiveDate>| v.map(|d| d.to_string()).unwrap_or_default();
    vec![
        name.to_string(),
        opt_num(metrics.cagr),
        opt_num(metrics.max_drawdown),
        opt_num(metrics.sharpe_ratio),
        opt_date(metrics.peak_date),
        opt_date(metrics.trough_date),
    ]
}

fn io_reason(e: csv::Error) -> TrendfolioError {
    TrendfolioError::PriceData {
        file: String::new(),
        reason: format!("report write error: {e}"),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &SimResult,
        report: &MetricsReport,
        output_dir: &Path,
    ) -> Result<(), TrendfolioError> {
        fs::create_dir_all(output_dir)?;
        Self::write_trades(result, &output_dir.join("trades.csv"))?;
        Self::write_equity(result, &output_dir.join("equity.csv"))?;
        Self::write_metrics(report, &output_dir.join("metrics.csv"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::{EquityPoint, PortfolioState, Trade, TradeAction};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample_result() -> SimResult {
        SimResult {
            trades: vec![Trade {
                date: d(2024, 1, 5),
                instrument: "GLD".into(),
                action: TradeAction::Buy,
                shares: 18.25,
                price: 182.5,
            }],
            equity_curve: vec![
                EquityPoint {
                    date: d(2024, 1, 4),
                    strategy: 10_000.0,
                    benchmark: 10_000.0,
                    basket: 10_000.0,
                },
                EquityPoint {
                    date: d(2024, 1, 5),
                    strategy: 10_050.0,
                    benchmark: 10_020.0,
                    basket: 9_990.0,
                },
            ],
            flagged: vec![],
            final_state: PortfolioState::new(10_000.0, d(2024, 1, 5)),
        }
    }

    #[test]
    fn writes_all_three_files() {
        let dir = TempDir::new().unwrap();
        let result = sample_result();
        let report = MetricsReport::compute(&result.equity_curve);

        CsvReportAdapter
            .write(&result, &report, dir.path())
            .unwrap();

        for name in ["trades.csv", "equity.csv", "metrics.csv"] {
            assert!(dir.path().join(name).exists(), "{name} should exist");
        }
    }

    #[test]
    fn trade_rows_round_trip() {
        let dir = TempDir::new().unwrap();
        let result = sample_result();
        let report = MetricsReport::compute(&result.equity_curve);
        CsvReportAdapter
            .write(&result, &report, dir.path())
            .unwrap();

        let trades = fs::read_to_string(dir.path().join("trades.csv")).unwrap();
        assert!(trades.starts_with("date,instrument,action,shares,price"));
        assert!(trades.contains("2024-01-05,GLD,buy,18.250000,182.500000"));
    }

    #[test]
    fn undefined_metrics_are_empty_cells() {
        let dir = TempDir::new().unwrap();
        let mut result = sample_result();
        result.equity_curve.truncate(1);
        let report = MetricsReport::compute(&result.equity_curve);
        CsvReportAdapter
            .write(&result, &report, dir.path())
            .unwrap();

        let metrics = fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        // Single-point curve: every metric is undefined.
        assert!(metrics.contains("strategy,,,,,"));
    }

    #[test]
    fn creates_missing_output_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("out").join("run1");
        let result = sample_result();
        let report = MetricsReport::compute(&result.equity_curve);

        CsvReportAdapter.write(&result, &report, &nested).unwrap();
        assert!(nested.join("equity.csv").exists());
    }
}
