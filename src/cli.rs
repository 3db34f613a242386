//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_simulation, SimConfig};
use crate::domain::config_validation::{validate_data_config, validate_simulation_config};
use crate::domain::error::TrendfolioError;
use crate::domain::indicator::IndicatorConfig;
use crate::domain::metrics::{MetricsReport, PerformanceMetrics};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "trendfolio", about = "Trend-following allocation backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulation and write the trade ledger, equity curve, and
    /// metrics to the output directory
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without running
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the instruments and date ranges in the configured data files
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest { config, output } => run_backtest(&config, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config } => run_info(&config),
    }
}

fn load_config(path: &std::path::Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn validated_config(path: &std::path::Path) -> Result<FileConfigAdapter, ExitCode> {
    let adapter = load_config(path)?;
    for result in [
        validate_data_config(&adapter),
        validate_simulation_config(&adapter),
    ] {
        if let Err(e) = result {
            eprintln!("error: {e}");
            return Err(ExitCode::from(&e));
        }
    }
    Ok(adapter)
}

pub fn build_sim_config(adapter: &dyn ConfigPort) -> Result<SimConfig, TrendfolioError> {
    let parse_enum = |key: &str, value: Option<String>, reason: String| {
        TrendfolioError::ConfigInvalid {
            section: "simulation".into(),
            key: key.into(),
            reason: format!("{}: {reason}", value.unwrap_or_default()),
        }
    };

    let frequency = match adapter.get_string("simulation", "rebalance_frequency") {
        Some(s) => s
            .parse()
            .map_err(|r| parse_enum("rebalance_frequency", Some(s.clone()), r))?,
        None => SimConfig::default().rebalance,
    };
    let cadence = match adapter.get_string("simulation", "exit_cadence") {
        Some(s) => s
            .parse()
            .map_err(|r| parse_enum("exit_cadence", Some(s.clone()), r))?,
        None => SimConfig::default().exit_cadence,
    };

    Ok(SimConfig {
        initial_capital: adapter.get_double("simulation", "initial_capital", 10_000.0),
        rebalance: frequency,
        drift_tolerance: adapter.get_double("simulation", "drift_tolerance", 0.25),
        indicators: IndicatorConfig {
            sma_fast: adapter.get_int("simulation", "sma_fast", 50) as usize,
            sma_slow: adapter.get_int("simulation", "sma_slow", 200) as usize,
            correlation_weeks: adapter.get_int("simulation", "correlation_weeks", 26) as usize,
        },
        max_selected: adapter.get_int("simulation", "max_selected", 3) as usize,
        exit_cadence: cadence,
        benchmark: adapter
            .get_string("data", "benchmark")
            .unwrap_or_else(|| "SPY".to_string()),
    })
}

fn build_data_port(adapter: &dyn ConfigPort) -> CsvAdapter {
    // Presence is checked by validate_data_config before this runs.
    let daily = adapter.get_string("data", "daily_prices").unwrap_or_default();
    let weekly = adapter
        .get_string("data", "weekly_prices")
        .unwrap_or_default();
    CsvAdapter::new(PathBuf::from(daily), PathBuf::from(weekly))
}

fn run_backtest(config_path: &std::path::Path, output: Option<&std::path::Path>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match validated_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let sim_config = match build_sim_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };

    let data_port = build_data_port(&adapter);
    let (daily, weekly) = match (data_port.load_daily(), data_port.load_weekly()) {
        (Ok(d), Ok(w)) => (d, w),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };

    if let (Some(first), Some(last)) = (daily.dates().first(), daily.dates().last()) {
        eprintln!(
            "Running simulation: {} instruments, {} daily rows, {first} to {last}",
            daily.instruments(&sim_config.benchmark).len(),
            daily.row_count(),
        );
    }

    let result = match run_simulation(&daily, &weekly, &sim_config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };

    for gap in &result.flagged {
        eprintln!(
            "warning: {} held without a price on {}; carried forward",
            gap.instrument, gap.date
        );
    }

    let report = MetricsReport::compute(&result.equity_curve);

    eprintln!("\n=== Results ===");
    eprintln!("Trades:           {}", result.trades.len());
    print_metrics("Strategy", &report.strategy);
    print_metrics("Benchmark", &report.benchmark);
    print_metrics("Equal-weight", &report.basket);

    let output_dir = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("report"));
    match CsvReportAdapter.write(&result, &report, &output_dir) {
        Ok(()) => {
            eprintln!("\nReport written to: {}", output_dir.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn print_metrics(label: &str, metrics: &PerformanceMetrics) {
    let pct = |v: Option<f64>| match v {
        Some(x) => format!("{:.2}%", x * 100.0),
        None => "n/a".to_string(),
    };
    let num = |v: Option<f64>| match v {
        Some(x) => format!("{x:.2}"),
        None => "n/a".to_string(),
    };
    eprintln!(
        "{label}: CAGR {}, MaxDD {}, Sharpe {}",
        pct(metrics.cagr),
        pct(metrics.max_drawdown),
        num(metrics.sharpe_ratio),
    );
}

fn run_validate(config_path: &std::path::Path) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match validated_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = build_sim_config(&adapter) {
        eprintln!("error: {e}");
        return ExitCode::from(&e);
    }
    eprintln!("Config validated successfully");
    ExitCode::SUCCESS
}

fn run_info(config_path: &std::path::Path) -> ExitCode {
    let adapter = match validated_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let sim_config = match build_sim_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };

    let data_port = build_data_port(&adapter);
    for (label, table) in [
        ("daily", data_port.load_daily()),
        ("weekly", data_port.load_weekly()),
    ] {
        match table {
            Ok(t) => {
                let range = match (t.dates().first(), t.dates().last()) {
                    (Some(first), Some(last)) => format!("{first} to {last}"),
                    _ => "empty".to_string(),
                };
                println!(
                    "{label}: {} rows, {range}, instruments: {}",
                    t.row_count(),
                    t.instruments(&sim_config.benchmark).join(", "),
                );
            }
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::from(&e);
            }
        }
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::{ExitCadence, RebalanceFrequency};

    #[test]
    fn sim_config_from_full_ini() {
        let adapter = FileConfigAdapter::from_string(
            r#"
[data]
benchmark = VTI

[simulation]
initial_capital = 25000
rebalance_frequency = monthly
drift_tolerance = 0.2
correlation_weeks = 13
sma_fast = 20
sma_slow = 100
max_selected = 2
exit_cadence = rebalance
"#,
        )
        .unwrap();

        let config = build_sim_config(&adapter).unwrap();
        assert_eq!(config.rebalance, RebalanceFrequency::Monthly);
        assert_eq!(config.exit_cadence, ExitCadence::OnRebalance);
        assert_eq!(config.benchmark, "VTI");
        assert_eq!(config.indicators.sma_fast, 20);
        assert_eq!(config.indicators.sma_slow, 100);
        assert_eq!(config.indicators.correlation_weeks, 13);
        assert_eq!(config.max_selected, 2);
        assert!((config.initial_capital - 25_000.0).abs() < f64::EPSILON);
        assert!((config.drift_tolerance - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn sim_config_defaults() {
        let adapter = FileConfigAdapter::from_string("[data]\n").unwrap();
        let config = build_sim_config(&adapter).unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn sim_config_rejects_bad_frequency() {
        let adapter =
            FileConfigAdapter::from_string("[simulation]\nrebalance_frequency = daily\n").unwrap();
        assert!(matches!(
            build_sim_config(&adapter),
            Err(TrendfolioError::ConfigInvalid { key, .. }) if key == "rebalance_frequency"
        ));
    }
}
