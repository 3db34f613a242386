//! Configuration validation.
//!
//! Checks every config field before a simulation runs, so bad input fails
//! with a pointed message instead of a mid-run surprise.

use crate::domain::backtest::{ExitCadence, RebalanceFrequency};
use crate::domain::error::TrendfolioError;
use crate::ports::config_port::ConfigPort;

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), TrendfolioError> {
    require_path(config, "daily_prices")?;
    require_path(config, "weekly_prices")?;
    Ok(())
}

pub fn validate_simulation_config(config: &dyn ConfigPort) -> Result<(), TrendfolioError> {
    validate_initial_capital(config)?;
    validate_drift_tolerance(config)?;
    validate_sma_windows(config)?;
    validate_correlation_weeks(config)?;
    validate_max_selected(config)?;
    validate_rebalance_frequency(config)?;
    validate_exit_cadence(config)?;
    Ok(())
}

fn invalid(key: &str, reason: impl Into<String>) -> TrendfolioError {
    TrendfolioError::ConfigInvalid {
        section: "simulation".to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn require_path(config: &dyn ConfigPort, key: &str) -> Result<(), TrendfolioError> {
    match config.get_string("data", key) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(TrendfolioError::ConfigMissing {
            section: "data".to_string(),
            key: key.to_string(),
        }),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), TrendfolioError> {
    let value = config.get_double("simulation", "initial_capital", 10_000.0);
    if value <= 0.0 {
        return Err(invalid("initial_capital", "initial_capital must be positive"));
    }
    Ok(())
}

fn validate_drift_tolerance(config: &dyn ConfigPort) -> Result<(), TrendfolioError> {
    let value = config.get_double("simulation", "drift_tolerance", 0.25);
    if value <= 0.0 || value >= 1.0 {
        return Err(invalid(
            "drift_tolerance",
            "drift_tolerance must be between 0 and 1 exclusive",
        ));
    }
    Ok(())
}

fn validate_sma_windows(config: &dyn ConfigPort) -> Result<(), TrendfolioError> {
    let fast = config.get_int("simulation", "sma_fast", 50);
    let slow = config.get_int("simulation", "sma_slow", 200);
    if fast < 1 {
        return Err(invalid("sma_fast", "sma_fast must be at least 1"));
    }
    if slow <= fast {
        return Err(invalid("sma_slow", "sma_slow must be greater than sma_fast"));
    }
    Ok(())
}

fn validate_correlation_weeks(config: &dyn ConfigPort) -> Result<(), TrendfolioError> {
    let value = config.get_int("simulation", "correlation_weeks", 26);
    if value < 2 {
        return Err(invalid(
            "correlation_weeks",
            "correlation_weeks must be at least 2",
        ));
    }
    Ok(())
}

fn validate_max_selected(config: &dyn ConfigPort) -> Result<(), TrendfolioError> {
    let value = config.get_int("simulation", "max_selected", 3);
    if value < 1 {
        return Err(invalid("max_selected", "max_selected must be at least 1"));
    }
    Ok(())
}

fn validate_rebalance_frequency(config: &dyn ConfigPort) -> Result<(), TrendfolioError> {
    if let Some(value) = config.get_string("simulation", "rebalance_frequency") {
        value
            .parse::<RebalanceFrequency>()
            .map_err(|reason| invalid("rebalance_frequency", reason))?;
    }
    Ok(())
}

fn validate_exit_cadence(config: &dyn ConfigPort) -> Result<(), TrendfolioError> {
    if let Some(value) = config.get_string("simulation", "exit_cadence") {
        value
            .parse::<ExitCadence>()
            .map_err(|reason| invalid("exit_cadence", reason))?;
    }
    Ok(())
}
