//! Simulation loop: the time-stepped state machine that turns a price
//! history into an equity curve and trade ledger.
//!
//! Each calendar date is one step. On non-scheduled dates the portfolio
//! is only revalued (Idle); on scheduled dates the loop runs
//! Idle → Evaluating → Rebalancing → Idle, applying the allocation
//! decisions at that date's closing prices. Exit checks run on their own
//! cadence and may fire on any date.

use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use super::allocation::{plan_rebalance, select, Candidate};
use super::error::TrendfolioError;
use super::indicator::{IndicatorConfig, IndicatorEngine};
use super::portfolio::{EquityPoint, PortfolioState, Trade};
use super::price::PriceTable;
use super::signal::{entry_signal, exit_signal, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebalanceFrequency {
    Weekly,
    Monthly,
}

impl FromStr for RebalanceFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Ok(RebalanceFrequency::Weekly),
            "monthly" => Ok(RebalanceFrequency::Monthly),
            other => Err(format!("unknown rebalance frequency: {other}")),
        }
    }
}

/// How often exit signals are polled. Reselection always follows the
/// rebalance calendar; exits may run every date so the risk control is
/// not deferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCadence {
    Daily,
    OnRebalance,
}

impl FromStr for ExitCadence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(ExitCadence::Daily),
            "rebalance" => Ok(ExitCadence::OnRebalance),
            other => Err(format!("unknown exit cadence: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub initial_capital: f64,
    pub rebalance: RebalanceFrequency,
    pub drift_tolerance: f64,
    pub indicators: IndicatorConfig,
    pub max_selected: usize,
    pub exit_cadence: ExitCadence,
    pub benchmark: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            initial_capital: 10_000.0,
            rebalance: RebalanceFrequency::Weekly,
            drift_tolerance: 0.25,
            indicators: IndicatorConfig::default(),
            max_selected: 3,
            exit_cadence: ExitCadence::Daily,
            benchmark: "SPY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Evaluating,
    Rebalancing,
}

/// A held instrument with no close on an evaluation date; carried forward
/// unchanged and surfaced for review instead of being liquidated.
#[derive(Debug, Clone, PartialEq)]
pub struct DataGap {
    pub date: NaiveDate,
    pub instrument: String,
}

/// One step's output: the new state plus everything emitted on that date.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub state: PortfolioState,
    pub trades: Vec<Trade>,
    pub equity: EquityPoint,
    pub flagged: Vec<DataGap>,
}

#[derive(Debug, Clone)]
pub struct SimResult {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub flagged: Vec<DataGap>,
    pub final_state: PortfolioState,
}

/// Scheduled evaluation dates: the last trading date of each calendar
/// bucket (ISO week or month) present in the timeline.
pub fn rebalance_dates(
    dates: &[NaiveDate],
    frequency: RebalanceFrequency,
) -> BTreeSet<NaiveDate> {
    let mut last_in_bucket: BTreeMap<(i32, u32), NaiveDate> = BTreeMap::new();
    for &date in dates {
        let bucket = match frequency {
            RebalanceFrequency::Weekly => {
                let week = date.iso_week();
                (week.year(), week.week())
            }
            RebalanceFrequency::Monthly => (date.year(), date.month()),
        };
        // Dates arrive sorted, so the last write wins.
        last_in_bucket.insert(bucket, date);
    }
    last_in_bucket.into_values().collect()
}

pub struct SimulationLoop<'a> {
    daily: &'a PriceTable,
    config: &'a SimConfig,
    engine: IndicatorEngine,
    schedule: BTreeSet<NaiveDate>,
    instruments: Vec<String>,
    phase: LoopState,
    /// Last known close per column, for marking held positions to market
    /// across data gaps.
    last_price: BTreeMap<String, f64>,
    benchmark_base: Option<f64>,
    basket_base: BTreeMap<String, f64>,
}

impl<'a> SimulationLoop<'a> {
    pub fn new(
        daily: &'a PriceTable,
        weekly: &'a PriceTable,
        config: &'a SimConfig,
    ) -> Result<Self, TrendfolioError> {
        if !daily.has_column(&config.benchmark) {
            return Err(TrendfolioError::MissingColumn {
                column: config.benchmark.clone(),
            });
        }
        if daily.row_count() < 2 {
            return Err(TrendfolioError::InsufficientHistory {
                rows: daily.row_count(),
                minimum: 2,
            });
        }

        let engine =
            IndicatorEngine::compute(daily, weekly, &config.benchmark, &config.indicators)?;
        let instruments = daily.instruments(&config.benchmark);
        let basket_base = instruments
            .iter()
            .filter_map(|i| daily.first_available_close(i).map(|c| (i.clone(), c)))
            .collect();

        Ok(Self {
            daily,
            config,
            engine,
            schedule: rebalance_dates(daily.dates(), config.rebalance),
            instruments,
            phase: LoopState::Idle,
            last_price: BTreeMap::new(),
            benchmark_base: daily.first_available_close(&config.benchmark),
            basket_base,
        })
    }

    pub fn phase(&self) -> LoopState {
        self.phase
    }

    pub fn is_rebalance_date(&self, date: NaiveDate) -> bool {
        self.schedule.contains(&date)
    }

    /// Run the whole simulation, threading one owned state through every
    /// step.
    pub fn run(&mut self) -> Result<SimResult, TrendfolioError> {
        let dates = self.daily.dates().to_vec();
        let mut state = PortfolioState::new(self.config.initial_capital, dates[0]);
        let mut trades = Vec::new();
        let mut equity_curve = Vec::new();
        let mut flagged = Vec::new();

        for date in dates {
            let outcome = self.step(state, date)?;
            state = outcome.state;
            trades.extend(outcome.trades);
            equity_curve.push(outcome.equity);
            flagged.extend(outcome.flagged);
        }

        Ok(SimResult {
            trades,
            equity_curve,
            flagged,
            final_state: state,
        })
    }

    /// Advance the machine by one date and return the new state plus
    /// emitted trades and the equity point for that date.
    pub fn step(
        &mut self,
        mut state: PortfolioState,
        date: NaiveDate,
    ) -> Result<StepOutcome, TrendfolioError> {
        state.date = date;
        self.refresh_prices(date);

        let mut trades = Vec::new();
        let mut flagged = Vec::new();
        let scheduled = self.schedule.contains(&date);

        let exits_due = scheduled || self.config.exit_cadence == ExitCadence::Daily;
        if exits_due {
            self.check_exits(&mut state, date, &mut trades);
        }

        if scheduled {
            self.phase = LoopState::Evaluating;
            let plan_input = self.evaluate(&state, date, &mut flagged);

            self.phase = LoopState::Rebalancing;
            self.execute(&mut state, date, plan_input, &mut trades);

            self.phase = LoopState::Idle;
        }

        let strategy = state.total_value(&self.last_price);
        if strategy <= 0.0 {
            return Err(TrendfolioError::NonPositiveEquity {
                date,
                value: strategy,
            });
        }

        let equity = EquityPoint {
            date,
            strategy,
            benchmark: self.benchmark_value(),
            basket: self.basket_value(),
        };

        Ok(StepOutcome {
            state,
            trades,
            equity,
            flagged,
        })
    }

    fn refresh_prices(&mut self, date: NaiveDate) {
        for column in self.daily.columns() {
            if let Some(close) = self.daily.close(column, date) {
                self.last_price.insert(column.clone(), close);
            }
        }
    }

    /// Liquidate every held instrument whose exit condition trips today.
    /// Holdings without a close today cannot trade and are skipped.
    fn check_exits(&self, state: &mut PortfolioState, date: NaiveDate, trades: &mut Vec<Trade>) {
        let held: Vec<String> = state.positions.keys().cloned().collect();
        for instrument in held {
            let Some(snapshot) = self.engine.snapshot(&instrument, date) else {
                continue;
            };
            if exit_signal(&snapshot) {
                if let Some(trade) = state.liquidate(&instrument, snapshot.close, date) {
                    trades.push(trade);
                }
            }
        }
    }

    /// Signals, selection, and drift check for one scheduled date.
    fn evaluate(
        &self,
        state: &PortfolioState,
        date: NaiveDate,
        flagged: &mut Vec<DataGap>,
    ) -> EvaluationResult {
        let mut candidates = Vec::new();
        for instrument in &self.instruments {
            let Some(snapshot) = self.engine.snapshot(instrument, date) else {
                // Missing close: drop from this cycle's candidate set and
                // flag it if we are carrying a position.
                if state.has_position(instrument) {
                    flagged.push(DataGap {
                        date,
                        instrument: instrument.clone(),
                    });
                }
                continue;
            };
            if entry_signal(&snapshot) != Signal::Eligible {
                continue;
            }
            let Some(correlation) = snapshot.correlation else {
                continue;
            };
            candidates.push(Candidate {
                instrument: instrument.clone(),
                correlation,
            });
        }

        let selected: Vec<String> = select(candidates, self.config.max_selected)
            .into_iter()
            .map(|c| c.instrument)
            .collect();

        // Holdings priced today, by current market value; gap holdings
        // stay out of the plan but keep contributing to total value.
        let held: BTreeMap<String, f64> = state
            .positions
            .values()
            .filter_map(|pos| {
                self.daily
                    .close(&pos.instrument, date)
                    .map(|price| (pos.instrument.clone(), pos.market_value(price)))
            })
            .collect();

        EvaluationResult {
            selected,
            held,
            total_value: state.total_value(&self.last_price),
        }
    }

    /// Fill the plan at today's closes: trims first, then top-ups and new
    /// entries with the buys capped by remaining cash.
    fn execute(
        &self,
        state: &mut PortfolioState,
        date: NaiveDate,
        evaluation: EvaluationResult,
        trades: &mut Vec<Trade>,
    ) {
        let plan = plan_rebalance(
            &evaluation.held,
            evaluation.total_value,
            &evaluation.selected,
            self.config.drift_tolerance,
        );

        for order in &plan.sells {
            let Some(price) = self.daily.close(&order.instrument, date) else {
                continue;
            };
            let held_shares = state
                .position(&order.instrument)
                .map(|p| p.shares)
                .unwrap_or(0.0);
            let shares = (order.value / price).min(held_shares);
            if shares > 0.0 {
                trades.push(state.sell(&order.instrument, shares, price, date));
            }
        }

        for order in &plan.buys {
            let Some(price) = self.daily.close(&order.instrument, date) else {
                continue;
            };
            let value = order.value.min(state.cash);
            if value <= 0.0 || price <= 0.0 {
                continue;
            }
            trades.push(state.buy(&order.instrument, value / price, price, date));
        }
    }

    /// Buy-and-hold benchmark scaled to initial capital at its first
    /// available close.
    fn benchmark_value(&self) -> f64 {
        match (
            self.benchmark_base,
            self.last_price.get(&self.config.benchmark),
        ) {
            (Some(base), Some(&close)) if base > 0.0 => {
                self.config.initial_capital * close / base
            }
            _ => self.config.initial_capital,
        }
    }

    /// Equal-weight basket of all instruments, bought once at each
    /// instrument's first close and never rebalanced.
    fn basket_value(&self) -> f64 {
        if self.basket_base.is_empty() {
            return self.config.initial_capital;
        }
        let ratio_sum: f64 = self
            .basket_base
            .iter()
            .map(|(instrument, &base)| {
                self.last_price
                    .get(instrument)
                    .map(|&close| close / base)
                    .unwrap_or(1.0)
            })
            .sum();
        self.config.initial_capital * ratio_sum / self.basket_base.len() as f64
    }
}

struct EvaluationResult {
    selected: Vec<String>,
    held: BTreeMap<String, f64>,
    total_value: f64,
}

/// Convenience entry point: build the loop and run it end to end.
/// Identical inputs and config always produce identical trade ledgers and
/// equity curves.
pub fn run_simulation(
    daily: &PriceTable,
    weekly: &PriceTable,
    config: &SimConfig,
) -> Result<SimResult, TrendfolioError> {
    let mut sim = SimulationLoop::new(daily, weekly, config)?;
    sim.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn frequency_and_cadence_parse() {
        assert_eq!(
            "weekly".parse::<RebalanceFrequency>().unwrap(),
            RebalanceFrequency::Weekly
        );
        assert_eq!(
            " Monthly ".parse::<RebalanceFrequency>().unwrap(),
            RebalanceFrequency::Monthly
        );
        assert!("fortnightly".parse::<RebalanceFrequency>().is_err());

        assert_eq!("daily".parse::<ExitCadence>().unwrap(), ExitCadence::Daily);
        assert_eq!(
            "rebalance".parse::<ExitCadence>().unwrap(),
            ExitCadence::OnRebalance
        );
        assert!("hourly".parse::<ExitCadence>().is_err());
    }

    #[test]
    fn weekly_schedule_takes_last_trading_day_per_iso_week() {
        // Mon 2024-01-01 .. Fri 2024-01-12, with the first Friday missing.
        let mut dates: Vec<NaiveDate> = (0..12)
            .map(|i| d(2024, 1, 1) + chrono::Duration::days(i))
            .filter(|date| date.weekday().number_from_monday() <= 5)
            .collect();
        dates.retain(|&date| date != d(2024, 1, 5));

        let schedule = rebalance_dates(&dates, RebalanceFrequency::Weekly);
        // Week 1 ends on the Thursday because Friday is missing.
        assert!(schedule.contains(&d(2024, 1, 4)));
        assert!(schedule.contains(&d(2024, 1, 12)));
        assert_eq!(schedule.len(), 2);
    }

    #[test]
    fn monthly_schedule_takes_last_trading_day_per_month() {
        let dates = vec![
            d(2024, 1, 30),
            d(2024, 1, 31),
            d(2024, 2, 1),
            d(2024, 2, 29),
            d(2024, 3, 1),
        ];
        let schedule = rebalance_dates(&dates, RebalanceFrequency::Monthly);
        assert_eq!(
            schedule.into_iter().collect::<Vec<_>>(),
            vec![d(2024, 1, 31), d(2024, 2, 29), d(2024, 3, 1)]
        );
    }

    #[test]
    fn missing_benchmark_column_rejected() {
        let daily = PriceTable::new(
            vec![d(2024, 1, 1), d(2024, 1, 2)],
            vec!["GLD".into()],
            vec![vec![Some(1.0), Some(2.0)]],
        )
        .unwrap();
        let weekly = PriceTable::new(
            vec![d(2024, 1, 2)],
            vec!["GLD".into()],
            vec![vec![Some(2.0)]],
        )
        .unwrap();

        let config = SimConfig::default();
        let result = SimulationLoop::new(&daily, &weekly, &config);
        assert!(matches!(
            result,
            Err(TrendfolioError::MissingColumn { column }) if column == "SPY"
        ));
    }

    #[test]
    fn single_row_table_rejected() {
        let daily = PriceTable::new(
            vec![d(2024, 1, 1)],
            vec!["SPY".into()],
            vec![vec![Some(1.0)]],
        )
        .unwrap();
        let weekly = daily.clone();
        let config = SimConfig::default();
        assert!(matches!(
            SimulationLoop::new(&daily, &weekly, &config),
            Err(TrendfolioError::InsufficientHistory { .. })
        ));
    }
}
