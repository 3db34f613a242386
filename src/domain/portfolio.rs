//! Portfolio state, trade ledger, and equity tracking.
//!
//! `PortfolioState` is a single owned value threaded through the
//! simulation loop; trades mutate it only through [`PortfolioState::buy`]
//! and [`PortfolioState::sell`], which also mint the ledger records.

use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Shares below this are treated as a closed position (guards float
/// residue after a full liquidation).
const SHARE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "buy"),
            TradeAction::Sell => write!(f, "sell"),
        }
    }
}

/// Immutable ledger record; appended once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub date: NaiveDate,
    pub instrument: String,
    pub action: TradeAction,
    pub shares: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub instrument: String,
    pub shares: f64,
    pub cost_basis: f64,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.shares * price
    }
}

/// One row of the equity curve: strategy value alongside the buy-and-hold
/// benchmark and the equal-weight basket, all scaled to the same initial
/// capital.
#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub strategy: f64,
    pub benchmark: f64,
    pub basket: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    pub cash: f64,
    pub positions: BTreeMap<String, Position>,
    pub date: NaiveDate,
}

impl PortfolioState {
    pub fn new(initial_capital: f64, date: NaiveDate) -> Self {
        PortfolioState {
            cash: initial_capital,
            positions: BTreeMap::new(),
            date,
        }
    }

    pub fn has_position(&self, instrument: &str) -> bool {
        self.positions.contains_key(instrument)
    }

    pub fn position(&self, instrument: &str) -> Option<&Position> {
        self.positions.get(instrument)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Cash plus the market value of every position at the given prices.
    /// The caller supplies the last known close for every held instrument.
    pub fn total_value(&self, prices: &BTreeMap<String, f64>) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .filter_map(|pos| prices.get(&pos.instrument).map(|&p| pos.market_value(p)))
            .sum();
        self.cash + position_value
    }

    /// Market-value weight of one holding; `None` if not held or the
    /// portfolio is worthless.
    pub fn weight(&self, instrument: &str, prices: &BTreeMap<String, f64>) -> Option<f64> {
        let total = self.total_value(prices);
        if total <= 0.0 {
            return None;
        }
        let pos = self.positions.get(instrument)?;
        let price = prices.get(instrument)?;
        Some(pos.market_value(*price) / total)
    }

    /// Buy `shares` at `price`, averaging the cost basis into any existing
    /// position, and return the ledger record.
    pub fn buy(&mut self, instrument: &str, shares: f64, price: f64, date: NaiveDate) -> Trade {
        self.cash -= shares * price;
        let entry = self
            .positions
            .entry(instrument.to_string())
            .or_insert_with(|| Position {
                instrument: instrument.to_string(),
                shares: 0.0,
                cost_basis: 0.0,
            });
        let total_cost = entry.shares * entry.cost_basis + shares * price;
        entry.shares += shares;
        entry.cost_basis = total_cost / entry.shares;

        Trade {
            date,
            instrument: instrument.to_string(),
            action: TradeAction::Buy,
            shares,
            price,
        }
    }

    /// Sell `shares` at `price`; positions reduced to (near) zero shares
    /// are removed. Returns the ledger record.
    pub fn sell(&mut self, instrument: &str, shares: f64, price: f64, date: NaiveDate) -> Trade {
        self.cash += shares * price;
        if let Some(pos) = self.positions.get_mut(instrument) {
            pos.shares -= shares;
            if pos.shares <= SHARE_EPSILON {
                self.positions.remove(instrument);
            }
        }

        Trade {
            date,
            instrument: instrument.to_string(),
            action: TradeAction::Sell,
            shares,
            price,
        }
    }

    /// Sell the entire holding; `None` when the instrument is not held.
    pub fn liquidate(&mut self, instrument: &str, price: f64, date: NaiveDate) -> Option<Trade> {
        let shares = self.positions.get(instrument)?.shares;
        Some(self.sell(instrument, shares, price, date))
    }
}
