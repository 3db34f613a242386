//! Date-indexed price tables.
//!
//! A `PriceTable` is a wide table of closing prices: one row per calendar
//! date, one column per instrument (the benchmark is just another column).
//! Tables are immutable once built; the daily and weekly inputs are both
//! represented this way.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::error::TrendfolioError;

#[derive(Debug, Clone)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    columns: Vec<String>,
    /// Column-major closes; `values[c][r]` is column `c` on date row `r`.
    values: Vec<Vec<Option<f64>>>,
    date_index: HashMap<NaiveDate, usize>,
    col_index: HashMap<String, usize>,
}

impl PriceTable {
    /// Build a table from parallel columns. Dates must be strictly
    /// increasing and every column must have one value slot per date.
    pub fn new(
        dates: Vec<NaiveDate>,
        columns: Vec<String>,
        values: Vec<Vec<Option<f64>>>,
    ) -> Result<Self, TrendfolioError> {
        for pair in dates.windows(2) {
            if pair[1] <= pair[0] {
                return Err(TrendfolioError::UnorderedDates { date: pair[1] });
            }
        }

        if columns.len() != values.len() {
            return Err(TrendfolioError::PriceData {
                file: String::new(),
                reason: format!(
                    "{} column names for {} value columns",
                    columns.len(),
                    values.len()
                ),
            });
        }

        for (name, col) in columns.iter().zip(&values) {
            if col.len() != dates.len() {
                return Err(TrendfolioError::PriceData {
                    file: String::new(),
                    reason: format!(
                        "column {} has {} rows, expected {}",
                        name,
                        col.len(),
                        dates.len()
                    ),
                });
            }
        }

        let date_index = dates.iter().enumerate().map(|(i, &d)| (d, i)).collect();
        let col_index: HashMap<String, usize> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();

        if col_index.len() != columns.len() {
            return Err(TrendfolioError::PriceData {
                file: String::new(),
                reason: "duplicate column name".into(),
            });
        }

        Ok(Self {
            dates,
            columns,
            values,
            date_index,
            col_index,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.dates.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.col_index.contains_key(name)
    }

    /// Tradeable instrument ids: every column except the benchmark,
    /// sorted for deterministic iteration.
    pub fn instruments(&self, benchmark: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .columns
            .iter()
            .filter(|c| c.as_str() != benchmark)
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// The full column of closes, aligned with `dates()`.
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.col_index.get(name).map(|&i| self.values[i].as_slice())
    }

    /// Close for a column on an exact date; `None` if the date is not in
    /// the calendar or the cell is missing.
    pub fn close(&self, name: &str, date: NaiveDate) -> Option<f64> {
        let row = *self.date_index.get(&date)?;
        self.column(name)?[row]
    }

    pub fn date_position(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    /// Row index of the latest date at or before `date`; `None` when the
    /// table starts after `date`. Used for as-of lookups against the
    /// weekly calendar without looking ahead.
    pub fn position_at_or_before(&self, date: NaiveDate) -> Option<usize> {
        let n = self.dates.partition_point(|&d| d <= date);
        n.checked_sub(1)
    }

    /// First non-missing close in a column, for scaling buy-and-hold
    /// reference series.
    pub fn first_available_close(&self, name: &str) -> Option<f64> {
        self.column(name)?.iter().flatten().next().copied()
    }
}
