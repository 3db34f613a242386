//! CSV price data adapter.
//!
//! Reads wide-format price tables: a `Date` column followed by one close
//! column per instrument (benchmark included), e.g.
//! `Date,DBC,GLD,TLT,SPY`. Empty cells are missing prices, not zeros.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::domain::error::TrendfolioError;
use crate::domain::price::PriceTable;
use crate::ports::data_port::DataPort;

pub struct CsvAdapter {
    daily_path: PathBuf,
    weekly_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(daily_path: PathBuf, weekly_path: PathBuf) -> Self {
        Self {
            daily_path,
            weekly_path,
        }
    }

    fn read_table(path: &Path) -> Result<PriceTable, TrendfolioError> {
        let file = path.display().to_string();
        let data_err = |reason: String| TrendfolioError::PriceData {
            file: file.clone(),
            reason,
        };

        let content = fs::read_to_string(path)
            .map_err(|e| data_err(format!("failed to read file: {e}")))?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| data_err(format!("header parse error: {e}")))?;
        if headers.len() < 2 {
            return Err(data_err("expected a date column and at least one price column".into()));
        }
        let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut dates = Vec::new();
        let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); columns.len()];

        for record in rdr.records() {
            let record = record.map_err(|e| data_err(format!("row parse error: {e}")))?;

            let date_str = record
                .get(0)
                .ok_or_else(|| data_err("missing date cell".into()))?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
                .map_err(|e| data_err(format!("invalid date {date_str}: {e}")))?;
            dates.push(date);

            for (col, slot) in values.iter_mut().enumerate() {
                let cell = record.get(col + 1).unwrap_or("").trim();
                if cell.is_empty() {
                    slot.push(None);
                } else {
                    let close: f64 = cell.parse().map_err(|e| {
                        data_err(format!(
                            "invalid close for {} on {date}: {e}",
                            columns[col]
                        ))
                    })?;
                    slot.push(Some(close));
                }
            }
        }

        PriceTable::new(dates, columns, values)
    }
}

impl DataPort for CsvAdapter {
    fn load_daily(&self) -> Result<PriceTable, TrendfolioError> {
        Self::read_table(&self.daily_path)
    }

    fn load_weekly(&self) -> Result<PriceTable, TrendfolioError> {
        Self::read_table(&self.weekly_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_tables(daily: &str, weekly: &str) -> (TempDir, CsvAdapter) {
        let dir = TempDir::new().unwrap();
        let daily_path = dir.path().join("daily.csv");
        let weekly_path = dir.path().join("weekly.csv");
        fs::write(&daily_path, daily).unwrap();
        fs::write(&weekly_path, weekly).unwrap();
        (dir, CsvAdapter::new(daily_path, weekly_path))
    }

    const DAILY: &str = "Date,GLD,TLT,SPY\n\
        2024-01-02,185.0,98.5,470.1\n\
        2024-01-03,186.2,,471.3\n\
        2024-01-04,184.9,97.8,469.0\n";

    const WEEKLY: &str = "Date,GLD,TLT,SPY\n\
        2024-01-05,185.5,98.0,470.5\n";

    #[test]
    fn loads_daily_table() {
        let (_dir, adapter) = write_tables(DAILY, WEEKLY);
        let table = adapter.load_daily().unwrap();

        assert_eq!(table.row_count(), 3);
        assert_eq!(table.columns(), &["GLD", "TLT", "SPY"]);
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(table.close("GLD", date), Some(185.0));
    }

    #[test]
    fn empty_cell_is_missing_not_zero() {
        let (_dir, adapter) = write_tables(DAILY, WEEKLY);
        let table = adapter.load_daily().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        assert_eq!(table.close("TLT", date), None);
        assert_eq!(table.close("SPY", date), Some(471.3));
    }

    #[test]
    fn loads_weekly_table() {
        let (_dir, adapter) = write_tables(DAILY, WEEKLY);
        let table = adapter.load_weekly().unwrap();
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn rejects_bad_date() {
        let (_dir, adapter) = write_tables("Date,SPY\nnot-a-date,470.0\n", WEEKLY);
        assert!(matches!(
            adapter.load_daily(),
            Err(TrendfolioError::PriceData { .. })
        ));
    }

    #[test]
    fn rejects_bad_close() {
        let (_dir, adapter) = write_tables("Date,SPY\n2024-01-02,abc\n", WEEKLY);
        assert!(matches!(
            adapter.load_daily(),
            Err(TrendfolioError::PriceData { .. })
        ));
    }

    #[test]
    fn rejects_unsorted_dates() {
        let (_dir, adapter) = write_tables(
            "Date,SPY\n2024-01-03,470.0\n2024-01-02,471.0\n",
            WEEKLY,
        );
        assert!(matches!(
            adapter.load_daily(),
            Err(TrendfolioError::UnorderedDates { .. })
        ));
    }

    #[test]
    fn rejects_missing_file() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvAdapter::new(dir.path().join("absent.csv"), dir.path().join("w.csv"));
        assert!(matches!(
            adapter.load_daily(),
            Err(TrendfolioError::PriceData { .. })
        ));
    }

    #[test]
    fn rejects_header_without_price_columns() {
        let (_dir, adapter) = write_tables("Date\n2024-01-02\n", WEEKLY);
        assert!(adapter.load_daily().is_err());
    }
}
