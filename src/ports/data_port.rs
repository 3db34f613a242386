//! Price data access port trait.
//!
//! The engine consumes already-aligned, date-indexed price tables; where
//! they come from (CSV files, a database, test fixtures) is the adapter's
//! concern.

use crate::domain::error::TrendfolioError;
use crate::domain::price::PriceTable;

pub trait DataPort {
    fn load_daily(&self) -> Result<PriceTable, TrendfolioError>;

    fn load_weekly(&self) -> Result<PriceTable, TrendfolioError>;
}
