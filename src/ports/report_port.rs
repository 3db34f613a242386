//! Result output port trait.
//!
//! The engine itself persists nothing; a report adapter writes the trade
//! ledger, equity curve, and metrics on the caller's behalf.

use std::path::Path;

use crate::domain::backtest::SimResult;
use crate::domain::error::TrendfolioError;
use crate::domain::metrics::MetricsReport;

pub trait ReportPort {
    fn write(
        &self,
        result: &SimResult,
        report: &MetricsReport,
        output_dir: &Path,
    ) -> Result<(), TrendfolioError>;
}
