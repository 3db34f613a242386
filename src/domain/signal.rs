//! Entry/exit signal evaluation.
//!
//! Signals are stateless: both predicates are recomputed from the current
//! snapshot at every evaluation, and eligibility is never carried over
//! from a previous date.

use super::indicator::IndicatorSnapshot;

/// Entry-side classification of an instrument on a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Eligible,
    Ineligible,
}

/// Entry condition: close above the fast SMA and fast SMA above the slow
/// SMA. Both averages must be defined; insufficient history is Ineligible,
/// not an error.
pub fn entry_signal(snapshot: &IndicatorSnapshot) -> Signal {
    match (snapshot.sma_fast, snapshot.sma_slow) {
        (Some(fast), Some(slow)) if snapshot.close > fast && fast > slow => Signal::Eligible,
        _ => Signal::Ineligible,
    }
}

/// Exit condition, checked independently of entry: close below the slow
/// SMA, or fast SMA below the slow SMA. A held position that trips this is
/// force-sold regardless of drift-band status.
pub fn exit_signal(snapshot: &IndicatorSnapshot) -> bool {
    match (snapshot.sma_fast, snapshot.sma_slow) {
        (Some(fast), Some(slow)) => snapshot.close < slow || fast < slow,
        _ => false,
    }
}
