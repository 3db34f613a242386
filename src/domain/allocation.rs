//! Portfolio selection and drift-tolerant rebalancing decisions.
//!
//! Pure decision layer: given the eligible candidates and the current
//! holdings it produces value-denominated orders; applying them to state
//! is the simulation loop's job.

use std::collections::{BTreeMap, BTreeSet};

/// An entry-eligible instrument with a defined benchmark correlation.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub instrument: String,
    pub correlation: f64,
}

/// Sort candidates ascending by correlation to the benchmark, ties broken
/// by instrument id, and keep at most `max_selected`.
pub fn select(mut candidates: Vec<Candidate>, max_selected: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        a.correlation
            .partial_cmp(&b.correlation)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.instrument.cmp(&b.instrument))
    });
    candidates.truncate(max_selected);
    candidates
}

/// Relative drift band: no trade while the current weight sits inside
/// `[target·(1−tolerance), target·(1+tolerance)]`. A rebalance triggers
/// only strictly outside the band.
pub fn within_band(weight: f64, target: f64, tolerance: f64) -> bool {
    let lower = target * (1.0 - tolerance);
    let upper = target * (1.0 + tolerance);
    weight >= lower && weight <= upper
}

/// A value-denominated order against one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueOrder {
    pub instrument: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RebalancePlan {
    /// Trim orders for overweight holdings, in instrument order.
    pub sells: Vec<ValueOrder>,
    /// Top-up and new-entry orders, in instrument order.
    pub buys: Vec<ValueOrder>,
    /// Equal weight over the post-rebalance holding set; 0 when that set
    /// is empty (portfolio goes to cash).
    pub target_weight: f64,
}

/// Build the rebalance plan for one evaluation.
///
/// `held` maps each surviving holding (exits already liquidated) to its
/// current market value; `selected` is the reselection result. The
/// post-rebalance holding set is their union: survivors are kept even
/// when not re-selected, and every member targets an equal share of
/// `total_value`. Held instruments inside their band are left untouched;
/// the rest trade to exactly the target.
pub fn plan_rebalance(
    held: &BTreeMap<String, f64>,
    total_value: f64,
    selected: &[String],
    tolerance: f64,
) -> RebalancePlan {
    let holding_set: BTreeSet<&String> = held.keys().chain(selected.iter()).collect();
    if holding_set.is_empty() || total_value <= 0.0 {
        return RebalancePlan::default();
    }

    let target_weight = 1.0 / holding_set.len() as f64;
    let target_value = target_weight * total_value;

    let mut sells = Vec::new();
    let mut buys = Vec::new();

    for &instrument in &holding_set {
        match held.get(instrument) {
            Some(&value) => {
                let weight = value / total_value;
                if within_band(weight, target_weight, tolerance) {
                    continue;
                }
                let delta = target_value - value;
                let order = ValueOrder {
                    instrument: instrument.clone(),
                    value: delta.abs(),
                };
                if delta < 0.0 {
                    sells.push(order);
                } else {
                    buys.push(order);
                }
            }
            None => buys.push(ValueOrder {
                instrument: instrument.clone(),
                value: target_value,
            }),
        }
    }

    RebalancePlan {
        sells,
        buys,
        target_weight,
    }
}
