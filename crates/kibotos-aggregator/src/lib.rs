//! # Aggregator
//!
//! Pure function invoked by the scheduler when a cycle closes: folds
//! per-submission final scores into per-miner totals, normalizes them into
//! weights that sum to 1, and projects those weights onto the `u16` scale
//! the chain-signing component consumes. No I/O: every input is
//! already in memory, supplied by the caller from a `Store` read.

use kibotos_types::{CycleWeights, FLOAT_TOLERANCE, WEIGHTS_U16_SCALE};
use std::collections::BTreeMap;

/// One scored submission's contribution to its miner's total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredSubmission {
    pub miner_uid: i64,
    pub final_score: f64,
}

/// Folds `submissions` into normalized weights for `cycle_id`.
///
/// Miners with no scored submissions never appear in the result. An empty
/// `submissions` slice (or one where every total is non-positive) produces
/// an empty weight map — "empty map if no scored submissions"
/// clause.
pub fn aggregate(cycle_id: i64, submissions: &[ScoredSubmission]) -> CycleWeights {
    let totals = fold_totals(submissions);
    let weights = normalize(&totals);
    let weights_u16 = largest_remainder_u16(&weights);

    CycleWeights {
        cycle_id,
        block_number: None,
        weights,
        weights_u16,
        created_at: chrono_now_placeholder(),
    }
}

/// Sums `final_score` per `miner_uid`. Negative or zero scores are kept in
/// the total (a miner's mean can still be positive overall); only the
/// normalization step below excludes a non-positive grand total.
fn fold_totals(submissions: &[ScoredSubmission]) -> BTreeMap<i64, f64> {
    let mut totals: BTreeMap<i64, f64> = BTreeMap::new();
    for s in submissions {
        *totals.entry(s.miner_uid).or_insert(0.0) += s.final_score;
    }
    totals
}

/// Normalizes per-miner totals so they sum to 1. Miners with a
/// non-positive total are dropped: a weight can't be negative and a zero
/// grand total has no meaningful distribution.
fn normalize(totals: &BTreeMap<i64, f64>) -> BTreeMap<i64, f64> {
    let positive: BTreeMap<i64, f64> = totals
        .iter()
        .filter(|(_, &total)| total > 0.0)
        .map(|(&uid, &total)| (uid, total))
        .collect();

    let grand_total: f64 = positive.values().sum();
    if grand_total <= 0.0 {
        return BTreeMap::new();
    }

    positive
        .into_iter()
        .map(|(uid, total)| (uid, total / grand_total))
        .collect()
}

/// Projects float weights onto `u16` such that the projected values sum to
/// exactly `WEIGHTS_U16_SCALE`, the on-chain counterpart of the float weights, using the
/// largest-remainder method: floor every share, then hand out the leftover
/// units to the miners with the largest fractional remainder. Ties break on
/// ascending `miner_uid` so the result is deterministic across runs.
fn largest_remainder_u16(weights: &BTreeMap<i64, f64>) -> BTreeMap<i64, u16> {
    if weights.is_empty() {
        return BTreeMap::new();
    }

    let scale = WEIGHTS_U16_SCALE as f64;
    let mut floors: BTreeMap<i64, u32> = BTreeMap::new();
    let mut remainders: Vec<(i64, f64)> = Vec::with_capacity(weights.len());

    for (&uid, &weight) in weights {
        let scaled = weight * scale;
        let floor = scaled.floor();
        floors.insert(uid, floor as u32);
        remainders.push((uid, scaled - floor));
    }

    let assigned: u32 = floors.values().sum();
    let leftover = WEIGHTS_U16_SCALE.saturating_sub(assigned);

    remainders.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    for (uid, _) in remainders.into_iter().take(leftover as usize) {
        *floors.get_mut(&uid).expect("uid present in floors") += 1;
    }

    floors
        .into_iter()
        .map(|(uid, v)| (uid, v.min(u16::MAX as u32) as u16))
        .collect()
}

/// Aggregation is pure and carries no clock; callers (the scheduler) stamp
/// `created_at` on the value the store actually persists. This placeholder
/// only exists so `CycleWeights` round-trips through tests without the
/// caller needing to patch the field by hand in the common case.
fn chrono_now_placeholder() -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::<chrono::Utc>::default()
}
