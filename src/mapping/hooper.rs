//! Hooper-item mapping: a 1..7 ordinal wellness score blended into the
//! variable's three anchor-category likelihood rows. The blend weights are
//! fixed by design and not user-tunable.

use crate::cpt::EmissionTable;
use crate::types::{EvidenceVar, StateVector, STATE_COUNT};

/// Rows indexed by score-1; columns are (low, medium, high) anchor weights.
/// For sleep quality the anchors read (good, medium, poor).
const ANCHOR_WEIGHTS: [[f64; 3]; 7] = [
    [1.00, 0.00, 0.00],
    [0.80, 0.20, 0.00],
    [0.20, 0.80, 0.00],
    [0.10, 0.80, 0.10],
    [0.00, 0.80, 0.20],
    [0.00, 0.30, 0.70],
    [0.00, 0.10, 0.90],
];

/// Anchor category names for a Hooper variable, low-to-high severity order.
pub fn anchors(var: EvidenceVar) -> [&'static str; 3] {
    match var {
        EvidenceVar::SleepQuality => ["good", "medium", "poor"],
        _ => ["low", "medium", "high"],
    }
}

/// The anchor weight row for a score, clamped into 1..7.
pub fn anchor_weights(score: u8) -> [f64; 3] {
    let idx = score.clamp(1, 7) as usize - 1;
    ANCHOR_WEIGHTS[idx]
}

/// The single anchor carrying the most weight for a score; used as the
/// categorical reading of an ordinal item (interaction lookup, EM counts).
pub fn dominant_anchor(var: EvidenceVar, score: u8) -> &'static str {
    let weights = anchor_weights(score);
    let names = anchors(var);
    let mut best = 0;
    for i in 1..3 {
        if weights[i] > weights[best] {
            best = i;
        }
    }
    names[best]
}

/// Blend the three anchor rows of `var` by the score's weights and
/// normalize. Returns `None` when the emission table lacks any anchor row
/// for the variable (permissive skip).
pub fn state_likelihood(table: &EmissionTable, var: EvidenceVar, score: u8) -> Option<StateVector> {
    let weights = anchor_weights(score);
    let names = anchors(var);
    let mut out = [0.0; STATE_COUNT];
    let mut any = false;
    for (w, name) in weights.iter().zip(names.iter()) {
        if *w <= 0.0 {
            continue;
        }
        let row = table.likelihood(var, name)?;
        any = true;
        for (o, v) in out.iter_mut().zip(row.iter()) {
            *o += w * v;
        }
    }
    if !any {
        return None;
    }
    let total: f64 = out.iter().sum();
    if total > 0.0 {
        for o in &mut out {
            *o /= total;
        }
    }
    Some(out)
}
