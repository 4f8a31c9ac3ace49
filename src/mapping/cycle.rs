//! Menstrual-cycle likelihood: five Gaussian bumps over the day-in-cycle,
//! mixed into per-state scores by a fixed linear table. Parameters are
//! global defaults unless a per-user override is registered.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::types::{StateVector, STATE_COUNT};

const MIN_CYCLE_LEN: f64 = 20.0;
const MAX_CYCLE_LEN: f64 = 40.0;
const FLOOR: f64 = 1e-6;

/// Constant base per state so the cycle evidence never zeroes a state on
/// its own.
const BASE: f64 = 0.4;

/// Bump order: ovulation, late-luteal, early-menses, FOR band a, FOR band b.
const SIGMAS: [f64; 5] = [1.5, 2.0, 1.5, 3.0, 3.0];

/// State x bump mixing coefficients.
const MIX: [[f64; 5]; STATE_COUNT] = [
    // Peak
    [0.90, 0.00, 0.00, 0.10, 0.00],
    // WellAdapted
    [0.40, 0.00, 0.00, 0.20, 0.20],
    // For
    [0.10, 0.10, 0.00, 0.60, 0.60],
    // AcuteFatigue
    [0.00, 0.60, 0.70, 0.10, 0.10],
    // Nfor
    [0.00, 0.30, 0.20, 0.00, 0.00],
    // Ots
    [0.00, 0.10, 0.05, 0.00, 0.00],
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleParams {
    /// Ovulation center as a fraction of cycle length.
    pub ov_frac: f64,
    /// Day offset of the late-luteal bump relative to `length - 2`.
    pub luteal_off: f64,
    /// Common multiplier on every bump sigma.
    pub sig_scale: f64,
}

impl Default for CycleParams {
    fn default() -> Self {
        Self {
            ov_frac: 0.5,
            luteal_off: 0.0,
            sig_scale: 1.0,
        }
    }
}

fn gaussian(d: f64, center: f64, sigma: f64) -> f64 {
    let z = (d - center) / sigma;
    (-0.5 * z * z).exp()
}

/// Likelihood over states for `day` in a cycle of `length` days (length
/// clamped into 20..40). Floored and normalized.
pub fn cycle_likelihood(day: u32, length: u32, params: &CycleParams) -> StateVector {
    let len = (length as f64).clamp(MIN_CYCLE_LEN, MAX_CYCLE_LEN);
    let d = (day as f64).clamp(1.0, len);

    let centers = [
        params.ov_frac * len,
        len - 2.0 + params.luteal_off,
        2.0,
        0.35 * len,
        0.65 * len,
    ];
    let mut bumps = [0.0; 5];
    for i in 0..5 {
        let sigma = (SIGMAS[i] * params.sig_scale).max(1e-3);
        bumps[i] = gaussian(d, centers[i], sigma);
    }

    let mut raw = [0.0; STATE_COUNT];
    for (s, row) in MIX.iter().enumerate() {
        let mut acc = BASE;
        for (b, coeff) in bumps.iter().zip(row.iter()) {
            acc += coeff * b;
        }
        raw[s] = acc.max(FLOOR);
    }
    let total: f64 = raw.iter().sum();
    for r in &mut raw {
        *r /= total;
    }
    raw
}

/// Per-user cycle-parameter overrides. Entries never expire; absent users
/// fall back to `CycleParams::default()`.
#[derive(Debug, Default)]
pub struct CycleParamRegistry {
    inner: RwLock<HashMap<String, CycleParams>>,
}

impl CycleParamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, user_id: &str, params: CycleParams) {
        self.inner.write().insert(user_id.to_string(), params);
    }

    pub fn get(&self, user_id: &str) -> Option<CycleParams> {
        self.inner.read().get(user_id).copied()
    }

    pub fn resolve(&self, user_id: &str) -> CycleParams {
        self.get(user_id).unwrap_or_default()
    }

    pub fn remove(&self, user_id: &str) {
        self.inner.write().remove(user_id);
    }
}
